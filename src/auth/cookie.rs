use axum::http::header;
use axum::http::request::Parts;

use crate::config::{Config, MAX_SESSION_DAYS};

pub fn session_cookie(config: &Config, token: &str) -> String {
    let max_age_secs = config.auth.cookie_days.clamp(0, MAX_SESSION_DAYS) * 24 * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        config.auth.cookie_name,
        token,
        max_age_secs,
        secure_suffix(config)
    )
}

pub fn clear_session_cookie(config: &Config) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{}",
        config.auth.cookie_name,
        secure_suffix(config)
    )
}

fn secure_suffix(config: &Config) -> &'static str {
    if config.server.production {
        "; Secure"
    } else {
        ""
    }
}

pub fn get_cookie_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        })
}
