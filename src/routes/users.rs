use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::auth::cookie::{clear_session_cookie, session_cookie};
use crate::auth::password;
use crate::db::models::{Identity, PublicProfile, UserSummary};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{AppJson, CurrentUser};
use crate::state::AppState;

/// Usernames that would be shadowed by fixed routes under `/api/users`.
const RESERVED_USERNAMES: &[&str] = &[
    "validate-token",
    "signup",
    "login",
    "logout",
    "status",
    "description",
    "search",
];

#[derive(Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Deserialize)]
pub struct DescriptionRequest {
    #[serde(default)]
    pub description: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/validate-token", get(validate_token))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/status", put(update_status))
        .route("/description", put(update_description))
        .route("/search/{term}", get(search))
        .route("/{username}", get(profile))
}

fn validate_username(raw: &str) -> AppResult<String> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("Username is required".into()));
    }
    if username.contains('/') {
        return Err(AppError::BadRequest("Username cannot contain '/'".into()));
    }
    if RESERVED_USERNAMES.contains(&username) {
        return Err(AppError::BadRequest("Username is not available".into()));
    }
    Ok(username.to_string())
}

/// Create an account. The password is hashed before it reaches the store.
pub async fn register(state: &AppState, username: &str, raw_password: String) -> AppResult<Identity> {
    let username = validate_username(username)?;
    if raw_password.is_empty() {
        return Err(AppError::BadRequest("Password is required".into()));
    }

    let hash = password::hash_password(raw_password, state.config.auth.bcrypt_cost).await?;
    let conn = state.db.get()?;
    let user = users::create_user(&conn, &username, &hash, Utc::now())?;
    Ok(Identity::from(&user))
}

/// Check credentials. Unknown user and wrong password both come back as `None`.
pub async fn authenticate(
    state: &AppState,
    username: &str,
    raw_password: String,
) -> AppResult<Option<Identity>> {
    let user = {
        let conn = state.db.get()?;
        users::find_by_username(&conn, username.trim())?
    };
    let Some(user) = user else {
        return Ok(None);
    };

    if password::verify_password(raw_password, user.password_hash.clone()).await? {
        Ok(Some(Identity::from(&user)))
    } else {
        Ok(None)
    }
}

/// GET /api/users/validate-token
async fn validate_token(_user: CurrentUser) -> Json<serde_json::Value> {
    Json(json!({ "valid": true }))
}

/// POST /api/users/signup: create account and start a session
async fn signup(
    State(state): State<AppState>,
    AppJson(req): AppJson<CredentialsRequest>,
) -> AppResult<Response> {
    let identity = register(&state, &req.username, req.password).await?;
    let token = state.tokens.issue(&identity.username)?;
    tracing::info!("Registered user {}", identity.username);

    Ok((
        [(header::SET_COOKIE, session_cookie(&state.config, &token))],
        Json(json!({ "message": "Signup successful" })),
    )
        .into_response())
}

/// POST /api/users/login
async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<CredentialsRequest>,
) -> AppResult<Response> {
    let identity = authenticate(&state, &req.username, req.password)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid username or password".into()))?;

    let token = state.tokens.issue(&identity.username)?;
    tracing::info!("{} logged in", identity.username);

    Ok((
        [(header::SET_COOKIE, session_cookie(&state.config, &token))],
        Json(json!({ "username": identity.username, "_id": identity.id })),
    )
        .into_response())
}

/// POST /api/users/logout: the token itself stays valid until expiry; only the cookie goes
async fn logout(State(state): State<AppState>) -> Response {
    (
        [(header::SET_COOKIE, clear_session_cookie(&state.config))],
        Json(json!({ "message": "Logout successful" })),
    )
        .into_response()
}

/// PUT /api/users/status
async fn update_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<StatusRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let status =
        users::update_status(&conn, &user.id, &req.status)?.ok_or_else(AppError::user_not_found)?;
    tracing::debug!("{} set status", user.username);
    Ok(Json(json!({ "status": status })))
}

/// PUT /api/users/description
async fn update_description(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<DescriptionRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let description = users::update_description(&conn, &user.id, &req.description)?
        .ok_or_else(AppError::user_not_found)?;
    tracing::debug!("{} set description", user.username);
    Ok(Json(json!({ "description": description })))
}

/// GET /api/users/search/{term}
async fn search(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> AppResult<Json<Vec<UserSummary>>> {
    let conn = state.db.get()?;
    Ok(Json(users::search(&conn, &term)?))
}

/// GET /api/users/{username}
async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<PublicProfile>> {
    let conn = state.db.get()?;
    let user = users::find_by_username(&conn, &username)?.ok_or_else(AppError::user_not_found)?;
    Ok(Json(PublicProfile::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_validation() {
        assert_eq!(validate_username("  alice ").unwrap(), "alice");
        assert!(validate_username("   ").is_err());
        assert!(validate_username("a/b").is_err());
        assert!(validate_username("login").is_err());
        assert!(validate_username("status").is_err());
    }
}
