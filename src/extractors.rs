use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::Json;

use crate::auth::cookie::get_cookie_value;
use crate::db::models::Identity;
use crate::db::users;
use crate::error::AppError;
use crate::state::AppState;

/// The identity acting on this request, resolved from the session cookie.
///
/// Rejects with 401 before the handler runs when the cookie is missing, the token
/// does not verify, or the account it names no longer exists.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = get_cookie_value(parts, &state.config.auth.cookie_name)
            .ok_or_else(AppError::auth_required)?;

        let username = state
            .tokens
            .verify(token)
            .ok_or_else(|| AppError::Unauthorized("Invalid token".into()))?;

        let conn = state.db.get()?;
        let identity = users::find_identity(&conn, &username)?.ok_or_else(|| {
            tracing::debug!("Token for unknown user {}", username);
            AppError::Unauthorized("User not found".into())
        })?;

        Ok(CurrentUser(identity))
    }
}

/// `Json` body whose rejections render as a 400 JSON error like every other failure.
#[derive(Debug, Clone)]
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = axum::extract::rejection::JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(AppJson(value))
    }
}
