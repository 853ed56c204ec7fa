//! Per-route authentication layers.
//!
//! Routes opt in at startup with `from_fn_with_state(state, require_auth)`
//! or `identify`; nothing is discovered implicitly.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::entity::user;
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::state::AppState;
use crate::utils::{hash, jwt};

/// Reject the request unless it carries valid Basic or Bearer credentials.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, request.headers())
        .await?
        .ok_or(AppError::TokenMissing)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Attach the caller's identity when credentials are present.
///
/// Anonymous requests pass through; credentials that are present but wrong
/// are still rejected.
pub async fn identify(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(user) = authenticate(&state, request.headers()).await? {
        request.extensions_mut().insert(user);
    }
    Ok(next.run(request).await)
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Option<AuthUser>, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AppError::TokenInvalid)?;

    if let Some(token) = value.strip_prefix("Bearer ") {
        let claims = jwt::verify(token.trim(), &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;
        return Ok(Some(AuthUser {
            user_id: claims.uid,
            username: claims.sub,
        }));
    }

    if let Some(encoded) = value.strip_prefix("Basic ") {
        let (username, password) = decode_basic(encoded).ok_or(AppError::InvalidCredentials)?;
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(&username))
            .one(&state.db)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid = hash::verify_password(&password, &user.password)
            .map_err(|e| AppError::Internal(format!("Stored password hash unreadable: {e}")))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        return Ok(Some(AuthUser {
            user_id: user.id,
            username: user.username,
        }));
    }

    Err(AppError::TokenInvalid)
}

/// Split a Basic credential into `(username, password)`.
fn decode_basic(encoded: &str) -> Option<(String, String)> {
    let bytes = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
