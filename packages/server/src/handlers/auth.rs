use axum::{Json, extract::State};
use sea_orm::EntityTrait;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::auth::LoginResponse;
use crate::models::user::UserView;
use crate::state::AppState;
use crate::utils::jwt;

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Exchange credentials for a bearer token",
    description = "Authenticates with HTTP Basic credentials (or an unexpired bearer token) \
        and returns a fresh bearer token together with the caller's profile.",
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Missing or bad credentials (TOKEN_MISSING, TOKEN_INVALID, INVALID_CREDENTIALS)", body = ErrorBody),
    ),
    security(("basic" = []), ("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(username = %auth_user.username))]
pub async fn login(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let token = jwt::sign(
        user.id,
        &user.username,
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_hours,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    Ok(Json(LoginResponse {
        token,
        user: UserView::from(user),
    }))
}
