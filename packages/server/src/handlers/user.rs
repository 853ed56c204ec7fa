use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::{BlobName, PROFILE_IMAGE_TYPES};
use sea_orm::*;
use tracing::{instrument, warn};

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::feed::find_author;
use crate::models::shared::{PageQuery, Pagination};
use crate::models::user::{
    MessageResponse, RegisterRequest, UpdateUserRequest, UserListResponse, UserView,
    validate_register_request, validate_update_user_request,
};
use crate::state::AppState;
use crate::utils::hash;

#[utoipa::path(
    post,
    path = "/",
    tag = "Users",
    operation_id = "signup",
    summary = "Create an account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Field validation failed (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Username already taken (USERNAME_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = ?payload.username))]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let (Some(username), Some(display_name), Some(password)) =
        (payload.username, payload.display_name, payload.password)
    else {
        return Err(AppError::Validation("Incomplete signup request".into()));
    };

    let taken = user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(&state.db)
        .await?
        .is_some();
    if taken {
        return Err(AppError::UsernameTaken);
    }

    let hash = hash::hash_password(&password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let new_user = user::ActiveModel {
        username: Set(username),
        display_name: Set(display_name),
        password: Set(hash),
        image: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Signup race condition: unique constraint caught on insert");
            AppError::UsernameTaken
        }
        _ => AppError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(MessageResponse::new("User saved"))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List users",
    description = "Pages through users in id order. When called with credentials the caller \
        is left out of the listing.",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of users", body = UserListResponse),
        (status = 400, description = "Bad sort parameter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Credentials present but invalid (TOKEN_INVALID, INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    let page = query.normalize()?;

    let mut select = user::Entity::find();
    if let Some(me) = &auth_user {
        select = select.filter(user::Column::Id.ne(me.user_id));
    }

    let total = select.clone().count(&state.db).await?;
    let users = select
        .order_by_asc(user::Column::Id)
        .offset(page.offset())
        .limit(page.size)
        .all(&state.db)
        .await?;

    Ok(Json(UserListResponse {
        data: users.into_iter().map(UserView::from).collect(),
        pagination: Pagination::new(&page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{username}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get a user by username",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User", body = UserView),
        (status = 404, description = "No such user (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserView>, AppError> {
    let user = find_author(&state.db, &username).await?;
    Ok(Json(UserView::from(user)))
}

#[utoipa::path(
    put,
    path = "/{username}",
    tag = "Users",
    operation_id = "updateUser",
    summary = "Update one's own profile",
    description = "Sets the display name and, when `image` is given, replaces the profile \
        image with the decoded PNG or JPEG. The previous image file is removed afterwards.",
    params(("username" = String, Path, description = "Username; must be the caller's")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserView),
        (status = 400, description = "Field validation failed (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Not authenticated (TOKEN_MISSING, TOKEN_INVALID, INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 403, description = "Not the caller's account (PERMISSION_DENIED)", body = ErrorBody),
        (status = 415, description = "Image is not PNG or JPEG (UNSUPPORTED_MEDIA_TYPE)", body = ErrorBody),
    ),
    security(("basic" = []), ("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserView>, AppError> {
    if auth_user.username != username {
        return Err(AppError::PermissionDenied);
    }
    validate_update_user_request(&payload)?;

    let existing = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::PermissionDenied)?;
    let previous_image = existing.image.clone();

    let new_image = match payload.image.as_deref() {
        Some(encoded) if !encoded.trim().is_empty() => Some(store_profile_image(&state, encoded).await?),
        _ => None,
    };

    let mut active: user::ActiveModel = existing.into();
    active.display_name = Set(payload.display_name.unwrap_or_default());
    if let Some(name) = &new_image {
        active.image = Set(Some(name.to_string()));
    }
    let updated = match active.update(&state.db).await {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(name) = &new_image
                && let Err(cleanup) = state.profile_images.delete(name).await
            {
                warn!(name = %name, error = %cleanup, "Failed to remove unused profile image");
            }
            return Err(e.into());
        }
    };

    if new_image.is_some()
        && let Some(old) = previous_image.as_deref().and_then(|n| BlobName::parse(n).ok())
        && let Err(e) = state.profile_images.delete(&old).await
    {
        warn!(name = %old, error = %e, "Failed to remove replaced profile image");
    }

    Ok(Json(UserView::from(updated)))
}

/// Decode, type-check and store a base64 profile image.
async fn store_profile_image(state: &AppState, encoded: &str) -> Result<BlobName, AppError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AppError::invalid_field("image", "Image must be base64 encoded"))?;

    let max = state.config.storage.max_profile_image_size;
    if bytes.len() as u64 > max {
        return Err(AppError::invalid_field(
            "image",
            format!("Image must not exceed {max} bytes"),
        ));
    }

    state
        .detector
        .detect_allowed(&bytes, PROFILE_IMAGE_TYPES)
        .map_err(|detected| AppError::UnsupportedMediaType(detected.to_string()))?;

    let name = BlobName::generate();
    state.profile_images.write(&name, &bytes).await?;
    Ok(name)
}
