use serde::{Deserialize, Serialize};

use crate::entity::user;

use super::shared::{FieldErrors, Pagination, char_len_between};

/// Request body for account signup.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique username (4-255 characters).
    #[schema(example = "alice")]
    pub username: Option<String>,
    /// Name shown next to posts (4-255 characters).
    #[schema(example = "Alice W.")]
    pub display_name: Option<String>,
    /// 8-255 characters with at least one lowercase, one uppercase letter and one digit.
    #[schema(example = "P4ssword")]
    pub password: Option<String>,
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), crate::error::AppError> {
    let mut errors = FieldErrors::default();

    match payload.username.as_deref() {
        None => errors.add("username", "Username cannot be null"),
        Some(u) if !char_len_between(u, 4, 255) => {
            errors.add("username", "Username must be 4-255 characters")
        }
        _ => {}
    }

    match payload.display_name.as_deref() {
        None => errors.add("display_name", "Display name cannot be null"),
        Some(d) if !char_len_between(d, 4, 255) => {
            errors.add("display_name", "Display name must be 4-255 characters")
        }
        _ => {}
    }

    match payload.password.as_deref() {
        None => errors.add("password", "Password cannot be null"),
        Some(p) if !char_len_between(p, 8, 255) => {
            errors.add("password", "Password must be 8-255 characters")
        }
        Some(p) if !is_strong_password(p) => errors.add(
            "password",
            "Password must have at least one uppercase, one lowercase letter and one number",
        ),
        _ => {}
    }

    errors.into_result()
}

fn is_strong_password(p: &str) -> bool {
    p.chars().any(|c| c.is_ascii_lowercase())
        && p.chars().any(|c| c.is_ascii_uppercase())
        && p.chars().any(|c| c.is_ascii_digit())
}

/// Request body for updating one's own profile.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    #[schema(example = "Alice W.")]
    pub display_name: Option<String>,
    /// Base64-encoded PNG or JPEG. Omit to keep the current image.
    pub image: Option<String>,
}

pub fn validate_update_user_request(
    payload: &UpdateUserRequest,
) -> Result<(), crate::error::AppError> {
    let mut errors = FieldErrors::default();
    match payload.display_name.as_deref() {
        None => errors.add("display_name", "Display name cannot be null"),
        Some(d) if !char_len_between(d, 4, 255) => {
            errors.add("display_name", "Display name must be 4-255 characters")
        }
        _ => {}
    }
    errors.into_result()
}

/// Public view of a user. The password hash is never part of it.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserView {
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "Alice W.")]
    pub display_name: String,
    /// Stored profile image name, served under `/api/v1/images/profile/{name}`.
    pub image: Option<String>,
}

impl From<user::Model> for UserView {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            display_name: model.display_name,
            image: model.image,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserView>,
    pub pagination: Pagination,
}

/// Plain acknowledgement body.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    #[schema(example = "User saved")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
