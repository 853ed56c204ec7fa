use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use tracing::{info, instrument};

use crate::attachment::AttachmentService;
use crate::entity::discussion;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::feed::{FeedService, load_views};
use crate::models::discussion::{
    CreateDiscussionRequest, DiscussionListResponse, DiscussionView,
    validate_create_discussion_request,
};
use crate::models::feed::{FeedParams, FeedResponse};
use crate::models::shared::PageQuery;
use crate::models::user::MessageResponse;
use crate::state::AppState;
use crate::utils::discussion::is_allowed_to_delete;

#[utoipa::path(
    post,
    path = "/",
    tag = "Discussions",
    operation_id = "createDiscussion",
    summary = "Create a discussion",
    description = "Creates a discussion authored by the caller. When `attachment_id` is given, \
        the attachment is bound in the same transaction; the post is not created if binding fails.",
    request_body = CreateDiscussionRequest,
    responses(
        (status = 201, description = "Discussion created", body = DiscussionView),
        (status = 400, description = "Content out of bounds (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Not authenticated (TOKEN_MISSING, TOKEN_INVALID, INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 404, description = "Attachment not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Attachment already bound (CONFLICT)", body = ErrorBody),
    ),
    security(("basic" = []), ("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, attachment_id = ?payload.attachment_id))]
pub async fn create_discussion(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateDiscussionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = validate_create_discussion_request(&payload)?.to_string();

    let txn = state.db.begin().await?;

    let created = discussion::ActiveModel {
        content: Set(content),
        user_id: Set(auth_user.user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if let Some(attachment_id) = payload.attachment_id {
        AttachmentService::new(&txn, &*state.attachments)
            .bind_to_discussion(attachment_id, &created)
            .await?;
    }

    txn.commit().await?;

    let view = load_views(&state.db, vec![created])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("created discussion vanished".into()))?;

    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Discussions",
    operation_id = "listDiscussions",
    summary = "List all discussions",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of discussions", body = DiscussionListResponse),
        (status = 400, description = "Bad sort parameter (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_discussions(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<DiscussionListResponse>, AppError> {
    let page = query.normalize()?;
    let (data, pagination) = FeedService::new(&state.db).list(None, &page).await?;
    Ok(Json(DiscussionListResponse { data, pagination }))
}

#[utoipa::path(
    get,
    path = "/{username}/discussions",
    tag = "Discussions",
    operation_id = "listUserDiscussions",
    summary = "List one user's discussions",
    params(("username" = String, Path, description = "Author's username"), PageQuery),
    responses(
        (status = 200, description = "Page of discussions", body = DiscussionListResponse),
        (status = 400, description = "Bad sort parameter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "No such user (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_user_discussions(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<DiscussionListResponse>, AppError> {
    let page = query.normalize()?;
    let (data, pagination) = FeedService::new(&state.db)
        .list(Some(&username), &page)
        .await?;
    Ok(Json(DiscussionListResponse { data, pagination }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Discussions",
    operation_id = "relativeFeed",
    summary = "Discussions relative to an anchor",
    description = "`direction=older` (default) returns a page of discussions with smaller ids. \
        `direction=newer` returns every discussion with a larger id, or only their number \
        when `count=true`.",
    params(("id" = i64, Path, description = "Anchor discussion ID"), FeedParams, PageQuery),
    responses(
        (status = 200, description = "Page, list or count", body = FeedResponse),
        (status = 400, description = "Bad direction or sort (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, params, query), fields(anchor = id))]
pub async fn relative_feed(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<FeedParams>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FeedResponse>, AppError> {
    let direction = params.direction()?;
    let page = query.normalize()?;
    let result = FeedService::new(&state.db)
        .query_relative(id, None, direction, params.mode(), &page)
        .await?;
    Ok(Json(result.into()))
}

#[utoipa::path(
    get,
    path = "/{username}/discussions/{id}",
    tag = "Discussions",
    operation_id = "userRelativeFeed",
    summary = "One user's discussions relative to an anchor",
    params(
        ("username" = String, Path, description = "Author's username"),
        ("id" = i64, Path, description = "Anchor discussion ID"),
        FeedParams,
        PageQuery,
    ),
    responses(
        (status = 200, description = "Page, list or count", body = FeedResponse),
        (status = 400, description = "Bad direction or sort (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "No such user (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, params, query), fields(anchor = id))]
pub async fn user_relative_feed(
    State(state): State<AppState>,
    Path((username, id)): Path<(String, i64)>,
    Query(params): Query<FeedParams>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FeedResponse>, AppError> {
    let direction = params.direction()?;
    let page = query.normalize()?;
    let result = FeedService::new(&state.db)
        .query_relative(id, Some(&username), direction, params.mode(), &page)
        .await?;
    Ok(Json(result.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Discussions",
    operation_id = "deleteDiscussion",
    summary = "Delete one's own discussion",
    description = "Removes the discussion together with its bound attachment, if any. \
        Callers who are not the author get 403 whether or not the discussion exists.",
    params(("id" = i64, Path, description = "Discussion ID")),
    responses(
        (status = 200, description = "Discussion removed", body = MessageResponse),
        (status = 401, description = "Not authenticated (TOKEN_MISSING, TOKEN_INVALID, INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("basic" = []), ("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, discussion_id = id))]
pub async fn delete_discussion(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    if !is_allowed_to_delete(&state.db, id, auth_user.user_id).await? {
        return Err(AppError::PermissionDenied);
    }

    let txn = state.db.begin().await?;

    let had_attachment = AttachmentService::new(&txn, &*state.attachments)
        .delete_bound_attachment(id)
        .await?;

    discussion::Entity::delete_by_id(id).exec(&txn).await?;

    if let Err(e) = txn.commit().await {
        return Err(if had_attachment {
            AppError::StorageInconsistency(format!(
                "attachment blob of discussion {id} deleted but commit failed: {e}"
            ))
        } else {
            e.into()
        });
    }

    info!(had_attachment, "Discussion removed");

    Ok(Json(MessageResponse::new("Discussion is removed")))
}
