use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::feed::{Direction, FeedMode, FeedResult};

use super::discussion::{DiscussionListResponse, DiscussionView};

/// Query parameters of the relative feed endpoints, besides paging.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedParams {
    /// `older` / `before` (default) or `newer` / `after`. Any other value is
    /// rejected instead of falling back to `older`.
    pub direction: Option<String>,
    /// With `newer`, return only `{count}` instead of the discussions.
    #[serde(default)]
    pub count: bool,
}

impl FeedParams {
    pub fn mode(&self) -> FeedMode {
        if self.count {
            FeedMode::Count
        } else {
            FeedMode::List
        }
    }

    pub fn direction(&self) -> Result<Direction, AppError> {
        match self.direction.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("older") | Some("before") => Ok(Direction::Older),
            Some("newer") | Some("after") => Ok(Direction::Newer),
            Some(other) => Err(AppError::Validation(format!(
                "direction must be one of: older, before, newer, after (got '{other}')"
            ))),
        }
    }
}

/// Body of a count-only feed response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CountResponse {
    #[schema(example = 3)]
    pub count: u64,
}

/// Body of a relative feed response; the shape depends on direction and mode.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum FeedResponse {
    /// `older`: one page with its pagination envelope.
    Page(DiscussionListResponse),
    /// `newer`: every discussion above the anchor.
    List(Vec<DiscussionView>),
    /// `newer` with `count=true`.
    Count(CountResponse),
}

impl From<FeedResult> for FeedResponse {
    fn from(result: FeedResult) -> Self {
        match result {
            FeedResult::Page { data, pagination } => {
                FeedResponse::Page(DiscussionListResponse { data, pagination })
            }
            FeedResult::List(data) => FeedResponse::List(data),
            FeedResult::Count(count) => FeedResponse::Count(CountResponse { count }),
        }
    }
}
