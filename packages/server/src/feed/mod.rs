//! Discussion feeds: plain paged listings and anchor-relative queries.

mod predicate;

use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};

use crate::entity::{discussion, file_attachment, user};
use crate::error::AppError;
use crate::models::discussion::DiscussionView;
use crate::models::shared::{PageRequest, Pagination, Sort, SortDirection, SortField};

pub use predicate::Predicate;

/// Which side of the anchor to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Identifiers strictly below the anchor, one page at a time.
    #[default]
    Older,
    /// Identifiers strictly above the anchor, all at once.
    Newer,
}

/// Whether to materialize rows or only count them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedMode {
    #[default]
    List,
    Count,
}

#[derive(Debug)]
pub enum FeedResult {
    Page {
        data: Vec<DiscussionView>,
        pagination: Pagination,
    },
    List(Vec<DiscussionView>),
    Count(u64),
}

pub struct FeedService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> FeedService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Discussions positioned relative to `anchor`.
    ///
    /// `Older` always yields a page; `mode` only applies to `Newer`, where
    /// `List` returns every match ordered by `page.sort` and `Count` returns
    /// the cardinality of the same predicate.
    pub async fn query_relative(
        &self,
        anchor: i64,
        author: Option<&str>,
        direction: Direction,
        mode: FeedMode,
        page: &PageRequest,
    ) -> Result<FeedResult, AppError> {
        let range = match direction {
            Direction::Older => Predicate::id_less_than(anchor),
            Direction::Newer => Predicate::id_greater_than(anchor),
        };
        let predicate = self.scope(range, author).await?;

        match (direction, mode) {
            (Direction::Older, _) => {
                let (data, pagination) = self.fetch_page(&predicate, page).await?;
                Ok(FeedResult::Page { data, pagination })
            }
            (Direction::Newer, FeedMode::List) => {
                let models = sorted(
                    discussion::Entity::find().filter(predicate.to_condition()),
                    page.sort,
                )
                .all(self.conn)
                .await?;
                Ok(FeedResult::List(load_views(self.conn, models).await?))
            }
            (Direction::Newer, FeedMode::Count) => {
                let count = discussion::Entity::find()
                    .filter(predicate.to_condition())
                    .count(self.conn)
                    .await?;
                Ok(FeedResult::Count(count))
            }
        }
    }

    /// Page through all discussions, or one author's.
    pub async fn list(
        &self,
        author: Option<&str>,
        page: &PageRequest,
    ) -> Result<(Vec<DiscussionView>, Pagination), AppError> {
        match author {
            Some(username) => {
                let author = find_author(self.conn, username).await?;
                self.fetch_page(&Predicate::author_is(author.id), page)
                    .await
            }
            None => self.fetch_page(&Predicate::all(), page).await,
        }
    }

    /// Conjoin the author clause when the feed is scoped to one user.
    async fn scope(&self, predicate: Predicate, author: Option<&str>) -> Result<Predicate, AppError> {
        match author {
            Some(username) => {
                let author = find_author(self.conn, username).await?;
                Ok(predicate.and(Predicate::author_is(author.id)))
            }
            None => Ok(predicate),
        }
    }

    async fn fetch_page(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
    ) -> Result<(Vec<DiscussionView>, Pagination), AppError> {
        let select = discussion::Entity::find().filter(predicate.to_condition());
        let total = select.clone().count(self.conn).await?;
        let models = sorted(select, page.sort)
            .offset(Some(page.offset()))
            .limit(Some(page.size))
            .all(self.conn)
            .await?;
        let data = load_views(self.conn, models).await?;
        Ok((data, Pagination::new(page, total)))
    }
}

/// Look up an author by username, 404 if absent.
pub async fn find_author<C: ConnectionTrait>(db: &C, username: &str) -> Result<user::Model, AppError> {
    user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{username} not found")))
}

/// Apply the requested order. Date ordering breaks ties by id, newest first.
fn sorted(select: Select<discussion::Entity>, sort: Sort) -> Select<discussion::Entity> {
    let order = match sort.direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    };
    match sort.field {
        SortField::Id => select.order_by(discussion::Column::Id, order),
        SortField::Date => select
            .order_by(discussion::Column::CreatedAt, order)
            .order_by(discussion::Column::Id, Order::Desc),
    }
}

/// Attach author and bound attachment to each discussion, preserving order.
pub async fn load_views<C: ConnectionTrait>(
    db: &C,
    models: Vec<discussion::Model>,
) -> Result<Vec<DiscussionView>, AppError> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let mut user_ids: Vec<i64> = models.iter().map(|d| d.user_id).collect();
    user_ids.sort_unstable();
    user_ids.dedup();
    let discussion_ids: Vec<i64> = models.iter().map(|d| d.id).collect();

    let authors: HashMap<i64, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut attachments: HashMap<i64, file_attachment::Model> = file_attachment::Entity::find()
        .filter(file_attachment::Column::DiscussionId.is_in(discussion_ids))
        .all(db)
        .await?
        .into_iter()
        .filter_map(|a| a.discussion_id.map(|id| (id, a)))
        .collect();

    models
        .into_iter()
        .map(|d| {
            let author = match authors.get(&d.user_id) {
                Some(author) => author.clone(),
                None => {
                    return Err(AppError::Internal(format!(
                        "discussion {} references missing user {}",
                        d.id, d.user_id
                    )));
                }
            };
            let attachment = attachments.remove(&d.id);
            Ok(DiscussionView::new(d, author, attachment))
        })
        .collect()
}
