use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;
/// Largest page index whose row offset still fits a signed 64-bit OFFSET.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PAGE_SIZE;

/// Raw paging parameters as they arrive on the query string.
///
/// Values are signed so out-of-range input can be clamped instead of rejected.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 0-based page index. Negative values clamp to 0, huge ones to the last addressable page.
    pub page: Option<i64>,
    /// Page size. Absent or < 1 defaults to 10; values above 100 clamp to 100.
    pub size: Option<i64>,
    /// `<field>[,asc|desc]` where field is `id` or `date`. Default `id,desc`.
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: SortField::Id,
            direction: SortDirection::Desc,
        }
    }
}

impl Sort {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let mut parts = raw.split(',').map(str::trim);
        let field = match parts.next().unwrap_or_default() {
            "id" => SortField::Id,
            "date" => SortField::Date,
            other => {
                return Err(AppError::Validation(format!(
                    "sort field must be one of: id, date (got '{other}')"
                )));
            }
        };
        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("desc") => SortDirection::Desc,
            Some("asc") => SortDirection::Asc,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "sort direction must be asc or desc (got '{other}')"
                )));
            }
        };
        Ok(Self { field, direction })
    }
}

/// Normalized paging request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
    pub sort: Sort,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: Sort::default(),
        }
    }
}

impl PageRequest {
    /// Rows to skip before this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

impl PageQuery {
    /// Clamp page/size into range and parse the sort spec.
    pub fn normalize(&self) -> Result<PageRequest, AppError> {
        let page = (self.page.unwrap_or(0).max(0) as u64).min(MAX_PAGE);
        let size = match self.size {
            Some(s) if s >= 1 => (s as u64).min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        };
        let sort = match self.sort.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Sort::parse(raw)?,
            _ => Sort::default(),
        };
        Ok(PageRequest { page, size, sort })
    }
}

/// Pagination metadata included in list responses.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (0-based).
    #[schema(example = 0)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 10)]
    pub size: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 5)]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(request: &PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            size: request.size,
            total,
            total_pages: total.div_ceil(request.size),
        }
    }
}

/// Accumulates per-field validation failures.
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, reason: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| reason.into());
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidFields(self.0))
        }
    }
}

/// True if `value` has between `min` and `max` characters (inclusive).
pub fn char_len_between(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    (min..=max).contains(&len)
}
