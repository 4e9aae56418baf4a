use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::models::{CommentId, ContextId, ItemId};

/// Comments are always ordered by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            other => Err(DomainError::InvalidSortDirection(other.to_string())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemScope {
    All,
    One(ItemId),
    /// An empty list matches nothing.
    AnyOf(Vec<ItemId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentScope {
    Any,
    TopLevel,
    RepliesTo(CommentId),
}

/// Predicate over the comments table. Every part is AND-combined.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentFilter {
    pub component: String,
    pub area: String,
    /// An empty list matches nothing.
    pub context_ids: Vec<ContextId>,
    pub items: ItemScope,
    pub parent: ParentScope,
    pub time_from: Option<DateTime<Utc>>,
    pub time_to: Option<DateTime<Utc>>,
}

impl CommentFilter {
    pub fn area(component: impl Into<String>, area: impl Into<String>, context_id: ContextId) -> Self {
        Self {
            component: component.into(),
            area: area.into(),
            context_ids: vec![context_id],
            items: ItemScope::All,
            parent: ParentScope::Any,
            time_from: None,
            time_to: None,
        }
    }

    pub fn with_items(mut self, items: ItemScope) -> Self {
        self.items = items;
        self
    }

    pub fn with_contexts(mut self, context_ids: Vec<ContextId>) -> Self {
        self.context_ids = context_ids;
        self
    }

    pub fn with_parent(mut self, parent: ParentScope) -> Self {
        self.parent = parent;
        self
    }
}

/// `limit` rows after skipping `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: i64,
}

impl PageRequest {
    /// A non-positive page size means "no limit". An offset past `i64::MAX`
    /// saturates, which selects nothing.
    pub fn from_page(page: i64, page_size: i64) -> Option<Self> {
        if page_size > 0 {
            Some(Self {
                offset: page.max(0).saturating_mul(page_size),
                limit: page_size,
            })
        } else {
            None
        }
    }

    /// Rows skipped before `page`, or `None` when that does not fit an `i64`.
    pub fn checked_offset(page: i64, page_size: i64) -> Option<i64> {
        page.max(0).checked_mul(page_size.max(0))
    }
}
