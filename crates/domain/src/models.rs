use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

pub type CommentId = i64;
pub type UserId = i64;
pub type ContextId = i64;
pub type ItemId = i64;

/// Text format of a comment's content, as understood by the host's renderer.
pub type ContentFormat = i32;

pub const FORMAT_PLAIN: ContentFormat = 0;

/// Identifies one comment section: (component, area, context, item).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionKey {
    pub component: String,
    pub area: String,
    pub context_id: ContextId,
    pub item_id: ItemId,
}

impl SectionKey {
    pub fn new(
        component: impl Into<String>,
        area: impl Into<String>,
        context_id: ContextId,
        item_id: ItemId,
    ) -> Result<Self, DomainError> {
        let component = component.into();
        let area = area.into();
        validate_name(&component)?;
        validate_name(&area)?;
        Ok(Self {
            component,
            area,
            context_id,
            item_id,
        })
    }

    pub fn new_unchecked(component: String, area: String, context_id: ContextId, item_id: ItemId) -> Self {
        Self {
            component,
            area,
            context_id,
            item_id,
        }
    }

    /// `component_area_contextid_itemid`
    pub fn unique_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.component, self.area, self.context_id, self.item_id
        )
    }
}

/// Component and area names: lowercase ascii, digits and underscores, starting with a letter.
pub fn validate_name(name: &str) -> Result<(), DomainError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            first.is_ascii_lowercase()
                && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        None => false,
    };
    if !valid || name.len() > 100 {
        return Err(DomainError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// A user as known to the host's account system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// One row of the comments table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub context_id: ContextId,
    pub component: String,
    pub area: String,
    pub item_id: ItemId,
    pub content: String,
    pub format: ContentFormat,
    pub user_id: UserId,
    pub user_modified: UserId,
    pub pseudonym: Option<String>,
    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
    pub reply_to_id: Option<CommentId>,
    pub replies: i64,
    pub upvotes: i64,
    pub custom_data: String,
}

impl CommentRecord {
    pub fn section_key(&self) -> SectionKey {
        SectionKey::new_unchecked(
            self.component.clone(),
            self.area.clone(),
            self.context_id,
            self.item_id,
        )
    }
}
