use serde::Deserialize;

use crate::models::{CommentId, ContentFormat, ContextId, ItemId, FORMAT_PLAIN};

fn default_sort_direction() -> String {
    "DESC".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetComments {
    pub context_id: Option<ContextId>,
    pub component: Option<String>,
    pub comment_area: Option<String>,
    pub item_id: Option<ItemId>,
    pub reply_to_id: Option<CommentId>,
    /// When set, everything else except paging is ignored.
    pub comment_id: Option<CommentId>,
    #[serde(default)]
    pub page: i64,
    /// Falls back to the configured default page size.
    #[serde(default)]
    pub page_size: Option<i64>,
    pub time_from: Option<i64>,
    pub time_to: Option<i64>,
    #[serde(default = "default_sort_direction")]
    pub sort_direction: String,
    #[serde(default)]
    pub include_replies: bool,
    #[serde(default)]
    pub include_child_contexts: bool,
}

impl Default for GetComments {
    fn default() -> Self {
        Self {
            context_id: None,
            component: None,
            comment_area: None,
            item_id: None,
            reply_to_id: None,
            comment_id: None,
            page: 0,
            page_size: None,
            time_from: None,
            time_to: None,
            sort_direction: default_sort_direction(),
            include_replies: false,
            include_child_contexts: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub context_id: ContextId,
    pub component: String,
    pub comment_area: String,
    pub item_id: ItemId,
    pub content: String,
    #[serde(default = "plain_format")]
    pub content_format: ContentFormat,
    #[serde(default)]
    pub pseudonym: String,
    pub reply_to_id: Option<CommentId>,
    #[serde(default)]
    pub custom_data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateComment {
    pub id: CommentId,
    pub context_id: ContextId,
    pub component: String,
    pub comment_area: String,
    pub item_id: ItemId,
    pub content: String,
    #[serde(default = "plain_format")]
    pub content_format: ContentFormat,
    #[serde(default)]
    pub pseudonym: String,
    #[serde(default)]
    pub custom_data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetCommentSections {
    pub context_id: ContextId,
    pub component: String,
    pub comment_area: String,
    pub item_id: Option<ItemId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetSubscription {
    pub context_id: ContextId,
    pub component: String,
    pub comment_area: String,
    pub item_id: ItemId,
    pub comment_id: Option<CommentId>,
    /// One of `default`, `off`, `immediate`, `digests`.
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteComment {
    pub context_id: ContextId,
    pub component: String,
    pub comment_area: String,
    pub item_id: ItemId,
    pub comment_id: CommentId,
    pub upvote: bool,
}

fn plain_format() -> ContentFormat {
    FORMAT_PLAIN
}
