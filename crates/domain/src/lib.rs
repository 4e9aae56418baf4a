mod comment;
mod commands;
mod error;
mod events;
mod models;
mod query;
mod subscription;

pub use comment::{Comment, CustomData, CustomDataMap, NewComment};
pub use commands::{
    CreateComment, GetCommentSections, GetComments, SetSubscription, UpdateComment, VoteComment,
};
pub use error::DomainError;
pub use events::CommentEvent;
pub use models::{
    validate_name, CommentId, CommentRecord, ContentFormat, ContextId, ItemId, SectionKey,
    UserId, UserRecord, FORMAT_PLAIN,
};
pub use query::{CommentFilter, ItemScope, PageRequest, ParentScope, SortDirection};
pub use subscription::SubscriptionStatus;
