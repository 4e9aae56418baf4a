use crate::models::{CommentId, SectionKey, UserId};
use crate::subscription::SubscriptionStatus;
use serde::{Deserialize, Serialize};

/// Published after a change has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommentEvent {
    CommentCreated {
        section: SectionKey,
        comment_id: CommentId,
        reply_to: Option<CommentId>,
        user_id: UserId,
    },
    CommentUpdated {
        section: SectionKey,
        comment_id: CommentId,
        user_id: UserId,
    },
    CommentDeleted {
        section: SectionKey,
        comment_id: CommentId,
    },
    VoteChanged {
        section: SectionKey,
        comment_id: CommentId,
        user_id: UserId,
        upvoted: bool,
    },
    SubscriptionChanged {
        section: SectionKey,
        comment_id: Option<CommentId>,
        user_id: UserId,
        status: SubscriptionStatus,
    },
}
