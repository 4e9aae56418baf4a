use anyhow::Result;
use async_trait::async_trait;
use domain::{
    CommentFilter, CommentId, CommentRecord, ContextId, PageRequest, SectionKey, SortDirection,
    SubscriptionStatus, UserId, UserRecord,
};

use crate::Db;

/// Persistence seam for the comments engine. `Db` is the SQLite
/// implementation; tests wrap it to observe traffic.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(&self, record: &CommentRecord) -> Result<CommentId>;
    async fn update_comment(&self, record: &CommentRecord) -> Result<bool>;
    async fn delete_comment(&self, id: CommentId, reply_to: Option<CommentId>) -> Result<u64>;
    async fn get_comment(&self, id: CommentId) -> Result<Option<CommentRecord>>;
    async fn get_comments_by_ids(&self, ids: &[CommentId]) -> Result<Vec<CommentRecord>>;
    async fn find_comments(
        &self,
        filter: &CommentFilter,
        sort: SortDirection,
        page: Option<PageRequest>,
    ) -> Result<Vec<CommentRecord>>;
    async fn count_comments(&self, filter: &CommentFilter) -> Result<u64>;
    async fn delete_comments_matching(&self, filter: &CommentFilter) -> Result<u64>;
    async fn delete_component_comments(&self, component: &str) -> Result<u64>;
    async fn delete_context_comments(&self, context_ids: &[ContextId]) -> Result<u64>;

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>>;
    async fn upsert_user(&self, user: &UserRecord) -> Result<()>;

    async fn set_vote(&self, comment_id: CommentId, user_id: UserId, upvote: bool) -> Result<bool>;
    async fn has_vote(&self, comment_id: CommentId, user_id: UserId) -> Result<bool>;
    async fn delete_user_votes(&self, user_id: UserId) -> Result<u64>;

    async fn get_subscription(
        &self,
        user_id: UserId,
        key: &SectionKey,
        comment_id: Option<CommentId>,
    ) -> Result<Option<SubscriptionStatus>>;
    async fn set_subscription(
        &self,
        user_id: UserId,
        key: &SectionKey,
        comment_id: Option<CommentId>,
        status: SubscriptionStatus,
    ) -> Result<()>;
    async fn list_subscriptions(
        &self,
        key: &SectionKey,
        comment_id: Option<CommentId>,
    ) -> Result<Vec<(UserId, SubscriptionStatus)>>;
    async fn delete_user_subscriptions(&self, user_id: UserId) -> Result<u64>;
}

#[async_trait]
impl CommentStore for Db {
    async fn insert_comment(&self, record: &CommentRecord) -> Result<CommentId> {
        Db::insert_comment(self, record).await
    }

    async fn update_comment(&self, record: &CommentRecord) -> Result<bool> {
        Db::update_comment(self, record).await
    }

    async fn delete_comment(&self, id: CommentId, reply_to: Option<CommentId>) -> Result<u64> {
        Db::delete_comment(self, id, reply_to).await
    }

    async fn get_comment(&self, id: CommentId) -> Result<Option<CommentRecord>> {
        Db::get_comment(self, id).await
    }

    async fn get_comments_by_ids(&self, ids: &[CommentId]) -> Result<Vec<CommentRecord>> {
        Db::get_comments_by_ids(self, ids).await
    }

    async fn find_comments(
        &self,
        filter: &CommentFilter,
        sort: SortDirection,
        page: Option<PageRequest>,
    ) -> Result<Vec<CommentRecord>> {
        Db::find_comments(self, filter, sort, page).await
    }

    async fn count_comments(&self, filter: &CommentFilter) -> Result<u64> {
        Db::count_comments(self, filter).await
    }

    async fn delete_comments_matching(&self, filter: &CommentFilter) -> Result<u64> {
        Db::delete_comments_matching(self, filter).await
    }

    async fn delete_component_comments(&self, component: &str) -> Result<u64> {
        Db::delete_component_comments(self, component).await
    }

    async fn delete_context_comments(&self, context_ids: &[ContextId]) -> Result<u64> {
        Db::delete_context_comments(self, context_ids).await
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>> {
        Db::get_users(self, ids).await
    }

    async fn upsert_user(&self, user: &UserRecord) -> Result<()> {
        Db::upsert_user(self, user).await
    }

    async fn set_vote(&self, comment_id: CommentId, user_id: UserId, upvote: bool) -> Result<bool> {
        Db::set_vote(self, comment_id, user_id, upvote).await
    }

    async fn has_vote(&self, comment_id: CommentId, user_id: UserId) -> Result<bool> {
        Db::has_vote(self, comment_id, user_id).await
    }

    async fn delete_user_votes(&self, user_id: UserId) -> Result<u64> {
        Db::delete_user_votes(self, user_id).await
    }

    async fn get_subscription(
        &self,
        user_id: UserId,
        key: &SectionKey,
        comment_id: Option<CommentId>,
    ) -> Result<Option<SubscriptionStatus>> {
        Db::get_subscription(self, user_id, key, comment_id).await
    }

    async fn set_subscription(
        &self,
        user_id: UserId,
        key: &SectionKey,
        comment_id: Option<CommentId>,
        status: SubscriptionStatus,
    ) -> Result<()> {
        Db::set_subscription(self, user_id, key, comment_id, status).await
    }

    async fn list_subscriptions(
        &self,
        key: &SectionKey,
        comment_id: Option<CommentId>,
    ) -> Result<Vec<(UserId, SubscriptionStatus)>> {
        Db::list_subscriptions(self, key, comment_id).await
    }

    async fn delete_user_subscriptions(&self, user_id: UserId) -> Result<u64> {
        Db::delete_user_subscriptions(self, user_id).await
    }
}
