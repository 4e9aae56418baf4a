use domain::{Comment, CommentEvent, SubscriptionStatus, UserId};
use std::collections::BTreeMap;
use tracing::info;

use crate::error::EngineResult;
use crate::section::Section;

/// Notification preferences within one section.
///
/// The effective status is the comment-level override if one is stored,
/// else the section-level override, else the section default. `Default` is
/// never stored and never returned as an effective status.
pub struct SubscriptionService<'a> {
    section: &'a Section,
}

impl<'a> SubscriptionService<'a> {
    pub fn new(section: &'a Section) -> Self {
        Self { section }
    }

    pub async fn saved_status(
        &self,
        user_id: UserId,
        comment: Option<&Comment>,
    ) -> EngineResult<Option<SubscriptionStatus>> {
        let comment_id = comment.and_then(Comment::id);
        Ok(self
            .section
            .state()
            .store
            .get_subscription(user_id, self.section.key(), comment_id)
            .await?)
    }

    pub async fn status(&self, user_id: UserId, comment: Option<&Comment>) -> EngineResult<SubscriptionStatus> {
        if comment.is_some() {
            if let Some(status) = self.saved_status(user_id, comment).await? {
                return Ok(status);
            }
        }
        if let Some(status) = self.saved_status(user_id, None).await? {
            return Ok(status);
        }
        Ok(self.section.default_subscription_status(user_id))
    }

    /// `Default` removes the stored override.
    pub async fn update_status(
        &self,
        user_id: UserId,
        comment: Option<&Comment>,
        status: SubscriptionStatus,
    ) -> EngineResult<()> {
        let comment_id = comment.and_then(Comment::id);
        self.section
            .state()
            .store
            .set_subscription(user_id, self.section.key(), comment_id, status)
            .await?;
        info!(
            "User {} subscription for {} (comment {:?}) set to {}",
            user_id,
            self.section.key(),
            comment_id,
            status
        );
        self.section.state().publish(CommentEvent::SubscriptionChanged {
            section: self.section.key().clone(),
            comment_id,
            user_id,
            status,
        });
        Ok(())
    }

    /// Users to notify about activity on the section or one comment, with the
    /// delivery they chose. Only `Immediate` and `DailyDigest` are returned.
    pub async fn subscribed_users(
        &self,
        comment: Option<&Comment>,
    ) -> EngineResult<BTreeMap<UserId, SubscriptionStatus>> {
        let state = self.section.state();
        let key = self.section.key();
        let mut statuses = BTreeMap::new();

        for user_id in self.section.area().handler().auto_subscribed_users(key).await? {
            statuses.insert(user_id, self.section.default_subscription_status(user_id));
        }
        for (user_id, status) in state.store.list_subscriptions(key, None).await? {
            statuses.insert(user_id, status);
        }
        if let Some(comment_id) = comment.and_then(Comment::id) {
            for (user_id, status) in state.store.list_subscriptions(key, Some(comment_id)).await? {
                statuses.insert(user_id, status);
            }
        }

        statuses.retain(|_, status| status.notifies());
        Ok(statuses)
    }

    pub async fn delete_user_subscriptions(&self, user_id: UserId) -> EngineResult<u64> {
        Ok(self
            .section
            .state()
            .store
            .delete_user_subscriptions(user_id)
            .await?)
    }
}
