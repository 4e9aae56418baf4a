use chrono::Utc;
use domain::{
    Comment, CommentEvent, CommentFilter, CommentId, CommentRecord, ItemScope, NewComment,
    ParentScope, SectionKey, SubscriptionStatus, UserId,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::area::{Area, AreaOptions, SectionItem};
use crate::capability::{Capability, StandardCapability};
use crate::error::{EngineError, EngineResult, FieldErrors};
use crate::search::{CommentSearch, SearchParams, Viewer};
use crate::state::EngineState;
use crate::subscription::SubscriptionService;

/// The comments attached to one item of an area.
#[derive(Clone)]
pub struct Section {
    area: Area,
    key: SectionKey,
    item: Arc<dyn SectionItem>,
}

impl Section {
    pub(crate) fn new(area: Area, key: SectionKey, item: Arc<dyn SectionItem>) -> Self {
        Self { area, key, item }
    }

    pub fn key(&self) -> &SectionKey {
        &self.key
    }

    pub fn unique_key(&self) -> String {
        self.key.unique_key()
    }

    pub fn area(&self) -> &Area {
        &self.area
    }

    pub fn item(&self) -> &Arc<dyn SectionItem> {
        &self.item
    }

    pub fn options(&self) -> &AreaOptions {
        self.area.options()
    }

    pub(crate) fn state(&self) -> &EngineState {
        self.area.state()
    }

    pub fn capability(&self, user_id: Option<UserId>) -> Arc<dyn Capability> {
        let state = self.state();
        let standard = StandardCapability::new(
            state.permissions.as_ref(),
            self.key.context_id,
            user_id,
            *self.options(),
            state.settings.comments.editing_window(),
            Utc::now(),
        );
        self.area.handler().capability(&self.key, standard)
    }

    /// `None` also when the comment exists in another section.
    pub async fn get_comment(&self, id: CommentId) -> EngineResult<Option<Comment>> {
        let record = self.state().store.get_comment(id).await?;
        Ok(record
            .filter(|r| r.section_key() == self.key)
            .map(Comment::from_record))
    }

    pub fn get_comments(&self, params: SearchParams, viewer: Viewer) -> CommentSearch {
        CommentSearch::for_section(self.clone(), params, viewer)
    }

    /// Top-level comments, or the replies of `reply_to`.
    pub async fn count_comments(&self, reply_to: Option<CommentId>) -> EngineResult<u64> {
        let parent = match reply_to {
            Some(id) => ParentScope::RepliesTo(id),
            None => ParentScope::TopLevel,
        };
        let filter = self.filter().with_parent(parent);
        Ok(self.state().store.count_comments(&filter).await?)
    }

    pub fn construct_new_comment(&self, new: NewComment) -> Comment {
        Comment::new(self.key.clone(), new, Utc::now())
    }

    pub fn construct_comment_from_db(&self, record: CommentRecord) -> Comment {
        Comment::from_record(record)
    }

    /// Runs the three validation hooks. Pseudonym validation is skipped when
    /// the comment has no pseudonym.
    pub fn validate_comment(&self, comment: &mut Comment, cap: &dyn Capability) -> Result<(), FieldErrors> {
        let handler = self.area.handler();
        let mut errors = FieldErrors::new();

        if let Err(e) = handler.validate_comment_content(&self.key, comment.content(), comment.format(), cap) {
            errors.extend(e);
        }

        if let Some(pseudonym) = comment.pseudonym() {
            if let Err(e) = handler.validate_comment_pseudonym(&self.key, pseudonym, cap) {
                errors.extend(e);
            }
        }

        let data = match comment.custom_data() {
            Ok(data) => Some(data.clone()),
            Err(e) => {
                errors.insert("custom_data".to_string(), e.to_string());
                None
            }
        };
        if let Some(data) = data {
            if let Err(e) = handler.validate_comment_custom_data(&self.key, comment, &data, cap) {
                errors.extend(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn modify_comment_before_save(&self, comment: &mut Comment, cap: &dyn Capability) {
        self.area.handler().modify_comment_before_save(&self.key, comment, cap);
    }

    /// Inserts a new comment or updates the mutable fields of an existing one.
    pub async fn save_comment(&self, comment: &mut Comment) -> EngineResult<CommentId> {
        if comment.section() != &self.key {
            return Err(EngineError::InvalidInput(format!(
                "comment belongs to section {}, not {}",
                comment.section(),
                self.key
            )));
        }

        let record = comment.to_record()?;
        let user_id = record.user_modified;

        match comment.id() {
            Some(id) => {
                if !self.state().store.update_comment(&record).await? {
                    return Err(EngineError::CommentNotFound(id));
                }
                info!("Updated comment {} in {}", id, self.key);
                self.state().publish(CommentEvent::CommentUpdated {
                    section: self.key.clone(),
                    comment_id: id,
                    user_id,
                });
                Ok(id)
            }
            None => {
                if let Some(target_id) = comment.reply_to() {
                    let target = self
                        .get_comment(target_id)
                        .await?
                        .ok_or(EngineError::CommentNotFound(target_id))?;
                    if target.is_reply() {
                        return Err(EngineError::InvalidInput(format!(
                            "comment {} is a reply and cannot be replied to",
                            target_id
                        )));
                    }
                }

                let id = self.state().store.insert_comment(&record).await?;
                comment.mark_saved(id);
                info!("Created comment {} in {}", id, self.key);
                self.state().publish(CommentEvent::CommentCreated {
                    section: self.key.clone(),
                    comment_id: id,
                    reply_to: comment.reply_to(),
                    user_id,
                });
                Ok(id)
            }
        }
    }

    /// Removes the comment with its direct replies. Returns the number of
    /// comments removed.
    pub async fn delete_comment(&self, comment: &Comment) -> EngineResult<u64> {
        let Some(id) = comment.id() else {
            return Ok(0);
        };
        let deleted = self
            .state()
            .store
            .delete_comment(id, comment.reply_to())
            .await?;
        info!("Deleted comment {} ({} rows) in {}", id, deleted, self.key);
        if deleted > 0 {
            self.state().publish(CommentEvent::CommentDeleted {
                section: self.key.clone(),
                comment_id: id,
            });
        }
        Ok(deleted)
    }

    pub async fn delete_all(&self) -> EngineResult<u64> {
        let deleted = self
            .state()
            .store
            .delete_comments_matching(&self.filter())
            .await?;
        info!("Deleted {} comments in {}", deleted, self.key);
        Ok(deleted)
    }

    /// Sets the user's vote and keeps `comment`'s counter in step. Returns
    /// false when the vote was already in that state.
    pub async fn update_vote(&self, comment: &mut Comment, user_id: UserId, upvote: bool) -> EngineResult<bool> {
        let Some(id) = comment.id() else {
            return Err(EngineError::InvalidInput("comment is not saved".to_string()));
        };
        let changed = self.state().store.set_vote(id, user_id, upvote).await?;
        if changed {
            comment.increment_upvotes(if upvote { 1 } else { -1 });
            debug!("User {} set vote {} on comment {}", user_id, upvote, id);
            self.state().publish(CommentEvent::VoteChanged {
                section: self.key.clone(),
                comment_id: id,
                user_id,
                upvoted: upvote,
            });
        }
        Ok(changed)
    }

    pub async fn user_vote(&self, comment_id: CommentId, user_id: UserId) -> EngineResult<bool> {
        Ok(self.state().store.has_vote(comment_id, user_id).await?)
    }

    /// Never `Default`; a handler returning it is read as `Off`.
    pub fn default_subscription_status(&self, user_id: UserId) -> SubscriptionStatus {
        match self
            .area
            .handler()
            .default_subscription_status(&self.key, user_id)
        {
            SubscriptionStatus::Default => SubscriptionStatus::Off,
            status => status,
        }
    }

    pub fn subscriptions(&self) -> SubscriptionService<'_> {
        SubscriptionService::new(self)
    }

    pub(crate) fn filter(&self) -> CommentFilter {
        CommentFilter::area(self.key.component.clone(), self.key.area.clone(), self.key.context_id)
            .with_items(ItemScope::One(self.key.item_id))
    }
}
