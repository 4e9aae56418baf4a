use chrono::{DateTime, Utc};
use domain::{
    Comment, CommentId, CreateComment, GetCommentSections, GetComments, NewComment, PageRequest,
    SetSubscription, SortDirection, SubscriptionStatus, UpdateComment, UserId, UserRecord,
    VoteComment,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::capability::{Capability, PostMode};
use crate::error::{EngineError, EngineResult};
use crate::export::{export_comment, export_section, CommentPeople, CommentView, SectionView};
use crate::manager::CommentsManager;
use crate::search::{CommentSearch, SearchParams, Viewer};
use crate::section::Section;

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct CommentsPage {
    pub comments: Vec<CommentView>,
    /// All matching comments including replies, across pages.
    pub total_count: u64,
    pub sections: Vec<SectionView>,
    pub per_page: i64,
    pub can_post: bool,
}

// 已通过校验、等待保存的评论
struct Pending {
    section: Section,
    cap: Arc<dyn Capability>,
    comment: Comment,
}

/// Caller-facing operations. Every call names the acting user; `None` is a
/// guest. Batches are checked in full before anything is written.
#[derive(Clone)]
pub struct CommentsApi {
    manager: Arc<CommentsManager>,
}

impl CommentsApi {
    pub fn new(manager: Arc<CommentsManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &CommentsManager {
        &self.manager
    }

    pub async fn get_comments(&self, user: Option<UserId>, req: GetComments) -> EngineResult<CommentsPage> {
        let settings = &self.manager.state().settings.comments;
        let sort: SortDirection = req.sort_direction.to_uppercase().parse()?;
        let page_size = req.page_size.unwrap_or(settings.default_page_size);
        if page_size > settings.max_page_size {
            return Err(EngineError::PageSizeTooLarge {
                requested: page_size,
                max: settings.max_page_size,
            });
        }

        if PageRequest::checked_offset(req.page, page_size).is_none() {
            return Err(EngineError::InvalidInput(format!(
                "page {} of size {} is out of range",
                req.page, page_size
            )));
        }
        let time_from = timestamp("time_from", req.time_from)?;
        let time_to = timestamp("time_to", req.time_to)?;

        let mut params = SearchParams::default()
            .paged(req.page, page_size)
            .sorted(sort)
            .with_replies(req.include_replies)
            .with_child_contexts(req.include_child_contexts)
            .between(time_from, time_to);
        if let Some(reply_to) = req.reply_to_id {
            params = params.replies_to(reply_to);
        }
        let viewer = Viewer::from(user);

        let mut search = match req.comment_id {
            Some(id) => {
                let (section, _) = self
                    .manager
                    .comment(id)
                    .await?
                    .ok_or(EngineError::CommentNotFound(id))?;
                section.get_comments(params.only(id), viewer)
            }
            None => {
                let (Some(component), Some(area), Some(context_id)) =
                    (req.component, req.comment_area, req.context_id)
                else {
                    return Err(EngineError::InvalidInput(
                        "component, comment_area and context_id are required".to_string(),
                    ));
                };
                let area = self.manager.area(&component, &area, context_id)?;
                match req.item_id {
                    Some(item_id) => area.section(item_id).await?.get_comments(params, viewer),
                    None => area.comments(params, viewer),
                }
            }
        };

        let comments = search.all().await?.to_vec();
        let total_count = search.count_total(true).await?;

        let mut caps: HashMap<String, Arc<dyn Capability>> = HashMap::new();
        let mut views = Vec::with_capacity(comments.len());
        for mut comment in comments {
            let Some(section) = search.section_of(&comment).cloned() else {
                continue;
            };
            let cap = caps
                .entry(section.unique_key())
                .or_insert_with(|| section.capability(user))
                .clone();
            let people = CommentPeople {
                author: person(&mut search, comment.user_created_id(true)).await?,
                modifier: person(&mut search, comment.user_modified_id(true)).await?,
            };
            views.push(export_comment(&section, &mut comment, cap.as_ref(), &people).await?);
        }

        let sections = match search.section() {
            Some(section) => vec![section.clone()],
            None => search.result_sections(),
        };
        let mut section_views = Vec::with_capacity(sections.len());
        for section in &sections {
            let cap = section.capability(user);
            section_views.push(export_section(section, cap.as_ref()).await?);
        }
        let can_post = search.section().is_some() && section_views.first().map_or(false, |s| s.can_post);

        Ok(CommentsPage {
            comments: views,
            total_count,
            sections: section_views,
            per_page: page_size,
            can_post,
        })
    }

    pub async fn create_comments(
        &self,
        user: Option<UserId>,
        batch: Vec<CreateComment>,
    ) -> EngineResult<Vec<CommentView>> {
        self.ensure_enabled()?;
        let user_id = require_user(user, "post comments")?;

        let size = batch.len();
        let pending = match self.prepare_new(user_id, batch).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!("Rejected batch of {} new comments from user {}: {}", size, user_id, e);
                return Err(e);
            }
        };

        let me = self.users(&[user_id]).await?;
        let people = CommentPeople {
            author: me.get(&user_id).cloned(),
            modifier: me.get(&user_id).cloned(),
        };
        let mut views = Vec::with_capacity(pending.len());
        for Pending { section, cap, mut comment } in pending {
            section.save_comment(&mut comment).await?;
            views.push(export_comment(&section, &mut comment, cap.as_ref(), &people).await?);
        }
        info!("User {} created {} comments", user_id, views.len());
        Ok(views)
    }

    pub async fn update_comments(
        &self,
        user: Option<UserId>,
        batch: Vec<UpdateComment>,
    ) -> EngineResult<Vec<CommentView>> {
        self.ensure_enabled()?;
        let user_id = require_user(user, "edit comments")?;

        let size = batch.len();
        let pending = match self.prepare_updates(user_id, batch).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!("Rejected batch of {} comment edits from user {}: {}", size, user_id, e);
                return Err(e);
            }
        };

        let ids: Vec<UserId> = pending
            .iter()
            .flat_map(|p| [p.comment.user_created_id(true), Some(user_id)])
            .flatten()
            .collect();
        let users = self.users(&ids).await?;

        let mut views = Vec::with_capacity(pending.len());
        for Pending { section, cap, mut comment } in pending {
            section.save_comment(&mut comment).await?;
            let people = CommentPeople {
                author: comment.user_created_id(true).and_then(|id| users.get(&id).cloned()),
                modifier: users.get(&user_id).cloned(),
            };
            views.push(export_comment(&section, &mut comment, cap.as_ref(), &people).await?);
        }
        Ok(views)
    }

    /// Deletes every listed comment with its replies, or nothing at all.
    pub async fn delete_comments(&self, user: Option<UserId>, ids: Vec<CommentId>) -> EngineResult<u64> {
        self.ensure_enabled()?;
        let user_id = require_user(user, "delete comments")?;

        let records = self.manager.state().store.get_comments_by_ids(&ids).await?;
        let found: HashSet<CommentId> = records.iter().map(|r| r.id).collect();
        let mut missing: Vec<CommentId> = ids.iter().copied().filter(|id| !found.contains(id)).collect();
        missing.dedup();
        if !missing.is_empty() {
            warn!("Rejected deletion by user {}: missing comments {:?}", user_id, missing);
            return Err(EngineError::MissingComments(missing));
        }

        let mut targets = Vec::with_capacity(records.len());
        for record in records {
            let section = self
                .manager
                .area(&record.component, &record.area, record.context_id)?
                .section(record.item_id)
                .await?;
            let comment = section.construct_comment_from_db(record);
            if !section.capability(Some(user_id)).can_delete(&comment) {
                warn!("Rejected deletion by user {}: no permission", user_id);
                return Err(EngineError::PermissionDenied(format!(
                    "cannot delete comment {}",
                    comment.id().unwrap_or_default()
                )));
            }
            targets.push((section, comment));
        }

        let mut deleted = 0;
        for (section, comment) in targets {
            deleted += section.delete_comment(&comment).await?;
        }
        info!("User {} deleted {} comments", user_id, deleted);
        Ok(deleted)
    }

    /// The section of one item; empty without an item or view access.
    pub async fn get_comment_sections(
        &self,
        user: Option<UserId>,
        req: GetCommentSections,
    ) -> EngineResult<Vec<SectionView>> {
        let Some(item_id) = req.item_id else {
            return Ok(Vec::new());
        };
        let section = self
            .manager
            .area(&req.component, &req.comment_area, req.context_id)?
            .section(item_id)
            .await?;
        let cap = section.capability(user);
        if !cap.can_view() {
            return Ok(Vec::new());
        }
        Ok(vec![export_section(&section, cap.as_ref()).await?])
    }

    /// Returns the effective status after the change.
    pub async fn set_subscription(
        &self,
        user: Option<UserId>,
        req: SetSubscription,
    ) -> EngineResult<SubscriptionStatus> {
        self.ensure_enabled()?;
        let user_id = require_user(user, "subscribe")?;
        let status: SubscriptionStatus = req.status.parse()?;

        let section = self
            .manager
            .area(&req.component, &req.comment_area, req.context_id)?
            .section(req.item_id)
            .await?;
        let comment = match req.comment_id {
            Some(id) => Some(
                section
                    .get_comment(id)
                    .await?
                    .ok_or(EngineError::CommentNotFound(id))?,
            ),
            None => None,
        };

        let service = section.subscriptions();
        let current = service.status(user_id, comment.as_ref()).await?;
        if !section
            .capability(Some(user_id))
            .can_modify_subscription_status(current, status, comment.as_ref())
        {
            return Err(EngineError::PermissionDenied(format!(
                "cannot change subscriptions in {}",
                section.key()
            )));
        }

        service.update_status(user_id, comment.as_ref(), status).await?;
        service.status(user_id, comment.as_ref()).await
    }

    /// Returns the comment's upvote count after the change.
    pub async fn vote(&self, user: Option<UserId>, req: VoteComment) -> EngineResult<i64> {
        self.ensure_enabled()?;
        let user_id = require_user(user, "vote")?;

        let section = self
            .manager
            .area(&req.component, &req.comment_area, req.context_id)?
            .section(req.item_id)
            .await?;
        let mut comment = section
            .get_comment(req.comment_id)
            .await?
            .ok_or(EngineError::CommentNotFound(req.comment_id))?;

        if !section.capability(Some(user_id)).can_upvote(&comment) {
            return Err(EngineError::PermissionDenied(format!(
                "cannot vote on comment {}",
                req.comment_id
            )));
        }

        section.update_vote(&mut comment, user_id, req.upvote).await?;
        Ok(comment.upvotes())
    }

    async fn prepare_new(&self, user_id: UserId, batch: Vec<CreateComment>) -> EngineResult<Vec<Pending>> {
        let mut pending = Vec::with_capacity(batch.len());
        for req in batch {
            let section = self
                .manager
                .area(&req.component, &req.comment_area, req.context_id)?
                .section(req.item_id)
                .await?;
            let cap = section.capability(Some(user_id));

            let target = match req.reply_to_id {
                Some(id) => Some(
                    section
                        .get_comment(id)
                        .await?
                        .ok_or(EngineError::CommentNotFound(id))?,
                ),
                None => None,
            };

            let pseudonym = Some(req.pseudonym.trim())
                .filter(|p| !p.is_empty())
                .map(str::to_string);
            let mode = PostMode::for_pseudonym(pseudonym.as_deref());
            if !cap.can_post(mode, target.as_ref()) {
                return Err(EngineError::PermissionDenied(format!(
                    "cannot post in {}",
                    section.key()
                )));
            }

            let mut comment = section.construct_new_comment(NewComment {
                content: req.content,
                format: req.content_format,
                user_id,
                pseudonym,
                reply_to: req.reply_to_id,
                custom_data_json: req.custom_data,
            });
            section
                .validate_comment(&mut comment, cap.as_ref())
                .map_err(|errors| EngineError::Validation {
                    comment_id: None,
                    errors,
                })?;
            section.modify_comment_before_save(&mut comment, cap.as_ref());

            pending.push(Pending { section, cap, comment });
        }
        Ok(pending)
    }

    async fn prepare_updates(&self, user_id: UserId, batch: Vec<UpdateComment>) -> EngineResult<Vec<Pending>> {
        let mut pending = Vec::with_capacity(batch.len());
        for req in batch {
            let section = self
                .manager
                .area(&req.component, &req.comment_area, req.context_id)?
                .section(req.item_id)
                .await?;
            let mut comment = section
                .get_comment(req.id)
                .await?
                .ok_or(EngineError::CommentNotFound(req.id))?;

            let cap = section.capability(Some(user_id));
            if !cap.can_edit(&comment) {
                return Err(EngineError::PermissionDenied(format!(
                    "cannot edit comment {}",
                    req.id
                )));
            }

            let wants_pseudonym = !req.pseudonym.trim().is_empty();
            if wants_pseudonym
                && !comment.is_pseudonymous_author()
                && !cap.can_post(PostMode::Pseudonym, None)
            {
                return Err(EngineError::validation(
                    Some(req.id),
                    "pseudonym",
                    "pseudonyms are not allowed here",
                ));
            }

            comment.set_content(req.content, req.content_format);
            comment
                .set_pseudonym(&req.pseudonym)
                .map_err(|e| EngineError::validation(Some(req.id), "pseudonym", e.to_string()))?;
            comment.set_custom_data_json(req.custom_data);
            comment.update_time_user(user_id, None);

            section
                .validate_comment(&mut comment, cap.as_ref())
                .map_err(|errors| EngineError::Validation {
                    comment_id: Some(req.id),
                    errors,
                })?;
            section.modify_comment_before_save(&mut comment, cap.as_ref());

            pending.push(Pending { section, cap, comment });
        }
        Ok(pending)
    }

    fn ensure_enabled(&self) -> EngineResult<()> {
        if self.manager.state().settings.comments.enabled {
            Ok(())
        } else {
            Err(EngineError::CommentsDisabled)
        }
    }

    async fn users(&self, ids: &[UserId]) -> EngineResult<HashMap<UserId, UserRecord>> {
        let users = self.manager.state().store.get_users(ids).await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }
}

fn require_user(user: Option<UserId>, action: &str) -> EngineResult<UserId> {
    user.ok_or_else(|| EngineError::PermissionDenied(format!("guests cannot {}", action)))
}

async fn person(search: &mut CommentSearch, id: Option<UserId>) -> EngineResult<Option<UserRecord>> {
    match id {
        Some(id) => Ok(search.user(id).await?.cloned()),
        None => Ok(None),
    }
}

// 超出可表示范围的时间视为非法输入
fn timestamp(field: &str, secs: Option<i64>) -> EngineResult<Option<DateTime<Utc>>> {
    match secs {
        None => Ok(None),
        Some(s) => DateTime::from_timestamp(s, 0)
            .map(Some)
            .ok_or_else(|| EngineError::validation(None, field, "timestamp out of range")),
    }
}
