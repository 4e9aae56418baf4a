use domain::{
    Comment, CommentId, ContentFormat, ContextId, CustomDataMap, ItemId, SubscriptionStatus,
    UserId, UserRecord,
};
use serde::Serialize;

use crate::capability::{Capability, PostMode};
use crate::error::EngineResult;
use crate::section::Section;

/// Plain view of a comment as seen by one user.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: CommentId,
    pub context_id: ContextId,
    pub component: String,
    pub comment_area: String,
    pub item_id: ItemId,
    pub content: String,
    pub content_format: ContentFormat,
    pub custom_data: CustomDataMap,
    pub time_created: i64,
    pub time_modified: i64,
    pub user_created_id: Option<UserId>,
    pub user_created_name: String,
    pub user_modified_id: Option<UserId>,
    pub user_modified_name: String,
    pub pseudonym: Option<String>,
    pub reply_to_id: Option<CommentId>,
    pub replies: i64,
    pub upvotes: i64,
    pub user_upvoted: bool,
    pub subscription: SubscriptionStatus,
    pub default_subscription: SubscriptionStatus,
    pub can_reply: bool,
    pub allow_pseudonym_reply: bool,
    pub allow_realname_reply: bool,
    pub can_upvote: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_subscribe_immediate: bool,
    pub can_subscribe_digests: bool,
    pub can_unsubscribe: bool,
    pub is_own: bool,
    pub comment_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub unique_key: String,
    pub context_id: ContextId,
    pub component: String,
    pub comment_area: String,
    pub item_id: ItemId,
    pub item_title: String,
    pub item_url: String,
    pub can_post: bool,
    pub allow_pseudonym: bool,
    pub allow_realname: bool,
    pub subscription: SubscriptionStatus,
    pub default_subscription: SubscriptionStatus,
    pub custom_data: CustomDataMap,
}

/// Author and last modifier, when known.
#[derive(Debug, Clone, Default)]
pub struct CommentPeople {
    pub author: Option<UserRecord>,
    pub modifier: Option<UserRecord>,
}

pub async fn export_comment(
    section: &Section,
    comment: &mut Comment,
    cap: &dyn Capability,
    people: &CommentPeople,
) -> EngineResult<CommentView> {
    let viewer = cap.user_id();
    let id = comment.id().unwrap_or_default();
    let is_own = viewer.map_or(false, |u| comment.is_owned_by(u));
    // 作者本人可以看到自己的身份
    let reveal = is_own;

    let user_created_id = comment.user_created_id(reveal);
    let user_modified_id = comment.user_modified_id(reveal);
    let pseudonym = comment.pseudonym().map(str::to_string);
    let user_created_name = display_name(user_created_id, &people.author, pseudonym.as_deref());
    let user_modified_name = display_name(user_modified_id, &people.modifier, pseudonym.as_deref());

    let data = comment.custom_data()?.clone();
    let comment: &Comment = comment;
    let custom_data = section
        .area()
        .handler()
        .export_custom_data(section.key(), comment, &data, viewer);

    let (user_upvoted, subscription, default_subscription) = match viewer {
        Some(user_id) => (
            section.user_vote(id, user_id).await?,
            section.subscriptions().status(user_id, Some(comment)).await?,
            section.default_subscription_status(user_id),
        ),
        None => (false, SubscriptionStatus::Off, SubscriptionStatus::Off),
    };

    let can_change = |to: SubscriptionStatus| {
        viewer.is_some()
            && subscription != to
            && cap.can_modify_subscription_status(subscription, to, Some(comment))
    };

    let allow_pseudonym_reply = cap.can_post(PostMode::Pseudonym, Some(comment));
    let allow_realname_reply = cap.can_post(PostMode::RealName, Some(comment));

    Ok(CommentView {
        id,
        context_id: section.key().context_id,
        component: section.key().component.clone(),
        comment_area: section.key().area.clone(),
        item_id: section.key().item_id,
        content: comment.content().to_string(),
        content_format: comment.format(),
        custom_data,
        time_created: comment.time_created().timestamp(),
        time_modified: comment.time_modified().timestamp(),
        user_created_id,
        user_created_name,
        user_modified_id,
        user_modified_name,
        pseudonym,
        reply_to_id: comment.reply_to(),
        replies: comment.replies(),
        upvotes: comment.upvotes(),
        user_upvoted,
        subscription,
        default_subscription,
        can_reply: allow_pseudonym_reply || allow_realname_reply,
        allow_pseudonym_reply,
        allow_realname_reply,
        can_upvote: cap.can_upvote(comment),
        can_edit: cap.can_edit(comment),
        can_delete: cap.can_delete(comment),
        can_subscribe_immediate: can_change(SubscriptionStatus::Immediate),
        can_subscribe_digests: can_change(SubscriptionStatus::DailyDigest),
        can_unsubscribe: can_change(SubscriptionStatus::Off),
        is_own,
        comment_url: section.item().comment_url(id),
    })
}

pub async fn export_section(section: &Section, cap: &dyn Capability) -> EngineResult<SectionView> {
    let viewer = cap.user_id();
    let key = section.key();

    let (subscription, default_subscription) = match viewer {
        Some(user_id) => (
            section.subscriptions().status(user_id, None).await?,
            section.default_subscription_status(user_id),
        ),
        None => (SubscriptionStatus::Off, SubscriptionStatus::Off),
    };

    let allow_pseudonym = cap.can_post(PostMode::Pseudonym, None);
    let allow_realname = cap.can_post(PostMode::RealName, None);

    Ok(SectionView {
        unique_key: section.unique_key(),
        context_id: key.context_id,
        component: key.component.clone(),
        comment_area: key.area.clone(),
        item_id: key.item_id,
        item_title: section.item().title(),
        item_url: section.item().url(),
        can_post: allow_pseudonym || allow_realname,
        allow_pseudonym,
        allow_realname,
        subscription,
        default_subscription,
        custom_data: section.area().handler().section_custom_data(key, viewer),
    })
}

// 匿名作者显示化名
fn display_name(id: Option<UserId>, user: &Option<UserRecord>, pseudonym: Option<&str>) -> String {
    match (id, user) {
        (None, _) => pseudonym.unwrap_or_default().to_string(),
        (Some(_), Some(user)) => user.full_name(),
        (Some(id), None) => format!("User {}", id),
    }
}
