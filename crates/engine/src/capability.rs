use chrono::{DateTime, Duration, Utc};
use domain::{Comment, ContextId, SubscriptionStatus, UserId};

use crate::area::AreaOptions;
use crate::permission::{PermissionOracle, PERM_DELETE, PERM_EDIT_ANY, PERM_VIEW};

/// Whether a new comment shows the author's name or a pseudonym.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostMode {
    RealName,
    Pseudonym,
}

impl PostMode {
    pub fn for_pseudonym(pseudonym: Option<&str>) -> Self {
        match pseudonym.map(str::trim) {
            Some(p) if !p.is_empty() => PostMode::Pseudonym,
            _ => PostMode::RealName,
        }
    }
}

/// Answers what one user may do in one section. Never fails; a missing
/// permission is `false`.
pub trait Capability: Send + Sync {
    fn user_id(&self) -> Option<UserId>;
    fn can_view(&self) -> bool;
    fn can_post(&self, mode: PostMode, reply_to: Option<&Comment>) -> bool;
    fn can_edit(&self, comment: &Comment) -> bool;
    fn can_delete(&self, comment: &Comment) -> bool;
    fn can_upvote(&self, comment: &Comment) -> bool;
    fn can_modify_subscription_status(
        &self,
        current: SubscriptionStatus,
        new: SubscriptionStatus,
        comment: Option<&Comment>,
    ) -> bool;
}

/// Permission lookups happen once, at construction.
#[derive(Debug, Clone)]
pub struct StandardCapability {
    user_id: Option<UserId>,
    view: bool,
    edit_any: bool,
    delete: bool,
    options: AreaOptions,
    editing_window: Duration,
    now: DateTime<Utc>,
}

impl StandardCapability {
    pub fn new(
        permissions: &dyn PermissionOracle,
        context_id: ContextId,
        user_id: Option<UserId>,
        options: AreaOptions,
        editing_window: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            view: permissions.has_permission(PERM_VIEW, context_id, user_id),
            edit_any: permissions.has_permission(PERM_EDIT_ANY, context_id, user_id),
            delete: permissions.has_permission(PERM_DELETE, context_id, user_id),
            options,
            editing_window,
            now,
        }
    }

    pub fn options(&self) -> &AreaOptions {
        &self.options
    }
}

impl Capability for StandardCapability {
    fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    fn can_view(&self) -> bool {
        self.view
    }

    fn can_post(&self, mode: PostMode, reply_to: Option<&Comment>) -> bool {
        if !self.view {
            return false;
        }
        let mode_allowed = match mode {
            PostMode::RealName => self.options.allow_realname,
            PostMode::Pseudonym => self.options.allow_pseudonym,
        };
        // 只允许一层回复
        let target_ok = match reply_to {
            None => true,
            Some(target) => self.options.allow_replies && !target.is_reply(),
        };
        mode_allowed && target_ok
    }

    fn can_edit(&self, comment: &Comment) -> bool {
        if !self.view {
            return false;
        }
        let own_and_fresh = match self.user_id {
            Some(user_id) => {
                comment.is_owned_by(user_id) && comment.age(self.now) < self.editing_window
            }
            None => false,
        };
        own_and_fresh || self.edit_any
    }

    fn can_delete(&self, _comment: &Comment) -> bool {
        self.view && self.delete
    }

    fn can_upvote(&self, comment: &Comment) -> bool {
        self.view && self.options.allow_upvotes && comment.user_created_id(true) != self.user_id
    }

    fn can_modify_subscription_status(
        &self,
        _current: SubscriptionStatus,
        _new: SubscriptionStatus,
        _comment: Option<&Comment>,
    ) -> bool {
        self.view && self.options.allow_subscriptions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionTable;
    use domain::{NewComment, SectionKey};

    const AUTHOR: UserId = 5;
    const OTHER: UserId = 6;
    const EDITOR: UserId = 7;

    fn permissions() -> PermissionTable {
        PermissionTable::new()
            .grant_everyone(PERM_VIEW, 1)
            .grant(PERM_EDIT_ANY, 1, EDITOR)
            .grant(PERM_DELETE, 1, EDITOR)
    }

    fn options() -> AreaOptions {
        AreaOptions {
            allow_replies: true,
            allow_pseudonym: true,
            ..AreaOptions::default()
        }
    }

    fn comment(created: DateTime<Utc>, reply_to: Option<i64>, pseudonym: Option<&str>) -> Comment {
        let mut c = Comment::new(
            SectionKey::new("mod_demo", "notes", 1, 42).unwrap(),
            NewComment {
                content: "hello".into(),
                format: 0,
                user_id: AUTHOR,
                pseudonym: pseudonym.map(str::to_string),
                reply_to,
                custom_data_json: String::new(),
            },
            created,
        );
        c.mark_saved(100);
        c
    }

    fn cap(user: Option<UserId>, now: DateTime<Utc>) -> StandardCapability {
        StandardCapability::new(&permissions(), 1, user, options(), Duration::minutes(30), now)
    }

    #[test]
    fn edit_window_applies_to_the_author_only() {
        let created = Utc::now();
        let c = comment(created, None, None);

        let fresh = created + Duration::minutes(29);
        let expired = created + Duration::minutes(31);
        assert!(cap(Some(AUTHOR), fresh).can_edit(&c));
        assert!(!cap(Some(AUTHOR), expired).can_edit(&c));
        assert!(!cap(Some(OTHER), fresh).can_edit(&c));
        assert!(cap(Some(EDITOR), expired + Duration::days(365)).can_edit(&c));
        assert!(!cap(None, fresh).can_edit(&c));
    }

    #[test]
    fn replies_to_replies_are_never_allowed() {
        let now = Utc::now();
        let top = comment(now, None, None);
        let reply = comment(now, Some(99), None);
        let c = cap(Some(OTHER), now);

        assert!(c.can_post(PostMode::RealName, None));
        assert!(c.can_post(PostMode::RealName, Some(&top)));
        assert!(!c.can_post(PostMode::RealName, Some(&reply)));
    }

    #[test]
    fn replies_need_the_area_option() {
        let now = Utc::now();
        let top = comment(now, None, None);
        let c = StandardCapability::new(
            &permissions(),
            1,
            Some(OTHER),
            AreaOptions::default(),
            Duration::minutes(30),
            now,
        );

        assert!(c.can_post(PostMode::RealName, None));
        assert!(!c.can_post(PostMode::RealName, Some(&top)));
        assert!(!c.can_post(PostMode::Pseudonym, None));
    }

    #[test]
    fn nothing_is_allowed_without_view() {
        let now = Utc::now();
        let c = comment(now, None, None);
        let blind = StandardCapability::new(
            &PermissionTable::new().grant(PERM_DELETE, 1, EDITOR),
            1,
            Some(EDITOR),
            options(),
            Duration::minutes(30),
            now,
        );

        assert!(!blind.can_view());
        assert!(!blind.can_post(PostMode::RealName, None));
        assert!(!blind.can_delete(&c));
        assert!(!blind.can_upvote(&c));
        assert!(!blind.can_modify_subscription_status(
            SubscriptionStatus::Off,
            SubscriptionStatus::Immediate,
            None
        ));
    }

    #[test]
    fn authors_cannot_upvote_their_pseudonymous_comments() {
        let now = Utc::now();
        let c = comment(now, None, Some("Anon"));

        assert!(!cap(Some(AUTHOR), now).can_upvote(&c));
        assert!(cap(Some(OTHER), now).can_upvote(&c));
    }

    #[test]
    fn delete_needs_the_delete_permission() {
        let now = Utc::now();
        let c = comment(now, None, None);

        assert!(cap(Some(EDITOR), now).can_delete(&c));
        assert!(!cap(Some(AUTHOR), now).can_delete(&c));
    }

    #[test]
    fn post_mode_follows_the_pseudonym() {
        assert_eq!(PostMode::for_pseudonym(None), PostMode::RealName);
        assert_eq!(PostMode::for_pseudonym(Some("  ")), PostMode::RealName);
        assert_eq!(PostMode::for_pseudonym(Some("Anon")), PostMode::Pseudonym);
    }
}
