#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Comment, CommentEvent, CommentFilter, CommentId, CommentRecord, ContentFormat, ContextId,
    CreateComment, CustomDataMap, ItemId, PageRequest, SectionKey, SortDirection,
    SubscriptionStatus, UserId, UserRecord,
};
use engine::{
    AreaHandler, AreaOptions, AreaVisibility, Capability, CommentView, CommentsApi,
    CommentsManager, EngineState, FieldErrors, PermissionTable, PlainItem, Section, SectionItem,
    Settings, PERM_DELETE, PERM_EDIT_ANY, PERM_VIEW,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use storage::{CommentStore, Db};
use tokio::sync::broadcast;

pub const CTX: ContextId = 1;
// 没有查看权限的上下文
pub const HIDDEN_CTX: ContextId = 2;
pub const CHILD_CTX: ContextId = 3;

pub const ALICE: UserId = 10;
pub const BOB: UserId = 11;
pub const MODERATOR: UserId = 12;

pub const COMPONENT: &str = "mod_demo";
pub const AREA: &str = "notes";

pub const SETTINGS: &str = r#"
[comments]
max_page_size = 100

[areas.mod_demo.notes]
allow_replies = true
allow_pseudonym = true
"#;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Notes of a demo module: every item is a note with a fixed URL.
#[derive(Clone)]
pub struct DemoHandler {
    pub visibility: AreaVisibility,
    pub children: Vec<ContextId>,
    pub auto_subscribed: Vec<UserId>,
}

impl Default for DemoHandler {
    fn default() -> Self {
        Self {
            visibility: AreaVisibility::All,
            children: Vec::new(),
            auto_subscribed: Vec::new(),
        }
    }
}

#[async_trait]
impl AreaHandler for DemoHandler {
    async fn section_item(&self, key: &SectionKey) -> Result<Arc<dyn SectionItem>> {
        Ok(Arc::new(PlainItem {
            title: format!("Note {}", key.item_id),
            url: format!("https://example.test/notes/{}", key.item_id),
        }))
    }

    fn validate_comment_content(
        &self,
        _key: &SectionKey,
        content: &str,
        _format: ContentFormat,
        _cap: &dyn Capability,
    ) -> Result<(), FieldErrors> {
        if content.trim().is_empty() {
            let mut errors = FieldErrors::new();
            errors.insert("content".into(), "required".into());
            return Err(errors);
        }
        Ok(())
    }

    fn validate_comment_custom_data(
        &self,
        _key: &SectionKey,
        _comment: &Comment,
        data: &CustomDataMap,
        _cap: &dyn Capability,
    ) -> Result<(), FieldErrors> {
        match data.get("mood") {
            Some(mood) if !mood.is_string() => {
                let mut errors = FieldErrors::new();
                errors.insert("mood".into(), "must be text".into());
                Err(errors)
            }
            _ => Ok(()),
        }
    }

    fn default_subscription_status(&self, _key: &SectionKey, user_id: UserId) -> SubscriptionStatus {
        if self.auto_subscribed.contains(&user_id) {
            SubscriptionStatus::Immediate
        } else {
            SubscriptionStatus::Off
        }
    }

    async fn auto_subscribed_users(&self, _key: &SectionKey) -> Result<Vec<UserId>> {
        Ok(self.auto_subscribed.clone())
    }

    async fn area_visibility(
        &self,
        _context_ids: &[ContextId],
        _user_id: Option<UserId>,
    ) -> Result<AreaVisibility> {
        Ok(self.visibility.clone())
    }

    async fn child_context_ids(
        &self,
        _context_id: ContextId,
        _user_id: Option<UserId>,
    ) -> Result<Vec<ContextId>> {
        Ok(self.children.clone())
    }
}

/// Passes everything to `Db` and counts the reads a search can issue.
pub struct CountingStore {
    pub db: Db,
    pub finds: AtomicUsize,
    pub counts: AtomicUsize,
    pub user_lookups: AtomicUsize,
}

impl CountingStore {
    pub fn new(db: Db) -> Self {
        Self {
            db,
            finds: AtomicUsize::new(0),
            counts: AtomicUsize::new(0),
            user_lookups: AtomicUsize::new(0),
        }
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn counts(&self) -> usize {
        self.counts.load(Ordering::SeqCst)
    }

    pub fn user_lookups(&self) -> usize {
        self.user_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommentStore for CountingStore {
    async fn insert_comment(&self, record: &CommentRecord) -> Result<CommentId> {
        self.db.insert_comment(record).await
    }

    async fn update_comment(&self, record: &CommentRecord) -> Result<bool> {
        self.db.update_comment(record).await
    }

    async fn delete_comment(&self, id: CommentId, reply_to: Option<CommentId>) -> Result<u64> {
        self.db.delete_comment(id, reply_to).await
    }

    async fn get_comment(&self, id: CommentId) -> Result<Option<CommentRecord>> {
        self.db.get_comment(id).await
    }

    async fn get_comments_by_ids(&self, ids: &[CommentId]) -> Result<Vec<CommentRecord>> {
        self.db.get_comments_by_ids(ids).await
    }

    async fn find_comments(
        &self,
        filter: &CommentFilter,
        sort: SortDirection,
        page: Option<PageRequest>,
    ) -> Result<Vec<CommentRecord>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.db.find_comments(filter, sort, page).await
    }

    async fn count_comments(&self, filter: &CommentFilter) -> Result<u64> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        self.db.count_comments(filter).await
    }

    async fn delete_comments_matching(&self, filter: &CommentFilter) -> Result<u64> {
        self.db.delete_comments_matching(filter).await
    }

    async fn delete_component_comments(&self, component: &str) -> Result<u64> {
        self.db.delete_component_comments(component).await
    }

    async fn delete_context_comments(&self, context_ids: &[ContextId]) -> Result<u64> {
        self.db.delete_context_comments(context_ids).await
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        self.db.get_users(ids).await
    }

    async fn upsert_user(&self, user: &UserRecord) -> Result<()> {
        self.db.upsert_user(user).await
    }

    async fn set_vote(&self, comment_id: CommentId, user_id: UserId, upvote: bool) -> Result<bool> {
        self.db.set_vote(comment_id, user_id, upvote).await
    }

    async fn has_vote(&self, comment_id: CommentId, user_id: UserId) -> Result<bool> {
        self.db.has_vote(comment_id, user_id).await
    }

    async fn delete_user_votes(&self, user_id: UserId) -> Result<u64> {
        self.db.delete_user_votes(user_id).await
    }

    async fn get_subscription(
        &self,
        user_id: UserId,
        key: &SectionKey,
        comment_id: Option<CommentId>,
    ) -> Result<Option<SubscriptionStatus>> {
        self.db.get_subscription(user_id, key, comment_id).await
    }

    async fn set_subscription(
        &self,
        user_id: UserId,
        key: &SectionKey,
        comment_id: Option<CommentId>,
        status: SubscriptionStatus,
    ) -> Result<()> {
        self.db.set_subscription(user_id, key, comment_id, status).await
    }

    async fn list_subscriptions(
        &self,
        key: &SectionKey,
        comment_id: Option<CommentId>,
    ) -> Result<Vec<(UserId, SubscriptionStatus)>> {
        self.db.list_subscriptions(key, comment_id).await
    }

    async fn delete_user_subscriptions(&self, user_id: UserId) -> Result<u64> {
        self.db.delete_user_subscriptions(user_id).await
    }
}

pub struct Harness {
    pub store: Arc<CountingStore>,
    pub api: CommentsApi,
    pub events: broadcast::Receiver<CommentEvent>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with(SETTINGS, DemoHandler::default()).await
    }

    pub async fn with(settings: &str, handler: DemoHandler) -> Self {
        init_tracing();

        let db = Db::in_memory().await.unwrap();
        for (id, first, last) in [
            (ALICE, "Alice", "Liddell"),
            (BOB, "Bob", "Builder"),
            (MODERATOR, "Mo", "Derator"),
        ] {
            db.upsert_user(&UserRecord {
                id,
                username: first.to_lowercase(),
                first_name: first.into(),
                last_name: last.into(),
            })
            .await
            .unwrap();
        }

        let permissions = PermissionTable::new()
            .grant_everyone(PERM_VIEW, CTX)
            .grant_everyone(PERM_VIEW, CHILD_CTX)
            .grant(PERM_EDIT_ANY, CTX, MODERATOR)
            .grant(PERM_DELETE, CTX, MODERATOR);

        let store = Arc::new(CountingStore::new(db));
        let state = EngineState::new(
            store.clone(),
            Arc::new(permissions),
            Settings::from_toml_str(settings).unwrap(),
        );
        let events = state.subscribe();

        let mut manager = CommentsManager::new(state);
        manager
            .register(COMPONENT, AREA, Arc::new(handler.clone()))
            .unwrap();
        manager
            .register_with_options(COMPONENT, "plain", AreaOptions::default(), Arc::new(handler))
            .unwrap();

        Self {
            store,
            api: CommentsApi::new(Arc::new(manager)),
            events,
        }
    }

    pub fn db(&self) -> &Db {
        &self.store.db
    }

    pub async fn section(&self, context_id: ContextId, item_id: ItemId) -> Section {
        self.api
            .manager()
            .area(COMPONENT, AREA, context_id)
            .unwrap()
            .section(item_id)
            .await
            .unwrap()
    }

    pub async fn post(
        &self,
        user: UserId,
        item_id: ItemId,
        content: &str,
        pseudonym: &str,
        reply_to: Option<CommentId>,
    ) -> CommentView {
        self.api
            .create_comments(Some(user), vec![new_comment(item_id, content, pseudonym, reply_to)])
            .await
            .unwrap()
            .remove(0)
    }

    /// Inserts a row directly, with a chosen creation time.
    pub async fn seed(
        &self,
        context_id: ContextId,
        item_id: ItemId,
        user: UserId,
        secs: i64,
        reply_to: Option<CommentId>,
    ) -> CommentId {
        let time = DateTime::<Utc>::from_timestamp(secs, 0).unwrap();
        self.db()
            .insert_comment(&CommentRecord {
                id: 0,
                context_id,
                component: COMPONENT.into(),
                area: AREA.into(),
                item_id,
                content: format!("seeded at {}", secs),
                format: 0,
                user_id: user,
                user_modified: user,
                pseudonym: None,
                time_created: time,
                time_modified: time,
                reply_to_id: reply_to,
                replies: 0,
                upvotes: 0,
                custom_data: String::new(),
            })
            .await
            .unwrap()
    }
}

pub fn new_comment(item_id: ItemId, content: &str, pseudonym: &str, reply_to: Option<CommentId>) -> CreateComment {
    CreateComment {
        context_id: CTX,
        component: COMPONENT.into(),
        comment_area: AREA.into(),
        item_id,
        content: content.into(),
        content_format: 0,
        pseudonym: pseudonym.into(),
        reply_to_id: reply_to,
        custom_data: String::new(),
    }
}
