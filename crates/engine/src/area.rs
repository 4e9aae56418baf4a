use async_trait::async_trait;
use domain::{
    Comment, CommentFilter, CommentId, ContentFormat, ContextId, CustomDataMap, ItemId, ItemScope,
    SectionKey, SubscriptionStatus, UserId,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::capability::{Capability, StandardCapability};
use crate::error::{EngineResult, FieldErrors};
use crate::search::{CommentSearch, SearchParams, Viewer};
use crate::section::Section;
use crate::state::EngineState;

/// Options a component declares for one of its comment areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AreaOptions {
    pub allow_replies: bool,
    pub allow_upvotes: bool,
    pub allow_realname: bool,
    pub allow_pseudonym: bool,
    pub allow_subscriptions: bool,
}

impl Default for AreaOptions {
    fn default() -> Self {
        Self {
            allow_replies: false,
            allow_upvotes: true,
            allow_realname: true,
            allow_pseudonym: false,
            allow_subscriptions: true,
        }
    }
}

/// The host object a section is attached to.
pub trait SectionItem: Send + Sync {
    fn title(&self) -> String;
    fn url(&self) -> String;

    fn comment_url(&self, comment_id: CommentId) -> String {
        format!("{}#comment-{}", self.url(), comment_id)
    }
}

/// A `SectionItem` with fixed title and URL.
#[derive(Debug, Clone)]
pub struct PlainItem {
    pub title: String,
    pub url: String,
}

impl SectionItem for PlainItem {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn url(&self) -> String {
        self.url.clone()
    }
}

/// Which items of an area a user may see in an area-wide listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaVisibility {
    Hidden,
    All,
    Items(Vec<ItemId>),
}

impl AreaVisibility {
    pub fn item_scope(self) -> ItemScope {
        match self {
            AreaVisibility::Hidden => ItemScope::AnyOf(Vec::new()),
            AreaVisibility::All => ItemScope::All,
            AreaVisibility::Items(items) => ItemScope::AnyOf(items),
        }
    }
}

/// Integration points of the component that owns a comment area. Only
/// `section_item` is required.
#[async_trait]
pub trait AreaHandler: Send + Sync {
    async fn section_item(&self, key: &SectionKey) -> anyhow::Result<Arc<dyn SectionItem>>;

    fn capability(&self, _key: &SectionKey, standard: StandardCapability) -> Arc<dyn Capability> {
        Arc::new(standard)
    }

    fn validate_comment_content(
        &self,
        _key: &SectionKey,
        _content: &str,
        _format: ContentFormat,
        _cap: &dyn Capability,
    ) -> Result<(), FieldErrors> {
        Ok(())
    }

    fn validate_comment_pseudonym(
        &self,
        _key: &SectionKey,
        _pseudonym: &str,
        _cap: &dyn Capability,
    ) -> Result<(), FieldErrors> {
        Ok(())
    }

    fn validate_comment_custom_data(
        &self,
        _key: &SectionKey,
        _comment: &Comment,
        _data: &CustomDataMap,
        _cap: &dyn Capability,
    ) -> Result<(), FieldErrors> {
        Ok(())
    }

    fn modify_comment_before_save(&self, _key: &SectionKey, _comment: &mut Comment, _cap: &dyn Capability) {}

    fn default_subscription_status(&self, _key: &SectionKey, _user_id: UserId) -> SubscriptionStatus {
        SubscriptionStatus::Off
    }

    async fn auto_subscribed_users(&self, _key: &SectionKey) -> anyhow::Result<Vec<UserId>> {
        Ok(Vec::new())
    }

    // 不了解底层条目时，默认全部隐藏
    async fn area_visibility(
        &self,
        _context_ids: &[ContextId],
        _user_id: Option<UserId>,
    ) -> anyhow::Result<AreaVisibility> {
        Ok(AreaVisibility::Hidden)
    }

    async fn child_context_ids(
        &self,
        _context_id: ContextId,
        _user_id: Option<UserId>,
    ) -> anyhow::Result<Vec<ContextId>> {
        Ok(Vec::new())
    }

    fn export_custom_data(
        &self,
        _key: &SectionKey,
        _comment: &Comment,
        data: &CustomDataMap,
        _viewer: Option<UserId>,
    ) -> CustomDataMap {
        data.clone()
    }

    fn section_custom_data(&self, _key: &SectionKey, _viewer: Option<UserId>) -> CustomDataMap {
        CustomDataMap::new()
    }
}

/// One comment area of a component, bound to a context. Sections are built
/// on demand and never cached.
#[derive(Clone)]
pub struct Area {
    state: EngineState,
    component: String,
    name: String,
    context_id: ContextId,
    options: AreaOptions,
    handler: Arc<dyn AreaHandler>,
}

impl std::fmt::Debug for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Area")
            .field("component", &self.component)
            .field("name", &self.name)
            .field("context_id", &self.context_id)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Area {
    pub(crate) fn new(
        state: EngineState,
        component: String,
        name: String,
        context_id: ContextId,
        options: AreaOptions,
        handler: Arc<dyn AreaHandler>,
    ) -> Self {
        Self {
            state,
            component,
            name,
            context_id,
            options,
            handler,
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    pub fn options(&self) -> &AreaOptions {
        &self.options
    }

    pub fn handler(&self) -> &Arc<dyn AreaHandler> {
        &self.handler
    }

    pub(crate) fn state(&self) -> &EngineState {
        &self.state
    }

    /// The same area in another context.
    pub fn in_context(&self, context_id: ContextId) -> Area {
        Area {
            context_id,
            ..self.clone()
        }
    }

    pub fn section_key(&self, item_id: ItemId) -> SectionKey {
        SectionKey::new_unchecked(
            self.component.clone(),
            self.name.clone(),
            self.context_id,
            item_id,
        )
    }

    pub async fn section(&self, item_id: ItemId) -> EngineResult<Section> {
        let key = self.section_key(item_id);
        let item = self.handler.section_item(&key).await?;
        Ok(Section::new(self.clone(), key, item))
    }

    /// Skips the item lookup when the caller already holds the item.
    pub fn section_with_item(&self, item_id: ItemId, item: Arc<dyn SectionItem>) -> Section {
        Section::new(self.clone(), self.section_key(item_id), item)
    }

    /// Comments across every section of the area.
    pub fn comments(&self, params: SearchParams, viewer: Viewer) -> CommentSearch {
        CommentSearch::for_area(self.clone(), params, viewer)
    }

    pub async fn delete_all(&self) -> EngineResult<u64> {
        let filter = CommentFilter::area(self.component.clone(), self.name.clone(), self.context_id);
        let deleted = self.state.store.delete_comments_matching(&filter).await?;
        info!(
            "Deleted {} comments in area {}/{} of context {}",
            deleted, self.component, self.name, self.context_id
        );
        Ok(deleted)
    }
}
