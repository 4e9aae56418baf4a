use chrono::{DateTime, Utc};
use domain::{
    Comment, CommentFilter, CommentId, CommentRecord, ContextId, DomainError, ItemScope,
    PageRequest, ParentScope, SortDirection, UserId, UserRecord,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use storage::CommentStore;
use tracing::debug;

use crate::area::Area;
use crate::error::EngineResult;
use crate::section::Section;
use crate::users::UserCache;

/// Who the results are for. `Trusted` skips the view checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Trusted,
    Guest,
    User(UserId),
}

impl Viewer {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Viewer::User(id) => Some(*id),
            Viewer::Trusted | Viewer::Guest => None,
        }
    }
}

impl From<Option<UserId>> for Viewer {
    fn from(user_id: Option<UserId>) -> Self {
        match user_id {
            Some(id) => Viewer::User(id),
            None => Viewer::Guest,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Restricts the search to this one comment; paging is ignored.
    pub comment_id: Option<CommentId>,
    pub reply_to: Option<CommentId>,
    pub time_from: Option<DateTime<Utc>>,
    pub time_to: Option<DateTime<Utc>>,
    /// Zero-based.
    pub page: i64,
    /// Non-positive means no limit.
    pub page_size: i64,
    pub sort: SortDirection,
    pub include_replies: bool,
    pub include_child_contexts: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            comment_id: None,
            reply_to: None,
            time_from: None,
            time_to: None,
            page: 0,
            page_size: -1,
            sort: SortDirection::Desc,
            include_replies: false,
            include_child_contexts: false,
        }
    }
}

impl SearchParams {
    pub fn paged(mut self, page: i64, page_size: i64) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn sorted(mut self, sort: SortDirection) -> Self {
        self.sort = sort;
        self
    }

    /// Fails on anything but `ASC` or `DESC`.
    pub fn sort_direction(self, direction: &str) -> Result<Self, DomainError> {
        Ok(self.sorted(direction.parse()?))
    }

    pub fn with_replies(mut self, include_replies: bool) -> Self {
        self.include_replies = include_replies;
        self
    }

    pub fn replies_to(mut self, comment_id: CommentId) -> Self {
        self.reply_to = Some(comment_id);
        self
    }

    pub fn only(mut self, comment_id: CommentId) -> Self {
        self.comment_id = Some(comment_id);
        self
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.time_from = from;
        self.time_to = to;
        self
    }

    pub fn with_child_contexts(mut self, include: bool) -> Self {
        self.include_child_contexts = include;
        self
    }

    fn parent_scope(&self, include_replies: bool) -> ParentScope {
        match self.reply_to {
            Some(id) => ParentScope::RepliesTo(id),
            None if include_replies => ParentScope::Any,
            None => ParentScope::TopLevel,
        }
    }
}

enum Scope {
    Section(Section),
    Area(Area),
}

/// One listing request. Results, totals and users are fetched once and
/// kept for the life of the search.
pub struct CommentSearch {
    scope: Scope,
    params: SearchParams,
    viewer: Viewer,
    store: Arc<dyn CommentStore>,
    results: Option<Vec<Comment>>,
    totals: HashMap<bool, u64>,
    // 按评论区缓存，None 表示无权查看
    sections: HashMap<String, Option<Section>>,
    area_scope: Option<(Vec<ContextId>, ItemScope)>,
    users: UserCache,
}

impl CommentSearch {
    pub(crate) fn for_section(section: Section, params: SearchParams, viewer: Viewer) -> Self {
        let store = section.state().store.clone();
        Self::new(Scope::Section(section), params, viewer, store)
    }

    pub(crate) fn for_area(area: Area, params: SearchParams, viewer: Viewer) -> Self {
        let store = area.state().store.clone();
        Self::new(Scope::Area(area), params, viewer, store)
    }

    fn new(scope: Scope, params: SearchParams, viewer: Viewer, store: Arc<dyn CommentStore>) -> Self {
        Self {
            scope,
            params,
            viewer,
            users: UserCache::new(store.clone()),
            store,
            results: None,
            totals: HashMap::new(),
            sections: HashMap::new(),
            area_scope: None,
        }
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn viewer(&self) -> Viewer {
        self.viewer
    }

    /// The section this search is bound to, if any.
    pub fn section(&self) -> Option<&Section> {
        match &self.scope {
            Scope::Section(section) => Some(section),
            Scope::Area(_) => None,
        }
    }

    /// The current page of comments.
    pub async fn all(&mut self) -> EngineResult<&[Comment]> {
        if self.results.is_none() {
            let comments = self.fetch().await?;
            debug!("Search materialized {} comments", comments.len());
            self.results = Some(comments);
        }
        Ok(self.results.as_deref().unwrap_or_default())
    }

    pub async fn first(&mut self) -> EngineResult<Option<&Comment>> {
        Ok(self.all().await?.first())
    }

    /// Size of the page if already fetched, otherwise the rows left after
    /// skipping the earlier pages.
    pub async fn count(&mut self) -> EngineResult<u64> {
        if let Some(results) = &self.results {
            return Ok(results.len() as u64);
        }
        if self.params.comment_id.is_some() {
            return Ok(self.all().await?.len() as u64);
        }
        if !self.section_visible() {
            return Ok(0);
        }

        let filter = self.filter(self.params.include_replies).await?;
        let total = self.store.count_comments(&filter).await? as i64;
        let skipped = self.params.page.max(0).saturating_mul(self.params.page_size.max(0));
        Ok(total.saturating_sub(skipped).max(0) as u64)
    }

    /// Matching rows across all pages, with or without replies.
    pub async fn count_total(&mut self, include_replies: bool) -> EngineResult<u64> {
        if let Some(total) = self.totals.get(&include_replies) {
            return Ok(*total);
        }

        let total = if self.params.comment_id.is_some() {
            self.all().await?.len() as u64
        } else if !self.section_visible() {
            0
        } else {
            let filter = self.filter(include_replies).await?;
            self.store.count_comments(&filter).await?
        };

        self.totals.insert(include_replies, total);
        Ok(total)
    }

    /// Section of a returned comment.
    pub fn section_of(&self, comment: &Comment) -> Option<&Section> {
        match &self.scope {
            Scope::Section(section) if section.key() == comment.section() => Some(section),
            Scope::Section(_) => None,
            Scope::Area(_) => self
                .sections
                .get(&comment.section().unique_key())
                .and_then(Option::as_ref),
        }
    }

    /// Distinct sections of the fetched comments, in result order.
    pub fn result_sections(&self) -> Vec<Section> {
        let mut seen = HashSet::new();
        let mut sections = Vec::new();
        for comment in self.results.iter().flatten() {
            if let Some(section) = self.section_of(comment) {
                if seen.insert(section.unique_key()) {
                    sections.push(section.clone());
                }
            }
        }
        sections
    }

    /// Loads the user along with every author and modifier of the fetched
    /// comments, in one batch.
    pub async fn user(&mut self, id: UserId) -> EngineResult<Option<&UserRecord>> {
        let batch: Vec<UserId> = self
            .results
            .iter()
            .flatten()
            .flat_map(|c| [c.user_created_id(true), c.user_modified_id(true)])
            .flatten()
            .collect();
        Ok(self.users.get(id, batch).await?)
    }

    async fn fetch(&mut self) -> EngineResult<Vec<Comment>> {
        if !self.section_visible() {
            return Ok(Vec::new());
        }

        let records = match self.params.comment_id {
            Some(id) => {
                let filter = self.filter(true).await?;
                self.store
                    .get_comment(id)
                    .await?
                    .filter(|r| in_scope(r, &filter))
                    .into_iter()
                    .collect()
            }
            None => {
                let filter = self.filter(self.params.include_replies).await?;
                let page = PageRequest::from_page(self.params.page, self.params.page_size);
                self.store
                    .find_comments(&filter, self.params.sort, page)
                    .await?
            }
        };

        let area = match &self.scope {
            Scope::Section(_) => return Ok(records.into_iter().map(Comment::from_record).collect()),
            Scope::Area(area) => area.clone(),
        };

        let mut comments = Vec::with_capacity(records.len());
        for record in records {
            if self.admit(&area, &record).await? {
                comments.push(Comment::from_record(record));
            }
        }
        Ok(comments)
    }

    // 单一评论区且无权查看时，不查询存储
    fn section_visible(&self) -> bool {
        match (&self.scope, self.viewer) {
            (_, Viewer::Trusted) => true,
            (Scope::Section(section), viewer) => section.capability(viewer.user_id()).can_view(),
            (Scope::Area(_), _) => true,
        }
    }

    /// Resolves the row's section once per search and checks view on it.
    async fn admit(&mut self, area: &Area, record: &CommentRecord) -> EngineResult<bool> {
        let key = record.section_key();
        let unique = key.unique_key();
        if let Some(cached) = self.sections.get(&unique) {
            return Ok(cached.is_some());
        }

        let section = area.in_context(key.context_id).section(key.item_id).await?;
        let allowed = match self.viewer {
            Viewer::Trusted => true,
            viewer => section.capability(viewer.user_id()).can_view(),
        };
        if !allowed {
            debug!("Dropping comments of {} for {:?}", unique, self.viewer);
        }
        self.sections.insert(unique, allowed.then_some(section));
        Ok(allowed)
    }

    async fn filter(&mut self, include_replies: bool) -> EngineResult<CommentFilter> {
        let mut filter = match &self.scope {
            Scope::Section(section) => section.filter(),
            Scope::Area(area) => {
                let area = area.clone();
                let (context_ids, items) = self.area_scope(&area).await?;
                CommentFilter::area(area.component(), area.name(), area.context_id())
                    .with_items(items)
                    .with_contexts(context_ids)
            }
        };
        filter.parent = self.params.parent_scope(include_replies);
        filter.time_from = self.params.time_from;
        filter.time_to = self.params.time_to;
        Ok(filter)
    }

    async fn area_scope(&mut self, area: &Area) -> EngineResult<(Vec<ContextId>, ItemScope)> {
        if let Some(scope) = &self.area_scope {
            return Ok(scope.clone());
        }

        let user_id = self.viewer.user_id();
        let mut context_ids = vec![area.context_id()];
        if self.params.include_child_contexts {
            for child in area.handler().child_context_ids(area.context_id(), user_id).await? {
                if !context_ids.contains(&child) {
                    context_ids.push(child);
                }
            }
        }
        let items = area
            .handler()
            .area_visibility(&context_ids, user_id)
            .await?
            .item_scope();

        self.area_scope = Some((context_ids.clone(), items.clone()));
        Ok((context_ids, items))
    }
}

fn in_scope(record: &CommentRecord, filter: &CommentFilter) -> bool {
    let item_ok = match &filter.items {
        ItemScope::All => true,
        ItemScope::One(item_id) => record.item_id == *item_id,
        ItemScope::AnyOf(items) => items.contains(&record.item_id),
    };
    let from_ok = filter.time_from.map_or(true, |t| record.time_created >= t);
    let to_ok = filter.time_to.map_or(true, |t| record.time_created <= t);

    record.component == filter.component
        && record.area == filter.area
        && filter.context_ids.contains(&record.context_id)
        && item_ok
        && from_ok
        && to_ok
}
