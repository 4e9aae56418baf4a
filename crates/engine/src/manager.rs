use domain::{validate_name, Comment, CommentEvent, CommentId, ContextId, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use crate::area::{Area, AreaHandler, AreaOptions};
use crate::error::{EngineError, EngineResult};
use crate::section::Section;
use crate::state::EngineState;

struct Registration {
    options: AreaOptions,
    handler: Arc<dyn AreaHandler>,
}

/// Registry of the comment areas components have declared.
pub struct CommentsManager {
    state: EngineState,
    areas: HashMap<(String, String), Registration>,
}

impl CommentsManager {
    pub fn new(state: EngineState) -> Self {
        Self {
            state,
            areas: HashMap::new(),
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CommentEvent> {
        self.state.subscribe()
    }

    /// Registers an area with the options found in settings.
    pub fn register(
        &mut self,
        component: &str,
        area: &str,
        handler: Arc<dyn AreaHandler>,
    ) -> EngineResult<()> {
        let options = self.state.settings.area_options(component, area);
        self.register_with_options(component, area, options, handler)
    }

    pub fn register_with_options(
        &mut self,
        component: &str,
        area: &str,
        options: AreaOptions,
        handler: Arc<dyn AreaHandler>,
    ) -> EngineResult<()> {
        validate_name(component)?;
        validate_name(area)?;
        info!("Registered comment area {}/{} {:?}", component, area, options);
        self.areas.insert(
            (component.to_string(), area.to_string()),
            Registration { options, handler },
        );
        Ok(())
    }

    pub fn area(&self, component: &str, area: &str, context_id: ContextId) -> EngineResult<Area> {
        let registration = self
            .areas
            .get(&(component.to_string(), area.to_string()))
            .ok_or_else(|| EngineError::UnknownArea {
                component: component.to_string(),
                area: area.to_string(),
            })?;

        Ok(Area::new(
            self.state.clone(),
            component.to_string(),
            area.to_string(),
            context_id,
            registration.options,
            registration.handler.clone(),
        ))
    }

    pub fn areas_in_component(&self, component: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .areas
            .keys()
            .filter(|(c, _)| c == component)
            .map(|(_, a)| a.clone())
            .collect();
        names.sort();
        names
    }

    /// Looks a comment up by id alone, with the section it lives in.
    pub async fn comment(&self, id: CommentId) -> EngineResult<Option<(Section, Comment)>> {
        let Some(record) = self.state.store.get_comment(id).await? else {
            return Ok(None);
        };
        let section = self
            .area(&record.component, &record.area, record.context_id)?
            .section(record.item_id)
            .await?;
        Ok(Some((section, Comment::from_record(record))))
    }

    pub async fn delete_component_comments(&self, component: &str) -> EngineResult<u64> {
        let deleted = self.state.store.delete_component_comments(component).await?;
        info!("Deleted {} comments of component {}", deleted, component);
        Ok(deleted)
    }

    pub async fn delete_comments_in_context(&self, context_ids: &[ContextId]) -> EngineResult<u64> {
        let deleted = self.state.store.delete_context_comments(context_ids).await?;
        info!("Deleted {} comments in contexts {:?}", deleted, context_ids);
        Ok(deleted)
    }

    pub async fn delete_user_votes(&self, user_id: UserId) -> EngineResult<u64> {
        Ok(self.state.store.delete_user_votes(user_id).await?)
    }

    pub async fn delete_user_subscriptions(&self, user_id: UserId) -> EngineResult<u64> {
        Ok(self.state.store.delete_user_subscriptions(user_id).await?)
    }
}
