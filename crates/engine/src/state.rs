use domain::CommentEvent;
use std::sync::Arc;
use storage::{CommentStore, Db};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::permission::PermissionOracle;
use crate::settings::Settings;

/// Shared handles every area, section and search works against.
#[derive(Clone)]
pub struct EngineState {
    pub store: Arc<dyn CommentStore>,
    pub permissions: Arc<dyn PermissionOracle>,
    pub settings: Arc<Settings>,
    pub events: broadcast::Sender<CommentEvent>,
}

impl EngineState {
    pub fn new(
        store: Arc<dyn CommentStore>,
        permissions: Arc<dyn PermissionOracle>,
        settings: Settings,
    ) -> Self {
        let (events, _rx) = broadcast::channel(100);
        Self {
            store,
            permissions,
            settings: Arc::new(settings),
            events,
        }
    }

    /// Opens the configured SQLite database and runs migrations.
    pub async fn connect(
        settings: Settings,
        permissions: Arc<dyn PermissionOracle>,
    ) -> anyhow::Result<Self> {
        let db = Db::new(&settings.database.url).await?;
        info!("Comments engine using {}", settings.database.url);
        Ok(Self::new(Arc::new(db), permissions, settings))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CommentEvent> {
        self.events.subscribe()
    }

    // 没有订阅者时发送会失败，这里忽略
    pub(crate) fn publish(&self, event: CommentEvent) {
        debug!("Publishing {:?}", event);
        let _ = self.events.send(event);
    }
}
