pub mod activation;
pub mod browser;
pub mod config;
pub mod db;
pub mod editor;
pub mod error;
pub mod ids;
pub mod repository;
pub mod simulated;
pub mod snapshot;
pub mod state;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use tabspace_lib::TabRecord;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

pub use activation::{ActivationController, ActivationReport, ActivationState};
pub use browser::{BrowserTab, BrowserTabs, CreateTab, TabEvent, TabQuery, UpdateTab};
pub use config::{ConfigError, TabspaceConfig};
pub use editor::WorkspaceEditor;
pub use error::{BrowserError, Result, StoreError, TabspaceError};
pub use repository::{WorkspaceRepository, WriteOutcome};
pub use snapshot::TabSnapshotAdapter;
pub use state::{RepositoryEvent, RepositoryHandle};
pub use store::{KeyValueStore, MemoryStore, PersistentStore};

/// Everything a popup or options page needs, wired to one browser and one
/// store.
pub struct Engine {
    config: TabspaceConfig,
    repo: RepositoryHandle,
    events: broadcast::Sender<RepositoryEvent>,
    activation: ActivationController,
    editor: WorkspaceEditor,
    snapshot: TabSnapshotAdapter,
    browser: Arc<dyn BrowserTabs>,
    actor_handle: JoinHandle<()>,
    watcher_handle: Option<JoinHandle<()>>,
}

impl Engine {
    /// Opens the configured store and starts the repository actor.
    pub async fn start(config: TabspaceConfig, browser: Arc<dyn BrowserTabs>) -> Result<Self> {
        let backend: Arc<dyn KeyValueStore> = match &config.db_path {
            Some(path) => Arc::new(db::SqliteStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        Ok(Self::with_store(config, browser, backend))
    }

    /// Like [`Engine::start`] but over an already-open backend.
    pub fn with_store(
        config: TabspaceConfig,
        browser: Arc<dyn BrowserTabs>,
        backend: Arc<dyn KeyValueStore>,
    ) -> Self {
        let repository = WorkspaceRepository::new(PersistentStore::new(backend));
        let (repo, events, actor_handle) = state::spawn_repository_actor(
            repository,
            config.queue_capacity.max(1),
            config.event_capacity.max(1),
        );

        tracing::info!(
            anchor_url = %config.anchor_url,
            persistent = config.db_path.is_some(),
            "tabspace engine started"
        );

        Self {
            activation: ActivationController::new(
                browser.clone(),
                repo.clone(),
                config.anchor_url.clone(),
            ),
            editor: WorkspaceEditor::new(repo.clone()),
            snapshot: TabSnapshotAdapter::new(browser.clone()),
            config,
            repo,
            events,
            browser,
            actor_handle,
            watcher_handle: None,
        }
    }

    pub fn config(&self) -> &TabspaceConfig {
        &self.config
    }

    pub fn repository(&self) -> &RepositoryHandle {
        &self.repo
    }

    pub fn activation(&self) -> &ActivationController {
        &self.activation
    }

    pub fn editor(&self) -> &WorkspaceEditor {
        &self.editor
    }

    /// Collection and navigation changes, pushed after every write.
    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent> {
        self.events.subscribe()
    }

    /// The window's tabs as records, without the anchor tab.
    pub async fn snapshot_tabs(&self) -> Result<Vec<TabRecord>> {
        self.snapshot.snapshot(Some(&self.config.anchor_url)).await
    }

    /// Starts pushing fresh snapshots whenever the window's tabs change.
    /// A second call replaces the previous watcher.
    pub fn watch_tabs(&mut self) -> mpsc::Receiver<Vec<TabRecord>> {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let handle = snapshot::spawn_tab_watcher(
            self.snapshot.clone(),
            self.browser.subscribe(),
            Some(self.config.anchor_url.clone()),
            Duration::from_millis(self.config.watcher_debounce_ms),
            tx,
        );
        if let Some(previous) = self.watcher_handle.replace(handle) {
            previous.abort();
        }
        rx
    }

    /// Stops the watcher, lets the actor finish queued requests, and waits
    /// for it to exit.
    pub async fn shutdown(self) {
        if let Some(watcher) = self.watcher_handle {
            watcher.abort();
        }
        self.repo.shutdown().await;
        if let Err(e) = self.actor_handle.await {
            tracing::error!(error = %e, "repository actor ended abnormally");
        }
        tracing::info!("tabspace engine stopped");
    }
}
