use tabspace_lib::{Workspace, WorkspaceId};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use crate::error::{Result, TabspaceError};
use crate::repository::{WorkspaceRepository, WriteOutcome};

// === Messages ===

type Reply<T> = oneshot::Sender<Result<T>>;

pub enum RepositoryMessage {
    List {
        reply: Reply<Vec<Workspace>>,
    },
    Get {
        workspace_id: WorkspaceId,
        reply: Reply<Option<Workspace>>,
    },
    Create {
        workspace: Workspace,
        reply: Reply<()>,
    },
    Update {
        workspace: Workspace,
        reply: Reply<WriteOutcome>,
    },
    Delete {
        workspace_id: WorkspaceId,
        reply: Reply<WriteOutcome>,
    },
    SetActive {
        workspace_id: WorkspaceId,
        reply: Reply<WriteOutcome>,
    },
    ClearActive {
        reply: Reply<()>,
    },
    NavigationVisible {
        reply: Reply<bool>,
    },
    SetNavigationVisible {
        visible: bool,
        reply: Reply<()>,
    },
    Shutdown,
}

/// Pushed to subscribers after every successful write.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RepositoryEvent {
    CollectionChanged { workspaces: Vec<Workspace> },
    NavigationChanged { visible: bool },
}

// === Actor ===

/// Owns the repository and applies requests one at a time, so two writes
/// never interleave their read-modify-write cycles.
pub struct RepositoryActor {
    repo: WorkspaceRepository,
    event_tx: broadcast::Sender<RepositoryEvent>,
}

impl RepositoryActor {
    pub fn new(repo: WorkspaceRepository, event_tx: broadcast::Sender<RepositoryEvent>) -> Self {
        Self { repo, event_tx }
    }

    /// Run the actor loop until Shutdown is received.
    ///
    /// On shutdown the receiver is closed and whatever is still queued is
    /// drained: reads are answered, writes are refused.
    pub async fn run(self, mut rx: mpsc::Receiver<RepositoryMessage>) {
        info!("repository actor started");

        while let Some(msg) = rx.recv().await {
            if let RepositoryMessage::Shutdown = msg {
                info!("repository actor shutting down");
                rx.close();
                self.drain_queued_messages(&mut rx).await;
                break;
            }
            self.handle(msg).await;
        }

        info!("repository actor stopped");
    }

    async fn handle(&self, msg: RepositoryMessage) {
        match msg {
            RepositoryMessage::List { reply } => {
                Self::send_reply(reply, self.repo.list().await);
            }
            RepositoryMessage::Get {
                workspace_id,
                reply,
            } => {
                Self::send_reply(reply, self.repo.get(&workspace_id).await);
            }
            RepositoryMessage::Create { workspace, reply } => {
                let result = self.repo.create(workspace).await;
                if result.is_ok() {
                    self.publish_collection().await;
                }
                Self::send_reply(reply, result);
            }
            RepositoryMessage::Update { workspace, reply } => {
                let result = self.repo.update(workspace).await;
                self.publish_if_applied(&result).await;
                Self::send_reply(reply, result);
            }
            RepositoryMessage::Delete {
                workspace_id,
                reply,
            } => {
                let result = self.repo.delete(&workspace_id).await;
                self.publish_if_applied(&result).await;
                Self::send_reply(reply, result);
            }
            RepositoryMessage::SetActive {
                workspace_id,
                reply,
            } => {
                let result = self.repo.set_active(&workspace_id).await;
                self.publish_if_applied(&result).await;
                Self::send_reply(reply, result);
            }
            RepositoryMessage::ClearActive { reply } => {
                let result = self.repo.clear_active().await;
                if result.is_ok() {
                    self.publish_collection().await;
                }
                Self::send_reply(reply, result);
            }
            RepositoryMessage::NavigationVisible { reply } => {
                Self::send_reply(reply, self.repo.navigation_visible().await);
            }
            RepositoryMessage::SetNavigationVisible { visible, reply } => {
                let result = self.repo.set_navigation_visible(visible).await;
                if result.is_ok() {
                    self.emit_event(RepositoryEvent::NavigationChanged { visible });
                }
                Self::send_reply(reply, result);
            }
            RepositoryMessage::Shutdown => {}
        }
    }

    async fn drain_queued_messages(&self, rx: &mut mpsc::Receiver<RepositoryMessage>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                RepositoryMessage::List { .. }
                | RepositoryMessage::Get { .. }
                | RepositoryMessage::NavigationVisible { .. } => {
                    self.handle(msg).await;
                }
                RepositoryMessage::Create { reply, .. }
                | RepositoryMessage::ClearActive { reply }
                | RepositoryMessage::SetNavigationVisible { reply, .. } => {
                    Self::send_reply(reply, Err(TabspaceError::ShuttingDown));
                }
                RepositoryMessage::Update { reply, .. }
                | RepositoryMessage::Delete { reply, .. }
                | RepositoryMessage::SetActive { reply, .. } => {
                    Self::send_reply(reply, Err(TabspaceError::ShuttingDown));
                }
                RepositoryMessage::Shutdown => {
                    debug!("dropping duplicate shutdown message");
                }
            }
        }
    }

    async fn publish_if_applied(&self, result: &Result<WriteOutcome>) {
        if matches!(result, Ok(WriteOutcome::Applied)) {
            self.publish_collection().await;
        }
    }

    async fn publish_collection(&self) {
        if self.event_tx.receiver_count() == 0 {
            return;
        }
        match self.repo.list().await {
            Ok(workspaces) => self.emit_event(RepositoryEvent::CollectionChanged { workspaces }),
            Err(e) => debug!(error = %e, "skipping collection event: reload failed"),
        }
    }

    fn emit_event(&self, event: RepositoryEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("dropping repository event: no active subscribers");
        }
    }

    fn send_reply<T>(reply: Reply<T>, result: Result<T>) {
        if reply.send(result).is_err() {
            debug!("repository reply channel dropped");
        }
    }
}

// === Handle ===

/// Cloneable client for the repository actor. Methods mirror
/// [`WorkspaceRepository`].
#[derive(Clone)]
pub struct RepositoryHandle {
    tx: mpsc::Sender<RepositoryMessage>,
}

impl RepositoryHandle {
    pub fn new(tx: mpsc::Sender<RepositoryMessage>) -> Self {
        Self { tx }
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> RepositoryMessage) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| TabspaceError::ShuttingDown)?;
        reply_rx.await.map_err(|_| TabspaceError::ShuttingDown)?
    }

    pub async fn list(&self) -> Result<Vec<Workspace>> {
        self.request(|reply| RepositoryMessage::List { reply }).await
    }

    pub async fn get(&self, workspace_id: &str) -> Result<Option<Workspace>> {
        let workspace_id = workspace_id.to_string();
        self.request(|reply| RepositoryMessage::Get {
            workspace_id,
            reply,
        })
        .await
    }

    pub async fn create(&self, workspace: Workspace) -> Result<()> {
        self.request(|reply| RepositoryMessage::Create { workspace, reply })
            .await
    }

    pub async fn update(&self, workspace: Workspace) -> Result<WriteOutcome> {
        self.request(|reply| RepositoryMessage::Update { workspace, reply })
            .await
    }

    pub async fn delete(&self, workspace_id: &str) -> Result<WriteOutcome> {
        let workspace_id = workspace_id.to_string();
        self.request(|reply| RepositoryMessage::Delete {
            workspace_id,
            reply,
        })
        .await
    }

    pub async fn set_active(&self, workspace_id: &str) -> Result<WriteOutcome> {
        let workspace_id = workspace_id.to_string();
        self.request(|reply| RepositoryMessage::SetActive {
            workspace_id,
            reply,
        })
        .await
    }

    pub async fn clear_active(&self) -> Result<()> {
        self.request(|reply| RepositoryMessage::ClearActive { reply })
            .await
    }

    pub async fn navigation_visible(&self) -> Result<bool> {
        self.request(|reply| RepositoryMessage::NavigationVisible { reply })
            .await
    }

    pub async fn set_navigation_visible(&self, visible: bool) -> Result<()> {
        self.request(|reply| RepositoryMessage::SetNavigationVisible { visible, reply })
            .await
    }

    /// Asks the actor to stop once the messages ahead of this one are handled.
    pub async fn shutdown(&self) {
        if self.tx.send(RepositoryMessage::Shutdown).await.is_err() {
            debug!("repository actor already stopped");
        }
    }
}

/// Create a repository actor and return its handle.
pub fn spawn_repository_actor(
    repo: WorkspaceRepository,
    queue_capacity: usize,
    event_capacity: usize,
) -> (
    RepositoryHandle,
    broadcast::Sender<RepositoryEvent>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, rx) = mpsc::channel(queue_capacity);
    let (event_tx, _event_rx) = broadcast::channel(event_capacity);
    let actor = RepositoryActor::new(repo, event_tx.clone());
    let handle = tokio::spawn(actor.run(rx));
    (RepositoryHandle::new(tx), event_tx, handle)
}
