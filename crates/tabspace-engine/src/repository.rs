use tabspace_lib::{ValidationError, Workspace, WorkspaceId};
use tracing::{info, warn};

use crate::error::Result;
use crate::store::{NAVIGATION_VISIBLE_KEY, PersistentStore, WORKSPACES_KEY};

/// Result of a write that targets an existing workspace by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// No workspace had the id. The collection was left untouched; the
    /// caller was most likely holding a stale copy.
    Missing,
}

impl WriteOutcome {
    pub fn is_applied(self) -> bool {
        self == WriteOutcome::Applied
    }
}

/// CRUD over the workspace collection. Every write reads the whole
/// collection, changes it in memory and writes it back under one key.
#[derive(Clone)]
pub struct WorkspaceRepository {
    store: PersistentStore,
}

impl WorkspaceRepository {
    pub fn new(store: PersistentStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Workspace>> {
        Ok(self.store.read(WORKSPACES_KEY).await?)
    }

    pub async fn get(&self, workspace_id: &str) -> Result<Option<Workspace>> {
        let workspaces = self.list().await?;
        Ok(workspaces.into_iter().find(|ws| ws.id == workspace_id))
    }

    /// Appends `workspace`. A new entry never arrives flagged active; use
    /// [`WorkspaceRepository::set_active`] for that.
    pub async fn create(&self, mut workspace: Workspace) -> Result<()> {
        workspace.is_active = workspace.is_active.map(|_| false);
        let mut workspaces = self.list().await?;
        if workspaces.iter().any(|ws| ws.id == workspace.id) {
            return Err(ValidationError::DuplicateId(workspace.id).into());
        }

        info!(workspace_id = %workspace.id, name = %workspace.name, tabs = workspace.tabs.len(), "creating workspace");
        workspaces.push(workspace);
        self.save(&workspaces).await
    }

    /// Replaces the entry with the same id. The stored active flag is kept,
    /// whatever `workspace` carries.
    pub async fn update(&self, mut workspace: Workspace) -> Result<WriteOutcome> {
        let mut workspaces = self.list().await?;
        let Some(slot) = workspaces.iter_mut().find(|ws| ws.id == workspace.id) else {
            warn!(workspace_id = %workspace.id, "update for unknown workspace, ignoring");
            return Ok(WriteOutcome::Missing);
        };

        info!(workspace_id = %workspace.id, "updating workspace");
        workspace.is_active = slot.is_active;
        *slot = workspace;
        self.save(&workspaces).await?;
        Ok(WriteOutcome::Applied)
    }

    pub async fn delete(&self, workspace_id: &str) -> Result<WriteOutcome> {
        let mut workspaces = self.list().await?;
        let before = workspaces.len();
        workspaces.retain(|ws| ws.id != workspace_id);
        if workspaces.len() == before {
            warn!(workspace_id = %workspace_id, "delete for unknown workspace, ignoring");
            return Ok(WriteOutcome::Missing);
        }

        info!(workspace_id = %workspace_id, "deleting workspace");
        self.save(&workspaces).await?;
        Ok(WriteOutcome::Applied)
    }

    /// Flags `workspace_id` active and every other workspace inactive, in a
    /// single write.
    pub async fn set_active(&self, workspace_id: &str) -> Result<WriteOutcome> {
        let mut workspaces = self.list().await?;
        if !workspaces.iter().any(|ws| ws.id == workspace_id) {
            warn!(workspace_id = %workspace_id, "activation of unknown workspace, ignoring");
            return Ok(WriteOutcome::Missing);
        }

        for ws in &mut workspaces {
            ws.is_active = Some(ws.id == workspace_id);
        }

        info!(workspace_id = %workspace_id, "marking workspace active");
        self.save(&workspaces).await?;
        Ok(WriteOutcome::Applied)
    }

    /// Leaves no workspace flagged active.
    pub async fn clear_active(&self) -> Result<()> {
        let mut workspaces = self.list().await?;
        for ws in &mut workspaces {
            ws.is_active = Some(false);
        }

        info!(count = workspaces.len(), "clearing active workspace");
        self.save(&workspaces).await
    }

    pub async fn navigation_visible(&self) -> Result<bool> {
        Ok(self.store.read_or(NAVIGATION_VISIBLE_KEY, true).await?)
    }

    pub async fn set_navigation_visible(&self, visible: bool) -> Result<()> {
        self.store.write(NAVIGATION_VISIBLE_KEY, &visible).await?;
        Ok(())
    }

    async fn save(&self, workspaces: &[Workspace]) -> Result<()> {
        self.store.write(WORKSPACES_KEY, workspaces).await?;
        Ok(())
    }
}

/// Ids of workspaces flagged active. Holds at most one entry while the
/// collection is only written through [`WorkspaceRepository`].
pub fn active_ids(workspaces: &[Workspace]) -> Vec<WorkspaceId> {
    workspaces
        .iter()
        .filter(|ws| ws.is_active())
        .map(|ws| ws.id.clone())
        .collect()
}
