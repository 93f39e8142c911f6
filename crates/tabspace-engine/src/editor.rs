use tabspace_lib::drag::{DragOutcome, ListId, resolve_move};
use tabspace_lib::error::{normalize_name, normalize_title};
use tabspace_lib::session::SessionState;
use tabspace_lib::{TabRecord, Workspace, reorder};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::ids::IdGenerator;
use crate::repository::WriteOutcome;
use crate::state::RepositoryHandle;

/// User-facing edits to saved workspaces. Every write re-reads the target
/// workspace first, so edits never start from a copy the UI held onto.
pub struct WorkspaceEditor {
    repo: RepositoryHandle,
    ids: IdGenerator,
}

impl WorkspaceEditor {
    pub fn new(repo: RepositoryHandle) -> Self {
        Self {
            repo,
            ids: IdGenerator::new(),
        }
    }

    /// Saves the selected staged tabs as a new workspace named after the
    /// session's draft name. Returns the workspace and the session with the
    /// create form reset. On error the caller's session is left as it was.
    pub async fn save_workspace(
        &self,
        session: &SessionState,
    ) -> Result<(Workspace, SessionState)> {
        let name = normalize_name(session.draft_name.as_deref().unwrap_or_default())?;
        let tabs = session.selected_tabs();
        if tabs.is_empty() {
            debug!(name = %name, "saving workspace with no tabs");
        }

        let (id, created_at) = self.ids.next();
        let workspace = Workspace::new(id, name, tabs, created_at);
        self.repo.create(workspace.clone()).await?;

        Ok((workspace, session.clone().after_save()))
    }

    pub async fn rename(&self, workspace_id: &str, new_name: &str) -> Result<WriteOutcome> {
        let name = normalize_name(new_name)?;
        self.modify(workspace_id, |ws| ws.name = name).await
    }

    /// Sets the title of the tab with `url` inside the workspace.
    pub async fn retitle_tab(
        &self,
        workspace_id: &str,
        url: &str,
        new_title: &str,
    ) -> Result<WriteOutcome> {
        let title = normalize_title(new_title)?;
        self.modify(workspace_id, |ws| {
            for tab in ws.tabs.iter_mut().filter(|tab| tab.url == url) {
                tab.title = title.clone();
            }
        })
        .await
    }

    pub async fn reorder_tabs(
        &self,
        workspace_id: &str,
        from: usize,
        to: usize,
    ) -> Result<WriteOutcome> {
        let Some(mut workspace) = self.fetch(workspace_id).await? else {
            return Ok(WriteOutcome::Missing);
        };
        workspace.tabs = reorder(&workspace.tabs, from, to)?;
        if from == to {
            return Ok(WriteOutcome::Applied);
        }
        self.repo.update(workspace).await
    }

    /// Applies a finished drag to whichever list it happened in. Staging
    /// moves only touch the session; workspace moves are persisted.
    pub async fn apply_drag(
        &self,
        session: &SessionState,
        outcome: &DragOutcome,
    ) -> Result<SessionState> {
        let Some(list_move) = resolve_move(outcome) else {
            return Ok(session.clone());
        };

        match list_move.list {
            ListId::Staging => Ok(session.reorder_staging(list_move.from, list_move.to)?),
            ListId::Workspace(workspace_id) => {
                self.reorder_tabs(&workspace_id, list_move.from, list_move.to)
                    .await?;
                Ok(session.clone())
            }
        }
    }

    /// Appends `tab` unless the workspace already holds its url.
    pub async fn add_tab(&self, workspace_id: &str, tab: TabRecord) -> Result<WriteOutcome> {
        self.add_tabs(workspace_id, vec![tab]).await
    }

    /// Appends every tab whose url the workspace does not already hold, in
    /// the given order.
    pub async fn add_tabs(&self, workspace_id: &str, tabs: Vec<TabRecord>) -> Result<WriteOutcome> {
        let Some(mut workspace) = self.fetch(workspace_id).await? else {
            return Ok(WriteOutcome::Missing);
        };

        let before = workspace.tabs.len();
        for tab in tabs {
            if workspace.contains_url(&tab.url) {
                debug!(workspace_id = %workspace_id, url = %tab.url, "tab already in workspace");
                continue;
            }
            workspace.tabs.push(tab);
        }
        if workspace.tabs.len() == before {
            return Ok(WriteOutcome::Applied);
        }

        info!(workspace_id = %workspace_id, added = workspace.tabs.len() - before, "adding tabs to workspace");
        self.repo.update(workspace).await
    }

    pub async fn remove_tab(&self, workspace_id: &str, url: &str) -> Result<WriteOutcome> {
        self.modify(workspace_id, |ws| ws.tabs.retain(|tab| tab.url != url))
            .await
    }

    pub async fn delete(&self, workspace_id: &str) -> Result<WriteOutcome> {
        self.repo.delete(workspace_id).await
    }

    /// Flips the navigation bar flag and returns the new value.
    pub async fn toggle_navigation(&self) -> Result<bool> {
        let visible = !self.repo.navigation_visible().await?;
        self.repo.set_navigation_visible(visible).await?;
        Ok(visible)
    }

    async fn fetch(&self, workspace_id: &str) -> Result<Option<Workspace>> {
        let workspace = self.repo.get(workspace_id).await?;
        if workspace.is_none() {
            warn!(workspace_id = %workspace_id, "edit targets unknown workspace, ignoring");
        }
        Ok(workspace)
    }

    async fn modify(
        &self,
        workspace_id: &str,
        change: impl FnOnce(&mut Workspace),
    ) -> Result<WriteOutcome> {
        let Some(mut workspace) = self.fetch(workspace_id).await? else {
            return Ok(WriteOutcome::Missing);
        };
        change(&mut workspace);
        self.repo.update(workspace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TabspaceError;
    use crate::repository::WorkspaceRepository;
    use crate::state::spawn_repository_actor;
    use crate::store::{MemoryStore, PersistentStore};
    use std::sync::Arc;
    use tabspace_lib::ValidationError;
    use tabspace_lib::drag::DragTarget;

    fn start() -> (WorkspaceEditor, RepositoryHandle, tokio::task::JoinHandle<()>) {
        let store = PersistentStore::new(Arc::new(MemoryStore::new()));
        let (repo, _events, join) = spawn_repository_actor(WorkspaceRepository::new(store), 32, 32);
        (WorkspaceEditor::new(repo.clone()), repo, join)
    }

    fn staged() -> Vec<TabRecord> {
        vec![
            TabRecord::new("https://a", "A"),
            TabRecord::new("https://b", "B"),
            TabRecord::new("https://c", "C"),
        ]
    }

    async fn saved(editor: &WorkspaceEditor, name: &str) -> Workspace {
        let session = SessionState::new()
            .start_creating(staged())
            .with_draft_name(name);
        editor.save_workspace(&session).await.unwrap().0
    }

    fn urls(ws: &Workspace) -> Vec<&str> {
        ws.tabs.iter().map(|t| t.url.as_str()).collect()
    }

    #[tokio::test]
    async fn save_persists_selection_with_trimmed_name() {
        let (editor, repo, join) = start();
        let session = SessionState::new()
            .start_creating(staged())
            .toggle_selection("https://b")
            .with_edited_title("https://c", "Sea")
            .with_draft_name("  reading  ");

        let (ws, next) = editor.save_workspace(&session).await.unwrap();

        assert_eq!(ws.name, "reading");
        assert_eq!(urls(&ws), vec!["https://a", "https://c"]);
        assert_eq!(ws.tabs[1].title, "Sea");
        assert_eq!(ws.id, ws.created_at.to_string());
        assert!(!next.is_creating());
        assert_eq!(repo.list().await.unwrap(), vec![ws]);

        repo.shutdown().await;
        join.await.unwrap();
    }

    #[tokio::test]
    async fn save_rejects_blank_name() {
        let (editor, repo, join) = start();
        let session = SessionState::new()
            .start_creating(staged())
            .with_draft_name("   ");

        let err = editor.save_workspace(&session).await.unwrap_err();
        assert!(matches!(err, TabspaceError::Validation(ValidationError::EmptyName)));
        assert!(repo.list().await.unwrap().is_empty());

        repo.shutdown().await;
        join.await.unwrap();
    }

    #[tokio::test]
    async fn failed_save_leaves_form_to_fix_and_retry() {
        let (editor, repo, join) = start();
        let session = SessionState::new()
            .start_creating(staged())
            .toggle_selection("https://a")
            .with_edited_title("https://b", "Bee")
            .with_draft_name(" ");

        assert!(editor.save_workspace(&session).await.is_err());
        assert!(session.is_creating());
        assert_eq!(session.selected_urls.len(), 2);
        assert_eq!(session.edited_titles.get("https://b").map(String::as_str), Some("Bee"));

        let (ws, _) = editor
            .save_workspace(&session.clone().with_draft_name("fixed"))
            .await
            .unwrap();
        assert_eq!(urls(&ws), vec!["https://b", "https://c"]);
        assert_eq!(ws.tabs[0].title, "Bee");

        repo.shutdown().await;
        join.await.unwrap();
    }

    #[tokio::test]
    async fn out_of_range_staging_drag_leaves_session_unchanged() {
        let (editor, repo, join) = start();
        let session = SessionState::new()
            .start_creating(staged())
            .with_draft_name("draft");
        let before = session.clone();

        let bad_drag = DragOutcome {
            active: DragTarget::new(ListId::Staging, 5),
            over: Some(DragTarget::new(ListId::Staging, 0)),
        };
        let err = editor.apply_drag(&session, &bad_drag).await.unwrap_err();

        assert!(matches!(err, TabspaceError::Validation(ValidationError::Reorder(_))));
        assert_eq!(session, before);

        repo.shutdown().await;
        join.await.unwrap();
    }

    #[tokio::test]
    async fn consecutive_saves_get_distinct_ids() {
        let (editor, repo, join) = start();
        let first = saved(&editor, "one").await;
        let second = saved(&editor, "two").await;

        assert_ne!(first.id, second.id);
        assert_eq!(repo.list().await.unwrap().len(), 2);

        repo.shutdown().await;
        join.await.unwrap();
    }

    #[tokio::test]
    async fn rename_and_retitle() {
        let (editor, repo, join) = start();
        let ws = saved(&editor, "old").await;

        assert!(editor.rename(&ws.id, " new ").await.unwrap().is_applied());
        assert!(editor.retitle_tab(&ws.id, "https://b", "Bee").await.unwrap().is_applied());

        let stored = repo.get(&ws.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "new");
        assert_eq!(stored.tabs[1].title, "Bee");

        let err = editor.rename(&ws.id, "").await.unwrap_err();
        assert!(matches!(err, TabspaceError::Validation(ValidationError::EmptyName)));
        let err = editor.retitle_tab(&ws.id, "https://b", " ").await.unwrap_err();
        assert!(matches!(err, TabspaceError::Validation(ValidationError::EmptyTitle)));

        repo.shutdown().await;
        join.await.unwrap();
    }

    #[tokio::test]
    async fn edits_to_missing_workspace_are_soft() {
        let (editor, repo, join) = start();

        assert_eq!(editor.rename("gone", "x").await.unwrap(), WriteOutcome::Missing);
        assert_eq!(editor.reorder_tabs("gone", 0, 1).await.unwrap(), WriteOutcome::Missing);
        assert_eq!(
            editor.add_tab("gone", TabRecord::new("https://z", "")).await.unwrap(),
            WriteOutcome::Missing
        );
        assert_eq!(editor.delete("gone").await.unwrap(), WriteOutcome::Missing);

        repo.shutdown().await;
        join.await.unwrap();
    }

    #[tokio::test]
    async fn reorder_tabs_persists_new_order() {
        let (editor, repo, join) = start();
        let ws = saved(&editor, "w").await;

        editor.reorder_tabs(&ws.id, 0, 2).await.unwrap();
        let stored = repo.get(&ws.id).await.unwrap().unwrap();
        assert_eq!(urls(&stored), vec!["https://b", "https://c", "https://a"]);

        let err = editor.reorder_tabs(&ws.id, 0, 3).await.unwrap_err();
        assert!(matches!(err, TabspaceError::Validation(ValidationError::Reorder(_))));

        repo.shutdown().await;
        join.await.unwrap();
    }

    #[tokio::test]
    async fn drag_routes_to_the_right_list() {
        let (editor, repo, join) = start();
        let ws = saved(&editor, "w").await;
        let session = SessionState::new().with_snapshot(staged(), false);

        let staging_drag = DragOutcome {
            active: DragTarget::new(ListId::Staging, 0),
            over: Some(DragTarget::new(ListId::Staging, 1)),
        };
        let session = editor.apply_drag(&session, &staging_drag).await.unwrap();
        let staged_urls: Vec<&str> = session.staging.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(staged_urls, vec!["https://b", "https://a", "https://c"]);
        let untouched = repo.get(&ws.id).await.unwrap().unwrap();
        assert_eq!(urls(&untouched), vec!["https://a", "https://b", "https://c"]);

        let workspace_drag = DragOutcome {
            active: DragTarget::new(ListId::Workspace(ws.id.clone()), 2),
            over: Some(DragTarget::new(ListId::Workspace(ws.id.clone()), 0)),
        };
        let after = editor.apply_drag(&session, &workspace_drag).await.unwrap();
        assert_eq!(after, session);
        let stored = repo.get(&ws.id).await.unwrap().unwrap();
        assert_eq!(urls(&stored), vec!["https://c", "https://a", "https://b"]);

        repo.shutdown().await;
        join.await.unwrap();
    }

    #[tokio::test]
    async fn add_tabs_skips_known_urls() {
        let (editor, repo, join) = start();
        let ws = saved(&editor, "w").await;

        editor
            .add_tabs(
                &ws.id,
                vec![
                    TabRecord::new("https://b", "dupe"),
                    TabRecord::new("https://d", "D"),
                ],
            )
            .await
            .unwrap();
        editor
            .add_tab(&ws.id, TabRecord::new("https://d", "again"))
            .await
            .unwrap();

        let stored = repo.get(&ws.id).await.unwrap().unwrap();
        assert_eq!(
            urls(&stored),
            vec!["https://a", "https://b", "https://c", "https://d"]
        );
        assert_eq!(stored.tabs[1].title, "B");

        repo.shutdown().await;
        join.await.unwrap();
    }

    #[tokio::test]
    async fn remove_tab_and_delete() {
        let (editor, repo, join) = start();
        let ws = saved(&editor, "w").await;

        editor.remove_tab(&ws.id, "https://a").await.unwrap();
        let stored = repo.get(&ws.id).await.unwrap().unwrap();
        assert_eq!(urls(&stored), vec!["https://b", "https://c"]);

        assert!(editor.delete(&ws.id).await.unwrap().is_applied());
        assert!(repo.list().await.unwrap().is_empty());

        repo.shutdown().await;
        join.await.unwrap();
    }

    #[tokio::test]
    async fn toggle_navigation_flips_flag() {
        let (editor, repo, join) = start();

        assert!(!editor.toggle_navigation().await.unwrap());
        assert!(editor.toggle_navigation().await.unwrap());
        assert!(repo.navigation_visible().await.unwrap());

        repo.shutdown().await;
        join.await.unwrap();
    }
}
