//! Swapping the live tab set for a workspace's tab list.
//!
//! The window must never drop to zero tabs mid-swap (the browser would
//! close it and abort everything that follows), so a pinned anchor tab is
//! opened before anything is closed. Tabs to close are captured before any
//! tab is created, so tabs opened while a swap is running are left alone.

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tabspace_lib::{TabId, Workspace};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::browser::{BrowserTabs, CreateTab, TabQuery, UpdateTab};
use crate::error::Result;
use crate::repository::WriteOutcome;
use crate::state::RepositoryHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Idle,
    Swapping,
}

/// What a finished swap did to the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub anchor_tab: TabId,
    /// Ids of the tabs opened for the workspace, in creation order.
    pub opened: Vec<TabId>,
    pub closed: usize,
    /// Tabs that could not be closed, usually because they were already gone.
    pub close_failures: Vec<TabId>,
    /// Focused tab at the end. Equals `anchor_tab` when no opened tab could
    /// take focus.
    pub focused: TabId,
    /// Result of flagging the workspace active. `None` after `clear_tabs`,
    /// which flags nothing.
    pub marked_active: Option<WriteOutcome>,
}

pub struct ActivationController {
    browser: Arc<dyn BrowserTabs>,
    repo: RepositoryHandle,
    anchor_url: String,
    state_tx: watch::Sender<ActivationState>,
    swaps: AtomicUsize,
}

/// Holds the controller in `Swapping` while any swap is running and puts it
/// back to `Idle` when the last one ends, however it ends.
struct SwapGuard<'a> {
    state_tx: &'a watch::Sender<ActivationState>,
    swaps: &'a AtomicUsize,
}

impl<'a> SwapGuard<'a> {
    fn enter(state_tx: &'a watch::Sender<ActivationState>, swaps: &'a AtomicUsize) -> Self {
        // The counter only moves under the channel's write lock.
        state_tx.send_if_modified(|state| {
            swaps.fetch_add(1, Ordering::SeqCst);
            let changed = *state != ActivationState::Swapping;
            *state = ActivationState::Swapping;
            changed
        });
        Self { state_tx, swaps }
    }
}

impl Drop for SwapGuard<'_> {
    fn drop(&mut self) {
        let swaps = self.swaps;
        self.state_tx.send_if_modified(|state| {
            if swaps.fetch_sub(1, Ordering::SeqCst) != 1 {
                return false;
            }
            *state = ActivationState::Idle;
            true
        });
    }
}

impl ActivationController {
    pub fn new(
        browser: Arc<dyn BrowserTabs>,
        repo: RepositoryHandle,
        anchor_url: impl Into<String>,
    ) -> Self {
        let (state_tx, _state_rx) = watch::channel(ActivationState::Idle);
        Self {
            browser,
            repo,
            anchor_url: anchor_url.into(),
            state_tx,
            swaps: AtomicUsize::new(0),
        }
    }

    pub fn anchor_url(&self) -> &str {
        &self.anchor_url
    }

    pub fn state(&self) -> ActivationState {
        *self.state_tx.borrow()
    }

    /// Follows `Idle`/`Swapping` transitions, e.g. to disable UI controls.
    /// Stays `Swapping` until every overlapping swap has finished.
    pub fn watch_state(&self) -> watch::Receiver<ActivationState> {
        self.state_tx.subscribe()
    }

    /// Replaces the window's tabs with `workspace.tabs` and marks the
    /// workspace active.
    ///
    /// Not transactional: if the browser rejects a tab creation the swap
    /// stops there and the error is returned, leaving whatever was already
    /// opened in place. Calling `activate` again converges on the same end
    /// state.
    pub async fn activate(&self, workspace: &Workspace) -> Result<ActivationReport> {
        let _guard = SwapGuard::enter(&self.state_tx, &self.swaps);
        info!(workspace_id = %workspace.id, tabs = workspace.tabs.len(), "activating workspace");

        let old_ids = self.current_tab_ids().await?;
        let anchor_tab = self.create_anchor().await?;

        let mut opened = Vec::with_capacity(workspace.tabs.len());
        for tab in &workspace.tabs {
            if tab.url == self.anchor_url {
                continue;
            }
            let created = self
                .browser
                .create_tab(CreateTab::background(tab.url.clone()))
                .await
                .inspect_err(|e| {
                    warn!(
                        workspace_id = %workspace.id,
                        url = %tab.url,
                        opened = opened.len(),
                        error = %e,
                        "tab creation rejected, aborting activation"
                    );
                })?;
            opened.push(created.id);
        }

        let keep: HashSet<TabId> = opened.iter().copied().chain([anchor_tab]).collect();
        let to_close: Vec<TabId> = old_ids.into_iter().filter(|id| !keep.contains(id)).collect();
        let close_failures = self.close_tabs(&to_close).await;

        let focused = self.focus_first_opened(&opened).await.unwrap_or(anchor_tab);

        let marked_active = Some(self.repo.set_active(&workspace.id).await?);

        let report = ActivationReport {
            anchor_tab,
            closed: to_close.len() - close_failures.len(),
            opened,
            close_failures,
            focused,
            marked_active,
        };
        info!(
            workspace_id = %workspace.id,
            opened = report.opened.len(),
            closed = report.closed,
            close_failures = report.close_failures.len(),
            "workspace activated"
        );
        Ok(report)
    }

    /// Closes every tab except a fresh anchor and leaves no workspace active.
    pub async fn clear_tabs(&self) -> Result<ActivationReport> {
        let _guard = SwapGuard::enter(&self.state_tx, &self.swaps);
        info!("clearing tabs");

        let old_ids = self.current_tab_ids().await?;
        let anchor_tab = self.create_anchor().await?;
        self.repo.clear_active().await?;

        let to_close: Vec<TabId> = old_ids.into_iter().filter(|id| *id != anchor_tab).collect();
        let close_failures = self.close_tabs(&to_close).await;

        Ok(ActivationReport {
            anchor_tab,
            opened: Vec::new(),
            closed: to_close.len() - close_failures.len(),
            close_failures,
            focused: anchor_tab,
            marked_active: None,
        })
    }

    /// Focuses the anchor page, opening it pinned if no tab shows it yet.
    pub async fn open_anchor(&self) -> Result<TabId> {
        let existing = self
            .browser
            .query_tabs(TabQuery::MatchingUrl(self.anchor_url.clone()))
            .await?;

        if let Some(tab) = existing.first() {
            debug!(tab_id = tab.id, "focusing existing anchor tab");
            self.browser
                .update_tab(
                    tab.id,
                    UpdateTab {
                        active: Some(true),
                        pinned: Some(true),
                    },
                )
                .await?;
            return Ok(tab.id);
        }

        self.create_anchor().await
    }

    async fn current_tab_ids(&self) -> Result<Vec<TabId>> {
        let tabs = self.browser.query_tabs(TabQuery::CurrentWindow).await?;
        Ok(tabs.into_iter().map(|tab| tab.id).collect())
    }

    async fn create_anchor(&self) -> Result<TabId> {
        let anchor = self
            .browser
            .create_tab(CreateTab {
                url: self.anchor_url.clone(),
                pinned: true,
                active: true,
            })
            .await?;
        debug!(tab_id = anchor.id, "opened anchor tab");
        Ok(anchor.id)
    }

    /// Issues every close at once. Individual failures are logged and
    /// returned, never raised.
    async fn close_tabs(&self, ids: &[TabId]) -> Vec<TabId> {
        let results = join_all(ids.iter().map(|id| self.browser.remove_tab(*id))).await;

        ids.iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(()) => None,
                Err(e) => {
                    warn!(tab_id = *id, error = %e, "failed to close tab, continuing");
                    Some(*id)
                }
            })
            .collect()
    }

    /// Focuses the earliest-created tab from `opened` that is still open.
    /// Tabs the user closes in the meantime are skipped; `None` leaves focus
    /// on the anchor.
    async fn focus_first_opened(&self, opened: &[TabId]) -> Option<TabId> {
        if opened.is_empty() {
            return None;
        }

        let live: HashSet<TabId> = match self.current_tab_ids().await {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, "failed to re-query tabs before focusing");
                opened.iter().copied().collect()
            }
        };

        for id in opened.iter().copied().filter(|id| live.contains(id)) {
            match self.browser.update_tab(id, UpdateTab::focus()).await {
                Ok(()) => return Some(id),
                Err(e) => warn!(tab_id = id, error = %e, "failed to focus tab, trying next"),
            }
        }
        debug!("no opened tab could take focus, anchor keeps it");
        None
    }
}
