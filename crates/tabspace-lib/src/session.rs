//! View-side state held between UI callbacks.
//!
//! Everything the shell tracks across callbacks (the staged tab list, which
//! rows are selected, edited titles, expanded workspaces, the draft name and
//! the field being edited) lives in one [`SessionState`]. Infallible
//! transitions take the state by value and hand back the next one; fallible
//! ones borrow it so a rejected input leaves the caller's state in hand.

use std::collections::{BTreeMap, BTreeSet};

use crate::reorder::{ReorderError, reorder};
use crate::types::{TabRecord, WorkspaceId};

/// The single field the user is currently editing inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    WorkspaceName(WorkspaceId),
    TabTitle { workspace_id: WorkspaceId, url: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Tabs open in the window, in the order the user arranged them.
    pub staging: Vec<TabRecord>,
    pub selected_urls: BTreeSet<String>,
    /// Titles typed over staged tabs before saving, keyed by url.
    pub edited_titles: BTreeMap<String, String>,
    pub expanded: BTreeSet<WorkspaceId>,
    /// `Some` while the create form is open; holds the name typed so far.
    pub draft_name: Option<String>,
    pub editing: Option<EditTarget>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the staged list with a fresh snapshot of the window.
    pub fn with_snapshot(mut self, tabs: Vec<TabRecord>, select_all: bool) -> Self {
        if select_all {
            self.selected_urls = tabs.iter().map(|tab| tab.url.clone()).collect();
        }
        self.staging = tabs;
        self
    }

    /// Opens the create form with every staged tab preselected.
    pub fn start_creating(self, tabs: Vec<TabRecord>) -> Self {
        let mut next = self.with_snapshot(tabs, true);
        next.draft_name = Some(String::new());
        next
    }

    pub fn cancel_creating(mut self) -> Self {
        self.draft_name = None;
        self.selected_urls.clear();
        self
    }

    pub fn with_draft_name(mut self, name: impl Into<String>) -> Self {
        self.draft_name = Some(name.into());
        self
    }

    pub fn is_creating(&self) -> bool {
        self.draft_name.is_some()
    }

    pub fn toggle_selection(mut self, url: &str) -> Self {
        if !self.selected_urls.remove(url) {
            self.selected_urls.insert(url.to_string());
        }
        self
    }

    pub fn select_all(mut self) -> Self {
        self.selected_urls = self.staging.iter().map(|tab| tab.url.clone()).collect();
        self
    }

    pub fn deselect_all(mut self) -> Self {
        self.selected_urls.clear();
        self
    }

    pub fn with_edited_title(mut self, url: impl Into<String>, title: impl Into<String>) -> Self {
        self.edited_titles.insert(url.into(), title.into());
        self
    }

    pub fn toggle_expanded(mut self, workspace_id: &str) -> Self {
        if !self.expanded.remove(workspace_id) {
            self.expanded.insert(workspace_id.to_string());
        }
        self
    }

    pub fn begin_edit(mut self, target: EditTarget) -> Self {
        self.editing = Some(target);
        self
    }

    pub fn finish_edit(mut self) -> Self {
        self.editing = None;
        self
    }

    /// Returns the state with the staged list reordered. Nothing is
    /// persisted, and `self` is untouched when an index is out of range.
    pub fn reorder_staging(&self, from: usize, to: usize) -> Result<Self, ReorderError> {
        let staging = reorder(&self.staging, from, to)?;
        Ok(Self {
            staging,
            ..self.clone()
        })
    }

    /// Selected staged tabs in staging order, with edited titles applied.
    pub fn selected_tabs(&self) -> Vec<TabRecord> {
        self.staging
            .iter()
            .filter(|tab| self.selected_urls.contains(&tab.url))
            .map(|tab| {
                let title = self
                    .edited_titles
                    .get(&tab.url)
                    .filter(|title| !title.is_empty())
                    .cloned()
                    .unwrap_or_else(|| tab.title.clone());
                TabRecord {
                    url: tab.url.clone(),
                    title,
                    fav_icon_url: tab.fav_icon_url.clone(),
                }
            })
            .collect()
    }

    /// Whether the create form has enough input to save.
    pub fn can_save(&self) -> bool {
        let has_name = self
            .draft_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty());
        has_name && !self.selected_urls.is_empty()
    }

    /// State after a successful save: form closed, selection and edits gone.
    pub fn after_save(mut self) -> Self {
        self.draft_name = None;
        self.selected_urls.clear();
        self.edited_titles.clear();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tabs() -> Vec<TabRecord> {
        vec![
            TabRecord::new("https://a", "A"),
            TabRecord::new("https://b", "B"),
            TabRecord::new("https://c", "C"),
        ]
    }

    #[test]
    fn start_creating_selects_every_tab() {
        let state = SessionState::new().start_creating(tabs());

        assert!(state.is_creating());
        assert_eq!(state.selected_urls.len(), 3);
        assert!(!state.can_save(), "blank draft name must not be savable");
    }

    #[test]
    fn plain_snapshot_keeps_selection() {
        let state = SessionState::new()
            .start_creating(tabs())
            .toggle_selection("https://b")
            .with_snapshot(tabs(), false);

        assert!(!state.selected_urls.contains("https://b"));
        assert_eq!(state.selected_urls.len(), 2);
    }

    #[test]
    fn toggle_selection_flips_membership() {
        let state = SessionState::new()
            .with_snapshot(tabs(), false)
            .toggle_selection("https://a");
        assert!(state.selected_urls.contains("https://a"));

        let state = state.toggle_selection("https://a");
        assert!(state.selected_urls.is_empty());
    }

    #[test]
    fn selected_tabs_follow_staging_order_and_apply_edits() {
        let state = SessionState::new()
            .start_creating(tabs())
            .toggle_selection("https://b")
            .reorder_staging(2, 0)
            .unwrap()
            .with_edited_title("https://c", "Renamed C")
            .with_edited_title("https://a", "");

        let selected = state.selected_tabs();
        let urls: Vec<&str> = selected.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, vec!["https://c", "https://a"]);
        assert_eq!(selected[0].title, "Renamed C");
        assert_eq!(selected[1].title, "A", "empty edit falls back to original");
    }

    #[test]
    fn can_save_needs_name_and_selection() {
        let state = SessionState::new()
            .start_creating(tabs())
            .with_draft_name("  reading ");
        assert!(state.can_save());

        let state = state.deselect_all();
        assert!(!state.can_save());
    }

    #[test]
    fn cancel_and_save_reset_the_form() {
        let state = SessionState::new()
            .start_creating(tabs())
            .with_draft_name("x")
            .with_edited_title("https://a", "AA");

        let cancelled = state.clone().cancel_creating();
        assert!(!cancelled.is_creating());
        assert!(cancelled.selected_urls.is_empty());

        let saved = state.after_save();
        assert!(!saved.is_creating());
        assert!(saved.edited_titles.is_empty());
        assert_eq!(saved.staging.len(), 3);
    }

    #[test]
    fn expanded_and_edit_target_are_tracked() {
        let state = SessionState::new()
            .toggle_expanded("7")
            .begin_edit(EditTarget::TabTitle {
                workspace_id: "7".to_string(),
                url: "https://a".to_string(),
            });
        assert!(state.expanded.contains("7"));
        assert!(state.editing.is_some());

        let state = state.toggle_expanded("7").finish_edit();
        assert!(state.expanded.is_empty());
        assert_eq!(state.editing, None);
    }

    #[test]
    fn reorder_staging_rejects_bad_index() {
        let state = SessionState::new().with_snapshot(tabs(), false);
        assert!(state.reorder_staging(0, 3).is_err());
    }

    #[test]
    fn failed_reorder_keeps_the_form() {
        let state = SessionState::new()
            .start_creating(tabs())
            .toggle_selection("https://b")
            .with_edited_title("https://a", "AA")
            .with_draft_name("draft");

        assert!(state.reorder_staging(3, 0).is_err());

        let urls: Vec<&str> = state.staging.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a", "https://b", "https://c"]);
        assert_eq!(state.selected_urls.len(), 2);
        assert_eq!(state.draft_name.as_deref(), Some("draft"));
        assert!(state.can_save());
    }
}
