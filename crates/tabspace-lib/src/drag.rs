use serde::{Deserialize, Serialize};

use crate::types::WorkspaceId;

/// Which tab list a draggable row belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ListId {
    /// The unsaved list of tabs currently open in the window.
    Staging,
    /// The saved tab list of one workspace.
    Workspace(WorkspaceId),
}

/// A row inside a tab list, identified by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DragTarget {
    pub list: ListId,
    pub index: usize,
}

impl DragTarget {
    pub fn new(list: ListId, index: usize) -> Self {
        Self { list, index }
    }
}

/// What the UI reports once a drag gesture ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragOutcome {
    pub active: DragTarget,
    /// `None` when the row was dropped outside any list.
    pub over: Option<DragTarget>,
}

/// A move to apply to one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMove {
    pub list: ListId,
    pub from: usize,
    pub to: usize,
}

/// Turns a finished drag into a move, or `None` when nothing should change:
/// the drop missed every row, crossed into a different list, or landed where
/// it started.
pub fn resolve_move(outcome: &DragOutcome) -> Option<ListMove> {
    let over = outcome.over.as_ref()?;
    if over.list != outcome.active.list || over.index == outcome.active.index {
        return None;
    }

    Some(ListMove {
        list: outcome.active.list.clone(),
        from: outcome.active.index,
        to: over.index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace_row(id: &str, index: usize) -> DragTarget {
        DragTarget::new(ListId::Workspace(id.to_string()), index)
    }

    #[test]
    fn drop_on_other_row_resolves_to_move() {
        let outcome = DragOutcome {
            active: workspace_row("17", 0),
            over: Some(workspace_row("17", 2)),
        };

        assert_eq!(
            resolve_move(&outcome),
            Some(ListMove {
                list: ListId::Workspace("17".to_string()),
                from: 0,
                to: 2,
            })
        );
    }

    #[test]
    fn drop_outside_any_list_is_ignored() {
        let outcome = DragOutcome {
            active: DragTarget::new(ListId::Staging, 1),
            over: None,
        };
        assert_eq!(resolve_move(&outcome), None);
    }

    #[test]
    fn drop_on_same_row_is_ignored() {
        let outcome = DragOutcome {
            active: DragTarget::new(ListId::Staging, 3),
            over: Some(DragTarget::new(ListId::Staging, 3)),
        };
        assert_eq!(resolve_move(&outcome), None);
    }

    #[test]
    fn drop_into_another_list_is_ignored() {
        let outcome = DragOutcome {
            active: workspace_row("1", 0),
            over: Some(workspace_row("2", 1)),
        };
        assert_eq!(resolve_move(&outcome), None);

        let outcome = DragOutcome {
            active: DragTarget::new(ListId::Staging, 0),
            over: Some(workspace_row("2", 1)),
        };
        assert_eq!(resolve_move(&outcome), None);
    }
}
