use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

// === Identifiers ===

pub type WorkspaceId = String;
pub type TabId = u64;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

// === Tab Record ===

/// Portable snapshot of a browser tab, detached from any live tab handle.
///
/// Two records with the same URL are the same tab as far as the model is
/// concerned; title and icon do not take part in equality.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fav_icon_url: String,
}

impl TabRecord {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            fav_icon_url: String::new(),
        }
    }

    pub fn with_icon(mut self, fav_icon_url: impl Into<String>) -> Self {
        self.fav_icon_url = fav_icon_url.into();
        self
    }
}

impl PartialEq for TabRecord {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for TabRecord {}

impl Hash for TabRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

// === Workspace ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    #[serde(default)]
    pub tabs: Vec<TabRecord>,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Workspace {
    pub fn new(
        id: impl Into<WorkspaceId>,
        name: impl Into<String>,
        tabs: Vec<TabRecord>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tabs,
            created_at,
            is_active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active == Some(true)
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.tabs.iter().any(|tab| tab.url == url)
    }
}

/// Returns the id of the workspace currently flagged active, if any.
pub fn active_workspace_id(workspaces: &[Workspace]) -> Option<&str> {
    workspaces
        .iter()
        .find(|ws| ws.is_active())
        .map(|ws| ws.id.as_str())
}
