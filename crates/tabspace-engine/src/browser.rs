use async_trait::async_trait;
use tabspace_lib::TabId;
use tokio::sync::broadcast;

use crate::error::BrowserError;

/// A live tab as the browser reports it. Fields the browser has not filled
/// in yet (a tab still loading) are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserTab {
    pub id: TabId,
    pub url: Option<String>,
    pub title: Option<String>,
    pub fav_icon_url: Option<String>,
    pub pinned: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabQuery {
    /// Every tab of the current window, in window order.
    CurrentWindow,
    /// Tabs whose url is exactly this one.
    MatchingUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTab {
    pub url: String,
    pub pinned: bool,
    pub active: bool,
}

impl CreateTab {
    /// A background tab that does not take focus.
    pub fn background(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pinned: false,
            active: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateTab {
    pub active: Option<bool>,
    pub pinned: Option<bool>,
}

impl UpdateTab {
    pub fn focus() -> Self {
        Self {
            active: Some(true),
            pinned: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    Created(TabId),
    Removed(TabId),
    Updated(TabId),
    Moved { id: TabId, from: usize, to: usize },
}

/// The browser's tab API. Implemented by the host embedding the engine.
#[async_trait]
pub trait BrowserTabs: Send + Sync {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<BrowserTab>, BrowserError>;

    async fn create_tab(&self, request: CreateTab) -> Result<BrowserTab, BrowserError>;

    async fn remove_tab(&self, id: TabId) -> Result<(), BrowserError>;

    async fn update_tab(&self, id: TabId, update: UpdateTab) -> Result<(), BrowserError>;

    /// Tab events fired by the browser, including ones caused by the user.
    fn subscribe(&self) -> broadcast::Receiver<TabEvent>;
}
