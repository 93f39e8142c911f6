//! In-process browser with a single window, for tests and headless runs.
//!
//! Mirrors the browser behaviours the engine depends on: pinned tabs sit
//! before unpinned ones, closing the focused tab focuses a neighbour, and
//! closing the last tab closes the window for good.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use tabspace_lib::TabId;
use tokio::sync::broadcast;
use tracing::debug;

use crate::browser::{BrowserTab, BrowserTabs, CreateTab, TabEvent, TabQuery, UpdateTab};
use crate::error::BrowserError;

#[derive(Default)]
struct Window {
    tabs: Vec<BrowserTab>,
    next_id: TabId,
    closed: bool,
    creates_left: Option<usize>,
    failing_removals: HashSet<TabId>,
}

impl Window {
    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::Rejected("window was closed".to_string()));
        }
        Ok(())
    }

    fn position(&self, id: TabId) -> Result<usize, BrowserError> {
        self.tabs
            .iter()
            .position(|tab| tab.id == id)
            .ok_or(BrowserError::TabNotFound(id))
    }

    fn focus(&mut self, id: TabId) {
        for tab in &mut self.tabs {
            tab.active = tab.id == id;
        }
    }

    fn insert(&mut self, tab: BrowserTab) -> usize {
        let index = if tab.pinned {
            self.tabs.iter().take_while(|t| t.pinned).count()
        } else {
            self.tabs.len()
        };
        self.tabs.insert(index, tab);
        index
    }
}

pub struct SimulatedBrowser {
    window: Mutex<Window>,
    event_tx: broadcast::Sender<TabEvent>,
}

impl SimulatedBrowser {
    pub fn new() -> Self {
        let (event_tx, _event_rx) = broadcast::channel(256);
        Self {
            window: Mutex::new(Window {
                next_id: 1,
                ..Window::default()
            }),
            event_tx,
        }
    }

    /// A browser whose window already holds `urls`, with the first focused.
    pub fn with_tabs(urls: &[&str]) -> Self {
        let browser = Self::new();
        {
            let mut window = browser.lock();
            for url in urls {
                let id = window.next_id;
                window.next_id += 1;
                window.tabs.push(BrowserTab {
                    id,
                    url: Some(url.to_string()),
                    title: Some(url.to_string()),
                    fav_icon_url: None,
                    pinned: false,
                    active: false,
                });
            }
            if let Some(first) = window.tabs.first().map(|tab| tab.id) {
                window.focus(first);
            }
        }
        browser
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        // The window is only touched in short non-panicking sections.
        self.window.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: TabEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("dropping tab event: no active subscribers");
        }
    }

    /// Lets the next `count` creations succeed and rejects every one after.
    pub fn reject_creates_after(&self, count: usize) {
        self.lock().creates_left = Some(count);
    }

    /// Makes removal of `id` fail as if the tab had already gone.
    pub fn fail_removal_of(&self, id: TabId) {
        self.lock().failing_removals.insert(id);
    }

    /// Current tabs in window order.
    pub fn tabs(&self) -> Vec<BrowserTab> {
        self.lock().tabs.clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.lock()
            .tabs
            .iter()
            .map(|tab| tab.url.clone().unwrap_or_default())
            .collect()
    }

    pub fn active_tab(&self) -> Option<BrowserTab> {
        self.lock().tabs.iter().find(|tab| tab.active).cloned()
    }

    pub fn is_window_closed(&self) -> bool {
        self.lock().closed
    }

    /// Fills in the title and icon of a tab that finished loading.
    pub fn finish_loading(&self, id: TabId, title: &str, fav_icon_url: &str) {
        {
            let mut window = self.lock();
            let Some(tab) = window.tabs.iter_mut().find(|tab| tab.id == id) else {
                return;
            };
            tab.title = Some(title.to_string());
            tab.fav_icon_url = Some(fav_icon_url.to_string());
        }
        self.emit(TabEvent::Updated(id));
    }

    /// Moves a tab the way a user drag in the tab strip would.
    pub fn move_tab(&self, id: TabId, to: usize) -> Result<(), BrowserError> {
        let from = {
            let mut window = self.lock();
            let from = window.position(id)?;
            let tab = window.tabs.remove(from);
            let to = to.min(window.tabs.len());
            window.tabs.insert(to, tab);
            from
        };
        self.emit(TabEvent::Moved { id, from, to });
        Ok(())
    }
}

impl Default for SimulatedBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserTabs for SimulatedBrowser {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<BrowserTab>, BrowserError> {
        let window = self.lock();
        window.ensure_open()?;
        let tabs = match query {
            TabQuery::CurrentWindow => window.tabs.clone(),
            TabQuery::MatchingUrl(url) => window
                .tabs
                .iter()
                .filter(|tab| tab.url.as_deref() == Some(url.as_str()))
                .cloned()
                .collect(),
        };
        Ok(tabs)
    }

    async fn create_tab(&self, request: CreateTab) -> Result<BrowserTab, BrowserError> {
        let tab = {
            let mut window = self.lock();
            window.ensure_open()?;
            match window.creates_left {
                Some(0) => {
                    return Err(BrowserError::Rejected(format!(
                        "cannot open {}",
                        request.url
                    )));
                }
                Some(ref mut left) => *left -= 1,
                None => {}
            }

            let id = window.next_id;
            window.next_id += 1;
            let tab = BrowserTab {
                id,
                url: Some(request.url),
                title: None,
                fav_icon_url: None,
                pinned: request.pinned,
                active: false,
            };
            window.insert(tab);
            if request.active || window.tabs.len() == 1 {
                window.focus(id);
            }
            let position = window.position(id)?;
            window.tabs[position].clone()
        };
        self.emit(TabEvent::Created(tab.id));
        Ok(tab)
    }

    async fn remove_tab(&self, id: TabId) -> Result<(), BrowserError> {
        {
            let mut window = self.lock();
            window.ensure_open()?;
            if window.failing_removals.contains(&id) {
                return Err(BrowserError::TabNotFound(id));
            }
            let index = window.position(id)?;
            let removed = window.tabs.remove(index);

            if window.tabs.is_empty() {
                window.closed = true;
            } else if removed.active {
                let neighbour = window.tabs[index.min(window.tabs.len() - 1)].id;
                window.focus(neighbour);
            }
        }
        self.emit(TabEvent::Removed(id));
        Ok(())
    }

    async fn update_tab(&self, id: TabId, update: UpdateTab) -> Result<(), BrowserError> {
        {
            let mut window = self.lock();
            window.ensure_open()?;
            let index = window.position(id)?;
            if let Some(pinned) = update.pinned
                && window.tabs[index].pinned != pinned
            {
                let mut tab = window.tabs.remove(index);
                tab.pinned = pinned;
                window.insert(tab);
            }
            if update.active == Some(true) {
                window.focus(id);
            }
        }
        self.emit(TabEvent::Updated(id));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<TabEvent> {
        self.event_tx.subscribe()
    }
}
