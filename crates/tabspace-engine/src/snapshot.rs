use std::sync::Arc;
use std::time::Duration;
use tabspace_lib::TabRecord;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::browser::{BrowserTab, BrowserTabs, TabQuery};
use crate::error::Result;

/// Reads the live tab set of the current window as portable records.
#[derive(Clone)]
pub struct TabSnapshotAdapter {
    browser: Arc<dyn BrowserTabs>,
}

impl TabSnapshotAdapter {
    pub fn new(browser: Arc<dyn BrowserTabs>) -> Self {
        Self { browser }
    }

    /// Every tab of the current window in window order, minus any tab whose
    /// url equals `exclude_url`. Always queries the browser; tabs come and go
    /// outside our control, so results must not be reused across awaits.
    pub async fn snapshot(&self, exclude_url: Option<&str>) -> Result<Vec<TabRecord>> {
        let tabs = self.browser.query_tabs(TabQuery::CurrentWindow).await?;
        Ok(to_records(tabs, exclude_url))
    }
}

pub fn to_record(tab: BrowserTab) -> TabRecord {
    TabRecord {
        url: tab.url.unwrap_or_default(),
        title: tab.title.unwrap_or_default(),
        fav_icon_url: tab.fav_icon_url.unwrap_or_default(),
    }
}

fn to_records(tabs: Vec<BrowserTab>, exclude_url: Option<&str>) -> Vec<TabRecord> {
    tabs.into_iter()
        .filter(|tab| exclude_url.is_none() || tab.url.as_deref() != exclude_url)
        .map(to_record)
        .collect()
}

// === Watcher ===

/// Re-snapshots the window whenever the browser reports tab activity.
///
/// Events arriving within `debounce` of each other are folded into one
/// snapshot. The task ends when the browser's event stream closes or the
/// receiving side of `tx` is dropped.
pub fn spawn_tab_watcher(
    adapter: TabSnapshotAdapter,
    mut events: broadcast::Receiver<crate::browser::TabEvent>,
    exclude_url: Option<String>,
    debounce: Duration,
    tx: mpsc::Sender<Vec<TabRecord>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!("tab watcher started");
        loop {
            match events.recv().await {
                Ok(event) => debug!(?event, "tab event"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "tab watcher lagged, resnapshotting");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }

            // Swallow the rest of the burst.
            let mut closed = false;
            loop {
                match tokio::time::timeout(debounce, events.recv()).await {
                    Ok(Ok(_)) | Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                    Ok(Err(broadcast::error::RecvError::Closed)) => {
                        closed = true;
                        break;
                    }
                    Err(_) => break,
                }
            }

            match adapter.snapshot(exclude_url.as_deref()).await {
                Ok(tabs) => {
                    if tx.send(tabs).await.is_err() {
                        debug!("snapshot receiver dropped, stopping tab watcher");
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "failed to snapshot tabs"),
            }

            if closed {
                break;
            }
        }
        info!("tab watcher stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserTabs, CreateTab};
    use crate::simulated::SimulatedBrowser;
    use tokio::time::timeout;

    #[tokio::test]
    async fn snapshot_preserves_window_order() {
        let browser = Arc::new(SimulatedBrowser::with_tabs(&[
            "https://a", "https://b", "https://c",
        ]));
        let adapter = TabSnapshotAdapter::new(browser);

        let urls: Vec<String> = adapter
            .snapshot(None)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.url)
            .collect();
        assert_eq!(urls, vec!["https://a", "https://b", "https://c"]);
    }

    #[tokio::test]
    async fn snapshot_excludes_anchor_url() {
        let browser = Arc::new(SimulatedBrowser::with_tabs(&["https://a"]));
        browser
            .create_tab(CreateTab {
                url: "ext://options.html".to_string(),
                pinned: true,
                active: true,
            })
            .await
            .unwrap();
        let adapter = TabSnapshotAdapter::new(browser);

        let tabs = adapter.snapshot(Some("ext://options.html")).await.unwrap();
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].url, "https://a");

        let all = adapter.snapshot(None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn loading_tab_fields_default_to_empty() {
        let browser = Arc::new(SimulatedBrowser::new());
        browser
            .create_tab(CreateTab::background("https://slow"))
            .await
            .unwrap();
        let adapter = TabSnapshotAdapter::new(browser);

        let tabs = adapter.snapshot(None).await.unwrap();
        assert_eq!(tabs[0].title, "");
        assert_eq!(tabs[0].fav_icon_url, "");
    }

    #[tokio::test]
    async fn snapshot_is_never_cached() {
        let browser = Arc::new(SimulatedBrowser::with_tabs(&["https://a"]));
        let adapter = TabSnapshotAdapter::new(browser.clone());

        assert_eq!(adapter.snapshot(None).await.unwrap().len(), 1);
        browser
            .create_tab(CreateTab::background("https://b"))
            .await
            .unwrap();
        assert_eq!(adapter.snapshot(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn watcher_publishes_snapshot_after_burst() {
        let browser = Arc::new(SimulatedBrowser::with_tabs(&["https://a"]));
        let adapter = TabSnapshotAdapter::new(browser.clone());
        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_tab_watcher(
            adapter,
            browser.subscribe(),
            None,
            Duration::from_millis(20),
            tx,
        );

        let tab = browser
            .create_tab(CreateTab::background("https://b"))
            .await
            .unwrap();
        browser.finish_loading(tab.id, "B", "");

        let tabs = timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[1].title, "B");

        drop(rx);
        browser.finish_loading(tab.id, "B2", "");
        timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    }
}
