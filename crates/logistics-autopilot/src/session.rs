//! Detail views opened alongside an action, such as the freight page shown
//! after a trip is accepted.
//!
//! Abstracted behind [`SessionOrchestrator`] so the autopilot can run with
//! real page loads, or with no side effects at all.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::join_all;

use crate::config::AutopilotConfig;
use crate::fetcher::{FetchRequest, PageFetcher};
use crate::types::EntityId;

/// Token for a group of views opened together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewHandle {
    pub id: u64,
    /// Entities whose view actually loaded.
    pub opened: Vec<EntityId>,
}

#[async_trait]
pub trait SessionOrchestrator: Send + Sync {
    /// Open one view per id concurrently.
    async fn open_concurrent_views(&self, ids: &[EntityId]) -> ViewHandle;
    /// Close every view behind `handle`.
    async fn close_all(&self, handle: ViewHandle);
    /// Number of views currently open.
    fn open_views(&self) -> usize;
}

/// Does nothing. Used when no follow-up views are wanted.
pub struct NoopOrchestrator;

#[async_trait]
impl SessionOrchestrator for NoopOrchestrator {
    async fn open_concurrent_views(&self, _ids: &[EntityId]) -> ViewHandle {
        ViewHandle {
            id: 0,
            opened: Vec::new(),
        }
    }
    async fn close_all(&self, _handle: ViewHandle) {}
    fn open_views(&self) -> usize {
        0
    }
}

/// Opens a view by loading the freight detail page of each id.
pub struct DetailViewOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    config: Arc<AutopilotConfig>,
    next_handle: AtomicU64,
    open: Mutex<HashMap<u64, Vec<EntityId>>>,
}

impl DetailViewOrchestrator {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: Arc<AutopilotConfig>) -> Self {
        Self {
            fetcher,
            config,
            next_handle: AtomicU64::new(1),
            open: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SessionOrchestrator for DetailViewOrchestrator {
    async fn open_concurrent_views(&self, ids: &[EntityId]) -> ViewHandle {
        let loads = ids.iter().map(|id| {
            let url = self.config.url(&self.config.endpoints.freight_detail, Some(id));
            async move {
                match self.fetcher.fetch(FetchRequest::get(url)).await {
                    Ok(resp) if resp.is_success() => Some(id.clone()),
                    Ok(resp) => {
                        tracing::warn!("View for freight {id} answered HTTP {}", resp.status);
                        None
                    }
                    Err(e) => {
                        tracing::warn!("View for freight {id} failed: {e}");
                        None
                    }
                }
            }
        });
        let opened: Vec<EntityId> = join_all(loads).await.into_iter().flatten().collect();

        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut open) = self.open.lock() {
            open.insert(id, opened.clone());
        }
        tracing::debug!("Opened {} view(s) under handle {id}", opened.len());
        ViewHandle { id, opened }
    }

    async fn close_all(&self, handle: ViewHandle) {
        if let Ok(mut open) = self.open.lock() {
            open.remove(&handle.id);
        }
    }

    fn open_views(&self) -> usize {
        self.open
            .lock()
            .map(|open| open.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::fetcher::HttpFetcher;

    #[tokio::test]
    async fn test_detail_views_open_and_close() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("n", "11"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Freight #11</h1>"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("n", "12"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let config = Arc::new(AutopilotConfig {
            base_url: format!("{}/eu1/", server.uri()),
            ..Default::default()
        });
        let views = DetailViewOrchestrator::new(Arc::new(HttpFetcher::new(&config).unwrap()), config);
        let ids = [EntityId::parse("11").unwrap(), EntityId::parse("12").unwrap()];

        let handle = views.open_concurrent_views(&ids).await;
        assert_eq!(handle.opened, vec![ids[0].clone()]);
        assert_eq!(views.open_views(), 1);

        views.close_all(handle).await;
        assert_eq!(views.open_views(), 0);
    }

    #[tokio::test]
    async fn test_noop_opens_nothing() {
        let handle = NoopOrchestrator
            .open_concurrent_views(&[EntityId::parse("1").unwrap()])
            .await;
        assert!(handle.opened.is_empty());
        NoopOrchestrator.close_all(handle).await;
    }
}
