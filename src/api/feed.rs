use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwapOption;
use futures_concurrency::future::Join;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::ClientError,
    http::{HttpClient, HttpRequest},
    models::{FeedSnapshot, NewsItem, Source},
    paths::{scraper_path, NEWS_LIST_PATH},
    util::cancellable,
};

/// Decides whether the backend's cached list is usable or a scrape is needed,
/// and holds the latest snapshot per source.
///
/// Each source has its own slot; a slot is only ever replaced wholesale.
#[derive(Clone)]
pub struct FeedController<H> {
    http: H,
    snapshots: Arc<HashMap<Source, ArcSwapOption<FeedSnapshot>>>,
}

impl<H: HttpClient> FeedController<H> {
    pub fn new(http: H) -> Self {
        let snapshots: HashMap<_, _> = Source::all()
            .map(|source| (source, ArcSwapOption::empty()))
            .collect();
        Self {
            http,
            snapshots: Arc::new(snapshots),
        }
    }

    /// Latest committed snapshot for `source`, if any.
    pub fn snapshot(&self, source: Source) -> Option<Arc<FeedSnapshot>> {
        self.snapshots.get(&source).and_then(|slot| slot.load_full())
    }

    /// Fetch the list for `source`; when it comes back empty or absent, trigger
    /// a scrape and fetch exactly once more, using whatever that returns.
    #[instrument(skip(self, cancel), fields(source = %source))]
    pub async fn synchronize(
        &self,
        source: Source,
        cancel: &CancellationToken,
    ) -> Result<Arc<FeedSnapshot>, ClientError> {
        let items = match cancellable(cancel, self.fetch_list(source)).await? {
            Some(items) if !items.is_empty() => {
                debug!(count = items.len(), "Backend list is populated");
                items
            }
            _ => {
                info!("Backend list is empty, triggering scrape");
                self.scrape_best_effort(source, cancel).await?;
                cancellable(cancel, self.fetch_list(source))
                    .await?
                    .unwrap_or_default()
            }
        };

        self.commit(source, items, cancel)
    }

    /// Always re-scrape, then fetch once. Used for user-initiated reloads.
    #[instrument(skip(self, cancel), fields(source = %source))]
    pub async fn refresh(
        &self,
        source: Source,
        cancel: &CancellationToken,
    ) -> Result<Arc<FeedSnapshot>, ClientError> {
        self.scrape_best_effort(source, cancel).await?;
        let items = cancellable(cancel, self.fetch_list(source))
            .await?
            .unwrap_or_default();
        self.commit(source, items, cancel)
    }

    /// Synchronize several sources concurrently. Results come back in input order.
    pub async fn synchronize_all(
        &self,
        sources: &[Source],
        cancel: &CancellationToken,
    ) -> Vec<(Source, Result<Arc<FeedSnapshot>, ClientError>)> {
        sources
            .iter()
            .map(|&source| async move { (source, self.synchronize(source, cancel).await) })
            .collect::<Vec<_>>()
            .join()
            .await
    }

    /// `None` when the backend answers with an empty body or `null`.
    pub async fn fetch_list(&self, source: Source) -> Result<Option<Vec<NewsItem>>, ClientError> {
        let req = HttpRequest::get(NEWS_LIST_PATH).query("search", source.key());
        let value = self.http.request_json(req).await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    pub async fn trigger_scrape(&self, source: Source) -> Result<(), ClientError> {
        let req = HttpRequest::get(scraper_path(source.scraper_key().as_str()));
        self.http.request_empty(req).await
    }

    // The data may already exist from an earlier scrape, so only cancellation stops the flow.
    async fn scrape_best_effort(
        &self,
        source: Source,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        match cancellable(cancel, self.trigger_scrape(source)).await {
            Ok(()) => Ok(()),
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(e) => {
                warn!(error = %e, "Scrape trigger failed, fetching anyway");
                Ok(())
            }
        }
    }

    fn commit(
        &self,
        source: Source,
        items: Vec<NewsItem>,
        cancel: &CancellationToken,
    ) -> Result<Arc<FeedSnapshot>, ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        let snapshot = Arc::new(FeedSnapshot::new(source, items));
        if let Some(slot) = self.snapshots.get(&source) {
            slot.store(Some(Arc::clone(&snapshot)));
        }
        info!(count = snapshot.len(), "Feed snapshot replaced");
        Ok(snapshot)
    }
}
