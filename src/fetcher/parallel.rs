use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::app::Result;
use crate::fetcher::{FeedWalker, Fetcher};
use crate::store::Store;

pub const DEFAULT_WORKERS: usize = 8;

/// Runs one feed walk per distinct seed URL, concurrently.
///
/// Feeds write disjoint keys, so no coordination beyond the store's own
/// row-level atomicity is needed. One feed failing never cancels a sibling;
/// outcomes are reported per URL.
pub struct Ingestor {
    walker: Arc<FeedWalker>,
    semaphore: Arc<Semaphore>,
}

impl Ingestor {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self::with_workers(fetcher, DEFAULT_WORKERS)
    }

    pub fn with_workers(fetcher: Arc<dyn Fetcher + Send + Sync>, workers: usize) -> Self {
        Self {
            walker: Arc::new(FeedWalker::new(fetcher)),
            semaphore: Arc::new(Semaphore::new(workers)),
        }
    }

    /// Ingest a batch of seed URLs, best effort. Always returns; per-URL
    /// errors ride along in the result instead of aborting the batch.
    /// Duplicate seeds are collapsed before dispatch.
    pub async fn ingest<S>(&self, urls: Vec<String>, store: Arc<S>) -> Vec<(String, Result<usize>)>
    where
        S: Store + Send + Sync + 'static,
    {
        let mut seen = HashSet::new();
        let mut handles = Vec::new();

        for url in urls {
            if !seen.insert(url.clone()) {
                continue;
            }

            let walker = self.walker.clone();
            let semaphore = self.semaphore.clone();
            let store = store.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");

                let result = walker.fetch_feed(&url, store.as_ref()).await;
                if let Err(ref e) = result {
                    tracing::warn!("fetch failed for {}: {}", url, e);
                }
                (url, result)
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::mock::MockFetcher;
    use crate::store::SqliteStore;

    const FEED_A: &str = "https://a.test/feed";
    const FEED_B: &str = "https://b.test/feed";

    fn ingestor(mock: &Arc<MockFetcher>) -> Ingestor {
        Ingestor::with_workers(mock.clone() as Arc<dyn Fetcher + Send + Sync>, 4)
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_siblings() {
        // FEED_B is unregistered and will fail; FEED_A must still land.
        let mock = Arc::new(MockFetcher::new().page(
            FEED_A,
            r#"{"posts":[{"id":1,"title":"Hi","text":"hello","date":1000}]}"#,
        ));
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let results = ingestor(&mock)
            .ingest(vec![FEED_A.into(), FEED_B.into()], store.clone())
            .await;

        assert_eq!(results.len(), 2);
        let by_url: std::collections::HashMap<_, _> = results
            .iter()
            .map(|(url, r)| (url.as_str(), r.is_ok()))
            .collect();
        assert!(by_url[FEED_A]);
        assert!(!by_url[FEED_B]);
        assert_eq!(store.post_count(FEED_A).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_seeds_fetched_once() {
        let mock = Arc::new(MockFetcher::new().page(
            FEED_A,
            r#"{"posts":[{"id":1,"title":"Hi","text":"hello","date":1000}]}"#,
        ));
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let results = ingestor(&mock)
            .ingest(vec![FEED_A.into(), FEED_A.into(), FEED_A.into()], store)
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(mock.hits_for(FEED_A), 1);
    }

    #[tokio::test]
    async fn test_concurrent_feeds_share_one_store() {
        let mock = Arc::new(
            MockFetcher::new()
                .page(
                    FEED_A,
                    r#"{"posts":[{"id":1,"title":"Hi","text":"hello","date":1000}]}"#,
                )
                .page(
                    FEED_B,
                    r#"{"posts":[{"id":1,"title":"Yo","text":"hey","date":2000}]}"#,
                ),
        );
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let results = ingestor(&mock)
            .ingest(vec![FEED_A.into(), FEED_B.into()], store.clone())
            .await;

        assert!(results.iter().all(|(_, r)| r.is_ok()));
        // Same id in both feeds: composite keys keep them apart.
        assert_eq!(store.get_posts_with_feeds().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_returns_empty() {
        let mock = Arc::new(MockFetcher::new());
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let results = ingestor(&mock).ingest(Vec::new(), store).await;

        assert!(results.is_empty());
        assert_eq!(mock.total_hits(), 0);
    }
}
