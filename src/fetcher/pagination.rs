use std::collections::HashSet;
use std::sync::Arc;

use crate::app::Result;
use crate::domain::Feed;
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::store::Store;

/// Walks one feed's pagination chain, page by page.
///
/// Pages are strictly sequential within a feed: page N+1's URL is only known
/// once page N is parsed.
pub struct FeedWalker {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
}

impl FeedWalker {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self {
            fetcher,
            normalizer: Normalizer::new(),
        }
    }

    /// Fetch every page of the feed rooted at `start_url`, upserting the feed
    /// row and each page's posts as they arrive. Returns the number of posts
    /// written.
    ///
    /// The visited set is extended before each request, so a chain that loops
    /// back on an already-seen page (including a page naming itself) stops
    /// instead of refetching forever. Any page failing to download or parse
    /// fails the whole feed; pages committed before the failure stay stored.
    pub async fn fetch_feed<S: Store>(&self, start_url: &str, store: &S) -> Result<usize> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut cursor = Some(start_url.to_string());
        let mut written = 0;

        while let Some(page_url) = cursor {
            if !visited.insert(page_url.clone()) {
                tracing::debug!("pagination loop at {}, stopping", page_url);
                break;
            }

            let body = self.fetcher.fetch(&page_url).await?;
            let (meta, posts) = self.normalizer.normalize(start_url, &body)?;

            // Metadata always lands under the feed's entry URL, whichever
            // page delivered it; the cursor column tracks the latest page.
            store.upsert_feed(&Feed {
                url: start_url.to_string(),
                title: meta.title,
                author: meta.author,
                avatar: meta.avatar,
                next_page: meta.next_page.clone(),
            })?;
            written += store.upsert_posts(&posts)?;

            cursor = meta.next_page;
        }

        tracing::debug!(
            "fetched {} pages, {} posts from {}",
            visited.len(),
            written,
            start_url
        );

        Ok(written)
    }
}
