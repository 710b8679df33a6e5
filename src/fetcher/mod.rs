pub mod http_fetcher;
pub mod pagination;
pub mod parallel;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;
pub use pagination::FeedWalker;
pub use parallel::Ingestor;

/// Retrieval of a single page. Implementations surface any non-success
/// response as an error; pagination and parsing live above this seam.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
