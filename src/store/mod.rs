pub mod sqlite;

use crate::app::Result;
use crate::domain::{Feed, JoinedPost, Post};

pub use sqlite::SqliteStore;

/// Storage adapter for feeds and posts.
///
/// Upserts are atomic per row; callers never coordinate locking. Writes for
/// different feeds touch disjoint feed keys, so concurrent fetches need no
/// cross-feed transaction.
pub trait Store {
    // Feed operations
    fn upsert_feed(&self, feed: &Feed) -> Result<()>;
    fn get_feed(&self, url: &str) -> Result<Option<Feed>>;
    fn get_all_feeds(&self) -> Result<Vec<Feed>>;

    // Post operations
    fn upsert_post(&self, post: &Post) -> Result<()>;
    fn upsert_posts(&self, posts: &[Post]) -> Result<usize>;
    fn post_count(&self, feed_url: &str) -> Result<i64>;

    /// Every stored post joined with its owning feed, ordered by date
    /// descending (ties broken by feed URL, then id, so the scan order is
    /// stable across reads).
    fn get_posts_with_feeds(&self) -> Result<Vec<JoinedPost>>;
}
