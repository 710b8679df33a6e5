use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{EddyError, Result};
use crate::domain::{Feed, JoinedPost, Post, ReplyTarget};
use crate::store::Store;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| EddyError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            EddyError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            url: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            avatar: row.get(3)?,
            next_page: row.get(4)?,
        })
    }
}

impl Store for SqliteStore {
    fn upsert_feed(&self, feed: &Feed) -> Result<()> {
        let conn = self.lock()?;

        // Full replace: the latest fetch of a feed URL wins wholesale, there
        // is no per-column merge.
        conn.execute(
            "INSERT OR REPLACE INTO feeds (url, title, author, avatar, next_page)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                feed.url,
                feed.title,
                feed.author,
                feed.avatar,
                feed.next_page
            ],
        )?;

        Ok(())
    }

    fn get_feed(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                "SELECT url, title, author, avatar, next_page FROM feeds WHERE url = ?1",
                params![url],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_all_feeds(&self) -> Result<Vec<Feed>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT url, title, author, avatar, next_page FROM feeds ORDER BY title, url",
        )?;

        let feeds = stmt
            .query_map([], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn upsert_post(&self, post: &Post) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR REPLACE INTO posts (id, feed_url, title, text, date, reply_to_url, reply_to_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                post.id,
                post.feed_url,
                post.title,
                post.text,
                post.date,
                post.reply_to.as_ref().map(|t| t.feed_url.as_str()),
                post.reply_to.as_ref().map(|t| t.post_id),
            ],
        )?;

        Ok(())
    }

    fn upsert_posts(&self, posts: &[Post]) -> Result<usize> {
        let mut conn = self.lock()?;

        let tx = conn.transaction()?;

        for post in posts {
            tx.execute(
                "INSERT OR REPLACE INTO posts (id, feed_url, title, text, date, reply_to_url, reply_to_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    post.id,
                    post.feed_url,
                    post.title,
                    post.text,
                    post.date,
                    post.reply_to.as_ref().map(|t| t.feed_url.as_str()),
                    post.reply_to.as_ref().map(|t| t.post_id),
                ],
            )?;
        }

        tx.commit()?;
        Ok(posts.len())
    }

    fn post_count(&self, feed_url: &str) -> Result<i64> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE feed_url = ?1",
            params![feed_url],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    fn get_posts_with_feeds(&self) -> Result<Vec<JoinedPost>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT p.id, p.feed_url, p.title, p.text, p.date, p.reply_to_url, p.reply_to_id,
                    f.author, f.avatar
             FROM posts p
             JOIN feeds f ON p.feed_url = f.url
             ORDER BY p.date DESC, p.feed_url ASC, p.id ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                let reply_to_url: Option<String> = row.get(5)?;
                let reply_to_id: Option<i64> = row.get(6)?;
                let reply_to = match (reply_to_url, reply_to_id) {
                    (Some(feed_url), Some(post_id)) => Some(ReplyTarget { feed_url, post_id }),
                    _ => None,
                };

                Ok(JoinedPost {
                    post: Post {
                        id: row.get(0)?,
                        feed_url: row.get(1)?,
                        title: row.get(2)?,
                        text: row.get(3)?,
                        date: row.get(4)?,
                        reply_to,
                    },
                    author: row.get(7)?,
                    avatar: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(url: &str) -> Feed {
        Feed {
            url: url.into(),
            title: Some("Feed".into()),
            author: Some("Author".into()),
            avatar: None,
            next_page: None,
        }
    }

    fn post(id: i64, feed_url: &str, date: i64) -> Post {
        Post {
            id,
            feed_url: feed_url.into(),
            title: format!("post {}", id),
            text: "body".into(),
            date,
            reply_to: None,
        }
    }

    #[test]
    fn test_upsert_and_get_feed() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_feed(&feed("https://a.test/feed")).unwrap();

        let retrieved = store.get_feed("https://a.test/feed").unwrap().unwrap();
        assert_eq!(retrieved.title, Some("Feed".into()));
        assert_eq!(retrieved.author, Some("Author".into()));
    }

    #[test]
    fn test_upsert_feed_is_full_replace() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_feed(&feed("https://a.test/feed")).unwrap();

        // Second fetch delivers fewer fields; the row must not keep the old
        // title around.
        let bare = Feed::new("https://a.test/feed".into());
        store.upsert_feed(&bare).unwrap();

        let retrieved = store.get_feed("https://a.test/feed").unwrap().unwrap();
        assert_eq!(retrieved, bare);

        let feeds = store.get_all_feeds().unwrap();
        assert_eq!(feeds.len(), 1);
    }

    #[test]
    fn test_get_feed_nonexistent() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_feed("https://a.test/feed").unwrap().is_none());
    }

    #[test]
    fn test_upsert_post_last_write_wins() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_feed(&feed("https://a.test/feed")).unwrap();

        store.upsert_post(&post(1, "https://a.test/feed", 1000)).unwrap();

        let mut edited = post(1, "https://a.test/feed", 1000);
        edited.text = "edited".into();
        store.upsert_post(&edited).unwrap();

        let rows = store.get_posts_with_feeds().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].post.text, "edited");
    }

    #[test]
    fn test_composite_key_isolation() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_feed(&feed("https://a.test/feed")).unwrap();
        store.upsert_feed(&feed("https://b.test/feed")).unwrap();

        // Same numeric id in two different feeds: two distinct rows.
        store.upsert_post(&post(1, "https://a.test/feed", 1000)).unwrap();
        store.upsert_post(&post(1, "https://b.test/feed", 2000)).unwrap();

        let rows = store.get_posts_with_feeds().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(store.post_count("https://a.test/feed").unwrap(), 1);
        assert_eq!(store.post_count("https://b.test/feed").unwrap(), 1);
    }

    #[test]
    fn test_upsert_posts_batch_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_feed(&feed("https://a.test/feed")).unwrap();

        let posts: Vec<Post> = (0..3).map(|i| post(i, "https://a.test/feed", 1000 + i)).collect();

        store.upsert_posts(&posts).unwrap();
        store.upsert_posts(&posts).unwrap();

        assert_eq!(store.post_count("https://a.test/feed").unwrap(), 3);
    }

    #[test]
    fn test_dangling_reply_target_is_stored() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_feed(&feed("https://a.test/feed")).unwrap();

        let mut p = post(1, "https://a.test/feed", 1000);
        p.reply_to = Some(ReplyTarget {
            feed_url: "https://never-fetched.test/feed".into(),
            post_id: 7,
        });

        // Reply targets are resolved at read time; the write never checks them.
        store.upsert_post(&p).unwrap();

        let rows = store.get_posts_with_feeds().unwrap();
        assert_eq!(rows[0].post.reply_to, p.reply_to);
    }

    #[test]
    fn test_join_order_is_date_descending() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_feed(&feed("https://a.test/feed")).unwrap();
        store.upsert_feed(&feed("https://b.test/feed")).unwrap();

        store.upsert_post(&post(1, "https://a.test/feed", 1000)).unwrap();
        store.upsert_post(&post(2, "https://b.test/feed", 3000)).unwrap();
        store.upsert_post(&post(3, "https://a.test/feed", 2000)).unwrap();

        let dates: Vec<i64> = store
            .get_posts_with_feeds()
            .unwrap()
            .iter()
            .map(|r| r.post.date)
            .collect();
        assert_eq!(dates, vec![3000, 2000, 1000]);
    }

    #[test]
    fn test_join_carries_feed_author_and_avatar() {
        let store = SqliteStore::in_memory().unwrap();

        let mut f = feed("https://a.test/feed");
        f.avatar = Some("https://a.test/avatar.png".into());
        store.upsert_feed(&f).unwrap();
        store.upsert_post(&post(1, "https://a.test/feed", 1000)).unwrap();

        let rows = store.get_posts_with_feeds().unwrap();
        assert_eq!(rows[0].author, Some("Author".into()));
        assert_eq!(rows[0].avatar, Some("https://a.test/avatar.png".into()));
    }

    #[test]
    fn test_on_disk_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eddy.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.upsert_feed(&feed("https://a.test/feed")).unwrap();
            store.upsert_post(&post(1, "https://a.test/feed", 1000)).unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.post_count("https://a.test/feed").unwrap(), 1);
    }
}
