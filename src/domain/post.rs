use serde::{Deserialize, Serialize};

/// Identity of a post: ids are only unique within their owning feed.
pub type PostKey = (String, i64);

/// The post another post replies to, possibly in a different feed.
///
/// The URL is an opaque pointer; nothing guarantees the target feed was ever
/// ingested. Unresolvable targets degrade to roots at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub feed_url: String,
    pub post_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub feed_url: String,
    pub title: String,
    pub text: String,
    /// Unix timestamp, integer seconds.
    pub date: i64,
    pub reply_to: Option<ReplyTarget>,
}

impl Post {
    pub fn key(&self) -> PostKey {
        (self.feed_url.clone(), self.id)
    }

    pub fn is_root(&self) -> bool {
        self.reply_to.is_none()
    }
}

/// A post joined with its owning feed's author and avatar, as produced by the
/// full date-descending scan.
#[derive(Debug, Clone)]
pub struct JoinedPost {
    pub post: Post,
    pub author: Option<String>,
    pub avatar: Option<String>,
}
