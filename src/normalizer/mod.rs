use serde::{Deserialize, Deserializer};

use crate::app::{EddyError, Result};
use crate::domain::{Post, ReplyTarget};

/// Feed-level fields of a single page.
#[derive(Debug, Clone)]
pub struct PageMeta {
    pub title: Option<String>,
    pub author: Option<String>,
    pub avatar: Option<String>,
    /// URL of the next page; None means the chain ends here. An absent field
    /// and an explicit null are equivalent.
    pub next_page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    feed_title: Option<String>,
    #[serde(default)]
    feed_author: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    next_page: Option<String>,
    #[serde(default)]
    posts: Vec<RawPost>,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    #[serde(deserialize_with = "coerced_i64")]
    id: i64,
    title: String,
    text: String,
    #[serde(deserialize_with = "coerced_i64")]
    date: i64,
    #[serde(default, deserialize_with = "reply_target")]
    reply_to: Option<(String, i64)>,
}

/// Accepts an integer or a numeric string. Feed authors serialize ids and
/// dates inconsistently across implementations.
fn coerced_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected an integer, got {:?}", s))),
    }
}

/// A reply target is exactly a two-element array: [feed URL, post id].
fn reply_target<'de, D>(deserializer: D) -> std::result::Result<Option<(String, i64)>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Target(String, #[serde(deserialize_with = "coerced_i64")] i64);

    let target = Option::<Target>::deserialize(deserializer)?;
    Ok(target.map(|Target(url, id)| (url, id)))
}

/// Parses one fetched page into feed metadata and the posts it carries.
///
/// Posts are keyed under `feed_url`, the feed's entry URL, regardless of
/// which page of the chain delivered them.
#[derive(Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, feed_url: &str, body: &[u8]) -> Result<(PageMeta, Vec<Post>)> {
        let page: RawPage =
            serde_json::from_slice(body).map_err(|e| EddyError::PageParse(e.to_string()))?;

        let meta = PageMeta {
            title: page.feed_title,
            author: page.feed_author,
            avatar: page.avatar,
            next_page: page.next_page,
        };

        let posts = page
            .posts
            .into_iter()
            .map(|raw| Post {
                id: raw.id,
                feed_url: feed_url.to_string(),
                title: raw.title,
                text: raw.text,
                date: raw.date,
                reply_to: raw.reply_to.map(|(feed_url, post_id)| ReplyTarget {
                    feed_url,
                    post_id,
                }),
            })
            .collect();

        Ok((meta, posts))
    }
}
