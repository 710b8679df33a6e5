use serde::{Deserialize, Serialize};

/// Feed metadata, keyed by the feed's entry URL.
///
/// A multi-page feed still has exactly one row; `next_page` holds the cursor
/// of the most recently fetched page (None once the chain is exhausted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub url: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub avatar: Option<String>,
    pub next_page: Option<String>,
}

impl Feed {
    pub fn new(url: String) -> Self {
        Self {
            url,
            title: None,
            author: None,
            avatar: None,
            next_page: None,
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_title_with_title() {
        let mut feed = Feed::new("https://a.test/feed".into());
        feed.title = Some("A".into());
        assert_eq!(feed.display_title(), "A");
    }

    #[test]
    fn test_display_title_falls_back_to_url() {
        let feed = Feed::new("https://a.test/feed".into());
        assert_eq!(feed.display_title(), "https://a.test/feed");
    }
}
