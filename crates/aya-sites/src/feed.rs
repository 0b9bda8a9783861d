use crate::model::{CheckResult, ImportItem};
use crate::provider::SiteProvider;
use aya_core::AyaError;
use aya_http::{HttpRequest, ResilientHttpClient};
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// RSS 2.0 / Atom-shaped feed adapter, the closest precedent in the wider
/// ecosystem for a source with no JSON API; `quick-xml`'s serde support
/// deserializes both shapes with the same minimal struct set.
pub struct FeedProvider {
    kind: String,
    feed_url_template: String,
    client: Arc<Mutex<ResilientHttpClient>>,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    title: String,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: String,
    link: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(default)]
    guid: Option<String>,
}

impl FeedProvider {
    pub fn new(kind: impl Into<String>, feed_url_template: impl Into<String>, client: Arc<Mutex<ResilientHttpClient>>) -> Self {
        Self {
            kind: kind.into(),
            feed_url_template: feed_url_template.into(),
            client,
        }
    }

    fn feed_url(&self, username: &str) -> String {
        self.feed_url_template.replace("{username}", username)
    }

    async fn fetch_raw(&self, url: &str) -> Result<String, AyaError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| AyaError::transient_io("aya_sites.feed.parse_url", e))?;
        let mut client = self.client.lock().await;
        let response = client
            .execute(HttpRequest::get(parsed))
            .await
            .map_err(|e| AyaError::transient_io("aya_sites.feed.fetch", e))?;
        response
            .text()
            .await
            .map_err(|e| AyaError::transient_io("aya_sites.feed.read_body", e))
    }

    fn parse(&self, body: &str) -> Result<Vec<ImportItem>, AyaError> {
        let rss: Rss = from_str(body).map_err(|e| {
            AyaError::transient_io("aya_sites.feed.parse_xml", XmlParseError(e.to_string()))
        })?;

        Ok(rss
            .channel
            .items
            .into_iter()
            .map(|entry| {
                let remote_id = entry.guid.unwrap_or_else(|| entry.link.clone());
                let mut item = ImportItem::new(remote_id, entry.title, entry.link, &self.kind);
                item.description = entry.description;
                item.published_at = entry
                    .pub_date
                    .as_deref()
                    .and_then(parse_rfc2822_or_rfc3339);
                item
            })
            .collect())
    }
}

fn parse_rfc2822_or_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug)]
struct XmlParseError(String);

impl std::fmt::Display for XmlParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for XmlParseError {}

#[async_trait::async_trait]
impl SiteProvider for FeedProvider {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn check(&self, url: &str) -> Result<CheckResult, AyaError> {
        let body = self.fetch_raw(url).await?;
        let rss: Rss = from_str(&body)
            .map_err(|e| AyaError::transient_io("aya_sites.feed.check_parse", XmlParseError(e.to_string())))?;

        Ok(CheckResult {
            remote_id: url.to_string(),
            display_name: rss.channel.title,
            thumbnail_url: None,
        })
    }

    async fn fetch_all(&self, username: &str) -> Result<Vec<ImportItem>, AyaError> {
        let url = self.feed_url(username);
        let body = self.fetch_raw(&url).await?;
        self.parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Example Feed</title>
    <item>
      <title>First post</title>
      <link>https://example.invalid/posts/1</link>
      <description>hello</description>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
      <guid>post-1</guid>
    </item>
    <item>
      <title>Second post</title>
      <link>https://example.invalid/posts/2</link>
    </item>
  </channel>
</rss>"#;

    fn provider() -> FeedProvider {
        let config = aya_http::HttpClientConfig::default();
        let client = Arc::new(Mutex::new(ResilientHttpClient::new(config).unwrap()));
        FeedProvider::new("rss", "https://example.invalid/{username}/feed.xml", client)
    }

    #[test]
    fn parses_items_with_guid_as_remote_id() {
        let items = provider().parse(SAMPLE_RSS).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].remote_id, "post-1");
        assert_eq!(items[0].description.as_deref(), Some("hello"));
        assert!(items[0].published_at.is_some());
    }

    #[test]
    fn falls_back_to_link_when_guid_absent() {
        let items = provider().parse(SAMPLE_RSS).unwrap();
        assert_eq!(items[1].remote_id, "https://example.invalid/posts/2");
        assert!(items[1].published_at.is_none());
    }

    #[test]
    fn feed_url_substitutes_username() {
        let p = provider();
        assert_eq!(p.feed_url("alice"), "https://example.invalid/alice/feed.xml");
    }
}
