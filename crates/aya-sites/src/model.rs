use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

/// The normalized record a [`crate::SiteProvider`] emits for one external
/// object (a video, a slide deck, a repository). The core
/// treats it as opaque beyond its identity key `remote_id`, which must be
/// stable and unique within the emitting source.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportItem {
    pub remote_id: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub link: String,
    pub thumbnail_url: Option<String>,
    pub story_kind: String,
    pub properties: HashMap<String, Value>,
}

impl ImportItem {
    pub fn new(remote_id: impl Into<String>, title: impl Into<String>, link: impl Into<String>, story_kind: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            title: title.into(),
            description: None,
            published_at: None,
            link: link.into(),
            thumbnail_url: None,
            story_kind: story_kind.into(),
            properties: HashMap::new(),
        }
    }
}

/// Result of validating a user-supplied URL against a site.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub remote_id: String,
    pub display_name: String,
    pub thumbnail_url: Option<String>,
}
