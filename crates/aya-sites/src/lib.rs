//! `SiteProvider` contract and concrete adapters for external code/slide/
//! video hosting sites.
//!
//! Every adapter uses [`aya_http::ResilientHttpClient`] for outbound I/O and
//! emits [`ImportItem`]s whose only cross-cutting requirement is a stable,
//! source-unique `remote_id`.

mod feed;
mod json_feed;
mod model;
mod provider;

pub use feed::FeedProvider;
pub use json_feed::JsonFeedProvider;
pub use model::{CheckResult, ImportItem};
pub use provider::SiteProvider;
