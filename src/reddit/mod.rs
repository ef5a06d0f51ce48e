//! Upstream forum source.
//!
//! Discovery and fetching only need two paged listings, so the seam is a
//! small trait; `RedditClient` is the production implementation.

pub mod client;

pub use client::{Credentials, RedditClient};

use crate::error::SourceError;
use async_trait::async_trait;
use serde::Deserialize;

/// Largest page the listing endpoints accept.
pub const MAX_PAGE_SIZE: usize = 100;

/// One page of a listing plus the cursor for the next page.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` when the listing is exhausted.
    pub after: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            after: None,
        }
    }
}

/// Subreddit metadata as returned by the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubredditRecord {
    pub display_name: String,
    #[serde(default)]
    pub subscribers: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub public_description: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub over18: Option<bool>,
    #[serde(default)]
    pub quarantine: Option<bool>,
    /// `any`, `self` or `link`.
    #[serde(default)]
    pub submission_type: Option<String>,
}

impl SubredditRecord {
    /// Whether plain-text submissions are allowed.
    pub fn allows_text(&self) -> bool {
        matches!(self.submission_type.as_deref(), Some("self") | Some("any"))
    }

    pub fn is_adult(&self) -> bool {
        self.over18.unwrap_or(false)
    }

    pub fn is_quarantined(&self) -> bool {
        self.quarantine.unwrap_or(false)
    }
}

/// Post fields the pipeline keeps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostRecord {
    #[serde(default)]
    pub selftext: Option<String>,
    pub created_utc: f64,
}

/// Capability set the pipeline needs from a content API.
#[async_trait]
pub trait ForumSource: Send + Sync {
    /// Search forums by keyword.
    async fn search_forums(
        &self,
        query: &str,
        after: Option<&str>,
        page_size: usize,
    ) -> Result<Page<SubredditRecord>, SourceError>;

    /// Top-ranked posts of a forum over the past year, in ranking order.
    async fn top_posts(
        &self,
        forum: &str,
        after: Option<&str>,
        page_size: usize,
    ) -> Result<Page<PostRecord>, SourceError>;
}
