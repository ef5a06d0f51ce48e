//! Data models for the em dash pipeline.
//!
//! Forums are produced by discovery and persisted as JSON, posts live only
//! between fetch and aggregation, and monthly summaries are persisted as CSV.

use crate::error::SourceError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The character whose presence is measured.
pub const EM_DASH: char = '—';

/// A discovered forum (subreddit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forum {
    /// Unique display name, e.g. `SaaS`.
    pub name: String,
    /// Subscriber count at discovery time.
    #[serde(rename = "subscribers")]
    pub subscriber_count: u64,
    /// Forum title.
    pub title: String,
    /// Public description.
    pub description: String,
    /// Creation time of the forum.
    #[serde(rename = "created_utc", with = "epoch_seconds")]
    pub created_at: DateTime<Utc>,
    /// Every search keyword that matched this forum, in first-seen order.
    pub matched_keywords: Vec<String>,
}

/// A single text post.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// Forum the post was fetched from.
    pub forum_name: String,
    /// Post body, empty when the source had none.
    pub body_text: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Aggregated statistics for one (forum, month) pair.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    #[serde(rename = "subreddit")]
    pub forum_name: String,
    /// First day of the calendar month.
    pub month: NaiveDate,
    #[serde(rename = "num_posts")]
    pub post_count: u32,
    #[serde(rename = "num_emdash")]
    pub match_count: u32,
    #[serde(rename = "last_emdash_example")]
    pub example_sentence: String,
    /// `100 * match_count / post_count`.
    #[serde(rename = "emdash_percent")]
    pub match_percent: f64,
}

/// Result of fetching one forum: whatever was collected, plus the failure
/// that stopped collection, if any.
#[derive(Debug)]
pub struct FetchOutcome {
    pub forum_name: String,
    pub posts: Vec<Post>,
    pub error: Option<SourceError>,
}

impl FetchOutcome {
    /// Whether collection stopped early.
    pub fn is_partial(&self) -> bool {
        self.error.is_some()
    }
}

/// A keyword whose search failed during discovery.
#[derive(Debug)]
pub struct KeywordFailure {
    pub keyword: String,
    pub error: SourceError,
}

/// Discovered forums plus per-keyword failures.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub forums: Vec<Forum>,
    pub failures: Vec<KeywordFailure>,
}

/// Output of an analysis run.
#[derive(Debug, Default)]
pub struct AnalysisReport {
    /// Sorted by forum name, then month.
    pub summaries: Vec<MonthlySummary>,
    /// Number of posts fetched before cleaning.
    pub posts_fetched: usize,
    /// Forums whose fetch stopped early, with the reason.
    pub failed_forums: Vec<(String, String)>,
}

/// Epoch seconds as a float, the way the upstream API reports timestamps.
pub mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn to_datetime(secs: f64) -> Option<DateTime<Utc>> {
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let secs = value.timestamp() as f64 + f64::from(value.timestamp_subsec_nanos()) / 1e9;
        serializer.serialize_f64(secs)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        to_datetime(secs).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", secs)))
    }
}
