//! Em dash aggregation.
//!
//! Fetches every forum through a bounded pool, cleans the merged posts and
//! groups them into one summary row per (forum, month).

use crate::fetcher::{fetch_recent, FetchOptions};
use crate::models::{AnalysisReport, MonthlySummary, Post, EM_DASH};
use crate::reddit::ForumSource;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Bodies that mark a post as removed by moderators or its author.
pub const REMOVED_SENTINELS: [&str; 2] = ["[removed]", "[deleted]"];

/// Default size of the fetch pool.
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Settings for an analysis run.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub max_workers: usize,
    pub fetch: FetchOptions,
    pub show_progress: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            fetch: FetchOptions::default(),
            show_progress: true,
        }
    }
}

/// Fetch all `forums` concurrently and summarize the merged posts.
///
/// Repeated names are fetched once. Results are merged in completion order.
/// Forums that fail contribute whatever they collected and are listed in
/// `failed_forums`.
pub async fn aggregate(
    source: &dyn ForumSource,
    forums: &[String],
    now: DateTime<Utc>,
    options: &AggregateOptions,
) -> AnalysisReport {
    let forums: BTreeSet<&str> = forums.iter().map(String::as_str).collect();
    let progress = progress_bar(forums.len(), options.show_progress);
    let width = forums.iter().map(|f| f.len()).max().unwrap_or(0) + 2;

    let mut outcomes = stream::iter(forums)
        .map(|forum| fetch_recent(source, forum, now, &options.fetch))
        .buffer_unordered(options.max_workers.max(1));

    let mut posts = Vec::new();
    let mut failed_forums = Vec::new();

    while let Some(outcome) = outcomes.next().await {
        progress.set_message(format!("r/{:<width$}", outcome.forum_name, width = width));
        progress.inc(1);

        debug!(
            forum = %outcome.forum_name,
            "Fetched {} posts",
            outcome.posts.len()
        );
        if outcome.is_partial() {
            let reason = outcome
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();
            failed_forums.push((outcome.forum_name.clone(), reason));
        }
        posts.extend(outcome.posts);
    }
    progress.finish_with_message("done");

    let posts_fetched = posts.len();
    let summaries = summarize(posts);
    info!(
        "Summarized {} posts into {} monthly rows",
        posts_fetched,
        summaries.len()
    );
    if !failed_forums.is_empty() {
        warn!("{} subreddits returned partial data", failed_forums.len());
    }

    AnalysisReport {
        summaries,
        posts_fetched,
        failed_forums,
    }
}

fn progress_bar(total: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("Fetching posts from {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message("subreddits");
    pb
}

/// Trimmed body, or `None` when the post carries no usable text.
pub fn clean_body(body: &str) -> Option<&str> {
    let trimmed = body.trim();
    if trimmed.is_empty() || REMOVED_SENTINELS.contains(&trimmed) {
        None
    } else {
        Some(trimmed)
    }
}

/// First day of the post's calendar month, in UTC.
pub fn month_of(created_at: DateTime<Utc>) -> NaiveDate {
    let date = created_at.date_naive();
    date.with_day(1).unwrap_or(date)
}

/// Last period-delimited fragment containing an em dash, trimmed.
///
/// Newlines are collapsed to spaces first. This is a naive sentence split
/// and is kept that way so the example column stays comparable.
pub fn extract_example(text: &str) -> String {
    if !text.contains(EM_DASH) {
        return String::new();
    }

    text.replace('\n', " ")
        .split('.')
        .filter(|fragment| fragment.contains(EM_DASH))
        .last()
        .map(|fragment| fragment.trim().to_string())
        .unwrap_or_default()
}

#[derive(Debug, Default)]
struct MonthGroup {
    posts: u32,
    matches: u32,
    last_example: String,
}

/// Clean, group and sort posts into monthly summary rows.
///
/// Rows are ordered by forum name, then month. Within a group the example
/// is the last non-empty one in input order.
pub fn summarize(posts: Vec<Post>) -> Vec<MonthlySummary> {
    let mut groups: BTreeMap<(String, NaiveDate), MonthGroup> = BTreeMap::new();

    for post in posts {
        let Some(body) = clean_body(&post.body_text) else {
            continue;
        };

        let group = groups
            .entry((post.forum_name.clone(), month_of(post.created_at)))
            .or_default();
        group.posts += 1;

        if body.contains(EM_DASH) {
            group.matches += 1;
            let example = extract_example(body);
            if !example.is_empty() {
                group.last_example = example;
            }
        }
    }

    groups
        .into_iter()
        .map(|((forum_name, month), group)| MonthlySummary {
            forum_name,
            month,
            post_count: group.posts,
            match_count: group.matches,
            example_sentence: group.last_example,
            match_percent: 100.0 * f64::from(group.matches) / f64::from(group.posts),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::reddit::fake::{post, FakeSource};
    use crate::reddit::{Page, PostRecord, SubredditRecord};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every forum with one empty page after a short delay and
    /// records the highest number of listings in flight.
    #[derive(Default)]
    struct SlowSource {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ForumSource for SlowSource {
        async fn search_forums(
            &self,
            _query: &str,
            _after: Option<&str>,
            _page_size: usize,
        ) -> Result<Page<SubredditRecord>, SourceError> {
            Ok(Page::default())
        }

        async fn top_posts(
            &self,
            _forum: &str,
            _after: Option<&str>,
            _page_size: usize,
        ) -> Result<Page<PostRecord>, SourceError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Page::default())
        }
    }

    fn make_post(forum: &str, body: &str, y: i32, m: u32, d: u32) -> Post {
        Post {
            forum_name: forum.to_string(),
            body_text: body.to_string(),
            created_at: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_two_posts_one_match() {
        let rows = summarize(vec![
            make_post("test", "Hello — world.", 2025, 3, 2),
            make_post("test", "No dash here.", 2025, 3, 20),
        ]);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.forum_name, "test");
        assert_eq!(row.month, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(row.post_count, 2);
        assert_eq!(row.match_count, 1);
        assert_eq!(row.match_percent, 50.0);
        assert_eq!(row.example_sentence, "Hello — world");
    }

    #[test]
    fn test_removed_and_empty_posts_are_dropped() {
        let rows = summarize(vec![
            make_post("test", "   ", 2025, 3, 2),
            make_post("test", " [removed] ", 2025, 3, 2),
            make_post("test", "[deleted]", 2025, 3, 2),
            make_post("test", "kept", 2025, 3, 2),
        ]);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].post_count, 1);
        assert_eq!(rows[0].match_percent, 0.0);
        assert_eq!(rows[0].example_sentence, "");
    }

    #[test]
    fn test_grouping_is_total_and_sorted() {
        let posts = vec![
            make_post("zeta", "a — b", 2025, 1, 5),
            make_post("alpha", "x", 2025, 2, 28),
            make_post("alpha", "y — z", 2024, 12, 31),
            make_post("alpha", "w", 2025, 2, 1),
            make_post("zeta", "plain", 2025, 1, 30),
        ];
        let rows = summarize(posts.clone());

        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.forum_name.as_str(), r.month.to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("alpha", "2024-12-01".to_string()),
                ("alpha", "2025-02-01".to_string()),
                ("zeta", "2025-01-01".to_string()),
            ]
        );

        let total: u32 = rows.iter().map(|r| r.post_count).sum();
        assert_eq!(total as usize, posts.len());

        for row in &rows {
            assert!(row.match_count <= row.post_count);
            assert!((0.0..=100.0).contains(&row.match_percent));
            assert_eq!(row.match_percent == 0.0, row.match_count == 0);
        }
    }

    #[test]
    fn test_example_is_last_non_empty_in_group() {
        let rows = summarize(vec![
            make_post("test", "First — one.", 2025, 4, 1),
            make_post("test", "Second — two. Nothing else.", 2025, 4, 2),
            make_post("test", "no dash", 2025, 4, 3),
        ]);
        assert_eq!(rows[0].example_sentence, "Second — two");
        assert_eq!(rows[0].match_count, 2);
    }

    #[test]
    fn test_extract_example() {
        assert_eq!(extract_example("nothing here"), "");
        assert_eq!(
            extract_example("One — a. Two. Three —\nfour. End"),
            "Three — four"
        );
        assert_eq!(extract_example("trailing dash —"), "trailing dash —");
    }

    #[test]
    fn test_month_of() {
        let ts = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        assert_eq!(month_of(ts), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[tokio::test]
    async fn test_aggregate_merges_all_forums() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap();
        let recent = (now - chrono::Duration::days(3)).timestamp() as f64;

        let source = FakeSource::default()
            .with_posts(
                "a",
                vec![Some(vec![post("x — y", recent), post("[removed]", recent)])],
            )
            .with_posts("b", vec![Some(vec![post("plain", recent)]), None]);

        let forums = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let options = AggregateOptions {
            max_workers: 2,
            show_progress: false,
            ..Default::default()
        };
        let report = aggregate(&source, &forums, now, &options).await;

        assert_eq!(report.posts_fetched, 3);
        assert_eq!(report.summaries.len(), 2);
        assert_eq!(report.summaries[0].forum_name, "a");
        assert_eq!(report.summaries[0].match_count, 1);
        assert_eq!(report.summaries[1].forum_name, "b");

        let mut failed: Vec<_> = report
            .failed_forums
            .iter()
            .map(|(f, _)| f.as_str())
            .collect();
        failed.sort();
        assert_eq!(failed, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_duplicate_forum_names_are_fetched_once() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap();
        let recent = (now - chrono::Duration::days(3)).timestamp() as f64;

        let source = FakeSource::default()
            .with_posts("x", vec![Some(vec![post("one", recent)])]);
        let forums = vec!["x".to_string(), "x".to_string()];
        let options = AggregateOptions {
            show_progress: false,
            ..Default::default()
        };
        let report = aggregate(&source, &forums, now, &options).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.posts_fetched, 1);
        assert_eq!(report.summaries.len(), 1);
        assert_eq!(report.summaries[0].post_count, 1);
    }

    #[tokio::test]
    async fn test_fetches_never_exceed_worker_limit() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap();
        let source = SlowSource::default();
        let forums: Vec<String> = (0..20).map(|i| format!("forum{}", i)).collect();
        let options = AggregateOptions {
            max_workers: 3,
            show_progress: false,
            ..Default::default()
        };

        let report = aggregate(&source, &forums, now, &options).await;

        let peak = source.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency was {}", peak);
        assert!(peak >= 1);
        assert!(report.failed_forums.is_empty());
        assert!(report.summaries.is_empty());
    }
}
