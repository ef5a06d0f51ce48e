//! Post fetching for a single forum.

use crate::models::{epoch_seconds, FetchOutcome, Post};
use crate::reddit::{ForumSource, MAX_PAGE_SIZE};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error};

/// Items inspected per forum.
pub const DEFAULT_POST_CAP: usize = 1000;

/// How far back posts are kept.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 365;

/// Limits for one forum fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub post_cap: usize,
    pub lookback_days: i64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            post_cap: DEFAULT_POST_CAP,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

/// Fetch the top posts of `forum_name` created within the lookback window
/// ending at `now`, in source ranking order.
///
/// On failure the posts collected so far are kept and the error is
/// returned alongside them.
pub async fn fetch_recent(
    source: &dyn ForumSource,
    forum_name: &str,
    now: DateTime<Utc>,
    options: &FetchOptions,
) -> FetchOutcome {
    let cutoff = now - Duration::days(options.lookback_days);
    let mut posts = Vec::new();
    let mut inspected = 0usize;
    let mut after: Option<String> = None;
    let mut failure = None;

    while inspected < options.post_cap {
        let page_size = (options.post_cap - inspected).min(MAX_PAGE_SIZE);
        let page = match source.top_posts(forum_name, after.as_deref(), page_size).await {
            Ok(page) => page,
            Err(e) => {
                error!(forum = %forum_name, "Error fetching r/{}: {}", forum_name, e);
                failure = Some(e);
                break;
            }
        };

        if page.items.is_empty() {
            break;
        }

        for record in page.items.into_iter().take(options.post_cap - inspected) {
            inspected += 1;

            let Some(created_at) = epoch_seconds::to_datetime(record.created_utc) else {
                debug!(forum = %forum_name, "Skipping post with invalid timestamp");
                continue;
            };
            if created_at < cutoff {
                continue;
            }

            posts.push(Post {
                forum_name: forum_name.to_string(),
                body_text: record.selftext.unwrap_or_default(),
                created_at,
            });
        }

        match page.after {
            Some(next) => after = Some(next),
            None => break,
        }
    }

    debug!(
        forum = %forum_name,
        "Kept {} of {} posts inspected",
        posts.len(),
        inspected
    );

    FetchOutcome {
        forum_name: forum_name.to_string(),
        posts,
        error: failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reddit::fake::{post, FakeSource};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> f64 {
        (now() - Duration::days(days)).timestamp() as f64
    }

    #[tokio::test]
    async fn test_drops_posts_older_than_cutoff() {
        let source = FakeSource::default().with_posts(
            "test",
            vec![Some(vec![
                post("recent", days_ago(10)),
                post("ancient", days_ago(400)),
                post("edge", days_ago(364)),
            ])],
        );

        let outcome = fetch_recent(&source, "test", now(), &FetchOptions::default()).await;

        assert!(!outcome.is_partial());
        let bodies: Vec<_> = outcome.posts.iter().map(|p| p.body_text.as_str()).collect();
        assert_eq!(bodies, vec!["recent", "edge"]);
        let cutoff = now() - Duration::days(365);
        assert!(outcome.posts.iter().all(|p| p.created_at >= cutoff));
        assert!(outcome.posts.iter().all(|p| p.forum_name == "test"));
    }

    #[tokio::test]
    async fn test_missing_body_becomes_empty() {
        let mut record = post("", days_ago(1));
        record.selftext = None;
        let source = FakeSource::default().with_posts("test", vec![Some(vec![record])]);

        let outcome = fetch_recent(&source, "test", now(), &FetchOptions::default()).await;
        assert_eq!(outcome.posts.len(), 1);
        assert_eq!(outcome.posts[0].body_text, "");
    }

    #[tokio::test]
    async fn test_failure_keeps_partial_results() {
        let source = FakeSource::default().with_posts(
            "flaky",
            vec![
                Some(vec![post("first", days_ago(1)), post("second", days_ago(2))]),
                None,
                Some(vec![post("never", days_ago(3))]),
            ],
        );

        let outcome = fetch_recent(&source, "flaky", now(), &FetchOptions::default()).await;

        assert!(outcome.is_partial());
        assert_eq!(outcome.posts.len(), 2);
        assert_eq!(outcome.posts[0].body_text, "first");
    }

    #[tokio::test]
    async fn test_stops_at_post_cap() {
        let page: Vec<_> = (0..10).map(|i| post(&format!("p{}", i), days_ago(1))).collect();
        let source = FakeSource::default().with_posts("big", vec![Some(page.clone()), Some(page)]);

        let options = FetchOptions {
            post_cap: 4,
            lookback_days: 365,
        };
        let outcome = fetch_recent(&source, "big", now(), &options).await;
        assert_eq!(outcome.posts.len(), 4);
    }

    #[test]
    fn test_unknown_forum_is_a_failure() {
        let source = FakeSource::default();
        let outcome = tokio_test::block_on(fetch_recent(
            &source,
            "missing",
            now(),
            &FetchOptions::default(),
        ));
        assert!(outcome.posts.is_empty());
        assert!(outcome.is_partial());
    }
}
