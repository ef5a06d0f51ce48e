//! Forum discovery.
//!
//! Searches forums by keyword and keeps the ones large enough and open to
//! text posts. Forums found under several keywords are merged.

use crate::models::{epoch_seconds, DiscoveryReport, Forum, KeywordFailure};
use crate::reddit::{ForumSource, SubredditRecord, MAX_PAGE_SIZE};
use std::collections::HashMap;
use tracing::{debug, error, info};

/// Discovery thresholds.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Minimum subscriber count a forum needs.
    pub min_subscribers: u64,
    /// Candidates inspected per keyword.
    pub result_limit_per_keyword: usize,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            min_subscribers: 100_000,
            result_limit_per_keyword: 100,
        }
    }
}

/// Whether a candidate passes the content policy and size filters.
pub fn is_eligible(record: &SubredditRecord, min_subscribers: u64) -> bool {
    if !record.allows_text() || record.is_adult() || record.is_quarantined() {
        return false;
    }

    match record.subscribers {
        Some(count) if count > 0 => count >= min_subscribers,
        _ => false,
    }
}

/// Merges candidates by name, keeping first-seen order.
#[derive(Debug, Default)]
struct ForumIndex {
    forums: Vec<Forum>,
    by_name: HashMap<String, usize>,
}

impl ForumIndex {
    fn record_match(&mut self, record: &SubredditRecord, keyword: &str) {
        if let Some(&idx) = self.by_name.get(&record.display_name) {
            self.forums[idx].matched_keywords.push(keyword.to_string());
            return;
        }

        let forum = Forum {
            name: record.display_name.clone(),
            subscriber_count: record.subscribers.unwrap_or_default(),
            title: record.title.clone(),
            description: record.public_description.clone(),
            created_at: epoch_seconds::to_datetime(record.created_utc).unwrap_or_default(),
            matched_keywords: vec![keyword.to_string()],
        };
        self.by_name.insert(forum.name.clone(), self.forums.len());
        self.forums.push(forum);
    }
}

/// Run one search per keyword and merge the eligible forums.
///
/// A failing keyword keeps whatever candidates it already produced and
/// is reported in `failures`; the remaining keywords still run.
pub async fn discover(
    source: &dyn ForumSource,
    keywords: &[String],
    options: &DiscoveryOptions,
) -> DiscoveryReport {
    let mut index = ForumIndex::default();
    let mut failures = Vec::new();

    for keyword in keywords {
        println!("🔍 Searching for subreddits matching '{}'...", keyword);

        let mut inspected = 0usize;
        let mut after: Option<String> = None;

        while inspected < options.result_limit_per_keyword {
            let page_size = (options.result_limit_per_keyword - inspected).min(MAX_PAGE_SIZE);
            let page = match source
                .search_forums(keyword, after.as_deref(), page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!(keyword = %keyword, "Error with keyword search: {}", e);
                    failures.push(KeywordFailure {
                        keyword: keyword.clone(),
                        error: e,
                    });
                    break;
                }
            };

            if page.items.is_empty() {
                break;
            }

            for record in page.items.iter().take(options.result_limit_per_keyword - inspected) {
                inspected += 1;
                if is_eligible(record, options.min_subscribers) {
                    index.record_match(record, keyword);
                } else {
                    debug!(keyword = %keyword, "Skipping r/{}", record.display_name);
                }
            }

            match page.after {
                Some(next) => after = Some(next),
                None => break,
            }
        }
    }

    info!(
        "Discovered {} subreddits ({} keyword failures)",
        index.forums.len(),
        failures.len()
    );

    DiscoveryReport {
        forums: index.forums,
        failures,
    }
}
