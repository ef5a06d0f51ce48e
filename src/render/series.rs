//! Chart data preparation.
//!
//! Everything the chart shows is computed here so it can be checked
//! without drawing anything.

use crate::error::RenderError;
use crate::models::{Forum, MonthlySummary};
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

/// Month left out of every chart; upstream data for it is incomplete.
pub const EXCLUDED_MONTH: (i32, u32) = (2025, 1);

/// Trailing window for smoothing, in months.
pub const ROLLING_WINDOW: usize = 2;

/// One line on the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub forum_name: String,
    /// Legend text, e.g. `r/SaaS (350K)`.
    pub label: String,
    /// Month and smoothed percentage, in month order.
    pub points: Vec<(NaiveDate, f64)>,
}

pub fn is_excluded_month(month: NaiveDate) -> bool {
    (month.year(), month.month()) == EXCLUDED_MONTH
}

/// Human-readable subscriber count: `1.2M`, `45K`, `999`.
pub fn abbreviate(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.0}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Trailing mean over up to `window` values; early points use what exists.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Validate the requested forums and build one smoothed series per forum,
/// ordered by descending subscriber count.
///
/// Every requested name missing from `forums` is reported in one error.
pub fn prepare_chart(
    requested: &[String],
    rows: &[MonthlySummary],
    forums: &[Forum],
) -> Result<Vec<ChartSeries>, RenderError> {
    let subscribers: HashMap<&str, u64> = forums
        .iter()
        .map(|f| (f.name.as_str(), f.subscriber_count))
        .collect();

    let missing: Vec<String> = requested
        .iter()
        .filter(|name| !subscribers.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(RenderError::UnknownForums(missing));
    }

    let mut names: Vec<&String> = requested.iter().collect();
    names.sort_by_key(|name| std::cmp::Reverse(subscribers[name.as_str()]));

    let series = names
        .into_iter()
        .map(|name| {
            let mut forum_rows: Vec<&MonthlySummary> = rows
                .iter()
                .filter(|r| &r.forum_name == name && !is_excluded_month(r.month))
                .collect();
            forum_rows.sort_by_key(|r| r.month);

            let percents: Vec<f64> = forum_rows.iter().map(|r| r.match_percent).collect();
            let smoothed = rolling_mean(&percents, ROLLING_WINDOW);
            let subscriber_count = subscribers[name.as_str()];

            ChartSeries {
                forum_name: name.clone(),
                label: format!("r/{} ({})", name, abbreviate(subscriber_count)),
                points: forum_rows.iter().map(|r| r.month).zip(smoothed).collect(),
            }
        })
        .collect();

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn forum(name: &str, subscribers: u64) -> Forum {
        Forum {
            name: name.to_string(),
            subscriber_count: subscribers,
            title: String::new(),
            description: String::new(),
            created_at: Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap(),
            matched_keywords: vec![],
        }
    }

    fn row(name: &str, y: i32, m: u32, percent: f64) -> MonthlySummary {
        MonthlySummary {
            forum_name: name.to_string(),
            month: NaiveDate::from_ymd_opt(y, m, 1).unwrap(),
            post_count: 100,
            match_count: percent as u32,
            example_sentence: String::new(),
            match_percent: percent,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate(1_234_567), "1.2M");
        assert_eq!(abbreviate(1_200_000), "1.2M");
        assert_eq!(abbreviate(45_000), "45K");
        assert_eq!(abbreviate(999), "999");
        assert_eq!(abbreviate(0), "0");
    }

    #[test]
    fn test_rolling_mean() {
        assert_eq!(rolling_mean(&[10.0, 20.0, 40.0], 2), vec![10.0, 15.0, 30.0]);
        assert!(rolling_mean(&[], 2).is_empty());
        assert_eq!(rolling_mean(&[4.0, 8.0], 1), vec![4.0, 8.0]);
    }

    #[test]
    fn test_reports_every_missing_forum() {
        let forums = vec![forum("SaaS", 400_000)];
        let err = prepare_chart(&names(&["nope", "SaaS", "gone"]), &[], &forums).unwrap_err();
        assert_eq!(
            err,
            RenderError::UnknownForums(vec!["nope".to_string(), "gone".to_string()])
        );
    }

    #[test]
    fn test_orders_by_subscribers_and_filters() {
        let forums = vec![
            forum("small", 45_000),
            forum("big", 1_234_567),
            forum("ignored", 9_000_000),
        ];
        let rows = vec![
            row("small", 2024, 12, 10.0),
            row("big", 2025, 2, 30.0),
            row("big", 2024, 12, 10.0),
            row("big", 2025, 1, 99.0),
            row("ignored", 2024, 12, 50.0),
            row("small", 2025, 2, 20.0),
        ];

        let series = prepare_chart(&names(&["small", "big"]), &rows, &forums).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].forum_name, "big");
        assert_eq!(series[0].label, "r/big (1.2M)");
        assert_eq!(series[1].label, "r/small (45K)");

        let big: Vec<_> = series[0].points.iter().map(|(m, y)| (m.to_string(), *y)).collect();
        assert_eq!(
            big,
            vec![("2024-12-01".to_string(), 10.0), ("2025-02-01".to_string(), 20.0)]
        );

        let small: Vec<f64> = series[1].points.iter().map(|(_, y)| *y).collect();
        assert_eq!(small, vec![10.0, 15.0]);
    }

    #[test]
    fn test_excluded_month() {
        assert!(is_excluded_month(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(!is_excluded_month(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    }
}
