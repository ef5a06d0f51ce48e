//! Configuration file handling.
//!
//! This module handles loading `.emdash.toml` files and merging them with
//! command-line overrides.

use crate::cli::{AnalyzeArgs, Args, Command, PlotArgs, PrepareArgs};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".emdash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Reddit API settings.
    #[serde(default)]
    pub reddit: RedditConfig,

    /// Subreddit discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Post fetching and aggregation settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Artifact locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Chart settings.
    #[serde(default)]
    pub plot: PlotConfig,
}

/// Reddit API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    /// OAuth client id. Prefer `REDDIT_CLIENT_ID`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth client secret. Prefer `REDDIT_CLIENT_SECRET`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    "em-dash-analyzer".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Subreddit discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Search keywords.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// Minimum subscriber count.
    #[serde(default = "default_min_subscribers")]
    pub min_subscribers: u64,

    /// Search results inspected per keyword.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            min_subscribers: default_min_subscribers(),
            search_limit: default_search_limit(),
        }
    }
}

fn default_keywords() -> Vec<String> {
    vec![
        "ai",
        "machine learning",
        "data",
        "programming",
        "webdev",
        "startups",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_min_subscribers() -> u64 {
    100_000
}

fn default_search_limit() -> usize {
    100
}

/// Post fetching and aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Concurrent subreddit fetches.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Top posts inspected per subreddit.
    #[serde(default = "default_post_limit")]
    pub post_limit: usize,

    /// Only posts newer than this many days are kept.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            post_limit: default_post_limit(),
            lookback_days: default_lookback_days(),
        }
    }
}

fn default_max_workers() -> usize {
    crate::analysis::DEFAULT_MAX_WORKERS
}

fn default_post_limit() -> usize {
    crate::fetcher::DEFAULT_POST_CAP
}

fn default_lookback_days() -> i64 {
    crate::fetcher::DEFAULT_LOOKBACK_DAYS
}

/// Artifact locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Discovered subreddit list (JSON).
    #[serde(default = "default_subs_path")]
    pub subs: PathBuf,

    /// Monthly summary table (CSV).
    #[serde(default = "default_analysis_path")]
    pub analysis: PathBuf,

    /// Chart image (PNG).
    #[serde(default = "default_plot_path")]
    pub plot: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            subs: default_subs_path(),
            analysis: default_analysis_path(),
            plot: default_plot_path(),
        }
    }
}

fn default_subs_path() -> PathBuf {
    PathBuf::from("data/subs.json")
}

fn default_analysis_path() -> PathBuf {
    PathBuf::from("data/analysis.csv")
}

fn default_plot_path() -> PathBuf {
    PathBuf::from("data/plot.png")
}

/// Chart settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Subreddits drawn by default.
    #[serde(default = "default_plot_forums")]
    pub forums: Vec<String>,

    /// TrueType font for chart text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,

    /// Image width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Image height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            forums: default_plot_forums(),
            font_path: None,
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_plot_forums() -> Vec<String> {
    vec![
        "SaaS",
        "SideProject",
        "EntrepreneurRideAlong",
        "Entrepreneur",
        "startups",
        "Startup_Ideas",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_width() -> u32 {
    1600
}

fn default_height() -> u32 {
    1200
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only flags the user actually passed override file settings.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref id) = args.client_id {
            self.reddit.client_id = Some(id.clone());
        }
        if let Some(ref secret) = args.client_secret {
            self.reddit.client_secret = Some(secret.clone());
        }
        if let Some(timeout) = args.timeout {
            self.reddit.timeout_seconds = timeout;
        }

        match &args.command {
            Some(Command::Prepare(prepare)) => self.merge_prepare(prepare),
            Some(Command::Analyze(analyze)) => self.merge_analyze(analyze),
            Some(Command::Plot(plot)) => self.merge_plot(plot),
            None => {}
        }
    }

    fn merge_prepare(&mut self, args: &PrepareArgs) {
        if let Some(ref keywords) = args.keywords {
            self.discovery.keywords = keywords.clone();
        }
        if let Some(min) = args.min_subscribers {
            self.discovery.min_subscribers = min;
        }
        if let Some(limit) = args.limit {
            self.discovery.search_limit = limit;
        }
        if let Some(ref output) = args.output {
            self.paths.subs = output.clone();
        }
    }

    fn merge_analyze(&mut self, args: &AnalyzeArgs) {
        if let Some(ref subs) = args.subs {
            self.paths.subs = subs.clone();
        }
        if let Some(ref output) = args.output {
            self.paths.analysis = output.clone();
        }
        if let Some(workers) = args.max_workers {
            self.analysis.max_workers = workers;
        }
        if let Some(limit) = args.post_limit {
            self.analysis.post_limit = limit;
        }
    }

    fn merge_plot(&mut self, args: &PlotArgs) {
        if let Some(ref forums) = args.forums {
            self.plot.forums = forums.clone();
        }
        if let Some(ref analysis) = args.analysis {
            self.paths.analysis = analysis.clone();
        }
        if let Some(ref subs) = args.subs {
            self.paths.subs = subs.clone();
        }
        if let Some(ref output) = args.output {
            self.paths.plot = output.clone();
        }
        if let Some(ref font) = args.font {
            self.plot.font_path = Some(font.clone());
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
