//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values. Every value flag is optional so
//! that `.emdash.toml` settings apply unless the flag is actually given.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// emdash-trends - track em dash usage across subreddits over time
///
/// Discovers large text subreddits, measures how many of their top posts
/// use an em dash each month, and plots the trend.
///
/// Examples:
///   emdash-trends prepare --keywords "ai,startups" --min-subscribers 50000
///   emdash-trends analyze --max-workers 4
///   emdash-trends plot --forums SaaS,startups --output chart.png
///   emdash-trends --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .emdash.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Reddit application client id
    #[arg(long, env = "REDDIT_CLIENT_ID", global = true, hide_env_values = true)]
    pub client_id: Option<String>,

    /// Reddit application client secret
    #[arg(long, env = "REDDIT_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Exit with code 2 if any keyword search or subreddit fetch failed
    ///
    /// Useful for scheduled runs where partial data should not go unnoticed.
    #[arg(long, global = true)]
    pub fail_on_partial: bool,

    /// Hide the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Generate a default .emdash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Pipeline stages.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Discover subreddits matching keywords and save them as JSON
    Prepare(PrepareArgs),
    /// Fetch top posts and write monthly em dash statistics as CSV
    Analyze(AnalyzeArgs),
    /// Draw the monthly em dash share for selected subreddits
    Plot(PlotArgs),
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct PrepareArgs {
    /// Search keywords (comma-separated)
    ///
    /// Example: --keywords "ai,machine learning"
    #[arg(short, long, value_name = "WORDS", value_delimiter = ',')]
    pub keywords: Option<Vec<String>>,

    /// Minimum subscriber count
    #[arg(long, value_name = "COUNT")]
    pub min_subscribers: Option<u64>,

    /// Search results inspected per keyword
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Output path for the subreddit list
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// Subreddit list written by `prepare`
    #[arg(short, long, value_name = "FILE")]
    pub subs: Option<PathBuf>,

    /// Output path for the summary table
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of subreddits fetched concurrently
    #[arg(long, value_name = "NUM")]
    pub max_workers: Option<usize>,

    /// Top posts inspected per subreddit
    #[arg(long, value_name = "COUNT")]
    pub post_limit: Option<usize>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct PlotArgs {
    /// Subreddits to draw (comma-separated)
    #[arg(short, long, value_name = "NAMES", value_delimiter = ',')]
    pub forums: Option<Vec<String>>,

    /// Summary table written by `analyze`
    #[arg(short, long, value_name = "FILE")]
    pub analysis: Option<PathBuf>,

    /// Subreddit list written by `prepare`
    #[arg(short, long, value_name = "FILE")]
    pub subs: Option<PathBuf>,

    /// Output path for the chart image
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// TrueType font used for chart text
    #[arg(long, value_name = "FILE")]
    pub font: Option<PathBuf>,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        let Some(ref command) = self.command else {
            return Err("A subcommand is required: prepare, analyze or plot".to_string());
        };

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        match command {
            Command::Prepare(prepare) => {
                if let Some(ref keywords) = prepare.keywords {
                    if keywords.iter().all(|k| k.trim().is_empty()) {
                        return Err("At least one keyword is required".to_string());
                    }
                }
                if prepare.limit == Some(0) {
                    return Err("Limit must be at least 1".to_string());
                }
            }
            Command::Analyze(analyze) => {
                if analyze.max_workers == Some(0) {
                    return Err("Max workers must be at least 1".to_string());
                }
                if analyze.post_limit == Some(0) {
                    return Err("Post limit must be at least 1".to_string());
                }
            }
            Command::Plot(plot) => {
                if let Some(ref forums) = plot.forums {
                    if forums.iter().all(|f| f.trim().is_empty()) {
                        return Err("At least one subreddit is required".to_string());
                    }
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Whether the fetch progress bar should be drawn.
    pub fn show_progress(&self) -> bool {
        !self.no_progress && !self.quiet
    }
}
