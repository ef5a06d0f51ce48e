//! emdash-trends - em dash usage across subreddits
//!
//! A CLI pipeline that discovers large text subreddits, measures how often
//! their top posts use an em dash each month, and plots the trend.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (credentials, config, missing input files, etc.)
//!   2 - Some keywords or subreddits failed and --fail-on-partial was set

mod analysis;
mod cli;
mod config;
mod discovery;
mod error;
mod fetcher;
mod models;
mod reddit;
mod render;
mod store;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, Command};
use config::{Config, CONFIG_FILE_NAME};
use reddit::{Credentials, RedditClient};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("emdash-trends v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .emdash.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize keywords, paths, plotted subreddits, and more.");
    println!("   Credentials are best kept in REDDIT_CLIENT_ID / REDDIT_CLIENT_SECRET.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default()? {
        Some(config) => {
            info!("Loaded config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Run the selected stage. Returns the exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let partial = match args.command {
        Some(Command::Prepare(_)) => run_prepare(&config).await?,
        Some(Command::Analyze(_)) => run_analyze(&config, args.show_progress()).await?,
        Some(Command::Plot(_)) => {
            run_plot(&config)?;
            false
        }
        None => anyhow::bail!("No subcommand given"),
    };

    println!("\n⏱️  Finished in {:.1}s", start_time.elapsed().as_secs_f64());

    if partial && args.fail_on_partial {
        warn!("Partial results and --fail-on-partial is set");
        return Ok(2);
    }
    Ok(0)
}

/// Build the API client from the merged configuration.
fn build_client(config: &Config) -> Result<RedditClient> {
    let client_id = config
        .reddit
        .client_id
        .clone()
        .filter(|s| !s.is_empty())
        .context("Missing Reddit client id: set REDDIT_CLIENT_ID or pass --client-id")?;
    let client_secret = config
        .reddit
        .client_secret
        .clone()
        .filter(|s| !s.is_empty())
        .context("Missing Reddit client secret: set REDDIT_CLIENT_SECRET or pass --client-secret")?;

    let credentials = Credentials {
        client_id,
        client_secret,
        user_agent: config.reddit.user_agent.clone(),
    };

    RedditClient::new(credentials, Duration::from_secs(config.reddit.timeout_seconds))
        .context("Failed to create Reddit client")
}

/// Discover subreddits and save them. Returns whether any keyword failed.
async fn run_prepare(config: &Config) -> Result<bool> {
    let client = build_client(config)?;

    let keywords: Vec<String> = config
        .discovery
        .keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();

    let options = discovery::DiscoveryOptions {
        min_subscribers: config.discovery.min_subscribers,
        result_limit_per_keyword: config.discovery.search_limit,
    };

    println!("🔎 Discovering subreddits for {} keywords", keywords.len());
    println!("   Minimum subscribers: {}", options.min_subscribers);

    let report = discovery::discover(&client, &keywords, &options).await;

    store::write_forums(&config.paths.subs, &report.forums)?;

    println!(
        "\n✅ Saved {} subreddits to {}",
        report.forums.len(),
        config.paths.subs.display()
    );
    if !report.failures.is_empty() {
        println!("⚠️  {} keyword searches failed:", report.failures.len());
        for failure in &report.failures {
            println!("   - '{}': {}", failure.keyword, failure.error);
        }
    }

    Ok(!report.failures.is_empty())
}

/// Fetch posts for every saved subreddit and write the summary table.
/// Returns whether any subreddit failed.
async fn run_analyze(config: &Config, show_progress: bool) -> Result<bool> {
    let forums = store::read_forums(&config.paths.subs)?;
    let names: Vec<String> = forums.into_iter().map(|f| f.name).collect();

    let client = build_client(config)?;

    let options = analysis::AggregateOptions {
        max_workers: config.analysis.max_workers,
        fetch: fetcher::FetchOptions {
            post_cap: config.analysis.post_limit,
            lookback_days: config.analysis.lookback_days,
        },
        show_progress,
    };

    println!(
        "📊 Analyzing {} subreddits with {} workers",
        names.len(),
        options.max_workers
    );

    let report = analysis::aggregate(&client, &names, Utc::now(), &options).await;

    store::write_summaries(&config.paths.analysis, &report.summaries)?;

    println!(
        "\n✅ Wrote {} monthly rows from {} posts to {}",
        report.summaries.len(),
        report.posts_fetched,
        config.paths.analysis.display()
    );
    if !report.failed_forums.is_empty() {
        println!(
            "⚠️  {} subreddits returned partial data:",
            report.failed_forums.len()
        );
        for (name, reason) in &report.failed_forums {
            println!("   - r/{}: {}", name, reason);
        }
    }

    Ok(!report.failed_forums.is_empty())
}

/// Draw the chart for the configured subreddits.
fn run_plot(config: &Config) -> Result<()> {
    let rows = store::read_summaries(&config.paths.analysis)?;
    let forums = store::read_forums(&config.paths.subs)?;

    let requested: Vec<String> = config
        .plot
        .forums
        .iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();

    println!("📈 Plotting {} subreddits", requested.len());

    let series = render::prepare_chart(&requested, &rows, &forums)?;
    let style = render::ChartStyle {
        width: config.plot.width,
        height: config.plot.height,
        font_path: config.plot.font_path.clone(),
    };
    render::draw_chart(&series, &config.paths.plot, &style)?;

    println!("\n✅ Saved chart to {}", config.paths.plot.display());
    Ok(())
}
