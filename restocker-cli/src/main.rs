//! Restocker CLI
//!
//! Opens the active-listings page in Chrome, sorts it by available quantity,
//! then restocks every listing whose quantity is still at the sentinel.
//!
//! Usage:
//!   restocker                      # Restock with the built-in profile
//!   restocker --dry-run            # Report what would change, touch nothing
//!   restocker --config run.yaml    # Use a custom profile
//!   restocker --max-items 20 --json

use anyhow::{Context, Result};
use clap::Parser;
use restocker::{platforms, Restocker, RunProfile};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

mod session;

use session::BrowserSession;

#[derive(Parser, Debug)]
#[command(name = "restocker")]
#[command(about = "Restock listings whose quantity is at the sentinel value")]
struct Cli {
    /// Open each item and report what would change without changing it
    #[arg(long, env = "RESTOCKER_DRY_RUN")]
    dry_run: bool,

    /// Maximum number of items to attempt
    #[arg(long, env = "RESTOCKER_MAX_ITEMS", default_value_t = 200)]
    max_items: usize,

    /// Per-wait timeout in seconds (defaults to the profile's, 30s built in)
    #[arg(long, env = "RESTOCKER_TIMEOUT")]
    timeout: Option<u64>,

    /// Verbose logging
    #[arg(long, short)]
    debug: bool,

    /// Chrome user-data directory, kept between runs
    #[arg(long, env = "RESTOCKER_PROFILE_DIR")]
    profile_dir: Option<PathBuf>,

    /// Run Chrome without a window
    #[arg(long, env = "RESTOCKER_HEADLESS")]
    headless: bool,

    /// Landing page, overrides the profile
    #[arg(long, env = "RESTOCKER_URL")]
    url: Option<String>,

    /// Run profile (.yaml, .yml or .json)
    #[arg(long, short, env = "RESTOCKER_CONFIG")]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Leave the listing in its current order
    #[arg(long)]
    skip_sort: bool,

    /// Wait for Enter before closing the browser
    #[arg(long)]
    keep_open: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.debug);

    let profile = load_profile(&cli)?;
    let session = BrowserSession::launch(
        &session::resolve_profile_dir(cli.profile_dir.clone()),
        cli.headless,
    )
    .await?;

    let result = run(&cli, &profile, &session).await;

    if cli.keep_open {
        println!("Press Enter to close the browser...");
        session::wait_for_enter().await.ok();
    }
    session.close().await;
    result
}

async fn run(cli: &Cli, profile: &RunProfile, session: &BrowserSession) -> Result<()> {
    let page = session.open(&profile.url).await?;
    session
        .pause_for_login(&page, &profile.url, |url| profile.is_login_url(url))
        .await?;

    let restocker = Restocker::new(platforms::create_surface(page), profile)
        .context("Invalid run profile")?;

    if !cli.skip_sort {
        let sort = restocker.normalize_sort().await;
        info!(?sort, "Sort normalization finished");
    }
    let report = restocker.process(cli.max_items, cli.dry_run).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

fn load_profile(cli: &Cli) -> Result<RunProfile> {
    let mut profile = match &cli.config {
        Some(path) => RunProfile::load(path)
            .with_context(|| format!("Failed to load profile {}", path.display()))?,
        None => RunProfile::default(),
    };
    if let Some(url) = &cli.url {
        profile.url = url.clone();
    }
    if let Some(seconds) = cli.timeout {
        profile = profile.with_timeout(Duration::from_secs(seconds));
    }
    Ok(profile)
}

fn init_logging(debug: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let default = if debug {
        "info,restocker=debug,restocker_cli=debug"
    } else {
        "info,chromiumoxide=warn"
    };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_run() {
        let cli = Cli::try_parse_from(["restocker"]).unwrap();
        assert!(!cli.dry_run);
        assert_eq!(cli.max_items, 200);
        assert!(cli.timeout.is_none());
        assert!(!cli.skip_sort);
    }

    #[test]
    fn flags_override_the_profile() {
        let cli = Cli::try_parse_from([
            "restocker",
            "--url",
            "https://example.test/active",
            "--timeout",
            "5",
            "--dry-run",
        ])
        .unwrap();
        let profile = load_profile(&cli).unwrap();
        assert_eq!(profile.url, "https://example.test/active");
        assert_eq!(profile.timeout_ms, 5_000);
        assert!(cli.dry_run);
    }
}
