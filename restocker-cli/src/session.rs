//! Chrome bootstrap for a run: launch, sign-in pause, teardown.

use anyhow::{anyhow, Context, Result};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_PROFILE_DIR: &str = "chrome_profile";

pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch Chrome on a persistent profile directory so sign-in survives
    /// between runs.
    pub async fn launch(profile_dir: &Path, headless: bool) -> Result<Self> {
        std::fs::create_dir_all(profile_dir).with_context(|| {
            format!("Failed to create profile directory {}", profile_dir.display())
        })?;

        let mut builder = BrowserConfig::builder().user_data_dir(profile_dir);
        builder = if headless {
            builder.arg("--disable-gpu").window_size(1920, 1080)
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| anyhow!("Failed to build browser config: {e}"))?;

        info!(headless, profile = %profile_dir.display(), "Launching Chrome");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch Chrome")?;
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self { browser, handler })
    }

    pub async fn open(&self, url: &str) -> Result<Page> {
        let page = self
            .browser
            .new_page(url)
            .await
            .with_context(|| format!("Failed to open {url}"))?;
        page.wait_for_navigation()
            .await
            .with_context(|| format!("Navigation to {url} did not finish"))?;
        Ok(page)
    }

    /// If the tab was redirected to a sign-in page, let the operator sign in
    /// by hand, then load `url` again.
    pub async fn pause_for_login(
        &self,
        page: &Page,
        url: &str,
        is_login_url: impl Fn(&str) -> bool,
    ) -> Result<()> {
        let current = page.url().await.ok().flatten().unwrap_or_default();
        debug!(%current, "Landing URL");
        if !is_login_url(&current) {
            return Ok(());
        }

        println!("Please sign in in the browser window, then press Enter here to continue...");
        wait_for_enter().await?;
        page.goto(url)
            .await
            .with_context(|| format!("Failed to reload {url} after sign-in"))?;
        page.wait_for_navigation().await.ok();
        Ok(())
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for browser exit failed: {e}");
        }
        self.handler.abort();
    }
}

pub fn resolve_profile_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| PathBuf::from(DEFAULT_PROFILE_DIR))
}

pub async fn wait_for_enter() -> Result<()> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| ())
    })
    .await
    .context("stdin reader task failed")?
    .context("Failed to read from stdin")
}
