//! WebDriver session plumbing.
//!
//! `PageDriver` is the seam the page walker is written against; the real
//! implementation wraps a fantoccini client talking to a local chromedriver.
//! Tests drive the walker with a scripted fake instead of a browser.

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use rand::RngExt;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::ScraperConfig;

/// Desktop user agents rotated per session. The sites in scope fingerprint
/// the stock automation agent and serve it captchas.
const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("webdriver session could not be started: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),

    #[error("webdriver command failed: {0}")]
    Command(#[from] fantoccini::error::CmdError),
}

/// Async seam over the browser. Everything the walker and the enrichment
/// steps need, nothing more.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;
    async fn current_url(&self) -> Result<Url, BrowserError>;
    async fn page_source(&self) -> Result<String, BrowserError>;
    async fn scroll_to_bottom(&self) -> Result<(), BrowserError>;
    /// Whether at least one element matches the selector right now.
    async fn has_element(&self, css: &str) -> Result<bool, BrowserError>;
    /// Wait up to `timeout` for the element to appear, then click it.
    async fn click(&self, css: &str, timeout: Duration) -> Result<(), BrowserError>;
    /// Text of the first matching element, if any.
    async fn first_text(&self, css: &str) -> Result<Option<String>, BrowserError>;
}

pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    pub async fn connect(config: &ScraperConfig) -> Result<Self, BrowserError> {
        let ua = USER_AGENTS[rand::rng().random_range(0..USER_AGENTS.len())];

        let mut args = vec![
            format!("--user-agent={ua}"),
            "--start-maximized".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
        ];
        if config.headless {
            args.push("--headless=new".to_string());
        }

        let mut caps = serde_json::Map::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        debug!("Connecting to webdriver at {}", config.webdriver_url);
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&config.webdriver_url)
            .await?;

        Ok(Self { client })
    }

    pub async fn close(self) -> Result<(), BrowserError> {
        self.client.close().await?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for WebDriverSession {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.client.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<Url, BrowserError> {
        Ok(self.client.current_url().await?)
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        Ok(self.client.source().await?)
    }

    async fn scroll_to_bottom(&self) -> Result<(), BrowserError> {
        self.client
            .execute("window.scrollTo(0, document.body.scrollHeight);", vec![])
            .await?;
        Ok(())
    }

    async fn has_element(&self, css: &str) -> Result<bool, BrowserError> {
        let found = self.client.find_all(Locator::Css(css)).await?;
        Ok(!found.is_empty())
    }

    async fn click(&self, css: &str, timeout: Duration) -> Result<(), BrowserError> {
        let el = self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(css))
            .await?;
        el.click().await?;
        Ok(())
    }

    async fn first_text(&self, css: &str) -> Result<Option<String>, BrowserError> {
        let mut found = self.client.find_all(Locator::Css(css)).await?;
        if found.is_empty() {
            return Ok(None);
        }
        let el = found.remove(0);
        Ok(Some(el.text().await?))
    }
}
