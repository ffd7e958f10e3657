use anyhow::{Context, Result};
use dotenvy::dotenv;
use scholar_crawler::site::{DEFAULT_BASE_URL, DEFAULT_SEARCH_URL};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub search_url: String,
    pub out_dir: PathBuf,
    pub webdriver_url: String,
    /// Falls back to `<out_dir>/downloads`
    pub download_dir: Option<PathBuf>,
    pub headless: bool,
    /// Wait for elements a page must have
    pub wait_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            base_url: env::var("SCHOLAR_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            search_url: env::var("SCHOLAR_SEARCH_URL")
                .unwrap_or_else(|_| DEFAULT_SEARCH_URL.to_string()),
            out_dir: env::var("SCHOLAR_OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./out")),
            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:4444".to_string()),
            download_dir: env::var("SCHOLAR_DOWNLOAD_DIR").ok().map(PathBuf::from),
            headless: env::var("SCHOLAR_HEADLESS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("SCHOLAR_HEADLESS must be true or false")?,
            wait_timeout: Duration::from_millis(
                env::var("SCHOLAR_WAIT_TIMEOUT_MS")
                    .unwrap_or_else(|_| "30000".to_string())
                    .parse()
                    .context("SCHOLAR_WAIT_TIMEOUT_MS must be a number of milliseconds")?,
            ),
        })
    }

    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| self.out_dir.join("downloads"))
    }
}
