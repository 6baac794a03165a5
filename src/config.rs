use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.14; rv:75.0) Gecko/20100101 Firefox/75.0";

/// Options for one generation run.
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GenerateOptions {
    /// Log every fetch and cache hit.
    pub verbose: bool,
    /// Keep `<script>` elements (inlined) instead of stripping them.
    pub keep_script: bool,
    /// Rewrite non-embedded references (anchors, other links) to absolute URLs.
    pub full_url: bool,
    pub verify_tls: bool,
    /// Treat responses outside 2xx/3xx as content instead of failures.
    pub ignore_http_errors: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Referer sent with the top-level document request.
    pub referer: Option<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub window_width: u32,
    pub window_height: u32,
    /// Ask the renderer for a full-page screenshot of the top-level page.
    pub screenshot: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            verbose: true,
            keep_script: false,
            full_url: true,
            verify_tls: true,
            ignore_http_errors: false,
            username: None,
            password: None,
            referer: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            window_width: 1920,
            window_height: 1080,
            screenshot: true,
        }
    }
}

impl GenerateOptions {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Basic-auth credentials, only when a username is configured.
    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        self.username
            .as_deref()
            .filter(|user| !user.is_empty())
            .map(|user| (user, self.password.as_deref()))
    }
}

/// Per-request knobs for [`crate::fetcher::ResourceFetcher::fetch`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub use_cache: bool,
    pub ignore_http_errors: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub referer: Option<String>,
}

impl FetchOptions {
    pub fn from_generate(options: &GenerateOptions) -> Self {
        Self {
            use_cache: true,
            ignore_http_errors: options.ignore_http_errors,
            username: options.username.clone(),
            password: options.password.clone(),
            referer: None,
        }
    }

    pub fn with_referer(mut self, referer: Option<&str>) -> Self {
        self.referer = referer.filter(|r| !r.is_empty()).map(str::to_string);
        self
    }
}
