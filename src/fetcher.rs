use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER};
use reqwest::{Client, ClientBuilder};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{FetchOptions, GenerateOptions};
use crate::error::Result;
use crate::locator::{resolve, strip_query, Locator, ResolutionContext};

/// Body of a fetched resource. `text/*` responses are decoded, everything
/// else is kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Bytes(Vec<u8>),
}

impl Content {
    pub fn empty() -> Self {
        Content::Bytes(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Content::Text(text) => text.is_empty(),
            Content::Bytes(bytes) => bytes.is_empty(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Bytes(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub content: Content,
    pub content_type: Option<String>,
    /// Where the content actually came from, after redirects.
    pub locator: Locator,
}

impl FetchResult {
    pub fn empty(locator: Locator) -> Self {
        Self {
            content: Content::empty(),
            content_type: None,
            locator,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Successful fetches of one run, keyed by quoted final locator.
///
/// Failures are never stored, so a later reference retries the fetch.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<String, FetchResult>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FetchResult> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, result: FetchResult) {
        if !result.is_empty() {
            self.entries.insert(key, result);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone)]
pub struct ResourceFetcher {
    client: Client,
    verbose: bool,
}

impl ResourceFetcher {
    pub fn new(options: &GenerateOptions) -> Result<Self> {
        let client = Self::build_http_client(options)?;
        Ok(Self {
            client,
            verbose: options.verbose,
        })
    }

    fn build_http_client(options: &GenerateOptions) -> reqwest::Result<Client> {
        ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(options.user_agent.as_str())
            .danger_accept_invalid_certs(!options.verify_tls)
            .cookie_store(true)
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
    }

    /// Fetch `relative` as seen from `ctx`. Never fails: every error comes
    /// back as an empty result so callers can keep the original reference.
    pub async fn fetch(
        &self,
        cache: &mut ResolutionCache,
        ctx: &ResolutionContext,
        relative: &str,
        options: &FetchOptions,
    ) -> FetchResult {
        let locator = ctx.resolve(relative);
        if locator.is_network() {
            self.fetch_remote(cache, locator, options).await
        } else {
            self.read_local(ctx.base.as_str(), relative).await
        }
    }

    async fn fetch_remote(
        &self,
        cache: &mut ResolutionCache,
        locator: Locator,
        options: &FetchOptions,
    ) -> FetchResult {
        let full_path = locator.quoted();
        if options.use_cache {
            if let Some(hit) = cache.get(&full_path) {
                if self.verbose {
                    info!("[ CACHE HIT ] - {}", full_path);
                }
                return hit.clone();
            }
        }

        let mut request = self
            .client
            .get(&full_path)
            .header(ACCEPT, "image/webp,image/*,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "ja,en-US;q=0.9,en;q=0.8");
        if let Some(referer) = &options.referer {
            request = request.header(REFERER, referer);
        }
        if let Some(username) = options.username.as_deref().filter(|u| !u.is_empty()) {
            request = request.basic_auth(username, options.password.as_deref());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("[ WARN ] ??? - {}: {}", full_path, e);
                return FetchResult::empty(locator);
            }
        };

        let status = response.status();
        let final_locator = Locator::new(response.url().as_str());
        if self.verbose {
            info!("[ GET ] {} - {}", status.as_u16(), final_locator);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !options.ignore_http_errors && !(200..400).contains(&status.as_u16()) {
            return FetchResult {
                content: Content::empty(),
                content_type,
                locator: final_locator,
            };
        }

        let content = if content_type.as_deref().is_some_and(is_text) {
            response.text().await.map(Content::Text)
        } else {
            response.bytes().await.map(|bytes| Content::Bytes(bytes.to_vec()))
        };
        let content = match content {
            Ok(content) => content,
            Err(e) => {
                warn!("[ WARN ] failed to read body - {}: {}", final_locator, e);
                return FetchResult::empty(final_locator);
            }
        };

        let result = FetchResult {
            content,
            content_type,
            locator: final_locator,
        };
        if options.use_cache {
            cache.insert(result.locator.quoted(), result.clone());
        }
        result
    }

    async fn read_local(&self, base: &str, relative: &str) -> FetchResult {
        let full_path = if relative.is_empty() {
            base.to_string()
        } else {
            let reference = strip_query(relative);
            if Path::new(reference).exists() {
                reference.to_string()
            } else {
                resolve(strip_query(base), reference).to_string()
            }
        };

        let locator = Locator::new(full_path);
        match tokio::fs::read(locator.as_str()).await {
            Ok(bytes) => {
                if self.verbose {
                    info!("[ LOCAL ] found - {}", locator);
                }
                FetchResult {
                    content: Content::Bytes(bytes),
                    content_type: None,
                    locator,
                }
            }
            Err(e) => {
                warn!("[ WARN ] file not found - {} {}", locator, e);
                FetchResult::empty(locator)
            }
        }
    }
}

fn is_text(content_type: &str) -> bool {
    match content_type.parse::<mime::Mime>() {
        Ok(parsed) => parsed.type_() == mime::TEXT,
        Err(_) => content_type.trim().to_ascii_lowercase().starts_with("text/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_detection() {
        assert!(is_text("text/css"));
        assert!(is_text("TEXT/HTML; charset=utf-8"));
        assert!(!is_text("image/png"));
        assert!(!is_text("application/javascript"));
    }

    #[test]
    fn test_cache_skips_empty_results() {
        let mut cache = ResolutionCache::new();
        let key = "https://example.com/a.png".to_string();
        cache.insert(key.clone(), FetchResult::empty(Locator::new(key.as_str())));
        assert!(cache.is_empty());

        cache.insert(
            key.clone(),
            FetchResult {
                content: Content::Bytes(vec![1, 2, 3]),
                content_type: Some("image/png".into()),
                locator: Locator::new(key.as_str()),
            },
        );
        assert!(cache.contains(&key));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_local_read_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/site.css"), b"body{}").unwrap();
        let base = dir.path().join("index.html");

        let fetcher = ResourceFetcher::new(&GenerateOptions::default()).unwrap();
        let ctx = ResolutionContext::new(Locator::new(base.to_string_lossy()), None, 1);
        let mut cache = ResolutionCache::new();
        let options = FetchOptions::default();

        let found = fetcher.fetch(&mut cache, &ctx, "css/site.css?v=2", &options).await;
        assert_eq!(found.content.as_bytes(), b"body{}");

        let missing = fetcher.fetch(&mut cache, &ctx, "css/nope.css", &options).await;
        assert!(missing.is_empty());
        assert!(cache.is_empty());
    }
}
