use sha2::{Digest, Sha256};
use tracing::info;

use crate::config::{FetchOptions, GenerateOptions};
use crate::error::Result;
use crate::fetcher::{ResolutionCache, ResourceFetcher};
use crate::links::LinkSet;
use crate::render::DocumentRenderer;

/// Deterministic identifier for a top-level URL, used to name its artifacts.
pub fn site_identity(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// State shared by every document of one top-level run.
///
/// Created fresh by [`Engine::generate`] and passed by `&mut` into each
/// nested frame, so independent runs never see each other's cache.
#[derive(Debug)]
pub struct RunContext {
    pub site_id: String,
    pub base_url: String,
    pub cache: ResolutionCache,
    pub links: LinkSet,
    pub screenshot: Option<Vec<u8>>,
}

impl RunContext {
    pub fn new(base_url: &str) -> Self {
        Self {
            site_id: site_identity(base_url),
            base_url: base_url.to_string(),
            cache: ResolutionCache::new(),
            links: LinkSet::new(),
            screenshot: None,
        }
    }
}

/// Result of one top-level run.
#[derive(Debug, Clone)]
pub struct GeneratedPage {
    pub site_id: String,
    pub base_url: String,
    /// The self-contained document.
    pub html: String,
    /// Base URL first, then internal links, then external links.
    pub links: Vec<String>,
    pub screenshot: Option<Vec<u8>>,
}

/// Turns pages into self-contained documents.
///
/// One engine can serve many runs, sequentially or concurrently; all
/// per-run state lives in [`RunContext`].
pub struct Engine<R> {
    pub(crate) options: GenerateOptions,
    pub(crate) fetcher: ResourceFetcher,
    pub(crate) renderer: R,
}

impl<R: DocumentRenderer> Engine<R> {
    pub fn new(options: GenerateOptions, renderer: R) -> Result<Self> {
        let fetcher = ResourceFetcher::new(&options)?;
        Ok(Self {
            options,
            fetcher,
            renderer,
        })
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub async fn generate(&self, url: &str) -> Result<GeneratedPage> {
        let mut run = RunContext::new(url);
        info!(site_id = %run.site_id, "Generating snapshot of {}", url);

        let referer = self.options.referer.clone();
        let html = self
            .generate_document(&mut run, url, referer.as_deref(), 1)
            .await?;

        Ok(GeneratedPage {
            links: run.links.ordered(&run.base_url),
            site_id: run.site_id,
            base_url: run.base_url,
            html,
            screenshot: run.screenshot,
        })
    }

    pub(crate) fn fetch_options(&self, referer: Option<&str>) -> FetchOptions {
        FetchOptions::from_generate(&self.options).with_referer(referer)
    }
}
