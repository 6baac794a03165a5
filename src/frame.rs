//! Document loading and bounded frame recursion.
//!
//! Depth 1 is the page handed to [`Engine::generate`]. Each `<iframe>` or
//! `<frame>` found at a depth below [`MAX_FRAME_DEPTH`] is generated as a
//! full document one level deeper; frames found at the cap are never
//! fetched and get [`FRAME_PLACEHOLDER`] instead.

use futures::future::{FutureExt, LocalBoxFuture};
use tracing::{debug, info, warn};

use crate::dom::{collect_elements, get_node_name, get_text, html_to_dom, serialize_dom};
use crate::engine::{Engine, RunContext};
use crate::error::{InlineError, RenderError, Result};
use crate::fetcher::{Content, FetchResult};
use crate::locator::{resolve, Locator, ResolutionContext};
use crate::media_type::HTML_MEDIA_TYPE;
use crate::render::DocumentRenderer;

pub const MAX_FRAME_DEPTH: usize = 2;

/// Content of frames nested deeper than [`MAX_FRAME_DEPTH`].
pub const FRAME_PLACEHOLDER: &str = "<!DOCTYPE html><html lang='en'><head><meta charset='utf-8'><title>Grandchild title</title></head><body><!-- Grandchild content --></body></html>";

/// Used when a document could not be loaded at all.
pub const EMPTY_DOCUMENT: &str = "<!DOCTYPE html><html lang='en'><head><meta charset='utf-8'><title>No title</title></head><body><!-- No content --></body></html>";

impl<R: DocumentRenderer> Engine<R> {
    /// Load, inline and serialize the document at `url`.
    pub(crate) fn generate_document<'a>(
        &'a self,
        run: &'a mut RunContext,
        url: &'a str,
        referer: Option<&'a str>,
        depth: usize,
    ) -> LocalBoxFuture<'a, Result<String>> {
        async move {
            let locator = resolve(url, "");
            let capture = depth == 1 && self.options.screenshot;
            let loaded = self.load_document(run, &locator, referer, capture).await;

            let html = if loaded.is_empty() {
                warn!("[WARN]\tno content for {}", locator);
                EMPTY_DOCUMENT.to_string()
            } else {
                String::from_utf8_lossy(loaded.content.as_bytes()).into_owned()
            };

            let dom = html_to_dom(&html);
            let title = collect_elements(&dom.document)
                .into_iter()
                .find(|node| get_node_name(node).as_deref() == Some("title"))
                .map(|node| get_text(&node))
                .unwrap_or_default();
            info!("[ INFO ] get {} (depth {})", title.trim(), depth);

            let ctx = ResolutionContext::new(locator.clone(), Some(locator.clone()), depth);
            self.inline_document(run, &ctx, &dom).await?;

            serialize_dom(&dom).map_err(|source| InlineError::Serialize {
                url: locator.to_string(),
                source,
            })
        }
        .boxed_local()
    }

    /// Markup for a frame whose `src` is `src`: generated one level deeper,
    /// or the placeholder once the cap is reached.
    pub(crate) async fn frame_html(
        &self,
        run: &mut RunContext,
        ctx: &ResolutionContext,
        src: &str,
    ) -> Result<String> {
        if ctx.depth >= MAX_FRAME_DEPTH {
            debug!("[ DEBUG ] frame {} at depth {} replaced by placeholder", src, ctx.depth);
            return Ok(FRAME_PLACEHOLDER.to_string());
        }

        let frame_url = ctx.resolve(src);
        let html = self
            .generate_document(run, frame_url.as_str(), ctx.referer(), ctx.depth + 1)
            .await?;
        run.links.add(frame_url.as_str(), &run.base_url);
        Ok(html)
    }

    /// Rendered markup for `locator`, through the run cache.
    ///
    /// Network pages go to the renderer first and fall back to a plain
    /// fetch; local pages are read from disk.
    pub(crate) async fn load_document(
        &self,
        run: &mut RunContext,
        locator: &Locator,
        referer: Option<&str>,
        capture_screenshot: bool,
    ) -> FetchResult {
        let key = locator.quoted();
        if let Some(hit) = run.cache.get(&key) {
            if self.options.verbose {
                info!("[ CACHE HIT ] - {}", key);
            }
            return hit.clone();
        }

        let ctx = ResolutionContext::new(locator.clone(), referer.map(Locator::new), 0);
        let options = self.fetch_options(referer);
        if !locator.is_network() {
            let local = self.fetcher.fetch(&mut run.cache, &ctx, "", &options).await;
            return as_html(local);
        }

        debug!("[ DEBUG ] - Get by renderer: {} as {}", locator, run.site_id);
        let result = match self.renderer.render(locator.as_str(), capture_screenshot).await {
            Ok(page) => {
                if page.screenshot.is_some() {
                    run.screenshot = page.screenshot;
                }
                FetchResult {
                    content: Content::Text(page.html),
                    content_type: Some(HTML_MEDIA_TYPE.to_string()),
                    locator: locator.clone(),
                }
            }
            Err(RenderError::Unavailable) => {
                as_html(self.fetcher.fetch(&mut run.cache, &ctx, "", &options).await)
            }
            Err(e) => {
                warn!("[ERROR]\trenderer: '{}'", e);
                warn!("[WARN]\tGet web page by request without screenshot");
                as_html(self.fetcher.fetch(&mut run.cache, &ctx, "", &options).await)
            }
        };

        run.cache.insert(key, result.clone());
        result
    }
}

fn as_html(fetched: FetchResult) -> FetchResult {
    if fetched.is_empty() {
        return fetched;
    }
    let html = match fetched.content {
        Content::Text(text) => text,
        Content::Bytes(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
    };
    FetchResult {
        content: Content::Text(html),
        content_type: Some(HTML_MEDIA_TYPE.to_string()),
        locator: fetched.locator,
    }
}
