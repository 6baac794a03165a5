//! Page rendering seam.
//!
//! A renderer turns a URL into the markup a browser would show, optionally
//! with a full-page screenshot. The engine never depends on one being
//! present: any [`RenderError`] sends it back to a plain HTTP fetch.

use crate::error::RenderError;

#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    pub html: String,
    /// PNG bytes when a screenshot was requested and captured.
    pub screenshot: Option<Vec<u8>>,
}

#[allow(async_fn_in_trait)]
pub trait DocumentRenderer {
    async fn render(&self, url: &str, capture_screenshot: bool)
        -> Result<RenderedPage, RenderError>;
}

/// Renderer used when no browser is configured: every page is fetched as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOnlyRenderer;

impl DocumentRenderer for FetchOnlyRenderer {
    async fn render(&self, _url: &str, _capture: bool) -> Result<RenderedPage, RenderError> {
        Err(RenderError::Unavailable)
    }
}

#[cfg(feature = "chrome")]
pub use chrome::ChromeRenderer;

#[cfg(feature = "chrome")]
mod chrome {
    use std::time::Duration;

    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::page::ScreenshotParams;
    use futures::StreamExt;
    use tokio::sync::Mutex;
    use tracing::{debug, info, warn};

    use super::{DocumentRenderer, RenderedPage};
    use crate::config::GenerateOptions;
    use crate::error::RenderError;

    /// Time given to late scripts and lazy images before the page is read.
    const SETTLE_DELAY: Duration = Duration::from_secs(2);

    /// Headless Chrome, launched on first use and reused for every page.
    pub struct ChromeRenderer {
        window_width: u32,
        window_height: u32,
        page_timeout: Duration,
        browser: Mutex<Option<Browser>>,
    }

    impl ChromeRenderer {
        pub fn new(options: &GenerateOptions) -> Self {
            Self {
                window_width: options.window_width,
                window_height: options.window_height,
                page_timeout: Duration::from_secs(options.timeout_secs),
                browser: Mutex::new(None),
            }
        }

        async fn launch(&self) -> Result<Browser, RenderError> {
            info!("Launching headless browser");
            let config = BrowserConfig::builder()
                .window_size(self.window_width, self.window_height)
                .request_timeout(self.page_timeout)
                .arg("--incognito")
                .arg("--hide-scrollbars")
                .arg("--test-type")
                .build()
                .map_err(RenderError::Browser)?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| RenderError::Browser(e.to_string()))?;

            tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        debug!("Browser handler error: {e}");
                    }
                }
            });
            Ok(browser)
        }

        pub async fn shutdown(&self) {
            if let Some(mut browser) = self.browser.lock().await.take() {
                if let Err(e) = browser.close().await {
                    warn!("Failed to close browser: {e}");
                }
            }
        }
    }

    impl DocumentRenderer for ChromeRenderer {
        async fn render(
            &self,
            url: &str,
            capture_screenshot: bool,
        ) -> Result<RenderedPage, RenderError> {
            let mut guard = self.browser.lock().await;
            if guard.is_none() {
                *guard = Some(self.launch().await?);
            }
            let browser = guard.as_ref().ok_or(RenderError::Unavailable)?;

            let page = tokio::time::timeout(self.page_timeout, browser.new_page(url))
                .await
                .map_err(|_| RenderError::Timeout { url: url.to_string() })?
                .map_err(|e| RenderError::Browser(e.to_string()))?;

            if let Err(e) = page.wait_for_navigation().await {
                warn!("Navigation did not settle for {url}: {e}");
            }
            tokio::time::sleep(SETTLE_DELAY).await;

            let screenshot = if capture_screenshot {
                let params = ScreenshotParams::builder().full_page(true).build();
                match page.screenshot(params).await {
                    Ok(png) => Some(png),
                    Err(e) => {
                        warn!("Screenshot of {url} failed: {e}");
                        None
                    }
                }
            } else {
                None
            };

            let html = page
                .content()
                .await
                .map_err(|e| RenderError::Browser(e.to_string()))?;

            if let Err(e) = page.close().await {
                debug!("Failed to close page: {e}");
            }
            Ok(RenderedPage { html, screenshot })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_only_renderer_is_unavailable() {
        let result = FetchOnlyRenderer.render("https://example.com", true).await;
        assert!(matches!(result, Err(RenderError::Unavailable)));
    }
}
