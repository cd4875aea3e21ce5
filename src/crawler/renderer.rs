//! Headless browser rendering for JavaScript-heavy pages
//!
//! The fetcher only decides *when* a page needs rendering; the rendering itself
//! sits behind the [`Renderer`] trait. With the `js-rendering` feature the
//! default implementation drives Chrome through chromiumoxide, otherwise it
//! reports that rendering is unavailable and the static result is kept.

use crate::PipelineError;
use async_trait::async_trait;
use std::time::Duration;

/// Markup captured from a rendered page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Serialized DOM after scripts ran
    pub html: String,

    /// Status of the main document response
    pub status_code: u16,
}

/// Something that can load a URL in a JavaScript-executing browser
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigates to `url`, waits for the page to settle (at most `wait`)
    /// and returns the rendered markup
    async fn render(&self, url: &str, wait: Duration) -> Result<RenderedPage, PipelineError>;

    /// Whether `render` can succeed at all in this build
    fn is_available(&self) -> bool {
        true
    }

    /// Releases browser resources; called once the job is done
    async fn close(&self) {}
}

#[cfg(feature = "js-rendering")]
mod browser_impl {
    use super::*;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::Page;
    use futures::StreamExt;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;

    fn render_error(url: &str, message: impl std::fmt::Display) -> PipelineError {
        PipelineError::Render {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Navigates `page` to `url` and serializes the DOM
    async fn capture(page: &Page, url: &str, wait: Duration) -> Result<String, PipelineError> {
        match tokio::time::timeout(wait, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(render_error(url, e)),
            Err(_) => tracing::debug!(url = %url, "Render wait timed out, capturing current DOM"),
        }

        page.content().await.map_err(|e| render_error(url, e))
    }

    /// Chrome-backed renderer, launched on first use
    pub struct HeadlessRenderer {
        browser: Mutex<Option<(Browser, JoinHandle<()>)>>,
    }

    impl HeadlessRenderer {
        pub fn new() -> Self {
            Self {
                browser: Mutex::new(None),
            }
        }

        async fn launch(url: &str) -> Result<(Browser, JoinHandle<()>), PipelineError> {
            tracing::info!("Launching headless Chrome");

            let config = BrowserConfig::builder()
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--disable-extensions")
                .build()
                .map_err(|e| render_error(url, e))?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| render_error(url, e))?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            Ok((browser, handle))
        }
    }

    impl Default for HeadlessRenderer {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Renderer for HeadlessRenderer {
        async fn render(&self, url: &str, wait: Duration) -> Result<RenderedPage, PipelineError> {
            let mut guard = self.browser.lock().await;
            if guard.is_none() {
                *guard = Some(Self::launch(url).await?);
            }
            let Some((browser, _)) = guard.as_ref() else {
                return Err(render_error(url, "browser not initialized"));
            };

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| render_error(url, e))?;

            // The tab is closed whether or not capturing succeeded
            let captured = capture(&page, url, wait).await;
            if let Err(e) = page.close().await {
                tracing::warn!(url = %url, error = %e, "Failed to close page");
            }
            let html = captured?;

            // chromiumoxide does not surface the document status here; a
            // completed navigation is reported as 200
            Ok(RenderedPage {
                html,
                status_code: 200,
            })
        }

        async fn close(&self) {
            if let Some((mut browser, handle)) = self.browser.lock().await.take() {
                if let Err(e) = browser.close().await {
                    tracing::warn!(error = %e, "Failed to close browser");
                }
                handle.abort();
            }
        }
    }

}

#[cfg(feature = "js-rendering")]
pub use browser_impl::HeadlessRenderer;

/// Stand-in used when the crate is built without `js-rendering`
#[cfg(not(feature = "js-rendering"))]
#[derive(Debug, Default)]
pub struct HeadlessRenderer;

#[cfg(not(feature = "js-rendering"))]
impl HeadlessRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(feature = "js-rendering"))]
#[async_trait]
impl Renderer for HeadlessRenderer {
    fn is_available(&self) -> bool {
        false
    }

    async fn render(&self, url: &str, _wait: Duration) -> Result<RenderedPage, PipelineError> {
        Err(PipelineError::Render {
            url: url.to_string(),
            message: "JavaScript rendering not available; build with --features js-rendering"
                .to_string(),
        })
    }
}

/// Whether this build can render pages
pub fn is_js_rendering_available() -> bool {
    cfg!(feature = "js-rendering")
}
