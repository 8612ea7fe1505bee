use super::{Browser, RenderedPage};
use crate::CrawlerError;
use chromiumoxide::{BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Headless Chromium session driven over the DevTools protocol. Sees the
/// document after client-side scripts have run.
pub struct ChromeBrowser {
    browser: chromiumoxide::Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeBrowser {
    pub async fn launch(headless: bool) -> Result<ChromeBrowser, CrawlerError> {
        info!("Launching browser (headless={})", headless);

        let mut builder = BrowserConfig::builder()
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(CrawlerError::Browser)?;

        let (browser, mut handler) = chromiumoxide::Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        Ok(ChromeBrowser {
            browser,
            page,
            handler,
        })
    }
}

#[async_trait::async_trait]
impl Browser for ChromeBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), CrawlerError> {
        debug!("Visit {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    async fn document(&mut self) -> Result<RenderedPage, CrawlerError> {
        let url = self.page.url().await?.unwrap_or_default();
        let html = self.page.content().await?;
        Ok(RenderedPage::new(url, html))
    }

    async fn click(&mut self, css: &str) -> Result<(), CrawlerError> {
        // Probe the snapshot first so a missing element surfaces as
        // ElementNotFound rather than a protocol error.
        let page = self.document().await?;
        if let Err(CrawlerError::ElementNotFound(css)) = page.link_target(css) {
            return Err(CrawlerError::ElementNotFound(css));
        }
        self.page.find_element(css).await?.click().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), CrawlerError> {
        self.browser.close().await?;
        self.browser.wait().await?;
        self.handler.abort();
        Ok(())
    }
}
