//! Page navigation. A [`Browser`] loads URLs and hands out snapshots of the
//! rendered document which are then queried with CSS selectors.

#[cfg(feature = "browser")]
mod chrome;

#[cfg(feature = "browser")]
pub use chrome::ChromeBrowser;

use crate::CrawlerError;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::debug;

#[async_trait::async_trait]
pub trait Browser: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), CrawlerError>;

    /// Snapshot of the document currently displayed.
    async fn document(&mut self) -> Result<RenderedPage, CrawlerError>;

    /// Activates the first element matching `css`. Fails with
    /// [`CrawlerError::ElementNotFound`] when nothing matches.
    async fn click(&mut self, css: &str) -> Result<(), CrawlerError>;

    async fn close(&mut self) -> Result<(), CrawlerError>;
}

#[async_trait::async_trait]
impl<B: Browser + ?Sized> Browser for Box<B> {
    async fn navigate(&mut self, url: &str) -> Result<(), CrawlerError> {
        (**self).navigate(url).await
    }

    async fn document(&mut self) -> Result<RenderedPage, CrawlerError> {
        (**self).document().await
    }

    async fn click(&mut self, css: &str) -> Result<(), CrawlerError> {
        (**self).click(css).await
    }

    async fn close(&mut self) -> Result<(), CrawlerError> {
        (**self).close().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    url: String,
    html: String,
}

impl RenderedPage {
    pub fn new<U: Into<String>, H: Into<String>>(url: U, html: H) -> RenderedPage {
        RenderedPage {
            url: url.into(),
            html: html.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn parse(&self) -> Html {
        Html::parse_document(&self.html)
    }

    /// Resolves `href` against the page URL, the way a browser reports the
    /// `href` property of a link.
    pub fn absolute(&self, href: &str) -> String {
        match Url::parse(&self.url).and_then(|base| base.join(href.trim())) {
            Ok(url) => url.to_string(),
            Err(_) => href.trim().to_string(),
        }
    }

    /// Absolute target of the first link matching `css`.
    pub fn link_target(&self, css: &str) -> Result<String, CrawlerError> {
        let selector = Selector::parse(css).map_err(|_| CrawlerError::Selector(css.to_string()))?;
        let doc = self.parse();
        let el = doc
            .select(&selector)
            .next()
            .ok_or_else(|| CrawlerError::ElementNotFound(css.to_string()))?;
        el.value()
            .attr("href")
            .map(|href| self.absolute(href))
            .ok_or_else(|| CrawlerError::Browser(format!("`{}` is not a link", css)))
    }
}

/// Plain HTTP engine: every navigation is a GET and clicking a link follows
/// its `href`. Sees only server-rendered markup.
pub struct HttpBrowser {
    client: reqwest::Client,
    current: Option<RenderedPage>,
}

impl HttpBrowser {
    pub fn new() -> Result<HttpBrowser, CrawlerError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(HttpBrowser {
            client,
            current: None,
        })
    }
}

#[async_trait::async_trait]
impl Browser for HttpBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), CrawlerError> {
        debug!("Visit {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        let url = response.url().to_string();
        let html = response.text().await?;
        self.current = Some(RenderedPage::new(url, html));
        Ok(())
    }

    async fn document(&mut self) -> Result<RenderedPage, CrawlerError> {
        self.current
            .clone()
            .ok_or_else(|| CrawlerError::Browser("no page loaded".to_string()))
    }

    async fn click(&mut self, css: &str) -> Result<(), CrawlerError> {
        let target = self.document().await?.link_target(css)?;
        self.navigate(&target).await
    }

    async fn close(&mut self) -> Result<(), CrawlerError> {
        self.current = None;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::StaticBrowser;
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<html><body>
        <a id="rel" href="/bands/Nargie/42">Nargie</a>
        <a id="abs" href="https://other.example/x">x</a>
        <span id="plain">no link</span>
    </body></html>"#;

    #[test]
    fn test_link_target() {
        let page = RenderedPage::new("https://www.metal-archives.com/lists/MN", PAGE);
        assert_eq!(
            page.link_target("a#rel").expect("Link"),
            "https://www.metal-archives.com/bands/Nargie/42"
        );
        assert_eq!(
            page.link_target("a#abs").expect("Link"),
            "https://other.example/x"
        );
        assert!(matches!(
            page.link_target("a#missing"),
            Err(CrawlerError::ElementNotFound(_))
        ));
        assert!(matches!(
            page.link_target("span#plain"),
            Err(CrawlerError::Browser(_))
        ));
        assert!(matches!(
            page.link_target("a[["),
            Err(CrawlerError::Selector(_))
        ));
    }

    const SCRIPTED_NEXT: &str = r#"<div id="bandListCountry_paginate">
        <a class="next paginate_button" tabindex="0">Next</a>
    </div>"#;

    /// Minimal HTTP/1.1 server answering one request per connection.
    async fn serve() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Bind");
        let addr = listener.local_addr().expect("Local address");
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0; 4096];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("/");
                let (status, headers, body) = match path {
                    "/old" => ("302 Found", "Location: /lists/MN\r\n", ""),
                    "/lists/MN" => ("200 OK", "", PAGE),
                    "/lists/XX" => ("200 OK", "", SCRIPTED_NEXT),
                    "/bands/Nargie/42" => ("200 OK", "", "<p>band</p>"),
                    _ => ("404 Not Found", "", ""),
                };
                let response = format!(
                    "HTTP/1.1 {}\r\n{}Content-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    headers,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_browser_navigation() {
        let base = serve().await;
        let mut browser = HttpBrowser::new().expect("Client");

        browser
            .navigate(&format!("{}/old", base))
            .await
            .expect("Navigate");
        assert_eq!(
            browser.document().await.expect("Document").url(),
            format!("{}/lists/MN", base)
        );

        browser.click("a#rel").await.expect("Click");
        assert_eq!(
            browser.document().await.expect("Document").url(),
            format!("{}/bands/Nargie/42", base)
        );
        assert!(matches!(
            browser.click("a#rel").await,
            Err(CrawlerError::ElementNotFound(_))
        ));

        assert!(matches!(
            browser.navigate(&format!("{}/missing", base)).await,
            Err(CrawlerError::Http(_))
        ));
    }

    #[tokio::test]
    async fn test_http_browser_cannot_follow_scripted_controls() {
        let base = serve().await;
        let mut browser = HttpBrowser::new().expect("Client");
        browser
            .navigate(&format!("{}/lists/XX", base))
            .await
            .expect("Navigate");
        assert!(matches!(
            browser
                .click(r#"div[id="bandListCountry_paginate"] > a[class="next paginate_button"]"#)
                .await,
            Err(CrawlerError::Browser(_))
        ));
    }

    #[tokio::test]
    async fn test_click_follows_link() {
        let mut browser = StaticBrowser::default()
            .page("https://www.metal-archives.com/lists/MN", PAGE)
            .page("https://www.metal-archives.com/bands/Nargie/42", "<p>band</p>");
        browser
            .navigate("https://www.metal-archives.com/lists/MN")
            .await
            .expect("Navigate");
        browser.click("a#rel").await.expect("Click");
        assert_eq!(
            browser.document().await.expect("Document").url(),
            "https://www.metal-archives.com/bands/Nargie/42"
        );
        assert!(matches!(
            browser.click("a#rel").await,
            Err(CrawlerError::ElementNotFound(_))
        ));
    }
}
