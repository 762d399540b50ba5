use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use fantoccini::ClientBuilder;
use fantoccini::wd::Capabilities;
use magpie_http::{HttpClient, RequestOpts, header};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Raw page payload as fetched, before any extraction.
#[derive(Debug, Clone)]
pub struct PageCapture {
    pub http_status: u16,
    pub html: String,
}

/// Strategy for turning a URL into HTML. The crawler only sees this trait,
/// so tests can swap in a canned page map and the browser path stays optional.
#[async_trait]
pub trait PageCapturer: Send + Sync {
    async fn capture(&self, url: &Url) -> Result<PageCapture>;
}

/// Plain HTTP capturer, one client per crawled site.
///
/// Error statuses come back as captures (`http_status` 404, 503, ...) rather
/// than `Err`; the crawler records those pages and simply does not expand
/// their links.
pub struct HttpCapturer {
    http: HttpClient,
    user_agent: header::HeaderValue,
}

impl HttpCapturer {
    pub fn for_site(seed: &Url, user_agent: &str, timeout: Duration) -> Result<Self> {
        if !matches!(seed.scheme(), "http" | "https") {
            bail!("cannot crawl non-http seed {seed}");
        }
        let base = seed.origin().ascii_serialization();
        let http = HttpClient::new(&base)
            .with_context(|| format!("building client for {base}"))?
            .with_timeout(timeout)
            .with_retries(1);
        let user_agent = header::HeaderValue::from_str(user_agent)
            .context("user agent is not a valid header value")?;
        Ok(Self { http, user_agent })
    }
}

#[async_trait]
impl PageCapturer for HttpCapturer {
    async fn capture(&self, url: &Url) -> Result<PageCapture> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, self.user_agent.clone());
        let (status, html) = self
            .http
            .get_text(
                url.as_str(),
                RequestOpts {
                    headers: Some(headers),
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("fetching {url}"))?;
        Ok(PageCapture {
            http_status: status.as_u16(),
            html,
        })
    }
}

/// Concrete capturer backed by a fantoccini WebDriver session.
///
/// Opens a fresh session per page and closes it before returning, so a hung
/// renderer never poisons the rest of the crawl. Requires a running
/// WebDriver service (Chromedriver at `http://localhost:9515` by default).
pub struct FantocciniCapturer {
    webdriver_url: String,
    headless: bool,
}

impl FantocciniCapturer {
    pub fn new(webdriver_url: impl Into<String>, headless: bool) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            headless,
        }
    }
}

#[async_trait]
impl PageCapturer for FantocciniCapturer {
    async fn capture(&self, url: &Url) -> Result<PageCapture> {
        let mut caps = Capabilities::new();
        let mut chrome_opts = HashMap::new();
        let mut args: Vec<&str> = vec!["--disable-blink-features=AutomationControlled"];
        if self.headless {
            args.push("--headless");
            args.push("--disable-gpu");
        }
        chrome_opts.insert("args".to_string(), json!(args));
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        let mut client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&self.webdriver_url)
            .await
            .with_context(|| format!("connecting to webdriver at {}", self.webdriver_url))?;

        let page = async {
            client.goto(url.as_str()).await?;
            client.source().await
        }
        .await;

        // Always attempt to close the session before returning
        let _ = client.close().await;
        let html = page.with_context(|| format!("rendering {url}"))?;

        // WebDriver does not expose the navigation status; a rendered page
        // is treated as a 200 so the crawler expands its links.
        Ok(PageCapture {
            http_status: 200,
            html,
        })
    }
}
