//! Polite HTTP fetching and HTML mining for the discovery cascade.
//!
//! `scraper::Html` is not `Send`, so all parsing lives in synchronous helpers
//! that take and return owned strings; only the fetch itself is async.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::extract;

const FETCH_TIMEOUT: Duration = Duration::from_secs(12);

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Fetches a page body, or `None` on any failure. Implementations are
/// expected to be polite (delays, plausible headers); fakes in tests are not.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("reqwest client builds with static configuration");
        Self { client }
    }

    fn user_agent() -> &'static str {
        use rand::seq::SliceRandom;
        USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0])
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        // ThreadRng is not Send: pick the delay before any await point.
        let delay_ms = {
            use rand::Rng;
            rand::thread_rng().gen_range(800..=1800)
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        let response = self
            .client
            .get(url)
            .header("User-Agent", Self::user_agent())
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => resp.text().await.ok(),
            Ok(resp) => {
                debug!("Fetch of {} returned {}", url, resp.status());
                None
            }
            Err(err) => {
                debug!("Fetch of {} failed: {}", url, err);
                None
            }
        }
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector parses")
}

/// Plausible contact addresses in a page: `mailto:` hrefs plus the page text.
pub fn emails_in_html(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for anchor in document.select(&selector("a[href]")) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if let Some(rest) = href.strip_prefix("mailto:") {
            let addr = rest.split('?').next().unwrap_or("").trim().to_lowercase();
            if extract::is_plausible_contact(&addr) && seen.insert(addr.clone()) {
                out.push(addr);
            }
        }
    }

    let text: String = document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    for addr in extract::extract_emails(&text) {
        if seen.insert(addr.clone()) {
            out.push(addr);
        }
    }

    out
}

/// Looks for the employer's own website on a job page: first anchors whose
/// text advertises a site, then plain links inside the description block.
/// Links back to `exclude_host` are ignored.
pub fn employer_site_in_html(html: &str, exclude_host: &str) -> Option<String> {
    const SITE_HINTS: &[&str] = &["website", "our site", "company site", "visit us"];

    let document = Html::parse_document(html);

    for anchor in document.select(&selector("a[href]")) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let text = anchor.text().collect::<String>().to_lowercase();
        if SITE_HINTS.iter().any(|hint| text.contains(hint)) && !href.contains(exclude_host) {
            return Some(href.to_string());
        }
    }

    for anchor in document.select(&selector("div.show-more-less-html__markup a[href]")) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.contains(exclude_host) {
            continue;
        }
        if let Ok(parsed) = Url::parse(href) {
            if matches!(parsed.scheme(), "http" | "https") {
                if let Some(host) = parsed.host_str() {
                    return Some(format!("{}://{}", parsed.scheme(), host));
                }
            }
        }
    }

    None
}

/// The full job description text from a posting page.
pub fn job_description_in_html(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let markup = document
        .select(&selector("div.show-more-less-html__markup"))
        .next()?;
    let text = markup
        .text()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
