//! Contact email discovery: a short-circuiting cascade of strategies,
//! cheapest first.
//!
//! 1. Addresses embedded in the job description text.
//! 2. Addresses on the job posting page itself (mailto links, page text).
//! 3. The employer's own website: homepage plus common career/contact pages.
//! 4. Pattern-guessed hiring addresses for the employer's domain.
//!
//! Later strategies run only when all earlier ones came up empty.

pub mod extract;
pub mod web;

use std::sync::Arc;

use tracing::{debug, info};

use web::Fetch;

/// Per-site fetch cap for strategy 3 (successful fetches, not attempts).
const MAX_SITE_PAGES: usize = 4;

/// Everything the cascade may consult for one job.
pub struct DiscoveryInput<'a> {
    pub description: &'a str,
    pub source_url: &'a str,
    pub employer: &'a str,
    /// The already-fetched posting page, when the feed has it.
    pub page_html: Option<&'a str>,
}

pub struct EmailFinder {
    fetcher: Arc<dyn Fetch>,
}

impl EmailFinder {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self { fetcher }
    }

    /// Runs the cascade and returns the best address found, or `None`.
    pub async fn find(&self, input: &DiscoveryInput<'_>) -> Option<String> {
        if let Some(email) = self.from_description(input) {
            info!("Contact found in description: {}", email);
            return Some(email);
        }

        if let Some(email) = self.from_page(input) {
            info!("Contact found on posting page: {}", email);
            return Some(email);
        }

        let site = self.employer_site(input).await;
        if let Some(site) = site {
            if let Some(email) = self.from_site(&site).await {
                info!("Contact found on employer site: {}", email);
                return Some(email);
            }
            // Site exists but publishes no address: fall back to the most
            // common hiring pattern for its domain.
            if let Some(domain) = extract::domain_of(&site) {
                if domain.contains('.') {
                    let guess = extract::hr_pattern_addresses(&domain).into_iter().next();
                    if let Some(guess) = &guess {
                        info!("Falling back to pattern address: {}", guess);
                    }
                    return guess;
                }
            }
        }

        debug!("No contact address found for {}", input.employer);
        None
    }

    fn from_description(&self, input: &DiscoveryInput<'_>) -> Option<String> {
        extract::rank_addresses(extract::extract_emails(input.description))
            .into_iter()
            .next()
    }

    fn from_page(&self, input: &DiscoveryInput<'_>) -> Option<String> {
        let html = input.page_html?;
        extract::rank_addresses(web::emails_in_html(html))
            .into_iter()
            .next()
    }

    /// Resolves the employer's website: a link on the posting page when one
    /// exists, otherwise a name-based guess that must actually respond.
    async fn employer_site(&self, input: &DiscoveryInput<'_>) -> Option<String> {
        let exclude = extract::domain_of(input.source_url)
            .unwrap_or_else(|| "linkedin.com".to_string());

        if let Some(html) = input.page_html {
            if let Some(site) = web::employer_site_in_html(html, &exclude) {
                return Some(site);
            }
        }

        let guessed = extract::guessed_site(input.employer)?;
        if self.fetcher.fetch(&guessed).await.is_some() {
            return Some(guessed);
        }
        None
    }

    async fn from_site(&self, site: &str) -> Option<String> {
        let base = {
            let parsed = url::Url::parse(site).ok()?;
            format!("{}://{}", parsed.scheme(), parsed.host_str()?)
        };

        let mut pages = vec![base.clone()];
        pages.extend(extract::CAREER_PATHS.iter().map(|path| format!("{base}{path}")));

        let mut fetched = 0usize;
        for page in pages {
            if fetched >= MAX_SITE_PAGES {
                break;
            }
            let Some(html) = self.fetcher.fetch(&page).await else {
                continue;
            };
            fetched += 1;
            let found = extract::rank_addresses(web::emails_in_html(&html))
                .into_iter()
                .next();
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned pages and records every URL it was asked for.
    struct FakeFetcher {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Fetch for FakeFetcher {
        async fn fetch(&self, url: &str) -> Option<String> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned()
        }
    }

    fn input<'a>(
        description: &'a str,
        employer: &'a str,
        page_html: Option<&'a str>,
    ) -> DiscoveryInput<'a> {
        DiscoveryInput {
            description,
            source_url: "https://www.linkedin.com/jobs/view/123",
            employer,
            page_html,
        }
    }

    #[tokio::test]
    async fn test_description_hit_short_circuits_all_network_work() {
        let fetcher = Arc::new(FakeFetcher::new(&[]));
        let finder = EmailFinder::new(fetcher.clone());

        let found = finder
            .find(&input("Apply at jobs@acme.io today", "Acme", None))
            .await;

        assert_eq!(found.as_deref(), Some("jobs@acme.io"));
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test]
    async fn test_description_hit_prefers_hiring_inbox() {
        let finder = EmailFinder::new(Arc::new(FakeFetcher::new(&[])));
        let found = finder
            .find(&input(
                "Contact noreply@acme.io, info@acme.io or jobs@acme.io",
                "Acme",
                None,
            ))
            .await;
        assert_eq!(found.as_deref(), Some("jobs@acme.io"));
    }

    #[tokio::test]
    async fn test_posting_page_checked_before_any_fetch() {
        let fetcher = Arc::new(FakeFetcher::new(&[]));
        let finder = EmailFinder::new(fetcher.clone());
        let page = r#"<a href="mailto:talent@acme.io">talent</a>"#;

        let found = finder.find(&input("no address here", "Acme", Some(page))).await;

        assert_eq!(found.as_deref(), Some("talent@acme.io"));
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test]
    async fn test_site_scan_stops_at_first_page_with_address() {
        let fetcher = Arc::new(FakeFetcher::new(&[
            ("https://acme.io", "<p>welcome</p>"),
            ("https://acme.io/careers", "<p>write to hr@acme.io</p>"),
            ("https://acme.io/jobs", "<p>also jobs@acme.io</p>"),
        ]));
        let finder = EmailFinder::new(fetcher.clone());
        let page = r#"<a href="https://acme.io">Visit us</a>"#;

        let found = finder.find(&input("nothing", "Acme", Some(page))).await;

        assert_eq!(found.as_deref(), Some("hr@acme.io"));
        // Homepage then /careers; /jobs never requested.
        let requests = fetcher.requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec!["https://acme.io", "https://acme.io/careers"]
        );
    }

    #[tokio::test]
    async fn test_silent_site_falls_back_to_pattern_address() {
        let pages: Vec<(String, String)> = std::iter::once(("https://acme.io".to_string(), "<p>hi</p>".to_string()))
            .chain(
                extract::CAREER_PATHS
                    .iter()
                    .map(|p| (format!("https://acme.io{p}"), "<p>nothing</p>".to_string())),
            )
            .collect();
        let borrowed: Vec<(&str, &str)> = pages
            .iter()
            .map(|(u, b)| (u.as_str(), b.as_str()))
            .collect();
        let finder = EmailFinder::new(Arc::new(FakeFetcher::new(&borrowed)));
        let page = r#"<a href="https://acme.io">Visit us</a>"#;

        let found = finder.find(&input("nothing", "Acme", Some(page))).await;
        assert_eq!(found.as_deref(), Some("hr@acme.io"));
    }

    #[tokio::test]
    async fn test_unreachable_guessed_site_yields_none() {
        let fetcher = Arc::new(FakeFetcher::new(&[]));
        let finder = EmailFinder::new(fetcher.clone());

        let found = finder.find(&input("nothing", "Acme", None)).await;

        assert_eq!(found, None);
        // Only the name-based guess was fetched.
        let requests = fetcher.requests.lock().unwrap().clone();
        assert_eq!(requests, vec!["https://www.acme.com"]);
    }
}
