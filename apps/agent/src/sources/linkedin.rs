//! LinkedIn guest job-search feed.
//!
//! Uses the public guest API that backs the logged-out search page. Card
//! lists come from one endpoint; descriptions require fetching each posting
//! page. Parsing is kept in sync helpers because `scraper::Html` is not
//! `Send` and must never be held across an await.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use scraper::{Html, Selector};
use tracing::{info, warn};
use url::Url;

use crate::config::SearchConfig;
use crate::discovery::{web, DiscoveryInput, EmailFinder};
use crate::models::{JobRecord, Source};
use crate::sources::JobFeed;

const SEARCH_URL: &str = "https://www.linkedin.com/jobs-guest/jobs/api/seeMoreJobPostings/search";

/// Location/description markers for a remote-friendly posting.
const REMOTE_KEYWORDS: &[&str] = &[
    "remote",
    "worldwide",
    "anywhere",
    "work from home",
    "wfh",
    "distributed",
    "global",
    "fully remote",
    "100% remote",
    "work from anywhere",
    "location flexible",
    "remote-friendly",
];

pub struct LinkedinFeed {
    fetcher: Arc<dyn web::Fetch>,
    finder: EmailFinder,
    max_results_per_query: usize,
}

/// One entry parsed out of the search results page.
#[derive(Debug, Clone, PartialEq, Eq)]
struct JobCard {
    title: String,
    employer: String,
    location: String,
    url: String,
    source_id: String,
}

impl LinkedinFeed {
    pub fn new(fetcher: Arc<dyn web::Fetch>) -> Self {
        let finder = EmailFinder::new(fetcher.clone());
        Self {
            fetcher,
            finder,
            max_results_per_query: 25,
        }
    }

    fn search_url(keyword: &str, location: &str, search: &SearchConfig) -> String {
        let mut url = Url::parse(SEARCH_URL).expect("static search URL parses");
        url.query_pairs_mut()
            .append_pair("keywords", keyword)
            .append_pair("location", location)
            .append_pair("start", "0")
            // Past week, remote work type.
            .append_pair("f_TPR", "r604800")
            .append_pair("f_WT", "2")
            .append_pair("f_E", search.experience_level.linkedin_code());
        url.into()
    }
}

#[async_trait]
impl JobFeed for LinkedinFeed {
    fn name(&self) -> &'static str {
        "linkedin"
    }

    async fn scrape(&self, search: &SearchConfig) -> Vec<JobRecord> {
        let mut jobs = Vec::new();
        let mut seen_keys: HashSet<String> = HashSet::new();
        let mut skipped_location = 0usize;

        for keyword in &search.keywords {
            for location in &search.locations {
                info!("LinkedIn search: '{}' in '{}'", keyword, location);
                let url = Self::search_url(keyword, location, search);
                let Some(html) = self.fetcher.fetch(&url).await else {
                    warn!("LinkedIn search request failed, skipping query");
                    continue;
                };

                let cards = parse_job_cards(&html);
                info!("Found {} cards for this query", cards.len());

                for card in cards.into_iter().take(self.max_results_per_query) {
                    let mut job = JobRecord {
                        title: card.title,
                        employer: card.employer,
                        location: card.location,
                        description: String::new(),
                        contact_email: String::new(),
                        source: Source::Linkedin,
                        source_id: card.source_id,
                        source_url: card.url,
                        discovered_at: Utc::now(),
                    };
                    if !seen_keys.insert(job.identity_key()) {
                        continue;
                    }

                    let page_html = if job.source_url.is_empty() {
                        None
                    } else {
                        self.fetcher.fetch(&job.source_url).await
                    };
                    if let Some(html) = &page_html {
                        if let Some(description) = web::job_description_in_html(html) {
                            job.description = description;
                        }
                    }

                    if !is_remote_friendly(&job.location, &job.description) {
                        skipped_location += 1;
                        continue;
                    }

                    let input = DiscoveryInput {
                        description: &job.description,
                        source_url: &job.source_url,
                        employer: &job.employer,
                        page_html: page_html.as_deref(),
                    };
                    if let Some(email) = self.finder.find(&input).await {
                        job.contact_email = email;
                    }

                    jobs.push(job);
                }
            }
        }

        info!(
            "LinkedIn: {} unique jobs ({} skipped as non-remote), {} with emails",
            jobs.len(),
            skipped_location,
            jobs.iter().filter(|j| !j.contact_email.is_empty()).count()
        );
        jobs
    }
}

pub fn is_remote_friendly(location: &str, description: &str) -> bool {
    let combined = format!("{} {}", location, description).to_lowercase();
    REMOTE_KEYWORDS.iter().any(|kw| combined.contains(kw))
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector parses")
}

/// Parses the guest search results into job cards. Cards missing a title or
/// employer are dropped.
fn parse_job_cards(html: &str) -> Vec<JobCard> {
    let document = Html::parse_document(html);
    let card_sel = selector("div.base-card");
    let title_sel = selector("h3.base-search-card__title");
    let employer_sel = selector("h4.base-search-card__subtitle");
    let location_sel = selector("span.job-search-card__location");
    let link_sel = selector("a.base-card__full-link");

    let mut cards = Vec::new();
    for element in document.select(&card_sel) {
        let title = element
            .select(&title_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string());
        let employer = element
            .select(&employer_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string());
        let (Some(title), Some(employer)) = (title, employer) else {
            continue;
        };
        if title.is_empty() || employer.is_empty() {
            continue;
        }

        let location = element
            .select(&location_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let url = element
            .select(&link_sel)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(|href| href.split('?').next().unwrap_or(href).to_string())
            .unwrap_or_default();

        cards.push(JobCard {
            source_id: source_id_from_url(&url),
            title,
            employer,
            location,
            url,
        });
    }
    cards
}

/// Posting id: the trailing numeric chunk of the URL slug, e.g.
/// `.../jobs/view/rust-engineer-at-acme-4012345678` -> `4012345678`.
fn source_id_from_url(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('-')
        .next()
        .filter(|chunk| !chunk.is_empty() && chunk.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or("")
        .to_string()
}
