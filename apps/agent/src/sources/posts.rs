//! LinkedIn hiring-posts feed.
//!
//! Posts (`linkedin.com/posts/`) are where people share "we're hiring" with a
//! contact address in the text, so this feed has the best email hit rate of
//! any source and runs first. Post URLs are harvested from Brave web search
//! (LinkedIn exposes no public search for posts); each post page is then
//! fetched and mined directly. As elsewhere, HTML parsing stays in sync
//! helpers because `scraper::Html` is not `Send`.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::info;

use crate::config::SearchConfig;
use crate::discovery::{extract, web};
use crate::models::{JobRecord, Source};
use crate::sources::JobFeed;

const BRAVE_SEARCH_URL: &str = "https://search.brave.com/search";

/// Post body containers, tried in order; the longest text wins.
const POST_BODY_SELECTORS: &[&str] = &[
    "div.feed-shared-update-v2__description",
    "div.attributed-text-segment-list__content",
    "div.update-components-text",
    "article",
];

pub struct PostsFeed {
    fetcher: Arc<dyn web::Fetch>,
    max_posts_per_query: usize,
}

/// Everything mined out of one post page.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedPost {
    text: String,
    author: String,
    emails: Vec<String>,
}

impl PostsFeed {
    pub fn new(fetcher: Arc<dyn web::Fetch>) -> Self {
        Self {
            fetcher,
            max_posts_per_query: 10,
        }
    }

    fn search_url(keyword: &str) -> String {
        let query = format!(
            "site:linkedin.com/posts \"{keyword}\" (hiring OR \"looking for\" OR \"join\") (email OR apply OR resume) remote"
        );
        let mut url = url::Url::parse(BRAVE_SEARCH_URL).expect("static search URL parses");
        url.query_pairs_mut().append_pair("q", &query);
        url.into()
    }
}

#[async_trait]
impl JobFeed for PostsFeed {
    fn name(&self) -> &'static str {
        "linkedin-posts"
    }

    async fn scrape(&self, search: &SearchConfig) -> Vec<JobRecord> {
        let mut jobs = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();

        for keyword in &search.keywords {
            info!("LinkedIn posts search: '{}'", keyword);
            let Some(html) = self.fetcher.fetch(&Self::search_url(keyword)).await else {
                continue;
            };

            let urls = post_urls_in_html(&html, self.max_posts_per_query);
            if urls.is_empty() {
                info!("No posts found for '{}'", keyword);
                continue;
            }
            info!("Found {} posts, fetching", urls.len());

            for url in urls {
                let clean_url = canonical_post_url(&url);
                if !seen_urls.insert(clean_url.clone()) {
                    continue;
                }

                let Some(page) = self.fetcher.fetch(&url).await else {
                    continue;
                };
                let Some(post) = parse_post(&page) else {
                    continue;
                };
                let Some(email) = extract::rank_addresses(post.emails).into_iter().next()
                else {
                    continue;
                };

                let title = guess_title_from_post(&post.text);
                let employer = guess_employer_from_post(&post.text, &post.author);
                info!("Found: {} at {} -> {}", title, employer, email);

                let slug: String = clean_url
                    .rsplit('/')
                    .next()
                    .unwrap_or("")
                    .chars()
                    .take(40)
                    .collect();
                jobs.push(JobRecord {
                    title,
                    employer,
                    location: "Remote".to_string(),
                    description: post.text,
                    contact_email: email,
                    source: Source::Linkedin,
                    source_id: format!("post:{slug}"),
                    source_url: clean_url,
                    discovered_at: Utc::now(),
                });
            }
        }

        info!("LinkedIn posts: {} jobs with emails", jobs.len());
        jobs
    }
}

fn is_post_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("linkedin.com/posts/") || lower.contains("linkedin.com/feed/update/")
}

fn canonical_post_url(url: &str) -> String {
    url.split('?')
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .to_string()
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector parses")
}

/// Post links in a search results page, first occurrence order, capped.
fn post_urls_in_html(html: &str, max: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for anchor in document.select(&selector("a[href]")) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !is_post_url(href) {
            continue;
        }
        if seen.insert(canonical_post_url(href)) {
            urls.push(href.to_string());
            if urls.len() >= max {
                break;
            }
        }
    }
    urls
}

fn meta_content<'a>(document: &'a Html, css: &str) -> Option<&'a str> {
    document
        .select(&selector(css))
        .next()
        .and_then(|el| el.value().attr("content"))
}

/// Mines a post page: post text (meta description, og:description, or the
/// longest body container), the author, and every plausible address on the
/// page. `None` when the page yields neither text nor addresses.
fn parse_post(html: &str) -> Option<ParsedPost> {
    let document = Html::parse_document(html);

    let mut text = String::new();
    if let Some(desc) = meta_content(&document, r#"meta[name="description"]"#) {
        text = desc.to_string();
    }
    if let Some(og) = meta_content(&document, r#"meta[property="og:description"]"#) {
        if og.len() > text.len() {
            text = og.to_string();
        }
    }
    for css in POST_BODY_SELECTORS {
        if let Some(el) = document.select(&selector(css)).next() {
            let body: String = el
                .text()
                .map(str::trim)
                .filter(|chunk| !chunk.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            if body.len() > text.len() {
                text = body;
            }
        }
    }

    let author = meta_content(&document, r#"meta[property="og:title"]"#)
        .map(clean_author)
        .filter(|a| !a.is_empty())
        .or_else(|| {
            document
                .select(&selector("title"))
                .next()
                .map(|el| clean_author(&el.text().collect::<String>()))
        })
        .unwrap_or_default();

    // Post text first; the full page only when the post itself has nothing.
    let mut emails = extract::extract_emails(&text);
    if emails.is_empty() {
        let page_text: String = document
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ");
        emails = extract::extract_emails(&page_text);
    }
    for anchor in document.select(&selector("a[href]")) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if let Some(rest) = href.strip_prefix("mailto:") {
            let addr = rest.split('?').next().unwrap_or("").trim().to_lowercase();
            if extract::is_plausible_contact(&addr) && !emails.contains(&addr) {
                emails.push(addr);
            }
        }
    }

    if text.is_empty() && emails.is_empty() {
        return None;
    }
    Some(ParsedPost {
        text,
        author,
        emails,
    })
}

fn strip_hashtags(text: &str) -> String {
    static HASHTAG: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let hashtag = HASHTAG.get_or_init(|| Regex::new(r"#\w+").expect("hashtag pattern compiles"));
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));
    let cleaned = hashtag.replace_all(text, "");
    spaces.replace_all(&cleaned, " ").trim().to_string()
}

/// Folds a post page's og:title / title into the author's name. Titles look
/// like `#hiring #fullstack | Paula Mateo on LinkedIn` or `Jane Doe | LinkedIn`.
fn clean_author(raw: &str) -> String {
    let mut raw = raw;
    for sep in [" on LinkedIn", " posted on", " | LinkedIn"] {
        raw = raw.split(sep).next().unwrap_or(raw);
    }

    if raw.contains('|') {
        let parts: Vec<&str> = raw.split('|').map(str::trim).collect();
        // The segment that looks like a name (1-5 words, no hashtags) is
        // usually last.
        for part in parts.iter().rev() {
            let clean = strip_hashtags(part);
            let words = clean.split_whitespace().count();
            if (1..=5).contains(&words) && !clean.starts_with('#') {
                return clean;
            }
        }
        return strip_hashtags(parts.last().unwrap_or(&""));
    }

    strip_hashtags(raw)
}

/// Best-effort job title from a post: hiring phrases first, then role-like
/// hashtags, else a generic label.
fn guess_title_from_post(text: &str) -> String {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    static HASHTAG: OnceLock<Regex> = OnceLock::new();

    let patterns = PATTERNS.get_or_init(|| {
        vec![
            Regex::new(
                r"(?i)(?:hiring|looking for|seeking|need)\s+(?:a\s+|an\s+)?(.+?)(?:\.|,|!|\n|to join|with \d|who)",
            )
            .expect("title pattern compiles"),
            Regex::new(r"(?i)(?:role|position|opening)\s*[:\-]?\s*(.+?)(?:\.|,|!|\n)")
                .expect("title pattern compiles"),
            Regex::new(r"(?i)(?:join us as|join .{0,20} as)\s+(?:a\s+|an\s+)?(.+?)(?:\.|,|!|\n)")
                .expect("title pattern compiles"),
        ]
    });

    let clean_text = strip_hashtags(text);
    for pattern in patterns {
        if let Some(caps) = pattern.captures(&clean_text) {
            let title = caps
                .get(1)
                .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
                .unwrap_or_default();
            if title.len() > 3 && title.len() < 80 {
                return title;
            }
        }
    }

    // Role-like hashtags still carry signal after the phrase patterns miss.
    let hashtag = HASHTAG.get_or_init(|| Regex::new(r"#(\w+)").expect("hashtag pattern compiles"));
    const ROLE_MARKERS: &[&str] = &[
        "developer",
        "engineer",
        "fullstack",
        "frontend",
        "backend",
        "react",
        "node",
        "python",
        "devops",
        "designer",
        "manager",
    ];
    for caps in hashtag.captures_iter(text) {
        let tag = caps.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
        if ROLE_MARKERS.iter().any(|marker| tag.contains(marker)) {
            return titlecase_tag(&tag);
        }
    }

    "Software Developer".to_string()
}

/// `fullstackdeveloper` -> `Fullstack Developer`.
fn titlecase_tag(tag: &str) -> String {
    let spaced = tag
        .replace("developer", " developer")
        .replace("engineer", " engineer");
    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best-effort employer from a post: "at <Name>" / "<Name> is hiring"
/// phrases, else the post author, else a placeholder.
fn guess_employer_from_post(text: &str, author: &str) -> String {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"(?:at|@)\s+([A-Z][A-Za-z0-9\s&.]+?)(?:\.|,|!|\n|is hiring|are hiring)")
                .expect("employer pattern compiles"),
            Regex::new(r"([A-Z][A-Za-z0-9\s&.]+?)\s+is\s+(?:hiring|looking|seeking)")
                .expect("employer pattern compiles"),
        ]
    });

    let clean_text = strip_hashtags(text);
    for pattern in patterns {
        if let Some(caps) = pattern.captures(&clean_text) {
            let employer = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            if employer.len() > 2 && employer.len() < 60 {
                return employer.to_string();
            }
        }
    }

    if !author.is_empty() {
        return author.to_string();
    }
    "Unknown Company".to_string()
}
