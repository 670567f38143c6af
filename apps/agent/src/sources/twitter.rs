//! X/Twitter recent-search feed.
//!
//! Queries the v2 recent search endpoint for hiring tweets that carry an
//! email address. Tweets without a usable address are dropped outright: there
//! is nothing to apply to.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::SearchConfig;
use crate::discovery::extract;
use crate::models::{JobRecord, Source};
use crate::sources::JobFeed;

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";

pub struct TwitterFeed {
    client: reqwest::Client,
    bearer_token: String,
    max_results_per_query: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<Vec<Tweet>>,
    includes: Option<Includes>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Includes {
    users: Option<Vec<User>>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    name: String,
    username: String,
}

impl TwitterFeed {
    pub fn new(bearer_token: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .expect("reqwest client builds with static configuration"),
            bearer_token,
            max_results_per_query: 20,
        }
    }

    fn queries(search: &SearchConfig) -> Vec<String> {
        search
            .keywords
            .iter()
            .map(|keyword| {
                format!(
                    "(\"{keyword}\") (hiring OR \"job opening\" OR \"we are looking\" OR \"apply\") (@ OR \"email\")"
                )
            })
            .collect()
    }

    async fn search(&self, query: &str) -> Result<SearchResponse, reqwest::Error> {
        // The endpoint accepts 10..=100 results per request.
        let max_results = self.max_results_per_query.clamp(10, 100);
        let response = self
            .client
            .get(SEARCH_URL)
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", query),
                ("max_results", &max_results.to_string()),
                ("tweet.fields", "created_at,author_id"),
                ("expansions", "author_id"),
                ("user.fields", "name,username"),
            ])
            .send()
            .await?;
        let response = response.error_for_status()?;
        response.json::<SearchResponse>().await
    }
}

#[async_trait]
impl JobFeed for TwitterFeed {
    fn name(&self) -> &'static str {
        "twitter"
    }

    async fn scrape(&self, search: &SearchConfig) -> Vec<JobRecord> {
        if self.bearer_token.trim().is_empty() {
            info!("Twitter: no bearer token configured, skipping");
            return Vec::new();
        }

        let mut jobs = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();

        for query in Self::queries(search) {
            let preview: String = query.chars().take(60).collect();
            info!("Twitter search: {}", preview);
            let response = match self.search(&query).await {
                Ok(response) => response,
                Err(err) => {
                    if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
                        warn!("Twitter rate limited; will retry on next run");
                        break;
                    }
                    warn!("Twitter search failed: {}", err);
                    continue;
                }
            };

            let authors = author_map(&response);
            let Some(tweets) = response.data else {
                info!("No results for this query");
                continue;
            };

            for tweet in tweets {
                if !seen_ids.insert(tweet.id.clone()) {
                    continue;
                }
                if let Some(job) = tweet_to_job(&tweet, &authors) {
                    jobs.push(job);
                }
            }
        }

        info!("Twitter: {} jobs with emails", jobs.len());
        jobs
    }
}

fn author_map(response: &SearchResponse) -> HashMap<String, String> {
    response
        .includes
        .as_ref()
        .and_then(|inc| inc.users.as_ref())
        .map(|users| {
            users
                .iter()
                .map(|u| (u.id.clone(), format!("{} (@{})", u.name, u.username)))
                .collect()
        })
        .unwrap_or_default()
}

/// Converts a tweet into a job record, or `None` when it has no usable
/// contact address.
fn tweet_to_job(tweet: &Tweet, authors: &HashMap<String, String>) -> Option<JobRecord> {
    let email = extract::rank_addresses(extract::extract_emails(&tweet.text))
        .into_iter()
        .next()?;

    let employer = tweet
        .author_id
        .as_ref()
        .and_then(|id| authors.get(id))
        .cloned()
        .unwrap_or_else(|| "Unknown (via X)".to_string());

    Some(JobRecord {
        title: guess_title(&tweet.text),
        employer,
        location: String::new(),
        description: tweet.text.clone(),
        contact_email: email,
        source: Source::Twitter,
        source_id: tweet.id.clone(),
        source_url: format!("https://x.com/i/status/{}", tweet.id),
        discovered_at: tweet.created_at.unwrap_or_else(Utc::now),
    })
}

/// Best-effort job title from tweet text.
fn guess_title(text: &str) -> String {
    use regex::Regex;
    use std::sync::OnceLock;

    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"(?i)(?:hiring|looking for|seeking)\s+(?:a\s+)?(.+?)(?:\.|,|!|\n|to join|with)")
                .expect("title pattern compiles"),
            Regex::new(r"(?i)(?:role|position|opening)\s*[:\-]?\s*(.+?)(?:\.|,|!|\n)")
                .expect("title pattern compiles"),
        ]
    });

    for pattern in patterns {
        if let Some(caps) = pattern.captures(text) {
            let title = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            if title.len() > 3 && title.len() < 80 {
                return title.to_string();
            }
        }
    }
    "Job Opportunity (via X)".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tweet(id: &str, text: &str) -> Tweet {
        Tweet {
            id: id.to_string(),
            text: text.to_string(),
            author_id: Some("42".to_string()),
            created_at: None,
        }
    }

    fn authors() -> HashMap<String, String> {
        [("42".to_string(), "Acme Inc (@acmejobs)".to_string())]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_tweet_with_email_becomes_job() {
        let t = tweet(
            "1234567890",
            "We are hiring a Senior Rust Engineer to join our team! Apply: jobs@acme.io",
        );
        let job = tweet_to_job(&t, &authors()).unwrap();
        assert_eq!(job.title, "Senior Rust Engineer");
        assert_eq!(job.employer, "Acme Inc (@acmejobs)");
        assert_eq!(job.contact_email, "jobs@acme.io");
        assert_eq!(job.source, Source::Twitter);
        assert_eq!(job.source_id, "1234567890");
        assert_eq!(job.source_url, "https://x.com/i/status/1234567890");
    }

    #[test]
    fn test_tweet_without_email_is_dropped() {
        let t = tweet("1", "We are hiring a Rust Engineer, DM us!");
        assert!(tweet_to_job(&t, &authors()).is_none());
    }

    #[test]
    fn test_tweet_with_only_noise_addresses_is_dropped() {
        let t = tweet("1", "hiring! contact noreply@acme.io");
        assert!(tweet_to_job(&t, &authors()).is_none());
    }

    #[test]
    fn test_unknown_author_placeholder() {
        let mut t = tweet("1", "hiring a Backend Developer, email hr@acme.io");
        t.author_id = None;
        let job = tweet_to_job(&t, &authors()).unwrap();
        assert_eq!(job.employer, "Unknown (via X)");
    }

    #[test]
    fn test_guess_title_patterns() {
        assert_eq!(
            guess_title("We're seeking a React Developer to join us"),
            "React Developer"
        );
        assert_eq!(
            guess_title("Open position: Platform Engineer. Remote."),
            "Platform Engineer"
        );
        assert_eq!(guess_title("We do cool stuff"), "Job Opportunity (via X)");
    }

    #[test]
    fn test_queries_include_hiring_terms() {
        let search = SearchConfig {
            keywords: vec!["rust engineer".to_string()],
            ..SearchConfig::default()
        };
        let queries = TwitterFeed::queries(&search);
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains("\"rust engineer\""));
        assert!(queries[0].contains("hiring"));
    }
}
