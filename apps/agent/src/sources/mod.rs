//! Job feeds: each source turns search preferences into normalized records.

pub mod linkedin;
pub mod posts;
pub mod twitter;

use async_trait::async_trait;

use crate::config::SearchConfig;
use crate::models::JobRecord;

/// A source of job postings. Feeds swallow their own transport errors and
/// return whatever they managed to collect; an empty batch is not a failure.
#[async_trait]
pub trait JobFeed: Send + Sync {
    fn name(&self) -> &'static str;

    async fn scrape(&self, search: &SearchConfig) -> Vec<JobRecord>;
}
