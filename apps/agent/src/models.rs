//! Core data model: job records, sent applications, drafts.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Where a job record was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum Source {
    Linkedin,
    Twitter,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Linkedin => "linkedin",
            Source::Twitter => "twitter",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized job posting from any source.
#[derive(Debug, Clone, FromRow)]
pub struct JobRecord {
    pub title: String,
    pub employer: String,
    pub location: String,
    pub description: String,
    /// Resolved contact address; empty when discovery found nothing.
    pub contact_email: String,
    pub source: Source,
    /// Source-native id (e.g. a posting id or tweet id); may be empty.
    pub source_id: String,
    pub source_url: String,
    pub discovered_at: DateTime<Utc>,
}

impl JobRecord {
    /// Stable identity across scrapes: `source:source_id` when a native id
    /// exists, else a lowercase fold of `source:title:employer`.
    pub fn identity_key(&self) -> String {
        if self.source_id.is_empty() {
            format!("{}:{}:{}", self.source, self.title, self.employer).to_lowercase()
        } else {
            format!("{}:{}", self.source, self.source_id)
        }
    }

    /// Grouping key for one-per-employer selection and contact dedup.
    pub fn employer_key(&self) -> String {
        self.employer.trim().to_lowercase()
    }
}

/// An immutable record of a successfully sent application email.
#[derive(Debug, Clone, FromRow)]
pub struct Application {
    pub job_key: String,
    pub job_title: String,
    pub employer: String,
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
    pub source: Source,
    pub source_url: String,
    pub sent_at: DateTime<Utc>,
    pub status: String,
}

impl Application {
    /// Builds the application record for a job that was just sent.
    pub fn sent(job: &JobRecord, subject: &str, body: &str) -> Self {
        Self {
            job_key: job.identity_key(),
            job_title: job.title.clone(),
            employer: job.employer.clone(),
            recipient_email: job.contact_email.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
            source: job.source,
            source_url: job.source_url.clone(),
            sent_at: Utc::now(),
            status: "sent".to_string(),
        }
    }
}

/// Lifecycle of a draft application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum DraftStatus {
    Pending,
    Approved,
    Sent,
    Discarded,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Pending => "pending",
            DraftStatus::Approved => "approved",
            DraftStatus::Sent => "sent",
            DraftStatus::Discarded => "discarded",
        }
    }

    /// Status moves forward only: `pending → {approved, discarded}`,
    /// `approved → {sent, discarded}`. `sent` and `discarded` are terminal.
    pub fn can_transition_to(self, next: DraftStatus) -> bool {
        use DraftStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Discarded) | (Approved, Sent) | (Approved, Discarded)
        )
    }
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DraftStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DraftStatus::Pending),
            "approved" => Ok(DraftStatus::Approved),
            "sent" => Ok(DraftStatus::Sent),
            "discarded" => Ok(DraftStatus::Discarded),
            other => Err(format!(
                "unknown draft status '{other}' (expected pending|approved|sent|discarded)"
            )),
        }
    }
}

/// A generated-but-unsent application awaiting review.
///
/// Job fields are denormalized from the seen record at draft time, since the
/// job may later be re-scraped with drift.
#[derive(Debug, Clone, FromRow)]
pub struct Draft {
    pub id: i64,
    pub job_key: String,
    pub job_title: String,
    pub employer: String,
    pub location: String,
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
    pub source: Source,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
    pub status: DraftStatus,
}

impl Draft {
    pub fn employer_key(&self) -> String {
        self.employer.trim().to_lowercase()
    }
}
