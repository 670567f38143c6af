//! SQLite record store — the single source of truth for seen jobs, drafts,
//! and sent applications.
//!
//! Every operation is a self-contained transaction; nothing here holds a
//! transaction open across pipeline steps, so a run killed mid-way leaves the
//! store consistent. WAL journal mode keeps readers unblocked by writers.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::errors::AppError;
use crate::models::{Application, Draft, DraftStatus, JobRecord};

/// Result of a draft status transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// The requested move is not on the allowed graph (e.g. the draft was
    /// already sent). Carries the unchanged current status.
    Rejected(DraftStatus),
    NotFound,
}

/// Aggregate counters for the status command.
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub total_jobs_seen: u32,
    pub total_applications: u32,
    pub applications_today: u32,
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (or creates) the database at `path` and ensures the schema
    /// exists. Safe to call at every process start.
    pub async fn open(path: &Path) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        info!("Store opened at {}", path.display());
        Ok(store)
    }

    /// Idempotent schema creation.
    pub async fn initialize(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen_jobs (
                job_key       TEXT PRIMARY KEY,
                title         TEXT NOT NULL,
                employer      TEXT NOT NULL,
                location      TEXT NOT NULL DEFAULT '',
                description   TEXT NOT NULL DEFAULT '',
                contact_email TEXT NOT NULL DEFAULT '',
                source        TEXT NOT NULL,
                source_id     TEXT NOT NULL DEFAULT '',
                source_url    TEXT NOT NULL DEFAULT '',
                discovered_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                job_key         TEXT NOT NULL DEFAULT '',
                job_title       TEXT NOT NULL,
                employer        TEXT NOT NULL,
                recipient_email TEXT NOT NULL,
                subject         TEXT NOT NULL,
                body            TEXT NOT NULL,
                source          TEXT NOT NULL,
                source_url      TEXT NOT NULL DEFAULT '',
                sent_at         TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'sent'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS drafts (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                job_key         TEXT NOT NULL,
                job_title       TEXT NOT NULL,
                employer        TEXT NOT NULL,
                location        TEXT NOT NULL DEFAULT '',
                recipient_email TEXT NOT NULL,
                subject         TEXT NOT NULL,
                body            TEXT NOT NULL,
                source          TEXT NOT NULL,
                source_url      TEXT NOT NULL DEFAULT '',
                created_at      TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'pending'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a job as seen. Returns `true` when the record was newly
    /// inserted, `false` when the identity key was already present
    /// (`INSERT OR IGNORE` semantics — replays are no-ops, never errors).
    pub async fn mark_seen(&self, job: &JobRecord) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO seen_jobs
                (job_key, title, employer, location, description,
                 contact_email, source, source_id, source_url, discovered_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.identity_key())
        .bind(&job.title)
        .bind(&job.employer)
        .bind(&job.location)
        .bind(&job.description)
        .bind(&job.contact_email)
        .bind(job.source)
        .bind(&job.source_id)
        .bind(&job.source_url)
        .bind(job.discovered_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn is_seen(&self, identity_key: &str) -> Result<bool, AppError> {
        let row: Option<i64> = sqlx::query_scalar("SELECT 1 FROM seen_jobs WHERE job_key = ?")
            .bind(identity_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Append-only insert of a sent application. Insert failures propagate to
    /// the caller (the orchestrator treats them as a failed send).
    pub async fn log_application(&self, app: &Application) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO applications
                (job_key, job_title, employer, recipient_email, subject, body,
                 source, source_url, sent_at, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&app.job_key)
        .bind(&app.job_title)
        .bind(&app.employer)
        .bind(&app.recipient_email)
        .bind(&app.subject)
        .bind(&app.body)
        .bind(app.source)
        .bind(&app.source_url)
        .bind(app.sent_at)
        .bind(&app.status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count_applications_sent_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<u32, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE sent_at >= ?")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u32)
    }

    /// Applications sent since UTC midnight.
    pub async fn applications_sent_today(&self) -> Result<u32, AppError> {
        self.count_applications_sent_since(today_start_utc()).await
    }

    /// Lowercased employer names we have reached out to: sent applications
    /// plus non-discarded drafts. An outstanding draft blocks a second
    /// outreach to the same employer while it awaits review.
    pub async fn contacted_employers(&self) -> Result<HashSet<String>, AppError> {
        let mut employers: HashSet<String> =
            sqlx::query_scalar("SELECT DISTINCT LOWER(TRIM(employer)) FROM applications")
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .collect();

        let drafted: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT LOWER(TRIM(employer)) FROM drafts WHERE status != 'discarded'",
        )
        .fetch_all(&self.pool)
        .await?;
        employers.extend(drafted);

        Ok(employers)
    }

    /// Lowercased employer names with an actual sent application. Looser than
    /// `contacted_employers`: used when deciding which drafts are safe to
    /// send, so a draft's own existence does not block it.
    pub async fn sent_employers(&self) -> Result<HashSet<String>, AppError> {
        let employers: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT LOWER(TRIM(employer)) FROM applications")
                .fetch_all(&self.pool)
                .await?;
        Ok(employers.into_iter().collect())
    }

    /// Seen jobs with a contact address that have neither an application nor
    /// a draft, newest first. Applications are matched by identity key, so a
    /// re-scraped posting with a drifted title still counts as applied-to.
    pub async fn pending_jobs(&self) -> Result<Vec<JobRecord>, AppError> {
        let jobs = sqlx::query_as::<_, JobRecord>(
            r#"
            SELECT title, employer, location, description, contact_email,
                   source, source_id, source_url, discovered_at
            FROM seen_jobs s
            WHERE s.contact_email != ''
              AND NOT EXISTS (SELECT 1 FROM applications a WHERE a.job_key = s.job_key)
              AND NOT EXISTS (SELECT 1 FROM drafts d WHERE d.job_key = s.job_key)
            ORDER BY s.discovered_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    // --- Drafts ---

    /// Saves a pending draft for a job. Returns the draft id.
    pub async fn save_draft(
        &self,
        job: &JobRecord,
        subject: &str,
        body: &str,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO drafts
                (job_key, job_title, employer, location, recipient_email,
                 subject, body, source, source_url, created_at, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending')
            "#,
        )
        .bind(job.identity_key())
        .bind(&job.title)
        .bind(&job.employer)
        .bind(&job.location)
        .bind(&job.contact_email)
        .bind(subject)
        .bind(body)
        .bind(job.source)
        .bind(&job.source_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_draft(&self, id: i64) -> Result<Option<Draft>, AppError> {
        let draft = sqlx::query_as::<_, Draft>("SELECT * FROM drafts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(draft)
    }

    pub async fn list_drafts(&self, status: Option<DraftStatus>) -> Result<Vec<Draft>, AppError> {
        let drafts = match status {
            Some(status) => {
                sqlx::query_as::<_, Draft>(
                    "SELECT * FROM drafts WHERE status = ? ORDER BY created_at DESC",
                )
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Draft>("SELECT * FROM drafts ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(drafts)
    }

    /// Moves a draft along the status graph. Transitions off the graph —
    /// anything out of a terminal status in particular — are rejected and
    /// leave the row unchanged.
    pub async fn set_draft_status(
        &self,
        id: i64,
        next: DraftStatus,
    ) -> Result<TransitionOutcome, AppError> {
        let current: Option<DraftStatus> =
            sqlx::query_scalar("SELECT status FROM drafts WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(current) = current else {
            return Ok(TransitionOutcome::NotFound);
        };
        if !current.can_transition_to(next) {
            return Ok(TransitionOutcome::Rejected(current));
        }

        // Guard on the observed status so a concurrent transition loses
        // cleanly instead of double-applying.
        let result = sqlx::query("UPDATE drafts SET status = ? WHERE id = ? AND status = ?")
            .bind(next)
            .bind(id)
            .bind(current)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 1 {
            Ok(TransitionOutcome::Applied)
        } else {
            Ok(TransitionOutcome::Rejected(current))
        }
    }

    /// Rewrites a draft's subject and body. Returns `false` when the draft is
    /// absent; sent drafts are immutable and are not touched.
    pub async fn set_draft_content(
        &self,
        id: i64,
        subject: &str,
        body: &str,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE drafts SET subject = ?, body = ? WHERE id = ? AND status != 'sent'")
                .bind(subject)
                .bind(body)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Deletes a draft. Returns whether it existed.
    #[allow(dead_code)]
    pub async fn delete_draft(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM drafts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    // --- Status reporting ---

    pub async fn stats(&self) -> Result<StoreStats, AppError> {
        let total_jobs_seen: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seen_jobs")
            .fetch_one(&self.pool)
            .await?;
        let total_applications: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applications")
            .fetch_one(&self.pool)
            .await?;
        let applications_today = self.applications_sent_today().await?;

        Ok(StoreStats {
            total_jobs_seen: total_jobs_seen as u32,
            total_applications: total_applications as u32,
            applications_today,
        })
    }

    pub async fn recent_applications(&self, limit: u32) -> Result<Vec<Application>, AppError> {
        let apps = sqlx::query_as::<_, Application>(
            "SELECT * FROM applications ORDER BY sent_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(apps)
    }
}

fn today_start_utc() -> DateTime<Utc> {
    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time of day");
    DateTime::from_naive_utc_and_offset(midnight, Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use chrono::Duration;

    async fn test_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("test.db")).await.expect("open");
        (store, dir)
    }

    fn job(source_id: &str, title: &str, employer: &str, email: &str) -> JobRecord {
        JobRecord {
            title: title.to_string(),
            employer: employer.to_string(),
            location: "remote".to_string(),
            description: "desc".to_string(),
            contact_email: email.to_string(),
            source: Source::Linkedin,
            source_id: source_id.to_string(),
            source_url: format!("https://example.org/jobs/{source_id}"),
            discovered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (store, _dir) = test_store().await;
        store.initialize().await.unwrap();
        store.initialize().await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_seen_inserts_once_per_identity_key() {
        let (store, _dir) = test_store().await;
        let a = job("1", "Engineer", "Acme", "");
        // Same (source, source_id) scraped again with drift.
        let mut b = a.clone();
        b.title = "Engineer (updated)".to_string();

        assert!(store.mark_seen(&a).await.unwrap());
        assert!(!store.mark_seen(&a).await.unwrap());
        assert!(!store.mark_seen(&b).await.unwrap());
        assert!(store.is_seen(&a.identity_key()).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_seen_false_for_unknown_key() {
        let (store, _dir) = test_store().await;
        assert!(!store.is_seen("linkedin:nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_application_counting_by_window() {
        let (store, _dir) = test_store().await;
        let j = job("1", "Engineer", "Acme", "jobs@acme.io");
        store
            .log_application(&Application::sent(&j, "s", "b"))
            .await
            .unwrap();

        assert_eq!(store.applications_sent_today().await.unwrap(), 1);
        let tomorrow = Utc::now() + Duration::days(1);
        assert_eq!(
            store.count_applications_sent_since(tomorrow).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_contacted_includes_drafted_employers_sent_does_not() {
        let (store, _dir) = test_store().await;

        let applied = job("1", "Engineer", "Acme", "jobs@acme.io");
        store
            .log_application(&Application::sent(&applied, "s", "b"))
            .await
            .unwrap();

        let drafted = job("2", "Engineer", "Globex", "hr@globex.com");
        store.save_draft(&drafted, "s", "b").await.unwrap();

        let discarded = job("3", "Engineer", "Initech", "hr@initech.com");
        let id = store.save_draft(&discarded, "s", "b").await.unwrap();
        store
            .set_draft_status(id, DraftStatus::Discarded)
            .await
            .unwrap();

        let contacted = store.contacted_employers().await.unwrap();
        assert!(contacted.contains("acme"));
        assert!(contacted.contains("globex"));
        assert!(!contacted.contains("initech"));

        let sent = store.sent_employers().await.unwrap();
        assert!(sent.contains("acme"));
        assert!(!sent.contains("globex"));
    }

    #[tokio::test]
    async fn test_pending_jobs_filters_and_orders() {
        let (store, _dir) = test_store().await;

        let mut old = job("1", "Old Engineer", "Acme", "jobs@acme.io");
        old.discovered_at = Utc::now() - Duration::hours(5);
        let fresh = job("2", "Fresh Engineer", "Globex", "hr@globex.com");
        let no_email = job("3", "Quiet Engineer", "Initech", "");

        store.mark_seen(&old).await.unwrap();
        store.mark_seen(&fresh).await.unwrap();
        store.mark_seen(&no_email).await.unwrap();

        let pending = store.pending_jobs().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].title, "Fresh Engineer");
        assert_eq!(pending[1].title, "Old Engineer");
    }

    #[tokio::test]
    async fn test_pending_jobs_excludes_applied_by_identity_key() {
        let (store, _dir) = test_store().await;

        let j = job("1", "Engineer", "Acme", "jobs@acme.io");
        store.mark_seen(&j).await.unwrap();

        // Application recorded under a different title but the same identity
        // key (title drift on re-scrape) still excludes the job.
        let mut drifted = j.clone();
        drifted.title = "Engineer II".to_string();
        store
            .log_application(&Application::sent(&drifted, "s", "b"))
            .await
            .unwrap();

        assert!(store.pending_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_jobs_excludes_drafted() {
        let (store, _dir) = test_store().await;
        let j = job("1", "Engineer", "Acme", "jobs@acme.io");
        store.mark_seen(&j).await.unwrap();
        store.save_draft(&j, "s", "b").await.unwrap();
        assert!(store.pending_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_draft_round_trip_and_listing() {
        let (store, _dir) = test_store().await;
        let j = job("1", "Engineer", "Acme", "jobs@acme.io");
        let id = store.save_draft(&j, "Subject", "Body").await.unwrap();

        let draft = store.get_draft(id).await.unwrap().unwrap();
        assert_eq!(draft.job_key, j.identity_key());
        assert_eq!(draft.subject, "Subject");
        assert_eq!(draft.status, DraftStatus::Pending);

        assert_eq!(
            store
                .list_drafts(Some(DraftStatus::Pending))
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(store
            .list_drafts(Some(DraftStatus::Approved))
            .await
            .unwrap()
            .is_empty());
        assert!(store.get_draft(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_draft_transition_graph_enforced() {
        let (store, _dir) = test_store().await;
        let j = job("1", "Engineer", "Acme", "jobs@acme.io");
        let id = store.save_draft(&j, "s", "b").await.unwrap();

        // pending -> sent skips approval and is rejected.
        assert_eq!(
            store.set_draft_status(id, DraftStatus::Sent).await.unwrap(),
            TransitionOutcome::Rejected(DraftStatus::Pending)
        );

        assert_eq!(
            store
                .set_draft_status(id, DraftStatus::Approved)
                .await
                .unwrap(),
            TransitionOutcome::Applied
        );
        assert_eq!(
            store.set_draft_status(id, DraftStatus::Sent).await.unwrap(),
            TransitionOutcome::Applied
        );

        // sent is terminal; the row is left unchanged.
        assert_eq!(
            store
                .set_draft_status(id, DraftStatus::Discarded)
                .await
                .unwrap(),
            TransitionOutcome::Rejected(DraftStatus::Sent)
        );
        let draft = store.get_draft(id).await.unwrap().unwrap();
        assert_eq!(draft.status, DraftStatus::Sent);

        assert_eq!(
            store
                .set_draft_status(9999, DraftStatus::Approved)
                .await
                .unwrap(),
            TransitionOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_draft_content_editable_until_sent() {
        let (store, _dir) = test_store().await;
        let j = job("1", "Engineer", "Acme", "jobs@acme.io");
        let id = store.save_draft(&j, "s", "b").await.unwrap();

        assert!(store.set_draft_content(id, "s2", "b2").await.unwrap());
        let draft = store.get_draft(id).await.unwrap().unwrap();
        assert_eq!(draft.subject, "s2");
        assert_eq!(draft.body, "b2");

        store
            .set_draft_status(id, DraftStatus::Approved)
            .await
            .unwrap();
        store.set_draft_status(id, DraftStatus::Sent).await.unwrap();
        assert!(!store.set_draft_content(id, "s3", "b3").await.unwrap());

        assert!(!store.set_draft_content(9999, "s", "b").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_draft_reports_existence() {
        let (store, _dir) = test_store().await;
        let j = job("1", "Engineer", "Acme", "jobs@acme.io");
        let id = store.save_draft(&j, "s", "b").await.unwrap();
        assert!(store.delete_draft(id).await.unwrap());
        assert!(!store.delete_draft(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_stats_and_recent_applications() {
        let (store, _dir) = test_store().await;
        let j = job("1", "Engineer", "Acme", "jobs@acme.io");
        store.mark_seen(&j).await.unwrap();
        store
            .log_application(&Application::sent(&j, "s", "b"))
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_jobs_seen, 1);
        assert_eq!(stats.total_applications, 1);
        assert_eq!(stats.applications_today, 1);

        let recent = store.recent_applications(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].employer, "Acme");
    }
}
