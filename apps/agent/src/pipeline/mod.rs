//! The orchestrator: wires feeds, store, discovery, generation, and delivery
//! into the four workflows (run, send-pending, draft, send-drafts).
//!
//! Every workflow that sends email checks the daily/run budget up front and
//! before each send. Failed sends are logged and skipped; they never abort a
//! run and never consume budget.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::generation::ContentGenerator;
use crate::limits::RunBudget;
use crate::mailer::Mailer;
use crate::models::{Application, Draft, DraftStatus, JobRecord};
use crate::scoring::select_one_per_employer;
use crate::sources::JobFeed;
use crate::store::{Store, TransitionOutcome};
use crate::{dedup, resume};

#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub jobs_found: usize,
    pub jobs_new: usize,
    pub jobs_with_email: usize,
    pub jobs_no_email: usize,
    pub sent: usize,
    pub failed: usize,
    pub dry_run: bool,
}

#[derive(Debug, Default, Clone)]
pub struct PendingSummary {
    pub pending_found: usize,
    pub sent: usize,
    pub failed: usize,
    pub dry_run: bool,
}

#[derive(Debug, Default, Clone)]
pub struct DraftSummary {
    pub pending_found: usize,
    pub drafts_created: usize,
}

#[derive(Debug, Default, Clone)]
pub struct SendDraftsSummary {
    pub drafts_found: usize,
    pub sent: usize,
    pub failed: usize,
    pub dry_run: bool,
}

pub struct Agent {
    store: Store,
    generator: Arc<dyn ContentGenerator>,
    mailer: Arc<dyn Mailer>,
    feeds: Vec<Box<dyn JobFeed>>,
    config: Config,
}

impl Agent {
    pub fn new(
        store: Store,
        generator: Arc<dyn ContentGenerator>,
        mailer: Arc<dyn Mailer>,
        feeds: Vec<Box<dyn JobFeed>>,
        config: Config,
    ) -> Self {
        Self {
            store,
            generator,
            mailer,
            feeds,
            config,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The send budget for this invocation, or `None` when the daily limit
    /// is already spent.
    async fn run_budget(&self) -> Result<Option<RunBudget>, AppError> {
        let sent_today = self.store.applications_sent_today().await?;
        let budget = RunBudget::compute(
            self.config.limits.max_per_day,
            self.config.limits.max_per_run,
            sent_today,
        );
        if budget.is_none() {
            info!(
                "Daily limit reached ({} applications). Skipping.",
                self.config.limits.max_per_day
            );
        }
        Ok(budget)
    }

    fn attachment(&self) -> Option<PathBuf> {
        resume::attachment_path(&self.config.profile)
    }

    /// Sends one application email and records it. Returns whether the send
    /// counted. A record-keeping failure after a real send is reported as a
    /// failed send, not a run-level error.
    async fn send_application(
        &self,
        job: &JobRecord,
        subject: &str,
        body: &str,
        dry_run: bool,
    ) -> bool {
        if dry_run {
            info!(
                "[DRY RUN] Would send to {} ({} at {})",
                job.contact_email, job.title, job.employer
            );
            return true;
        }

        let attachment = self.attachment();
        if !self
            .mailer
            .send(&job.contact_email, subject, body, attachment.as_deref())
            .await
        {
            return false;
        }

        let record = Application::sent(job, subject, body);
        if let Err(err) = self.store.log_application(&record).await {
            error!(
                "Sent to {} but failed to record the application: {}",
                job.contact_email, err
            );
            return false;
        }
        true
    }

    /// Full pipeline: scrape all feeds, filter new jobs, pick one per
    /// employer, then generate and send up to the budget.
    pub async fn run(&self, dry_run: bool) -> Result<RunSummary, AppError> {
        let mut summary = RunSummary {
            dry_run,
            ..Default::default()
        };

        let Some(mut budget) = self.run_budget().await? else {
            return Ok(summary);
        };

        let mut all_jobs: Vec<JobRecord> = Vec::new();
        for feed in &self.feeds {
            info!("Scraping feed: {}", feed.name());
            all_jobs.extend(feed.scrape(&self.config.search).await);
        }
        summary.jobs_found = all_jobs.len();
        info!("Total jobs found: {}", summary.jobs_found);

        let (with_email, without_email) = dedup::filter_new(&self.store, all_jobs).await?;
        summary.jobs_new = with_email.len() + without_email.len();
        summary.jobs_with_email = with_email.len();
        summary.jobs_no_email = without_email.len();
        for job in without_email.iter().take(10) {
            info!("No email found: {} at {}", job.title, job.employer);
        }

        if with_email.is_empty() {
            info!("No new jobs with emails to apply to this run");
            return Ok(summary);
        }

        let contacted = self.store.contacted_employers().await?;
        let best = select_one_per_employer(with_email, &contacted);
        info!("Jobs to apply to: {}", best.len());

        let resume_text = resume::resume_text(&self.config.profile);

        for job in &best {
            if budget.is_exhausted() {
                info!("Reached limit for this run ({}). Stopping.", budget.allowed());
                break;
            }

            info!("Applying to: {} at {}", job.title, job.employer);
            let (subject, body) = self
                .generator
                .generate(job, &resume_text, &self.config.profile)
                .await;

            if self.send_application(job, &subject, &body, dry_run).await {
                budget.consume();
                summary.sent += 1;
            } else {
                summary.failed += 1;
            }
        }

        info!(
            "Run complete: {} sent, {} failed",
            summary.sent, summary.failed
        );
        Ok(summary)
    }

    /// Applies to jobs already in the store that have a contact address but
    /// no application or draft yet. No scraping.
    pub async fn send_pending(&self, dry_run: bool) -> Result<PendingSummary, AppError> {
        let mut summary = PendingSummary {
            dry_run,
            ..Default::default()
        };

        let Some(mut budget) = self.run_budget().await? else {
            return Ok(summary);
        };

        let pending = self.store.pending_jobs().await?;
        summary.pending_found = pending.len();
        if pending.is_empty() {
            info!("No pending jobs to apply to");
            return Ok(summary);
        }

        let contacted = self.store.contacted_employers().await?;
        let best = select_one_per_employer(pending, &contacted);
        if best.is_empty() {
            info!("No new employers to apply to");
            return Ok(summary);
        }
        info!("Sending to {} employers", best.len());

        let resume_text = resume::resume_text(&self.config.profile);

        for job in &best {
            if budget.is_exhausted() {
                info!("Reached limit for this run ({}). Stopping.", budget.allowed());
                break;
            }

            info!("Applying to: {} at {}", job.title, job.employer);
            let (subject, body) = self
                .generator
                .generate(job, &resume_text, &self.config.profile)
                .await;

            if self.send_application(job, &subject, &body, dry_run).await {
                budget.consume();
                summary.sent += 1;
            } else {
                summary.failed += 1;
            }
        }

        Ok(summary)
    }

    /// Generates drafts for pending jobs without sending anything. Drafting
    /// is free: it does not touch the send budget.
    pub async fn generate_drafts(&self) -> Result<DraftSummary, AppError> {
        let mut summary = DraftSummary::default();

        let pending = self.store.pending_jobs().await?;
        summary.pending_found = pending.len();
        if pending.is_empty() {
            info!("No pending jobs to draft");
            return Ok(summary);
        }

        let contacted = self.store.contacted_employers().await?;
        let best = select_one_per_employer(pending, &contacted);
        if best.is_empty() {
            info!("No new employers to draft for");
            return Ok(summary);
        }
        info!("Generating drafts for {} employers", best.len());

        let resume_text = resume::resume_text(&self.config.profile);

        for job in &best {
            info!(
                "Drafting: {} at {} -> {}",
                job.title, job.employer, job.contact_email
            );
            let (subject, body) = self
                .generator
                .generate(job, &resume_text, &self.config.profile)
                .await;
            let id = self.store.save_draft(job, &subject, &body).await?;
            info!("Saved as draft #{}", id);
            summary.drafts_created += 1;
        }

        Ok(summary)
    }

    /// Sends approved drafts (and pending ones too with `include_pending`).
    /// At most one draft per employer goes out, and employers with a sent
    /// application are skipped.
    pub async fn send_drafts(
        &self,
        include_pending: bool,
        dry_run: bool,
    ) -> Result<SendDraftsSummary, AppError> {
        let mut summary = SendDraftsSummary {
            dry_run,
            ..Default::default()
        };

        let Some(mut budget) = self.run_budget().await? else {
            return Ok(summary);
        };

        let mut drafts = self.store.list_drafts(Some(DraftStatus::Approved)).await?;
        if include_pending {
            drafts.extend(self.store.list_drafts(Some(DraftStatus::Pending)).await?);
        }

        if drafts.is_empty() {
            info!(
                "No {} drafts to send",
                if include_pending { "approved or pending" } else { "approved" }
            );
            return Ok(summary);
        }

        let already_sent = self.store.sent_employers().await?;
        let mut seen_employers = std::collections::HashSet::new();
        let unique: Vec<Draft> = drafts
            .into_iter()
            .filter(|draft| {
                let key = draft.employer_key();
                !already_sent.contains(&key) && seen_employers.insert(key)
            })
            .collect();

        summary.drafts_found = unique.len();
        if unique.is_empty() {
            info!("All draft employers have already been contacted");
            return Ok(summary);
        }
        info!("Sending {} drafts", unique.len());

        for draft in &unique {
            if budget.is_exhausted() {
                info!("Reached limit for this run ({}). Stopping.", budget.allowed());
                break;
            }

            info!(
                "Draft #{}: {} at {} -> {}",
                draft.id, draft.job_title, draft.employer, draft.recipient_email
            );

            if dry_run {
                info!("[DRY RUN] Would send to {}", draft.recipient_email);
                budget.consume();
                summary.sent += 1;
                continue;
            }

            let attachment = self.attachment();
            if !self
                .mailer
                .send(
                    &draft.recipient_email,
                    &draft.subject,
                    &draft.body,
                    attachment.as_deref(),
                )
                .await
            {
                summary.failed += 1;
                continue;
            }

            self.record_sent_draft(draft).await;
            budget.consume();
            summary.sent += 1;
        }

        Ok(summary)
    }

    /// After a real send: log the application and walk the draft to `sent`
    /// (approving it first when it went out straight from pending).
    async fn record_sent_draft(&self, draft: &Draft) {
        let record = Application {
            job_key: draft.job_key.clone(),
            job_title: draft.job_title.clone(),
            employer: draft.employer.clone(),
            recipient_email: draft.recipient_email.clone(),
            subject: draft.subject.clone(),
            body: draft.body.clone(),
            source: draft.source,
            source_url: draft.source_url.clone(),
            sent_at: chrono::Utc::now(),
            status: "sent".to_string(),
        };
        if let Err(err) = self.store.log_application(&record).await {
            error!(
                "Sent draft #{} but failed to record the application: {}",
                draft.id, err
            );
        }

        if draft.status == DraftStatus::Pending {
            match self.store.set_draft_status(draft.id, DraftStatus::Approved).await {
                Ok(TransitionOutcome::Applied) => {}
                Ok(other) => warn!("Draft #{} could not be approved: {:?}", draft.id, other),
                Err(err) => warn!("Draft #{} status update failed: {}", draft.id, err),
            }
        }
        match self.store.set_draft_status(draft.id, DraftStatus::Sent).await {
            Ok(TransitionOutcome::Applied) => {}
            Ok(other) => warn!("Draft #{} not marked sent: {:?}", draft.id, other),
            Err(err) => warn!("Draft #{} status update failed: {}", draft.id, err),
        }
    }
}
