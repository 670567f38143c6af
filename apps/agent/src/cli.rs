//! Command-line interface and command handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::config::Config;
use crate::discovery::web::HttpFetcher;
use crate::generation::LlmGenerator;
use crate::llm_client::LlmClient;
use crate::mailer::SmtpMailer;
use crate::models::DraftStatus;
use crate::pipeline::{Agent, PendingSummary, RunSummary, SendDraftsSummary};
use crate::sources::linkedin::LinkedinFeed;
use crate::sources::posts::PostsFeed;
use crate::sources::twitter::TwitterFeed;
use crate::sources::JobFeed;
use crate::store::{Store, TransitionOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "agent",
    about = "Automatically find and apply to jobs",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the agent once: scrape jobs, generate emails, send applications
    Run {
        /// Generate emails but don't send them
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the agent repeatedly at the configured interval
    Schedule {
        /// Generate emails but don't send them
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply to jobs already in the database that have an email but no
    /// application yet (no scraping)
    SendPending {
        /// Generate emails but don't send them
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate draft emails for pending jobs without sending anything
    Draft,
    /// List drafts
    Drafts {
        /// Filter by status: pending, approved, sent, discarded
        #[arg(long)]
        status: Option<String>,
    },
    /// Show the full content of one draft
    ShowDraft { id: i64 },
    /// Approve one or more drafts for sending
    Approve {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Approve all pending drafts
    ApproveAll,
    /// Discard one or more drafts
    Discard {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Edit a draft's subject or body
    EditDraft {
        id: i64,
        /// New subject line
        #[arg(long)]
        subject: Option<String>,
        /// Path to a text file with the new body
        #[arg(long)]
        body_file: Option<PathBuf>,
    },
    /// Send approved drafts
    SendDrafts {
        /// Also send drafts still pending review
        #[arg(long)]
        all: bool,
        /// Preview without sending
        #[arg(long)]
        dry_run: bool,
    },
    /// Show application stats and recent activity
    Status,
}

pub async fn run(config: Config) -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { dry_run } => {
            announce_dry_run(dry_run);
            let agent = build_agent(&config).await?;
            let summary = agent.run(dry_run).await?;
            print_run_summary(&summary);
        }
        Command::Schedule { dry_run } => {
            let agent = build_agent(&config).await?;
            run_scheduler(&agent, &config, dry_run).await;
        }
        Command::SendPending { dry_run } => {
            announce_dry_run(dry_run);
            let agent = build_agent(&config).await?;
            let summary = agent.send_pending(dry_run).await?;
            print_pending_summary(&summary);
        }
        Command::Draft => {
            let agent = build_agent(&config).await?;
            let summary = agent.generate_drafts().await?;
            println!("\n--- Summary ---");
            println!("Pending jobs found:  {}", summary.pending_found);
            println!("Drafts created:      {}", summary.drafts_created);
            if summary.drafts_created > 0 {
                println!("\nReview them with 'agent drafts', approve with 'agent approve <id>'.");
            }
        }
        Command::Drafts { status } => {
            let store = Store::open(&config.db_path).await?;
            list_drafts(&store, status.as_deref()).await?;
        }
        Command::ShowDraft { id } => {
            let store = Store::open(&config.db_path).await?;
            show_draft(&store, id).await?;
        }
        Command::Approve { ids } => {
            let store = Store::open(&config.db_path).await?;
            approve_drafts(&store, &ids).await?;
        }
        Command::ApproveAll => {
            let store = Store::open(&config.db_path).await?;
            approve_all(&store).await?;
        }
        Command::Discard { ids } => {
            let store = Store::open(&config.db_path).await?;
            discard_drafts(&store, &ids).await?;
        }
        Command::EditDraft {
            id,
            subject,
            body_file,
        } => {
            let store = Store::open(&config.db_path).await?;
            edit_draft(&store, id, subject, body_file).await?;
        }
        Command::SendDrafts { all, dry_run } => {
            announce_dry_run(dry_run);
            let agent = build_agent(&config).await?;
            let summary = agent.send_drafts(all, dry_run).await?;
            print_send_drafts_summary(&summary);
        }
        Command::Status => {
            let store = Store::open(&config.db_path).await?;
            print_status(&store).await?;
        }
    }

    Ok(())
}

async fn build_agent(config: &Config) -> Result<Agent> {
    let store = Store::open(&config.db_path).await?;

    let fetcher = Arc::new(HttpFetcher::new());
    // The posts feed goes first: hiring posts carry a contact address far more
    // often than listings do.
    let mut feeds: Vec<Box<dyn JobFeed>> = vec![
        Box::new(PostsFeed::new(fetcher.clone())),
        Box::new(LinkedinFeed::new(fetcher)),
    ];
    if let Some(token) = &config.twitter_bearer_token {
        feeds.push(Box::new(TwitterFeed::new(token.clone())));
    } else {
        info!("No Twitter bearer token configured; the Twitter feed is disabled");
    }

    let generator = Arc::new(LlmGenerator::new(LlmClient::new(
        config.anthropic_api_key.clone(),
    )));
    info!("LLM client initialized (model: {})", crate::llm_client::MODEL);
    let mailer = Arc::new(SmtpMailer::new(config.email.clone()));

    Ok(Agent::new(store, generator, mailer, feeds, config.clone()))
}

async fn run_scheduler(agent: &Agent, config: &Config, dry_run: bool) {
    let hours = config.schedule.interval_hours;
    println!("Starting scheduler (every {hours} hours). Press Ctrl+C to stop.");
    announce_dry_run(dry_run);

    let mut interval = tokio::time::interval(Duration::from_secs(hours * 3600));
    loop {
        // First tick fires immediately, so the initial pass runs on start.
        interval.tick().await;
        info!("Scheduled run starting");
        match agent.run(dry_run).await {
            Ok(summary) => print_run_summary(&summary),
            Err(err) => error!("Scheduled run failed: {}", err),
        }
    }
}

async fn list_drafts(store: &Store, status: Option<&str>) -> Result<()> {
    let filter = match status {
        Some(raw) => Some(raw.parse::<DraftStatus>().map_err(anyhow::Error::msg)?),
        None => None,
    };
    let drafts = store.list_drafts(filter).await?;

    if drafts.is_empty() {
        match status {
            Some(s) => println!("No drafts found with status '{s}'."),
            None => println!("No drafts found."),
        }
        return Ok(());
    }

    println!("\n=== Drafts ({}) ===\n", drafts.len());
    for d in &drafts {
        let icon = match d.status {
            DraftStatus::Pending => "[?]",
            DraftStatus::Approved => "[+]",
            DraftStatus::Sent => "[v]",
            DraftStatus::Discarded => "[x]",
        };
        println!(
            "  #{:<4} {} {:<35}  {:<20}  -> {}",
            d.id,
            icon,
            truncate(&d.job_title, 35),
            truncate(&d.employer, 20),
            d.recipient_email
        );
    }
    println!("\nUse 'agent show-draft <id>' to view the full email.");
    println!("Use 'agent approve <id>' to approve for sending.");
    Ok(())
}

async fn show_draft(store: &Store, id: i64) -> Result<()> {
    let Some(draft) = store.get_draft(id).await? else {
        println!("Draft #{id} not found.");
        return Ok(());
    };

    let line = "=".repeat(60);
    println!("\n{line}");
    println!("Draft #{}  |  Status: {}", draft.id, draft.status);
    println!("{line}");
    println!("Job:     {} at {}", draft.job_title, draft.employer);
    println!("To:      {}", draft.recipient_email);
    println!("Source:  {}", draft.source_url);
    println!("Created: {}", draft.created_at.format("%Y-%m-%d %H:%M"));
    println!("{line}");
    println!("Subject: {}", draft.subject);
    println!("{}", "-".repeat(60));
    println!("{}", draft.body);
    println!("{line}");
    Ok(())
}

async fn approve_drafts(store: &Store, ids: &[i64]) -> Result<()> {
    for &id in ids {
        match store.set_draft_status(id, DraftStatus::Approved).await? {
            TransitionOutcome::Applied => {
                let draft = store.get_draft(id).await?;
                match draft {
                    Some(d) => println!(
                        "  Draft #{id}: approved ({} at {})",
                        d.job_title, d.employer
                    ),
                    None => println!("  Draft #{id}: approved"),
                }
            }
            TransitionOutcome::Rejected(current) => {
                println!("  Draft #{id}: is '{current}', skipping.");
            }
            TransitionOutcome::NotFound => {
                println!("  Draft #{id}: not found, skipping.");
            }
        }
    }
    println!("\nSend approved drafts with: agent send-drafts");
    Ok(())
}

async fn approve_all(store: &Store) -> Result<()> {
    let pending = store.list_drafts(Some(DraftStatus::Pending)).await?;
    if pending.is_empty() {
        println!("No pending drafts to approve.");
        return Ok(());
    }

    let mut approved = 0usize;
    for d in &pending {
        if store.set_draft_status(d.id, DraftStatus::Approved).await?
            == TransitionOutcome::Applied
        {
            approved += 1;
        }
    }
    println!("Approved {approved} drafts.");
    println!("Send them with: agent send-drafts");
    Ok(())
}

async fn discard_drafts(store: &Store, ids: &[i64]) -> Result<()> {
    for &id in ids {
        match store.set_draft_status(id, DraftStatus::Discarded).await? {
            TransitionOutcome::Applied => println!("  Draft #{id}: discarded"),
            TransitionOutcome::Rejected(current) => {
                println!("  Draft #{id}: is '{current}', can't discard.");
            }
            TransitionOutcome::NotFound => println!("  Draft #{id}: not found, skipping."),
        }
    }
    Ok(())
}

async fn edit_draft(
    store: &Store,
    id: i64,
    subject: Option<String>,
    body_file: Option<PathBuf>,
) -> Result<()> {
    let Some(draft) = store.get_draft(id).await? else {
        println!("Draft #{id} not found.");
        return Ok(());
    };
    if draft.status == DraftStatus::Sent {
        println!("Draft #{id} has already been sent, can't edit.");
        return Ok(());
    }

    let new_subject = subject.clone().unwrap_or_else(|| draft.subject.clone());
    let new_body = match &body_file {
        Some(path) => std::fs::read_to_string(path)?.trim().to_string(),
        None => draft.body.clone(),
    };

    if new_subject == draft.subject && new_body == draft.body {
        println!("No changes provided.");
        return Ok(());
    }

    if store.set_draft_content(id, &new_subject, &new_body).await? {
        println!("Draft #{id} updated.");
        if subject.is_some() {
            println!("  New subject: {new_subject}");
        }
        if let Some(path) = body_file {
            println!("  Body updated from: {}", path.display());
        }
    } else {
        println!("Draft #{id} could not be updated.");
    }
    Ok(())
}

async fn print_status(store: &Store) -> Result<()> {
    let stats = store.stats().await?;
    let pending = store.pending_jobs().await?;
    let drafts_pending = store.list_drafts(Some(DraftStatus::Pending)).await?;
    let drafts_approved = store.list_drafts(Some(DraftStatus::Approved)).await?;

    println!("=== Status ===\n");
    println!("Total jobs discovered:    {}", stats.total_jobs_seen);
    println!("Total applications sent:  {}", stats.total_applications);
    println!("Applications today:       {}", stats.applications_today);
    println!("Pending (no draft/app):   {}", pending.len());
    println!("Drafts pending review:    {}", drafts_pending.len());
    println!("Drafts approved to send:  {}", drafts_approved.len());

    let recent = store.recent_applications(10).await?;
    if recent.is_empty() {
        println!("\nNo applications sent yet.");
    } else {
        println!("\n--- Recent Applications (last {}) ---", recent.len());
        for app in &recent {
            println!(
                "  {}  |  {:<30}  |  {:<20}  |  {}",
                app.sent_at.format("%Y-%m-%d %H:%M"),
                truncate(&app.job_title, 30),
                truncate(&app.employer, 20),
                app.recipient_email
            );
        }
    }
    Ok(())
}

fn announce_dry_run(dry_run: bool) {
    if dry_run {
        println!("=== DRY RUN MODE (no emails will be sent) ===\n");
    }
}

fn print_run_summary(summary: &RunSummary) {
    println!("\n--- Summary ---");
    println!("Jobs found:          {}", summary.jobs_found);
    println!("New jobs:            {}", summary.jobs_new);
    println!("  With email:        {}", summary.jobs_with_email);
    println!("  No email:          {}", summary.jobs_no_email);
    println!("Applications sent:   {}", summary.sent);
    println!("Applications failed: {}", summary.failed);
}

fn print_pending_summary(summary: &PendingSummary) {
    println!("\n--- Summary ---");
    println!("Pending jobs found:  {}", summary.pending_found);
    println!("Applications sent:   {}", summary.sent);
    println!("Applications failed: {}", summary.failed);
}

fn print_send_drafts_summary(summary: &SendDraftsSummary) {
    println!("\n--- Summary ---");
    println!("Drafts found:        {}", summary.drafts_found);
    println!("Applications sent:   {}", summary.sent);
    println!("Applications failed: {}", summary.failed);
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
