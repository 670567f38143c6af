//! First-pass filtering of a scraped batch against the record store.

use tracing::debug;

use crate::errors::AppError;
use crate::models::JobRecord;
use crate::store::Store;

/// Marks every job as seen and keeps only the newly inserted ones, split into
/// (with contact email, without). Jobs already in the store are dropped, so a
/// re-run over the same scrape output is a no-op.
pub async fn filter_new(
    store: &Store,
    jobs: Vec<JobRecord>,
) -> Result<(Vec<JobRecord>, Vec<JobRecord>), AppError> {
    let mut with_email = Vec::new();
    let mut without_email = Vec::new();

    for job in jobs {
        if store.is_seen(&job.identity_key()).await? {
            debug!("Already seen: {}", job.identity_key());
            continue;
        }
        if !store.mark_seen(&job).await? {
            // Lost a race with a duplicate earlier in this same batch.
            continue;
        }
        if job.contact_email.is_empty() {
            without_email.push(job);
        } else {
            with_email.push(job);
        }
    }

    Ok((with_email, without_email))
}
