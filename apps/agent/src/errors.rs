use thiserror::Error;

/// Application-level error type.
///
/// Collaborator failures (scrape, generation, delivery, discovery fetches)
/// are absorbed at their boundaries and never surface here; this type covers
/// the faults that legitimately end a workflow.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
