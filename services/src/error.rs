use db::models::task::TaskStatus;
use sea_orm::DbErr;
use transcript::error::TranscriptError;

/// Errors surfaced by the write-path services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    /// A task workflow operation was requested out of order.
    #[error("Task {task_id} is {status}, expected {expected}")]
    InvalidTransition {
        task_id: i64,
        status: TaskStatus,
        expected: TaskStatus,
    },

    /// A transcript worker failed to spawn. Post-spawn calculation failures
    /// never surface here; they only reach logs and `transcript_results`.
    #[error("Transcript dispatch failed: {0}")]
    Dispatch(#[from] TranscriptError),
}
