//! Transcript Error Types
//!
//! This module defines the [`TranscriptError`] enum, which covers every way a
//! transcript calculation can fail: malformed criteria documents, referential
//! gaps in the loaded data, an empty result set, store errors, and worker
//! spawn failures.
//!
//! A calculation is all-or-nothing: the first error aborts it and no partial
//! transcript is ever produced.

use sea_orm::DbErr;

/// Result type for transcript engine operations.
pub type TranscriptResult<T> = Result<T, TranscriptError>;

/// Errors that can occur while calculating a transcript.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    /// Underlying store error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// JSON (de)serialization error outside criteria documents.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A criteria document does not parse or violates its shape (unknown
    /// operator, empty rule list, chain rule missing its combinator, ...).
    /// This is a configuration error in the stored document, not bad input.
    #[error("Malformed criteria document: {0}")]
    InvalidCriteria(String),

    /// The student does not exist or is deleted.
    #[error("Student {0} not found")]
    StudentNotFound(i64),

    /// The student has no non-deleted test results to aggregate.
    #[error("No test results found for student {0}")]
    NoResults(i64),

    /// A result references a test that is missing or deleted.
    #[error("Result {result_id} references missing test {test_id}")]
    MissingTest { result_id: i64, test_id: i64 },

    /// A test references a subject that is missing or deleted.
    #[error("Test {test_id} references missing subject {subject_id}")]
    MissingSubject { test_id: i64, subject_id: i64 },

    /// A subject references a block that is missing or deleted.
    #[error("Subject {subject_id} references missing block {block_id}")]
    MissingBlock { subject_id: i64, block_id: i64 },

    /// A TEST_SCORE rule names a test with no matching result for this
    /// student. Surfaced as its own error, never as a FAIL verdict.
    #[error("Criteria rule references test {test_id} with no matching result")]
    MissingTestResult { test_id: i64 },

    /// The worker context could not be spawned or never signalled startup.
    /// The only error class surfaced synchronously to the dispatcher's caller.
    #[error("Failed to spawn transcript worker: {0}")]
    Spawn(String),
}
