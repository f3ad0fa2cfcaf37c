//! # Worker Module
//!
//! The dispatcher and the isolated execution context a calculation runs in.
//!
//! [`dispatch`] spawns one task per calculation request and resolves as soon
//! as the context signals it is alive, never when the calculation finishes.
//! The triggering mutation (mark validation) must not block on transcript
//! computation; everything after spawn is fire-and-forget and observable
//! only through logs and the persisted `transcript_results` row.
//!
//! The context owns its resources: it opens its own store connection (never
//! the caller's), and closes it on every exit path. Concurrent contexts are
//! independent and unordered; one failing has no effect on another. There is
//! no retry, no cancellation and no timeout.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use db::models::transcript_result;

use crate::TranscriptJob;
use crate::error::{TranscriptError, TranscriptResult};

/// The single message a worker context produces when it exits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculationOutcome {
    pub success: bool,
    pub student_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Spawns an isolated calculation context for `student_id` and returns once
/// the context reports it is alive.
///
/// Spawn failure is the only error surfaced here; anything that goes wrong
/// afterwards is reported through the worker's outcome message alone.
pub async fn dispatch(student_id: i64) -> TranscriptResult<()> {
    let (started_tx, started_rx) = oneshot::channel();

    tokio::spawn(async move {
        let _ = started_tx.send(());
        run_calculation(student_id).await;
    });

    started_rx
        .await
        .map_err(|_| TranscriptError::Spawn("worker exited before signalling startup".into()))
}

/// The worker runtime: everything that happens inside one context.
///
/// Opens its own connection, loads and calculates, persists the outcome row,
/// logs, and closes the connection regardless of how the calculation ended.
pub async fn run_calculation(student_id: i64) -> CalculationOutcome {
    let db = match db::connect().await {
        Ok(db) => db,
        Err(e) => {
            // Nothing to close and nowhere to persist: log is all we have.
            let outcome = failure(student_id, format!("Store connection failed: {e}"));
            tracing::error!(student_id, error = %e, "transcript worker could not connect");
            return outcome;
        }
    };

    let calculated = match TranscriptJob::load(&db, student_id).await {
        Ok(job) => job.calculate(),
        Err(e) => Err(e),
    };

    let (outcome, transcript_json) = match calculated {
        Ok(transcript) => match serde_json::to_value(&transcript) {
            Ok(json) => (
                CalculationOutcome {
                    success: true,
                    student_id,
                    message: Some("Transcript calculated".into()),
                    error: None,
                },
                Some(json),
            ),
            Err(e) => (failure(student_id, format!("Failed to serialize transcript: {e}")), None),
        },
        Err(e) => (failure(student_id, e.to_string()), None),
    };

    if let Err(e) = transcript_result::Model::create(
        &db,
        student_id,
        outcome.success,
        outcome.message.clone(),
        outcome.error.clone(),
        transcript_json,
    )
    .await
    {
        tracing::warn!(student_id, error = %e, "failed to persist transcript outcome");
    }

    if outcome.success {
        tracing::info!(student_id, "transcript calculation succeeded");
    } else {
        tracing::error!(
            student_id,
            error = outcome.error.as_deref().unwrap_or(""),
            "transcript calculation failed"
        );
    }

    if let Err(e) = db.close().await {
        tracing::warn!(student_id, error = %e, "failed to close worker connection");
    }

    outcome
}

fn failure(student_id: i64, error: String) -> CalculationOutcome {
    CalculationOutcome {
        success: false,
        student_id,
        message: None,
        error: Some(error),
    }
}
