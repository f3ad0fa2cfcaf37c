//! Test creation with the write-time checks the engine relies on.

use sea_orm::DatabaseConnection;
use serde_json::Value as Json;
use validator::Validate;

use db::models::subject;
use db::models::test::{self, Notation};
use transcript::types::FlatCriteria;

use crate::error::ServiceError;

pub use db::models::test::Model as Test;

#[derive(Debug, Clone, Validate)]
pub struct CreateTest {
    pub subject_id: i64,
    #[validate(length(min = 1, message = "test name must not be empty"))]
    pub name: String,
    /// Contribution fraction within the subject.
    #[validate(range(min = 0.0, max = 1.0, message = "weight must be within [0, 1]"))]
    pub weight: f64,
    pub notations: Vec<Notation>,
    pub criteria: Json,
}

pub struct TestService;

impl TestService {
    /// Create a test after checking its weight, notations and criteria.
    ///
    /// The per-subject weight budget (Σ weight ≤ 1 over non-deleted tests)
    /// is enforced here and nowhere else; the engine assumes it holds.
    pub async fn create(db: &DatabaseConnection, params: CreateTest) -> Result<Test, ServiceError> {
        params
            .validate()
            .map_err(|e| ServiceError::Validation(common::format_validation_errors(&e)))?;

        subject::Model::get_by_id(db, params.subject_id)
            .await?
            .filter(|s| !s.deleted)
            .ok_or_else(|| ServiceError::NotFound(format!("Subject ID {}", params.subject_id)))?;

        if params.notations.is_empty() {
            return Err(ServiceError::Validation("test needs at least one notation".into()));
        }
        if params.notations.iter().any(|n| n.max_points <= 0.0) {
            return Err(ServiceError::Validation(
                "notation max_points must be positive".into(),
            ));
        }

        let existing = test::Model::get_by_subject_id(db, params.subject_id).await?;
        let weight_sum: f64 = existing.iter().map(|t| t.weight).sum();
        if weight_sum + params.weight > 1.0 {
            return Err(ServiceError::Validation(format!(
                "subject {} test weights would sum to {:.2}, exceeding 1",
                params.subject_id,
                weight_sum + params.weight
            )));
        }

        check_flat_criteria(&params.criteria)?;

        Ok(test::Model::create(
            db,
            params.subject_id,
            &params.name,
            params.weight,
            &params.notations,
            params.criteria,
        )
        .await?)
    }
}

/// A test's criteria document must parse under the engine's flat schema and
/// carry at least one rule.
fn check_flat_criteria(criteria: &Json) -> Result<(), ServiceError> {
    let flat: FlatCriteria = serde_json::from_value(criteria.clone())
        .map_err(|e| ServiceError::Validation(format!("criteria: {e}")))?;
    if flat.rules.is_empty() {
        return Err(ServiceError::Validation("criteria needs at least one rule".into()));
    }
    Ok(())
}
