//! Subject creation with grouped-criteria validation.
//!
//! The engine's grouped evaluation assumes every stored subject document is
//! well-formed: exactly one PASS group and one FAIL group, each a chain
//! whose first rule carries no combinator and whose later rules each carry
//! one, with TEST_SCORE rules naming their test. All of that is checked
//! here, at write time, never during evaluation.

use sea_orm::DatabaseConnection;
use serde_json::Value as Json;
use validator::Validate;

use db::models::{block, subject};
use transcript::types::{CriteriaGroup, ExpectedOutcome, RuleType};

use crate::error::ServiceError;

pub use db::models::subject::Model as Subject;

#[derive(Debug, Clone, Validate)]
pub struct CreateSubject {
    pub block_id: i64,
    #[validate(length(min = 1, message = "subject name must not be empty"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "coefficient must be non-negative"))]
    pub coefficient: f64,
    pub criteria: Json,
}

pub struct SubjectService;

impl SubjectService {
    pub async fn create(
        db: &DatabaseConnection,
        params: CreateSubject,
    ) -> Result<Subject, ServiceError> {
        params
            .validate()
            .map_err(|e| ServiceError::Validation(common::format_validation_errors(&e)))?;

        block::Model::get_by_id(db, params.block_id)
            .await?
            .filter(|b| !b.deleted)
            .ok_or_else(|| ServiceError::NotFound(format!("Block ID {}", params.block_id)))?;

        check_grouped_criteria(&params.criteria)?;

        Ok(subject::Model::create(
            db,
            params.block_id,
            &params.name,
            params.coefficient,
            params.criteria,
        )
        .await?)
    }
}

fn check_grouped_criteria(criteria: &Json) -> Result<(), ServiceError> {
    let groups: Vec<CriteriaGroup> = serde_json::from_value(criteria.clone())
        .map_err(|e| ServiceError::Validation(format!("criteria: {e}")))?;

    let pass_count = groups
        .iter()
        .filter(|g| g.expected_outcome == ExpectedOutcome::Pass)
        .count();
    let fail_count = groups.len() - pass_count;
    if pass_count != 1 || fail_count != 1 {
        return Err(ServiceError::Validation(format!(
            "criteria must have exactly one PASS and one FAIL group, got {pass_count} PASS / {fail_count} FAIL"
        )));
    }

    for group in &groups {
        if group.rules.is_empty() {
            return Err(ServiceError::Validation("criteria group has no rules".into()));
        }
        for (i, rule) in group.rules.iter().enumerate() {
            match (i, rule.logic) {
                (0, Some(_)) => {
                    return Err(ServiceError::Validation(
                        "first rule of a chain must not carry a combinator".into(),
                    ));
                }
                (0, None) => {}
                (_, None) => {
                    return Err(ServiceError::Validation(format!(
                        "chain rule {i} is missing its combinator"
                    )));
                }
                (_, Some(_)) => {}
            }
            if rule.rule_type == RuleType::TestScore && rule.test_id.is_none() {
                return Err(ServiceError::Validation(
                    "TEST_SCORE rule without a test_id".into(),
                ));
            }
        }
    }

    Ok(())
}
