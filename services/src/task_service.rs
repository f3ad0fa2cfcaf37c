//! The correction task workflow.
//!
//! Tasks move strictly forward: assign_corrector → enter_marks →
//! validate_marks → done. Each operation checks the task's current status
//! and rejects out-of-order requests. `validate_marks` is the trigger
//! boundary of the transcript engine: once the result is stamped and the
//! task closed, it dispatches a calculation and returns without waiting
//! for it.

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

use db::models::student_test_result::{self, NotationMark};
use db::models::task::{self, TaskStatus};
use db::models::test;

use crate::error::ServiceError;

pub use db::models::task::Model as Task;

pub struct TaskService;

impl TaskService {
    /// Open a correction task for a result.
    pub async fn open(db: &DatabaseConnection, result_id: i64) -> Result<Task, ServiceError> {
        student_test_result::Model::get_by_id(db, result_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Result ID {result_id}")))?;
        Ok(task::Model::create(db, result_id).await?)
    }

    /// Assign the corrector and advance to `enter_marks`.
    pub async fn assign_corrector(
        db: &DatabaseConnection,
        task_id: i64,
        corrector_id: i64,
    ) -> Result<Task, ServiceError> {
        let task = Self::get_in_status(db, task_id, TaskStatus::AssignCorrector).await?;
        task::Model::set_corrector(db, task.id, corrector_id).await?;
        Ok(task::Model::set_status(db, task.id, TaskStatus::EnterMarks).await?)
    }

    /// Record the corrector's per-notation marks and advance to
    /// `validate_marks`.
    ///
    /// Marks must line up with the test's notation list: same notations,
    /// each mark within `[0, max_points]`. The result's `average_mark` is
    /// precomputed here as the mean of the notation marks.
    pub async fn enter_marks(
        db: &DatabaseConnection,
        task_id: i64,
        marks: Vec<NotationMark>,
    ) -> Result<Task, ServiceError> {
        let task = Self::get_in_status(db, task_id, TaskStatus::EnterMarks).await?;

        let result = student_test_result::Model::get_by_id(db, task.student_test_result_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Result ID {}", task.student_test_result_id))
            })?;
        let test = test::Model::get_by_id(db, result.test_id)
            .await?
            .filter(|t| !t.deleted)
            .ok_or_else(|| ServiceError::NotFound(format!("Test ID {}", result.test_id)))?;

        check_marks_against_notations(&test, &marks)?;

        let average_mark = marks.iter().map(|m| m.mark).sum::<f64>() / marks.len() as f64;
        student_test_result::Model::record_marks(db, result.id, &marks, average_mark).await?;

        Ok(task::Model::set_status(db, task.id, TaskStatus::ValidateMarks).await?)
    }

    /// Finalize the marks and trigger the transcript calculation.
    ///
    /// Stamps `mark_validated_date`, closes the task, then dispatches the
    /// engine for the result's student. The dispatch resolves on worker
    /// spawn, so this mutation never waits on the calculation itself; a
    /// spawn failure is the only engine error a caller can see here.
    pub async fn validate_marks(
        db: &DatabaseConnection,
        task_id: i64,
    ) -> Result<(Task, DateTime<Utc>), ServiceError> {
        let task = Self::get_in_status(db, task_id, TaskStatus::ValidateMarks).await?;

        let result = student_test_result::Model::validate(db, task.student_test_result_id).await?;
        let validated_at = result
            .mark_validated_date
            .expect("validate() always stamps the date");

        let task = task::Model::set_status(db, task.id, TaskStatus::Done).await?;

        log::info!(
            "marks validated for result {} (student {}), dispatching transcript",
            result.id,
            result.student_id
        );
        transcript::worker::dispatch(result.student_id).await?;

        Ok((task, validated_at))
    }

    async fn get_in_status(
        db: &DatabaseConnection,
        task_id: i64,
        expected: TaskStatus,
    ) -> Result<Task, ServiceError> {
        let task = task::Model::get_by_id(db, task_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Task ID {task_id}")))?;
        if task.status != expected {
            return Err(ServiceError::InvalidTransition {
                task_id,
                status: task.status,
                expected,
            });
        }
        Ok(task)
    }
}

fn check_marks_against_notations(
    test: &test::Model,
    marks: &[NotationMark],
) -> Result<(), ServiceError> {
    let notations = test
        .notation_list()
        .map_err(|e| ServiceError::Validation(format!("test {} notations: {e}", test.id)))?;

    if marks.is_empty() {
        return Err(ServiceError::Validation("no marks entered".into()));
    }
    if marks.len() != notations.len() {
        return Err(ServiceError::Validation(format!(
            "expected {} marks, got {}",
            notations.len(),
            marks.len()
        )));
    }

    for notation in &notations {
        let mark = marks
            .iter()
            .find(|m| m.notation == notation.name)
            .ok_or_else(|| {
                ServiceError::Validation(format!("missing mark for notation '{}'", notation.name))
            })?;
        if mark.mark < 0.0 || mark.mark > notation.max_points {
            return Err(ServiceError::Validation(format!(
                "mark {} for notation '{}' is outside [0, {}]",
                mark.mark, notation.name, notation.max_points
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::models::{block, school, student, subject, transcript_result, user};
    use db::test_utils::{setup_shared_test_db, setup_test_db};
    use serde_json::json;
    use serial_test::serial;
    use std::time::Duration;

    struct Fixture {
        corrector_id: i64,
        student_id: i64,
        result_id: i64,
        task_id: i64,
    }

    async fn seed_workflow(db: &DatabaseConnection) -> Fixture {
        let corrector = user::Model::create(db, "corrector", "c@example.com", false)
            .await
            .unwrap();
        let school = school::Model::create(db, "School", "SC").await.unwrap();
        let stu = student::Model::create(db, school.id, "Ada", "Lovelace", "ada@example.com")
            .await
            .unwrap();
        let blk = block::Model::create(db, school.id, "Year 1").await.unwrap();
        let sub = subject::Model::create(
            db,
            blk.id,
            "Maths",
            1.0,
            json!([
                { "expected_outcome": "PASS",
                  "rules": [{ "rule_type": "AVERAGE", "operator": "GTE", "threshold": 50.0 }] },
                { "expected_outcome": "FAIL",
                  "rules": [{ "rule_type": "AVERAGE", "operator": "LT", "threshold": 50.0 }] }
            ]),
        )
        .await
        .unwrap();
        let tst = test::Model::create(
            db,
            sub.id,
            "Algebra",
            1.0,
            &[
                test::Notation { name: "clarity".into(), max_points: 100.0 },
                test::Notation { name: "rigor".into(), max_points: 100.0 },
            ],
            json!({
                "logic": "AND",
                "rules": [{ "operator": "GTE", "threshold": 60.0, "expected_outcome": "PASS" }]
            }),
        )
        .await
        .unwrap();
        let result = student_test_result::Model::create(db, stu.id, tst.id)
            .await
            .unwrap();
        let task = TaskService::open(db, result.id).await.unwrap();

        Fixture {
            corrector_id: corrector.id,
            student_id: stu.id,
            result_id: result.id,
            task_id: task.id,
        }
    }

    fn marks() -> Vec<NotationMark> {
        vec![
            NotationMark { notation: "clarity".into(), mark: 80.0 },
            NotationMark { notation: "rigor".into(), mark: 60.0 },
        ]
    }

    #[tokio::test]
    async fn test_assign_then_enter_marks() {
        let db = setup_test_db().await;
        let fx = seed_workflow(&db).await;

        let task = TaskService::assign_corrector(&db, fx.task_id, fx.corrector_id)
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::EnterMarks);
        assert_eq!(task.corrector_id, Some(fx.corrector_id));

        let task = TaskService::enter_marks(&db, fx.task_id, marks()).await.unwrap();
        assert_eq!(task.status, TaskStatus::ValidateMarks);

        let result = student_test_result::Model::get_by_id(&db, fx.result_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.average_mark, 70.0);
    }

    #[tokio::test]
    async fn test_out_of_order_transition_is_rejected() {
        let db = setup_test_db().await;
        let fx = seed_workflow(&db).await;

        // Marks cannot be entered before a corrector is assigned.
        let err = TaskService::enter_marks(&db, fx.task_id, marks()).await;
        assert!(matches!(err, Err(ServiceError::InvalidTransition { .. })));

        // And validation cannot run before marks are entered.
        let err = TaskService::validate_marks(&db, fx.task_id).await;
        assert!(matches!(err, Err(ServiceError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_enter_marks_rejects_mark_outside_notation_range() {
        let db = setup_test_db().await;
        let fx = seed_workflow(&db).await;
        TaskService::assign_corrector(&db, fx.task_id, fx.corrector_id)
            .await
            .unwrap();

        let bad = vec![
            NotationMark { notation: "clarity".into(), mark: 120.0 },
            NotationMark { notation: "rigor".into(), mark: 60.0 },
        ];
        let err = TaskService::enter_marks(&db, fx.task_id, bad).await;
        assert!(matches!(err, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_enter_marks_rejects_missing_notation() {
        let db = setup_test_db().await;
        let fx = seed_workflow(&db).await;
        TaskService::assign_corrector(&db, fx.task_id, fx.corrector_id)
            .await
            .unwrap();

        let bad = vec![NotationMark { notation: "clarity".into(), mark: 80.0 }];
        let err = TaskService::enter_marks(&db, fx.task_id, bad).await;
        assert!(matches!(err, Err(ServiceError::Validation(_))));
    }

    /// The full workflow: the validating mutation completes as soon as the
    /// worker spawns, and the transcript outcome lands afterwards.
    #[tokio::test]
    #[serial]
    async fn test_validate_marks_closes_task_and_dispatches() {
        let (db, _dir) = setup_shared_test_db().await;
        let fx = seed_workflow(&db).await;
        TaskService::assign_corrector(&db, fx.task_id, fx.corrector_id)
            .await
            .unwrap();
        TaskService::enter_marks(&db, fx.task_id, marks()).await.unwrap();

        let (task, validated_at) = TaskService::validate_marks(&db, fx.task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Done);

        let result = student_test_result::Model::get_by_id(&db, fx.result_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.mark_validated_date, Some(validated_at));

        let mut row = None;
        for _ in 0..100 {
            row = transcript_result::Model::get_latest_by_student_id(&db, fx.student_id)
                .await
                .unwrap();
            if row.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let row = row.expect("worker persisted an outcome row");
        assert!(row.success);
    }
}
