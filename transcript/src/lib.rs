//! # Transcript Library
//!
//! This crate is the transcript calculation engine: the subsystem that turns
//! a student's validated test results into a PASS/FAIL transcript across the
//! Test → Subject → Block hierarchy.
//!
//! ## Key Concepts
//! - **TranscriptJob**: the main struct representing one calculation. It
//!   holds the student's results plus the referenced tests, subjects and
//!   blocks, and walks the three levels in dependency order.
//! - **Rules and criteria**: atomic comparisons combined into the two
//!   criteria shapes the system stores (flat at test level, PASS/FAIL
//!   grouped chains at subject level).
//! - **Worker**: the fire-and-forget execution context that runs a job off
//!   the request path with its own store connection.
//!
//! Calculations are all-or-nothing; any error aborts the job with no
//! partial transcript.

pub mod criteria;
pub mod error;
pub mod loader;
pub mod rules;
pub mod types;
pub mod worker;

use std::collections::{BTreeMap, HashMap};

use db::models::{block, student, student_test_result, subject, test};
use sea_orm::DatabaseConnection;

use crate::criteria::SubjectScope;
use crate::error::{TranscriptError, TranscriptResult};
use crate::loader::{DbLoader, ReferenceLoader};
use crate::rules::round2;
use crate::types::{
    BlockReport, FlatCriteria, SubjectReport, TestReport, Transcript,
};

/// Represents one transcript calculation for a single student.
///
/// A job is built either from preloaded data ([`TranscriptJob::new`], used by
/// tests and by callers that already hold the entities) or by loading
/// everything through a connection ([`TranscriptJob::load`], used by the
/// worker). [`TranscriptJob::calculate`] then walks the hierarchy bottom-up:
/// per-test weighted marks and verdicts, per-subject totals and verdicts,
/// per-block grouping for reporting.
pub struct TranscriptJob {
    student_id: i64,
    results: Vec<student_test_result::Model>,
    tests: Vec<test::Model>,
    subjects: Vec<subject::Model>,
    blocks: Vec<block::Model>,
}

impl TranscriptJob {
    pub fn new(
        student_id: i64,
        results: Vec<student_test_result::Model>,
        tests: Vec<test::Model>,
        subjects: Vec<subject::Model>,
        blocks: Vec<block::Model>,
    ) -> Self {
        Self {
            student_id,
            results,
            tests,
            subjects,
            blocks,
        }
    }

    /// Loads a job through `db`: the student's non-deleted results, then the
    /// referenced tests, subjects and blocks via batched lookups.
    pub async fn load(db: &DatabaseConnection, student_id: i64) -> TranscriptResult<Self> {
        let student = student::Model::get_by_id(db, student_id)
            .await?
            .filter(|s| !s.deleted)
            .ok_or(TranscriptError::StudentNotFound(student_id))?;

        let results = student_test_result::Model::get_by_student_id(db, student.id).await?;
        if results.is_empty() {
            return Err(TranscriptError::NoResults(student_id));
        }

        let loader = DbLoader::new(db);

        let test_ids: Vec<i64> = results.iter().map(|r| r.test_id).collect();
        let tests = loader.load_tests(&test_ids).await?;

        let subject_ids: Vec<i64> = tests.iter().map(|t| t.subject_id).collect();
        let subjects = loader.load_subjects(&subject_ids).await?;

        let block_ids: Vec<i64> = subjects.iter().map(|s| s.block_id).collect();
        let blocks = loader.load_blocks(&block_ids).await?;

        Ok(Self::new(student_id, results, tests, subjects, blocks))
    }

    /// Runs the three aggregation levels in dependency order and returns the
    /// computed tree.
    pub fn calculate(&self) -> TranscriptResult<Transcript> {
        let tests_by_id: HashMap<i64, &test::Model> =
            self.tests.iter().map(|t| (t.id, t)).collect();
        let subjects_by_id: HashMap<i64, &subject::Model> =
            self.subjects.iter().map(|s| (s.id, s)).collect();
        let blocks_by_id: HashMap<i64, &block::Model> =
            self.blocks.iter().map(|b| (b.id, b)).collect();

        // Level 1: per-test weighted marks and verdicts.
        let mut results = self.results.clone();
        results.sort_by_key(|r| r.id);

        let mut test_reports = Vec::with_capacity(results.len());
        for result in &results {
            let test = tests_by_id
                .get(&result.test_id)
                .ok_or(TranscriptError::MissingTest {
                    result_id: result.id,
                    test_id: result.test_id,
                })?;

            let flat: FlatCriteria =
                serde_json::from_value(test.criteria.clone()).map_err(|e| {
                    TranscriptError::InvalidCriteria(format!("test {}: {e}", test.id))
                })?;

            let outcome = criteria::evaluate_flat(&flat, result.average_mark)?;
            test_reports.push(TestReport {
                result_id: result.id,
                test_id: test.id,
                test_name: test.name.clone(),
                subject_id: test.subject_id,
                average_mark: result.average_mark,
                weight: test.weight,
                weighted_mark: round2(result.average_mark * test.weight),
                criteria: flat,
                verdict: outcome.verdict,
                evidence: outcome.evidence,
            });
        }

        // Level 2: per-subject totals and verdicts.
        let mut by_subject: BTreeMap<i64, Vec<&TestReport>> = BTreeMap::new();
        for report in &test_reports {
            by_subject.entry(report.subject_id).or_default().push(report);
        }

        let mut subject_reports = Vec::with_capacity(by_subject.len());
        for (subject_id, reports) in &by_subject {
            let subject =
                subjects_by_id
                    .get(subject_id)
                    .ok_or(TranscriptError::MissingSubject {
                        test_id: reports[0].test_id,
                        subject_id: *subject_id,
                    })?;

            let weighted_sum: f64 = reports.iter().map(|r| r.weighted_mark).sum();
            let total_mark = round2(subject.coefficient * weighted_sum);

            let test_marks: HashMap<i64, f64> = reports
                .iter()
                .map(|r| (r.test_id, r.average_mark))
                .collect();

            let groups: Vec<types::CriteriaGroup> = serde_json::from_value(
                subject.criteria.clone(),
            )
            .map_err(|e| {
                TranscriptError::InvalidCriteria(format!("subject {}: {e}", subject.id))
            })?;

            let scope = SubjectScope {
                test_marks: &test_marks,
                total_mark,
            };
            let outcome = criteria::evaluate_groups(&groups, &scope)?;

            subject_reports.push(SubjectReport {
                subject_id: subject.id,
                subject_name: subject.name.clone(),
                block_id: subject.block_id,
                coefficient: subject.coefficient,
                total_mark,
                criteria: groups,
                verdict: outcome.verdict,
                groups: outcome.groups,
            });
        }

        // Level 3: per-block grouping. Blocks carry no verdict; they are
        // loaded and reported only.
        let mut by_block: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for report in &subject_reports {
            by_block.entry(report.block_id).or_default().push(report.subject_id);
        }

        let mut block_reports = Vec::with_capacity(by_block.len());
        for (block_id, subject_ids) in by_block {
            let block = blocks_by_id
                .get(&block_id)
                .ok_or(TranscriptError::MissingBlock {
                    subject_id: subject_ids[0],
                    block_id,
                })?;
            block_reports.push(BlockReport {
                block_id: block.id,
                block_name: block.name.clone(),
                subject_ids,
            });
        }

        Ok(Transcript {
            student_id: self.student_id,
            student_test_results: results,
            tests: test_reports,
            subjects: subject_reports,
            blocks: block_reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use db::models::student_test_result::ResultStatus;
    use serde_json::json;

    fn make_result(id: i64, student_id: i64, test_id: i64, average_mark: f64) -> student_test_result::Model {
        let now = Utc::now();
        student_test_result::Model {
            id,
            student_id,
            test_id,
            marks: json!([]),
            average_mark,
            status: ResultStatus::Validated,
            mark_validated_date: Some(now),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_test(id: i64, subject_id: i64, weight: f64, criteria: serde_json::Value) -> test::Model {
        let now = Utc::now();
        test::Model {
            id,
            subject_id,
            name: format!("Test {id}"),
            weight,
            notations: json!([]),
            criteria,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_subject(id: i64, block_id: i64, coefficient: f64, criteria: serde_json::Value) -> subject::Model {
        let now = Utc::now();
        subject::Model {
            id,
            block_id,
            name: format!("Subject {id}"),
            coefficient,
            criteria,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_block(id: i64) -> block::Model {
        let now = Utc::now();
        block::Model {
            id,
            school_id: 1,
            name: format!("Block {id}"),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn gte_pass_criteria(threshold: f64) -> serde_json::Value {
        json!({
            "logic": "AND",
            "rules": [
                { "operator": "GTE", "threshold": threshold, "expected_outcome": "PASS" }
            ]
        })
    }

    fn average_gte_groups(threshold: f64) -> serde_json::Value {
        json!([
            {
                "expected_outcome": "PASS",
                "rules": [
                    { "rule_type": "AVERAGE", "operator": "GTE", "threshold": threshold }
                ]
            },
            {
                "expected_outcome": "FAIL",
                "rules": [
                    { "rule_type": "AVERAGE", "operator": "LT", "threshold": threshold }
                ]
            }
        ])
    }

    /// One result, average 80, weight 0.5, GTE 60 → weighted 40.00, PASS.
    #[test]
    fn test_single_test_weighted_mark_and_verdict() {
        let job = TranscriptJob::new(
            1,
            vec![make_result(1, 1, 10, 80.0)],
            vec![make_test(10, 100, 0.5, gte_pass_criteria(60.0))],
            vec![make_subject(100, 1000, 2.0, average_gte_groups(100.0))],
            vec![make_block(1000)],
        );

        let transcript = job.calculate().unwrap();
        assert_eq!(transcript.tests.len(), 1);
        assert_eq!(transcript.tests[0].weighted_mark, 40.0);
        assert_eq!(transcript.tests[0].verdict, types::Verdict::Pass);
    }

    /// Coefficient 4 over one weighted mark of 40 → total 160.00, PASS on
    /// an AVERAGE >= 100 rule.
    #[test]
    fn test_subject_total_mark_and_verdict() {
        let job = TranscriptJob::new(
            1,
            vec![make_result(1, 1, 10, 80.0)],
            vec![make_test(10, 100, 0.5, gte_pass_criteria(60.0))],
            vec![make_subject(100, 1000, 4.0, average_gte_groups(100.0))],
            vec![make_block(1000)],
        );

        let transcript = job.calculate().unwrap();
        assert_eq!(transcript.subjects.len(), 1);
        assert_eq!(transcript.subjects[0].total_mark, 160.0);
        assert_eq!(transcript.subjects[0].verdict, types::Verdict::Pass);
        assert_eq!(transcript.blocks.len(), 1);
        assert_eq!(transcript.blocks[0].subject_ids, vec![100]);
    }

    /// Recomputing from the same inputs yields the same totals.
    #[test]
    fn test_calculation_is_idempotent() {
        let job = TranscriptJob::new(
            1,
            vec![
                make_result(1, 1, 10, 73.37),
                make_result(2, 1, 11, 55.51),
            ],
            vec![
                make_test(10, 100, 0.6, gte_pass_criteria(60.0)),
                make_test(11, 100, 0.4, gte_pass_criteria(60.0)),
            ],
            vec![make_subject(100, 1000, 1.5, average_gte_groups(50.0))],
            vec![make_block(1000)],
        );

        let first = job.calculate().unwrap();
        let second = job.calculate().unwrap();
        assert_eq!(first.subjects[0].total_mark, second.subjects[0].total_mark);
        assert_eq!(first, second);
    }

    /// TEST_SCORE rules resolve against the named test's average mark.
    #[test]
    fn test_subject_test_score_rule_resolution() {
        let groups = json!([
            {
                "expected_outcome": "PASS",
                "rules": [
                    { "rule_type": "TEST_SCORE", "test_id": 10, "operator": "GTE", "threshold": 70.0 },
                    { "rule_type": "AVERAGE", "operator": "GTE", "threshold": 50.0, "logic": "AND" }
                ]
            },
            {
                "expected_outcome": "FAIL",
                "rules": [
                    { "rule_type": "TEST_SCORE", "test_id": 10, "operator": "LT", "threshold": 70.0 }
                ]
            }
        ]);
        let job = TranscriptJob::new(
            1,
            vec![make_result(1, 1, 10, 80.0)],
            vec![make_test(10, 100, 1.0, gte_pass_criteria(60.0))],
            vec![make_subject(100, 1000, 1.0, groups)],
            vec![make_block(1000)],
        );

        let transcript = job.calculate().unwrap();
        // weighted = 80, total = 80; TEST_SCORE 80 >= 70 and AVERAGE 80 >= 50.
        assert_eq!(transcript.subjects[0].verdict, types::Verdict::Pass);
    }

    #[test]
    fn test_result_referencing_missing_test_raises() {
        let job = TranscriptJob::new(
            1,
            vec![make_result(1, 1, 99, 80.0)],
            vec![],
            vec![],
            vec![],
        );
        assert!(matches!(
            job.calculate(),
            Err(TranscriptError::MissingTest { result_id: 1, test_id: 99 })
        ));
    }

    #[test]
    fn test_malformed_test_criteria_raises() {
        let job = TranscriptJob::new(
            1,
            vec![make_result(1, 1, 10, 80.0)],
            vec![make_test(
                10,
                100,
                0.5,
                json!({ "logic": "XOR", "rules": [] }),
            )],
            vec![make_subject(100, 1000, 1.0, average_gte_groups(50.0))],
            vec![make_block(1000)],
        );
        assert!(matches!(
            job.calculate(),
            Err(TranscriptError::InvalidCriteria(_))
        ));
    }

    /// Two tests in one subject, one in another, spread over two blocks.
    #[test]
    fn test_multi_subject_multi_block_tree() {
        let job = TranscriptJob::new(
            1,
            vec![
                make_result(1, 1, 10, 80.0),
                make_result(2, 1, 11, 60.0),
                make_result(3, 1, 12, 90.0),
            ],
            vec![
                make_test(10, 100, 0.5, gte_pass_criteria(60.0)),
                make_test(11, 100, 0.5, gte_pass_criteria(60.0)),
                make_test(12, 101, 1.0, gte_pass_criteria(60.0)),
            ],
            vec![
                make_subject(100, 1000, 1.0, average_gte_groups(50.0)),
                make_subject(101, 1001, 2.0, average_gte_groups(100.0)),
            ],
            vec![make_block(1000), make_block(1001)],
        );

        let transcript = job.calculate().unwrap();
        assert_eq!(transcript.tests.len(), 3);
        assert_eq!(transcript.subjects.len(), 2);
        assert_eq!(transcript.blocks.len(), 2);

        // Subject 100: 40 + 30 = 70.00; subject 101: 2 * 90 = 180.00.
        assert_eq!(transcript.subjects[0].total_mark, 70.0);
        assert_eq!(transcript.subjects[1].total_mark, 180.0);
        assert_eq!(transcript.subjects[0].verdict, types::Verdict::Pass);
        assert_eq!(transcript.subjects[1].verdict, types::Verdict::Pass);
    }
}
