//! # Types Module
//!
//! Criteria document schemas and the computed transcript tree.
//!
//! The engine owns the serde schema for both criteria shapes found in the
//! stored documents: the flat `logic` + `rules` form used at test level, and
//! the PASS/FAIL grouped chained-rules form used at subject level. The two
//! shapes are deliberately kept distinct; do not unify them.
//!
//! Unknown operators, logics, rule types or outcomes fail deserialization,
//! so a malformed document is rejected before any rule is evaluated.

use db::models::student_test_result;
use serde::{Deserialize, Serialize};

/// Comparison operator of a single rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Logical combinator between rule outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    And,
    Or,
}

/// Declared outcome a rule or group encodes: PASS expects the comparison to
/// hold, FAIL expects it not to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpectedOutcome {
    Pass,
    Fail,
}

impl ExpectedOutcome {
    pub fn as_bool(self) -> bool {
        matches!(self, ExpectedOutcome::Pass)
    }
}

/// What a subject-level chain rule compares against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    /// A specific test's `average_mark`, identified by `test_id`.
    TestScore,
    /// The subject's own aggregated `total_mark`.
    Average,
}

/// Final verdict at any level of the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn from_bool(passed: bool) -> Self {
        if passed { Verdict::Pass } else { Verdict::Fail }
    }
}

// ---------------------------------------------------------------------------
// Flat form (test level)
// ---------------------------------------------------------------------------

/// One rule of a flat criteria document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlatRule {
    pub operator: Operator,
    pub threshold: f64,
    pub expected_outcome: ExpectedOutcome,
}

/// Flat criteria: a single combinator over an ordered rule list, evaluated
/// against one value (the test's `average_mark`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlatCriteria {
    pub logic: Logic,
    pub rules: Vec<FlatRule>,
}

// ---------------------------------------------------------------------------
// Grouped form (subject level)
// ---------------------------------------------------------------------------

/// One rule of a subject criteria chain. Rule 0 carries no `logic`; every
/// later rule combines with the running value via its own `logic`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainRule {
    pub rule_type: RuleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<i64>,
    pub operator: Operator,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<Logic>,
}

/// A PASS- or FAIL-tagged group of chained rules. A well-formed subject
/// document has exactly one of each (enforced at write time).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CriteriaGroup {
    pub expected_outcome: ExpectedOutcome,
    pub rules: Vec<ChainRule>,
}

// ---------------------------------------------------------------------------
// Evidence and verdicts
// ---------------------------------------------------------------------------

/// How one flat rule evaluated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlatRuleEvidence {
    pub operator: Operator,
    pub threshold: f64,
    pub expected_outcome: ExpectedOutcome,
    pub actual: f64,
    /// Whether the comparison result matched the rule's expected outcome.
    pub satisfied: bool,
}

/// Verdict of a flat criteria document plus the rules that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlatOutcome {
    pub verdict: Verdict,
    pub evidence: Vec<FlatRuleEvidence>,
}

/// How one chain rule evaluated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainRuleEvidence {
    pub rule_type: RuleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<i64>,
    pub operator: Operator,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<Logic>,
    pub actual: f64,
    /// Raw comparison result of this rule alone.
    pub holds: bool,
}

/// One evaluated group: the left-fold value of its chain plus the evidence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupEvidence {
    pub expected_outcome: ExpectedOutcome,
    /// Left-fold of the chain's comparison results.
    pub value: bool,
    pub evidence: Vec<ChainRuleEvidence>,
}

/// Verdict of a grouped criteria document. The verdict follows the PASS
/// group; the FAIL group is evaluated and kept for audit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupedOutcome {
    pub verdict: Verdict,
    pub groups: Vec<GroupEvidence>,
}

// ---------------------------------------------------------------------------
// Transcript tree
// ---------------------------------------------------------------------------

/// Per-test line of the transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub result_id: i64,
    pub test_id: i64,
    pub test_name: String,
    pub subject_id: i64,
    pub average_mark: f64,
    pub weight: f64,
    /// `round2(average_mark * weight)`.
    pub weighted_mark: f64,
    pub criteria: FlatCriteria,
    pub verdict: Verdict,
    pub evidence: Vec<FlatRuleEvidence>,
}

/// Per-subject line of the transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubjectReport {
    pub subject_id: i64,
    pub subject_name: String,
    pub block_id: i64,
    pub coefficient: f64,
    /// `round2(coefficient * Σ weighted_mark)` over the subject's tests.
    pub total_mark: f64,
    pub criteria: Vec<CriteriaGroup>,
    pub verdict: Verdict,
    pub groups: Vec<GroupEvidence>,
}

/// Per-block line of the transcript. Blocks are loaded and reported but the
/// system defines no block-level pass/fail rule, so no verdict appears here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockReport {
    pub block_id: i64,
    pub block_name: String,
    pub subject_ids: Vec<i64>,
}

/// The full computed transcript for one student.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub student_id: i64,
    pub student_test_results: Vec<student_test_result::Model>,
    pub tests: Vec<TestReport>,
    pub subjects: Vec<SubjectReport>,
    pub blocks: Vec<BlockReport>,
}
