//! # Criteria Module
//!
//! Evaluates the two criteria shapes to a verdict plus the evidence used.
//!
//! The flat form (test level) combines per-rule satisfied-flags with a
//! single AND/OR. The grouped form (subject level) evaluates each group's
//! rule chain as a strict left fold: rule 0 seeds the value and every later
//! rule combines with it via its own declared combinator, with no
//! precedence reordering. The subject verdict follows the PASS-tagged group.

use std::collections::HashMap;

use crate::error::{TranscriptError, TranscriptResult};
use crate::rules;
use crate::types::{
    ChainRule, ChainRuleEvidence, CriteriaGroup, ExpectedOutcome, FlatCriteria, FlatOutcome,
    FlatRuleEvidence, GroupEvidence, GroupedOutcome, Logic, RuleType, Verdict,
};

/// The values a subject-level rule chain can compare against.
pub struct SubjectScope<'a> {
    /// `average_mark` per test id, for TEST_SCORE rules.
    pub test_marks: &'a HashMap<i64, f64>,
    /// The subject's aggregated mark, for AVERAGE rules.
    pub total_mark: f64,
}

/// Evaluates a flat criteria document against one value.
///
/// A rule is *satisfied* when its comparison result matches the declared
/// expected outcome, which lets a single rule encode either a pass-condition
/// or a fail-condition. AND requires every rule satisfied; OR requires one.
pub fn evaluate_flat(criteria: &FlatCriteria, actual: f64) -> TranscriptResult<FlatOutcome> {
    if criteria.rules.is_empty() {
        return Err(TranscriptError::InvalidCriteria(
            "flat criteria with empty rule list".into(),
        ));
    }

    let evidence: Vec<FlatRuleEvidence> = criteria
        .rules
        .iter()
        .map(|rule| {
            let holds = rules::evaluate(actual, rule.operator, rule.threshold);
            FlatRuleEvidence {
                operator: rule.operator,
                threshold: rule.threshold,
                expected_outcome: rule.expected_outcome,
                actual,
                satisfied: holds == rule.expected_outcome.as_bool(),
            }
        })
        .collect();

    let passed = match criteria.logic {
        Logic::And => evidence.iter().all(|e| e.satisfied),
        Logic::Or => evidence.iter().any(|e| e.satisfied),
    };

    Ok(FlatOutcome {
        verdict: Verdict::from_bool(passed),
        evidence,
    })
}

/// Evaluates a grouped criteria document within a subject's scope.
///
/// Every group is evaluated and kept as evidence; the verdict is the PASS
/// group's chain value. A document without a PASS group is malformed.
pub fn evaluate_groups(
    groups: &[CriteriaGroup],
    scope: &SubjectScope,
) -> TranscriptResult<GroupedOutcome> {
    if groups.is_empty() {
        return Err(TranscriptError::InvalidCriteria(
            "subject criteria with no rule groups".into(),
        ));
    }

    let mut evaluated = Vec::with_capacity(groups.len());
    for group in groups {
        evaluated.push(evaluate_chain(group, scope)?);
    }

    let pass_value = evaluated
        .iter()
        .find(|g| g.expected_outcome == ExpectedOutcome::Pass)
        .map(|g| g.value)
        .ok_or_else(|| {
            TranscriptError::InvalidCriteria("subject criteria without a PASS group".into())
        })?;

    Ok(GroupedOutcome {
        verdict: Verdict::from_bool(pass_value),
        groups: evaluated,
    })
}

/// Left-folds one group's rule chain into a boolean.
fn evaluate_chain(group: &CriteriaGroup, scope: &SubjectScope) -> TranscriptResult<GroupEvidence> {
    if group.rules.is_empty() {
        return Err(TranscriptError::InvalidCriteria(
            "criteria group with empty rule chain".into(),
        ));
    }

    let mut value = false;
    let mut evidence = Vec::with_capacity(group.rules.len());

    for (i, rule) in group.rules.iter().enumerate() {
        let actual = resolve_actual(rule, scope)?;
        let holds = rules::evaluate(actual, rule.operator, rule.threshold);

        value = match (i, rule.logic) {
            (0, None) => holds,
            (0, Some(_)) => {
                return Err(TranscriptError::InvalidCriteria(
                    "first rule of a chain must not carry a combinator".into(),
                ));
            }
            (_, Some(Logic::And)) => value && holds,
            (_, Some(Logic::Or)) => value || holds,
            (_, None) => {
                return Err(TranscriptError::InvalidCriteria(format!(
                    "chain rule {i} is missing its combinator"
                )));
            }
        };

        evidence.push(ChainRuleEvidence {
            rule_type: rule.rule_type,
            test_id: rule.test_id,
            operator: rule.operator,
            threshold: rule.threshold,
            logic: rule.logic,
            actual,
            holds,
        });
    }

    Ok(GroupEvidence {
        expected_outcome: group.expected_outcome,
        value,
        evidence,
    })
}

/// Resolves the value a chain rule compares against.
///
/// A TEST_SCORE rule naming a test with no result for this student is a
/// data-integrity error, never a silent FAIL.
fn resolve_actual(rule: &ChainRule, scope: &SubjectScope) -> TranscriptResult<f64> {
    match rule.rule_type {
        RuleType::Average => Ok(scope.total_mark),
        RuleType::TestScore => {
            let test_id = rule.test_id.ok_or_else(|| {
                TranscriptError::InvalidCriteria("TEST_SCORE rule without a test_id".into())
            })?;
            scope
                .test_marks
                .get(&test_id)
                .copied()
                .ok_or(TranscriptError::MissingTestResult { test_id })
        }
    }
}
