//! # Rules Module
//!
//! The atomic rule evaluator and the shared rounding convention. Both are
//! pure functions; everything else in the engine is built on top of them.

use crate::types::Operator;

/// Evaluates one atomic comparison `actual OPERATOR threshold`.
///
/// # Example
///
/// ```
/// use transcript::rules::evaluate;
/// use transcript::types::Operator;
///
/// assert!(evaluate(80.0, Operator::Gte, 60.0));
/// assert!(!evaluate(59.9, Operator::Gte, 60.0));
/// ```
pub fn evaluate(actual: f64, operator: Operator, threshold: f64) -> bool {
    match operator {
        Operator::Eq => actual == threshold,
        Operator::Gt => actual > threshold,
        Operator::Gte => actual >= threshold,
        Operator::Lt => actual < threshold,
        Operator::Lte => actual <= threshold,
    }
}

/// Rounds to 2 decimal places, half-up on the scaled value.
///
/// Marks are non-negative, so `f64::round` (half away from zero) is half-up
/// here. The same convention applies at every level of the hierarchy.
///
/// # Example
///
/// ```
/// use transcript::rules::round2;
///
/// assert_eq!(round2(80.0 * 0.5), 40.0);
/// assert_eq!(round2(0.125), 0.13);
/// ```
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_gte() {
        assert!(evaluate(60.0, Operator::Gte, 60.0));
        assert!(evaluate(60.1, Operator::Gte, 60.0));
        assert!(!evaluate(59.99, Operator::Gte, 60.0));
    }

    #[test]
    fn test_evaluate_gt() {
        assert!(evaluate(60.1, Operator::Gt, 60.0));
        assert!(!evaluate(60.0, Operator::Gt, 60.0));
    }

    #[test]
    fn test_evaluate_lt() {
        assert!(evaluate(59.9, Operator::Lt, 60.0));
        assert!(!evaluate(60.0, Operator::Lt, 60.0));
    }

    #[test]
    fn test_evaluate_lte() {
        assert!(evaluate(60.0, Operator::Lte, 60.0));
        assert!(evaluate(59.9, Operator::Lte, 60.0));
        assert!(!evaluate(60.1, Operator::Lte, 60.0));
    }

    #[test]
    fn test_evaluate_eq() {
        assert!(evaluate(42.0, Operator::Eq, 42.0));
        assert!(!evaluate(42.0, Operator::Eq, 42.5));
    }

    /// Unknown operator strings never reach `evaluate`: the closed enum
    /// rejects them at deserialization time.
    #[test]
    fn test_unknown_operator_fails_parse() {
        let err = serde_json::from_str::<Operator>("\"BETWEEN\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_round2_exact() {
        assert_eq!(round2(40.0), 40.0);
        assert_eq!(round2(39.999), 40.0);
    }

    /// 0.125 is exactly representable in binary, so this pins the half-up
    /// (away from zero) behavior without float-literal noise.
    #[test]
    fn test_round2_half_up() {
        assert_eq!(round2(0.125), 0.13);
    }

    #[test]
    fn test_round2_truncates_down_below_half() {
        assert_eq!(round2(2.344), 2.34);
        assert_eq!(round2(2.346), 2.35);
    }

    /// Same inputs, same output: the convention is stable across calls.
    #[test]
    fn test_round2_idempotent() {
        let v = round2(13.374999);
        assert_eq!(v, round2(v));
    }
}
