//! Condition evaluation for policy properties
//!
//! The resolved value's shape picks the operator family:
//! - Single string: `equal`, `not_equal`
//! - String list: `contains`, `not_contains`, `contain_at_least_one`,
//!   `not_contain_at_least_one`
//!
//! Any other combination is unmet. Membership is exact, case-sensitive
//! string equality.

use super::document::{Operator, Property};
use super::resolver::Resolved;
use serde::Serialize;

/// Why a condition did not hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmetReason {
    /// Attribute not present in the input
    Absent,
    /// Attribute is neither a string nor a list of strings
    UnsupportedShape,
    /// Operator does not apply to the resolved shape, or is unknown
    UnsupportedOperator,
    /// Operator needs `value[0]` but the property has no values
    MissingExpectedValue,
    /// Operator applied and the comparison was false
    NotSatisfied,
}

/// Result of checking one property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Met,
    Unmet(UnmetReason),
}

impl Outcome {
    pub fn is_met(&self) -> bool {
        matches!(self, Outcome::Met)
    }

    fn from_bool(met: bool) -> Self {
        if met {
            Outcome::Met
        } else {
            Outcome::Unmet(UnmetReason::NotSatisfied)
        }
    }
}

/// Evaluate a property against a resolved value
pub fn evaluate(resolved: &Resolved<'_>, property: &Property) -> bool {
    check(resolved, property).is_met()
}

/// Evaluate a property and report why it failed
pub fn check(resolved: &Resolved<'_>, property: &Property) -> Outcome {
    match resolved {
        Resolved::Absent => Outcome::Unmet(UnmetReason::Absent),
        Resolved::Unsupported => Outcome::Unmet(UnmetReason::UnsupportedShape),
        Resolved::Text(actual) => check_single(actual, property),
        Resolved::TextList(actual) => check_multiple(actual, property),
    }
}

fn check_single(actual: &str, property: &Property) -> Outcome {
    if !property.operator.is_single_value() {
        return Outcome::Unmet(UnmetReason::UnsupportedOperator);
    }
    let Some(expected) = property.expected() else {
        return Outcome::Unmet(UnmetReason::MissingExpectedValue);
    };

    match &property.operator {
        Operator::Equal => Outcome::from_bool(actual == expected),
        Operator::NotEqual => Outcome::from_bool(actual != expected),
        _ => Outcome::Unmet(UnmetReason::UnsupportedOperator),
    }
}

fn check_multiple(actual: &[&str], property: &Property) -> Outcome {
    let contains = |item: &str| actual.iter().any(|s| *s == item);

    match &property.operator {
        Operator::Contains | Operator::NotContains => {
            let Some(expected) = property.expected() else {
                return Outcome::Unmet(UnmetReason::MissingExpectedValue);
            };
            let present = contains(expected);
            if matches!(property.operator, Operator::Contains) {
                Outcome::from_bool(present)
            } else {
                Outcome::from_bool(!present)
            }
        }
        Operator::ContainAtLeastOne => {
            Outcome::from_bool(property.value.iter().any(|v| contains(v.as_str())))
        }
        // True as soon as one expected value is missing
        Operator::NotContainAtLeastOne => {
            Outcome::from_bool(property.value.iter().any(|v| !contains(v.as_str())))
        }
        Operator::Equal | Operator::NotEqual | Operator::Unknown(_) => {
            Outcome::Unmet(UnmetReason::UnsupportedOperator)
        }
    }
}
