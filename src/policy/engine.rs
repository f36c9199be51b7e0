//! Policy evaluation engine
//!
//! Decides whether an input document satisfies a policy:
//! - OR over paths, AND over the properties of a path
//! - Zero paths never match; an empty path always matches
//! - Malformed documents never match and never raise
//! - Optional structured trace of every evaluated condition

use super::condition::{self, Outcome};
use super::document::{parse_input, parse_policy, Operator, Path, Policy, Property};
use super::resolver::{resolve, Shape};
use crate::config::EngineConfig;
use crate::error::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

/// Policy evaluation engine
///
/// Holds only immutable settings; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    config: EngineConfig,
}

impl PolicyEngine {
    /// Create a new policy engine with the given configuration
    pub fn new(config: EngineConfig) -> Self {
        PolicyEngine { config }
    }

    /// Start building an engine
    pub fn builder() -> PolicyEngineBuilder {
        PolicyEngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decide whether `input` satisfies `policy`
    ///
    /// Both payloads are JSON. Any decode failure yields `false`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tunnel_policy::PolicyEngine;
    ///
    /// let engine = PolicyEngine::default();
    /// let policy = r#"[[{"attribute":{"name":"role","type":"string"},"operator":"equal","value":["admin"]}]]"#;
    ///
    /// assert!(engine.validate(policy, r#"{"role":"admin"}"#));
    /// assert!(!engine.validate(policy, r#"{"role":"user"}"#));
    /// assert!(!engine.validate("[[", r#"{"role":"admin"}"#));
    /// ```
    pub fn validate(&self, policy: impl AsRef<[u8]>, input: impl AsRef<[u8]>) -> bool {
        let policy = match parse_policy(policy.as_ref()) {
            Ok(policy) => policy,
            Err(e) => {
                debug!("Rejecting: {}", e);
                return false;
            }
        };
        let input = match parse_input(input.as_ref()) {
            Ok(input) => input,
            Err(e) => {
                debug!("Rejecting: {}", e);
                return false;
            }
        };

        self.evaluate(&policy, &input)
    }

    /// Decide whether an already decoded document satisfies `policy`
    pub fn evaluate(&self, policy: &Policy, input: &Value) -> bool {
        for (index, path) in policy.iter().enumerate() {
            if self.path_holds(path, input) {
                debug!("Path {} satisfied", index);
                return true;
            }
        }
        false
    }

    /// Evaluate and return a trace of every evaluated condition
    ///
    /// Unlike [`validate`](Self::validate), decode failures are returned
    /// as errors.
    pub fn explain(&self, policy: impl AsRef<[u8]>, input: impl AsRef<[u8]>) -> Result<Evaluation> {
        let policy = parse_policy(policy.as_ref())?;
        let input = parse_input(input.as_ref())?;
        Ok(self.explain_decoded(&policy, &input))
    }

    /// Trace evaluation of already decoded documents
    pub fn explain_decoded(&self, policy: &Policy, input: &Value) -> Evaluation {
        let mut evaluation = Evaluation {
            matched: false,
            matched_path: None,
            paths: Vec::with_capacity(policy.len()),
        };

        for (index, path) in policy.iter().enumerate() {
            let path_trace = self.trace_path(index, path, input);
            let satisfied = path_trace.satisfied;
            evaluation.paths.push(path_trace);

            if satisfied {
                evaluation.matched = true;
                evaluation.matched_path = Some(index);
                break;
            }
        }

        evaluation
    }

    fn path_holds(&self, path: &Path, input: &Value) -> bool {
        self.walk_path(path, input, |_| {})
    }

    fn trace_path(&self, index: usize, path: &Path, input: &Value) -> PathTrace {
        let mut conditions = Vec::with_capacity(path.len());
        let satisfied = self.walk_path(path, input, |condition| conditions.push(condition));

        PathTrace {
            index,
            satisfied,
            conditions,
        }
    }

    /// Check the properties of `path` in order, handing each result to
    /// `observe`. Returns whether every checked property was met.
    fn walk_path<F>(&self, path: &Path, input: &Value, mut observe: F) -> bool
    where
        F: FnMut(ConditionTrace),
    {
        let mut satisfied = true;

        for property in path.iter() {
            let condition = check_property(property, input);
            let met = condition.outcome.is_met();
            observe(condition);

            if !met {
                satisfied = false;
                if self.config.short_circuit {
                    break;
                }
            }
        }

        satisfied
    }
}

fn check_property(property: &Property, input: &Value) -> ConditionTrace {
    let resolved = resolve(input, &property.attribute.name);
    let outcome = condition::check(&resolved, property);
    trace!(
        attribute = %property.attribute.name,
        operator = %property.operator,
        met = outcome.is_met(),
        "Evaluated property"
    );

    ConditionTrace {
        attribute: property.attribute.name.clone(),
        operator: property.operator.clone(),
        shape: resolved.shape(),
        outcome,
    }
}

/// Builder for customizing a [`PolicyEngine`]
///
/// # Examples
///
/// ```
/// use tunnel_policy::PolicyEngineBuilder;
///
/// let engine = PolicyEngineBuilder::new().short_circuit(false).build();
/// assert!(!engine.config().short_circuit);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PolicyEngineBuilder {
    config: EngineConfig,
}

impl PolicyEngineBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        PolicyEngineBuilder::default()
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Stop evaluating a path at its first unmet property
    pub fn short_circuit(mut self, enabled: bool) -> Self {
        self.config.short_circuit = enabled;
        self
    }

    /// Build the engine
    pub fn build(self) -> PolicyEngine {
        PolicyEngine::new(self.config)
    }
}

/// Trace of a whole evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    /// Overall decision
    pub matched: bool,
    /// Index of the first satisfied path
    pub matched_path: Option<usize>,
    /// Paths evaluated, in order, up to and including the matching one
    pub paths: Vec<PathTrace>,
}

/// Trace of one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathTrace {
    pub index: usize,
    pub satisfied: bool,
    pub conditions: Vec<ConditionTrace>,
}

/// Trace of one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionTrace {
    pub attribute: String,
    pub operator: Operator,
    pub shape: Shape,
    #[serde(flatten)]
    pub outcome: Outcome,
}
