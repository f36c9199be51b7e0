//! # Tunnel Policy - Declarative Access Policy Evaluation
//!
//! `tunnel-policy` decides whether a JSON input document satisfies a JSON
//! policy. A policy is a list of paths; a path is a list of properties. The
//! policy holds when every property of at least one path holds.
//!
//! - **Dotted attributes** address nested input values (`device.os.name`)
//! - **String operators**: `equal`, `not_equal`
//! - **List operators**: `contains`, `not_contains`, `contain_at_least_one`,
//!   `not_contain_at_least_one`
//! - **Fail closed**: malformed documents, unknown operators and unsupported
//!   value shapes never match
//! - **Stateless**: every call decodes, evaluates and discards
//!
//! ## Quick Start
//!
//! ```rust
//! use tunnel_policy::validate_tunnel_policy;
//!
//! let policy = r#"[
//!     [{"attribute": {"name": "user.role", "type": "string"},
//!       "operator": "equal", "value": ["admin"]}],
//!     [{"attribute": {"name": "user.groups", "type": "list"},
//!       "operator": "contain_at_least_one", "value": ["ops", "sre"]}]
//! ]"#;
//!
//! assert!(validate_tunnel_policy(policy, r#"{"user": {"role": "admin"}}"#));
//! assert!(validate_tunnel_policy(policy, r#"{"user": {"groups": ["sre"]}}"#));
//! assert!(!validate_tunnel_policy(policy, r#"{"user": {"groups": ["dev"]}}"#));
//! ```
//!
//! ## Diagnostics
//!
//! ```rust
//! use tunnel_policy::{PolicyEngine, Outcome, UnmetReason};
//!
//! # fn main() -> tunnel_policy::Result<()> {
//! let engine = PolicyEngine::builder().short_circuit(false).build();
//! let policy = r#"[[{"attribute": {"name": "age", "type": "string"},
//!                    "operator": "equal", "value": ["30"]}]]"#;
//!
//! let evaluation = engine.explain(policy, r#"{"age": 30}"#)?;
//! assert!(!evaluation.matched);
//! assert_eq!(
//!     evaluation.paths[0].conditions[0].outcome,
//!     Outcome::Unmet(UnmetReason::UnsupportedShape)
//! );
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod policy;

pub use config::EngineConfig;
pub use error::{PolicyError, Result};
pub use policy::{
    check, evaluate, parse_input, parse_policy, resolve, Attribute, AttributeType,
    ConditionTrace, Evaluation, InputDocument, Operator, Outcome, Path, PathTrace, Policy,
    PolicyEngine, PolicyEngineBuilder, Property, Resolved, Shape, UnmetReason,
    MAX_NESTING_DEPTH,
};

/// Decide whether `input` satisfies `policy` with the default engine
///
/// Never fails: a malformed payload of either kind yields `false`.
pub fn validate_tunnel_policy(policy: impl AsRef<[u8]>, input: impl AsRef<[u8]>) -> bool {
    PolicyEngine::default().validate(policy, input)
}
