//! Tunnel policy evaluation
//!
//! A policy is a disjunction of conjunctions:
//! - JSON policy documents of paths, each a list of properties
//! - Dotted attribute lookup into arbitrary nested input documents
//! - String and string-list operators with closed, exhaustively matched sets
//! - Structured evaluation traces for diagnostics

mod condition;
mod decode;
mod document;
mod engine;
mod resolver;

pub use condition::{check, evaluate, Outcome, UnmetReason};
pub use decode::MAX_NESTING_DEPTH;
pub use document::{
    parse_input, parse_policy, Attribute, AttributeType, InputDocument, Operator, Path, Policy,
    Property,
};
pub use engine::{ConditionTrace, Evaluation, PathTrace, PolicyEngine, PolicyEngineBuilder};
pub use resolver::{resolve, Resolved, Shape};
