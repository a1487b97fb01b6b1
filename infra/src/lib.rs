//! Stack definitions for the identity pool, the premium API and its consumers.
//!
//! Stacks are plain Rust values that render to CloudFormation templates;
//! cross-stack wiring goes through named exports.

pub mod app;
pub mod stacks;
pub mod template;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, InfraError>;

#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Duplicate logical id: {0}")]
    DuplicateLogicalId(String),

    #[error("{from} references unknown logical id {target}")]
    UnknownReference { from: String, target: String },

    #[error("Stack {stack} imports {export}, which no earlier stack exports")]
    UnresolvedImport { stack: String, export: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
