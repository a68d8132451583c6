//! Error types for linkview-core
//!
//! Every failure is scoped to the operation that raised it:
//! - Variable operations (type mismatch, index out of range)
//! - Change propagation (observer faults collected after fan-out)
//! - Axis category manipulation
//! - Session/host calls (unknown handles, length-mismatch aborts)

use crate::graph::NodeId;
use crate::value::VariableKind;
use thiserror::Error;

/// Main error type for linkview operations
#[derive(Error, Debug)]
pub enum LinkviewError {
    /// Variable operation failed, variable unchanged
    #[error("Variable error: {0}")]
    Variable(#[from] VariableError),

    /// One or more observers failed while a change was delivered
    #[error("Change propagation failed: {0}")]
    Propagation(#[from] PropagationError),

    /// Axis operation failed
    #[error("Axis error: {0}")]
    Axis(#[from] AxisError),

    /// Session/host interface errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Invalid histogram binning
    #[error("Binning error: {0}")]
    Binning(#[from] linkview_stats::BinningError),
}

/// Errors related to variable contents
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VariableError {
    /// Value shape does not fit the variable kind
    #[error("Type mismatch in variable '{variable}': expected {expected}, got {actual}")]
    TypeMismatch {
        variable: String,
        expected: VariableKind,
        actual: &'static str,
    },

    /// Case index outside the variable
    #[error("Case index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Operation needs a numeric variable
    #[error("Variable '{variable}' is not numeric")]
    NotNumeric { variable: String },

    /// Operation needs a variable that can be categorized
    #[error("Variable '{variable}' cannot be categorized")]
    NotCategorizable { variable: String },

    /// Bulk replacement must keep the number of cases
    #[error("Length mismatch: variable has {expected} cases, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// A single observer failure
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ObserverError {
    pub message: String,
}

impl ObserverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure of one observer during a broadcast
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverFailure {
    /// Node whose handler failed
    pub node: NodeId,
    /// Label of that node
    pub label: String,
    /// What the handler reported
    pub error: ObserverError,
}

/// Observer failures collected over a complete fan-out
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{} observer(s) failed while delivering a change from node {origin}", failures.len())]
pub struct PropagationError {
    /// Node the change originated from
    pub origin: NodeId,
    /// Every failure, in delivery order
    pub failures: Vec<ObserverFailure>,
}

/// Errors related to axes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AxisError {
    /// Category index outside the category sequence
    #[error("Category {category} out of range ({count} categories)")]
    CategoryOutOfRange { category: usize, count: usize },

    /// Non-finite value range or geometry
    #[error("Invalid axis range: begin {begin}, length {length}")]
    InvalidRange { begin: f64, length: f64 },
}

/// Errors related to the session/host interface
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Dataset handle does not exist
    #[error("Dataset {0} not found")]
    UnknownDataset(usize),

    /// Variable handle does not exist in the dataset
    #[error("Variable {variable} not found in dataset {dataset}")]
    UnknownVariable { dataset: usize, variable: usize },

    /// Caller declined to resolve a length mismatch
    #[error("Variable '{name}' has {len} cases but the dataset has {expected}; aborted")]
    LengthMismatchAborted {
        name: String,
        len: usize,
        expected: usize,
    },

    /// Malformed host input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for linkview operations
pub type LinkviewResult<T> = Result<T, LinkviewError>;

/// Result type alias for variable operations
pub type VariableResult<T> = Result<T, VariableError>;

/// Result type alias for change propagation
pub type PropagationResult<T> = Result<T, PropagationError>;

/// Result type alias for axis operations
pub type AxisResult<T> = Result<T, AxisError>;

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_display() {
        let err = VariableError::TypeMismatch {
            variable: "age".to_string(),
            expected: VariableKind::Numeric,
            actual: "text",
        };
        let msg = err.to_string();
        assert!(msg.contains("age"));
        assert!(msg.contains("numeric"));
        assert!(msg.contains("text"));
    }

    #[test]
    fn test_propagation_error_display() {
        let err = PropagationError {
            origin: NodeId(3),
            failures: vec![ObserverFailure {
                node: NodeId(4),
                label: "plot".to_string(),
                error: ObserverError::new("boom"),
            }],
        };
        assert!(err.to_string().contains("1 observer(s)"));
        assert!(err.to_string().contains("node 3"));
    }

    #[test]
    fn test_linkview_error_from_variable() {
        let err: LinkviewError = VariableError::IndexOutOfRange { index: 9, len: 2 }.into();
        assert!(err.to_string().contains("9"));
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::LengthMismatchAborted {
            name: "x".to_string(),
            len: 3,
            expected: 5,
        };
        assert!(err.to_string().contains("aborted"));
    }
}
