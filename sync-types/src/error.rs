//! Error types for tasksync data model.

use thiserror::Error;

/// Errors raised while parsing or validating model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// Priority string is not one of low/medium/high
    #[error("invalid priority: {0}")]
    InvalidPriority(String),

    /// Filter string is not a recognised filter value
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A required field was empty after trimming
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A remote-assigned id was empty or used the temporary prefix
    #[error("invalid permanent task id: {0:?}")]
    InvalidTaskId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TypesError::EmptyField("title");
        assert_eq!(err.to_string(), "title must not be empty");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypesError>();
    }
}
