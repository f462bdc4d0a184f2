/// Error types for friend-finder operations.
///
/// The matching core only ever produces [`MatchError::InvalidInput`] and
/// [`MatchError::MissingAssessment`]; the remaining variants come from the
/// relationship store and the HTTP layer that sits on top of it.
use thiserror::Error;

/// The main error type for friend-finder operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    /// Malformed vector, unknown metric, empty pool or bad pagination.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of why the input was rejected
        reason: String,
    },

    /// The caller has no current personality result.
    #[error("You need to complete the personality assessment first")]
    MissingAssessment,

    /// A referenced entity does not exist
    #[error("{entity} '{id}' not found")]
    NotFound {
        /// Kind of entity (user, result, session, ...)
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The operation conflicts with existing state
    #[error("Conflict: {reason}")]
    Conflict {
        /// Description of the conflicting state
        reason: String,
    },

    /// Missing, unknown or expired session
    #[error("Invalid or expired session")]
    Unauthorized,

    /// The backing store failed
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl MatchError {
    /// Shorthand for [`MatchError::InvalidInput`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`MatchError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`MatchError::Conflict`].
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }
}

/// Result type alias for friend-finder operations.
pub type MatchResult<T> = Result<T, MatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_assessment_message() {
        assert_eq!(
            MatchError::MissingAssessment.to_string(),
            "You need to complete the personality assessment first"
        );
    }

    #[test]
    fn test_not_found_display() {
        let err = MatchError::not_found("user", 42);
        assert_eq!(err.to_string(), "user '42' not found");
    }
}
