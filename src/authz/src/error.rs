//! Error types for the permission engine

use thiserror::Error;

/// Permission engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Invalid input (unknown level, empty name, malformed document)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Role inheritance would form a cycle
    #[error("Circular inheritance detected: {0}")]
    CircularInheritance(String),

    /// Role not found
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// Document revision conflict
    #[error("Document update conflict: {0}")]
    Conflict(String),

    /// Document not found
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthzError {
    /// Whether the error is caused by caller input and must not be retried
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::CircularInheritance(_))
    }
}

/// Result type for permission operations
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(AuthzError::Validation("bad level".into()).is_validation());
        assert!(AuthzError::CircularInheritance("a -> b -> a".into()).is_validation());
        assert!(!AuthzError::Conflict("role_a".into()).is_validation());
        assert!(!AuthzError::RoleNotFound("role_x".into()).is_validation());
    }

    #[test]
    fn test_error_messages() {
        let err = AuthzError::CircularInheritance("role_a -> role_b -> role_a".into());
        assert_eq!(
            err.to_string(),
            "Circular inheritance detected: role_a -> role_b -> role_a"
        );
    }
}
