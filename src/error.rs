use thiserror::Error;

use crate::api::ApiError;
use crate::models::ValidationError;
use crate::storage::StorageError;

/// Errors surfaced by the workflow objects (reservation book, treatment
/// panel, technician desk, ...).
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Precondition failure that must stop the user with a blocking alert
    /// instead of an inline field message.
    #[error("{0}")]
    Blocked(ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Local storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Not found: {0}")]
    NotFound(String),
}

impl WorkflowError {
    /// True when the user has to sign in again before retrying.
    pub fn needs_relogin(&self) -> bool {
        match self {
            WorkflowError::NotSignedIn => true,
            WorkflowError::Api(err) => err.is_authorization(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relogin_for_401_and_missing_session() {
        assert!(WorkflowError::from(ApiError::Unauthorized).needs_relogin());
        assert!(WorkflowError::NotSignedIn.needs_relogin());
        assert!(!WorkflowError::from(ApiError::Timeout(30)).needs_relogin());
    }

    #[test]
    fn validation_message_is_passed_through() {
        let err = WorkflowError::from(ValidationError::missing("speciality"));
        assert_eq!(err.to_string(), "speciality is required");
    }
}
