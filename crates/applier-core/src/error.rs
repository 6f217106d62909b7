//! Error types for a reconciliation pass.

use std::path::PathBuf;

use crate::remote::{RemoteError, RemoteId};

/// Errors that can abort a reconciliation pass or a membership check.
#[derive(Debug, thiserror::Error)]
pub enum ApplierError {
    /// The directory that should hold the identity store does not exist.
    #[error("Data directory {} does not exist", .directory.display())]
    Precondition {
        /// The missing directory.
        directory: PathBuf,
    },

    /// The desired configuration or the settings could not be used.
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// What was wrong with it.
        message: String,
    },

    /// The remote directory failed or rejected a request.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Reading or writing the identity store failed.
    #[error("Identity store {}: {message}", .path.display())]
    Store {
        /// Path of the store file.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Two local identifiers claim the same remote group.
    #[error(
        "Remote group {remote_id} resolved for `{local_id}` is already mapped to `{existing_local_id}`"
    )]
    IdentityConflict {
        /// The local identifier being reconciled.
        local_id: String,
        /// The local identifier that already owns the remote id.
        existing_local_id: String,
        /// The contested remote identifier.
        remote_id: RemoteId,
    },

    /// The asserted user is not a member of the group, or the group is missing.
    #[error("{message}")]
    MembershipAssertion {
        /// Human-readable reason.
        message: String,
    },
}

impl ApplierError {
    /// Creates a new `Precondition` error.
    #[must_use]
    pub fn precondition(directory: impl Into<PathBuf>) -> Self {
        Self::Precondition {
            directory: directory.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Store` error.
    #[must_use]
    pub fn store(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Store {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `MembershipAssertion` error.
    #[must_use]
    pub fn membership(message: impl Into<String>) -> Self {
        Self::MembershipAssertion {
            message: message.into(),
        }
    }

    /// Returns `true` if the remote directory caused this error.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Returns `true` if this is a failed membership assertion.
    #[must_use]
    pub fn is_membership_assertion(&self) -> bool {
        matches!(self, Self::MembershipAssertion { .. })
    }

    /// Returns `true` if two local identifiers resolved to one remote group.
    #[must_use]
    pub fn is_identity_conflict(&self) -> bool {
        matches!(self, Self::IdentityConflict { .. })
    }
}

/// Result type for applier operations.
pub type Result<T> = std::result::Result<T, ApplierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_names_directory() {
        let err = ApplierError::precondition("/var/lib/discourse/api");
        assert_eq!(
            err.to_string(),
            "Data directory /var/lib/discourse/api does not exist"
        );
    }

    #[test]
    fn remote_errors_are_transparent() {
        let err: ApplierError = RemoteError::rejected(422, "name taken").into();
        assert!(err.is_remote());
        assert_eq!(err.to_string(), "Remote rejected the request (HTTP 422): name taken");
    }

    #[test]
    fn conflict_mentions_both_local_ids() {
        let err = ApplierError::IdentityConflict {
            local_id: "students".into(),
            existing_local_id: "alumni".into(),
            remote_id: RemoteId::from(41),
        };
        let msg = err.to_string();
        assert!(err.is_identity_conflict());
        assert!(msg.contains("students"));
        assert!(msg.contains("alumni"));
        assert!(msg.contains("41"));
    }
}
