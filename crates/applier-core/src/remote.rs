//! The remote directory the reconciler drives.
//!
//! Implementations talk to the actual platform (see the `applier-discourse`
//! crate) or keep everything in memory for tests ([`crate::InMemoryDirectory`]).

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::desired::GroupAttributes;

/// Identifier assigned to a group by the remote system.
///
/// Discourse hands out numbers, other platforms use strings; both are kept
/// exactly as received so the store round-trips them unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    Numeric(u64),
    Text(String),
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<u64> for RemoteId {
    fn from(id: u64) -> Self {
        Self::Numeric(id)
    }
}

impl From<&str> for RemoteId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for RemoteId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// Failures reported by a [`RemoteDirectory`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The request never produced a response.
    #[error("Remote request failed: {message}")]
    Transport { message: String },

    /// The remote answered with anything but success.
    #[error("Remote rejected the request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// The response arrived but did not have the expected shape.
    #[error("Unexpected response from remote: {message}")]
    UnexpectedResponse { message: String },

    /// The remote endpoint itself is unusable.
    #[error("Invalid remote endpoint: {message}")]
    InvalidEndpoint { message: String },
}

impl RemoteError {
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
        }
    }

    /// HTTP status of a rejection, if the remote answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Lookup, create and update operations against the remote group collection.
///
/// None of the operations are retried by the reconciler; an implementation
/// that wants retries must do them itself.
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    /// Finds the id of the group named `name`.
    ///
    /// When several groups match, the first one in the remote's own listing
    /// order wins. Listings are not paginated.
    async fn find_by_name(&self, name: &str) -> Result<Option<RemoteId>, RemoteError>;

    /// Lists the usernames of the members of the group named `group_name`.
    async fn list_members(&self, group_name: &str) -> Result<Vec<String>, RemoteError>;

    /// Creates a group and returns the id the remote assigned to it.
    async fn create(&self, attributes: &GroupAttributes) -> Result<RemoteId, RemoteError>;

    /// Overwrites the attributes of an existing group.
    async fn update(
        &self,
        id: &RemoteId,
        attributes: &GroupAttributes,
    ) -> Result<(), RemoteError>;
}
