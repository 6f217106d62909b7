//! Checking that a user belongs to a group.

use crate::error::{ApplierError, Result};
use crate::remote::{RemoteDirectory, RemoteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    Member,
    NotMember,
    GroupNotFound,
}

impl MembershipStatus {
    /// Turns anything but `Member` into a `MembershipAssertion` error.
    pub fn ensure_member(self, username: &str, group: &str) -> Result<()> {
        match self {
            Self::Member => Ok(()),
            Self::NotMember => Err(ApplierError::membership(format!(
                "User {username} is not a member of group {group}"
            ))),
            Self::GroupNotFound => Err(ApplierError::membership(format!(
                "Group with name {group} does not exist"
            ))),
        }
    }
}

/// Looks `group` up by name and checks whether `username` is among its members.
pub async fn check_membership(
    remote: &dyn RemoteDirectory,
    username: &str,
    group: &str,
) -> std::result::Result<MembershipStatus, RemoteError> {
    if remote.find_by_name(group).await?.is_none() {
        return Ok(MembershipStatus::GroupNotFound);
    }
    let members = remote.list_members(group).await?;
    if members.iter().any(|member| member == username) {
        Ok(MembershipStatus::Member)
    } else {
        Ok(MembershipStatus::NotMember)
    }
}
