//! A [`RemoteDirectory`] that lives in process memory.
//!
//! Ids are handed out sequentially, groups are listed in creation order and
//! every call is logged, which makes it suitable for checking what a pass
//! sent to the remote.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::desired::GroupAttributes;
use crate::remote::{RemoteDirectory, RemoteError, RemoteId};

/// One call received by an [`InMemoryDirectory`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    FindByName { name: String },
    ListMembers { group_name: String },
    Create { attributes: GroupAttributes },
    Update { id: RemoteId, attributes: GroupAttributes },
}

#[derive(Debug, Default)]
struct DirectoryState {
    groups: Vec<(RemoteId, GroupAttributes)>,
    members: HashMap<RemoteId, Vec<String>>,
    next_id: u64,
    failing: HashSet<String>,
    calls: Vec<RemoteCall>,
}

impl DirectoryState {
    fn allocate_id(&mut self) -> RemoteId {
        self.next_id += 1;
        RemoteId::Numeric(self.next_id)
    }

    fn check(&self, name: &str) -> Result<(), RemoteError> {
        if self.failing.contains(name) {
            return Err(RemoteError::rejected(
                500,
                format!("injected failure for `{name}`"),
            ));
        }
        Ok(())
    }

    fn add_members(&mut self, id: &RemoteId, attributes: &GroupAttributes) {
        let usernames = attributes.member_usernames();
        if usernames.is_empty() {
            return;
        }
        let members = self.members.entry(id.clone()).or_default();
        for username in usernames {
            if !members.contains(&username) {
                members.push(username);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a group as if it had been created outside of the applier.
    /// Not logged as a call.
    pub fn seed_group(&self, attributes: GroupAttributes) -> RemoteId {
        let mut state = self.state();
        let id = state.allocate_id();
        state.add_members(&id, &attributes);
        state.groups.push((id.clone(), attributes));
        id
    }

    pub fn add_member(&self, id: &RemoteId, username: impl Into<String>) {
        self.state()
            .members
            .entry(id.clone())
            .or_default()
            .push(username.into());
    }

    /// Makes every call that names `name` fail with a rejection.
    pub fn fail_on(&self, name: impl Into<String>) {
        self.state().failing.insert(name.into());
    }

    pub fn group(&self, id: &RemoteId) -> Option<GroupAttributes> {
        self.state()
            .groups
            .iter()
            .find(|(group_id, _)| group_id == id)
            .map(|(_, attributes)| attributes.clone())
    }

    pub fn group_count(&self) -> usize {
        self.state().groups.len()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn creates(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, RemoteCall::Create { .. }))
            .count()
    }

    pub fn updates(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, RemoteCall::Update { .. }))
            .count()
    }
}

#[async_trait]
impl RemoteDirectory for InMemoryDirectory {
    async fn find_by_name(&self, name: &str) -> Result<Option<RemoteId>, RemoteError> {
        let mut state = self.state();
        state.calls.push(RemoteCall::FindByName {
            name: name.to_string(),
        });
        state.check(name)?;
        Ok(state
            .groups
            .iter()
            .find(|(_, attributes)| attributes.name == name)
            .map(|(id, _)| id.clone()))
    }

    async fn list_members(&self, group_name: &str) -> Result<Vec<String>, RemoteError> {
        let mut state = self.state();
        state.calls.push(RemoteCall::ListMembers {
            group_name: group_name.to_string(),
        });
        state.check(group_name)?;
        let id = state
            .groups
            .iter()
            .find(|(_, attributes)| attributes.name == group_name)
            .map(|(id, _)| id.clone())
            .ok_or_else(|| RemoteError::rejected(404, format!("group `{group_name}` not found")))?;
        Ok(state.members.get(&id).cloned().unwrap_or_default())
    }

    async fn create(&self, attributes: &GroupAttributes) -> Result<RemoteId, RemoteError> {
        let mut state = self.state();
        state.calls.push(RemoteCall::Create {
            attributes: attributes.clone(),
        });
        state.check(&attributes.name)?;
        if state.groups.iter().any(|(_, g)| g.name == attributes.name) {
            return Err(RemoteError::rejected(
                422,
                format!("Name `{}` has already been taken", attributes.name),
            ));
        }
        let id = state.allocate_id();
        state.add_members(&id, attributes);
        state.groups.push((id.clone(), attributes.clone()));
        Ok(id)
    }

    async fn update(
        &self,
        id: &RemoteId,
        attributes: &GroupAttributes,
    ) -> Result<(), RemoteError> {
        let mut state = self.state();
        state.calls.push(RemoteCall::Update {
            id: id.clone(),
            attributes: attributes.clone(),
        });
        state.check(&attributes.name)?;
        let index = state
            .groups
            .iter()
            .position(|(group_id, _)| group_id == id)
            .ok_or_else(|| RemoteError::rejected(404, format!("group {id} not found")))?;
        state.groups[index].1 = attributes.clone();
        state.add_members(id, attributes);
        Ok(())
    }
}
