//! Create-or-update reconciliation of a single group.

use std::fmt;

use tracing::{debug, info};

use crate::desired::DesiredEntity;
use crate::error::{ApplierError, Result};
use crate::remote::{RemoteDirectory, RemoteError, RemoteId};
use crate::store::IdentityStore;

/// Where a remote identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// Pinned by an earlier pass.
    Store,
    /// Found by looking the remote-visible name up on the remote.
    NameLookup,
}

/// What the reconciler did to the remote group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Created,
    Updated,
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
        }
    }
}

/// Outcome of reconciling one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub local_id: String,
    pub remote_id: RemoteId,
    pub action: ReconcileAction,
    /// `None` when the group was just created.
    pub source: Option<IdentitySource>,
}

/// Drives a [`RemoteDirectory`] towards one desired group at a time.
pub struct Reconciler<'r> {
    remote: &'r dyn RemoteDirectory,
}

impl<'r> Reconciler<'r> {
    pub fn new(remote: &'r dyn RemoteDirectory) -> Self {
        Self { remote }
    }

    /// Resolves the remote id for `local_id`: the store first, then the
    /// remote's lookup by `name`.
    pub async fn resolve_identity(
        &self,
        store: &IdentityStore,
        local_id: &str,
        name: &str,
    ) -> std::result::Result<Option<(RemoteId, IdentitySource)>, RemoteError> {
        if let Some(id) = store.get(local_id) {
            return Ok(Some((id.clone(), IdentitySource::Store)));
        }

        debug!(
            local_id,
            name, "No remote id in the store, looking the group up by name"
        );
        let found = self.remote.find_by_name(name).await?;
        Ok(found.map(|id| (id, IdentitySource::NameLookup)))
    }

    /// Creates or updates the remote group for `desired` and pins its id.
    ///
    /// # Errors
    ///
    /// Remote failures propagate unchanged. `ApplierError::IdentityConflict`
    /// is returned, before anything is sent to the remote, when the resolved
    /// group is already pinned to another local identifier.
    pub async fn reconcile_one(
        &self,
        store: &mut IdentityStore,
        desired: &DesiredEntity,
    ) -> Result<Reconciled> {
        let local_id = desired.local_id.as_str();
        let resolved = self
            .resolve_identity(store, local_id, desired.name())
            .await?;

        let Some((remote_id, source)) = resolved else {
            debug!(local_id, "No remote group found, creating it");
            let remote_id = self.remote.create(&desired.attributes).await?;
            info!(local_id, %remote_id, name = desired.name(), "Created group");
            store.set(local_id, remote_id.clone());
            return Ok(Reconciled {
                local_id: local_id.to_string(),
                remote_id,
                action: ReconcileAction::Created,
                source: None,
            });
        };

        if let Some(owner) = store.owner_of(&remote_id)
            && owner != local_id
        {
            return Err(ApplierError::IdentityConflict {
                local_id: local_id.to_string(),
                existing_local_id: owner.to_string(),
                remote_id,
            });
        }

        debug!(local_id, %remote_id, ?source, "Mapped to existing group");
        self.remote.update(&remote_id, &desired.attributes).await?;
        info!(local_id, %remote_id, name = desired.name(), "Updated group");
        store.set(local_id, remote_id.clone());

        Ok(Reconciled {
            local_id: local_id.to_string(),
            remote_id,
            action: ReconcileAction::Updated,
            source: Some(source),
        })
    }
}
