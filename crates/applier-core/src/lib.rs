//! Declarative group reconciliation.
//!
//! A desired configuration names every group under a stable local identifier.
//! The [`Runner`] walks that configuration in order and, through the
//! [`Reconciler`], creates or updates each group on a [`RemoteDirectory`].
//! The [`IdentityStore`] pins local identifiers to remote identifiers so a
//! group keeps its identity when its remote-visible name changes.
//!
//! Known consistency gap: no transaction spans "mutate remote" and "persist
//! store". A crash after a successful create but before the store is written
//! is recovered on the next run by the name lookup, unless the group was
//! renamed remotely in between, in which case a duplicate group is created.

pub mod desired;
pub mod error;
pub mod membership;
pub mod memory;
pub mod reconciler;
pub mod remote;
pub mod runner;
pub mod settings;
pub mod store;

pub use desired::{DesiredConfig, DesiredEntity, GroupAttributes, MemberList};
pub use error::{ApplierError, Result};
pub use membership::{MembershipStatus, check_membership};
pub use memory::{InMemoryDirectory, RemoteCall};
pub use reconciler::{IdentitySource, ReconcileAction, Reconciled, Reconciler};
pub use remote::{RemoteDirectory, RemoteError, RemoteId};
pub use runner::{RunOptions, RunReport, Runner};
pub use settings::ApplierSettings;
pub use store::IdentityStore;
