//! One reconciliation pass over the whole desired configuration.

use tracing::info;

use crate::desired::DesiredConfig;
use crate::error::Result;
use crate::reconciler::{ReconcileAction, Reconciled, Reconciler};
use crate::remote::RemoteDirectory;
use crate::settings::ApplierSettings;
use crate::store::IdentityStore;

/// Knobs for a pass, taken from [`ApplierSettings`].
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Write the applied configuration into the store file.
    pub snapshot_config: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            snapshot_config: true,
        }
    }
}

impl From<&ApplierSettings> for RunOptions {
    fn from(settings: &ApplierSettings) -> Self {
        Self {
            snapshot_config: settings.store.snapshot_config,
        }
    }
}

/// Per-group outcomes of a successful pass, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<Reconciled>,
}

impl RunReport {
    pub fn created(&self) -> usize {
        self.count(ReconcileAction::Created)
    }

    pub fn updated(&self) -> usize {
        self.count(ReconcileAction::Updated)
    }

    fn count(&self, action: ReconcileAction) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }
}

/// Owns the identity store for the duration of a pass.
pub struct Runner<'r> {
    remote: &'r dyn RemoteDirectory,
    store: IdentityStore,
    options: RunOptions,
}

impl<'r> Runner<'r> {
    pub fn new(remote: &'r dyn RemoteDirectory, store: IdentityStore, options: RunOptions) -> Self {
        Self {
            remote,
            store,
            options,
        }
    }

    /// Reconciles every group in order, then persists the store.
    ///
    /// The first error ends the pass: later groups are not touched and the
    /// store is not written. Changes already made on the remote stay; running
    /// the pass again is the way to recover.
    pub async fn apply(&mut self, config: &DesiredConfig) -> Result<RunReport> {
        let reconciler = Reconciler::new(self.remote);
        let mut report = RunReport::default();

        for desired in config.groups() {
            let outcome = reconciler.reconcile_one(&mut self.store, desired).await?;
            report.outcomes.push(outcome);
        }

        let snapshot = self.options.snapshot_config.then(|| config.raw());
        self.store.persist(snapshot)?;

        info!(
            groups = config.len(),
            created = report.created(),
            updated = report.updated(),
            "Applied the configuration"
        );
        Ok(report)
    }

    pub fn store(&self) -> &IdentityStore {
        &self.store
    }

    pub fn into_store(self) -> IdentityStore {
        self.store
    }
}
