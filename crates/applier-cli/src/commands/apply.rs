use anyhow::{Context, Result};
use applier_core::{ApplierSettings, DesiredConfig, IdentityStore, RunOptions, Runner};
use applier_discourse::DiscourseClient;
use tracing::info;

use crate::cli::ApplyArgs;
use crate::output::{print_report, print_success};

pub async fn apply(args: &ApplyArgs, settings: &ApplierSettings) -> Result<()> {
    // Never log the API key.
    info!(
        url = %args.remote.url,
        config = %args.config.display(),
        data_dir = %args.data_dir.display(),
        "The applier started"
    );

    let config = DesiredConfig::load(&args.config)?;
    let store = IdentityStore::open_in(&args.data_dir, &settings.store.file_name)?;
    let client = DiscourseClient::from_settings(&args.remote.url, &args.remote.api_key, settings)
        .context("Failed to set up the Discourse client")?;

    let mut runner = Runner::new(&client, store, RunOptions::from(settings));
    let report = runner.apply(&config).await?;

    print_report(&report);
    print_success(&format!(
        "Applied the configuration successfully ({} created, {} updated)",
        report.created(),
        report.updated()
    ));
    Ok(())
}
