mod cli;
mod commands;
mod logging;
mod output;

use anyhow::{Context, Result};
use applier_core::ApplierError;
use applier_core::settings::loader::load_settings;
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;

/// Exit status for a failed membership assertion, distinct from other failures.
const EXIT_NOT_A_MEMBER: i32 = 2;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(exit_code(&e));
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref()).context("Failed to load settings")?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.logging.level.clone());
    logging::init_tracing_with_level(&level);

    match &cli.command {
        Commands::Apply(args) => commands::apply::apply(args, &settings).await?,
        Commands::UserInGroup(args) => {
            commands::membership::user_in_group(args, &settings).await?;
        }
    }

    Ok(())
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ApplierError>() {
        Some(e) if e.is_membership_assertion() => EXIT_NOT_A_MEMBER,
        _ => 1,
    }
}
