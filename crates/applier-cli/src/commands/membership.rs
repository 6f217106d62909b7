use anyhow::{Context, Result};
use applier_core::{ApplierSettings, check_membership};
use applier_discourse::DiscourseClient;

use crate::cli::UserInGroupArgs;
use crate::output::print_success;

pub async fn user_in_group(args: &UserInGroupArgs, settings: &ApplierSettings) -> Result<()> {
    let client = DiscourseClient::from_settings(&args.remote.url, &args.remote.api_key, settings)
        .context("Failed to set up the Discourse client")?;

    let status = check_membership(&client, &args.user, &args.group).await?;
    status.ensure_member(&args.user, &args.group)?;

    print_success(&format!(
        "User {} is a member of group {}",
        args.user, args.group
    ));
    Ok(())
}
