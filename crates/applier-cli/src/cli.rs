use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "applier")]
#[command(about = "Applier — keep Discourse groups in line with a declarative configuration")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level: trace, debug, info, warn, error (overrides settings)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// TOML settings file
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or update every group of a configuration file
    Apply(ApplyArgs),
    /// Fail unless a user is a member of a group
    UserInGroup(UserInGroupArgs),
}

#[derive(clap::Args)]
pub struct RemoteArgs {
    /// URL of the Discourse instance
    pub url: String,
    /// Discourse API key
    #[arg(long, env = "DISCOURSE_API_KEY", hide_env_values = true)]
    pub api_key: String,
}

#[derive(clap::Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,
    /// Path to the JSON configuration file
    pub config: PathBuf,
    /// Directory holding the identity store; must already exist
    pub data_dir: PathBuf,
}

#[derive(clap::Args)]
pub struct UserInGroupArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,
    /// Discourse username
    pub user: String,
    /// Discourse group name
    pub group: String,
}
