//! CLI argument definitions for the keeper binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

/// Inspect and seed service configuration in a keeper
#[derive(Parser, Debug)]
#[command(name = "keeper")]
#[command(about = "Keeper: flat key/value storage for nested service configuration")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the keeper lives
#[derive(clap::Args, Debug)]
pub struct ConnectionArgs {
    /// Base URL of the keeper service
    #[arg(long, global = true, default_value = "http://localhost:59890", env = "KEEPER_URL")]
    pub url: Url,

    /// Key all paths are relative to
    #[arg(short, long, global = true, default_value = "", env = "KEEPER_BASE_PATH")]
    pub base_path: String,

    /// Request timeout in seconds
    #[arg(short, long, global = true, default_value_t = 10, env = "KEEPER_TIMEOUT")]
    pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the keeper answers
    Ping,
    /// List keys at or below a path
    Keys(KeysArgs),
    /// Show the values at or below a path
    Get(GetArgs),
    /// Store a single value
    Put(PutArgs),
    /// Seed configuration from a JSON document
    Push(PushArgs),
}

/// Arguments for the keys command
#[derive(clap::Args, Debug)]
pub struct KeysArgs {
    /// Path relative to the base path
    #[arg(default_value = "")]
    pub path: String,
}

/// Arguments for the get command
#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Path relative to the base path
    #[arg(default_value = "")]
    pub path: String,

    /// Print the decoded tree as JSON instead of a key/value table
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the put command
#[derive(clap::Args, Debug)]
pub struct PutArgs {
    /// Path relative to the base path
    pub path: String,

    /// Value to store
    pub value: String,
}

/// Arguments for the push command
#[derive(clap::Args, Debug)]
pub struct PushArgs {
    /// JSON document holding the configuration
    pub file: PathBuf,

    /// Replace values already in the keeper
    #[arg(long)]
    pub overwrite: bool,
}
