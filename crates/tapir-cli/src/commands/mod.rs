//! CLI commands for Tapir.

pub mod resolve;

use clap::{Parser, Subcommand};

/// Tapir - package image dependency resolver
#[derive(Parser, Debug)]
#[command(name = "tapir")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve an image specification to exact package versions
    Resolve(resolve::ResolveArgs),
}
