//! CLI module for the Workflow Catalog
//!
//! Provides subcommands for running the catalog:
//! - `serve`: run the REST API server
//! - `migrate`: apply pending database migrations and exit

pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};

/// Workflow Catalog - versioned workflow storage organized into buckets
#[derive(Parser)]
#[command(name = "workflow-catalog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the REST API server
    Serve,

    /// Apply pending database migrations and exit
    Migrate,
}
