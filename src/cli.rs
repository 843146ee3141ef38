use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "voxlink")]
#[command(author, version, about = "Voice-over sample catalog with share links")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Load the catalog source once and report what was found
    CheckCatalog {
        /// CSV URL or path (uses the configured source if not specified)
        source: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the share links for one catalog entry
    ShareLink {
        /// Entry identifier
        #[arg(required = true)]
        id: String,

        /// Only print the name-based link
        #[arg(long)]
        legacy_name: bool,
    },

    /// Generate a bcrypt hash of the shared secret
    HashPassword {
        /// Secret to hash
        password: String,
    },

    /// Display version information
    Version,
}
