//! CLI argument parsing using clap 4.x derive macros

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Annotate JavaScript source with the runtime types V8 observed
///
/// Runs each snippet under a Node.js inspector session with type profiling
/// enabled and renders the collected types inline as HTML.
#[derive(Parser, Debug)]
#[command(name = "typelens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (defaults to ./typelens.toml, then the config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print version information
    #[arg(long)]
    pub version: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a script and print it annotated with observed types
    Annotate {
        /// Script to run; `-` or nothing reads stdin
        file: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Fragment)]
        format: OutputFormat,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the config file path in use
    Path,

    /// Print the effective configuration as TOML
    Show,

    /// Write a default config file to the config directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Annotated HTML fragment only
    Fragment,
    /// Full HTML page with console output
    Page,
    /// JSON object with `annotated` and `logs`
    Json,
}
