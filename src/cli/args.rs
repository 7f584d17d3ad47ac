use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "temple-voice")]
#[command(version)]
#[command(about = "Voice conversations with deities, temples and epics", long_about = None)]
pub struct Cli {
    /// Path to configuration file (replaces the global and local config files)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Talk to an entity from the terminal
    Chat {
        /// Owner (user) id the session belongs to
        #[arg(short, long, env = "TEMPLE_VOICE_OWNER")]
        owner: String,
        /// Deity, temple or epic to talk to
        #[arg(short, long)]
        entity: String,
        /// Send a single message instead of starting an interactive session
        #[arg(short, long)]
        message: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output_format: OutputFormat,
    },
    /// List the built-in entity profiles
    Profiles,
    /// Generate a quiz
    Quiz {
        /// Quiz topic
        #[arg(short, long, default_value = "")]
        topic: String,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output_format: OutputFormat,
    },
    /// Initialize configuration
    Init,
    /// Check configuration and credentials
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON structured output
    Json,
}
