//! CLI argument parsing using clap v4

use clap::{Parser, Subcommand};

use crate::catalog::CharacteristicCategory;
use crate::validation::StudyLevel;

/// persona-forge - synthetic research personas with bias and readiness validation
///
/// Generates diverse persona batches from a characteristic catalog, checks
/// them for stereotypes, demographic skew and sycophancy, and certifies
/// them for a study level.
#[derive(Parser, Debug)]
#[command(name = "persona-forge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a validated persona batch
    Generate {
        /// Path to configuration file
        #[arg(short, long, env = "PERSONA_FORGE_CONFIG")]
        config: Option<String>,

        /// Personas per batch
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Diversity the enforcer aims for (0-1)
        #[arg(long)]
        diversity_target: Option<f64>,

        /// Advisory diversity floor (0-1)
        #[arg(long)]
        quality_threshold: Option<f64>,

        /// Generation attempts before giving up
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Study level for readiness validation
        #[arg(short, long)]
        level: Option<StudyLevel>,

        /// RNG seed for reproducible batches
        #[arg(long)]
        seed: Option<u64>,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate an existing batch from a JSON file
    Validate {
        /// JSON array of personas
        #[arg(short, long)]
        input: String,

        /// Study level for readiness validation
        #[arg(short, long)]
        level: Option<StudyLevel>,

        /// Path to configuration file
        #[arg(short, long, env = "PERSONA_FORGE_CONFIG")]
        config: Option<String>,

        /// Print the analysis and assessment as JSON
        #[arg(long)]
        json: bool,
    },

    /// List characteristic definitions
    Catalog {
        /// Only this category
        #[arg(long)]
        category: Option<CharacteristicCategory>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Display version and build information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}
