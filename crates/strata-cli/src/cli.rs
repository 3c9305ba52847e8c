//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Strata - hierarchical layered configuration
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file with [backend] and [manager] tables
    #[arg(short, long, global = true, env = "STRATA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use a directory-tree store rooted at this directory
    #[arg(short, long, global = true, env = "STRATA_STORE")]
    pub store: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Resolve a path through its full hierarchy
    ///
    /// Examples:
    ///   strata get app:prod           # app merged with app:prod
    ///   strata get app:eu+us --json   # every alternation candidate, as JSON
    Get {
        /// Configuration path
        path: String,

        /// Only the layer stored exactly at the path
        #[arg(long)]
        exact: bool,

        /// Output as JSON instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// Show the one layer stored exactly at a path
    GetOne {
        /// Configuration path
        path: String,

        /// Print the stored text and its attributes instead of decoding
        #[arg(long, conflicts_with = "json")]
        source: bool,

        /// Output as JSON instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// Store a layer
    ///
    /// Examples:
    ///   strata set app 'db: {host: h1}'
    ///   strata set app:prod --file prod.yaml
    Set {
        /// Configuration path
        path: String,

        /// Layer text
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        value: Option<String>,

        /// Read the layer text from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// User recorded on versioned writes
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Delete every layer matching a pattern
    Delete {
        /// Path pattern, `*` matches any run of characters
        pattern: String,
    },

    /// List stored paths
    Keys {
        /// Path pattern
        #[arg(default_value = "*")]
        pattern: String,
    },

    /// Show stored paths as a nested tree
    Tree {
        /// Path pattern
        #[arg(default_value = "*")]
        pattern: String,
    },

    /// Import a directory of layer files
    ///
    /// Directories become path segments; `<dir>/app/prod.yaml` is stored at
    /// `app`, or at `app:prod` with --file-as-path.
    Import {
        /// Directory to import
        dir: PathBuf,

        /// Path prefix for every imported layer
        #[arg(long)]
        root: Option<String>,

        /// Use each file stem as the last path segment
        #[arg(long)]
        file_as_path: bool,

        /// Extension of layer files
        #[arg(long, default_value = "yaml")]
        ext: String,

        /// Directory names or file stems to skip
        #[arg(short = 'x', long)]
        exclude: Vec<String>,
    },
}
