//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::domain::OrphanPolicy;

/// Catalog category hierarchies: build sorted trees from flat records, flatten them into breadcrumb rows
#[derive(Parser, Debug)]
#[command(name = "cattree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Project directory for local config (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    /// Categories with a missing parent: drop, promote or reject
    #[arg(long, global = true)]
    pub orphans: Option<OrphanPolicy>,

    /// Breadcrumb separator for paths
    #[arg(long, global = true)]
    pub separator: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show categories as a tree
    Tree {
        /// Category JSON file (- for stdin)
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Only show descendants of this category id
        #[arg(long)]
        under: Option<String>,
        /// Print nested JSON instead of a tree drawing
        #[arg(long)]
        json: bool,
    },

    /// List categories depth-first with level, parent and path
    Flatten {
        /// Category JSON file (- for stdin)
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Print JSON rows
        #[arg(long)]
        json: bool,
    },

    /// Show one category with its subtree
    Find {
        /// Category JSON file (- for stdin)
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Category id
        id: String,
    },

    /// Show the ancestor breadcrumb of a category
    Ancestors {
        /// Category JSON file (- for stdin)
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Category id
        id: String,
    },

    /// List parent choices for a category form
    Options {
        /// Category JSON file (- for stdin)
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Category being edited (it and its descendants are excluded)
        #[arg(long)]
        exclude: Option<String>,
        /// Print JSON entries
        #[arg(long)]
        json: bool,
    },

    /// Check hierarchy integrity (orphans, cycles, duplicate ids)
    Check {
        /// Category JSON file (- for stdin)
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective settings
    Show,
    /// Show config file locations
    Path,
    /// Print a commented config template
    Template,
}
