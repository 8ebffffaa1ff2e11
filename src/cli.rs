//! Command-line surface. Generalizes the teacher's `config.rs::Cli`/`Command`
//! from the clap 3 `ArgEnum` derive to clap 4's `ValueEnum`, and adds the
//! `Test` subcommand `spec.md`'s test-target machinery otherwise has no
//! caller for.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::manifest::BuildProfile;

#[derive(Parser)]
#[command(author, version, about = "Generates and drives a Ninja build graph for a C/C++ project", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity; repeat for more (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of source files to scan/build concurrently.
    #[arg(short = 'j', long, default_value_t = 1, global = true)]
    pub jobs: usize,

    #[command(flatten)]
    pub color: concolor_clap::Color,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scaffolds a new project.
    New {
        project_name: String,
        #[arg(long, default_value = "binary")]
        template: String,
    },

    /// Regenerates the build graph (if stale) and invokes the build driver.
    #[command(visible_alias = "b")]
    Build {
        #[arg(value_enum, default_value_t = BuildProfile::Debug)]
        profile: BuildProfile,
    },

    /// Builds then runs the project binary.
    #[command(visible_alias = "r")]
    Run {
        #[arg(value_enum, default_value_t = BuildProfile::Debug)]
        profile: BuildProfile,

        #[arg(last = true)]
        exe_args: Vec<String>,
    },

    /// Builds (if stale) and runs every discovered unit test.
    #[command(visible_alias = "t")]
    Test {
        #[arg(value_enum, default_value_t = BuildProfile::Debug)]
        profile: BuildProfile,
    },

    /// Removes the target directory.
    #[command(visible_alias = "c")]
    Clean {
        #[arg(value_enum, default_value_t = BuildProfile::Debug)]
        profile: BuildProfile,
    },
}

/// `target/<profile>` directory a given invocation writes the graph into.
pub fn out_base_path(root: &std::path::Path, profile: BuildProfile) -> PathBuf {
    root.join("target").join(profile.as_str())
}
