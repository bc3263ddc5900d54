use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd_check;
mod cmd_explain;
mod cmd_lint;
mod context_file;
mod tracing_init;

#[derive(Parser)]
#[command(name = "aw-proj", about = "AccessWarden policy tools for rule developers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run checks and lints over policy files
    Lint {
        /// Policy file glob patterns (e.g. "policies/*.toml")
        patterns: Vec<String>,
    },

    /// Decide one access request; exits 0 when allowed, 1 when denied
    Check {
        /// Resource name, e.g. "documents"
        #[arg(short, long)]
        resource: String,

        /// Action: create, read, update or delete
        #[arg(short, long)]
        action: String,

        /// Path to a JSON context file ({data, user, params, globals})
        #[arg(short, long)]
        context: PathBuf,

        /// Policy file glob patterns; override the config's list
        #[arg(short, long)]
        policies: Vec<String>,

        /// Path to warden.toml
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Explain a decision: allow result, row filter and field sets
    Explain {
        /// Resource name, e.g. "documents"
        #[arg(short, long)]
        resource: String,

        /// Action: create, read, update or delete
        #[arg(short, long)]
        action: String,

        /// Path to a JSON context file ({data, user, params, globals})
        #[arg(short, long)]
        context: PathBuf,

        /// Policy file glob patterns; override the config's list
        #[arg(short, long)]
        policies: Vec<String>,

        /// Path to warden.toml
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Lint { patterns } => {
            cmd_lint::run(patterns)?;
        }

        Commands::Check {
            resource,
            action,
            context,
            policies,
            config,
        } => {
            cmd_check::run(resource, action, context, policies, config)?;
        }

        Commands::Explain {
            resource,
            action,
            context,
            policies,
            config,
        } => {
            cmd_explain::run(resource, action, context, policies, config)?;
        }
    }

    Ok(())
}
