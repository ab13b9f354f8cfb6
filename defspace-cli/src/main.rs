//! # defspace CLI
//!
//! Command-line interface for listing, inspecting and calling the
//! definitions of a space.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "defspace")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Space directory to import
    #[arg(long, env = "DEFSPACE_SPACE", default_value = ".")]
    space: PathBuf,

    /// Path to configuration file (defaults to <space>/defspace.yml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run definition files again on every use
    #[arg(long)]
    reload: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the definitions of the space
    List {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Call a definition and print its result
    Call {
        /// Emit the result and any diagnostics as JSON
        #[arg(long)]
        json: bool,

        /// Definition name, or a dotted path into another space
        name: String,

        /// Arguments: literals are ints, floats, true/false, none or strings;
        /// `--key=value` passes a keyword argument
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print the documentation of a definition
    Describe {
        /// Definition name
        name: String,
    },

    /// Print the representation of a definition
    Show {
        /// Definition name
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays machine readable
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::WARN.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = commands::SpaceOptions {
        space: cli.space,
        config: cli.config,
        reload: cli.reload,
    };

    match cli.command {
        Commands::List { json } => commands::list_definitions(&options, json),
        Commands::Call { json, name, args } => {
            commands::call_definition(&options, &name, &args, json)
        }
        Commands::Describe { name } => commands::describe_definition(&options, &name),
        Commands::Show { name } => commands::show_definition(&options, &name),
    }
}
