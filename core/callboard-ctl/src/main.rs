//! callboard-ctl: operator CLI for the callboard trigger file.
//!
//! Writes the same file the display server watches, so it can stand in for
//! the external practice software when testing a display.
//!
//! ## Subcommands
//!
//! - `call <NAME>`: Announce a patient
//! - `clear`: Reset the trigger to `{}`
//! - `show`: Print the current trigger record

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "callboard-ctl")]
#[command(about = "Callboard trigger file control")]
#[command(version)]
struct Cli {
    /// Project root (same meaning as for callboard-server)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// TOML config file (default: <root>/callboard.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Trigger file path, overriding the config
    #[arg(long, global = true, value_name = "FILE")]
    trigger_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a call record for NAME
    Call {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Reset the trigger to an empty object
    Clear,

    /// Print the current trigger record as JSON
    Show,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let target = commands::Target {
        root: cli.root,
        config: cli.config,
        trigger_file: cli.trigger_file,
    };
    let result = match cli.command {
        Commands::Call { name } => commands::call(&target, &name),
        Commands::Clear => commands::clear(&target),
        Commands::Show => commands::show(&target),
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            tracing::error!(error = %e, "callboard-ctl failed");
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
