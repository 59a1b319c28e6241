use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use relmap::{commands, diagnostics, watch};
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "relmap", about = "Release map lookups and POM version drift checks")]
struct Cli {
    /// Command to run.
    #[command(subcommand)]
    command: Commands,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Top-level commands.
#[derive(Subcommand)]
enum Commands {
    /// Check every project's POM version against its manifest
    Check {
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Commit the map project
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },
    /// Edit .relmap.toml
    Config {
        /// Setting to change.
        #[command(subcommand)]
        setting: Setting,
    },
    /// Show the map entry for a project
    Entry {
        /// Project name
        project: String,
    },
    /// List map files
    Maps {
        /// Only files listing a project present in the workspace
        #[arg(long)]
        valid: bool,
    },
    /// Point a project's map entry at a new tag
    Tag {
        /// Project name
        project: String,
        /// New tag
        tag: String,
    },
    /// Show the tag each project is released under
    Tags {
        /// Project names
        #[arg(required = true)]
        projects: Vec<String>,
    },
    /// Watch the workspace and re-check on changes
    Watch {
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },
}

/// Settings `config` can change.
#[derive(Subcommand)]
enum Setting {
    /// Set how POM version mismatches are reported: ignore, warning or error
    Severity {
        /// New severity
        value: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        return if cli.verbose { EnvFilter::new("relmap=debug") } else { EnvFilter::new("relmap=info") };
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let root = Path::new(".");
    let result = match cli.command {
        Commands::Check { format } => commands::check(root, &format),
        Commands::Commit { message } => commands::commit(root, &message).map(|()| return ExitCode::SUCCESS),
        Commands::Config { setting: Setting::Severity { value } } => {
            commands::set_severity(root, &value).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Entry { project } => commands::entry(root, &project).map(|()| return ExitCode::SUCCESS),
        Commands::Maps { valid } => commands::maps(root, valid).map(|()| return ExitCode::SUCCESS),
        Commands::Tag { project, tag } => commands::tag(root, &project, &tag).map(|()| return ExitCode::SUCCESS),
        Commands::Tags { projects } => commands::tags(root, &projects).map(|()| return ExitCode::SUCCESS),
        Commands::Watch { format } => watch::run(root, &format),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2_u8)
        },
    };
}
