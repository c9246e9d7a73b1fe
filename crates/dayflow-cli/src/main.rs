use clap::{Parser, Subcommand};

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "dayflow-cli", version, about = "Dayflow CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and show the schedule
    Plan {
        #[command(flatten)]
        args: commands::plan::PlanArgs,
    },
    /// Show the next actionable item
    Next {
        #[command(flatten)]
        args: commands::next::NextArgs,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Export a diagnostics summary
    Diagnostics {
        #[command(flatten)]
        args: commands::diagnostics::DiagnosticsArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Plan { args } => commands::plan::run(args),
        Commands::Next { args } => commands::next::run(args),
        Commands::Task { action } => commands::task::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Diagnostics { args } => commands::diagnostics::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
