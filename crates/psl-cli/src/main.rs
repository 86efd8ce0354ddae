//! PSL CLI
//!
//! Compile pattern documents and run them over subject trees

use clap::{Parser, Subcommand};
use psl_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "psl")]
#[command(about = "PSL - Tree pattern matching over JSON subjects", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compile a pattern and print its automaton as DOT
    Dot(commands::dot::DotArgs),
    /// Run a pattern over a subject tree, reporting every hook invocation
    Run(commands::run::RunArgs),
    /// Print a pattern in PSL text
    Show(commands::show::ShowArgs),
}

fn main() {
    let cli = Cli::parse();

    init(if cli.json_logs {
        Profile::Production
    } else {
        Profile::Development
    });

    let result = match cli.command {
        Commands::Dot(args) => commands::dot::execute(args),
        Commands::Run(args) => commands::run::execute(args),
        Commands::Show(args) => commands::show::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
