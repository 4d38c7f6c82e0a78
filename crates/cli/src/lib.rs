pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "techpro",
    about = "TechPro Assist operator CLI",
    long_about = "Inspect configuration, check readiness, seed demo data and ask the support assistant.",
    after_help = "Examples:\n  techpro doctor --json\n  techpro seed\n  techpro ask --session demo \"Where is my order ORD-1001?\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, data files, model credentials and graph connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Write missing demo data files, seed the graph and build the document index")]
    Seed,
    #[command(about = "Send one message through the assistant and print the structured reply")]
    Ask {
        #[arg(long, default_value = "cli", help = "Conversation session identifier")]
        session: String,
        #[arg(help = "Customer message")]
        message: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Seed => commands::seed::run(),
        Command::Ask { session, message } => commands::ask::run(&session, &message),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
