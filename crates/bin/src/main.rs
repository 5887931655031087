use clap::Parser;
use tracing_subscriber::EnvFilter;

mod backend;
mod cli;
mod commands;
mod output;

use cli::{Cli, Commands, UserCommands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so JSON output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("weavestore=info".parse()?))
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    match &cli.command {
        Commands::Reap(args) => commands::reap::run(args, format).await,
        Commands::Info(args) => commands::info::run(args, format).await,
        Commands::User(UserCommands::Add(args)) => commands::user::add(args, format).await,
        Commands::User(UserCommands::Remove(args)) => commands::user::remove(args, format).await,
        Commands::User(UserCommands::List(args)) => commands::user::list(args, format).await,
    }
}
