pub mod commands;

use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront CLI - serve the API and administer the catalog database")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API server")]
    Serve(commands::serve::ServeArgs),

    #[command(about = "Create missing tables and indexes")]
    Migrate,

    #[command(about = "Inspect users and manage their role flags")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }

    /// Print `value` as pretty JSON, or as `text` otherwise
    pub fn emit<T: Serialize>(self, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
        match self {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => println!("{}", text()),
        }
        Ok(())
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Serve(args) => commands::serve::handle(args).await,
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grant_flags() {
        let cli = Cli::parse_from(["storefront", "user", "grant", "alice", "--supplier"]);
        match cli.command {
            Commands::User {
                cmd: commands::user::UserCommands::Grant { username, roles },
            } => {
                assert_eq!(username, "alice");
                assert!(roles.supplier);
                assert!(!roles.admin);
            }
            _ => panic!("expected user grant"),
        }
    }

    #[test]
    fn parses_serve_with_memory_store() {
        let cli = Cli::parse_from(["storefront", "--json", "serve", "--memory", "--port", "9001"]);
        assert!(cli.json);
        match cli.command {
            Commands::Serve(args) => {
                assert!(args.memory);
                assert_eq!(args.port, Some(9001));
            }
            _ => panic!("expected serve"),
        }
    }
}
