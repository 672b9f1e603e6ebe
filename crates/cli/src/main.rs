//! Bazaar CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bazaar-cli migrate
//!
//! # Create an admin account
//! bazaar-cli admin create -u "Store Admin" -e admin@example.com -p 'long-password'
//!
//! # Give legacy subscribers unsubscribe tokens
//! bazaar-cli subscribers backfill-tokens
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create admin users
//! - `subscribers backfill-tokens` - Backfill unsubscribe tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar-cli")]
#[command(author, version, about = "Bazaar operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Maintain the newsletter list
    Subscribers {
        #[command(subcommand)]
        action: SubscriberAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new verified admin user
    Create {
        /// Display name
        #[arg(short, long)]
        username: String,

        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Login password (at least 6 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum SubscriberAction {
    /// Give every subscriber without one an unsubscribe token
    BackfillTokens,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                email,
                password,
            } => {
                commands::admin::create_user(&username, &email, &password).await?;
            }
        },
        Commands::Subscribers { action } => match action {
            SubscriberAction::BackfillTokens => {
                commands::subscribers::backfill_tokens().await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_admin_create() {
        let cli = Cli::try_parse_from([
            "bazaar-cli", "admin", "create", "-u", "Ops", "-e", "ops@example.com", "-p", "secret1",
        ]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Admin {
                action: AdminAction::Create { .. }
            })
        ));
    }

    #[test]
    fn test_parses_backfill() {
        let cli = Cli::try_parse_from(["bazaar-cli", "subscribers", "backfill-tokens"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Subscribers {
                action: SubscriberAction::BackfillTokens
            })
        ));
    }
}
