// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticketbot - conversational support ticket intake for chat platforms.

use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use ticketbot_core::TokenCipher;

/// Ticketbot - conversational support ticket intake for chat platforms.
#[derive(Parser, Debug)]
#[command(name = "ticketbot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the gateway, notification worker, and session sweeper.
    Serve,
    /// Print the effective configuration as TOML.
    Config,
    /// Generate a new token-encryption key.
    Keygen,
    /// Encrypt a bot token for storage in `bot_credentials`.
    EncryptToken {
        /// The clear-text bot token.
        token: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(Commands::Keygen) = cli.command {
        match ticketbot_vault::generate_key_hex() {
            Ok(key) => println!("{}", key.expose_secret()),
            Err(e) => {
                eprintln!("ticketbot: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let config = match ticketbot_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            ticketbot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let outcome = match cli.command {
        Some(Commands::Serve) => {
            init_tracing(&config.service.log_level);
            ticketbot::serve::run_serve(config).await
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => {
                print!("{rendered}");
                Ok(())
            }
            Err(e) => Err(ticketbot_core::TicketbotError::Internal(e.to_string())),
        },
        Some(Commands::EncryptToken { token }) => {
            ticketbot_vault::AesGcmTokenCipher::from_config(&config.vault)
                .and_then(|cipher| cipher.encrypt(&token))
                .map(|encrypted| {
                    eprintln!("encrypted {}", ticketbot_vault::mask_secret(&token));
                    println!("{encrypted}");
                })
        }
        Some(Commands::Keygen) => Ok(()),
        None => {
            println!("ticketbot: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        eprintln!("ticketbot: {e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ticketbot={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
