//! LCD Clock Control Tool
//!
//! CLI for setting the scrolling message of the LCD clock daemon.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lcd_clock_client::{MessageClient, Slot};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lcdclockctl")]
#[command(about = "Control tool for the LCD clock daemon")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Socket path, overriding the slot's default
    #[arg(short, long, global = true)]
    socket: Option<PathBuf>,

    /// Seconds to wait for the daemon
    #[arg(long, default_value = "5", global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set the message text of a slot
    Message {
        /// Slot to set: 1 is shown first, 2 after it
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=2))]
        slot: u8,

        /// Message text; words are joined with spaces
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Empty a slot
    Clear {
        /// Slot to clear
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=2))]
        slot: u8,
    },
}

fn slot_from_number(number: u8) -> Slot {
    if number == 2 {
        Slot::Secondary
    } else {
        Slot::Primary
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let client = |slot: u8| {
        let slot = slot_from_number(slot);
        let client = match &cli.socket {
            Some(path) => MessageClient::new(path),
            None => MessageClient::for_slot(slot),
        };
        debug!("Using {} for {:?}", client.path().display(), slot);
        client.with_timeout(Duration::from_secs(cli.timeout))
    };

    match &cli.command {
        Commands::Message { slot, text } => {
            let text = text.join(" ");
            client(*slot).send(&text).await?;
            println!("Message {} set: {}", slot, text);
        }
        Commands::Clear { slot } => {
            client(*slot).clear().await?;
            println!("Message {} cleared", slot);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_message_args() {
        let cli = Cli::try_parse_from(["lcdclockctl", "message", "--slot", "2", "hello", "world"])
            .unwrap();
        match cli.command {
            Commands::Message { slot, text } => {
                assert_eq!(slot_from_number(slot), Slot::Secondary);
                assert_eq!(text.join(" "), "hello world");
            }
            _ => panic!("expected message command"),
        }
    }

    #[test]
    fn test_slot_out_of_range() {
        assert!(Cli::try_parse_from(["lcdclockctl", "clear", "--slot", "3"]).is_err());
        assert!(Cli::try_parse_from(["lcdclockctl", "message"]).is_err());
    }

    #[test]
    fn test_socket_override() {
        let cli = Cli::try_parse_from(["lcdclockctl", "clear", "-s", "/run/clock.sock"]).unwrap();
        assert_eq!(cli.socket, Some(PathBuf::from("/run/clock.sock")));
        assert!(matches!(cli.command, Commands::Clear { slot: 1 }));
    }
}
