//! CLI parser.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shift")]
#[command(about = "Telegram relay bot: forward messages between chats by rule", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay bot (config from env; token can override BOT_TOKEN).
    Run {
        #[arg(short, long)]
        token: Option<String>,
    },
    /// Print the stored relay rules without connecting to Telegram.
    Rules {
        /// Overrides DATABASE_URL.
        #[arg(long)]
        database_url: Option<String>,
    },
}
