//! shift CLI: run the relay bot or print stored rules. Config from env and optional CLI args.

use anyhow::Result;
use clap::Parser;
use shift_cli::{list_rules, run_bot, Cli, Commands, ShiftConfig};
use shift_telegram::TelegramConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { token } => {
            let config = ShiftConfig::load()?;
            let telegram = TelegramConfig::load(token)?;
            run_bot(config, telegram).await
        }
        Commands::Rules { database_url } => {
            let database_url = match database_url {
                Some(url) => url,
                None => ShiftConfig::load()?.database_url,
            };
            println!("{}", list_rules(&database_url).await?);
            Ok(())
        }
    }
}
