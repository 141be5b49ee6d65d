//! Wallet CLI
//!
//! Command-line interface for the Wallet API.

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use wallet_client::WalletClient;
use wallet_types::CurrencyCode;

#[derive(Parser)]
#[command(name = "wallet")]
#[command(author, version, about = "Currency wallet API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the Wallet API
    #[arg(long, env = "WALLET_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// API key for authentication
    #[arg(long, env = "WALLET_API_KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a user and print the API key
    Register {
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Show all balances
    Balance,
    /// Deposit funds into a wallet
    Deposit {
        amount: Decimal,
        /// Currency code (USD, EUR, GBP, JPY, RUB)
        #[arg(long, default_value = "USD", value_parser = parse_currency)]
        currency: CurrencyCode,
    },
    /// Withdraw funds from a wallet
    Withdraw {
        amount: Decimal,
        #[arg(long, default_value = "USD", value_parser = parse_currency)]
        currency: CurrencyCode,
    },
    /// Exchange rate operations
    Rates {
        #[command(subcommand)]
        action: Option<RateCommands>,
    },
    /// Exchange between two of your wallets
    Exchange {
        amount: Decimal,
        #[arg(long, value_parser = parse_currency)]
        from: CurrencyCode,
        #[arg(long, value_parser = parse_currency)]
        to: CurrencyCode,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum RateCommands {
    /// Price an exchange without executing it
    Quote {
        amount: Decimal,
        #[arg(long, value_parser = parse_currency)]
        from: CurrencyCode,
        #[arg(long, value_parser = parse_currency)]
        to: CurrencyCode,
    },
}

fn parse_currency(s: &str) -> Result<CurrencyCode, String> {
    s.parse::<CurrencyCode>().map_err(|_| {
        let supported: Vec<_> = CurrencyCode::all().iter().map(|c| c.code()).collect();
        format!("unknown currency '{s}', supported: {}", supported.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = WalletClient::new(&cli.api_url);
    if let Some(key) = cli.api_key {
        client = client.with_api_key(key);
    }

    match cli.command {
        Commands::Health => {
            if client.health().await? {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Register { username, email } => {
            let registered = client.register(&username, &email).await?;
            eprintln!("{}", registered.message);
            println!("{}", registered.api_key);
        }

        Commands::Balance => {
            let balance = client.balance().await?;
            println!("{}", serde_json::to_string_pretty(&balance)?);
        }

        Commands::Deposit { amount, currency } => {
            let updated = client.deposit(amount, currency).await?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }

        Commands::Withdraw { amount, currency } => {
            let updated = client.withdraw(amount, currency).await?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }

        Commands::Rates { action: None } => {
            let rates = client.rates().await?;
            println!("{}", serde_json::to_string_pretty(&rates)?);
        }

        Commands::Rates {
            action: Some(RateCommands::Quote { amount, from, to }),
        } => {
            let quote = client.quote(from, to, amount).await?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }

        Commands::Exchange { amount, from, to } => {
            let result = client.exchange(from, to, amount).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
