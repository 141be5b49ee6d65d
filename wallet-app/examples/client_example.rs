//! Client example walking through a full wallet flow against a local server.
//!
//! Run with: cargo run -p wallet-app --example client_example --features sqlite

use rust_decimal_macros::dec;
use std::net::SocketAddr;
use tempfile::tempdir;
use tokio::net::TcpListener;
use wallet_client::{ClientError, WalletClient};
use wallet_hex::{StaticRateSource, WalletService, inbound::HttpServer};
use wallet_repo::build_repo;
use wallet_types::CurrencyCode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    let port = addr.port();
    drop(listener);

    // Use a temp file-backed SQLite DB
    let tmp = tempdir()?;
    let db_path = tmp.path().join("wallet.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    println!("🚀 Starting server on port {port}...");
    println!("   Database: {db_url}");

    let repo = build_repo(&db_url).await?;
    let service = WalletService::new(repo, StaticRateSource::default());
    let server = HttpServer::new(service);

    let server_addr = format!("127.0.0.1:{port}");
    tokio::spawn(async move {
        if let Err(e) = server.run(&server_addr).await {
            eprintln!("server stopped: {e}");
        }
    });

    // Wait for server to start
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    let base_url = format!("http://127.0.0.1:{port}");
    let client = WalletClient::new(&base_url);

    println!("✅ Server health: {}", client.health().await?);

    let response = client.balance().await;
    println!("✅ Unauthorized without key: {}", response.unwrap_err());

    let registered = client.register("alice", "alice@example.com").await?;
    println!("✅ Registered alice (id={})", registered.user_id);
    let client = client.with_api_key(registered.api_key);

    let deposit = client.deposit(dec!(100), CurrencyCode::USD).await?;
    println!("✅ {}", deposit.message);

    let quote = client
        .quote(CurrencyCode::USD, CurrencyCode::EUR, dec!(40))
        .await?;
    println!(
        "💱 Quote: {} USD -> {} EUR at {}",
        quote.amount, quote.converted_amount, quote.rate
    );

    let exchanged = client
        .exchange(CurrencyCode::USD, CurrencyCode::EUR, dec!(40))
        .await?;
    println!("✅ {}", exchanged.message);

    match client.withdraw(dec!(1000), CurrencyCode::USD).await {
        Err(ClientError::Api { kind, message, .. }) => println!("✅ Rejected ({kind}): {message}"),
        other => println!("⚠️  Unexpected withdraw result: {other:?}"),
    }

    println!("\n📋 Balances:");
    for (currency, amount) in client.balance().await?.balance {
        println!("   - {currency}: {amount}");
    }

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
