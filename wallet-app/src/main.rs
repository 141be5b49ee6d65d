//! # Wallet Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the store adapter and the rate source
//! - Create the wallet service
//! - Start the HTTP server

mod config;

use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_hex::{HttpRateSource, StaticRateSource, WalletService, inbound::HttpServer};
use wallet_repo::{Repo, build_repo};
use wallet_types::RateSource;

use config::{Config, LogFormat};

fn init_tracer(endpoint: &str) -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("wallet-service"), provider))
}

fn init_logging(config: &Config) -> anyhow::Result<Option<sdktrace::SdkTracerProvider>> {
    let (telemetry, provider) = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => {
            let (tracer, provider) = init_tracer(endpoint)?;
            (
                Some(tracing_opentelemetry::layer().with_tracer(tracer)),
                Some(provider),
            )
        }
        None => (None, None),
    };

    let (json, pretty) = match config.log_format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Pretty => (None, Some(tracing_subscriber::fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wallet_app=debug,wallet_hex=debug".into()),
        )
        .with(json)
        .with(pretty)
        .with(telemetry)
        .init();

    Ok(provider)
}

async fn serve<R: RateSource>(repo: Repo, rates: R, config: &Config) -> anyhow::Result<()> {
    let service = WalletService::with_config(
        repo,
        rates,
        config.ledger.clone(),
        config.exchange.clone(),
    );
    tracing::info!(strategy = ?service.ledger().strategy(), "ledger ready");

    let server = HttpServer::new(service);
    let addr = format!("0.0.0.0:{}", config.port);
    server.run(&addr).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let otel_provider = init_logging(&config)?;

    tracing::info!("Starting wallet server on port {}", config.port);

    // Build store (handles connection and schema)
    let repo = build_repo(&config.database_url).await?;
    tracing::info!(backend = repo.backend(), "store connected");

    match config.rate_service_url.as_deref() {
        Some(url) => {
            tracing::info!(%url, "using remote rate service");
            let rates = HttpRateSource::new(url)?;
            serve(repo, rates, &config).await?;
        }
        None => {
            tracing::info!("using built-in rate table");
            serve(repo, StaticRateSource::default(), &config).await?;
        }
    }

    // Ensure traces are flushed before exit
    if let Some(provider) = otel_provider {
        let _ = provider.shutdown();
    }
    Ok(())
}
