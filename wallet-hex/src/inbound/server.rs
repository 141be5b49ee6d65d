//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use wallet_types::{LedgerStore, RateSource};

use super::auth::auth_middleware;
use super::handlers::{self, AppState};
use crate::WalletService;
use crate::openapi::ApiDoc;

/// HTTP Server for the Wallet API.
pub struct HttpServer<S: LedgerStore, R: RateSource> {
    state: Arc<AppState<S, R>>,
}

impl<S: LedgerStore, R: RateSource> HttpServer<S, R> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: WalletService<S, R>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        let api = Router::new()
            .route("/register", post(handlers::register::<S, R>))
            .route("/balance", get(handlers::balance::<S, R>))
            .route("/wallet/deposit", post(handlers::deposit::<S, R>))
            .route("/wallet/withdraw", post(handlers::withdraw::<S, R>))
            .route("/exchange", post(handlers::exchange::<S, R>))
            .route("/exchange/rates", get(handlers::rates::<S, R>))
            .route("/exchange/quote", get(handlers::quote::<S, R>));

        Router::new()
            .route("/health", get(handlers::health))
            .nest("/api/v1", api)
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<S, R>,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
