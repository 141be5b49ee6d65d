//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use wallet_types::{
    AppError, BalanceResponse, BalanceUpdateResponse, DepositRequest, ErrorResponse,
    ExchangeRequest, ExchangeResponse, HealthResponse, LedgerStore, QuoteQuery, QuoteResponse,
    RateSource, RatesResponse, RegisterRequest, RegisterResponse, UserId, WithdrawRequest,
};

use crate::WalletService;

/// Application state shared across handlers.
pub struct AppState<S: LedgerStore, R: RateSource> {
    pub service: WalletService<S, R>,
}

/// Caller resolved from the bearer key by the auth middleware.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

pub(crate) fn status_of(err: &AppError) -> StatusCode {
    match err {
        AppError::InvalidAmount(_) | AppError::InvalidRequest(_) | AppError::BadRequest(_) => {
            StatusCode::BAD_REQUEST
        }
        AppError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::WalletNotFound(_) | AppError::UserNotFound | AppError::NotFound(_) => {
            StatusCode::NOT_FOUND
        }
        AppError::AlreadyExists(_) => StatusCode::CONFLICT,
        AppError::RateUnavailable(_) => StatusCode::BAD_GATEWAY,
        AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        AppError::StorageConflict(_) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::ConsistencyViolation(_) | AppError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);
        let kind = self.0.kind();

        let message = match &self.0 {
            AppError::Internal(detail) => {
                tracing::error!(kind, %detail, "request failed");
                "Internal server error".to_string()
            }
            err if status.is_server_error() => {
                tracing::error!(kind, error = %err, "request failed");
                err.to_string()
            }
            err => {
                tracing::warn!(kind, error = %err, "request rejected");
                err.to_string()
            }
        };

        let body = ErrorResponse {
            error: message,
            code: status.as_u16(),
            kind: kind.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

/// Register a user and hand out their API key.
#[tracing::instrument(skip(state, req), fields(username = %req.username))]
pub async fn register<S: LedgerStore, R: RateSource>(
    State(state): State<Arc<AppState<S, R>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = state.service.register(&req.username, &req.email).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: registration.user.id,
            api_key: registration.api_key,
            message: "User registered. Save this key securely - it won't be shown again!".into(),
        }),
    ))
}

/// All balances of the caller.
#[tracing::instrument(skip(state), fields(user_id = %user.0))]
pub async fn balance<S: LedgerStore, R: RateSource>(
    State(state): State<Arc<AppState<S, R>>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.service.balance(user.0).await?;
    Ok(Json(BalanceResponse {
        balance: snapshot.to_decimal_map(),
    }))
}

#[tracing::instrument(skip(state, req), fields(user_id = %user.0, currency = %req.currency, amount = %req.amount))]
pub async fn deposit<S: LedgerStore, R: RateSource>(
    State(state): State<Arc<AppState<S, R>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<DepositRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state
        .service
        .deposit(user.0, req.currency, req.amount)
        .await?;
    Ok(Json(BalanceUpdateResponse {
        message: format!("Deposited {} {}", req.amount, req.currency),
        new_balance: snapshot.to_decimal_map(),
    }))
}

#[tracing::instrument(skip(state, req), fields(user_id = %user.0, currency = %req.currency, amount = %req.amount))]
pub async fn withdraw<S: LedgerStore, R: RateSource>(
    State(state): State<Arc<AppState<S, R>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<WithdrawRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state
        .service
        .withdraw(user.0, req.currency, req.amount)
        .await?;
    Ok(Json(BalanceUpdateResponse {
        message: format!("Withdrew {} {}", req.amount, req.currency),
        new_balance: snapshot.to_decimal_map(),
    }))
}

#[tracing::instrument(skip(state))]
pub async fn rates<S: LedgerStore, R: RateSource>(
    State(state): State<Arc<AppState<S, R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let rates = state.service.rates().await?;
    Ok(Json(RatesResponse { rates }))
}

#[tracing::instrument(skip(state))]
pub async fn quote<S: LedgerStore, R: RateSource>(
    State(state): State<Arc<AppState<S, R>>>,
    Query(q): Query<QuoteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = state
        .service
        .quote(q.from_currency, q.to_currency, q.amount)
        .await?;
    Ok(Json(QuoteResponse::from(&quote)))
}

#[tracing::instrument(skip(state, req), fields(user_id = %user.0, from = %req.from_currency, to = %req.to_currency, amount = %req.amount))]
pub async fn exchange<S: LedgerStore, R: RateSource>(
    State(state): State<Arc<AppState<S, R>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<ExchangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .service
        .exchange(user.0, req.from_currency, req.to_currency, req.amount)
        .await?;
    let quote = &outcome.quote;
    Ok(Json(ExchangeResponse {
        message: format!(
            "Exchanged {} for {}",
            quote.source_amount, quote.converted_amount
        ),
        exchanged_amount: quote.converted_amount.to_decimal(),
        rate: quote.rate,
        new_balance: outcome.balances.to_decimal_map(),
    }))
}
