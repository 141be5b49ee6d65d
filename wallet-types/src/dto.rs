//! Data Transfer Objects (DTOs) for requests and responses.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{CurrencyCode, ExchangeQuote, UserId};

// ─────────────────────────────────────────────────────────────────────────────
// Registration DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to register a new user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
}

/// Response after registering. The API key is shown exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub user_id: UserId,
    #[schema(example = "wk_3f2a...")]
    pub api_key: String,
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wallet DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to deposit money into the caller's wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepositRequest {
    /// Amount in major units
    #[schema(value_type = String, example = "100.00")]
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

/// Request to withdraw money from the caller's wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WithdrawRequest {
    /// Amount in major units
    #[schema(value_type = String, example = "25.50")]
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

/// All balances of the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    #[schema(value_type = BTreeMap<String, String>)]
    pub balance: BTreeMap<CurrencyCode, Decimal>,
}

/// Response after a deposit or withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceUpdateResponse {
    pub message: String,
    #[schema(value_type = BTreeMap<String, String>)]
    pub new_balance: BTreeMap<CurrencyCode, Decimal>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Exchange DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to exchange between two of the caller's wallets.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExchangeRequest {
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    /// Amount of `from_currency` to sell, in major units
    #[schema(value_type = String, example = "40.00")]
    pub amount: Decimal,
}

/// Query for a price-only quote.
#[derive(Debug, Clone, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuoteQuery {
    #[param(value_type = String, example = "USD")]
    pub from_currency: CurrencyCode,
    #[param(value_type = String, example = "EUR")]
    pub to_currency: CurrencyCode,
    #[param(value_type = String, example = "40.00")]
    pub amount: Decimal,
}

/// A priced conversion that has not been executed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteResponse {
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    #[schema(value_type = String, example = "40.00")]
    pub amount: Decimal,
    #[schema(value_type = String, example = "36.00")]
    pub converted_amount: Decimal,
    #[schema(value_type = String, example = "0.9")]
    pub rate: Decimal,
}

impl From<&ExchangeQuote> for QuoteResponse {
    fn from(quote: &ExchangeQuote) -> Self {
        Self {
            from_currency: quote.from,
            to_currency: quote.to,
            amount: quote.source_amount.to_decimal(),
            converted_amount: quote.converted_amount.to_decimal(),
            rate: quote.rate,
        }
    }
}

/// Response after an executed exchange.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExchangeResponse {
    pub message: String,
    #[schema(value_type = String, example = "36.00")]
    pub exchanged_amount: Decimal,
    #[schema(value_type = String, example = "0.9")]
    pub rate: Decimal,
    #[schema(value_type = BTreeMap<String, String>)]
    pub new_balance: BTreeMap<CurrencyCode, Decimal>,
}

/// Current rates against the rate source's base currency.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RatesResponse {
    #[schema(value_type = BTreeMap<String, String>)]
    pub rates: BTreeMap<CurrencyCode, Decimal>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Common
// ─────────────────────────────────────────────────────────────────────────────

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[schema(example = 422)]
    pub code: u16,
    #[schema(example = "InsufficientFunds")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}
