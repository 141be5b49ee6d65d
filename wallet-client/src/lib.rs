//! # Wallet Client SDK
//!
//! A typed Rust client for the Wallet API.

use rust_decimal::Decimal;
use reqwest::Client;
use serde::de::DeserializeOwned;
use wallet_types::{
    BalanceResponse, BalanceUpdateResponse, CurrencyCode, DepositRequest, ErrorResponse,
    ExchangeRequest, ExchangeResponse, QuoteResponse, RatesResponse, RegisterRequest,
    RegisterResponse, WithdrawRequest,
};

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} {kind} - {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wallet API client.
pub struct WalletClient {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl WalletClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            http: Client::new(),
        }
    }

    /// Sets the API key for authentication.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Registers a user. The returned key is not stored on the client.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
    ) -> Result<RegisterResponse, ClientError> {
        let req = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
        };
        self.post("/api/v1/register", &req).await
    }

    pub async fn balance(&self) -> Result<BalanceResponse, ClientError> {
        self.get("/api/v1/balance", &[]).await
    }

    pub async fn deposit(
        &self,
        amount: Decimal,
        currency: CurrencyCode,
    ) -> Result<BalanceUpdateResponse, ClientError> {
        self.post("/api/v1/wallet/deposit", &DepositRequest { amount, currency })
            .await
    }

    pub async fn withdraw(
        &self,
        amount: Decimal,
        currency: CurrencyCode,
    ) -> Result<BalanceUpdateResponse, ClientError> {
        self.post("/api/v1/wallet/withdraw", &WithdrawRequest { amount, currency })
            .await
    }

    pub async fn rates(&self) -> Result<RatesResponse, ClientError> {
        self.get("/api/v1/exchange/rates", &[]).await
    }

    /// Prices an exchange without executing it.
    pub async fn quote(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        amount: Decimal,
    ) -> Result<QuoteResponse, ClientError> {
        self.get(
            "/api/v1/exchange/quote",
            &[
                ("from_currency", from.to_string()),
                ("to_currency", to.to_string()),
                ("amount", amount.to_string()),
            ],
        )
        .await
    }

    pub async fn exchange(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        amount: Decimal,
    ) -> Result<ExchangeResponse, ClientError> {
        let req = ExchangeRequest {
            from_currency: from,
            to_currency: to,
            amount,
        };
        self.post("/api/v1/exchange", &req).await
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let req = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query);
        let resp = self.authorize(req).send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let req = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        let resp = self.authorize(req).send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let (kind, message) = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => (err.kind, err.error),
            Err(_) => ("Unknown".to_string(), body),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            kind,
            message,
        })
    }
}
