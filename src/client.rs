//! Client service shim: the consumer-facing wrapper around the HTTP
//! surface. UI code talks to this instead of raw fetch calls; errors come
//! back as the shared `LedgerError` taxonomy and financial operations are
//! never retried automatically.

use crate::api::{BalanceResponse, MutateResponse, TransferResponse};
use crate::error::{LedgerError, LedgerResult};
use crate::models::LedgerTransaction;
use crate::services::transfer::{orchestrate, TransferLedger, TransferOutcome};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Deadline applied to every request. Balance reads and mutations are
/// single-row operations; a call that takes longer than this has hit a
/// stuck server, and the caller gets `Timeout` instead of blocking.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct MutateBody<'a> {
    account: &'a str,
    amount: i64,
    reason: &'a str,
    source: &'a str,
}

#[derive(Serialize)]
struct TransferBody<'a> {
    from: &'a str,
    to: &'a str,
    amount: i64,
    reason: &'a str,
}

/// HTTP client for the ledger service
pub struct BalanceClient {
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl BalanceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch an account balance. The server auto-provisions unknown
    /// accounts, so this only fails on transport or server errors.
    pub async fn balance(&self, account: &str) -> LedgerResult<BalanceResponse> {
        let url = format!("{}/balance/{}", self.base_url, account);
        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    /// Credit tokens to an account
    pub async fn add(
        &self,
        account: &str,
        amount: i64,
        reason: &str,
        source: &str,
    ) -> LedgerResult<MutateResponse> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let url = format!("{}/balance/add", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(&MutateBody {
                account,
                amount,
                reason,
                source,
            })
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    /// Debit tokens from an account
    pub async fn subtract(
        &self,
        account: &str,
        amount: i64,
        reason: &str,
        source: &str,
    ) -> LedgerResult<MutateResponse> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let url = format!("{}/balance/subtract", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(&MutateBody {
                account,
                amount,
                reason,
                source,
            })
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    /// Transaction history, newest first
    pub async fn transactions(
        &self,
        account: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> LedgerResult<Vec<LedgerTransaction>> {
        let mut url = format!("{}/transactions/{}", self.base_url, account);
        let mut sep = '?';
        if let Some(limit) = limit {
            url.push_str(&format!("{}limit={}", sep, limit));
            sep = '&';
        }
        if let Some(offset) = offset {
            url.push_str(&format!("{}offset={}", sep, offset));
        }

        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    /// Move tokens between two accounts. Prefers the server-side atomic
    /// transfer endpoint; a deployment that predates it answers 404 on
    /// the route, in which case this falls back to the legacy two-leg
    /// orchestration with compensating refund.
    pub async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: i64,
        reason: &str,
    ) -> LedgerResult<TransferOutcome> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let url = format!("{}/balance/transfer", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(&TransferBody {
                from,
                to,
                amount,
                reason,
            })
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return orchestrate(self, from, to, amount, reason).await;
        }

        let transfer: TransferResponse = decode(response).await?;
        Ok(TransferOutcome {
            from: from.to_string(),
            to: to.to_string(),
            amount: transfer.amount,
            from_balance: transfer.from_balance,
            to_balance: transfer.to_balance,
        })
    }
}

#[async_trait]
impl TransferLedger for BalanceClient {
    async fn credit(
        &self,
        account: &str,
        amount: i64,
        reason: &str,
        source: &str,
    ) -> LedgerResult<i64> {
        let response = self.add(account, amount, reason, source).await?;
        Ok(response.balance)
    }

    async fn debit(
        &self,
        account: &str,
        amount: i64,
        reason: &str,
        source: &str,
    ) -> LedgerResult<i64> {
        let response = self.subtract(account, amount, reason, source).await?;
        Ok(response.balance)
    }
}

fn transport_error(err: reqwest::Error) -> LedgerError {
    if err.is_timeout() {
        LedgerError::Timeout
    } else {
        LedgerError::Message(format!("Request failed: {}", err))
    }
}

/// Turn an HTTP response into the typed result, mapping error bodies
/// back into the shared taxonomy.
async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> LedgerResult<T> {
    let status = response.status();

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| LedgerError::Message(format!("Invalid response body: {}", e)));
    }

    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("Request failed with status {}", status));

    Err(classify_api_error(status, message))
}

/// The wire carries only a status and a message, so classification leans
/// on the message contract of the HTTP surface.
fn classify_api_error(status: StatusCode, message: String) -> LedgerError {
    if status == StatusCode::BAD_REQUEST && message.contains("Insufficient balance") {
        let (available, required) = parse_balance_detail(&message);
        return LedgerError::InsufficientBalance {
            available,
            required,
        };
    }
    if status == StatusCode::BAD_REQUEST && message.contains("Invalid amount") {
        let amount = message
            .split(':')
            .nth(1)
            .and_then(|s| s.split_whitespace().next())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        return LedgerError::InvalidAmount(amount);
    }
    if status == StatusCode::GATEWAY_TIMEOUT {
        return LedgerError::Timeout;
    }
    LedgerError::Message(message)
}

/// Extract "available {n}, required {m}" out of the server message;
/// zeroes when the detail is absent (e.g. a legacy backend).
fn parse_balance_detail(message: &str) -> (i64, i64) {
    let number_after = |tag: &str| -> i64 {
        message
            .split(tag)
            .nth(1)
            .and_then(|rest| {
                rest.trim_start()
                    .split(|c: char| !c.is_ascii_digit() && c != '-')
                    .next()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or(0)
    };
    (number_after("available"), number_after("required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A server that accepts the connection and never answers must not
    /// hang the caller; the request deadline turns it into `Timeout`.
    #[tokio::test]
    async fn hung_server_surfaces_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                // Hold the connection open without responding
                tokio::spawn(async move {
                    let _socket = socket;
                    tokio::time::sleep(Duration::from_secs(60)).await;
                });
            }
        });

        let client = BalanceClient::new(format!("http://{}", addr))
            .with_timeout(Duration::from_millis(200));

        let err = client.balance("0xABC").await.unwrap_err();
        assert!(matches!(err, LedgerError::Timeout));
    }

    #[test]
    fn classifies_insufficient_balance_with_detail() {
        let err = classify_api_error(
            StatusCode::BAD_REQUEST,
            "Insufficient balance: available 700, required 1500".to_string(),
        );
        match err {
            LedgerError::InsufficientBalance {
                available,
                required,
            } => {
                assert_eq!(available, 700);
                assert_eq!(required, 1500);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn classifies_legacy_insufficient_balance_message() {
        // Older backends answer with the bare message and no detail
        let err = classify_api_error(StatusCode::BAD_REQUEST, "Insufficient balance".to_string());
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    }

    #[test]
    fn classifies_invalid_amount() {
        let err = classify_api_error(
            StatusCode::BAD_REQUEST,
            "Invalid amount: -5 (amount must be positive)".to_string(),
        );
        assert!(matches!(err, LedgerError::InvalidAmount(-5)));
    }

    #[test]
    fn unknown_errors_keep_the_server_message() {
        let err = classify_api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        );
        match err {
            LedgerError::Message(msg) => assert_eq!(msg, "Internal server error"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
