//! Minimal Solana JSON-RPC client
//!
//! Only the read calls the live gateway needs: balances, mint decimals and
//! signature status.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    account: ParsedAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedAccount {
    data: ParsedData,
}

#[derive(Debug, Deserialize)]
struct ParsedData {
    parsed: ParsedInfo,
}

#[derive(Debug, Deserialize)]
struct ParsedInfo {
    info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    token_amount: UiTokenAmount,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTokenAmount {
    /// Raw amount as a decimal string
    pub amount: String,
    pub decimals: u8,
}

impl UiTokenAmount {
    pub fn raw(&self) -> u64 {
        self.amount.parse().unwrap_or(0)
    }
}

/// Confirmation state of one submitted signature
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub confirmation_status: Option<String>,
    pub err: Option<serde_json::Value>,
}

impl SignatureStatus {
    pub fn is_confirmed(&self) -> bool {
        self.err.is_none()
            && matches!(
                self.confirmation_status.as_deref(),
                Some("confirmed") | Some("finalized")
            )
    }
}

pub struct SolanaRpc {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl SolanaRpc {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(10),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        debug!(method, "RPC call");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Rpc(format!("{} request failed: {}", method, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Rpc(format!("{} returned {}: {}", method, status, body)));
        }

        let rpc_response: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Rpc(format!("Failed to parse {} response: {}", method, e)))?;

        if let Some(error) = rpc_response.error {
            return Err(Error::Rpc(format!(
                "{} error {}: {}",
                method, error.code, error.message
            )));
        }

        rpc_response
            .result
            .ok_or_else(|| Error::Rpc(format!("No result in {} response", method)))
    }

    /// Lamports held by `owner`
    pub async fn get_balance(&self, owner: &str) -> Result<u64> {
        let result: WithContext<u64> = self
            .call("getBalance", serde_json::json!([owner]))
            .await?;
        Ok(result.value)
    }

    /// Summed balance of `owner` across all token accounts for `mint`.
    /// `None` when the owner has no account for the mint.
    pub async fn get_token_balance(&self, owner: &str, mint: &str) -> Result<Option<UiTokenAmount>> {
        let result: WithContext<Vec<KeyedAccount>> = self
            .call(
                "getTokenAccountsByOwner",
                serde_json::json!([owner, { "mint": mint }, { "encoding": "jsonParsed" }]),
            )
            .await?;

        let mut accounts = result
            .value
            .into_iter()
            .map(|a| a.account.data.parsed.info.token_amount);
        let first = match accounts.next() {
            Some(first) => first,
            None => return Ok(None),
        };
        let total = accounts.fold(first.raw(), |acc, a| acc + a.raw());
        Ok(Some(UiTokenAmount {
            amount: total.to_string(),
            decimals: first.decimals,
        }))
    }

    pub async fn get_token_decimals(&self, mint: &str) -> Result<u8> {
        let result: WithContext<UiTokenAmount> = self
            .call("getTokenSupply", serde_json::json!([mint]))
            .await?;
        Ok(result.value.decimals)
    }

    pub async fn get_signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>> {
        let result: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                serde_json::json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(result.value.into_iter().next().flatten())
    }
}
