//! Ethereum node access. The node is a black box behind [`ChainRpc`]; the
//! only implementation shipped here speaks JSON-RPC over HTTP.

use async_trait::async_trait;
use passkey_wallet::{transaction::format_address, Address, H256, U256};
use reqwest::Url;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ChainRpcError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Node answered with HTTP status {0}")]
    HttpStatus(u16),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),
}

impl ChainRpcError {
    /// Transport-level failures may succeed on retry. Errors reported by the
    /// node itself will not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::HttpStatus(status) => *status == 429 || *status >= 500,
            Self::Rpc { .. } | Self::InvalidResponse(_) => false,
        }
    }
}

#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn suggest_gas_price(&self) -> Result<U256, ChainRpcError>;

    async fn suggest_gas_tip_cap(&self) -> Result<U256, ChainRpcError>;

    /// Next nonce for `address`, counting pending transactions.
    async fn pending_nonce_at(&self, address: Address) -> Result<u64, ChainRpcError>;

    async fn balance_at(&self, address: Address) -> Result<U256, ChainRpcError>;

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<H256, ChainRpcError>;

    async fn chain_id(&self) -> Result<u64, ChainRpcError>;
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC client for an Ethereum node.
#[derive(Debug)]
pub struct JsonRpcChain {
    http: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

impl JsonRpcChain {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, ChainRpcError> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainRpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self.http.post(self.url.clone()).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(ChainRpcError::HttpStatus(response.status().as_u16()));
        }

        let response: JsonRpcResponse = response.json().await?;
        if let Some(error) = response.error {
            return Err(ChainRpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let result = response
            .result
            .ok_or_else(|| ChainRpcError::InvalidResponse(format!("{method}: missing result")))?;
        serde_json::from_value(result)
            .map_err(|e| ChainRpcError::InvalidResponse(format!("{method}: {e}")))
    }

    async fn call_quantity(&self, method: &str, params: Value) -> Result<U256, ChainRpcError> {
        let quantity: String = self.call(method, params).await?;
        parse_quantity(&quantity)
    }
}

#[async_trait]
impl ChainRpc for JsonRpcChain {
    async fn suggest_gas_price(&self) -> Result<U256, ChainRpcError> {
        self.call_quantity("eth_gasPrice", json!([])).await
    }

    async fn suggest_gas_tip_cap(&self) -> Result<U256, ChainRpcError> {
        self.call_quantity("eth_maxPriorityFeePerGas", json!([])).await
    }

    async fn pending_nonce_at(&self, address: Address) -> Result<u64, ChainRpcError> {
        let nonce = self
            .call_quantity(
                "eth_getTransactionCount",
                json!([format_address(&address), "pending"]),
            )
            .await?;
        quantity_to_u64(nonce)
    }

    async fn balance_at(&self, address: Address) -> Result<U256, ChainRpcError> {
        self.call_quantity("eth_getBalance", json!([format_address(&address), "latest"]))
            .await
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<H256, ChainRpcError> {
        let hash: String = self
            .call(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        parse_hash(&hash)
    }

    async fn chain_id(&self) -> Result<u64, ChainRpcError> {
        let chain_id = self.call_quantity("eth_chainId", json!([])).await?;
        quantity_to_u64(chain_id)
    }
}

/// Parse a JSON-RPC hex quantity such as `"0x1a"`.
fn parse_quantity(quantity: &str) -> Result<U256, ChainRpcError> {
    let digits = quantity
        .strip_prefix("0x")
        .ok_or_else(|| ChainRpcError::InvalidResponse(format!("not a quantity: {quantity}")))?;
    U256::from_str_radix(digits, 16)
        .map_err(|_| ChainRpcError::InvalidResponse(format!("not a quantity: {quantity}")))
}

fn quantity_to_u64(quantity: U256) -> Result<u64, ChainRpcError> {
    if quantity > U256::from(u64::MAX) {
        return Err(ChainRpcError::InvalidResponse(format!(
            "{quantity} does not fit in 64 bits"
        )));
    }
    Ok(quantity.low_u64())
}

fn parse_hash(hash: &str) -> Result<H256, ChainRpcError> {
    let bytes = hex::decode(hash.trim_start_matches("0x"))
        .map_err(|e| ChainRpcError::InvalidResponse(format!("transaction hash {hash}: {e}")))?;
    if bytes.len() != H256::len_bytes() {
        return Err(ChainRpcError::InvalidResponse(format!(
            "transaction hash {hash} is not 32 bytes"
        )));
    }
    Ok(H256::from_slice(&bytes))
}

/// Retries transient failures of read-only calls with linear backoff.
/// Broadcasts pass straight through: a resent transaction could be accepted
/// twice by different nodes, and a rejection is final.
#[derive(Debug)]
pub struct RetryingChainRpc<C> {
    inner: C,
    max_retries: u32,
    retry_delay: Duration,
}

impl<C: ChainRpc> RetryingChainRpc<C> {
    pub fn new(inner: C, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            retry_delay,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn retry<T, F, Fut>(&self, method: &str, mut call: F) -> Result<T, ChainRpcError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, ChainRpcError>> + Send,
        T: Send,
    {
        let mut retry = 0;
        loop {
            match call().await {
                Err(e) if e.is_transient() && retry < self.max_retries => {
                    retry += 1;
                    warn!("{} failed, retry {} of {}: {}", method, retry, self.max_retries, e);
                    tokio::time::sleep(self.retry_delay.saturating_mul(retry)).await;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl<C: ChainRpc> ChainRpc for RetryingChainRpc<C> {
    async fn suggest_gas_price(&self) -> Result<U256, ChainRpcError> {
        self.retry("eth_gasPrice", || self.inner.suggest_gas_price())
            .await
    }

    async fn suggest_gas_tip_cap(&self) -> Result<U256, ChainRpcError> {
        self.retry("eth_maxPriorityFeePerGas", || {
            self.inner.suggest_gas_tip_cap()
        })
        .await
    }

    async fn pending_nonce_at(&self, address: Address) -> Result<u64, ChainRpcError> {
        self.retry("eth_getTransactionCount", || {
            self.inner.pending_nonce_at(address)
        })
        .await
    }

    async fn balance_at(&self, address: Address) -> Result<U256, ChainRpcError> {
        self.retry("eth_getBalance", || self.inner.balance_at(address))
            .await
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<H256, ChainRpcError> {
        self.inner.send_raw_transaction(raw).await
    }

    async fn chain_id(&self) -> Result<u64, ChainRpcError> {
        self.retry("eth_chainId", || self.inner.chain_id()).await
    }
}
