//! Builds unsigned transfer payloads for the custody service to sign, and
//! broadcasts the signed results.

use crate::{
    chain::{ChainRpc, ChainRpcError, JsonRpcChain, RetryingChainRpc},
    config::ChainConfig,
    PasskeyWalletClientError, Result,
};
use passkey_wallet::{
    transaction::{format_address, Fees, SignedTransaction, SigningPayload, UnsignedTransaction},
    Address, U256,
};
use reqwest::Url;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};

fn chain_error(operation: &'static str) -> impl FnOnce(ChainRpcError) -> PasskeyWalletClientError {
    move |source| PasskeyWalletClientError::Chain { operation, source }
}

/// Serializes nonce assignment per source account.
///
/// Each account has its own lock. The manager hands out the larger of the
/// node's pending nonce and the nonce after the last transaction it saw
/// broadcast, so a node that lags behind its own mempool cannot hand the same
/// nonce out twice.
#[derive(Debug, Default, Clone)]
pub struct NonceManager {
    accounts: Arc<Mutex<HashMap<Address, Arc<Mutex<Option<u64>>>>>>,
}

impl NonceManager {
    async fn account(&self, address: Address) -> OwnedMutexGuard<Option<u64>> {
        let account = {
            let mut accounts = self.accounts.lock().await;
            accounts.entry(address).or_default().clone()
        };
        account.lock_owned().await
    }

    /// The nonce the next transaction from `address` should use. Nothing is
    /// reserved.
    pub async fn next_nonce(
        &self,
        address: Address,
        chain: &dyn ChainRpc,
    ) -> std::result::Result<u64, ChainRpcError> {
        let next_broadcast = self.account(address).await;
        Self::resolve(address, *next_broadcast, chain).await
    }

    /// Hold the account until the returned reservation is committed or
    /// dropped. Other reservations and lookups for `address` wait meanwhile.
    pub async fn reserve(
        &self,
        address: Address,
        chain: &dyn ChainRpc,
    ) -> std::result::Result<NonceReservation, ChainRpcError> {
        let next_broadcast = self.account(address).await;
        let nonce = Self::resolve(address, *next_broadcast, chain).await?;
        Ok(NonceReservation {
            address,
            nonce,
            next_broadcast,
        })
    }

    async fn resolve(
        address: Address,
        next_broadcast: Option<u64>,
        chain: &dyn ChainRpc,
    ) -> std::result::Result<u64, ChainRpcError> {
        let pending = chain.pending_nonce_at(address).await?;
        Ok(next_broadcast.map_or(pending, |next| next.max(pending)))
    }
}

/// A nonce held for one transaction. Dropping it without
/// [`commit`](Self::commit) leaves the account as it was.
#[derive(Debug)]
pub struct NonceReservation {
    address: Address,
    nonce: u64,
    next_broadcast: OwnedMutexGuard<Option<u64>>,
}

impl NonceReservation {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Record that a transaction with this nonce reached the node.
    fn commit(mut self) {
        *self.next_broadcast = Some(self.nonce + 1);
    }
}

/// Constructs transfers against one chain. Cheap to clone.
#[derive(Clone)]
pub struct TransactionBuilder {
    chain: Arc<dyn ChainRpc>,
    chain_id: u64,
    nonces: NonceManager,
}

impl std::fmt::Debug for TransactionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionBuilder")
            .field("chain_id", &self.chain_id)
            .field("nonces", &self.nonces)
            .finish()
    }
}

impl TransactionBuilder {
    pub fn new(chain: Arc<dyn ChainRpc>, chain_id: u64) -> Self {
        Self {
            chain,
            chain_id,
            nonces: NonceManager::default(),
        }
    }

    /// Talk JSON-RPC to the node in `config`, retrying transient failures.
    pub fn from_config(config: &ChainConfig, request_timeout: Duration) -> Result<Self> {
        let url = Url::parse(&config.rpc_url).map_err(|e| {
            PasskeyWalletClientError::InvalidUrl(format!("{}: {e}", config.rpc_url))
        })?;
        let node = JsonRpcChain::new(url, request_timeout).map_err(chain_error("connect"))?;
        let chain = RetryingChainRpc::new(node, config.max_retries, config.retry_delay);
        Ok(Self::new(Arc::new(chain), config.chain_id))
    }

    pub fn chain(&self) -> &dyn ChainRpc {
        self.chain.as_ref()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Build the signing payload of a transfer of `amount` wei.
    ///
    /// Fees are the node's suggestions doubled. A `nonce` override is used
    /// verbatim; otherwise the next nonce for `from` comes from the
    /// [`NonceManager`] without being reserved, so constructing twice without
    /// a broadcast in between yields the same nonce.
    #[instrument(skip_all, err(Debug), fields(from = %format_address(&from), to = %format_address(&to)))]
    pub async fn construct_transfer(
        &self,
        from: Address,
        to: Address,
        amount: U256,
        nonce: Option<u64>,
    ) -> Result<SigningPayload> {
        let fees = self.suggested_fees().await?;
        let nonce = match nonce {
            Some(nonce) => nonce,
            None => self
                .nonces
                .next_nonce(from, self.chain.as_ref())
                .await
                .map_err(chain_error("pending_nonce_at"))?,
        };
        Ok(self.transfer_payload(nonce, fees, to, amount))
    }

    /// Like [`construct_transfer`](Self::construct_transfer) with no override,
    /// but the nonce stays held until the signed transaction is passed to
    /// [`broadcast_reserved`](Self::broadcast_reserved). Dropping the
    /// reservation instead, e.g. because signing failed, frees the nonce.
    #[instrument(skip_all, err(Debug), fields(from = %format_address(&from), to = %format_address(&to)))]
    pub async fn reserve_transfer(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(SigningPayload, NonceReservation)> {
        let fees = self.suggested_fees().await?;
        let reservation = self
            .nonces
            .reserve(from, self.chain.as_ref())
            .await
            .map_err(chain_error("pending_nonce_at"))?;
        let payload = self.transfer_payload(reservation.nonce(), fees, to, amount);
        Ok((payload, reservation))
    }

    async fn suggested_fees(&self) -> Result<Fees> {
        let gas_price = self
            .chain
            .suggest_gas_price()
            .await
            .map_err(chain_error("suggest_gas_price"))?;
        let gas_tip = self
            .chain
            .suggest_gas_tip_cap()
            .await
            .map_err(chain_error("suggest_gas_tip_cap"))?;
        Ok(Fees::from_suggested(gas_price, gas_tip))
    }

    fn transfer_payload(&self, nonce: u64, fees: Fees, to: Address, amount: U256) -> SigningPayload {
        let transaction = UnsignedTransaction::new_transfer(self.chain_id, nonce, fees, to, amount);
        info!(
            "Constructed transfer. nonce={} fee_cap={} tip={}",
            nonce, transaction.gas_fee_cap, transaction.gas_tip_cap
        );
        transaction.signing_payload()
    }

    /// Submit a hex encoded signed transaction and return its hash.
    ///
    /// Rejections by the node are returned without retrying.
    #[instrument(skip_all, err(Debug))]
    pub async fn broadcast_transaction(&self, signed_transaction: &str) -> Result<String> {
        let signed = SignedTransaction::from_hex(signed_transaction)?;
        self.broadcast(&signed).await
    }

    /// Broadcast the transaction signed for `reservation`. The account's
    /// nonce only advances if the node accepts it.
    #[instrument(skip_all, err(Debug), fields(nonce = reservation.nonce()))]
    pub async fn broadcast_reserved(
        &self,
        signed_transaction: &str,
        reservation: NonceReservation,
    ) -> Result<String> {
        let signed = SignedTransaction::from_hex(signed_transaction)?;
        if signed.nonce() != reservation.nonce() {
            return Err(PasskeyWalletClientError::Validation(format!(
                "signed transaction has nonce {}, reserved {}",
                signed.nonce(),
                reservation.nonce()
            )));
        }
        let hash = self.broadcast(&signed).await?;
        reservation.commit();
        Ok(hash)
    }

    async fn broadcast(&self, signed: &SignedTransaction) -> Result<String> {
        let hash = signed.hash_hex();
        self.chain
            .send_raw_transaction(signed.raw())
            .await
            .map_err(chain_error("send_raw_transaction"))?;

        if signed.transaction().chain_id != self.chain_id {
            warn!(
                "Broadcast transaction for chain {} on chain {}",
                signed.transaction().chain_id,
                self.chain_id
            );
        }
        info!("Broadcast transaction. hash={}", hash);
        Ok(hash)
    }

    pub async fn balance(&self, address: Address) -> Result<U256> {
        self.chain
            .balance_at(address)
            .await
            .map_err(chain_error("balance_at"))
    }
}
