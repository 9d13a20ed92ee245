//! Operator-funded account that seeds new wallets with a small amount of
//! ether. The custody service signs for it like for any other wallet.

use crate::{
    config::WarchestConfig, CustodyClient, PasskeyWalletClientError, Result, TransactionBuilder,
};
use passkey_wallet::{
    constants::{DROP_AMOUNT_WEI, MAX_DROPS_PER_WALLET},
    transaction::{format_address, SigningPayload},
    units::format_ether,
    Address, U256,
};
use tracing::{info, instrument};

/// Drops a wallet may still receive after `used` drops.
pub fn drops_left(used: u8) -> u8 {
    MAX_DROPS_PER_WALLET.saturating_sub(used)
}

#[derive(Clone, Debug)]
pub struct Warchest {
    config: WarchestConfig,
    client: CustodyClient,
    builder: TransactionBuilder,
}

impl Warchest {
    pub fn new(config: WarchestConfig, client: CustodyClient, builder: TransactionBuilder) -> Self {
        Self {
            config,
            client,
            builder,
        }
    }

    /// Build from the optional `[warchest]` section of the client config.
    pub fn from_config(
        config: Option<WarchestConfig>,
        client: CustodyClient,
        builder: TransactionBuilder,
    ) -> Result<Self> {
        let config = config.ok_or(PasskeyWalletClientError::WarchestNotConfigured)?;
        Ok(Self::new(config, client, builder))
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub async fn balance(&self) -> Result<U256> {
        self.builder.balance(self.config.address).await
    }

    /// Send [`DROP_AMOUNT_WEI`] to `to`. `used` is the number of drops the
    /// recipient already received.
    ///
    /// Output: the hash of the broadcast transaction.
    #[instrument(skip_all, err(Debug), fields(to = %format_address(&to)))]
    pub async fn drop_to(&self, to: Address, used: u8) -> Result<String> {
        if drops_left(used) == 0 {
            return Err(PasskeyWalletClientError::NoDropsLeft);
        }
        let amount = U256::from(DROP_AMOUNT_WEI);
        info!("Dropping {} ETH", format_ether(amount));
        self.transfer(to, amount, None).await
    }

    /// Replace whatever transaction is stuck at `nonce` with a zero-value
    /// transfer to the warchest itself.
    #[instrument(skip_all, err(Debug), fields(nonce = nonce))]
    pub async fn override_nonce(&self, nonce: u64) -> Result<String> {
        info!("Overriding warchest nonce {}", nonce);
        self.transfer(self.config.address, U256::zero(), Some(nonce))
            .await
    }

    /// Without a `nonce` the warchest account stays reserved until the
    /// broadcast, and a failed signature frees the nonce again.
    async fn transfer(&self, to: Address, amount: U256, nonce: Option<u64>) -> Result<String> {
        let from = self.config.address;
        match nonce {
            Some(nonce) => {
                let payload = self
                    .builder
                    .construct_transfer(from, to, amount, Some(nonce))
                    .await?;
                let signed = self.sign(&payload).await?;
                self.builder.broadcast_transaction(&signed).await
            }
            None => {
                let (payload, reservation) =
                    self.builder.reserve_transfer(from, to, amount).await?;
                let signed = self.sign(&payload).await?;
                self.builder.broadcast_reserved(&signed, reservation).await
            }
        }
    }

    async fn sign(&self, payload: &SigningPayload) -> Result<String> {
        self.client
            .sign_transaction(
                &self.config.organization_id,
                &self.config.sign_with,
                &payload.to_hex(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chain::tests::FakeChain,
        client::tests::{activity_json, test_client},
        transaction_builder::tests::{builder, gwei, sign},
    };
    use k256::ecdsa::SigningKey;
    use passkey_wallet::{
        constants::paths::SIGN_TRANSACTION,
        transaction::{address_from_verifying_key, parse_address},
        types::OrganizationId,
    };
    use rand::rngs::OsRng;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock, MockServer, Request, ResponseTemplate,
    };

    /// Plays the custody service: signs whatever payload it is handed with
    /// the warchest key.
    async fn mount_signer(server: &MockServer, key: SigningKey) {
        Mock::given(method("POST"))
            .and(path(SIGN_TRANSACTION))
            .and(body_partial_json(json!({
                "organizationId": "org-warchest",
                "parameters": { "signWith": "warchest-key" }
            })))
            .respond_with(move |request: &Request| {
                let body: serde_json::Value = request.body_json().unwrap();
                let unsigned = body["parameters"]["unsignedTransaction"].as_str().unwrap();
                let payload = SigningPayload::from_hex(unsigned).unwrap();
                ResponseTemplate::new(200).set_body_json(activity_json(
                    "act-sign",
                    "org-warchest",
                    "ACTIVITY_TYPE_SIGN_TRANSACTION_V2",
                    "ACTIVITY_STATUS_COMPLETED",
                    Some(json!({ "signTransactionResult": {
                        "signedTransaction": sign(&payload, &key)
                    }})),
                ))
            })
            .mount(server)
            .await;
    }

    async fn warchest(chain: FakeChain) -> (Warchest, Arc<FakeChain>, MockServer) {
        let key = SigningKey::random(&mut OsRng);
        let address = address_from_verifying_key(key.verifying_key());
        let server = MockServer::start().await;
        mount_signer(&server, key).await;

        let (builder, chain) = builder(chain);
        let config = WarchestConfig {
            organization_id: OrganizationId::new("org-warchest"),
            sign_with: "warchest-key".to_string(),
            address,
        };
        (
            Warchest::new(config, test_client(&server), builder),
            chain,
            server,
        )
    }

    fn recipient() -> Address {
        parse_address("0x5dc4a8ec5e0b1b6ba1a09e4fbe5ac9bd0c21ef4d").unwrap()
    }

    #[test]
    fn drops_are_capped() {
        assert_eq!(drops_left(0), MAX_DROPS_PER_WALLET);
        assert_eq!(drops_left(9), 1);
        assert_eq!(drops_left(10), 0);
        assert_eq!(drops_left(200), 0);
    }

    #[tokio::test]
    async fn drop_sends_fixed_amount_from_warchest() {
        let (warchest, chain, _server) = warchest(FakeChain::with_fees(gwei(10), gwei(1))).await;
        chain.set_nonce(warchest.address(), 4);

        let hash = warchest.drop_to(recipient(), 0).await.unwrap();
        assert!(hash.starts_with("0x"));

        let broadcasts = chain.broadcasts.lock().unwrap();
        assert_eq!(broadcasts.len(), 1);
        let signed = passkey_wallet::transaction::SignedTransaction::from_bytes(broadcasts[0].clone())
            .unwrap();
        assert_eq!(signed.recover_sender().unwrap(), warchest.address());
        assert_eq!(signed.transaction().to, recipient());
        assert_eq!(signed.transaction().value, U256::from(DROP_AMOUNT_WEI));
        assert_eq!(signed.nonce(), 4);
    }

    #[tokio::test]
    async fn failed_signature_frees_the_nonce() {
        let (warchest, chain, server) = warchest(FakeChain::with_fees(gwei(10), gwei(1))).await;
        chain.set_nonce(warchest.address(), 4);

        Mock::given(method("POST"))
            .and(path(SIGN_TRANSACTION))
            .respond_with(ResponseTemplate::new(200).set_body_json(activity_json(
                "act-rejected",
                "org-warchest",
                "ACTIVITY_TYPE_SIGN_TRANSACTION_V2",
                "ACTIVITY_STATUS_REJECTED",
                None,
            )))
            .with_priority(1)
            .up_to_n_times(1)
            .mount(&server)
            .await;

        assert!(matches!(
            warchest.drop_to(recipient(), 0).await,
            Err(PasskeyWalletClientError::ActivityTerminalFailure { .. })
        ));
        assert!(chain.broadcasts.lock().unwrap().is_empty());

        let _ = warchest.drop_to(recipient(), 0).await.unwrap();
        let broadcasts = chain.broadcasts.lock().unwrap();
        let signed = passkey_wallet::transaction::SignedTransaction::from_bytes(broadcasts[0].clone())
            .unwrap();
        assert_eq!(signed.nonce(), 4);
    }

    #[tokio::test]
    async fn exhausted_wallet_gets_no_drop() {
        let (warchest, chain, _server) = warchest(FakeChain::with_fees(gwei(10), gwei(1))).await;

        assert!(matches!(
            warchest.drop_to(recipient(), MAX_DROPS_PER_WALLET).await,
            Err(PasskeyWalletClientError::NoDropsLeft)
        ));
        assert!(chain.broadcasts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn override_sends_zero_to_self_at_given_nonce() {
        let (warchest, chain, _server) = warchest(FakeChain::with_fees(gwei(10), gwei(1))).await;
        chain.set_nonce(warchest.address(), 12);

        let _ = warchest.override_nonce(7).await.unwrap();

        let broadcasts = chain.broadcasts.lock().unwrap();
        let signed = passkey_wallet::transaction::SignedTransaction::from_bytes(broadcasts[0].clone())
            .unwrap();
        assert_eq!(signed.nonce(), 7);
        assert_eq!(signed.transaction().to, warchest.address());
        assert!(signed.transaction().value.is_zero());
    }

    #[tokio::test]
    async fn missing_config_is_reported() {
        let server = MockServer::start().await;
        let (builder, _) = builder(FakeChain::default());
        assert!(matches!(
            Warchest::from_config(None, test_client(&server), builder),
            Err(PasskeyWalletClientError::WarchestNotConfigured)
        ));
    }
}
