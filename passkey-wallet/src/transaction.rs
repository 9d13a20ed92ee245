//! EIP-1559 transfer transactions and the exact byte payload an external
//! signer must sign for them.
//!
//! The signing payload is `0x02 || rlp([chainId, nonce, maxPriorityFeePerGas,
//! maxFeePerGas, gasLimit, to, value, data, accessList])`. The field order is
//! part of the contract with the signer: any reordering or omission produces a
//! signature over different bytes.

mod signed;

pub use signed::SignedTransaction;

use crate::{
    constants::{DYNAMIC_FEE_TX_TYPE, TRANSFER_GAS_LIMIT},
    Address, PasskeyWalletError, H256, U256,
};
use k256::ecdsa::VerifyingKey;
use rlp::{Rlp, RlpStream};
use sha3::{Digest, Keccak256};
use std::{fmt::Display, str::FromStr};

/// Number of RLP items in an unsigned dynamic fee transaction.
const UNSIGNED_FIELD_COUNT: usize = 9;

/// Multiplier applied to node fee suggestions to bias toward timely inclusion.
pub const FEE_MULTIPLIER: u64 = 2;

/// Fee parameters of a dynamic fee transaction.
///
/// The only way to build one is [`Fees::from_suggested`] or [`Fees::new`], both
/// of which guarantee `gas_fee_cap >= gas_tip_cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fees {
    gas_tip_cap: U256,
    gas_fee_cap: U256,
}

impl Fees {
    /// Derive fees from the node's suggested gas price and priority fee.
    ///
    /// Both values are doubled. If the doubled tip exceeds the doubled gas
    /// price, the fee cap is raised to the doubled tip.
    pub fn from_suggested(gas_price: U256, gas_tip: U256) -> Self {
        let multiplier = U256::from(FEE_MULTIPLIER);
        let gas_fee_cap = gas_price.saturating_mul(multiplier);
        let gas_tip_cap = gas_tip.saturating_mul(multiplier);

        Self {
            gas_tip_cap,
            gas_fee_cap: gas_fee_cap.max(gas_tip_cap),
        }
    }

    pub fn new(gas_tip_cap: U256, gas_fee_cap: U256) -> Result<Self, PasskeyWalletError> {
        if gas_fee_cap < gas_tip_cap {
            return Err(PasskeyWalletError::FeeCapBelowTip {
                fee_cap: gas_fee_cap,
                tip: gas_tip_cap,
            });
        }
        Ok(Self {
            gas_tip_cap,
            gas_fee_cap,
        })
    }

    pub fn gas_tip_cap(&self) -> U256 {
        self.gas_tip_cap
    }

    pub fn gas_fee_cap(&self) -> U256 {
        self.gas_fee_cap
    }
}

/// An EIP-1559 transaction before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_tip_cap: U256,
    pub gas_fee_cap: U256,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
}

impl UnsignedTransaction {
    /// A native transfer: fixed gas limit, no data, no access list.
    pub fn new_transfer(chain_id: u64, nonce: u64, fees: Fees, to: Address, value: U256) -> Self {
        Self {
            chain_id,
            nonce,
            gas_tip_cap: fees.gas_tip_cap,
            gas_fee_cap: fees.gas_fee_cap,
            gas_limit: TRANSFER_GAS_LIMIT,
            to,
            value,
            data: Vec::new(),
        }
    }

    pub fn tx_type(&self) -> u8 {
        DYNAMIC_FEE_TX_TYPE
    }

    /// The exact bytes the external signer signs.
    pub fn signing_payload(&self) -> SigningPayload {
        let mut stream = RlpStream::new_list(UNSIGNED_FIELD_COUNT);
        self.append_fields(&mut stream);

        let mut bytes = vec![self.tx_type()];
        bytes.extend_from_slice(&stream.out());
        SigningPayload(bytes)
    }

    /// Encode this transaction together with a signature in the network
    /// format accepted by `eth_sendRawTransaction`.
    pub fn encode_signed(&self, y_parity: u8, r: U256, s: U256) -> Vec<u8> {
        let mut stream = RlpStream::new_list(UNSIGNED_FIELD_COUNT + 3);
        self.append_fields(&mut stream);
        let _ = stream.append(&y_parity).append(&r).append(&s);

        let mut bytes = vec![self.tx_type()];
        bytes.extend_from_slice(&stream.out());
        bytes
    }

    fn append_fields(&self, stream: &mut RlpStream) {
        let _ = stream
            .append(&self.chain_id)
            .append(&self.nonce)
            .append(&self.gas_tip_cap)
            .append(&self.gas_fee_cap)
            .append(&self.gas_limit)
            .append(&self.to)
            .append(&self.value)
            .append(&self.data);
        // Access list: always empty for transfers.
        let _ = stream.begin_list(0);
    }

    /// Decode the leading nine fields of a dynamic fee transaction list.
    fn decode_fields(rlp: &Rlp<'_>) -> Result<Self, PasskeyWalletError> {
        let access_list = rlp.at(8)?;
        if !access_list.is_list() || access_list.item_count()? != 0 {
            return Err(PasskeyWalletError::Parse(
                "non-empty access lists are not supported".to_string(),
            ));
        }

        let transaction = Self {
            chain_id: rlp.val_at(0)?,
            nonce: rlp.val_at(1)?,
            gas_tip_cap: rlp.val_at(2)?,
            gas_fee_cap: rlp.val_at(3)?,
            gas_limit: rlp.val_at(4)?,
            to: rlp.val_at(5)?,
            value: rlp.val_at(6)?,
            data: rlp.val_at(7)?,
        };

        // Reject payloads that could never have come from this crate.
        let _ = Fees::new(transaction.gas_tip_cap, transaction.gas_fee_cap)?;
        Ok(transaction)
    }
}

/// Opaque byte sequence an external signer signs: one type byte followed by
/// the canonical RLP encoding of an [`UnsignedTransaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningPayload(Vec<u8>);

impl SigningPayload {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_hex(payload: &str) -> Result<Self, PasskeyWalletError> {
        Ok(Self(decode_hex(payload)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Hex encoding without a `0x` prefix, the form the custody service
    /// expects in `unsignedTransaction`.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Keccak-256 of the payload; the digest that is actually signed.
    pub fn signing_hash(&self) -> H256 {
        keccak256(&self.0)
    }

    /// Decode the payload back into its transaction fields.
    pub fn decode(&self) -> Result<UnsignedTransaction, PasskeyWalletError> {
        let body = strip_tx_type(&self.0)?;
        let rlp = exact_list(body, UNSIGNED_FIELD_COUNT)?;
        UnsignedTransaction::decode_fields(&rlp)
    }
}

impl AsRef<[u8]> for SigningPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for SigningPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Parse a `0x`-prefixed (or bare) 20-byte hex address.
pub fn parse_address(address: &str) -> Result<Address, PasskeyWalletError> {
    let bytes =
        decode_hex(address).map_err(|_| PasskeyWalletError::InvalidAddress(address.to_string()))?;
    if bytes.len() != Address::len_bytes() {
        return Err(PasskeyWalletError::InvalidAddress(address.to_string()));
    }
    Ok(Address::from_slice(&bytes))
}

/// Full lowercase `0x` hex form of an address. [`Address`]'s `Display`
/// abbreviates, so use this wherever an address leaves the process.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// Ethereum address of a secp256k1 public key: the last 20 bytes of the
/// Keccak-256 hash of the uncompressed point, without its `0x04` prefix.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash.as_bytes()[12..])
}

pub fn keccak256(bytes: &[u8]) -> H256 {
    H256::from_slice(&Keccak256::digest(bytes))
}

/// Hex-decode, accepting an optional `0x` prefix.
pub(crate) fn decode_hex(value: &str) -> Result<Vec<u8>, PasskeyWalletError> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    Ok(hex::decode(digits)?)
}

fn strip_tx_type(bytes: &[u8]) -> Result<&[u8], PasskeyWalletError> {
    match bytes.split_first() {
        Some((&DYNAMIC_FEE_TX_TYPE, body)) => Ok(body),
        Some((&other, _)) => Err(PasskeyWalletError::UnsupportedTransactionType(other)),
        None => Err(PasskeyWalletError::Parse("empty transaction".to_string())),
    }
}

/// Interpret `bytes` as exactly one RLP list of `expected_items` items, with
/// nothing trailing it.
fn exact_list(bytes: &[u8], expected_items: usize) -> Result<Rlp<'_>, PasskeyWalletError> {
    let rlp = Rlp::new(bytes);
    if !rlp.is_list() {
        return Err(PasskeyWalletError::Parse(
            "transaction must be an RLP list".to_string(),
        ));
    }
    if rlp.payload_info()?.total() != bytes.len() {
        return Err(PasskeyWalletError::Parse(
            "trailing bytes after transaction list".to_string(),
        ));
    }
    let item_count = rlp.item_count()?;
    if item_count != expected_items {
        return Err(PasskeyWalletError::Parse(format!(
            "expected {expected_items} fields, got {item_count}"
        )));
    }
    Ok(rlp)
}

impl FromStr for SigningPayload {
    type Err = PasskeyWalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
