use super::{
    address_from_verifying_key, decode_hex, exact_list, keccak256, strip_tx_type,
    UnsignedTransaction, UNSIGNED_FIELD_COUNT,
};
use crate::{Address, PasskeyWalletError, H256, U256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// A signed EIP-1559 transaction as returned by the external signer, ready
/// for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    transaction: UnsignedTransaction,
    y_parity: u8,
    r: U256,
    s: U256,
    raw: Vec<u8>,
}

impl SignedTransaction {
    /// Parse a hex encoded signed transaction (`0x` prefix optional).
    pub fn from_hex(signed: &str) -> Result<Self, PasskeyWalletError> {
        Self::from_bytes(decode_hex(signed)?)
    }

    pub fn from_bytes(raw: Vec<u8>) -> Result<Self, PasskeyWalletError> {
        let body = strip_tx_type(&raw)?;
        let rlp = exact_list(body, UNSIGNED_FIELD_COUNT + 3)?;

        let transaction = UnsignedTransaction::decode_fields(&rlp)?;
        let y_parity: u8 = rlp.val_at(UNSIGNED_FIELD_COUNT)?;
        if y_parity > 1 {
            return Err(PasskeyWalletError::InvalidSignature);
        }
        let r = rlp.val_at(UNSIGNED_FIELD_COUNT + 1)?;
        let s = rlp.val_at(UNSIGNED_FIELD_COUNT + 2)?;

        Ok(Self {
            transaction,
            y_parity,
            r,
            s,
            raw,
        })
    }

    pub fn transaction(&self) -> &UnsignedTransaction {
        &self.transaction
    }

    pub fn nonce(&self) -> u64 {
        self.transaction.nonce
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// `0x` prefixed hex of the raw bytes, as sent to `eth_sendRawTransaction`.
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }

    /// Keccak-256 of the raw signed bytes.
    pub fn hash(&self) -> H256 {
        keccak256(&self.raw)
    }

    /// Transaction hash in its canonical `0x` prefixed lowercase hex form.
    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash().as_bytes()))
    }

    /// Recover the address whose key produced the signature.
    pub fn recover_sender(&self) -> Result<Address, PasskeyWalletError> {
        let prehash = self.transaction.signing_payload().signing_hash();

        let mut compact = [0u8; 64];
        self.r.to_big_endian(&mut compact[..32]);
        self.s.to_big_endian(&mut compact[32..]);

        let signature =
            Signature::from_slice(&compact).map_err(|_| PasskeyWalletError::InvalidSignature)?;
        let recovery_id =
            RecoveryId::from_byte(self.y_parity).ok_or(PasskeyWalletError::InvalidSignature)?;
        let key = VerifyingKey::recover_from_prehash(prehash.as_bytes(), &signature, recovery_id)
            .map_err(|_| PasskeyWalletError::InvalidSignature)?;

        Ok(address_from_verifying_key(&key))
    }
}
