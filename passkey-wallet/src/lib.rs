//! Transaction encoding, custody-service wire types, and other shared context
//! used by multiple entities in the passkey wallet backend.
//!
//! ⚠️ __Usage__: This crate is designed as a dependency for other crates in
//! the workspace, including `passkey-wallet-client` and `passkey-wallet-cli`.
//! Nothing in here performs I/O.
#![warn(unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
#![forbid(rustdoc::broken_intra_doc_links)]

pub mod constants;
pub mod error;
pub mod infrastructure;
pub mod transaction;
pub mod types;
pub mod units;

pub use error::PasskeyWalletError;
pub use primitive_types::{H160 as Address, H256, U256};
