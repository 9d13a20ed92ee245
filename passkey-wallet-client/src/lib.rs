//! Client side of the passkey wallet backend: talks to the remote custody
//! service (submitting, relaying and polling activities) and to an Ethereum
//! node (fees, nonces, broadcast).
#![warn(unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
#![forbid(rustdoc::broken_intra_doc_links)]

pub mod api;
pub mod chain;
pub mod client;
pub mod config;
pub mod error;
pub mod extractor;
pub mod poller;
pub mod relay;
pub mod stamper;
pub mod transaction_builder;
pub mod warchest;

pub use client::CustodyClient;
pub use config::Config;
pub use error::PasskeyWalletClientError;
pub use transaction_builder::TransactionBuilder;

pub type Result<T> = std::result::Result<T, PasskeyWalletClientError>;
