//! Constants that are shared between other crates in this workspace.
//! Crate-specific constants should go in their respective crates.

/// Gas limit of a plain value transfer. No contract calls, no data.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// EIP-2718 type byte for EIP-1559 dynamic fee transactions.
pub const DYNAMIC_FEE_TX_TYPE: u8 = 0x02;

pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;
pub const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Amount sent from the warchest on each drop (0.05 ETH).
pub const DROP_AMOUNT_WEI: u128 = 50_000_000_000_000_000;
pub const MAX_DROPS_PER_WALLET: u8 = 10;

/// Longest sub-organization name the custody service accepts.
pub const MAX_SUB_ORGANIZATION_NAME_LEN: usize = 256;

pub const DEFAULT_CUSTODY_API_HOST: &str = "api.turnkey.com";

pub mod headers {
    pub const X_STAMP: &str = "X-Stamp";
    pub const X_STAMP_WEBAUTHN: &str = "X-Stamp-WebAuthn";
}

pub mod paths {
    pub const CREATE_SUB_ORGANIZATION: &str = "/public/v1/submit/create_sub_organization";
    pub const SIGN_TRANSACTION: &str = "/public/v1/submit/sign_transaction";
    pub const INIT_USER_EMAIL_RECOVERY: &str = "/public/v1/submit/init_user_email_recovery";
    pub const EMAIL_AUTH: &str = "/public/v1/submit/email_auth";
    pub const CREATE_API_ONLY_USERS: &str = "/public/v1/submit/create_api_only_users";
    pub const GET_ACTIVITY: &str = "/public/v1/query/get_activity";
    pub const WHOAMI: &str = "/public/v1/query/whoami";
    pub const LIST_WALLET_ACCOUNTS: &str = "/public/v1/query/list_wallet_accounts";
}

/// Error text returned by the custody service once a `RECOVER_USER` activity
/// has removed the temporary credential that stamped it.
pub const RECOVERY_CREDENTIAL_ROTATED_MESSAGE: &str = "no valid user found for authenticator";
