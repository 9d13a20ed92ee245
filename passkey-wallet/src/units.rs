//! Conversions between wei and human readable ether amounts.

use crate::{constants::WEI_PER_ETHER, PasskeyWalletError, U256};

const ETHER_DECIMALS: usize = 18;
const DISPLAY_DECIMALS: u32 = 2;

/// Format a wei balance as ether with two decimals, rounding half up.
pub fn format_ether(wei: U256) -> String {
    let wei_per_cent = U256::from(WEI_PER_ETHER / 10u128.pow(DISPLAY_DECIMALS));
    let half_cent = wei_per_cent / U256::from(2u8);

    let cents = wei.saturating_add(half_cent) / wei_per_cent;
    let hundred = U256::from(100u8);
    let whole = cents / hundred;
    let fraction = (cents % hundred).low_u64();
    format!("{whole}.{fraction:02}")
}

/// Parse a decimal ether amount (e.g. `"0.05"`) into wei. Amounts with more
/// precision than one wei are rejected rather than truncated.
pub fn parse_ether(amount: &str) -> Result<U256, PasskeyWalletError> {
    let invalid = || PasskeyWalletError::InvalidAmount(amount.to_string());
    let trimmed = amount.trim();

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if fraction.len() > ETHER_DECIMALS
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let whole = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole).map_err(|_| invalid())?
    };
    let fraction = if fraction.is_empty() {
        U256::zero()
    } else {
        let padded = format!("{fraction:0<width$}", width = ETHER_DECIMALS);
        U256::from_dec_str(&padded).map_err(|_| invalid())?
    };

    whole
        .checked_mul(U256::from(WEI_PER_ETHER))
        .and_then(|wei| wei.checked_add(fraction))
        .ok_or_else(invalid)
}
