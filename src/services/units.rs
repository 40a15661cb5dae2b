//! Token base-unit conversions
//!
//! Amounts cross the contract boundary as unsigned big integers in base
//! units (amount * 10^decimals); display and persistence use decimals.
//! All arithmetic on amounts happens in base units to avoid float rounding.

use alloy::primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Convert a decimal token amount to base units, truncating anything below
/// the token's resolution. Returns None for negative amounts or overflow.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Option<U256> {
    if amount.is_sign_negative() {
        return None;
    }
    let factor = Decimal::from(10u64.checked_pow(decimals)?);
    let scaled = amount.checked_mul(factor)?.trunc();
    scaled.to_u128().map(U256::from)
}

/// Convert base units back to a decimal token amount. Returns None when the
/// value exceeds what a 96-bit decimal mantissa can carry.
pub fn from_base_units(value: U256, decimals: u32) -> Option<Decimal> {
    let raw = u128::try_from(value).ok()?;
    let raw = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(raw, decimals)
        .ok()
        .map(|d| d.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn scales_to_payment_token_units() {
        assert_eq!(to_base_units(dec!(0.007), 6), Some(U256::from(7_000u64)));
        assert_eq!(to_base_units(dec!(0.035), 6), Some(U256::from(35_000u64)));
        assert_eq!(to_base_units(dec!(1), 18), Some(U256::from(10u64).pow(U256::from(18u64))));
    }

    #[test]
    fn truncates_below_resolution() {
        assert_eq!(to_base_units(dec!(0.0000001), 6), Some(U256::ZERO));
    }

    #[test]
    fn rejects_negative_amounts() {
        assert_eq!(to_base_units(dec!(-1), 6), None);
    }

    #[test]
    fn round_trips_representative_amounts() {
        assert_eq!(from_base_units(U256::from(35_000u64), 6), Some(dec!(0.035)));
        assert_eq!(from_base_units(U256::ZERO, 18), Some(Decimal::ZERO));
    }

    #[test]
    fn overflow_is_none_not_wrap() {
        assert_eq!(from_base_units(U256::MAX, 18), None);
    }
}
