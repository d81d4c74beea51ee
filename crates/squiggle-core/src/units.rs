//! Fixed-point unit conversion.
//!
//! Author-facing literals (percent of supply, dollar prices, calendar dates,
//! vesting months) become exact integer base units here. No floating point
//! is involved at any step: decimal literals parse into exact rationals,
//! which are quantized to a fixed number of decimal digits with round half
//! up, then applied with flooring integer division.

use chrono::{DateTime, NaiveDate};
use num_traits::{CheckedDiv, Zero};

use crate::constants::{
    DAYS_PER_VESTING_MONTH, FIAT_DECIMALS, FIAT_QUANTUM, PERCENT_DIVISOR, PERCENT_QUANTUM,
    SECONDS_PER_DAY, TOKEN_DECIMALS, TOTAL_SUPPLY,
};
use crate::error::UnitError;
use crate::types::Amount;

/// Exact non-negative rational.
pub type Ratio = num_rational::Ratio<u128>;

/// Longest accepted fractional part of a decimal literal.
const MAX_FRACTION_DIGITS: usize = 30;

/// Parse a plain decimal literal (`"18"`, `"0.5"`, `".000034"`) into an
/// exact rational.
///
/// Signs, exponents, separators and empty input are rejected.
///
/// # Examples
///
/// ```
/// use squiggle_core::units::{parse_decimal, Ratio};
/// assert_eq!(parse_decimal("0.5").unwrap(), Ratio::new(1, 2));
/// assert!(parse_decimal("1e3").is_err());
/// ```
pub fn parse_decimal(literal: &str) -> Result<Ratio, UnitError> {
    let invalid = || UnitError::InvalidDecimal(literal.to_string());
    let s = literal.trim();
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    // A second '.' ends up in `frac_part` and fails the digit check.
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(invalid());
    }
    if frac_part.len() > MAX_FRACTION_DIGITS {
        return Err(invalid());
    }

    let digits = format!("{int_part}{frac_part}");
    let numer: u128 = digits.parse().map_err(|_| UnitError::Overflow)?;
    let denom = 10u128
        .checked_pow(frac_part.len() as u32)
        .ok_or(UnitError::Overflow)?;
    Ok(Ratio::new(numer, denom))
}

/// Parse a decimal literal or a quotient of two (`"0.5/1.1"`).
pub fn parse_ratio(literal: &str) -> Result<Ratio, UnitError> {
    match literal.split_once('/') {
        Some((numer, denom)) => {
            let denom = parse_decimal(denom)?;
            if denom.is_zero() {
                return Err(UnitError::DivisionByZero);
            }
            parse_decimal(numer)?
                .checked_div(&denom)
                .ok_or(UnitError::Overflow)
        }
        None => parse_decimal(literal),
    }
}

/// Render a ratio so that [`parse_ratio`] reads it back exactly: a decimal
/// literal when the denominator divides a power of ten, `n/d` otherwise.
///
/// # Examples
///
/// ```
/// use squiggle_core::units::{format_ratio, Ratio};
/// assert_eq!(format_ratio(&Ratio::new(3, 4)), "0.75");
/// assert_eq!(format_ratio(&Ratio::new(1, 3)), "1/3");
/// ```
pub fn format_ratio(value: &Ratio) -> String {
    let (numer, denom) = (*value.numer(), *value.denom());
    let mut scale = 1u128;
    for digits in 0..=MAX_FRACTION_DIGITS {
        if scale % denom == 0 {
            let Some(scaled) = numer.checked_mul(scale / denom) else {
                break;
            };
            if digits == 0 {
                return scaled.to_string();
            }
            let int_part = scaled / scale;
            let frac_part = scaled % scale;
            return format!("{int_part}.{frac_part:0width$}", width = digits);
        }
        match scale.checked_mul(10) {
            Some(next) => scale = next,
            None => break,
        }
    }
    format!("{numer}/{denom}")
}

/// `round(value * scale)` with ties rounding up.
///
/// # Examples
///
/// ```
/// use squiggle_core::units::{quantize, Ratio};
/// assert_eq!(quantize(&Ratio::new(1, 2), 1).unwrap(), 1);
/// assert_eq!(quantize(&Ratio::new(1, 3), 100).unwrap(), 33);
/// ```
pub fn quantize(value: &Ratio, scale: u128) -> Result<u128, UnitError> {
    let numer = value
        .numer()
        .checked_mul(scale)
        .and_then(|n| n.checked_mul(2))
        .ok_or(UnitError::Overflow)?;
    let denom = value.denom().checked_mul(2).ok_or(UnitError::Overflow)?;
    // floor((2 * n * scale + d) / (2 * d)) == floor(n * scale / d + 1/2)
    let biased = numer.checked_add(*value.denom()).ok_or(UnitError::Overflow)?;
    Ok(biased / denom)
}

/// `floor(total * round(percent * 1e8) / 1e10)`.
///
/// `percent` is in percent units: `0.5` is half a percent.
///
/// # Examples
///
/// ```
/// use squiggle_core::types::Amount;
/// use squiggle_core::units::{parse_decimal, percent_of};
/// let half = parse_decimal("0.5").unwrap();
/// assert_eq!(percent_of(Amount::from(1_000_000u64), &half).unwrap(), Amount::from(5_000u64));
/// ```
pub fn percent_of(total: Amount, percent: &Ratio) -> Result<Amount, UnitError> {
    let quantized = Amount::from(quantize(percent, PERCENT_QUANTUM)?);
    let scaled = total.checked_mul(quantized).ok_or(UnitError::Overflow)?;
    Ok(scaled / Amount::from(PERCENT_DIVISOR))
}

/// `round(dollars * 1e6) * 10^decimals / 1e6`.
pub fn fiat_amount_with(dollars: &Ratio, decimals: u32) -> Result<Amount, UnitError> {
    let micros = Amount::from(quantize(dollars, FIAT_QUANTUM)?);
    let unit = pow10(decimals)?;
    let scaled = micros.checked_mul(unit).ok_or(UnitError::Overflow)?;
    Ok(scaled / Amount::from(FIAT_QUANTUM))
}

/// Whole seconds since the Unix epoch for an absolute calendar instant.
///
/// Accepts RFC 3339 (`2024-05-31T15:43:34Z`, offsets allowed) and bare
/// `YYYY-MM-DD` dates, which are taken as UTC midnight. Instants before the
/// epoch are rejected.
///
/// # Examples
///
/// ```
/// use squiggle_core::units::calendar_timestamp;
/// assert_eq!(calendar_timestamp("1970-01-02").unwrap(), 86_400);
/// assert!(calendar_timestamp("yesterday").is_err());
/// ```
pub fn calendar_timestamp(iso_date: &str) -> Result<u64, UnitError> {
    let s = iso_date.trim();
    let seconds = match DateTime::parse_from_rfc3339(s) {
        Ok(instant) => instant.timestamp(),
        Err(_) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| UnitError::InvalidDate(iso_date.to_string()))?,
    };
    u64::try_from(seconds).map_err(|_| UnitError::InvalidDate(iso_date.to_string()))
}

/// Vesting months to seconds, where a month is exactly 31 days.
///
/// # Examples
///
/// ```
/// use squiggle_core::units::months_to_seconds;
/// assert_eq!(months_to_seconds(2), 5_356_800);
/// ```
pub const fn months_to_seconds(months: u64) -> u64 {
    months.saturating_mul(DAYS_PER_VESTING_MONTH * SECONDS_PER_DAY)
}

fn pow10(exp: u32) -> Result<Amount, UnitError> {
    // 10^77 is the largest power of ten below 2^256.
    if exp > 77 {
        return Err(UnitError::Overflow);
    }
    Ok(Amount::exp10(exp as usize))
}

/// Supply-bound conversion context.
///
/// Bundles the total supply with the token and fiat decimals so table
/// builders convert every literal against the same denominations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Units {
    pub total_supply: Amount,
    pub token_decimals: u32,
    pub fiat_decimals: u32,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            total_supply: Amount::from(TOTAL_SUPPLY),
            token_decimals: TOKEN_DECIMALS,
            fiat_decimals: FIAT_DECIMALS,
        }
    }
}

impl Units {
    /// Default decimals with a custom total supply.
    pub fn with_supply(total_supply: Amount) -> Self {
        Self {
            total_supply,
            ..Self::default()
        }
    }

    pub fn percent_of_supply(&self, percent: &Ratio) -> Result<Amount, UnitError> {
        percent_of(self.total_supply, percent)
    }

    pub fn fiat_amount(&self, dollars: &Ratio) -> Result<Amount, UnitError> {
        fiat_amount_with(dollars, self.fiat_decimals)
    }

    /// `count` whole tokens in base units.
    pub fn whole_tokens(&self, count: u128) -> Result<Amount, UnitError> {
        Amount::from(count)
            .checked_mul(pow10(self.token_decimals)?)
            .ok_or(UnitError::Overflow)
    }

    /// Percent of supply sold by a tier whose sold amount plus affiliate
    /// pool makes up `target`: `target / (1 + affiliate_ppm / 1e6)`.
    pub fn net_of_affiliate(target: &Ratio, affiliate_ppm: u64) -> Result<Ratio, UnitError> {
        let factor = Ratio::new(
            u128::from(crate::constants::PPM_PRECISION) + u128::from(affiliate_ppm),
            u128::from(crate::constants::PPM_PRECISION),
        );
        target.checked_div(&factor).ok_or(UnitError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(s: &str) -> Ratio {
        parse_decimal(s).unwrap()
    }

    fn amount(n: u128) -> Amount {
        Amount::from(n)
    }

    // --- parse_decimal ---

    #[test]
    fn parse_integer_and_fraction() {
        assert_eq!(dec("18"), Ratio::from_integer(18));
        assert_eq!(dec("0.000034"), Ratio::new(34, 1_000_000));
        assert_eq!(dec(".25"), Ratio::new(1, 4));
        assert_eq!(dec("5."), Ratio::from_integer(5));
        assert_eq!(dec(" 1.0975 "), Ratio::new(10_975, 10_000));
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", ".", "-1", "+1", "1e3", "1.2.3", "1,5", "0x10", "abc"] {
            assert!(
                matches!(parse_decimal(bad), Err(UnitError::InvalidDecimal(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn parse_rejects_overlong_fraction() {
        let literal = format!("0.{}", "1".repeat(31));
        assert!(parse_decimal(&literal).is_err());
    }

    #[test]
    fn parse_ratio_quotient() {
        assert_eq!(parse_ratio("0.5/1.1").unwrap(), Ratio::new(5, 11));
        assert_eq!(parse_ratio("2").unwrap(), Ratio::from_integer(2));
        assert_eq!(parse_ratio("1/0"), Err(UnitError::DivisionByZero));
        assert!(parse_ratio("1/2/3").is_err());
    }

    #[test]
    fn oversized_quotient_is_overflow() {
        let max = u128::MAX.to_string();
        assert_eq!(parse_ratio(&format!("{max}/0.7")), Err(UnitError::Overflow));
        assert_eq!(
            Units::net_of_affiliate(&Ratio::from_integer(u128::MAX), 1),
            Err(UnitError::Overflow)
        );
    }

    #[test]
    fn format_ratio_round_trips() {
        for r in [
            Ratio::from_integer(18),
            Ratio::new(3, 2),
            Ratio::new(34, 1_000_000),
            Ratio::new(5, 11),
            Ratio::from_integer(0),
        ] {
            assert_eq!(parse_ratio(&format_ratio(&r)).unwrap(), r, "{r}");
        }
        assert_eq!(format_ratio(&Ratio::new(34, 1_000_000)), "0.000034");
        assert_eq!(format_ratio(&Ratio::from_integer(18)), "18");
    }

    // --- quantize ---

    #[test]
    fn quantize_rounds_half_up() {
        assert_eq!(quantize(&Ratio::new(1, 2), 1).unwrap(), 1);
        assert_eq!(quantize(&Ratio::new(3, 2), 1).unwrap(), 2);
        assert_eq!(quantize(&Ratio::new(49, 100), 1).unwrap(), 0);
        assert_eq!(quantize(&Ratio::new(2, 3), 1).unwrap(), 1);
    }

    #[test]
    fn quantize_affiliate_solves() {
        // 0.5 / 1.1 = 0.45454545|45.. percent
        let p = Units::net_of_affiliate(&dec("0.5"), 100_000).unwrap();
        assert_eq!(quantize(&p, PERCENT_QUANTUM).unwrap(), 45_454_545);
        // 1.25 / 1.095 = 1.14155251|14..
        let p = Units::net_of_affiliate(&dec("1.25"), 95_000).unwrap();
        assert_eq!(quantize(&p, PERCENT_QUANTUM).unwrap(), 114_155_251);
        // 0.75 / 1.0975 = 0.68337129|84.. rounds up
        let p = Units::net_of_affiliate(&dec("0.75"), 97_500).unwrap();
        assert_eq!(quantize(&p, PERCENT_QUANTUM).unwrap(), 68_337_130);
    }

    #[test]
    fn quantize_overflow_is_error() {
        let huge = Ratio::from_integer(u128::MAX / 2);
        assert_eq!(quantize(&huge, 10), Err(UnitError::Overflow));
    }

    // --- percent_of ---

    #[test]
    fn half_percent_of_a_million_is_exact() {
        assert_eq!(percent_of(amount(1_000_000), &dec("0.5")).unwrap(), amount(5_000));
    }

    #[test]
    fn percent_of_floors_after_quantizing() {
        // 1000 * 0.45454545% = 4.5454545 -> 4
        let p = Units::net_of_affiliate(&dec("0.5"), 100_000).unwrap();
        assert_eq!(percent_of(amount(1_000), &p).unwrap(), amount(4));
    }

    #[test]
    fn percent_tie_below_quantum_rounds_up() {
        // 0.000000005% * 1e8 = 0.5 -> 1 quantum
        let p = dec("0.000000005");
        assert_eq!(quantize(&p, PERCENT_QUANTUM).unwrap(), 1);
        assert_eq!(
            percent_of(amount(PERCENT_DIVISOR), &p).unwrap(),
            amount(1)
        );
    }

    #[test]
    fn full_supply_percentages() {
        let units = Units::default();
        assert_eq!(units.percent_of_supply(&dec("100")).unwrap(), units.total_supply);
        // 15% and 1.5% floor separately, so their difference is one unit
        // above 13.5% of supply.
        let fifteen = units.percent_of_supply(&dec("15")).unwrap();
        let dex = units.percent_of_supply(&dec("1.5")).unwrap();
        let net = units.percent_of_supply(&dec("13.5")).unwrap();
        assert_eq!(fifteen, Amount::from_dec_str("51515151515151515151515151515").unwrap());
        assert_eq!(dex, Amount::from_dec_str("5151515151515151515151515151").unwrap());
        assert_eq!(fifteen - dex, net + Amount::one());
    }

    #[test]
    fn eighteen_percent_needs_wide_arithmetic() {
        let units = Units::default();
        let team = units.percent_of_supply(&dec("18")).unwrap();
        assert_eq!(team, Amount::from_dec_str("61818181818181818181818181818").unwrap());
    }

    // --- fiat_amount ---

    #[test]
    fn fiat_price_in_base_units() {
        let units = Units::default();
        assert_eq!(
            units.fiat_amount(&dec("0.000034")).unwrap(),
            amount(34_000_000_000_000)
        );
        assert_eq!(
            units.fiat_amount(&dec("1")).unwrap(),
            amount(1_000_000_000_000_000_000)
        );
    }

    #[test]
    fn fiat_quantizes_to_micro_dollars() {
        // 0.0000345 -> 34.5 micros -> 35
        assert_eq!(
            fiat_amount_with(&dec("0.0000345"), 6).unwrap(),
            amount(35)
        );
        assert_eq!(fiat_amount_with(&dec("0.0000004"), 18).unwrap(), Amount::zero());
    }

    #[test]
    fn fiat_rejects_absurd_decimals() {
        assert_eq!(fiat_amount_with(&dec("1"), 90), Err(UnitError::Overflow));
    }

    // --- calendar_timestamp ---

    #[test]
    fn first_sale_start_timestamp() {
        assert_eq!(calendar_timestamp("2024-05-31T15:43:34Z").unwrap(), 1_717_170_214);
    }

    #[test]
    fn timestamp_honours_offset() {
        assert_eq!(
            calendar_timestamp("2024-05-31T17:43:34+02:00").unwrap(),
            calendar_timestamp("2024-05-31T15:43:34Z").unwrap()
        );
    }

    #[test]
    fn bare_date_is_utc_midnight() {
        assert_eq!(calendar_timestamp("2026-01-01").unwrap(), 20_454 * 86_400);
    }

    #[test]
    fn invalid_dates_rejected() {
        for bad in ["", "2024-13-01", "2024-05-31T25:00:00Z", "May 31", "1969-12-31"] {
            assert!(
                matches!(calendar_timestamp(bad), Err(UnitError::InvalidDate(_))),
                "accepted {bad:?}"
            );
        }
    }

    // --- months_to_seconds ---

    #[test]
    fn months_are_31_days() {
        assert_eq!(months_to_seconds(2), 2 * 31 * 24 * 3600);
        assert_eq!(months_to_seconds(2), 5_356_800);
        assert_eq!(months_to_seconds(12), 32_140_800);
        assert_eq!(months_to_seconds(0), 0);
    }

    #[test]
    fn months_saturate() {
        assert_eq!(months_to_seconds(u64::MAX), u64::MAX);
    }

    // --- Units ---

    #[test]
    fn whole_tokens_scale_by_decimals() {
        let units = Units::default();
        assert_eq!(
            units.whole_tokens(1_000_000).unwrap(),
            Amount::from_dec_str("1000000000000000000000000").unwrap()
        );
    }

    #[test]
    fn with_supply_keeps_decimals() {
        let units = Units::with_supply(amount(1_000));
        assert_eq!(units.total_supply, amount(1_000));
        assert_eq!(units.token_decimals, TOKEN_DECIMALS);
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn percent_never_exceeds_supply(
            supply in 0u128..u128::MAX / 2,
            hundredths in 0u128..=10_000u128,
        ) {
            let p = Ratio::new(hundredths, 100);
            let got = percent_of(Amount::from(supply), &p).unwrap();
            prop_assert!(got <= Amount::from(supply));
        }

        #[test]
        fn percent_is_monotonic(
            supply in 0u128..1_000_000_000_000_000u128,
            a in 0u128..=1_000_000u128,
            b in 0u128..=1_000_000u128,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let total = Amount::from(supply);
            let f_lo = percent_of(total, &Ratio::new(lo, 10_000)).unwrap();
            let f_hi = percent_of(total, &Ratio::new(hi, 10_000)).unwrap();
            prop_assert!(f_lo <= f_hi);
        }

        #[test]
        fn quantize_is_within_half_a_step(n in 0u128..1_000_000_000u128, d in 1u128..1_000_000u128) {
            let r = Ratio::new(n, d);
            let q = quantize(&r, 1_000).unwrap();
            // |q - n*1000/d| <= 1/2  <=>  |2*q*d - 2*n*1000| <= d
            let lhs = 2 * q * d;
            let rhs = 2 * n * 1_000;
            let diff = lhs.abs_diff(rhs);
            prop_assert!(diff <= d);
        }
    }
}
