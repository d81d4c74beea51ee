//! The Squiggle allocation table.
//!
//! Four seed tiers and fourteen public tiers with rising prices, three
//! vesting pools, and the CEX liquidity wallet. Everything not listed here
//! (1.5% of supply plus rounding dust) becomes the DEX liquidity reserve.
//!
//! All values are hardcoded and deterministic.

use crate::allocation::SaleStart;
use crate::constants::{FIRST_SALE_START, LIQUIDITY_DEX_PERCENT};
use crate::error::{ModelError, UnitError};
use crate::table::{AccountSpec, AllocationSpec, SaleSpec, Share, VestingSpec};
use crate::types::{Address, VestingSchedule};
use crate::units::{calendar_timestamp, months_to_seconds, parse_decimal};

/// One sale tier row: id, name, dollar price, target percent of supply,
/// minimum purchase in whole tokens, affiliate rate (ppm), TGE unlock
/// (ppm), cliff months, cliff unlock (ppm).
type TierRow = (&'static str, &'static str, &'static str, &'static str, u64, u64, u64, u64, u64);

#[rustfmt::skip]
const SALE_TIERS: [TierRow; 18] = [
    ("seed_sale_1", "Seed Sale Tier 1", "0.000034", "0.5", 1_000_000, 100_000, 30_000, 2, 100_000),
    ("seed_sale_2", "Seed Sale Tier 2", "0.000038", "0.75", 5_000_000, 97_500, 32_500, 2, 100_000),
    ("seed_sale_3", "Seed Sale Tier 3", "0.000044", "1.25", 5_000_000, 95_000, 35_000, 2, 100_000),
    ("seed_sale_4", "Seed Sale Tier 4", "0.000050", "1.50", 5_000_000, 92_500, 37_500, 2, 100_000),
    ("public_sale_1", "Public Sale Tier 1", "0.000057", "1.75", 5_000_000, 90_000, 50_000, 4, 50_000),
    ("public_sale_2", "Public Sale Tier 2", "0.000064", "2.00", 5_000_000, 87_500, 50_000, 4, 50_000),
    ("public_sale_3", "Public Sale Tier 3", "0.000073", "2.25", 1_000_000, 85_000, 50_000, 4, 50_000),
    ("public_sale_4", "Public Sale Tier 4", "0.000083", "2.50", 1_000_000, 80_000, 50_000, 4, 50_000),
    ("public_sale_5", "Public Sale Tier 5", "0.000094", "3.00", 1_000_000, 75_000, 50_000, 4, 50_000),
    ("public_sale_6", "Public Sale Tier 6", "0.000107", "3.50", 1_000_000, 70_000, 50_000, 4, 50_000),
    ("public_sale_7", "Public Sale Tier 7", "0.000121", "4.00", 1_000_000, 67_500, 50_000, 4, 50_000),
    ("public_sale_8", "Public Sale Tier 8", "0.000137", "4.50", 1_000_000, 65_000, 50_000, 4, 50_000),
    ("public_sale_9", "Public Sale Tier 9", "0.000156", "5.00", 1_000_000, 62_500, 50_000, 4, 50_000),
    ("public_sale_10", "Public Sale Tier 10", "0.000177", "5.50", 1_000_000, 60_000, 50_000, 4, 50_000),
    ("public_sale_11", "Public Sale Tier 11", "0.000201", "5.50", 1_000_000, 57_500, 50_000, 4, 50_000),
    ("public_sale_12", "Public Sale Tier 12", "0.000227", "5.50", 500_000, 55_000, 50_000, 4, 50_000),
    ("public_sale_13", "Public Sale Tier 13", "0.000258", "5.50", 500_000, 52_500, 50_000, 4, 50_000),
    ("public_sale_14", "Public Sale Tier 14", "0.000293", "5.50", 500_000, 50_000, 50_000, 4, 50_000),
];

/// Linear release after the cliff, shared by every sale tier.
const SALE_LINEAR_MONTHS: u64 = 12;

/// id, name, percent of supply, TGE unlock, cliff months, cliff unlock,
/// linear months.
type PoolRow = (&'static str, &'static str, &'static str, u64, u64, u64, u64);

const VESTING_POOLS: [PoolRow; 3] = [
    ("team", "Squiggle Monster Team Pool", "18", 0, 4, 100_000, 36),
    ("airdrop", "Squiggle Monster Airdrops", "1", 30_000, 4, 100_000, 24),
    ("marketing", "Squiggle Monster Marketing Pool", "6", 50_000, 4, 100_000, 24),
];

/// Gross CEX share before the DEX liquidity slice is withheld.
const CEX_PERCENT: &str = "15";

fn literal(id: &str, s: &str) -> Result<crate::units::Ratio, ModelError> {
    parse_decimal(s).map_err(|source: UnitError| ModelError::Unit {
        id: id.to_string(),
        source,
    })
}

/// The Squiggle table in declaration order, with the CEX allocation paid
/// to `cex_address`.
pub fn squiggle_table(cex_address: Address) -> Result<Vec<AllocationSpec>, ModelError> {
    let first_start = calendar_timestamp(FIRST_SALE_START).map_err(|source| ModelError::Unit {
        id: SALE_TIERS[0].0.to_string(),
        source,
    })?;

    let mut table = Vec::with_capacity(SALE_TIERS.len() + VESTING_POOLS.len() + 1);

    for (index, &(id, name, price, target, min, affiliate, tge, cliff_months, cliff)) in
        SALE_TIERS.iter().enumerate()
    {
        table.push(AllocationSpec::Sale(SaleSpec {
            id: id.to_string(),
            name: name.to_string(),
            cooldown_duration: 0,
            start: if index == 0 {
                SaleStart::At(first_start)
            } else {
                SaleStart::AfterPrevious
            },
            price: literal(id, price)?,
            target_percent: literal(id, target)?,
            min_per_wallet: min,
            affiliate_percent: affiliate,
            vesting: VestingSchedule {
                tge_percent: tge,
                cliff_duration: months_to_seconds(cliff_months),
                cliff_percent: cliff,
                linear_duration: months_to_seconds(SALE_LINEAR_MONTHS),
            },
        }));
    }

    for &(id, name, percent, tge, cliff_months, cliff, linear_months) in &VESTING_POOLS {
        table.push(AllocationSpec::Vesting(VestingSpec {
            id: id.to_string(),
            name: name.to_string(),
            percent: literal(id, percent)?,
            vesting: VestingSchedule {
                tge_percent: tge,
                cliff_duration: months_to_seconds(cliff_months),
                cliff_percent: cliff,
                linear_duration: months_to_seconds(linear_months),
            },
        }));
    }

    table.push(AllocationSpec::Account(AccountSpec {
        id: "liquidity_cex".to_string(),
        address: cex_address,
        share: Share::PercentNet {
            gross: literal("liquidity_cex", CEX_PERCENT)?,
            withheld: literal("liquidity_cex", LIQUIDITY_DEX_PERCENT)?,
        },
    }));

    Ok(table)
}
