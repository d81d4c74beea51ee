//! Shared table builders and plan inspectors for integration tests.

use squiggle_core::allocation::SaleStart;
use squiggle_core::table::{AccountSpec, AllocationSpec, SaleSpec, Share, VestingSpec};
use squiggle_core::types::{Address, Amount, VestingSchedule};
use squiggle_core::units::{months_to_seconds, parse_decimal, Ratio, Units};
use squiggle_plan::{Arg, CompiledPlan};

/// First sale tier opening time used across tests (2024-05-31T15:43:34Z).
pub const FIRST_START: u64 = 1_717_170_214;

/// Deterministic address from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address([seed; 20])
}

pub fn ratio(literal: &str) -> Ratio {
    parse_decimal(literal).unwrap()
}

pub fn units(total_supply: u64) -> Units {
    Units::with_supply(Amount::from(total_supply))
}

/// Sale tier spec. `first` selects an absolute start; later tiers open after
/// the previous one.
pub fn sale(id: &str, percent: &str, affiliate_ppm: u64, first: bool) -> AllocationSpec {
    AllocationSpec::Sale(SaleSpec {
        id: id.to_string(),
        name: format!("Sale {id}"),
        cooldown_duration: 0,
        start: if first {
            SaleStart::At(FIRST_START)
        } else {
            SaleStart::AfterPrevious
        },
        price: ratio("0.000034"),
        target_percent: ratio(percent),
        min_per_wallet: 0,
        affiliate_percent: affiliate_ppm,
        vesting: VestingSchedule {
            tge_percent: 30_000,
            cliff_duration: months_to_seconds(2),
            cliff_percent: 100_000,
            linear_duration: months_to_seconds(12),
        },
    })
}

pub fn vesting(id: &str, percent: &str) -> AllocationSpec {
    AllocationSpec::Vesting(VestingSpec {
        id: id.to_string(),
        name: format!("Pool {id}"),
        percent: ratio(percent),
        vesting: VestingSchedule {
            tge_percent: 0,
            cliff_duration: months_to_seconds(4),
            cliff_percent: 100_000,
            linear_duration: months_to_seconds(36),
        },
    })
}

pub fn account(id: &str, seed: u8, percent: &str) -> AllocationSpec {
    AllocationSpec::Account(AccountSpec {
        id: id.to_string(),
        address: addr(seed),
        share: Share::Percent(ratio(percent)),
    })
}

/// Sum of the token constructor's amount sequence.
pub fn minted_total(plan: &CompiledPlan) -> Amount {
    let token = &plan.deployment().token;
    let id = token.action().map(|a| a.as_str()).unwrap_or_default();
    let Some(action) = plan.action(id) else {
        return Amount::zero();
    };
    match action.args().get(1) {
        Some(Arg::Array(amounts)) => amounts.iter().fold(Amount::zero(), |acc, a| match a {
            Arg::Uint(v) => acc + *v,
            _ => acc,
        }),
        _ => Amount::zero(),
    }
}

/// Contract names of every creation action, in order.
pub fn created_contracts(plan: &CompiledPlan) -> Vec<&str> {
    plan.actions().iter().filter_map(|a| a.contract()).collect()
}

/// Sum of every allocation's obligation in the compiled plan.
pub fn obligations_total(plan: &CompiledPlan) -> Amount {
    plan.allocations()
        .iter()
        .map(|a| a.obligation().unwrap())
        .fold(Amount::zero(), |acc, o| acc + o)
}
