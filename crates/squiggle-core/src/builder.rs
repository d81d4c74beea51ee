//! Materializes the allocation set from table rows.
//!
//! Every derived quantity is computed here with [`Units`]: sale tier token
//! counts and affiliate reserves, prices, per-wallet limits, vesting pool
//! and account amounts. Supply totals are not checked here; that is the
//! validator's job.

use std::collections::HashSet;

use tracing::debug;

use crate::allocation::{Allocation, SaleStart, SaleTier, VestingPool};
use crate::constants::PPM_PRECISION;
use crate::error::{ModelError, UnitError};
use crate::table::{AccountSpec, AllocationSpec, SaleSpec, Share, VestingSpec};
use crate::types::{Amount, VestingSchedule};
use crate::units::Units;

fn schema(id: &str, expected: impl Into<String>, actual: impl Into<String>) -> ModelError {
    ModelError::SchemaMismatch {
        id: id.to_string(),
        expected: expected.into(),
        actual: actual.into(),
    }
}

fn unit(id: &str) -> impl Fn(UnitError) -> ModelError + '_ {
    move |source| ModelError::Unit {
        id: id.to_string(),
        source,
    }
}

fn check_vesting(id: &str, v: &VestingSchedule) -> Result<(), ModelError> {
    let unlocked = v.tge_percent.saturating_add(v.cliff_percent);
    if unlocked > PPM_PRECISION {
        return Err(schema(
            id,
            format!("tgePercent + cliffPercent <= {PPM_PRECISION}"),
            unlocked.to_string(),
        ));
    }
    Ok(())
}

/// Derive a sale tier.
///
/// The tier's target percent covers both the tokens sold and the affiliate
/// pool paid on top of them: `sold * (1 + rate) = target`. Sold tokens are
/// `percent_of_supply(target / (1 + rate))` and the affiliate reserve is
/// the rest of `percent_of_supply(target)`, so the tier's obligation is
/// exactly the target amount.
pub fn build_sale(units: &Units, spec: &SaleSpec) -> Result<Allocation, ModelError> {
    let id = spec.id.as_str();
    if spec.affiliate_percent >= PPM_PRECISION {
        return Err(schema(
            id,
            format!("affiliatePercent < {PPM_PRECISION}"),
            spec.affiliate_percent.to_string(),
        ));
    }
    check_vesting(id, &spec.vesting)?;

    let price = units.fiat_amount(&spec.price).map_err(unit(id))?;
    if price.is_zero() {
        return Err(schema(id, "salePrice > 0", "0"));
    }

    let target = units.percent_of_supply(&spec.target_percent).map_err(unit(id))?;
    let sold_percent =
        Units::net_of_affiliate(&spec.target_percent, spec.affiliate_percent).map_err(unit(id))?;
    let tokens = units.percent_of_supply(&sold_percent).map_err(unit(id))?;
    let affiliate_reserve = target.checked_sub(tokens).ok_or(ModelError::Unit {
        id: id.to_string(),
        source: UnitError::Underflow,
    })?;

    let min_per_wallet = units.whole_tokens(spec.min_per_wallet.into()).map_err(unit(id))?;
    if min_per_wallet > target {
        return Err(schema(
            id,
            format!("saleMinPerWallet <= {target}"),
            min_per_wallet.to_string(),
        ));
    }

    debug!(id, %tokens, %affiliate_reserve, %price, "derived sale tier");
    Ok(Allocation::sale(
        id,
        tokens,
        SaleTier {
            name: spec.name.clone(),
            cooldown_duration: spec.cooldown_duration,
            start: spec.start,
            price,
            min_per_wallet,
            max_per_wallet: target,
            affiliate_reserve,
            affiliate_percent: spec.affiliate_percent,
            vesting: spec.vesting,
        },
    ))
}

pub fn build_vesting(units: &Units, spec: &VestingSpec) -> Result<Allocation, ModelError> {
    let id = spec.id.as_str();
    check_vesting(id, &spec.vesting)?;
    let tokens = units.percent_of_supply(&spec.percent).map_err(unit(id))?;
    debug!(id, %tokens, "derived vesting pool");
    Ok(Allocation::vesting(
        id,
        tokens,
        VestingPool {
            name: spec.name.clone(),
            vesting: spec.vesting,
        },
    ))
}

pub fn build_account(units: &Units, spec: &AccountSpec) -> Result<Allocation, ModelError> {
    let id = spec.id.as_str();
    let tokens: Amount = match &spec.share {
        Share::Percent(p) => units.percent_of_supply(p).map_err(unit(id))?,
        Share::PercentNet { gross, withheld } => {
            let gross = units.percent_of_supply(gross).map_err(unit(id))?;
            let withheld = units.percent_of_supply(withheld).map_err(unit(id))?;
            gross.checked_sub(withheld).ok_or(ModelError::Unit {
                id: id.to_string(),
                source: UnitError::Underflow,
            })?
        }
        Share::Exact(t) => *t,
    };
    debug!(id, %tokens, address = %spec.address, "derived direct account");
    Ok(Allocation::account(id, tokens, spec.address))
}

/// Build the full allocation set in declaration order.
///
/// Rejects empty or duplicate ids, and sale tiers whose start does not
/// follow the tier order: the first tier opens at an absolute time, every
/// later tier opens when its predecessor closes.
pub fn build_allocations(
    units: &Units,
    specs: &[AllocationSpec],
) -> Result<Vec<Allocation>, ModelError> {
    let mut seen = HashSet::new();
    let mut sale_index = 0usize;
    let mut allocations = Vec::with_capacity(specs.len());

    for spec in specs {
        let id = spec.id();
        if id.trim().is_empty() {
            return Err(schema("<unnamed>", "non-empty id", "empty"));
        }
        if !seen.insert(id) {
            return Err(ModelError::DuplicateId(id.to_string()));
        }

        let allocation = match spec {
            AllocationSpec::Sale(sale) => {
                match (sale_index, sale.start) {
                    (0, SaleStart::AfterPrevious) => {
                        return Err(schema(id, "absolute saleStart on first tier", "missing"));
                    }
                    (n, SaleStart::At(ts)) if n > 0 => {
                        return Err(schema(id, "saleStart 0 after first tier", ts.to_string()));
                    }
                    _ => {}
                }
                sale_index += 1;
                build_sale(units, sale)?
            }
            AllocationSpec::Vesting(pool) => build_vesting(units, pool)?,
            AllocationSpec::Account(account) => build_account(units, account)?,
        };
        allocations.push(allocation);
    }

    Ok(allocations)
}
