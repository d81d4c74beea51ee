//! Residual liquidity assignment.
//!
//! Whatever the explicit allocations leave unassigned becomes the DEX
//! liquidity reserve. [`AllocationSet`] can only be obtained from
//! [`allocate_residual`], so the compiler never sees a set that has not
//! passed supply validation.

use squiggle_core::allocation::{Allocation, Variant};
use squiggle_core::error::{ModelError, PlanError};
use squiggle_core::types::Amount;

use crate::validator::SupplyReport;

/// A validated allocation set whose obligations sum to the total supply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationSet {
    allocations: Vec<Allocation>,
    report: SupplyReport,
}

impl AllocationSet {
    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Allocation> {
        self.allocations.iter()
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn report(&self) -> &SupplyReport {
        &self.report
    }

    pub fn total_supply(&self) -> Amount {
        self.report.total_supply
    }

    /// The residual reserve, always the last allocation.
    pub fn liquidity(&self) -> Option<&Allocation> {
        self.allocations
            .last()
            .filter(|a| a.variant() == Variant::LiquidityReserve)
    }

    /// Re-sum every obligation and compare against the total supply.
    pub fn check_conservation(&self) -> Result<(), PlanError> {
        let mut sum = Amount::zero();
        for allocation in &self.allocations {
            sum = allocation
                .obligation()
                .ok()
                .and_then(|o| sum.checked_add(o))
                .ok_or(PlanError::SupplyExceeded {
                    total_supply: self.report.total_supply,
                    allocated: Amount::MAX,
                })?;
        }
        if sum > self.report.total_supply {
            return Err(PlanError::SupplyExceeded {
                total_supply: self.report.total_supply,
                allocated: sum,
            });
        }
        if sum < self.report.total_supply {
            return Err(PlanError::SchemaMismatch {
                id: "<supply>".to_string(),
                expected: self.report.total_supply.to_string(),
                actual: sum.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn into_allocations(self) -> (Vec<Allocation>, SupplyReport) {
        (self.allocations, self.report)
    }
}

impl<'a> IntoIterator for &'a AllocationSet {
    type Item = &'a Allocation;
    type IntoIter = std::slice::Iter<'a, Allocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.allocations.iter()
    }
}

/// Append the liquidity reserve holding `report.remainder`.
///
/// `report` must come from validating exactly `allocations`; a mismatch is
/// caught by the conservation check before the set is returned.
pub fn allocate_residual(
    mut allocations: Vec<Allocation>,
    report: &SupplyReport,
    liquidity_id: &str,
) -> Result<AllocationSet, PlanError> {
    if let Some(existing) = allocations
        .iter()
        .find(|a| a.variant() == Variant::LiquidityReserve)
    {
        return Err(PlanError::SchemaMismatch {
            id: existing.id().to_string(),
            expected: "no explicit liquidity reserve".to_string(),
            actual: Variant::LiquidityReserve.as_str().to_string(),
        });
    }
    if allocations.iter().any(|a| a.id() == liquidity_id) {
        return Err(ModelError::DuplicateId(liquidity_id.to_string()).into());
    }

    allocations.push(Allocation::liquidity(liquidity_id, report.remainder));
    let set = AllocationSet {
        allocations,
        report: *report,
    };
    set.check_conservation()?;
    Ok(set)
}
