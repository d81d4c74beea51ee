//! Supply validation.
//!
//! Sums every allocation's obligation (tokens plus affiliate reserve for
//! sale tiers) and checks it stays strictly below the total supply, so the
//! residual liquidity reserve is never empty.

use serde::Serialize;
use tracing::debug;

use squiggle_core::allocation::Allocation;
use squiggle_core::error::PlanError;
use squiggle_core::types::{amount_dec, Amount};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SupplyReport {
    #[serde(with = "amount_dec")]
    pub total_supply: Amount,
    /// Sum of all explicit obligations.
    #[serde(with = "amount_dec")]
    pub allocated: Amount,
    /// `total_supply - allocated`, always positive.
    #[serde(with = "amount_dec")]
    pub remainder: Amount,
}

pub fn validate_supply(
    allocations: &[Allocation],
    total_supply: Amount,
) -> Result<SupplyReport, PlanError> {
    let mut allocated = Amount::zero();
    for allocation in allocations {
        // An obligation that overflows on its own or in the sum cannot fit.
        let next = allocation
            .obligation()
            .ok()
            .and_then(|obligation| allocated.checked_add(obligation));
        match next {
            Some(sum) => allocated = sum,
            None => {
                return Err(PlanError::SupplyExceeded {
                    total_supply,
                    allocated: Amount::MAX,
                });
            }
        }
    }

    if allocated >= total_supply {
        return Err(PlanError::SupplyExceeded {
            total_supply,
            allocated,
        });
    }

    let remainder = total_supply - allocated;
    debug!(%allocated, %remainder, "supply check passed");
    Ok(SupplyReport {
        total_supply,
        allocated,
        remainder,
    })
}
