//! Handle describing where each deployed piece will live.

use indexmap::IndexMap;
use serde::Serialize;

use squiggle_core::error::PlanError;
use squiggle_core::types::{Address, Target};

use crate::topology::ActionResults;

/// Targets of the token, the sale contract, the payment asset and every
/// allocation, keyed by allocation id in declaration order.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub token: Target,
    pub sale: Target,
    pub payment_asset: Target,
    pub allocations: IndexMap<String, Target>,
}

/// A [`Deployment`] with every forward reference replaced by the address
/// the execution engine recorded.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDeployment {
    pub token: Address,
    pub sale: Address,
    pub payment_asset: Address,
    pub allocations: IndexMap<String, Address>,
}

fn resolve_target(
    target: &Target,
    results: &impl ActionResults,
    referrer: &str,
) -> Result<Address, PlanError> {
    match target {
        Target::Account(addr) => Ok(*addr),
        Target::Action(id) => results
            .address_of(id)
            .ok_or_else(|| PlanError::UnresolvedReference {
                id: referrer.to_string(),
            }),
    }
}

impl Deployment {
    pub fn allocation(&self, id: &str) -> Option<&Target> {
        self.allocations.get(id)
    }

    /// Resolve every target. An action that has not run yet is reported as
    /// `UnresolvedReference` with the allocation id that needs it, or the
    /// action id for the token, sale and payment asset.
    pub fn resolve(&self, results: &impl ActionResults) -> Result<ResolvedDeployment, PlanError> {
        let label = |t: &Target| t.action().map(|a| a.to_string()).unwrap_or_default();

        let token = resolve_target(&self.token, results, &label(&self.token))?;
        let sale = resolve_target(&self.sale, results, &label(&self.sale))?;
        let payment_asset =
            resolve_target(&self.payment_asset, results, &label(&self.payment_asset))?;

        let mut allocations = IndexMap::with_capacity(self.allocations.len());
        for (id, target) in &self.allocations {
            allocations.insert(id.clone(), resolve_target(target, results, id)?);
        }

        Ok(ResolvedDeployment {
            token,
            sale,
            payment_asset,
            allocations,
        })
    }
}
