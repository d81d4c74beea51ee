//! Ordering checks over a compiled action list, and the record of executed
//! actions an execution engine hands back.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use squiggle_core::error::PlanError;
use squiggle_core::types::{ActionId, Address};

use crate::action::Action;

/// Every action id is unique, and every forward reference points to a
/// creation action that appears earlier in the list.
pub fn verify_topology(actions: &[Action]) -> Result<(), PlanError> {
    let mut seen: HashMap<&ActionId, (usize, bool)> = HashMap::with_capacity(actions.len());
    for (index, action) in actions.iter().enumerate() {
        if seen.insert(&action.id, (index, action.is_create())).is_some() {
            return Err(PlanError::SchemaMismatch {
                id: action.id.to_string(),
                expected: "unique action id".to_string(),
                actual: "duplicate".to_string(),
            });
        }
    }

    for (index, action) in actions.iter().enumerate() {
        for dep in action.dependencies() {
            match seen.get(dep) {
                Some(&(at, true)) if at < index => {}
                _ => {
                    return Err(PlanError::UnresolvedReference {
                        id: action.id.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Results recorded by whatever executes a plan.
///
/// Creation actions map to the deployed contract address. Call actions map
/// to the address they were sent to, and only their presence matters.
pub trait ActionResults {
    fn address_of(&self, id: &ActionId) -> Option<Address>;

    fn is_complete(&self, id: &ActionId) -> bool {
        self.address_of(id).is_some()
    }
}

impl<S: BuildHasher> ActionResults for HashMap<ActionId, Address, S> {
    fn address_of(&self, id: &ActionId) -> Option<Address> {
        self.get(id).copied()
    }
}

impl ActionResults for BTreeMap<ActionId, Address> {
    fn address_of(&self, id: &ActionId) -> Option<Address> {
        self.get(id).copied()
    }
}
