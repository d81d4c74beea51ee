//! Plan actions and their arguments.
//!
//! An argument is either a literal or [`Arg::Ref`], a forward reference to
//! the address produced by an earlier creation action in the same plan.

use indexmap::IndexMap;
use serde::Serialize;

use squiggle_core::types::{amount_dec, ActionId, Address, Amount, Target};

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Arg {
    Uint(#[serde(with = "amount_dec")] Amount),
    Address(Address),
    String(String),
    /// Address of the contract created by the named action.
    Ref(ActionId),
    Array(Vec<Arg>),
    /// Named struct fields in declaration order.
    Tuple(IndexMap<String, Arg>),
}

impl Arg {
    pub fn uint(value: impl Into<Amount>) -> Self {
        Self::Uint(value.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Every forward reference in this argument, depth first.
    pub fn references(&self) -> Vec<&ActionId> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a ActionId>) {
        match self {
            Self::Ref(id) => out.push(id),
            Self::Array(items) => items.iter().for_each(|a| a.collect_references(out)),
            Self::Tuple(fields) => fields.values().for_each(|a| a.collect_references(out)),
            Self::Uint(_) | Self::Address(_) | Self::String(_) => {}
        }
    }
}

impl From<&Target> for Arg {
    fn from(target: &Target) -> Self {
        match target {
            Target::Action(id) => Self::Ref(id.clone()),
            Target::Account(addr) => Self::Address(*addr),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Deploy `contract` with constructor `args`.
    Create { contract: String, args: Vec<Arg> },
    /// Call `method` on an existing or earlier-created contract.
    Call {
        target: Target,
        method: String,
        args: Vec<Arg>,
    },
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Action {
    pub id: ActionId,
    #[serde(flatten)]
    pub operation: Operation,
}

impl Action {
    pub fn create(id: ActionId, contract: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            id,
            operation: Operation::Create {
                contract: contract.into(),
                args,
            },
        }
    }

    pub fn call(id: ActionId, target: Target, method: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            id,
            operation: Operation::Call {
                target,
                method: method.into(),
                args,
            },
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self.operation, Operation::Create { .. })
    }

    /// Contract name for creation actions.
    pub fn contract(&self) -> Option<&str> {
        match &self.operation {
            Operation::Create { contract, .. } => Some(contract),
            Operation::Call { .. } => None,
        }
    }

    pub fn args(&self) -> &[Arg] {
        match &self.operation {
            Operation::Create { args, .. } | Operation::Call { args, .. } => args,
        }
    }

    /// Actions whose results this action consumes, including the call
    /// target.
    pub fn dependencies(&self) -> Vec<&ActionId> {
        let mut deps: Vec<&ActionId> = match &self.operation {
            Operation::Call { target, .. } => target.action().into_iter().collect(),
            Operation::Create { .. } => Vec::new(),
        };
        for arg in self.args() {
            deps.extend(arg.references());
        }
        deps
    }
}
