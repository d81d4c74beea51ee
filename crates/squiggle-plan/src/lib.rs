//! squiggle-plan: supply validation, residual liquidity assignment and
//! compilation of a deployment plan for the Squiggle token distribution.

pub mod action;
pub mod compiler;
pub mod config;
pub mod deployment;
pub mod pipeline;
pub mod residual;
pub mod topology;
pub mod validator;

pub use action::{Action, Arg, Operation};
pub use compiler::{align_distribution, compile, CompiledPlan};
pub use config::{PaymentAsset, PlanConfig};
pub use deployment::{Deployment, ResolvedDeployment};
pub use pipeline::{check_supply, plan_distribution, plan_table};
pub use residual::{allocate_residual, AllocationSet};
pub use topology::{verify_topology, ActionResults};
pub use validator::{validate_supply, SupplyReport};
