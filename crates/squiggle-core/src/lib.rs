//! # squiggle-core
//! Fixed-point units, allocation model and table builder for the Squiggle
//! token distribution.

pub mod allocation;
pub mod builder;
pub mod constants;
pub mod error;
pub mod table;
pub mod tokenomics;
pub mod types;
pub mod units;

pub use allocation::{Allocation, AllocationKind, SaleStart, SaleTier, VestingPool};
pub use builder::build_allocations;
pub use error::{ModelError, PlanError, SquiggleError, UnitError};
pub use table::{AllocationSpec, RawAllocation, SaleSpec, Share};
pub use types::{ActionId, Address, Amount, Target, VestingSchedule};
pub use units::Units;
