//! End-to-end planning: build, validate, assign the residual, compile.

use tracing::info;

use squiggle_core::builder::build_allocations;
use squiggle_core::error::{PlanError, SquiggleError};
use squiggle_core::table::{parse_table, AllocationSpec};
use squiggle_core::units::Units;

use crate::compiler::{compile, CompiledPlan};
use crate::config::PlanConfig;
use crate::residual::allocate_residual;
use crate::validator::{validate_supply, SupplyReport};

/// Build and validate without compiling. Used for supply reports.
pub fn check_supply(units: &Units, specs: &[AllocationSpec]) -> Result<SupplyReport, PlanError> {
    let allocations = build_allocations(units, specs)?;
    validate_supply(&allocations, units.total_supply)
}

pub fn plan_distribution(
    units: &Units,
    specs: &[AllocationSpec],
    config: &PlanConfig,
) -> Result<CompiledPlan, PlanError> {
    let allocations = build_allocations(units, specs)?;
    info!(count = allocations.len(), "built allocations");

    let report = validate_supply(&allocations, units.total_supply)?;
    info!(
        total_supply = %report.total_supply,
        allocated = %report.allocated,
        remainder = %report.remainder,
        "supply validated"
    );

    let set = allocate_residual(allocations, &report, &config.liquidity_id)?;
    let plan = compile(set, config)?;
    info!(actions = plan.actions().len(), "plan ready");
    Ok(plan)
}

/// Parse a JSON allocation table and plan it.
pub fn plan_table(
    units: &Units,
    json: &str,
    config: &PlanConfig,
) -> Result<CompiledPlan, SquiggleError> {
    let specs = parse_table(json)?;
    info!(rows = specs.len(), "parsed table");
    Ok(plan_distribution(units, &specs, config)?)
}
