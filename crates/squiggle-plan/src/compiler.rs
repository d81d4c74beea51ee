//! Deployment graph compiler.
//!
//! Turns a validated [`AllocationSet`] into an ordered list of actions:
//!
//! 1. the test payment asset (development builds only)
//! 2. the sale contract, carrying every tier and the liquidity reserve
//! 3. one vesting contract per vesting pool
//! 4. the token, minting each allocation's tokens to its owner
//! 5. wiring calls that hand the token and payment asset to the contracts
//!
//! Every action consumes only results of actions before it, and action ids
//! depend only on names and allocation ids, so compiling the same set twice
//! yields identical plans.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use squiggle_core::allocation::{Allocation, AllocationKind, SaleTier, Variant};
use squiggle_core::error::{ModelError, PlanError, UnitError};
use squiggle_core::types::{ActionId, Amount, Target};

use crate::action::{Action, Arg};
use crate::config::{PaymentAsset, PlanConfig};
use crate::deployment::Deployment;
use crate::residual::AllocationSet;
use crate::topology::{verify_topology, ActionResults};
use crate::validator::SupplyReport;

/// Method handing the token address to vesting and sale contracts.
pub const SET_TOKEN_METHOD: &str = "setToken";
/// Method handing the payment asset address to the sale contract.
pub const SET_PAYMENT_ASSET_METHOD: &str = "setUSDT";

/// Output of [`compile`]: the actions to execute, the allocations they were
/// compiled from with targets bound, and the deployment handle.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CompiledPlan {
    actions: Vec<Action>,
    allocations: Vec<Allocation>,
    deployment: Deployment,
    supply: SupplyReport,
}

impl CompiledPlan {
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn supply(&self) -> &SupplyReport {
        &self.supply
    }

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id.as_str() == id)
    }

    /// Actions `results` has no record of, in execution order.
    pub fn pending<'a>(&'a self, results: &impl ActionResults) -> Vec<&'a Action> {
        self.actions
            .iter()
            .filter(|a| !results.is_complete(&a.id))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// BLAKE3 of the compact JSON encoding, hex encoded.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let json = self.to_json()?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// Collects actions and rejects duplicate ids as they are emitted.
#[derive(Default)]
struct PlanBuilder {
    actions: Vec<Action>,
    ids: HashSet<ActionId>,
}

impl PlanBuilder {
    fn push(&mut self, action: Action) -> Result<(), PlanError> {
        if !self.ids.insert(action.id.clone()) {
            return Err(PlanError::SchemaMismatch {
                id: action.id.to_string(),
                expected: "unique action id".to_string(),
                actual: "duplicate".to_string(),
            });
        }
        debug!(id = %action.id, contract = ?action.contract(), "emit action");
        self.actions.push(action);
        Ok(())
    }

    /// Emit a creation and return a forward reference to its result.
    fn create(&mut self, id: &str, contract: &str, args: Vec<Arg>) -> Result<Target, PlanError> {
        let id = ActionId::new(id);
        self.push(Action::create(id.clone(), contract, args))?;
        Ok(Target::Action(id))
    }

    fn call(&mut self, target: &Target, method: &str, args: Vec<Arg>) -> Result<(), PlanError> {
        let prefix = match target {
            Target::Action(id) => id.to_string(),
            Target::Account(addr) => addr.to_string(),
        };
        let id = ActionId::new(format!("{prefix}.{method}"));
        self.push(Action::call(id, target.clone(), method, args))
    }
}

fn unit_error(id: &str) -> impl FnOnce(UnitError) -> PlanError + '_ {
    move |source| {
        PlanError::Model(ModelError::Unit {
            id: id.to_string(),
            source,
        })
    }
}

fn tier_arg(tier: &SaleTier, tokens: Amount) -> Arg {
    let v = &tier.vesting;
    let fields: IndexMap<String, Arg> = [
        ("name", Arg::string(&tier.name)),
        ("cooldownDuration", Arg::uint(tier.cooldown_duration)),
        ("saleStartTime", Arg::uint(tier.start.encoded())),
        ("salePrice", Arg::Uint(tier.price)),
        ("saleTotalAmount", Arg::Uint(tokens)),
        ("saleBalance", Arg::Uint(tokens)),
        ("saleMinPerWallet", Arg::Uint(tier.min_per_wallet)),
        ("saleMaxPerWallet", Arg::Uint(tier.max_per_wallet)),
        ("affiliateTotalAmount", Arg::Uint(tier.affiliate_reserve)),
        ("affiliateBalance", Arg::Uint(tier.affiliate_reserve)),
        ("affiliatePercent", Arg::uint(tier.affiliate_percent)),
        ("tgePercent", Arg::uint(v.tge_percent)),
        ("cliffDuration", Arg::uint(v.cliff_duration)),
        ("cliffPercent", Arg::uint(v.cliff_percent)),
        ("linearDuration", Arg::uint(v.linear_duration)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    Arg::Tuple(fields)
}

/// Zip owners and amounts built in separate passes into the token's two
/// constructor sequences. Both lists are keyed by allocation id and must
/// agree in length and at every index.
pub fn align_distribution(
    action: &str,
    owners: Vec<(String, Arg)>,
    amounts: Vec<(String, Amount)>,
) -> Result<(Vec<Arg>, Vec<Arg>), PlanError> {
    if owners.len() != amounts.len() {
        return Err(PlanError::SchemaMismatch {
            id: action.to_string(),
            expected: format!("{} amounts", owners.len()),
            actual: format!("{} amounts", amounts.len()),
        });
    }

    let mut owner_args = Vec::with_capacity(owners.len());
    let mut amount_args = Vec::with_capacity(amounts.len());
    for (index, ((owner_id, owner), (amount_id, amount))) in
        owners.into_iter().zip(amounts).enumerate()
    {
        if owner_id != amount_id {
            return Err(PlanError::SchemaMismatch {
                id: action.to_string(),
                expected: format!("amount for {owner_id} at index {index}"),
                actual: format!("amount for {amount_id}"),
            });
        }
        owner_args.push(owner);
        amount_args.push(Arg::Uint(amount));
    }
    Ok((owner_args, amount_args))
}

/// Compile a validated allocation set into an ordered deployment plan.
pub fn compile(set: AllocationSet, config: &PlanConfig) -> Result<CompiledPlan, PlanError> {
    set.check_conservation()?;
    let (mut allocations, supply) = set.into_allocations();
    let mut plan = PlanBuilder::default();

    let payment_asset = match &config.payment_asset {
        PaymentAsset::Deploy { contract } => plan.create(contract, contract, Vec::new())?,
        PaymentAsset::Existing(addr) => Target::Account(*addr),
    };

    let liquidity_tokens = allocations
        .iter()
        .filter(|a| a.variant() == Variant::LiquidityReserve)
        .map(Allocation::tokens)
        .next()
        .ok_or_else(|| PlanError::SchemaMismatch {
            id: config.liquidity_id.clone(),
            expected: "liquidity reserve".to_string(),
            actual: "missing".to_string(),
        })?;

    let tiers: Vec<Arg> = allocations
        .iter()
        .filter_map(|a| a.as_sale().map(|tier| tier_arg(tier, a.tokens())))
        .collect();
    let sale = plan.create(
        &config.sale_id,
        &config.sale_contract,
        vec![
            Arg::Address(config.liquidity_router),
            Arg::uint(config.sale_liquidity_ppm),
            Arg::Uint(liquidity_tokens),
            Arg::Array(tiers),
        ],
    )?;

    for allocation in allocations.iter_mut() {
        let target = match allocation.kind() {
            AllocationKind::SaleTier(_) | AllocationKind::LiquidityReserve => Some(sale.clone()),
            AllocationKind::VestingPool(pool) => {
                let v = pool.vesting;
                let args = vec![
                    Arg::string(&pool.name),
                    Arg::from(&sale),
                    Arg::uint(v.tge_percent),
                    Arg::uint(v.cliff_duration),
                    Arg::uint(v.cliff_percent),
                    Arg::uint(v.linear_duration),
                ];
                Some(plan.create(allocation.id(), &config.vesting_contract, args)?)
            }
            AllocationKind::DirectAccount => None,
        };
        if let Some(target) = target {
            allocation.bind_target(target)?;
        }
    }

    // Direct owners mint to themselves; everything sold or pooled for
    // liquidity is minted to the sale contract in one slot.
    let minted_directly = |a: &&Allocation| {
        matches!(
            a.variant(),
            Variant::VestingPool | Variant::DirectAccount
        )
    };

    let mut owners = Vec::new();
    for allocation in allocations.iter().filter(minted_directly) {
        owners.push((
            allocation.id().to_string(),
            Arg::from(allocation.require_target()?),
        ));
    }
    owners.push((config.sale_id.clone(), Arg::from(&sale)));

    let mut amounts: Vec<(String, Amount)> = allocations
        .iter()
        .filter(minted_directly)
        .map(|a| (a.id().to_string(), a.tokens()))
        .collect();
    let mut sale_balance = Amount::zero();
    for allocation in allocations
        .iter()
        .filter(|a| matches!(a.variant(), Variant::SaleTier | Variant::LiquidityReserve))
    {
        let obligation = allocation.obligation().map_err(unit_error(allocation.id()))?;
        sale_balance = sale_balance
            .checked_add(obligation)
            .ok_or(UnitError::Overflow)
            .map_err(unit_error(&config.sale_id))?;
    }
    amounts.push((config.sale_id.clone(), sale_balance));

    let (owner_args, amount_args) = align_distribution(&config.token_id, owners, amounts)?;
    let token = plan.create(
        &config.token_id,
        &config.token_contract,
        vec![Arg::Array(owner_args), Arg::Array(amount_args)],
    )?;

    for allocation in allocations.iter().filter(|a| a.variant() == Variant::VestingPool) {
        plan.call(
            allocation.require_target()?,
            SET_TOKEN_METHOD,
            vec![Arg::from(&token)],
        )?;
    }
    plan.call(&sale, SET_TOKEN_METHOD, vec![Arg::from(&token)])?;
    plan.call(&sale, SET_PAYMENT_ASSET_METHOD, vec![Arg::from(&payment_asset)])?;

    // Direct accounts were bound at construction, everything else above.
    let mut targets = IndexMap::with_capacity(allocations.len());
    for allocation in &allocations {
        targets.insert(
            allocation.id().to_string(),
            allocation.require_target()?.clone(),
        );
    }

    verify_topology(&plan.actions)?;
    info!(
        actions = plan.actions.len(),
        allocations = allocations.len(),
        "compiled deployment plan"
    );

    Ok(CompiledPlan {
        actions: plan.actions,
        allocations,
        deployment: Deployment {
            token,
            sale,
            payment_asset,
            allocations: targets,
        },
        supply,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Operation;
    use crate::residual::allocate_residual;
    use crate::validator::validate_supply;
    use squiggle_core::allocation::{SaleStart, VestingPool};
    use squiggle_core::types::{Address, VestingSchedule};
    use std::collections::HashMap;

    fn tier(id: &str, tokens: u64, affiliate: u64, start: SaleStart) -> Allocation {
        Allocation::sale(
            id,
            Amount::from(tokens),
            SaleTier {
                name: format!("Tier {id}"),
                cooldown_duration: 0,
                start,
                price: Amount::from(34_000_000_000_000u64),
                min_per_wallet: Amount::zero(),
                max_per_wallet: Amount::from(tokens),
                affiliate_reserve: Amount::from(affiliate),
                affiliate_percent: 100_000,
                vesting: VestingSchedule {
                    tge_percent: 30_000,
                    cliff_duration: 5_356_800,
                    cliff_percent: 100_000,
                    linear_duration: 32_140_800,
                },
            },
        )
    }

    fn pool(id: &str, tokens: u64) -> Allocation {
        Allocation::vesting(
            id,
            Amount::from(tokens),
            VestingPool {
                name: format!("Pool {id}"),
                vesting: VestingSchedule {
                    tge_percent: 0,
                    cliff_duration: 10_713_600,
                    cliff_percent: 100_000,
                    linear_duration: 96_422_400,
                },
            },
        )
    }

    fn cex() -> Address {
        Address([0xce; 20])
    }

    fn fixture() -> Vec<Allocation> {
        vec![
            tier("t1", 9, 1, SaleStart::At(1_717_170_214)),
            pool("team", 180),
            tier("t2", 18, 2, SaleStart::AfterPrevious),
            Allocation::account("cex", Amount::from(135u64), cex()),
            pool("marketing", 60),
        ]
    }

    fn compile_with(allocs: Vec<Allocation>, config: &PlanConfig) -> CompiledPlan {
        let report = validate_supply(&allocs, Amount::from(1_000u64)).unwrap();
        let set = allocate_residual(allocs, &report, &config.liquidity_id).unwrap();
        compile(set, config).unwrap()
    }

    fn ids(plan: &CompiledPlan) -> Vec<&str> {
        plan.actions().iter().map(|a| a.id.as_str()).collect()
    }

    // --- ordering ---

    #[test]
    fn emits_actions_in_dependency_order() {
        let plan = compile_with(fixture(), &PlanConfig::default());
        assert_eq!(
            ids(&plan),
            [
                "USDT",
                "SaleContract",
                "team",
                "marketing",
                "squiggle",
                "team.setToken",
                "marketing.setToken",
                "SaleContract.setToken",
                "SaleContract.setUSDT",
            ]
        );
        verify_topology(plan.actions()).unwrap();
    }

    #[test]
    fn production_emits_no_payment_asset_creation() {
        let usdt: Address = "0x55d398326f99059ff775485246999027b3197955".parse().unwrap();
        let config = PlanConfig {
            payment_asset: PaymentAsset::Existing(usdt),
            ..PlanConfig::default()
        };
        let plan = compile_with(fixture(), &config);
        assert_eq!(ids(&plan)[0], "SaleContract");
        let set_usdt = plan.action("SaleContract.setUSDT").unwrap();
        assert_eq!(set_usdt.args(), [Arg::Address(usdt)]);
        assert_eq!(plan.deployment().payment_asset, Target::Account(usdt));
    }

    // --- sale contract ---

    #[test]
    fn sale_contract_carries_tiers_and_liquidity() {
        let plan = compile_with(fixture(), &PlanConfig::default());
        let sale = plan.action("SaleContract").unwrap();
        let args = sale.args();
        assert_eq!(args[0], Arg::Address(Address::ZERO));
        assert_eq!(args[1], Arg::uint(57_031u64));
        // 1000 - (10 + 180 + 20 + 135 + 60)
        assert_eq!(args[2], Arg::uint(595u64));
        let Arg::Array(tiers) = &args[3] else {
            panic!("tiers must be an array");
        };
        assert_eq!(tiers.len(), 2);
        let Arg::Tuple(first) = &tiers[0] else {
            panic!("tier must be a tuple");
        };
        let keys: Vec<&str> = first.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "name",
                "cooldownDuration",
                "saleStartTime",
                "salePrice",
                "saleTotalAmount",
                "saleBalance",
                "saleMinPerWallet",
                "saleMaxPerWallet",
                "affiliateTotalAmount",
                "affiliateBalance",
                "affiliatePercent",
                "tgePercent",
                "cliffDuration",
                "cliffPercent",
                "linearDuration",
            ]
        );
        assert_eq!(first["saleStartTime"], Arg::uint(1_717_170_214u64));
        assert_eq!(first["saleTotalAmount"], Arg::uint(9u64));
        assert_eq!(first["affiliateBalance"], Arg::uint(1u64));
        let Arg::Tuple(second) = &tiers[1] else {
            panic!("tier must be a tuple");
        };
        assert_eq!(second["saleStartTime"], Arg::uint(0u64));
    }

    // --- vesting ---

    #[test]
    fn vesting_contract_references_sale() {
        let plan = compile_with(fixture(), &PlanConfig::default());
        let team = plan.action("team").unwrap();
        assert_eq!(team.contract(), Some("VestingContract"));
        assert_eq!(
            team.args(),
            [
                Arg::string("Pool team"),
                Arg::Ref("SaleContract".into()),
                Arg::uint(0u64),
                Arg::uint(10_713_600u64),
                Arg::uint(100_000u64),
                Arg::uint(96_422_400u64),
            ]
        );
    }

    // --- token distribution ---

    #[test]
    fn token_mints_to_owners_then_sale() {
        let plan = compile_with(fixture(), &PlanConfig::default());
        let token = plan.action("squiggle").unwrap();
        assert_eq!(token.contract(), Some("Squiggle"));
        assert_eq!(
            token.args()[0],
            Arg::Array(vec![
                Arg::Ref("team".into()),
                Arg::Address(cex()),
                Arg::Ref("marketing".into()),
                Arg::Ref("SaleContract".into()),
            ])
        );
        // Sale slot: 9 + 1 + 18 + 2 + 595
        assert_eq!(
            token.args()[1],
            Arg::Array(vec![
                Arg::uint(180u64),
                Arg::uint(135u64),
                Arg::uint(60u64),
                Arg::uint(625u64),
            ])
        );
    }

    #[test]
    fn minted_total_equals_supply() {
        let plan = compile_with(fixture(), &PlanConfig::default());
        let Arg::Array(amounts) = &plan.action("squiggle").unwrap().args()[1] else {
            panic!("amounts must be an array");
        };
        let minted = amounts.iter().fold(Amount::zero(), |acc, a| match a {
            Arg::Uint(v) => acc + *v,
            _ => acc,
        });
        assert_eq!(minted, Amount::from(1_000u64));
    }

    #[test]
    fn align_rejects_unequal_lengths() {
        let owners = vec![("a".to_string(), Arg::Address(Address::ZERO))];
        let err = align_distribution("squiggle", owners, vec![]).unwrap_err();
        assert_eq!(
            err,
            PlanError::SchemaMismatch {
                id: "squiggle".into(),
                expected: "1 amounts".into(),
                actual: "0 amounts".into(),
            }
        );
    }

    #[test]
    fn align_rejects_swapped_ids() {
        let owners = vec![
            ("a".to_string(), Arg::Address(Address::ZERO)),
            ("b".to_string(), Arg::Address(Address::ZERO)),
        ];
        let amounts = vec![
            ("b".to_string(), Amount::one()),
            ("a".to_string(), Amount::one()),
        ];
        assert!(matches!(
            align_distribution("squiggle", owners, amounts),
            Err(PlanError::SchemaMismatch { expected, .. }) if expected == "amount for a at index 0"
        ));
    }

    // --- calls and handle ---

    #[test]
    fn calls_wire_token_and_payment_asset() {
        let plan = compile_with(fixture(), &PlanConfig::default());
        let call = plan.action("team.setToken").unwrap();
        assert!(matches!(
            &call.operation,
            Operation::Call { target, method, .. }
                if *target == Target::Action("team".into()) && method == "setToken"
        ));
        assert_eq!(call.args(), [Arg::Ref("squiggle".into())]);
        assert_eq!(
            plan.action("SaleContract.setUSDT").unwrap().args(),
            [Arg::Ref("USDT".into())]
        );
    }

    #[test]
    fn every_allocation_is_bound() {
        let plan = compile_with(fixture(), &PlanConfig::default());
        let handle = plan.deployment();
        assert_eq!(handle.allocations.len(), 6);
        assert_eq!(handle.allocation("t1"), Some(&Target::Action("SaleContract".into())));
        assert_eq!(handle.allocation("team"), Some(&Target::Action("team".into())));
        assert_eq!(handle.allocation("cex"), Some(&Target::Account(cex())));
        assert_eq!(
            handle.allocation("liquidity_dex"),
            Some(&Target::Action("SaleContract".into()))
        );
        assert!(plan.allocations().iter().all(|a| a.target().is_some()));
    }

    #[test]
    fn colliding_pool_id_is_rejected() {
        let allocs = vec![pool("SaleContract", 10)];
        let report = validate_supply(&allocs, Amount::from(1_000u64)).unwrap();
        let config = PlanConfig::default();
        let set = allocate_residual(allocs, &report, &config.liquidity_id).unwrap();
        assert!(matches!(
            compile(set, &config),
            Err(PlanError::SchemaMismatch { id, .. }) if id == "SaleContract"
        ));
    }

    // --- determinism ---

    #[test]
    fn recompiling_is_identical() {
        let a = compile_with(fixture(), &PlanConfig::default());
        let b = compile_with(fixture(), &PlanConfig::default());
        assert_eq!(a, b);
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }

    #[test]
    fn pending_skips_executed_actions() {
        let plan = compile_with(fixture(), &PlanConfig::default());
        let mut results: HashMap<ActionId, Address> = HashMap::new();
        assert_eq!(plan.pending(&results).len(), plan.actions().len());
        results.insert("USDT".into(), Address([1; 20]));
        results.insert("SaleContract".into(), Address([2; 20]));
        let pending: Vec<&str> = plan
            .pending(&results)
            .into_iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(pending[0], "team");
        assert_eq!(pending.len(), plan.actions().len() - 2);
    }
}
