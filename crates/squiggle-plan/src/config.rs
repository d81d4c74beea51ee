//! Compiler configuration: contract names, the DEX router and the payment
//! asset.

use serde::Serialize;

use squiggle_core::constants::{BuildMode, LIQUIDITY_RESERVE_ID, SALE_LIQUIDITY_PPM};
use squiggle_core::types::Address;

/// Where the sale contract's payment asset comes from.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentAsset {
    /// Deploy a test stablecoin as the first action of the plan.
    Deploy { contract: String },
    /// Use an already deployed token.
    Existing(Address),
}

impl PaymentAsset {
    /// Test stablecoin deployed in development builds.
    pub const TEST_CONTRACT: &'static str = "USDT";

    /// The payment asset for `mode`. Production needs an existing address.
    pub fn for_mode(mode: BuildMode, existing: Option<Address>) -> Option<Self> {
        if mode.deploys_payment_asset() {
            Some(Self::Deploy {
                contract: Self::TEST_CONTRACT.to_string(),
            })
        } else {
            existing.map(Self::Existing)
        }
    }
}

impl Default for PaymentAsset {
    fn default() -> Self {
        Self::Deploy {
            contract: Self::TEST_CONTRACT.to_string(),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PlanConfig {
    pub token_contract: String,
    /// Action id of the token creation.
    pub token_id: String,
    pub sale_contract: String,
    /// Action id of the sale contract creation.
    pub sale_id: String,
    pub vesting_contract: String,
    /// DEX router the sale contract seeds liquidity through.
    pub liquidity_router: Address,
    /// Share of sale proceeds routed to DEX liquidity, in ppm.
    pub sale_liquidity_ppm: u64,
    /// Id of the residual liquidity reserve allocation.
    pub liquidity_id: String,
    pub payment_asset: PaymentAsset,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            token_contract: "Squiggle".to_string(),
            token_id: "squiggle".to_string(),
            sale_contract: "SaleContract".to_string(),
            sale_id: "SaleContract".to_string(),
            vesting_contract: "VestingContract".to_string(),
            liquidity_router: Address::ZERO,
            sale_liquidity_ppm: SALE_LIQUIDITY_PPM,
            liquidity_id: LIQUIDITY_RESERVE_ID.to_string(),
            payment_asset: PaymentAsset::default(),
        }
    }
}

impl PlanConfig {
    pub fn with_router(liquidity_router: Address) -> Self {
        Self {
            liquidity_router,
            ..Self::default()
        }
    }
}
