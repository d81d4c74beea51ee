//! Deployment configuration loaded from environment variables.

use anyhow::{Context, Result};
use squiggle_core::constants::{BuildMode, DEFAULT_CEX_ADDRESS};
use squiggle_core::types::Address;
use squiggle_plan::{PaymentAsset, PlanConfig};
use tracing::warn;

pub const USDT_ADDRESS_VAR: &str = "BSC_USDT_ADDRESS";
pub const LIQUIDITY_ROUTER_VAR: &str = "BSC_LIQUIDITY_ROUTER";
pub const CEX_ADDRESS_VAR: &str = "CEX_ALLOCATION_ADDRESS";
pub const NODE_ENV_VAR: &str = "NODE_ENV";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub mode: BuildMode,
    /// Existing payment asset. Only used in production.
    pub usdt_address: Option<Address>,
    /// DEX router for sale liquidity.
    pub liquidity_router: Option<Address>,
    /// Recipient of the CEX liquidity allocation.
    pub cex_address: Address,
}

fn parse_address(var: &str, value: &str) -> Result<Address> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{var} must be a 0x-prefixed 20-byte hex address"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode = BuildMode::from_node_env(get(NODE_ENV_VAR).as_deref());

        let usdt_address = get(USDT_ADDRESS_VAR)
            .map(|v| parse_address(USDT_ADDRESS_VAR, &v))
            .transpose()?;

        let liquidity_router = get(LIQUIDITY_ROUTER_VAR)
            .map(|v| parse_address(LIQUIDITY_ROUTER_VAR, &v))
            .transpose()?;

        let cex_address = parse_address(
            CEX_ADDRESS_VAR,
            &get(CEX_ADDRESS_VAR).unwrap_or_else(|| DEFAULT_CEX_ADDRESS.to_string()),
        )?;

        Ok(Config {
            mode,
            usdt_address,
            liquidity_router,
            cex_address,
        })
    }

    pub fn with_mode(self, mode: BuildMode) -> Self {
        Self { mode, ..self }
    }

    /// Compiler settings for the configured mode. Production needs both the
    /// payment asset and the router; development falls back to the zero
    /// router.
    pub fn plan_config(&self) -> Result<PlanConfig> {
        let payment_asset = PaymentAsset::for_mode(self.mode, self.usdt_address)
            .with_context(|| format!("{USDT_ADDRESS_VAR} is required in production"))?;

        let liquidity_router = match (self.mode, self.liquidity_router) {
            (_, Some(router)) => router,
            (BuildMode::Production, None) => {
                anyhow::bail!("{LIQUIDITY_ROUTER_VAR} is required in production")
            }
            (BuildMode::Development, None) => {
                warn!("{LIQUIDITY_ROUTER_VAR} not set, using the zero address");
                Address::ZERO
            }
        };

        Ok(PlanConfig {
            liquidity_router,
            payment_asset,
            ..PlanConfig::default()
        })
    }
}
