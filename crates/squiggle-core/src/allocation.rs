//! The allocation model.
//!
//! An [`Allocation`] is a named claim on part of the total supply. Every
//! field is fixed at construction except `target`, which the deployment
//! compiler binds exactly once. Direct accounts are the exception: their
//! literal address is bound when they are built.

use serde::Serialize;
use std::fmt;

use crate::error::{PlanError, UnitError};
use crate::types::{amount_dec, Address, Amount, Target, VestingSchedule};

/// When a sale tier opens.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SaleStart {
    /// Absolute Unix timestamp. Only the first tier carries one.
    At(u64),
    /// Opens when the previous tier closes.
    AfterPrevious,
}

impl SaleStart {
    /// Constructor encoding: `0` means "after the previous tier".
    pub fn encoded(&self) -> u64 {
        match self {
            Self::At(ts) => *ts,
            Self::AfterPrevious => 0,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaleTier {
    pub name: String,
    pub cooldown_duration: u64,
    pub start: SaleStart,
    /// Price of one whole token in fiat base units.
    #[serde(with = "amount_dec")]
    pub price: Amount,
    #[serde(with = "amount_dec")]
    pub min_per_wallet: Amount,
    #[serde(with = "amount_dec")]
    pub max_per_wallet: Amount,
    /// Tokens set aside for referral rebates on top of the tokens sold.
    #[serde(with = "amount_dec")]
    pub affiliate_reserve: Amount,
    /// Rebate rate in ppm.
    pub affiliate_percent: u64,
    pub vesting: VestingSchedule,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VestingPool {
    pub name: String,
    pub vesting: VestingSchedule,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AllocationKind {
    SaleTier(SaleTier),
    LiquidityReserve,
    VestingPool(VestingPool),
    DirectAccount,
}

/// Variant tag without payload, for logs and summaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variant {
    SaleTier,
    LiquidityReserve,
    VestingPool,
    DirectAccount,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SaleTier => "sale",
            Self::LiquidityReserve => "liquidity",
            Self::VestingPool => "vesting",
            Self::DirectAccount => "account",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    id: String,
    #[serde(with = "amount_dec")]
    tokens: Amount,
    #[serde(flatten)]
    kind: AllocationKind,
    target: Option<Target>,
}

impl Allocation {
    pub fn sale(id: impl Into<String>, tokens: Amount, tier: SaleTier) -> Self {
        Self::unbound(id, tokens, AllocationKind::SaleTier(tier))
    }

    pub fn vesting(id: impl Into<String>, tokens: Amount, pool: VestingPool) -> Self {
        Self::unbound(id, tokens, AllocationKind::VestingPool(pool))
    }

    pub fn liquidity(id: impl Into<String>, tokens: Amount) -> Self {
        Self::unbound(id, tokens, AllocationKind::LiquidityReserve)
    }

    /// A direct account allocation. Its target is the literal address and
    /// is bound immediately.
    pub fn account(id: impl Into<String>, tokens: Amount, address: Address) -> Self {
        Self {
            id: id.into(),
            tokens,
            kind: AllocationKind::DirectAccount,
            target: Some(Target::Account(address)),
        }
    }

    fn unbound(id: impl Into<String>, tokens: Amount, kind: AllocationKind) -> Self {
        Self {
            id: id.into(),
            tokens,
            kind,
            target: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tokens owed to this allocation. For sale tiers this excludes the
    /// affiliate reserve; see [`obligation`](Self::obligation).
    pub fn tokens(&self) -> Amount {
        self.tokens
    }

    pub fn kind(&self) -> &AllocationKind {
        &self.kind
    }

    pub fn variant(&self) -> Variant {
        match self.kind {
            AllocationKind::SaleTier(_) => Variant::SaleTier,
            AllocationKind::LiquidityReserve => Variant::LiquidityReserve,
            AllocationKind::VestingPool(_) => Variant::VestingPool,
            AllocationKind::DirectAccount => Variant::DirectAccount,
        }
    }

    pub fn as_sale(&self) -> Option<&SaleTier> {
        match &self.kind {
            AllocationKind::SaleTier(tier) => Some(tier),
            _ => None,
        }
    }

    pub fn as_vesting(&self) -> Option<&VestingPool> {
        match &self.kind {
            AllocationKind::VestingPool(pool) => Some(pool),
            _ => None,
        }
    }

    /// Total supply this allocation consumes: `tokens + affiliate_reserve`
    /// for sale tiers, `tokens` otherwise.
    pub fn obligation(&self) -> Result<Amount, UnitError> {
        match &self.kind {
            AllocationKind::SaleTier(tier) => self
                .tokens
                .checked_add(tier.affiliate_reserve)
                .ok_or(UnitError::Overflow),
            _ => Ok(self.tokens),
        }
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// The bound target, or `UnresolvedReference` naming this allocation.
    pub fn require_target(&self) -> Result<&Target, PlanError> {
        self.target
            .as_ref()
            .ok_or_else(|| PlanError::UnresolvedReference {
                id: self.id.clone(),
            })
    }

    /// Bind the owning contract or account. A target can be bound once.
    pub fn bind_target(&mut self, target: Target) -> Result<(), PlanError> {
        if self.target.is_some() {
            return Err(PlanError::AlreadyBound {
                id: self.id.clone(),
            });
        }
        self.target = Some(target);
        Ok(())
    }
}
