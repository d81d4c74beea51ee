//! Allocation table entries as authors write them.
//!
//! [`AllocationSpec`] is the typed, in-code form: percentages and prices are
//! exact rationals, nothing is derived yet. [`RawAllocation`] is the
//! serialized form read from a JSON table file, where every field may be
//! absent; converting it checks that each variant carries what it needs.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::allocation::SaleStart;
use crate::error::{ModelError, UnitError};
use crate::types::{Address, Amount, VestingSchedule};
use crate::units::{calendar_timestamp, format_ratio, parse_ratio, Ratio};

/// How many tokens a direct account receives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Share {
    /// Percent of total supply.
    Percent(Ratio),
    /// `percent(gross) - percent(withheld)`, each floored separately.
    PercentNet { gross: Ratio, withheld: Ratio },
    /// Exact base units.
    Exact(Amount),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaleSpec {
    pub id: String,
    pub name: String,
    pub cooldown_duration: u64,
    pub start: SaleStart,
    /// Dollars per whole token.
    pub price: Ratio,
    /// Percent of supply covering the tokens sold plus the affiliate pool.
    pub target_percent: Ratio,
    /// Minimum purchase in whole tokens.
    pub min_per_wallet: u64,
    /// Affiliate rebate rate in ppm.
    pub affiliate_percent: u64,
    pub vesting: VestingSchedule,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VestingSpec {
    pub id: String,
    pub name: String,
    pub percent: Ratio,
    pub vesting: VestingSchedule,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountSpec {
    pub id: String,
    pub address: Address,
    pub share: Share,
}

/// One row of the allocation table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocationSpec {
    Sale(SaleSpec),
    Vesting(VestingSpec),
    Account(AccountSpec),
}

impl AllocationSpec {
    pub fn id(&self) -> &str {
        match self {
            Self::Sale(s) => &s.id,
            Self::Vesting(v) => &v.id,
            Self::Account(a) => &a.id,
        }
    }
}

// --- serialized form ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawVesting {
    pub tge_percent: Option<u64>,
    pub cliff_duration: Option<u64>,
    pub cliff_percent: Option<u64>,
    pub linear_duration: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawSale {
    pub id: String,
    pub name: Option<String>,
    pub cooldown_duration: Option<u64>,
    /// RFC 3339 instant; absent for tiers opening after the previous one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_start: Option<String>,
    pub sale_price: Option<String>,
    pub target_percent: Option<String>,
    pub sale_min_per_wallet: Option<u64>,
    pub affiliate_percent: Option<u64>,
    #[serde(flatten)]
    pub vesting: RawVesting,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawVestingPool {
    pub id: String,
    pub name: Option<String>,
    pub percent: Option<String>,
    #[serde(flatten)]
    pub vesting: RawVesting,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawAccount {
    pub id: String,
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withheld_percent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawAllocation {
    Sale(RawSale),
    Vesting(RawVestingPool),
    Account(RawAccount),
}

fn missing(id: &str, field: &str) -> ModelError {
    ModelError::SchemaMismatch {
        id: id.to_string(),
        expected: format!("field {field}"),
        actual: "missing".to_string(),
    }
}

fn require<T>(id: &str, field: &str, value: Option<T>) -> Result<T, ModelError> {
    value.ok_or_else(|| missing(id, field))
}

fn unit(id: &str) -> impl Fn(UnitError) -> ModelError + '_ {
    move |source| ModelError::Unit {
        id: id.to_string(),
        source,
    }
}

impl RawVesting {
    fn resolve(&self, id: &str) -> Result<VestingSchedule, ModelError> {
        Ok(VestingSchedule {
            tge_percent: require(id, "tgePercent", self.tge_percent)?,
            cliff_duration: require(id, "cliffDuration", self.cliff_duration)?,
            cliff_percent: require(id, "cliffPercent", self.cliff_percent)?,
            linear_duration: require(id, "linearDuration", self.linear_duration)?,
        })
    }
}

impl From<&VestingSchedule> for RawVesting {
    fn from(v: &VestingSchedule) -> Self {
        Self {
            tge_percent: Some(v.tge_percent),
            cliff_duration: Some(v.cliff_duration),
            cliff_percent: Some(v.cliff_percent),
            linear_duration: Some(v.linear_duration),
        }
    }
}

impl TryFrom<RawAllocation> for AllocationSpec {
    type Error = ModelError;

    fn try_from(raw: RawAllocation) -> Result<Self, Self::Error> {
        match raw {
            RawAllocation::Sale(s) => {
                let id = s.id.as_str();
                let start = match &s.sale_start {
                    Some(iso) => SaleStart::At(calendar_timestamp(iso).map_err(unit(id))?),
                    None => SaleStart::AfterPrevious,
                };
                let price = parse_ratio(&require(id, "salePrice", s.sale_price.clone())?)
                    .map_err(unit(id))?;
                let target_percent =
                    parse_ratio(&require(id, "targetPercent", s.target_percent.clone())?)
                        .map_err(unit(id))?;
                Ok(Self::Sale(SaleSpec {
                    id: s.id.clone(),
                    name: require(id, "name", s.name.clone())?,
                    cooldown_duration: require(id, "cooldownDuration", s.cooldown_duration)?,
                    start,
                    price,
                    target_percent,
                    min_per_wallet: require(id, "saleMinPerWallet", s.sale_min_per_wallet)?,
                    affiliate_percent: require(id, "affiliatePercent", s.affiliate_percent)?,
                    vesting: s.vesting.resolve(id)?,
                }))
            }
            RawAllocation::Vesting(v) => {
                let id = v.id.as_str();
                let percent = parse_ratio(&require(id, "percent", v.percent.clone())?)
                    .map_err(unit(id))?;
                Ok(Self::Vesting(VestingSpec {
                    id: v.id.clone(),
                    name: require(id, "name", v.name.clone())?,
                    percent,
                    vesting: v.vesting.resolve(id)?,
                }))
            }
            RawAllocation::Account(a) => {
                let id = a.id.as_str();
                let address = require(id, "address", a.address.as_deref())?
                    .parse::<Address>()
                    .map_err(unit(id))?;
                let share = match (&a.percent, &a.withheld_percent, &a.tokens) {
                    (Some(p), None, None) => Share::Percent(parse_ratio(p).map_err(unit(id))?),
                    (Some(p), Some(w), None) => Share::PercentNet {
                        gross: parse_ratio(p).map_err(unit(id))?,
                        withheld: parse_ratio(w).map_err(unit(id))?,
                    },
                    (None, None, Some(t)) => Share::Exact(
                        Amount::from_dec_str(t.trim())
                            .map_err(|_| unit(id)(UnitError::InvalidDecimal(t.clone())))?,
                    ),
                    (None, None, None) => return Err(missing(id, "percent or tokens")),
                    _ => {
                        return Err(ModelError::SchemaMismatch {
                            id: id.to_string(),
                            expected: "percent [withheldPercent] or tokens".to_string(),
                            actual: "conflicting share fields".to_string(),
                        });
                    }
                };
                Ok(Self::Account(AccountSpec {
                    id: a.id.clone(),
                    address,
                    share,
                }))
            }
        }
    }
}

impl From<&AllocationSpec> for RawAllocation {
    fn from(spec: &AllocationSpec) -> Self {
        match spec {
            AllocationSpec::Sale(s) => Self::Sale(RawSale {
                id: s.id.clone(),
                name: Some(s.name.clone()),
                cooldown_duration: Some(s.cooldown_duration),
                sale_start: match s.start {
                    SaleStart::At(ts) => i64::try_from(ts)
                        .ok()
                        .and_then(|secs| DateTime::from_timestamp(secs, 0))
                        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
                    SaleStart::AfterPrevious => None,
                },
                sale_price: Some(format_ratio(&s.price)),
                target_percent: Some(format_ratio(&s.target_percent)),
                sale_min_per_wallet: Some(s.min_per_wallet),
                affiliate_percent: Some(s.affiliate_percent),
                vesting: RawVesting::from(&s.vesting),
            }),
            AllocationSpec::Vesting(v) => Self::Vesting(RawVestingPool {
                id: v.id.clone(),
                name: Some(v.name.clone()),
                percent: Some(format_ratio(&v.percent)),
                vesting: RawVesting::from(&v.vesting),
            }),
            AllocationSpec::Account(a) => {
                let (percent, withheld_percent, tokens) = match &a.share {
                    Share::Percent(p) => (Some(format_ratio(p)), None, None),
                    Share::PercentNet { gross, withheld } => {
                        (Some(format_ratio(gross)), Some(format_ratio(withheld)), None)
                    }
                    Share::Exact(t) => (None, None, Some(t.to_string())),
                };
                Self::Account(RawAccount {
                    id: a.id.clone(),
                    address: Some(a.address.to_string()),
                    percent,
                    withheld_percent,
                    tokens,
                })
            }
        }
    }
}

/// Parse a JSON table (an array of tagged entries) into typed rows.
pub fn parse_table(json: &str) -> Result<Vec<AllocationSpec>, ModelError> {
    let raw: Vec<RawAllocation> =
        serde_json::from_str(json).map_err(|e| ModelError::SchemaMismatch {
            id: "<table>".to_string(),
            expected: "array of allocation entries".to_string(),
            actual: e.to_string(),
        })?;
    raw.into_iter().map(AllocationSpec::try_from).collect()
}

/// Serialize typed rows to the JSON table form read by [`parse_table`].
pub fn table_to_json(specs: &[AllocationSpec]) -> Result<String, serde_json::Error> {
    let raw: Vec<RawAllocation> = specs.iter().map(RawAllocation::from).collect();
    serde_json::to_string_pretty(&raw)
}
