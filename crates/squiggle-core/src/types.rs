//! Core domain types: amounts, addresses, action identifiers and targets.
//!
//! All token amounts are base units held in 256-bit unsigned integers, the
//! width the on-chain contracts use.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::UnitError;

/// Token or fiat amount in base units.
pub type Amount = primitive_types::U256;

/// A 20-byte EVM account or contract address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = UnitError;

    /// Parse a `0x`-prefixed, 40 hex digit address. Checksum casing is
    /// accepted but not verified.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .strip_prefix("0x")
            .or_else(|| s.trim().strip_prefix("0X"))
            .ok_or_else(|| UnitError::InvalidAddress(s.to_string()))?;
        if digits.len() != 40 {
            return Err(UnitError::InvalidAddress(s.to_string()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| UnitError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Stable identifier of a plan action.
///
/// Derived from names and allocation ids only, never from argument values,
/// so recompiling the same table yields the same identifiers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Owner of an allocation's tokens.
///
/// `Action` is a forward reference: the address becomes known only once the
/// named creation action has executed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Action(ActionId),
    Account(Address),
}

impl Target {
    /// The referenced action, if this target is a forward reference.
    pub fn action(&self) -> Option<&ActionId> {
        match self {
            Self::Action(id) => Some(id),
            Self::Account(_) => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(id) => write!(f, "@{id}"),
            Self::Account(addr) => write!(f, "{addr}"),
        }
    }
}

/// How an allocation's tokens unlock over time.
///
/// Percentages are in ppm of the allocation, durations in seconds.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub struct VestingSchedule {
    /// Unlocked at token generation.
    pub tge_percent: u64,
    pub cliff_duration: u64,
    /// Unlocked when the cliff ends.
    pub cliff_percent: u64,
    /// Remainder releases linearly over this period after the cliff.
    pub linear_duration: u64,
}

/// Serde adapter writing [`Amount`] as a decimal string.
pub mod amount_dec {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        Amount::from_dec_str(s.trim()).map_err(|e| serde::de::Error::custom(format!("{e:?}")))
    }
}

/// Serde adapter for optional [`Amount`] fields.
pub mod amount_dec_opt {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Amount>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Amount>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| {
                Amount::from_dec_str(s.trim())
                    .map_err(|e| serde::de::Error::custom(format!("{e:?}")))
            })
            .transpose()
    }
}
