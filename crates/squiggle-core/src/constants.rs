//! Distribution constants. All token amounts are in base units
//! (1 SQGL = 10^18 base units) and all rates in parts-per-million.

/// Total token supply in base units.
///
/// Fits `u128`, but `TOTAL_SUPPLY * PERCENT_DIVISOR` does not, so supply
/// arithmetic is carried out in 256-bit integers.
pub const TOTAL_SUPPLY: u128 = 343_434_343_434_343_434_343_434_343_434;

/// Decimals of the distributed token.
pub const TOKEN_DECIMALS: u32 = 18;

/// Decimals of the fiat payment asset (BSC USDT uses 18).
pub const FIAT_DECIMALS: u32 = 18;

/// One hundred percent in ppm.
///
/// # Examples
///
/// ```
/// use squiggle_core::constants::PPM_PRECISION;
/// assert_eq!(PPM_PRECISION, 1_000_000);
/// ```
pub const PPM_PRECISION: u64 = 1_000_000;

/// Percent inputs are quantized to this many parts per unit percent
/// (8 decimal digits) before being applied to the supply.
pub const PERCENT_QUANTUM: u128 = 100_000_000;

/// Divisor applied after multiplying the supply by a quantized percent.
pub const PERCENT_DIVISOR: u128 = 100 * PERCENT_QUANTUM;

/// Fiat inputs are quantized to 6 decimal digits.
pub const FIAT_QUANTUM: u128 = 1_000_000;

pub const SECONDS_PER_DAY: u64 = 24 * 3600;

/// A vesting month is exactly 31 days, not a calendar month.
pub const DAYS_PER_VESTING_MONTH: u64 = 31;

/// Share of the sale proceeds the sale contract routes into DEX liquidity,
/// in ppm (5.7031%).
pub const SALE_LIQUIDITY_PPM: u64 = 57_031;

/// Percent of supply kept back from the CEX wallet for DEX liquidity.
pub const LIQUIDITY_DEX_PERCENT: &str = "1.5";

/// Wallet that receives the CEX liquidity allocation when the environment
/// does not name one.
pub const DEFAULT_CEX_ADDRESS: &str = "0x03d1ECec6513Da227C94Ca6E9a04BcB04A777D32";

/// Id of the residual liquidity reserve appended after validation.
pub const LIQUIDITY_RESERVE_ID: &str = "liquidity_dex";

/// Start of the first sale tier.
pub const FIRST_SALE_START: &str = "2024-05-31T15:43:34Z";

/// Deployment build mode.
///
/// Controls whether the plan deploys its own test payment asset or binds to
/// the existing one on chain.
///
/// # Examples
///
/// ```
/// use squiggle_core::constants::BuildMode;
/// assert_eq!(BuildMode::from_node_env(Some("production")), BuildMode::Production);
/// assert_eq!(BuildMode::from_node_env(None), BuildMode::Development);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuildMode {
    /// Local and test networks: a mock payment asset is deployed.
    #[default]
    Development,
    /// Mainnet: the payment asset already exists.
    Production,
}

impl BuildMode {
    /// Interpret a `NODE_ENV`-style value. Anything other than
    /// `production` is development.
    pub fn from_node_env(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn deploys_payment_asset(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}
