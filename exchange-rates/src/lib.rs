//! Currency Catalogue and Static Exchange Rates
//!
//! Currencies are defined declaratively with the `define_currencies!` macro,
//! which generates the runtime `CurrencyCode` enum together with its
//! metadata (symbol, minor unit, decimal places, reference rate to USD).
//!
//! Rates are fixed-precision [`Decimal`] values. A [`RateTable`] holds one
//! USD reference rate per currency and derives cross rates from them.
//!
//! # Adding a New Currency
//! Add a line to the `define_currencies!` invocation, keeping the list in
//! alphabetical order of the code (the derived `Ord` relies on it):
//! ```ignore
//! define_currencies! {
//!     // ... existing currencies ...
//!     CHF => ("CHF", "Fr", "rappen", 2, dec!(1.13)),
//! }
//! ```
//!
//! # Example
//! ```
//! use exchange_rates::{CurrencyCode, RateTable};
//! use rust_decimal_macros::dec;
//!
//! let table = RateTable::base();
//! let rate = table.rate(CurrencyCode::USD, CurrencyCode::USD).unwrap();
//! assert_eq!(rate, dec!(1));
//! assert_eq!(CurrencyCode::JPY.decimal_places(), 0);
//! ```

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Number of fractional digits kept on derived cross rates.
pub const RATE_SCALE: u32 = 10;

/// Errors produced by rate lookups and conversions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("No rate configured for {0}")]
    MissingRate(CurrencyCode),

    #[error("Rate for {0} must be positive")]
    NonPositiveRate(CurrencyCode),

    #[error("Arithmetic overflow converting {0} -> {1}")]
    Overflow(CurrencyCode, CurrencyCode),
}

// ─────────────────────────────────────────────────────────────────────────────
// THE MACRO: Defines the CurrencyCode enum and its metadata
// ─────────────────────────────────────────────────────────────────────────────

/// Macro to define currencies with auto-generated metadata accessors.
///
/// # Syntax
/// ```ignore
/// define_currencies! {
///     NAME => ("CODE", "SYMBOL", "minor_unit", decimal_places, to_usd_rate),
/// }
/// ```
#[macro_export]
macro_rules! define_currencies {
    (
        $(
            $name:ident => ($code:literal, $symbol:literal, $minor:literal, $places:expr, $to_usd:expr)
        ),* $(,)?
    ) => {
        /// ISO 4217 code of a supported currency.
        ///
        /// Ordering follows the code alphabetically; multi-wallet operations
        /// use it as the global lock order.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize, utoipa::ToSchema,
        )]
        #[serde(rename_all = "UPPERCASE")]
        pub enum CurrencyCode {
            $($name),*
        }

        impl CurrencyCode {
            pub fn code(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $code),*
                }
            }

            pub fn symbol(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $symbol),*
                }
            }

            /// Name of the minor unit ("cent", "kopeck").
            pub fn minor_unit(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $minor),*
                }
            }

            /// Number of decimal places of the minor unit.
            pub fn decimal_places(&self) -> u32 {
                match self {
                    $(CurrencyCode::$name => $places),*
                }
            }

            /// Reference value of one major unit in USD.
            pub fn base_to_usd_rate(&self) -> Decimal {
                match self {
                    $(CurrencyCode::$name => $to_usd),*
                }
            }

            pub fn all() -> &'static [CurrencyCode] {
                &[$(CurrencyCode::$name),*]
            }
        }

        impl std::fmt::Display for CurrencyCode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.code())
            }
        }

        impl std::str::FromStr for CurrencyCode {
            type Err = RateError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($code => Ok(CurrencyCode::$name),)*
                    _ => Err(RateError::UnknownCurrency(s.to_string())),
                }
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// CURRENCY DEFINITIONS - keep alphabetical
// ─────────────────────────────────────────────────────────────────────────────

define_currencies! {
    EUR => ("EUR", "€", "cent", 2, dec!(1.087)),
    GBP => ("GBP", "£", "penny", 2, dec!(1.266)),
    JPY => ("JPY", "¥", "yen", 0, dec!(0.0067)),
    RUB => ("RUB", "₽", "kopeck", 2, dec!(0.0108)),
    USD => ("USD", "$", "cent", 2, dec!(1.0)),
}

impl CurrencyCode {
    /// How many minor units make one major unit (100 for USD, 1 for JPY).
    pub fn minor_units_per_major(&self) -> i64 {
        10_i64.pow(self.decimal_places())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate Table
// ─────────────────────────────────────────────────────────────────────────────

/// In-process table of USD reference rates.
///
/// Cross rates are derived as `usd(from) / usd(to)`.
#[derive(Debug, Clone)]
pub struct RateTable {
    usd_rates: HashMap<CurrencyCode, Decimal>,
}

impl Default for RateTable {
    fn default() -> Self {
        Self::base()
    }
}

impl RateTable {
    /// Table seeded with the built-in reference rates.
    pub fn base() -> Self {
        let usd_rates = CurrencyCode::all()
            .iter()
            .map(|&c| (c, c.base_to_usd_rate()))
            .collect();
        Self { usd_rates }
    }

    /// Table with no rates at all.
    pub fn empty() -> Self {
        Self {
            usd_rates: HashMap::new(),
        }
    }

    /// Overrides (or adds) the USD reference rate of a currency.
    pub fn with_rate(mut self, currency: CurrencyCode, usd_rate: Decimal) -> Self {
        self.usd_rates.insert(currency, usd_rate);
        self
    }

    pub fn usd_rate(&self, currency: CurrencyCode) -> Result<Decimal, RateError> {
        let rate = *self
            .usd_rates
            .get(&currency)
            .ok_or(RateError::MissingRate(currency))?;
        if rate <= Decimal::ZERO {
            return Err(RateError::NonPositiveRate(currency));
        }
        Ok(rate)
    }

    /// Units of `to` received for one unit of `from`.
    pub fn rate(&self, from: CurrencyCode, to: CurrencyCode) -> Result<Decimal, RateError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        let from_usd = self.usd_rate(from)?;
        let to_usd = self.usd_rate(to)?;
        from_usd
            .checked_div(to_usd)
            .map(|r| r.round_dp(RATE_SCALE).normalize())
            .ok_or(RateError::Overflow(from, to))
    }

    /// Converts `amount` of `from` into `to`. The result is not rounded to
    /// the target's minor unit; callers decide the rounding policy.
    pub fn convert(
        &self,
        amount: Decimal,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<Decimal, RateError> {
        let rate = self.rate(from, to)?;
        amount
            .checked_mul(rate)
            .ok_or(RateError::Overflow(from, to))
    }

    /// Rates of every configured currency against `base`.
    pub fn all_rates(
        &self,
        base: CurrencyCode,
    ) -> Result<BTreeMap<CurrencyCode, Decimal>, RateError> {
        let mut currencies: Vec<_> = self.usd_rates.keys().copied().collect();
        currencies.sort();
        currencies
            .into_iter()
            .map(|c| Ok((c, self.rate(base, c)?)))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
