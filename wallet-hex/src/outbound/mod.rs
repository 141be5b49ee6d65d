//! Outbound adapters driven by the wallet core.

mod rates;

pub use rates::{HttpRateSource, StaticRateSource};
