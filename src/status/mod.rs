//! Payment standing of subscriptions and collection boxes.
//!
//! Everything here is a pure function of `(period, last payment, now)` (plus
//! the active flag for boxes). Callers load a record, pass in the clock and
//! merge the result into their response; nothing is written back.

pub mod classifier;
pub mod lifecycle;
pub mod period;

use thiserror::Error;

pub use classifier::PaymentStatus;
pub use lifecycle::{enrich, summarize, Enriched, PaymentSummary, PaymentTracked, TrackedKind};
pub use period::{deserialize_lenient_timestamp, Period};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
}
