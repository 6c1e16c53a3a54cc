use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::period::PeriodWindow;

/// Computed payment standing of a subscription or a collection box.
/// Never persisted; derived again on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Overdue,
    Dead,
}

impl PaymentStatus {
    /// Two-value vocabulary used by the donor-facing status endpoint.
    pub fn paid_pending_label(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            _ => "pending",
        }
    }

    /// Three-value vocabulary used for collection boxes.
    pub fn box_label(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "active",
            PaymentStatus::Pending | PaymentStatus::Overdue => "overdue",
            PaymentStatus::Dead => "dead",
        }
    }

    pub fn from_box_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "active" => Some(PaymentStatus::Paid),
            "overdue" => Some(PaymentStatus::Overdue),
            "dead" => Some(PaymentStatus::Dead),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Overdue => "overdue",
            PaymentStatus::Dead => "dead",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paid" => Ok(PaymentStatus::Paid),
            "pending" => Ok(PaymentStatus::Pending),
            "overdue" => Ok(PaymentStatus::Overdue),
            "dead" => Ok(PaymentStatus::Dead),
            other => Err(format!("Unknown payment status: {}", other)),
        }
    }
}

/// Period rule. The paid side of the boundary is exclusive: a payment made
/// exactly one period ago is already due.
pub fn classify(window: Option<&PeriodWindow>) -> PaymentStatus {
    let Some(window) = window else {
        return PaymentStatus::Pending;
    };

    let elapsed = window.days_elapsed;
    if elapsed < window.length_days {
        PaymentStatus::Paid
    } else if elapsed == window.length_days {
        PaymentStatus::Pending
    } else {
        PaymentStatus::Overdue
    }
}

/// Collection boxes are emptied on a calendar cadence regardless of their
/// period: a box untouched for four calendar months is overdue.
pub struct BoxStalenessRule;

impl BoxStalenessRule {
    pub const STALE_AFTER_MONTHS: i32 = 4;

    /// Calendar-field month difference, ignoring the day of month.
    pub fn months_between(last: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
        (now.year() - last.year()) * 12 + (now.month() as i32 - last.month() as i32)
    }

    pub fn classify(
        last_payment_at: Option<DateTime<Utc>>,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> PaymentStatus {
        let Some(last) = last_payment_at else {
            return PaymentStatus::Dead;
        };

        if Self::months_between(last, now) >= Self::STALE_AFTER_MONTHS {
            PaymentStatus::Overdue
        } else if is_active {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Dead
        }
    }
}
