use chrono::{DateTime, Utc};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use super::classifier::{classify, BoxStalenessRule, PaymentStatus};
use super::period::{window_for, Period};
use super::StatusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedKind {
    Subscription,
    CollectionBox,
}

/// A stored record whose payment standing can be computed.
pub trait PaymentTracked {
    fn kind(&self) -> TrackedKind;
    fn period(&self) -> &str;
    fn last_payment_at(&self) -> Option<DateTime<Utc>>;
    fn is_active(&self) -> bool;
}

/// Fields merged onto a record in API responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSummary {
    pub kind: TrackedKind,
    pub payment_status: PaymentStatus,
    pub current_period: Option<String>,
    pub days_remaining: Option<i64>,
    pub next_due_date: Option<DateTime<Utc>>,
}

impl PaymentSummary {
    /// Status in the vocabulary of the record it describes: boxes report
    /// active/overdue/dead, subscriptions the canonical scale.
    pub fn status_label(&self) -> &'static str {
        match self.kind {
            TrackedKind::Subscription => self.payment_status.as_str(),
            TrackedKind::CollectionBox => self.payment_status.box_label(),
        }
    }
}

impl Serialize for PaymentSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PaymentSummary", 4)?;
        state.serialize_field("payment_status", self.status_label())?;
        state.serialize_field("current_period", &self.current_period)?;
        state.serialize_field("days_remaining", &self.days_remaining)?;
        state.serialize_field("next_due_date", &self.next_due_date)?;
        state.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Enriched<T> {
    #[serde(flatten)]
    pub record: T,
    #[serde(flatten)]
    pub summary: PaymentSummary,
}

/// Only an unrecognised period string is an error; a missing or unreadable
/// last payment falls through to the "never paid" branch.
pub fn summarize<R: PaymentTracked>(record: &R, now: DateTime<Utc>) -> Result<PaymentSummary, StatusError> {
    let period: Period = record.period().parse()?;
    let window = window_for(period, record.last_payment_at(), now);

    let kind = record.kind();
    let payment_status = match kind {
        TrackedKind::Subscription => classify(window.as_ref()),
        TrackedKind::CollectionBox => {
            BoxStalenessRule::classify(record.last_payment_at(), record.is_active(), now)
        }
    };

    Ok(PaymentSummary {
        kind,
        payment_status,
        current_period: window.as_ref().map(|w| w.label()),
        days_remaining: window.as_ref().map(|w| w.days_remaining()),
        next_due_date: window.map(|w| w.end),
    })
}

pub fn enrich<R: PaymentTracked + Clone>(record: &R, now: DateTime<Utc>) -> Result<Enriched<R>, StatusError> {
    let summary = summarize(record, now)?;
    Ok(Enriched {
        record: record.clone(),
        summary,
    })
}
