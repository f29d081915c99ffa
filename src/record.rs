//! Observation records and round signatures.
//!
//! A record is an immutable fact lifted from one log line: some member
//! (the subject) was seen in a given reporting round, either by its own log
//! stream (`self`) or by a different member named in the line. The engine
//! never creates, edits, or deletes records; it only groups and reads them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MalformedRecordError;
use crate::registry::IdentityRegistry;
use crate::slot::SlotId;

/// Wire sentinel marking a record produced by the subject's own log stream.
pub const SELF_SENTINEL: &str = "self";

/// Key grouping contemporaneous observation records across the cluster.
///
/// Two records belong to the same round if and only if their signatures are
/// equal. The signature is constructed once at ingestion and never re-derived
/// per comparison.
///
/// # Examples
///
/// ```
/// use matchup::RoundSignature;
///
/// let a = RoundSignature::new("PRIMARY", 1);
/// let b = RoundSignature::new("PRIMARY", 1);
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoundSignature {
    /// State label reported for the round (e.g. `PRIMARY`, `ARBITER`).
    pub state: String,
    /// Sequence code distinguishing repeats of the same state.
    pub sequence: i64,
}

impl RoundSignature {
    /// Creates a round signature from its state label and sequence code.
    #[must_use]
    pub fn new(state: impl Into<String>, sequence: i64) -> Self {
        Self {
            state: state.into(),
            sequence,
        }
    }
}

impl fmt::Display for RoundSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.state, self.sequence)
    }
}

/// The member a record is about: a bare slot, or an already-known identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    /// The subject is known only by its internal slot number.
    Slot(SlotId),
    /// The subject's log stream directly revealed an identity value.
    Identity(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slot(id) => write!(f, "slot:{id}"),
            Self::Identity(value) => f.write_str(value),
        }
    }
}

/// Who reported the subject during the round.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Observer {
    /// The subject's own log stream produced the record.
    SelfReport,
    /// A different member witnessed the subject, named by identity.
    Identity(String),
}

impl Observer {
    /// Parses the wire form: the literal `"self"` or an identity value.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        if value == SELF_SENTINEL {
            Self::SelfReport
        } else {
            Self::Identity(value.to_string())
        }
    }

    /// Whether this is a self report.
    #[must_use]
    pub const fn is_self(&self) -> bool {
        matches!(self, Self::SelfReport)
    }
}

/// An immutable, validated fact taken from one log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Who the record is about.
    pub subject: Subject,
    /// The reporting round the record belongs to.
    pub round: RoundSignature,
    /// Who produced the record.
    pub observer: Observer,
    /// When the line was emitted, if the collection layer kept it.
    ///
    /// Carried metadata only; grouping never depends on wall-clock order.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub observed_at: Option<DateTime<Utc>>,
}

impl ObservationRecord {
    /// Creates a validated record.
    #[must_use]
    pub fn new(subject: Subject, round: RoundSignature, observer: Observer) -> Self {
        Self {
            subject,
            round,
            observer,
            observed_at: None,
        }
    }

    /// Attaches an emission timestamp.
    #[must_use]
    pub fn at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = Some(observed_at);
        self
    }

    /// A self report: `slot` wrote about itself during `round`.
    #[must_use]
    pub fn self_report(slot: impl Into<SlotId>, round: RoundSignature) -> Self {
        Self::new(Subject::Slot(slot.into()), round, Observer::SelfReport)
    }

    /// A witnessed report: `subject` logged a line naming `observer`.
    #[must_use]
    pub fn witnessed(subject: Subject, round: RoundSignature, observer: impl Into<String>) -> Self {
        Self::new(subject, round, Observer::Identity(observer.into()))
    }
}

/// Loosely-shaped ingestion form of a record, as collected log documents
/// arrive from the parsing layer.
///
/// Every field is optional; [`RawRecord::validate`] rejects records missing a
/// subject, round signature, or observer with [`MalformedRecordError`]. The
/// run continues without rejected records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    /// Raw subject field: a slot number or an identity value.
    #[serde(default)]
    pub subject: Option<String>,
    /// Raw state label of the round signature.
    #[serde(default)]
    pub state: Option<String>,
    /// Raw sequence code of the round signature.
    #[serde(default)]
    pub sequence: Option<i64>,
    /// Raw observer field: `"self"` or an identity value.
    #[serde(default)]
    pub observer: Option<String>,
    /// Emission timestamp, if present.
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
}

impl RawRecord {
    /// Validates the raw document into an [`ObservationRecord`].
    ///
    /// The registry disambiguates the subject field: a value matching a
    /// roster slot number becomes [`Subject::Slot`], a value matching an
    /// already-known identity is canonicalized to the owning slot, and
    /// anything else is carried as [`Subject::Identity`].
    ///
    /// # Errors
    ///
    /// [`MalformedRecordError`] if the subject, state, sequence, or observer
    /// is missing or empty.
    pub fn validate(
        self,
        registry: &IdentityRegistry,
    ) -> Result<ObservationRecord, MalformedRecordError> {
        let subject = required(self.subject, "subject")?;
        let state = required(self.state, "state")?;
        let sequence = self
            .sequence
            .ok_or(MalformedRecordError::MissingField { field: "sequence" })?;
        let observer = required(self.observer, "observer")?;

        let subject = match registry.canonical_slot(&subject) {
            Some(slot) => Subject::Slot(slot.clone()),
            None => Subject::Identity(subject),
        };

        let mut record = ObservationRecord::new(
            subject,
            RoundSignature::new(state, sequence),
            Observer::from_wire(&observer),
        );
        record.observed_at = self.observed_at;
        Ok(record)
    }
}

fn required(
    value: Option<String>,
    field: &'static str,
) -> Result<String, MalformedRecordError> {
    match value {
        None => Err(MalformedRecordError::MissingField { field }),
        Some(v) if v.trim().is_empty() => Err(MalformedRecordError::EmptyField { field }),
        Some(v) => Ok(v),
    }
}
