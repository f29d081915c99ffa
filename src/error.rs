//! Error types for the matchup engine.
//!
//! All errors are strongly typed using thiserror. Conflicts are fatal to a
//! run and surface to the caller; malformed records are rejected during
//! ingestion and reported as warnings, never as run failures.

use thiserror::Error;

use crate::slot::{IdentityKind, SlotId};

/// An identity assignment would violate global uniqueness.
///
/// Identities are globally unique within one matchup run: once a name or an
/// address belongs to a slot, no other slot may claim it, and the slot may
/// not later be given a different value of that kind. A conflict is never
/// silently resolved by picking one side.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConflictError {
    /// The value is already committed to a different slot.
    #[error("{kind} '{value}' is already assigned to slot '{holder}', cannot assign to slot '{slot}'")]
    IdentityTaken {
        /// Which identity kind was being assigned.
        kind: IdentityKind,
        /// The contested identity value.
        value: String,
        /// The slot that already holds the value.
        holder: SlotId,
        /// The slot the assignment was attempted for.
        slot: SlotId,
    },

    /// The slot already holds a different value for this kind.
    #[error("slot '{slot}' already has {kind} '{current}', cannot re-assign to '{value}'")]
    SlotReassigned {
        /// Which identity kind was being assigned.
        kind: IdentityKind,
        /// The target slot.
        slot: SlotId,
        /// The value the slot already holds.
        current: String,
        /// The conflicting new value.
        value: String,
    },

    /// The slot is not part of the roster this registry was built from.
    #[error("slot '{slot}' is not present in the roster")]
    UnknownSlot {
        /// The missing slot.
        slot: SlotId,
    },
}

/// A raw record is missing a component required for indexing.
///
/// The offending record is dropped before grouping and the run continues
/// without it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedRecordError {
    /// A required field was absent.
    #[error("record is missing required field '{field}'")]
    MissingField {
        /// Name of the absent field.
        field: &'static str,
    },

    /// A required field was present but empty.
    #[error("record field '{field}' is empty")]
    EmptyField {
        /// Name of the empty field.
        field: &'static str,
    },
}

/// Top-level error type for the matchup engine.
#[derive(Debug, Error)]
pub enum MatchupError {
    /// An identity assignment conflict. Fatal to the run.
    #[error("conflict: {0}")]
    Conflict(#[from] ConflictError),

    /// A record failed ingestion validation.
    #[error("malformed record: {0}")]
    MalformedRecord(#[from] MalformedRecordError),
}

/// Result type alias for matchup operations.
pub type MatchupResult<T> = Result<T, MatchupError>;
