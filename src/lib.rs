//! # matchup - cluster member de-anonymization from collected status logs
//!
//! A distributed cluster's members log status lines about themselves and
//! about their peers. When those logs are collected after the fact, some
//! members are referenced only by an internal slot number: their hostname or
//! network address never appeared in the collected stream. This crate
//! reconciles the partial, per-member views into one consistent mapping from
//! slot number to canonical identity, using only the cross-references already
//! present in the corpus. No network probing, no directory lookups.
//!
//! ## Core concepts
//!
//! - **Slot**: a member's stable internal identifier, awaiting an identity
//! - **Observation record**: one fact from one log line, grouped by round
//!   signature into mutually comparable snapshots
//! - **Elimination**: deducing an unknown identity as the sole candidate left
//!   after removing everything already attributed
//! - **Fixed point**: a sweep that commits nothing; deducible information is
//!   exhausted and the run classifies as resolved or partial
//!
//! ## Usage
//!
//! ```rust
//! use matchup::{IdentityKind, IdentityRegistry, Matchup, ObservationRecord,
//!               Outcome, RosterEntry, RoundSignature, Subject};
//!
//! let registry = IdentityRegistry::from_roster(vec![
//!     RosterEntry::named("1", "db-east-1"),
//!     RosterEntry::unresolved("2"),
//! ])?;
//!
//! let records = vec![
//!     ObservationRecord::witnessed(
//!         Subject::Identity("db-east-1".into()),
//!         RoundSignature::new("PRIMARY", 1),
//!         "db-east-2",
//!     ),
//!     ObservationRecord::self_report("2", RoundSignature::new("PRIMARY", 1)),
//! ];
//!
//! let mut matchup = Matchup::new(registry, records);
//! assert_eq!(matchup.run(IdentityKind::Name)?, Outcome::Resolved);
//! assert_eq!(matchup.registry().get(&"2".into()).unwrap().name(), Some("db-east-2"));
//! # Ok::<(), matchup::ConflictError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod eliminate;
pub mod error;
pub mod index;
pub mod orchestrator;
pub mod record;
pub mod registry;
pub mod slot;

// Re-export primary types at crate root for convenience
pub use eliminate::eliminate;
pub use error::{ConflictError, MalformedRecordError, MatchupError, MatchupResult};
pub use index::ObservationIndex;
pub use orchestrator::{Matchup, MatchupConfig, Outcome};
pub use record::{ObservationRecord, Observer, RawRecord, RoundSignature, Subject, SELF_SENTINEL};
pub use registry::{IdentityRegistry, RosterEntry};
pub use slot::{IdentityKind, Slot, SlotId};
