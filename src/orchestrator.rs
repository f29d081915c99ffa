//! The matchup orchestrator: bounded rounds of elimination to a fixed point.
//!
//! One run resolves one identity kind. A sweep visits every (round,
//! unresolved slot) pair, then every remaining unresolved slot through the
//! complement rule; each unique elimination is committed immediately, so
//! deductions cascade within the sweep as well as across sweeps. A sweep
//! that commits nothing is a fixed point: deducible information is
//! exhausted and the run classifies as resolved or partial. Cyclic or
//! underdetermined observation graphs reach that fixed point instead of
//! looping, and a defensive sweep ceiling bounds the loop regardless.

use std::fmt;

use crate::eliminate::eliminate;
use crate::error::ConflictError;
use crate::index::ObservationIndex;
use crate::record::{ObservationRecord, RawRecord};
use crate::registry::IdentityRegistry;
use crate::slot::IdentityKind;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct MatchupConfig {
    /// Hard ceiling on sweeps per run.
    ///
    /// The fixed-point check terminates well before this on any real corpus;
    /// the ceiling guards against a progress-reporting bug ever reintroducing
    /// an unbounded loop.
    pub max_sweeps: usize,
}

impl Default for MatchupConfig {
    fn default() -> Self {
        Self { max_sweeps: 64 }
    }
}

/// Per-run classification of a matchup result. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No members at all; vacuous success.
    Empty,
    /// Every slot has a resolved identity of the target kind.
    Resolved,
    /// At least one slot remains unresolved after reaching a fixed point.
    ///
    /// Not an error: every assignment elimination did establish stays
    /// committed.
    Partial,
}

impl Outcome {
    /// The caller contract code: `1` for success, `-1` for partial.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Empty | Self::Resolved => 1,
            Self::Partial => -1,
        }
    }

    /// Whether the run counts as a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code() == 1
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty"),
            Self::Resolved => f.write_str("resolved"),
            Self::Partial => f.write_str("partial"),
        }
    }
}

/// Run phases. `Init` handles the vacuous cases, `Iterating` sweeps to a
/// fixed point, `Done` carries the terminal classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Iterating,
    Done(Outcome),
}

/// A matchup invocation over one roster and one observation corpus.
///
/// Owns the registry for the duration of the run; no state is shared with
/// concurrent runs. Records are loaded once up front and nothing blocks on
/// I/O mid-algorithm.
///
/// # Examples
///
/// ```
/// use matchup::{IdentityKind, Matchup, ObservationRecord, Outcome, RosterEntry,
///               IdentityRegistry, RoundSignature, Subject};
///
/// let registry = IdentityRegistry::from_roster(vec![
///     RosterEntry::named("1", "alpha"),
///     RosterEntry::unresolved("2"),
/// ]).unwrap();
///
/// let records = vec![
///     ObservationRecord::witnessed(
///         Subject::Identity("alpha".into()), RoundSignature::new("PRIMARY", 1), "beta"),
///     ObservationRecord::self_report("2", RoundSignature::new("PRIMARY", 1)),
/// ];
///
/// let mut matchup = Matchup::new(registry, records);
/// assert_eq!(matchup.run(IdentityKind::Name).unwrap(), Outcome::Resolved);
/// assert_eq!(matchup.registry().get(&"2".into()).unwrap().name(), Some("beta"));
/// ```
#[derive(Debug)]
pub struct Matchup {
    registry: IdentityRegistry,
    records: Vec<ObservationRecord>,
    rejected: usize,
    config: MatchupConfig,
}

impl Matchup {
    /// Creates a matchup over validated records.
    #[must_use]
    pub fn new(registry: IdentityRegistry, records: Vec<ObservationRecord>) -> Self {
        Self {
            registry,
            records,
            rejected: 0,
            config: MatchupConfig::default(),
        }
    }

    /// Creates a matchup from raw log documents.
    ///
    /// Malformed records are rejected before indexing, each with a warning;
    /// the run continues without them. See [`Matchup::rejected_records`].
    #[must_use]
    pub fn from_raw(registry: IdentityRegistry, raw: Vec<RawRecord>) -> Self {
        let mut records = Vec::with_capacity(raw.len());
        let mut rejected = 0;
        for document in raw {
            match document.validate(&registry) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(error = %err, "rejected malformed observation record");
                    rejected += 1;
                }
            }
        }
        Self {
            registry,
            records,
            rejected,
            config: MatchupConfig::default(),
        }
    }

    /// Overrides the default configuration.
    #[must_use]
    pub fn with_config(mut self, config: MatchupConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolves one identity kind to a fixed point.
    ///
    /// Partial resolution keeps every assignment committed before the fixed
    /// point was reached; nothing is rolled back.
    ///
    /// # Errors
    ///
    /// [`ConflictError`] if a deduction would assign an identity already
    /// belonging to a different slot, or re-assign a slot. Fatal to the run,
    /// never silently resolved.
    pub fn run(&mut self, kind: IdentityKind) -> Result<Outcome, ConflictError> {
        let index = ObservationIndex::build(kind, &self.records, &self.registry);
        let mut sweeps = 0usize;
        let mut phase = Phase::Init;

        let outcome = loop {
            phase = match phase {
                Phase::Init => {
                    if self.registry.is_empty() {
                        Phase::Done(Outcome::Empty)
                    } else if self.registry.unresolved_slots(kind).is_empty() {
                        Phase::Done(Outcome::Resolved)
                    } else {
                        Phase::Iterating
                    }
                }
                Phase::Iterating => {
                    sweeps += 1;
                    let commits = self.sweep(kind, &index)?;
                    tracing::debug!(%kind, sweeps, commits, "matchup sweep finished");
                    if commits == 0 || sweeps >= self.config.max_sweeps {
                        Phase::Done(self.classify(kind))
                    } else {
                        Phase::Iterating
                    }
                }
                Phase::Done(outcome) => break outcome,
            };
        };

        tracing::info!(%kind, %outcome, sweeps, "matchup run finished");
        Ok(outcome)
    }

    /// Runs both identity kinds and returns the combined caller code.
    ///
    /// Name resolution and address resolution are independent passes sharing
    /// the slot set and nothing else. The combined code is `1` only if both
    /// runs succeed, `-1` otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`Matchup::run`].
    pub fn run_all(&mut self) -> Result<i32, ConflictError> {
        let names = self.run(IdentityKind::Name)?;
        let addresses = self.run(IdentityKind::Address)?;
        Ok(if names.is_success() && addresses.is_success() {
            1
        } else {
            -1
        })
    }

    /// Post-run read access to the registry contents.
    #[must_use]
    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// Consumes the matchup, returning the registry for persistence.
    #[must_use]
    pub fn into_registry(self) -> IdentityRegistry {
        self.registry
    }

    /// Records dropped during raw ingestion.
    #[must_use]
    pub fn rejected_records(&self) -> usize {
        self.rejected
    }

    /// One pass over all (round, unresolved slot) pairs, then the complement
    /// rule over remaining unresolved slots. Commits apply immediately so
    /// later steps of the same sweep observe the updated known set.
    fn sweep(
        &mut self,
        kind: IdentityKind,
        index: &ObservationIndex,
    ) -> Result<usize, ConflictError> {
        let mut commits = 0;

        for round in index.rounds() {
            for slot in self.registry.unresolved_slots(kind) {
                let Some(candidates) = index.candidates(round, &slot) else {
                    continue;
                };
                let known = self.registry.known_values(kind);
                if let Some(value) = eliminate(&known, &candidates) {
                    let value = value.to_string();
                    if self.registry.commit(&slot, kind, &value)? {
                        tracing::debug!(%kind, %slot, %value, %round, "identity deduced");
                        commits += 1;
                    }
                }
            }
        }

        for slot in self.registry.unresolved_slots(kind) {
            let candidates = index.complement_candidates(&slot);
            let known = self.registry.known_values(kind);
            if let Some(value) = eliminate(&known, &candidates) {
                let value = value.to_string();
                if self.registry.commit(&slot, kind, &value)? {
                    tracing::debug!(%kind, %slot, %value, "identity deduced by complement");
                    commits += 1;
                }
            }
        }

        Ok(commits)
    }

    fn classify(&self, kind: IdentityKind) -> Outcome {
        if self.registry.unresolved_slots(kind).is_empty() {
            Outcome::Resolved
        } else {
            Outcome::Partial
        }
    }
}
