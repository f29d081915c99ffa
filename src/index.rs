//! The observation index: round-grouped candidate sets.
//!
//! Grouping is by round signature; records sharing a signature are mutually
//! comparable snapshots of who reported what, from which vantage point. The
//! index is built once per run, for one identity kind, and is immutable
//! afterwards. All containers are ordered so that identical input produces
//! identical grouping and candidate sets regardless of record arrival order.

use std::collections::{BTreeMap, BTreeSet};

use crate::record::{ObservationRecord, Observer, RoundSignature, Subject};
use crate::registry::IdentityRegistry;
use crate::slot::{IdentityKind, SlotId};

/// Per-round view: who self-reported, and what each subject observed.
#[derive(Debug, Default, Clone)]
struct RoundView {
    self_reporters: BTreeSet<SlotId>,
    observed: BTreeMap<Subject, BTreeSet<String>>,
}

/// Read-only index over the observation corpus for one identity kind.
///
/// The name run and the address run see disjoint record subsets: observer
/// values are filtered through [`IdentityKind::classify`] at build time.
#[derive(Debug)]
pub struct ObservationIndex {
    kind: IdentityKind,
    rounds: BTreeMap<RoundSignature, RoundView>,
    mentions: BTreeMap<SlotId, BTreeSet<String>>,
    universe: BTreeSet<String>,
}

impl ObservationIndex {
    /// Builds the index for one kind from validated records.
    ///
    /// Subjects given as identity values are canonicalized to their owning
    /// roster slot through the registry, so a member's records group with its
    /// slot no matter which form the parsing layer emitted.
    #[must_use]
    pub fn build(
        kind: IdentityKind,
        records: &[ObservationRecord],
        registry: &IdentityRegistry,
    ) -> Self {
        let mut rounds: BTreeMap<RoundSignature, RoundView> = BTreeMap::new();
        let mut mentions: BTreeMap<SlotId, BTreeSet<String>> = BTreeMap::new();
        let mut universe = BTreeSet::new();

        for record in records {
            let subject = canonicalize(&record.subject, registry);
            let view = rounds.entry(record.round.clone()).or_default();

            match &record.observer {
                Observer::SelfReport => {
                    if let Subject::Slot(id) = &subject {
                        view.self_reporters.insert(id.clone());
                    }
                }
                Observer::Identity(value) => {
                    if IdentityKind::classify(value) != kind {
                        continue;
                    }
                    universe.insert(value.clone());
                    if let Subject::Slot(id) = &subject {
                        mentions
                            .entry(id.clone())
                            .or_default()
                            .insert(value.clone());
                    }
                    view.observed
                        .entry(subject)
                        .or_default()
                        .insert(value.clone());
                }
            }
        }

        Self {
            kind,
            rounds,
            mentions,
            universe,
        }
    }

    /// The identity kind this index was built for.
    #[must_use]
    pub const fn kind(&self) -> IdentityKind {
        self.kind
    }

    /// Round signatures present in the corpus, in signature order.
    pub fn rounds(&self) -> impl Iterator<Item = &RoundSignature> {
        self.rounds.keys()
    }

    /// The candidate identity set for an unresolved slot within one round.
    ///
    /// Defined only for rounds where the slot self-reported: the self report
    /// is what makes the round's other records comparable vantage points on
    /// this member. Candidates are every non-self observer identity recorded
    /// in the round by subjects other than the slot itself.
    #[must_use]
    pub fn candidates(&self, round: &RoundSignature, slot: &SlotId) -> Option<BTreeSet<String>> {
        let view = self.rounds.get(round)?;
        if !view.self_reporters.contains(slot) {
            return None;
        }
        let mut candidates = BTreeSet::new();
        for (subject, observed) in &view.observed {
            if matches!(subject, Subject::Slot(id) if id == slot) {
                continue;
            }
            candidates.extend(observed.iter().cloned());
        }
        Some(candidates)
    }

    /// Identities this slot reported about, corpus-wide.
    #[must_use]
    pub fn mentions(&self, slot: &SlotId) -> BTreeSet<String> {
        self.mentions.get(slot).cloned().unwrap_or_default()
    }

    /// Every identity of the target kind observed anywhere in the corpus.
    #[must_use]
    pub fn observed_universe(&self) -> &BTreeSet<String> {
        &self.universe
    }

    /// The complement candidate set for a slot.
    ///
    /// A member never names itself in its own peer-status lines, so its
    /// identity lies in the set of observed identities it never mentioned.
    #[must_use]
    pub fn complement_candidates(&self, slot: &SlotId) -> BTreeSet<String> {
        match self.mentions.get(slot) {
            Some(mentioned) => self.universe.difference(mentioned).cloned().collect(),
            None => self.universe.clone(),
        }
    }
}

fn canonicalize(subject: &Subject, registry: &IdentityRegistry) -> Subject {
    match subject {
        Subject::Slot(_) => subject.clone(),
        Subject::Identity(value) => match registry.canonical_slot(value) {
            Some(slot) => Subject::Slot(slot.clone()),
            None => subject.clone(),
        },
    }
}
