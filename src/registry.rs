//! The identity registry: per-slot bookkeeping of committed identities.
//!
//! The registry is the only mutable state of a matchup run. It tracks, per
//! slot, the (name, address) pair, each independently nullable, and enforces
//! global uniqueness of assignment: within one run an identity value belongs
//! to at most one slot, and a slot never changes a committed value. It is
//! owned exclusively by one orchestrator run and passed by reference into
//! each sweep; it is never process-wide state.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ConflictError;
use crate::slot::{IdentityKind, Slot, SlotId};

/// One row of the slot roster supplied by the collection layer before a run.
///
/// The collection layer writes the literal `"unknown"` for members whose
/// identity was never directly observed; [`RosterEntry::seeded`] honors that
/// sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// The member's stable slot identifier.
    pub slot: SlotId,
    /// Pre-known hostname, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    /// Pre-known network address, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub address: Option<String>,
}

impl RosterEntry {
    /// An entry with no pre-known identity.
    #[must_use]
    pub fn unresolved(slot: impl Into<SlotId>) -> Self {
        Self {
            slot: slot.into(),
            name: None,
            address: None,
        }
    }

    /// An entry with a pre-known hostname.
    #[must_use]
    pub fn named(slot: impl Into<SlotId>, name: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            name: Some(name.into()),
            address: None,
        }
    }

    /// An entry with a pre-known network address.
    #[must_use]
    pub fn addressed(slot: impl Into<SlotId>, address: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            name: None,
            address: Some(address.into()),
        }
    }

    /// An entry seeded from a single observed value, collection-layer style.
    ///
    /// The value is classified into the name or address column; the literal
    /// `"unknown"` (or an empty string) leaves the entry unresolved.
    #[must_use]
    pub fn seeded(slot: impl Into<SlotId>, value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("unknown") {
            return Self::unresolved(slot);
        }
        match IdentityKind::classify(value) {
            IdentityKind::Name => Self::named(slot, value),
            IdentityKind::Address => Self::addressed(slot, value),
        }
    }
}

/// In-memory bookkeeping of which slots have a resolved name, address, both,
/// or neither.
///
/// Backed by a persisted store owned by the caller: build it with
/// [`IdentityRegistry::from_roster`] before a run, read it back with
/// [`IdentityRegistry::snapshot`] after a terminal state is reached.
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    slots: BTreeMap<SlotId, Slot>,
    names: BTreeMap<String, SlotId>,
    addresses: BTreeMap<String, SlotId>,
}

impl IdentityRegistry {
    /// Builds a registry from the slot roster.
    ///
    /// # Errors
    ///
    /// [`ConflictError`] if two roster rows claim the same identity value for
    /// the same kind, or repeat a slot with a different value.
    pub fn from_roster(
        roster: impl IntoIterator<Item = RosterEntry>,
    ) -> Result<Self, ConflictError> {
        let mut registry = Self::default();
        for entry in roster {
            registry
                .slots
                .entry(entry.slot.clone())
                .or_insert_with(|| Slot::unresolved(entry.slot.clone()));
            if let Some(name) = entry.name {
                registry.commit(&entry.slot, IdentityKind::Name, &name)?;
            }
            if let Some(address) = entry.address {
                registry.commit(&entry.slot, IdentityKind::Address, &address)?;
            }
        }
        Ok(registry)
    }

    /// Assigns `value` to `slot` for the given kind.
    ///
    /// Returns `Ok(true)` for a new assignment and `Ok(false)` when the slot
    /// already holds exactly this value (a no-op, not an error).
    ///
    /// # Errors
    ///
    /// [`ConflictError`] if the value is committed to a different slot, if
    /// the slot holds a different value for this kind, or if the slot is not
    /// on the roster.
    pub fn commit(
        &mut self,
        slot: &SlotId,
        kind: IdentityKind,
        value: &str,
    ) -> Result<bool, ConflictError> {
        if let Some(holder) = self.owner(kind, value) {
            if holder == slot {
                return Ok(false);
            }
            return Err(ConflictError::IdentityTaken {
                kind,
                value: value.to_string(),
                holder: holder.clone(),
                slot: slot.clone(),
            });
        }

        let entry = self
            .slots
            .get_mut(slot)
            .ok_or_else(|| ConflictError::UnknownSlot { slot: slot.clone() })?;
        if let Some(current) = entry.identity(kind) {
            // Same-value case was handled through the reverse map above.
            return Err(ConflictError::SlotReassigned {
                kind,
                slot: slot.clone(),
                current: current.to_string(),
                value: value.to_string(),
            });
        }

        entry.set_identity(kind, value.to_string());
        self.reverse_map_mut(kind)
            .insert(value.to_string(), slot.clone());
        Ok(true)
    }

    /// Classifies `value` and commits it to the matching column.
    ///
    /// Collection-layer convenience mirroring [`RosterEntry::seeded`].
    ///
    /// # Errors
    ///
    /// Same as [`IdentityRegistry::commit`].
    pub fn seed(&mut self, slot: &SlotId, value: &str) -> Result<bool, ConflictError> {
        self.commit(slot, IdentityKind::classify(value), value)
    }

    /// Whether the slot has a committed identity of the given kind.
    #[must_use]
    pub fn is_resolved(&self, slot: &SlotId, kind: IdentityKind) -> bool {
        self.slots
            .get(slot)
            .is_some_and(|s| s.is_resolved(kind))
    }

    /// All currently committed values of the given kind.
    ///
    /// This is the *Known* input to [`eliminate`](crate::eliminate::eliminate).
    #[must_use]
    pub fn known_values(&self, kind: IdentityKind) -> BTreeSet<String> {
        self.reverse_map(kind).keys().cloned().collect()
    }

    /// Slots still lacking an identity of the given kind, in id order.
    #[must_use]
    pub fn unresolved_slots(&self, kind: IdentityKind) -> Vec<SlotId> {
        self.slots
            .values()
            .filter(|s| !s.is_resolved(kind))
            .map(|s| s.id().clone())
            .collect()
    }

    /// The slot a committed value of the given kind belongs to, if any.
    #[must_use]
    pub fn owner(&self, kind: IdentityKind, value: &str) -> Option<&SlotId> {
        self.reverse_map(kind).get(value)
    }

    /// Resolves a raw subject string to a roster slot.
    ///
    /// Matches the string against slot identifiers first, then against
    /// committed identity values of either kind.
    #[must_use]
    pub fn canonical_slot(&self, raw: &str) -> Option<&SlotId> {
        if let Some((id, _)) = self.slots.get_key_value(&SlotId::from(raw)) {
            return Some(id);
        }
        self.names.get(raw).or_else(|| self.addresses.get(raw))
    }

    /// Looks up one slot.
    #[must_use]
    pub fn get(&self, slot: &SlotId) -> Option<&Slot> {
        self.slots.get(slot)
    }

    /// Iterates all slots in id order.
    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    /// Number of slots on the roster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Serializable copy of the post-run registry contents, for the caller
    /// to persist.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Slot> {
        self.slots.values().cloned().collect()
    }

    fn reverse_map(&self, kind: IdentityKind) -> &BTreeMap<String, SlotId> {
        match kind {
            IdentityKind::Name => &self.names,
            IdentityKind::Address => &self.addresses,
        }
    }

    fn reverse_map_mut(&mut self, kind: IdentityKind) -> &mut BTreeMap<String, SlotId> {
        match kind {
            IdentityKind::Name => &mut self.names,
            IdentityKind::Address => &mut self.addresses,
        }
    }
}
