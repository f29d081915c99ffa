//! Slot types and identity classification.
//!
//! A slot is a cluster member's stable internal identifier, assigned by the
//! log-collection layer before matchup begins. The engine's job is to attach
//! a canonical identity (hostname and/or network address) to each slot; the
//! slot itself never changes.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Stable internal identifier for a cluster member.
///
/// The collection layer may number members with integers; those are carried
/// here as their decimal string form. A `SlotId` is never invented by this
/// crate and never deleted during a run.
///
/// # Examples
///
/// ```
/// use matchup::SlotId;
///
/// let id = SlotId::from(2u64);
/// assert_eq!(id.as_str(), "2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    /// Creates a slot ID from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SlotId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for SlotId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// The two identity kinds resolved by independent matchup passes.
///
/// Name resolution and address resolution use the same machinery twice, over
/// disjoint record subsets; the passes share the slot set and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    /// A human-readable hostname.
    Name,
    /// A network address (IP, or `ip:port`).
    Address,
}

impl IdentityKind {
    /// Classifies an observed identity value.
    ///
    /// Values that parse as an IP address or an `ip:port` socket address are
    /// [`IdentityKind::Address`]; everything else is a hostname.
    ///
    /// # Examples
    ///
    /// ```
    /// use matchup::IdentityKind;
    ///
    /// assert_eq!(IdentityKind::classify("10.4.3.56"), IdentityKind::Address);
    /// assert_eq!(IdentityKind::classify("10.4.3.56:27017"), IdentityKind::Address);
    /// assert_eq!(IdentityKind::classify("db-east-1"), IdentityKind::Name);
    /// ```
    #[must_use]
    pub fn classify(value: &str) -> Self {
        let value = value.trim();
        if value.parse::<IpAddr>().is_ok() || value.parse::<SocketAddr>().is_ok() {
            Self::Address
        } else {
            Self::Name
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => f.write_str("name"),
            Self::Address => f.write_str("address"),
        }
    }
}

/// One cluster member: its slot ID plus whatever identity is known so far.
///
/// Mutated only through [`IdentityRegistry::commit`](crate::IdentityRegistry::commit);
/// global uniqueness of committed identities is enforced there, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    id: SlotId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    address: Option<String>,
}

impl Slot {
    /// Creates a slot with no resolved identity.
    #[must_use]
    pub fn unresolved(id: impl Into<SlotId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            address: None,
        }
    }

    /// Creates a slot with pre-known identity components.
    #[must_use]
    pub fn with_identity(
        id: impl Into<SlotId>,
        name: Option<String>,
        address: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name,
            address,
        }
    }

    /// The slot's stable identifier.
    #[must_use]
    pub fn id(&self) -> &SlotId {
        &self.id
    }

    /// The resolved identity of the given kind, if any.
    #[must_use]
    pub fn identity(&self, kind: IdentityKind) -> Option<&str> {
        match kind {
            IdentityKind::Name => self.name.as_deref(),
            IdentityKind::Address => self.address.as_deref(),
        }
    }

    /// The resolved hostname, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The resolved network address, if any.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Whether the identity kind under analysis is set.
    #[must_use]
    pub fn is_resolved(&self, kind: IdentityKind) -> bool {
        self.identity(kind).is_some()
    }

    pub(crate) fn set_identity(&mut self, kind: IdentityKind, value: String) {
        match kind {
            IdentityKind::Name => self.name = Some(value),
            IdentityKind::Address => self.address = Some(value),
        }
    }
}
