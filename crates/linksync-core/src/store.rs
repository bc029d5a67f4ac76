// # Managed-Address Store
//
// In-memory record of the addresses the controller believes it has
// applied, keyed by link name.
//
// ## Purpose
//
// The store is the controller's belief about kernel state, never the
// authority: live kernel listings are consulted before every mutation,
// and the store is only updated after a confirmed state transition.
//
// ## Crash Behavior
//
// Nothing is persisted. After a restart the store is re-derived from a
// fresh kernel listing (`Controller::sync`); durability is the
// kernel's job, not this crate's.
//
// ## Locking
//
// The store itself does no locking. The `Controller` owns it behind a
// mutex held across each full list-decide-mutate-record sequence,
// which is what the idempotence guarantee depends on.

use std::collections::HashMap;

use crate::types::LinkAddress;

/// In-memory mapping from link name to the addresses the controller
/// currently considers applied and owned on that link.
///
/// Callers (the `Controller`) are responsible for only inserting
/// already-labeled, family-valid addresses; the store does not
/// validate either.
#[derive(Debug, Clone, Default)]
pub struct AddressStore {
    inner: HashMap<String, Vec<LinkAddress>>,
}

impl AddressStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Insert an address under a link name.
    ///
    /// Idempotent: inserting an address already present by equality is
    /// a no-op. Returns `true` if the address was newly inserted.
    pub fn insert(&mut self, link_name: &str, addr: LinkAddress) -> bool {
        let addrs = self.inner.entry(link_name.to_string()).or_default();
        if addrs.contains(&addr) {
            return false;
        }
        addrs.push(addr);
        true
    }

    /// Remove an address from a link's entry by equality.
    ///
    /// Returns `true` if an address was removed. The link's entry is
    /// dropped once its last address goes away.
    pub fn remove(&mut self, link_name: &str, addr: &LinkAddress) -> bool {
        let Some(addrs) = self.inner.get_mut(link_name) else {
            return false;
        };
        let before = addrs.len();
        addrs.retain(|a| a != addr);
        let removed = addrs.len() != before;
        if addrs.is_empty() {
            self.inner.remove(link_name);
        }
        removed
    }

    /// Whether the exact address is recorded under the link name
    pub fn contains(&self, link_name: &str, addr: &LinkAddress) -> bool {
        self.inner
            .get(link_name)
            .is_some_and(|addrs| addrs.contains(addr))
    }

    /// Snapshot of the addresses recorded for a link (empty if none)
    pub fn addresses(&self, link_name: &str) -> Vec<LinkAddress> {
        self.inner.get(link_name).cloned().unwrap_or_default()
    }

    /// Names of all links with at least one recorded address
    pub fn links(&self) -> Vec<String> {
        self.inner.keys().cloned().collect()
    }

    /// Snapshot of the full link-name → addresses mapping
    pub fn entries(&self) -> Vec<(String, Vec<LinkAddress>)> {
        self.inner
            .iter()
            .map(|(name, addrs)| (name.clone(), addrs.clone()))
            .collect()
    }

    /// Number of links with recorded addresses
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the store records nothing at all
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}
