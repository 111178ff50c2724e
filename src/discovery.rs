//! Pluggable discovery of capability/event pairs.
//!
//! Scanning code for declarative markers is environment specific, so the dispatcher
//! only consumes a [`DiscoveryProvider`]. [`StaticDiscovery`] is an in-memory
//! catalog for applications that list their pairs up front, grouped by module path.

use std::fmt;
use std::sync::Arc;

use crate::capability::Capability;
use crate::capability::Contract;
use crate::event::Event;
use crate::event::EventType;

/// A capability/event type pair proposed for registration.
#[derive(Clone)]
pub struct DiscoveredPair {
    pub capability: Arc<Capability>,
    pub event: EventType,
}

impl DiscoveredPair {
    pub fn new(capability: Arc<Capability>, event: EventType) -> Self {
        Self { capability, event }
    }

    pub fn of<C: Contract + ?Sized, E: Event>() -> Self {
        Self::new(C::capability(), EventType::of::<E>())
    }
}

impl fmt::Debug for DiscoveredPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveredPair")
            .field("capability", &self.capability.key())
            .field("event", &self.event.key())
            .finish()
    }
}

/// Source of candidate pairs. Each call to `scan` starts over and returns a finite list.
pub trait DiscoveryProvider: Send + Sync {
    fn scan(&self, seed: &str) -> Vec<DiscoveredPair>;
}

/// Result of feeding a discovery scan into a dispatcher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub registered: usize,
    /// Pairs whose event type was already registered.
    pub skipped: usize,
}

/// In-memory catalog of pairs keyed by a `::`-separated location.
///
/// `scan(seed)` returns the pairs recorded at `seed` or anywhere beneath it; an
/// empty seed returns everything.
#[derive(Clone, Debug, Default)]
pub struct StaticDiscovery {
    entries: Vec<(String, DiscoveredPair)>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `C` and `E` as a pair at `location`.
    pub fn with<C: Contract + ?Sized, E: Event>(mut self, location: &str) -> Self {
        self.add(location, DiscoveredPair::of::<C, E>());
        self
    }

    pub fn add(&mut self, location: &str, pair: DiscoveredPair) {
        self.entries.push((location.to_string(), pair));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_within(location: &str, seed: &str) -> bool {
        seed.is_empty()
            || location == seed
            || location
                .strip_prefix(seed)
                .is_some_and(|rest| rest.starts_with("::"))
    }
}

impl DiscoveryProvider for StaticDiscovery {
    fn scan(&self, seed: &str) -> Vec<DiscoveredPair> {
        self.entries
            .iter()
            .filter(|(location, _)| Self::is_within(location, seed))
            .map(|(_, pair)| pair.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_matching() {
        assert!(StaticDiscovery::is_within("app::chat", "app"));
        assert!(StaticDiscovery::is_within("app::chat", "app::chat"));
        assert!(StaticDiscovery::is_within("app::chat", ""));
        assert!(!StaticDiscovery::is_within("application::chat", "app"));
        assert!(!StaticDiscovery::is_within("app", "app::chat"));
    }
}
