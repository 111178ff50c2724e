//! Capability to event type bindings.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use log::info;
use parking_lot::RwLock;

use crate::capability::Capability;
use crate::error::BlackboardError;
use crate::event::EventType;
use crate::resolver::ResolvedHandler;
use crate::resolver::Resolver;
use crate::types::TypeKey;

/// An immutable binding of an event type to the capability and method receiving it.
#[derive(Debug)]
pub struct Registration {
    capability: Arc<Capability>,
    event: EventType,
    handler: ResolvedHandler,
}

impl Registration {
    pub fn capability(&self) -> &Arc<Capability> {
        &self.capability
    }

    pub fn event(&self) -> &EventType {
        &self.event
    }

    pub fn handler(&self) -> &ResolvedHandler {
        &self.handler
    }
}

/// Registrations keyed by event type. Each event type maps to exactly one capability;
/// one capability may receive several event types.
pub struct RegistrationTable {
    resolver: Resolver,
    by_event: RwLock<HashMap<TypeKey, Arc<Registration>>>,
}

impl RegistrationTable {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            by_event: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(
        &self,
        capability: &Arc<Capability>,
        event: &EventType,
    ) -> Result<Arc<Registration>, BlackboardError> {
        let handler = self.resolver.resolve(capability, event)?;

        let mut by_event = self.by_event.write();
        if let Some(existing) = by_event.get(&event.key()) {
            return Err(BlackboardError::DuplicateRegistration {
                capability: capability.key(),
                event: event.key(),
                existing: existing.capability.key(),
            });
        }

        info!(
            "Registering {}::{}() to {}",
            capability.key(),
            handler.method_name(),
            event.key()
        );
        let registration = Arc::new(Registration {
            capability: capability.clone(),
            event: event.clone(),
            handler,
        });
        by_event.insert(event.key(), registration.clone());
        Ok(registration)
    }

    pub fn lookup(&self, event: TypeKey) -> Option<Arc<Registration>> {
        self.by_event.read().get(&event).cloned()
    }

    /// Distinct capabilities having at least one registration.
    pub fn capabilities(&self) -> Vec<Arc<Capability>> {
        let by_event = self.by_event.read();
        let mut seen = HashSet::new();
        by_event
            .values()
            .filter(|r| seen.insert(r.capability.key()))
            .map(|r| r.capability.clone())
            .collect()
    }

    pub fn is_registered(&self, capability: TypeKey) -> bool {
        self.by_event
            .read()
            .values()
            .any(|r| r.capability.key() == capability)
    }

    pub fn len(&self) -> usize {
        self.by_event.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_event.read().is_empty()
    }

    pub fn clear(&self) {
        self.by_event.write().clear();
        self.resolver.reset();
    }
}
