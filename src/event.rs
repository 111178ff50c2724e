//! Events, their type descriptors, and the notifier back-reference.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;

use crate::types::TypeKey;
use crate::types::TypeKind;

/// A fact broadcast through a [`Blackboard`](crate::Blackboard).
///
/// Implementors are concrete types. The [`event!`](crate::event) macro writes the
/// boilerplate for structs carrying a `notifier: NotifierSlot` field.
pub trait Event: Any + Send + Sync + 'static {
    /// Downcast this event to a concrete type.
    ///
    /// Used by handler invokers to extract the specific event type from a trait
    /// object. Most users won't need to call this directly.
    fn as_any(&self) -> &dyn Any;

    /// Storage for the notifier that fired this event.
    fn notifier_slot(&self) -> &NotifierSlot;

    /// Event families this event belongs to, used when a handler method accepts
    /// a supertype instead of the exact event type.
    fn supertypes() -> Vec<TypeKey>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Get the name of the event type.
    fn event_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Runtime identity of the concrete event type.
    fn event_key(&self) -> TypeKey {
        TypeKey::of::<Self>()
    }

    /// The notifier that fired this event, if it was fired with one.
    fn notifier(&self) -> Option<&Arc<dyn Notifier>> {
        self.notifier_slot().get()
    }
}

impl fmt::Debug for dyn Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.event_name())
            .field("notifier", self.notifier_slot())
            .finish()
    }
}

/// Producer of events. Carries no behaviour; it is what an event points back to.
pub trait Notifier: Send + Sync + 'static {
    fn notifier_name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// Write-once back-reference from an event to its notifier.
#[derive(Clone, Default)]
pub struct NotifierSlot(OnceLock<Arc<dyn Notifier>>);

impl NotifierSlot {
    pub fn new() -> Self {
        Self(OnceLock::new())
    }

    pub fn get(&self) -> Option<&Arc<dyn Notifier>> {
        self.0.get()
    }

    pub fn is_stamped(&self) -> bool {
        self.0.get().is_some()
    }

    /// Sets the notifier. Fails with the rejected notifier if one was already set.
    pub(crate) fn stamp(&self, notifier: Arc<dyn Notifier>) -> Result<(), Arc<dyn Notifier>> {
        self.0.set(notifier)
    }
}

impl fmt::Debug for NotifierSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            Some(notifier) => write!(f, "Some({})", notifier.notifier_name()),
            None => f.write_str("None"),
        }
    }
}

/// Descriptor of an event type as seen by the registration machinery.
#[derive(Clone, Debug)]
pub struct EventType {
    key: TypeKey,
    kind: TypeKind,
    supertypes: Vec<TypeKey>,
}

impl EventType {
    /// Describes the concrete event type `E`.
    pub fn of<E: Event>() -> Self {
        let mut supertypes = E::supertypes();
        supertypes.push(TypeKey::of::<dyn Event>());
        Self {
            key: TypeKey::of::<E>(),
            kind: TypeKind::Concrete,
            supertypes,
        }
    }

    /// Describes an abstract event family such as `dyn Event` or a marker trait
    /// several events list in [`Event::supertypes`]. Families cannot be registered.
    pub fn family<T: ?Sized + 'static>() -> Self {
        let key = TypeKey::of::<T>();
        let root = TypeKey::of::<dyn Event>();
        Self {
            key,
            kind: TypeKind::Contract,
            supertypes: if key == root { Vec::new() } else { vec![root] },
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn supertypes(&self) -> &[TypeKey] {
        &self.supertypes
    }

    pub fn is_concrete(&self) -> bool {
        self.kind == TypeKind::Concrete
    }

    /// Whether an event of this type may be passed to a parameter of type `param`.
    pub fn is_assignable_to(&self, param: TypeKey) -> bool {
        self.key == param || self.supertypes.contains(&param)
    }
}
