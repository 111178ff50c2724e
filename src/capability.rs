//! Capability descriptors: the handler contracts listeners implement.
//!
//! A capability is an ordinary Rust trait such as `trait Greeter: Send + Sync`.
//! Because Rust has no runtime method introspection, the trait publishes a
//! [`Capability`] descriptor through [`Contract`] which lists its handler methods
//! as tagged descriptors holding typed invocation closures, plus the parent
//! capabilities it extends.
//!
//! ```rust,ignore
//! pub trait Greeter: Send + Sync {
//!     fn on_greeting(&self, event: &GreetingEvent) -> anyhow::Result<()>;
//! }
//!
//! impl Contract for dyn Greeter {
//!     fn capability() -> Arc<Capability> {
//!         CapabilityBuilder::<dyn Greeter>::contract()
//!             .handler("on_greeting", |g, e: &GreetingEvent| g.on_greeting(e))
//!             .build()
//!     }
//! }
//! ```

use std::any::Any;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::Weak;

use anyhow::anyhow;

use crate::event::Event;
use crate::event::EventType;
use crate::types::TypeKey;
use crate::types::TypeKind;

/// Type-erased `Arc<C>` for some capability `C`.
pub(crate) type StrongView = Arc<dyn Any + Send + Sync>;
/// Type-erased `Weak<C>` for some capability `C`.
pub(crate) type WeakView = Arc<dyn Any + Send + Sync>;

pub(crate) type Upcast = Arc<dyn Fn(&StrongView) -> Option<StrongView> + Send + Sync>;
pub(crate) type Invoker = Arc<dyn Fn(&StrongView, &dyn Event) -> anyhow::Result<()> + Send + Sync>;

/// Implemented on a capability trait object type (`impl Contract for dyn Greeter`)
/// to publish its descriptor.
///
/// Building a descriptor allocates; implementations usually cache it, which the
/// [`contract!`](crate::contract) macro does.
pub trait Contract: Send + Sync + 'static {
    fn capability() -> Arc<Capability>;
}

/// Declared type of a handler method parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamType {
    key: TypeKey,
    is_event: bool,
}

impl ParamType {
    /// A concrete event type.
    pub fn event<E: Event>() -> Self {
        Self {
            key: TypeKey::of::<E>(),
            is_event: true,
        }
    }

    /// An event family, such as `dyn Event` itself.
    pub fn family<T: ?Sized + 'static>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            is_event: true,
        }
    }

    /// Any type that is not an event.
    pub fn other<T: ?Sized + 'static>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            is_event: false,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn is_event(&self) -> bool {
        self.is_event
    }
}

/// A method of a capability, as far as event routing is concerned.
#[derive(Clone)]
pub struct HandlerMethod {
    name: &'static str,
    marked: bool,
    params: Vec<ParamType>,
    invoker: Option<Invoker>,
}

impl HandlerMethod {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the method carries the "is a handler" marker.
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// The parameter type, if the method takes exactly one parameter.
    pub fn single_param(&self) -> Option<ParamType> {
        match self.params.as_slice() {
            [param] => Some(*param),
            _ => None,
        }
    }

    /// Whether the method has an invocation closure, i.e. it can actually be called.
    pub fn is_invocable(&self) -> bool {
        self.invoker.is_some()
    }

    pub(crate) fn invoker(&self) -> Option<&Invoker> {
        self.invoker.as_ref()
    }
}

impl fmt::Debug for HandlerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMethod")
            .field("name", &self.name)
            .field("marked", &self.marked)
            .field("params", &self.params)
            .field("invocable", &self.invoker.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub(crate) struct ParentEdge {
    pub(crate) capability: Arc<Capability>,
    pub(crate) upcast: Upcast,
}

/// Descriptor of a capability: its identity, methods and parent capabilities.
pub struct Capability {
    key: TypeKey,
    kind: TypeKind,
    parents: Vec<ParentEdge>,
    methods: Vec<HandlerMethod>,
    paired_event: Option<EventType>,
    downgrade: fn(&StrongView) -> Option<WeakView>,
    upgrade: fn(&WeakView) -> Option<StrongView>,
}

impl Capability {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_contract(&self) -> bool {
        self.kind == TypeKind::Contract
    }

    /// Methods declared directly on this capability.
    pub fn methods(&self) -> &[HandlerMethod] {
        &self.methods
    }

    /// Capabilities this one directly extends.
    pub fn parents(&self) -> impl Iterator<Item = &Arc<Capability>> {
        self.parents.iter().map(|edge| &edge.capability)
    }

    /// Event type this capability declares itself paired with, used by auto inference.
    pub fn paired_event(&self) -> Option<&EventType> {
        self.paired_event.as_ref()
    }

    /// Every capability reachable through `extends`, each listed once, nearest first.
    pub fn ancestors(&self) -> Vec<Arc<Capability>> {
        let mut seen = HashSet::from([self.key]);
        let mut queue: VecDeque<Arc<Capability>> = self.parents().cloned().collect();
        let mut ancestors = Vec::new();

        while let Some(capability) = queue.pop_front() {
            if !seen.insert(capability.key) {
                continue;
            }
            queue.extend(capability.parents().cloned());
            ancestors.push(capability);
        }
        ancestors
    }

    /// Whether this capability is `key` or extends it, directly or transitively.
    pub fn satisfies(&self, key: TypeKey) -> bool {
        self.key == key || self.ancestors().iter().any(|a| a.key == key)
    }

    /// The chain of upcasts leading from this capability's view to the view of
    /// the ancestor `key`. Empty when `key` is this capability.
    pub(crate) fn upcast_path(&self, key: TypeKey) -> Option<Vec<Upcast>> {
        if self.key == key {
            return Some(Vec::new());
        }

        let mut seen = HashSet::from([self.key]);
        let mut queue: VecDeque<(&Capability, Vec<Upcast>)> = VecDeque::from([(self, Vec::new())]);

        while let Some((capability, path)) = queue.pop_front() {
            for edge in &capability.parents {
                let parent = edge.capability.as_ref();
                if !seen.insert(parent.key) {
                    continue;
                }
                let mut next = path.clone();
                next.push(edge.upcast.clone());
                if parent.key == key {
                    return Some(next);
                }
                queue.push_back((parent, next));
            }
        }
        None
    }

    pub(crate) fn downgrade(&self, view: &StrongView) -> Option<WeakView> {
        (self.downgrade)(view)
    }

    pub(crate) fn upgrade(&self, view: &WeakView) -> Option<StrongView> {
        (self.upgrade)(view)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field(
                "parents",
                &self.parents().map(|p| p.key).collect::<Vec<_>>(),
            )
            .field("methods", &self.methods)
            .field("paired_event", &self.paired_event.as_ref().map(|e| e.key()))
            .finish()
    }
}

fn downgrade_view<C: ?Sized + Send + Sync + 'static>(view: &StrongView) -> Option<WeakView> {
    view.downcast_ref::<Arc<C>>()
        .map(|strong| Arc::new(Arc::downgrade(strong)) as WeakView)
}

fn upgrade_view<C: ?Sized + Send + Sync + 'static>(view: &WeakView) -> Option<StrongView> {
    view.downcast_ref::<Weak<C>>()?
        .upgrade()
        .map(|strong| Arc::new(strong) as StrongView)
}

/// Wraps a typed listener handle so the registry can store it without knowing `C`.
pub(crate) fn erase<C: ?Sized + Send + Sync + 'static>(view: Arc<C>) -> StrongView {
    Arc::new(view)
}

/// Builds a [`Capability`] for the capability type `C`, usually `dyn SomeTrait`.
pub struct CapabilityBuilder<C: ?Sized> {
    kind: TypeKind,
    parents: Vec<ParentEdge>,
    methods: Vec<HandlerMethod>,
    paired_event: Option<EventType>,
    _capability: PhantomData<fn(&C)>,
}

impl<C: ?Sized + Send + Sync + 'static> CapabilityBuilder<C> {
    /// Starts an abstract contract, the only kind of capability that can be registered.
    pub fn contract() -> Self {
        Self::with_kind(TypeKind::Contract)
    }

    /// Describes a concrete type offered as a capability. Registering it fails.
    pub fn concrete() -> Self {
        Self::with_kind(TypeKind::Concrete)
    }

    fn with_kind(kind: TypeKind) -> Self {
        Self {
            kind,
            parents: Vec::new(),
            methods: Vec::new(),
            paired_event: None,
            _capability: PhantomData,
        }
    }

    /// Adds a marked handler method receiving events of type `E`.
    pub fn handler<E, F>(self, name: &'static str, handler: F) -> Self
    where
        E: Event,
        F: Fn(&C, &E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.typed_method(name, true, handler)
    }

    /// Adds an unmarked method taking exactly one `E`. It is only picked when it is
    /// the sole such method declared directly on the capability.
    pub fn method<E, F>(self, name: &'static str, handler: F) -> Self
    where
        E: Event,
        F: Fn(&C, &E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.typed_method(name, false, handler)
    }

    /// Adds a marked handler method accepting the event family `T`; it receives
    /// every event type listing `T` among its supertypes.
    pub fn family_handler<T, F>(mut self, name: &'static str, handler: F) -> Self
    where
        T: ?Sized + 'static,
        F: Fn(&C, &dyn Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let invoker: Invoker = Arc::new(move |view: &StrongView, event: &dyn Event| {
            handler(view_target::<C>(view)?.as_ref(), event)
        });
        self.methods.push(HandlerMethod {
            name,
            marked: true,
            params: vec![ParamType::family::<T>()],
            invoker: Some(invoker),
        });
        self
    }

    /// Declares a method shape without an invocation body. Used for methods that are
    /// not event handlers but still carry the marker, or take other parameters.
    pub fn declare(mut self, name: &'static str, marked: bool, params: Vec<ParamType>) -> Self {
        self.methods.push(HandlerMethod {
            name,
            marked,
            params,
            invoker: None,
        });
        self
    }

    /// Declares that `C` extends the capability `P`. `upcast` converts a listener
    /// handle; for trait objects it is just `|c| c`.
    pub fn extends<P, F>(mut self, upcast: F) -> Self
    where
        P: Contract + ?Sized,
        F: Fn(Arc<C>) -> Arc<P> + Send + Sync + 'static,
    {
        let upcast: Upcast = Arc::new(move |view: &StrongView| {
            view.downcast_ref::<Arc<C>>()
                .map(|strong| erase::<P>(upcast(strong.clone())))
        });
        self.parents.push(ParentEdge {
            capability: P::capability(),
            upcast,
        });
        self
    }

    /// Declares the event type this capability exists to receive.
    pub fn pairs_with<E: Event>(mut self) -> Self {
        self.paired_event = Some(EventType::of::<E>());
        self
    }

    pub fn build(self) -> Arc<Capability> {
        Arc::new(Capability {
            key: TypeKey::of::<C>(),
            kind: self.kind,
            parents: self.parents,
            methods: self.methods,
            paired_event: self.paired_event,
            downgrade: downgrade_view::<C>,
            upgrade: upgrade_view::<C>,
        })
    }

    fn typed_method<E, F>(mut self, name: &'static str, marked: bool, handler: F) -> Self
    where
        E: Event,
        F: Fn(&C, &E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let invoker: Invoker = Arc::new(move |view: &StrongView, event: &dyn Event| {
            let target = view_target::<C>(view)?;
            let event = event.as_any().downcast_ref::<E>().ok_or_else(|| {
                anyhow!(
                    "expected event {}, got {}",
                    std::any::type_name::<E>(),
                    event.event_name()
                )
            })?;
            handler(target.as_ref(), event)
        });
        self.methods.push(HandlerMethod {
            name,
            marked,
            params: vec![ParamType::event::<E>()],
            invoker: Some(invoker),
        });
        self
    }
}

fn view_target<C: ?Sized + Send + Sync + 'static>(view: &StrongView) -> anyhow::Result<&Arc<C>> {
    view.downcast_ref::<Arc<C>>()
        .ok_or_else(|| anyhow!("listener view is not a {}", std::any::type_name::<C>()))
}
