//! The dispatcher instance: registrations, subscriptions and event routing.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use log::debug;
use log::info;

use crate::capability::Capability;
use crate::capability::Contract;
use crate::config::BlackboardConfig;
use crate::config::ClearPolicy;
use crate::config::InferenceMode;
use crate::discovery::DiscoveryProvider;
use crate::discovery::DiscoveryReport;
use crate::dispatch::DispatchReport;
use crate::dispatch::ErrorSink;
use crate::dispatch::LogErrorSink;
use crate::dispatch::dispatch;
use crate::error::BlackboardError;
use crate::event::Event;
use crate::event::EventType;
use crate::event::Notifier;
use crate::listener::Contracts;
use crate::listener::Listener;
use crate::listener::ListenerId;
use crate::registration::Registration;
use crate::registration::RegistrationTable;
use crate::registry::ListenerHandle;
use crate::registry::ListenerRegistry;
use crate::registry::Subscriber;
use crate::resolver::Resolver;
use crate::types::TypeKey;

/// Routes events from notifiers to every listener registered for the event's type.
///
/// A `Blackboard` is an ordinary value owned by the application, typically one per
/// logical session, so events never leak between sessions. Share it with `Arc`
/// across threads; every method takes `&self`.
///
/// ```rust,ignore
/// let blackboard = Blackboard::new();
/// blackboard.register::<dyn Greeter, GreetingEvent>()?;
///
/// let listener = Arc::new(ConsoleGreeter::default());
/// blackboard.add_listener(&listener)?;
///
/// blackboard.fire(&GreetingEvent::new("hi"))?;
/// ```
pub struct Blackboard {
    config: BlackboardConfig,
    table: RegistrationTable,
    registry: ListenerRegistry,
    sink: Arc<dyn ErrorSink>,
    inference_armed: AtomicBool,
    verbose: AtomicBool,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::with_config(BlackboardConfig::default())
    }

    pub fn with_config(config: BlackboardConfig) -> Self {
        let resolver = Resolver::new(config.resolution, config.construction_check);
        Self {
            table: RegistrationTable::new(resolver),
            registry: ListenerRegistry::new(),
            sink: Arc::new(LogErrorSink),
            inference_armed: AtomicBool::new(config.inference != InferenceMode::Disabled),
            verbose: AtomicBool::new(config.verbose),
            config,
        }
    }

    /// Replaces the sink receiving handler failures.
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &BlackboardConfig {
        &self.config
    }

    /// Binds the event type `E` to the capability `C`: whenever an `E` is fired, every
    /// listener implementing `C` is triggered.
    pub fn register<C: Contract + ?Sized, E: Event>(
        &self,
    ) -> Result<Arc<Registration>, BlackboardError> {
        self.register_types(&C::capability(), &EventType::of::<E>())
    }

    /// Descriptor form of [`register`](Self::register).
    pub fn register_types(
        &self,
        capability: &Arc<Capability>,
        event: &EventType,
    ) -> Result<Arc<Registration>, BlackboardError> {
        if self.config.inference == InferenceMode::UntilExplicitRegistration {
            self.inference_armed.store(false, Ordering::SeqCst);
        }
        self.table.register(capability, event)
    }

    /// Registers every pair the provider finds under `seed`. Pairs whose event type
    /// is already registered are skipped; any other failure aborts the discovery.
    pub fn discover_from(
        &self,
        provider: &dyn DiscoveryProvider,
        seed: &str,
    ) -> Result<DiscoveryReport, BlackboardError> {
        info!("Starting automatic discovery from {seed:?}");
        let mut report = DiscoveryReport::default();
        for pair in provider.scan(seed) {
            match self.table.register(&pair.capability, &pair.event) {
                Ok(_) => report.registered += 1,
                Err(e) if e.is_duplicate_registration() => {
                    debug!("Discovery skipped {:?}: {e}", pair);
                    report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Subscribes the listener under every registered capability it implements.
    ///
    /// A listener implementing several capabilities is added once and receives
    /// events for all of them. No ordering between listeners is preserved.
    /// Returns the capabilities it is now subscribed under.
    pub fn add_listener<L: Listener>(
        &self,
        listener: &Arc<L>,
    ) -> Result<Vec<TypeKey>, BlackboardError> {
        let contracts = Contracts::collect(listener);
        let id = ListenerId::of(listener);
        debug!("Adding {} {id}", contracts.listener_name());

        let mut matching = self.matching_capabilities(&contracts);
        if matching.is_empty() && self.inference_enabled() {
            self.infer_registrations(&contracts)?;
            matching = self.matching_capabilities(&contracts);
        }
        if matching.is_empty() {
            return Err(BlackboardError::NoMatchingRegistration {
                listener: contracts.listener_name(),
            });
        }

        let handle = ListenerHandle::new(listener);
        let mut subscribed = Vec::with_capacity(matching.len());
        for capability in &matching {
            let Some(view) = contracts.view_as(capability.key()) else {
                continue;
            };
            self.registry.subscribe(&handle, capability, &view);
            if self.is_verbose() {
                debug!("  ...listening to {}", capability.key());
            }
            subscribed.push(capability.key());
        }
        Ok(subscribed)
    }

    /// Unsubscribes the listener from every capability.
    /// Returns true iff it was subscribed under at least one.
    pub fn remove_listener<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.remove_listener_by_id(ListenerId::of(listener))
    }

    pub fn remove_listener_by_id(&self, id: ListenerId) -> bool {
        let removed = self.registry.unsubscribe(id);
        debug!("Removing {id}: {}", if removed { "removed" } else { "not subscribed" });
        removed
    }

    /// Fires `event` to all listeners of the capability registered for its type.
    pub fn fire(&self, event: &dyn Event) -> Result<DispatchReport, BlackboardError> {
        self.fire_inner(event, None)
    }

    /// Like [`fire`](Self::fire), first recording `notifier` on the event so that
    /// every handler sees who sent it.
    pub fn fire_from(
        &self,
        event: &dyn Event,
        notifier: Arc<dyn Notifier>,
    ) -> Result<DispatchReport, BlackboardError> {
        self.fire_inner(event, Some(notifier))
    }

    /// Removes registrations. Subscriptions are removed too under
    /// [`ClearPolicy::Everything`]; otherwise they stay, orphaned.
    pub fn clear(&self) {
        info!("Clearing Blackboard");
        self.table.clear();
        if self.config.clear_policy == ClearPolicy::Everything {
            self.registry.clear();
        }
        if self.config.inference == InferenceMode::UntilExplicitRegistration {
            self.inference_armed.store(true, Ordering::SeqCst);
        }
    }

    /// Drops subscriptions of listeners that no longer exist.
    pub fn prune(&self) -> usize {
        self.registry.prune()
    }

    pub fn registration_for<E: Event>(&self) -> Option<Arc<Registration>> {
        self.table.lookup(TypeKey::of::<E>())
    }

    pub fn registration_count(&self) -> usize {
        self.table.len()
    }

    /// Live listeners currently subscribed under the capability `C`, in no particular order.
    pub fn listeners_for<C: Contract + ?Sized>(&self) -> Vec<Arc<C>> {
        self.registry
            .snapshot(TypeKey::of::<C>())
            .map(|subscribers| {
                subscribers
                    .iter()
                    .filter_map(Subscriber::upgrade_as::<C>)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn listener_count<C: Contract + ?Sized>(&self) -> usize {
        self.registry.listener_count(TypeKey::of::<C>())
    }

    pub fn is_subscribed<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.registry.contains(ListenerId::of(listener))
    }

    pub fn enable_logging(&self) {
        self.verbose.store(true, Ordering::Relaxed);
    }

    pub fn disable_logging(&self) {
        self.verbose.store(false, Ordering::Relaxed);
    }

    fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    fn inference_enabled(&self) -> bool {
        match self.config.inference {
            InferenceMode::Disabled => false,
            InferenceMode::Enabled => true,
            InferenceMode::UntilExplicitRegistration => self.inference_armed.load(Ordering::SeqCst),
        }
    }

    fn matching_capabilities(&self, contracts: &Contracts) -> Vec<Arc<Capability>> {
        self.table
            .capabilities()
            .into_iter()
            .filter(|capability| contracts.satisfies(capability.key()))
            .collect()
    }

    /// Registers the paired event of every capability the listener implements.
    /// Another listener may have triggered the same registration first, so
    /// duplicates are expected here.
    fn infer_registrations(&self, contracts: &Contracts) -> Result<(), BlackboardError> {
        for capability in contracts.capabilities() {
            let Some(event) = capability.paired_event() else {
                continue;
            };
            match self.table.register(&capability, event) {
                Ok(_) => debug!("Inferred {} for {}", capability.key(), event.key()),
                Err(e) if e.is_duplicate_registration() => {
                    debug!("Inference found {} already registered", event.key());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn fire_inner(
        &self,
        event: &dyn Event,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Result<DispatchReport, BlackboardError> {
        let key = event.event_key();
        let registration = self
            .table
            .lookup(key)
            .ok_or(BlackboardError::EventNotRegistered { event: key })?;

        if let Some(notifier) = notifier {
            event.notifier_slot().stamp(notifier).map_err(|rejected| {
                BlackboardError::InvalidArgument {
                    msg: format!(
                        "{} already carries a notifier; {} cannot stamp it again",
                        event.event_name(),
                        rejected.notifier_name()
                    ),
                }
            })?;
        }

        let verbose = self.is_verbose();
        if verbose {
            debug!("Firing {:?}", event);
        }

        let Some(snapshot) = self.registry.snapshot(registration.capability().key()) else {
            return Ok(DispatchReport::default());
        };
        Ok(dispatch(
            &registration,
            &snapshot,
            event,
            self.sink.as_ref(),
            verbose,
        ))
    }
}

impl Default for Blackboard {
    fn default() -> Self {
        Self::new()
    }
}
