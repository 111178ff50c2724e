//! blackboard - An in-process publish/subscribe event dispatcher.
//!
//! Notifiers fire events; listeners receive them through capabilities, handler
//! contracts expressed as Rust traits. This crate provides:
//! - Registration of event types to capabilities, with handler method resolution
//! - Weakly held listener subscriptions with lock-free dispatch snapshots
//! - Best-effort broadcast that isolates failing handlers
//! - Optional registration inference and pluggable discovery

pub mod blackboard;
pub mod capability;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod listener;
pub mod logging;
pub mod macros;
pub mod registration;
pub mod registry;
pub mod resolver;
pub mod types;

pub use crate::blackboard::Blackboard;
pub use crate::capability::Capability;
pub use crate::capability::CapabilityBuilder;
pub use crate::capability::Contract;
pub use crate::capability::HandlerMethod;
pub use crate::capability::ParamType;
pub use crate::config::BlackboardConfig;
pub use crate::config::BlackboardConfigBuilder;
pub use crate::config::ClearPolicy;
pub use crate::config::InferenceMode;
pub use crate::config::LoggingConfig;
pub use crate::config::ResolutionMode;
pub use crate::discovery::DiscoveredPair;
pub use crate::discovery::DiscoveryProvider;
pub use crate::discovery::DiscoveryReport;
pub use crate::discovery::StaticDiscovery;
pub use crate::dispatch::DispatchReport;
pub use crate::dispatch::ErrorSink;
pub use crate::dispatch::LogErrorSink;
pub use crate::error::BlackboardError;
pub use crate::error::HandlerPanic;
pub use crate::event::Event;
pub use crate::event::EventType;
pub use crate::event::Notifier;
pub use crate::event::NotifierSlot;
pub use crate::listener::Contracts;
pub use crate::listener::Listener;
pub use crate::listener::ListenerId;
pub use crate::registration::Registration;
pub use crate::resolver::ResolvedHandler;
pub use crate::types::TypeKey;
pub use crate::types::TypeKind;
