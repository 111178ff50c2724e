//! Finds the single handler method of a capability that receives a given event type.
//!
//! Resolution order:
//! 1. Marked methods reachable from the capability, including inherited ones, whose
//!    single parameter accepts the event type. One match wins, several are fatal.
//! 2. Otherwise, methods declared directly on the capability whose single parameter
//!    is exactly the event type. Exactly one must exist.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use log::debug;
use parking_lot::Mutex;

use crate::capability::Capability;
use crate::capability::HandlerMethod;
use crate::capability::Invoker;
use crate::capability::ParamType;
use crate::capability::StrongView;
use crate::capability::Upcast;
use crate::config::ResolutionMode;
use crate::error::BlackboardError;
use crate::event::Event;
use crate::event::EventType;
use crate::types::TypeKey;

/// A handler method bound to the capability it was resolved for.
#[derive(Clone)]
pub struct ResolvedHandler {
    method: &'static str,
    declared_in: TypeKey,
    param: ParamType,
    path: Vec<Upcast>,
    invoker: Invoker,
}

impl ResolvedHandler {
    pub fn method_name(&self) -> &'static str {
        self.method
    }

    /// The capability declaring the method; an ancestor when the method is inherited.
    pub fn declared_in(&self) -> TypeKey {
        self.declared_in
    }

    pub fn param(&self) -> ParamType {
        self.param
    }

    /// Calls the method on `view`, a listener handle typed as the registered capability.
    pub(crate) fn invoke(&self, view: &StrongView, event: &dyn Event) -> anyhow::Result<()> {
        let target = self
            .path
            .iter()
            .try_fold(view.clone(), |view, upcast| upcast(&view))
            .ok_or_else(|| anyhow!("listener cannot be viewed as {}", self.declared_in))?;
        (self.invoker)(&target, event)
    }
}

impl fmt::Debug for ResolvedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedHandler")
            .field("method", &self.method)
            .field("declared_in", &self.declared_in)
            .field("param", &self.param)
            .finish()
    }
}

struct Candidate {
    method: HandlerMethod,
    declared_in: TypeKey,
    param: ParamType,
}

pub struct Resolver {
    mode: ResolutionMode,
    construction_check: bool,
    checked: Mutex<HashSet<TypeKey>>,
}

impl Resolver {
    pub fn new(mode: ResolutionMode, construction_check: bool) -> Self {
        Self {
            mode,
            construction_check,
            checked: Mutex::new(HashSet::new()),
        }
    }

    pub fn resolve(
        &self,
        capability: &Arc<Capability>,
        event: &EventType,
    ) -> Result<ResolvedHandler, BlackboardError> {
        Self::validate_binding(capability, event)?;
        if self.construction_check {
            self.check_construction(capability)?;
        }

        let candidate = match Self::find_by_marker(capability, event)? {
            Some(candidate) => {
                debug!(
                    "Found handler {}::{} by marker",
                    candidate.declared_in,
                    candidate.method.name()
                );
                candidate
            }
            None => Self::find_by_being_only_suitable(capability, event).ok_or(
                BlackboardError::NoHandlerFound {
                    capability: capability.key(),
                    event: event.key(),
                },
            )?,
        };

        self.bind(capability, event, candidate)
    }

    /// Forgets which capabilities already passed the construction check.
    pub fn reset(&self) {
        self.checked.lock().clear();
    }

    fn validate_binding(capability: &Capability, event: &EventType) -> Result<(), BlackboardError> {
        let reason = if !capability.is_contract() {
            "the capability must be an abstract contract, not a concrete type"
        } else if !event.is_concrete() {
            "the event type must be concrete, not an abstract event family"
        } else {
            return Ok(());
        };
        Err(BlackboardError::InvalidBinding {
            capability: capability.key(),
            event: event.key(),
            reason: reason.to_string(),
        })
    }

    /// Every marked method anywhere in the hierarchy must take exactly one event.
    fn check_construction(&self, capability: &Arc<Capability>) -> Result<(), BlackboardError> {
        let lineage: Vec<Arc<Capability>> = std::iter::once(capability.clone())
            .chain(capability.ancestors())
            .collect();
        let checked = self.checked.lock().clone();

        for declared_in in lineage.iter().filter(|c| !checked.contains(&c.key())) {
            for method in declared_in.methods().iter().filter(|m| m.is_marked()) {
                let well_formed = method.single_param().is_some_and(|p| p.is_event());
                if !well_formed {
                    return Err(BlackboardError::InvalidHandlerShape {
                        capability: capability.key(),
                        declared_in: declared_in.key(),
                        method: method.name(),
                        reason: "a marked method takes exactly one parameter, which is an event type"
                            .to_string(),
                    });
                }
            }
        }

        self.checked
            .lock()
            .extend(lineage.iter().map(|c| c.key()));
        Ok(())
    }

    fn find_by_marker(
        capability: &Arc<Capability>,
        event: &EventType,
    ) -> Result<Option<Candidate>, BlackboardError> {
        let lineage = std::iter::once(capability.clone()).chain(capability.ancestors());

        let mut found: Option<Candidate> = None;
        for declared_in in lineage {
            for method in declared_in.methods().iter().filter(|m| m.is_marked()) {
                let Some(param) = method.single_param() else {
                    continue;
                };
                if !event.is_assignable_to(param.key()) {
                    continue;
                }
                if let Some(accepted) = &found {
                    return Err(BlackboardError::AmbiguousHandler {
                        capability: capability.key(),
                        event: event.key(),
                        accepted: accepted.method.name(),
                        duplicate: method.name(),
                    });
                }
                found = Some(Candidate {
                    method: method.clone(),
                    declared_in: declared_in.key(),
                    param,
                });
            }
        }
        Ok(found)
    }

    fn find_by_being_only_suitable(
        capability: &Capability,
        event: &EventType,
    ) -> Option<Candidate> {
        let mut suitable = capability.methods().iter().filter_map(|m| {
            m.single_param()
                .filter(|p| p.key() == event.key())
                .map(|p| (m, p))
        });
        let (method, param) = suitable.next()?;
        if suitable.next().is_some() {
            debug!(
                "Several methods of {} take {}; none is picked",
                capability.key(),
                event.key()
            );
            return None;
        }
        debug!(
            "Found handler {}::{} by being the only suitable method",
            capability.key(),
            method.name()
        );
        Some(Candidate {
            method: method.clone(),
            declared_in: capability.key(),
            param,
        })
    }

    fn bind(
        &self,
        capability: &Arc<Capability>,
        event: &EventType,
        candidate: Candidate,
    ) -> Result<ResolvedHandler, BlackboardError> {
        let shape_error = |reason: String| BlackboardError::InvalidHandlerShape {
            capability: capability.key(),
            declared_in: candidate.declared_in,
            method: candidate.method.name(),
            reason,
        };

        if self.mode == ResolutionMode::Strict && candidate.param.key() != event.key() {
            return Err(shape_error(format!(
                "it should have exactly one parameter of type `{}`",
                event.key()
            )));
        }
        let invoker = candidate
            .method
            .invoker()
            .cloned()
            .ok_or_else(|| shape_error("it is declared without an invocation body".to_string()))?;
        let path = capability
            .upcast_path(candidate.declared_in)
            .ok_or_else(|| shape_error("its capability is not an ancestor".to_string()))?;

        Ok(ResolvedHandler {
            method: candidate.method.name(),
            declared_in: candidate.declared_in,
            param: candidate.param,
            path,
            invoker,
        })
    }
}
