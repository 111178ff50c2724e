//! Listeners and the contracts they declare.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::capability::Capability;
use crate::capability::Contract;
use crate::capability::StrongView;
use crate::capability::erase;
use crate::types::TypeKey;

/// Stable identity of a subscribed listener instance.
///
/// Derived from the address of the listener's `Arc` allocation. The registry keeps
/// `Weak` handles to every subscribed listener, so the allocation, and with it the
/// address, cannot be reused while the listener is still known to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

impl ListenerId {
    pub fn of<L: ?Sized>(listener: &Arc<L>) -> Self {
        Self(Arc::as_ptr(listener) as *const () as usize)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

/// An object that receives events through the capabilities it implements.
///
/// Rust cannot ask an object which traits it implements, so each listener type
/// declares its contracts explicitly. The [`listener!`](crate::listener) macro
/// writes this impl.
///
/// ```rust,ignore
/// impl Listener for ConsoleGreeter {
///     fn contracts(this: &Arc<Self>, contracts: &mut Contracts) {
///         contracts.implement::<dyn Greeter>(this.clone());
///     }
/// }
/// ```
pub trait Listener: Send + Sync + 'static {
    fn contracts(this: &Arc<Self>, contracts: &mut Contracts)
    where
        Self: Sized;
}

pub(crate) struct DeclaredContract {
    capability: Arc<Capability>,
    view: StrongView,
}

/// The capabilities a listener instance implements directly, with a typed handle for each.
pub struct Contracts {
    listener: &'static str,
    declared: Vec<DeclaredContract>,
}

impl Contracts {
    pub(crate) fn collect<L: Listener>(listener: &Arc<L>) -> Self {
        let mut contracts = Self {
            listener: std::any::type_name::<L>(),
            declared: Vec::new(),
        };
        L::contracts(listener, &mut contracts);
        contracts
    }

    /// Declares that the listener implements `C`. `view` is the listener itself,
    /// coerced to the capability's trait object.
    pub fn implement<C: Contract + ?Sized>(&mut self, view: Arc<C>) -> &mut Self {
        self.declared.push(DeclaredContract {
            capability: C::capability(),
            view: erase(view),
        });
        self
    }

    pub fn listener_name(&self) -> &'static str {
        self.listener
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    /// Whether some declared contract is `key` or extends it.
    pub fn satisfies(&self, key: TypeKey) -> bool {
        self.declared
            .iter()
            .any(|declared| declared.capability.satisfies(key))
    }

    /// Declared contracts followed by all of their ancestors, each listed once.
    pub fn capabilities(&self) -> Vec<Arc<Capability>> {
        let mut seen = HashSet::new();
        let mut capabilities = Vec::new();
        for declared in &self.declared {
            let lineage =
                std::iter::once(declared.capability.clone()).chain(declared.capability.ancestors());
            for capability in lineage {
                if seen.insert(capability.key()) {
                    capabilities.push(capability);
                }
            }
        }
        capabilities
    }

    /// A handle to the listener typed as the capability `key`, upcast from whichever
    /// declared contract reaches it first.
    pub(crate) fn view_as(&self, key: TypeKey) -> Option<StrongView> {
        self.declared.iter().find_map(|declared| {
            let path = declared.capability.upcast_path(key)?;
            path.iter()
                .try_fold(declared.view.clone(), |view, upcast| upcast(&view))
        })
    }
}

impl fmt::Debug for Contracts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contracts")
            .field("listener", &self.listener)
            .field(
                "declared",
                &self
                    .declared
                    .iter()
                    .map(|d| d.capability.key())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
