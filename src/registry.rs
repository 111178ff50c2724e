//! Live listener instances per capability.
//!
//! Each capability owns a bucket whose subscriber list is an immutable snapshot
//! swapped atomically on every write. Dispatch loads the current snapshot without
//! locking and iterates it while writers publish replacements. The bucket index is
//! behind a short-held `RwLock` that is never held while touching a bucket.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Weak;

use arc_swap::ArcSwap;
use parking_lot::RwLock;

use crate::capability::Capability;
use crate::capability::StrongView;
use crate::capability::WeakView;
use crate::listener::ListenerId;
use crate::types::TypeKey;

/// A non-owning reference to a listener instance.
#[derive(Clone)]
pub(crate) struct ListenerHandle {
    id: ListenerId,
    anchor: Weak<dyn Any + Send + Sync>,
}

impl ListenerHandle {
    pub(crate) fn new<L: Send + Sync + 'static>(listener: &Arc<L>) -> Self {
        let erased: Arc<dyn Any + Send + Sync> = listener.clone();
        Self {
            id: ListenerId::of(listener),
            anchor: Arc::downgrade(&erased),
        }
    }
}

/// One listener's entry in a capability bucket.
#[derive(Clone)]
pub(crate) struct Subscriber {
    handle: ListenerHandle,
    view: WeakView,
}

impl Subscriber {
    pub(crate) fn id(&self) -> ListenerId {
        self.handle.id
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.handle.anchor.strong_count() > 0
    }

    /// A strong handle typed as the bucket's capability, if the listener still exists.
    pub(crate) fn upgrade(&self, capability: &Capability) -> Option<StrongView> {
        capability.upgrade(&self.view)
    }

    /// A typed strong handle, if `C` is the bucket's capability and the listener still exists.
    pub(crate) fn upgrade_as<C: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<C>> {
        self.view.downcast_ref::<Weak<C>>()?.upgrade()
    }
}

pub(crate) type Snapshot = Arc<Vec<Subscriber>>;

#[derive(Default)]
struct Bucket {
    subscribers: ArcSwap<Vec<Subscriber>>,
}

pub struct ListenerRegistry {
    buckets: RwLock<HashMap<TypeKey, Arc<Bucket>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Adds the listener to the bucket of `capability`. `view` must be the listener
    /// typed as that capability. Returns false if it was already there.
    pub(crate) fn subscribe(
        &self,
        handle: &ListenerHandle,
        capability: &Capability,
        view: &StrongView,
    ) -> bool {
        let Some(weak) = capability.downgrade(view) else {
            return false;
        };
        let bucket = self.bucket_or_insert(capability.key());

        let mut added = false;
        bucket.subscribers.rcu(|current| {
            let mut next: Vec<Subscriber> = current.iter().filter(|s| s.is_alive()).cloned().collect();
            added = !next.iter().any(|s| s.id() == handle.id);
            if added {
                next.push(Subscriber {
                    handle: handle.clone(),
                    view: weak.clone(),
                });
            }
            next
        });
        added
    }

    /// Removes the listener from every bucket. Returns true if it was in at least one.
    pub(crate) fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut removed = false;
        for bucket in self.buckets() {
            let mut found = false;
            bucket.subscribers.rcu(|current| {
                found = current.iter().any(|s| s.id() == id);
                current
                    .iter()
                    .filter(|s| s.id() != id && s.is_alive())
                    .cloned()
                    .collect::<Vec<_>>()
            });
            removed |= found;
        }
        removed
    }

    /// Point-in-time subscriber list of a capability.
    pub(crate) fn snapshot(&self, capability: TypeKey) -> Option<Snapshot> {
        let bucket = self.buckets.read().get(&capability).cloned()?;
        Some(bucket.subscribers.load_full())
    }

    /// Number of live listeners subscribed under `capability`.
    pub fn listener_count(&self, capability: TypeKey) -> usize {
        self.snapshot(capability)
            .map(|subscribers| subscribers.iter().filter(|s| s.is_alive()).count())
            .unwrap_or(0)
    }

    /// Whether the listener is subscribed under any capability.
    pub fn contains(&self, id: ListenerId) -> bool {
        self.buckets()
            .iter()
            .any(|bucket| bucket.subscribers.load().iter().any(|s| s.id() == id))
    }

    /// Drops entries whose listener no longer exists. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let mut pruned = 0;
        for bucket in self.buckets() {
            let mut dead = 0;
            bucket.subscribers.rcu(|current| {
                dead = current.iter().filter(|s| !s.is_alive()).count();
                current
                    .iter()
                    .filter(|s| s.is_alive())
                    .cloned()
                    .collect::<Vec<_>>()
            });
            pruned += dead;
        }
        pruned
    }

    pub fn clear(&self) {
        self.buckets.write().clear();
    }

    fn buckets(&self) -> Vec<Arc<Bucket>> {
        self.buckets.read().values().cloned().collect()
    }

    fn bucket_or_insert(&self, capability: TypeKey) -> Arc<Bucket> {
        if let Some(bucket) = self.buckets.read().get(&capability) {
            return bucket.clone();
        }
        self.buckets.write().entry(capability).or_default().clone()
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
