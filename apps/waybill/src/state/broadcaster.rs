//! # Master-Data Change Broadcaster
//!
//! In-process fan-out of shipper/consignee/product-type/flower-type changes
//! to every open edit session, so pickers show new names without reloading.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  EditSession::new_shipment()                                           │
//! │       │                                                                 │
//! │       └── broadcaster.subscribe(cb) ──► Subscription (held by session) │
//! │                                                                         │
//! │  ctx.save_master_data(record)                                          │
//! │       │                                                                 │
//! │       ├── persist (waybill-db)                                          │
//! │       └── broadcaster.notify(change) ──► cb(change) for every session  │
//! │                                                                         │
//! │  session dropped / published / discarded                               │
//! │       │                                                                 │
//! │       └── Subscription dropped ──► callback removed                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `notify` copies the callback list and releases the lock before calling
//! anything, so a callback may subscribe or unsubscribe.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tracing::debug;
use waybill_core::MasterDataChange;

/// Callback invoked with every master-data change.
pub type MasterDataCallback = Arc<dyn Fn(&MasterDataChange) + Send + Sync>;

/// Identifies one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: BTreeMap<SubscriptionId, MasterDataCallback>,
}

/// Process-wide registry of master-data listeners.
///
/// Cheap to clone: clones share the registry.
#[derive(Clone, Default)]
pub struct MasterDataBroadcaster {
    registry: Arc<RwLock<Registry>>,
}

impl std::fmt::Debug for MasterDataBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterDataBroadcaster")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl MasterDataBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` until the returned guard is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&MasterDataChange) + Send + Sync + 'static,
    {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.callbacks.insert(id, Arc::new(callback));
        debug!(subscription = id.0, "Master-data listener registered");

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Removes a registration. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        remove(&self.registry, id)
    }

    /// Invokes every registered callback; returns how many were called.
    pub fn notify(&self, change: &MasterDataChange) -> usize {
        let callbacks: Vec<MasterDataCallback> = {
            let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
            registry.callbacks.values().cloned().collect()
        };

        debug!(
            kind = %change.kind,
            name = %change.record.name,
            listeners = callbacks.len(),
            "Broadcasting master-data change"
        );
        for callback in &callbacks {
            callback(change);
        }
        callbacks.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry
            .read()
            .map(|r| r.callbacks.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().callbacks.len())
    }
}

fn remove(registry: &RwLock<Registry>, id: SubscriptionId) -> bool {
    let removed = registry
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .callbacks
        .remove(&id)
        .is_some();
    if removed {
        debug!(subscription = id.0, "Master-data listener removed");
    }
    removed
}

/// Registration guard; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<RwLock<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Subscription").field(&self.id.0).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            remove(&registry, self.id);
        }
    }
}
