//! Short-TTL memoization of discovery calls.
//!
//! [`TtlCache::get_or_fetch`] returns a cached value while it is
//! younger than the caller's TTL and otherwise runs the fetch. Callers
//! that miss on the same key at the same time share one in-flight
//! fetch: the first caller runs it, the rest wait on its result.
//! A fetched value is never mutated; an expired entry is replaced
//! wholesale by a new slot.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::OnceCell;

use crate::core::types::{MailboxUser, Site};

struct Fetched<V> {
    value: V,
    fetched_at: Instant,
}

struct Slot<V> {
    cell: OnceCell<Fetched<V>>,
}

impl<V> Slot<V> {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }
}

/// Keyed cache with per-key request coalescing
pub struct TtlCache<V> {
    slots: Mutex<HashMap<String, Arc<Slot<V>>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, fetching it if absent or older
    /// than `ttl`. A failed fetch caches nothing.
    pub async fn get_or_fetch<E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot_for(key, ttl);

        let fetched = slot
            .cell
            .get_or_try_init(|| async {
                tracing::debug!("Cache miss for '{}', fetching", key);
                let value = fetch().await?;
                Ok::<_, E>(Fetched {
                    value,
                    fetched_at: Instant::now(),
                })
            })
            .await?;

        Ok(fetched.value.clone())
    }

    /// Drop every entry; the next lookup for any key refetches
    pub fn invalidate_all(&self) {
        match self.slots.lock() {
            Ok(mut slots) => slots.clear(),
            Err(e) => tracing::error!("Cache lock poisoned while clearing: {e}"),
        }
    }

    /// Number of keys holding a slot (fetched or in flight)
    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot_for(&self, key: &str, ttl: Duration) -> Arc<Slot<V>> {
        let mut slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(slot) = slots.get(key) {
            let expired = slot
                .cell
                .get()
                .is_some_and(|f| f.fetched_at.elapsed() >= ttl);
            if !expired {
                return Arc::clone(slot);
            }
        }

        let slot = Arc::new(Slot::new());
        slots.insert(key.to_string(), Arc::clone(&slot));
        slot
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache key for the tenant's site list
pub const SITES_KEY: &str = "sites";

/// Cache key for the tenant's mailbox users
pub const MAILBOX_USERS_KEY: &str = "mailbox-users";

/// Caches for the two expensive discovery listings
pub struct DiscoveryCache {
    pub sites: TtlCache<Arc<Vec<Site>>>,
    pub mailbox_users: TtlCache<Arc<Vec<MailboxUser>>>,
    pub ttl: Duration,
}

impl DiscoveryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sites: TtlCache::new(),
            mailbox_users: TtlCache::new(),
            ttl,
        }
    }

    pub fn invalidate_all(&self) {
        self.sites.invalidate_all();
        self.mailbox_users.invalidate_all();
    }
}
