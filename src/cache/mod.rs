//! Fragment cache for included fragments.
//!
//! Included fragments are rendered once and stored under their request path. The
//! reverse proxy (or the local [`Interpreter`](crate::interpreter::Interpreter)) reads
//! them back when it meets an include directive, so the stores must be reachable by
//! whatever serves the include.
//!
//! # Stores
//!
//! - [`FragmentCache`] is the store interface: get, set with an optional timeout,
//!   delete several keys, clear.
//! - [`MemoryCache`] keeps fragments in a [`DashMap`] and expires them lazily on read.
//! - [`CacheSet`] fans out over several stores, selected by alias from the
//!   configuration: writes go to every store in order, reads return the first hit.
//!
//! # Concurrency
//!
//! Stores are shared between requests behind [`Arc`]. Independent keys can be written
//! concurrently; concurrent writes to the same key leave the last one in place.

use anyhow::Result;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::config::SsifyConfig;
use crate::core::SsifyError;

/// Alias tried when no cache aliases are configured.
pub const SSIFY_ALIAS: &str = "ssify";

/// Alias used when neither configured aliases nor [`SSIFY_ALIAS`] exist.
pub const DEFAULT_ALIAS: &str = "default";

/// A key/value store for rendered fragments.
pub trait FragmentCache: Send + Sync {
    /// Cached content under `key`, if present and not expired.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `content` under `key`. `None` uses the store's default timeout.
    fn set(&self, key: &str, content: &str, timeout: Option<Duration>);

    /// Remove the given keys. Missing keys are ignored.
    fn delete_many(&self, keys: &[String]);

    /// Remove everything.
    fn clear(&self);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    content: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process fragment store.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    default_timeout: Option<Duration>,
}

impl MemoryCache {
    /// A store whose entries never expire unless a timeout is passed to `set`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store applying `timeout` to entries set without an explicit one.
    pub fn with_default_timeout(timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_timeout: Some(timeout),
        }
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FragmentCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let content = {
            let entry = self.entries.get(key)?;
            if entry.is_expired(now) {
                None
            } else {
                Some(entry.content.clone())
            }
        };
        // The read guard is released above; removing while holding it would deadlock.
        if content.is_none() {
            trace!("Fragment {key} expired");
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        content
    }

    fn set(&self, key: &str, content: &str, timeout: Option<Duration>) {
        let expires_at = timeout.or(self.default_timeout).map(|t| Instant::now() + t);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                content: content.to_string(),
                expires_at,
            },
        );
    }

    fn delete_many(&self, keys: &[String]) {
        for key in keys {
            self.entries.remove(key);
        }
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

/// Ordered fan-out over fragment stores.
#[derive(Clone, Default)]
pub struct CacheSet {
    stores: Vec<(String, Arc<dyn FragmentCache>)>,
}

impl CacheSet {
    /// An empty set: reads miss and writes are dropped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a store.
    #[must_use]
    pub fn with_store(mut self, alias: impl Into<String>, store: Arc<dyn FragmentCache>) -> Self {
        self.stores.push((alias.into(), store));
        self
    }

    /// Choose stores from `available` by alias.
    ///
    /// With `aliases`, every one of them must exist. Without, the [`SSIFY_ALIAS`] store
    /// is used if there is one, else the [`DEFAULT_ALIAS`] store.
    ///
    /// # Errors
    ///
    /// [`SsifyError::UnknownCacheAlias`] for the first alias with no store behind it.
    pub fn select(
        available: &HashMap<String, Arc<dyn FragmentCache>>,
        aliases: Option<&[String]>,
    ) -> Result<Self> {
        let lookup = |alias: &str| {
            available.get(alias).cloned().ok_or_else(|| SsifyError::UnknownCacheAlias {
                alias: alias.to_string(),
            })
        };

        let mut set = Self::new();
        match aliases {
            Some(aliases) => {
                for alias in aliases {
                    set = set.with_store(alias.as_str(), lookup(alias)?);
                }
            }
            None => {
                let alias =
                    if available.contains_key(SSIFY_ALIAS) { SSIFY_ALIAS } else { DEFAULT_ALIAS };
                set = set.with_store(alias, lookup(alias)?);
            }
        }
        debug!("Using fragment caches: {:?}", set.aliases());
        Ok(set)
    }

    /// [`CacheSet::select`] with the configured `cache_aliases`.
    pub fn from_config(
        available: &HashMap<String, Arc<dyn FragmentCache>>,
        config: &SsifyConfig,
    ) -> Result<Self> {
        Self::select(available, config.cache_aliases.as_deref())
    }

    /// Aliases of the stores, in order.
    pub fn aliases(&self) -> Vec<&str> {
        self.stores.iter().map(|(alias, _)| alias.as_str()).collect()
    }

    /// Whether there are no stores.
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Content from the first store that has `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.stores.iter().find_map(|(alias, store)| {
            let hit = store.get(key);
            if hit.is_some() {
                trace!("Fragment cache hit for {key} in {alias}");
            }
            hit
        })
    }

    /// Write `content` to every store, in order.
    pub fn set(&self, key: &str, content: &str, timeout: Option<Duration>) {
        for (_, store) in &self.stores {
            store.set(key, content, timeout);
        }
    }

    /// Drop cached fragments: the given paths, or everything with `None`.
    pub fn flush(&self, paths: Option<&[String]>) {
        for (alias, store) in &self.stores {
            match paths {
                Some(paths) => {
                    debug!("Flushing {} fragments from {alias}", paths.len());
                    store.delete_many(paths);
                }
                None => {
                    debug!("Clearing fragment cache {alias}");
                    store.clear();
                }
            }
        }
    }
}

impl fmt::Debug for CacheSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSet").field("aliases", &self.aliases()).finish()
    }
}
