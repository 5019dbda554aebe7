//! Process-global maps with a thread-local single-entry cache.
//!
//! The layer resolves instance/device data on every intercepted call, and
//! the hot path is "same key as last time on this thread". The [`stale_map!`]
//! macro stamps out a map type whose lookups consult a per-thread cache of
//! the most recent hit before touching the shared map.
//!
//! Cache contract:
//! - entries are only ever inserted or overwritten, never removed;
//! - values are `Arc`s, so a cache entry that went stale on another thread
//!   still points at live data;
//! - `put` refreshes the calling thread's cache entry;
//! - lookups that miss the map are not cached.
//!
//! Each invocation declares its own thread-local static, so two maps never
//! share a cache slot.

/// Declare a stale-cached map type.
///
/// `stale_map!(pub InstanceMap, INSTANCE_CACHE, InstanceData)` expands to a
/// `struct InstanceMap` keyed by `usize` holding `Arc<InstanceData>` values,
/// with `new`, `get`, `put` and `count`.
#[macro_export]
macro_rules! stale_map {
    ($(#[$meta:meta])* $vis:vis $name:ident, $cache:ident, $value:ty) => {
        ::std::thread_local! {
            static $cache: ::std::cell::RefCell<Option<(usize, ::std::sync::Arc<$value>)>> =
                const { ::std::cell::RefCell::new(None) };
        }

        $(#[$meta])*
        $vis struct $name {
            map: $crate::__DashMap<usize, ::std::sync::Arc<$value>>,
        }

        impl $name {
            $vis fn new() -> Self {
                Self {
                    map: $crate::__DashMap::new(),
                }
            }

            /// Look up a value, consulting this thread's cache first.
            $vis fn get(&self, key: usize) -> Option<::std::sync::Arc<$value>> {
                let cached = $cache.with_borrow(|slot| match slot {
                    Some((cached_key, value)) if *cached_key == key => Some(value.clone()),
                    _ => None,
                });
                if cached.is_some() {
                    return cached;
                }
                let value = self.map.get(&key).map(|entry| entry.value().clone())?;
                $cache.with_borrow_mut(|slot| *slot = Some((key, value.clone())));
                Some(value)
            }

            /// Insert or overwrite. Also refreshes the calling thread's
            /// cache so a subsequent `get` on this thread sees the new
            /// value.
            $vis fn put(&self, key: usize, value: $value) {
                let value = ::std::sync::Arc::new(value);
                self.map.insert(key, value.clone());
                $cache.with_borrow_mut(|slot| *slot = Some((key, value)));
            }

            /// Number of entries stored under `key` (0 or 1).
            $vis fn count(&self, key: usize) -> usize {
                usize::from(self.map.contains_key(&key))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}
