use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use crate::HandleUrl;

/// A decompressed object as registered in a store
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Allocation counters for a handle store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleStats {
    pub allocated: u64,
    pub released: u64,
}

impl HandleStats {
    /// Handles allocated but not yet released
    pub fn live(&self) -> u64 {
        self.allocated.saturating_sub(self.released)
    }
}

/// Registry of process-local objects addressable by [`HandleUrl`]
pub trait HandleStore: Send + Sync {
    /// Register `bytes` and return a fresh address for them
    fn allocate(&self, bytes: Bytes, content_type: &str) -> HandleUrl;

    /// Drop the object behind `url`. Returns `false` if it was already gone.
    fn release(&self, url: &HandleUrl) -> bool;

    /// Look up a live object
    fn resolve(&self, url: &HandleUrl) -> Option<StoredObject>;

    fn stats(&self) -> HandleStats;
}

/// In-memory handle store
#[derive(Default)]
pub struct MemoryHandleStore {
    objects: RwLock<HashMap<HandleUrl, StoredObject>>,
    allocated: AtomicU64,
    released: AtomicU64,
}

impl MemoryHandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently held
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl HandleStore for MemoryHandleStore {
    fn allocate(&self, bytes: Bytes, content_type: &str) -> HandleUrl {
        let url = HandleUrl::new();
        self.objects.write().insert(
            url.clone(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        self.allocated.fetch_add(1, Ordering::SeqCst);
        url
    }

    fn release(&self, url: &HandleUrl) -> bool {
        let removed = self.objects.write().remove(url).is_some();
        if removed {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    fn resolve(&self, url: &HandleUrl) -> Option<StoredObject> {
        self.objects.read().get(url).cloned()
    }

    fn stats(&self) -> HandleStats {
        HandleStats {
            allocated: self.allocated.load(Ordering::SeqCst),
            released: self.released.load(Ordering::SeqCst),
        }
    }
}

/// Owning reference to one allocation in a [`HandleStore`].
///
/// The allocation is released exactly once: by [`LocalHandle::release`] or,
/// failing that, when the handle is dropped.
pub struct LocalHandle {
    url: HandleUrl,
    store: Arc<dyn HandleStore>,
    released: bool,
}

impl LocalHandle {
    pub fn allocate(store: Arc<dyn HandleStore>, bytes: Bytes, content_type: &str) -> Self {
        let size = bytes.len();
        let url = store.allocate(bytes, content_type);
        debug!("Allocated handle {} ({} bytes, {})", url, size, content_type);
        Self {
            url,
            store,
            released: false,
        }
    }

    pub fn url(&self) -> &HandleUrl {
        &self.url
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if self.store.release(&self.url) {
            debug!("Released handle {}", self.url);
        }
    }
}

impl Drop for LocalHandle {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl std::fmt::Debug for LocalHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalHandle")
            .field("url", &self.url)
            .field("released", &self.released)
            .finish()
    }
}
