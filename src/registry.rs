//! Relationship type registry.
//!
//! Maps a relationship type tag (`"manga"`, `"author"`, `"leader"`, ...) to the
//! resolver that can fetch that kind by id. Entity modules register their
//! tags during an explicit setup phase; after [`TypeRegistry::lock`] the map
//! is frozen and further registration fails.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, RwLock};

use async_trait::async_trait;

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::MangaDex;

/// Fetches entities of one or more relationship types by id.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn get(&self, client: &MangaDex, id: &str) -> Result<Entity>;

    /// Whether [`get_multiple`](Self::get_multiple) can fetch many ids in one request.
    fn supports_batch(&self) -> bool { false }

    async fn get_multiple(&self, client: &MangaDex, ids: &[String]) -> Result<Vec<Entity>> {
        let _ = (client, ids);
        Err(Error::Unsupported("batch fetch"))
    }
}

static STANDARD: LazyLock<Arc<TypeRegistry>> = LazyLock::new(|| {
    let registry = TypeRegistry::new();
    if let Err(err) = crate::entities::register_standard_types(&registry) {
        tracing::error!(%err, "failed to register standard relationship types");
    }
    registry.lock();
    Arc::new(registry)
});

#[derive(Default)]
pub struct TypeRegistry {
    resolvers: RwLock<HashMap<String, Arc<dyn Resolver>>>,
    locked: AtomicBool,
}

impl TypeRegistry {
    /// Empty, unlocked registry.
    pub fn new() -> Self { Self::default() }

    /// Process-wide registry holding every MangaDex entity type, already locked.
    pub fn standard() -> Arc<TypeRegistry> { STANDARD.clone() }

    /// Unlocked registry pre-populated with the standard types, for callers that add their own.
    pub fn with_standard_types() -> Result<Self> {
        let registry = Self::new();
        crate::entities::register_standard_types(&registry)?;
        Ok(registry)
    }

    /// Associate every tag in `types` with `resolver`. Fails once the registry is locked.
    pub fn register_types(&self, types: &[&str], resolver: Arc<dyn Resolver>) -> Result<()> {
        let mut map = self.resolvers.write().unwrap_or_else(|e| e.into_inner());
        // Checked under the write lock so a concurrent `lock()` cannot interleave.
        if self.locked.load(Ordering::Acquire) {
            let tag = types.first().copied().unwrap_or_default();
            return Err(Error::RegistryLocked(tag.to_string()));
        }
        for tag in types {
            map.insert((*tag).to_string(), resolver.clone());
        }
        Ok(())
    }

    /// One-way transition: no registration succeeds after this.
    pub fn lock(&self) {
        let _map = self.resolvers.write().unwrap_or_else(|e| e.into_inner());
        self.locked.store(true, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool { self.locked.load(Ordering::Acquire) }

    pub fn contains(&self, tag: &str) -> bool {
        self.resolvers.read().unwrap_or_else(|e| e.into_inner()).contains_key(tag)
    }

    pub fn resolver(&self, tag: &str) -> Result<Arc<dyn Resolver>> {
        self.resolvers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(tag)
            .cloned()
            .ok_or_else(|| Error::UnregisteredType(tag.to_string()))
    }

    /// Registered tags, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.resolvers.read().unwrap_or_else(|e| e.into_inner()).keys().cloned().collect();
        tags.sort();
        tags
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.registered_types())
            .field("locked", &self.is_locked())
            .finish()
    }
}
