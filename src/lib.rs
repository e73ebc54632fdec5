pub mod auth;
pub mod config;
pub mod entities;
pub mod entity;
pub mod error;
pub mod file_store;
pub mod locale;
pub mod network;
pub mod registry;
pub mod relationship;
pub mod schema;
pub mod storage;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::auth::{AuthClient, LegacyClient, PersonalClient};
    pub use crate::entities::*;
    pub use crate::entity::{Entity, Fetch, Resource};
    pub use crate::locale::{set_global_locale, LocalizedString};
    pub use crate::network::{Order, Query, UploadFile};
    pub use crate::relationship::{Relationship, Unavailable};
    pub use crate::{ClientConfig, Error, MangaDex, Result};
}

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use registry::TypeRegistry;

use std::sync::{Arc, RwLock};

use tokio::sync::OnceCell;

use crate::auth::AuthClient;
use crate::entities::Tag;
use crate::network::Transport;
use crate::transport::HttpTransport;

/// Async client handle. Cheap to clone; clones share transport, registry, auth and the tag cache.
#[derive(Clone)]
pub struct MangaDex {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    registry: Arc<TypeRegistry>,
    auth: RwLock<Option<Arc<dyn AuthClient>>>,
    // Tags are static server-side; fetched once per client.
    tags: OnceCell<Arc<Vec<Tag>>>,
}

impl MangaDex {
    /// Client with default configuration (plus `MANGADEX_*` environment overrides).
    pub fn new() -> Result<Self> { Self::builder().config(ClientConfig::from_env()).build() }

    pub fn builder() -> MangaDexBuilder { MangaDexBuilder::default() }

    pub fn config(&self) -> &ClientConfig { &self.inner.config }
    pub fn registry(&self) -> &Arc<TypeRegistry> { &self.inner.registry }
    pub fn transport(&self) -> &Arc<dyn Transport> { &self.inner.transport }

    /// Make `auth` the session used for every request from this client (and its clones).
    pub fn set_active_auth(&self, auth: Arc<dyn AuthClient>) {
        *self.inner.auth.write().unwrap_or_else(|e| e.into_inner()) = Some(auth);
    }

    pub fn clear_auth(&self) {
        *self.inner.auth.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn active_auth(&self) -> Option<Arc<dyn AuthClient>> {
        self.inner.auth.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) async fn bearer_token(&self, require_auth: bool) -> Result<Option<String>> {
        match self.active_auth() {
            Some(auth) => Ok(Some(auth.session_token().await?)),
            None if require_auth => Err(Error::AuthRequired),
            None => Ok(None),
        }
    }

    pub(crate) async fn cached_tags<F, Fut>(&self, load: F) -> Result<Arc<Vec<Tag>>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<Tag>>>,
    {
        self.inner.tags.get_or_try_init(move || async move { load().await.map(Arc::new) }).await.cloned()
    }
}

impl std::fmt::Debug for MangaDex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MangaDex")
            .field("api_url", &self.inner.config.api_url)
            .field("registry", &self.inner.registry)
            .field("authenticated", &self.active_auth().is_some())
            .finish()
    }
}

/// Builds a [`MangaDex`]; transport and registry are injectable.
#[derive(Default)]
pub struct MangaDexBuilder {
    config: Option<ClientConfig>,
    transport: Option<Arc<dyn Transport>>,
    registry: Option<Arc<TypeRegistry>>,
    auth: Option<Arc<dyn AuthClient>>,
}

impl MangaDexBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self { self.config = Some(config); self }
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self { self.transport = Some(transport); self }
    pub fn registry(mut self, registry: Arc<TypeRegistry>) -> Self { self.registry = Some(registry); self }
    pub fn auth(mut self, auth: Arc<dyn AuthClient>) -> Self { self.auth = Some(auth); self }

    pub fn build(self) -> Result<MangaDex> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        if let Some(locale) = &config.locale {
            locale::set_global_locale(locale)?;
        }
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(&config)?),
        };
        let registry = self.registry.unwrap_or_else(TypeRegistry::standard);
        Ok(MangaDex {
            inner: Arc::new(Inner {
                config,
                transport,
                registry,
                auth: RwLock::new(self.auth),
                tags: OnceCell::new(),
            }),
        })
    }
}
