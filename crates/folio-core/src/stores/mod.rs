//! Resource stores: one per backend resource, each wrapping its calls
//! through the shared `ApiClient`.
//!
//! Every store keeps a per-operation `loading` set and the last error in a
//! [`StoreState`], keeps its resource list current after successful calls,
//! and returns [`ActionResult`]s. Failures are recorded before they are
//! returned and also land in the shared [`ErrorStore`].
//!
//! The API layer never invalidates cache entries on writes; stores drop the
//! list entries their own mutations made stale.

pub mod auth;
pub mod blog;
pub mod contact;
pub mod errors;
pub mod portfolio;
pub mod state;
pub mod system;
pub mod tag;
pub mod upload;

use std::sync::Arc;

use anyhow::Result;

pub use auth::AuthStore;
pub use blog::BlogStore;
pub use contact::ContactStore;
pub use errors::{ErrorRecord, ErrorStore};
pub use portfolio::PortfolioStore;
pub use state::{ActionResult, StoreState};
pub use system::SystemStore;
pub use tag::TagStore;
pub use upload::UploadStore;

use crate::api::ApiClient;
use crate::auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenManager};
use crate::cache::CacheManager;
use crate::config::{Config, TokenBackend};

/// Every store, wired to one client and one error log.
#[derive(Debug)]
pub struct Stores {
    pub api: ApiClient,
    pub errors: Arc<ErrorStore>,
    pub auth: AuthStore,
    pub blog: BlogStore,
    pub portfolio: PortfolioStore,
    pub contact: ContactStore,
    pub tags: TagStore,
    pub uploads: UploadStore,
    pub system: SystemStore,
}

impl Stores {
    pub fn new(api: ApiClient) -> Self {
        let errors = Arc::new(ErrorStore::new());
        Self {
            auth: AuthStore::new(api.clone(), errors.clone()),
            blog: BlogStore::new(api.clone(), errors.clone()),
            portfolio: PortfolioStore::new(api.clone(), errors.clone()),
            contact: ContactStore::new(api.clone(), errors.clone()),
            tags: TagStore::new(api.clone(), errors.clone()),
            uploads: UploadStore::new(api.clone(), errors.clone()),
            system: SystemStore::new(api.clone(), errors.clone()),
            errors,
            api,
        }
    }

    /// Build the client and token store the config asks for.
    pub fn open(config: &Config) -> Result<Self> {
        let tokens = match config.token_backend {
            TokenBackend::File => TokenManager::new(FileTokenStore::open(config.cache_dir()?)?),
            TokenBackend::Keyring => TokenManager::new(KeyringTokenStore::new()),
            TokenBackend::Memory => TokenManager::new(MemoryTokenStore::new()),
        };
        let api = ApiClient::new(config, Arc::new(tokens), Arc::new(CacheManager::new()))?;
        Ok(Self::new(api))
    }
}
