//! Shared application state wiring.

use std::sync::Arc;

use reelcap_common::config::AppConfig;
use reelcap_common::error::ReelcapResult;
use reelcap_encode_engine::Finalizer;
use reelcap_publish::{FsObjectStore, JsonlMetadataSink, Publisher};
use reelcap_session_store::SessionStore;
use reelcap_stager::Stager;

use crate::registry::SessionRegistry;

/// Everything the request handlers need, cheaply cloneable.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub stager: Arc<Stager>,
    pub finalizer: Arc<Finalizer>,
    pub registry: Arc<SessionRegistry>,
    pub publisher: Arc<Publisher>,
}

impl AppState {
    /// Wire the full pipeline from configuration.
    pub fn from_config(config: &AppConfig) -> ReelcapResult<Self> {
        let store = Arc::new(SessionStore::new(&config.storage_root)?);
        let stager = Arc::new(Stager::new(Arc::clone(&store)));
        let finalizer = Arc::new(Finalizer::new(Arc::clone(&store), config.encoder.clone()));
        let object_store = Arc::new(FsObjectStore::new(
            &config.publish.object_root,
            config.publish.public_base_url.as_str(),
        )?);
        let metadata = Arc::new(JsonlMetadataSink::new(&config.publish.metadata_log));
        let publisher = Arc::new(Publisher::new(object_store, metadata));

        Ok(Self {
            store,
            stager,
            finalizer,
            registry: Arc::new(SessionRegistry::new()),
            publisher,
        })
    }
}
