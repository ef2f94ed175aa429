use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{
    assets::AssetService,
    lifecycle::JobLifecycle,
    results::ResultAssembler,
    trigger::{ProcessingTrigger, TriggerError},
};
use crate::store::EntityStore;

/// Shared application state passed to all route handlers.
///
/// Everything hangs off one explicitly built store, so each instance
/// (and each test) is fully isolated.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<EntityStore>,
    pub assets: Arc<AssetService>,
    pub lifecycle: Arc<JobLifecycle>,
    pub results: Arc<ResultAssembler>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, TriggerError> {
        let config = Arc::new(config);
        let store = Arc::new(EntityStore::new());
        let trigger = ProcessingTrigger::from_config(&config)?;

        Ok(Self {
            assets: Arc::new(AssetService::new(store.clone(), config.max_upload_bytes)),
            lifecycle: Arc::new(JobLifecycle::new(store.clone(), trigger, config.clone())),
            results: Arc::new(ResultAssembler::new(store.clone())),
            store,
            config,
        })
    }
}
