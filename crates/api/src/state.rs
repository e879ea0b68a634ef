use std::sync::Arc;

use tunegrab_core::scheduler::Scheduler;
use tunegrab_core::store::JobStore;
use tunegrab_core::supervisor::ConversionSettings;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (downloads dir, tool commands, expiry).
    pub config: Arc<ServerConfig>,
    /// The job table, shared with the scheduler and the sweep task.
    pub store: Arc<JobStore>,
    /// Creates jobs and launches their supervisors.
    pub scheduler: Scheduler,
}

impl AppState {
    /// Wire a fresh job store and scheduler from configuration.
    pub fn from_config(config: ServerConfig) -> Self {
        let settings = ConversionSettings::new(
            config.toolchain.converter.clone(),
            config.downloads_dir.clone(),
        );
        let store = Arc::new(JobStore::new());
        let scheduler = Scheduler::new(Arc::clone(&store), settings);

        Self {
            config: Arc::new(config),
            store,
            scheduler,
        }
    }
}
