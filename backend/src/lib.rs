pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::PipelineConfig;
use crate::models::RunSummary;
use tokio::sync::{Mutex, RwLock};

/// Shared state managed by Rocket. `run_lock` keeps pipeline runs sequential.
pub struct AppState {
    pub config: PipelineConfig,
    pub run_lock: Mutex<()>,
    pub last_run: RwLock<Option<RunSummary>>,
}
