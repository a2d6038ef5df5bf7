pub mod cleanup;
pub mod dto;
pub mod handlers;
pub mod processor;
pub mod queue;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod worker;

use crate::state::AppState;
use axum::Router;

pub use cleanup::ImageRetentionJob;
pub use processor::ScanProcessor;
pub use queue::ScanQueue;
pub use repo::{PgScanRepository, ScanRepository};
pub use services::ScanService;
pub use worker::OcrWorkerPool;

pub fn router() -> Router<AppState> {
    handlers::scan_routes()
}
