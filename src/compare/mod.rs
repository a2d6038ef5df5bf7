//! Side-by-side nutrition comparison of two known products.

pub mod dto;
pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use services::CompareService;

pub fn router() -> Router<AppState> {
    handlers::compare_routes()
}
