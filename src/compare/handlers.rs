use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::instrument;

use super::dto::{CompareRequest, CompareResponse};
use crate::auth::AuthUser;
use crate::state::AppState;

pub fn compare_routes() -> Router<AppState> {
    Router::new().route("/compare", post(compare_products))
}

#[instrument(skip(state))]
pub async fn compare_products(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(req): Json<CompareRequest>,
) -> Result<Json<CompareResponse>, (StatusCode, String)> {
    let resp = state
        .compare
        .compare_products(&req.product_a, &req.product_b)
        .await?;
    Ok(Json(resp))
}
