use std::fmt::Display;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{PaginatedScans, Pagination, ScanUploadAck, ScanView};
use super::services::{parse_id, NewScan, UploadedImage, MAX_IMAGE_BYTES};
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::ScanError;
use crate::state::AppState;

pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/scans",
            get(list_scans)
                .post(upload_scan)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
        .route("/scans/:id", get(get_scan).delete(delete_scan))
        .route("/scans/:id/image", get(get_scan_image))
}

/// POST /scans (multipart): `image` file, `store_image` "true"/"false", `barcode`.
#[instrument(skip(state, mp))]
pub async fn upload_scan(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<ScanUploadAck>), (StatusCode, String)> {
    let mut image = None;
    let mut store_image = false;
    let mut barcode = None;

    while let Some(field) = mp.next_field().await.map_err(bad_request)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(bad_request)?;
                image = Some(UploadedImage {
                    filename,
                    content_type,
                    bytes,
                });
            }
            Some("store_image") => store_image = field.text().await.map_err(bad_request)? == "true",
            Some("barcode") => barcode = Some(field.text().await.map_err(bad_request)?),
            _ => {}
        }
    }

    let ack = state
        .scans
        .create_scan(NewScan {
            user_id,
            image,
            store_image,
            barcode,
        })
        .await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/v1/scans/{}", ack.id))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(ack)))
}

#[instrument(skip(state))]
pub async fn list_scans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<PaginatedScans>, (StatusCode, String)> {
    Ok(Json(state.scans.get_user_scans(user_id, p).await?))
}

#[instrument(skip(state))]
pub async fn get_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScanView>, (StatusCode, String)> {
    let id = parse_id(&id)?;
    Ok(Json(state.scans.get_scan_by_id(id).await?))
}

/// 302 to a presigned URL of the stored image.
#[instrument(skip(state))]
pub async fn get_scan_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let id = parse_id(&id)?;
    let url = state.scans.get_scan_image_url(id).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]))
}

#[instrument(skip(state))]
pub async fn delete_scan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let id = parse_id(&id)?;
    state.scans.delete_scan(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn bad_request<E: Display>(e: E) -> (StatusCode, String) {
    ScanError::InvalidInput(e.to_string()).into()
}
