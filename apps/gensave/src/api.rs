//! Gallery API over the reconciled index and archive.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use gensave_archive::{load_index, scan_archive, GallerySession, RecordView};
use gensave_core::{extract_gen_id, Error, GrantedDir};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<GallerySession>>,
    pub archive_dir: GrantedDir,
    pub index_source: Option<String>,
    pub site_base_url: String,
}

pub fn build_router(state: AppState, api_key: Option<String>) -> Router {
    let cors = CorsLayer::permissive();
    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/summary", get(summary))
        .route("/records", get(list_records))
        .route("/records/:id", get(get_record))
        .route("/missing", get(list_missing))
        .route("/rescan", post(rescan))
        .route("/index/reload", post(reload_index))
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn_with_state(api_key, enforce_api_key))
}

async fn enforce_api_key(
    State(expected): State<Option<String>>,
    req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> Result<axum::response::Response, StatusCode> {
    if let Some(expected_key) = expected {
        let provided = req.headers().get("x-api-key").and_then(|h| h.to_str().ok());
        if provided != Some(expected_key.as_str()) {
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    Ok(next.run(req).await)
}

fn status_for(err: Error) -> StatusCode {
    error!(kind = err.kind(), "request failed: {err}");
    match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
        Error::Format(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Network(_) => StatusCode::BAD_GATEWAY,
        Error::AbortedByUser | Error::Storage(_) | Error::Io { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub records: usize,
    pub offline: usize,
    pub missing: usize,
    pub skipped: usize,
    pub media_files: usize,
    pub meta_files: usize,
    pub scan_errors: usize,
}

impl Summary {
    fn of(session: &GallerySession) -> Self {
        let records = session.index().records.len();
        let missing = session.missing().len();
        Self {
            records,
            offline: records - missing,
            missing,
            skipped: session.index().skipped,
            media_files: session.scan().media_count,
            meta_files: session.scan().meta_count,
            scan_errors: session.scan().errors.len(),
        }
    }
}

async fn summary(State(state): State<AppState>) -> Json<Summary> {
    let session = state.session.read().await;
    Json(Summary::of(&session))
}

#[derive(Deserialize)]
struct RecordParams {
    q: Option<String>,
    offline: Option<bool>,
}

async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<RecordParams>,
) -> Json<Vec<RecordView>> {
    let session = state.session.read().await;
    let views = session
        .search(params.q.as_deref().unwrap_or_default())
        .into_iter()
        .filter(|view| params.offline.map_or(true, |want| view.offline == want))
        .collect();
    Json(views)
}

async fn get_record(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<RecordView>, StatusCode> {
    let id = extract_gen_id(&raw_id).ok_or(StatusCode::NOT_FOUND)?;
    let session = state.session.read().await;
    session.find(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn list_missing(State(state): State<AppState>) -> Json<Vec<RecordView>> {
    let session = state.session.read().await;
    let views = session
        .missing()
        .into_iter()
        .map(|record| session.view(record))
        .collect();
    Json(views)
}

async fn rescan(State(state): State<AppState>) -> Result<Json<Summary>, StatusCode> {
    let scan = scan_archive(state.archive_dir.clone())
        .await
        .map_err(status_for)?;
    let mut session = state.session.write().await;
    session.replace_scan(scan);
    info!("archive rescanned");
    Ok(Json(Summary::of(&session)))
}

async fn reload_index(State(state): State<AppState>) -> Result<Json<Summary>, StatusCode> {
    let source = state
        .index_source
        .as_deref()
        .ok_or_else(|| status_for(Error::NotFound("no index configured".into())))?;
    let index = load_index(source, &state.site_base_url)
        .await
        .map_err(status_for)?;
    let mut session = state.session.write().await;
    session.replace_index(index);
    info!("index reloaded");
    Ok(Json(Summary::of(&session)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use gensave_archive::{normalize_index, scan_archive_blocking};
    use gensave_core::{ensure_read_access, FsProbe};
    use serde_json::json;
    use tower::ServiceExt;

    fn state(dir: &tempfile::TempDir, index_source: Option<String>) -> AppState {
        let archive_dir = ensure_read_access(&FsProbe, dir.path()).unwrap();
        let index = normalize_index(
            &json!([{"id": "gen_a1", "prompt": "a cat"}, {"id": "gen_b2", "prompt": "a dog"}]),
            "https://site.com/g/",
        )
        .unwrap();
        let scan = scan_archive_blocking(&archive_dir);
        AppState {
            session: Arc::new(RwLock::new(GallerySession::new(index, scan))),
            archive_dir,
            index_source,
            site_base_url: "https://site.com/g/".into(),
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn search_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gen_a1--a_cat.mp4"), b"v").unwrap();
        let app = build_router(state(&dir, None), None);

        let (status, body) = get_json(app.clone(), "/records?q=DOG").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], "gen_b2");

        let (_, body) = get_json(app.clone(), "/records?offline=true").await;
        assert_eq!(body[0]["id"], "gen_a1");

        let (_, body) = get_json(app.clone(), "/missing").await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], "gen_b2");

        let (status, _) = get_json(app, "/records/gen_zz").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rescan_picks_up_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state(&dir, None), None);
        std::fs::write(dir.path().join("gen_b2.png"), b"i").unwrap();

        let response = app
            .clone()
            .oneshot(Request::post("/rescan").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let summary: Summary = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(summary.offline, 1);
        assert_eq!(summary.missing, 1);

        let (_, body) = get_json(app, "/records/GEN_B2").await;
        assert_eq!(body["offline"], true);
    }

    #[tokio::test]
    async fn reload_without_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state(&dir, None), None);
        let response = app
            .oneshot(Request::post("/index/reload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_key_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state(&dir, None), Some("secret".into()));

        let (status, _) = get_json(app.clone(), "/health").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-api-key", "secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
