use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;

use orbtrack_common::{CatalogEntryView, CatalogId, ErrorBody, SearchRequest};

use crate::module::tracking::resolver::satellite_detail;
use crate::module::tracking::{QueryError, QueryResolver, SnapshotStore, TrackingManager};

/// Shared handles for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    store: Arc<SnapshotStore>,
    resolver: Arc<QueryResolver>,
}

impl AppState {
    pub fn new(store: Arc<SnapshotStore>, resolver: Arc<QueryResolver>) -> Self {
        Self { store, resolver }
    }

    pub fn from_manager(manager: &TrackingManager) -> Self {
        Self::new(manager.store(), manager.resolver())
    }
}

/// Rejected request, rendered as `{ "error": ... }`
pub struct ApiError(StatusCode, String);

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let status = match err {
            QueryError::InvalidId(_) => StatusCode::BAD_REQUEST,
            QueryError::NotFound(_) | QueryError::UnknownId(_) => StatusCode::NOT_FOUND,
        };
        Self(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorBody { error: self.1 })).into_response()
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError(StatusCode::NOT_FOUND, format!("No current {}", what))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn get_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.resolver.snapshot_view().await)
}

async fn get_catalog(State(state): State<AppState>) -> Json<Vec<CatalogEntryView>> {
    let entries = match state.store.catalog().await {
        Some(catalog) => catalog.iter().map(|r| r.to_view()).collect(),
        None => Vec::new(),
    };
    Json(entries)
}

async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    debug!("Search request: {:?}", request.query);
    let detail = state.resolver.search_query(&request.query).await?;
    Ok(Json(detail))
}

async fn get_search_result(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .resolver
        .current_search_result()
        .await
        .ok_or_else(|| not_found("search result"))?;
    Ok(Json(satellite_detail(&entry)))
}

async fn clear_search(State(state): State<AppState>) -> StatusCode {
    state.resolver.clear().await;
    StatusCode::NO_CONTENT
}

async fn select(
    State(state): State<AppState>,
    Path(id): Path<CatalogId>,
) -> Result<StatusCode, ApiError> {
    state.resolver.select_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn deselect(State(state): State<AppState>) -> StatusCode {
    state.resolver.deselect().await;
    StatusCode::NO_CONTENT
}

async fn get_selection(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .resolver
        .current_selection()
        .await
        .ok_or_else(|| not_found("selection"))?;
    Ok(Json(satellite_detail(&entry)))
}

/// Routes for the map and detail panel
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/catalog", get(get_catalog))
        .route(
            "/api/search",
            post(search).get(get_search_result).delete(clear_search),
        )
        .route("/api/select", delete(deselect))
        .route("/api/select/{id}", post(select))
        .route("/api/selection", get(get_selection))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::tracking::parser::fixtures::*;
    use crate::module::tracking::{Catalog, ElementLines, ElementSetRecord, PositionEntry, Snapshot};
    use axum::body::Body;
    use axum::http::Request;
    use orbtrack_common::{Classification, SatelliteDetail, SnapshotView, SourceTag};
    use tower::ServiceExt;

    async fn state() -> AppState {
        let store = Arc::new(SnapshotStore::new());

        let mut iss = ElementSetRecord::new(
            25544,
            "ISS",
            ElementLines::new(ISS_LINE1, ISS_LINE2),
            SourceTag::Featured,
        );
        iss.enrichment.classification = Some(Classification::Iss);
        let css = ElementSetRecord::new(
            48274,
            "CSS (TIANHE)",
            ElementLines::new(CSS_LINE1, CSS_LINE2),
            SourceTag::Bulk,
        );

        let catalog = store
            .install_catalog(Catalog::from_records(vec![iss, css]))
            .await
            .unwrap();
        store
            .publish(Snapshot {
                tick: 1,
                computed_at: None,
                entries: vec![PositionEntry {
                    record: catalog.get(25544).unwrap().clone(),
                    latitude: 28.6,
                    longitude: 77.2,
                    speed: 7.66,
                }],
            })
            .await
            .unwrap();

        let resolver = Arc::new(QueryResolver::new(store.clone()));
        AppState::new(store, resolver)
    }

    fn request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(state().await);
        let (status, body) = send(&app, request("GET", "/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn test_search_flow() {
        let app = router(state().await);

        let (status, body) = send(
            &app,
            request("POST", "/api/search", Some(serde_json::json!({ "query": "25544" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let detail: SatelliteDetail = serde_json::from_slice(&body).unwrap();
        assert_eq!(detail.name, "ISS");
        assert_eq!(detail.description, "No additional info available.");
        assert_eq!(detail.image, "/Icons/Iss-icon.png");

        let (status, body) = send(&app, request("GET", "/api/snapshot", None)).await;
        assert_eq!(status, StatusCode::OK);
        let view: SnapshotView = serde_json::from_slice(&body).unwrap();
        assert_eq!(view.searched_id, Some(25544));
        assert!(view.markers[0].highlighted);

        let (status, _) = send(&app, request("GET", "/api/search", None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, request("DELETE", "/api/search", None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, request("GET", "/api/search", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, request("GET", "/api/selection", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_rejections() {
        let app = router(state().await);

        let (status, body) = send(
            &app,
            request("POST", "/api/search", Some(serde_json::json!({ "query": "hubble" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert!(error.error.contains("hubble"));

        // In the catalog, but no position this tick
        let (status, _) = send(
            &app,
            request("POST", "/api/search", Some(serde_json::json!({ "query": "48274" }))),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_select_and_deselect() {
        let app = router(state().await);

        let (status, _) = send(&app, request("POST", "/api/select/25544", None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, request("GET", "/api/selection", None)).await;
        assert_eq!(status, StatusCode::OK);
        let detail: SatelliteDetail = serde_json::from_slice(&body).unwrap();
        assert_eq!(detail.catalog_id, 25544);

        let (status, _) = send(&app, request("POST", "/api/select/99999", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, request("DELETE", "/api/select", None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, request("GET", "/api/selection", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_catalog_listing() {
        let app = router(state().await);
        let (status, body) = send(&app, request("GET", "/api/catalog", None)).await;
        assert_eq!(status, StatusCode::OK);

        let entries: Vec<CatalogEntryView> = serde_json::from_slice(&body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].classification, Classification::Iss);
        assert_eq!(entries[1].source, SourceTag::Bulk);
    }
}
