//! # API Handlers
//!
//! Axum handlers for browsing the report archive.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{OriginalUri, Path, Query, State},
    Json,
};
use ca_core::{
    paginate::page_count, CompareOp, CompiledPredicate, PageRequest, PageResult,
    PredicateBuilder, QueryError, RawParams, ReportStore,
};
use serde::Serialize;
use std::sync::Arc;

/// Query-string pairs, repeated names preserved.
type Pairs = Vec<(String, String)>;

/// A page of reports plus what a presenter needs to link neighbouring pages.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    /// The request URL, for building next/previous links.
    pub url: String,
    #[serde(flatten)]
    pub page: PageResult,
    pub page_count: u64,
}

impl ListResponse {
    fn new(uri: &axum::http::Uri, page: PageResult) -> Self {
        let page_count = page_count(page.total_matches, page.page_size);
        Self {
            url: uri.to_string(),
            page,
            page_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VersionsResponse {
    pub versions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub started_at: String,
    pub uptime_seconds: u64,
    pub total_reports: u64,
}

// =============================================================================
// Reports
// =============================================================================

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    Query(pairs): Query<Pairs>,
) -> Result<Json<ListResponse>, ApiError> {
    let params = RawParams::from_pairs(pairs);
    let page = state.engine.execute_params(&params).await?;
    Ok(Json(ListResponse::new(&uri, page)))
}

/// Reports that crashed at the same site as report `id`.
pub async fn similar_reports(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    OriginalUri(uri): OriginalUri,
    Query(pairs): Query<Pairs>,
) -> Result<Json<ListResponse>, ApiError> {
    let params = RawParams::from_pairs(pairs);
    let page_request = PageRequest::from_params(&params)?;

    let site = state
        .store
        .crash_site(id)
        .await?
        .ok_or_else(|| QueryError::NotFound(format!("Report {} not found", id)))?;

    let predicate = PredicateBuilder::new()
        .compare("message", CompareOp::Eq, site.message)
        .compare("file", CompareOp::Eq, site.file)
        .compare("line", CompareOp::Eq, u64::from(site.line))
        .build();

    let page = state.engine.execute_predicate(&predicate, page_request).await?;
    Ok(Json(ListResponse::new(&uri, page)))
}

// =============================================================================
// Search support
// =============================================================================

pub async fn known_versions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VersionsResponse>, ApiError> {
    let mut versions = state.store.known_versions().await?;
    ca_core::versions::sort_natural(&mut versions);
    tracing::debug!("Found {} known versions", versions.len());
    Ok(Json(VersionsResponse { versions }))
}

pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let total_reports = state
        .store
        .count(&CompiledPredicate::match_all())
        .await
        .map_err(|e| {
            tracing::error!("status count failed: {}", e);
            QueryError::StorageFailure("status count failed".into())
        })?;

    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at.to_rfc3339(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        total_reports,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use ca_core::Involvement;
    use ca_store::{NewReport, SqliteStore};
    use tower::ServiceExt;

    fn report(version: &str, build: u64, message: &str) -> NewReport {
        NewReport {
            version: version.into(),
            build,
            plugin: String::new(),
            involvement: Involvement::None,
            error_type: "ErrorException".into(),
            message: message.into(),
            file: "src/pocketmine/Server.php".into(),
            line: 42,
            duplicate: false,
            resolved: false,
        }
    }

    async fn app() -> axum::Router {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_all(vec![
                report("1.9.0", 50, "boom"),
                report("1.10.0", 100, "boom"),
                report("1.2.0", 150, "bang"),
            ])
            .await
            .unwrap();
        crate::router(Arc::new(AppState::new(store)))
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_list_reports_filters_and_pages() {
        let (status, body) = get(app().await, "/api/reports?build=100&buildtype=greater").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_matches"], 1);
        assert_eq!(body["range_start"], 0);
        assert_eq!(body["page_number"], 1);
        assert_eq!(body["page_count"], 1);
        assert_eq!(body["rows"][0]["id"], 3);
        assert_eq!(body["url"], "/api/reports?build=100&buildtype=greater");
    }

    #[tokio::test]
    async fn test_repeated_versions_param() {
        let (status, body) =
            get(app().await, "/api/reports?versions=1.9.0&versions=1.10.0").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_matches"], 2);
        assert_eq!(body["rows"][0]["id"], 2);
        assert_eq!(body["rows"][1]["id"], 1);
    }

    #[tokio::test]
    async fn test_invalid_parameter_is_bad_request() {
        let (status, body) = get(app().await, "/api/reports?cause=bogus").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("bogus"));

        let (status, _) = get(app().await, "/api/reports?pagesize=1001").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_page_beyond_end_is_not_found() {
        let (status, _) = get(app().await, "/api/reports?page=2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_similar_reports() {
        let (status, body) = get(app().await, "/api/reports/1/similar").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_matches"], 2);
        assert_eq!(body["rows"][0]["id"], 2);

        let (status, _) = get(app().await, "/api/reports/404/similar").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get(app().await, "/api/reports/18446744073709551615/similar").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("id"));
    }

    #[tokio::test]
    async fn test_versions_sorted_naturally() {
        let (status, body) = get(app().await, "/api/versions").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["versions"],
            serde_json::json!(["1.2.0", "1.9.0", "1.10.0"])
        );
    }

    #[tokio::test]
    async fn test_status_counts_all_reports() {
        let (status, body) = get(app().await, "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_reports"], 3);
    }
}
