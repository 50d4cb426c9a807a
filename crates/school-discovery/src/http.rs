/// Optional REST surface over the same discovery service the MCP tools use.
///
/// `GET /api/schools` takes the shareable query string as-is, so a front end can forward
/// its own URL query without re-encoding it.
use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing::{error, info};

use discovery_common::api::{
    DiscoverSchoolsResponse, FacetListResponse, RefreshCatalogResponse, SchoolDetailResponse,
};

use crate::error::AppError;
use crate::service::{DiscoveryRequest, DiscoveryService};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

pub fn router(service: DiscoveryService) -> Router {
    Router::new()
        .route("/api/schools", get(discover_schools))
        .route("/api/schools/{id}", get(get_school))
        .route("/api/facets", get(list_facets))
        .route("/api/catalog/refresh", post(refresh_catalog))
        .with_state(service)
}

pub async fn serve(addr: &str, service: DiscoveryService) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(listen_addr = %addr, "REST listener ready");
    axum::serve(listener, router(service)).await?;
    Ok(())
}

/// GET /api/schools?type=montessori,cbse&city=mumbai&sort=name-asc&limit=20
async fn discover_schools(
    State(service): State<DiscoveryService>,
    RawQuery(query): RawQuery,
) -> Json<DiscoverSchoolsResponse> {
    let request = DiscoveryRequest::from_query(query.unwrap_or_default());
    Json(service.discover(&request).await)
}

/// GET /api/schools/{id}
async fn get_school(
    State(service): State<DiscoveryService>,
    Path(id): Path<String>,
) -> Result<Json<SchoolDetailResponse>, AppError> {
    service.school(&id).await.map(Json)
}

/// GET /api/facets
async fn list_facets(State(service): State<DiscoveryService>) -> Json<FacetListResponse> {
    Json(service.facets().await)
}

/// POST /api/catalog/refresh
async fn refresh_catalog(State(service): State<DiscoveryService>) -> Json<RefreshCatalogResponse> {
    info!("catalog refresh requested over REST");
    Json(service.refresh().await)
}
