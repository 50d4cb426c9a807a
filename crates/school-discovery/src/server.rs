use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use discovery_common::api::{
    DiscoverSchoolsParams, DiscoverSchoolsResponse, FacetListResponse, GetSchoolParams,
    RefreshCatalogResponse, SchoolDetailResponse,
};

use crate::service::{DiscoveryRequest, DiscoveryService};

#[derive(Clone)]
pub struct SchoolDiscoveryServer {
    service: DiscoveryService,
    tool_router: ToolRouter<SchoolDiscoveryServer>,
}

impl SchoolDiscoveryServer {
    pub fn new(service: DiscoveryService) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl SchoolDiscoveryServer {
    #[tool(
        description = "Find schools by facet filters. Accepts a shareable query string \
                       (e.g. 'type=montessori,cbse&city=mumbai&sort=fees-low-to-high'), \
                       optional option toggles, and a sort key."
    )]
    async fn discover_schools(
        &self,
        Parameters(params): Parameters<DiscoverSchoolsParams>,
    ) -> Result<Json<DiscoverSchoolsResponse>, String> {
        let request = DiscoveryRequest::from(params);
        Ok(Json(self.service.discover(&request).await))
    }

    #[tool(description = "List the filter categories with their wire keys and canonical options.")]
    async fn list_facets(&self) -> Result<Json<FacetListResponse>, String> {
        Ok(Json(self.service.facets().await))
    }

    #[tool(description = "Get the full record of one school by id.")]
    async fn get_school(
        &self,
        Parameters(params): Parameters<GetSchoolParams>,
    ) -> Result<Json<SchoolDetailResponse>, String> {
        let school_id = params.school_id.trim().to_string();
        if school_id.is_empty() {
            return Err("school_id must not be empty".to_string());
        }
        self.service
            .school(&school_id)
            .await
            .map(Json)
            .map_err(|e| e.to_string())
    }

    #[tool(description = "Reload the school catalog and the city/state option lists from the data sources.")]
    async fn refresh_catalog(&self) -> Result<Json<RefreshCatalogResponse>, String> {
        info!("refresh_catalog tool invoked");
        Ok(Json(self.service.refresh().await))
    }
}

#[tool_handler]
impl ServerHandler for SchoolDiscoveryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "school-discovery".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "School discovery MCP server. Use list_facets to see the filter categories and \
                 their options, discover_schools to filter and sort schools (the query string uses \
                 wire keys such as curriculum, type, fee, city and state, with comma-separated \
                 values), get_school for one school's full record, and refresh_catalog to reload \
                 the data."
                    .to_string(),
            ),
        }
    }
}
