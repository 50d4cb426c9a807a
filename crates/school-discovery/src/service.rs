/// Request-level discovery: one call runs the whole filter pipeline against the current
/// catalog. Both serving surfaces go through here.
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use discovery_common::api::{
    DiscoverSchoolsParams, DiscoverSchoolsResponse, FacetInfo, FacetListResponse,
    RefreshCatalogResponse, SchoolDetailResponse, SchoolSummary,
};

use crate::catalog::{Catalog, CatalogLoader};
use crate::error::AppError;
use crate::filters::{parse_query_string, reserved_value, FilterState};
use crate::model::SchoolRecord;
use crate::sort::{discover, SortKey};
use crate::taxonomy::{Taxonomy, CITY, STATE};

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 200;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryRequest {
    /// Raw query string; may carry `sort` and `limit` alongside facet keys.
    pub query: String,
    /// `(category, option)` pairs toggled in order after the query is read.
    pub toggles: Vec<(String, String)>,
    pub clear: bool,
    /// Takes precedence over `sort` in the query.
    pub sort: Option<String>,
    /// Takes precedence over `limit` in the query.
    pub limit: Option<usize>,
}

impl DiscoveryRequest {
    pub fn from_query(raw: impl Into<String>) -> Self {
        Self {
            query: raw.into(),
            ..Self::default()
        }
    }
}

impl From<DiscoverSchoolsParams> for DiscoveryRequest {
    fn from(params: DiscoverSchoolsParams) -> Self {
        Self {
            query: params.query.unwrap_or_default(),
            toggles: params
                .toggles
                .unwrap_or_default()
                .into_iter()
                .map(|t| (t.category, t.option))
                .collect(),
            clear: params.clear.unwrap_or(false),
            sort: params.sort,
            limit: params.limit.map(|l| l as usize),
        }
    }
}

/// Run one discovery request against `catalog`. Never fails: malformed input narrows
/// or widens the result but always produces one.
pub fn run_discovery(catalog: &Catalog, request: &DiscoveryRequest) -> DiscoverSchoolsResponse {
    let params = parse_query_string(&request.query);
    let sort = request
        .sort
        .clone()
        .or_else(|| reserved_value(&params, "sort"))
        .map(|s| SortKey::parse(&s))
        .unwrap_or_default();
    let limit = request
        .limit
        .or_else(|| reserved_value(&params, "limit").and_then(|l| l.parse().ok()))
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_LIMIT);

    let mut state = FilterState::new(Arc::clone(&catalog.taxonomy));
    state.sync_with_query(&request.query);
    if request.clear {
        state.clear_all();
    }
    for (category, option) in &request.toggles {
        let category = resolve_category(&catalog.taxonomy, category.trim());
        state.toggle_option(&category, option.trim());
    }

    let wire = state.to_wire_keyed();
    let found = discover(&catalog.schools, &wire, &sort);
    debug!(
        query = %request.query,
        sort = %sort,
        constrained = !wire.is_empty(),
        selections = !state.selected().is_empty(),
        matched = found.len(),
        "discovery request"
    );

    DiscoverSchoolsResponse {
        selected_filters: state.selected().to_map(),
        wire_filters: wire.to_map(),
        sort: sort.to_string(),
        total: found.len(),
        schools: found.into_iter().take(limit).map(summarize).collect(),
    }
}

/// Toggles name categories by display name; a wire key is accepted too.
fn resolve_category(taxonomy: &Taxonomy, category: &str) -> String {
    if taxonomy.category(category).is_some() {
        return category.to_string();
    }
    taxonomy
        .name_for_wire_key(category)
        .unwrap_or(category)
        .to_string()
}

pub fn summarize(record: &SchoolRecord) -> SchoolSummary {
    SchoolSummary {
        id: record.id_text(),
        name: record.display_name(),
        curriculum: record.curriculum.normalize(),
        school_type: record.school_type.normalize(),
        fee_range: record.fee_value().normalize(),
        city: record.city_value().normalize(),
        state: record.state_value().normalize(),
    }
}

pub fn list_facets(catalog: &Catalog) -> FacetListResponse {
    let facets = catalog
        .taxonomy
        .categories()
        .iter()
        .map(|c| FacetInfo {
            name: c.name.clone(),
            wire_key: c.wire_key.clone(),
            options: c.options.clone(),
            dynamic: c.dynamic,
            loaded: c.is_loaded(),
        })
        .collect();
    FacetListResponse { facets }
}

pub fn school_detail(catalog: &Catalog, id: &str) -> Result<SchoolDetailResponse, AppError> {
    let school = catalog
        .find(id)
        .ok_or_else(|| AppError::NotFound(id.to_string()))?;
    Ok(SchoolDetailResponse {
        id: school.id_text(),
        name: school.display_name(),
        record: school.to_json(),
    })
}

fn refresh_summary(catalog: &Catalog) -> RefreshCatalogResponse {
    RefreshCatalogResponse {
        source: catalog.source.as_str().to_string(),
        school_count: catalog.schools.len(),
        cities_loaded: catalog.options_loaded(CITY),
        states_loaded: catalog.options_loaded(STATE),
    }
}

/// Shared handle over the live catalog. Requests hold the read lock for the length of
/// one pipeline run; a refresh loads outside the lock and only swaps under it.
#[derive(Clone)]
pub struct DiscoveryService {
    catalog: Arc<RwLock<Catalog>>,
    loader: Arc<CatalogLoader>,
}

impl DiscoveryService {
    pub fn new(catalog: Catalog, loader: Arc<CatalogLoader>) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
            loader,
        }
    }

    pub async fn discover(&self, request: &DiscoveryRequest) -> DiscoverSchoolsResponse {
        let catalog = self.catalog.read().await;
        run_discovery(&catalog, request)
    }

    pub async fn facets(&self) -> FacetListResponse {
        let catalog = self.catalog.read().await;
        list_facets(&catalog)
    }

    pub async fn school(&self, id: &str) -> Result<SchoolDetailResponse, AppError> {
        let catalog = self.catalog.read().await;
        school_detail(&catalog, id)
    }

    pub async fn refresh(&self) -> RefreshCatalogResponse {
        let fresh = self.loader.refresh().await;
        let summary = refresh_summary(&fresh);
        *self.catalog.write().await = fresh;
        info!(
            source = %summary.source,
            school_count = summary.school_count,
            "catalog swapped"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSource;
    use discovery_common::api::ToggleFilterParam;
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                json!({"id": 1, "name": "Zenith School", "type": "Montessori", "city": "Mumbai",
                       "curriculum": ["CBSE"], "feeRange": "₹6-12 Lakhs/year"}),
                json!({"id": 2, "name": "Alpha School", "type": "CBSE", "city": "Delhi",
                       "curriculum": [{"name": "ICSE"}], "fee": "₹1-3 Lakhs/year"}),
                json!({"id": 3, "name": "Mid School", "type": "Montessori", "location": "Mumbai",
                       "feeRange": "₹20+ Lakhs/year"}),
                json!({"id": 4, "name": "Play Nest", "type": "Play School", "city": "Pune"}),
            ],
            CatalogSource::Seed,
            Some(vec!["Mumbai".to_string(), "Delhi".to_string(), "Pune".to_string()]),
            None,
        )
    }

    fn ids(response: &DiscoverSchoolsResponse) -> Vec<&str> {
        response.schools.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn query_filters_and_sorts() {
        let response = run_discovery(
            &catalog(),
            &DiscoveryRequest::from_query("type=montessori&city=mumbai&sort=fees-high-to-low"),
        );
        assert_eq!(ids(&response), vec!["3", "1"]);
        assert_eq!(response.sort, "fees-high-to-low");
        assert_eq!(response.total, 2);
        assert_eq!(response.selected_filters["Type"], vec!["Montessori"]);
        assert_eq!(response.wire_filters["city"], vec!["Mumbai"]);
        assert!(!response.selected_filters.contains_key("sort"));
    }

    #[test]
    fn no_filters_returns_everything_in_catalog_order() {
        let response = run_discovery(&catalog(), &DiscoveryRequest::default());
        assert_eq!(ids(&response), vec!["1", "2", "3", "4"]);
        assert_eq!(response.sort, "");
        assert!(response.selected_filters.is_empty());
    }

    #[test]
    fn explicit_sort_overrides_query_sort() {
        let request = DiscoveryRequest {
            query: "sort=newest".to_string(),
            sort: Some("name-asc".to_string()),
            ..DiscoveryRequest::default()
        };
        let response = run_discovery(&catalog(), &request);
        assert_eq!(ids(&response), vec!["2", "3", "4", "1"]);
    }

    #[test]
    fn limit_from_query_and_clamp() {
        let response = run_discovery(&catalog(), &DiscoveryRequest::from_query("limit=2"));
        assert_eq!(ids(&response), vec!["1", "2"]);
        assert_eq!(response.total, 4);

        let response = run_discovery(&catalog(), &DiscoveryRequest::from_query("limit=lots"));
        assert_eq!(response.schools.len(), 4);

        let request = DiscoveryRequest {
            limit: Some(10_000),
            ..DiscoveryRequest::default()
        };
        let response = run_discovery(&catalog(), &request);
        assert_eq!(response.schools.len(), 4);
        assert!(MAX_LIMIT < 10_000);
    }

    #[test]
    fn clear_then_toggles() {
        let params = DiscoverSchoolsParams {
            query: Some("type=montessori".to_string()),
            clear: Some(true),
            toggles: Some(vec![
                ToggleFilterParam {
                    category: "city".to_string(),
                    option: "Pune".to_string(),
                },
                ToggleFilterParam {
                    category: "Type".to_string(),
                    option: "Play School".to_string(),
                },
            ]),
            ..DiscoverSchoolsParams::default()
        };
        let response = run_discovery(&catalog(), &DiscoveryRequest::from(params));
        assert_eq!(ids(&response), vec!["4"]);
        assert_eq!(response.selected_filters["City"], vec!["Pune"]);
        assert!(!response.selected_filters["Type"].contains(&"Montessori".to_string()));
    }

    #[test]
    fn toggle_removes_query_selection() {
        let request = DiscoveryRequest {
            query: "city=mumbai,delhi".to_string(),
            toggles: vec![("City".to_string(), "Delhi".to_string())],
            ..DiscoveryRequest::default()
        };
        let response = run_discovery(&catalog(), &request);
        assert_eq!(ids(&response), vec!["1", "3"]);
    }

    #[test]
    fn summaries_use_fallback_fields() {
        let response = run_discovery(&catalog(), &DiscoveryRequest::from_query("city=mumbai"));
        let mid = &response.schools[1];
        assert_eq!(mid.city, vec!["Mumbai"]);
        assert_eq!(mid.fee_range, vec!["₹20+ Lakhs/year"]);
        let alpha = summarize(&catalog().schools[1]);
        assert_eq!(alpha.curriculum, vec!["ICSE"]);
        assert_eq!(alpha.fee_range, vec!["₹1-3 Lakhs/year"]);
    }

    #[test]
    fn facets_report_loaded_state() {
        let response = list_facets(&catalog());
        let names: Vec<&str> = response.facets.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Curriculum", "Type", "Fee Range", "City", "State"]);
        let city = &response.facets[3];
        assert!(city.dynamic && city.loaded);
        let state = &response.facets[4];
        assert!(state.dynamic && !state.loaded);
        assert_eq!(state.options, None);
    }

    #[test]
    fn school_lookup() {
        let c = catalog();
        let detail = school_detail(&c, "2").unwrap();
        assert_eq!(detail.name, "Alpha School");
        assert_eq!(detail.record["fee"], json!("₹1-3 Lakhs/year"));
        assert!(matches!(school_detail(&c, "99"), Err(AppError::NotFound(_))));
    }
}
