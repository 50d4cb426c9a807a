use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DiscoverSchoolsParams {
    /// Shareable URL query string, e.g. "type=montessori,cbse&city=mumbai&sort=name-asc".
    pub query: Option<String>,
    /// Option toggles applied in order after the query has been read.
    pub toggles: Option<Vec<ToggleFilterParam>>,
    /// Drop every selection taken from the query before applying toggles.
    pub clear: Option<bool>,
    /// One of "fees-low-to-high", "fees-high-to-low", "name-asc", "newest". Overrides `sort` in the query.
    pub sort: Option<String>,
    /// Maximum number of schools to return (default: 50, max: 200).
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ToggleFilterParam {
    /// Category display name such as "Curriculum" or "City".
    pub category: String,
    /// Option to add when absent or remove when present.
    pub option: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetSchoolParams {
    /// School id as it appears in discovery results.
    pub school_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SchoolSummary {
    pub id: String,
    pub name: String,
    pub curriculum: Vec<String>,
    #[serde(rename = "type")]
    pub school_type: Vec<String>,
    pub fee_range: Vec<String>,
    pub city: Vec<String>,
    pub state: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiscoverSchoolsResponse {
    /// Category name to selected options, in selection order.
    pub selected_filters: BTreeMap<String, Vec<String>>,
    /// The same selections keyed by wire key.
    pub wire_filters: BTreeMap<String, Vec<String>>,
    pub sort: String,
    /// Number of matching schools before `limit` was applied.
    pub total: usize,
    pub schools: Vec<SchoolSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FacetInfo {
    pub name: String,
    pub wire_key: String,
    /// `None` while a dynamic option list has not been loaded.
    pub options: Option<Vec<String>>,
    pub dynamic: bool,
    pub loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FacetListResponse {
    pub facets: Vec<FacetInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SchoolDetailResponse {
    pub id: String,
    pub name: String,
    /// The record as loaded, including columns discovery does not interpret.
    pub record: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RefreshCatalogResponse {
    /// "supabase", "seed" or "empty".
    pub source: String,
    pub school_count: usize,
    pub cities_loaded: bool,
    pub states_loaded: bool,
}
