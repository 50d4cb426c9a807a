/// The in-memory school catalog and the loader that fills it.
///
/// Rows come from Supabase when it is configured and returns something, otherwise from
/// the CSV seed file. If neither yields rows the catalog is empty, which is a valid
/// state: discovery then simply finds nothing. City and State option lists are fetched
/// alongside and stay unloaded (`None`) when they cannot be fetched.
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use discovery_common::error::CommonError;
use discovery_common::seed::read_seed_file;
use discovery_common::supabase::SupabaseClient;

use crate::cache::{CachedSchools, CatalogCache};
use crate::config::Config;
use crate::error::AppError;
use crate::model::SchoolRecord;
use crate::taxonomy::{Taxonomy, CITY, STATE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    Supabase,
    Seed,
    Empty,
}

impl CatalogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogSource::Supabase => "supabase",
            CatalogSource::Seed => "seed",
            CatalogSource::Empty => "empty",
        }
    }

    /// Only primary-store rows go into the shared cache; seed rows are read locally.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, CatalogSource::Supabase)
    }
}

pub struct Catalog {
    pub schools: Vec<SchoolRecord>,
    pub taxonomy: Arc<Taxonomy>,
    pub source: CatalogSource,
}

impl Catalog {
    pub fn new(
        rows: Vec<Value>,
        source: CatalogSource,
        cities: Option<Vec<String>>,
        states: Option<Vec<String>>,
    ) -> Self {
        let taxonomy = Taxonomy::standard()
            .with_dynamic_options(CITY, cities)
            .with_dynamic_options(STATE, states);
        Self {
            schools: rows.into_iter().map(SchoolRecord::from).collect(),
            taxonomy: Arc::new(taxonomy),
            source,
        }
    }

    /// Look a school up by the string form of its id. Exact match.
    pub fn find(&self, id: &str) -> Option<&SchoolRecord> {
        self.schools.iter().find(|school| school.id_text() == id)
    }

    pub fn options_loaded(&self, wire_key: &str) -> bool {
        self.taxonomy
            .by_wire_key(wire_key)
            .is_some_and(|category| category.is_loaded())
    }
}

struct SupabaseTables {
    client: SupabaseClient,
    schools: String,
    cities: String,
    states: String,
}

pub struct CatalogLoader {
    supabase: Option<SupabaseTables>,
    seed_path: PathBuf,
    cache: Arc<CatalogCache>,
}

impl CatalogLoader {
    pub fn new(config: &Config, cache: Arc<CatalogCache>) -> Result<Self, AppError> {
        let supabase = match &config.supabase {
            Some(settings) => Some(SupabaseTables {
                client: SupabaseClient::new(settings.connection.clone())
                    .map_err(CommonError::from)?,
                schools: settings.schools_table.clone(),
                cities: settings.cities_table.clone(),
                states: settings.states_table.clone(),
            }),
            None => None,
        };
        Ok(Self {
            supabase,
            seed_path: config.seed_csv_path(),
            cache,
        })
    }

    /// Load the catalog, serving from the cache where it has entries.
    pub async fn load(&self) -> Catalog {
        self.build(true).await
    }

    /// Drop cached entries and load everything from the stores again.
    pub async fn refresh(&self) -> Catalog {
        self.cache.invalidate_all().await;
        self.build(false).await
    }

    async fn build(&self, use_cache: bool) -> Catalog {
        let (schools, cities, states) = tokio::join!(
            self.load_schools(use_cache),
            self.load_options(CITY, use_cache),
            self.load_options(STATE, use_cache),
        );
        let catalog = Catalog::new(schools.rows, schools.source, cities, states);
        info!(
            source = catalog.source.as_str(),
            schools = catalog.schools.len(),
            cities_loaded = catalog.options_loaded(CITY),
            states_loaded = catalog.options_loaded(STATE),
            "catalog loaded"
        );
        catalog
    }

    async fn load_schools(&self, use_cache: bool) -> CachedSchools {
        if use_cache {
            if let Some(cached) = self.cache.get_schools().await {
                return cached;
            }
        }

        let primary = match &self.supabase {
            Some(tables) => Some(
                tables
                    .client
                    .select_rows::<Value>(&tables.schools, "*")
                    .await
                    .map_err(CommonError::from),
            ),
            None => None,
        };
        let (source, rows) = select_rows(primary, || read_seed_file(&self.seed_path));

        let loaded = CachedSchools { source, rows };
        if loaded.source.is_cacheable() {
            self.cache.set_schools(&loaded).await;
        }
        loaded
    }

    async fn load_options(&self, wire_key: &str, use_cache: bool) -> Option<Vec<String>> {
        let tables = self.supabase.as_ref()?;
        if use_cache {
            if let Some(cached) = self.cache.get_options(wire_key).await {
                return Some(cached);
            }
        }

        let table = if wire_key == CITY {
            &tables.cities
        } else {
            &tables.states
        };
        match tables.client.select_column_values(table, "name").await {
            Ok(options) => {
                self.cache.set_options(wire_key, &options).await;
                Some(options)
            }
            Err(e) => {
                warn!(error = %e, table = %table, wire_key, "failed to load facet options");
                None
            }
        }
    }
}

/// Choose between the primary store's rows and the seed file.
///
/// `primary` is `None` when no primary store is configured. The seed is only read when
/// the primary is absent, failed, or came back empty.
pub fn select_rows(
    primary: Option<Result<Vec<Value>, CommonError>>,
    seed: impl FnOnce() -> Result<Vec<Value>, CommonError>,
) -> (CatalogSource, Vec<Value>) {
    match primary {
        Some(Ok(rows)) if !rows.is_empty() => return (CatalogSource::Supabase, rows),
        Some(Ok(_)) => warn!("supabase returned no schools, falling back to seed file"),
        Some(Err(e)) => warn!(error = %e, "supabase unavailable, falling back to seed file"),
        None => {}
    }

    match seed() {
        Ok(rows) if !rows.is_empty() => (CatalogSource::Seed, rows),
        Ok(_) => {
            warn!("seed file has no schools, catalog is empty");
            (CatalogSource::Empty, Vec::new())
        }
        Err(e) => {
            warn!(error = %e, "failed to read seed file, catalog is empty");
            (CatalogSource::Empty, Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seed_rows() -> Result<Vec<Value>, CommonError> {
        Ok(vec![json!({"id": "s1", "name": "Seeded"})])
    }

    fn io_error() -> CommonError {
        CommonError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
    }

    #[test]
    fn primary_rows_win() {
        let (source, rows) = select_rows(
            Some(Ok(vec![json!({"id": 1})])),
            || panic!("seed must not be read"),
        );
        assert_eq!(source, CatalogSource::Supabase);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn falls_back_to_seed() {
        for primary in [None, Some(Ok(Vec::new())), Some(Err(io_error()))] {
            let (source, rows) = select_rows(primary, seed_rows);
            assert_eq!(source, CatalogSource::Seed);
            assert_eq!(rows[0]["name"], "Seeded");
        }
    }

    #[test]
    fn both_failing_is_empty() {
        let (source, rows) = select_rows(Some(Err(io_error())), || Err(io_error()));
        assert_eq!(source, CatalogSource::Empty);
        assert!(rows.is_empty());

        let (source, _) = select_rows(None, || Ok(Vec::new()));
        assert_eq!(source, CatalogSource::Empty);
    }

    #[test]
    fn catalog_find_and_options() {
        let catalog = Catalog::new(
            vec![json!({"id": 7, "name": "Seven"}), json!({"id": "a7", "name": "A"})],
            CatalogSource::Seed,
            Some(vec!["Pune".to_string()]),
            None,
        );
        assert_eq!(catalog.find("7").map(|s| s.display_name()), Some("Seven".to_string()));
        assert!(catalog.find("A7").is_none());
        assert!(catalog.options_loaded(CITY));
        assert!(!catalog.options_loaded(STATE));
        assert_eq!(catalog.taxonomy.options("City"), Some(&["Pune".to_string()][..]));
    }

    #[test]
    fn source_names() {
        assert_eq!(CatalogSource::Supabase.as_str(), "supabase");
        assert_eq!(serde_json::to_value(CatalogSource::Seed).unwrap(), json!("seed"));
        assert!(Catalog::new(Vec::new(), CatalogSource::Empty, None, None)
            .schools
            .is_empty());
    }

    #[test]
    fn only_primary_rows_are_cached() {
        assert!(CatalogSource::Supabase.is_cacheable());
        assert!(!CatalogSource::Seed.is_cacheable());
        assert!(!CatalogSource::Empty.is_cacheable());

        let (source, _) = select_rows(Some(Err(io_error())), seed_rows);
        assert!(!source.is_cacheable());
    }

    #[tokio::test]
    async fn loader_without_supabase_reads_seed() {
        let dir = std::env::temp_dir().join(format!("school-discovery-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("schools.csv");
        std::fs::write(&path, "id,name,city\n1,Alpha,Pune\n2,Beta,Mumbai\n").unwrap();

        let config = Config::from_lookup(|name: &str| {
            (name == "SCHOOLS_SEED_CSV").then(|| path.to_string_lossy().to_string())
        })
        .unwrap();
        let loader = CatalogLoader::new(&config, Arc::new(CatalogCache::disabled())).unwrap();
        let catalog = loader.load().await;
        assert_eq!(catalog.source, CatalogSource::Seed);
        assert_eq!(catalog.schools.len(), 2);
        assert!(!catalog.options_loaded(CITY));

        let refreshed = loader.refresh().await;
        assert_eq!(refreshed.schools.len(), 2);
        std::fs::remove_file(&path).ok();
    }
}
