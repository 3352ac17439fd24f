//! End-to-end pipeline runs against an in-process catalog.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use vigia_core::ListingPage;
use vigia_core::RecordRef;
use vigia_harvest::{pipeline, CatalogClient, DataPaths, HarvestConfig, HarvestError};

/// Mutable fake catalog: records keyed by id, plus per-slug budgets of
/// induced 503 responses.
struct FakeCatalog {
    tramites: Mutex<BTreeMap<i64, Value>>,
    fail_budget: Mutex<HashMap<String, u32>>,
}

impl FakeCatalog {
    fn new() -> Self {
        Self {
            tramites: Mutex::new(BTreeMap::new()),
            fail_budget: Mutex::new(HashMap::new()),
        }
    }

    fn put(&self, id: i64, estado: &str) {
        self.tramites.lock().unwrap().insert(
            id,
            json!({
                "id": id,
                "nombre": format!("tramite {id}"),
                "slug": format!("tramite-{id}"),
                "entidad": { "nombre": "Ministerio" },
                "estado": estado,
            }),
        );
    }

    fn remove(&self, id: i64) {
        self.tramites.lock().unwrap().remove(&id);
    }

    fn fail_times(&self, slug: &str, times: u32) {
        self.fail_budget
            .lock()
            .unwrap()
            .insert(slug.to_string(), times);
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn list_page(&self, page: u32, page_size: u32) -> Result<ListingPage, HarvestError> {
        let all: Vec<RecordRef> = self
            .tramites
            .lock()
            .unwrap()
            .values()
            .map(|v| RecordRef {
                id: v["id"].as_i64().unwrap(),
                name: v["nombre"].as_str().unwrap().to_string(),
                slug: v["slug"].as_str().unwrap().to_string(),
            })
            .collect();

        let total = all.len() as u64;
        let start = ((page - 1) * page_size) as usize;
        let end = (start + page_size as usize).min(all.len());
        let rows = if start < all.len() {
            all[start..end].to_vec()
        } else {
            Vec::new()
        };
        Ok(ListingPage { total, rows })
    }

    async fn fetch_detail(&self, slug: &str) -> Result<Value, HarvestError> {
        if let Some(budget) = self.fail_budget.lock().unwrap().get_mut(slug) {
            if *budget > 0 {
                *budget -= 1;
                return Err(HarvestError::Status {
                    url: slug.to_string(),
                    status: 503,
                });
            }
        }

        self.tramites
            .lock()
            .unwrap()
            .values()
            .find(|v| v["slug"] == slug)
            .cloned()
            .ok_or_else(|| HarvestError::Status {
                url: slug.to_string(),
                status: 404,
            })
    }
}

fn quick_config() -> HarvestConfig {
    HarvestConfig {
        page_size: 2,
        concurrency: 4,
        max_retries: 0,
        base_delay: Duration::from_millis(1),
        residual_passes: 2,
        page_attempt_cap: Some(3),
        ..HarvestConfig::default()
    }
}

#[tokio::test]
async fn first_run_snapshots_without_diffing() {
    let catalog = Arc::new(FakeCatalog::new());
    for id in 1..=3 {
        catalog.put(id, "activo");
    }
    let dir = TempDir::new().unwrap();
    let paths = DataPaths::in_dir(dir.path());

    let summary = pipeline::run(Arc::clone(&catalog), &quick_config(), &paths)
        .await
        .unwrap();

    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.errored, 0);
    assert_eq!(summary.appeared, 0);
    assert_eq!(summary.disappeared, 0);
    assert_eq!(summary.modified, 0);

    let snapshot = fs::read_to_string(&paths.snapshot).unwrap();
    assert_eq!(snapshot.lines().count(), 3);
    // Flattened records, one per line, with dot-joined entity columns.
    assert!(snapshot.contains("\"entidad.nombre\":\"Ministerio\""));

    assert_eq!(fs::read_to_string(&paths.errors).unwrap(), "");
    assert!(!paths.modifications.exists(), "no diff on the first run");
    assert!(!paths.memberships.exists());
}

#[tokio::test]
async fn unchanged_catalog_appends_zero_audit_rows() {
    let catalog = Arc::new(FakeCatalog::new());
    for id in 1..=3 {
        catalog.put(id, "activo");
    }
    let dir = TempDir::new().unwrap();
    let paths = DataPaths::in_dir(dir.path());
    let config = quick_config();

    pipeline::run(Arc::clone(&catalog), &config, &paths)
        .await
        .unwrap();
    let summary = pipeline::run(Arc::clone(&catalog), &config, &paths)
        .await
        .unwrap();

    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.modified, 0);
    assert_eq!(summary.appeared + summary.disappeared, 0);
    assert!(!paths.modifications.exists());
    assert!(!paths.memberships.exists());
}

#[tokio::test]
async fn catalog_changes_land_in_both_audit_logs() {
    let catalog = Arc::new(FakeCatalog::new());
    for id in 1..=3 {
        catalog.put(id, "activo");
    }
    let dir = TempDir::new().unwrap();
    let paths = DataPaths::in_dir(dir.path());
    let config = quick_config();

    pipeline::run(Arc::clone(&catalog), &config, &paths)
        .await
        .unwrap();

    // One field change, one removal, one addition.
    catalog.put(2, "inactivo");
    catalog.remove(3);
    catalog.put(4, "activo");

    let summary = pipeline::run(Arc::clone(&catalog), &config, &paths)
        .await
        .unwrap();

    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.modified, 1);
    assert_eq!(summary.appeared, 1);
    assert_eq!(summary.disappeared, 1);

    let modifications = fs::read_to_string(&paths.modifications).unwrap();
    let mod_lines: Vec<_> = modifications.lines().collect();
    assert_eq!(mod_lines.len(), 2);
    assert!(mod_lines[1].contains(",2,"));
    assert!(mod_lines[1].contains("estado,activo,inactivo"));

    let memberships = fs::read_to_string(&paths.memberships).unwrap();
    let member_lines: Vec<_> = memberships.lines().collect();
    assert_eq!(member_lines.len(), 3);
    assert!(memberships.contains(",aparece"));
    assert!(memberships.contains(",desaparece"));

    // A further unchanged run must not grow either log.
    pipeline::run(Arc::clone(&catalog), &config, &paths)
        .await
        .unwrap();
    assert_eq!(
        fs::read_to_string(&paths.modifications).unwrap().lines().count(),
        2
    );
    assert_eq!(
        fs::read_to_string(&paths.memberships).unwrap().lines().count(),
        3
    );
}

#[tokio::test]
async fn residual_pass_recovers_what_per_request_retries_could_not() {
    let catalog = Arc::new(FakeCatalog::new());
    catalog.put(1, "activo");
    catalog.put(2, "activo");
    // Two 503s with max_retries=0: the first pass and the first residual
    // pass fail, the second residual pass succeeds.
    catalog.fail_times("tramite-1", 2);

    let dir = TempDir::new().unwrap();
    let paths = DataPaths::in_dir(dir.path());

    let summary = pipeline::run(Arc::clone(&catalog), &quick_config(), &paths)
        .await
        .unwrap();

    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.errored, 0);
    assert_eq!(fs::read_to_string(&paths.errors).unwrap(), "");
}

#[tokio::test]
async fn exhausted_failures_are_persisted_not_dropped() {
    let catalog = Arc::new(FakeCatalog::new());
    catalog.put(1, "activo");
    catalog.put(2, "activo");
    catalog.fail_times("tramite-2", 99);

    let dir = TempDir::new().unwrap();
    let paths = DataPaths::in_dir(dir.path());

    let summary = pipeline::run(Arc::clone(&catalog), &quick_config(), &paths)
        .await
        .unwrap();

    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.errored, 1);

    let errors = fs::read_to_string(&paths.errors).unwrap();
    assert_eq!(errors.lines().count(), 1);
    assert!(errors.contains("\"slug\":\"tramite-2\""));
    assert!(errors.contains("503"));

    // The snapshot still holds everything that did succeed.
    let snapshot = fs::read_to_string(&paths.snapshot).unwrap();
    assert_eq!(snapshot.lines().count(), 1);
    assert!(snapshot.contains("\"id\":1"));
}
