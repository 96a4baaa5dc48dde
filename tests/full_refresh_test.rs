// ==========================================
// Full refresh tests
// ==========================================
// Loads the sample extract set (tests/fixtures/registry_sample)
// in dependency order and checks per-entity counters.
// ==========================================

mod test_helpers;

use registry_ingest::importer::{write_json, IngestError, IngestPipeline, Ingestor};
use registry_ingest::{logging, EntityType, RunStatus};
use tempfile::TempDir;

#[tokio::test]
async fn test_full_refresh_loads_in_dependency_order() {
    logging::init_test();
    let (_db, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let conn = test_helpers::open_shared(&db_path);
    let dir = TempDir::new().unwrap();
    test_helpers::copy_sample_extracts(dir.path());

    let pipeline = IngestPipeline::new(conn.clone(), test_helpers::small_batch_config());
    let reports = pipeline.full_refresh(dir.path()).await.expect("refresh should succeed");

    let order: Vec<EntityType> = reports.iter().map(|r| r.entity).collect();
    assert_eq!(order, EntityType::LOAD_ORDER.to_vec());
    assert!(reports.iter().all(|r| r.status == RunStatus::Completed));

    let by_entity = |e: EntityType| reports.iter().find(|r| r.entity == e).unwrap();

    let code = by_entity(EntityType::Code);
    assert_eq!(code.rows_read(), 5);
    assert_eq!(code.duplicates(), 1);
    assert_eq!(code.final_count(), 4);

    let enterprise = by_entity(EntityType::Enterprise);
    assert_eq!(enterprise.cleaned(), 3);
    assert_eq!(enterprise.skipped(), 1);
    assert_eq!(enterprise.final_count(), 3);

    let establishment = by_entity(EntityType::Establishment);
    assert_eq!(establishment.orphans(), 1);
    assert_eq!(establishment.final_count(), 2);

    let activity = by_entity(EntityType::Activity);
    assert_eq!(activity.duplicates(), 1);
    assert_eq!(activity.orphans(), 1);
    assert_eq!(activity.merge.inserted, 3);
    assert_eq!(activity.merge.soft_ref_misses, 0);

    assert_eq!(by_entity(EntityType::Address).final_count(), 3);
    assert_eq!(by_entity(EntityType::Contact).orphans(), 1);
    assert_eq!(by_entity(EntityType::Contact).final_count(), 2);
    assert_eq!(by_entity(EntityType::Denomination).final_count(), 3);

    let dates = test_helpers::query_values(
        &conn,
        "SELECT start_date FROM enterprise WHERE enterprise_number = '0201.310.929'",
    );
    assert_eq!(dates, vec![Some("1924-11-26".to_string())]);

    // every run is recorded
    assert_eq!(test_helpers::count_rows(&conn, "ingest_run"), 7);
    assert!(test_helpers::temp_tables(&conn).is_empty());

    let json_path = dir.path().join("refresh.json");
    write_json(&reports, &json_path).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value.as_array().map(|a| a.len()), Some(7));
}

#[tokio::test]
async fn test_full_refresh_twice_is_stable() {
    logging::init_test();
    let (_db, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let conn = test_helpers::open_shared(&db_path);
    let dir = TempDir::new().unwrap();
    test_helpers::copy_sample_extracts(dir.path());

    let pipeline = IngestPipeline::new(conn.clone(), test_helpers::small_batch_config());
    pipeline.full_refresh(dir.path()).await.unwrap();
    let second = pipeline.full_refresh(dir.path()).await.unwrap();

    for report in &second {
        assert_eq!(report.merge.inserted, 0, "{} grew on rerun", report.entity);
    }
    assert_eq!(test_helpers::count_rows(&conn, "activity"), 3);
    assert_eq!(test_helpers::count_rows(&conn, "enterprise"), 3);
}

#[tokio::test]
async fn test_full_refresh_requires_every_extract() {
    logging::init_test();
    let (_db, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let conn = test_helpers::open_shared(&db_path);
    let dir = TempDir::new().unwrap();
    test_helpers::copy_sample_extracts(dir.path());
    std::fs::remove_file(dir.path().join("contact.csv")).unwrap();

    let pipeline = IngestPipeline::new(conn.clone(), test_helpers::small_batch_config());
    let err = pipeline.full_refresh(dir.path()).await.unwrap_err();

    assert!(matches!(err, IngestError::SourceUnavailable { .. }));
    // nothing loaded, not even the entities whose files exist
    assert_eq!(test_helpers::count_rows(&conn, "code"), 0);
    assert_eq!(test_helpers::count_rows(&conn, "ingest_run"), 0);
}
