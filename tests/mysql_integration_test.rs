// ABOUTME: Integration tests against two live MySQL databases
// ABOUTME: Needs TEST_SOURCE_URL and TEST_TARGET_URL; run with --ignored

use std::env;
use table_reconciler::store::Credential;
use table_reconciler::{MysqlStore, RecordStore, Reconciler, SyncOptions, Value};

/// Helper to get test database URLs from environment
fn get_test_urls() -> Option<(String, String)> {
    let source = env::var("TEST_SOURCE_URL").ok()?;
    let target = env::var("TEST_TARGET_URL").ok()?;
    Some((source, target))
}

async fn connect(url: &str) -> MysqlStore {
    MysqlStore::connect(url, &Credential::default())
        .await
        .expect("Failed to connect")
}

/// Create the same table on both sides. Zero dates need a permissive sql_mode.
async fn setup_table(source: &mut MysqlStore, target: &mut MysqlStore, table: &str) {
    let ddl = format!(
        "CREATE TABLE `{}` (
            id INT PRIMARY KEY,
            name VARCHAR(64),
            created DATETIME NULL,
            updated DATETIME NULL
        )",
        table
    );
    for store in [&mut *source, &mut *target] {
        store.execute("SET SESSION sql_mode = ''").await.unwrap();
        store
            .execute(&format!("DROP TABLE IF EXISTS `{}`", table))
            .await
            .unwrap();
        store.execute(&ddl).await.unwrap();
    }
}

async fn cleanup_table(source: &mut MysqlStore, target: &mut MysqlStore, table: &str) {
    let drop = format!("DROP TABLE IF EXISTS `{}`", table);
    let _ = source.execute(&drop).await;
    let _ = target.execute(&drop).await;
}

#[tokio::test]
#[ignore]
async fn test_one_way_reconcile_round_trip() {
    let (source_url, target_url) =
        get_test_urls().expect("TEST_SOURCE_URL and TEST_TARGET_URL must be set");
    let mut source = connect(&source_url).await;
    let mut target = connect(&target_url).await;
    let table = "reconcile_test_one_way";

    setup_table(&mut source, &mut target, table).await;
    source
        .execute(&format!(
            "INSERT INTO `{}` VALUES
                (1, 'same', NULL, '2020-01-01 00:00:00'),
                (2, 'newer', NULL, '2021-01-01 00:00:00'),
                (3, 'fresh', NULL, '2021-01-01 00:00:00')",
            table
        ))
        .await
        .unwrap();
    target
        .execute(&format!(
            "INSERT INTO `{}` VALUES
                (1, 'same', NULL, '2020-01-01 00:00:00'),
                (2, 'older', NULL, '2020-01-01 00:00:00'),
                (9, 'gone', NULL, '2020-01-01 00:00:00')",
            table
        ))
        .await
        .unwrap();

    let options = SyncOptions {
        delete: true,
        read_lock: true,
        write_lock: true,
        ..SyncOptions::default()
    };
    let stats = Reconciler::new(&mut source, &mut target, &options)
        .run(&[table.to_string()])
        .await
        .expect("Reconcile failed");

    assert_eq!(stats.added, 1);
    assert_eq!(stats.updated, 1);
    assert_eq!(stats.deleted, 1);
    assert_eq!(stats.errors, 0);

    let rows = target
        .fetch_all(&format!("SELECT * FROM `{}` ORDER BY id", table))
        .await
        .unwrap();
    let names: Vec<_> = rows.iter().filter_map(|r| r.get("name").cloned()).collect();
    assert_eq!(
        names,
        vec![Value::from("same"), Value::from("newer"), Value::from("fresh")]
    );

    cleanup_table(&mut source, &mut target, table).await;
    source.disconnect().await.unwrap();
    target.disconnect().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_zero_date_repaired_before_insert() {
    let (source_url, target_url) =
        get_test_urls().expect("TEST_SOURCE_URL and TEST_TARGET_URL must be set");
    let mut source = connect(&source_url).await;
    let mut target = connect(&target_url).await;
    let table = "nodes_info";

    setup_table(&mut source, &mut target, table).await;
    source
        .execute(
            "INSERT INTO `nodes_info` VALUES
                (1, 'derived', '2020-01-01 00:00:00', '0000-00-00 00:00:00'),
                (2, 'skipped', NULL, '0000-00-00 00:00:00')",
        )
        .await
        .unwrap();

    let options = SyncOptions::default();
    let stats = Reconciler::new(&mut source, &mut target, &options)
        .run(&[table.to_string()])
        .await
        .expect("Reconcile failed");

    assert_eq!(stats.added, 1);
    assert_eq!(stats.skipped, 1);

    let rows = target.fetch_all("SELECT * FROM `nodes_info`").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("updated"),
        Some(&Value::from("2020-01-01 00:00:00"))
    );

    cleanup_table(&mut source, &mut target, table).await;
    source.disconnect().await.unwrap();
    target.disconnect().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_list_tables_includes_created_table() {
    let (source_url, target_url) =
        get_test_urls().expect("TEST_SOURCE_URL and TEST_TARGET_URL must be set");
    let mut source = connect(&source_url).await;
    let mut target = connect(&target_url).await;
    let table = "reconcile_test_listing";

    setup_table(&mut source, &mut target, table).await;
    let tables = source.list_tables().await.unwrap();
    assert!(tables.iter().any(|t| t == table));

    cleanup_table(&mut source, &mut target, table).await;
    source.disconnect().await.unwrap();
    target.disconnect().await.unwrap();
}
