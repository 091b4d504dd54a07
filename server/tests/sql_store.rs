use metrics_core::model::{Metric, MetricType};
use metrics_core::store::Store;
use metrics_server::storage::sql::SqlStore;

async fn connect() -> SqlStore {
    let dsn = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to run this test");
    SqlStore::connect(&dsn).await.expect("failed to connect to database")
}

#[tokio::test]
#[ignore]
async fn counter_accumulates_and_gauge_replaces() {
    let store = connect().await;

    store.update(Metric::counter("sql_c0", 5)).await.unwrap();
    let updated = store.update(Metric::counter("sql_c0", 3)).await.unwrap();
    assert_eq!(updated, Metric::counter("sql_c0", 8));

    store.update(Metric::gauge("sql_g0", 1.0)).await.unwrap();
    let updated = store.update(Metric::gauge("sql_g0", 9.0)).await.unwrap();
    assert_eq!(updated, Metric::gauge("sql_g0", 9.0));

    let read = store.read("sql_c0", MetricType::Counter).await.unwrap();
    assert_eq!(read, Metric::counter("sql_c0", 8));

    store.close().await;
}

#[tokio::test]
#[ignore]
async fn batch_update_runs_as_one_transaction() {
    let store = connect().await;

    let batch = vec![Metric::counter("sql_c1", 1), Metric::counter("sql_c1", 2), Metric::gauge("sql_g1", 4.5)];
    let updated = store.update_batch(batch).await.unwrap();
    assert_eq!(updated[1], Metric::counter("sql_c1", 3));
    assert_eq!(updated[2], Metric::gauge("sql_g1", 4.5));

    store.close().await;
}

#[tokio::test]
#[ignore]
async fn ping_succeeds_against_a_live_database() {
    let store = connect().await;
    assert!(store.ping().await);
    store.close().await;
}
