use opsledger_cache::{
    CacheClient, CacheConfig, CacheSource, DurableCacheConfig, ReadOptions, WriteOptions,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

async fn test_client() -> CacheClient {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();

    let config = CacheConfig {
        durable: DurableCacheConfig {
            database_url: "sqlite::memory:".to_string(),
            pool_size: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    CacheClient::connect(&config).await.unwrap()
}

fn counted_origin(
    calls: &Arc<AtomicUsize>,
    value: Value,
) -> impl FnOnce() -> std::future::Ready<Result<Value, String>> {
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(value))
    }
}

#[tokio::test]
async fn fast_hit_short_circuits_the_chain() {
    let client = test_client().await;
    let payload = json!({"clients": ["Acme", "Globex"]});
    assert!(
        client
            .fast_put("clients_list", "clients_list", &payload, &WriteOptions::default())
            .await
    );

    let calls = Arc::new(AtomicUsize::new(0));
    let read = client
        .hybrid_read(
            "clients_list",
            "clients_list",
            counted_origin(&calls, json!(null)),
            &ReadOptions::with_durable_fallback(),
        )
        .await
        .unwrap();

    assert_eq!(read.source, CacheSource::Fast);
    assert!(read.cached);
    assert_eq!(read.data, payload);
    assert_eq!(calls.load(Ordering::SeqCst), 0, "origin must not run on a fast hit");
}

#[tokio::test]
async fn durable_hit_backfills_the_fast_tier() {
    let client = test_client().await;
    let payload = json!({"task": "VAT filing", "status": "open"});
    assert!(
        client
            .durable_put("task_detail:id=9", "task_detail", &payload, &WriteOptions::default())
            .await
    );

    let calls = Arc::new(AtomicUsize::new(0));
    let read = client
        .hybrid_read(
            "task_detail:id=9",
            "task_detail",
            counted_origin(&calls, json!(null)),
            &ReadOptions::with_durable_fallback(),
        )
        .await
        .unwrap();

    assert_eq!(read.source, CacheSource::Durable);
    assert!(read.cached);
    assert_eq!(read.data, payload);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    read.write_back.settled().await;
    let backfilled = client.fast_get("task_detail:id=9").await.unwrap();
    assert_eq!(backfilled.data, payload);
}

#[tokio::test]
async fn full_miss_computes_fresh_and_writes_both_tiers() {
    let client = test_client().await;
    let payload = json!({"total_hours": 152.5});

    let calls = Arc::new(AtomicUsize::new(0));
    let read = client
        .hybrid_read(
            "timesheet_summary:month=2026-07",
            "timesheet_summary",
            counted_origin(&calls, payload.clone()),
            &ReadOptions::with_durable_fallback(),
        )
        .await
        .unwrap();

    assert_eq!(read.source, CacheSource::Fresh);
    assert!(!read.cached);
    assert_eq!(read.data, payload);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    read.write_back.settled().await;
    let fast = client.fast_get("timesheet_summary:month=2026-07").await.unwrap();
    let durable = client.durable_get("timesheet_summary:month=2026-07").await.unwrap();
    assert_eq!(fast.data, payload);
    assert_eq!(durable.data, payload);
}

#[tokio::test]
async fn fresh_path_without_durable_fallback_skips_the_durable_tier() {
    let client = test_client().await;
    let payload = json!([1, 2, 3]);

    let calls = Arc::new(AtomicUsize::new(0));
    let read = client
        .hybrid_read(
            "receipts_list:page=1",
            "receipts_list",
            counted_origin(&calls, payload.clone()),
            &ReadOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(read.source, CacheSource::Fresh);
    read.write_back.settled().await;

    assert!(client.fast_get("receipts_list:page=1").await.is_some());
    assert!(client.durable_get("receipts_list:page=1").await.is_none());
}

#[tokio::test]
async fn cache_malfunction_falls_back_to_origin() {
    let client = test_client().await;
    // kill the durable tier so its lookup errors instead of missing
    client.durable().close().await;

    let calls = Arc::new(AtomicUsize::new(0));
    let payload = json!({"client": "Initech"});
    let read = client
        .hybrid_read(
            "client_detail:id=3",
            "client_detail",
            counted_origin(&calls, payload.clone()),
            &ReadOptions::with_durable_fallback(),
        )
        .await
        .unwrap();

    assert_eq!(read.source, CacheSource::ErrorFallback);
    assert!(!read.cached);
    assert_eq!(read.data, payload);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(read.write_back.is_empty(), "no write-back against a failing store");
}

#[tokio::test]
async fn origin_failure_propagates_unchanged() {
    let client = test_client().await;

    let result = client
        .hybrid_read(
            "leave_balance:user=ana",
            "leave_balance",
            || std::future::ready(Err::<Value, _>("ledger database is down".to_string())),
            &ReadOptions::with_durable_fallback(),
        )
        .await;

    assert_eq!(result.unwrap_err(), "ledger database is down");
}

#[tokio::test]
async fn second_read_after_fresh_write_is_a_fast_hit() {
    let client = test_client().await;
    let payload = json!({"rows": 12});
    let options = ReadOptions::with_durable_fallback();

    let calls = Arc::new(AtomicUsize::new(0));
    let first = client
        .hybrid_read(
            "report:kind=payroll",
            "report",
            counted_origin(&calls, payload.clone()),
            &options,
        )
        .await
        .unwrap();
    assert_eq!(first.source, CacheSource::Fresh);
    first.write_back.settled().await;

    let second = client
        .hybrid_read(
            "report:kind=payroll",
            "report",
            counted_origin(&calls, json!(null)),
            &options,
        )
        .await
        .unwrap();
    assert_eq!(second.source, CacheSource::Fast);
    assert_eq!(second.data, payload);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "origin ran only for the first read");
}
