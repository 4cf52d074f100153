use utils::*;

use mock_service::prelude::*;
use orders_load::driver::{
    ORDERS_LIST_CHECK, ORDER_DETAIL_CHECK, ORDER_DETAIL_SKIPPED_CHECK, USER_INFO_CHECK,
};
use orders_load::orders::OrderId;
use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::time::Duration;
use surge::Recorder;

const NO_PACE: Duration = Duration::ZERO;

fn labels(recorder: &Recorder) -> BTreeSet<String> {
    recorder.checks().into_iter().map(|c| c.label).collect()
}

#[tracing_test::traced_test]
#[tokio::test]
async fn empty_orders_skips_detail() {
    let (state, config) = backend(MockState::with_orders(&[]), TOKEN).await;
    let driver = driver(config, NO_PACE);
    let recorder = Recorder::new();

    let report = recorder.scope(driver.run_iteration()).await;

    assert_eq!(report.requests, 2);
    assert_eq!(report.first_order, None);
    assert_eq!(state.hits.orders.load(Ordering::Relaxed), 1);
    assert_eq!(state.hits.detail.load(Ordering::Relaxed), 0);
    assert_eq!(state.hits.user.load(Ordering::Relaxed), 1);

    let checks = recorder.checks();
    assert_eq!(checks.len(), 3);
    assert_eq!(outcome(&checks, ORDERS_LIST_CHECK), Some((1, 0)));
    assert_eq!(outcome(&checks, ORDER_DETAIL_SKIPPED_CHECK), Some((1, 0)));
    assert_eq!(outcome(&checks, ORDER_DETAIL_CHECK), None);
    assert_eq!(outcome(&checks, USER_INFO_CHECK), Some((1, 0)));
    assert_eq!(recorder.requests(), 2);
}

#[tracing_test::traced_test]
#[tokio::test]
async fn first_order_detail_is_fetched() {
    let (state, config) = backend(MockState::with_orders(&[42, 43]), TOKEN).await;
    let driver = driver(config, NO_PACE);
    let recorder = Recorder::new();

    let report = recorder.scope(driver.run_iteration()).await;

    assert_eq!(report.requests, 3);
    assert_eq!(report.first_order, Some(OrderId::from(42)));
    assert_eq!(state.hits.detail.load(Ordering::Relaxed), 1);
    assert_eq!(state.hits.total(), 3);

    let checks = recorder.checks();
    assert_eq!(checks.len(), 3);
    assert_eq!(outcome(&checks, ORDERS_LIST_CHECK), Some((1, 0)));
    assert_eq!(outcome(&checks, ORDER_DETAIL_CHECK), Some((1, 0)));
    assert_eq!(outcome(&checks, ORDER_DETAIL_SKIPPED_CHECK), None);
    assert_eq!(outcome(&checks, USER_INFO_CHECK), Some((1, 0)));
    assert_eq!(
        state.last_authorization().as_deref(),
        Some("Bearer test-token")
    );
    assert_eq!(
        state.last_content_type().as_deref(),
        Some("application/json")
    );
}

#[tracing_test::traced_test]
#[tokio::test]
async fn later_malformed_orders_do_not_hide_the_first() {
    let (state, config) = backend(
        MockState::new(OrderList::Raw(serde_json::json!([
            {"id": 42},
            {"status": "draft"}
        ]))),
        TOKEN,
    )
    .await;
    let driver = driver(config, NO_PACE);
    let recorder = Recorder::new();

    let report = recorder.scope(driver.run_iteration()).await;

    assert_eq!(report.requests, 3);
    assert_eq!(report.first_order, Some(OrderId::from(42)));
    assert_eq!(state.hits.detail.load(Ordering::Relaxed), 1);

    let checks = recorder.checks();
    // The mock answers 404 for any id other than 42.
    assert_eq!(outcome(&checks, ORDER_DETAIL_CHECK), Some((1, 0)));
    assert_eq!(outcome(&checks, ORDER_DETAIL_SKIPPED_CHECK), None);
}

#[tracing_test::traced_test]
#[tokio::test]
async fn unsigned_id_beyond_i64_is_fetched() {
    let (state, config) = backend(
        MockState::new(OrderList::Raw(serde_json::json!([{"id": u64::MAX}]))),
        TOKEN,
    )
    .await;
    let driver = driver(config, NO_PACE);
    let recorder = Recorder::new();

    let report = recorder.scope(driver.run_iteration()).await;

    assert_eq!(report.first_order, Some(OrderId::from(u64::MAX)));
    assert_eq!(state.hits.detail.load(Ordering::Relaxed), 1);
    assert_eq!(outcome(&recorder.checks(), ORDER_DETAIL_CHECK), Some((1, 0)));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn server_error_on_list_still_fetches_user() {
    let (state, config) = backend(
        MockState::new(OrderList::Status(StatusCode::INTERNAL_SERVER_ERROR)),
        TOKEN,
    )
    .await;
    let driver = driver(config, NO_PACE);
    let recorder = Recorder::new();

    let report = recorder.scope(driver.run_iteration()).await;

    assert_eq!(report.requests, 2);
    assert_eq!(state.hits.user.load(Ordering::Relaxed), 1);

    let checks = recorder.checks();
    assert_eq!(outcome(&checks, ORDERS_LIST_CHECK), Some((0, 1)));
    assert_eq!(outcome(&checks, ORDER_DETAIL_SKIPPED_CHECK), Some((1, 0)));
    assert_eq!(outcome(&checks, USER_INFO_CHECK), Some((1, 0)));
    // A 500 is still a completed request.
    assert_eq!(recorder.failed_requests(), 0);
}

#[tracing_test::traced_test]
#[tokio::test]
async fn non_json_list_is_treated_as_empty() {
    let (state, config) = backend(MockState::new(OrderList::NotJson), TOKEN).await;
    let driver = driver(config, NO_PACE);
    let recorder = Recorder::new();

    let report = recorder.scope(driver.run_iteration()).await;

    assert_eq!(report.requests, 2);
    assert_eq!(state.hits.detail.load(Ordering::Relaxed), 0);

    let checks = recorder.checks();
    assert_eq!(outcome(&checks, ORDERS_LIST_CHECK), Some((1, 0)));
    assert_eq!(outcome(&checks, ORDER_DETAIL_SKIPPED_CHECK), Some((1, 0)));
    assert_eq!(outcome(&checks, USER_INFO_CHECK), Some((1, 0)));
    assert!(logs_contain("treating as empty"));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn missing_token_sends_blank_bearer() {
    let (state, config) = backend(MockState::with_orders(&[1]), "").await;
    let driver = driver(config, NO_PACE);
    let recorder = Recorder::new();

    let report = recorder.scope(driver.run_iteration()).await;

    // The 401 body is a JSON object, not a list, so the detail request is skipped.
    assert_eq!(report.requests, 2);
    let sent = state.last_authorization().unwrap();
    assert_eq!(sent.trim_end(), "Bearer");

    let checks = recorder.checks();
    assert_eq!(outcome(&checks, ORDERS_LIST_CHECK), Some((0, 1)));
    assert_eq!(outcome(&checks, ORDER_DETAIL_SKIPPED_CHECK), Some((1, 0)));
    assert_eq!(outcome(&checks, USER_INFO_CHECK), Some((0, 1)));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn missing_token_accepted_by_open_backend() {
    let (_state, config) =
        backend(MockState::with_orders(&[5]).require_token(false), "").await;
    let driver = driver(config, NO_PACE);
    let recorder = Recorder::new();

    let report = recorder.scope(driver.run_iteration()).await;

    assert_eq!(report.requests, 3);
    assert!(recorder.checks().iter().all(|c| c.fails == 0));
}

#[tracing_test::traced_test]
#[tokio::test]
#[ntest::timeout(10_000)]
async fn unreachable_backend_fails_checks_without_aborting() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let driver = driver(config_for(addr, TOKEN), NO_PACE);
    let recorder = Recorder::new();

    let report = recorder.scope(driver.run_iteration()).await;

    assert_eq!(report.requests, 2);
    assert_eq!(recorder.requests(), 2);
    assert_eq!(recorder.failed_requests(), 2);

    let checks = recorder.checks();
    assert_eq!(outcome(&checks, ORDERS_LIST_CHECK), Some((0, 1)));
    assert_eq!(outcome(&checks, ORDER_DETAIL_SKIPPED_CHECK), Some((1, 0)));
    assert_eq!(outcome(&checks, USER_INFO_CHECK), Some((0, 1)));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn repeated_iterations_record_the_same_labels() {
    let (_state, config) = backend(MockState::with_orders(&[8]), TOKEN).await;
    let driver = driver(config, NO_PACE);

    let first = Recorder::new();
    first.scope(driver.run_iteration()).await;
    let second = Recorder::new();
    second.scope(driver.run_iteration()).await;
    second.scope(driver.run_iteration()).await;

    assert_eq!(labels(&first), labels(&second));
    assert!(second.checks().iter().all(|c| c.passes == 2));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn iteration_is_paced() {
    let (_state, config) = backend(MockState::with_orders(&[]), TOKEN).await;
    let driver = driver(config, Duration::from_millis(150));

    let start = std::time::Instant::now();
    Recorder::new().scope(driver.run_iteration()).await;
    assert!(start.elapsed() >= Duration::from_millis(150));
}
