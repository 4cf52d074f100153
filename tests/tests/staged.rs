use utils::*;

use mock_service::prelude::*;
use orders_load::driver::{ORDERS_LIST_CHECK, ORDER_DETAIL_CHECK, USER_INFO_CHECK};
use std::time::Duration;
use surge::prelude::*;

#[tokio::test]
#[ntest::timeout(10_000)]
async fn staged_run_against_mock() {
    init();

    let (state, config) = backend(MockState::with_orders(&[1]), TOKEN).await;
    let driver = driver(config, Duration::from_millis(20));

    let stats = Scenario::new("orders", move || {
        let driver = driver.clone();
        async move {
            driver.run_iteration().await;
        }
    })
    .start_vus(0)
    .stage(Duration::from_millis(200), 3)
    .stage(Duration::from_millis(300), 3)
    .stage(Duration::from_millis(200), 0)
    .graceful_stop(Duration::from_secs(2))
    .await;

    assert_eq!(stats.max_vus, 3);
    assert!(stats.iterations > 0);
    assert_eq!(stats.interrupted_iterations, 0);
    assert_eq!(stats.http_reqs, 3 * stats.iterations);
    assert_eq!(stats.http_req_failed, 0);
    assert_eq!(state.hits.total(), stats.http_reqs);

    assert_eq!(stats.checks.len(), 3);
    for label in [ORDERS_LIST_CHECK, ORDER_DETAIL_CHECK, USER_INFO_CHECK] {
        let check = stats.check(label).unwrap();
        assert_eq!(check.passes, stats.iterations, "{label}");
        assert_eq!(check.fails, 0, "{label}");
    }
    assert_eq!(stats.checks_pass_rate(), 1.0);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn failing_backend_is_reported_not_fatal() {
    init();

    let (_state, config) = backend(
        MockState::new(OrderList::Status(StatusCode::SERVICE_UNAVAILABLE)),
        TOKEN,
    )
    .await;
    let driver = driver(config, Duration::from_millis(20));

    let stats = Scenario::new("unavailable", move || {
        let driver = driver.clone();
        async move {
            driver.run_iteration().await;
        }
    })
    .start_vus(2)
    .stage(Duration::from_millis(300), 2)
    .await;

    assert!(stats.iterations > 0);
    let list = stats.check(ORDERS_LIST_CHECK).unwrap();
    assert_eq!(list.passes, 0);
    assert_eq!(list.fails, stats.iterations);
    assert!(stats.checks_pass_rate() < 1.0);
    assert_eq!(stats.http_req_failed, 0);
}
