use crate::config::RunConfig;
use crate::orders::{first_order_id, OrderId};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, StatusCode,
};
use std::sync::Arc;
use std::time::Duration;
use surge::{check, request};
use tracing::{debug, trace};

pub const ORDERS_LIST_CHECK: &str = "orders list: status 200";
pub const ORDER_DETAIL_CHECK: &str = "order detail: status 200";
pub const ORDER_DETAIL_SKIPPED_CHECK: &str = "order detail: skipped (no orders)";
pub const USER_INFO_CHECK: &str = "user info: status 200";

/// Delay at the end of every iteration.
pub const DEFAULT_PACE: Duration = Duration::from_secs(1);

/// Per-request timeout, matching the common load-tool default.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// What a single iteration did, for callers that want more than the recorded checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IterationReport {
    /// Requests issued: 2 when the orders list was empty, 3 otherwise.
    pub requests: usize,
    /// The order whose detail was requested.
    pub first_order: Option<OrderId>,
}

struct HttpResponse {
    status: StatusCode,
    body: Vec<u8>,
}

/// Runs the orders iteration. Cheap to clone; every VU gets its own copy.
#[derive(Clone, Debug)]
pub struct IterationDriver {
    client: Client,
    config: Arc<RunConfig>,
    headers: HeaderMap,
    pace: Duration,
}

impl IterationDriver {
    pub fn new(client: Client, config: Arc<RunConfig>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, config.authorization().clone());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Self {
            client,
            config,
            headers,
            pace: DEFAULT_PACE,
        }
    }

    pub fn client() -> reqwest::Result<Client> {
        Client::builder().timeout(REQUEST_TIMEOUT).build()
    }

    pub fn pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn run_iteration(&self) -> IterationReport {
        let mut requests = 0;

        let orders = self.get("/api/orders/").await;
        requests += 1;
        check(ORDERS_LIST_CHECK, status_ok(&orders));

        // The list is decoded whatever the status; error pages simply fail to decode.
        let first_order = match orders {
            Ok(res) => first_order_id(&res.body),
            Err(_) => None,
        };

        if let Some(id) = &first_order {
            let detail = self.get(&format!("/api/orders/{id}/")).await;
            requests += 1;
            check(ORDER_DETAIL_CHECK, status_ok(&detail));
        } else {
            check(ORDER_DETAIL_SKIPPED_CHECK, true);
        }

        let user = self.get("/api/users/auth/user/").await;
        requests += 1;
        check(USER_INFO_CHECK, status_ok(&user));

        tokio::time::sleep(self.pace).await;

        IterationReport {
            requests,
            first_order,
        }
    }

    async fn get(&self, path: &str) -> reqwest::Result<HttpResponse> {
        let url = self.config.url(path);
        let res = request(async {
            let res = self
                .client
                .get(url.as_str())
                .headers(self.headers.clone())
                .send()
                .await?;
            let status = res.status();
            let body = res.bytes().await?.to_vec();
            Ok::<_, reqwest::Error>(HttpResponse { status, body })
        })
        .await;

        match &res {
            Ok(res) => trace!("GET {url} -> {}", res.status),
            Err(err) => debug!("GET {url} failed: {err}"),
        }
        res
    }
}

fn status_ok(res: &reqwest::Result<HttpResponse>) -> bool {
    matches!(res, Ok(res) if res.status == StatusCode::OK)
}
