use axum::{
    debug_handler,
    extract::{Path, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub mod prelude {
    pub use crate::{spawn, MockState, Order, OrderList};
    pub use axum::http::StatusCode;
}

/// An order as the orders API serialises it.
#[derive(Clone, Debug, Serialize)]
pub struct Order {
    pub id: u64,
    pub user: u64,
    pub status: String,
    pub total_price: String,
}

impl Order {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            user: 1,
            status: "pending".to_string(),
            total_price: format!("{}.00", id * 10),
        }
    }
}

/// What `GET /api/orders/` answers with.
#[derive(Clone, Debug)]
pub enum OrderList {
    Orders(Vec<Order>),
    Status(StatusCode),
    /// `200 OK` with a body which is not JSON.
    NotJson,
    /// `200 OK` with this exact JSON body. Detail lookups match entries by their `id`.
    Raw(Value),
}

/// Request counters per endpoint.
#[derive(Debug, Default)]
pub struct Hits {
    pub orders: AtomicU64,
    pub detail: AtomicU64,
    pub user: AtomicU64,
}

impl Hits {
    pub fn total(&self) -> u64 {
        self.orders.load(Ordering::Relaxed)
            + self.detail.load(Ordering::Relaxed)
            + self.user.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct MockState {
    pub orders: OrderList,
    pub require_token: bool,
    pub hits: Hits,
    last_headers: Mutex<HeaderMap>,
}

impl MockState {
    pub fn new(orders: OrderList) -> Self {
        Self {
            orders,
            require_token: true,
            hits: Hits::default(),
            last_headers: Mutex::new(HeaderMap::new()),
        }
    }

    pub fn with_orders(ids: &[u64]) -> Self {
        Self::new(OrderList::Orders(ids.iter().copied().map(Order::new).collect()))
    }

    pub fn require_token(mut self, require_token: bool) -> Self {
        self.require_token = require_token;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Raw `Authorization` header of the most recent request.
    pub fn last_authorization(&self) -> Option<String> {
        self.last_header(AUTHORIZATION)
    }

    /// Raw `Content-Type` header of the most recent request.
    pub fn last_content_type(&self) -> Option<String> {
        self.last_header(CONTENT_TYPE)
    }

    fn last_header(&self, name: axum::http::HeaderName) -> Option<String> {
        self.last_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        *self
            .last_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = headers.clone();

        if !self.require_token {
            return Ok(());
        }

        let value = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        match value.and_then(|v| v.strip_prefix("Bearer ")) {
            Some(token) if !token.trim().is_empty() => Ok(()),
            _ => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"detail": "Authentication credentials were not provided."})),
            )
                .into_response()),
        }
    }
}

pub fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api/orders/", get(list_orders))
        .route("/api/orders/:id/", get(order_detail))
        .route("/api/users/auth/user/", get(user_info))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: SocketAddr, state: Arc<MockState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Serve on an ephemeral localhost port in the background, returning the bound address.
pub async fn spawn(state: Arc<MockState>) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router(state)).await {
            tracing::error!("Mock service stopped: {err}");
        }
    });
    Ok(addr)
}

#[debug_handler]
async fn list_orders(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.hits.orders.fetch_add(1, Ordering::Relaxed);
    if let Err(res) = state.authorize(&headers) {
        return res;
    }

    match &state.orders {
        OrderList::Orders(orders) => Json(orders.clone()).into_response(),
        OrderList::Status(status) => {
            debug!("MOCK SERVER ___ {status}");
            (*status, "<h1>Server Error</h1>").into_response()
        }
        OrderList::NotJson => "orders are unavailable".into_response(),
        OrderList::Raw(body) => Json(body.clone()).into_response(),
    }
}

#[debug_handler]
async fn order_detail(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.hits.detail.fetch_add(1, Ordering::Relaxed);
    if let Err(res) = state.authorize(&headers) {
        return res;
    }

    let found = match &state.orders {
        OrderList::Orders(orders) => orders
            .iter()
            .find(|o| o.id.to_string() == id)
            .and_then(|o| serde_json::to_value(o).ok()),
        OrderList::Raw(Value::Array(entries)) => entries
            .iter()
            .find(|entry| match entry.get("id") {
                Some(Value::Number(n)) => n.to_string() == id,
                Some(Value::String(s)) => *s == id,
                _ => false,
            })
            .cloned(),
        _ => None,
    };

    match found {
        Some(order) => Json(order).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

#[debug_handler]
async fn user_info(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.hits.user.fetch_add(1, Ordering::Relaxed);
    if let Err(res) = state.authorize(&headers) {
        return res;
    }

    Json(json!({
        "pk": 1,
        "username": "loadtest",
        "email": "loadtest@example.com",
        "first_name": "",
        "last_name": ""
    }))
    .into_response()
}

/** Requests-per-second printer **/

pub async fn rps_measure_task(state: Arc<MockState>) {
    let mut last = state.hits.total();
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let total = state.hits.total();
        println!("{} RPS", total - last);
        last = total;
    }
}
