use serde_json::{Number, Value};
use std::fmt;
use tracing::trace;

/// Primary key of an order, as found in the orders list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderId {
    /// Any JSON integer, signed or unsigned.
    Int(Number),
    Text(String),
}

impl OrderId {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(OrderId::Int(n.clone())),
            Value::String(s) => Some(OrderId::Text(s.clone())),
            _ => None,
        }
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        OrderId::Int(id.into())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderId::Int(id) => write!(f, "{id}"),
            OrderId::Text(id) => f.write_str(id),
        }
    }
}

/// Id of the first entry of `GET /api/orders/`.
///
/// Only the first entry is looked at; the rest of the list may hold anything. A body which is not
/// a JSON array, an empty array, or a first entry without a usable `id` all yield `None`.
pub fn first_order_id(body: &[u8]) -> Option<OrderId> {
    let orders: Vec<Value> = match serde_json::from_slice(body) {
        Ok(orders) => orders,
        Err(err) => {
            trace!("Orders list did not decode ({err}); treating as empty.");
            return None;
        }
    };

    let first = orders.first()?;
    let id = first.get("id").and_then(OrderId::from_value);
    if id.is_none() {
        trace!("First order has no usable id ({first}); treating as empty.");
    }
    id
}
