//! Order commands: create, list, delete.

use serde::Deserialize;

use crate::cart::OrderItem;
use crate::datetime;
use crate::db::DbState;
use crate::orders::{self, OrderDraft, PaymentMethod};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderCreatePayload {
    items: Vec<OrderItem>,
    #[serde(default)]
    total: Option<f64>,
    #[serde(alias = "payment_method")]
    payment_method: PaymentMethod,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderDeletePayload {
    #[serde(alias = "order_id", alias = "id")]
    order_id: String,
}

fn parse_order_create_payload(arg0: Option<serde_json::Value>) -> Result<OrderDraft, String> {
    let payload = arg0.ok_or("Missing order payload")?;
    let parsed: OrderCreatePayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid order payload: {e}"))?;

    // Until submission the till holds only line items; the store receives a
    // timestamp and a derived total when the bridge did not pass them.
    let total = parsed.total.unwrap_or_else(|| {
        parsed
            .items
            .iter()
            .map(|line| line.price * line.quantity as f64)
            .sum()
    });
    let date = parsed.date.unwrap_or_else(datetime::order_timestamp_now);
    let note = parsed
        .note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    Ok(OrderDraft {
        items: parsed.items,
        total,
        payment_method: parsed.payment_method,
        date,
        note,
    })
}

fn parse_order_delete_payload(arg0: Option<serde_json::Value>) -> Result<String, String> {
    let payload = match arg0 {
        Some(serde_json::Value::String(order_id)) => serde_json::json!({ "orderId": order_id }),
        Some(v) => v,
        None => serde_json::json!({}),
    };
    let parsed: OrderDeletePayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid delete payload: {e}"))?;
    let order_id = parsed.order_id.trim().to_string();
    if order_id.is_empty() {
        return Err("Missing orderId".into());
    }
    Ok(order_id)
}

/// Handle order:create. Persists the submitted order and updates aggregates.
pub async fn order_create(
    arg0: Option<serde_json::Value>,
    db: &DbState,
) -> Result<serde_json::Value, String> {
    let draft = parse_order_create_payload(arg0)?;
    let order = orders::create(db, draft).map_err(|e| e.to_string())?;
    Ok(serde_json::json!({
        "success": true,
        "order": order,
    }))
}

/// Handle order:list. All orders, newest creation time first.
pub async fn order_list(db: &DbState) -> Result<serde_json::Value, String> {
    let orders = orders::list(db).map_err(|e| e.to_string())?;
    Ok(serde_json::json!({ "orders": orders }))
}

/// Handle order:delete. Removes by id and reverses its aggregate effect.
pub async fn order_delete(
    arg0: Option<serde_json::Value>,
    db: &DbState,
) -> Result<serde_json::Value, String> {
    let order_id = parse_order_delete_payload(arg0)?;
    orders::delete(db, &order_id).map_err(|e| e.to_string())?;
    Ok(serde_json::json!({ "success": true }))
}
