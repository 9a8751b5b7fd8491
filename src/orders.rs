//! Order persistence: create, list, delete.
//!
//! Orders are immutable once written; the only mutation is deletion, which
//! must also reverse the order's effect on its daily aggregate. Creation
//! validates the draft (including that the submitted total matches the line
//! items) and triggers the aggregate apply. An aggregate failure after a
//! successful order write is logged and accepted; there is no compensating
//! rollback, the raw order list is the source of truth until reconciled.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregates;
use crate::cart::{OrderItem, MAX_NOTE_LEN};
use crate::datetime;
use crate::db::DbState;
use crate::error::{PosError, PosResult};

/// Tolerance when checking a submitted total against its line items.
const TOTAL_EPSILON: f64 = 0.005;

/// How an order was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
        }
    }

    pub fn parse(s: &str) -> PosResult<Self> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            other => Err(PosError::validation(format!(
                "Unknown payment method: {other}"
            ))),
        }
    }
}

/// A finalized, persisted order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub payment_method: PaymentMethod,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: String,
}

/// An order as submitted from the till, before the store assigns identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub payment_method: PaymentMethod,
    pub date: String,
    #[serde(default)]
    pub note: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_draft(draft: &OrderDraft) -> PosResult<()> {
    if draft.items.is_empty() {
        return Err(PosError::validation("Order has no line items"));
    }
    for line in &draft.items {
        if line.product.trim().is_empty() {
            return Err(PosError::validation("Line item has an empty product name"));
        }
        if line.quantity < 1 {
            return Err(PosError::validation(format!(
                "Invalid quantity for {}: {}",
                line.product, line.quantity
            )));
        }
        if !line.price.is_finite() || line.price < 0.0 {
            return Err(PosError::validation(format!(
                "Invalid price for {}: {}",
                line.product, line.price
            )));
        }
    }
    if let Some(note) = &draft.note {
        if note.chars().count() > MAX_NOTE_LEN {
            return Err(PosError::validation(format!(
                "Note exceeds {MAX_NOTE_LEN} characters"
            )));
        }
    }

    // The submitted total is re-derived rather than trusted, so the
    // aggregate maintainer can never ingest an inconsistent figure.
    let derived: f64 = draft
        .items
        .iter()
        .map(|line| line.price * line.quantity as f64)
        .sum();
    if (draft.total - derived).abs() > TOTAL_EPSILON {
        return Err(PosError::validation(format!(
            "Order total {} does not match line items (expected {derived})",
            draft.total
        )));
    }

    datetime::parse_date(datetime::day_of(&draft.date))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Store operations
// ---------------------------------------------------------------------------

/// Persist a new order and fold it into the daily aggregate. Returns the
/// stored order with its generated id and creation timestamp.
pub fn create(db: &DbState, draft: OrderDraft) -> PosResult<Order> {
    validate_draft(&draft)?;

    let order = Order {
        id: Uuid::new_v4().to_string(),
        items: draft.items,
        total: draft.total,
        payment_method: draft.payment_method,
        date: draft.date,
        note: draft.note.filter(|n| !n.is_empty()),
        created_at: datetime::now_istanbul().to_rfc3339(),
    };

    let conn = db.lock()?;
    let items_json = serde_json::to_string(&order.items)?;
    conn.execute(
        "INSERT INTO orders (id, items, total, payment_method, date, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            order.id,
            items_json,
            order.total,
            order.payment_method.as_str(),
            order.date,
            order.note,
            order.created_at,
        ],
    )
    .map_err(|e| PosError::persistence(format!("insert order: {e}")))?;

    info!(order_id = %order.id, total = order.total, method = order.payment_method.as_str(), "order created");

    // The order write stands even if the aggregate update fails; the two
    // views may disagree until reconciled manually.
    if let Err(e) = aggregates::apply_order(&conn, &order) {
        warn!(order_id = %order.id, error = %e, "aggregate update failed after order write");
    }

    Ok(order)
}

/// All orders, newest creation time first.
pub fn list(db: &DbState) -> PosResult<Vec<Order>> {
    let conn = db.lock()?;
    let mut stmt = conn
        .prepare(
            "SELECT id, items, total, payment_method, date, note, created_at
             FROM orders ORDER BY created_at DESC, rowid DESC",
        )
        .map_err(|e| PosError::persistence(format!("prepare order list: {e}")))?;

    let rows = stmt
        .query_map([], row_to_order)
        .map_err(|e| PosError::persistence(format!("query orders: {e}")))?;

    let mut orders = Vec::new();
    for row in rows {
        orders.push(row.map_err(|e| PosError::persistence(format!("read order row: {e}")))?);
    }
    Ok(orders)
}

/// Fetch a single order by id.
pub fn get(db: &DbState, order_id: &str) -> PosResult<Order> {
    let conn = db.lock()?;
    fetch_order(&conn, order_id)
}

/// Delete an order by id and reverse its daily aggregate contribution.
/// Fails with a not-found error when the id does not exist at fetch time.
pub fn delete(db: &DbState, order_id: &str) -> PosResult<()> {
    let conn = db.lock()?;

    // Fetch first: the aggregate reversal needs the order's date and amounts.
    let order = fetch_order(&conn, order_id)?;

    conn.execute("DELETE FROM orders WHERE id = ?1", params![order_id])
        .map_err(|e| PosError::persistence(format!("delete order: {e}")))?;

    info!(order_id = %order_id, "order deleted");

    if let Err(e) = aggregates::reverse_order(&conn, &order) {
        warn!(order_id = %order_id, error = %e, "aggregate reversal failed after order delete");
    }

    Ok(())
}

fn fetch_order(conn: &Connection, order_id: &str) -> PosResult<Order> {
    conn.query_row(
        "SELECT id, items, total, payment_method, date, note, created_at
         FROM orders WHERE id = ?1",
        params![order_id],
        row_to_order,
    )
    .optional()
    .map_err(|e| PosError::persistence(format!("fetch order: {e}")))?
    .ok_or_else(|| PosError::not_found(format!("Order not found: {order_id}")))
}

fn row_to_order(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    let items_json: String = row.get(1)?;
    let items: Vec<OrderItem> = serde_json::from_str(&items_json).unwrap_or_default();
    let method: String = row.get(3)?;
    Ok(Order {
        id: row.get(0)?,
        items,
        total: row.get(2)?,
        payment_method: if method == "card" {
            PaymentMethod::Card
        } else {
            PaymentMethod::Cash
        },
        date: row.get(4)?,
        note: row.get(5)?,
        created_at: row.get(6)?,
    })
}
