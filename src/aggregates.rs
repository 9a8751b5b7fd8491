//! Daily/monthly aggregate maintenance.
//!
//! Each calendar month is one JSON document in the `monthly_aggregates`
//! table, holding a per-day rollup of order counts, revenue, the cash/card
//! split, and per-product unit counts. Order creation applies an incremental
//! add; deletion applies the exact mirror subtraction, dropping day records
//! that drain to zero orders and month documents that hold no days.
//!
//! The month document is read, mutated in memory, and written back whole;
//! last write wins. The single shared connection serializes writers in this
//! process, so there is no version token on the document.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::datetime;
use crate::error::{PosError, PosResult};
use crate::orders::{Order, PaymentMethod};

/// Per-day rollup, keyed by `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyAggregate {
    pub date: String,
    pub total_revenue: f64,
    pub total_orders: i64,
    pub cash_revenue: f64,
    pub cash_orders: i64,
    pub card_revenue: f64,
    pub card_orders: i64,
    #[serde(default)]
    pub item_counts: BTreeMap<String, i64>,
    pub last_updated: String,
}

impl DailyAggregate {
    /// A zeroed record for a day's first order (or a zero-filled chart point).
    pub fn zeroed(date: &str) -> Self {
        Self {
            date: date.to_string(),
            total_revenue: 0.0,
            total_orders: 0,
            cash_revenue: 0.0,
            cash_orders: 0,
            card_revenue: 0.0,
            card_orders: 0,
            item_counts: BTreeMap::new(),
            last_updated: String::new(),
        }
    }

    /// The day's products sorted by descending quantity, stable in stored
    /// (alphabetical) order for ties, truncated to `limit`.
    pub fn top_products(&self, limit: usize) -> Vec<(String, i64)> {
        let mut products: Vec<(String, i64)> = self
            .item_counts
            .iter()
            .map(|(product, qty)| (product.clone(), *qty))
            .collect();
        products.sort_by(|a, b| b.1.cmp(&a.1));
        products.truncate(limit);
        products
    }
}

/// One month's aggregate document, keyed by `YYYY-MM`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAggregate {
    pub month: String,
    #[serde(default)]
    pub daily_stats: BTreeMap<String, DailyAggregate>,
    pub last_updated: String,
}

impl MonthlyAggregate {
    fn empty(month: &str) -> Self {
        Self {
            month: month.to_string(),
            daily_stats: BTreeMap::new(),
            last_updated: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Document load/store
// ---------------------------------------------------------------------------

/// Load a month document, or `None` when no order has touched that month.
/// Real read failures propagate; they must never look like an absent row,
/// or `apply_order` would re-initialize and overwrite the whole month.
pub fn load_month(conn: &Connection, month: &str) -> PosResult<Option<MonthlyAggregate>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT data FROM monthly_aggregates WHERE month = ?1",
            params![month],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| PosError::persistence(format!("load month aggregate: {e}")))?;

    match raw {
        Some(json) => {
            let doc: MonthlyAggregate = serde_json::from_str(&json)?;
            Ok(Some(doc))
        }
        None => Ok(None),
    }
}

/// Write a month document back in full.
fn save_month(conn: &Connection, doc: &MonthlyAggregate) -> PosResult<()> {
    let json = serde_json::to_string(doc)?;
    conn.execute(
        "INSERT INTO monthly_aggregates (month, data, last_updated)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(month) DO UPDATE SET
            data = excluded.data,
            last_updated = excluded.last_updated",
        params![doc.month, json, doc.last_updated],
    )
    .map_err(|e| PosError::persistence(format!("save month aggregate: {e}")))?;
    Ok(())
}

fn delete_month(conn: &Connection, month: &str) -> PosResult<()> {
    conn.execute(
        "DELETE FROM monthly_aggregates WHERE month = ?1",
        params![month],
    )
    .map_err(|e| PosError::persistence(format!("delete month aggregate: {e}")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Apply / reverse
// ---------------------------------------------------------------------------

/// Fold a newly created order into its day's aggregate.
pub fn apply_order(conn: &Connection, order: &Order) -> PosResult<()> {
    let day = datetime::day_of(&order.date).to_string();
    let month = datetime::month_of(&order.date).to_string();
    let now = datetime::now_istanbul().to_rfc3339();

    let mut doc = load_month(conn, &month)?.unwrap_or_else(|| MonthlyAggregate::empty(&month));

    let stats = doc
        .daily_stats
        .entry(day.clone())
        .or_insert_with(|| DailyAggregate::zeroed(&day));

    stats.total_orders += 1;
    stats.total_revenue += order.total;
    match order.payment_method {
        PaymentMethod::Cash => {
            stats.cash_orders += 1;
            stats.cash_revenue += order.total;
        }
        PaymentMethod::Card => {
            stats.card_orders += 1;
            stats.card_revenue += order.total;
        }
    }
    for item in &order.items {
        *stats.item_counts.entry(item.product.clone()).or_insert(0) += item.quantity;
    }
    stats.last_updated = now.clone();
    doc.last_updated = now;

    save_month(conn, &doc)?;
    debug!(order_id = %order.id, day = %day, "aggregate applied");
    Ok(())
}

/// Reverse a deleted order out of its day's aggregate. Mirror of
/// [`apply_order`]: the day record is dropped once its order count reaches
/// zero, and the month document is deleted once it holds no days.
pub fn reverse_order(conn: &Connection, order: &Order) -> PosResult<()> {
    let day = datetime::day_of(&order.date).to_string();
    let month = datetime::month_of(&order.date).to_string();
    let now = datetime::now_istanbul().to_rfc3339();

    let Some(mut doc) = load_month(conn, &month)? else {
        warn!(order_id = %order.id, month = %month, "no month aggregate to reverse");
        return Ok(());
    };
    let Some(stats) = doc.daily_stats.get_mut(&day) else {
        warn!(order_id = %order.id, day = %day, "no day aggregate to reverse");
        return Ok(());
    };

    stats.total_orders -= 1;
    if stats.total_orders <= 0 {
        doc.daily_stats.remove(&day);
    } else {
        stats.total_revenue -= order.total;
        match order.payment_method {
            PaymentMethod::Cash => {
                stats.cash_orders -= 1;
                stats.cash_revenue -= order.total;
            }
            PaymentMethod::Card => {
                stats.card_orders -= 1;
                stats.card_revenue -= order.total;
            }
        }
        for item in &order.items {
            if let Some(count) = stats.item_counts.get_mut(&item.product) {
                *count -= item.quantity;
                if *count <= 0 {
                    // keep the mapping sparse
                    stats.item_counts.remove(&item.product);
                }
            }
        }
        stats.last_updated = now.clone();
    }

    if doc.daily_stats.is_empty() {
        delete_month(conn, &month)?;
        debug!(order_id = %order.id, month = %month, "month aggregate drained, removed");
    } else {
        doc.last_updated = now;
        save_month(conn, &doc)?;
        debug!(order_id = %order.id, day = %day, "aggregate reversed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::OrderItem;
    use crate::db::test_db_state;

    fn order(
        id: &str,
        date: &str,
        method: PaymentMethod,
        items: &[(&str, f64, i64)],
    ) -> Order {
        let items: Vec<OrderItem> = items
            .iter()
            .map(|(product, price, quantity)| OrderItem {
                product: product.to_string(),
                price: *price,
                quantity: *quantity,
            })
            .collect();
        let total = items
            .iter()
            .map(|line| line.price * line.quantity as f64)
            .sum();
        Order {
            id: id.to_string(),
            items,
            total,
            payment_method: method,
            date: date.to_string(),
            note: None,
            created_at: "2024-03-01T10:00:00+03:00".to_string(),
        }
    }

    #[test]
    fn first_cash_order_creates_the_day_record() {
        let db = test_db_state();
        let conn = db.lock().unwrap();

        // Americano x2 @175, cash, 2024-03-01
        let o = order(
            "o1",
            "2024-03-01 09:12",
            PaymentMethod::Cash,
            &[("Americano", 175.0, 2)],
        );
        apply_order(&conn, &o).unwrap();

        let doc = load_month(&conn, "2024-03").unwrap().expect("month exists");
        let day = doc.daily_stats.get("2024-03-01").expect("day exists");
        assert_eq!(day.total_orders, 1);
        assert_eq!(day.total_revenue, 350.0);
        assert_eq!(day.cash_orders, 1);
        assert_eq!(day.cash_revenue, 350.0);
        assert_eq!(day.card_orders, 0);
        assert_eq!(day.card_revenue, 0.0);
        assert_eq!(day.item_counts.get("Americano"), Some(&2));
    }

    #[test]
    fn reversing_the_only_order_removes_day_and_month() {
        let db = test_db_state();
        let conn = db.lock().unwrap();

        let o = order(
            "o1",
            "2024-03-01 09:12",
            PaymentMethod::Cash,
            &[("Americano", 175.0, 2)],
        );
        apply_order(&conn, &o).unwrap();
        reverse_order(&conn, &o).unwrap();

        assert!(load_month(&conn, "2024-03").unwrap().is_none());
    }

    #[test]
    fn apply_then_reverse_is_an_exact_inverse() {
        let db = test_db_state();
        let conn = db.lock().unwrap();

        let baseline = order(
            "base",
            "2024-03-01 08:00",
            PaymentMethod::Card,
            &[("Latte", 195.0, 1), ("Cookie", 195.0, 3)],
        );
        apply_order(&conn, &baseline).unwrap();
        let before = load_month(&conn, "2024-03").unwrap().unwrap();

        let o = order(
            "o2",
            "2024-03-01 10:30",
            PaymentMethod::Cash,
            &[("V60", 240.0, 1), ("Latte", 195.0, 2)],
        );
        apply_order(&conn, &o).unwrap();
        reverse_order(&conn, &o).unwrap();

        let mut after = load_month(&conn, "2024-03").unwrap().unwrap();
        // timestamps move; everything else must be identical
        after.last_updated = before.last_updated.clone();
        for (date, stats) in after.daily_stats.iter_mut() {
            stats.last_updated = before.daily_stats[date].last_updated.clone();
        }
        assert_eq!(after, before);
    }

    #[test]
    fn cash_and_card_are_routed_separately() {
        let db = test_db_state();
        let conn = db.lock().unwrap();

        let cash = order(
            "c1",
            "2024-03-02 11:00",
            PaymentMethod::Cash,
            &[("Mocha", 230.0, 1)],
        );
        let card = order(
            "c2",
            "2024-03-02 11:05",
            PaymentMethod::Card,
            &[("Mocha", 230.0, 2)],
        );
        apply_order(&conn, &cash).unwrap();
        apply_order(&conn, &card).unwrap();

        let doc = load_month(&conn, "2024-03").unwrap().unwrap();
        let day = &doc.daily_stats["2024-03-02"];
        assert_eq!(day.total_orders, 2);
        assert_eq!(day.cash_orders, 1);
        assert_eq!(day.cash_revenue, 230.0);
        assert_eq!(day.card_orders, 1);
        assert_eq!(day.card_revenue, 460.0);
        assert_eq!(day.item_counts.get("Mocha"), Some(&3));
    }

    #[test]
    fn drained_product_counts_are_removed_not_zeroed() {
        let db = test_db_state();
        let conn = db.lock().unwrap();

        let keep = order(
            "k1",
            "2024-03-03 09:00",
            PaymentMethod::Cash,
            &[("Salep", 195.0, 1)],
        );
        let gone = order(
            "g1",
            "2024-03-03 09:30",
            PaymentMethod::Card,
            &[("Kek", 240.0, 2)],
        );
        apply_order(&conn, &keep).unwrap();
        apply_order(&conn, &gone).unwrap();
        reverse_order(&conn, &gone).unwrap();

        let doc = load_month(&conn, "2024-03").unwrap().unwrap();
        let day = &doc.daily_stats["2024-03-03"];
        assert_eq!(day.total_orders, 1);
        assert!(!day.item_counts.contains_key("Kek"));
        assert_eq!(day.item_counts.get("Salep"), Some(&1));
    }

    #[test]
    fn load_month_propagates_read_failures() {
        let db = test_db_state();
        let conn = db.lock().unwrap();

        conn.execute_batch("DROP TABLE monthly_aggregates").unwrap();

        let err = load_month(&conn, "2024-03").unwrap_err();
        assert!(matches!(err, PosError::Persistence(_)));

        // apply must surface the failure, not clobber the month document
        let o = order(
            "o1",
            "2024-03-01 09:12",
            PaymentMethod::Cash,
            &[("Latte", 195.0, 1)],
        );
        assert!(matches!(
            apply_order(&conn, &o).unwrap_err(),
            PosError::Persistence(_)
        ));
    }

    #[test]
    fn reverse_without_aggregate_is_a_logged_no_op() {
        let db = test_db_state();
        let conn = db.lock().unwrap();

        let o = order(
            "ghost",
            "2024-04-01 12:00",
            PaymentMethod::Cash,
            &[("Latte", 195.0, 1)],
        );
        reverse_order(&conn, &o).unwrap();
        assert!(load_month(&conn, "2024-04").unwrap().is_none());
    }

    #[test]
    fn month_document_roundtrips_through_json() {
        let db = test_db_state();
        let conn = db.lock().unwrap();

        let o = order(
            "o1",
            "2024-03-01 09:12",
            PaymentMethod::Card,
            &[("Türk Kahve", 135.0, 1)],
        );
        apply_order(&conn, &o).unwrap();

        // persisted shape uses camelCase field names
        let raw: String = conn
            .query_row(
                "SELECT data FROM monthly_aggregates WHERE month = '2024-03'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let day = &value["dailyStats"]["2024-03-01"];
        assert_eq!(day["totalOrders"], 1);
        assert_eq!(day["cardRevenue"], 135.0);
        assert_eq!(day["itemCounts"]["Türk Kahve"], 1);
        assert!(day["lastUpdated"].is_string());
    }

    #[test]
    fn top_products_sorts_descending_with_stable_ties() {
        let mut day = DailyAggregate::zeroed("2024-03-01");
        day.item_counts.insert("Latte".into(), 2);
        day.item_counts.insert("Americano".into(), 2);
        day.item_counts.insert("V60".into(), 5);
        day.item_counts.insert("Kek".into(), 1);

        let top = day.top_products(3);
        assert_eq!(
            top,
            vec![
                ("V60".to_string(), 5),
                ("Americano".to_string(), 2),
                ("Latte".to_string(), 2),
            ]
        );
    }
}
