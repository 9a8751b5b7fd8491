//! CSV export of an analytics date range.
//!
//! One row per calendar day in the selected range, zero-order days
//! included, plus a trailing TOPLAM row. Every cell is quoted, amounts
//! carry two decimals, and the output starts with a UTF-8 byte-order mark
//! so spreadsheet applications pick up the Turkish characters.

use crate::analytics::{ProductSales, RangeSummary};

/// App identifier used in the export filename.
const APP_NAME: &str = "gato-pos";

/// UTF-8 byte-order mark.
const BOM: &str = "\u{feff}";

const HEADER: &[&str] = &[
    "Tarih",
    "Toplam Sipariş",
    "Toplam Gelir (TL)",
    "Nakit Sipariş",
    "Nakit Gelir (TL)",
    "Kart Sipariş",
    "Kart Gelir (TL)",
    "En Çok Satılan Ürünler",
];

/// `gato-pos-analytics-<start>-<end>.csv`
pub fn csv_filename(start: &str, end: &str) -> String {
    format!("{APP_NAME}-analytics-{start}-{end}.csv")
}

/// Render the whole range as CSV text.
pub fn build_csv(summary: &RangeSummary) -> String {
    let mut out = String::from(BOM);
    push_row(&mut out, HEADER.iter().map(|s| s.to_string()));

    for day in &summary.series {
        let products = day
            .top_products(usize::MAX)
            .into_iter()
            .map(|(product, quantity)| ProductSales { product, quantity })
            .collect::<Vec<_>>();
        push_row(
            &mut out,
            [
                day.date.clone(),
                day.total_orders.to_string(),
                format!("{:.2}", day.total_revenue),
                day.cash_orders.to_string(),
                format!("{:.2}", day.cash_revenue),
                day.card_orders.to_string(),
                format!("{:.2}", day.card_revenue),
                format_products(&products),
            ],
        );
    }

    push_row(
        &mut out,
        [
            "TOPLAM".to_string(),
            summary.total_orders.to_string(),
            format!("{:.2}", summary.total_revenue),
            summary.cash_orders.to_string(),
            format!("{:.2}", summary.cash_revenue),
            summary.card_orders.to_string(),
            format!("{:.2}", summary.card_revenue),
            format_products(&summary.top_products),
        ],
    );

    out
}

/// `name (qty); name (qty); ...`, empty for zero-order days.
fn format_products(products: &[ProductSales]) -> String {
    products
        .iter()
        .map(|p| format!("{} ({})", p.product, p.quantity))
        .collect::<Vec<_>>()
        .join("; ")
}

fn push_row(out: &mut String, cells: impl IntoIterator<Item = String>) {
    let quoted: Vec<String> = cells.into_iter().map(|c| quote(&c)).collect();
    out.push_str(&quoted.join(","));
    out.push('\n');
}

/// Quote a cell, doubling any embedded quotes.
fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::summarize;
    use crate::cart::OrderItem;
    use crate::db::test_db_state;
    use crate::orders::{self, OrderDraft, PaymentMethod};

    fn summary_for(db: &crate::db::DbState, start: &str, end: &str) -> RangeSummary {
        let days = crate::analytics::fetch_range(db, start, end).unwrap();
        summarize(&days, start, end).unwrap()
    }

    fn place_order(db: &crate::db::DbState, date: &str, method: PaymentMethod, items: &[(&str, f64, i64)]) {
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
        orders::create(
            db,
            OrderDraft {
                items,
                total,
                payment_method: method,
                date: date.to_string(),
                note: None,
            },
        )
        .unwrap();
    }

    #[test]
    fn csv_starts_with_bom_and_header() {
        let db = test_db_state();
        let csv = build_csv(&summary_for(&db, "2024-03-01", "2024-03-01"));

        assert!(csv.starts_with('\u{feff}'));
        let first_line = csv.trim_start_matches('\u{feff}').lines().next().unwrap();
        assert!(first_line.starts_with("\"Tarih\",\"Toplam Sipariş\""));
        assert!(first_line.ends_with("\"En Çok Satılan Ürünler\""));
    }

    #[test]
    fn one_row_per_day_plus_header_and_total() {
        let db = test_db_state();
        place_order(
            &db,
            "2024-03-02 09:00",
            PaymentMethod::Cash,
            &[("Americano", 175.0, 2)],
        );

        let csv = build_csv(&summary_for(&db, "2024-03-01", "2024-03-04"));
        let lines: Vec<&str> = csv.trim_start_matches('\u{feff}').lines().collect();
        // header + 4 calendar days + TOPLAM
        assert_eq!(lines.len(), 6);
        assert!(lines[1].starts_with("\"2024-03-01\",\"0\",\"0.00\""));
        assert!(lines[2].starts_with("\"2024-03-02\",\"1\",\"350.00\",\"1\",\"350.00\",\"0\",\"0.00\""));
        assert!(lines[2].contains("\"Americano (2)\""));
        assert!(lines[5].starts_with("\"TOPLAM\",\"1\",\"350.00\""));
    }

    #[test]
    fn amounts_carry_two_decimals() {
        let db = test_db_state();
        place_order(
            &db,
            "2024-03-01 09:00",
            PaymentMethod::Card,
            &[("Latte", 195.0, 1)],
        );

        let csv = build_csv(&summary_for(&db, "2024-03-01", "2024-03-01"));
        assert!(csv.contains("\"195.00\""));
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn filename_matches_pattern() {
        assert_eq!(
            csv_filename("2024-03-01", "2024-03-31"),
            "gato-pos-analytics-2024-03-01-2024-03-31.csv"
        );
    }
}
