//! Analytics over precomputed daily aggregates.
//!
//! Given an inclusive calendar date range, fetches every daily aggregate the
//! range touches (across month documents) and derives the figures the
//! analytics screen shows: grand totals, the cash/card mix, a chart series
//! with one zero-filled point per calendar day (the chart needs continuity,
//! not just the days that had orders), a stable top-10 product ranking, and
//! per-day breakdown cards with each day's top five products.
//!
//! This is the only aggregation path; there is no rescan-raw-orders
//! fallback.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::aggregates::{self, DailyAggregate};
use crate::datetime;
use crate::db::DbState;
use crate::error::{PosError, PosResult};

/// Maximum span of a custom date range, in calendar days (inclusive).
pub const MAX_RANGE_DAYS: i64 = 186;

/// How many products the overall ranking keeps.
const TOP_PRODUCTS_LIMIT: usize = 10;

/// How many products each per-day breakdown card keeps.
const DAILY_TOP_LIMIT: usize = 5;

/// One product with its summed quantity.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductSales {
    pub product: String,
    pub quantity: i64,
}

/// One per-day breakdown card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBreakdown {
    pub date: String,
    pub total_orders: i64,
    pub total_revenue: f64,
    pub cash_orders: i64,
    pub card_orders: i64,
    pub top_products: Vec<ProductSales>,
}

/// Everything the analytics screen derives from one date range.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeSummary {
    pub start_date: String,
    pub end_date: String,
    pub total_orders: i64,
    pub total_revenue: f64,
    pub cash_orders: i64,
    pub cash_revenue: f64,
    pub card_orders: i64,
    pub card_revenue: f64,
    /// One point per calendar day in range, zero-filled.
    pub series: Vec<DailyAggregate>,
    /// Top products across the whole range, descending quantity, stable.
    pub top_products: Vec<ProductSales>,
    /// Only the days that actually had orders.
    pub daily_breakdown: Vec<DailyBreakdown>,
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// All daily aggregates whose date falls in `[start, end]`, chronological.
pub fn fetch_range(db: &DbState, start: &str, end: &str) -> PosResult<Vec<DailyAggregate>> {
    let start_date = datetime::parse_date(start)?;
    let end_date = datetime::parse_date(end)?;
    if start_date > end_date {
        return Err(PosError::validation(format!(
            "Invalid range: {start} is after {end}"
        )));
    }

    let conn = db.lock()?;
    let mut days = Vec::new();
    for month in datetime::months_in_range(start_date, end_date) {
        if let Some(doc) = aggregates::load_month(&conn, &month)? {
            // BTreeMap iteration keeps days in date order within the month
            for (date, stats) in doc.daily_stats {
                if date.as_str() >= start && date.as_str() <= end {
                    days.push(stats);
                }
            }
        }
    }
    Ok(days)
}

// ---------------------------------------------------------------------------
// Derivations
// ---------------------------------------------------------------------------

/// Derive the full analytics view for `[start, end]` from its fetched days.
pub fn summarize(days: &[DailyAggregate], start: &str, end: &str) -> PosResult<RangeSummary> {
    let start_date = datetime::parse_date(start)?;
    let end_date = datetime::parse_date(end)?;

    let mut total_orders = 0;
    let mut total_revenue = 0.0;
    let mut cash_orders = 0;
    let mut cash_revenue = 0.0;
    let mut card_orders = 0;
    let mut card_revenue = 0.0;
    for day in days {
        total_orders += day.total_orders;
        total_revenue += day.total_revenue;
        cash_orders += day.cash_orders;
        cash_revenue += day.cash_revenue;
        card_orders += day.card_orders;
        card_revenue += day.card_revenue;
    }

    let by_date: HashMap<&str, &DailyAggregate> =
        days.iter().map(|d| (d.date.as_str(), d)).collect();

    // continuity matters: emit a zero point for days with no aggregate
    let series = datetime::days_in_range(start_date, end_date)
        .into_iter()
        .map(|date| {
            let key = datetime::format_date(date);
            by_date
                .get(key.as_str())
                .map(|d| (*d).clone())
                .unwrap_or_else(|| DailyAggregate::zeroed(&key))
        })
        .collect();

    let daily_breakdown = days
        .iter()
        .map(|day| DailyBreakdown {
            date: day.date.clone(),
            total_orders: day.total_orders,
            total_revenue: day.total_revenue,
            cash_orders: day.cash_orders,
            card_orders: day.card_orders,
            top_products: day
                .top_products(DAILY_TOP_LIMIT)
                .into_iter()
                .map(|(product, quantity)| ProductSales { product, quantity })
                .collect(),
        })
        .collect();

    Ok(RangeSummary {
        start_date: start.to_string(),
        end_date: end.to_string(),
        total_orders,
        total_revenue,
        cash_orders,
        cash_revenue,
        card_orders,
        card_revenue,
        series,
        top_products: top_products(days, TOP_PRODUCTS_LIMIT),
        daily_breakdown,
    })
}

/// Product ranking by summed quantity across the range. Descending; ties
/// keep first-encountered order (days chronologically, then stored order
/// within a day) via a stable sort over the accumulation order.
pub fn top_products(days: &[DailyAggregate], limit: usize) -> Vec<ProductSales> {
    let mut order_of_first_encounter: Vec<ProductSales> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for day in days {
        for (product, quantity) in &day.item_counts {
            match index.get(product) {
                Some(&i) => order_of_first_encounter[i].quantity += quantity,
                None => {
                    index.insert(product.clone(), order_of_first_encounter.len());
                    order_of_first_encounter.push(ProductSales {
                        product: product.clone(),
                        quantity: *quantity,
                    });
                }
            }
        }
    }

    order_of_first_encounter.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    order_of_first_encounter.truncate(limit);
    order_of_first_encounter
}

// ---------------------------------------------------------------------------
// Date-range presets and clamping
// ---------------------------------------------------------------------------

/// Which endpoint a custom-range edit touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEdit {
    Start,
    End,
}

/// Compute a preset's `[start, end]` anchored to today's Istanbul date.
pub fn preset_range(preset: &str) -> PosResult<(NaiveDate, NaiveDate)> {
    preset_range_from(datetime::today_istanbul(), preset)
}

fn preset_range_from(today: NaiveDate, preset: &str) -> PosResult<(NaiveDate, NaiveDate)> {
    match preset {
        "today" => Ok((today, today)),
        "last7" => Ok((today - Duration::days(6), today)),
        "last30" => Ok((today - Duration::days(29), today)),
        "yearToDate" => {
            let jan1 = NaiveDate::from_ymd_opt(today.year(), 1, 1).expect("January 1st exists");
            Ok((jan1, today))
        }
        other => Err(PosError::validation(format!("Unknown preset: {other}"))),
    }
}

/// Clamp a custom range edit to [`MAX_RANGE_DAYS`]. When the edited endpoint
/// pushes the inclusive span past the cap, the opposite endpoint is pulled
/// in to exactly the boundary.
pub fn clamp_range(start: NaiveDate, end: NaiveDate, edited: RangeEdit) -> (NaiveDate, NaiveDate) {
    let span = (end - start).num_days() + 1;
    if span <= MAX_RANGE_DAYS {
        return (start, end);
    }
    match edited {
        RangeEdit::Start => (start, start + Duration::days(MAX_RANGE_DAYS - 1)),
        RangeEdit::End => (end - Duration::days(MAX_RANGE_DAYS - 1), end),
    }
}
