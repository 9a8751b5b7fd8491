//! Analytics commands: range statistics and CSV export.

use serde::Deserialize;

use crate::analytics::{self, RangeEdit};
use crate::datetime;
use crate::db::DbState;
use crate::export;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RangePayload {
    #[serde(default, alias = "start_date", alias = "start")]
    start_date: Option<String>,
    #[serde(default, alias = "end_date", alias = "end")]
    end_date: Option<String>,
    #[serde(default)]
    preset: Option<String>,
    /// Which endpoint a custom edit touched ("start" or "end"); decides
    /// which side gets pulled in when the span exceeds the cap.
    #[serde(default)]
    edited: Option<String>,
}

/// Resolve a payload into an effective `[start, end]` pair: either a named
/// preset anchored to today, or an explicit custom range clamped to the
/// maximum span.
fn resolve_range(arg0: Option<serde_json::Value>) -> Result<(String, String), String> {
    let payload: RangePayload = match arg0 {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid range payload: {e}"))?,
        None => RangePayload::default(),
    };

    if let Some(preset) = payload.preset.as_deref() {
        let (start, end) = analytics::preset_range(preset).map_err(|e| e.to_string())?;
        return Ok((datetime::format_date(start), datetime::format_date(end)));
    }

    let start = payload.start_date.ok_or("Missing startDate")?;
    let end = payload.end_date.ok_or("Missing endDate")?;
    let start_date = datetime::parse_date(&start).map_err(|e| e.to_string())?;
    let end_date = datetime::parse_date(&end).map_err(|e| e.to_string())?;
    if start_date > end_date {
        return Err(format!("Invalid range: {start} is after {end}"));
    }

    let edited = match payload.edited.as_deref() {
        Some("start") => RangeEdit::Start,
        _ => RangeEdit::End,
    };
    let (start_date, end_date) = analytics::clamp_range(start_date, end_date, edited);
    Ok((
        datetime::format_date(start_date),
        datetime::format_date(end_date),
    ))
}

/// Handle analytics:get-range. Full derivations for a date range.
pub async fn analytics_get_range(
    arg0: Option<serde_json::Value>,
    db: &DbState,
) -> Result<serde_json::Value, String> {
    let (start, end) = resolve_range(arg0)?;
    let days = analytics::fetch_range(db, &start, &end).map_err(|e| e.to_string())?;
    let summary = analytics::summarize(&days, &start, &end).map_err(|e| e.to_string())?;
    serde_json::to_value(summary).map_err(|e| format!("serialize summary: {e}"))
}

/// Handle analytics:export-csv. CSV content plus its download filename.
pub async fn analytics_export_csv(
    arg0: Option<serde_json::Value>,
    db: &DbState,
) -> Result<serde_json::Value, String> {
    let (start, end) = resolve_range(arg0)?;
    let days = analytics::fetch_range(db, &start, &end).map_err(|e| e.to_string())?;
    let summary = analytics::summarize(&days, &start, &end).map_err(|e| e.to_string())?;
    Ok(serde_json::json!({
        "filename": export::csv_filename(&start, &end),
        "content": export::build_csv(&summary),
    }))
}
