use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::loader::LoadError;
use super::model::{CellValue, OrderRecord, OrderTable, RawFrame};

/// Columns every source must carry.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "order_id",
    "order_date",
    "order_value",
    "delivery_time_minutes",
    "order_status",
    "city",
    "customer_id",
];

/// Optional column; absent means every customer is new.
pub const REPEAT_COLUMN: &str = "is_repeat_customer";

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

/// Status text for a row whose status cell is empty, as pandas renders it.
pub const MISSING_STATUS: &str = "nan";

static NULL_CELL: CellValue = CellValue::Null;

/// Turn a raw frame into the canonical table.
///
/// Per-row problems never fail the load: a bad date drops the row, a bad
/// order value becomes zero, a bad delivery time becomes missing.  Only a
/// structurally unusable source (missing columns) is an error.
pub fn clean(frame: RawFrame) -> Result<OrderTable, LoadError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !frame.has_column(col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let has_repeat_flag = frame.has_column(REPEAT_COLUMN);
    if !has_repeat_flag {
        log::info!("No {REPEAT_COLUMN} column; treating every customer as new");
    }

    let total = frame.rows.len();
    let records: Vec<OrderRecord> = frame
        .rows
        .iter()
        .filter_map(|row| clean_row(row, has_repeat_flag))
        .collect();
    let dropped = total - records.len();

    if dropped > 0 {
        log::warn!("Dropped {dropped} of {total} rows with unparseable order_date");
    }
    log::info!("Loaded {} orders", records.len());

    Ok(OrderTable::with_dropped(records, dropped))
}

fn clean_row(row: &BTreeMap<String, CellValue>, has_repeat_flag: bool) -> Option<OrderRecord> {
    let cell = |name: &str| row.get(name).unwrap_or(&NULL_CELL);

    let order_date = parse_timestamp(cell("order_date"))?;

    Some(OrderRecord {
        order_id: cell("order_id").as_text(),
        order_date,
        order_value: finite(cell("order_value")).unwrap_or(0.0),
        delivery_time_minutes: finite(cell("delivery_time_minutes")),
        order_status: cell("order_status")
            .as_text()
            .unwrap_or_else(|| MISSING_STATUS.to_string()),
        is_repeat_customer: has_repeat_flag && parse_flag(cell(REPEAT_COLUMN)),
        city: cell("city").as_text(),
        customer_id: cell("customer_id").as_text(),
    })
}

fn finite(cell: &CellValue) -> Option<f64> {
    cell.as_f64().filter(|v| v.is_finite())
}

/// Parse a timestamp in any of the accepted layouts.  Offsets are
/// normalised to UTC before the zone is discarded.
pub fn parse_timestamp(cell: &CellValue) -> Option<NaiveDateTime> {
    let text = match cell {
        CellValue::Text(s) => s.trim().to_string(),
        CellValue::Integer(i) => i.to_string(),
        CellValue::Float(_) | CellValue::Bool(_) | CellValue::Null => return None,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt.naive_utc());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
    {
        return Some(dt);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Repeat only when the value truncates to exactly one; `2` or `-1` are
/// not repeat customers.
fn parse_flag(cell: &CellValue) -> bool {
    match cell {
        CellValue::Bool(b) => *b,
        CellValue::Integer(i) => *i == 1,
        CellValue::Float(f) => f.trunc() == 1.0,
        CellValue::Text(s) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true")
                || s.eq_ignore_ascii_case("yes")
                || s.parse::<f64>().is_ok_and(|v| v.trunc() == 1.0)
        }
        CellValue::Null => false,
    }
}
