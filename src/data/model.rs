use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

// ---------------------------------------------------------------------------
// CellValue – a single raw cell as read from the source file
// ---------------------------------------------------------------------------

/// A dynamically-typed cell, before any cleaning is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Numeric interpretation: numbers as-is, text parsed leniently.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Bool(_) | CellValue::Null => None,
        }
    }

    /// Rendered text, `None` for null cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// RawFrame – rows as read, keyed by column name
// ---------------------------------------------------------------------------

/// Column-tagged rows straight out of a reader. Cells for a column a row
/// does not carry are simply absent from that row's map.
#[derive(Debug, Clone, Default)]
pub struct RawFrame {
    /// Column names in source order.
    pub columns: Vec<String>,
    pub rows: Vec<BTreeMap<String, CellValue>>,
}

impl RawFrame {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

// ---------------------------------------------------------------------------
// OrderRecord – one cleaned transaction
// ---------------------------------------------------------------------------

/// A single cleaned order row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub order_id: Option<String>,
    /// Always present: rows with an unparseable date never get this far.
    pub order_date: NaiveDateTime,
    /// Finite; unparseable source values become `0.0`.
    pub order_value: f64,
    /// `None` is the missing marker, distinct from zero.
    pub delivery_time_minutes: Option<f64>,
    pub order_status: String,
    pub is_repeat_customer: bool,
    pub city: Option<String>,
    pub customer_id: Option<String>,
}

impl OrderRecord {
    /// Calendar day of the order, time-of-day discarded.
    pub fn order_day(&self) -> NaiveDate {
        self.order_date.date()
    }

    pub fn is_cancelled(&self) -> bool {
        self.order_status == CANCELLED_STATUS
    }
}

/// Status value treated specially by the cancellation rate.
pub const CANCELLED_STATUS: &str = "Cancelled";

// ---------------------------------------------------------------------------
// OrderTable – the canonical table
// ---------------------------------------------------------------------------

/// The cleaned, immutable record set. Rows can only be supplied at
/// construction; nothing hands out mutable access afterwards.
#[derive(Debug, Clone, Default)]
pub struct OrderTable {
    records: Vec<OrderRecord>,
    /// Rows discarded during cleaning because their date did not parse.
    dropped_rows: usize,
}

impl OrderTable {
    pub fn new(records: Vec<OrderRecord>) -> Self {
        Self::with_dropped(records, 0)
    }

    pub(crate) fn with_dropped(records: Vec<OrderRecord>, dropped_rows: usize) -> Self {
        OrderTable {
            records,
            dropped_rows,
        }
    }

    pub fn records(&self) -> &[OrderRecord] {
        &self.records
    }

    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest order timestamps, `None` for an empty table.
    pub fn date_bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.records.first()?.order_date;
        Some(self.records.iter().fold((first, first), |(lo, hi), r| {
            (lo.min(r.order_date), hi.max(r.order_date))
        }))
    }

    /// Distinct cities in order of first appearance.
    pub fn cities(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.records
            .iter()
            .filter_map(|r| r.city.as_deref())
            .filter(|c| seen.insert(*c))
            .map(str::to_string)
            .collect()
    }

    /// Distinct statuses, sorted.
    pub fn statuses(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.order_status.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
