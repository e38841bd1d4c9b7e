use std::collections::BTreeMap;
use std::path::Path;

use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::cleaner::clean;
use super::model::{CellValue, OrderTable, RawFrame};

/// Everything that can stop the canonical table from being built.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read Parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("Unsupported file extension: .{0}")]
    UnsupportedFormat(String),
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("Malformed source: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read and clean an order file in one step.
pub fn load_orders(path: &Path) -> Result<OrderTable, LoadError> {
    let frame = load_file(path)?;
    log::debug!(
        "Read {} raw rows with columns {:?} from {}",
        frame.rows.len(),
        frame.columns,
        path.display()
    );
    clean(frame)
}

/// Read a raw order file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one order per line
/// * `.json`    – `[{ "order_id": ..., "order_date": ..., ... }, ...]`
/// * `.parquet` – any column types; every column is read as text
pub fn load_file(path: &Path) -> Result<RawFrame, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> LoadError + '_ {
    move |source| LoadError::Io {
        path: path.display().to_string(),
        source,
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Short rows are tolerated; their trailing cells count as null.  Cells
/// stay text so identifiers like `007` keep their leading zeros; numeric
/// columns are parsed during cleaning.
fn load_csv(path: &Path) -> Result<RawFrame, LoadError> {
    let file = std::fs::File::open(path).map_err(io_error(path))?;
    read_csv(file)
}

pub(crate) fn read_csv<R: std::io::Read>(source: R) -> Result<RawFrame, LoadError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: BTreeMap<String, CellValue> = columns
            .iter()
            .zip(record.iter())
            .map(|(col, value)| (col.clone(), text_cell(value)))
            .collect();
        rows.push(row);
    }

    Ok(RawFrame { columns, rows })
}

/// Trimmed text; blank is null.
fn text_cell(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        CellValue::Null
    } else {
        CellValue::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "order_id": 1, "order_date": "2024-01-01 10:15:00", "order_value": 250.0, ... },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<RawFrame, LoadError> {
    let text = std::fs::read_to_string(path).map_err(io_error(path))?;
    read_json(&text)
}

pub(crate) fn read_json(text: &str) -> Result<RawFrame, LoadError> {
    let root: JsonValue = serde_json::from_str(text)?;
    let records = root
        .as_array()
        .ok_or_else(|| LoadError::Malformed("expected top-level JSON array".into()))?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| LoadError::Malformed(format!("row {i} is not a JSON object")))?;

        let mut row = BTreeMap::new();
        for (key, val) in obj {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
            row.insert(key.clone(), json_to_cell(val));
        }
        rows.push(row);
    }

    Ok(RawFrame { columns, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of orders.
///
/// Columns may be stored with any Arrow type (timestamps, dates, numbers,
/// strings); each is cast to UTF-8 and cleaned like CSV text.  Works with
/// files written by both **Pandas** (`df.to_parquet()`) and **Polars**.
fn load_parquet(path: &Path) -> Result<RawFrame, LoadError> {
    let file = std::fs::File::open(path).map_err(io_error(path))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut frame = RawFrame::default();

    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();

        if frame.columns.is_empty() {
            frame.columns = schema.fields().iter().map(|f| f.name().clone()).collect();
        }

        let text_columns = batch
            .columns()
            .iter()
            .map(|col| cast(col, &DataType::Utf8))
            .collect::<Result<Vec<_>, _>>()?;

        for row in 0..batch.num_rows() {
            let mut cells = BTreeMap::new();
            for (field, col) in schema.fields().iter().zip(&text_columns) {
                let strings = col
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| {
                        LoadError::Malformed(format!("column {} did not cast to text", field.name()))
                    })?;
                let cell = if strings.is_null(row) {
                    CellValue::Null
                } else {
                    text_cell(strings.value(row))
                };
                cells.insert(field.name().clone(), cell);
            }
            frame.rows.push(cells);
        }
    }

    Ok(frame)
}
