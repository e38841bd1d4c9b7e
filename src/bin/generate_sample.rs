use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate, NaiveTime};
use parquet::arrow::ArrowWriter;

const COLUMNS: [&str; 8] = [
    "order_id",
    "order_date",
    "order_value",
    "delivery_time_minutes",
    "order_status",
    "is_repeat_customer",
    "city",
    "customer_id",
];

const CITIES: [(&str, f64); 5] = [
    ("Mumbai", 1.3),
    ("Delhi", 1.2),
    ("Bengaluru", 1.1),
    ("Pune", 0.9),
    ("Jaipur", 0.7),
];

const ORDERS: usize = 1200;
const CUSTOMERS: u64 = 400;
const DAYS: u64 = 60;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One order as text cells, in `COLUMNS` order.  Roughly one row in a
/// hundred gets a damaged date, value or delivery time.
fn generate_order(id: usize, first_day: NaiveDate, rng: &mut SimpleRng) -> [String; 8] {
    let day = first_day + Duration::days(rng.below(DAYS) as i64);
    let minute = rng.below(24 * 60);
    let stamp = day.and_time(NaiveTime::MIN) + Duration::minutes(minute as i64);

    let (city, weight) = CITIES[rng.below(CITIES.len() as u64) as usize];
    let value = rng.gauss(450.0 * weight, 120.0).max(49.0);
    let delivery = rng.gauss(35.0, 8.0).max(8.0) + if rng.next_f64() < 0.03 { 90.0 } else { 0.0 };
    let status = if rng.next_f64() < 0.08 { "Cancelled" } else { "Completed" };
    let customer = rng.below(CUSTOMERS);
    let repeat = u8::from(customer % 3 == 0 || rng.next_f64() < 0.2);

    let mut date_cell = stamp.format("%Y-%m-%d %H:%M:%S").to_string();
    let mut value_cell = format!("{value:.2}");
    let mut delivery_cell = format!("{delivery:.0}");
    match rng.below(100) {
        0 => date_cell = "not-a-date".to_string(),
        1 => value_cell = "N/A".to_string(),
        2 => delivery_cell = String::new(),
        _ => {}
    }

    [
        format!("{}", 100_000 + id),
        date_cell,
        value_cell,
        delivery_cell,
        status.to_string(),
        repeat.to_string(),
        city.to_string(),
        format!("CUST-{customer:04}"),
    ]
}

fn write_csv(path: &Path, rows: &[[String; 8]]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV output")?;
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// All columns are written as text so damaged cells survive the trip.
fn write_parquet(path: &Path, rows: &[[String; 8]]) -> Result<()> {
    let schema = Arc::new(Schema::new(
        COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));

    let arrays: Vec<ArrayRef> = (0..COLUMNS.len())
        .map(|col| {
            let values = rows
                .iter()
                .map(|row| Some(row[col].as_str()).filter(|s| !s.is_empty()));
            Arc::new(StringArray::from_iter(values)) as ArrayRef
        })
        .collect();

    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_orders.csv"));

    let mut rng = SimpleRng::new(42);
    let first_day = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;
    let rows: Vec<[String; 8]> = (0..ORDERS)
        .map(|id| generate_order(id, first_day, &mut rng))
        .collect();

    let is_parquet = output_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet") || e.eq_ignore_ascii_case("pq"));
    if is_parquet {
        write_parquet(&output_path, &rows)?;
    } else {
        write_csv(&output_path, &rows)?;
    }

    println!("Wrote {} orders to {}", rows.len(), output_path.display());
    Ok(())
}
