use std::io::Write;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampSecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use order_pulse::{Dashboard, FilterParams, FilteredView, LoadError, compute_kpis};
use parquet::arrow::ArrowWriter;
use tempfile::NamedTempFile;

const HEADER: &str = "order_id,order_date,order_value,delivery_time_minutes,order_status,city,customer_id,is_repeat_customer";

fn write_temp(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn orders_csv() -> NamedTempFile {
    write_temp(
        ".csv",
        &format!(
            "{HEADER}\n\
             1,2024-01-01 09:00:00,100,30,Completed,Mumbai,C1,1\n\
             2,2024-01-01 18:30:00,250.5,45,Completed,Delhi,C2,0\n\
             3,2024-01-02 11:00:00,oops,,Cancelled,Mumbai,C1,1\n\
             4,garbage,999,20,Completed,Delhi,C3,0\n\
             5,2024-01-03 08:15:00,75,bad,Completed,Pune,C4,0\n\
             6,2024-01-03 20:00:00,40,25,Cancelled,Delhi,C5,1\n"
        ),
    )
}

#[test]
fn three_row_cancelled_scenario() {
    let file = write_temp(
        ".csv",
        "order_id,order_date,order_value,delivery_time_minutes,order_status,city,customer_id\n\
         1,2024-01-01,10,30,Completed,Pune,C1\n\
         2,2024-01-02,20,30,Cancelled,Pune,C2\n\
         3,2024-01-03,30,30,Completed,Pune,C3\n",
    );
    let dash = Dashboard::open(file.path()).unwrap();
    let snap = dash.query(&FilterParams::all().with_statuses(["Cancelled"]));

    assert_eq!(snap.kpis.total_orders, 1);
    assert_eq!(snap.kpis.total_revenue, 20.0);
    assert_eq!(snap.kpis.cancellation_rate, 100.0);
}

#[test]
fn undated_rows_never_reach_results() {
    let file = orders_csv();
    let dash = Dashboard::open(file.path()).unwrap();

    assert_eq!(dash.table().len(), 5);
    assert_eq!(dash.table().dropped_rows(), 1);

    let snap = dash.query(&FilterParams::all());
    assert_eq!(snap.kpis.total_orders, 5);
    // order 4 carried 999 and must not be counted anywhere
    assert_eq!(snap.kpis.total_revenue, 100.0 + 250.5 + 0.0 + 75.0 + 40.0);
    let daily_total: f64 = snap.aggregates.revenue_by_day.iter().map(|d| d.revenue).sum();
    assert_eq!(daily_total, snap.kpis.total_revenue);
    assert!(!snap.aggregates.delivery_time_distribution.values().contains(&20.0));
}

#[test]
fn orders_by_day_sum_matches_total_orders() {
    let file = write_temp(
        ".csv",
        &format!(
            "{HEADER}\n\
             1,2024-01-01 09:00:00,100,30,Completed,Mumbai,C1,1\n\
             2,2024-01-01 18:30:00,250.5,45,Completed,Delhi,C2,0\n\
             ,2024-01-02 10:00:00,60,20,Completed,Delhi,C6,0\n\
             3,2024-01-02 11:00:00,oops,,Cancelled,Mumbai,C1,1\n\
             5,2024-01-03 08:15:00,75,bad,Completed,Pune,C4,0\n\
             6,2024-01-03 20:00:00,40,25,Cancelled,Delhi,C5,1\n"
        ),
    );
    let dash = Dashboard::open(file.path()).unwrap();
    assert_eq!(dash.table().len(), 6);
    assert_eq!(dash.query(&FilterParams::all()).kpis.total_orders, 5);

    for params in [
        FilterParams::all(),
        FilterParams::all().with_cities(["Delhi"]),
        FilterParams::all().from_date(date("2024-01-02")),
        FilterParams::all().with_statuses(["Completed"]),
    ] {
        let snap = dash.query(&params);
        let per_day: usize = snap.aggregates.orders_by_day.iter().map(|d| d.orders).sum();
        assert_eq!(per_day, snap.kpis.total_orders, "params {params:?}");
    }
}

#[test]
fn leading_zero_ids_stay_distinct() {
    let file = write_temp(
        ".csv",
        &format!(
            "{HEADER}\n\
             007,2024-01-01,10,30,Completed,Pune,0042,1\n\
             7,2024-01-01,20,30,Completed,Pune,42,0\n\
             A9,2024-01-02,30,30,Completed,Pune,C9,0\n"
        ),
    );
    let dash = Dashboard::open(file.path()).unwrap();
    let snap = dash.query(&FilterParams::all());

    assert_eq!(snap.kpis.total_orders, 3);
    assert!((snap.kpis.repeat_rate - 100.0 / 3.0).abs() < 1e-9);
    let per_day: Vec<usize> = snap.aggregates.orders_by_day.iter().map(|d| d.orders).collect();
    assert_eq!(per_day, vec![2, 1]);
}

#[test]
fn kpi_order_count_matches_filtered_view() {
    let file = orders_csv();
    let dash = Dashboard::open(file.path()).unwrap();
    let params = FilterParams::all().with_cities(["Mumbai", "Delhi"]);

    let view = FilteredView::new(dash.table(), &params);
    let distinct: std::collections::HashSet<_> = view.iter().map(|r| r.order_id.clone()).collect();

    assert_eq!(dash.query(&params).kpis.total_orders, distinct.len());
    assert_eq!(compute_kpis(&view), dash.query(&params).kpis);
}

#[test]
fn filtered_kpis_and_aggregates() {
    let file = orders_csv();
    let dash = Dashboard::open(file.path()).unwrap();
    let snap = dash.query(
        &FilterParams::all()
            .from_date(date("2024-01-01"))
            .until_date(date("2024-01-03"))
            .with_cities(["Mumbai", "Delhi"]),
    );

    // orders 1, 2, 3; order 6 is after midnight of the 3rd
    assert_eq!(snap.matched_rows, 3);
    assert_eq!(snap.kpis.total_revenue, 350.5);
    assert_eq!(snap.kpis.repeat_rate, 50.0);
    assert!((snap.kpis.cancellation_rate - 100.0 / 3.0).abs() < 1e-9);

    let cities: Vec<&str> = snap
        .aggregates
        .revenue_by_city
        .iter()
        .map(|c| c.city.as_str())
        .collect();
    assert_eq!(cities, vec!["Delhi", "Mumbai"]);
    assert_eq!(snap.aggregates.delivery_time_distribution.values(), &[30.0, 45.0]);
}

#[test]
fn empty_selection_is_all_zero() {
    let file = orders_csv();
    let dash = Dashboard::open(file.path()).unwrap();
    let snap = dash.query(&FilterParams::all().with_cities(["Kolkata"]));

    assert_eq!(snap.matched_rows, 0);
    assert_eq!(snap.kpis.total_revenue, 0.0);
    assert_eq!(snap.kpis.total_orders, 0);
    assert_eq!(snap.kpis.aov, 0.0);
    assert_eq!(snap.kpis.repeat_rate, 0.0);
    assert_eq!(snap.kpis.cancellation_rate, 0.0);
    assert!(snap.aggregates.is_empty());
}

#[test]
fn missing_repeat_column_means_zero_repeat_rate() {
    let file = write_temp(
        ".csv",
        "order_id,order_date,order_value,delivery_time_minutes,order_status,city,customer_id\n\
         1,2024-01-01,10,30,Completed,Pune,C1\n\
         2,2024-01-02,20,30,Completed,Delhi,C1\n",
    );
    let dash = Dashboard::open(file.path()).unwrap();

    for params in [FilterParams::all(), FilterParams::all().with_cities(["Delhi"])] {
        assert_eq!(dash.query(&params).kpis.repeat_rate, 0.0);
    }
    let types = dash.query(&FilterParams::all()).aggregates.customer_type_counts;
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].customer_type, "New Customer");
    assert_eq!(types[0].count, 2);
}

#[test]
fn missing_required_column_is_fatal() {
    let file = write_temp(".csv", "order_id,order_date\n1,2024-01-01\n");
    let err = Dashboard::open(file.path()).unwrap_err();
    assert!(matches!(err, LoadError::MissingColumns(ref cols) if cols.contains(&"city".to_string())));
}

#[test]
fn json_source() {
    let file = write_temp(
        ".json",
        r#"[
            {"order_id": 1, "order_date": "2024-03-01T10:00:00", "order_value": 12.5,
             "delivery_time_minutes": 22, "order_status": "Completed", "city": "Pune",
             "customer_id": "A", "is_repeat_customer": true},
            {"order_id": 2, "order_date": null, "order_value": 99,
             "delivery_time_minutes": 22, "order_status": "Completed", "city": "Pune",
             "customer_id": "B", "is_repeat_customer": false},
            {"order_id": 3, "order_date": "2024-03-02", "order_value": "7.5",
             "delivery_time_minutes": null, "order_status": "Cancelled", "city": null,
             "customer_id": "C", "is_repeat_customer": 0}
        ]"#,
    );
    let dash = Dashboard::open(file.path()).unwrap();
    let snap = dash.query(&FilterParams::all());

    assert_eq!(snap.matched_rows, 2);
    assert_eq!(snap.kpis.total_revenue, 20.0);
    assert_eq!(snap.kpis.repeat_rate, 50.0);
    assert_eq!(snap.aggregates.revenue_by_city.len(), 1);
    assert_eq!(snap.aggregates.delivery_time_distribution.values(), &[22.0]);
}

#[test]
fn parquet_source_with_typed_columns() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("order_id", DataType::Int64, false),
        Field::new("order_date", DataType::Timestamp(TimeUnit::Second, None), true),
        Field::new("order_value", DataType::Float64, true),
        Field::new("delivery_time_minutes", DataType::Float64, true),
        Field::new("order_status", DataType::Utf8, true),
        Field::new("city", DataType::Utf8, true),
        Field::new("customer_id", DataType::Utf8, true),
    ]));
    let jan_1 = date("2024-01-01").and_hms_opt(10, 0, 0).unwrap().and_utc().timestamp();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![1, 2, 3])),
        Arc::new(TimestampSecondArray::from(vec![Some(jan_1), None, Some(jan_1 + 86_400)])),
        Arc::new(Float64Array::from(vec![Some(10.0), Some(20.0), None])),
        Arc::new(Float64Array::from(vec![Some(30.0), None, None])),
        Arc::new(StringArray::from(vec!["Completed", "Completed", "Cancelled"])),
        Arc::new(StringArray::from(vec!["Pune", "Pune", "Delhi"])),
        Arc::new(StringArray::from(vec!["A", "B", "C"])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

    let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
    let mut writer = ArrowWriter::try_new(std::fs::File::create(file.path()).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let dash = Dashboard::open(file.path()).unwrap();
    assert_eq!(dash.table().len(), 2);

    let snap = dash.query(&FilterParams::all());
    assert_eq!(snap.kpis.total_revenue, 10.0);
    assert_eq!(snap.kpis.cancellation_rate, 50.0);
    let days: Vec<String> = snap
        .aggregates
        .orders_by_day
        .iter()
        .map(|d| d.date.to_string())
        .collect();
    assert_eq!(days, vec!["2024-01-01", "2024-01-02"]);

    let opts = dash.filter_options();
    assert_eq!(opts.cities, vec!["Pune", "Delhi"]);
}
