use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use order_pulse::{Dashboard, FilterParams, Snapshot};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable KPI lines and tables
    Text,
    /// Serialized snapshot
    Json,
}

/// Compute order KPIs and chart aggregates for a filter selection.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Order file (.csv, .json, .parquet)
    #[arg(short, long, env = "ORDER_PULSE_DATA")]
    data: PathBuf,

    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last bound (YYYY-MM-DD, taken as midnight)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Restrict to a city; repeat for several
    #[arg(long = "city")]
    cities: Vec<String>,

    /// Restrict to an order status; repeat for several
    #[arg(long = "status")]
    statuses: Vec<String>,

    /// Print the available filter choices instead of running a query
    #[arg(long)]
    options: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl Args {
    fn filter_params(&self) -> FilterParams {
        let mut params = FilterParams::all()
            .with_cities(self.cities.iter().cloned())
            .with_statuses(self.statuses.iter().cloned());
        if let Some(start) = self.start {
            params = params.from_date(start);
        }
        if let Some(end) = self.end {
            params = params.until_date(end);
        }
        params
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let dashboard = Dashboard::open(&args.data)
        .with_context(|| format!("loading orders from {}", args.data.display()))?;

    if args.options {
        let options = dashboard.filter_options();
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    let snapshot = dashboard.query(&args.filter_params());
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Text => print_report(&snapshot),
    }
    Ok(())
}

fn print_report(snap: &Snapshot) {
    let k = &snap.kpis;
    println!("Total Revenue: ${}", money(k.total_revenue));
    println!("Total Orders: {}", k.total_orders);
    println!("Average Order Value: ${}", money(k.aov));
    println!("Repeat Customer Rate: {:.2}%", k.repeat_rate);
    println!("Order Cancellation Rate: {:.2}%", k.cancellation_rate);

    let aggs = &snap.aggregates;

    println!("\nRevenue by day");
    for row in &aggs.revenue_by_day {
        println!("  {}  {:>14}", row.date, money(row.revenue));
    }

    println!("\nOrders by day");
    for row in &aggs.orders_by_day {
        println!("  {}  {:>8}", row.date, row.orders);
    }

    println!("\nRevenue by city");
    for row in &aggs.revenue_by_city {
        println!("  {:<20}{:>14}", row.city, money(row.revenue));
    }

    println!("\nCustomers");
    for row in &aggs.customer_type_counts {
        println!("  {:<20}{:>8}", row.customer_type, row.count);
    }

    println!("\nDelivery time (minutes)");
    match aggs.delivery_time_distribution.summary() {
        Some(s) => {
            println!(
                "  n={}  min={:.1}  q1={:.1}  median={:.1}  q3={:.1}  max={:.1}",
                s.count, s.min, s.q1, s.median, s.q3, s.max
            );
            println!(
                "  whiskers {:.1}..{:.1}, {} outliers",
                s.lower_whisker,
                s.upper_whisker,
                s.outliers.len()
            );
        }
        None => println!("  no delivery times"),
    }
}

/// `1234567.891` → `1,234,567.89`
fn money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}
