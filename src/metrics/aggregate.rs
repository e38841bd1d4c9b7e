use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::filter::FilteredView;

pub const REPEAT_LABEL: &str = "Repeat Customer";
pub const NEW_LABEL: &str = "New Customer";

/// Whisker reach as a multiple of the interquartile range.
const WHISKER_IQR: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyOrders {
    pub date: NaiveDate,
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityRevenue {
    pub city: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerTypeCount {
    pub customer_type: String,
    pub count: usize,
}

/// Delivery times of a view with missing entries removed, in view order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DeliveryDistribution(pub Vec<f64>);

/// Box-plot figures for a delivery distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// Chart-ready tables for one view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregates {
    /// Ascending by date.
    pub revenue_by_day: Vec<DailyRevenue>,
    /// Ascending by date.
    pub orders_by_day: Vec<DailyOrders>,
    /// Descending by revenue, ties by city name.
    pub revenue_by_city: Vec<CityRevenue>,
    /// Descending by count; only types that occur.
    pub customer_type_counts: Vec<CustomerTypeCount>,
    pub delivery_time_distribution: DeliveryDistribution,
}

impl Aggregates {
    pub fn is_empty(&self) -> bool {
        self.revenue_by_day.is_empty()
            && self.orders_by_day.is_empty()
            && self.revenue_by_city.is_empty()
            && self.customer_type_counts.is_empty()
            && self.delivery_time_distribution.0.is_empty()
    }
}

/// Build all five aggregates.  Each one is computed on its own, so an
/// empty result for one (say, no delivery times at all) leaves the others
/// untouched.
pub fn build_aggregates(view: &FilteredView<'_>) -> Aggregates {
    Aggregates {
        revenue_by_day: revenue_by_day(view),
        orders_by_day: orders_by_day(view),
        revenue_by_city: revenue_by_city(view),
        customer_type_counts: customer_type_counts(view),
        delivery_time_distribution: delivery_time_distribution(view),
    }
}

pub fn revenue_by_day(view: &FilteredView<'_>) -> Vec<DailyRevenue> {
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in view.iter() {
        *days.entry(record.order_day()).or_default() += record.order_value;
    }
    days.into_iter()
        .map(|(date, revenue)| DailyRevenue { date, revenue })
        .collect()
}

/// Rows without an `order_id` are not counted.
pub fn orders_by_day(view: &FilteredView<'_>) -> Vec<DailyOrders> {
    let mut days: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for record in view.iter().filter(|r| r.order_id.is_some()) {
        *days.entry(record.order_day()).or_default() += 1;
    }
    days.into_iter()
        .map(|(date, orders)| DailyOrders { date, orders })
        .collect()
}

/// Rows without a city are left out.
pub fn revenue_by_city(view: &FilteredView<'_>) -> Vec<CityRevenue> {
    let mut cities: HashMap<&str, f64> = HashMap::new();
    for record in view.iter() {
        if let Some(city) = record.city.as_deref() {
            *cities.entry(city).or_default() += record.order_value;
        }
    }
    let mut out: Vec<CityRevenue> = cities
        .into_iter()
        .map(|(city, revenue)| CityRevenue {
            city: city.to_string(),
            revenue,
        })
        .collect();
    out.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.city.cmp(&b.city))
    });
    out
}

pub fn customer_type_counts(view: &FilteredView<'_>) -> Vec<CustomerTypeCount> {
    let repeat = view.iter().filter(|r| r.is_repeat_customer).count();
    let new = view.len() - repeat;

    let mut out: Vec<CustomerTypeCount> = [(REPEAT_LABEL, repeat), (NEW_LABEL, new)]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(label, count)| CustomerTypeCount {
            customer_type: label.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.customer_type.cmp(&b.customer_type))
    });
    out
}

pub fn delivery_time_distribution(view: &FilteredView<'_>) -> DeliveryDistribution {
    DeliveryDistribution(view.iter().filter_map(|r| r.delivery_time_minutes).collect())
}

impl DeliveryDistribution {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Quartiles, whiskers and outliers; `None` when there is nothing to
    /// summarise.
    pub fn summary(&self) -> Option<BoxSummary> {
        if self.0.is_empty() {
            return None;
        }

        let mut sorted = self.0.clone();
        sorted.sort_by(f64::total_cmp);

        let q1 = percentile(&sorted, 25.0);
        let median = percentile(&sorted, 50.0);
        let q3 = percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let low_fence = q1 - WHISKER_IQR * iqr;
        let high_fence = q3 + WHISKER_IQR * iqr;

        let inside = sorted.iter().copied().filter(|v| (low_fence..=high_fence).contains(v));
        let lower_whisker = inside.clone().fold(f64::INFINITY, f64::min);
        let upper_whisker = inside.fold(f64::NEG_INFINITY, f64::max);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| !(low_fence..=high_fence).contains(v))
            .collect();

        Some(BoxSummary {
            count: sorted.len(),
            min: sorted[0],
            q1,
            median,
            q3,
            max: sorted[sorted.len() - 1],
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }
}

/// Linear-interpolation percentile over pre-sorted values (NumPy default).
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let rank = (p / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(n - 1);
    let frac = rank - lower as f64;

    sorted[lower] * (1.0 - frac) + sorted[upper] * frac
}
