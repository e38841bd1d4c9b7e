use std::collections::HashSet;

use serde::Serialize;

use crate::data::filter::FilteredView;

/// The five headline business metrics for one view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total_revenue: f64,
    /// Distinct `order_id` values.
    pub total_orders: usize,
    /// Average order value; `0` when there are no orders.
    pub aov: f64,
    /// Percent of distinct customers flagged as repeat.
    pub repeat_rate: f64,
    /// Cancelled rows per distinct order, as a percentage.
    pub cancellation_rate: f64,
}

/// Reduce a view to its KPIs in a single pass.
pub fn compute_kpis(view: &FilteredView<'_>) -> Kpis {
    let mut total_revenue = 0.0;
    let mut orders = HashSet::new();
    let mut customers = HashSet::new();
    let mut repeat_customers = HashSet::new();
    let mut cancelled_rows = 0usize;

    for record in view.iter() {
        total_revenue += record.order_value;
        if let Some(id) = record.order_id.as_deref() {
            orders.insert(id);
        }
        if let Some(customer) = record.customer_id.as_deref() {
            customers.insert(customer);
            if record.is_repeat_customer {
                repeat_customers.insert(customer);
            }
        }
        if record.is_cancelled() {
            cancelled_rows += 1;
        }
    }

    let total_orders = orders.len();
    Kpis {
        total_revenue,
        total_orders,
        aov: ratio(total_revenue, total_orders),
        repeat_rate: ratio(repeat_customers.len() as f64, customers.len()) * 100.0,
        cancellation_rate: ratio(cancelled_rows as f64, total_orders) * 100.0,
    }
}

fn ratio(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}
