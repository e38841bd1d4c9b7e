use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::filter::{FilterParams, FilteredView};
use crate::data::loader::{load_orders, LoadError};
use crate::data::model::OrderTable;
use crate::metrics::aggregate::{build_aggregates, Aggregates};
use crate::metrics::kpi::{compute_kpis, Kpis};

// ---------------------------------------------------------------------------
// Dashboard – owns the canonical table, answers filter requests
// ---------------------------------------------------------------------------

/// Pipeline coordinator.  The canonical table is loaded once and shared
/// read-only; every query builds its own view, so clones of a `Dashboard`
/// can serve requests from different threads.
#[derive(Debug, Clone)]
pub struct Dashboard {
    table: Arc<OrderTable>,
}

/// Everything one filter request produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Rows in the filtered view.
    pub matched_rows: usize,
    pub kpis: Kpis,
    pub aggregates: Aggregates,
}

/// Values a control surface needs to offer sensible choices.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub cities: Vec<String>,
    pub statuses: Vec<String>,
}

impl Dashboard {
    /// Load and clean the source file.  Failure here is fatal for callers:
    /// there is nothing to serve without a canonical table.
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let table = load_orders(path)?;
        log::info!(
            "Dashboard ready: {} orders from {}",
            table.len(),
            path.display()
        );
        Ok(Self::from_table(table))
    }

    pub fn from_table(table: OrderTable) -> Self {
        Dashboard {
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &OrderTable {
        &self.table
    }

    /// Filter once, then compute KPIs and aggregates side by side.
    pub fn query(&self, params: &FilterParams) -> Snapshot {
        let view = FilteredView::new(&self.table, params);
        log::debug!(
            "Filter {:?} matched {} of {} rows",
            params,
            view.len(),
            self.table.len()
        );

        let (kpis, aggregates) = rayon::join(|| compute_kpis(&view), || build_aggregates(&view));

        Snapshot {
            matched_rows: view.len(),
            kpis,
            aggregates,
        }
    }

    pub fn filter_options(&self) -> FilterOptions {
        let bounds = self.table.date_bounds();
        FilterOptions {
            min_date: bounds.map(|(lo, _)| lo.date()),
            max_date: bounds.map(|(_, hi)| hi.date()),
            cities: self.table.cities(),
            statuses: self.table.statuses(),
        }
    }
}
