//! Order analytics pipeline: load and clean raw order records once, then
//! answer filter requests with KPIs and chart-ready aggregates.

pub mod data;
pub mod metrics;
pub mod pipeline;

pub use data::filter::{Constraint, FilterParams, FilteredView};
pub use data::loader::{load_file, load_orders, LoadError};
pub use data::model::{OrderRecord, OrderTable};
pub use metrics::aggregate::{build_aggregates, Aggregates, BoxSummary};
pub use metrics::kpi::{compute_kpis, Kpis};
pub use pipeline::{Dashboard, FilterOptions, Snapshot};
