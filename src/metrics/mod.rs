/// Reductions over a filtered view.  The two stages are independent of
/// each other and only read the view.

pub mod aggregate;
pub mod kpi;
