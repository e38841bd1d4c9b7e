use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::model::{OrderRecord, OrderTable};

// ---------------------------------------------------------------------------
// Filter parameters: what the caller asks for
// ---------------------------------------------------------------------------

/// Query-time filter selection. Every field is optional; an absent bound or
/// an empty set leaves that dimension unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub cities: BTreeSet<String>,
    pub statuses: BTreeSet<String>,
}

impl FilterParams {
    /// No constraints at all.
    pub fn all() -> Self {
        Self::default()
    }

    /// Lower bound at midnight of `date`.
    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.start = Some(date.and_time(chrono::NaiveTime::MIN));
        self
    }

    /// Upper bound at midnight of `date`; later orders that day are excluded.
    pub fn until_date(mut self, date: NaiveDate) -> Self {
        self.end = Some(date.and_time(chrono::NaiveTime::MIN));
        self
    }

    pub fn with_cities<I, S>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cities = cities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statuses = statuses.into_iter().map(Into::into).collect();
        self
    }

    /// Lower the selection into independent constraints.
    pub fn constraints(&self) -> Vec<Constraint> {
        let mut out = Vec::new();
        if let Some(start) = self.start {
            out.push(Constraint::StartAt(start));
        }
        if let Some(end) = self.end {
            out.push(Constraint::EndAt(end));
        }
        if !self.cities.is_empty() {
            out.push(Constraint::CityIn(self.cities.clone()));
        }
        if !self.statuses.is_empty() {
            out.push(Constraint::StatusIn(self.statuses.clone()));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Constraint: one predicate over a single dimension
// ---------------------------------------------------------------------------

/// A single row predicate.  Constraints are combined with logical AND and
/// are free of ordering effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// `order_date >= t`
    StartAt(NaiveDateTime),
    /// `order_date <= t`
    EndAt(NaiveDateTime),
    /// City in the set; rows without a city never match.
    CityIn(BTreeSet<String>),
    StatusIn(BTreeSet<String>),
}

impl Constraint {
    pub fn admits(&self, record: &OrderRecord) -> bool {
        match self {
            Constraint::StartAt(start) => record.order_date >= *start,
            Constraint::EndAt(end) => record.order_date <= *end,
            Constraint::CityIn(cities) => record
                .city
                .as_ref()
                .is_some_and(|city| cities.contains(city)),
            Constraint::StatusIn(statuses) => statuses.contains(&record.order_status),
        }
    }
}

// ---------------------------------------------------------------------------
// FilteredView: a request-scoped subset of the canonical table
// ---------------------------------------------------------------------------

/// Rows of the canonical table that passed a filter, by index.  The table
/// itself is only borrowed, never copied or mutated.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    table: &'a OrderTable,
    indices: Vec<usize>,
}

impl PartialEq for FilteredView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.table, other.table) && self.indices == other.indices
    }
}

impl<'a> FilteredView<'a> {
    /// Every row of the table.
    pub fn full(table: &'a OrderTable) -> Self {
        FilteredView {
            table,
            indices: (0..table.len()).collect(),
        }
    }

    /// Filter the whole table.
    pub fn new(table: &'a OrderTable, params: &FilterParams) -> Self {
        Self::full(table).refine(params)
    }

    /// Narrow this view further; `self` is left untouched.
    pub fn refine(&self, params: &FilterParams) -> Self {
        self.apply(&params.constraints())
    }

    /// Keep rows admitted by every constraint.
    pub fn apply(&self, constraints: &[Constraint]) -> Self {
        let indices = self
            .indices
            .iter()
            .copied()
            .filter(|&i| {
                let record = &self.table.records()[i];
                constraints.iter().all(|c| c.admits(record))
            })
            .collect();
        FilteredView {
            table: self.table,
            indices,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a OrderRecord> + '_ {
        let records = self.table.records();
        self.indices.iter().map(move |&i| &records[i])
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
