//! The per-chart dimensional store: two dimensions, sum groups, and
//! membership filters.

use crate::series::AggregateSeries;
use indexmap::IndexSet;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Place,
    Category,
}

/// Group-by-sum reads and membership filters over one chart's records.
///
/// A dimension's group reflects the filters of every other dimension but
/// not its own, so a chart's bars keep showing unselected categories.
pub trait DimensionalStore {
    fn group_all(&self, dimension: Dimension) -> AggregateSeries;

    /// Keep only records whose key on `dimension` is in `keys`.
    fn filter(&mut self, dimension: Dimension, keys: &IndexSet<String>);

    fn filter_all(&mut self, dimension: Dimension);

    fn is_filtered(&self, dimension: Dimension) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub place: String,
    pub category: String,
    pub value: f64,
}

impl Record {
    pub fn new(place: impl Into<String>, category: impl Into<String>, value: f64) -> Self {
        Self {
            place: place.into(),
            category: category.into(),
            value,
        }
    }

    fn key(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Place => &self.place,
            Dimension::Category => &self.category,
        }
    }
}

/// In-memory store scanning its records on each read.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    place_filter: Option<IndexSet<String>>,
    category_filter: Option<IndexSet<String>>,
}

impl RecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            place_filter: None,
            category_filter: None,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    fn filter_slot(&self, dimension: Dimension) -> &Option<IndexSet<String>> {
        match dimension {
            Dimension::Place => &self.place_filter,
            Dimension::Category => &self.category_filter,
        }
    }

    fn filter_slot_mut(&mut self, dimension: Dimension) -> &mut Option<IndexSet<String>> {
        match dimension {
            Dimension::Place => &mut self.place_filter,
            Dimension::Category => &mut self.category_filter,
        }
    }

    fn passes(&self, record: &Record, dimension: Dimension) -> bool {
        match self.filter_slot(dimension) {
            Some(keys) => keys.contains(record.key(dimension)),
            None => true,
        }
    }
}

impl DimensionalStore for RecordStore {
    fn group_all(&self, dimension: Dimension) -> AggregateSeries {
        let other = match dimension {
            Dimension::Place => Dimension::Category,
            Dimension::Category => Dimension::Place,
        };

        let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
        for record in &self.records {
            let slot = sums.entry(record.key(dimension)).or_insert(0.0);
            if self.passes(record, other) {
                *slot += record.value;
            }
        }
        sums.into_iter().collect()
    }

    fn filter(&mut self, dimension: Dimension, keys: &IndexSet<String>) {
        *self.filter_slot_mut(dimension) = Some(keys.clone());
    }

    fn filter_all(&mut self, dimension: Dimension) {
        *self.filter_slot_mut(dimension) = None;
    }

    fn is_filtered(&self, dimension: Dimension) -> bool {
        self.filter_slot(dimension).is_some()
    }
}
