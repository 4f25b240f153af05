use std::collections::BTreeMap;
use std::collections::HashMap;

/// One enriched record: internal field name -> display-ready cell value.
pub type Record = BTreeMap<&'static str, String>;

/// Projection spec for one sheet. `order` is the exact output column set and
/// order (internal names); `rename` maps internal names to display labels.
/// Any record field absent from `order` is dropped.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub order: &'static [&'static str],
    pub rename: &'static [(&'static str, &'static str)],
}

impl ColumnSpec {
    pub fn display_name(&self, field: &str) -> String {
        self.rename
            .iter()
            .find(|(from, _)| *from == field)
            .map(|(_, to)| (*to).to_string())
            .unwrap_or_else(|| field.to_string())
    }

    pub fn headers(&self) -> Vec<String> {
        self.order
            .iter()
            .map(|field| self.display_name(field))
            .collect()
    }
}

/// A rectangular, display-ready table: named ordered columns plus rows of
/// string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn empty(spec: &ColumnSpec) -> Self {
        Self {
            columns: spec.headers(),
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }
}

/// Project enriched records into a table. Output columns are exactly
/// `spec.order` (post-rename); a missing field fills as an empty cell; row
/// order equals input order.
pub fn project(records: &[Record], spec: &ColumnSpec) -> Table {
    let rows = records
        .iter()
        .map(|record| {
            spec.order
                .iter()
                .map(|field| record.get(field).cloned().unwrap_or_default())
                .collect()
        })
        .collect();
    Table {
        columns: spec.headers(),
        rows,
    }
}

/// Duplicate-detection view: keep every record whose `field` value is shared
/// by at least two records (all occurrences, not just the 2nd+), then
/// stable-sort the survivors by that value ascending.
pub fn keep_duplicates_by(mut records: Vec<Record>, field: &'static str) -> Vec<Record> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in &records {
        if let Some(value) = record.get(field) {
            *counts.entry(value.clone()).or_insert(0) += 1;
        }
    }
    records.retain(|record| {
        record
            .get(field)
            .map(|value| counts.get(value.as_str()).copied().unwrap_or(0) >= 2)
            .unwrap_or(false)
    });
    records.sort_by(|a, b| a.get(field).cmp(&b.get(field)));
    records
}
