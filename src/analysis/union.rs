use std::sync::Arc;

use super::columns::{AliasTable, ColumnRole};
use crate::data::model::{CellValue, Column, ColumnKind, Dataset};

static NULL: CellValue = CellValue::Null;

/// Row-wise union of a registry snapshot.
///
/// Nothing is copied: cells are borrowed from the datasets, and a column a
/// dataset lacks reads as null for that dataset's rows.
#[derive(Debug, Clone, Copy)]
pub struct UnionView<'a> {
    datasets: &'a [Arc<Dataset>],
}

impl<'a> UnionView<'a> {
    pub fn new(datasets: &'a [Arc<Dataset>]) -> Self {
        Self { datasets }
    }

    pub fn row_count(&self) -> usize {
        self.datasets.iter().map(|d| d.len()).sum()
    }

    /// Every column present in any dataset, in first-seen order.
    ///
    /// A name carried with different kinds by different datasets is text.
    pub fn columns(&self) -> Vec<Column> {
        let mut columns: Vec<Column> = Vec::new();
        for column in self.datasets.iter().flat_map(|d| d.columns()) {
            match columns.iter_mut().find(|c| c.name == column.name) {
                Some(existing) if existing.kind != column.kind => existing.kind = ColumnKind::Text,
                Some(_) => {}
                None => columns.push(column.clone()),
            }
        }
        columns
    }

    /// Rows of the union aligned to `columns`.
    pub fn rows<'c>(&self, columns: &'c [Column]) -> impl Iterator<Item = Vec<&'a CellValue>> + 'c
    where
        'a: 'c,
    {
        let datasets = self.datasets;
        datasets.iter().flat_map(move |ds| {
            let mapping = align(columns, ds);
            ds.rows().iter().map(move |row| cells_at(&mapping, row))
        })
    }

    /// Values of the column playing `role`, one per union row.
    ///
    /// Each dataset resolves the role through its own first matching alias, so
    /// files with different header conventions aggregate together. Returns
    /// `None` when no dataset carries any alias of the role.
    pub fn role_values(&self, aliases: &AliasTable, role: ColumnRole) -> Option<Vec<&'a CellValue>> {
        let resolved: Vec<Option<usize>> = self
            .datasets
            .iter()
            .map(|d| aliases.resolve(d, role))
            .collect();
        if resolved.iter().all(Option::is_none) {
            return None;
        }

        let mut values = Vec::with_capacity(self.row_count());
        for (ds, idx) in self.datasets.iter().zip(resolved) {
            match idx {
                Some(i) => values.extend(ds.rows().iter().map(|row| &row[i])),
                None => values.extend(std::iter::repeat(&NULL).take(ds.len())),
            }
        }
        Some(values)
    }
}

/// Position of each union column inside `dataset`.
pub fn align(columns: &[Column], dataset: &Dataset) -> Vec<Option<usize>> {
    columns
        .iter()
        .map(|c| dataset.column_index(&c.name))
        .collect()
}

/// Cells of `row` in union order; absent columns read as null.
pub fn cells_at<'a>(mapping: &[Option<usize>], row: &'a [CellValue]) -> Vec<&'a CellValue> {
    mapping
        .iter()
        .map(|m| m.map(|i| &row[i]).unwrap_or(&NULL))
        .collect()
}
