use std::sync::Arc;

use thiserror::Error;

use super::model::{ColumnKind, Dataset};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("arquivo '{0}' não está carregado")]
    NotFound(String),
}

/// Column layout of one registered dataset, as shown in the metadata view.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub numeric: Vec<String>,
    pub text: Vec<String>,
    pub temporal: Vec<String>,
}

impl DatasetSummary {
    fn of(dataset: &Dataset) -> Self {
        let names = |kind: ColumnKind| -> Vec<String> {
            dataset
                .columns_of_kind(kind)
                .into_iter()
                .map(str::to_string)
                .collect()
        };
        Self {
            name: dataset.name().to_string(),
            rows: dataset.len(),
            columns: dataset.columns().len(),
            numeric: names(ColumnKind::Numeric),
            text: names(ColumnKind::Text),
            temporal: names(ColumnKind::Temporal),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Named datasets currently loaded, plus the active one shown in the table.
///
/// Datasets are shared behind `Arc` so a snapshot taken with [`Registry::all`]
/// stays valid after the registry changes.
#[derive(Debug, Default)]
pub struct Registry {
    datasets: Vec<Arc<Dataset>>,
    active: Option<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the dataset under its own name.
    ///
    /// Replacing keeps the dataset's position in the listing. The first
    /// dataset registered into an empty registry becomes active.
    pub fn register(&mut self, dataset: Dataset) {
        let was_empty = self.datasets.is_empty();
        let name = dataset.name().to_string();
        let dataset = Arc::new(dataset);

        match self.datasets.iter().position(|d| d.name() == name) {
            Some(idx) => self.datasets[idx] = dataset,
            None => self.datasets.push(dataset),
        }

        if was_empty {
            self.active = Some(name);
        }
    }

    /// Remove a dataset. If it was active, the first remaining one takes over.
    pub fn remove(&mut self, name: &str) -> Result<Arc<Dataset>, RegistryError> {
        let idx = self
            .datasets
            .iter()
            .position(|d| d.name() == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let removed = self.datasets.remove(idx);

        if self.active.as_deref() == Some(name) {
            self.active = self.datasets.first().map(|d| d.name().to_string());
        }
        Ok(removed)
    }

    /// Make `name` the active dataset.
    pub fn select(&mut self, name: &str) -> Result<(), RegistryError> {
        if self.get(name).is_none() {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        self.active = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Dataset>> {
        self.datasets.iter().find(|d| d.name() == name)
    }

    /// Snapshot of every registered dataset, in listing order.
    pub fn all(&self) -> Vec<Arc<Dataset>> {
        self.datasets.clone()
    }

    pub fn active(&self) -> Option<&Arc<Dataset>> {
        self.active.as_deref().and_then(|name| self.get(name))
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn names(&self) -> Vec<&str> {
        self.datasets.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn summaries(&self) -> Vec<DatasetSummary> {
        self.datasets.iter().map(|d| DatasetSummary::of(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Column};

    fn dataset(name: &str, rows: usize) -> Dataset {
        Dataset::new(
            name,
            vec![Column::new("valor", ColumnKind::Numeric)],
            (0..rows).map(|i| vec![CellValue::Integer(i as i64)]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn first_registration_becomes_active() {
        let mut reg = Registry::new();
        assert!(reg.active().is_none());

        reg.register(dataset("a.csv", 1));
        reg.register(dataset("b.csv", 2));

        assert_eq!(reg.active_name(), Some("a.csv"));
        assert_eq!(reg.names(), vec!["a.csv", "b.csv"]);
    }

    #[test]
    fn registering_same_name_replaces() {
        let mut reg = Registry::new();
        reg.register(dataset("a.csv", 3));
        reg.register(dataset("b.csv", 1));
        reg.register(dataset("a.csv", 5));

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get("a.csv").unwrap().len(), 5);
        assert_eq!(reg.names(), vec!["a.csv", "b.csv"]);
    }

    #[test]
    fn removing_active_promotes_remaining() {
        let mut reg = Registry::new();
        reg.register(dataset("a.csv", 1));
        reg.register(dataset("b.csv", 1));

        reg.remove("a.csv").unwrap();
        assert_eq!(reg.active_name(), Some("b.csv"));

        reg.remove("b.csv").unwrap();
        assert!(reg.active().is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn removing_unknown_name_reports_not_found() {
        let mut reg = Registry::new();
        reg.register(dataset("a.csv", 1));

        assert_eq!(
            reg.remove("zzz.csv").unwrap_err(),
            RegistryError::NotFound("zzz.csv".into())
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn snapshot_survives_later_changes() {
        let mut reg = Registry::new();
        reg.register(dataset("a.csv", 4));
        let snapshot = reg.all();

        reg.remove("a.csv").unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].len(), 4);
    }

    #[test]
    fn select_changes_active() {
        let mut reg = Registry::new();
        reg.register(dataset("a.csv", 1));
        reg.register(dataset("b.csv", 1));

        reg.select("b.csv").unwrap();
        assert_eq!(reg.active_name(), Some("b.csv"));
        assert!(reg.select("c.csv").is_err());
        assert_eq!(reg.active_name(), Some("b.csv"));
    }

    #[test]
    fn summaries_group_columns_by_kind() {
        let mut reg = Registry::new();
        reg.register(dataset("a.csv", 2));

        let summary = &reg.summaries()[0];
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns, 1);
        assert_eq!(summary.numeric, vec!["valor".to_string()]);
        assert!(summary.text.is_empty());
    }
}
