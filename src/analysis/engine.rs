use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Datelike;

use super::columns::{AliasTable, ColumnRole};
use super::report::{Analysis, AnalysisError, ValueStats, YearMonth};
use super::union::UnionView;
use crate::data::model::{CellValue, Dataset};

/// A local analysis with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    TopSuppliers { n: usize },
    SupplierFrequency { n: usize },
    CountInvoices,
    MeanValue,
    TemporalDistribution,
    ValueStatistics,
}

/// Aggregations over the union of a registry snapshot.
///
/// Every operation is read-only over the snapshot it is given.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    aliases: AliasTable,
}

impl Engine {
    pub fn run(&self, query: Query, snapshot: &[Arc<Dataset>]) -> Result<Analysis, AnalysisError> {
        log::debug!("running {query:?} over {} datasets", snapshot.len());
        match query {
            Query::TopSuppliers { n } => self.top_suppliers(snapshot, n),
            Query::SupplierFrequency { n } => self.supplier_frequency(snapshot, n),
            Query::CountInvoices => Ok(self.count_invoices(snapshot)),
            Query::MeanValue => self.mean_value(snapshot),
            Query::TemporalDistribution => self.temporal_distribution(snapshot),
            Query::ValueStatistics => self.value_statistics(snapshot),
        }
    }

    /// The `n` suppliers with the largest summed value, largest first.
    ///
    /// Ties keep the order in which suppliers first appear. Rows without a
    /// supplier are left out; rows without a numeric value add nothing.
    pub fn top_suppliers(
        &self,
        snapshot: &[Arc<Dataset>],
        n: usize,
    ) -> Result<Analysis, AnalysisError> {
        let view = non_empty(snapshot)?;
        check_top_n(n)?;
        let suppliers = self.require(&view, ColumnRole::Supplier)?;
        let values = self.require(&view, ColumnRole::Value)?;

        let mut totals: Vec<(String, f64)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (supplier, value) in suppliers.iter().zip(&values) {
            let Some(key) = supplier.as_key() else {
                continue;
            };
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                totals.push((key, 0.0));
                totals.len() - 1
            });
            if let Some(v) = value.as_f64() {
                totals[slot].1 += v;
            }
        }

        totals.sort_by(|a, b| b.1.total_cmp(&a.1));
        totals.truncate(n);
        Ok(Analysis::TopSuppliers { n, entries: totals })
    }

    /// The `n` suppliers with the most invoices, most first.
    pub fn supplier_frequency(
        &self,
        snapshot: &[Arc<Dataset>],
        n: usize,
    ) -> Result<Analysis, AnalysisError> {
        let view = non_empty(snapshot)?;
        check_top_n(n)?;
        let suppliers = self.require(&view, ColumnRole::Supplier)?;

        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for key in suppliers.iter().filter_map(|s| s.as_key()) {
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                counts.push((key, 0));
                counts.len() - 1
            });
            counts[slot].1 += 1;
        }

        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(n);
        Ok(Analysis::SupplierFrequency { n, entries: counts })
    }

    /// Rows across every dataset, without deduplication. Zero when nothing is loaded.
    pub fn count_invoices(&self, snapshot: &[Arc<Dataset>]) -> Analysis {
        let per_dataset: Vec<(String, usize)> = snapshot
            .iter()
            .map(|d| (d.name().to_string(), d.len()))
            .collect();
        Analysis::InvoiceCount {
            total: per_dataset.iter().map(|(_, n)| n).sum(),
            per_dataset,
        }
    }

    /// Arithmetic mean over the numeric values of the value column.
    pub fn mean_value(&self, snapshot: &[Arc<Dataset>]) -> Result<Analysis, AnalysisError> {
        let view = non_empty(snapshot)?;
        let (numbers, excluded) = self.numeric_values(&view)?;

        let mean = (!numbers.is_empty()).then(|| numbers.iter().sum::<f64>() / numbers.len() as f64);
        Ok(Analysis::MeanValue {
            mean,
            counted: numbers.len(),
            excluded,
        })
    }

    /// Invoice counts per calendar month, oldest first.
    pub fn temporal_distribution(
        &self,
        snapshot: &[Arc<Dataset>],
    ) -> Result<Analysis, AnalysisError> {
        let view = non_empty(snapshot)?;
        let dates = self.require(&view, ColumnRole::Date)?;

        let mut buckets: BTreeMap<YearMonth, usize> = BTreeMap::new();
        let mut dropped = 0;
        let mut missing = 0;
        for cell in dates {
            if cell.as_key().is_none() {
                missing += 1;
                continue;
            }
            match cell.as_date() {
                Some(date) => {
                    let key = YearMonth {
                        year: date.year(),
                        month: date.month(),
                    };
                    *buckets.entry(key).or_default() += 1;
                }
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            log::warn!("temporal distribution ignored {dropped} unparseable dates");
        }

        // Months without invoices between the first and last one count as zero.
        if let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) {
            let mut month = first;
            while month < last {
                month = month.next();
                buckets.entry(month).or_insert(0);
            }
        }
        Ok(Analysis::TemporalDistribution {
            buckets: buckets.into_iter().collect(),
            dropped,
            missing,
        })
    }

    /// Count, mean, spread and quartiles of the value column.
    pub fn value_statistics(
        &self,
        snapshot: &[Arc<Dataset>],
    ) -> Result<Analysis, AnalysisError> {
        let view = non_empty(snapshot)?;
        let (mut numbers, excluded) = self.numeric_values(&view)?;
        numbers.sort_by(f64::total_cmp);

        let stats = (!numbers.is_empty()).then(|| describe(&numbers));
        Ok(Analysis::ValueStatistics { stats, excluded })
    }

    fn require<'a>(
        &self,
        view: &UnionView<'a>,
        role: ColumnRole,
    ) -> Result<Vec<&'a CellValue>, AnalysisError> {
        view.role_values(&self.aliases, role)
            .ok_or(AnalysisError::MissingColumn(role))
    }

    /// Numeric values of the value column, plus how many non-empty cells were not numeric.
    fn numeric_values(&self, view: &UnionView<'_>) -> Result<(Vec<f64>, usize), AnalysisError> {
        let cells = self.require(view, ColumnRole::Value)?;
        let mut numbers = Vec::with_capacity(cells.len());
        let mut excluded = 0;
        for cell in cells {
            match cell.as_f64() {
                Some(v) => numbers.push(v),
                None if cell.as_key().is_some() => excluded += 1,
                None => {}
            }
        }
        Ok((numbers, excluded))
    }
}

fn non_empty(snapshot: &[Arc<Dataset>]) -> Result<UnionView<'_>, AnalysisError> {
    if snapshot.is_empty() {
        return Err(AnalysisError::NoData);
    }
    Ok(UnionView::new(snapshot))
}

fn check_top_n(n: usize) -> Result<(), AnalysisError> {
    if n == 0 {
        return Err(AnalysisError::InvalidParameter {
            name: "n",
            reason: "o número de fornecedores deve ser positivo".to_string(),
        });
    }
    Ok(())
}

/// Summary of sorted, non-empty values.
fn describe(sorted: &[f64]) -> ValueStats {
    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        var.sqrt()
    });
    ValueStats {
        count,
        mean,
        std,
        min: sorted[0],
        q1: quantile(sorted, 0.25),
        median: quantile(sorted, 0.5),
        q3: quantile(sorted, 0.75),
        max: sorted[count - 1],
    }
}

/// Linear interpolation between closest ranks.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, ColumnKind};

    fn invoices(name: &str, rows: &[(&str, CellValue, &str)]) -> Arc<Dataset> {
        Arc::new(
            Dataset::new(
                name,
                vec![
                    Column::new("fornecedor", ColumnKind::Text),
                    Column::new("valor", ColumnKind::Numeric),
                    Column::new("data", ColumnKind::Text),
                ],
                rows.iter()
                    .map(|(s, v, d)| {
                        vec![CellValue::Text(s.to_string()), v.clone(), CellValue::Text(d.to_string())]
                    })
                    .collect(),
            )
            .unwrap(),
        )
    }

    fn money(v: f64) -> CellValue {
        CellValue::Float(v)
    }

    #[test]
    fn empty_snapshot_reports_no_data() {
        let engine = Engine::default();
        assert_eq!(engine.mean_value(&[]), Err(AnalysisError::NoData));
        assert_eq!(engine.top_suppliers(&[], 3), Err(AnalysisError::NoData));
        assert_eq!(engine.temporal_distribution(&[]), Err(AnalysisError::NoData));
        assert_eq!(engine.value_statistics(&[]), Err(AnalysisError::NoData));
    }

    #[test]
    fn top_suppliers_sum_and_order() {
        let snap = vec![
            invoices(
                "a.csv",
                &[
                    ("ACME", money(10.0), "2024-01-05"),
                    ("BETA", money(50.0), "2024-01-06"),
                    ("ACME", money(45.0), "2024-01-07"),
                    ("GAMA", money(5.0), "2024-01-08"),
                ],
            ),
            invoices("b.csv", &[("GAMA", money(1.0), "2024-02-01")]),
        ];

        let result = Engine::default().top_suppliers(&snap, 2).unwrap();
        assert_eq!(
            result,
            Analysis::TopSuppliers {
                n: 2,
                entries: vec![("ACME".into(), 55.0), ("BETA".into(), 50.0)],
            }
        );
    }

    #[test]
    fn top_suppliers_returns_min_of_n_and_distinct() {
        let snap = vec![invoices(
            "a.csv",
            &[("ACME", money(1.0), ""), ("BETA", money(2.0), "")],
        )];
        let Analysis::TopSuppliers { entries, .. } = Engine::default().top_suppliers(&snap, 10).unwrap() else {
            panic!("unexpected analysis");
        };
        assert_eq!(entries.len(), 2);
        let listed: f64 = entries.iter().map(|(_, v)| v).sum();
        assert!(listed <= 3.0);
    }

    #[test]
    fn top_suppliers_ties_keep_first_seen() {
        let snap = vec![invoices(
            "a.csv",
            &[
                ("ZETA", money(10.0), ""),
                ("ALFA", money(10.0), ""),
                ("MEIO", money(10.0), ""),
            ],
        )];
        let Analysis::TopSuppliers { entries, .. } = Engine::default().top_suppliers(&snap, 3).unwrap() else {
            panic!("unexpected analysis");
        };
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["ZETA", "ALFA", "MEIO"]);
    }

    #[test]
    fn top_suppliers_rejects_zero() {
        let snap = vec![invoices("a.csv", &[("ACME", money(1.0), "")])];
        assert!(matches!(
            Engine::default().top_suppliers(&snap, 0),
            Err(AnalysisError::InvalidParameter { name: "n", .. })
        ));
    }

    #[test]
    fn count_invoices_sums_rows() {
        let engine = Engine::default();
        assert_eq!(
            engine.count_invoices(&[]),
            Analysis::InvoiceCount {
                total: 0,
                per_dataset: Vec::new()
            }
        );

        let snap = vec![
            invoices("a.csv", &[("A", money(1.0), ""), ("A", money(1.0), "")]),
            invoices("b.csv", &[("A", money(1.0), "")]),
        ];
        let Analysis::InvoiceCount { total, .. } = engine.count_invoices(&snap) else {
            panic!("unexpected analysis");
        };
        assert_eq!(total, 3);
    }

    #[test]
    fn mean_of_ten_twenty_thirty() {
        let snap = vec![invoices(
            "a.csv",
            &[
                ("A", money(10.0), ""),
                ("B", money(20.0), ""),
                ("C", money(30.0), ""),
            ],
        )];
        let result = Engine::default().mean_value(&snap).unwrap();
        assert_eq!(
            result,
            Analysis::MeanValue {
                mean: Some(20.0),
                counted: 3,
                excluded: 0
            }
        );
        assert_eq!(result.label(), "Valor médio das notas: R$ 20,00");
    }

    #[test]
    fn mean_skips_null_and_non_numeric() {
        let snap = vec![invoices(
            "a.csv",
            &[
                ("A", money(10.0), ""),
                ("B", CellValue::Null, ""),
                ("C", CellValue::Text("n/d".into()), ""),
                ("D", CellValue::Text("30,00".into()), ""),
            ],
        )];
        let result = Engine::default().mean_value(&snap).unwrap();
        assert_eq!(
            result,
            Analysis::MeanValue {
                mean: Some(20.0),
                counted: 2,
                excluded: 1
            }
        );
        assert_eq!(result.warnings().len(), 1);
    }

    #[test]
    fn missing_value_column_is_reported() {
        let ds = Dataset::new(
            "a.csv",
            vec![Column::new("fornecedor", ColumnKind::Text)],
            vec![vec![CellValue::Text("ACME".into())]],
        )
        .unwrap();
        let snap = vec![Arc::new(ds)];
        let engine = Engine::default();

        assert_eq!(
            engine.mean_value(&snap),
            Err(AnalysisError::MissingColumn(ColumnRole::Value))
        );
        assert_eq!(
            engine.top_suppliers(&snap, 3),
            Err(AnalysisError::MissingColumn(ColumnRole::Value))
        );
        assert_eq!(
            engine.temporal_distribution(&snap),
            Err(AnalysisError::MissingColumn(ColumnRole::Date))
        );
    }

    #[test]
    fn months_bucket_chronologically() {
        let snap = vec![invoices(
            "a.csv",
            &[
                ("A", money(1.0), "2024-02-01"),
                ("A", money(1.0), "2024-01-05"),
                ("A", money(1.0), "2024-01-20"),
                ("A", money(1.0), "32/13/2024"),
                ("A", money(1.0), ""),
            ],
        )];
        let result = Engine::default().temporal_distribution(&snap).unwrap();
        assert_eq!(
            result,
            Analysis::TemporalDistribution {
                buckets: vec![
                    (YearMonth { year: 2024, month: 1 }, 2),
                    (YearMonth { year: 2024, month: 2 }, 1),
                ],
                dropped: 1,
                missing: 1,
            }
        );
    }

    #[test]
    fn empty_months_between_invoices_are_zero() {
        let snap = vec![invoices(
            "a.csv",
            &[
                ("A", money(1.0), "2024-01-05"),
                ("A", money(1.0), "2024-03-10"),
            ],
        )];
        let result = Engine::default().temporal_distribution(&snap).unwrap();
        assert_eq!(
            result,
            Analysis::TemporalDistribution {
                buckets: vec![
                    (YearMonth { year: 2024, month: 1 }, 1),
                    (YearMonth { year: 2024, month: 2 }, 0),
                    (YearMonth { year: 2024, month: 3 }, 1),
                ],
                dropped: 0,
                missing: 0,
            }
        );
    }

    #[test]
    fn statistics_match_describe() {
        let snap = vec![invoices(
            "a.csv",
            &[
                ("A", money(10.0), ""),
                ("B", money(20.0), ""),
                ("C", money(30.0), ""),
                ("D", money(40.0), ""),
            ],
        )];
        let Analysis::ValueStatistics { stats: Some(stats), .. } =
            Engine::default().value_statistics(&snap).unwrap()
        else {
            panic!("unexpected analysis");
        };
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 25.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.q1, 17.5);
        assert_eq!(stats.median, 25.0);
        assert_eq!(stats.q3, 32.5);
        assert_eq!(stats.max, 40.0);
        let std = stats.std.unwrap();
        assert!((std - 12.909944).abs() < 1e-5);
    }

    #[test]
    fn supplier_frequency_counts_rows() {
        let snap = vec![invoices(
            "a.csv",
            &[
                ("BETA", money(100.0), ""),
                ("ACME", money(1.0), ""),
                ("ACME", money(1.0), ""),
            ],
        )];
        let result = Engine::default().supplier_frequency(&snap, 5).unwrap();
        assert_eq!(
            result,
            Analysis::SupplierFrequency {
                n: 5,
                entries: vec![("ACME".into(), 2), ("BETA".into(), 1)],
            }
        );
    }
}
