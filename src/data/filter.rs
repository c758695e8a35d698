use super::model::Dataset;

// ---------------------------------------------------------------------------
// Table search: which rows of the active dataset are shown
// ---------------------------------------------------------------------------

/// Return indices of rows in which any cell contains `query`, ignoring case.
///
/// A blank query keeps every row. Null cells never match.
pub fn filtered_indices(dataset: &Dataset, query: &str) -> Vec<usize> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return (0..dataset.len()).collect();
    }

    dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            row.iter()
                .filter(|cell| !cell.is_null())
                .any(|cell| cell.to_string().to_lowercase().contains(&needle))
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Column, ColumnKind};

    fn dataset() -> Dataset {
        Dataset::new(
            "a.csv",
            vec![
                Column::new("fornecedor", ColumnKind::Text),
                Column::new("valor", ColumnKind::Numeric),
            ],
            vec![
                vec![CellValue::Text("Papelaria Central".into()), CellValue::Integer(10)],
                vec![CellValue::Text("ACME".into()), CellValue::Integer(250)],
                vec![CellValue::Null, CellValue::Integer(7)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn blank_query_keeps_everything() {
        assert_eq!(filtered_indices(&dataset(), "  "), vec![0, 1, 2]);
    }

    #[test]
    fn matches_any_column_case_insensitively() {
        let ds = dataset();
        assert_eq!(filtered_indices(&ds, "central"), vec![0]);
        assert_eq!(filtered_indices(&ds, "25"), vec![1]);
        assert!(filtered_indices(&ds, "inexistente").is_empty());
    }
}
