use std::fmt;

use crate::data::model::Dataset;

/// Logical role a column plays in the invoice analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    /// Grouping key: who issued the invoice.
    Supplier,
    /// Invoice amount.
    Value,
    /// Issue date.
    Date,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnRole::Supplier => "fornecedor",
            ColumnRole::Value => "valor",
            ColumnRole::Date => "data",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Alias table
// ---------------------------------------------------------------------------

/// Accepted column names per role, tried in order with exact, case-sensitive
/// comparison.
///
/// Exports from different sources disagree on naming: hand-made sheets use
/// lowercase `fornecedor`/`valor`/`data`, the federal transparency portal
/// ships uppercase Portuguese headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    supplier: Vec<String>,
    value: Vec<String>,
    date: Vec<String>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            supplier: owned(&["fornecedor", "RAZÃO SOCIAL EMITENTE", "emitente"]),
            value: owned(&["valor", "VALOR NOTA FISCAL", "valor_total"]),
            date: owned(&["data", "DATA EMISSÃO", "data_emissao"]),
        }
    }
}

impl AliasTable {
    pub fn aliases(&self, role: ColumnRole) -> &[String] {
        match role {
            ColumnRole::Supplier => &self.supplier,
            ColumnRole::Value => &self.value,
            ColumnRole::Date => &self.date,
        }
    }

    /// Index of the column playing `role` in `dataset`: the first alias present wins.
    pub fn resolve(&self, dataset: &Dataset, role: ColumnRole) -> Option<usize> {
        self.aliases(role)
            .iter()
            .find_map(|alias| dataset.column_index(alias))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, ColumnKind};

    fn dataset(columns: &[&str]) -> Dataset {
        Dataset::new(
            "a.csv",
            columns
                .iter()
                .map(|c| Column::new(*c, ColumnKind::Text))
                .collect(),
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn resolves_lowercase_and_portal_headers() {
        let aliases = AliasTable::default();

        let sheet = dataset(&["data", "fornecedor", "valor"]);
        assert_eq!(aliases.resolve(&sheet, ColumnRole::Supplier), Some(1));
        assert_eq!(aliases.resolve(&sheet, ColumnRole::Value), Some(2));

        let portal = dataset(&["CHAVE DE ACESSO", "RAZÃO SOCIAL EMITENTE", "VALOR NOTA FISCAL"]);
        assert_eq!(aliases.resolve(&portal, ColumnRole::Supplier), Some(1));
        assert_eq!(aliases.resolve(&portal, ColumnRole::Value), Some(2));
        assert_eq!(aliases.resolve(&portal, ColumnRole::Date), None);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let aliases = AliasTable::default();
        assert_eq!(aliases.resolve(&dataset(&["Valor"]), ColumnRole::Value), None);
    }

    #[test]
    fn earlier_alias_wins() {
        let aliases = AliasTable {
            supplier: Vec::new(),
            value: vec!["liquido".into(), "bruto".into()],
            date: Vec::new(),
        };
        let ds = dataset(&["bruto", "liquido"]);
        assert_eq!(aliases.resolve(&ds, ColumnRole::Value), Some(1));
    }
}
