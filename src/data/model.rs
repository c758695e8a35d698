use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CellValue – a single cell of an invoice table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a spreadsheet export carries.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.2}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of the cell. Text cells are parsed, so a value column that
    /// was inferred as text because of a few stray entries still aggregates.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// Calendar-date view of the cell.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Text(s) => parse_date(s),
            _ => None,
        }
    }

    /// Grouping key view; `None` for null or blank cells.
    pub fn as_key(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Text(s) if s.trim().is_empty() => None,
            CellValue::Text(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Column descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Numeric,
    Text,
    Temporal,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnKind::Numeric => "numérico",
            ColumnKind::Text => "texto",
            ColumnKind::Temporal => "data",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("row {row} has {found} cells but the header declares {expected} columns")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),
}

// ---------------------------------------------------------------------------
// Dataset – one loaded invoice table
// ---------------------------------------------------------------------------

/// A named, immutable table of rows with typed columns.
///
/// Rows are stored row-major; every row has exactly `columns.len()` cells.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Build a dataset from already-typed cells, checking the row width invariant.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<Self, DatasetError> {
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(DatasetError::DuplicateColumn(col.name.clone()));
            }
        }
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != columns.len())
        {
            return Err(DatasetError::RaggedRow {
                row,
                expected: columns.len(),
                found: cells.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            columns,
            rows,
        })
    }

    /// Build a dataset from raw text records, inferring each column's kind.
    ///
    /// A column is numeric when every non-blank value parses as a number,
    /// temporal when every non-blank value parses as a date, text otherwise.
    /// Blank cells become [`CellValue::Null`].
    pub fn infer(
        name: impl Into<String>,
        headers: Vec<String>,
        records: Vec<Vec<String>>,
    ) -> Result<Self, DatasetError> {
        if let Some((row, cells)) = records
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != headers.len())
        {
            return Err(DatasetError::RaggedRow {
                row,
                expected: headers.len(),
                found: cells.len(),
            });
        }

        let kinds: Vec<ColumnKind> = (0..headers.len())
            .map(|idx| infer_kind(records.iter().map(|r| r[idx].as_str())))
            .collect();
        let marks: Vec<DecimalMark> = (0..headers.len())
            .map(|idx| DecimalMark::of_column(records.iter().map(|r| r[idx].as_str())))
            .collect();

        let rows = records
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .zip(kinds.iter().zip(&marks))
                    .map(|(raw, (kind, mark))| typed_cell(raw, *kind, *mark))
                    .collect()
            })
            .collect();

        let columns = headers
            .into_iter()
            .zip(kinds)
            .map(|(name, kind)| Column::new(name, kind))
            .collect();

        Self::new(name, columns, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column with exactly this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Names of the columns of the given kind, in table order.
    pub fn columns_of_kind(&self, kind: ColumnKind) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Text parsing helpers shared by ingestion and analytics
// ---------------------------------------------------------------------------

/// Parse a number written either plainly (`1234.5`) or the Brazilian way
/// (`1.234,56`), with an optional `R$` prefix.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    let s = s.strip_prefix("R$").map(str::trim).unwrap_or(s);
    if s.is_empty() {
        return None;
    }

    let normalised = match (s.rfind(','), s.rfind('.')) {
        // 1,234.56
        (Some(comma), Some(dot)) if dot > comma => s.replace(',', ""),
        // 1.234,56 or 12,5
        (Some(_), _) => s.replace('.', "").replace(',', "."),
        _ => s.to_string(),
    };

    normalised.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decimal separator a whole column is written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecimalMark {
    Dot,
    Comma,
}

impl DecimalMark {
    /// A single `1.234,56`-style value makes the whole column Brazilian, so
    /// `1.500` in the same column reads as fifteen hundred.
    fn of_column<'a>(values: impl Iterator<Item = &'a str>) -> Self {
        let comma = values.map(str::trim).any(|v| match (v.rfind(','), v.rfind('.')) {
            (Some(comma), Some(dot)) => comma > dot,
            (Some(_), None) => true,
            _ => false,
        });
        if comma {
            DecimalMark::Comma
        } else {
            DecimalMark::Dot
        }
    }

    fn parse(self, s: &str) -> Option<f64> {
        match self {
            DecimalMark::Comma if !s.contains(',') => parse_number(&s.replace('.', "")),
            _ => parse_number(s),
        }
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse a calendar date, ignoring any time-of-day part.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Digit strings that must stay text: access keys, CNPJs with leading zeros.
fn is_identifier(s: &str) -> bool {
    s.len() > 1
        && s.chars().all(|c| c.is_ascii_digit())
        && (s.starts_with('0') || s.len() > 15)
}

fn infer_kind<'a>(values: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut numeric = true;
    let mut temporal = true;
    let mut seen = false;

    for raw in values {
        let v = raw.trim();
        if v.is_empty() {
            continue;
        }
        seen = true;
        if numeric && (is_identifier(v) || parse_number(v).is_none()) {
            numeric = false;
        }
        if temporal && parse_date(v).is_none() {
            temporal = false;
        }
        if !numeric && !temporal {
            return ColumnKind::Text;
        }
    }

    match (seen, numeric, temporal) {
        (false, _, _) => ColumnKind::Text,
        (true, true, _) => ColumnKind::Numeric,
        (true, false, true) => ColumnKind::Temporal,
        _ => ColumnKind::Text,
    }
}

fn typed_cell(raw: String, kind: ColumnKind, mark: DecimalMark) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Null;
    }
    match kind {
        ColumnKind::Numeric => match trimmed.parse::<i64>() {
            Ok(i) => CellValue::Integer(i),
            Err(_) => mark
                .parse(trimmed)
                .map(CellValue::Float)
                .unwrap_or(CellValue::Text(raw)),
        },
        ColumnKind::Temporal => parse_date(trimmed)
            .map(CellValue::Date)
            .unwrap_or(CellValue::Text(raw)),
        ColumnKind::Text => CellValue::Text(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_plain_and_brazilian_numbers() {
        assert_eq!(parse_number("1234.5"), Some(1234.5));
        assert_eq!(parse_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_number("12,5"), Some(12.5));
        assert_eq!(parse_number("1,234.56"), Some(1234.56));
        assert_eq!(parse_number("R$ 10,00"), Some(10.0));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("  "), None);
    }

    #[test]
    fn parses_common_date_layouts() {
        let jan5 = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(parse_date("2024-01-05"), Some(jan5));
        assert_eq!(parse_date("05/01/2024"), Some(jan5));
        assert_eq!(parse_date("05/01/2024 13:45:00"), Some(jan5));
        assert_eq!(parse_date("2024-01-05T08:00:00"), Some(jan5));
        assert_eq!(parse_date("2024-13-40"), None);
        assert_eq!(parse_date("ontem"), None);
    }

    #[test]
    fn infers_column_kinds() {
        let ds = Dataset::infer(
            "nf.csv",
            strings(&["fornecedor", "valor", "data", "chave"]),
            vec![
                strings(&["ACME", "10,50", "2024-01-05", "00123"]),
                strings(&["Beta", "", "2024-02-01", "00456"]),
            ],
        )
        .unwrap();

        let kinds: Vec<ColumnKind> = ds.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Text,
                ColumnKind::Numeric,
                ColumnKind::Temporal,
                ColumnKind::Text
            ]
        );
        assert_eq!(ds.rows()[0][1], CellValue::Float(10.5));
        assert!(ds.rows()[1][1].is_null());
        assert_eq!(ds.rows()[0][3], CellValue::Text("00123".into()));
        assert_eq!(ds.columns_of_kind(ColumnKind::Numeric), vec!["valor"]);
    }

    #[test]
    fn brazilian_column_reads_dots_as_thousands() {
        let ds = Dataset::infer(
            "nf.csv",
            strings(&["valor", "peso"]),
            vec![
                strings(&["1.500", "1.5"]),
                strings(&["2.500,00", "2.25"]),
                strings(&["R$ 3.000", "3"]),
            ],
        )
        .unwrap();

        let valor: Vec<Option<f64>> = ds.rows().iter().map(|r| r[0].as_f64()).collect();
        assert_eq!(valor, vec![Some(1500.0), Some(2500.0), Some(3000.0)]);
        let peso: Vec<Option<f64>> = ds.rows().iter().map(|r| r[1].as_f64()).collect();
        assert_eq!(peso, vec![Some(1.5), Some(2.25), Some(3.0)]);
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Dataset::new(
            "bad",
            vec![Column::new("a", ColumnKind::Text)],
            vec![vec![CellValue::Null, CellValue::Null]],
        )
        .unwrap_err();
        assert_eq!(
            err,
            DatasetError::RaggedRow {
                row: 0,
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn rejects_duplicate_columns() {
        let err = Dataset::new(
            "dup",
            vec![
                Column::new("valor", ColumnKind::Numeric),
                Column::new("valor", ColumnKind::Numeric),
            ],
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, DatasetError::DuplicateColumn("valor".into()));
    }

    #[test]
    fn text_cells_coerce_for_aggregation() {
        assert_eq!(CellValue::Text("1.000,00".into()).as_f64(), Some(1000.0));
        assert_eq!(CellValue::Text("n/d".into()).as_f64(), None);
        assert_eq!(CellValue::Text("  ".into()).as_key(), None);
        assert_eq!(CellValue::Integer(7).as_key(), Some("7".into()));
    }
}
