use std::fmt;

use thiserror::Error;

use super::columns::ColumnRole;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Expected failure of an analysis or of the remote fallback.
///
/// Every variant renders as a short sentence meant for the end user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Nenhum dado carregado")]
    NoData,
    #[error("Coluna de {0} não encontrada nos dados")]
    MissingColumn(ColumnRole),
    #[error("Parâmetro inválido '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Falha na consulta ao especialista: {0}")]
    Remote(String),
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Calendar month bucket, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// The month after this one.
    pub fn next(self) -> Self {
        if self.month >= 12 {
            YearMonth { year: self.year + 1, month: 1 }
        } else {
            YearMonth { year: self.year, month: self.month + 1 }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Describe-style summary of the invoice values.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; undefined below two values.
    pub std: Option<f64>,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Outcome of a local analysis: plain data the shells render as they like.
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    TopSuppliers {
        n: usize,
        entries: Vec<(String, f64)>,
    },
    SupplierFrequency {
        n: usize,
        entries: Vec<(String, usize)>,
    },
    InvoiceCount {
        total: usize,
        per_dataset: Vec<(String, usize)>,
    },
    MeanValue {
        /// `None` when no row carries a numeric value.
        mean: Option<f64>,
        counted: usize,
        excluded: usize,
    },
    TemporalDistribution {
        buckets: Vec<(YearMonth, usize)>,
        /// Non-empty values that could not be read as dates.
        dropped: usize,
        /// Rows without any date.
        missing: usize,
    },
    ValueStatistics {
        stats: Option<ValueStats>,
        excluded: usize,
    },
}

impl Analysis {
    /// Headline sentence.
    pub fn label(&self) -> String {
        match self {
            Analysis::TopSuppliers { n: 1, .. } => "Fornecedor com maior valor total".to_string(),
            Analysis::TopSuppliers { n, .. } => format!("Top {n} fornecedores por valor total"),
            Analysis::SupplierFrequency { n, .. } => format!("Top {n} fornecedores (frequência)"),
            Analysis::InvoiceCount { total, .. } => {
                format!("Total de notas fiscais: {}", format_count(*total))
            }
            Analysis::MeanValue { mean: Some(m), .. } => {
                format!("Valor médio das notas: {}", format_brl(*m))
            }
            Analysis::MeanValue { mean: None, .. } => {
                "Valor médio das notas: nenhum valor numérico encontrado".to_string()
            }
            Analysis::TemporalDistribution { .. } => "Distribuição temporal (mensal)".to_string(),
            Analysis::ValueStatistics { .. } => "Estatísticas dos valores".to_string(),
        }
    }

    /// Ordered key/value pairs under the headline.
    pub fn rows(&self) -> Vec<(String, String)> {
        match self {
            Analysis::TopSuppliers { entries, .. } => entries
                .iter()
                .map(|(name, total)| (name.clone(), format_brl(*total)))
                .collect(),
            Analysis::SupplierFrequency { entries, .. } => entries
                .iter()
                .map(|(name, count)| (name.clone(), format_count(*count)))
                .collect(),
            Analysis::InvoiceCount { per_dataset, .. } if per_dataset.len() > 1 => per_dataset
                .iter()
                .map(|(name, count)| (name.clone(), format_count(*count)))
                .collect(),
            Analysis::InvoiceCount { .. } => Vec::new(),
            Analysis::MeanValue { counted, .. } => {
                vec![("Notas consideradas".to_string(), format_count(*counted))]
            }
            Analysis::TemporalDistribution { buckets, .. } => buckets
                .iter()
                .map(|(month, count)| (month.to_string(), format_count(*count)))
                .collect(),
            Analysis::ValueStatistics { stats: None, .. } => Vec::new(),
            Analysis::ValueStatistics {
                stats: Some(s), ..
            } => vec![
                ("Quantidade".to_string(), format_count(s.count)),
                ("Média".to_string(), format_brl(s.mean)),
                (
                    "Desvio padrão".to_string(),
                    s.std.map(format_brl).unwrap_or_else(|| "-".to_string()),
                ),
                ("Mínimo".to_string(), format_brl(s.min)),
                ("25%".to_string(), format_brl(s.q1)),
                ("50%".to_string(), format_brl(s.median)),
                ("75%".to_string(), format_brl(s.q3)),
                ("Máximo".to_string(), format_brl(s.max)),
            ],
        }
    }

    /// Non-fatal annotations: values left out of the aggregation.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        match self {
            Analysis::MeanValue { excluded, .. } | Analysis::ValueStatistics { excluded, .. }
                if *excluded > 0 =>
            {
                warnings.push(format!("{excluded} valores não numéricos foram ignorados"));
            }
            Analysis::TemporalDistribution {
                dropped, missing, ..
            } => {
                if *dropped > 0 {
                    warnings.push(format!("{dropped} datas inválidas foram ignoradas"));
                }
                if *missing > 0 {
                    warnings.push(format!("{missing} notas sem data foram ignoradas"));
                }
            }
            _ => {}
        }
        warnings
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())?;

        let rows = self.rows();
        if !rows.is_empty() {
            let width = rows.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
            writeln!(f)?;
            for (key, value) in &rows {
                let pad = width - key.chars().count();
                write!(f, "\n{key}{}  {value}", " ".repeat(pad))?;
            }
        }

        for warning in self.warnings() {
            write!(f, "\n⚠ {warning}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Brazilian number formatting
// ---------------------------------------------------------------------------

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// `1234567` → `1.234.567`
pub fn format_count(n: usize) -> String {
    group_thousands(&n.to_string())
}

/// `1234.5` → `R$ 1.234,50`
pub fn format_brl(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u128;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{sign}R$ {},{:02}",
        group_thousands(&(cents / 100).to_string()),
        cents % 100
    )
}
