use std::sync::Arc;

use rand::seq::index;
use rand::Rng;

use crate::analysis::union::{align, cells_at, UnionView};
use crate::data::model::Dataset;

pub const DEFAULT_PERSONA: &str = "Você é um analista especialista em NF-e brasileiras.";

/// Rows sampled per dataset when no limit is configured.
pub const DEFAULT_SAMPLE_ROWS: usize = 1000;

const SEPARATOR: &str = " | ";

/// Render a bounded sample of the union as a plain text table.
///
/// At most `cap` rows are drawn from each dataset, uniformly and without
/// replacement, and kept in their original order. Columns follow the union.
pub fn sample_table<R: Rng + ?Sized>(snapshot: &[Arc<Dataset>], cap: usize, rng: &mut R) -> String {
    let view = UnionView::new(snapshot);
    let columns = view.columns();

    let mut out = columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(SEPARATOR);

    for ds in snapshot {
        let amount = cap.min(ds.len());
        let mut picked = index::sample(rng, ds.len(), amount).into_vec();
        picked.sort_unstable();

        let mapping = align(&columns, ds);
        for i in picked {
            let line = cells_at(&mapping, &ds.rows()[i])
                .iter()
                .map(|cell| cell.to_string())
                .collect::<Vec<_>>()
                .join(SEPARATOR);
            out.push('\n');
            out.push_str(&line);
        }
    }
    out
}

/// Combine a data sample and a free-form question into the user prompt.
pub fn build_prompt(sample: &str, question: &str) -> String {
    format!(
        "Você é um especialista em notas fiscais brasileiras (NF-e). \
         Analise os dados e responda de forma técnica e precisa.\n\n\
         Dados (amostra representativa):\n{sample}\n\n\
         Pergunta: {question}\n\n\
         Inclua insights relevantes sobre:\
         \n- Relação entre fornecedores e valores\
         \n- Padrões temporais\
         \n- Anomalias potenciais\
         \n- Conformidade com legislação brasileira"
    )
}
