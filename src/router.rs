//! Question routing: canned questions go to the local engine, anything else
//! is left for the remote fallback.

use std::collections::HashMap;

use crate::analysis::Query;

/// A catalog entry: short button label, full question text and the local query it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredefinedQuestion {
    pub key: String,
    pub text: String,
    pub query: Query,
}

impl PredefinedQuestion {
    pub fn new(key: impl Into<String>, text: impl Into<String>, query: Query) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            query,
        }
    }
}

/// Outcome of routing a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Local(&'a PredefinedQuestion),
    Unmatched,
}

fn normalize(question: &str) -> String {
    question.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Fixed set of predefined questions, looked up by normalized key or text.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<PredefinedQuestion>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(entries: Vec<PredefinedQuestion>) -> Self {
        let mut index = HashMap::with_capacity(entries.len() * 2);
        for (i, entry) in entries.iter().enumerate() {
            index.entry(normalize(&entry.key)).or_insert(i);
            index.entry(normalize(&entry.text)).or_insert(i);
        }
        Self { entries, index }
    }

    /// The invoice questions offered as quick buttons.
    pub fn nfe() -> Self {
        Self::new(vec![
            PredefinedQuestion::new(
                "Maior Fornecedor",
                "Qual é o fornecedor com maior valor total nas notas fiscais?",
                Query::TopSuppliers { n: 1 },
            ),
            PredefinedQuestion::new(
                "Total NFs",
                "Quantas notas fiscais existem no total?",
                Query::CountInvoices,
            ),
            PredefinedQuestion::new(
                "Valor Médio",
                "Qual é o valor médio das notas fiscais?",
                Query::MeanValue,
            ),
            PredefinedQuestion::new(
                "Top 3 Fornecedores",
                "Quais são os 3 fornecedores com maior valor total?",
                Query::TopSuppliers { n: 3 },
            ),
            PredefinedQuestion::new(
                "Distribuição Temporal",
                "Qual é a distribuição temporal das notas fiscais?",
                Query::TemporalDistribution,
            ),
        ])
    }

    pub fn entries(&self) -> &[PredefinedQuestion] {
        &self.entries
    }

    pub fn lookup(&self, question: &str) -> Option<&PredefinedQuestion> {
        self.index
            .get(&normalize(question))
            .map(|&i| &self.entries[i])
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Router {
    catalog: Catalog,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Catalog::nfe())
    }
}

impl Router {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Exact match after trimming and case folding; no fuzzy matching.
    pub fn route(&self, question: &str) -> Route<'_> {
        match self.catalog.lookup(question) {
            Some(entry) => {
                log::debug!("question routed locally to {:?}", entry.query);
                Route::Local(entry)
            }
            None => Route::Unmatched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_canonical_text_in_any_case() {
        let router = Router::default();
        for q in [
            "Quantas notas fiscais existem no total?",
            "QUANTAS NOTAS FISCAIS EXISTEM NO TOTAL?",
            "  quantas notas fiscais existem no total?\n",
        ] {
            match router.route(q) {
                Route::Local(entry) => assert_eq!(entry.query, Query::CountInvoices),
                Route::Unmatched => panic!("{q:?} should route locally"),
            }
        }
    }

    #[test]
    fn routes_short_keys() {
        let router = Router::default();
        let Route::Local(entry) = router.route("top 3 fornecedores") else {
            panic!("short key should route locally");
        };
        assert_eq!(entry.query, Query::TopSuppliers { n: 3 });
        assert!(matches!(router.route("Distribuição Temporal"), Route::Local(_)));
    }

    #[test]
    fn unknown_and_partial_questions_are_unmatched() {
        let router = Router::default();
        assert_eq!(router.route("Qual o estado com mais notas?"), Route::Unmatched);
        assert_eq!(router.route("Quantas notas fiscais"), Route::Unmatched);
        assert_eq!(router.route(""), Route::Unmatched);
    }

    #[test]
    fn new_entries_need_no_router_change() {
        let mut entries = Catalog::nfe().entries().to_vec();
        entries.push(PredefinedQuestion::new(
            "Estatísticas",
            "Quais são as estatísticas dos valores?",
            Query::ValueStatistics,
        ));
        let router = Router::new(Catalog::new(entries));
        let Route::Local(entry) = router.route("estatísticas") else {
            panic!("added entry should route locally");
        };
        assert_eq!(entry.query, Query::ValueStatistics);
    }

    #[test]
    fn nfe_catalog_has_five_questions() {
        assert_eq!(Catalog::nfe().entries().len(), 5);
    }
}
