use std::path::Path;

use crate::analysis::{Analysis, AnalysisError, Query, YearMonth};
use crate::context::{AnalystContext, Answer};
use crate::data::filter::filtered_indices;
use crate::data::model::ColumnKind;
use crate::remote::PendingReply;

// ---------------------------------------------------------------------------
// Chat log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Agent,
    System,
    Error,
}

impl Sender {
    pub fn label(self) -> &'static str {
        match self {
            Sender::User => "Você",
            Sender::Agent => "Agente",
            Sender::System => "Sistema",
            Sender::Error => "Erro",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// `HH:MM` local time.
    pub timestamp: String,
    pub sender: Sender,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Table,
    Metadata,
    Charts,
}

/// Series shown in the charts tab, recomputed whenever the registry changes.
#[derive(Debug, Clone, Default)]
pub struct ChartData {
    pub top_suppliers: Vec<(String, f64)>,
    pub frequency: Vec<(String, usize)>,
    pub months: Vec<(YearMonth, usize)>,
    /// First numeric column of the active dataset and its values.
    pub histogram: Option<(String, Vec<f64>)>,
}

const WELCOME: &str = "SISTEMA ESPECIALISTA EM NOTAS FISCAIS\n\n\
• Carregue arquivos ZIP ou CSV com dados de NF-e\n\
• Utilize as ferramentas de análise rápida\n\
• Consulte o especialista para perguntas complexas\n\
• Visualize os dados em tabelas e gráficos\n\n\
Dica: você pode arrastar e soltar arquivos na janela!";

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub analyst: AnalystContext,

    pub tab: Tab,

    /// Table search text and the active dataset rows it keeps.
    pub search: String,
    pub visible_indices: Vec<usize>,

    pub chat: Vec<ChatMessage>,
    pub input: String,

    /// Remote reply in flight; at most one at a time.
    pub pending: Option<PendingReply>,

    pub charts: ChartData,

    /// File awaiting removal confirmation.
    pub pending_removal: Option<String>,

    /// Top-bar status, tagged so errors and progress are coloured apart.
    pub status_message: Option<(Sender, String)>,
}

impl AppState {
    pub fn new(analyst: AnalystContext) -> Self {
        let mut state = Self {
            analyst,
            tab: Tab::default(),
            search: String::new(),
            visible_indices: Vec::new(),
            chat: Vec::new(),
            input: String::new(),
            pending: None,
            charts: ChartData::default(),
            pending_removal: None,
            status_message: None,
        };
        state.push(Sender::System, WELCOME);
        state.refresh();
        state
    }

    pub fn push(&mut self, sender: Sender, text: impl Into<String>) {
        self.chat.push(ChatMessage {
            timestamp: chrono::Local::now().format("%H:%M").to_string(),
            sender,
            text: text.into(),
        });
    }

    pub fn busy(&self) -> bool {
        self.pending.is_some()
    }

    // -- files --------------------------------------------------------------

    pub fn open_path(&mut self, path: &Path) {
        match self.analyst.ingest(path) {
            Ok(report) => {
                for file in report {
                    let mut text = format!(
                        "Arquivo carregado: {} ({} registros)",
                        file.name,
                        crate::analysis::format_count(file.rows)
                    );
                    if file.skipped_rows > 0 {
                        text.push_str(&format!(", {} linhas malformadas ignoradas", file.skipped_rows));
                    }
                    self.push(Sender::System, text);
                }
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", path.display());
                self.push(Sender::Error, format!("Falha ao carregar {}: {e:#}", path.display()));
                self.status_message = Some((Sender::Error, format!("Erro: {e:#}")));
            }
        }
        self.refresh();
    }

    pub fn select(&mut self, name: &str) {
        if self.analyst.select(name).is_ok() {
            self.push(Sender::System, format!("Arquivo selecionado: {name}"));
            self.refresh();
        }
    }

    /// Ask for confirmation before removing `name`.
    pub fn request_removal(&mut self, name: &str) {
        self.pending_removal = Some(name.to_string());
    }

    pub fn confirm_removal(&mut self, confirmed: bool) {
        let Some(name) = self.pending_removal.take() else {
            return;
        };
        if !confirmed {
            return;
        }
        match self.analyst.remove(&name) {
            Ok(()) => self.push(Sender::System, format!("Arquivo removido: {name}")),
            Err(e) => self.push(Sender::Error, e.to_string()),
        }
        self.refresh();
    }

    pub fn export_to(&mut self, path: &Path) {
        match self.analyst.export(path) {
            Ok(rows) => self.push(
                Sender::System,
                format!("Dados exportados para {} ({rows} registros)", path.display()),
            ),
            Err(e) => {
                log::error!("Export failed: {e:#}");
                self.push(Sender::Error, format!("Falha ao exportar dados: {e:#}"));
            }
        }
    }

    // -- derived views ------------------------------------------------------

    /// Recompute the search filter and the chart series.
    pub fn refresh(&mut self) {
        self.refilter();

        let charts = ChartData {
            top_suppliers: match self.analyst.run(Query::TopSuppliers { n: 5 }) {
                Ok(Analysis::TopSuppliers { entries, .. }) => entries,
                _ => Vec::new(),
            },
            frequency: match self.analyst.run(Query::SupplierFrequency { n: 5 }) {
                Ok(Analysis::SupplierFrequency { entries, .. }) => entries,
                _ => Vec::new(),
            },
            months: match self.analyst.run(Query::TemporalDistribution) {
                Ok(Analysis::TemporalDistribution { buckets, .. }) => buckets,
                _ => Vec::new(),
            },
            histogram: self.analyst.registry().active().and_then(|ds| {
                let idx = ds.columns().iter().position(|c| c.kind == ColumnKind::Numeric)?;
                let values = ds.rows().iter().filter_map(|r| r[idx].as_f64()).collect();
                Some((ds.columns()[idx].name.clone(), values))
            }),
        };
        self.charts = charts;
    }

    pub fn refilter(&mut self) {
        self.visible_indices = match self.analyst.registry().active() {
            Some(ds) => filtered_indices(ds, &self.search),
            None => Vec::new(),
        };
    }

    // -- questions ----------------------------------------------------------

    /// Send the input line as a question.
    pub fn submit_input(&mut self) {
        let question = self.input.trim().to_string();
        if question.is_empty() || self.busy() {
            return;
        }
        self.input.clear();
        self.ask(&question);
    }

    pub fn ask(&mut self, question: &str) {
        if self.analyst.registry().is_empty() {
            self.push(Sender::Error, AnalysisError::NoData.to_string());
            return;
        }
        self.push(Sender::User, question);

        match self.analyst.ask(question) {
            Answer::Local(analysis) => self.push(Sender::Agent, analysis.to_string()),
            Answer::Failed(err) => self.push(Sender::Error, err.to_string()),
            Answer::Remote(pending) => {
                self.status_message =
                    Some((Sender::System, "Consultando especialista...".to_string()));
                self.pending = Some(pending);
            }
        }
    }

    /// Run a quick-analysis button.
    pub fn run_quick(&mut self, query: Query) {
        match self.analyst.run(query) {
            Ok(analysis) => self.push(Sender::Agent, analysis.to_string()),
            Err(err) => self.push(Sender::Error, err.to_string()),
        }
    }

    /// Move a finished remote reply into the chat. Returns `true` when one arrived.
    pub fn poll_remote(&mut self) -> bool {
        let Some(result) = self.pending.as_ref().and_then(PendingReply::try_take) else {
            return false;
        };
        self.pending = None;
        self.status_message = None;
        match result {
            Ok(text) => self.push(Sender::Agent, text),
            Err(err) => self.push(Sender::Error, err.to_string()),
        }
        true
    }
}
