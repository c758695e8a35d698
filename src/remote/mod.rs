//! Remote fallback: free-form questions answered by a chat-completion model
//! from a sample of the loaded data.
//!
//! The registry snapshot is captured and rendered on the caller's thread;
//! only the finished prompt crosses into the worker, which never touches the
//! registry.

pub mod openai;
pub mod prompt;

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::data::model::Dataset;

pub use openai::OpenAiChat;
pub use prompt::{build_prompt, sample_table, DEFAULT_PERSONA, DEFAULT_SAMPLE_ROWS};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("erro de rede: {0}")]
    Http(#[from] reqwest::Error),
    #[error("o serviço respondeu {status}: {body}")]
    Api { status: u16, body: String },
    #[error("resposta vazia do modelo")]
    EmptyResponse,
    #[error("chave de API não configurada (defina OPENAI_API_KEY)")]
    NotConfigured,
}

impl From<RemoteError> for AnalysisError {
    fn from(err: RemoteError) -> Self {
        AnalysisError::Remote(err.to_string())
    }
}

/// Anything that turns a persona and a prompt into a reply.
pub trait ChatBackend: Send + Sync {
    fn complete(&self, persona: &str, prompt: &str) -> Result<String, RemoteError>;
}

// ---------------------------------------------------------------------------
// Fallback adapter
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct RemoteFallback {
    backend: Arc<dyn ChatBackend>,
    persona: String,
    sample_cap: usize,
}

impl RemoteFallback {
    pub fn new(backend: Arc<dyn ChatBackend>, sample_cap: usize) -> Self {
        Self {
            backend,
            persona: DEFAULT_PERSONA.to_string(),
            sample_cap,
        }
    }

    /// Build the prompt for `question` from `snapshot`.
    pub fn prepare(&self, snapshot: &[Arc<Dataset>], question: &str) -> String {
        let sample = sample_table(snapshot, self.sample_cap, &mut rand::thread_rng());
        build_prompt(&sample, question)
    }

    /// Ask on a background thread; poll the returned handle for the reply.
    pub fn spawn(&self, snapshot: &[Arc<Dataset>], question: &str) -> PendingReply {
        let prompt = self.prepare(snapshot, question);
        let backend = Arc::clone(&self.backend);
        let persona = self.persona.clone();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = backend.complete(&persona, &prompt).map_err(|e| {
                log::error!("remote question failed: {e}");
                AnalysisError::from(e)
            });
            // The receiver may be gone if the window closed meanwhile.
            let _ = tx.send(result);
        });

        PendingReply {
            question: question.to_string(),
            rx,
        }
    }

    /// Ask and block until the reply arrives.
    pub fn ask(&self, snapshot: &[Arc<Dataset>], question: &str) -> Result<String, AnalysisError> {
        let prompt = self.prepare(snapshot, question);
        self.backend.complete(&self.persona, &prompt).map_err(|e| {
            log::error!("remote question failed: {e}");
            AnalysisError::from(e)
        })
    }
}

impl std::fmt::Debug for RemoteFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFallback")
            .field("persona", &self.persona)
            .field("sample_cap", &self.sample_cap)
            .finish_non_exhaustive()
    }
}

/// A remote answer still in flight.
#[derive(Debug)]
pub struct PendingReply {
    question: String,
    rx: Receiver<Result<String, AnalysisError>>,
}

impl PendingReply {
    pub fn question(&self) -> &str {
        &self.question
    }

    /// The reply if it has arrived. A worker that died without answering
    /// counts as a remote failure.
    pub fn try_take(&self) -> Option<Result<String, AnalysisError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(AnalysisError::Remote(
                "a consulta foi interrompida".to_string(),
            ))),
        }
    }

    /// Block until the reply arrives.
    pub fn wait(self) -> Result<String, AnalysisError> {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(AnalysisError::Remote("a consulta foi interrompida".to_string())))
    }
}

/// Backend used when no API key is configured.
#[derive(Debug, Default)]
pub struct Unconfigured;

impl ChatBackend for Unconfigured {
    fn complete(&self, _persona: &str, _prompt: &str) -> Result<String, RemoteError> {
        Err(RemoteError::NotConfigured)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeChat;
    use super::*;
    use crate::data::model::{CellValue, Column, ColumnKind};

    fn snapshot() -> Vec<Arc<Dataset>> {
        vec![Arc::new(
            Dataset::new(
                "nfe.csv",
                vec![Column::new("fornecedor", ColumnKind::Text)],
                vec![vec![CellValue::Text("ACME".into())]],
            )
            .unwrap(),
        )]
    }

    #[test]
    fn ask_sends_persona_and_prompt() {
        let fake = Arc::new(FakeChat::answering("ok"));
        let remote = RemoteFallback::new(fake.clone(), 10);

        assert_eq!(remote.ask(&snapshot(), "Quem é o maior?").unwrap(), "ok");

        let prompts = fake.prompts.lock().unwrap();
        assert_eq!(prompts[0].0, DEFAULT_PERSONA);
        assert!(prompts[0].1.contains("fornecedor\nACME"));
        assert!(prompts[0].1.contains("Pergunta: Quem é o maior?"));
    }

    #[test]
    fn spawned_reply_arrives_through_the_handle() {
        let remote = RemoteFallback::new(Arc::new(FakeChat::answering("resposta")), 10);
        let pending = remote.spawn(&snapshot(), "E então?");
        assert_eq!(pending.question(), "E então?");
        assert_eq!(pending.wait().unwrap(), "resposta");
    }

    #[test]
    fn failures_become_remote_analysis_errors() {
        let remote = RemoteFallback::new(Arc::new(Unconfigured), 10);
        let err = remote.spawn(&snapshot(), "?").wait().unwrap_err();
        assert!(matches!(err, AnalysisError::Remote(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn dead_worker_is_reported() {
        let (tx, rx) = mpsc::channel::<Result<String, AnalysisError>>();
        drop(tx);
        let pending = PendingReply {
            question: "?".into(),
            rx,
        };
        assert!(matches!(pending.try_take(), Some(Err(AnalysisError::Remote(_)))));
    }
}
