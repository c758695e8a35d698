//! Process-wide analyst context: the registry plus the collaborators that
//! read it. Built once at startup and handed to whichever shell is running.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::analysis::{Analysis, AnalysisError, Engine, Query};
use crate::config::Config;
use crate::data::export::export_union;
use crate::data::loader::load_file;
use crate::data::model::Dataset;
use crate::data::registry::{Registry, RegistryError};
use crate::remote::{OpenAiChat, PendingReply, RemoteError, RemoteFallback, Unconfigured};
use crate::router::{Route, Router};

/// One table registered by an ingest call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    pub name: String,
    pub rows: usize,
    pub skipped_rows: usize,
}

/// How a question was answered.
#[derive(Debug)]
pub enum Answer {
    Local(Analysis),
    Remote(PendingReply),
    Failed(AnalysisError),
}

#[derive(Debug)]
pub struct AnalystContext {
    registry: Registry,
    router: Router,
    engine: Engine,
    remote: RemoteFallback,
}

impl AnalystContext {
    pub fn new(router: Router, engine: Engine, remote: RemoteFallback) -> Self {
        Self {
            registry: Registry::new(),
            router,
            engine,
            remote,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, RemoteError> {
        let remote = match &config.openai {
            Some(openai) => RemoteFallback::new(Arc::new(OpenAiChat::new(openai)?), config.sample_rows),
            None => RemoteFallback::new(Arc::new(Unconfigured), config.sample_rows),
        };
        Ok(Self::new(Router::default(), Engine::default(), remote))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    // -- registry -----------------------------------------------------------

    /// Load every table in `path` and register it under its file name.
    pub fn ingest(&mut self, path: &Path) -> Result<Vec<Ingested>> {
        let loaded = load_file(path)?;
        let mut report = Vec::with_capacity(loaded.len());
        for file in loaded {
            report.push(Ingested {
                name: file.dataset.name().to_string(),
                rows: file.dataset.len(),
                skipped_rows: file.skipped_rows,
            });
            self.registry.register(file.dataset);
        }
        Ok(report)
    }

    pub fn register(&mut self, dataset: Dataset) {
        self.registry.register(dataset);
    }

    pub fn remove(&mut self, name: &str) -> Result<(), RegistryError> {
        self.registry.remove(name).map(|_| ())
    }

    pub fn select(&mut self, name: &str) -> Result<(), RegistryError> {
        self.registry.select(name)
    }

    pub fn export(&self, path: &Path) -> Result<usize> {
        export_union(path, &self.registry.all())
    }

    // -- questions ----------------------------------------------------------

    pub fn run(&self, query: Query) -> Result<Analysis, AnalysisError> {
        self.engine.run(query, &self.registry.all())
    }

    /// Answer `question` locally when it is a catalog question, otherwise
    /// start a remote request on a background thread.
    pub fn ask(&self, question: &str) -> Answer {
        if self.registry.is_empty() {
            return Answer::Failed(AnalysisError::NoData);
        }
        match self.router.route(question) {
            Route::Local(entry) => match self.run(entry.query) {
                Ok(analysis) => Answer::Local(analysis),
                Err(err) => Answer::Failed(err),
            },
            Route::Unmatched => Answer::Remote(self.remote.spawn(&self.registry.all(), question)),
        }
    }

    /// Like [`ask`](Self::ask), but waits for a remote reply and renders the result.
    pub fn ask_blocking(&self, question: &str) -> Result<String, AnalysisError> {
        if self.registry.is_empty() {
            return Err(AnalysisError::NoData);
        }
        match self.router.route(question) {
            Route::Local(entry) => self.run(entry.query).map(|a| a.to_string()),
            Route::Unmatched => self.remote.ask(&self.registry.all(), question),
        }
    }
}
