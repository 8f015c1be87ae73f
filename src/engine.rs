//! The engine facade exposed to request handlers and the admin surface.
//!
//! ```text
//! context_for_question ─▶ RelevanceSelector ─▶ DateResolver ─▶ DocumentStore
//!        │                                                      │
//!        ▼                                                      ├─▶ VersionCatalog
//!  ContextAssembler                                             └─▶ ContentLoader
//! ```
//!
//! The engine is cheap to share behind an `Arc`; every read works on a
//! snapshot of the document set (see [`crate::store`]).

use anyhow::Context as _;
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;

use crate::assemble::ContextAssembler;
use crate::catalog::VersionCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::loader::{ContentLoader, FsTextSource, TextSource};
use crate::models::{DocumentPatch, DocumentStats, DocumentType, ManagedDocument, NewDocument};
use crate::relevance::{ContextBundle, KeywordMatcher, RelevanceMatcher, RelevanceSelector};
use crate::resolver::DateResolver;
use crate::store::DocumentStore;

/// Assembled prompt context together with the bundle it was rendered from.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub bundle: ContextBundle,
    pub text: String,
}

pub struct ContextEngine {
    store: Arc<DocumentStore>,
    resolver: DateResolver,
    selector: RelevanceSelector,
    assembler: ContextAssembler,
}

impl ContextEngine {
    /// Wires the pipeline and materializes the document set.
    pub async fn new(
        catalog: VersionCatalog,
        source: Arc<dyn TextSource>,
        clock: Arc<dyn Clock>,
        matcher: Arc<dyn RelevanceMatcher>,
    ) -> Self {
        let store = Arc::new(DocumentStore::new(
            Arc::new(catalog),
            ContentLoader::new(source),
            clock,
        ));
        store.materialize().await;

        let resolver = DateResolver::new(store.clone());
        let selector = RelevanceSelector::new(resolver.clone(), matcher);
        Self {
            store,
            resolver,
            selector,
            assembler: ContextAssembler::new(),
        }
    }

    /// Builds the engine from configuration: filesystem source under
    /// `[documents].root`, system clock, configured or built-in catalog and
    /// keyword categories.
    ///
    /// Fails if the catalog violates the window rules.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let catalog = VersionCatalog::from_specs(config.catalog_specs())
            .context("Invalid document catalog in config")?;

        Ok(Self::new(
            catalog,
            Arc::new(FsTextSource::new(config.documents.root.clone())),
            Arc::new(SystemClock),
            Arc::new(KeywordMatcher::new(config.keyword_categories())),
        )
        .await)
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub fn catalog(&self) -> &VersionCatalog {
        self.store.catalog()
    }

    /// Prompt context for `question` about the payslip of `month`
    /// (1-based) / `year`.
    pub fn context_for_question(&self, question: &str, month: u32, year: i32) -> Result<String> {
        Ok(self.assemble(question, month, year)?.text)
    }

    /// Like [`context_for_question`](Self::context_for_question) but keeps
    /// the bundle so callers can inspect how it was selected.
    pub fn assemble(&self, question: &str, month: u32, year: i32) -> Result<AssembledContext> {
        let bundle = self.selector.select(question, month, year)?;
        let text = self.assembler.render(&bundle);
        Ok(AssembledContext { bundle, text })
    }

    /// Prompt context for the clock's current month.
    pub fn context_for_question_now(&self, question: &str) -> Result<String> {
        let today = self.store.clock().today();
        self.context_for_question(question, today.month(), today.year())
    }

    pub fn select(&self, question: &str, month: u32, year: i32) -> Result<ContextBundle> {
        self.selector.select(question, month, year)
    }

    pub fn render(&self, bundle: &ContextBundle) -> String {
        self.assembler.render(bundle)
    }

    pub fn documents_for_date(&self, date: NaiveDate) -> Vec<ManagedDocument> {
        self.resolver.for_date(date)
    }

    pub fn latest_for_date(&self, date: NaiveDate) -> Vec<ManagedDocument> {
        self.resolver.latest_for_date(date)
    }

    pub fn documents_for_period(&self, month: u32, year: i32) -> Result<Vec<ManagedDocument>> {
        self.resolver.for_payslip_period(month, year)
    }

    /// Forces re-materialization from the text sources.
    ///
    /// Discards administrative edits made since the last refresh.
    pub async fn refresh(&self) -> usize {
        self.store.refresh().await
    }

    pub fn list(&self) -> Vec<ManagedDocument> {
        self.store.list()
    }

    pub fn get(&self, id: &str) -> Option<ManagedDocument> {
        self.store.get(id)
    }

    pub fn search(&self, query: &str) -> Vec<ManagedDocument> {
        self.store.search(query)
    }

    pub fn by_type(&self, doc_type: DocumentType) -> Vec<ManagedDocument> {
        self.store.by_type(doc_type)
    }

    pub fn versions_of(&self, key: &str) -> Vec<ManagedDocument> {
        self.store.versions_of(key)
    }

    pub fn stats(&self) -> DocumentStats {
        self.store.stats()
    }

    pub fn create(&self, new: NewDocument) -> Result<ManagedDocument> {
        self.store.create(new)
    }

    pub fn update(&self, id: &str, patch: DocumentPatch) -> Result<ManagedDocument> {
        self.store.update(id, patch)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id)
    }
}
