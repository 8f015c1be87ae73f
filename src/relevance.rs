//! Relevance selection: narrowing a period's documents to a question.
//!
//! # Algorithm
//!
//! 1. Resolve the documents effective for the payslip period.
//! 2. Ask the [`RelevanceMatcher`] which topics the question touches.
//! 3. For each topic in order, collect every period document matching it.
//! 4. De-duplicate by id, keeping first-seen order.
//!
//! The outcome is one of three [`BundleKind`]s:
//!
//! | Kind | When |
//! |------|------|
//! | `Relevant` | at least one document matched a triggered topic |
//! | `Overview` | documents exist for the period but none matched |
//! | `EmptyPeriod` | no document is effective for the period at all |
//!
//! `Overview` carries the full period set so the prompt context is never
//! silently empty while documents exist.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::models::ManagedDocument;
use crate::resolver::{payslip_reference_date, DateResolver};

/// A named topic and the phrases that trigger it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeywordCategory {
    pub name: String,
    pub keywords: Vec<String>,
}

impl KeywordCategory {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// The payroll topics used when no categories are configured.
pub fn default_categories() -> Vec<KeywordCategory> {
    vec![
        KeywordCategory::new("tax", &["tax", "deduction", "withholding", "bracket", "rate"]),
        KeywordCategory::new(
            "overtime",
            &["overtime", "extra hours", "weekend", "holiday work"],
        ),
        KeywordCategory::new(
            "benefits",
            &["benefit", "insurance", "health", "dental", "vision", "retirement"],
        ),
        KeywordCategory::new(
            "salary",
            &["salary", "wage", "pay", "allowance", "basic salary", "housing"],
        ),
        KeywordCategory::new("policy", &["policy", "rule", "regulation", "procedure"]),
    ]
}

/// Strategy deciding which documents answer a question.
///
/// Selection is topic-major: [`topics`](Self::topics) fixes the order in
/// which documents are collected.
pub trait RelevanceMatcher: Send + Sync {
    /// Topics the question touches, in priority order.
    fn topics(&self, question: &str) -> Vec<String>;

    /// Whether `document` belongs to `topic`.
    fn matches_topic(&self, topic: &str, document: &ManagedDocument) -> bool;

    fn matches_question(&self, question: &str, document: &ManagedDocument) -> bool {
        self.topics(question)
            .iter()
            .any(|t| self.matches_topic(t, document))
    }
}

/// Case-insensitive substring matching against keyword categories.
///
/// A category triggers when any of its keywords occurs in the question. A
/// document matches a triggered category when its name, description, or
/// content contains the category name or any of its keywords. There is no
/// tokenization, so `"pay"` also matches `"payslip"`.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    categories: Vec<KeywordCategory>,
}

impl KeywordMatcher {
    /// Blank keywords are dropped, since an empty string occurs in every
    /// text. A category left without keywords never triggers.
    pub fn new(categories: Vec<KeywordCategory>) -> Self {
        let categories = categories
            .into_iter()
            .map(|c| KeywordCategory {
                name: c.name.to_lowercase(),
                keywords: c
                    .keywords
                    .iter()
                    .filter(|k| !k.trim().is_empty())
                    .map(|k| k.to_lowercase())
                    .collect(),
            })
            .collect();
        Self { categories }
    }

    pub fn categories(&self) -> &[KeywordCategory] {
        &self.categories
    }
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self::new(default_categories())
    }
}

impl RelevanceMatcher for KeywordMatcher {
    fn topics(&self, question: &str) -> Vec<String> {
        let question = question.to_lowercase();
        self.categories
            .iter()
            .filter(|c| c.keywords.iter().any(|k| question.contains(k.as_str())))
            .map(|c| c.name.clone())
            .collect()
    }

    fn matches_topic(&self, topic: &str, document: &ManagedDocument) -> bool {
        let Some(category) = self.categories.iter().find(|c| c.name == topic) else {
            return false;
        };
        let fields = [
            document.name.to_lowercase(),
            document.description.to_lowercase(),
            document.content.to_lowercase(),
        ];
        std::iter::once(&category.name)
            .chain(category.keywords.iter())
            .any(|term| fields.iter().any(|f| f.contains(term.as_str())))
    }
}

/// How a [`ContextBundle`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleKind {
    Relevant,
    Overview,
    EmptyPeriod,
}

/// One selected document and the topic that selected it.
#[derive(Debug, Clone, Serialize)]
pub struct BundleEntry {
    pub document: ManagedDocument,
    /// `None` for overview entries.
    pub category: Option<String>,
}

/// Documents chosen for one question and payslip period.
#[derive(Debug, Clone, Serialize)]
pub struct ContextBundle {
    pub kind: BundleKind,
    /// The date the period was resolved at.
    pub period: NaiveDate,
    pub entries: Vec<BundleEntry>,
}

impl ContextBundle {
    /// True when no document is effective for the period at all.
    ///
    /// An `Overview` bundle is never empty in this sense.
    pub fn is_empty_period(&self) -> bool {
        self.kind == BundleKind::EmptyPeriod
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &ManagedDocument> {
        self.entries.iter().map(|e| &e.document)
    }
}

#[derive(Clone)]
pub struct RelevanceSelector {
    resolver: DateResolver,
    matcher: Arc<dyn RelevanceMatcher>,
}

impl RelevanceSelector {
    pub fn new(resolver: DateResolver, matcher: Arc<dyn RelevanceMatcher>) -> Self {
        Self { resolver, matcher }
    }

    pub fn resolver(&self) -> &DateResolver {
        &self.resolver
    }

    /// Selects the documents relevant to `question` for the payslip period
    /// `month` (1-based) / `year`.
    pub fn select(&self, question: &str, month: u32, year: i32) -> Result<ContextBundle> {
        let period = payslip_reference_date(month, year)?;
        let documents = self.resolver.for_date(period);
        Ok(select_from(self.matcher.as_ref(), question, period, documents))
    }
}

/// Applies the selection algorithm to an already date-filtered set.
pub fn select_from(
    matcher: &dyn RelevanceMatcher,
    question: &str,
    period: NaiveDate,
    documents: Vec<ManagedDocument>,
) -> ContextBundle {
    if documents.is_empty() {
        debug!(%period, "no documents effective for period");
        return ContextBundle {
            kind: BundleKind::EmptyPeriod,
            period,
            entries: Vec::new(),
        };
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut picked: Vec<(usize, String)> = Vec::new();
    for topic in matcher.topics(question) {
        for (i, doc) in documents.iter().enumerate() {
            if matcher.matches_topic(&topic, doc) && seen.insert(doc.id.as_str()) {
                picked.push((i, topic.clone()));
            }
        }
    }

    if picked.is_empty() {
        debug!(%period, documents = documents.len(), "no topic match, using overview");
        return ContextBundle {
            kind: BundleKind::Overview,
            period,
            entries: documents
                .into_iter()
                .map(|document| BundleEntry {
                    document,
                    category: None,
                })
                .collect(),
        };
    }

    debug!(%period, matched = picked.len(), "selected relevant documents");
    let entries = picked
        .into_iter()
        .map(|(i, topic)| BundleEntry {
            document: documents[i].clone(),
            category: Some(topic),
        })
        .collect();
    ContextBundle {
        kind: BundleKind::Relevant,
        period,
        entries,
    }
}
