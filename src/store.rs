//! Materialized document set.
//!
//! [`DocumentStore`] turns every `(logical key, version)` pair of the
//! [`VersionCatalog`] into a [`ManagedDocument`] by loading its content,
//! and holds the result in memory for the resolver and the admin surface.
//!
//! # Consistency
//!
//! The current set lives behind `RwLock<Arc<Vec<_>>>`. Readers take a
//! cheap [`snapshot`](DocumentStore::snapshot) and never hold the lock while
//! working. [`refresh`](DocumentStore::refresh) loads everything first and
//! swaps the new set in as one step, and refreshes are serialized, so a
//! concurrent reader sees either the complete old set or the complete new
//! one. Administrative edits apply to the current set only and are replaced
//! by the next refresh.

use chrono::NaiveDate;
use futures::future::join_all;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::VersionCatalog;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::loader::ContentLoader;
use crate::models::{
    compare_versions, format_size, ContentOrigin, DocumentPatch, DocumentStats, DocumentStatus,
    DocumentType, ManagedDocument, NewDocument,
};

pub struct DocumentStore {
    catalog: Arc<VersionCatalog>,
    loader: ContentLoader,
    clock: Arc<dyn Clock>,
    docs: RwLock<Arc<Vec<ManagedDocument>>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl DocumentStore {
    /// Creates an empty store. Call [`materialize`](Self::materialize)
    /// before reading.
    pub fn new(catalog: Arc<VersionCatalog>, loader: ContentLoader, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            loader,
            clock,
            docs: RwLock::new(Arc::new(Vec::new())),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &VersionCatalog {
        &self.catalog
    }

    pub fn loader(&self) -> &ContentLoader {
        &self.loader
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Loads content for every catalog version and replaces the current set.
    ///
    /// All reads are issued concurrently; the call returns once each has
    /// resolved to real, fallback, or placeholder content. Catalog documents
    /// get ids derived from `(logical_key, version)`, so the same version
    /// has the same id across refreshes and processes.
    pub async fn materialize(&self) -> Arc<Vec<ManagedDocument>> {
        let _guard = self.refresh_lock.lock().await;

        let previous = self.snapshot();
        let today = self.clock.today();
        let loader = &self.loader;
        let pending = self.catalog.entries().iter().flat_map(|spec| {
            spec.versions.iter().map(move |v| async move {
                let loaded = loader.load(&spec.key, &spec.title, v).await;
                (spec, v, loaded)
            })
        });
        let results = join_all(pending).await;

        let mut placeholders = 0usize;
        let mut changed = 0usize;
        let previous_hashes: HashMap<&str, &str> = previous
            .iter()
            .map(|d| (d.id.as_str(), d.content_hash.as_str()))
            .collect();

        let mut docs = Vec::with_capacity(results.len());
        for (spec, v, loaded) in results {
            if loaded.origin == ContentOrigin::Placeholder {
                placeholders += 1;
            }
            let id = catalog_document_id(&spec.key, &v.version);
            let content_hash = hash_content(&loaded.text);
            if previous_hashes.get(id.as_str()) != Some(&content_hash.as_str()) {
                changed += 1;
            }

            docs.push(ManagedDocument {
                id,
                logical_key: spec.key.clone(),
                name: format!("{} v{}", spec.title, v.version),
                doc_type: spec.doc_type,
                description: v
                    .description
                    .clone()
                    .unwrap_or_else(|| spec.description.clone()),
                content: loaded.text,
                version: v.version.clone(),
                effective_from: v.effective_from,
                effective_to: v.effective_to,
                status: DocumentStatus::on(v.effective_to, today),
                size_bytes: loaded.size_bytes,
                content_hash,
                content_origin: loaded.origin,
                source_ref: Some(v.source_ref.clone()),
                code: spec.code.clone(),
            });
        }

        info!(
            documents = docs.len(),
            changed,
            placeholders,
            "materialized document set"
        );

        let docs = Arc::new(docs);
        *self.docs.write().unwrap() = docs.clone();
        docs
    }

    /// Re-reads every source and replaces the in-memory set.
    pub async fn refresh(&self) -> usize {
        self.materialize().await.len()
    }

    /// The current document set.
    pub fn snapshot(&self) -> Arc<Vec<ManagedDocument>> {
        self.docs.read().unwrap().clone()
    }

    pub fn list(&self) -> Vec<ManagedDocument> {
        self.snapshot().as_ref().clone()
    }

    pub fn get(&self, id: &str) -> Option<ManagedDocument> {
        self.snapshot().iter().find(|d| d.id == id).cloned()
    }

    /// Case-insensitive substring match over name, description, type, and
    /// content.
    pub fn search(&self, query: &str) -> Vec<ManagedDocument> {
        let needle = query.to_lowercase();
        self.snapshot()
            .iter()
            .filter(|d| {
                d.name.to_lowercase().contains(&needle)
                    || d.description.to_lowercase().contains(&needle)
                    || d.doc_type.label().to_lowercase().contains(&needle)
                    || d.content.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    pub fn by_type(&self, doc_type: DocumentType) -> Vec<ManagedDocument> {
        self.snapshot()
            .iter()
            .filter(|d| d.doc_type == doc_type)
            .cloned()
            .collect()
    }

    /// All materialized versions of `key`, newest first.
    pub fn versions_of(&self, key: &str) -> Vec<ManagedDocument> {
        let mut versions: Vec<ManagedDocument> = self
            .snapshot()
            .iter()
            .filter(|d| d.logical_key == key)
            .cloned()
            .collect();
        versions.sort_by(|a, b| compare_versions(&b.version, &a.version));
        versions
    }

    pub fn stats(&self) -> DocumentStats {
        let docs = self.snapshot();
        let mut by_type = BTreeMap::new();
        let mut versions = BTreeMap::new();
        for d in docs.iter() {
            *by_type.entry(d.doc_type.label().to_string()).or_insert(0) += 1;
            *versions.entry(d.logical_key.clone()).or_insert(0) += 1;
        }
        let total_size_bytes: u64 = docs.iter().map(|d| d.size_bytes).sum();
        DocumentStats {
            total: docs.len(),
            active: docs
                .iter()
                .filter(|d| d.status == DocumentStatus::Active)
                .count(),
            by_type,
            versions,
            total_size_bytes,
            total_size: format_size(total_size_bytes),
        }
    }

    /// Adds a document to the in-memory set. Not persisted.
    ///
    /// Rejects a window that ends before it starts.
    pub fn create(&self, new: NewDocument) -> Result<ManagedDocument> {
        check_window(new.effective_from, new.effective_to)?;
        let today = self.clock.today();
        let size_bytes = new.content.len() as u64;
        let doc = ManagedDocument {
            id: Uuid::new_v4().to_string(),
            logical_key: new.logical_key,
            name: new.name,
            doc_type: new.doc_type,
            description: new.description,
            content_hash: hash_content(&new.content),
            content: new.content,
            version: new.version,
            effective_from: new.effective_from,
            effective_to: new.effective_to,
            status: DocumentStatus::on(new.effective_to, today),
            size_bytes,
            content_origin: ContentOrigin::Inline,
            source_ref: None,
            code: new.code,
        };

        let mut guard = self.docs.write().unwrap();
        Arc::make_mut(&mut guard).push(doc.clone());
        debug!(id = %doc.id, key = %doc.logical_key, "created document");
        Ok(doc)
    }

    /// Applies `patch` to document `id` and recomputes derived fields.
    pub fn update(&self, id: &str, patch: DocumentPatch) -> Result<ManagedDocument> {
        let today = self.clock.today();
        let mut guard = self.docs.write().unwrap();
        let docs = Arc::make_mut(&mut guard);
        let doc = docs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::NotFound { id: id.to_string() })?;

        let effective_from = patch.effective_from.unwrap_or(doc.effective_from);
        let effective_to = patch.effective_to.unwrap_or(doc.effective_to);
        check_window(effective_from, effective_to)?;

        if let Some(name) = patch.name {
            doc.name = name;
        }
        if let Some(doc_type) = patch.doc_type {
            doc.doc_type = doc_type;
        }
        if let Some(description) = patch.description {
            doc.description = description;
        }
        if let Some(content) = patch.content {
            doc.size_bytes = content.len() as u64;
            doc.content_hash = hash_content(&content);
            doc.content = content;
            doc.content_origin = ContentOrigin::Inline;
        }
        if let Some(version) = patch.version {
            doc.version = version;
        }
        doc.effective_from = effective_from;
        doc.effective_to = effective_to;
        if let Some(code) = patch.code {
            doc.code = code;
        }
        doc.status = DocumentStatus::on(doc.effective_to, today);

        debug!(id, "updated document");
        Ok(doc.clone())
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let mut guard = self.docs.write().unwrap();
        let docs = Arc::make_mut(&mut guard);
        let index = docs
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| Error::NotFound { id: id.to_string() })?;
        docs.remove(index);
        debug!(id, "deleted document");
        Ok(())
    }
}

fn check_window(from: NaiveDate, to: Option<NaiveDate>) -> Result<()> {
    match to {
        Some(to) if to < from => Err(Error::InvertedWindow { from, to }),
        _ => Ok(()),
    }
}

/// Stable id of a catalog document: a UUIDv5 over `"{key}@{version}"`.
pub fn catalog_document_id(key: &str, version: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}@{}", key, version).as_bytes()).to_string()
}

fn hash_content(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
