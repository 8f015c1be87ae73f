//! Content loading with a fixed fallback order.
//!
//! For each version descriptor the [`ContentLoader`] tries, in order:
//!
//! 1. the descriptor's own `source_ref`,
//! 2. an unversioned base source derived from the logical key
//!    (`<key>.<ext>`, reusing the primary's extension, `txt` if it has none),
//! 3. a generated placeholder naming the document and version.
//!
//! Step 3 never fails, so loading is total. The placeholder text is visibly
//! different from real content and the outcome is recorded as a
//! [`ContentOrigin`], letting callers detect the degraded case without
//! handling an error.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::error::SourceError;
use crate::models::{ContentOrigin, VersionDescriptor};

/// Text read from a source.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub text: String,
    pub size_bytes: u64,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let size_bytes = text.len() as u64;
        Self { text, size_bytes }
    }
}

/// Reader of raw document text keyed by an opaque reference.
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn read(&self, source_ref: &str) -> Result<SourceText, SourceError>;

    /// Cheap existence probe used by health listings.
    async fn exists(&self, source_ref: &str) -> bool {
        self.read(source_ref).await.is_ok()
    }
}

/// Reads documents from files under a root directory.
#[derive(Debug, Clone)]
pub struct FsTextSource {
    root: PathBuf,
}

impl FsTextSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `source_ref` below the root, refusing anything that would
    /// escape it.
    fn resolve(&self, source_ref: &str) -> Result<PathBuf, SourceError> {
        let rel = Path::new(source_ref);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || source_ref.is_empty() {
            return Err(SourceError::Unreadable {
                source_ref: source_ref.to_string(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "source reference must be a relative path inside the documents root",
                ),
            });
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl TextSource for FsTextSource {
    async fn read(&self, source_ref: &str) -> Result<SourceText, SourceError> {
        let path = self.resolve(source_ref)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(SourceText::new(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(SourceError::Missing(source_ref.to_string()))
            }
            Err(e) => Err(SourceError::Unreadable {
                source_ref: source_ref.to_string(),
                source: e,
            }),
        }
    }

    async fn exists(&self, source_ref: &str) -> bool {
        match self.resolve(source_ref) {
            Ok(path) => tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// In-memory text source for tests and embedding hosts.
#[derive(Debug, Default)]
pub struct MemoryTextSource {
    texts: RwLock<HashMap<String, String>>,
}

impl MemoryTextSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, source_ref: &str, text: &str) -> Self {
        self.insert(source_ref, text);
        self
    }

    pub fn insert(&self, source_ref: &str, text: &str) {
        self.texts
            .write()
            .unwrap()
            .insert(source_ref.to_string(), text.to_string());
    }

    pub fn remove(&self, source_ref: &str) {
        self.texts.write().unwrap().remove(source_ref);
    }
}

#[async_trait]
impl TextSource for MemoryTextSource {
    async fn read(&self, source_ref: &str) -> Result<SourceText, SourceError> {
        self.texts
            .read()
            .unwrap()
            .get(source_ref)
            .map(|t| SourceText::new(t.as_str()))
            .ok_or_else(|| SourceError::Missing(source_ref.to_string()))
    }
}

/// Outcome of loading one version's content.
#[derive(Debug, Clone)]
pub struct LoadedContent {
    pub text: String,
    pub size_bytes: u64,
    pub origin: ContentOrigin,
}

/// Resolves version descriptors to text with primary → fallback →
/// placeholder ordering.
#[derive(Clone)]
pub struct ContentLoader {
    source: Arc<dyn TextSource>,
}

impl ContentLoader {
    pub fn new(source: Arc<dyn TextSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn TextSource> {
        &self.source
    }

    /// Loads the content for `descriptor` of logical document `key`.
    ///
    /// `title` only feeds the placeholder text.
    pub async fn load(&self, key: &str, title: &str, descriptor: &VersionDescriptor) -> LoadedContent {
        let primary = &descriptor.source_ref;
        match self.source.read(primary).await {
            Ok(found) => return loaded(found, ContentOrigin::Primary),
            Err(e) => warn!(key, version = %descriptor.version, error = %e, "primary source unavailable"),
        }

        let fallback = fallback_ref(key, primary);
        if fallback != *primary {
            match self.source.read(&fallback).await {
                Ok(found) => {
                    warn!(key, version = %descriptor.version, fallback = %fallback, "using base document content");
                    return loaded(found, ContentOrigin::Fallback);
                }
                Err(e) => warn!(key, version = %descriptor.version, error = %e, "fallback source unavailable"),
            }
        }

        warn!(key, version = %descriptor.version, "no content available, substituting placeholder");
        LoadedContent {
            text: placeholder_text(key, title, &descriptor.version),
            size_bytes: 0,
            origin: ContentOrigin::Placeholder,
        }
    }
}

fn loaded(found: SourceText, origin: ContentOrigin) -> LoadedContent {
    LoadedContent {
        text: found.text,
        size_bytes: found.size_bytes,
        origin,
    }
}

/// Unversioned base reference for `key`, keeping the primary's extension.
pub fn fallback_ref(key: &str, primary: &str) -> String {
    let ext = Path::new(primary)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("txt");
    format!("{}.{}", key, ext)
}

/// Notice substituted when neither source can be read.
pub fn placeholder_text(key: &str, title: &str, version: &str) -> String {
    format!(
        "[Document content unavailable for {} ({}) version {}]",
        title, key, version
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn descriptor(source: &str) -> VersionDescriptor {
        VersionDescriptor::new(
            "1.1",
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            None,
            source,
        )
    }

    #[tokio::test]
    async fn test_primary_source_wins() {
        let source = MemoryTextSource::new()
            .with("payroll-policy-2024-h2.txt", "h2 text")
            .with("payroll-policy.txt", "base text");
        let loader = ContentLoader::new(Arc::new(source));

        let out = loader
            .load("payroll-policy", "Payroll Policy", &descriptor("payroll-policy-2024-h2.txt"))
            .await;
        assert_eq!(out.text, "h2 text");
        assert_eq!(out.origin, ContentOrigin::Primary);
        assert_eq!(out.size_bytes, 7);
    }

    #[tokio::test]
    async fn test_falls_back_to_base_source() {
        let source = MemoryTextSource::new().with("payroll-policy.txt", "base text");
        let loader = ContentLoader::new(Arc::new(source));

        let out = loader
            .load("payroll-policy", "Payroll Policy", &descriptor("payroll-policy-2024-h2.txt"))
            .await;
        assert_eq!(out.text, "base text");
        assert_eq!(out.origin, ContentOrigin::Fallback);
    }

    #[tokio::test]
    async fn test_placeholder_names_key_and_version() {
        let loader = ContentLoader::new(Arc::new(MemoryTextSource::new()));

        let out = loader
            .load("payroll-policy", "Payroll Policy", &descriptor("payroll-policy-2024-h2.txt"))
            .await;
        assert_eq!(out.origin, ContentOrigin::Placeholder);
        assert!(!out.text.is_empty());
        assert!(out.text.contains("payroll-policy"));
        assert!(out.text.contains("1.1"));
        assert_eq!(out.size_bytes, 0);
    }

    #[test]
    fn test_fallback_ref_keeps_extension() {
        assert_eq!(fallback_ref("faq", "faq-2024.md"), "faq.md");
        assert_eq!(fallback_ref("faq", "faq-2024"), "faq.txt");
    }

    #[tokio::test]
    async fn test_fs_source_distinguishes_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
        let source = FsTextSource::new(tmp.path());

        assert_eq!(source.read("a.txt").await.unwrap().text, "alpha");
        assert!(source.exists("a.txt").await);
        assert!(matches!(
            source.read("b.txt").await,
            Err(SourceError::Missing(_))
        ));
        assert!(matches!(
            source.read("../a.txt").await,
            Err(SourceError::Unreadable { .. })
        ));
    }
}
