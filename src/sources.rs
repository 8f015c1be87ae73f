//! Health listing for catalog text sources.
//!
//! Reports, for every catalog version, whether its primary source and its
//! unversioned fallback can be found, and which files in the documents root
//! no catalog entry refers to.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::catalog::VersionCatalog;
use crate::config::Config;
use crate::loader::{fallback_ref, FsTextSource, TextSource};

#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub key: String,
    pub version: String,
    pub source_ref: String,
    pub primary_found: bool,
    pub fallback_ref: String,
    pub fallback_found: bool,
}

impl SourceStatus {
    /// Content will be real text (primary or fallback), not a placeholder.
    pub fn healthy(&self) -> bool {
        self.primary_found || self.fallback_found
    }
}

pub async fn source_statuses(catalog: &VersionCatalog, source: &dyn TextSource) -> Vec<SourceStatus> {
    let mut statuses = Vec::with_capacity(catalog.version_count());
    for spec in catalog.entries() {
        for v in &spec.versions {
            let fallback = fallback_ref(&spec.key, &v.source_ref);
            statuses.push(SourceStatus {
                key: spec.key.clone(),
                version: v.version.clone(),
                source_ref: v.source_ref.clone(),
                primary_found: source.exists(&v.source_ref).await,
                fallback_found: source.exists(&fallback).await,
                fallback_ref: fallback,
            });
        }
    }
    statuses
}

/// Files below `root` that are neither a primary nor a fallback source of
/// any catalog version, as sorted paths relative to `root`.
pub fn unreferenced_files(root: &Path, catalog: &VersionCatalog) -> Result<Vec<String>> {
    let mut referenced = HashSet::new();
    for spec in catalog.entries() {
        for v in &spec.versions {
            referenced.insert(v.source_ref.clone());
            referenced.insert(fallback_ref(&spec.key, &v.source_ref));
        }
    }

    let mut orphans = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");
        if !referenced.contains(&rel_str) {
            orphans.push(rel_str);
        }
    }
    orphans.sort();
    Ok(orphans)
}

/// CLI entry point for `payctx sources`.
pub async fn list_sources(config: &Config) -> Result<()> {
    let catalog = VersionCatalog::from_specs(config.catalog_specs())
        .context("Invalid document catalog in config")?;
    let root = &config.documents.root;
    let source = FsTextSource::new(root.clone());

    println!(
        "{:<20} {:<8} {:<36} {:<8} {:<8}",
        "DOCUMENT", "VERSION", "SOURCE", "PRIMARY", "FALLBACK"
    );
    for s in source_statuses(&catalog, &source).await {
        println!(
            "{:<20} {:<8} {:<36} {:<8} {:<8}",
            s.key,
            s.version,
            s.source_ref,
            yes_no(s.primary_found),
            yes_no(s.fallback_found)
        );
    }

    if root.exists() {
        let orphans = unreferenced_files(root, &catalog)?;
        if !orphans.is_empty() {
            println!();
            println!("Unreferenced files in {}:", root.display());
            for o in orphans {
                println!("  {}", o);
            }
        }
    } else {
        println!();
        println!("Documents root does not exist: {}", root.display());
    }

    Ok(())
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VersionDescriptor;
    use chrono::NaiveDate;
    use std::fs;

    fn catalog() -> VersionCatalog {
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let mut catalog = VersionCatalog::new();
        catalog
            .register(
                "payroll-policy",
                vec![
                    VersionDescriptor::new("1.0", from, Some(to), "payroll-policy-h1.txt"),
                    VersionDescriptor::new(
                        "1.1",
                        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                        None,
                        "payroll-policy-h2.txt",
                    ),
                ],
            )
            .unwrap();
        catalog
    }

    #[tokio::test]
    async fn test_statuses_report_primary_and_fallback() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("payroll-policy-h1.txt"), "h1").unwrap();
        fs::write(tmp.path().join("payroll-policy.txt"), "base").unwrap();
        let source = FsTextSource::new(tmp.path());

        let statuses = source_statuses(&catalog(), &source).await;
        assert_eq!(statuses.len(), 2);
        assert!(statuses[0].primary_found);
        assert!(!statuses[1].primary_found);
        assert!(statuses[1].fallback_found);
        assert!(statuses.iter().all(|s| s.healthy()));
    }

    #[test]
    fn test_unreferenced_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("payroll-policy-h1.txt"), "h1").unwrap();
        fs::write(tmp.path().join("notes.txt"), "stray").unwrap();
        fs::create_dir_all(tmp.path().join("old")).unwrap();
        fs::write(tmp.path().join("old").join("draft.txt"), "stray").unwrap();

        let orphans = unreferenced_files(tmp.path(), &catalog()).unwrap();
        assert_eq!(orphans, vec!["notes.txt", "old/draft.txt"]);
    }
}
