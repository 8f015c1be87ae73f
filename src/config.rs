//! TOML configuration parsing and validation.
//!
//! ```toml
//! [documents]
//! root = "./public/documents"
//!
//! [server]
//! bind = "127.0.0.1:7340"
//!
//! [[catalog]]
//! key = "overtime-policy"
//! title = "Overtime Policy"
//! type = "Policy"
//! code = "HR-OT-001"
//!
//!   [[catalog.versions]]
//!   version = "2.0"
//!   effective_from = "2024-01-01"
//!   source = "overtime-policy.txt"
//!
//! [[relevance.categories]]
//! name = "overtime"
//! keywords = ["overtime", "extra hours"]
//! ```
//!
//! Without `[[catalog]]` entries the built-in payroll catalog is used;
//! without `[[relevance.categories]]` the built-in keyword categories are.
//! Validity windows are checked when the catalog is registered, not here.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::catalog::{default_documents, DocumentSpec};
use crate::relevance::{default_categories, KeywordCategory};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: Vec<DocumentSpec>,
    #[serde(default)]
    pub relevance: RelevanceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RelevanceConfig {
    #[serde(default)]
    pub categories: Vec<KeywordCategory>,
}

impl Config {
    /// Built-in catalog reading from `./public/documents`.
    pub fn minimal() -> Self {
        Self {
            documents: DocumentsConfig {
                root: PathBuf::from("./public/documents"),
            },
            server: ServerConfig::default(),
            catalog: Vec::new(),
            relevance: RelevanceConfig::default(),
        }
    }

    /// Configured catalog entries, or the built-in payroll catalog.
    pub fn catalog_specs(&self) -> Vec<DocumentSpec> {
        if self.catalog.is_empty() {
            default_documents()
        } else {
            self.catalog.clone()
        }
    }

    /// Configured keyword categories, or the built-in ones.
    pub fn keyword_categories(&self) -> Vec<KeywordCategory> {
        if self.relevance.categories.is_empty() {
            default_categories()
        } else {
            self.relevance.categories.clone()
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    for category in &config.relevance.categories {
        if category.name.trim().is_empty() {
            anyhow::bail!("relevance.categories entries must have a name");
        }
        if category.keywords.is_empty() {
            anyhow::bail!(
                "relevance category '{}' must have at least one keyword",
                category.name
            );
        }
        if category.keywords.iter().any(|k| k.trim().is_empty()) {
            anyhow::bail!(
                "relevance category '{}' has a blank keyword",
                category.name
            );
        }
    }

    Ok(config)
}
