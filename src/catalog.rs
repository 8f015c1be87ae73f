//! Version catalog: logical document keys mapped to dated revisions.
//!
//! Every registration is checked against the window rules before it is
//! accepted:
//!
//! - windows of one logical key must not intersect (both ends inclusive),
//! - at most one version may be open-ended,
//! - no window may end before it starts,
//! - version strings are unique within a key.
//!
//! A violation is a [`CatalogError`] and the registration is rejected as a
//! whole; nothing is clamped or reordered to make it fit.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use crate::error::CatalogError;
use crate::models::{DocumentType, VersionDescriptor};

/// A logical document together with all of its dated versions.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSpec {
    pub key: String,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default)]
    pub description: String,
    /// Optional reference code, e.g. `TAX-REF-2024`.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub versions: Vec<VersionDescriptor>,
}

/// Registry of logical documents in registration order.
#[derive(Debug, Clone, Default)]
pub struct VersionCatalog {
    entries: Vec<DocumentSpec>,
    index: HashMap<String, usize>,
}

impl VersionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from specs, failing on the first invalid entry.
    pub fn from_specs(specs: impl IntoIterator<Item = DocumentSpec>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for spec in specs {
            catalog.register_document(spec)?;
        }
        Ok(catalog)
    }

    /// Registers bare versions under `key`.
    ///
    /// The display title is derived from the key (`"tax-calculation"` →
    /// `"Tax Calculation"`) and the type defaults to `Reference`. Use
    /// [`register_document`](Self::register_document) to supply them.
    pub fn register(
        &mut self,
        key: &str,
        versions: Vec<VersionDescriptor>,
    ) -> Result<(), CatalogError> {
        self.register_document(DocumentSpec {
            key: key.to_string(),
            title: title_from_key(key),
            doc_type: DocumentType::Reference,
            description: String::new(),
            code: None,
            versions,
        })
    }

    pub fn register_document(&mut self, spec: DocumentSpec) -> Result<(), CatalogError> {
        if spec.key.trim().is_empty() {
            return Err(CatalogError::EmptyKey);
        }
        if self.index.contains_key(&spec.key) {
            return Err(CatalogError::DuplicateKey(spec.key));
        }
        validate_windows(&spec.key, &spec.versions)?;

        self.index.insert(spec.key.clone(), self.entries.len());
        self.entries.push(spec);
        Ok(())
    }

    /// Versions registered for `key`, in declaration order.
    ///
    /// An unknown key yields an empty slice rather than an error.
    pub fn lookup(&self, key: &str) -> &[VersionDescriptor] {
        self.get(key).map(|s| s.versions.as_slice()).unwrap_or(&[])
    }

    pub fn get(&self, key: &str) -> Option<&DocumentSpec> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[DocumentSpec] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of version descriptors across all keys.
    pub fn version_count(&self) -> usize {
        self.entries.iter().map(|e| e.versions.len()).sum()
    }
}

fn validate_windows(key: &str, versions: &[VersionDescriptor]) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for v in versions {
        if !seen.insert(v.version.as_str()) {
            return Err(CatalogError::DuplicateVersion {
                key: key.to_string(),
                version: v.version.clone(),
            });
        }
        if let Some(to) = v.effective_to {
            if to < v.effective_from {
                return Err(CatalogError::InvertedWindow {
                    key: key.to_string(),
                    version: v.version.clone(),
                    from: v.effective_from,
                    to,
                });
            }
        }
    }

    let open: Vec<String> = versions
        .iter()
        .filter(|v| v.effective_to.is_none())
        .map(|v| v.version.clone())
        .collect();
    if open.len() > 1 {
        return Err(CatalogError::MultipleOpenEnded {
            key: key.to_string(),
            versions: open,
        });
    }

    let mut sorted: Vec<&VersionDescriptor> = versions.iter().collect();
    sorted.sort_by_key(|v| v.effective_from);
    for pair in sorted.windows(2) {
        let (earlier, later) = (pair[0], pair[1]);
        // `later` starts no earlier than `earlier`, so they intersect iff
        // `earlier` is still running on `later`'s first day.
        let ends = earlier.effective_to.unwrap_or(NaiveDate::MAX);
        if later.effective_from <= ends {
            return Err(CatalogError::OverlappingWindows {
                key: key.to_string(),
                first: earlier.version.clone(),
                second: later.version.clone(),
                overlap_start: later.effective_from,
            });
        }
    }
    Ok(())
}

fn title_from_key(key: &str) -> String {
    key.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// The payroll document set shipped with the payslip viewer.
///
/// Used when the configuration file declares no `[[catalog]]` entries.
pub fn default_documents() -> Vec<DocumentSpec> {
    vec![
        DocumentSpec {
            key: "payroll-policy".to_string(),
            title: "Payroll Policy 2024".to_string(),
            doc_type: DocumentType::Policy,
            description: "Official company payroll policy document outlining salary structures, benefits, deductions, and payment procedures".to_string(),
            code: Some("POL-PAY-2024-001".to_string()),
            versions: vec![
                VersionDescriptor::new(
                    "1.0",
                    ymd(2024, 1, 1),
                    Some(ymd(2024, 6, 30)),
                    "payroll-policy-2024-h1.txt",
                )
                .with_description("First half 2024 payroll policy"),
                VersionDescriptor::new("1.1", ymd(2024, 7, 1), None, "payroll-policy-2024-h2.txt")
                    .with_description("Second half 2024 payroll policy with updated tax rates"),
            ],
        },
        DocumentSpec {
            key: "salary-structure".to_string(),
            title: "Salary Structure Guide".to_string(),
            doc_type: DocumentType::Guide,
            description: "Detailed explanation of salary components, allowances, deductions, and calculation methods".to_string(),
            code: None,
            versions: vec![
                VersionDescriptor::new(
                    "2.0",
                    ymd(2024, 1, 1),
                    Some(ymd(2024, 5, 31)),
                    "salary-structure-guide-old.txt",
                )
                .with_description("Legacy salary structure guide"),
                VersionDescriptor::new("2.1", ymd(2024, 6, 1), None, "salary-structure-guide.txt")
                    .with_description("Updated salary structure guide with new allowance rates"),
            ],
        },
        DocumentSpec {
            key: "tax-calculation".to_string(),
            title: "Tax Calculation Reference".to_string(),
            doc_type: DocumentType::Reference,
            description: "Comprehensive reference for tax calculation methods, brackets, exemptions, and deductions".to_string(),
            code: Some("TAX-REF-2024".to_string()),
            versions: vec![
                VersionDescriptor::new(
                    "3.1",
                    ymd(2024, 1, 1),
                    Some(ymd(2024, 3, 31)),
                    "tax-calculation-q1-2024.txt",
                )
                .with_description("Q1 2024 tax calculation reference"),
                VersionDescriptor::new("3.2", ymd(2024, 4, 1), None, "tax-calculation-reference.txt")
                    .with_description("Updated tax calculation reference from Q2 2024"),
            ],
        },
        DocumentSpec {
            key: "benefits-overview".to_string(),
            title: "Benefits Overview".to_string(),
            doc_type: DocumentType::Guide,
            description: "Complete guide to employee benefits including health insurance, retirement plans, time off, and professional development".to_string(),
            code: None,
            versions: vec![VersionDescriptor::new(
                "1.0",
                ymd(2024, 1, 1),
                None,
                "benefits-overview.txt",
            )
            .with_description("Current benefits overview")],
        },
        DocumentSpec {
            key: "overtime-policy".to_string(),
            title: "Overtime Policy".to_string(),
            doc_type: DocumentType::Policy,
            description: "Policy document for overtime calculation, authorization, compensation rates, and compliance requirements".to_string(),
            code: Some("HR-OT-001".to_string()),
            versions: vec![VersionDescriptor::new(
                "2.0",
                ymd(2024, 1, 1),
                None,
                "overtime-policy.txt",
            )
            .with_description("Current overtime policy")],
        },
    ]
}
