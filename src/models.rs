//! Core data models shared across the engine.
//!
//! A [`VersionDescriptor`] is one dated revision of a logical document as
//! declared in the catalog. Loading its text produces a [`ManagedDocument`],
//! the unit every downstream stage (date resolution, relevance selection,
//! rendering) works with.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Kind of policy/reference document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentType {
    Policy,
    Guide,
    Reference,
    #[serde(rename = "FAQ")]
    Faq,
}

impl DocumentType {
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Policy => "Policy",
            DocumentType::Guide => "Guide",
            DocumentType::Reference => "Reference",
            DocumentType::Faq => "FAQ",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "policy" => Ok(DocumentType::Policy),
            "guide" => Ok(DocumentType::Guide),
            "reference" => Ok(DocumentType::Reference),
            "faq" => Ok(DocumentType::Faq),
            other => Err(format!(
                "unknown document type '{}'. Must be Policy, Guide, Reference, or FAQ.",
                other
            )),
        }
    }
}

/// Display/administration label relative to the current date.
///
/// This is not the same thing as "effective for a target date"; see
/// [`ManagedDocument::is_effective_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Active,
    Archived,
}

impl DocumentStatus {
    /// `Archived` once the window closed strictly before `today`.
    pub fn on(effective_to: Option<NaiveDate>, today: NaiveDate) -> Self {
        match effective_to {
            Some(to) if to < today => DocumentStatus::Archived,
            _ => DocumentStatus::Active,
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentStatus::Active => f.write_str("Active"),
            DocumentStatus::Archived => f.write_str("Archived"),
        }
    }
}

/// Where a document's text actually came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentOrigin {
    /// The descriptor's own source reference.
    Primary,
    /// The unversioned base source derived from the logical key.
    Fallback,
    /// Neither source could be read; content is a generated notice.
    Placeholder,
    /// Supplied directly through an administrative create/update.
    Inline,
}

impl fmt::Display for ContentOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentOrigin::Primary => "primary",
            ContentOrigin::Fallback => "fallback",
            ContentOrigin::Placeholder => "placeholder",
            ContentOrigin::Inline => "inline",
        })
    }
}

/// One dated revision of a logical document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    pub version: String,
    /// First day the version applies (inclusive).
    pub effective_from: NaiveDate,
    /// Last day the version applies (inclusive). `None` means still current.
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    /// Locator handed to the text source, typically a file name.
    #[serde(rename = "source")]
    pub source_ref: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl VersionDescriptor {
    pub fn new(
        version: impl Into<String>,
        effective_from: NaiveDate,
        effective_to: Option<NaiveDate>,
        source_ref: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            effective_from,
            effective_to,
            source_ref: source_ref.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Closed-interval containment test on both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        window_contains(self.effective_from, self.effective_to, date)
    }
}

/// A materialized, content-bearing document version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedDocument {
    pub id: String,
    pub logical_key: String,
    /// Conventionally `"<title> v<version>"`.
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub description: String,
    pub content: String,
    pub version: String,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub status: DocumentStatus,
    pub size_bytes: u64,
    pub content_hash: String,
    pub content_origin: ContentOrigin,
    pub source_ref: Option<String>,
    pub code: Option<String>,
}

impl ManagedDocument {
    /// Whether `date` falls inside `[effective_from, effective_to]`.
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        window_contains(self.effective_from, self.effective_to, date)
    }

    /// `"2024-01-01 to 2024-06-30"` or `"2024-07-01 - Current"`.
    pub fn effective_period(&self) -> String {
        match self.effective_to {
            Some(to) => format!("{} to {}", self.effective_from, to),
            None => format!("{} - Current", self.effective_from),
        }
    }

    pub fn display_size(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Fields required to create a document through the admin surface.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    pub logical_key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    pub version: String,
    pub effective_from: NaiveDate,
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Partial update. Absent fields are left untouched.
///
/// `effective_to` distinguishes "absent" (`None`) from an explicit `null`
/// (`Some(None)`), which reopens the window.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub doc_type: Option<DocumentType>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub effective_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub effective_to: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub code: Option<Option<String>>,
}

fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStats {
    pub total: usize,
    pub active: usize,
    pub by_type: std::collections::BTreeMap<String, usize>,
    /// Number of materialized versions per logical key.
    pub versions: std::collections::BTreeMap<String, usize>,
    pub total_size_bytes: u64,
    pub total_size: String,
}

pub(crate) fn window_contains(from: NaiveDate, to: Option<NaiveDate>, date: NaiveDate) -> bool {
    date >= from && to.map_or(true, |to| date <= to)
}

/// Orders version strings segment by segment.
///
/// Dot-separated segments that are both numeric compare as numbers, so
/// `"1.10" > "1.9"`; anything else falls back to string comparison. A
/// version that is a strict prefix of another sorts first (`"1" < "1.0"`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Human-readable size: whole kilobytes below 1000 KB, otherwise megabytes
/// with one decimal.
pub fn format_size(bytes: u64) -> String {
    let kb = (bytes as f64 / 1024.0).round();
    if kb < 1000.0 {
        format!("{} KB", kb as u64)
    } else {
        format!("{:.1} MB", kb / 1024.0)
    }
}
