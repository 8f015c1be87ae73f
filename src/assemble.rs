//! Rendering a [`ContextBundle`] into prompt text.
//!
//! Relevant bundles carry each document's full content; overview bundles
//! carry only name, period, and description to stay compact. Output is a
//! pure function of the bundle, with no truncation or length cap.

use crate::relevance::{BundleKind, ContextBundle};

/// Separator placed between documents in a relevant bundle.
pub const DOCUMENT_DELIMITER: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, bundle: &ContextBundle) -> String {
        match bundle.kind {
            BundleKind::Relevant => bundle
                .documents()
                .map(|doc| {
                    format!(
                        "Document: {} (Version {})\nEffective Period: {}\nContent:\n{}",
                        doc.name,
                        doc.version,
                        doc.effective_period(),
                        doc.content
                    )
                })
                .collect::<Vec<_>>()
                .join(DOCUMENT_DELIMITER),
            BundleKind::Overview => bundle
                .documents()
                .map(|doc| {
                    format!(
                        "Document: {} (Effective: {})\nDescription: {}",
                        doc.name,
                        doc.effective_period(),
                        doc.description
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            BundleKind::EmptyPeriod => format!(
                "No policy documents are in effect for the payslip period of {}.",
                bundle.period.format("%B %Y")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentOrigin, DocumentStatus, DocumentType, ManagedDocument};
    use crate::relevance::BundleEntry;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn doc(name: &str, version: &str, to: Option<&str>) -> ManagedDocument {
        ManagedDocument {
            id: name.to_string(),
            logical_key: name.to_string(),
            name: format!("{} v{}", name, version),
            doc_type: DocumentType::Policy,
            description: format!("About {}", name),
            content: format!("Full text of {}", name),
            version: version.to_string(),
            effective_from: d("2024-01-01"),
            effective_to: to.map(d),
            status: DocumentStatus::Active,
            size_bytes: 0,
            content_hash: String::new(),
            content_origin: ContentOrigin::Primary,
            source_ref: None,
            code: None,
        }
    }

    fn bundle(kind: BundleKind, docs: Vec<ManagedDocument>) -> ContextBundle {
        ContextBundle {
            kind,
            period: d("2024-06-15"),
            entries: docs
                .into_iter()
                .map(|document| BundleEntry {
                    document,
                    category: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_relevant_mode_includes_content_and_delimiter() {
        let b = bundle(
            BundleKind::Relevant,
            vec![
                doc("Payroll Policy", "1.0", Some("2024-06-30")),
                doc("Overtime Policy", "2.0", None),
            ],
        );
        let out = ContextAssembler::new().render(&b);

        assert_eq!(
            out,
            "Document: Payroll Policy v1.0 (Version 1.0)\n\
             Effective Period: 2024-01-01 to 2024-06-30\n\
             Content:\n\
             Full text of Payroll Policy\
             \n\n---\n\n\
             Document: Overtime Policy v2.0 (Version 2.0)\n\
             Effective Period: 2024-01-01 - Current\n\
             Content:\n\
             Full text of Overtime Policy"
        );
    }

    #[test]
    fn test_overview_mode_omits_content() {
        let b = bundle(BundleKind::Overview, vec![doc("Benefits", "1.0", None)]);
        let out = ContextAssembler::new().render(&b);

        assert_eq!(
            out,
            "Document: Benefits v1.0 (Effective: 2024-01-01 - Current)\nDescription: About Benefits"
        );
        assert!(!out.contains("Full text"));
    }

    #[test]
    fn test_empty_period_names_the_month() {
        let mut b = bundle(BundleKind::EmptyPeriod, vec![]);
        b.period = d("1999-01-15");
        assert_eq!(
            ContextAssembler::new().render(&b),
            "No policy documents are in effect for the payslip period of January 1999."
        );
    }

    #[test]
    fn test_render_is_repeatable() {
        let b = bundle(
            BundleKind::Relevant,
            vec![doc("Tax", "3.2", None), doc("Salary", "2.1", None)],
        );
        let assembler = ContextAssembler::new();
        assert_eq!(assembler.render(&b), assembler.render(&b));
    }
}
