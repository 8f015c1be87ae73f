//! Date resolution: which document versions are in effect on a given day.
//!
//! A document is effective on `date` iff
//! `effective_from <= date` and (`effective_to` is absent or
//! `date <= effective_to`). Both boundaries are inclusive.
//!
//! A payslip period is a whole month; it is resolved at the 15th so that
//! versions switching on the 1st or expiring on the last day of a
//! neighbouring month cannot leak in.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{compare_versions, ManagedDocument};
use crate::store::DocumentStore;

/// Day of the month used to represent a payslip period.
pub const PAYSLIP_REFERENCE_DAY: u32 = 15;

#[derive(Clone)]
pub struct DateResolver {
    store: Arc<DocumentStore>,
}

impl DateResolver {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Documents effective on `date`, in materialization order.
    pub fn for_date(&self, date: NaiveDate) -> Vec<ManagedDocument> {
        effective_on(&self.store.snapshot(), date)
    }

    /// One document per logical key among those effective on `date`: the
    /// greatest version.
    pub fn latest_for_date(&self, date: NaiveDate) -> Vec<ManagedDocument> {
        latest_versions(self.for_date(date))
    }

    /// Documents effective on the 15th of `month` (1-based) in `year`.
    pub fn for_payslip_period(&self, month: u32, year: i32) -> Result<Vec<ManagedDocument>> {
        Ok(self.for_date(payslip_reference_date(month, year)?))
    }
}

/// Filters `docs` to those whose window contains `date`.
pub fn effective_on(docs: &[ManagedDocument], date: NaiveDate) -> Vec<ManagedDocument> {
    docs.iter()
        .filter(|d| d.is_effective_on(date))
        .cloned()
        .collect()
}

/// Reduces `docs` to the greatest version per logical key.
///
/// Groups keep the position of their first member. When two versions
/// compare equal the one seen first is kept.
pub fn latest_versions(docs: Vec<ManagedDocument>) -> Vec<ManagedDocument> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut latest: Vec<ManagedDocument> = Vec::new();
    for doc in docs {
        match slots.get(&doc.logical_key) {
            Some(&i) => {
                if compare_versions(&doc.version, &latest[i].version) == Ordering::Greater {
                    latest[i] = doc;
                }
            }
            None => {
                slots.insert(doc.logical_key.clone(), latest.len());
                latest.push(doc);
            }
        }
    }
    latest
}

/// The representative date of a payslip period.
///
/// `month` is 1-based. Months outside `1..=12` and years chrono cannot
/// represent are rejected.
pub fn payslip_reference_date(month: u32, year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, PAYSLIP_REFERENCE_DAY)
        .ok_or(Error::InvalidPeriod { month, year })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::VersionCatalog;
    use crate::clock::FixedClock;
    use crate::loader::{ContentLoader, MemoryTextSource};
    use crate::models::{ContentOrigin, DocumentStatus, DocumentType, VersionDescriptor};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn doc(id: &str, key: &str, version: &str, from: &str, to: Option<&str>) -> ManagedDocument {
        ManagedDocument {
            id: id.to_string(),
            logical_key: key.to_string(),
            name: format!("{} v{}", key, version),
            doc_type: DocumentType::Policy,
            description: String::new(),
            content: String::new(),
            version: version.to_string(),
            effective_from: d(from),
            effective_to: to.map(d),
            status: DocumentStatus::Active,
            size_bytes: 0,
            content_hash: String::new(),
            content_origin: ContentOrigin::Inline,
            source_ref: None,
            code: None,
        }
    }

    async fn resolver_for(versions: Vec<VersionDescriptor>) -> DateResolver {
        let mut catalog = VersionCatalog::new();
        catalog.register("payroll-policy", versions).unwrap();
        let store = DocumentStore::new(
            Arc::new(catalog),
            ContentLoader::new(Arc::new(MemoryTextSource::new())),
            Arc::new(FixedClock(d("2024-08-01"))),
        );
        store.materialize().await;
        DateResolver::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_boundaries_are_inclusive() {
        let resolver = resolver_for(vec![VersionDescriptor::new(
            "1.0",
            d("2024-07-01"),
            Some(d("2024-12-31")),
            "h2.txt",
        )])
        .await;

        assert_eq!(resolver.for_date(d("2024-07-01")).len(), 1);
        assert_eq!(resolver.for_date(d("2024-12-31")).len(), 1);
        assert!(resolver.for_date(d("2024-06-30")).is_empty());
        assert!(resolver.for_date(d("2025-01-01")).is_empty());
    }

    #[tokio::test]
    async fn test_open_ended_window_reaches_far_future() {
        let resolver =
            resolver_for(vec![VersionDescriptor::new("1.1", d("2024-07-01"), None, "p.txt")]).await;

        assert_eq!(resolver.for_date(d("2024-07-01")).len(), 1);
        assert_eq!(resolver.for_date(d("2999-12-31")).len(), 1);
        assert!(resolver.for_date(d("2024-06-30")).is_empty());
    }

    #[tokio::test]
    async fn test_payslip_period_uses_mid_month() {
        let resolver = resolver_for(vec![
            VersionDescriptor::new("1.0", d("2024-01-01"), Some(d("2024-06-30")), "h1.txt"),
            VersionDescriptor::new("1.1", d("2024-07-01"), None, "h2.txt"),
        ])
        .await;

        let june = resolver.for_payslip_period(6, 2024).unwrap();
        assert_eq!(june.len(), 1);
        assert_eq!(june[0].version, "1.0");

        let july = resolver.for_payslip_period(7, 2024).unwrap();
        assert_eq!(july.len(), 1);
        assert_eq!(july[0].version, "1.1");

        assert!(resolver.for_payslip_period(1, 1999).unwrap().is_empty());
    }

    #[test]
    fn test_payslip_reference_date_validates_month() {
        assert_eq!(payslip_reference_date(2, 2024).unwrap(), d("2024-02-15"));
        assert!(matches!(
            payslip_reference_date(0, 2024),
            Err(Error::InvalidPeriod { month: 0, .. })
        ));
        assert!(matches!(
            payslip_reference_date(13, 2024),
            Err(Error::InvalidPeriod { month: 13, .. })
        ));
    }

    #[test]
    fn test_latest_keeps_greatest_version_per_key() {
        let docs = vec![
            doc("1", "tax", "3.1", "2024-01-01", None),
            doc("2", "overtime", "2.0", "2024-01-01", None),
            doc("3", "tax", "3.10", "2024-01-01", None),
            doc("4", "tax", "3.2", "2024-01-01", None),
        ];
        let latest = latest_versions(effective_on(&docs, d("2024-05-01")));

        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].logical_key, "tax");
        assert_eq!(latest[0].version, "3.10");
        assert_eq!(latest[1].logical_key, "overtime");
    }

    #[test]
    fn test_latest_tie_keeps_first_seen() {
        let docs = vec![
            doc("first", "tax", "3.2", "2024-01-01", None),
            doc("second", "tax", "3.2", "2024-01-01", None),
        ];
        let latest = latest_versions(docs);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, "first");
    }

    #[test]
    fn test_latest_groups_by_key_not_name() {
        let mut a = doc("a", "qa-guide", "1.0", "2024-01-01", None);
        a.name = "Q&A v2 Guide v1.0".to_string();
        let mut b = doc("b", "qa-guide", "1.1", "2024-01-01", None);
        b.name = "Q&A v2 Guide v1.1".to_string();

        let latest = latest_versions(vec![a, b]);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, "b");
    }
}
