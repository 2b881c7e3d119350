//! Batch orchestration over a document store
//!
//! For every PDF under a product's source location: fetch it, archive an
//! exact copy, rewrite its best-by labels and put the result back under the
//! same identity. Documents are handled one at a time and a failure is
//! recorded against the document that caused it.

use std::fmt;
use chrono::NaiveDate;
use log::{debug, info, warn};

use crate::config::{validate_products, ProductConfig};
use crate::date::{compute_best_by, format_best_by};
use crate::error::Result;
use crate::pdf::rewrite_pdf;
use crate::store::{DocumentStore, StoredEntry};

/// What happened to one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteStatus {
    /// At least one label was rewritten and the document replaced
    Updated,
    /// No label found; the source was left untouched
    NoReplace,
    /// Fetching, archiving, decoding or storing failed
    Failed(String),
}

impl fmt::Display for RewriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteStatus::Updated => write!(f, "updated"),
            RewriteStatus::NoReplace => write!(f, "no-replace"),
            RewriteStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Per-document result of a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub document_id: String,
    pub name: String,
    pub status: RewriteStatus,
    /// Best-by date written into the document, if it was updated
    pub applied_date: Option<NaiveDate>,
}

impl RewriteOutcome {
    fn failed(entry: &StoredEntry, reason: String) -> Self {
        Self {
            document_id: entry.id.clone(),
            name: entry.name.clone(),
            status: RewriteStatus::Failed(reason),
            applied_date: None,
        }
    }
}

impl fmt::Display for RewriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.status)?;
        if let Some(date) = self.applied_date {
            write!(f, " ({})", format_best_by(&date))?;
        }
        Ok(())
    }
}

/// Runs the label pipeline for products against one store
pub struct BatchOrchestrator<'s, S: DocumentStore + ?Sized> {
    store: &'s mut S,
    today: NaiveDate,
}

impl<'s, S: DocumentStore + ?Sized> BatchOrchestrator<'s, S> {
    /// `today` is the processing date every best-by date is computed from
    pub fn new(store: &'s mut S, today: NaiveDate) -> Self {
        Self { store, today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Process every PDF under the product's source location
    ///
    /// Fails only when the product is invalid or its location cannot be
    /// listed. Per-document failures become `Failed` outcomes.
    pub fn run(&mut self, product: &ProductConfig) -> Result<Vec<RewriteOutcome>> {
        product.validate()?;
        let best_by = compute_best_by(self.today, product.shelf_life_days)?;
        info!(
            "{}: shelf life {} days, best-by {}",
            product.name,
            product.shelf_life_days,
            format_best_by(&best_by)
        );

        let entries = self.store.list(&product.source_location)?;
        let mut outcomes = Vec::new();

        for entry in &entries {
            if !entry.is_pdf() {
                debug!("skipping {} ({})", entry.name, entry.mime_type);
                continue;
            }

            let outcome = match self.process(product, entry) {
                Ok(outcome) => {
                    info!("{}", outcome);
                    outcome
                }
                Err(e) => {
                    warn!("{}: {}", entry.name, e);
                    RewriteOutcome::failed(entry, e.to_string())
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Fetch, archive, rewrite and replace one document
    fn process(&mut self, product: &ProductConfig, entry: &StoredEntry) -> Result<RewriteOutcome> {
        let original = self.store.fetch(&entry.id)?;

        // The archive copy must exist before anything is rewritten
        self.store
            .duplicate(&entry.id, &product.archive_location, &entry.name)?;

        let rewrite = rewrite_pdf(&original, &entry.name, self.today, product.shelf_life_days)?;
        let (status, applied_date) = if rewrite.changed {
            self.store.store(&entry.id, &rewrite.content)?;
            (RewriteStatus::Updated, Some(rewrite.best_by))
        } else {
            (RewriteStatus::NoReplace, None)
        };

        Ok(RewriteOutcome {
            document_id: entry.id.clone(),
            name: entry.name.clone(),
            status,
            applied_date,
        })
    }
}

/// Outcomes for one product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductReport {
    pub product: String,
    pub best_by: NaiveDate,
    pub outcomes: Vec<RewriteOutcome>,
    /// Set when the product could not be processed at all
    pub error: Option<String>,
}

impl ProductReport {
    fn count(&self, pred: impl Fn(&RewriteStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn updated(&self) -> usize {
        self.count(|s| *s == RewriteStatus::Updated)
    }

    pub fn unchanged(&self) -> usize {
        self.count(|s| *s == RewriteStatus::NoReplace)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, RewriteStatus::Failed(_)))
    }
}

/// Outcomes of a whole run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub today: NaiveDate,
    pub products: Vec<ProductReport>,
}

impl RunReport {
    /// A run succeeds when every product could be processed; failed
    /// documents do not fail the run
    pub fn is_success(&self) -> bool {
        self.products.iter().all(|p| p.error.is_none())
    }
}

/// Run every configured product against `store`
///
/// The product list is validated before any document is touched; an
/// invalid list is the only error returned.
pub fn run_all<S: DocumentStore + ?Sized>(
    store: &mut S,
    products: &[ProductConfig],
    today: NaiveDate,
) -> Result<RunReport> {
    validate_products(products)?;
    let dates = products
        .iter()
        .map(|product| compute_best_by(today, product.shelf_life_days))
        .collect::<Result<Vec<_>>>()?;

    let mut orchestrator = BatchOrchestrator::new(store, today);
    let mut reports = Vec::with_capacity(products.len());

    for (product, best_by) in products.iter().zip(dates) {
        let report = match orchestrator.run(product) {
            Ok(outcomes) => ProductReport {
                product: product.name.clone(),
                best_by,
                outcomes,
                error: None,
            },
            Err(e) => {
                warn!("{}: {}", product.name, e);
                ProductReport {
                    product: product.name.clone(),
                    best_by,
                    outcomes: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        reports.push(report);
    }

    Ok(RunReport { today, products: reports })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::pdf::test_support::label_pdf;
    use crate::store::{MemoryStore, PDF_MIME_TYPE};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn treats() -> ProductConfig {
        ProductConfig::new("Rice Crispy Treats", 75, "treats", "treats-archive")
    }

    /// Memory store whose operations can be made to fail per id or location
    struct FlakyStore {
        inner: MemoryStore,
        fail_fetch: Vec<String>,
        fail_list: Vec<String>,
    }

    impl DocumentStore for FlakyStore {
        fn list(&self, location: &str) -> Result<Vec<StoredEntry>> {
            if self.fail_list.iter().any(|l| l == location) {
                return Err(Error::store("list", location, "service unavailable"));
            }
            self.inner.list(location)
        }

        fn fetch(&self, id: &str) -> Result<Vec<u8>> {
            if self.fail_fetch.iter().any(|f| f == id) {
                return Err(Error::store("fetch", id, "connection reset"));
            }
            self.inner.fetch(id)
        }

        fn store(&mut self, id: &str, content: &[u8]) -> Result<()> {
            self.inner.store(id, content)
        }

        fn duplicate(&mut self, id: &str, destination: &str, name: &str) -> Result<()> {
            self.inner.duplicate(id, destination, name)
        }
    }

    #[test]
    fn test_run_updates_labels_and_archives_originals() {
        let original = label_pdf(&[vec!["Best if used by: 01/01/2024"]]);
        let mut store = MemoryStore::new();
        let id = store.insert("treats", "label.pdf", PDF_MIME_TYPE, original.clone());

        let outcomes = BatchOrchestrator::new(&mut store, ymd(2024, 1, 1)).run(&treats()).unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].document_id, id);
        assert_eq!(outcomes[0].status, RewriteStatus::Updated);
        assert_eq!(outcomes[0].applied_date, Some(ymd(2024, 3, 15)));
        assert_eq!(outcomes[0].to_string(), "label.pdf: updated (03/15/2024)");

        let archived = store.find("treats-archive", "label.pdf").unwrap();
        assert_eq!(store.content(archived), Some(original.as_slice()));
        assert_ne!(store.content(&id), Some(original.as_slice()));
    }

    #[test]
    fn test_document_without_label_is_left_alone() {
        let original = label_pdf(&[vec!["Fudge", "Net wt 8oz"]]);
        let mut store = MemoryStore::new();
        let id = store.insert("treats", "plain.pdf", PDF_MIME_TYPE, original.clone());

        let outcomes = BatchOrchestrator::new(&mut store, ymd(2024, 1, 1)).run(&treats()).unwrap();

        assert_eq!(outcomes[0].status, RewriteStatus::NoReplace);
        assert_eq!(outcomes[0].applied_date, None);
        assert_eq!(store.content(&id), Some(original.as_slice()));
        assert!(store.find("treats-archive", "plain.pdf").is_some());
    }

    #[test]
    fn test_non_pdf_entries_are_skipped() {
        let mut store = MemoryStore::new();
        store.insert("treats", "notes.txt", "text/plain", b"hello".to_vec());
        store.insert("treats", "label", PDF_MIME_TYPE, label_pdf(&[vec!["Best if used by: x"]]));

        let outcomes = BatchOrchestrator::new(&mut store, ymd(2024, 1, 1)).run(&treats()).unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].name, "label");
        assert!(store.find("treats-archive", "notes.txt").is_none());
    }

    #[test]
    fn test_archive_survives_decode_failure() {
        let mut store = MemoryStore::new();
        let bogus = store.insert("treats", "broken.pdf", PDF_MIME_TYPE, b"not a pdf".to_vec());
        let good = store.insert(
            "treats",
            "good.pdf",
            PDF_MIME_TYPE,
            label_pdf(&[vec!["Best if Used By: 01/01/2024"]]),
        );

        let outcomes = BatchOrchestrator::new(&mut store, ymd(2024, 1, 1)).run(&treats()).unwrap();

        let broken = outcomes.iter().find(|o| o.document_id == bogus).unwrap();
        assert!(matches!(broken.status, RewriteStatus::Failed(_)));
        let archived = store.find("treats-archive", "broken.pdf").unwrap();
        assert_eq!(store.content(archived), Some(&b"not a pdf"[..]));
        assert_eq!(store.content(&bogus), Some(&b"not a pdf"[..]));

        let updated = outcomes.iter().find(|o| o.document_id == good).unwrap();
        assert_eq!(updated.status, RewriteStatus::Updated);
    }

    #[test]
    fn test_fetch_failure_does_not_stop_the_batch() {
        let mut inner = MemoryStore::new();
        let first = inner.insert("treats", "a.pdf", PDF_MIME_TYPE, label_pdf(&[vec!["Best if used by: 1"]]));
        inner.insert("treats", "b.pdf", PDF_MIME_TYPE, label_pdf(&[vec!["Best if used by: 2"]]));
        let mut store = FlakyStore { inner, fail_fetch: vec![first], fail_list: vec![] };

        let outcomes = BatchOrchestrator::new(&mut store, ymd(2024, 1, 1)).run(&treats()).unwrap();

        let statuses: Vec<String> = outcomes.iter().map(|o| o.status.to_string()).collect();
        assert_eq!(statuses.len(), 2);
        assert!(statuses[0].starts_with("failed:"));
        assert_eq!(statuses[1], "updated");
        // Nothing was archived for the document that could not be fetched
        assert!(store.inner.find("treats-archive", "a.pdf").is_none());
    }

    #[test]
    fn test_run_all_records_listing_failures_and_continues() {
        let mut inner = MemoryStore::new();
        inner.insert("fudge", "f.pdf", PDF_MIME_TYPE, label_pdf(&[vec!["Best if used by: 1"]]));
        let mut store = FlakyStore {
            inner,
            fail_fetch: vec![],
            fail_list: vec!["treats".to_string()],
        };
        let products = vec![treats(), ProductConfig::new("Fudge", 60, "fudge", "fudge-archive")];

        let report = run_all(&mut store, &products, ymd(2024, 1, 1)).unwrap();

        assert!(!report.is_success());
        assert_eq!(report.products.len(), 2);
        assert!(report.products[0].error.is_some());
        assert_eq!(report.products[1].error, None);
        assert_eq!(report.products[1].updated(), 1);
        assert_eq!(report.products[1].best_by, ymd(2024, 3, 1));
    }

    #[test]
    fn test_run_all_rejects_bad_config_before_touching_documents() {
        let original = label_pdf(&[vec!["Best if used by: 01/01/2024"]]);
        let mut store = MemoryStore::new();
        let id = store.insert("treats", "label.pdf", PDF_MIME_TYPE, original.clone());
        let products = vec![treats(), ProductConfig::new("Fudge", 0, "fudge", "fudge-archive")];

        let err = run_all(&mut store, &products, ymd(2024, 1, 1)).unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(store.content(&id), Some(original.as_slice()));
        assert!(store.find("treats-archive", "label.pdf").is_none());
    }

    #[test]
    fn test_run_all_rejects_huge_shelf_life_without_panicking() {
        let original = label_pdf(&[vec!["Best if used by: 01/01/2024"]]);
        let mut store = MemoryStore::new();
        let id = store.insert("treats", "label.pdf", PDF_MIME_TYPE, original.clone());
        let products = vec![ProductConfig::new("Forever", 4_000_000_000, "treats", "treats-archive")];

        let err = run_all(&mut store, &products, ymd(2024, 1, 1)).unwrap_err();
        assert!(err.is_configuration());

        // A date near the end of the calendar fails up front as well
        let err = run_all(&mut store, &[treats()], NaiveDate::MAX).unwrap_err();
        assert!(matches!(err, Error::DateOutOfRange(_)));

        assert_eq!(store.content(&id), Some(original.as_slice()));
        assert!(store.find("treats-archive", "label.pdf").is_none());
    }

    #[test]
    fn test_report_counts() {
        let mut store = MemoryStore::new();
        store.insert("treats", "a.pdf", PDF_MIME_TYPE, label_pdf(&[vec!["Best if used by: 1"]]));
        store.insert("treats", "b.pdf", PDF_MIME_TYPE, label_pdf(&[vec!["nothing here"]]));
        store.insert("treats", "c.pdf", PDF_MIME_TYPE, b"%PDF-garbage".to_vec());

        let report = run_all(&mut store, &[treats()], ymd(2024, 1, 1)).unwrap();

        assert!(report.is_success());
        let product = &report.products[0];
        assert_eq!((product.updated(), product.unchanged(), product.failed()), (1, 1, 1));
    }
}
