use crate::classify::{self, ClassifiedRecord};
use crate::manifest::{self, Table};
use crate::store::{InsertOutcome, ManifestStore};
use std::fmt;
use tracing::{info, warn};

/// Outcome counts for one document import. Every candidate row lands in
/// exactly one bucket.
#[derive(Debug, Default, PartialEq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub placeholder_skipped: usize,
    pub duplicate_skipped: usize,
    pub malformed_skipped: usize,
}

#[derive(Debug)]
pub enum ImportError {
    /// Neither header grammar matched; nothing was written.
    HeaderNotFound,
    /// The document's office code does not equal the configured one.
    CodeMismatch { found: String, expected: String },
    /// Store failure; the batch was rolled back, nothing is durable.
    Store(rusqlite::Error),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderNotFound => {
                write!(f, "no 'Manifest Kantong' header found in document")
            }
            Self::CodeMismatch { found, expected } => {
                write!(
                    f,
                    "manifest office code '{found}' does not match configured code '{expected}'"
                )
            }
            Self::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<rusqlite::Error> for ImportError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(e)
    }
}

/// Reconcile one manifest document into the store.
///
/// The header is validated once, before any row processing; a mismatch
/// aborts with zero side effects. Rows are then classified and written
/// in document order, and the whole batch commits at the end, so a store
/// failure mid-document leaves nothing durable.
pub fn import_document(
    store: &mut ManifestStore,
    text: &str,
    tables: Option<&[Table]>,
    expected_code: &str,
) -> Result<ImportSummary, ImportError> {
    let header = manifest::parse_header(text).ok_or(ImportError::HeaderNotFound)?;
    if !classify::validate_header(Some(&header), expected_code) {
        return Err(ImportError::CodeMismatch {
            found: header.office_code,
            expected: expected_code.to_string(),
        });
    }
    info!(office = %header.office_label, code = %header.office_code, "Manifest header validated");

    let mut summary = ImportSummary::default();
    let batch = store.begin_import()?;

    for row in manifest::candidate_rows(text, tables) {
        match classify::classify(&row) {
            ClassifiedRecord::Malformed { seq, reason } => {
                warn!(seq = seq, reason = reason, "Skipping malformed row");
                summary.malformed_skipped += 1;
            }
            ClassifiedRecord::Placeholder(record) => {
                info!(seq = record.sequence_no, bag = %record.bag_id, "Skipping placeholder row");
                summary.placeholder_skipped += 1;
            }
            ClassifiedRecord::Valid(record) => {
                if batch.exists(&record.bag_id)? {
                    summary.duplicate_skipped += 1;
                    continue;
                }
                match batch.insert(&record.bag_id, &record.product_code, &header.office_code)? {
                    InsertOutcome::Inserted => summary.inserted += 1,
                    InsertOutcome::Duplicate => summary.duplicate_skipped += 1,
                }
            }
        }
    }

    batch.commit()?;

    info!(
        inserted = summary.inserted,
        placeholders = summary.placeholder_skipped,
        duplicates = summary.duplicate_skipped,
        malformed = summary.malformed_skipped,
        "Import committed"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Manifest Kantong : KCP DRINGU 67271\n\
                          1 P001 BAG123 12.5 -\n\
                          2 P002 PIDX99 3.0 -\n";

    #[test]
    fn test_import_sample_document() {
        let mut store = ManifestStore::in_memory().unwrap();
        let summary = import_document(&mut store, SAMPLE, None, "67271").unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                inserted: 1,
                placeholder_skipped: 1,
                duplicate_skipped: 0,
                malformed_skipped: 0,
            }
        );
        assert_eq!(store.pending_connotes().unwrap(), vec!["BAG123"]);
    }

    #[test]
    fn test_reimport_counts_duplicates() {
        let mut store = ManifestStore::in_memory().unwrap();
        import_document(&mut store, SAMPLE, None, "67271").unwrap();
        let second = import_document(&mut store, SAMPLE, None, "67271").unwrap();

        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicate_skipped, 1);
        assert_eq!(second.placeholder_skipped, 1);
        assert_eq!(store.counts().unwrap(), (1, 1, 0));
    }

    #[test]
    fn test_duplicate_within_one_document() {
        let text = "Manifest Kantong : KCP DRINGU 67271\n\
                    1 P001 BAG123 12.5 -\n\
                    2 P001 BAG123 12.5 -\n";
        let mut store = ManifestStore::in_memory().unwrap();
        let summary = import_document(&mut store, text, None, "67271").unwrap();

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.duplicate_skipped, 1);
    }

    #[test]
    fn test_code_mismatch_writes_nothing() {
        let mut store = ManifestStore::in_memory().unwrap();
        let err = import_document(&mut store, SAMPLE, None, "99999").unwrap_err();

        let ImportError::CodeMismatch { found, expected } = err else {
            panic!("expected CodeMismatch, got {err:?}");
        };
        assert_eq!(found, "67271");
        assert_eq!(expected, "99999");
        assert_eq!(store.counts().unwrap(), (0, 0, 0));
    }

    #[test]
    fn test_missing_header_writes_nothing() {
        let mut store = ManifestStore::in_memory().unwrap();
        let err = import_document(&mut store, "1 P001 BAG123 12.5 -\n", None, "67271").unwrap_err();

        assert!(matches!(err, ImportError::HeaderNotFound));
        assert_eq!(store.counts().unwrap(), (0, 0, 0));
    }

    #[test]
    fn test_empty_expected_code_fails_closed() {
        let mut store = ManifestStore::in_memory().unwrap();
        let err = import_document(&mut store, SAMPLE, None, "").unwrap_err();
        assert!(matches!(err, ImportError::CodeMismatch { .. }));
    }

    #[test]
    fn test_import_from_layout_tables() {
        // Header still comes from the text layer; rows come from the
        // externally-extracted tables.
        let tables: Vec<Table> = vec![vec![
            vec!["Produk / No Kantong".into(), "Berat".into(), "Asal".into()],
            vec!["1".into(), "BAG200".into(), "P001".into(), "2.0".into(), "-".into()],
            vec!["2".into(), "".into(), "P001".into(), "1.0".into(), "-".into()],
            vec!["Total".into(), "2".into(), "".into()],
        ]];
        let mut store = ManifestStore::in_memory().unwrap();
        let summary = import_document(
            &mut store,
            "Manifest Kantong : KCP DRINGU 67271\n",
            Some(&tables),
            "67271",
        )
        .unwrap();

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.malformed_skipped, 1);
        assert_eq!(store.pending_connotes().unwrap(), vec!["BAG200"]);
    }

    #[test]
    fn test_round_trip_n_rows() {
        let mut text = String::from("Manifest Kantong : KCP DRINGU 67271\n");
        for i in 1..=5 {
            text.push_str(&format!("{i} P00{i} BAG{i:03} 1.{i} -\n"));
        }
        let mut store = ManifestStore::in_memory().unwrap();
        let summary = import_document(&mut store, &text, None, "67271").unwrap();

        assert_eq!(summary.inserted, 5);
        assert_eq!(summary.duplicate_skipped, 0);
        assert_eq!(summary.placeholder_skipped, 0);
        assert_eq!(store.counts().unwrap(), (5, 5, 0));
    }
}
