use rusqlite::{Connection, Result as SqliteResult, Transaction, params};
use std::path::Path;
use tracing::info;

/// Externally-defined status marker for rows still awaiting an SLA value.
/// This pipeline writes no other status and never deletes rows.
pub const STATUS_PENDING_SLA: i64 = 33;

pub struct ManifestStore {
    conn: Connection,
}

/// What happened to one insert attempt inside a batch.
#[derive(Debug, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    /// The UNIQUE constraint on `connote` fired: a row with this key
    /// already exists, possibly written by a concurrent importer.
    Duplicate,
}

impl ManifestStore {
    /// Open (or create) the store at the given path.
    pub fn open<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        Self::bootstrap(Connection::open(db_path)?)
    }

    /// In-memory store, used by tests.
    pub fn in_memory() -> SqliteResult<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> SqliteResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS bags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                connote TEXT NOT NULL UNIQUE,
                product TEXT NOT NULL,
                office_code TEXT NOT NULL,
                status INTEGER NOT NULL DEFAULT 33,
                sla INTEGER,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_bags_status ON bags(status)",
            [],
        )?;

        info!("Store schema ready");
        Ok(Self { conn })
    }

    /// Start an import batch. All inserts issued through the batch become
    /// durable together on `commit`; dropping the batch without committing
    /// rolls every one of them back.
    pub fn begin_import(&mut self) -> SqliteResult<ImportBatch<'_>> {
        Ok(ImportBatch {
            tx: self.conn.transaction()?,
        })
    }

    /// Connotes still marked pending, in insertion order.
    pub fn pending_connotes(&self) -> SqliteResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT connote FROM bags WHERE status = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![STATUS_PENDING_SLA], |row| row.get(0))?;
        rows.collect()
    }

    /// Write the SLA value for one record. Runs outside any batch, so the
    /// update is durable on its own (per-record commit).
    pub fn set_sla(&self, connote: &str, sla: i64) -> SqliteResult<()> {
        self.conn.execute(
            "UPDATE bags SET sla = ?1 WHERE connote = ?2",
            params![sla, connote],
        )?;
        info!(connote = %connote, sla = sla, "SLA stored");
        Ok(())
    }

    /// Record counts by enrichment state: (total, awaiting SLA, enriched).
    pub fn counts(&self) -> SqliteResult<(usize, usize, usize)> {
        let total: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM bags", [], |row| row.get(0))?;

        let awaiting: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM bags WHERE sla IS NULL",
            [],
            |row| row.get(0),
        )?;

        let enriched: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM bags WHERE sla IS NOT NULL",
            [],
            |row| row.get(0),
        )?;

        Ok((total, awaiting, enriched))
    }
}

/// An open import transaction. Exists only for the duration of one
/// document's reconciliation.
pub struct ImportBatch<'conn> {
    tx: Transaction<'conn>,
}

impl ImportBatch<'_> {
    /// Existence check on the natural key, scoped to the whole table.
    pub fn exists(&self, connote: &str) -> SqliteResult<bool> {
        let count: usize = self.tx.query_row(
            "SELECT COUNT(*) FROM bags WHERE connote = ?1",
            params![connote],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Append a record in pending-SLA state. A UNIQUE violation on
    /// `connote` is the authoritative duplicate signal, not an error.
    pub fn insert(
        &self,
        connote: &str,
        product: &str,
        office_code: &str,
    ) -> SqliteResult<InsertOutcome> {
        let result = self.tx.execute(
            "INSERT INTO bags (connote, product, office_code, status) VALUES (?1, ?2, ?3, ?4)",
            params![connote, product, office_code, STATUS_PENDING_SLA],
        );
        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e),
        }
    }

    /// Make every insert in this batch durable at once.
    pub fn commit(self) -> SqliteResult<()> {
        self.tx.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_exists() {
        let mut store = ManifestStore::in_memory().unwrap();
        let batch = store.begin_import().unwrap();

        assert!(!batch.exists("BAG123").unwrap());
        assert_eq!(
            batch.insert("BAG123", "P001", "67271").unwrap(),
            InsertOutcome::Inserted
        );
        assert!(batch.exists("BAG123").unwrap());
        batch.commit().unwrap();

        assert_eq!(store.counts().unwrap(), (1, 1, 0));
    }

    #[test]
    fn test_unique_violation_reports_duplicate() {
        let mut store = ManifestStore::in_memory().unwrap();
        let batch = store.begin_import().unwrap();
        batch.insert("BAG123", "P001", "67271").unwrap();
        assert_eq!(
            batch.insert("BAG123", "P002", "67271").unwrap(),
            InsertOutcome::Duplicate
        );
        batch.commit().unwrap();

        assert_eq!(store.counts().unwrap(), (1, 1, 0));
    }

    #[test]
    fn test_dropped_batch_rolls_back() {
        let mut store = ManifestStore::in_memory().unwrap();
        {
            let batch = store.begin_import().unwrap();
            batch.insert("BAG123", "P001", "67271").unwrap();
            batch.insert("BAG124", "P001", "67271").unwrap();
            // No commit.
        }
        assert_eq!(store.counts().unwrap(), (0, 0, 0));
    }

    #[test]
    fn test_set_sla_and_pending_selection() {
        let mut store = ManifestStore::in_memory().unwrap();
        let batch = store.begin_import().unwrap();
        batch.insert("BAG123", "P001", "67271").unwrap();
        batch.insert("BAG124", "P001", "67271").unwrap();
        batch.commit().unwrap();

        assert_eq!(store.pending_connotes().unwrap(), vec!["BAG123", "BAG124"]);

        store.set_sla("BAG123", 4).unwrap();
        let stored: Option<i64> = store
            .conn
            .query_row(
                "SELECT sla FROM bags WHERE connote = ?1",
                params!["BAG123"],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, Some(4));
        assert_eq!(store.counts().unwrap(), (2, 1, 1));

        // Selection is by status, which this pipeline never advances, so
        // an enriched record stays selectable for later passes.
        assert_eq!(store.pending_connotes().unwrap(), vec!["BAG123", "BAG124"]);
    }

    #[test]
    fn test_reopen_preserves_committed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bags.db");

        {
            let mut store = ManifestStore::open(&path).unwrap();
            let batch = store.begin_import().unwrap();
            batch.insert("BAG123", "P001", "67271").unwrap();
            batch.commit().unwrap();
        }

        let store = ManifestStore::open(&path).unwrap();
        assert_eq!(store.counts().unwrap(), (1, 1, 0));
        assert_eq!(store.pending_connotes().unwrap(), vec!["BAG123"]);
    }
}
