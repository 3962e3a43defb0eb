use crate::manifest::{CandidateRow, ManifestHeader};

/// Identifier prefix marking a reserved, non-trackable entry. Prefix
/// match is case-sensitive by business convention.
const PLACEHOLDER_PREFIX: &str = "PID";

/// One itemized bag of a manifest, in storage-ready form. The weight is
/// kept as the raw token; it is display-only and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct BagRecord {
    pub sequence_no: u32,
    pub bag_id: String,
    pub product_code: String,
    pub weight_kg: String,
    pub origin_bag: String,
}

/// Disposition of one candidate row.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedRecord {
    Valid(BagRecord),
    /// Reserved identifier; counted and never written to the store.
    Placeholder(BagRecord),
    /// Required fields could not be extracted.
    Malformed { seq: u32, reason: &'static str },
}

/// Pure classification of one candidate row, no side effects.
pub fn classify(row: &CandidateRow) -> ClassifiedRecord {
    if row.cells.len() < 3 {
        return ClassifiedRecord::Malformed {
            seq: row.seq,
            reason: "fewer than 3 fields",
        };
    }

    let bag_id = row.cells[1].trim();
    if bag_id.is_empty() {
        return ClassifiedRecord::Malformed {
            seq: row.seq,
            reason: "empty bag id",
        };
    }

    let record = BagRecord {
        sequence_no: row.seq,
        bag_id: bag_id.to_string(),
        product_code: row.cells[2].trim().to_string(),
        weight_kg: cell_or_dash(&row.cells, 3),
        origin_bag: cell_or_dash(&row.cells, 4),
    };

    if record.bag_id.starts_with(PLACEHOLDER_PREFIX) {
        ClassifiedRecord::Placeholder(record)
    } else {
        ClassifiedRecord::Valid(record)
    }
}

fn cell_or_dash(cells: &[String], idx: usize) -> String {
    match cells.get(idx) {
        Some(cell) if !cell.trim().is_empty() => cell.trim().to_string(),
        _ => "-".to_string(),
    }
}

/// Exact string comparison of the parsed office code against the
/// configured one. No case or leading-zero normalization; an absent
/// header or an empty configured code always fails.
pub fn validate_header(header: Option<&ManifestHeader>, expected_code: &str) -> bool {
    match header {
        Some(header) => !expected_code.is_empty() && header.office_code == expected_code,
        None => false,
    }
}
