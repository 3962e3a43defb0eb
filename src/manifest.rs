use regex::Regex;

/// Identity block parsed from the document's "Manifest Kantong" label.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestHeader {
    pub office_label: String,
    pub office_code: String,
}

/// Row-of-cells representation handed over by an external layout extractor,
/// one `Table` per table the source document reports.
pub type Table = Vec<Vec<String>>;

/// One positional row emitted by an extraction strategy. `seq` is the
/// 1-based emission index, dense regardless of any numbering embedded in
/// the source document. `cells` are in canonical order:
/// `[row-no, bag id, product code, weight, origin bag]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow {
    pub seq: u32,
    pub cells: Vec<String>,
}

/// Leading tokens of known non-data rows in the manifest template
/// (column headers, page footers, summary lines).
const SKIP_PREFIXES: [&str; 8] = [
    "produk", "ec3", "pkh", "pe", "total", "kantor", "agus", "nippos",
];

/// Locate the manifest header. Two grammars are tried in order; if
/// neither yields an office code the document has no usable header and
/// downstream validation must fail.
pub fn parse_header(text: &str) -> Option<ManifestHeader> {
    header_from_label_line(text).or_else(|| header_from_office_prefix(text))
}

/// Grammar 1: the label, lazily anything up to a colon, then a free-text
/// value on the rest of the line. The office code is the value's last
/// whitespace-delimited token.
fn header_from_label_line(text: &str) -> Option<ManifestHeader> {
    let re = Regex::new(r"(?is)Manifest Kantong.*?:\s*([^\n]*)").ok()?;
    let cap = re.captures(text)?;
    let mut label = cap[1].trim().to_string();
    // Layout engines sometimes leave a stray separator in front of the value.
    if let Some(first) = label.chars().next() {
        if !first.is_alphanumeric() {
            label = label[first.len_utf8()..].trim().to_string();
        }
    }
    let code = label.split_whitespace().next_back()?.to_string();
    Some(ManifestHeader {
        office_label: label,
        office_code: code,
    })
}

/// Grammar 2 (case-sensitive): label, colon, an office-prefix token,
/// free text, then a 5+-digit alphanumeric code.
fn header_from_office_prefix(text: &str) -> Option<ManifestHeader> {
    let re = Regex::new(r"Manifest Kantong\s*:\s*(KCP|KC)\s+.+?(\d{5}[A-Z0-9]*)").ok()?;
    let cap = re.captures(text)?;
    let label = cap
        .get(0)?
        .as_str()
        .split(':')
        .next_back()?
        .trim()
        .to_string();
    Some(ManifestHeader {
        office_label: label,
        office_code: cap[2].to_string(),
    })
}

/// Extract candidate rows from whichever source is available: layout
/// tables when the caller has them, otherwise the raw text layer.
pub fn candidate_rows<'a>(
    text: &'a str,
    tables: Option<&'a [Table]>,
) -> Box<dyn Iterator<Item = CandidateRow> + 'a> {
    match tables {
        Some(tables) => Box::new(table_rows(tables)),
        None => Box::new(text_rows(text)),
    }
}

/// Layout-table strategy: drop blank rows and rows whose first cell is a
/// known header/footer/summary marker, keep everything else verbatim.
fn table_rows(tables: &[Table]) -> impl Iterator<Item = CandidateRow> + '_ {
    tables
        .iter()
        .flat_map(|table| table.iter())
        .filter(|row| !row.iter().all(|cell| cell.trim().is_empty()))
        .filter(|row| {
            let first = row
                .first()
                .map(|cell| cell.trim().to_lowercase())
                .unwrap_or_default();
            !SKIP_PREFIXES.iter().any(|prefix| first.starts_with(prefix))
        })
        .enumerate()
        .map(|(i, row)| CandidateRow {
            seq: (i + 1) as u32,
            cells: row.iter().map(|cell| cell.trim().to_string()).collect(),
        })
}

/// Fixed-pattern strategy: scan the text layer line by line for
/// `<no> <product code> <bag id> <weight> -`. Prose, page headers and
/// totals rows do not match and are silently excluded.
fn text_rows(text: &str) -> impl Iterator<Item = CandidateRow> + '_ {
    let re = Regex::new(r"(?m)^(\d+)\s+(P\d+)\s+(\w+)\s+([0-9.]+)\s+-").unwrap();
    let mut pos = 0;
    let mut seq = 0;
    std::iter::from_fn(move || {
        let cap = re.captures_at(text, pos)?;
        pos = cap.get(0)?.end();
        seq += 1;
        Some(CandidateRow {
            seq,
            // The document prints product code before bag id; cells are
            // reordered to the canonical layout. Origin is never populated
            // by this source format.
            cells: vec![
                cap[1].to_string(),
                cap[3].to_string(),
                cap[2].to_string(),
                cap[4].to_string(),
                "-".to_string(),
            ],
        })
    })
}
