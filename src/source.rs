//! Borrower record source: a CSV file whose first row is a header.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::borrower::Borrower;
use crate::config::LendingTerms;
use crate::error::{Result, SimError};

/// Raw rows of a record source, header first.
pub type Records = Vec<Vec<String>>;

/// Read every row as text. Rows may have differing lengths.
pub fn read_records<R: Read>(reader: R) -> Result<Records> {
    let mut csv = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(reader);
    let mut records = Vec::new();
    for row in csv.records() {
        records.push(row?.iter().map(str::to_string).collect());
    }
    Ok(records)
}

/// Open `path` and read its rows. A missing file, or one that cannot be read
/// as text, is [`SimError::RecordSourceNotFound`].
pub fn read_records_from_path(path: impl AsRef<Path>) -> Result<Records> {
    let path = path.as_ref();
    let not_found = |source| SimError::RecordSourceNotFound { path: path.to_path_buf(), source };
    let file = File::open(path).map_err(not_found)?;
    read_records(file).map_err(|e| match e {
        SimError::Csv(e) => not_found(match e.into_kind() {
            csv::ErrorKind::Io(io) => io,
            kind => io::Error::new(io::ErrorKind::InvalidData, format!("{kind:?}")),
        }),
        other => other,
    })
}

/// Build one borrower per data row, skipping the header. The first invalid
/// row aborts the whole load.
pub fn list_borrowers(records: &[Vec<String>], terms: &LendingTerms) -> Result<Vec<Borrower>> {
    records
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, fields)| Borrower::from_record(i + 1, fields.as_slice(), terms))
        .collect()
}

pub fn load_borrowers(path: impl AsRef<Path>, terms: &LendingTerms) -> Result<Vec<Borrower>> {
    let path = path.as_ref();
    let records = read_records_from_path(path)?;
    let borrowers = list_borrowers(&records, terms)?;
    info!(path = %path.display(), borrowers = borrowers.len(), "loaded borrower records");
    Ok(borrowers)
}

/// Shape of a record source, for eyeballing an input file before a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    /// Row count, header included.
    pub records: usize,
    /// Field count of the header row.
    pub fields: usize,
    pub header: Vec<String>,
    pub first_record: Option<Vec<String>>,
}

pub fn inspect(records: &[Vec<String>]) -> RecordSummary {
    let header = records.first().cloned().unwrap_or_default();
    RecordSummary {
        records: records.len(),
        fields: header.len(),
        header,
        first_record: records.get(1).cloned(),
    }
}
