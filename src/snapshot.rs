// 📂 Source Snapshot - raw CSV rows
//
// Rows are read as plain strings: no header handling, no fixed width. The
// reconciler owns the meaning of row 0 and of each column. Bytes that are not
// valid UTF-8 decode to U+FFFD so one bad field never sinks the snapshot.

use std::io::Read;
use std::path::Path;
use thiserror::Error;

pub type Row = Vec<String>;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to read snapshot {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed snapshot at record {record}: {source}")]
    Malformed {
        record: usize,
        #[source]
        source: csv::Error,
    },
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true);
    builder
}

/// Read every row of a CSV file, header included.
///
/// The whole file is read before anything is returned. Only a record the CSV
/// reader cannot split (or an I/O failure) aborts the snapshot as a unit.
pub fn read_snapshot(path: &Path) -> Result<Vec<Row>, SnapshotError> {
    let rdr = reader_builder()
        .from_path(path)
        .map_err(|source| SnapshotError::Open {
            path: path.display().to_string(),
            source,
        })?;
    collect_rows(rdr)
}

/// Same as `read_snapshot`, from any reader
pub fn read_snapshot_from<R: Read>(reader: R) -> Result<Vec<Row>, SnapshotError> {
    collect_rows(reader_builder().from_reader(reader))
}

fn collect_rows<R: Read>(mut rdr: csv::Reader<R>) -> Result<Vec<Row>, SnapshotError> {
    let mut rows = Vec::new();

    for (record, result) in rdr.byte_records().enumerate() {
        let record_data = result.map_err(|source| SnapshotError::Malformed { record, source })?;
        rows.push(
            record_data
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        );
    }

    Ok(rows)
}
