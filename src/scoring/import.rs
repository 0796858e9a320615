use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::domain::{HistoricalDataset, HistoricalRow, ProposalRecord};

#[derive(Debug, thiserror::Error)]
pub enum HistoricalImportError {
    #[error("unable to open historical csv {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse historical csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Read historical proposals from a CSV export whose headers match the JSON field names.
///
/// Empty cells count as missing and resolve to `0`; unknown columns are ignored. Cells that are
/// not numbers are kept as `NaN` so the learned path can decline the dataset.
pub fn load_historical_csv<R: Read>(reader: R) -> Result<HistoricalDataset, HistoricalImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in csv_reader.deserialize::<HistoricalRow>() {
        records.push(ProposalRecord::from(row?));
    }

    Ok(HistoricalDataset::new(records))
}

pub fn load_historical_csv_path(
    path: impl AsRef<Path>,
) -> Result<HistoricalDataset, HistoricalImportError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| HistoricalImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_historical_csv(file)
}
