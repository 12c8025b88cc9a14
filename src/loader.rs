use crate::error::{Result, SalesMetricsError};
use crate::types::RawSalesRecord;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub parse_errors: usize,
}

/// Load the exported sales table. `.json` files hold an array of row
/// objects; `.csv` (or no extension) is read with a header row.
pub fn load_records(path: &Path) -> Result<(Vec<RawSalesRecord>, LoadReport)> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let loaded = match ext.as_deref() {
        Some("json") => {
            let contents =
                std::fs::read_to_string(path).map_err(|e| SalesMetricsError::io(path, e))?;
            parse_json(&contents)?
        }
        Some("csv") | None => {
            let file = File::open(path).map_err(|e| SalesMetricsError::io(path, e))?;
            parse_csv(file)?
        }
        Some(_) => return Err(SalesMetricsError::UnsupportedInput(path.to_path_buf())),
    };
    log::info!(
        "Loaded {} rows from {} ({} skipped)",
        loaded.1.total_rows - loaded.1.parse_errors,
        path.display(),
        loaded.1.parse_errors
    );
    Ok(loaded)
}

/// Rows that fail to deserialize are skipped and counted, not fatal.
pub fn parse_csv<R: Read>(reader: R) -> Result<(Vec<RawSalesRecord>, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);
    // Fail early on an unreadable header row; data rows are handled below.
    rdr.headers()?;

    let mut report = LoadReport::default();
    let mut records = Vec::new();
    for result in rdr.deserialize::<RawSalesRecord>() {
        report.total_rows += 1;
        match result {
            Ok(r) => records.push(r),
            Err(e) => {
                log::debug!("Skipping CSV row {}: {}", report.total_rows, e);
                report.parse_errors += 1;
            }
        }
    }
    Ok((records, report))
}

/// The document must be a JSON array; elements that are not row objects
/// are skipped and counted.
pub fn parse_json(contents: &str) -> Result<(Vec<RawSalesRecord>, LoadReport)> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(contents)?;
    let mut report = LoadReport {
        total_rows: rows.len(),
        parse_errors: 0,
    };
    let mut records = Vec::with_capacity(rows.len());
    for (idx, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<RawSalesRecord>(row) {
            Ok(r) => records.push(r),
            Err(e) => {
                log::debug!("Skipping JSON row {}: {}", idx + 1, e);
                report.parse_errors += 1;
            }
        }
    }
    Ok((records, report))
}
