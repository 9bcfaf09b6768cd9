// Primitives for reading CSV files.

use quantile_shares::{Cell, Table};

use crate::pipeline::{io_common::builder_from_header, io_common::simplify_file_name, *};

/// Reads a delimited file whose first record is the header.
///
/// Numeric text becomes a number cell. Short records are padded with empty
/// cells.
pub fn read_csv_table(path: &Path) -> PipelineResult<Table> {
    let path_s = path.display().to_string();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(OpeningCsvSnafu {
            path: path_s.clone(),
        })?;
    let mut records = rdr.records();

    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(ReadingCsvSnafu {
                path: path_s.clone(),
                lineno: 1_usize,
            })?
            .iter()
            .map(|s| s.to_string())
            .collect(),
        None => whatever!("CSV file {} is empty", path_s),
    };
    let mut builder = builder_from_header(&simplify_file_name(path), &header)?;

    for (idx, line_r) in records.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(ReadingCsvSnafu {
            path: path_s.clone(),
            lineno,
        })?;
        if line.iter().all(|s| s.trim().is_empty()) {
            debug!("read_csv_table: {:?} line {}: blank, skipping", path_s, lineno);
            continue;
        }
        builder.add_row(line.iter().map(Cell::parse).collect());
    }
    debug!(
        "read_csv_table: {:?}: {} rows",
        path_s,
        builder.num_rows()
    );
    Ok(builder.build())
}
