use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use quantile_shares::{Cell, Table};

use crate::pipeline::{io_common::builder_from_header, *};

/// Reads a worksheet whose first row is the header. Without a worksheet name,
/// the first worksheet of the workbook is used.
pub fn read_excel_table(path: &Path, worksheet: Option<&str>) -> PipelineResult<Table> {
    let path_s = path.display().to_string();
    let (sheet_name, wrange) = get_range(path, worksheet)?;

    let mut iter = wrange.rows();
    let header: Vec<String> = match iter.next() {
        Some(row) => row.iter().map(header_text).collect(),
        None => whatever!("worksheet {:?} of {} is empty", sheet_name, path_s),
    };
    debug!("read_excel_table: {:?} header: {:?}", sheet_name, header);
    let mut builder = builder_from_header(&sheet_name, &header)?;

    for (idx, row) in iter.enumerate() {
        let cells: Vec<Cell> = row.iter().map(read_cell).collect();
        if cells.iter().all(|c| c.is_empty()) {
            debug!("read_excel_table: {:?} row {}: blank, skipping", sheet_name, idx + 2);
            continue;
        }
        builder.add_row(cells);
    }
    Ok(builder.build())
}

fn get_range(path: &Path, worksheet: Option<&str>) -> PipelineResult<(String, Range<DataType>)> {
    let path_s = path.display().to_string();
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        &path_s, &worksheet
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu {
        path: path_s.clone(),
    })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                path: path_s.clone(),
                worksheet: worksheet_name,
            })?
            .context(OpeningExcelSnafu { path: path_s })?;
        Ok((worksheet_name.to_string(), wrange))
    } else {
        let first_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .context(EmptyExcelSnafu {
                path: path_s.clone(),
            })?;
        let wrange = workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu {
                path: path_s.clone(),
            })?
            .context(OpeningExcelSnafu { path: path_s })?;
        Ok((first_name, wrange))
    }
}

fn header_text(cell: &DataType) -> String {
    match read_cell(cell) {
        Cell::Empty => String::new(),
        c => c.label().unwrap_or_default(),
    }
}

fn read_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::Empty => Cell::Empty,
        DataType::Float(f) if f.is_finite() => Cell::Number(*f),
        DataType::Int(i) => Cell::Number(*i as f64),
        // Text in a workbook can still hold a number.
        DataType::String(s) => Cell::parse(s),
        DataType::Bool(b) => Cell::Text(b.to_string()),
        other => {
            warn!("read_cell: unsupported cell {:?}, using text", other);
            Cell::Text(format!("{:?}", other))
        }
    }
}
