use quantile_shares::builder::TableBuilder;
use quantile_shares::Table;

use crate::pipeline::*;
use crate::pipeline::{io_csv::read_csv_table, io_excel::read_excel_table};

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Relative paths are taken from `root`.
pub fn resolve_path(root: &Path, file_path: &str) -> PathBuf {
    let p = Path::new(file_path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

/// Loads the table of a source, dispatching on its provider.
pub fn read_table(root: &Path, cfs: &FileSource) -> PipelineResult<Table> {
    let p = resolve_path(root, &cfs.file_path);
    let p_s = p.display().to_string();
    info!("Attempting to read table {:?}", p_s);
    if !p.is_file() {
        return SourceNotFoundSnafu { path: p_s }.fail();
    }
    let table = match cfs.provider.as_str() {
        "xlsx" => read_excel_table(&p, cfs.worksheet_name.as_deref()),
        "csv" => read_csv_table(&p),
        x => whatever!("provider not implemented: {:?}", x),
    }?;
    info!(
        "read_table: {:?}: {} columns, {} rows",
        table.name(),
        table.columns().len(),
        table.len()
    );
    Ok(table)
}

/// Starts a table from a header row.
///
/// Blank header cells get a positional name so that the other columns stay
/// addressable.
pub fn builder_from_header(name: &str, header: &[String]) -> PipelineResult<TableBuilder> {
    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            let h = h.trim();
            if h.is_empty() {
                format!("column{}", idx + 1)
            } else {
                h.to_string()
            }
        })
        .collect();
    debug!("builder_from_header: {:?}: columns {:?}", name, columns);
    TableBuilder::new(name, &columns).context(SharesSnafu {
        stage: format!("header of {}", name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_use_the_root() {
        let root = Path::new("/data/config");
        assert_eq!(
            resolve_path(root, "tables/shares.xlsx"),
            PathBuf::from("/data/config/tables/shares.xlsx")
        );
        assert_eq!(resolve_path(root, "/abs/x.csv"), PathBuf::from("/abs/x.csv"));
        assert_eq!(simplify_file_name(Path::new("/a/b/SCFP2022.csv")), "SCFP2022.csv");
    }

    #[test]
    fn blank_headers_are_named() {
        let header = vec!["year".to_string(), " ".to_string(), "Total".to_string()];
        let b = builder_from_header("pce", &header).unwrap();
        let t = b.build();
        assert_eq!(t.columns(), &["year".to_string(), "column2".to_string(), "Total".to_string()]);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("t.txt"), "a\n1\n").unwrap();
        let cfs = FileSource {
            provider: "parquet".to_string(),
            file_path: "t.txt".to_string(),
            worksheet_name: None,
        };
        assert!(matches!(
            read_table(dir.path(), &cfs),
            Err(PipelineError::InvalidConfig { .. })
        ));
        let missing = FileSource {
            provider: "csv".to_string(),
            file_path: "nope.csv".to_string(),
            worksheet_name: None,
        };
        assert!(matches!(
            read_table(dir.path(), &missing),
            Err(PipelineError::SourceNotFound { .. })
        ));
    }
}
