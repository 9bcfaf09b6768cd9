pub use crate::config::*;
use crate::table::{Cell, Table};

/// A builder for assembling a table row by row.
///
/// The readers of the command line tool go through it, and it is the simplest
/// way to prepare a table in code.
///
/// ```
/// use quantile_shares::builder::TableBuilder;
/// use quantile_shares::Cell;
/// # use quantile_shares::ShareError;
///
/// let mut builder = TableBuilder::new("shares", &["Year".to_string(), "Value".to_string()])?;
///
/// builder.add_row_simple(&["2004", "0.4"]);
/// builder.add_row(vec![Cell::Number(2005.0)]);
///
/// let table = builder.build();
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.rows().nth(1).unwrap()[1], Cell::Empty);
/// # Ok::<(), ShareError>(())
/// ```
pub struct TableBuilder {
    pub(crate) _name: String,
    pub(crate) _columns: Vec<String>,
    pub(crate) _rows: Vec<Vec<Cell>>,
}

impl TableBuilder {
    pub fn new(name: &str, columns: &[String]) -> Result<TableBuilder, ShareError> {
        for (idx, c) in columns.iter().enumerate() {
            if columns[..idx].contains(c) {
                return DuplicateColumnSnafu {
                    table: name,
                    column: c.clone(),
                }
                .fail();
            }
        }
        Ok(TableBuilder {
            _name: name.to_string(),
            _columns: columns.to_vec(),
            _rows: Vec::new(),
        })
    }

    /// Adds a row of raw text cells.
    pub fn add_row_simple(&mut self, cells: &[&str]) {
        self.add_row(cells.iter().map(|s| Cell::parse(s)).collect())
    }

    /// Adds a row of cells.
    ///
    /// Short rows are padded with empty cells, cells beyond the last column
    /// are discarded.
    pub fn add_row(&mut self, mut cells: Vec<Cell>) {
        cells.resize(self._columns.len(), Cell::Empty);
        self._rows.push(cells);
    }

    pub fn num_rows(&self) -> usize {
        self._rows.len()
    }

    pub fn build(self) -> Table {
        Table {
            name: self._name,
            columns: self._columns,
            rows: self._rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_columns_are_rejected() {
        let cols = vec!["Year".to_string(), "Year".to_string()];
        let res = TableBuilder::new("t", &cols);
        assert!(matches!(res, Err(ShareError::DuplicateColumn { .. })));
    }

    #[test]
    fn long_rows_are_truncated() {
        let mut builder = TableBuilder::new("t", &["a".to_string()]).unwrap();
        builder.add_row_simple(&["1", "2", "3"]);
        let table = builder.build();
        assert_eq!(table.rows().next().unwrap(), &[Cell::Number(1.0)]);
    }
}
