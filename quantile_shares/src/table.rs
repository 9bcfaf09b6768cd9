use log::warn;

use crate::config::*;

/// The content of one cell, as read from a workbook or a delimited file.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Interprets raw text the way a spreadsheet would: blank is empty,
    /// anything that reads as a finite number is a number.
    pub fn parse(raw: &str) -> Cell {
        let s = raw.trim();
        if s.is_empty() {
            return Cell::Empty;
        }
        match s.parse::<f64>() {
            Ok(x) if x.is_finite() => Cell::Number(x),
            _ => Cell::Text(s.to_string()),
        }
    }

    /// The numeric value of the cell, if there is one.
    pub fn number(&self) -> Option<f64> {
        match self {
            Cell::Number(x) => Some(*x),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
            Cell::Empty => None,
        }
    }

    /// The cell rendered as a label. Numbers use their shortest representation,
    /// so that `2004.0` reads `2004`.
    pub fn label(&self) -> Option<String> {
        match self {
            Cell::Number(x) => Some(format!("{}", x)),
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Empty => None,
        }
    }

    /// The cell read as a calendar year.
    pub fn year(&self) -> Option<i32> {
        let x = self.number()?;
        if x.fract() == 0.0 && x >= i32::MIN as f64 && x <= i32::MAX as f64 {
            Some(x as i32)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// An in-memory table with named columns.
///
/// Invariant: every row has exactly as many cells as there are columns.
#[derive(PartialEq, Debug, Clone)]
pub struct Table {
    pub(crate) name: String,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The position of a required column.
    pub fn column_index(&self, name: &str) -> ShareResult<usize> {
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => Ok(idx),
            None => SchemaMismatchSnafu {
                table: self.name.clone(),
                column: name,
            }
            .fail(),
        }
    }

    /// The position of an optional column.
    pub fn optional_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// The first of the candidate columns present in the table.
    pub fn first_column_of<'a>(&self, candidates: &'a [String]) -> Option<(usize, &'a str)> {
        candidates
            .iter()
            .find_map(|c| self.optional_column(c).map(|idx| (idx, c.as_str())))
    }
}

/// Reads a cell as a number and reports the cells that hold something else.
///
/// The failure is recovered: the value becomes unknown.
pub(crate) fn coerce_number(table: &Table, lineno: usize, column: usize, cell: &Cell) -> Option<f64> {
    let res = cell.number();
    if res.is_none() {
        if let Cell::Text(s) = cell {
            warn!(
                "coerce_number: table {:?} row {} column {:?}: {:?} is not a number, using null",
                table.name, lineno, table.columns[column], s
            );
        }
    }
    res
}
