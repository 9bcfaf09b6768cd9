//! Row selection and rescaling of share tables.
//!
//! Share tables give, for each year and each quantile, the fraction of a total.
//! The total itself is stored in the same table as a pseudo-quantile row (long
//! tables) or in a dedicated column (wide tables).

use log::{debug, info, warn};
use std::collections::BTreeMap;

use crate::config::*;
use crate::table::{coerce_number, Cell, Table};

/// Keeps the rows whose `column` holds one of the `allowed` labels.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RowPredicate {
    pub column: String,
    pub allowed: Vec<String>,
}

impl RowPredicate {
    pub fn equals(column: &str, value: &str) -> RowPredicate {
        RowPredicate {
            column: column.to_string(),
            allowed: vec![value.to_string()],
        }
    }
}

/// The columns of a long share table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ShareLayout {
    pub year_column: String,
    pub label_column: String,
    pub value_column: String,
    /// The label of the pseudo-quantile row holding the absolute total.
    pub total_label: String,
}

/// The columns of a wide share table, with one column per fine quantile.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct WideLayout {
    pub year_column: String,
    /// The column naming the series of each row.
    pub key_column: String,
    pub total_column: String,
    /// (column name, fine quantile label)
    pub share_columns: Vec<(String, String)>,
}

/// Shares converted to absolute values.
#[derive(PartialEq, Debug, Clone)]
pub struct ScaledShares {
    /// Every row except the totals, with `value = share * total`.
    pub rows: Vec<Observation>,
    /// The total rows, unchanged.
    pub totals: Vec<Observation>,
}

impl ScaledShares {
    /// The scaled rows followed by the totals.
    pub fn into_observations(self) -> Vec<Observation> {
        let mut res = self.rows;
        res.extend(self.totals);
        res
    }
}

/// A (year, series) whose fine shares do not add up to one.
#[derive(PartialEq, Debug, Clone)]
pub struct CoverageGap {
    pub year: i32,
    pub series: String,
    pub share_sum: f64,
}

/// Returns the rows matching all the predicates.
///
/// All the columns named by the predicates must exist.
pub fn select_rows<'a>(
    table: &'a Table,
    predicates: &[RowPredicate],
) -> ShareResult<Vec<(usize, &'a [Cell])>> {
    let mut resolved: Vec<(usize, &RowPredicate)> = Vec::new();
    for p in predicates.iter() {
        resolved.push((table.column_index(&p.column)?, p));
    }
    let res: Vec<(usize, &[Cell])> = table
        .rows()
        .enumerate()
        .filter(|(_, row)| {
            resolved.iter().all(|(idx, p)| match row[*idx].label() {
                Some(l) => p.allowed.iter().any(|a| *a == l),
                None => false,
            })
        })
        .collect();
    debug!(
        "select_rows: table {:?}: {} of {} rows selected",
        table.name(),
        res.len(),
        table.len()
    );
    Ok(res)
}

/// Reads the share rows of one series from a long table.
///
/// The values are the raw shares: see `scale_by_total` for the conversion.
pub fn read_share_series(
    table: &Table,
    predicates: &[RowPredicate],
    layout: &ShareLayout,
    series: &Series,
) -> ShareResult<Vec<Observation>> {
    let year_idx = table.column_index(&layout.year_column)?;
    let label_idx = table.column_index(&layout.label_column)?;
    let value_idx = table.column_index(&layout.value_column)?;

    let mut res: Vec<Observation> = Vec::new();
    for (lineno, row) in select_rows(table, predicates)? {
        let year = match row[year_idx].year() {
            Some(y) => y,
            None => {
                warn!(
                    "read_share_series: table {:?} row {}: cannot read year {:?}, skipping row",
                    table.name(),
                    lineno,
                    row[year_idx]
                );
                continue;
            }
        };
        let bucket = match row[label_idx].label() {
            Some(l) => l,
            None => {
                warn!(
                    "read_share_series: table {:?} row {}: empty quantile label, skipping row",
                    table.name(),
                    lineno
                );
                continue;
            }
        };
        let value = coerce_number(table, lineno, value_idx, &row[value_idx]);
        res.push(Observation {
            year,
            series: series.clone(),
            bucket,
            value,
        });
    }
    info!(
        "read_share_series: series {:?}: {} rows",
        series.name,
        res.len()
    );
    Ok(res)
}

/// Multiplies every share by the total of its (series, year).
///
/// Fails with `MissingTotal` when a (series, year) has shares but no total row.
/// A total that is present but unknown makes all the scaled values of its year
/// unknown.
pub fn scale_by_total(shares: &[Observation], total_label: &str) -> ShareResult<ScaledShares> {
    let mut totals_by_key: BTreeMap<(String, i32), Option<f64>> = BTreeMap::new();
    let mut totals: Vec<Observation> = Vec::new();
    for o in shares.iter().filter(|o| o.bucket == total_label) {
        let key = (o.series.name.clone(), o.year);
        if totals_by_key.insert(key, o.value).is_some() {
            warn!(
                "scale_by_total: series {:?} year {}: several total rows, using the last one",
                o.series.name, o.year
            );
        }
        totals.push(o.clone());
    }

    let mut rows: Vec<Observation> = Vec::new();
    for o in shares.iter().filter(|o| o.bucket != total_label) {
        let total = match totals_by_key.get(&(o.series.name.clone(), o.year)) {
            Some(t) => *t,
            None => {
                return MissingTotalSnafu {
                    series: o.series.name.clone(),
                    year: o.year,
                    label: total_label,
                }
                .fail();
            }
        };
        let value = match (o.value, total) {
            (Some(share), Some(t)) => Some(share * t),
            _ => None,
        };
        rows.push(Observation {
            value,
            ..o.clone()
        });
    }
    debug!(
        "scale_by_total: {} rows scaled with {} totals",
        rows.len(),
        totals.len()
    );
    Ok(ScaledShares { rows, totals })
}

/// Finds the (year, series) whose fine-label shares do not sum to one.
///
/// Must be called on raw shares, before scaling. Unknown shares are ignored.
pub fn share_coverage(shares: &[Observation], map: &QuantileMap, tolerance: f64) -> Vec<CoverageGap> {
    let mut sums: BTreeMap<(i32, String), f64> = BTreeMap::new();
    for o in shares.iter().filter(|o| map.is_fine(&o.bucket)) {
        *sums.entry((o.year, o.series.name.clone())).or_insert(0.0) += o.value.unwrap_or(0.0);
    }
    sums.into_iter()
        .filter(|(_, s)| (s - 1.0).abs() > tolerance)
        .map(|((year, series), share_sum)| CoverageGap {
            year,
            series,
            share_sum,
        })
        .collect()
}

/// Converts a wide table (one column per fine quantile, one row per series
/// and year) into absolute-valued observations.
///
/// Only the rows whose key matches one of `series` are kept; the key is
/// replaced by the corresponding series. Each share is multiplied by the
/// total of its row.
pub fn melt_wide_shares(
    table: &Table,
    layout: &WideLayout,
    series: &[(String, Series)],
) -> ShareResult<Vec<Observation>> {
    let year_idx = table.column_index(&layout.year_column)?;
    let key_idx = table.column_index(&layout.key_column)?;
    let total_idx = table.column_index(&layout.total_column)?;
    let mut share_idxs: Vec<(usize, &str)> = Vec::new();
    for (col, fine) in layout.share_columns.iter() {
        share_idxs.push((table.column_index(col)?, fine.as_str()));
    }

    let mut res: Vec<Observation> = Vec::new();
    for (lineno, row) in table.rows().enumerate() {
        let key = match row[key_idx].label() {
            Some(k) => k,
            None => continue,
        };
        let s = match series.iter().find(|(title, _)| *title == key) {
            Some((_, s)) => s,
            None => continue,
        };
        let year = match row[year_idx].year() {
            Some(y) => y,
            None => {
                warn!(
                    "melt_wide_shares: table {:?} row {}: cannot read year {:?}, skipping row",
                    table.name(),
                    lineno,
                    row[year_idx]
                );
                continue;
            }
        };
        let total = coerce_number(table, lineno, total_idx, &row[total_idx]);
        for (idx, fine) in share_idxs.iter() {
            let share = coerce_number(table, lineno, *idx, &row[*idx]);
            let value = match (share, total) {
                (Some(sh), Some(t)) => Some(sh * t),
                _ => None,
            };
            res.push(Observation {
                year,
                series: s.clone(),
                bucket: fine.to_string(),
                value,
            });
        }
    }
    info!(
        "melt_wide_shares: table {:?}: {} observations for {} series",
        table.name(),
        res.len(),
        series.len()
    );
    Ok(res)
}
