// ********* Input data structures ***********

use snafu::Snafu;
use std::collections::{BTreeMap, BTreeSet};

/// The role played by a series in the distributional accounts.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum SeriesKind {
    Income,
    Consumption,
    Saving,
    /// A line of the consumption breakdown (durable goods, services, ...).
    ConsumptionSubcategory,
}

/// A named series. The name is the label written in the output fixtures.
///
/// Series are ordered by name first, which is the order used when sorting
/// observations.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct Series {
    pub name: String,
    pub kind: SeriesKind,
}

impl Series {
    pub fn new(name: &str, kind: SeriesKind) -> Series {
        Series {
            name: name.to_string(),
            kind,
        }
    }
}

/// One value of one series, for one year and one bucket.
///
/// A value of `None` means that the source cell could not be read as a number.
/// It is carried through the computations as an unknown value.
#[derive(PartialEq, Debug, Clone)]
pub struct Observation {
    pub year: i32,
    pub series: Series,
    pub bucket: String,
    pub value: Option<f64>,
}

// ******** Output data structures *********

/// A derived percentage for one (year, bucket).
#[derive(PartialEq, Debug, Clone)]
pub struct RatioRecord {
    pub year: i32,
    pub bucket: String,
    pub name: String,
    pub percent: Option<f64>,
}

/// Errors that prevent a reshaping step from completing.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ShareError {
    #[snafu(display("column {column:?} is missing from table {table:?}"))]
    SchemaMismatch { table: String, column: String },

    #[snafu(display("column {column:?} appears twice in table {table:?}"))]
    DuplicateColumn { table: String, column: String },

    #[snafu(display("no {label:?} row for series {series:?} in year {year}"))]
    MissingTotal {
        series: String,
        year: i32,
        label: String,
    },

    #[snafu(display("bucket label {label:?} is not covered by quantile map {version}"))]
    UnmappedLabel { label: String, version: String },

    #[snafu(display("invalid quantile map {version}: {message}"))]
    InvalidQuantileMap { version: String, message: String },
}

pub type ShareResult<T> = Result<T, ShareError>;

// ********* Configuration **********

/// What to do with a bucket label that is neither a fine label of the map
/// nor a passthrough label.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum UnmappedLabelPolicy {
    /// The row is dropped and a warning is logged.
    Drop,
    /// The remapping fails with `ShareError::UnmappedLabel`.
    Fail,
}

/// What to do when a joined series has no value for a (year, bucket) of the
/// base series.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum MissingSeriesPolicy {
    /// Keep the row, the missing series is recorded as unknown.
    Null,
    /// Drop the row (inner join).
    Drop,
}

/// The labels that bypass the remapping by default.
pub const TOP_1: &str = "Top 1%";
pub const TOP_5: &str = "Top 5%";
pub const TOTAL_BILLIONS: &str = "Total ($ Billions)";

/// The mapping from fine-grained quantile labels to coarse buckets.
///
/// This is the single place where bucket labels are declared. The version
/// string is reported in the logs and in the errors so that a fixture can be
/// traced back to the mapping that produced it.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuantileMap {
    pub version: String,
    fine_to_coarse: BTreeMap<String, String>,
    categories: Vec<String>,
    passthrough: BTreeSet<String>,
    pub unmapped: UnmappedLabelPolicy,
}

impl QuantileMap {
    pub const DECILES_TO_QUINTILES: &'static str = "deciles-to-quintiles/1";

    /// Builds a map from (fine, coarse) pairs.
    ///
    /// The coarse categories are ordered by their first appearance in `pairs`.
    pub fn new(
        version: &str,
        pairs: &[(String, String)],
        passthrough: &[String],
        unmapped: UnmappedLabelPolicy,
    ) -> ShareResult<QuantileMap> {
        let mut fine_to_coarse: BTreeMap<String, String> = BTreeMap::new();
        let mut categories: Vec<String> = Vec::new();
        for (fine, coarse) in pairs.iter() {
            if let Some(previous) = fine_to_coarse.insert(fine.clone(), coarse.clone()) {
                if previous != *coarse {
                    return InvalidQuantileMapSnafu {
                        version,
                        message: format!(
                            "label {:?} is mapped to both {:?} and {:?}",
                            fine, previous, coarse
                        ),
                    }
                    .fail();
                }
            }
            if !categories.contains(coarse) {
                categories.push(coarse.clone());
            }
        }
        let passthrough: BTreeSet<String> = passthrough.iter().cloned().collect();
        if let Some(both) = passthrough.iter().find(|l| fine_to_coarse.contains_key(*l)) {
            return InvalidQuantileMapSnafu {
                version,
                message: format!("label {:?} is both remapped and passed through", both),
            }
            .fail();
        }
        if categories.is_empty() {
            return InvalidQuantileMapSnafu {
                version,
                message: "no fine label declared".to_string(),
            }
            .fail();
        }
        Ok(QuantileMap {
            version: version.to_string(),
            fine_to_coarse,
            categories,
            passthrough,
            unmapped,
        })
    }

    /// The decile to quintile mapping used by the income and consumption tables.
    pub fn deciles_to_quintiles() -> QuantileMap {
        let pairs: Vec<(String, String)> = (0..10)
            .map(|d| {
                let q = d / 2;
                (
                    format!("{}-{}%", d * 10, (d + 1) * 10),
                    format!("{}-{}%", q * 20, (q + 1) * 20),
                )
            })
            .collect();
        let passthrough = vec![
            TOP_1.to_string(),
            TOP_5.to_string(),
            TOTAL_BILLIONS.to_string(),
        ];
        QuantileMap {
            version: QuantileMap::DECILES_TO_QUINTILES.to_string(),
            categories: (0..5)
                .map(|q| format!("{}-{}%", q * 20, (q + 1) * 20))
                .collect(),
            fine_to_coarse: pairs.into_iter().collect(),
            passthrough: passthrough.into_iter().collect(),
            unmapped: UnmappedLabelPolicy::Drop,
        }
    }

    pub fn with_policy(self, unmapped: UnmappedLabelPolicy) -> QuantileMap {
        QuantileMap { unmapped, ..self }
    }

    pub fn coarse(&self, fine: &str) -> Option<&str> {
        self.fine_to_coarse.get(fine).map(|s| s.as_str())
    }

    pub fn is_passthrough(&self, label: &str) -> bool {
        self.passthrough.contains(label)
    }

    pub fn is_fine(&self, label: &str) -> bool {
        self.fine_to_coarse.contains_key(label)
    }

    /// The coarse buckets, in presentation order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// The fine labels that are aggregated into `coarse`.
    pub fn fine_labels_of(&self, coarse: &str) -> Vec<&str> {
        self.fine_to_coarse
            .iter()
            .filter(|(_, c)| c.as_str() == coarse)
            .map(|(f, _)| f.as_str())
            .collect()
    }
}
