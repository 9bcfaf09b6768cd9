use log::{debug, warn};
use std::collections::BTreeMap;

use crate::config::*;

/// All the series values of one (year, bucket).
#[derive(PartialEq, Debug, Clone)]
pub struct MergedRow {
    pub year: i32,
    pub bucket: String,
    /// series name -> value. A series present with `None` is unknown.
    pub values: BTreeMap<String, Option<f64>>,
}

impl MergedRow {
    pub fn value(&self, series: &str) -> Option<f64> {
        self.values.get(series).copied().flatten()
    }
}

/// A ratio to compute on merged rows, as a percentage.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RatioSpec {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
}

/// Pivots the observations on (year, bucket) and joins the series.
///
/// The keys are those of the `base` series. For each of the `joined` series,
/// a key without a value is handled according to `policy`.
pub fn merge_series(
    rows: &[Observation],
    base: &str,
    joined: &[String],
    policy: MissingSeriesPolicy,
) -> Vec<MergedRow> {
    let mut pivot: BTreeMap<(i32, String), BTreeMap<String, Option<f64>>> = BTreeMap::new();
    for o in rows.iter() {
        let cols = pivot.entry((o.year, o.bucket.clone())).or_default();
        if cols.contains_key(&o.series.name) {
            warn!(
                "merge_series: year {} bucket {:?}: duplicate value for series {:?}, keeping the first one",
                o.year, o.bucket, o.series.name
            );
            continue;
        }
        cols.insert(o.series.name.clone(), o.value);
    }

    let mut res: Vec<MergedRow> = Vec::new();
    for ((year, bucket), cols) in pivot.into_iter() {
        let base_value = match cols.get(base) {
            Some(v) => *v,
            None => continue,
        };
        let mut values: BTreeMap<String, Option<f64>> = BTreeMap::new();
        values.insert(base.to_string(), base_value);
        let mut complete = true;
        for s in joined.iter() {
            match cols.get(s) {
                Some(v) => {
                    values.insert(s.clone(), *v);
                }
                None => {
                    complete = false;
                    values.insert(s.clone(), None);
                }
            }
        }
        if !complete && policy == MissingSeriesPolicy::Drop {
            debug!(
                "merge_series: year {} bucket {:?}: incomplete row dropped",
                year, bucket
            );
            continue;
        }
        res.push(MergedRow {
            year,
            bucket,
            values,
        });
    }
    res
}

/// `100 * numerator / denominator`.
///
/// A zero denominator gives exactly zero. An unknown input, or a result that
/// is not finite, gives an unknown ratio.
pub fn ratio_percent(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(_), Some(d)) if d == 0.0 => Some(0.0),
        (Some(n), Some(d)) => Some(100.0 * n / d).filter(|r| r.is_finite()),
        _ => None,
    }
}

/// Computes each ratio for each merged row, in row order then ratio order.
pub fn compute_ratios(rows: &[MergedRow], specs: &[RatioSpec]) -> Vec<RatioRecord> {
    let mut res: Vec<RatioRecord> = Vec::new();
    for r in rows.iter() {
        for spec in specs.iter() {
            res.push(RatioRecord {
                year: r.year,
                bucket: r.bucket.clone(),
                name: spec.name.clone(),
                percent: ratio_percent(r.value(&spec.numerator), r.value(&spec.denominator)),
            });
        }
    }
    res
}
