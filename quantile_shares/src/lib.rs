mod config;
mod table;

pub mod builder;
pub mod manual;
pub mod merge;
pub mod reshape;
pub mod sankey;
pub mod survey;
pub mod wordcloud;

use log::{debug, info, warn};

use std::collections::{BTreeMap, BTreeSet};

pub use crate::config::*;
pub use crate::table::{Cell, Table};

/// Replaces fine quantile labels with their coarse bucket and sums the values
/// that land in the same (year, bucket, series).
///
/// Rows whose label is a passthrough label of the map are kept unchanged. The
/// other rows are handled according to the policy of the map.
///
/// A coarse value is unknown as soon as one of the values it aggregates is
/// unknown.
///
/// The result is sorted by (year, bucket, series).
pub fn remap_quantiles(rows: &[Observation], map: &QuantileMap) -> ShareResult<Vec<Observation>> {
    info!(
        "Remapping {:?} rows with quantile map {}",
        rows.len(),
        map.version
    );

    let mut aggregated: BTreeMap<(i32, String, Series), Option<f64>> = BTreeMap::new();
    let mut passthrough: Vec<Observation> = Vec::new();
    let mut dropped: BTreeSet<String> = BTreeSet::new();

    for o in rows.iter() {
        if map.is_passthrough(&o.bucket) {
            passthrough.push(o.clone());
            continue;
        }
        let coarse = match map.coarse(&o.bucket) {
            Some(c) => c,
            None => match map.unmapped {
                UnmappedLabelPolicy::Drop => {
                    dropped.insert(o.bucket.clone());
                    continue;
                }
                UnmappedLabelPolicy::Fail => {
                    return UnmappedLabelSnafu {
                        label: o.bucket.clone(),
                        version: map.version.clone(),
                    }
                    .fail();
                }
            },
        };
        let key = (o.year, coarse.to_string(), o.series.clone());
        let acc = aggregated.entry(key).or_insert(Some(0.0));
        *acc = match (*acc, o.value) {
            (Some(a), Some(v)) => Some(a + v),
            _ => None,
        };
    }

    if !dropped.is_empty() {
        warn!(
            "remap_quantiles: labels not covered by quantile map {}, rows dropped: {:?}",
            map.version, dropped
        );
    }

    let mut res: Vec<Observation> = aggregated
        .into_iter()
        .map(|((year, bucket, series), value)| Observation {
            year,
            series,
            bucket,
            value,
        })
        .collect();
    debug!(
        "remap_quantiles: {:?} aggregated rows, {:?} passthrough rows",
        res.len(),
        passthrough.len()
    );
    res.extend(passthrough);
    sort_observations(&mut res);
    Ok(res)
}

/// Sorts by (year, bucket, series). The sort is stable.
pub fn sort_observations(rows: &mut [Observation]) {
    rows.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| a.bucket.cmp(&b.bucket))
            .then_with(|| a.series.cmp(&b.series))
    });
}
