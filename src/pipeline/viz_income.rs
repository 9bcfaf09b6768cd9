use quantile_shares::merge::{compute_ratios, merge_series, MergedRow};
use quantile_shares::reshape::*;
use quantile_shares::sankey::{income_flows, FlowBreakdown, FlowSpec, SankeyGraph};
use quantile_shares::*;
use serde_json::json;
use serde_json::Map as JSMap;

use crate::pipeline::{io_common::read_table, *};

/// Shares of the fine quantiles may add up to slightly less or more than 1.
const SHARE_TOLERANCE: f64 = 1e-3;

fn shares_stage(msg: &str) -> SharesSnafu<String> {
    SharesSnafu {
        stage: format!("income breakdown: {}", msg),
    }
}

/// Absolute values per coarse bucket of the income, consumption and saving
/// series, plus the consumption subcategories when configured.
fn read_observations(
    root_p: &Path,
    c: &IncomeBreakdownConfig,
    map: &QuantileMap,
) -> PipelineResult<Vec<Observation>> {
    let (first, last) = c.year_range()?;
    let in_range = |o: &Observation| o.year >= first && o.year <= last;

    let shares_table = read_table(root_p, &c.shares)?;
    let layout = ShareLayout {
        year_column: c.year_column(),
        label_column: c.quantile_column(),
        value_column: c.value_column(),
        total_label: c.total_label(),
    };
    let series = vec![
        Series::new(&c.income_series(), SeriesKind::Income),
        Series::new(&c.consumption_series(), SeriesKind::Consumption),
        Series::new(&c.saving_series(), SeriesKind::Saving),
    ];
    let mut raw: Vec<Observation> = Vec::new();
    for s in series.iter() {
        let predicates = vec![
            RowPredicate::equals(&c.ranking_column(), &c.ranking()),
            RowPredicate::equals(&c.series_column(), &s.name),
        ];
        let rows = read_share_series(&shares_table, &predicates, &layout, s)
            .context(shares_stage("shares table"))?;
        if rows.is_empty() {
            warn!(
                "read_observations: no row for series {:?} with ranking {:?}",
                s.name,
                c.ranking()
            );
        }
        raw.extend(rows.into_iter().filter(|o| in_range(o)));
    }

    for gap in share_coverage(&raw, map, SHARE_TOLERANCE) {
        warn!(
            "read_observations: series {:?} year {}: fine shares sum to {}",
            gap.series, gap.year, gap.share_sum
        );
    }
    let scaled = scale_by_total(&raw, &layout.total_label).context(shares_stage("totals"))?;
    let mut absolute: Vec<Observation> = scaled.rows;

    if let Some(pce) = &c.consumption {
        let pce_table = read_table(root_p, &pce.source)?;
        let wide = WideLayout {
            year_column: pce.year_column(),
            key_column: pce.title_column(),
            total_column: pce.total_column(),
            share_columns: pce.decile_columns()?,
        };
        let subcategories: Vec<(String, Series)> = pce
            .subcategories
            .iter()
            .map(|s| {
                (
                    s.title.clone(),
                    Series::new(&s.name, SeriesKind::ConsumptionSubcategory),
                )
            })
            .collect();
        let melted = melt_wide_shares(&pce_table, &wide, &subcategories)
            .context(shares_stage("consumption table"))?;
        for s in subcategories.iter() {
            if !melted.iter().any(|o| o.series == s.1) {
                warn!(
                    "read_observations: no row titled {:?} in the consumption table",
                    s.0
                );
            }
        }
        absolute.extend(melted.into_iter().filter(|o| in_range(o)));
    }

    let remapped = remap_quantiles(&absolute, map).context(shares_stage("quantile remapping"))?;
    Ok(remapped
        .into_iter()
        .filter(|o| map.categories().contains(&o.bucket))
        .collect())
}

fn yearly_json(
    rows: &[MergedRow],
    ratios: &[RatioRecord],
    categories: &[String],
    series_types: &[String],
    ratio_names: &[String],
) -> JSValue {
    let mut income: JSMap<String, JSValue> = JSMap::new();
    for s in series_types.iter() {
        let mut by_cat: JSMap<String, JSValue> = JSMap::new();
        for cat in categories.iter() {
            let v = rows.iter().find(|r| r.bucket == *cat).and_then(|r| r.value(s));
            by_cat.insert(cat.clone(), json!(v));
        }
        income.insert(s.clone(), JSValue::Object(by_cat));
    }
    let mut ratios_js: JSMap<String, JSValue> = JSMap::new();
    for cat in categories.iter() {
        let mut by_name: JSMap<String, JSValue> = JSMap::new();
        for name in ratio_names.iter() {
            let v = ratios
                .iter()
                .find(|r| r.bucket == *cat && r.name == *name)
                .and_then(|r| r.percent);
            by_name.insert(name.clone(), json!(v));
        }
        ratios_js.insert(cat.clone(), JSValue::Object(by_name));
    }
    json!({"income": income, "ratios": ratios_js})
}

fn sankey_json(graph: &SankeyGraph, year: i32) -> JSValue {
    let links: Vec<JSValue> = graph
        .links
        .iter()
        .map(|l| json!([l.source, l.target, l.value]))
        .collect();
    json!({"year": year, "nodes": graph.nodes, "links": links})
}

/// The income breakdown fixture, and the Sankey fixture when configured.
pub fn build(
    root_p: &Path,
    c: &IncomeBreakdownConfig,
    map: &QuantileMap,
) -> PipelineResult<Vec<Fixture>> {
    let policy = validate_missing_series(&c.missing_series)?;
    let observations = read_observations(root_p, c, map)?;

    let income = c.income_series();
    let series_types = vec![income.clone(), c.consumption_series(), c.saving_series()];
    let mut joined: Vec<String> = series_types[1..].to_vec();
    if let Some(pce) = &c.consumption {
        joined.extend(pce.subcategories.iter().map(|s| s.name.clone()));
    }
    let merged = merge_series(&observations, &income, &joined, policy);
    let specs = c.ratio_specs();
    let ratios = compute_ratios(&merged, &specs);
    let ratio_names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
    let categories: Vec<String> = map.categories().to_vec();

    let mut years: Vec<i32> = merged.iter().map(|r| r.year).collect();
    years.dedup();
    let mut yearly: JSMap<String, JSValue> = JSMap::new();
    for year in years.iter() {
        let rows: Vec<MergedRow> = merged.iter().filter(|r| r.year == *year).cloned().collect();
        let year_ratios: Vec<RatioRecord> =
            ratios.iter().filter(|r| r.year == *year).cloned().collect();
        yearly.insert(
            year.to_string(),
            yearly_json(&rows, &year_ratios, &categories, &series_types, &ratio_names),
        );
    }
    info!(
        "build: income breakdown over {} years, {} ratios",
        years.len(),
        ratios.len()
    );

    let mut res = vec![Fixture {
        file_name: c.output_file(),
        content: json!({
            "years": years,
            "categories": categories,
            "seriesTypes": series_types,
            "yearlyData": yearly,
        }),
    }];

    if let Some(sc) = &c.sankey {
        let breakdown = match (sc.breakdown.unwrap_or(false), &c.consumption) {
            (false, _) => None,
            (true, Some(pce)) => Some(FlowBreakdown {
                parent: c.consumption_series(),
                children: pce.subcategories.iter().map(|s| s.name.clone()).collect(),
            }),
            (true, None) => whatever!("the Sankey breakdown needs a consumption table"),
        };
        if !years.contains(&sc.year) {
            warn!("build: no income data for the Sankey year {}", sc.year);
        }
        let spec = FlowSpec {
            year: sc.year,
            categories: categories.clone(),
            outflows: series_types[1..].to_vec(),
            breakdown,
        };
        let graph = income_flows(&merged, &spec);
        res.push(Fixture {
            file_name: sc.output_file(),
            content: sankey_json(&graph, sc.year),
        });
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row(bucket: &str, values: &[(&str, Option<f64>)]) -> MergedRow {
        MergedRow {
            year: 2010,
            bucket: bucket.to_string(),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<String, Option<f64>>>(),
        }
    }

    #[test]
    fn missing_buckets_are_null() {
        let rows = vec![row("0-20%", &[("DPI", Some(10.0)), ("PCE", None)])];
        let ratios = vec![RatioRecord {
            year: 2010,
            bucket: "0-20%".to_string(),
            name: "Total Consumption Ratio".to_string(),
            percent: None,
        }];
        let cats = vec!["0-20%".to_string(), "20-40%".to_string()];
        let js = yearly_json(
            &rows,
            &ratios,
            &cats,
            &["DPI".to_string(), "PCE".to_string()],
            &["Total Consumption Ratio".to_string()],
        );
        assert_eq!(
            js,
            json!({
                "income": {
                    "DPI": {"0-20%": 10.0, "20-40%": null},
                    "PCE": {"0-20%": null, "20-40%": null},
                },
                "ratios": {
                    "0-20%": {"Total Consumption Ratio": null},
                    "20-40%": {"Total Consumption Ratio": null},
                }
            })
        );
    }

    #[test]
    fn sankey_links_are_index_triples() {
        let mut g = SankeyGraph::new();
        g.add_flow("0-20%", "PCE", Some(12.5));
        let js = sankey_json(&g, 2022);
        assert_eq!(
            js,
            json!({"year": 2022, "nodes": ["0-20%", "PCE"], "links": [[0, 1, 12.5]]})
        );
    }
}
