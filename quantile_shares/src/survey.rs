//! Summaries of a household wealth survey by wealth and income quintile.
//!
//! The survey is read in the layout of the Survey of Consumer Finances summary
//! extract: one row per household, categorical percentile columns, and a
//! sampling weight. Every figure is derived from the rows. When the data
//! needed for a figure is absent, the figure is `Metric::Unavailable`.

use log::{debug, info, warn};

use crate::config::*;
use crate::table::{coerce_number, Cell, Table};

/// A derived figure, or the explicit absence of one.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Metric {
    Measured(f64),
    Unavailable,
}

impl Metric {
    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Measured(v) => Some(*v),
            Metric::Unavailable => None,
        }
    }

    fn from_option(v: Option<f64>) -> Metric {
        match v {
            Some(x) if x.is_finite() => Metric::Measured(x),
            _ => Metric::Unavailable,
        }
    }
}

/// Column names of the survey table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SurveyColumns {
    /// Net worth percentile category, 1 to 12.
    pub wealth_percentile: String,
    /// Income quartile category, 1 to 4.
    pub income_quartile: String,
    /// Income percentile category. Values of 9 and above are the top 20%.
    pub income_percentile: String,
    pub net_worth: String,
    /// Candidates for the value of stock holdings, by order of preference.
    pub stocks: Vec<String>,
    pub weight: String,
    pub debt_to_income: String,
    pub literacy: String,
    pub emergency: Vec<String>,
}

impl Default for SurveyColumns {
    fn default() -> SurveyColumns {
        let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<String>>();
        SurveyColumns {
            wealth_percentile: "NWPCTLECAT".to_string(),
            income_quartile: "INCQRTCAT".to_string(),
            income_percentile: "INCPCTLECAT".to_string(),
            net_worth: "NETWORTH".to_string(),
            stocks: names(&["STOCKS", "STOCK", "STMUTF", "COMUTF", "NSTOCKS"]),
            weight: "WGT".to_string(),
            debt_to_income: "DEBT2INC".to_string(),
            literacy: "FINLIT".to_string(),
            emergency: names(&["EMERGBORR", "EMERGSAV", "EMERGPSTP", "EMERGCUT"]),
        }
    }
}

/// One household of the survey.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Household {
    pub wealth_quintile: Option<u8>,
    pub income_quintile: Option<u8>,
    pub net_worth: Option<f64>,
    pub stocks: Option<f64>,
    pub weight: Option<f64>,
    pub debt_to_income: Option<f64>,
    pub literacy: Option<f64>,
    /// One entry per emergency column found in the table.
    pub emergency: Vec<Option<f64>>,
}

/// The households and the optional columns that were found.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Survey {
    pub households: Vec<Household>,
    pub stocks_column: Option<String>,
    pub weighted: bool,
    pub has_income_quintile: bool,
    pub has_debt: bool,
    pub has_literacy: bool,
    pub emergency_columns: Vec<String>,
}

pub const QUINTILES: [u8; 5] = [1, 2, 3, 4, 5];

/// Bins the 12 net worth percentile categories into quintiles.
///
/// The bins are (0, 2.4], (2.4, 4.8], (4.8, 7.2], (7.2, 9.6], (9.6, 13], and
/// 0 belongs to the first one.
pub fn wealth_quintile(category: f64) -> Option<u8> {
    const EDGES: [f64; 6] = [0.0, 2.4, 4.8, 7.2, 9.6, 13.0];
    if !(EDGES[0]..=EDGES[5]).contains(&category) {
        return None;
    }
    EDGES
        .windows(2)
        .position(|w| category <= w[1])
        .map(|idx| idx as u8 + 1)
}

/// Splits the income quartiles into quintiles with the percentile category.
///
/// When the table has no percentile column, the top quartile cannot be split
/// and has no quintile. A blank percentile in a table that has the column
/// keeps the top quartile in quintile 4.
pub fn income_quintile(
    quartile: Option<f64>,
    percentile: Option<f64>,
    has_percentile_column: bool,
) -> Option<u8> {
    if let Some(p) = percentile {
        if p >= 9.0 {
            return Some(5);
        }
    }
    let q = quartile?;
    match q as i64 {
        x @ 1..=3 if q.fract() == 0.0 => Some(x as u8),
        4 if q.fract() == 0.0 && has_percentile_column => Some(4),
        _ => None,
    }
}

pub fn read_households(table: &Table, columns: &SurveyColumns) -> ShareResult<Survey> {
    let wealth_idx = table.column_index(&columns.wealth_percentile)?;
    let quartile_idx = table.optional_column(&columns.income_quartile);
    let percentile_idx = table.optional_column(&columns.income_percentile);
    let net_worth_idx = table.optional_column(&columns.net_worth);
    let stocks_col = table.first_column_of(&columns.stocks);
    let weight_idx = table.optional_column(&columns.weight);
    let debt_idx = table.optional_column(&columns.debt_to_income);
    let literacy_idx = table.optional_column(&columns.literacy);
    let emergency_cols: Vec<(usize, String)> = columns
        .emergency
        .iter()
        .filter_map(|c| table.optional_column(c).map(|idx| (idx, c.clone())))
        .collect();

    if let Some((_, name)) = stocks_col {
        if Some(name) != columns.stocks.first().map(|s| s.as_str()) {
            info!("read_households: using column {:?} for stock holdings", name);
        }
    } else {
        warn!(
            "read_households: table {:?} has none of the stock columns {:?}",
            table.name(),
            columns.stocks
        );
    }
    if percentile_idx.is_none() && quartile_idx.is_some() {
        warn!(
            "read_households: column {:?} missing, the top income quartile has no quintile",
            columns.income_percentile
        );
    }

    let read = |lineno: usize, idx: Option<usize>, row: &[Cell]| -> Option<f64> {
        idx.and_then(|i| coerce_number(table, lineno, i, &row[i]))
    };

    let mut households: Vec<Household> = Vec::new();
    for (lineno, row) in table.rows().enumerate() {
        let wealth = coerce_number(table, lineno, wealth_idx, &row[wealth_idx]);
        let wealth_quintile = wealth.and_then(wealth_quintile);
        if wealth.is_some() && wealth_quintile.is_none() {
            debug!(
                "read_households: row {}: wealth category {:?} out of range",
                lineno, wealth
            );
        }
        let income_quintile = match quartile_idx {
            Some(_) => income_quintile(
                read(lineno, quartile_idx, row),
                read(lineno, percentile_idx, row),
                percentile_idx.is_some(),
            ),
            None => None,
        };
        households.push(Household {
            wealth_quintile,
            income_quintile,
            net_worth: read(lineno, net_worth_idx, row),
            stocks: read(lineno, stocks_col.map(|(i, _)| i), row),
            weight: read(lineno, weight_idx, row),
            debt_to_income: read(lineno, debt_idx, row),
            literacy: read(lineno, literacy_idx, row),
            emergency: emergency_cols
                .iter()
                .map(|(i, _)| read(lineno, Some(*i), row))
                .collect(),
        });
    }
    info!(
        "read_households: {} households read from {:?}",
        households.len(),
        table.name()
    );
    Ok(Survey {
        households,
        stocks_column: stocks_col.map(|(_, n)| n.to_string()),
        weighted: weight_idx.is_some(),
        has_income_quintile: quartile_idx.is_some(),
        has_debt: debt_idx.is_some(),
        has_literacy: literacy_idx.is_some(),
        emergency_columns: emergency_cols.into_iter().map(|(_, n)| n).collect(),
    })
}

/// The weighted median.
///
/// Values are sorted, and the result is the first value whose cumulative
/// weight reaches half of the total weight, or the last value.
pub fn weighted_median(values: &[(f64, f64)]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted: Vec<(f64, f64)> = values.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
    let total: f64 = sorted.iter().map(|(_, w)| w).sum();
    let half = total / 2.0;
    let mut cumulative = 0.0;
    for (v, w) in sorted.iter() {
        cumulative += w;
        if cumulative >= half {
            return Some(*v);
        }
    }
    sorted.last().map(|(v, _)| *v)
}

/// The median, averaging the two middle values of an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Rounds to whole dollars and groups the thousands: `1234567.8` gives
/// `1,234,568`.
pub fn format_dollars(amount: f64) -> String {
    let rounded = format!("{:.0}", amount);
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(d) => ("-", d),
        None => ("", rounded.as_str()),
    };
    let mut grouped = String::new();
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if grouped == "0" {
        return grouped;
    }
    format!("{}{}", sign, grouped)
}

/// The presentation of one wealth quintile.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuintileDefinition {
    pub index: u8,
    pub label: String,
    pub description: String,
    /// Shown when the survey has no household in the quintile.
    pub range: String,
}

impl QuintileDefinition {
    pub fn defaults() -> Vec<QuintileDefinition> {
        let def = |index: u8, label: &str, description: &str, range: &str| QuintileDefinition {
            index,
            label: label.to_string(),
            description: description.to_string(),
            range: range.to_string(),
        };
        vec![
            def(1, "Bottom 20%", "Bottom 20% of households", "< $0 (Negative net worth)"),
            def(2, "Lower-Middle 20%", "20-40th percentile", "$0 - $50,000"),
            def(3, "Middle 20%", "40-60th percentile", "$50,000 - $150,000"),
            def(4, "Upper-Middle 20%", "60-80th percentile", "$150,000 - $500,000"),
            def(5, "Top 20%", "Top 20% of households", "> $500,000"),
        ]
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct QuintileSummary {
    pub definition: QuintileDefinition,
    pub range: String,
    pub median_net_worth: Option<f64>,
}

/// The observed net worth range and median of each wealth quintile.
pub fn summarize_quintiles(survey: &Survey, definitions: &[QuintileDefinition]) -> Vec<QuintileSummary> {
    let last = definitions.iter().map(|d| d.index).max().unwrap_or(0);
    definitions
        .iter()
        .map(|d| {
            let worth: Vec<f64> = survey
                .households
                .iter()
                .filter(|h| h.wealth_quintile == Some(d.index))
                .filter_map(|h| h.net_worth)
                .collect();
            let min = worth.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = worth.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let range = if worth.is_empty() {
                d.range.clone()
            } else if d.index == 1 {
                if min < 0.0 {
                    format!("Negative to ${}", format_dollars(max))
                } else {
                    format!("Up to ${}", format_dollars(max))
                }
            } else if d.index == last {
                format!("${} and above", format_dollars(min))
            } else {
                format!("${} to ${}", format_dollars(min), format_dollars(max))
            };
            QuintileSummary {
                definition: d.clone(),
                range,
                median_net_worth: median(&worth),
            }
        })
        .collect()
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum QuintileBasis {
    Wealth,
    Income,
}

#[derive(PartialEq, Debug, Clone)]
pub struct StockOwnership {
    pub quintile: u8,
    /// Percentage of households holding stocks.
    pub ownership: Metric,
    /// Median holding of the owners.
    pub median_value: Metric,
}

/// Stock ownership per quintile.
///
/// Households with an unknown holding or weight are left out. An empty
/// quintile has unavailable figures. A quintile without owners has a median
/// holding of 0.
pub fn stock_ownership(survey: &Survey, basis: QuintileBasis) -> Vec<StockOwnership> {
    let unavailable = |q: u8| StockOwnership {
        quintile: q,
        ownership: Metric::Unavailable,
        median_value: Metric::Unavailable,
    };
    let basis_known = match basis {
        QuintileBasis::Wealth => true,
        QuintileBasis::Income => survey.has_income_quintile,
    };
    if survey.stocks_column.is_none() || !basis_known {
        return QUINTILES.iter().map(|q| unavailable(*q)).collect();
    }

    QUINTILES
        .iter()
        .map(|q| {
            // (holding, weight)
            let group: Vec<(f64, f64)> = survey
                .households
                .iter()
                .filter(|h| {
                    let hq = match basis {
                        QuintileBasis::Wealth => h.wealth_quintile,
                        QuintileBasis::Income => h.income_quintile,
                    };
                    hq == Some(*q)
                })
                .filter_map(|h| {
                    let w = if survey.weighted { h.weight? } else { 1.0 };
                    h.stocks.map(|s| (s, w))
                })
                .collect();
            let total: f64 = group.iter().map(|(_, w)| w).sum();
            if group.is_empty() || total <= 0.0 {
                return unavailable(*q);
            }
            let owners: Vec<(f64, f64)> = group.iter().cloned().filter(|(s, _)| *s > 0.0).collect();
            let owned: f64 = owners.iter().map(|(_, w)| w).sum();
            StockOwnership {
                quintile: *q,
                ownership: Metric::Measured(100.0 * owned / total),
                median_value: Metric::Measured(weighted_median(&owners).unwrap_or(0.0)),
            }
        })
        .collect()
}

#[derive(PartialEq, Debug, Clone)]
pub struct WealthBarriers {
    pub quintile: u8,
    /// Median debt-to-income ratio, as a percentage capped at 100.
    pub debt_to_income: Metric,
    /// No column of the survey measures it.
    pub investment_access: Metric,
    pub financial_literacy: Metric,
    pub emergency_expenses: Metric,
}

/// Quintiles with this many households or fewer are not summarized.
pub const MIN_BARRIER_GROUP: usize = 10;

pub fn wealth_barriers(survey: &Survey) -> Vec<WealthBarriers> {
    QUINTILES
        .iter()
        .map(|q| {
            let group: Vec<&Household> = survey
                .households
                .iter()
                .filter(|h| h.wealth_quintile == Some(*q))
                .collect();
            let mut res = WealthBarriers {
                quintile: *q,
                debt_to_income: Metric::Unavailable,
                investment_access: Metric::Unavailable,
                financial_literacy: Metric::Unavailable,
                emergency_expenses: Metric::Unavailable,
            };
            if group.len() <= MIN_BARRIER_GROUP {
                debug!(
                    "wealth_barriers: quintile {} has {} households, skipped",
                    q,
                    group.len()
                );
                return res;
            }
            if survey.has_debt {
                let debt: Vec<f64> = group.iter().filter_map(|h| h.debt_to_income).collect();
                res.debt_to_income = Metric::from_option(median(&debt).map(|m| (m * 100.0).min(100.0)));
            }
            if survey.has_literacy {
                let lit: Vec<f64> = group.iter().filter_map(|h| h.literacy).collect();
                res.financial_literacy = Metric::from_option(mean(&lit).map(|m| m * 100.0));
            }
            if !survey.emergency_columns.is_empty() {
                let per_row: Vec<f64> = group
                    .iter()
                    .filter_map(|h| {
                        let known: Vec<f64> = h.emergency.iter().filter_map(|v| *v).collect();
                        mean(&known)
                    })
                    .collect();
                res.emergency_expenses = Metric::from_option(mean(&per_row).map(|m| m * 100.0));
            }
            res
        })
        .collect()
}
