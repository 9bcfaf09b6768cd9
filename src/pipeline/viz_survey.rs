use quantile_shares::survey::*;
use serde_json::json;

use crate::pipeline::{io_common::read_table, *};

/// `{"value": x, "available": true}` or `{"value": null, "available": false}`.
fn metric_json(m: &Metric) -> JSValue {
    match m {
        Metric::Measured(v) => json!({"value": v, "available": true}),
        Metric::Unavailable => json!({"value": null, "available": false}),
    }
}

fn quintile_json(q: &QuintileSummary) -> JSValue {
    json!({
        "index": q.definition.index,
        "label": q.definition.label,
        "description": q.definition.description,
        "range": q.range,
        "medianNetWorth": q.median_net_worth,
    })
}

fn ownership_json(rows: &[StockOwnership]) -> Vec<JSValue> {
    rows.iter()
        .map(|s| {
            json!({
                "quintile": s.quintile,
                "ownership": metric_json(&s.ownership),
                "medianValue": metric_json(&s.median_value),
            })
        })
        .collect()
}

fn barriers_json(b: &WealthBarriers) -> JSValue {
    json!({
        "quintile": b.quintile,
        "debtToIncome": metric_json(&b.debt_to_income),
        "investmentAccess": metric_json(&b.investment_access),
        "financialLiteracy": metric_json(&b.financial_literacy),
        "emergencyExpenses": metric_json(&b.emergency_expenses),
    })
}

/// `{wealthQuintiles, stockOwnership: {byWealth, byIncome}, wealthBarriers}`
pub fn build(root_p: &Path, c: &WealthSurveyConfig) -> PipelineResult<Fixture> {
    let definitions = c.quintiles()?;
    let table = read_table(root_p, &c.source)?;
    let survey = read_households(&table, &c.columns()).context(SharesSnafu {
        stage: "wealth survey",
    })?;

    let quintiles: Vec<JSValue> = summarize_quintiles(&survey, &definitions)
        .iter()
        .map(quintile_json)
        .collect();
    let by_wealth = ownership_json(&stock_ownership(&survey, QuintileBasis::Wealth));
    let by_income = ownership_json(&stock_ownership(&survey, QuintileBasis::Income));
    let barriers: Vec<JSValue> = wealth_barriers(&survey).iter().map(barriers_json).collect();
    info!(
        "build: wealth survey summarized over {} households",
        survey.households.len()
    );

    Ok(Fixture {
        file_name: c.output_file(),
        content: json!({
            "wealthQuintiles": quintiles,
            "stockOwnership": {"byWealth": by_wealth, "byIncome": by_income},
            "wealthBarriers": barriers,
        }),
    })
}
