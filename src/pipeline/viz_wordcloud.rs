use quantile_shares::wordcloud::{layout_word_cloud, read_term_volumes, PlacedTerm};
use quantile_shares::Table;
use serde_json::json;
use serde_json::Map as JSMap;

use crate::pipeline::{io_common::read_table, *};

fn placed_to_json(p: &PlacedTerm) -> JSValue {
    json!({
        "term": p.term,
        "size": p.size,
        "x": p.x,
        "y": p.y,
        "color": p.color.to_string(),
    })
}

fn literacy_to_json(table: &Table, c: &LiteracyConfig) -> PipelineResult<Vec<JSValue>> {
    let gen_col = c.generation_column();
    let score_col = c.score_column();
    let gen_idx = table
        .column_index(&gen_col)
        .context(SharesSnafu { stage: "literacy" })?;
    let score_idx = table
        .column_index(&score_col)
        .context(SharesSnafu { stage: "literacy" })?;
    let mut res: Vec<JSValue> = Vec::new();
    for row in table.rows() {
        let generation = match row[gen_idx].label() {
            Some(g) => g,
            None => continue,
        };
        let score = row[score_idx].number();
        if score.is_none() {
            warn!("literacy_to_json: generation {:?}: no numeric score, using null", generation);
        }
        let mut obj: JSMap<String, JSValue> = JSMap::new();
        obj.insert(gen_col.clone(), json!(generation));
        obj.insert(score_col.clone(), json!(score));
        res.push(JSValue::Object(obj));
    }
    Ok(res)
}

/// `{wordCloud: {years, data: {year: [term]}}, literacy: [..]}`
pub fn build(root_p: &Path, c: &WordCloudConfig) -> PipelineResult<Fixture> {
    let params = c.params()?;
    let table = read_table(root_p, &c.source)?;
    let terms = read_term_volumes(&table, &c.year_column(), &c.term_column(), &c.volume_column())
        .context(SharesSnafu { stage: "word cloud" })?;
    let layout = layout_word_cloud(&terms, &params);

    let years: Vec<i32> = layout.keys().cloned().collect();
    let mut data: JSMap<String, JSValue> = JSMap::new();
    for (year, placed) in layout.iter() {
        data.insert(
            year.to_string(),
            JSValue::Array(placed.iter().map(placed_to_json).collect()),
        );
    }

    let literacy: Vec<JSValue> = match &c.literacy {
        Some(l) => {
            let t = read_table(root_p, &l.source)?;
            literacy_to_json(&t, l)?
        }
        None => {
            info!("build: no literacy source, the literacy list is empty");
            vec![]
        }
    };

    Ok(Fixture {
        file_name: c.output_file(),
        content: json!({
            "wordCloud": {"years": years, "data": data},
            "literacy": literacy,
        }),
    })
}
