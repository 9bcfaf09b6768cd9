use crate::pipeline::*;

use quantile_shares::merge::RatioSpec;
use quantile_shares::survey::{QuintileDefinition, SurveyColumns};
use quantile_shares::wordcloud::{Rgb, WordCloudParams};
use quantile_shares::{MissingSeriesPolicy, QuantileMap, UnmappedLabelPolicy, TOTAL_BILLIONS};

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

/// Where a table comes from.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    /// `xlsx` or `csv`.
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "worksheetName")]
    pub worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuantileMapConfig {
    pub version: String,
    /// (fine label, coarse label)
    pub pairs: Vec<(String, String)>,
    pub passthrough: Option<Vec<String>>,
    #[serde(rename = "unmappedLabels")]
    pub unmapped_labels: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LiteracyConfig {
    pub source: FileSource,
    #[serde(rename = "generationColumn")]
    pub generation_column: Option<String>,
    #[serde(rename = "scoreColumn")]
    pub score_column: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct WordCloudConfig {
    pub source: FileSource,
    #[serde(rename = "yearColumn")]
    pub year_column: Option<String>,
    #[serde(rename = "termColumn")]
    pub term_column: Option<String>,
    #[serde(rename = "volumeColumn")]
    pub volume_column: Option<String>,
    #[serde(rename = "topK")]
    pub top_k: Option<usize>,
    #[serde(rename = "sizeScale")]
    pub size_scale: Option<f64>,
    #[serde(rename = "minSize")]
    pub min_size: Option<i64>,
    #[serde(rename = "lowColor")]
    pub low_color: Option<[u8; 3]>,
    #[serde(rename = "highColor")]
    pub high_color: Option<[u8; 3]>,
    pub literacy: Option<LiteracyConfig>,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
}

/// A subcategory row of the consumption table.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SubcategoryConfig {
    /// The value of the title column.
    pub title: String,
    /// The name used in the output.
    pub name: String,
    #[serde(rename = "ratioName")]
    pub ratio_name: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionTableConfig {
    pub source: FileSource,
    #[serde(rename = "yearColumn")]
    pub year_column: Option<String>,
    #[serde(rename = "titleColumn")]
    pub title_column: Option<String>,
    #[serde(rename = "totalColumn")]
    pub total_column: Option<String>,
    /// One column per decile, from the bottom one.
    #[serde(rename = "decileColumns")]
    pub decile_columns: Option<Vec<String>>,
    pub subcategories: Vec<SubcategoryConfig>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SankeyConfig {
    pub year: i32,
    /// Splits consumption into the subcategories of the consumption table.
    pub breakdown: Option<bool>,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct IncomeBreakdownConfig {
    pub shares: FileSource,
    #[serde(rename = "yearColumn")]
    pub year_column: Option<String>,
    #[serde(rename = "rankingColumn")]
    pub ranking_column: Option<String>,
    pub ranking: Option<String>,
    #[serde(rename = "seriesColumn")]
    pub series_column: Option<String>,
    #[serde(rename = "quantileColumn")]
    pub quantile_column: Option<String>,
    #[serde(rename = "valueColumn")]
    pub value_column: Option<String>,
    #[serde(rename = "totalLabel")]
    pub total_label: Option<String>,
    #[serde(rename = "incomeSeries")]
    pub income_series: Option<String>,
    #[serde(rename = "consumptionSeries")]
    pub consumption_series: Option<String>,
    #[serde(rename = "savingSeries")]
    pub saving_series: Option<String>,
    #[serde(rename = "firstYear")]
    pub first_year: Option<i32>,
    #[serde(rename = "lastYear")]
    pub last_year: Option<i32>,
    /// `null` or `drop`.
    #[serde(rename = "missingSeries")]
    pub missing_series: Option<String>,
    pub consumption: Option<ConsumptionTableConfig>,
    pub sankey: Option<SankeyConfig>,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuintileConfig {
    pub label: String,
    pub description: String,
    pub range: String,
}

/// Overrides of the survey column names.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyColumnsConfig {
    #[serde(rename = "wealthPercentile")]
    pub wealth_percentile: Option<String>,
    #[serde(rename = "incomeQuartile")]
    pub income_quartile: Option<String>,
    #[serde(rename = "incomePercentile")]
    pub income_percentile: Option<String>,
    #[serde(rename = "netWorth")]
    pub net_worth: Option<String>,
    /// Tried in order, the first one present is used.
    pub stocks: Option<Vec<String>>,
    pub weight: Option<String>,
    #[serde(rename = "debtToIncome")]
    pub debt_to_income: Option<String>,
    pub literacy: Option<String>,
    pub emergency: Option<Vec<String>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct WealthSurveyConfig {
    pub source: FileSource,
    pub columns: Option<SurveyColumnsConfig>,
    pub quintiles: Option<Vec<QuintileConfig>>,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
    #[serde(rename = "quantileMap")]
    pub quantile_map: Option<QuantileMapConfig>,
    #[serde(rename = "wordCloud")]
    pub word_cloud: Option<WordCloudConfig>,
    #[serde(rename = "incomeBreakdown")]
    pub income_breakdown: Option<IncomeBreakdownConfig>,
    #[serde(rename = "wealthSurvey")]
    pub wealth_survey: Option<WealthSurveyConfig>,
}

pub fn read_config(path: &Path) -> PipelineResult<PipelineConfig> {
    let path_s = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path: path_s.clone() })?;
    let config: PipelineConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path: path_s })?;
    debug!("read_config: {:?}", config);
    if config.word_cloud.is_none()
        && config.income_breakdown.is_none()
        && config.wealth_survey.is_none()
    {
        whatever!("the configuration does not describe any visualization");
    }
    Ok(config)
}

pub fn validate_quantile_map(c: &Option<QuantileMapConfig>) -> PipelineResult<QuantileMap> {
    let c = match c {
        Some(x) => x,
        None => return Ok(QuantileMap::deciles_to_quintiles()),
    };
    let unmapped = match c.unmapped_labels.as_deref() {
        None | Some("drop") => UnmappedLabelPolicy::Drop,
        Some("fail") => UnmappedLabelPolicy::Fail,
        Some(x) => whatever!("unknown policy for unmapped labels: {:?}", x),
    };
    let passthrough = c.passthrough.clone().unwrap_or_default();
    QuantileMap::new(&c.version, &c.pairs, &passthrough, unmapped).context(SharesSnafu {
        stage: "quantile map",
    })
}

pub fn validate_missing_series(s: &Option<String>) -> PipelineResult<MissingSeriesPolicy> {
    match s.as_deref() {
        None | Some("null") => Ok(MissingSeriesPolicy::Null),
        Some("drop") => Ok(MissingSeriesPolicy::Drop),
        Some(x) => whatever!("unknown policy for missing series: {:?}", x),
    }
}

fn or_default(s: &Option<String>, default: &str) -> String {
    s.clone().unwrap_or_else(|| default.to_string())
}

impl WordCloudConfig {
    pub fn params(&self) -> PipelineResult<WordCloudParams> {
        let d = WordCloudParams::DEFAULT_PARAMS;
        let rgb = |c: Option<[u8; 3]>, default: Rgb| c.map(|[r, g, b]| Rgb(r, g, b)).unwrap_or(default);
        let res = WordCloudParams {
            top_k: self.top_k.unwrap_or(d.top_k),
            size_scale: self.size_scale.unwrap_or(d.size_scale),
            min_size: self.min_size.unwrap_or(d.min_size),
            low_color: rgb(self.low_color, d.low_color),
            high_color: rgb(self.high_color, d.high_color),
        };
        if res.top_k == 0 {
            whatever!("topK must be at least 1");
        }
        if !res.size_scale.is_finite() {
            whatever!("sizeScale must be a finite number");
        }
        Ok(res)
    }

    pub fn year_column(&self) -> String {
        or_default(&self.year_column, "year")
    }

    pub fn term_column(&self) -> String {
        or_default(&self.term_column, "term")
    }

    pub fn volume_column(&self) -> String {
        or_default(&self.volume_column, "search_volume")
    }

    pub fn output_file(&self) -> String {
        or_default(&self.output_file, "viz1_data.json")
    }
}

impl LiteracyConfig {
    pub fn generation_column(&self) -> String {
        or_default(&self.generation_column, "Generation")
    }

    pub fn score_column(&self) -> String {
        or_default(&self.score_column, "FinancialLiteracyScore")
    }
}

impl IncomeBreakdownConfig {
    pub fn year_column(&self) -> String {
        or_default(&self.year_column, "Year")
    }

    pub fn ranking_column(&self) -> String {
        or_default(&self.ranking_column, "Ranking")
    }

    pub fn ranking(&self) -> String {
        or_default(&self.ranking, "Equivalized Disposable Personal Income")
    }

    pub fn series_column(&self) -> String {
        or_default(&self.series_column, "Series")
    }

    pub fn quantile_column(&self) -> String {
        or_default(&self.quantile_column, "Quantile or Summary Metric")
    }

    pub fn value_column(&self) -> String {
        or_default(&self.value_column, "Value")
    }

    pub fn total_label(&self) -> String {
        or_default(&self.total_label, TOTAL_BILLIONS)
    }

    pub fn income_series(&self) -> String {
        or_default(&self.income_series, "Disposable Personal Income")
    }

    pub fn consumption_series(&self) -> String {
        or_default(&self.consumption_series, "Personal Consumption Expenditures")
    }

    pub fn saving_series(&self) -> String {
        or_default(&self.saving_series, "Personal Saving")
    }

    pub fn output_file(&self) -> String {
        or_default(&self.output_file, "viz2_data.json")
    }

    /// The inclusive range of years to keep.
    pub fn year_range(&self) -> PipelineResult<(i32, i32)> {
        let first = self.first_year.unwrap_or(i32::MIN);
        let last = self.last_year.unwrap_or(i32::MAX);
        if first > last {
            whatever!("firstYear {} is after lastYear {}", first, last);
        }
        Ok((first, last))
    }

    /// The total consumption ratio, then one ratio per subcategory.
    pub fn ratio_specs(&self) -> Vec<RatioSpec> {
        let income = self.income_series();
        let mut res = vec![RatioSpec {
            name: "Total Consumption Ratio".to_string(),
            numerator: self.consumption_series(),
            denominator: income.clone(),
        }];
        if let Some(c) = &self.consumption {
            for sub in c.subcategories.iter() {
                res.push(RatioSpec {
                    name: sub.ratio_name.clone(),
                    numerator: sub.name.clone(),
                    denominator: income.clone(),
                });
            }
        }
        res
    }
}

impl ConsumptionTableConfig {
    pub fn year_column(&self) -> String {
        or_default(&self.year_column, "year")
    }

    pub fn title_column(&self) -> String {
        or_default(&self.title_column, "pce_title")
    }

    pub fn total_column(&self) -> String {
        or_default(&self.total_column, "Total")
    }

    /// The decile columns, paired with the decile labels of the share tables.
    pub fn decile_columns(&self) -> PipelineResult<Vec<(String, String)>> {
        let cols: Vec<String> = match &self.decile_columns {
            Some(c) => c.clone(),
            None => (1..=10).map(|d| format!("Decile{}", d)).collect(),
        };
        if cols.len() != 10 {
            whatever!("expected 10 decile columns, found {}", cols.len());
        }
        Ok(cols
            .into_iter()
            .enumerate()
            .map(|(d, c)| (c, format!("{}-{}%", d * 10, (d + 1) * 10)))
            .collect())
    }
}

impl SankeyConfig {
    pub fn output_file(&self) -> String {
        or_default(&self.output_file, "sankey_data.json")
    }
}

impl WealthSurveyConfig {
    pub fn output_file(&self) -> String {
        or_default(&self.output_file, "viz3_data.json")
    }

    pub fn columns(&self) -> SurveyColumns {
        let d = SurveyColumns::default();
        let c = match &self.columns {
            Some(c) => c,
            None => return d,
        };
        SurveyColumns {
            wealth_percentile: or_default(&c.wealth_percentile, &d.wealth_percentile),
            income_quartile: or_default(&c.income_quartile, &d.income_quartile),
            income_percentile: or_default(&c.income_percentile, &d.income_percentile),
            net_worth: or_default(&c.net_worth, &d.net_worth),
            stocks: c.stocks.clone().unwrap_or(d.stocks),
            weight: or_default(&c.weight, &d.weight),
            debt_to_income: or_default(&c.debt_to_income, &d.debt_to_income),
            literacy: or_default(&c.literacy, &d.literacy),
            emergency: c.emergency.clone().unwrap_or(d.emergency),
        }
    }

    pub fn quintiles(&self) -> PipelineResult<Vec<QuintileDefinition>> {
        match &self.quintiles {
            None => Ok(QuintileDefinition::defaults()),
            Some(qs) if qs.len() == 5 => Ok(qs
                .iter()
                .enumerate()
                .map(|(idx, q)| QuintileDefinition {
                    index: idx as u8 + 1,
                    label: q.label.clone(),
                    description: q.description.clone(),
                    range: q.range.clone(),
                })
                .collect()),
            Some(qs) => whatever!("expected 5 quintile definitions, found {}", qs.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_have_defaults() {
        let js = r#"{
            "incomeBreakdown": {
                "shares": {"provider": "xlsx", "filePath": "full_dataset.xlsx", "worksheetName": "shares of NIPA totals"},
                "firstYear": 2004,
                "lastYear": 2022
            }
        }"#;
        let config: PipelineConfig = serde_json::from_str(js).unwrap();
        let ib = config.income_breakdown.unwrap();
        assert_eq!(ib.quantile_column(), "Quantile or Summary Metric");
        assert_eq!(ib.year_range().unwrap(), (2004, 2022));
        assert_eq!(ib.output_file(), "viz2_data.json");
        assert_eq!(ib.ratio_specs().len(), 1);
        assert_eq!(validate_missing_series(&ib.missing_series).unwrap(), MissingSeriesPolicy::Null);
        assert_eq!(
            validate_quantile_map(&config.quantile_map).unwrap().version,
            QuantileMap::DECILES_TO_QUINTILES
        );
    }

    #[test]
    fn policies_are_validated() {
        assert_eq!(
            validate_missing_series(&Some("drop".to_string())).unwrap(),
            MissingSeriesPolicy::Drop
        );
        assert!(validate_missing_series(&Some("inner".to_string())).is_err());

        let c = QuantileMapConfig {
            version: "halves/1".to_string(),
            pairs: vec![
                ("0-50%".to_string(), "bottom".to_string()),
                ("50-100%".to_string(), "top".to_string()),
            ],
            passthrough: None,
            unmapped_labels: Some("fail".to_string()),
        };
        let map = validate_quantile_map(&Some(c.clone())).unwrap();
        assert_eq!(map.unmapped, UnmappedLabelPolicy::Fail);
        assert_eq!(map.categories(), &["bottom".to_string(), "top".to_string()]);

        let bad = QuantileMapConfig {
            unmapped_labels: Some("ignore".to_string()),
            ..c
        };
        assert!(validate_quantile_map(&Some(bad)).is_err());
    }

    #[test]
    fn decile_columns_map_to_decile_labels() {
        let c = ConsumptionTableConfig {
            source: FileSource {
                provider: "csv".to_string(),
                file_path: "pce.csv".to_string(),
                worksheet_name: None,
            },
            year_column: None,
            title_column: None,
            total_column: None,
            decile_columns: None,
            subcategories: vec![],
        };
        let cols = c.decile_columns().unwrap();
        assert_eq!(cols[0], ("Decile1".to_string(), "0-10%".to_string()));
        assert_eq!(cols[9], ("Decile10".to_string(), "90-100%".to_string()));

        let short = ConsumptionTableConfig {
            decile_columns: Some(vec!["D1".to_string()]),
            ..c
        };
        assert!(short.decile_columns().is_err());
    }

    #[test]
    fn word_cloud_colors_are_configurable() {
        let js = r#"{
            "source": {"provider": "csv", "filePath": "trends.csv"},
            "topK": 5,
            "highColor": [255, 0, 0]
        }"#;
        let c: WordCloudConfig = serde_json::from_str(js).unwrap();
        let p = c.params().unwrap();
        assert_eq!(p.top_k, 5);
        assert_eq!(p.high_color, Rgb(255, 0, 0));
        assert_eq!(p.low_color, Rgb(255, 255, 255));
        assert_eq!(c.volume_column(), "search_volume");
    }

    #[test]
    fn survey_columns_can_be_renamed() {
        let js = r#"{
            "source": {"provider": "csv", "filePath": "SCFP2019.csv"},
            "columns": {"weight": "WGT2019", "stocks": ["EQUITY"]}
        }"#;
        let c: WealthSurveyConfig = serde_json::from_str(js).unwrap();
        let cols = c.columns();
        assert_eq!(cols.weight, "WGT2019");
        assert_eq!(cols.stocks, vec!["EQUITY".to_string()]);
        assert_eq!(cols.wealth_percentile, "NWPCTLECAT");
        assert_eq!(cols.emergency.len(), 4);

        let plain: WealthSurveyConfig =
            serde_json::from_str(r#"{"source": {"provider": "csv", "filePath": "x.csv"}}"#).unwrap();
        assert_eq!(plain.columns(), SurveyColumns::default());
    }
}
