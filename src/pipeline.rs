use log::{debug, info, warn};

use quantile_shares::ShareError;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::pipeline::config_reader::*;

mod config_reader;
mod emit;
mod io_common;
mod io_csv;
mod io_excel;
mod viz_income;
mod viz_survey;
mod viz_wordcloud;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PipelineError {
    #[snafu(display("Input file {path} does not exist"))]
    SourceNotFound { path: String },
    #[snafu(display("Worksheet {worksheet:?} not found in {path}"))]
    MissingWorksheet { path: String, worksheet: String },
    #[snafu(display("Workbook {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    ReadingCsv {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing {name}"))]
    SerializingJson {
        source: serde_json::Error,
        name: String,
    },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error while processing {stage}"))]
    Shares { source: ShareError, stage: String },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{path} differs from its reference"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("Invalid configuration: {message}"))]
    InvalidConfig {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// A JSON document waiting to be written, with its file name.
#[derive(PartialEq, Debug, Clone)]
pub struct Fixture {
    pub file_name: String,
    pub content: JSValue,
}

/// Builds every fixture described by the configuration file, then writes
/// them all.
///
/// Nothing is written if one of the fixtures cannot be built. Returns the
/// paths of the written files.
pub fn run_pipeline(
    config_path: &str,
    out_dir: Option<String>,
    reference_dir: Option<String>,
) -> PipelineResult<Vec<PathBuf>> {
    let config_p = Path::new(config_path);
    let config = read_config(config_p)?;
    info!("run_pipeline: config: {:?}", config);
    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;

    let fixtures = build_fixtures(root_p, &config)?;

    let out_p: PathBuf = match out_dir {
        Some(o) => PathBuf::from(o),
        None => {
            let configured = config
                .output_settings
                .as_ref()
                .and_then(|o| o.output_directory.clone())
                .unwrap_or_else(|| "data".to_string());
            io_common::resolve_path(root_p, &configured)
        }
    };
    let mut written: Vec<PathBuf> = Vec::new();
    for f in fixtures.iter() {
        written.push(emit::write_fixture(&out_p, f)?);
    }
    info!(
        "run_pipeline: {} files written to {:?}",
        written.len(),
        out_p.display()
    );

    if let Some(reference) = reference_dir {
        check_references(Path::new(&reference), &fixtures)?;
    }
    Ok(written)
}

fn build_fixtures(root_p: &Path, config: &PipelineConfig) -> PipelineResult<Vec<Fixture>> {
    let map = validate_quantile_map(&config.quantile_map)?;
    let mut fixtures: Vec<Fixture> = Vec::new();
    if let Some(wc) = &config.word_cloud {
        fixtures.push(viz_wordcloud::build(root_p, wc)?);
    }
    if let Some(ib) = &config.income_breakdown {
        fixtures.extend(viz_income::build(root_p, ib, &map)?);
    }
    if let Some(ws) = &config.wealth_survey {
        fixtures.push(viz_survey::build(root_p, ws)?);
    }
    let mut names: BTreeSet<&str> = BTreeSet::new();
    for f in fixtures.iter() {
        if !names.insert(f.file_name.as_str()) {
            whatever!("two visualizations write to the same file {:?}", f.file_name);
        }
    }
    debug!("build_fixtures: {} fixtures", fixtures.len());
    Ok(fixtures)
}

/// Compares each fixture with the file of the same name in `reference_p`.
///
/// All the differences are printed before failing.
fn check_references(reference_p: &Path, fixtures: &[Fixture]) -> PipelineResult<()> {
    let mut mismatches: Vec<String> = Vec::new();
    for f in fixtures.iter() {
        let ref_p = reference_p.join(&f.file_name);
        let ref_s = ref_p.display().to_string();
        let contents = fs::read_to_string(&ref_p).context(OpeningJsonSnafu {
            path: ref_s.clone(),
        })?;
        let reference: JSValue = serde_json::from_str(contents.as_str())
            .context(ParsingJsonSnafu { path: ref_s.clone() })?;
        let pretty_ref = emit::to_pretty(&reference, &f.file_name)?;
        let pretty_out = emit::to_pretty(&f.content, &f.file_name)?;
        if pretty_ref != pretty_out {
            warn!("Found differences with the reference file {:?}", ref_s);
            print_diff(pretty_ref.as_str(), pretty_out.as_str(), "\n");
            mismatches.push(ref_s);
        } else {
            info!("check_references: {:?} matches", ref_s);
        }
    }
    match mismatches.first() {
        Some(path) => ReferenceMismatchSnafu { path: path.clone() }.fail(),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write(dir: &Path, name: &str, contents: &str) {
        let mut f = File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    fn shares_csv() -> String {
        let mut s = String::from("Year,Ranking,Series,Quantile or Summary Metric,Value\n");
        let series = [
            ("Disposable Personal Income", 1000.0),
            ("Personal Consumption Expenditures", 800.0),
            ("Personal Saving", 200.0),
        ];
        for year in [2004, 2005] {
            for (name, total) in series.iter() {
                for d in 0..10 {
                    s.push_str(&format!(
                        "{},Equivalized Disposable Personal Income,{},{}-{}%,0.1\n",
                        year,
                        name,
                        d * 10,
                        (d + 1) * 10
                    ));
                }
                s.push_str(&format!(
                    "{},Equivalized Disposable Personal Income,{},Top 1%,0.2\n",
                    year, name
                ));
                s.push_str(&format!(
                    "{},Equivalized Disposable Personal Income,{},Total ($ Billions),{}\n",
                    year, name, total
                ));
            }
        }
        s
    }

    fn pce_csv() -> String {
        let mut s = String::from("year,pce_title,Total");
        for d in 1..=10 {
            s.push_str(&format!(",Decile{}", d));
        }
        s.push('\n');
        for year in [2004, 2005] {
            for (title, total) in [("Durable goods", 100.0), ("Nondurable goods", 300.0)] {
                s.push_str(&format!("{},{},{}", year, title, total));
                for _ in 1..=10 {
                    s.push_str(",0.1");
                }
                s.push('\n');
            }
        }
        s
    }

    fn trends_csv() -> &'static str {
        "year,term,search_volume\n2020,bonds,10\n2020,stocks,50\n2020,crypto,100\n2021,bonds,20\n2021,stocks,n/a\n"
    }

    fn config_json() -> &'static str {
        r#"{
            "outputSettings": {"outputDirectory": "out"},
            "wordCloud": {
                "source": {"provider": "csv", "filePath": "trends.csv"},
                "literacy": {"source": {"provider": "csv", "filePath": "literacy.csv"}}
            },
            "incomeBreakdown": {
                "shares": {"provider": "csv", "filePath": "shares.csv"},
                "firstYear": 2004,
                "lastYear": 2022,
                "consumption": {
                    "source": {"provider": "csv", "filePath": "pce.csv"},
                    "subcategories": [
                        {"title": "Durable goods", "name": "Durable Goods", "ratioName": "Durable Goods Ratio"},
                        {"title": "Nondurable goods", "name": "Nondurable Goods", "ratioName": "Nondurable Goods Ratio"}
                    ]
                },
                "sankey": {"year": 2005, "breakdown": true}
            }
        }"#
    }

    fn setup(dir: &Path) {
        write(dir, "shares.csv", &shares_csv());
        write(dir, "pce.csv", &pce_csv());
        write(dir, "trends.csv", trends_csv());
        write(
            dir,
            "literacy.csv",
            "Generation,FinancialLiteracyScore\nBaby Boomers,68.5\nGen Z,48.2\n",
        );
        write(dir, "config.json", config_json());
    }

    #[test]
    fn two_runs_give_identical_files() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        let config = dir.path().join("config.json").display().to_string();

        let first = run_pipeline(&config, None, None).unwrap();
        assert_eq!(first.len(), 3);
        let contents: Vec<Vec<u8>> = first.iter().map(|p| fs::read(p).unwrap()).collect();

        let second = run_pipeline(&config, None, None).unwrap();
        assert_eq!(first, second);
        for (p, c) in second.iter().zip(contents.iter()) {
            assert_eq!(&fs::read(p).unwrap(), c);
        }
        assert!(dir.path().join("out").join("viz2_data.json").exists());
    }

    #[test]
    fn income_breakdown_content() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        let config = dir.path().join("config.json").display().to_string();
        let out = dir.path().join("elsewhere");
        run_pipeline(&config, Some(out.display().to_string()), None).unwrap();

        let js: JSValue =
            serde_json::from_str(&fs::read_to_string(out.join("viz2_data.json")).unwrap()).unwrap();
        assert_eq!(js["years"], serde_json::json!([2004, 2005]));
        let year = &js["yearlyData"]["2004"];
        // Two deciles of 10% of a $1000B total.
        assert_eq!(year["income"]["Disposable Personal Income"]["0-20%"], 200.0);
        assert_eq!(year["ratios"]["0-20%"]["Total Consumption Ratio"], 80.0);
        assert_eq!(year["ratios"]["0-20%"]["Durable Goods Ratio"], 10.0);

        let sankey: JSValue =
            serde_json::from_str(&fs::read_to_string(out.join("sankey_data.json")).unwrap())
                .unwrap();
        assert_eq!(sankey["year"], 2005);
        assert_eq!(sankey["nodes"][0], "0-20%");
        assert_eq!(sankey["links"][0], serde_json::json!([0, 5, 160.0]));

        let viz1: JSValue =
            serde_json::from_str(&fs::read_to_string(out.join("viz1_data.json")).unwrap()).unwrap();
        assert_eq!(viz1["wordCloud"]["years"], serde_json::json!([2020, 2021]));
        assert_eq!(viz1["wordCloud"]["data"]["2020"][0]["term"], "crypto");
        assert_eq!(viz1["wordCloud"]["data"]["2021"].as_array().unwrap().len(), 1);
        assert_eq!(viz1["literacy"][1]["Generation"], "Gen Z");
    }

    #[test]
    fn year_bounds_exclude_years() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        let config = config_json().replace(r#""firstYear": 2004"#, r#""firstYear": 2005"#);
        write(dir.path(), "config.json", &config);
        let path = dir.path().join("config.json").display().to_string();
        let out = dir.path().join("bounded");
        run_pipeline(&path, Some(out.display().to_string()), None).unwrap();

        let js: JSValue =
            serde_json::from_str(&fs::read_to_string(out.join("viz2_data.json")).unwrap()).unwrap();
        assert_eq!(js["years"], serde_json::json!([2005]));
        assert!(js["yearlyData"].get("2004").is_none());
        assert_eq!(js["yearlyData"]["2005"]["income"]["Disposable Personal Income"]["0-20%"], 200.0);
    }

    #[test]
    fn missing_source_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        fs::remove_file(dir.path().join("pce.csv")).unwrap();
        let config = dir.path().join("config.json").display().to_string();
        let res = run_pipeline(&config, None, None);
        assert!(matches!(res, Err(PipelineError::SourceNotFound { .. })));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn missing_column_is_a_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        write(
            dir.path(),
            "shares.csv",
            "Year,Ranking,Series,Value\n2004,Equivalized Disposable Personal Income,Personal Saving,1\n",
        );
        let config = dir.path().join("config.json").display().to_string();
        let res = run_pipeline(&config, None, None);
        assert!(matches!(
            res,
            Err(PipelineError::Shares {
                source: ShareError::SchemaMismatch { .. },
                ..
            })
        ));
    }

    #[test]
    fn references_are_compared() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        let config = dir.path().join("config.json").display().to_string();
        run_pipeline(&config, None, None).unwrap();
        let out = dir.path().join("out").display().to_string();

        run_pipeline(&config, None, Some(out.clone())).unwrap();

        write(&dir.path().join("out"), "viz1_data.json", "{}");
        let res = run_pipeline(&config, Some(dir.path().join("new").display().to_string()), Some(out));
        assert!(matches!(res, Err(PipelineError::ReferenceMismatch { .. })));
    }

    #[test]
    fn written_floats_match_their_reference() {
        let dir = tempfile::tempdir().unwrap();
        let coords: Vec<JSValue> = (0..24)
            .map(|i| {
                let (x, y) = quantile_shares::wordcloud::spiral_position(i, 24);
                serde_json::json!([x, y])
            })
            .collect();
        let f = Fixture {
            file_name: "viz1_data.json".to_string(),
            content: serde_json::json!({ "coords": coords }),
        };
        emit::write_fixture(dir.path(), &f).unwrap();
        check_references(dir.path(), &[f]).unwrap();
    }

    #[test]
    fn shared_output_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        let config = config_json().replace(
            r#""literacy": {"#,
            r#""outputFile": "viz2_data.json", "literacy": {"#,
        );
        write(dir.path(), "config.json", &config);
        let path = dir.path().join("config.json").display().to_string();
        let res = run_pipeline(&path, None, None);
        assert!(matches!(res, Err(PipelineError::InvalidConfig { .. })));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn empty_configuration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "config.json", r#"{"outputSettings": {}}"#);
        let config = dir.path().join("config.json").display().to_string();
        let res = run_pipeline(&config, None, None);
        assert!(matches!(res, Err(PipelineError::InvalidConfig { .. })));
    }
}
