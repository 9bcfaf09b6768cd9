/*!

This is the long-form manual for `quantile_shares` and `distviz`.

## Input tables

`distviz` reads tables from two providers:
* `xlsx` Excel workbooks. The worksheet is chosen with `worksheetName`; without it, the
  first worksheet is used.
* `csv` Comma Separated Values.

In both cases the first row holds the column names. Blank cells are empty, cells that read
as numbers are numbers, everything else is text. A cell that should be a number but is not
becomes `null` in the output and a warning is logged.

### Share tables

Long tables of shares, one row per year, series and quantile:

```text
Year,Ranking,Series,Quantile or Summary Metric,Value
2004,Equivalized Disposable Personal Income,Personal Saving,0-10%,0.021
2004,Equivalized Disposable Personal Income,Personal Saving,Total ($ Billions),588.3
```

For each series and year, the row labelled `Total ($ Billions)` is the total of the series,
and every other row is a share of it. A series and year without a total row is an error.

### Wide tables

Tables with one column per decile and a `Total` column, such as the distributional
personal consumption tables:

```text
year,pce_title,Total,Decile1,...,Decile10
2004,Durable goods,1084.8,0.047,...,0.166
```

Each row is selected by its title and each decile column becomes the decile label
`0-10%`, ..., `90-100%`.

### Survey tables

Household-level tables in the layout of the Survey of Consumer Finances summary extract.
Only `NWPCTLECAT` is required. `INCQRTCAT`, `INCPCTLECAT`, `NETWORTH`, `WGT`, `DEBT2INC`,
`FINLIT` and the emergency columns (`EMERGBORR`, `EMERGSAV`, `EMERGPSTP`, `EMERGCUT`) are
used when present. Stock holdings are read from the first of `STOCKS`, `STOCK`, `STMUTF`,
`COMUTF`, `NSTOCKS`. A figure that cannot be computed from the table is written as
`{"value": null, "available": false}`.

## Quantile maps

The fine labels of the tables are grouped into coarse buckets with a quantile map. The
default map, `deciles-to-quintiles/1`, groups `0-10%` and `10-20%` into `0-20%`, and so on.
The labels `Top 1%`, `Top 5%` and `Total ($ Billions)` are passed through unchanged.

A different map can be given in the configuration:

```json
"quantileMap": {
  "version": "halves/1",
  "pairs": [["0-50%", "Bottom half"], ["50-100%", "Top half"]],
  "passthrough": ["Total ($ Billions)"],
  "unmappedLabels": "fail"
}
```

`unmappedLabels` is `drop` (the default: rows with other labels are dropped and a warning
is logged) or `fail`.

## Configuration

```json
{
  "outputSettings": {"outputDirectory": "data"},
  "wordCloud": {
    "source": {"provider": "csv", "filePath": "trends.csv"},
    "literacy": {"source": {"provider": "csv", "filePath": "literacy.csv"}}
  },
  "incomeBreakdown": {
    "shares": {"provider": "xlsx", "filePath": "full_dataset.xlsx",
               "worksheetName": "shares of NIPA totals"},
    "firstYear": 2004,
    "lastYear": 2022,
    "consumption": {
      "source": {"provider": "xlsx", "filePath": "distributional-pce-2000-2022.xlsx",
                 "worksheetName": "table1data"},
      "subcategories": [
        {"title": "Durable goods", "name": "Durable Goods", "ratioName": "Durable Goods Ratio"}
      ]
    },
    "sankey": {"year": 2022, "breakdown": true}
  },
  "wealthSurvey": {"source": {"provider": "csv", "filePath": "SCFP2022.csv"}}
}
```

All the paths are relative to the configuration file. Every visualization section is
optional, but at least one is required.

Options of `wordCloud`:
 - `yearColumn`, `termColumn`, `volumeColumn` (defaults `year`, `term`, `search_volume`)
 - `topK` (default 10): the number of terms kept per year
 - `sizeScale` and `minSize` (defaults 30 and 10): `size = floor(normalized * sizeScale) + minSize`
 - `lowColor` and `highColor` (defaults `[255, 255, 255]` and `[0, 0, 255]`)
 - `outputFile` (default `viz1_data.json`)

Options of `incomeBreakdown`:
 - `yearColumn`, `rankingColumn`, `seriesColumn`, `quantileColumn`, `valueColumn`
 - `ranking` (default `Equivalized Disposable Personal Income`)
 - `incomeSeries`, `consumptionSeries`, `savingSeries`
 - `firstYear`, `lastYear`: inclusive bounds on the years
 - `missingSeries`: `null` (the default) writes `null` when a series has no value for a
   bucket, `drop` removes the bucket from the year.
 - `outputFile` (default `viz2_data.json`), and `sankey.outputFile` (default `sankey_data.json`)

Options of `wealthSurvey`:
 - `columns`: renames of the survey columns (`wealthPercentile`, `incomeQuartile`,
   `incomePercentile`, `netWorth`, `stocks`, `weight`, `debtToIncome`, `literacy`,
   `emergency`). `stocks` and `emergency` are lists.
 - `quintiles`: five `{label, description, range}` objects. The range is shown when the
   survey has no household in the quintile.
 - `outputFile` (default `viz3_data.json`)

## Outputs

An `outputFile` may name a subdirectory of the output directory, such as
`charts/viz1_data.json`. Two visualizations cannot write to the same file.

The files are written with sorted keys, so that identical inputs give identical files.
Each file is first written next to its target and then renamed over it. When
`--reference <dir>` is given, each output is compared with the file of the same name in
`<dir>` and the differences are printed.

 */
