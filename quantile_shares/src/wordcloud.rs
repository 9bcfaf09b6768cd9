//! Spiral layout for the search-term word cloud.
//!
//! This is a presentation heuristic: terms are placed along an Archimedean
//! spiral by decreasing volume. Nothing prevents two terms from overlapping.

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt::Display;

use crate::config::*;
use crate::table::Table;

/// The search volume of a term in a given year.
#[derive(PartialEq, Debug, Clone)]
pub struct TermVolume {
    pub year: i32,
    pub term: String,
    pub volume: f64,
}

/// Reads the (year, term, volume) rows of a search-trend table.
///
/// Rows without a year, a term or a numeric volume are skipped.
pub fn read_term_volumes(
    table: &Table,
    year_column: &str,
    term_column: &str,
    volume_column: &str,
) -> ShareResult<Vec<TermVolume>> {
    let year_idx = table.column_index(year_column)?;
    let term_idx = table.column_index(term_column)?;
    let volume_idx = table.column_index(volume_column)?;
    let mut res: Vec<TermVolume> = Vec::new();
    for (lineno, row) in table.rows().enumerate() {
        match (
            row[year_idx].year(),
            row[term_idx].label(),
            row[volume_idx].number(),
        ) {
            (Some(year), Some(term), Some(volume)) => res.push(TermVolume { year, term, volume }),
            (y, t, v) => {
                warn!(
                    "read_term_volumes: table {:?} row {}: incomplete row (year {:?}, term {:?}, volume {:?}), skipping",
                    table.name(),
                    lineno,
                    y,
                    t,
                    v
                );
            }
        }
    }
    debug!("read_term_volumes: {} terms read", res.len());
    Ok(res)
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// A term with its position and encodings.
#[derive(PartialEq, Debug, Clone)]
pub struct PlacedTerm {
    pub term: String,
    pub volume: f64,
    /// Volume divided by the largest volume of the year.
    pub normalized: f64,
    pub size: i64,
    pub x: f64,
    pub y: f64,
    pub color: Rgb,
}

#[derive(PartialEq, Debug, Clone)]
pub struct WordCloudParams {
    /// Number of terms kept per year.
    pub top_k: usize,
    pub size_scale: f64,
    pub min_size: i64,
    /// Color of a term with a normalized volume of 0.
    pub low_color: Rgb,
    /// Color of a term with a normalized volume of 1.
    pub high_color: Rgb,
}

impl WordCloudParams {
    pub const DEFAULT_PARAMS: WordCloudParams = WordCloudParams {
        top_k: 10,
        size_scale: 30.0,
        min_size: 10,
        low_color: Rgb(255, 255, 255),
        high_color: Rgb(0, 0, 255),
    };
}

const SPIRAL_TURNS: f64 = 4.0;
const INNER_RADIUS: f64 = 0.2;
const OUTER_RADIUS: f64 = 1.0;

/// The position of the `index`-th of `count` terms on the spiral.
///
/// `angle = index * 8π / count` and the radius grows linearly from 0.2 to 1.
pub fn spiral_position(index: usize, count: usize) -> (f64, f64) {
    if count == 0 {
        return (INNER_RADIUS, 0.0);
    }
    let t = index as f64 / count as f64;
    let angle = index as f64 * (2.0 * SPIRAL_TURNS * PI / count as f64);
    let radius = INNER_RADIUS + (OUTER_RADIUS - INNER_RADIUS) * t;
    (radius * angle.cos(), radius * angle.sin())
}

/// Linear interpolation of each channel, truncated toward zero.
pub fn interpolate_color(low: Rgb, high: Rgb, t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let channel = |a: u8, b: u8| -> u8 {
        let v = a as f64 + (b as f64 - a as f64) * t;
        v.clamp(0.0, 255.0) as u8
    };
    Rgb(
        channel(low.0, high.0),
        channel(low.1, high.1),
        channel(low.2, high.2),
    )
}

/// Places the top terms of every year.
///
/// Within a year, terms are ranked by decreasing volume; ties keep the input
/// order. Positions are computed over all the terms of the year, then only
/// the first `top_k` are kept.
pub fn layout_word_cloud(
    terms: &[TermVolume],
    params: &WordCloudParams,
) -> BTreeMap<i32, Vec<PlacedTerm>> {
    let mut by_year: BTreeMap<i32, Vec<&TermVolume>> = BTreeMap::new();
    for t in terms.iter() {
        by_year.entry(t.year).or_default().push(t);
    }

    let mut res: BTreeMap<i32, Vec<PlacedTerm>> = BTreeMap::new();
    for (year, mut year_terms) in by_year.into_iter() {
        let count = year_terms.len();
        let max_volume = year_terms
            .iter()
            .map(|t| t.volume)
            .fold(f64::NEG_INFINITY, f64::max);
        year_terms.sort_by(|a, b| b.volume.total_cmp(&a.volume));

        let placed: Vec<PlacedTerm> = year_terms
            .iter()
            .enumerate()
            .take(params.top_k)
            .map(|(idx, t)| {
                let normalized = if max_volume > 0.0 {
                    t.volume / max_volume
                } else {
                    0.0
                };
                let (x, y) = spiral_position(idx, count);
                PlacedTerm {
                    term: t.term.clone(),
                    volume: t.volume,
                    normalized,
                    size: (normalized * params.size_scale).floor() as i64 + params.min_size,
                    x,
                    y,
                    color: interpolate_color(params.low_color, params.high_color, normalized),
                }
            })
            .collect();
        debug!(
            "layout_word_cloud: year {}: {} terms, {} placed, max volume {}",
            year,
            count,
            placed.len(),
            max_volume
        );
        res.insert(year, placed);
    }
    info!("layout_word_cloud: {} years laid out", res.len());
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tv(year: i32, term: &str, volume: f64) -> TermVolume {
        TermVolume {
            year,
            term: term.to_string(),
            volume,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn highest_volume_sits_at_the_center() {
        let terms = vec![
            tv(2020, "bonds", 10.0),
            tv(2020, "stocks", 50.0),
            tv(2020, "crypto", 100.0),
        ];
        let params = WordCloudParams {
            top_k: 3,
            ..WordCloudParams::DEFAULT_PARAMS
        };
        let res = layout_word_cloud(&terms, &params);
        let placed = &res[&2020];
        let names: Vec<&str> = placed.iter().map(|p| p.term.as_str()).collect();
        assert_eq!(names, vec!["crypto", "stocks", "bonds"]);

        let radius = |p: &PlacedTerm| (p.x * p.x + p.y * p.y).sqrt();
        assert!(close(radius(&placed[0]), 0.2));
        assert!(close(placed[0].x, 0.2));
        assert!(close(placed[0].y, 0.0));
        assert!(close(radius(&placed[1]), 0.2 + 0.8 / 3.0));
        assert!(close(radius(&placed[2]), 0.2 + 1.6 / 3.0));
        assert!(radius(&placed[0]) < radius(&placed[1]));
    }

    #[test]
    fn sizes_and_colors_follow_the_normalized_volume() {
        let terms = vec![tv(2020, "a", 100.0), tv(2020, "b", 50.0), tv(2020, "c", 0.0)];
        let res = layout_word_cloud(&terms, &WordCloudParams::DEFAULT_PARAMS);
        let placed = &res[&2020];
        assert_eq!(placed[0].normalized, 1.0);
        assert_eq!(placed[0].size, 40);
        assert_eq!(placed[0].color, Rgb(0, 0, 255));
        assert_eq!(placed[1].size, 25);
        assert_eq!(placed[1].color, Rgb(127, 127, 255));
        assert_eq!(placed[2].size, 10);
        assert_eq!(placed[2].color.to_string(), "rgb(255, 255, 255)");
    }

    #[test]
    fn top_term_of_each_year_is_normalized_to_one() {
        let terms = vec![
            tv(2019, "a", 3.0),
            tv(2019, "b", 12.0),
            tv(2021, "a", 80.0),
            tv(2021, "b", 20.0),
            tv(2021, "c", 0.5),
        ];
        let res = layout_word_cloud(&terms, &WordCloudParams::DEFAULT_PARAMS);
        assert_eq!(res.keys().cloned().collect::<Vec<i32>>(), vec![2019, 2021]);
        for placed in res.values() {
            assert_eq!(placed[0].normalized, 1.0);
        }
    }

    #[test]
    fn only_top_k_terms_are_kept() {
        let terms: Vec<TermVolume> = (0..25).map(|i| tv(2010, &format!("t{}", i), i as f64)).collect();
        let res = layout_word_cloud(&terms, &WordCloudParams::DEFAULT_PARAMS);
        let placed = &res[&2010];
        assert_eq!(placed.len(), 10);
        assert_eq!(placed[0].term, "t24");
        assert_eq!(placed[9].term, "t15");
    }

    #[test]
    fn unreadable_volumes_are_skipped() {
        let cols: Vec<String> = ["year", "term", "search_volume"].iter().map(|s| s.to_string()).collect();
        let mut b = crate::builder::TableBuilder::new("trends", &cols).unwrap();
        b.add_row_simple(&["2020", "stocks", "55"]);
        b.add_row_simple(&["2020", "bonds", "n/a"]);
        b.add_row_simple(&["", "ira", "12"]);
        let terms = read_term_volumes(&b.build(), "year", "term", "search_volume").unwrap();
        assert_eq!(terms, vec![tv(2020, "stocks", 55.0)]);
    }

    #[test]
    fn zero_volumes_do_not_divide_by_zero() {
        let terms = vec![tv(2010, "a", 0.0), tv(2010, "b", 0.0)];
        let res = layout_word_cloud(&terms, &WordCloudParams::DEFAULT_PARAMS);
        let placed = &res[&2010];
        assert!(placed.iter().all(|p| p.normalized == 0.0 && p.size == 10));
        // Ties keep the input order.
        assert_eq!(placed[0].term, "a");
    }
}
