// src/analysis/mod.rs

use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedRecord;

/// Position-weighted mean over a Likert scale for one `(row key, category)`
/// pair. With levels ordered most- to least-positive, the first level weighs
/// `L` and the last weighs 1, so a score of `L` means every respondent chose
/// the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedScore {
    pub row_key: String,
    pub category: String,
    pub score: f64,
}

/// Mean score per category across every row key in the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAverage {
    pub category: String,
    pub score: f64,
}

/// One response level's share for a single row key, the unit behind
/// pictogram and isotype counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelShare {
    pub category: String,
    pub sub_level: String,
    pub value: f64,
}

/// Collapse tidy records into one weighted score per `(row_key, category)`.
///
/// Within a pair, levels weigh by their order of appearance: the first
/// carries `level_count`, the last carries 1. Cells that failed coercion are
/// left out of both sums; a pair with nothing parseable (or an all-zero
/// distribution) yields no score rather than a divide-by-zero.
///
/// Pair order follows first appearance in `records`, so callers can zip the
/// scores back against an externally-defined category ordering.
pub fn weighted_scores(records: &[NormalizedRecord]) -> Vec<WeightedScore> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut grouped: Vec<Vec<&NormalizedRecord>> = Vec::new();
    for record in records {
        let pair = (record.row_key.clone(), record.category.clone());
        match order.iter().position(|p| *p == pair) {
            Some(i) => grouped[i].push(record),
            None => {
                order.push(pair);
                grouped.push(vec![record]);
            }
        }
    }

    let mut scores = Vec::new();
    for ((row_key, category), group) in order.into_iter().zip(grouped) {
        let level_count = group.len();
        let mut weighted_sum = 0.0;
        let mut total = 0.0;
        for (position, record) in group.iter().enumerate() {
            if let Some(value) = record.value {
                let weight = (level_count - position) as f64;
                weighted_sum += weight * value;
                total += value;
            }
        }
        if total > 0.0 {
            scores.push(WeightedScore {
                row_key,
                category,
                score: weighted_sum / total,
            });
        }
    }
    scores
}

/// Average the per-row-key scores into one panel mean per category,
/// preserving category order of first appearance.
pub fn panel_average(scores: &[WeightedScore]) -> Vec<CategoryAverage> {
    let mut categories: Vec<&str> = Vec::new();
    let mut sums: Vec<(f64, usize)> = Vec::new();
    for score in scores {
        match categories.iter().position(|c| *c == score.category) {
            Some(i) => {
                sums[i].0 += score.score;
                sums[i].1 += 1;
            }
            None => {
                categories.push(score.category.as_str());
                sums.push((score.score, 1));
            }
        }
    }
    categories
        .into_iter()
        .zip(sums)
        .map(|(category, (sum, n))| CategoryAverage {
            category: category.to_string(),
            score: sum / n as f64,
        })
        .collect()
}

/// The parsed level values for one row key, in record order. Suppressed
/// levels are omitted entirely.
pub fn level_shares(records: &[NormalizedRecord], row_key: &str) -> Vec<LevelShare> {
    records
        .iter()
        .filter(|r| r.row_key == row_key)
        .filter_map(|r| {
            r.value.map(|value| LevelShare {
                category: r.category.clone(),
                sub_level: r.sub_level.clone(),
                value,
            })
        })
        .collect()
}
