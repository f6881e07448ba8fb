use serde::Serialize;

use crate::metrics::{industry_average_headcount, safe_ratio};
use crate::models::{CompanyRecord, CompanyScore};

const MIN_SCORE: f64 = 1.0;
const MAX_SCORE: f64 = 5.0;
const TIE_MARGIN: f64 = 0.05;

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return MIN_SCORE;
    }
    value.clamp(MIN_SCORE, MAX_SCORE)
}

/// 60% retained maps to 1, 100% to 5.
pub fn retention_score(ratio: f64) -> f64 {
    clamp_score(1.0 + ((ratio - 0.6) / 0.4) * 4.0)
}

/// Flat maps to 1, tripling (200% growth) to 5.
pub fn engineer_growth_score(ratio: f64) -> f64 {
    clamp_score(1.0 + (ratio / 2.0) * 4.0)
}

/// Half the company being engineers maps to 5.
pub fn engineer_concentration_score(ratio: f64) -> f64 {
    clamp_score(1.0 + (ratio / 0.5) * 4.0)
}

pub fn headcount_growth_score(ratio: f64) -> f64 {
    clamp_score(1.0 + (ratio / 2.0) * 4.0)
}

/// Half the industry average maps to 1, twice the average to 5.
pub fn size_score(ratio: f64) -> f64 {
    clamp_score(1.0 + ((ratio - 0.5) / 1.5) * 4.0)
}

pub fn score_company(record: &CompanyRecord, industry_average: f64) -> CompanyScore {
    let headcount = record.current_headcount as f64;
    let departures = record.voluntary_departures as f64;
    let engineers = record.current_engineers as f64;
    let engineers_6mo = record.engineers_6mo as f64;
    let headcount_last_year = record.headcount_last_year as f64;

    let retention = retention_score(safe_ratio(headcount - departures, headcount));
    let engineer_growth =
        engineer_growth_score(safe_ratio(engineers - engineers_6mo, engineers_6mo));
    let engineer_concentration = engineer_concentration_score(safe_ratio(engineers, headcount));
    let headcount_growth = headcount_growth_score(safe_ratio(
        headcount - headcount_last_year,
        headcount_last_year,
    ));
    let size_rank = size_score(safe_ratio(headcount, industry_average));

    let mean = (retention + engineer_growth + engineer_concentration + headcount_growth + size_rank)
        / 5.0;

    CompanyScore {
        company: record.company.clone(),
        retention,
        engineer_growth,
        engineer_concentration,
        headcount_growth,
        size_rank,
        melt_index: (mean * 10.0).round() / 10.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Leader {
    First,
    Second,
    Tie,
}

fn leader(first: f64, second: f64) -> Leader {
    if (first - second).abs() < TIE_MARGIN {
        Leader::Tie
    } else if first > second {
        Leader::First
    } else {
        Leader::Second
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub first: CompanyScore,
    pub second: CompanyScore,
    pub dimensions: Vec<(&'static str, Leader)>,
    pub overall: Leader,
}

pub fn compare(first: &CompanyRecord, second: &CompanyRecord, industry_average: f64) -> Comparison {
    let first = score_company(first, industry_average);
    let second = score_company(second, industry_average);

    let dimensions = first
        .sub_scores()
        .iter()
        .zip(second.sub_scores().iter())
        .map(|((name, a), (_, b))| (*name, leader(*a, *b)))
        .collect();
    let overall = leader(first.melt_index, second.melt_index);

    Comparison {
        first,
        second,
        dimensions,
        overall,
    }
}

/// Score every company against the set's own average, highest index first.
pub fn rank_companies(records: &[CompanyRecord]) -> Vec<CompanyScore> {
    let average = industry_average_headcount(records);
    let mut scores: Vec<CompanyScore> = records
        .iter()
        .map(|record| score_company(record, average))
        .collect();
    scores.sort_by(|a, b| {
        b.melt_index
            .partial_cmp(&a.melt_index)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.company.cmp(&b.company))
    });
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced_company() -> CompanyRecord {
        CompanyRecord {
            current_headcount: 200,
            voluntary_departures: 40,
            current_engineers: 50,
            engineers_6mo: 25,
            headcount_last_year: 100,
            ..CompanyRecord::named("Balanced")
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn every_sub_score_at_three_gives_three() {
        let score = score_company(&balanced_company(), 160.0);
        for (_, value) in score.sub_scores() {
            assert_close(value, 3.0);
        }
        assert_eq!(score.melt_index, 3.0);
    }

    #[test]
    fn sub_scores_stay_in_range_for_any_ratio() {
        let ratios = [
            f64::NEG_INFINITY,
            -1e9,
            -3.0,
            -0.5,
            0.0,
            0.25,
            0.6,
            1.0,
            2.5,
            1e9,
            f64::INFINITY,
            f64::NAN,
        ];
        let scales: [fn(f64) -> f64; 5] = [
            retention_score,
            engineer_growth_score,
            engineer_concentration_score,
            headcount_growth_score,
            size_score,
        ];
        for scale in scales {
            for ratio in ratios {
                let value = scale(ratio);
                assert!((1.0..=5.0).contains(&value), "{ratio} scaled to {value}");
            }
        }
    }

    #[test]
    fn zero_six_month_engineers_scores_as_flat_growth() {
        let record = CompanyRecord {
            current_engineers: 10,
            engineers_6mo: 0,
            ..balanced_company()
        };
        let score = score_company(&record, 160.0);
        assert_eq!(score.engineer_growth, 1.0);
    }

    #[test]
    fn empty_company_scores_the_floor() {
        let score = score_company(&CompanyRecord::named("Ghost"), 0.0);
        for (_, value) in score.sub_scores() {
            assert_eq!(value, 1.0);
        }
        assert_eq!(score.melt_index, 1.0);
    }

    #[test]
    fn composite_rounds_to_one_decimal() {
        let record = CompanyRecord {
            current_headcount: 100,
            voluntary_departures: 0,
            current_engineers: 10,
            engineers_6mo: 10,
            headcount_last_year: 100,
            ..CompanyRecord::named("Steady")
        };
        // retention 5, growth 1, concentration 1.8, headcount growth 1, size 1 + (0.5/1.5)*4
        let score = score_company(&record, 100.0);
        assert_close(score.engineer_concentration, 1.8);
        assert_close(score.size_rank, 1.0 + 4.0 / 3.0);
        assert_eq!(score.melt_index, 2.2);
    }

    #[test]
    fn comparison_reports_leaders_per_dimension() {
        let strong = balanced_company();
        let weak = CompanyRecord {
            voluntary_departures: 100,
            ..balanced_company()
        };
        let comparison = compare(&strong, &weak, 160.0);
        assert_eq!(comparison.dimensions[0], ("retention", Leader::First));
        assert_eq!(comparison.dimensions[1], ("engineer growth", Leader::Tie));
        assert_eq!(comparison.overall, Leader::First);
    }

    #[test]
    fn ranking_orders_by_melt_index() {
        let small = CompanyRecord {
            current_headcount: 10,
            ..CompanyRecord::named("Small")
        };
        let ranked = rank_companies(&[small, balanced_company()]);
        assert_eq!(ranked[0].company, "Balanced");
        assert_eq!(ranked[1].company, "Small");
    }
}
