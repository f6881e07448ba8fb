use rand::seq::SliceRandom;
use rand::Rng;

use crate::metrics::safe_ratio;
use crate::models::{CompanyRecord, Insight, InsightCategory};

pub const MAX_INSIGHTS: usize = 5;
/// A dimension with fewer valid values than this is skipped.
const MIN_RANKED: usize = 3;
/// Ranked bands start past the top three to keep one-off outliers out.
const BAND_START: usize = 3;
const BAND_LEN: usize = 5;
const PICK_FIRST: usize = 2;
const PICK_LAST: usize = 4;
/// Retention figures are noisy below this headcount.
const RETENTION_MIN_HEADCOUNT: u64 = 29;

const ENGINEER_RATIO_MIN: f64 = 0.30;
const GROWTH_MIN_PCT: f64 = 30.0;
const DECLINE_MAX_PCT: f64 = -20.0;
const ENGINEER_GROWTH_MIN_PCT: f64 = 30.0;
const STRONG_RETENTION_MIN_PCT: f64 = 85.0;
const WEAK_RETENTION_MAX_PCT: f64 = 80.0;
const VELOCITY_MIN: f64 = 0.0;

/// Every qualifying insight before randomised selection.
///
/// `fixed` entries are always candidates; each `alternatives` group yields at most one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsightPool {
    pub fixed: Vec<Insight>,
    pub alternatives: Vec<Vec<Insight>>,
}

impl InsightPool {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty() && self.alternatives.iter().all(Vec::is_empty)
    }
}

type Ranked<'a> = Vec<(&'a CompanyRecord, f64)>;

/// Records with a finite value for the dimension, highest first.
fn rank_descending<'a>(
    records: &'a [CompanyRecord],
    value: impl Fn(&CompanyRecord) -> Option<f64>,
) -> Ranked<'a> {
    let mut ranked: Ranked<'a> = records
        .iter()
        .filter_map(|record| value(record).filter(|v| v.is_finite()).map(|v| (record, v)))
        .collect();
    if ranked.len() < MIN_RANKED {
        return Vec::new();
    }
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

fn ascending(mut ranked: Ranked<'_>) -> Ranked<'_> {
    ranked.reverse();
    ranked
}

fn band<'r, 'a>(ranked: &'r Ranked<'a>) -> impl Iterator<Item = &'r (&'a CompanyRecord, f64)> {
    ranked.iter().skip(BAND_START).take(BAND_LEN)
}

fn pick_range<'r, 'a>(
    ranked: &'r Ranked<'a>,
) -> impl Iterator<Item = &'r (&'a CompanyRecord, f64)> {
    ranked.iter().skip(PICK_FIRST).take(PICK_LAST - PICK_FIRST + 1)
}

fn engineer_ratio(record: &CompanyRecord) -> Option<f64> {
    (record.current_headcount > 0)
        .then(|| safe_ratio(record.current_engineers as f64, record.current_headcount as f64))
}

fn headcount_growth(record: &CompanyRecord) -> Option<f64> {
    if record.current_headcount > 0 && record.headcount_last_year > 0 {
        let last_year = record.headcount_last_year as f64;
        Some((record.current_headcount as f64 - last_year) / last_year)
    } else {
        record.percent_headcount_change
    }
}

fn engineer_growth(record: &CompanyRecord) -> Option<f64> {
    (record.current_engineers > 0 && record.engineers_12mo > 0).then(|| {
        let last_year = record.engineers_12mo as f64;
        (record.current_engineers as f64 - last_year) / last_year
    })
}

fn retention(record: &CompanyRecord) -> Option<f64> {
    if record.current_headcount < RETENTION_MIN_HEADCOUNT {
        return None;
    }
    record.retention
}

fn pct(ratio: f64) -> i64 {
    (ratio * 100.0).round() as i64
}

fn engineer_ratio_insights(records: &[CompanyRecord], out: &mut Vec<Insight>) {
    let ranked = rank_descending(records, engineer_ratio);
    for (record, ratio) in band(&ranked) {
        if *ratio > ENGINEER_RATIO_MIN {
            out.push(Insight::new(
                &record.company,
                InsightCategory::EngineerRatio,
                format!(" has a high engineer ratio of {}%", pct(*ratio)),
            ));
        }
    }
}

fn growth_insights(records: &[CompanyRecord], out: &mut Vec<Insight>) {
    let ranked = rank_descending(records, headcount_growth);
    for (record, growth) in band(&ranked) {
        if growth * 100.0 > GROWTH_MIN_PCT {
            out.push(Insight::new(
                &record.company,
                InsightCategory::Growth,
                format!(" grew by {}% YoY", pct(*growth)),
            ));
        }
    }

    let worst = ascending(ranked);
    for (record, growth) in band(&worst) {
        if growth * 100.0 < DECLINE_MAX_PCT {
            out.push(Insight::new(
                &record.company,
                InsightCategory::Decline,
                format!(" decreased by {}% YoY", pct(growth.abs())),
            ));
        }
    }
}

fn engineer_growth_insights(records: &[CompanyRecord], out: &mut Vec<Insight>) {
    let ranked = rank_descending(records, engineer_growth);
    for (record, growth) in band(&ranked) {
        if growth * 100.0 > ENGINEER_GROWTH_MIN_PCT {
            out.push(Insight::new(
                &record.company,
                InsightCategory::EngineerGrowth,
                format!("'s engineering team grew by {}%", pct(*growth)),
            ));
        }
    }
}

fn retention_groups(records: &[CompanyRecord], groups: &mut Vec<Vec<Insight>>) {
    let ranked = rank_descending(records, retention);

    let strong: Vec<Insight> = pick_range(&ranked)
        .filter(|(_, value)| value * 100.0 >= STRONG_RETENTION_MIN_PCT)
        .map(|(record, value)| {
            Insight::new(
                &record.company,
                InsightCategory::Retention,
                format!(" shows strong stability with {}% employee retention", pct(*value)),
            )
        })
        .collect();
    groups.push(strong);

    let worst = ascending(ranked);
    let weak: Vec<Insight> = pick_range(&worst)
        .filter(|(_, value)| value * 100.0 < WEAK_RETENTION_MAX_PCT)
        .map(|(record, value)| {
            Insight::new(
                &record.company,
                InsightCategory::Churn,
                format!(
                    " faces retention challenges with only {}% of employees staying",
                    pct(*value)
                ),
            )
        })
        .collect();
    groups.push(weak);
}

fn velocity_insights(
    records: &[CompanyRecord],
    fixed: &mut Vec<Insight>,
    groups: &mut Vec<Vec<Insight>>,
) {
    let ranked = rank_descending(records, |r| r.engineer_hiring_velocity);

    let fastest: Vec<Insight> = pick_range(&ranked)
        .filter(|(_, velocity)| *velocity > VELOCITY_MIN)
        .map(|(record, velocity)| {
            Insight::new(
                &record.company,
                InsightCategory::Velocity,
                format!(
                    " has increased engineer hiring velocity {:.1}X in the last 6 months",
                    velocity + 1.0
                ),
            )
        })
        .collect();
    groups.push(fastest);

    // Two slow hirers past the very slowest ones, reported together.
    let slowest = ascending(ranked);
    if let [first, second] = slowest
        .iter()
        .skip(PICK_FIRST)
        .take(2)
        .collect::<Vec<_>>()[..]
    {
        let lost: i64 = [first.0, second.0]
            .iter()
            .map(|r| r.engineers_6mo as i64 - r.current_engineers as i64)
            .sum();
        if lost > 0 {
            fixed.push(Insight::new(
                &first.0.company,
                InsightCategory::Loss,
                format!(
                    " and {} have lost {} engineers in the last 6 months",
                    second.0.company, lost
                ),
            ));
        }
    }
}

pub fn build_pool(records: &[CompanyRecord]) -> InsightPool {
    let mut pool = InsightPool::default();

    engineer_ratio_insights(records, &mut pool.fixed);
    growth_insights(records, &mut pool.fixed);
    engineer_growth_insights(records, &mut pool.fixed);
    retention_groups(records, &mut pool.alternatives);
    velocity_insights(records, &mut pool.fixed, &mut pool.alternatives);

    pool.alternatives.retain(|group| !group.is_empty());
    pool
}

/// Pick one entry per alternatives group, shuffle everything, keep at most five.
pub fn select<R: Rng>(pool: &InsightPool, rng: &mut R) -> Vec<Insight> {
    let mut chosen = pool.fixed.clone();
    for group in &pool.alternatives {
        if !group.is_empty() {
            let index = rng.random_range(0..group.len());
            chosen.push(group[index].clone());
        }
    }
    chosen.shuffle(rng);
    chosen.truncate(MAX_INSIGHTS);
    chosen
}

pub fn generate<R: Rng>(records: &[CompanyRecord], rng: &mut R) -> Vec<Insight> {
    select(&build_pool(records), rng)
}
