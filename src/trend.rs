use crate::models::{CompanyRecord, TrendPoint};

pub const TREND_LABELS: [&str; 5] = ["24m", "18m", "12m", "6m", "Now"];

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Rebase five counts so the oldest reads 100. Empty when the series is short
/// or the baseline is zero.
pub fn index_series(values: &[u64]) -> Vec<TrendPoint> {
    if values.len() < TREND_LABELS.len() {
        return Vec::new();
    }
    let baseline = values[0] as f64;
    if baseline == 0.0 {
        return Vec::new();
    }

    TREND_LABELS
        .iter()
        .zip(values)
        .enumerate()
        .map(|(position, (&label, &value))| TrendPoint {
            label,
            value: if position == 0 {
                100.0
            } else {
                round1(100.0 + (value as f64 - baseline) / baseline * 100.0)
            },
        })
        .collect()
}

/// Index the per-offset engineer totals across every record.
pub fn industry_engineer_trend(records: &[CompanyRecord]) -> Vec<TrendPoint> {
    let mut sums = [0u64; 5];
    for record in records {
        for (sum, value) in sums.iter_mut().zip(record.engineer_history()) {
            *sum = sum.saturating_add(value);
        }
    }
    index_series(&sums)
}

pub fn company_engineer_trend(record: &CompanyRecord) -> Vec<TrendPoint> {
    index_series(&record.engineer_history())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(points: &[TrendPoint]) -> Vec<f64> {
        points.iter().map(|p| p.value).collect()
    }

    #[test]
    fn baseline_of_one_hundred_is_identity() {
        let series = index_series(&[100, 120, 150, 180, 200]);
        assert_eq!(values(&series), vec![100.0, 120.0, 150.0, 180.0, 200.0]);
        let labels: Vec<_> = series.iter().map(|p| p.label).collect();
        assert_eq!(labels, vec!["24m", "18m", "12m", "6m", "Now"]);
    }

    #[test]
    fn rebases_and_rounds_to_one_decimal() {
        let series = index_series(&[30, 40, 30, 20, 31]);
        assert_eq!(values(&series), vec![100.0, 133.3, 100.0, 66.7, 103.3]);
    }

    #[test]
    fn zero_baseline_or_short_input_is_empty() {
        assert!(index_series(&[0, 10, 20, 30, 40]).is_empty());
        assert!(index_series(&[10, 20, 30, 40]).is_empty());
        assert!(index_series(&[]).is_empty());
    }

    #[test]
    fn industry_trend_saturates_oversized_counts() {
        let huge = CompanyRecord {
            engineers_24mo: u64::MAX - 1,
            engineers_18mo: u64::MAX - 1,
            engineers_12mo: u64::MAX - 1,
            engineers_6mo: u64::MAX - 1,
            current_engineers: u64::MAX - 1,
            ..CompanyRecord::named("Huge")
        };
        let series = industry_engineer_trend(&[huge.clone(), huge]);
        assert_eq!(series.len(), 5);
        assert!(series.iter().all(|p| p.value.is_finite()));
    }

    #[test]
    fn industry_trend_sums_before_indexing() {
        let a = CompanyRecord {
            engineers_24mo: 40,
            engineers_18mo: 50,
            engineers_12mo: 60,
            engineers_6mo: 70,
            current_engineers: 80,
            ..CompanyRecord::named("A")
        };
        let b = CompanyRecord {
            engineers_24mo: 60,
            engineers_18mo: 70,
            engineers_12mo: 90,
            engineers_6mo: 110,
            current_engineers: 120,
            ..CompanyRecord::named("B")
        };
        let series = industry_engineer_trend(&[a.clone(), b]);
        assert_eq!(values(&series), vec![100.0, 120.0, 150.0, 180.0, 200.0]);

        let single = company_engineer_trend(&a);
        assert_eq!(values(&single), vec![100.0, 125.0, 150.0, 175.0, 200.0]);
    }
}
