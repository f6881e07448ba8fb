use std::collections::HashSet;

use crate::models::CompanyRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Totals {
    /// Records carrying a company name, duplicates included.
    pub company_count: usize,
    pub unique_companies: usize,
    pub people: u64,
    pub people_last_year: u64,
    pub engineers: u64,
    pub engineers_last_year: u64,
}

impl Totals {
    pub fn people_growth(&self) -> i64 {
        growth_pct(self.people_last_year as f64, self.people as f64)
    }

    pub fn engineer_growth(&self) -> i64 {
        growth_pct(self.engineers_last_year as f64, self.engineers as f64)
    }
}

pub fn aggregate(records: &[CompanyRecord]) -> Totals {
    let mut totals = Totals::default();
    let mut names = HashSet::new();

    for record in records {
        let name = record.company.trim();
        if name.is_empty() {
            continue;
        }
        names.insert(name);
        totals.company_count += 1;
        totals.people = totals.people.saturating_add(record.current_headcount);
        totals.people_last_year = totals
            .people_last_year
            .saturating_add(record.headcount_last_year);
        totals.engineers = totals.engineers.saturating_add(record.current_engineers);
        totals.engineers_last_year = totals
            .engineers_last_year
            .saturating_add(record.engineers_12mo);
    }

    totals.unique_companies = names.len();
    totals
}

/// Whole-percent change from `old_value` to `new_value`; 0 when there is no prior value.
pub fn growth_pct(old_value: f64, new_value: f64) -> i64 {
    if old_value == 0.0 || !old_value.is_finite() || !new_value.is_finite() {
        return 0;
    }
    (((new_value - old_value) / old_value) * 100.0).round() as i64
}

/// Mean headcount over companies with a positive headcount.
pub fn industry_average_headcount(records: &[CompanyRecord]) -> f64 {
    let staffed: Vec<f64> = records
        .iter()
        .filter(|r| r.current_headcount > 0)
        .map(|r| r.current_headcount as f64)
        .collect();

    if staffed.is_empty() {
        return 0.0;
    }
    staffed.iter().sum::<f64>() / staffed.len() as f64
}

/// `numerator / denominator`, or 0 when the result would not be finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}
