use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One tracked company as read from the record source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRecord {
    pub company: String,
    pub current_headcount: u64,
    pub headcount_last_year: u64,
    pub current_engineers: u64,
    pub engineers_24mo: u64,
    pub engineers_18mo: u64,
    pub engineers_12mo: u64,
    pub engineers_6mo: u64,
    pub voluntary_departures: u64,
    pub retention: Option<f64>,
    pub engineer_hiring_velocity: Option<f64>,
    pub percent_headcount_change: Option<f64>,
}

impl CompanyRecord {
    #[cfg(test)]
    pub fn named(company: &str) -> Self {
        Self {
            company: company.to_string(),
            current_headcount: 0,
            headcount_last_year: 0,
            current_engineers: 0,
            engineers_24mo: 0,
            engineers_18mo: 0,
            engineers_12mo: 0,
            engineers_6mo: 0,
            voluntary_departures: 0,
            retention: None,
            engineer_hiring_velocity: None,
            percent_headcount_change: None,
        }
    }

    /// Engineer counts ordered oldest first: 24m, 18m, 12m, 6m, now.
    pub fn engineer_history(&self) -> [u64; 5] {
        [
            self.engineers_24mo,
            self.engineers_18mo,
            self.engineers_12mo,
            self.engineers_6mo,
            self.current_engineers,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    EngineerRatio,
    Growth,
    EngineerGrowth,
    Retention,
    Churn,
    Velocity,
    Loss,
    Decline,
}

impl InsightCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightCategory::EngineerRatio => "engineer_ratio",
            InsightCategory::Growth => "growth",
            InsightCategory::EngineerGrowth => "engineer_growth",
            InsightCategory::Retention => "retention",
            InsightCategory::Churn => "churn",
            InsightCategory::Velocity => "velocity",
            InsightCategory::Loss => "loss",
            InsightCategory::Decline => "decline",
        }
    }
}

/// A rendered insight sentence. `text` always starts with `company`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub text: String,
    pub category: InsightCategory,
    pub company: String,
}

impl Insight {
    pub fn new(company: &str, category: InsightCategory, rest: String) -> Self {
        Self {
            text: format!("{company}{rest}"),
            category,
            company: company.to_string(),
        }
    }

    /// The sentence with the company name in bold markdown.
    pub fn markdown(&self) -> String {
        match self.text.strip_prefix(&self.company) {
            Some(rest) if !self.company.is_empty() => format!("**{}**{}", self.company, rest),
            _ => self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub label: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SnapshotStatus {
    Live,
    Placeholder { reason: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustrySnapshot {
    pub cycle_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub status: SnapshotStatus,
    pub company_count: usize,
    pub people_count: u64,
    pub engineer_count: u64,
    pub people_growth: i64,
    pub engineer_growth: i64,
    pub insights: Vec<Insight>,
    pub engineer_trends: Vec<TrendPoint>,
    pub records: Vec<CompanyRecord>,
}

impl IndustrySnapshot {
    pub fn is_live(&self) -> bool {
        self.status == SnapshotStatus::Live
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyScore {
    pub company: String,
    pub retention: f64,
    pub engineer_growth: f64,
    pub engineer_concentration: f64,
    pub headcount_growth: f64,
    pub size_rank: f64,
    pub melt_index: f64,
}

impl CompanyScore {
    pub fn sub_scores(&self) -> [(&'static str, f64); 5] {
        [
            ("retention", self.retention),
            ("engineer growth", self.engineer_growth),
            ("engineer concentration", self.engineer_concentration),
            ("headcount growth", self.headcount_growth),
            ("size", self.size_rank),
        ]
    }
}
