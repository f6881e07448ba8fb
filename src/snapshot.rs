use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::insights;
use crate::metrics::aggregate;
use crate::models::{CompanyRecord, IndustrySnapshot, Insight, InsightCategory, SnapshotStatus};
use crate::records::normalize;
use crate::source::{fetch_all_records, RecordSource, SourceError};
use crate::trend::industry_engineer_trend;

pub fn build_snapshot<R: Rng>(records: Vec<CompanyRecord>, rng: &mut R) -> IndustrySnapshot {
    let totals = aggregate(&records);
    debug!(
        records = totals.company_count,
        unique = totals.unique_companies,
        "aggregated company records"
    );

    IndustrySnapshot {
        cycle_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        status: SnapshotStatus::Live,
        company_count: totals.unique_companies,
        people_count: totals.people,
        engineer_count: totals.engineers,
        people_growth: totals.people_growth(),
        engineer_growth: totals.engineer_growth(),
        insights: insights::generate(&records, rng),
        engineer_trends: industry_engineer_trend(&records),
        records,
    }
}

/// Fixed figures shown while live data is unavailable.
pub fn placeholder(reason: &str) -> IndustrySnapshot {
    let insights = [
        ("Company A", InsightCategory::Growth, " grew 25% this quarter"),
        ("Company B", InsightCategory::Retention, " maintained 95% retention"),
        ("Company C", InsightCategory::Velocity, " increased engineering velocity"),
    ]
    .into_iter()
    .map(|(company, category, rest)| Insight::new(company, category, rest.to_string()))
    .collect();

    IndustrySnapshot {
        cycle_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        status: SnapshotStatus::Placeholder {
            reason: reason.to_string(),
        },
        company_count: 205,
        people_count: 4005,
        engineer_count: 1005,
        people_growth: 80,
        engineer_growth: 80,
        insights,
        engineer_trends: Vec::new(),
        records: Vec::new(),
    }
}

pub async fn fetch_snapshot<R: Rng>(
    source: &dyn RecordSource,
    table: &str,
    rng: &mut R,
) -> Result<IndustrySnapshot, SourceError> {
    let raw = fetch_all_records(source, table).await?;
    let records = normalize(&raw);
    Ok(build_snapshot(records, rng))
}

/// Like [`fetch_snapshot`], but a source failure yields the placeholder snapshot.
pub async fn snapshot_or_placeholder<R: Rng>(
    source: &dyn RecordSource,
    table: &str,
    rng: &mut R,
) -> IndustrySnapshot {
    match fetch_snapshot(source, table, rng).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(error = %err, "record source failed, serving placeholder figures");
            placeholder(&err.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Holds the latest published snapshot. Responses from cycles older than the one
/// already published are dropped.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    next: AtomicU64,
    current: Mutex<Option<(Generation, IndustrySnapshot)>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_cycle(&self) -> Generation {
        Generation(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns false when a newer generation is already published.
    pub fn publish(&self, generation: Generation, snapshot: IndustrySnapshot) -> bool {
        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some((published, _)) = current.as_ref() {
            if *published >= generation {
                debug!(
                    stale = generation.value(),
                    published = published.value(),
                    "discarding stale snapshot"
                );
                return false;
            }
        }

        info!(
            generation = generation.value(),
            companies = snapshot.company_count,
            live = snapshot.is_live(),
            "published snapshot"
        );
        *current = Some((generation, snapshot));
        true
    }

    pub fn latest(&self) -> Option<(Generation, IndustrySnapshot)> {
        match self.current.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
