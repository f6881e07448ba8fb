use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod insights;
mod melt;
mod metrics;
mod models;
mod records;
mod report;
mod snapshot;
mod source;
mod talent_flow;
mod trend;

use config::{AirtableConfig, DEFAULT_COMPANY_TABLE, DEFAULT_MAP_TABLE};
use source::{AirtableSource, CsvSource, RecordSource};

#[derive(Parser)]
#[command(name = "popcycle")]
#[command(about = "Industry headcount metrics and insights for the AI Pop-Cycle dashboard", long_about = None)]
struct Cli {
    /// Read records from an exported CSV file instead of Airtable
    #[arg(long, global = true)]
    csv: Option<PathBuf>,
    /// Fix the insight shuffle for repeatable output
    #[arg(long, global = true)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch records and print the industry snapshot
    Snapshot {
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long, default_value_t = 10)]
        leaders: usize,
    },
    /// Compare the Melt Index of two companies
    Compare {
        #[arg(long)]
        a: String,
        #[arg(long)]
        b: String,
    },
    /// Rank companies by Melt Index
    Rank {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the talent flow map as JSON
    TalentFlow,
    /// Refresh the snapshot on an interval
    Watch {
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
        /// Stop after this many cycles; 0 runs until interrupted
        #[arg(long, default_value_t = 0)]
        cycles: u64,
    },
}

struct Tables {
    companies: String,
    map: String,
}

fn open_source(csv: Option<&std::path::Path>) -> anyhow::Result<(Arc<dyn RecordSource>, Tables)> {
    if let Some(path) = csv {
        let tables = Tables {
            companies: DEFAULT_COMPANY_TABLE.to_string(),
            map: DEFAULT_MAP_TABLE.to_string(),
        };
        return Ok((Arc::new(CsvSource::new(path)), tables));
    }

    let config = AirtableConfig::from_env()?;
    let tables = Tables {
        companies: config.company_table.clone(),
        map: config.map_table.clone(),
    };
    let source = AirtableSource::new(config).context("failed to build Airtable client")?;
    Ok((Arc::new(source), tables))
}

async fn load_companies(
    source: &dyn RecordSource,
    table: &str,
) -> anyhow::Result<Vec<models::CompanyRecord>> {
    let raw = source::fetch_all_records(source, table)
        .await
        .with_context(|| format!("failed to fetch records from {table}"))?;
    Ok(records::normalize(&raw))
}

fn print_summary(snapshot: &models::IndustrySnapshot) {
    if let models::SnapshotStatus::Placeholder { reason } = &snapshot.status {
        println!("Live data unavailable ({reason}); showing placeholder values.");
    }
    println!(
        "{} companies, {} people ({:+}% YoY), {} engineers ({:+}% YoY)",
        snapshot.company_count,
        snapshot.people_count,
        snapshot.people_growth,
        snapshot.engineer_count,
        snapshot.engineer_growth
    );
    for insight in snapshot.insights.iter() {
        println!("- {}", insight.text);
    }
    if !snapshot.engineer_trends.is_empty() {
        let trend: Vec<String> = snapshot
            .engineer_trends
            .iter()
            .map(|point| format!("{} {:.1}", point.label, point.value))
            .collect();
        println!("Engineer index: {}", trend.join(" | "));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("popcycle=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let (source, tables) = open_source(cli.csv.as_deref())?;

    match cli.command {
        Commands::Snapshot { json } => {
            let snapshot =
                snapshot::snapshot_or_placeholder(source.as_ref(), &tables.companies, &mut rng)
                    .await;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_summary(&snapshot);
            }
        }
        Commands::Report { out, leaders } => {
            let snapshot =
                snapshot::snapshot_or_placeholder(source.as_ref(), &tables.companies, &mut rng)
                    .await;
            let report = report::build_report(&snapshot, leaders);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Compare { a, b } => {
            let companies = load_companies(source.as_ref(), &tables.companies).await?;
            let find = |name: &str| {
                companies
                    .iter()
                    .find(|record| record.company.eq_ignore_ascii_case(name.trim()))
                    .with_context(|| format!("no company named {name}"))
            };
            let (first, second) = (find(&a)?, find(&b)?);
            let average = metrics::industry_average_headcount(&companies);
            let comparison = melt::compare(first, second, average);

            println!(
                "{} {:.1} vs {} {:.1}",
                comparison.first.company,
                comparison.first.melt_index,
                comparison.second.company,
                comparison.second.melt_index
            );
            let pairs = comparison
                .first
                .sub_scores()
                .into_iter()
                .zip(comparison.second.sub_scores());
            for (((name, left), (_, right)), (_, leader)) in
                pairs.zip(comparison.dimensions.iter())
            {
                let ahead = match leader {
                    melt::Leader::First => comparison.first.company.as_str(),
                    melt::Leader::Second => comparison.second.company.as_str(),
                    melt::Leader::Tie => "even",
                };
                println!("- {name}: {left:.1} vs {right:.1} ({ahead})");
            }
            for record in [first, second] {
                let series: Vec<String> = trend::company_engineer_trend(record)
                    .iter()
                    .map(|point| format!("{} {:.1}", point.label, point.value))
                    .collect();
                if !series.is_empty() {
                    println!("{} engineer index: {}", record.company, series.join(" | "));
                }
            }
        }
        Commands::Rank { limit } => {
            let companies = load_companies(source.as_ref(), &tables.companies).await?;
            let scores = melt::rank_companies(&companies);
            if scores.is_empty() {
                println!("No company records found.");
                return Ok(());
            }

            println!("Companies by Melt Index:");
            for score in scores.iter().take(limit) {
                println!("- {} {:.1}", score.company, score.melt_index);
            }
        }
        Commands::TalentFlow => {
            let flow = match source::fetch_all_records(source.as_ref(), &tables.map).await {
                Ok(rows) => {
                    let flow = talent_flow::build_talent_flow(&rows);
                    info!(parents = flow.nodes().len(), "built talent flow");
                    flow
                }
                Err(err) => {
                    warn!(error = %err, "failed to load talent flow");
                    talent_flow::TalentFlow::load_error()
                }
            };
            println!("{}", serde_json::to_string_pretty(&flow)?);
        }
        Commands::Watch {
            interval_secs,
            cycles,
        } => {
            if interval_secs == 0 {
                bail!("--interval-secs must be at least 1");
            }
            let store = Arc::new(snapshot::SnapshotStore::new());
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            let mut tasks = Vec::new();
            let mut started = 0u64;

            while cycles == 0 || started < cycles {
                ticker.tick().await;
                started += 1;

                let generation = store.begin_cycle();
                let store = Arc::clone(&store);
                let source = Arc::clone(&source);
                let table = tables.companies.clone();
                let mut cycle_rng = StdRng::seed_from_u64(rng.random());

                tasks.push(tokio::spawn(async move {
                    let snapshot =
                        snapshot::snapshot_or_placeholder(source.as_ref(), &table, &mut cycle_rng)
                            .await;
                    if store.publish(generation, snapshot.clone()) {
                        print_summary(&snapshot);
                    }
                }));
                reap_finished(&mut tasks).await;
            }

            for task in tasks {
                task.await.context("refresh task panicked")?;
            }
            if let Some((generation, _)) = store.latest() {
                info!(generation = generation.value(), "watch finished");
            }
        }
    }

    Ok(())
}

/// Await the refresh tasks that have already finished, logging any that panicked.
/// Returns how many failed.
async fn reap_finished(tasks: &mut Vec<JoinHandle<()>>) -> usize {
    let (finished, running): (Vec<_>, Vec<_>) =
        std::mem::take(tasks).into_iter().partition(|task| task.is_finished());
    *tasks = running;

    let mut failed = 0;
    for task in finished {
        if let Err(err) = task.await {
            failed += 1;
            warn!(error = %err, "refresh task failed");
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finished_refresh_panics_are_reported() {
        let mut tasks = vec![
            tokio::spawn(async { panic!("refresh blew up"); }),
            tokio::spawn(async {}),
        ];
        while !tasks.iter().all(|task| task.is_finished()) {
            tokio::task::yield_now().await;
        }

        assert_eq!(reap_finished(&mut tasks).await, 1);
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn running_refresh_tasks_are_kept() {
        let mut tasks = vec![tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        })];

        assert_eq!(reap_finished(&mut tasks).await, 0);
        assert_eq!(tasks.len(), 1);
        tasks[0].abort();
    }
}
