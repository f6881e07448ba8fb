use std::fmt::Write;

use crate::melt;
use crate::models::{IndustrySnapshot, SnapshotStatus};

fn signed(value: i64) -> String {
    if value > 0 {
        format!("+{value}%")
    } else {
        format!("{value}%")
    }
}

pub fn build_report(snapshot: &IndustrySnapshot, leaderboard_size: usize) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# AI Pop-Cycle Industry Report");
    let _ = writeln!(
        output,
        "Generated {} (cycle {})",
        snapshot.generated_at.format("%Y-%m-%d %H:%M UTC"),
        snapshot.cycle_id
    );
    if let SnapshotStatus::Placeholder { reason } = &snapshot.status {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "> Live data is unavailable ({reason}). Showing placeholder values."
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Industry Totals");
    let _ = writeln!(output, "- Companies tracked: {}", snapshot.company_count);
    let _ = writeln!(
        output,
        "- People: {} ({} YoY)",
        snapshot.people_count,
        signed(snapshot.people_growth)
    );
    let _ = writeln!(
        output,
        "- Engineers: {} ({} YoY)",
        snapshot.engineer_count,
        signed(snapshot.engineer_growth)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Insights");
    if snapshot.insights.is_empty() {
        let _ = writeln!(output, "No insights stood out in this cycle.");
    } else {
        for insight in snapshot.insights.iter() {
            let _ = writeln!(output, "- {} ({})", insight.markdown(), insight.category.as_str());
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Engineer Trend (24m = 100)");
    if snapshot.engineer_trends.is_empty() {
        let _ = writeln!(output, "Not enough history to index engineer headcount.");
    } else {
        let _ = writeln!(output, "| Period | Index |");
        let _ = writeln!(output, "|---|---|");
        for point in snapshot.engineer_trends.iter() {
            let _ = writeln!(output, "| {} | {:.1} |", point.label, point.value);
        }
    }

    let scores = melt::rank_companies(&snapshot.records);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Melt Index Leaders");
    if scores.is_empty() {
        let _ = writeln!(output, "No company records to score.");
    } else {
        for score in scores.iter().take(leaderboard_size) {
            let _ = writeln!(
                output,
                "- {} melt index {:.1} (retention {:.1}, engineer growth {:.1}, concentration {:.1}, headcount growth {:.1}, size {:.1})",
                score.company,
                score.melt_index,
                score.retention,
                score.engineer_growth,
                score.engineer_concentration,
                score.headcount_growth,
                score.size_rank
            );
        }
    }

    output
}
