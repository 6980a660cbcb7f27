//! Plain-text rendering of a report snapshot for the CLI.

use super::types::{DomainState, ReportSnapshot};

pub fn format_report(snapshot: &ReportSnapshot, detailed: bool) -> String {
    let mut out = String::new();

    out.push_str("📈 DELIVERY METRICS REPORT\n");
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    out.push_str("🛰  DOMAIN STATUS\n");
    for status in &snapshot.domains {
        let label = match &status.state {
            DomainState::NotStarted => "not requested".to_string(),
            DomainState::Fetching => "fetching...".to_string(),
            DomainState::Succeeded => "ok".to_string(),
            DomainState::PartialFailed { failed } => {
                format!("partial ({} sub-fetches failed)", failed.len())
            }
            DomainState::Failed { error } => format!("FAILED: {error}"),
            DomainState::TimedOut { deadline_ms } => {
                format!("TIMED OUT after {deadline_ms}ms")
            }
        };
        out.push_str(&format!("   {:<9} {}\n", status.domain.to_string(), label));
    }
    if snapshot.cancelled {
        out.push_str("   (run was cancelled)\n");
    }
    out.push('\n');

    if let Some(cycle_time) = &snapshot.report.cycle_time {
        out.push_str("⏱  CYCLE TIME\n");
        for group in &cycle_time.groups {
            out.push_str(&format!(
                "   {}: {} cards, avg {} per card, blocked {:.2}%, developing {:.2}%\n",
                group.group,
                group.cards,
                format_duration_ms(group.avg_cycle_time_ms_per_card),
                group.blocked_percentage,
                group.developing_percentage,
            ));
        }
        if !cycle_time.skipped_cards.is_empty() {
            out.push_str(&format!(
                "   Skipped {} cards with malformed histories\n",
                cycle_time.skipped_cards.len()
            ));
        }
        if detailed && !cycle_time.classification.is_empty() {
            out.push_str("   Breakdown by field:\n");
            for entry in &cycle_time.classification {
                out.push_str(&format!(
                    "      {} [{}]: {} cards ({:.2}%)\n",
                    entry.name, entry.id, entry.cards, entry.percentage
                ));
            }
        }
        out.push('\n');
    }

    if let Some(velocity) = &snapshot.report.velocity {
        out.push_str("🚄 VELOCITY\n");
        for group in &velocity.groups {
            out.push_str(&format!(
                "   {}: {:.1} points ({} cards completed)\n",
                group.group, group.completed_points, group.completed_cards
            ));
        }
        out.push('\n');
    }

    if let Some(rework) = &snapshot.report.rework {
        out.push_str("🔁 REWORK\n");
        out.push_str(&format!(
            "   {}/{} cards reworked ({:.2}%)\n",
            rework.reworked_cards, rework.total_cards, rework.rework_percentage
        ));
        if detailed {
            for (state, count) in &rework.by_state {
                out.push_str(&format!("      {state}: {count} re-entries\n"));
            }
        }
        out.push('\n');
    }

    if let Some(frequency) = &snapshot.report.deployment_frequency {
        out.push_str("🚀 DEPLOYMENT FREQUENCY\n");
        out.push_str(&format!(
            "   {:.2}/day average across pipelines ({} deploys)\n",
            frequency.average_per_day, frequency.total_deploys
        ));
        for pipeline in &frequency.per_pipeline {
            out.push_str(&format!(
                "      {}: {} deploys ({:.2}/day)\n",
                pipeline.pipeline, pipeline.deploys, pipeline.per_day
            ));
        }
        out.push('\n');
    }

    if let Some(failure_rate) = &snapshot.report.change_failure_rate {
        out.push_str("💥 CHANGE FAILURE RATE\n");
        out.push_str(&format!(
            "   {:.1}% average\n",
            failure_rate.average_rate * 100.0
        ));
        for pipeline in &failure_rate.per_pipeline {
            out.push_str(&format!(
                "      {}: {:.1}% ({}/{} deploys failed)\n",
                pipeline.pipeline,
                pipeline.rate * 100.0,
                pipeline.failed,
                pipeline.failed + pipeline.passed
            ));
        }
        out.push('\n');
    }

    if let Some(lead_time) = &snapshot.report.lead_time_for_changes {
        out.push_str("⏳ LEAD TIME FOR CHANGES\n");
        out.push_str(&format!(
            "   {} overall ({} samples)\n",
            format_duration_ms(lead_time.overall_mean_ms),
            lead_time.samples
        ));
        if lead_time.unresolved_commits > 0 {
            out.push_str(&format!(
                "   {} deploys excluded (commit not resolvable)\n",
                lead_time.unresolved_commits
            ));
        }
        out.push('\n');
    }

    if let Some(recovery) = &snapshot.report.mean_time_to_recovery {
        out.push_str("🩹 MEAN TIME TO RECOVERY\n");
        out.push_str(&format!(
            "   {} across {} incidents (rule: {:?})\n",
            format_duration_ms(recovery.mean_recovery_ms),
            recovery.incidents,
            recovery.rule
        ));
        out.push('\n');
    }

    out
}

fn format_duration_ms(ms: f64) -> String {
    let hours = ms / 3_600_000.0;
    if hours >= 1.0 {
        let minutes = (ms % 3_600_000.0) / 60_000.0;
        format!("{:.0}h {:.0}m", hours.floor(), minutes)
    } else {
        format!("{:.0}m", ms / 60_000.0)
    }
}
