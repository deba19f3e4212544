//! Report and duration formatting shared by the UI implementations.

use std::time::Duration;

use crate::runner::{RunOutcome, RunReport};
use crate::steps::StepStatus;

use super::ProvisionTheme;

/// Format a duration for display: `850ms`, `4.2s`, `3m 05s`, `1h 02m`.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        return format!("{}ms", millis);
    }
    let secs = duration.as_secs();
    if secs < 60 {
        return format!("{:.1}s", duration.as_secs_f64());
    }
    if secs < 3600 {
        return format!("{}m {:02}s", secs / 60, secs % 60);
    }
    format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
}

/// Lines of the end-of-run summary box.
pub fn summary_lines(report: &RunReport, theme: &ProvisionTheme) -> Vec<String> {
    let b = &theme.border;
    let width = report
        .results
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(20);

    let mut lines = vec![format!(
        "  {} {}",
        b.apply_to("┌─"),
        b.apply_to("Summary ──────────────────────────")
    )];

    for result in &report.results {
        let right = match result.status {
            StepStatus::Skipped => theme
                .dim
                .apply_to(result.detail.as_deref().unwrap_or("already done"))
                .to_string(),
            _ => theme
                .duration
                .apply_to(format_duration(result.duration))
                .to_string(),
        };
        lines.push(format!(
            "  {} {} {:<width$} {}",
            b.apply_to("│"),
            theme.status_icon(result.status),
            result.name,
            right,
            width = width,
        ));
        if let Some(failure) = &result.failure {
            lines.push(format!(
                "  {}   {}",
                b.apply_to("│"),
                theme
                    .error
                    .apply_to(format!("{}: {}", failure.kind, failure.message))
            ));
        }
    }

    lines.push(format!(
        "  {}",
        b.apply_to("├────────────────────────────────────")
    ));
    lines.push(format!(
        "  {} Total: {} {} {} run {} {} skipped",
        b.apply_to("│"),
        theme.duration.apply_to(format_duration(report.duration())),
        theme.dim.apply_to("·"),
        report.count(StepStatus::Succeeded) + report.count(StepStatus::Failed),
        theme.dim.apply_to("·"),
        report.count(StepStatus::Skipped),
    ));
    lines.push(format!(
        "  {}",
        b.apply_to("└────────────────────────────────────")
    ));
    lines
}

/// One-line verdict for a finished run.
pub fn outcome_line(report: &RunReport) -> String {
    match &report.outcome {
        RunOutcome::Completed => "Provisioning complete".to_string(),
        RunOutcome::Failed { step } => format!("Provisioning failed at step '{}'", step),
        RunOutcome::Cancelled => "Provisioning cancelled".to_string(),
    }
}

/// What the operator can do after a run that stopped early.
pub fn resume_hint(report: &RunReport) -> Option<&'static str> {
    match report.outcome {
        RunOutcome::Completed => None,
        RunOutcome::Failed { .. } | RunOutcome::Cancelled => {
            Some("Run `provision run` again to continue. Finished steps are skipped.")
        }
    }
}
