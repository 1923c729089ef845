use super::{RunReport, RunStatus, StepStatus};
use itertools::Itertools;

/// Formats run reports into human-readable summaries for authors and the CLI.
pub struct ReportFormatter;

impl ReportFormatter {
    /// One line per step plus a closing status line.
    pub fn format(report: &RunReport) -> String {
        let steps = report
            .steps
            .iter()
            .map(|step| {
                let mut line = format!(
                    "[{}] {} ({:?})",
                    Self::status_label(step.status),
                    step.id,
                    step.duration
                );
                if let Some(error) = &step.error {
                    line.push_str(&format!(": {}", error));
                }
                line
            })
            .join("\n");

        let closing = match report.status {
            RunStatus::Completed => format!("run completed in {:?}", report.duration),
            RunStatus::Failed => format!(
                "run failed at step '{}' after {:?}",
                report.failed_step.as_deref().unwrap_or("?"),
                report.duration
            ),
        };

        if steps.is_empty() {
            closing
        } else {
            format!("{}\n{}", steps, closing)
        }
    }

    fn status_label(status: StepStatus) -> &'static str {
        match status {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }
}
