//! Table output formatting for CLI commands
//!
//! Phase tables for finished runs, the worker registry and the run history.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::{FinalResult, Phase, PhaseStatus, RunRecord, WorkerEntry};

use super::truncate;

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// One row per phase: status, elapsed time and a short summary.
    pub fn format_phases(&self, result: &FinalResult) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Phase", "Status", "Time", "Summary"]));

        for phase in Phase::ALL {
            let status = result.status_of(phase);
            let elapsed = result
                .phase_timings
                .get(phase.as_str())
                .map_or_else(|| "-".to_string(), |secs| format!("{secs:.2}s"));

            table.add_row(vec![
                Cell::new(phase.as_str()),
                self.status_cell(status),
                Cell::new(elapsed),
                Cell::new(phase_summary(result, phase)),
            ]);
        }

        table.to_string()
    }

    pub fn format_workers(&self, workers: &[WorkerEntry]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Worker", "Description"]));
        for worker in workers {
            table.add_row(vec![
                Cell::new(&worker.name).add_attribute(Attribute::Bold),
                Cell::new(truncate(&worker.description, 80)),
            ]);
        }
        table.to_string()
    }

    pub fn format_history(&self, records: &[RunRecord]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Run", "Finished", "Mode", "Agents", "Quality", "Judge", "Task"]));

        for record in records {
            let run_id = record.run_id.to_string();
            let judge = record
                .judge_score
                .map_or_else(|| "-".to_string(), |s| format!("{s:.1}"));
            let degraded = record
                .phase_status
                .values()
                .any(|s| matches!(s, PhaseStatus::Fallback | PhaseStatus::Failed));
            let quality = Cell::new(format!("{:.1}", record.quality_score));
            let quality = if self.use_colors && degraded {
                quality.fg(Color::Yellow)
            } else {
                quality
            };

            table.add_row(vec![
                Cell::new(&run_id[..8]),
                Cell::new(record.finished_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                Cell::new(&record.mode),
                Cell::new(record.assigned_agents.join(", ")),
                quality,
                Cell::new(judge),
                Cell::new(truncate(&record.task, 40)),
            ]);
        }

        table.to_string()
    }

    fn status_cell(&self, status: Option<PhaseStatus>) -> Cell {
        let Some(status) = status else {
            return Cell::new("-");
        };
        if self.use_colors {
            Cell::new(status.as_str()).fg(status_color(status))
        } else {
            Cell::new(format!("{} {}", status_icon(status), status.as_str()))
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if let Some(width) = self.max_width {
            table.set_width(width);
        }
        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).add_attribute(Attribute::Bold))
        .collect()
}

fn phase_summary(result: &FinalResult, phase: Phase) -> String {
    match phase {
        Phase::Analysis => format!(
            "{} complexity, {} steps",
            result.analysis.complexity, result.analysis.steps
        ),
        Phase::Routing => format!(
            "{} → {}",
            result.routing.decision.mode,
            result.routing.decision.assigned_to.join(", ")
        ),
        Phase::Execution => {
            let failed = result
                .execution
                .artifacts
                .get("failed_workers")
                .and_then(|v| v.as_array())
                .map_or(0, Vec::len);
            let status = if result.execution.is_success() {
                "success"
            } else {
                "error"
            };
            if failed == 0 {
                status.to_string()
            } else {
                format!("{status} ({failed} failed)")
            }
        }
        Phase::Progress => result.progress.action.as_str().to_string(),
        Phase::Quality => format!("score {:.1}", result.quality.score),
        Phase::Judge => {
            let terminal = result
                .metadata
                .get("judge_terminal")
                .and_then(|v| v.as_str())
                .unwrap_or("-");
            match result.quality.judge_score {
                Some(score) => format!("{terminal}, score {score:.1}"),
                None => terminal.to_string(),
            }
        }
    }
}

const fn status_color(status: PhaseStatus) -> Color {
    match status {
        PhaseStatus::Success => Color::Green,
        PhaseStatus::Cached => Color::Cyan,
        PhaseStatus::Fallback => Color::Yellow,
        PhaseStatus::Failed => Color::Red,
    }
}

const fn status_icon(status: PhaseStatus) -> &'static str {
    match status {
        PhaseStatus::Success => "✓",
        PhaseStatus::Cached => "◆",
        PhaseStatus::Fallback => "~",
        PhaseStatus::Failed => "✗",
    }
}

fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workers_table_lists_names() {
        let formatter = TableFormatter::with_config(false, Some(100));
        let rendered = formatter.format_workers(&[
            WorkerEntry::new("Researcher", "Finds sources"),
            WorkerEntry::new("Writer", "Drafts prose"),
        ]);

        assert!(rendered.contains("Researcher"));
        assert!(rendered.contains("Drafts prose"));
    }

    #[test]
    fn test_status_cell_without_colors_uses_icons() {
        let formatter = TableFormatter::with_config(false, None);
        let cell = formatter.status_cell(Some(PhaseStatus::Fallback));
        assert_eq!(cell.content(), "~ fallback");
        assert_eq!(formatter.status_cell(None).content(), "-");
    }
}
