//! Summary tables for teardown reports and stack listings

use crate::aws::StackSummaryRow;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use pipewatch_common::{StepOutcome, TeardownReport};

fn outcome_cell(outcome: StepOutcome) -> Cell {
    let color = match outcome {
        StepOutcome::Ok => Color::Green,
        StepOutcome::Skipped => Color::DarkGrey,
        StepOutcome::Failed => Color::Red,
    };
    Cell::new(outcome.as_str()).fg(color)
}

/// Build the teardown summary table
pub fn render_teardown_report(report: &TeardownReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![Cell::new("Step"), Cell::new("Result"), Cell::new("Detail")]);

    for step in &report.steps {
        table.add_row(vec![
            Cell::new(&step.name),
            outcome_cell(step.outcome),
            Cell::new(step.detail.as_deref().unwrap_or("")),
        ]);
    }
    table
}

/// Print the teardown summary to stdout
pub fn print_teardown_report(report: &TeardownReport) {
    println!("\n=== Teardown Summary ===\n");
    println!("{}", render_teardown_report(report));

    let failed = report.count(StepOutcome::Failed);
    if failed > 0 {
        println!("\n{failed} step(s) failed. Re-run teardown after fixing the cause.");
    } else if report.all_skipped() {
        println!("\nNothing to tear down.");
    }
}

/// Build the stack listing table
pub fn render_remaining_stacks(rows: &[StackSummaryRow]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![Cell::new("Stack"), Cell::new("Status"), Cell::new("Created")]);

    for row in rows {
        table.add_row(vec![
            Cell::new(&row.name),
            Cell::new(&row.status),
            Cell::new(
                row.created
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_default(),
            ),
        ]);
    }
    table
}

/// Print a stack listing to stdout
pub fn print_remaining_stacks(rows: &[StackSummaryRow]) {
    if rows.is_empty() {
        println!("No pipewatch stacks found.");
        return;
    }
    println!("{}", render_remaining_stacks(rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pipewatch_common::StepResult;

    #[test]
    fn test_report_table_lists_every_step() {
        let mut report = TeardownReport::new();
        report.push(StepResult::ok("destroy MainLambdaStack"));
        report.push(StepResult::skipped("clean registry pipeline-agent", "registry not found"));
        report.push(StepResult::failed("destroy SecretManagerStack", "DELETE_FAILED"));

        let rendered = render_teardown_report(&report).to_string();
        assert!(rendered.contains("destroy MainLambdaStack"));
        assert!(rendered.contains("registry not found"));
        assert!(rendered.contains("DELETE_FAILED"));
    }

    #[test]
    fn test_stack_table() {
        let rows = vec![StackSummaryRow {
            name: "AgentCoreStack".to_string(),
            status: "CREATE_COMPLETE".to_string(),
            created: Some(chrono::Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()),
        }];

        let rendered = render_remaining_stacks(&rows).to_string();
        assert!(rendered.contains("AgentCoreStack"));
        assert!(rendered.contains("2026-01-02 03:04:05 UTC"));
    }
}
