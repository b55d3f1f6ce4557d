//! Terminal output formatting for all ddlsync commands.
//! Uses comfy-table for tabular output and colored for
//! change-aware terminal styling.

use colored::Colorize;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use serde::Serialize;

use ddlsync_core::error::DdlsyncError;
use ddlsync_core::{DiffReport, PlanReport, ValidateReport};

/// Print any report as pretty JSON on stdout.
pub fn print_json<T: Serialize>(report: &T) -> Result<(), DdlsyncError> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Color one diff line by its change marker.
fn color_line(line: &str) -> String {
    match line.chars().next() {
        Some('+') => line.green().to_string(),
        Some('-') => line.red().to_string(),
        Some('~') => line.yellow().to_string(),
        Some('@') => line.cyan().to_string(),
        _ => line.to_string(),
    }
}

fn print_diff_lines(diff: &[String]) {
    for entry in diff {
        for line in entry.lines() {
            println!("{}", color_line(line));
        }
        println!();
    }
}

/// Print the diff and the statements of a plan.
pub fn print_plan_report(report: &PlanReport, quiet: bool) {
    if !quiet {
        println!("{}", "Schema diff:".bold());
        println!();
        print_diff_lines(&report.diff);
    }

    if !report.has_changes {
        println!(
            "{}",
            "Your database schema is up-to-date! No change required."
                .green()
                .bold()
        );
        return;
    }

    if !quiet {
        println!("{}", "Statements to execute:".bold());
        println!();
    }
    for statement in &report.statements {
        println!("{}", statement);
    }
}

/// Print a diff report with a summary table of changed databases and tables.
pub fn print_diff_report(report: &DiffReport, quiet: bool) {
    if !report.has_changes {
        println!("{}", "No schema differences detected.".green().bold());
        return;
    }

    print_diff_lines(&report.diff);
    if quiet {
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Database"),
            Cell::new("Table"),
            Cell::new("Change"),
        ]);

    for change in &report.changes {
        table.add_row(vec![
            Cell::new(&change.database),
            Cell::new(change.table.as_deref().unwrap_or("")),
            Cell::new(format_change(&change.change)),
        ]);
    }

    println!(
        "{}",
        format!("Found {} schema difference(s):", report.changes.len())
            .yellow()
            .bold()
    );
    println!("{table}");
}

/// Return a colored string representation of a change.
fn format_change(change: &str) -> String {
    match change {
        "added" => change.green().to_string(),
        "dropped" => change.red().to_string(),
        "modified" | "renamed" => change.yellow().to_string(),
        _ => change.to_string(),
    }
}

/// Print a validate report: a table of databases, then the normalized schema.
pub fn print_validate_report(report: &ValidateReport, quiet: bool) {
    if report.databases.is_empty() {
        println!("{}", "No databases declared.".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Database"),
            Cell::new("Tables"),
            Cell::new("Columns"),
        ]);

    for db in &report.databases {
        table.add_row(vec![
            Cell::new(&db.name),
            Cell::new(db.tables),
            Cell::new(db.columns),
        ]);
    }

    println!("{}", "Schema is valid.".green().bold());
    println!("{table}");

    if !quiet {
        println!();
        println!("{}", report.normalized.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_line_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(color_line("+ `a` INT"), "+ `a` INT");
        assert_eq!(color_line("  `b` INT"), "  `b` INT");
    }

    #[test]
    fn test_format_change_plain() {
        colored::control::set_override(false);
        assert_eq!(format_change("renamed"), "renamed");
    }
}
