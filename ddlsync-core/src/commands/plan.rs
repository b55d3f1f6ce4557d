//! Compute the statements that turn the observed schema into the desired one.

use serde::Serialize;

use crate::config::DdlsyncConfig;
use crate::error::Result;

/// Report produced by the plan command.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    /// Statements to execute, in order.
    pub statements: Vec<String>,
    /// Diff of the two schemas, one entry per database or table.
    pub diff: Vec<String>,
    /// Whether any statement is needed.
    pub has_changes: bool,
}

/// Execute the plan command.
pub fn execute(config: &DdlsyncConfig, from_text: &str, to_text: &str) -> Result<PlanReport> {
    let alterations = super::compare(config, from_text, to_text)?;
    let statements = alterations.statements();
    let diff = alterations.diff();
    log::info!("Plan computed; statements={}", statements.len());

    Ok(PlanReport {
        has_changes: !statements.is_empty(),
        statements,
        diff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_up_to_date() {
        let ddl = "CREATE DATABASE app; USE app; CREATE TABLE t (id INT PRIMARY KEY);";
        let report = execute(&DdlsyncConfig::default(), ddl, ddl).unwrap();
        assert!(!report.has_changes);
        assert!(report.statements.is_empty());
        assert_eq!(report.diff.len(), 2);
    }

    #[test]
    fn test_plan_serializes() {
        let report = execute(
            &DdlsyncConfig::default(),
            "CREATE DATABASE app;",
            "CREATE DATABASE app; USE app; CREATE TABLE t (id INT);",
        )
        .unwrap();
        assert!(report.has_changes);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["has_changes"], true);
        assert_eq!(json["statements"].as_array().map(Vec::len), Some(1));
    }
}
