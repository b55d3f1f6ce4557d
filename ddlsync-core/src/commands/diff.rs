//! Compare two schemas and summarize what differs.

use serde::Serialize;

use crate::alteration::{Alteration, Change};
use crate::config::DdlsyncConfig;
use crate::error::Result;

/// One changed database or table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChangeSummary {
    pub database: String,
    /// `None` for the database itself.
    pub table: Option<String>,
    /// `added`, `dropped`, `modified` or `renamed`.
    pub change: String,
}

/// Report produced by the diff command.
#[derive(Debug, Serialize)]
pub struct DiffReport {
    /// Diff lines, one entry per database or table.
    pub diff: Vec<String>,
    /// Databases and tables that are not retained as they are.
    pub changes: Vec<ChangeSummary>,
    /// Whether the schemas differ at all.
    pub has_changes: bool,
}

/// Execute the diff command.
pub fn execute(config: &DdlsyncConfig, from_text: &str, to_text: &str) -> Result<DiffReport> {
    let alterations = super::compare(config, from_text, to_text)?;

    let mut changes = Vec::new();
    for db in alterations.alterations() {
        if db.key().change != Change::Retained {
            changes.push(ChangeSummary {
                database: db.name().to_string(),
                table: None,
                change: db.key().change.to_string(),
            });
        }
        // The tables of an added or dropped database go with it.
        if matches!(db.key().change, Change::Added | Change::Dropped) {
            continue;
        }
        for t in db.tables.alterations() {
            if t.key().change == Change::Retained {
                continue;
            }
            let table = match (t.from_name(), t.to_name()) {
                (Some(from), Some(to)) if from != to => format!("{} -> {}", from, to),
                (_, Some(name)) | (Some(name), None) => name.to_string(),
                (None, None) => continue,
            };
            changes.push(ChangeSummary {
                database: db.name().to_string(),
                table: Some(table),
                change: t.key().change.to_string(),
            });
        }
    }

    Ok(DiffReport {
        diff: alterations.diff(),
        has_changes: !changes.is_empty(),
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_summarizes_tables() {
        let report = execute(
            &DdlsyncConfig::default(),
            "CREATE DATABASE app; USE app;
             CREATE TABLE a (id INT); CREATE TABLE b (id INT); CREATE TABLE c (id INT);",
            "CREATE DATABASE app; USE app;
             CREATE TABLE a (id INT, v INT); CREATE TABLE c (id INT); CREATE TABLE d (x INT);",
        )
        .unwrap();
        assert!(report.has_changes);
        let summary: Vec<(Option<&str>, &str)> = report
            .changes
            .iter()
            .map(|c| (c.table.as_deref(), c.change.as_str()))
            .collect();
        assert!(summary.contains(&(Some("a"), "modified")));
        assert!(summary.contains(&(Some("b"), "dropped")));
        assert!(summary.contains(&(Some("d"), "added")));
        assert!(!summary.iter().any(|(t, _)| *t == Some("c")));
    }

    #[test]
    fn test_diff_renamed_table() {
        let report = execute(
            &DdlsyncConfig::default(),
            "CREATE DATABASE app; USE app; CREATE TABLE a (id INT);",
            "CREATE DATABASE app; USE app; CREATE TABLE z (id INT);",
        )
        .unwrap();
        assert_eq!(
            report.changes,
            vec![ChangeSummary {
                database: "app".to_string(),
                table: Some("a -> z".to_string()),
                change: "renamed".to_string(),
            }]
        );
    }

    #[test]
    fn test_diff_added_database_is_one_change() {
        let report = execute(
            &DdlsyncConfig::default(),
            "",
            "CREATE DATABASE app; USE app; CREATE TABLE a (id INT);",
        )
        .unwrap();
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].table, None);
        assert_eq!(report.changes[0].change, "added");
    }
}
