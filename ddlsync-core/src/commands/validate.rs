//! Parse and normalize a schema file without comparing it to anything.

use serde::Serialize;

use crate::config::DdlsyncConfig;
use crate::error::Result;

/// Counts for one database of a validated schema.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseSummary {
    pub name: String,
    pub tables: usize,
    pub columns: usize,
}

/// Report produced by the validate command.
#[derive(Debug, Serialize)]
pub struct ValidateReport {
    pub databases: Vec<DatabaseSummary>,
    /// The schema in canonical form.
    pub normalized: String,
}

/// Execute the validate command.
pub fn execute(config: &DdlsyncConfig, text: &str) -> Result<ValidateReport> {
    let schemas = super::desired_schemas(config, text)?;

    let databases = schemas
        .iter()
        .map(|s| DatabaseSummary {
            name: s.name().to_string(),
            tables: s.tables.len(),
            columns: s.tables.iter().map(|t| t.columns().len()).sum(),
        })
        .collect();
    let normalized = schemas
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(ValidateReport {
        databases,
        normalized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_counts() {
        let report = execute(
            &DdlsyncConfig::default(),
            "CREATE DATABASE app; USE app;
             CREATE TABLE a (id INT, name VARCHAR(10));
             CREATE TABLE b (id INT);",
        )
        .unwrap();
        assert_eq!(report.databases.len(), 1);
        assert_eq!(report.databases[0].name, "app");
        assert_eq!(report.databases[0].tables, 2);
        assert_eq!(report.databases[0].columns, 3);
        assert!(report.normalized.starts_with("CREATE DATABASE `app`;"));
    }

    #[test]
    fn test_validate_table_without_database_fails() {
        let err = execute(&DdlsyncConfig::default(), "CREATE TABLE t (id INT);").unwrap_err();
        assert!(matches!(err, crate::error::DdlsyncError::ValidationError(_)));
    }
}
