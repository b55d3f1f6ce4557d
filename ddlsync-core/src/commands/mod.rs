//! Command implementations: plan, diff, validate.

pub mod diff;
pub mod plan;
pub mod validate;

use crate::config::DdlsyncConfig;
use crate::database::DatabaseAlterations;
use crate::error::Result;
use crate::schema::Schema;

/// Databases every MySQL server carries. They never take part in a comparison.
const SYSTEM_DATABASES: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

/// Parse the desired schema. Declaring a database outside the configured list is an error.
pub(crate) fn desired_schemas(config: &DdlsyncConfig, text: &str) -> Result<Vec<Schema>> {
    Schema::parse_all(text, &config.server, &config.schema.databases)
}

/// Parse the observed schema. Databases outside the configured list, and system
/// databases, are left out.
pub(crate) fn observed_schemas(config: &DdlsyncConfig, text: &str) -> Result<Vec<Schema>> {
    let mut schemas = Schema::parse_all(text, &config.server, &[])?;
    schemas.retain(|s| {
        let keep = !SYSTEM_DATABASES.contains(&s.name())
            && (config.schema.databases.is_empty()
                || config.schema.databases.iter().any(|d| d == s.name()));
        if !keep {
            log::debug!("Skipping observed database; name={}", s.name());
        }
        keep
    });
    Ok(schemas)
}

/// Compare an observed schema with a desired one.
pub(crate) fn compare(
    config: &DdlsyncConfig,
    from_text: &str,
    to_text: &str,
) -> Result<DatabaseAlterations> {
    let from = observed_schemas(config, from_text)?;
    let to = desired_schemas(config, to_text)?;
    log::debug!(
        "Comparing schemas; observed={}, desired={}",
        from.len(),
        to.len()
    );
    Ok(DatabaseAlterations::new(&from, &to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaSettings;

    fn config(databases: &[&str]) -> DdlsyncConfig {
        DdlsyncConfig {
            schema: SchemaSettings {
                databases: databases.iter().map(|d| d.to_string()).collect(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_observed_skips_system_databases() {
        let text = "CREATE DATABASE mysql; CREATE DATABASE app;";
        let schemas = observed_schemas(&config(&[]), text).unwrap();
        let names: Vec<&str> = schemas.iter().map(Schema::name).collect();
        assert_eq!(names, vec!["app"]);
    }

    #[test]
    fn test_observed_filtered_by_database_list() {
        let text = "CREATE DATABASE app; CREATE DATABASE audit;";
        let schemas = observed_schemas(&config(&["audit"]), text).unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name(), "audit");
    }

    #[test]
    fn test_desired_outside_database_list_is_error() {
        let text = "CREATE DATABASE app; CREATE DATABASE audit;";
        assert!(desired_schemas(&config(&["audit"]), text).is_err());
    }
}
