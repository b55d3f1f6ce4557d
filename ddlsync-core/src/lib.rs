//! Declarative MySQL schema reconciliation.
//!
//! Given the DDL of an observed schema and the DDL of a desired one, ddlsync
//! computes the dependency-ordered `CREATE`/`ALTER`/`DROP` statements that turn
//! the first into the second, together with a human-readable diff.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ddlsync_core::config::{CliOverrides, DdlsyncConfig};
//! use ddlsync_core::Ddlsync;
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DdlsyncConfig::load(None, &CliOverrides::default())?;
//! let ddlsync = Ddlsync::new(config);
//! let observed = std::fs::read_to_string("observed.sql")?;
//! let desired = std::fs::read_to_string("schema.sql")?;
//! let report = ddlsync.plan(&observed, &desired)?;
//! for statement in &report.statements {
//!     println!("{}", statement);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Configuration loading (TOML, env vars, CLI overrides)
//! - [`lexer`]: Tokenizer over MySQL DDL text
//! - [`parser`]: `CREATE DATABASE`, `CREATE TABLE` and `USE` statements
//! - [`schema`]: Normalization of parsed statements into comparable schemas
//! - [`alteration`]: The shared shape of every classified change
//! - [`column`], [`primary`], [`unique`], [`index`], [`foreign`], [`check`],
//!   [`table_option`], [`database_option`]: Per-element classifiers
//! - [`table`]: Table comparison and cross-table dependency wiring
//! - [`database`]: Database comparison, the top of the tree
//! - [`dependency`]: Dependency graph and topological ordering
//! - [`commands`]: Command implementations
//! - [`error`]: Error types

pub mod alteration;
pub mod check;
pub mod column;
pub mod commands;
pub mod config;
pub mod database;
pub mod database_option;
pub mod dependency;
pub mod error;
pub mod foreign;
pub mod index;
pub mod lexer;
pub mod parser;
pub mod primary;
pub mod schema;
pub mod table;
pub mod table_option;
pub mod unique;

use config::DdlsyncConfig;
use error::Result;
use schema::Schema;

pub use commands::diff::{ChangeSummary, DiffReport};
pub use commands::plan::PlanReport;
pub use commands::validate::{DatabaseSummary, ValidateReport};
pub use config::CliOverrides;
pub use database::DatabaseAlterations;
pub use error::DdlsyncError;

/// Main entry point for the ddlsync library.
///
/// Holds the configuration resolved once at startup and runs commands against
/// schema text.
pub struct Ddlsync {
    pub config: DdlsyncConfig,
}

impl Ddlsync {
    pub fn new(config: DdlsyncConfig) -> Self {
        Self { config }
    }

    /// Parse and normalize a desired schema.
    pub fn parse(&self, text: &str) -> Result<Vec<Schema>> {
        commands::desired_schemas(&self.config, text)
    }

    /// Compare two schemas and return the full alteration tree.
    pub fn compare(&self, from_text: &str, to_text: &str) -> Result<DatabaseAlterations> {
        commands::compare(&self.config, from_text, to_text)
    }

    /// Statements turning the observed schema into the desired one.
    pub fn plan(&self, from_text: &str, to_text: &str) -> Result<PlanReport> {
        commands::plan::execute(&self.config, from_text, to_text)
    }

    /// Differences between the observed and the desired schema.
    pub fn diff(&self, from_text: &str, to_text: &str) -> Result<DiffReport> {
        commands::diff::execute(&self.config, from_text, to_text)
    }

    /// Check that a schema parses and normalizes.
    pub fn validate(&self, text: &str) -> Result<ValidateReport> {
        commands::validate::execute(&self.config, text)
    }
}
