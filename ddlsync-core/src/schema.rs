//! Schema normalization.
//!
//! Turns parsed statements into one [`Schema`] per database, canonicalized so that
//! DDL written by hand and DDL printed by `SHOW CREATE TABLE` compare equal when they
//! mean the same thing.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::GlobalConfig;
use crate::error::{DdlsyncError, Result};
use crate::parser::{
    collapse_whitespace, parse_str, CheckConstraintDefinition, ColumnDefinition,
    CreateDatabaseStatement, CreateDefinition, CreateTableStatement, DataType, DatabaseOptions,
    ForeignKeyDefinition, FullTextIndexDefinition, IndexDefinition, KeyPart,
    PrimaryKeyDefinition, Statement, TableOptions, UniqueKeyDefinition,
};

/// One database and its tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub database: CreateDatabaseStatement,
    pub tables: Vec<CreateTableStatement>,
}

impl Schema {
    /// Parse and normalize DDL text. When `allowed_databases` is non-empty, only those
    /// databases may be declared.
    pub fn parse_all(
        text: &str,
        config: &GlobalConfig,
        allowed_databases: &[String],
    ) -> Result<Vec<Schema>> {
        let statements = parse_str(text)?;
        normalize_statements(statements, config, allowed_databases)
    }

    pub fn name(&self) -> &str {
        &self.database.db_name
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.database)?;
        for table in &self.tables {
            write!(f, "\n{}", table)?;
        }
        Ok(())
    }
}

/// Validate statement context and normalize every statement. Schemas are returned
/// sorted by database name.
pub fn normalize_statements(
    statements: Vec<Statement>,
    config: &GlobalConfig,
    allowed_databases: &[String],
) -> Result<Vec<Schema>> {
    let mut current_db = String::new();
    let mut schemas: BTreeMap<String, Schema> = BTreeMap::new();

    for statement in statements {
        match statement {
            Statement::Use(s) => {
                if !schemas.contains_key(&s.db_name) {
                    return Err(DdlsyncError::ValidationError(format!(
                        "found USE statement with undeclared database: {}, statement: {}",
                        s.db_name, s
                    )));
                }
                current_db = s.db_name;
            }
            Statement::CreateDatabase(mut s) => {
                if !allowed_databases.is_empty() && !allowed_databases.contains(&s.db_name) {
                    return Err(DdlsyncError::ValidationError(format!(
                        "found CREATE DATABASE statement with unexpected name: {}, statement: {}",
                        s.db_name, s
                    )));
                }
                if schemas.contains_key(&s.db_name) {
                    log::warn!("Database declared twice, keeping the first; db={}", s.db_name);
                    continue;
                }
                resolve_database_options(&mut s.options, config);
                schemas.insert(
                    s.db_name.clone(),
                    Schema {
                        database: s,
                        tables: Vec::new(),
                    },
                );
            }
            Statement::CreateTable(mut s) => {
                if s.db_name.is_empty() {
                    if current_db.is_empty() {
                        return Err(DdlsyncError::ValidationError(format!(
                            "found CREATE TABLE statement without database name, statement: {}",
                            s.head()
                        )));
                    }
                    s.db_name = current_db.clone();
                }
                let Some(schema) = schemas.get_mut(&s.db_name) else {
                    return Err(DdlsyncError::ValidationError(format!(
                        "found CREATE TABLE statement with undeclared database: {}, statement: {}",
                        s.db_name,
                        s.head()
                    )));
                };
                resolve_table_options(&mut s.options, &schema.database.options, config);
                normalize_table(&mut s, config);
                log::debug!("Normalized table; table={}", s.qualified_name());
                schema.tables.push(s);
            }
        }
    }

    Ok(schemas.into_values().collect())
}

/// Fill in the effective character set and collation of a database.
fn resolve_database_options(options: &mut DatabaseOptions, config: &GlobalConfig) {
    options.actual_charset = if options.default_charset.is_empty() {
        config.character_set_server.clone()
    } else {
        options.default_charset.clone()
    };
    options.actual_collate = if !options.default_collate.is_empty() {
        options.default_collate.clone()
    } else if !options.default_charset.is_empty() {
        config
            .default_collation_for(&options.default_charset)
            .unwrap_or(&config.collation_server)
            .to_string()
    } else {
        config.collation_server.clone()
    };
}

/// Fill in the database defaults and the effective character set and collation of a table.
fn resolve_table_options(
    options: &mut TableOptions,
    database: &DatabaseOptions,
    config: &GlobalConfig,
) {
    options.database_charset = database.default_charset.clone();
    options.database_collate = database.default_collate.clone();

    options.actual_charset = if options.default_charset.is_empty() {
        database.actual_charset.clone()
    } else {
        options.default_charset.clone()
    };
    options.actual_collate = if !options.default_collate.is_empty() {
        options.default_collate.clone()
    } else if !options.default_charset.is_empty() {
        config
            .default_collation_for(&options.default_charset)
            .map(str::to_string)
            .unwrap_or_else(|| database.actual_collate.clone())
    } else {
        database.actual_collate.clone()
    };

    if options.engine.eq_ignore_ascii_case("InnoDB") {
        options.engine.clear();
    }
}

/// Display width of an integer type when none is given.
fn default_integer_width(name: &str, unsigned: bool) -> Option<&'static str> {
    let width = match (name, unsigned) {
        ("BIT", _) => "1",
        ("TINYINT", false) => "4",
        ("TINYINT", true) => "3",
        ("SMALLINT", false) => "6",
        ("SMALLINT", true) => "5",
        ("MEDIUMINT", false) => "9",
        ("MEDIUMINT", true) => "8",
        ("INT", false) => "11",
        ("INT", true) => "10",
        ("BIGINT", _) => "20",
        _ => return None,
    };
    Some(width)
}

fn normalize_data_type(data_type: &mut DataType) {
    match data_type {
        DataType::Integer {
            name,
            field_len,
            unsigned,
            zerofill,
        } => {
            if default_integer_width(name, *unsigned) == Some(field_len.as_str()) {
                field_len.clear();
            }
            // BOOL is a synonym of TINYINT(1)
            if name.as_str() == "TINYINT" && field_len.as_str() == "1" && !*unsigned && !*zerofill {
                *name = "BOOL".to_string();
                field_len.clear();
            }
        }
        DataType::FixedPoint {
            field_len,
            field_scale,
            ..
        } => {
            if field_scale.as_str() == "0" {
                field_scale.clear();
            }
            if field_len.as_str() == "10" && field_scale.is_empty() {
                field_len.clear();
            }
        }
        _ => {}
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && s.parse::<f64>().is_ok()
}

fn normalize_column(column: &mut ColumnDefinition, table: &TableOptions, config: &GlobalConfig) {
    normalize_data_type(&mut column.data_type);

    let options = &mut column.options;
    if column.data_type.name() == "BOOL" {
        match options.default.as_str() {
            "'0'" | "0" => options.default = "FALSE".to_string(),
            "'1'" | "1" => options.default = "TRUE".to_string(),
            _ => {}
        }
    }
    if column.data_type.is_numeric() {
        let unquoted = options
            .default
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .filter(|s| is_number(s))
            .map(str::to_string);
        if let Some(v) = unquoted {
            options.default = v;
        }
    }

    match &mut column.data_type {
        DataType::String(s) => {
            s.default_charset = table.actual_charset.clone();
            s.default_collation = table.actual_collate.clone();
            if s.charset == s.default_charset {
                s.charset.clear();
            }
            if s.collation == s.default_collation {
                s.collation.clear();
            }
            if !s.charset.is_empty() && s.collation.is_empty() {
                if let Some(c) = config.default_collation_for(&s.charset) {
                    s.collation = c.to_string();
                }
            }
        }
        DataType::StringList {
            charset, collation, ..
        } => {
            if *charset == table.actual_charset {
                charset.clear();
            }
            if *collation == table.actual_collate {
                collation.clear();
            }
        }
        _ => {}
    }

    if options.nullability == "NULL" {
        options.nullability.clear();
    }
    if options.default == "NULL" {
        options.default.clear();
    }
}

fn elide_ascending(parts: &mut [KeyPart]) {
    for p in parts.iter_mut().filter(|p| p.order == "ASC") {
        p.order.clear();
    }
}

/// Remove every layer of parentheses that encloses the whole expression.
pub fn strip_outermost_parentheses(s: &str) -> &str {
    let mut s = s.trim();
    loop {
        if !s.starts_with('(') || !s.ends_with(')') {
            return s;
        }
        let mut depth = 0usize;
        let mut closes_at = None;
        for (i, c) in s.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    if depth == 0 {
                        return s;
                    }
                    depth -= 1;
                    if depth == 0 {
                        closes_at = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        if closes_at != Some(s.len() - 1) {
            return s;
        }
        s = s[1..s.len() - 1].trim();
    }
}

fn normalize_table(table: &mut CreateTableStatement, config: &GlobalConfig) {
    let mut columns: Vec<ColumnDefinition> = Vec::new();
    let mut primary_keys: Vec<PrimaryKeyDefinition> = Vec::new();
    let mut unique_keys: Vec<UniqueKeyDefinition> = Vec::new();
    let mut indexes: Vec<IndexDefinition> = Vec::new();
    let mut fulltexts: Vec<FullTextIndexDefinition> = Vec::new();
    let mut foreign_keys: Vec<ForeignKeyDefinition> = Vec::new();
    let mut checks: Vec<CheckConstraintDefinition> = Vec::new();

    for definition in std::mem::take(&mut table.definitions) {
        match definition {
            CreateDefinition::Column(c) => columns.push(c),
            CreateDefinition::PrimaryKey(d) => primary_keys.push(d),
            CreateDefinition::UniqueKey(d) => unique_keys.push(d),
            CreateDefinition::Index(d) => indexes.push(d),
            CreateDefinition::FullTextIndex(d) => fulltexts.push(d),
            CreateDefinition::ForeignKey(d) => foreign_keys.push(d),
            CreateDefinition::Check(d) => checks.push(d),
        }
    }

    for column in &mut columns {
        normalize_column(column, &table.options, config);

        let key_part = KeyPart::column(&column.name);
        if column.options.primary {
            primary_keys.push(PrimaryKeyDefinition {
                key_parts: vec![key_part.clone()],
                ..Default::default()
            });
            column.options.primary = false;
        }
        if column.options.unique {
            unique_keys.push(UniqueKeyDefinition {
                key_parts: vec![key_part.clone()],
                ..Default::default()
            });
            column.options.unique = false;
        }
        if let Some(reference) = column.options.reference.take() {
            foreign_keys.push(ForeignKeyDefinition {
                key_parts: vec![key_part],
                reference,
                ..Default::default()
            });
        }
        if let Some(check) = column.options.check.take() {
            checks.push(check);
        }
    }

    primary_keys.iter_mut().for_each(|d| elide_ascending(&mut d.key_parts));
    unique_keys.iter_mut().for_each(|d| elide_ascending(&mut d.key_parts));
    indexes.iter_mut().for_each(|d| elide_ascending(&mut d.key_parts));
    fulltexts.iter_mut().for_each(|d| elide_ascending(&mut d.key_parts));
    foreign_keys.iter_mut().for_each(|d| elide_ascending(&mut d.key_parts));

    for pk in &primary_keys {
        for column in columns
            .iter_mut()
            .filter(|c| pk.key_parts.iter().any(|p| p.column == c.name))
        {
            column.options.nullability = "NOT NULL".to_string();
        }
    }

    // The key name of a unique key is its index name, else its constraint name.
    // SHOW CREATE TABLE never prints the constraint name.
    for uk in &mut unique_keys {
        if uk.index_name.is_empty() {
            uk.index_name = std::mem::take(&mut uk.constraint_name);
        } else {
            uk.constraint_name.clear();
        }
    }

    // The key name of a foreign key is its constraint name, else its index name.
    for fk in &mut foreign_keys {
        if !fk.constraint_name.is_empty() {
            fk.index_name = fk.constraint_name.clone();
        }
    }

    // Indexes backing a foreign key are part of the foreign key.
    indexes.retain(|idx| {
        let backing = foreign_keys
            .iter_mut()
            .find(|fk| fk.key_parts == idx.key_parts);
        match backing {
            Some(fk) => {
                fk.index_name = idx.index_name.clone();
                false
            }
            None => true,
        }
    });

    for fk in &mut foreign_keys {
        let options = &mut fk.reference.options;
        for action in [&mut options.on_delete, &mut options.on_update] {
            if matches!(action.as_str(), "RESTRICT" | "NO ACTION") {
                action.clear();
            }
        }
    }

    for check in &mut checks {
        check.check = collapse_whitespace(strip_outermost_parentheses(&check.check));
        if check.enforcement == "ENFORCED" {
            check.enforcement.clear();
        }
    }

    let definitions = &mut table.definitions;
    definitions.extend(columns.into_iter().map(CreateDefinition::Column));
    definitions.extend(primary_keys.into_iter().map(CreateDefinition::PrimaryKey));
    definitions.extend(unique_keys.into_iter().map(CreateDefinition::UniqueKey));
    definitions.extend(foreign_keys.into_iter().map(CreateDefinition::ForeignKey));
    definitions.extend(checks.into_iter().map(CreateDefinition::Check));
    definitions.extend(indexes.into_iter().map(CreateDefinition::Index));
    definitions.extend(fulltexts.into_iter().map(CreateDefinition::FullTextIndex));
}
