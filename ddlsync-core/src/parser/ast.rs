//! Statement and definition nodes produced by the parser.

use std::fmt;

use super::data_type::DataType;
use super::options::{DatabaseOptions, IndexOptions, TableOptions};
use crate::alteration::align;

/// Indentation used when rendering statement bodies.
pub const INDENT: usize = 4;

/// Backtick-quote an identifier.
pub fn quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn opt(value: &str, render: impl FnOnce(&str) -> String) -> String {
    if value.is_empty() {
        String::new()
    } else {
        render(value)
    }
}

fn indent(lines: Vec<String>) -> Vec<String> {
    let pad = " ".repeat(INDENT);
    lines.into_iter().map(|l| format!("{}{}", pad, l)).collect()
}

/// Collapse runs of whitespace into single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A top-level statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateDatabase(CreateDatabaseStatement),
    CreateTable(CreateTableStatement),
    Use(UseStatement),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateDatabase(s) => s.fmt(f),
            Statement::CreateTable(s) => s.fmt(f),
            Statement::Use(s) => s.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateDatabaseStatement {
    pub if_not_exists: bool,
    pub db_name: String,
    pub options: DatabaseOptions,
}

impl fmt::Display for CreateDatabaseStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE DATABASE {}", quote(&self.db_name))?;
        let options = indent(self.options.strings());
        if !options.is_empty() {
            write!(f, "\n{}", options.join("\n"))?;
        }
        write!(f, ";")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UseStatement {
    pub db_name: String,
}

impl fmt::Display for UseStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "USE {};", quote(&self.db_name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTableStatement {
    /// Database name; empty until resolved from a `USE` statement.
    pub db_name: String,
    pub temporary: bool,
    pub if_not_exists: bool,
    pub table_name: String,
    pub definitions: Vec<CreateDefinition>,
    pub options: TableOptions,
}

impl CreateTableStatement {
    /// `` `db`.`table` `` (or just `` `table` `` when no database is known).
    pub fn qualified_name(&self) -> String {
        format!(
            "{}{}",
            opt(&self.db_name, |d| format!("{}.", quote(d))),
            quote(&self.table_name)
        )
    }

    /// `CREATE TABLE` followed by the qualified name.
    pub fn head(&self) -> String {
        format!("CREATE TABLE {}", self.qualified_name())
    }

    pub fn columns(&self) -> Vec<&ColumnDefinition> {
        self.definitions
            .iter()
            .filter_map(|d| match d {
                CreateDefinition::Column(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn primary_keys(&self) -> Vec<&PrimaryKeyDefinition> {
        self.definitions
            .iter()
            .filter_map(|d| match d {
                CreateDefinition::PrimaryKey(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn unique_keys(&self) -> Vec<&UniqueKeyDefinition> {
        self.definitions
            .iter()
            .filter_map(|d| match d {
                CreateDefinition::UniqueKey(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn indexes(&self) -> Vec<&IndexDefinition> {
        self.definitions
            .iter()
            .filter_map(|d| match d {
                CreateDefinition::Index(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn fulltext_indexes(&self) -> Vec<&FullTextIndexDefinition> {
        self.definitions
            .iter()
            .filter_map(|d| match d {
                CreateDefinition::FullTextIndex(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn foreign_keys(&self) -> Vec<&ForeignKeyDefinition> {
        self.definitions
            .iter()
            .filter_map(|d| match d {
                CreateDefinition::ForeignKey(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn checks(&self) -> Vec<&CheckConstraintDefinition> {
        self.definitions
            .iter()
            .filter_map(|d| match d {
                CreateDefinition::Check(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Rendered definitions in canonical order: columns (aligned), primary, unique,
    /// foreign, check, index, fulltext.
    pub fn definition_strings(&self) -> Vec<String> {
        let mut ret = align(&self.columns().iter().map(|c| c.to_string()).collect::<Vec<_>>());
        ret.extend(self.primary_keys().iter().map(|d| d.to_string()));
        ret.extend(self.unique_keys().iter().map(|d| d.to_string()));
        ret.extend(self.foreign_keys().iter().map(|d| d.to_string()));
        ret.extend(self.checks().iter().map(|d| d.to_string()));
        ret.extend(self.indexes().iter().map(|d| d.to_string()));
        ret.extend(self.fulltext_indexes().iter().map(|d| d.to_string()));
        ret
    }

    /// Names of the tables referenced by foreign keys.
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut ret: Vec<&str> = Vec::new();
        for fk in self.foreign_keys() {
            let t = fk.reference.table_name.as_str();
            if t != self.table_name && !ret.contains(&t) {
                ret.push(t);
            }
        }
        ret
    }
}

impl fmt::Display for CreateTableStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n(\n{}\n)",
            self.head(),
            indent(self.definition_strings()).join(",\n")
        )?;
        let options = indent(self.options.strings());
        if !options.is_empty() {
            write!(f, "\n{}", options.join("\n"))?;
        }
        write!(f, ";")
    }
}

/// One entry of the parenthesized body of `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateDefinition {
    Column(ColumnDefinition),
    PrimaryKey(PrimaryKeyDefinition),
    UniqueKey(UniqueKeyDefinition),
    Index(IndexDefinition),
    FullTextIndex(FullTextIndexDefinition),
    ForeignKey(ForeignKeyDefinition),
    Check(CheckConstraintDefinition),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub options: ColumnOptions,
}

impl ColumnDefinition {
    /// Structural equality with string charsets compared by their effective value.
    pub fn equals(&self, other: &ColumnDefinition) -> bool {
        self.name == other.name && self.equals_except_name(other)
    }

    pub fn equals_except_name(&self, other: &ColumnDefinition) -> bool {
        self.data_type.equivalent(&other.data_type) && self.options == other.options
    }

    /// Tab-separated rendering with a position clause (`FIRST` / `AFTER ...`) appended.
    pub fn string_with_pos(&self, pos: &str) -> String {
        let options = self.options.to_string();
        let options = if options.is_empty() {
            pos.to_string()
        } else if pos.is_empty() {
            options
        } else {
            format!("{} {}", options, pos)
        };
        format!("{}\t{}\t{}", quote(&self.name), self.data_type, options)
    }
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", quote(&self.name), self.data_type, self.options)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnOptions {
    /// `NULL`, `NOT NULL` or empty.
    pub nullability: String,
    pub default: String,
    /// Parenthesized generation expression.
    pub generated_as: String,
    /// `VIRTUAL` or `STORED`.
    pub generated_column_type: String,
    pub visibility: String,
    pub auto_increment: bool,
    pub unique: bool,
    pub primary: bool,
    pub comment: String,
    pub reference: Option<ReferenceDefinition>,
    pub check: Option<CheckConstraintDefinition>,
    pub on_update: String,
    pub srid: String,
    pub column_format: String,
    pub storage: String,
}

impl ColumnOptions {
    pub fn strings(&self) -> Vec<String> {
        let mut strs = Vec::new();
        if !self.nullability.is_empty() {
            strs.push(self.nullability.clone());
        }
        if !self.default.is_empty() {
            strs.push(format!("DEFAULT {}", self.default));
        }
        if !self.generated_as.is_empty() {
            strs.push(format!("GENERATED ALWAYS AS {}", self.generated_as));
        }
        if !self.generated_column_type.is_empty() {
            strs.push(self.generated_column_type.clone());
        }
        if !self.visibility.is_empty() {
            strs.push(self.visibility.clone());
        }
        if self.auto_increment {
            strs.push("AUTO_INCREMENT".to_string());
        }
        if self.unique {
            strs.push("UNIQUE KEY".to_string());
        }
        if self.primary {
            strs.push("PRIMARY KEY".to_string());
        }
        if !self.comment.is_empty() {
            strs.push(format!("COMMENT {}", self.comment));
        }
        if let Some(r) = &self.reference {
            strs.push(r.to_string());
        }
        if let Some(c) = &self.check {
            strs.push(c.to_string());
        }
        if !self.on_update.is_empty() {
            strs.push(format!("ON UPDATE {}", self.on_update));
        }
        if !self.srid.is_empty() {
            strs.push(format!("SRID {}", self.srid));
        }
        if !self.column_format.is_empty() {
            strs.push(format!("COLUMN_FORMAT {}", self.column_format));
        }
        if !self.storage.is_empty() {
            strs.push(format!("STORAGE {}", self.storage));
        }
        strs
    }
}

impl fmt::Display for ColumnOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.strings().join(" "))
    }
}

/// A column (optionally with a prefix length and order) or a functional expression
/// inside a key definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPart {
    pub column: String,
    pub length: String,
    pub order: String,
    /// Parenthesized expression of a functional key part.
    pub expression: String,
}

impl KeyPart {
    pub fn column(name: &str) -> Self {
        KeyPart {
            column: name.to_string(),
            ..Default::default()
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column.is_empty() {
            write!(f, "{}", self.expression)?;
        } else {
            write!(f, "{}", quote(&self.column))?;
        }
        write!(
            f,
            "{}{}",
            opt(&self.length, |l| format!("({})", l)),
            opt(&self.order, |o| format!(" {}", o))
        )
    }
}

/// Render a key-part list as `` `a`, `b`(10) DESC ``.
pub fn join_key_parts(parts: &[KeyPart]) -> String {
    parts
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether any key part names `column`.
pub fn key_parts_contain(parts: &[KeyPart], column: &str) -> bool {
    parts.iter().any(|p| p.column == column)
}

/// Rename `from` to `to` in every key part naming it.
pub fn rename_key_part_column(parts: &mut [KeyPart], from: &str, to: &str) {
    for p in parts.iter_mut().filter(|p| p.column == from) {
        p.column = to.to_string();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceDefinition {
    pub table_name: String,
    pub key_parts: Vec<KeyPart>,
    pub options: ReferenceOptions,
}

impl fmt::Display for ReferenceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "REFERENCES {} ({})",
            quote(&self.table_name),
            join_key_parts(&self.key_parts)
        )?;
        let options = self.options.to_string();
        if !options.is_empty() {
            write!(f, " {}", options)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceOptions {
    pub match_type: String,
    pub on_delete: String,
    pub on_update: String,
}

impl fmt::Display for ReferenceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut strs = Vec::new();
        if !self.match_type.is_empty() {
            strs.push(format!("MATCH {}", self.match_type));
        }
        if !self.on_delete.is_empty() {
            strs.push(format!("ON DELETE {}", self.on_delete));
        }
        if !self.on_update.is_empty() {
            strs.push(format!("ON UPDATE {}", self.on_update));
        }
        write!(f, "{}", strs.join(" "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckConstraintDefinition {
    pub constraint_name: String,
    /// Expression without the enclosing parentheses.
    pub check: String,
    /// `ENFORCED`, `NOT ENFORCED` or empty.
    pub enforcement: String,
}

impl fmt::Display for CheckConstraintDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}CHECK ({}){}",
            opt(&self.constraint_name, |n| format!("CONSTRAINT {} ", quote(n))),
            collapse_whitespace(&self.check),
            opt(&self.enforcement, |e| format!(" {}", e))
        )
    }
}

fn index_options_suffix(options: &IndexOptions) -> String {
    let s = options.to_string();
    opt(&s, |s| format!(" {}", s))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryKeyDefinition {
    pub constraint_name: String,
    pub key_parts: Vec<KeyPart>,
    pub options: IndexOptions,
}

impl PrimaryKeyDefinition {
    /// Identity string used to match primary keys across schemas.
    pub fn string_key_part_list(&self) -> String {
        format!("PRIMARY KEY ({})", join_key_parts(&self.key_parts))
    }
}

impl fmt::Display for PrimaryKeyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}PRIMARY KEY ({}){}",
            opt(&self.constraint_name, |n| format!("CONSTRAINT {} ", quote(n))),
            join_key_parts(&self.key_parts),
            index_options_suffix(&self.options)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueKeyDefinition {
    pub constraint_name: String,
    pub index_name: String,
    pub key_parts: Vec<KeyPart>,
    pub options: IndexOptions,
}

impl UniqueKeyDefinition {
    pub fn string_key_part_list(&self) -> String {
        format!("UNIQUE KEY ({})", join_key_parts(&self.key_parts))
    }
}

impl fmt::Display for UniqueKeyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}UNIQUE KEY{} ({}){}",
            opt(&self.constraint_name, |n| format!("CONSTRAINT {} ", quote(n))),
            opt(&self.index_name, |n| format!(" {}", quote(n))),
            join_key_parts(&self.key_parts),
            index_options_suffix(&self.options)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDefinition {
    pub index_name: String,
    pub key_parts: Vec<KeyPart>,
    pub options: IndexOptions,
}

impl IndexDefinition {
    pub fn string_key_part_list(&self) -> String {
        format!("INDEX ({})", join_key_parts(&self.key_parts))
    }
}

impl fmt::Display for IndexDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "INDEX{} ({}){}",
            opt(&self.index_name, |n| format!(" {}", quote(n))),
            join_key_parts(&self.key_parts),
            index_options_suffix(&self.options)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullTextIndexDefinition {
    pub index_name: String,
    pub key_parts: Vec<KeyPart>,
    pub options: IndexOptions,
}

impl FullTextIndexDefinition {
    pub fn string_key_part_list(&self) -> String {
        format!("FULLTEXT INDEX ({})", join_key_parts(&self.key_parts))
    }
}

impl fmt::Display for FullTextIndexDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FULLTEXT INDEX{} ({}){}",
            opt(&self.index_name, |n| format!(" {}", quote(n))),
            join_key_parts(&self.key_parts),
            index_options_suffix(&self.options)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignKeyDefinition {
    pub constraint_name: String,
    pub index_name: String,
    pub key_parts: Vec<KeyPart>,
    pub reference: ReferenceDefinition,
}

impl ForeignKeyDefinition {
    pub fn string_key_part_list(&self) -> String {
        format!("FOREIGN KEY ({})", join_key_parts(&self.key_parts))
    }
}

impl fmt::Display for ForeignKeyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}FOREIGN KEY{} ({}) {}",
            opt(&self.constraint_name, |n| format!("CONSTRAINT {} ", quote(n))),
            opt(&self.index_name, |n| format!(" {}", quote(n))),
            join_key_parts(&self.key_parts),
            self.reference
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::data_type::StringType;

    fn column(name: &str, data_type: DataType, options: ColumnOptions) -> ColumnDefinition {
        ColumnDefinition {
            name: name.to_string(),
            data_type,
            options,
        }
    }

    fn int() -> DataType {
        DataType::Integer {
            name: "INT".to_string(),
            field_len: String::new(),
            unsigned: false,
            zerofill: false,
        }
    }

    #[test]
    fn test_create_table_display() {
        let stmt = CreateTableStatement {
            db_name: "db1".to_string(),
            table_name: "t1".to_string(),
            definitions: vec![
                CreateDefinition::Column(column(
                    "id",
                    int(),
                    ColumnOptions {
                        nullability: "NOT NULL".to_string(),
                        ..Default::default()
                    },
                )),
                CreateDefinition::Index(IndexDefinition {
                    index_name: "idx".to_string(),
                    key_parts: vec![KeyPart::column("name")],
                    options: IndexOptions::default(),
                }),
                CreateDefinition::Column(column(
                    "name",
                    DataType::String(StringType {
                        name: "VARCHAR".to_string(),
                        field_len: "10".to_string(),
                        ..Default::default()
                    }),
                    ColumnOptions::default(),
                )),
                CreateDefinition::PrimaryKey(PrimaryKeyDefinition {
                    key_parts: vec![KeyPart::column("id")],
                    ..Default::default()
                }),
            ],
            options: TableOptions {
                engine: "MyISAM".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            stmt.to_string(),
            "CREATE TABLE `db1`.`t1`\n(\n    `id`   INT         NOT NULL,\n    `name` VARCHAR(10),\n    PRIMARY KEY (`id`),\n    INDEX `idx` (`name`)\n)\n    ENGINE = MyISAM;"
        );
    }

    #[test]
    fn test_create_database_display() {
        let stmt = CreateDatabaseStatement {
            db_name: "db1".to_string(),
            options: DatabaseOptions {
                default_charset: "utf8mb4".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            stmt.to_string(),
            "CREATE DATABASE `db1`\n    DEFAULT CHARACTER SET = utf8mb4;"
        );
        let bare = CreateDatabaseStatement {
            db_name: "db2".to_string(),
            ..Default::default()
        };
        assert_eq!(bare.to_string(), "CREATE DATABASE `db2`;");
    }

    #[test]
    fn test_column_string_with_pos() {
        let c = column("a", int(), ColumnOptions::default());
        assert_eq!(c.string_with_pos("FIRST"), "`a`\tINT\tFIRST");
        let c = column(
            "a",
            int(),
            ColumnOptions {
                nullability: "NOT NULL".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(c.string_with_pos("AFTER `b`"), "`a`\tINT\tNOT NULL AFTER `b`");
    }

    #[test]
    fn test_foreign_key_display() {
        let fk = ForeignKeyDefinition {
            constraint_name: "fk1".to_string(),
            index_name: "fk1".to_string(),
            key_parts: vec![KeyPart::column("t2_id")],
            reference: ReferenceDefinition {
                table_name: "t2".to_string(),
                key_parts: vec![KeyPart::column("id")],
                options: ReferenceOptions {
                    on_delete: "CASCADE".to_string(),
                    ..Default::default()
                },
            },
        };
        assert_eq!(
            fk.to_string(),
            "CONSTRAINT `fk1` FOREIGN KEY `fk1` (`t2_id`) REFERENCES `t2` (`id`) ON DELETE CASCADE"
        );
        assert_eq!(fk.string_key_part_list(), "FOREIGN KEY (`t2_id`)");
    }

    #[test]
    fn test_check_display_collapses_whitespace() {
        let c = CheckConstraintDefinition {
            constraint_name: "c1".to_string(),
            check: "`a`  >\n 0".to_string(),
            enforcement: "NOT ENFORCED".to_string(),
        };
        assert_eq!(c.to_string(), "CONSTRAINT `c1` CHECK (`a` > 0) NOT ENFORCED");
    }

    #[test]
    fn test_key_part_display() {
        let k = KeyPart {
            column: "name".to_string(),
            length: "10".to_string(),
            order: "DESC".to_string(),
            expression: String::new(),
        };
        assert_eq!(k.to_string(), "`name`(10) DESC");
        let e = KeyPart {
            expression: "(`a` + `b`)".to_string(),
            ..Default::default()
        };
        assert_eq!(e.to_string(), "(`a` + `b`)");
    }
}
