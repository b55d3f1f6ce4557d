//! Recursive-descent parser for MySQL `CREATE DATABASE`, `CREATE TABLE` and `USE`
//! statements.
//!
//! Keywords are lexed as plain words and recognized case-insensitively here, so any
//! non-reserved word can still serve as an identifier.

mod ast;
mod data_type;
mod options;
mod tokens;

use std::io::Read;

pub use ast::*;
pub use data_type::{DataType, StringType};
pub use options::{option_value, DatabaseOptions, IndexOptions, OptionMap, TableOptions};
pub use tokens::Kind;

use crate::error::{caret_snippet, DdlsyncError, Result};
use crate::lexer::{Position, Token, Tokenizer};
use tokens::{is_keyword, unquote_identifier, unquote_string, SKIPPED, TOKEN_TYPES};

/// Table options that take a plain `[=] value` argument.
const VALUE_TABLE_OPTIONS: &[&str] = &[
    "AUTOEXTEND_SIZE",
    "AUTO_INCREMENT",
    "AVG_ROW_LENGTH",
    "CHECKSUM",
    "COMMENT",
    "COMPRESSION",
    "CONNECTION",
    "DELAY_KEY_WRITE",
    "ENCRYPTION",
    "ENGINE",
    "ENGINE_ATTRIBUTE",
    "INSERT_METHOD",
    "KEY_BLOCK_SIZE",
    "MAX_ROWS",
    "MIN_ROWS",
    "PACK_KEYS",
    "PASSWORD",
    "ROW_FORMAT",
    "SECONDARY_ENGINE_ATTRIBUTE",
    "STATS_AUTO_RECALC",
    "STATS_PERSISTENT",
    "STATS_SAMPLE_PAGES",
];

const SPATIAL_TYPES: &[&str] = &[
    "GEOMETRY",
    "POINT",
    "LINESTRING",
    "POLYGON",
    "MULTIPOINT",
    "MULTILINESTRING",
    "MULTIPOLYGON",
    "GEOMETRYCOLLECTION",
];

const STRING_TYPES: &[&str] = &[
    "CHAR",
    "VARCHAR",
    "BINARY",
    "VARBINARY",
    "TINYTEXT",
    "TEXT",
    "MEDIUMTEXT",
    "LONGTEXT",
    "TINYBLOB",
    "BLOB",
    "MEDIUMBLOB",
    "LONGBLOB",
];

/// Parse DDL text into statements.
pub fn parse_str(text: &str) -> Result<Vec<Statement>> {
    Parser::new(text.as_bytes()).parse()
}

pub struct Parser<R> {
    tokens: Tokenizer<R, Kind>,
}

impl<R: Read> Parser<R> {
    pub fn new(reader: R) -> Self {
        Parser {
            tokens: Tokenizer::new(reader, TOKEN_TYPES.clone(), SKIPPED.clone()),
        }
    }

    /// Parse all statements until end of input.
    pub fn parse(&mut self) -> Result<Vec<Statement>> {
        let mut ret = Vec::new();
        loop {
            while self.accept(Kind::Semicolon)?.is_some() {}
            if self.tokens.peek()?.is_none() {
                break;
            }
            let statement = self.statement()?;
            log::debug!(
                "parsed statement: {}",
                statement.to_string().lines().next().unwrap_or_default()
            );
            ret.push(statement);
            if self.accept(Kind::Semicolon)?.is_none() && self.tokens.peek()?.is_some() {
                return Err(self.unexpected("';'"));
            }
        }
        Ok(ret)
    }

    // ---- token helpers ----

    fn error_at(&mut self, position: Position, width: usize, message: String) -> DdlsyncError {
        DdlsyncError::ParseError {
            message,
            line: position.line,
            column: position.column,
            snippet: caret_snippet(&self.tokens.last_line(), position.column, width),
        }
    }

    fn error_at_token(&mut self, token: &Token<Kind>, message: String) -> DdlsyncError {
        let width = token.literal.chars().count();
        self.error_at(token.position, width, message)
    }

    /// Error describing the next token (or end of input) as unexpected.
    fn unexpected(&mut self, expected: &str) -> DdlsyncError {
        match self.tokens.peek() {
            Ok(Some(t)) => {
                let message = format!("unexpected {:?}, expected {}", t.literal, expected);
                self.error_at_token(&t, message)
            }
            Ok(None) => {
                let position = self.tokens.position();
                let message = format!("unexpected end of input, expected {}", expected);
                self.error_at(position, 1, message)
            }
            Err(e) => e,
        }
    }

    fn next(&mut self, expected: &str) -> Result<Token<Kind>> {
        match self.tokens.scan()? {
            Some(t) => Ok(t),
            None => Err(self.unexpected(expected)),
        }
    }

    fn peek_is(&mut self, kind: Kind) -> Result<bool> {
        Ok(self.tokens.peek()?.is_some_and(|t| t.kind == kind))
    }

    fn peek_keyword(&mut self, keyword: &str) -> Result<bool> {
        Ok(self
            .tokens
            .peek()?
            .is_some_and(|t| is_keyword(&t, keyword)))
    }

    fn accept(&mut self, kind: Kind) -> Result<Option<Token<Kind>>> {
        if self.peek_is(kind)? {
            self.tokens.scan()
        } else {
            Ok(None)
        }
    }

    fn expect(&mut self, kind: Kind, expected: &str) -> Result<Token<Kind>> {
        match self.accept(kind)? {
            Some(t) => Ok(t),
            None => Err(self.unexpected(expected)),
        }
    }

    fn accept_keyword(&mut self, keyword: &str) -> Result<bool> {
        if self.peek_keyword(keyword)? {
            self.tokens.scan()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.accept_keyword(keyword)? {
            Ok(())
        } else {
            Err(self.unexpected(keyword))
        }
    }

    /// Consume one of `keywords`, returning it upper-cased.
    fn accept_one_of(&mut self, keywords: &[&str]) -> Result<Option<String>> {
        for kw in keywords {
            if self.accept_keyword(kw)? {
                return Ok(Some(kw.to_string()));
            }
        }
        Ok(None)
    }

    fn expect_one_of(&mut self, keywords: &[&str]) -> Result<String> {
        match self.accept_one_of(keywords)? {
            Some(kw) => Ok(kw),
            None => Err(self.unexpected(&keywords.join(" or "))),
        }
    }

    fn peek_identifier(&mut self) -> Result<bool> {
        Ok(self
            .tokens
            .peek()?
            .is_some_and(|t| matches!(t.kind, Kind::Word | Kind::QuotedIdent)))
    }

    fn identifier(&mut self, expected: &str) -> Result<String> {
        match self.tokens.peek()? {
            Some(t) if t.kind == Kind::Word => {
                self.tokens.scan()?;
                Ok(t.literal)
            }
            Some(t) if t.kind == Kind::QuotedIdent => {
                self.tokens.scan()?;
                Ok(unquote_identifier(&t.literal))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn string_literal(&mut self) -> Result<String> {
        Ok(self.expect(Kind::Str, "string literal")?.literal)
    }

    fn integer(&mut self) -> Result<String> {
        Ok(self.expect(Kind::Int, "integer")?.literal)
    }

    /// A plain option value: word, number, string or quoted identifier.
    fn option_value(&mut self, expected: &str) -> Result<String> {
        let token = self.next(expected)?;
        match token.kind {
            Kind::Word | Kind::Default | Kind::Int | Kind::Float | Kind::Str | Kind::HexNum => {
                Ok(token.literal)
            }
            Kind::QuotedIdent => Ok(unquote_identifier(&token.literal)),
            _ => {
                let message = format!("unexpected {:?}, expected {}", token.literal, expected);
                Err(self.error_at_token(&token, message))
            }
        }
    }

    /// `CHARACTER SET` or `CHARSET`.
    fn accept_charset_keyword(&mut self) -> Result<bool> {
        if self.accept_keyword("CHARSET")? {
            return Ok(true);
        }
        if self.accept_keyword("CHARACTER")? {
            self.expect_keyword("SET")?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Character set or collation name, lower-cased.
    fn charset_name(&mut self) -> Result<String> {
        let token = self.next("character set or collation name")?;
        match token.kind {
            Kind::Word | Kind::Default => Ok(token.literal.to_ascii_lowercase()),
            Kind::QuotedIdent => Ok(unquote_identifier(&token.literal).to_ascii_lowercase()),
            Kind::Str => Ok(unquote_string(&token.literal).to_ascii_lowercase()),
            _ => {
                let message = format!(
                    "unexpected {:?}, expected character set or collation name",
                    token.literal
                );
                Err(self.error_at_token(&token, message))
            }
        }
    }

    // ---- statements ----

    fn statement(&mut self) -> Result<Statement> {
        if self.accept_keyword("USE")? {
            let db_name = self.identifier("database name")?;
            return Ok(Statement::Use(UseStatement { db_name }));
        }
        if !self.accept_keyword("CREATE")? {
            return Err(self.unexpected("CREATE or USE"));
        }
        if self.accept_one_of(&["DATABASE", "SCHEMA"])?.is_some() {
            return Ok(Statement::CreateDatabase(self.create_database()?));
        }
        let temporary = self.accept_keyword("TEMPORARY")?;
        if self.accept_keyword("TABLE")? {
            return Ok(Statement::CreateTable(self.create_table(temporary)?));
        }
        Err(self.unexpected("DATABASE or TABLE"))
    }

    fn if_not_exists(&mut self) -> Result<bool> {
        if !self.accept_keyword("IF")? {
            return Ok(false);
        }
        self.expect_keyword("NOT")?;
        self.expect_keyword("EXISTS")?;
        Ok(true)
    }

    fn create_database(&mut self) -> Result<CreateDatabaseStatement> {
        let if_not_exists = self.if_not_exists()?;
        let db_name = self.identifier("database name")?;
        let mut options = DatabaseOptions::default();
        loop {
            let had_default = self.accept(Kind::Default)?.is_some();
            if self.accept_charset_keyword()? {
                self.accept(Kind::Eq)?;
                options.default_charset = self.charset_name()?;
            } else if self.accept_keyword("COLLATE")? {
                self.accept(Kind::Eq)?;
                options.default_collate = self.charset_name()?;
            } else if self.accept_keyword("ENCRYPTION")? {
                self.accept(Kind::Eq)?;
                options.default_encryption = self.option_value("'Y' or 'N'")?;
            } else if had_default {
                return Err(self.unexpected("CHARACTER SET, COLLATE or ENCRYPTION"));
            } else {
                break;
            }
        }
        Ok(CreateDatabaseStatement {
            if_not_exists,
            db_name,
            options,
        })
    }

    fn table_name(&mut self) -> Result<(String, String)> {
        let first = self.identifier("table name")?;
        if self.accept(Kind::Dot)?.is_some() {
            let table = self.identifier("table name")?;
            Ok((first, table))
        } else {
            Ok((String::new(), first))
        }
    }

    fn create_table(&mut self, temporary: bool) -> Result<CreateTableStatement> {
        let if_not_exists = self.if_not_exists()?;
        let (db_name, table_name) = self.table_name()?;
        if self.peek_keyword("LIKE")? {
            return Err(self.unexpected("'(' (CREATE TABLE ... LIKE is not supported)"));
        }
        self.expect(Kind::LParen, "'('")?;
        let mut definitions = vec![self.create_definition()?];
        while self.accept(Kind::Comma)?.is_some() {
            definitions.push(self.create_definition()?);
        }
        self.expect(Kind::RParen, "',' or ')'")?;
        let options = self.table_options()?;
        Ok(CreateTableStatement {
            db_name,
            temporary,
            if_not_exists,
            table_name,
            definitions,
            options,
        })
    }

    fn create_definition(&mut self) -> Result<CreateDefinition> {
        if self.accept_keyword("CONSTRAINT")? {
            let starts_body = self.peek_keyword("PRIMARY")?
                || self.peek_keyword("UNIQUE")?
                || self.peek_keyword("FOREIGN")?;
            let name = if !starts_body && self.peek_identifier()? {
                self.identifier("constraint name")?
            } else {
                String::new()
            };
            return self.constraint_definition(name);
        }
        if self.peek_keyword("PRIMARY")?
            || self.peek_keyword("UNIQUE")?
            || self.peek_keyword("FOREIGN")?
            || self.peek_is(Kind::Check)?
        {
            return self.constraint_definition(String::new());
        }
        if self.accept_one_of(&["INDEX", "KEY"])?.is_some() {
            let (index_name, key_parts, options) = self.index_body()?;
            return Ok(CreateDefinition::Index(IndexDefinition {
                index_name,
                key_parts,
                options,
            }));
        }
        if self.accept_keyword("FULLTEXT")? {
            self.accept_one_of(&["INDEX", "KEY"])?;
            let (index_name, key_parts, options) = self.index_body()?;
            return Ok(CreateDefinition::FullTextIndex(FullTextIndexDefinition {
                index_name,
                key_parts,
                options,
            }));
        }
        if self.peek_keyword("SPATIAL")? {
            return Err(
                self.unexpected("column or key definition (SPATIAL indexes are not supported)")
            );
        }
        Ok(CreateDefinition::Column(self.column_definition()?))
    }

    fn constraint_definition(&mut self, constraint_name: String) -> Result<CreateDefinition> {
        if self.accept_keyword("PRIMARY")? {
            self.expect_keyword("KEY")?;
            let mut options = IndexOptions::default();
            self.index_type(&mut options)?;
            let key_parts = self.key_parts()?;
            self.index_options(&mut options)?;
            return Ok(CreateDefinition::PrimaryKey(PrimaryKeyDefinition {
                constraint_name,
                key_parts,
                options,
            }));
        }
        if self.accept_keyword("UNIQUE")? {
            self.accept_one_of(&["INDEX", "KEY"])?;
            let (index_name, key_parts, options) = self.index_body()?;
            return Ok(CreateDefinition::UniqueKey(UniqueKeyDefinition {
                constraint_name,
                index_name,
                key_parts,
                options,
            }));
        }
        if self.accept_keyword("FOREIGN")? {
            self.expect_keyword("KEY")?;
            let index_name = if self.peek_identifier()? {
                self.identifier("index name")?
            } else {
                String::new()
            };
            let key_parts = self.key_parts()?;
            let reference = self.reference_definition()?;
            return Ok(CreateDefinition::ForeignKey(ForeignKeyDefinition {
                constraint_name,
                index_name,
                key_parts,
                reference,
            }));
        }
        if self.peek_is(Kind::Check)? {
            return Ok(CreateDefinition::Check(self.check_constraint(constraint_name)?));
        }
        Err(self.unexpected("PRIMARY KEY, UNIQUE, FOREIGN KEY or CHECK"))
    }

    /// `[name] [USING type] (key_parts) [options]`
    fn index_body(&mut self) -> Result<(String, Vec<KeyPart>, IndexOptions)> {
        let index_name = if !self.peek_keyword("USING")? && self.peek_identifier()? {
            self.identifier("index name")?
        } else {
            String::new()
        };
        let mut options = IndexOptions::default();
        self.index_type(&mut options)?;
        let key_parts = self.key_parts()?;
        self.index_options(&mut options)?;
        Ok((index_name, key_parts, options))
    }

    fn index_type(&mut self, options: &mut IndexOptions) -> Result<()> {
        if self.accept_keyword("USING")? {
            options.index_type = self.expect_one_of(&["BTREE", "HASH"])?;
        }
        Ok(())
    }

    fn index_options(&mut self, options: &mut IndexOptions) -> Result<()> {
        loop {
            if self.accept_keyword("KEY_BLOCK_SIZE")? {
                self.accept(Kind::Eq)?;
                options.key_block_size = self.integer()?;
            } else if self.peek_keyword("USING")? {
                self.index_type(options)?;
            } else if self.accept_keyword("WITH")? {
                self.expect_keyword("PARSER")?;
                options.parser = self.identifier("parser name")?;
            } else if self.accept_keyword("COMMENT")? {
                options.comment = self.string_literal()?;
            } else if let Some(v) = self.accept_one_of(&["VISIBLE", "INVISIBLE"])? {
                options.visibility = v;
            } else if self
                .accept_one_of(&["ENGINE_ATTRIBUTE", "SECONDARY_ENGINE_ATTRIBUTE"])?
                .is_some()
            {
                self.accept(Kind::Eq)?;
                let value = self.string_literal()?;
                log::debug!("ignoring index engine attribute {}", value);
            } else {
                return Ok(());
            }
        }
    }

    fn key_parts(&mut self) -> Result<Vec<KeyPart>> {
        self.expect(Kind::LParen, "'('")?;
        let mut parts = vec![self.key_part()?];
        while self.accept(Kind::Comma)?.is_some() {
            parts.push(self.key_part()?);
        }
        self.expect(Kind::RParen, "',' or ')'")?;
        Ok(parts)
    }

    fn key_part(&mut self) -> Result<KeyPart> {
        let mut part = KeyPart::default();
        if let Some(expr) = self.accept(Kind::Expr)? {
            part.expression = expr.literal;
        } else {
            part.column = self.identifier("key part")?;
            if self.accept(Kind::LParen)?.is_some() {
                part.length = self.integer()?;
                self.expect(Kind::RParen, "')'")?;
            }
        }
        if let Some(order) = self.accept_one_of(&["ASC", "DESC"])? {
            part.order = order;
        }
        Ok(part)
    }

    fn reference_definition(&mut self) -> Result<ReferenceDefinition> {
        self.expect_keyword("REFERENCES")?;
        let (_, table_name) = self.table_name()?;
        let key_parts = self.key_parts()?;
        let mut options = ReferenceOptions::default();
        loop {
            if self.accept_keyword("MATCH")? {
                options.match_type = self.expect_one_of(&["FULL", "PARTIAL", "SIMPLE"])?;
            } else if self.accept_keyword("ON")? {
                if self.accept_keyword("DELETE")? {
                    options.on_delete = self.reference_option()?;
                } else {
                    self.expect_keyword("UPDATE")?;
                    options.on_update = self.reference_option()?;
                }
            } else {
                break;
            }
        }
        Ok(ReferenceDefinition {
            table_name,
            key_parts,
            options,
        })
    }

    fn reference_option(&mut self) -> Result<String> {
        if let Some(kw) = self.accept_one_of(&["RESTRICT", "CASCADE"])? {
            return Ok(kw);
        }
        if self.accept_keyword("SET")? {
            let what = self.expect_one_of(&["NULL", "DEFAULT"])?;
            return Ok(format!("SET {}", what));
        }
        if self.accept_keyword("NO")? {
            self.expect_keyword("ACTION")?;
            return Ok("NO ACTION".to_string());
        }
        Err(self.unexpected("RESTRICT, CASCADE, SET NULL, SET DEFAULT or NO ACTION"))
    }

    fn check_constraint(&mut self, constraint_name: String) -> Result<CheckConstraintDefinition> {
        self.expect(Kind::Check, "CHECK")?;
        let expr = self.expect(Kind::Expr, "parenthesized expression")?;
        let inner = &expr.literal[1..expr.literal.len() - 1];
        let enforcement = if self.accept(Kind::NotEnforced)?.is_some() {
            "NOT ENFORCED".to_string()
        } else if self.accept_keyword("ENFORCED")? {
            "ENFORCED".to_string()
        } else {
            String::new()
        };
        Ok(CheckConstraintDefinition {
            constraint_name,
            check: inner.trim().to_string(),
            enforcement,
        })
    }

    // ---- columns ----

    fn column_definition(&mut self) -> Result<ColumnDefinition> {
        let name = self.identifier("column or key definition")?;
        let mut data_type = self.data_type()?;
        let options = self.column_options(&mut data_type)?;
        Ok(ColumnDefinition {
            name,
            data_type,
            options,
        })
    }

    fn field_len(&mut self) -> Result<String> {
        if self.accept(Kind::LParen)?.is_none() {
            return Ok(String::new());
        }
        let len = self.integer()?;
        self.expect(Kind::RParen, "')'")?;
        Ok(len)
    }

    fn len_and_scale(&mut self) -> Result<(String, String)> {
        if self.accept(Kind::LParen)?.is_none() {
            return Ok((String::new(), String::new()));
        }
        let len = self.integer()?;
        let scale = if self.accept(Kind::Comma)?.is_some() {
            self.integer()?
        } else {
            String::new()
        };
        self.expect(Kind::RParen, "')'")?;
        Ok((len, scale))
    }

    fn numeric_flags(&mut self) -> Result<(bool, bool)> {
        let (mut unsigned, mut zerofill) = (false, false);
        while let Some(kw) = self.accept_one_of(&["UNSIGNED", "SIGNED", "ZEROFILL"])? {
            match kw.as_str() {
                "UNSIGNED" => unsigned = true,
                "ZEROFILL" => zerofill = true,
                _ => {}
            }
        }
        Ok((unsigned, zerofill))
    }

    fn charset_and_collation(&mut self) -> Result<(String, String)> {
        let (mut charset, mut collation) = (String::new(), String::new());
        loop {
            if self.accept_charset_keyword()? {
                charset = self.charset_name()?;
            } else if self.accept_keyword("COLLATE")? {
                collation = self.charset_name()?;
            } else {
                return Ok((charset, collation));
            }
        }
    }

    fn data_type(&mut self) -> Result<DataType> {
        let token = self.next("data type")?;
        if token.kind != Kind::Word {
            let message = format!("unexpected {:?}, expected data type", token.literal);
            return Err(self.error_at_token(&token, message));
        }
        let upper = token.literal.to_ascii_uppercase();
        let data_type = match upper.as_str() {
            "BIT" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT"
            | "BOOL" | "BOOLEAN" => {
                let name = match upper.as_str() {
                    "INTEGER" => "INT".to_string(),
                    "BOOLEAN" => "BOOL".to_string(),
                    _ => upper.clone(),
                };
                let field_len = self.field_len()?;
                let (unsigned, zerofill) = self.numeric_flags()?;
                DataType::Integer {
                    name,
                    field_len,
                    unsigned,
                    zerofill,
                }
            }
            "DECIMAL" | "DEC" | "NUMERIC" | "FIXED" => {
                let (field_len, field_scale) = self.len_and_scale()?;
                let (unsigned, zerofill) = self.numeric_flags()?;
                DataType::FixedPoint {
                    name: "DECIMAL".to_string(),
                    field_len,
                    field_scale,
                    unsigned,
                    zerofill,
                }
            }
            "FLOAT" | "DOUBLE" | "REAL" => {
                if upper == "DOUBLE" {
                    self.accept_keyword("PRECISION")?;
                }
                let name = if upper == "FLOAT" { "FLOAT" } else { "DOUBLE" };
                let (field_len, field_scale) = self.len_and_scale()?;
                let (unsigned, zerofill) = self.numeric_flags()?;
                DataType::FloatingPoint {
                    name: name.to_string(),
                    field_len,
                    field_scale,
                    unsigned,
                    zerofill,
                }
            }
            "DATE" | "TIME" | "DATETIME" | "TIMESTAMP" | "YEAR" => DataType::DateTime {
                field_len: self.field_len()?,
                name: upper.clone(),
            },
            "ENUM" | "SET" => {
                self.expect(Kind::LParen, "'('")?;
                let mut values = vec![self.string_literal()?];
                while self.accept(Kind::Comma)?.is_some() {
                    values.push(self.string_literal()?);
                }
                self.expect(Kind::RParen, "',' or ')'")?;
                let (charset, collation) = self.charset_and_collation()?;
                DataType::StringList {
                    name: upper.clone(),
                    values,
                    charset,
                    collation,
                }
            }
            "JSON" => DataType::Json { name: upper.clone() },
            "GEOMCOLLECTION" => DataType::Spatial {
                name: "GEOMETRYCOLLECTION".to_string(),
            },
            _ if SPATIAL_TYPES.contains(&upper.as_str()) => DataType::Spatial {
                name: upper.clone(),
            },
            _ if STRING_TYPES.contains(&upper.as_str()) => {
                let field_len = self.field_len()?;
                let (charset, collation) = self.charset_and_collation()?;
                DataType::String(StringType {
                    name: upper.clone(),
                    field_len,
                    charset,
                    collation,
                    ..Default::default()
                })
            }
            _ => {
                let message = format!("unknown data type {:?}", token.literal);
                return Err(self.error_at_token(&token, message));
            }
        };
        Ok(data_type)
    }

    fn column_options(&mut self, data_type: &mut DataType) -> Result<ColumnOptions> {
        let mut o = ColumnOptions::default();
        loop {
            if self.accept_keyword("NOT")? {
                self.expect_keyword("NULL")?;
                o.nullability = "NOT NULL".to_string();
            } else if self.accept_keyword("NULL")? {
                o.nullability = "NULL".to_string();
            } else if self.accept(Kind::Default)?.is_some() {
                o.default = self.default_value()?;
            } else if self.accept_keyword("GENERATED")? {
                self.expect_keyword("ALWAYS")?;
                self.expect(Kind::As, "AS")?;
                self.generated_column(&mut o)?;
            } else if self.accept(Kind::As)?.is_some() {
                self.generated_column(&mut o)?;
            } else if let Some(v) = self.accept_one_of(&["VISIBLE", "INVISIBLE"])? {
                o.visibility = v;
            } else if self.accept_keyword("AUTO_INCREMENT")? {
                o.auto_increment = true;
            } else if self.accept_keyword("UNIQUE")? {
                self.accept_keyword("KEY")?;
                o.unique = true;
            } else if self.accept_keyword("PRIMARY")? {
                self.expect_keyword("KEY")?;
                o.primary = true;
            } else if self.accept_keyword("KEY")? {
                o.primary = true;
            } else if self.accept_keyword("COMMENT")? {
                o.comment = self.string_literal()?;
            } else if self.peek_keyword("COLLATE")? {
                let token = self.next("COLLATE")?;
                let collation = self.charset_name()?;
                if !data_type.set_collation(collation) {
                    let message = format!("COLLATE is not applicable to {}", data_type.name());
                    return Err(self.error_at_token(&token, message));
                }
            } else if self.peek_keyword("REFERENCES")? {
                o.reference = Some(self.reference_definition()?);
            } else if self.accept_keyword("CONSTRAINT")? {
                let name = if self.peek_identifier()? {
                    self.identifier("constraint name")?
                } else {
                    String::new()
                };
                o.check = Some(self.check_constraint(name)?);
            } else if self.peek_is(Kind::Check)? {
                o.check = Some(self.check_constraint(String::new())?);
            } else if self.accept_keyword("ON")? {
                self.expect_keyword("UPDATE")?;
                o.on_update = self.default_value()?;
            } else if self.accept_keyword("SRID")? {
                o.srid = self.integer()?;
            } else if self.accept_keyword("COLUMN_FORMAT")? {
                o.column_format = self.expect_one_of(&["FIXED", "DYNAMIC", "DEFAULT"])?;
            } else if self.accept_keyword("STORAGE")? {
                o.storage = self.expect_one_of(&["DISK", "MEMORY"])?;
            } else if self
                .accept_one_of(&["ENGINE_ATTRIBUTE", "SECONDARY_ENGINE_ATTRIBUTE"])?
                .is_some()
            {
                self.accept(Kind::Eq)?;
                let value = self.string_literal()?;
                log::debug!("ignoring column engine attribute {}", value);
            } else {
                return Ok(o);
            }
        }
    }

    fn generated_column(&mut self, o: &mut ColumnOptions) -> Result<()> {
        o.generated_as = self.expect(Kind::Expr, "parenthesized expression")?.literal;
        if let Some(t) = self.accept_one_of(&["VIRTUAL", "STORED"])? {
            o.generated_column_type = t;
        }
        Ok(())
    }

    /// Literal, keyword, function call or parenthesized expression after `DEFAULT` or
    /// `ON UPDATE`.
    fn default_value(&mut self) -> Result<String> {
        let token = self.next("default value")?;
        match token.kind {
            Kind::Expr
            | Kind::Str
            | Kind::BitStr
            | Kind::HexStr
            | Kind::HexNum
            | Kind::BitNum
            | Kind::Int
            | Kind::Float => Ok(token.literal),
            Kind::Minus | Kind::Plus => {
                let number = self.next("number")?;
                if !matches!(number.kind, Kind::Int | Kind::Float) {
                    let message = format!("unexpected {:?}, expected number", number.literal);
                    return Err(self.error_at_token(&number, message));
                }
                let sign = if token.kind == Kind::Minus { "-" } else { "" };
                Ok(format!("{}{}", sign, number.literal))
            }
            Kind::Word => {
                let upper = token.literal.to_ascii_uppercase();
                if self.accept(Kind::LParen)?.is_some() {
                    let arg = match self.accept(Kind::Int)? {
                        Some(t) => t.literal,
                        None => String::new(),
                    };
                    self.expect(Kind::RParen, "')'")?;
                    Ok(format!("{}({})", upper, arg))
                } else {
                    Ok(upper)
                }
            }
            _ => {
                let message = format!("unexpected {:?}, expected default value", token.literal);
                Err(self.error_at_token(&token, message))
            }
        }
    }

    // ---- table options ----

    fn table_options(&mut self) -> Result<TableOptions> {
        let mut options = TableOptions::default();
        loop {
            self.accept(Kind::Comma)?;
            let had_default = self.accept(Kind::Default)?.is_some();
            let key = if self.accept_charset_keyword()? {
                "DEFAULT CHARACTER SET".to_string()
            } else if self.accept_keyword("COLLATE")? {
                "DEFAULT COLLATE".to_string()
            } else if had_default {
                return Err(self.unexpected("CHARACTER SET or COLLATE"));
            } else if self.accept_keyword("DATA")? {
                self.expect_keyword("DIRECTORY")?;
                "DATA DIRECTORY".to_string()
            } else if self.accept_keyword("INDEX")? {
                self.expect_keyword("DIRECTORY")?;
                "INDEX DIRECTORY".to_string()
            } else if self.accept_keyword("TABLESPACE")? {
                self.accept(Kind::Eq)?;
                options.tablespace = self.identifier("tablespace name")?;
                if self.accept_keyword("STORAGE")? {
                    options.tablespace_storage = self.expect_one_of(&["DISK", "MEMORY"])?;
                }
                continue;
            } else if self.accept_keyword("UNION")? {
                self.accept(Kind::Eq)?;
                self.expect(Kind::LParen, "'('")?;
                options.union.push(self.table_name()?.1);
                while self.accept(Kind::Comma)?.is_some() {
                    options.union.push(self.table_name()?.1);
                }
                self.expect(Kind::RParen, "',' or ')'")?;
                continue;
            } else if self.peek_keyword("PARTITION")? {
                return Err(self.unexpected("table option (partitioning is not supported)"));
            } else if let Some(key) = self.accept_one_of(VALUE_TABLE_OPTIONS)? {
                key
            } else {
                return Ok(options);
            };
            self.accept(Kind::Eq)?;
            let value = if key == "DEFAULT CHARACTER SET" || key == "DEFAULT COLLATE" {
                self.charset_name()?
            } else {
                self.option_value("option value")?
            };
            options.set(&key, value);
        }
    }
}
