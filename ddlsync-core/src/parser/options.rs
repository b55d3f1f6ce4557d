//! Database, table and index options.

use std::fmt;

/// An ordered list of rendered `KEY = value` pairs.
pub type OptionMap = Vec<(&'static str, String)>;

/// Look up a key in an [`OptionMap`].
pub fn option_value<'a>(map: &'a OptionMap, key: &str) -> Option<&'a str> {
    map.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
}

/// Options of `CREATE DATABASE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseOptions {
    pub default_charset: String,
    pub default_collate: String,
    pub default_encryption: String,
    /// Effective character set after server defaults are applied.
    pub actual_charset: String,
    /// Effective collation after server defaults are applied.
    pub actual_collate: String,
}

impl DatabaseOptions {
    /// Options that were spelled out in the statement, in canonical order.
    pub fn map(&self) -> OptionMap {
        let mut ret = OptionMap::new();
        if !self.default_charset.is_empty() {
            ret.push(("DEFAULT CHARACTER SET", self.default_charset.clone()));
        }
        if !self.default_collate.is_empty() {
            ret.push(("DEFAULT COLLATE", self.default_collate.clone()));
        }
        if !self.default_encryption.is_empty() {
            ret.push(("DEFAULT ENCRYPTION", self.default_encryption.clone()));
        }
        ret
    }

    /// Like [`map`](Self::map), with the effective character set and collation filled in.
    pub fn map_with_default(&self) -> OptionMap {
        let mut ret = vec![
            ("DEFAULT CHARACTER SET", self.actual_charset.clone()),
            ("DEFAULT COLLATE", self.actual_collate.clone()),
        ];
        if !self.default_encryption.is_empty() {
            ret.push(("DEFAULT ENCRYPTION", self.default_encryption.clone()));
        }
        ret
    }

    /// Canonical `KEY = value` strings.
    pub fn strings(&self) -> Vec<String> {
        self.map()
            .into_iter()
            .map(|(k, v)| format!("{} = {}", k, v))
            .collect()
    }
}

/// Options following the definitions of `CREATE TABLE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    pub autoextend_size: String,
    pub auto_increment: String,
    pub avg_row_length: String,
    pub default_charset: String,
    pub checksum: String,
    pub default_collate: String,
    pub comment: String,
    pub compression: String,
    pub connection: String,
    pub data_directory: String,
    pub index_directory: String,
    pub delay_key_write: String,
    pub encryption: String,
    pub engine: String,
    pub engine_attribute: String,
    pub insert_method: String,
    pub key_block_size: String,
    pub max_rows: String,
    pub min_rows: String,
    pub pack_keys: String,
    pub password: String,
    pub row_format: String,
    pub secondary_engine_attribute: String,
    pub stats_auto_recalc: String,
    pub stats_persistent: String,
    pub stats_sample_pages: String,
    pub tablespace: String,
    pub tablespace_storage: String,
    pub union: Vec<String>,
    /// Character set declared on the enclosing database, if any.
    pub database_charset: String,
    /// Collation declared on the enclosing database, if any.
    pub database_collate: String,
    /// Effective character set after database and server defaults are applied.
    pub actual_charset: String,
    /// Effective collation after database and server defaults are applied.
    pub actual_collate: String,
}

impl TableOptions {
    /// Set an option by its canonical key. Returns false for unknown keys.
    pub fn set(&mut self, key: &str, value: String) -> bool {
        let field = match key {
            "AUTOEXTEND_SIZE" => &mut self.autoextend_size,
            "AUTO_INCREMENT" => &mut self.auto_increment,
            "AVG_ROW_LENGTH" => &mut self.avg_row_length,
            "DEFAULT CHARACTER SET" => &mut self.default_charset,
            "CHECKSUM" => &mut self.checksum,
            "DEFAULT COLLATE" => &mut self.default_collate,
            "COMMENT" => &mut self.comment,
            "COMPRESSION" => &mut self.compression,
            "CONNECTION" => &mut self.connection,
            "DATA DIRECTORY" => &mut self.data_directory,
            "INDEX DIRECTORY" => &mut self.index_directory,
            "DELAY_KEY_WRITE" => &mut self.delay_key_write,
            "ENCRYPTION" => &mut self.encryption,
            "ENGINE" => &mut self.engine,
            "ENGINE_ATTRIBUTE" => &mut self.engine_attribute,
            "INSERT_METHOD" => &mut self.insert_method,
            "KEY_BLOCK_SIZE" => &mut self.key_block_size,
            "MAX_ROWS" => &mut self.max_rows,
            "MIN_ROWS" => &mut self.min_rows,
            "PACK_KEYS" => &mut self.pack_keys,
            "PASSWORD" => &mut self.password,
            "ROW_FORMAT" => &mut self.row_format,
            "SECONDARY_ENGINE_ATTRIBUTE" => &mut self.secondary_engine_attribute,
            "STATS_AUTO_RECALC" => &mut self.stats_auto_recalc,
            "STATS_PERSISTENT" => &mut self.stats_persistent,
            "STATS_SAMPLE_PAGES" => &mut self.stats_sample_pages,
            "TABLESPACE" => &mut self.tablespace,
            _ => return false,
        };
        *field = value;
        true
    }

    fn build_map(&self, charset: Option<&str>, collate: Option<&str>) -> OptionMap {
        let mut ret = OptionMap::new();
        let mut put = |k: &'static str, v: &str| {
            if !v.is_empty() {
                ret.push((k, v.to_string()));
            }
        };
        put("AUTOEXTEND_SIZE", &self.autoextend_size);
        put("AUTO_INCREMENT", &self.auto_increment);
        put("AVG_ROW_LENGTH", &self.avg_row_length);
        put("DEFAULT CHARACTER SET", charset.unwrap_or_default());
        put("CHECKSUM", &self.checksum);
        put("DEFAULT COLLATE", collate.unwrap_or_default());
        put("COMMENT", &self.comment);
        put("COMPRESSION", &self.compression);
        put("CONNECTION", &self.connection);
        put("DATA DIRECTORY", &self.data_directory);
        put("INDEX DIRECTORY", &self.index_directory);
        put("DELAY_KEY_WRITE", &self.delay_key_write);
        put("ENCRYPTION", &self.encryption);
        put("ENGINE", &self.engine);
        put("ENGINE_ATTRIBUTE", &self.engine_attribute);
        put("INSERT_METHOD", &self.insert_method);
        put("KEY_BLOCK_SIZE", &self.key_block_size);
        put("MAX_ROWS", &self.max_rows);
        put("MIN_ROWS", &self.min_rows);
        put("PACK_KEYS", &self.pack_keys);
        put("PASSWORD", &self.password);
        put("ROW_FORMAT", &self.row_format);
        put("SECONDARY_ENGINE_ATTRIBUTE", &self.secondary_engine_attribute);
        put("STATS_AUTO_RECALC", &self.stats_auto_recalc);
        put("STATS_PERSISTENT", &self.stats_persistent);
        put("STATS_SAMPLE_PAGES", &self.stats_sample_pages);
        if !self.tablespace.is_empty() {
            let v = if self.tablespace_storage.is_empty() {
                self.tablespace.clone()
            } else {
                format!("{} STORAGE {}", self.tablespace, self.tablespace_storage)
            };
            ret.push(("TABLESPACE", v));
        }
        if !self.union.is_empty() {
            let tables: Vec<String> = self.union.iter().map(|t| format!("`{}`", t)).collect();
            ret.push(("UNION", format!("({})", tables.join(", "))));
        }
        ret
    }

    /// Options that were spelled out in the statement, in canonical order. A character set
    /// or collation equal to the one declared on the database is left out.
    pub fn map(&self) -> OptionMap {
        let charset = (self.default_charset != self.database_charset)
            .then_some(self.default_charset.as_str());
        let collate = (self.default_collate != self.database_collate)
            .then_some(self.default_collate.as_str());
        self.build_map(charset, collate)
    }

    /// Like [`map`](Self::map), with the effective character set and collation filled in.
    pub fn map_with_default(&self) -> OptionMap {
        self.build_map(Some(&self.actual_charset), Some(&self.actual_collate))
    }

    /// Canonical `KEY = value` strings.
    pub fn strings(&self) -> Vec<String> {
        self.map()
            .into_iter()
            .map(|(k, v)| format!("{} = {}", k, v))
            .collect()
    }
}

/// Options of primary keys, unique keys and indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub index_type: String,
    pub key_block_size: String,
    pub parser: String,
    pub comment: String,
    pub visibility: String,
}

impl IndexOptions {
    pub fn is_empty(&self) -> bool {
        *self == IndexOptions::default()
    }

    /// Options of `self` that are set and differ from `other`.
    pub fn diff(&self, other: &IndexOptions) -> IndexOptions {
        let pick = |a: &String, b: &String| {
            if !a.is_empty() && a != b {
                a.clone()
            } else {
                String::new()
            }
        };
        IndexOptions {
            index_type: pick(&self.index_type, &other.index_type),
            key_block_size: pick(&self.key_block_size, &other.key_block_size),
            parser: pick(&self.parser, &other.parser),
            comment: pick(&self.comment, &other.comment),
            visibility: pick(&self.visibility, &other.visibility),
        }
    }
}

impl fmt::Display for IndexOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.index_type.is_empty() {
            parts.push(format!("USING {}", self.index_type));
        }
        if !self.key_block_size.is_empty() {
            parts.push(format!("KEY_BLOCK_SIZE {}", self.key_block_size));
        }
        if !self.parser.is_empty() {
            parts.push(format!("WITH PARSER {}", self.parser));
        }
        if !self.comment.is_empty() {
            parts.push(format!("COMMENT {}", self.comment));
        }
        if !self.visibility.is_empty() {
            parts.push(self.visibility.clone());
        }
        write!(f, "{}", parts.join(" "))
    }
}
