//! Column data types.

use std::fmt;

/// A column data type. Type names are stored upper-case in canonical form
/// (`INTEGER` is stored as `INT`, `NUMERIC` as `DECIMAL`, and so on).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// BIT, TINYINT, SMALLINT, MEDIUMINT, INT, BIGINT, BOOL.
    Integer {
        name: String,
        field_len: String,
        unsigned: bool,
        zerofill: bool,
    },
    /// DECIMAL.
    FixedPoint {
        name: String,
        field_len: String,
        field_scale: String,
        unsigned: bool,
        zerofill: bool,
    },
    /// FLOAT, DOUBLE.
    FloatingPoint {
        name: String,
        field_len: String,
        field_scale: String,
        unsigned: bool,
        zerofill: bool,
    },
    /// DATE, TIME, DATETIME, TIMESTAMP, YEAR.
    DateTime { name: String, field_len: String },
    /// Character and binary strings, TEXT and BLOB types.
    String(StringType),
    /// ENUM and SET.
    StringList {
        name: String,
        values: Vec<String>,
        charset: String,
        collation: String,
    },
    /// JSON.
    Json { name: String },
    /// GEOMETRY, POINT, POLYGON and the other spatial types.
    Spatial { name: String },
}

/// A string type with its explicit and inherited character set and collation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringType {
    pub name: String,
    pub field_len: String,
    pub charset: String,
    pub collation: String,
    /// Character set inherited from the table (filled in by normalization).
    pub default_charset: String,
    /// Collation inherited from the table (filled in by normalization).
    pub default_collation: String,
}

impl StringType {
    pub fn actual_charset(&self) -> &str {
        if self.charset.is_empty() {
            &self.default_charset
        } else {
            &self.charset
        }
    }

    pub fn actual_collation(&self) -> &str {
        if self.collation.is_empty() {
            &self.default_collation
        } else {
            &self.collation
        }
    }
}

impl DataType {
    /// Canonical upper-case type name.
    pub fn name(&self) -> &str {
        match self {
            DataType::Integer { name, .. }
            | DataType::FixedPoint { name, .. }
            | DataType::FloatingPoint { name, .. }
            | DataType::DateTime { name, .. }
            | DataType::StringList { name, .. }
            | DataType::Json { name }
            | DataType::Spatial { name } => name,
            DataType::String(s) => &s.name,
        }
    }

    /// Whether values of this type are numbers (affects default-value normalization).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Integer { .. } | DataType::FixedPoint { .. } | DataType::FloatingPoint { .. }
        )
    }

    /// Structural equality where string types compare by their effective character set and
    /// collation instead of by which of them was spelled out.
    pub fn equivalent(&self, other: &DataType) -> bool {
        match (self, other) {
            (DataType::String(a), DataType::String(b)) => {
                a.name == b.name
                    && a.field_len == b.field_len
                    && a.actual_charset() == b.actual_charset()
                    && a.actual_collation() == b.actual_collation()
            }
            _ => self == other,
        }
    }

    /// Apply a `COLLATE` clause that followed the type among the column options.
    pub fn set_collation(&mut self, value: String) -> bool {
        match self {
            DataType::String(s) => {
                s.collation = value;
                true
            }
            DataType::StringList { collation, .. } => {
                *collation = value;
                true
            }
            _ => false,
        }
    }
}

fn len_and_scale(len: &str, scale: &str) -> String {
    match (len.is_empty(), scale.is_empty()) {
        (true, _) => String::new(),
        (false, true) => format!("({})", len),
        (false, false) => format!("({}, {})", len, scale),
    }
}

fn sign_flags(unsigned: bool, zerofill: bool) -> String {
    let mut s = String::new();
    if unsigned {
        s.push_str(" UNSIGNED");
    }
    if zerofill {
        s.push_str(" ZEROFILL");
    }
    s
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer {
                name,
                field_len,
                unsigned,
                zerofill,
            } => write!(
                f,
                "{}{}{}",
                name,
                len_and_scale(field_len, ""),
                sign_flags(*unsigned, *zerofill)
            ),
            DataType::FixedPoint {
                name,
                field_len,
                field_scale,
                unsigned,
                zerofill,
            }
            | DataType::FloatingPoint {
                name,
                field_len,
                field_scale,
                unsigned,
                zerofill,
            } => write!(
                f,
                "{}{}{}",
                name,
                len_and_scale(field_len, field_scale),
                sign_flags(*unsigned, *zerofill)
            ),
            DataType::DateTime { name, field_len } => {
                write!(f, "{}{}", name, len_and_scale(field_len, ""))
            }
            DataType::String(s) => {
                write!(f, "{}{}", s.name, len_and_scale(&s.field_len, ""))?;
                if !s.charset.is_empty() && s.charset != s.default_charset {
                    write!(f, " CHARACTER SET {}", s.charset)?;
                }
                if !s.collation.is_empty() && s.collation != s.default_collation {
                    write!(f, " COLLATE {}", s.collation)?;
                }
                Ok(())
            }
            DataType::StringList {
                name,
                values,
                charset,
                collation,
            } => {
                write!(f, "{}", name)?;
                if !values.is_empty() {
                    write!(f, "({})", values.join(", "))?;
                }
                if !charset.is_empty() {
                    write!(f, " CHARACTER SET {}", charset)?;
                }
                if !collation.is_empty() {
                    write!(f, " COLLATE {}", collation)?;
                }
                Ok(())
            }
            DataType::Json { name } | DataType::Spatial { name } => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varchar(charset: &str, default_charset: &str) -> DataType {
        DataType::String(StringType {
            name: "VARCHAR".to_string(),
            field_len: "10".to_string(),
            charset: charset.to_string(),
            default_charset: default_charset.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_display_numeric_types() {
        let t = DataType::Integer {
            name: "INT".to_string(),
            field_len: "5".to_string(),
            unsigned: true,
            zerofill: true,
        };
        assert_eq!(t.to_string(), "INT(5) UNSIGNED ZEROFILL");
        let t = DataType::FixedPoint {
            name: "DECIMAL".to_string(),
            field_len: "10".to_string(),
            field_scale: "2".to_string(),
            unsigned: false,
            zerofill: false,
        };
        assert_eq!(t.to_string(), "DECIMAL(10, 2)");
    }

    #[test]
    fn test_display_hides_inherited_charset() {
        assert_eq!(varchar("utf8mb4", "utf8mb4").to_string(), "VARCHAR(10)");
        assert_eq!(
            varchar("latin1", "utf8mb4").to_string(),
            "VARCHAR(10) CHARACTER SET latin1"
        );
    }

    #[test]
    fn test_equivalent_compares_effective_charset() {
        assert!(varchar("", "utf8mb4").equivalent(&varchar("utf8mb4", "utf8mb4")));
        assert!(!varchar("", "utf8mb4").equivalent(&varchar("", "latin1")));
    }

    #[test]
    fn test_display_enum() {
        let t = DataType::StringList {
            name: "ENUM".to_string(),
            values: vec!["'a'".to_string(), "'b'".to_string()],
            charset: String::new(),
            collation: "utf8mb4_bin".to_string(),
        };
        assert_eq!(t.to_string(), "ENUM('a', 'b') COLLATE utf8mb4_bin");
    }
}
