//! Database option classification.

use crate::alteration::{align, Alteration, AlterationMeta, Change, Kind, NodeKey};
use crate::parser::{option_value, DatabaseOptions, OptionMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOptionAlteration {
    pub meta: AlterationMeta,
    pub from: DatabaseOptions,
    pub to: DatabaseOptions,
}

impl DatabaseOptionAlteration {
    /// Options are Modified only when some effective value changes, so spelling out
    /// a server default is Retained.
    pub fn new(scope: &str, from: &DatabaseOptions, to: &DatabaseOptions) -> Self {
        let change = if changed_options(from, to).is_empty() {
            Change::Retained
        } else {
            Change::Modified
        };
        DatabaseOptionAlteration {
            meta: AlterationMeta::new(
                NodeKey::new(scope, Kind::DatabaseOption, change, "database options"),
                0,
            ),
            from: from.clone(),
            to: to.clone(),
        }
    }
}

/// Options of `to` whose effective value differs from `from`.
fn changed_options(from: &DatabaseOptions, to: &DatabaseOptions) -> OptionMap {
    let from = from.map_with_default();
    to.map_with_default()
        .into_iter()
        .filter(|(k, v)| option_value(&from, k) != Some(v.as_str()))
        .collect()
}

impl Alteration for DatabaseOptionAlteration {
    /// `KEY = value` clauses, compared on the effective character set and collation.
    fn statements(&self) -> Vec<String> {
        changed_options(&self.from, &self.to)
            .into_iter()
            .map(|(k, v)| format!("{} = {}", k, v))
            .collect()
    }

    fn diff(&self) -> Vec<String> {
        let from = self.from.map();
        let lines: Vec<String> = self
            .to
            .map()
            .into_iter()
            .map(|(k, v)| match option_value(&from, k) {
                None => format!("+ {} = {}", k, v),
                Some(old) if old != v => format!("~ {} = {}\t-> {} = {}", k, old, k, v),
                Some(_) => format!("  {} = {}", k, v),
            })
            .collect();
        align(&lines)
    }

    fn meta(&self) -> &AlterationMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut AlterationMeta {
        &mut self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(charset: &str, collate: &str, actual_collate: &str) -> DatabaseOptions {
        DatabaseOptions {
            default_charset: charset.to_string(),
            default_collate: collate.to_string(),
            actual_charset: "utf8mb4".to_string(),
            actual_collate: actual_collate.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_collation_change() {
        let d = DatabaseOptionAlteration::new(
            "db",
            &options("utf8mb4", "", "utf8mb4_0900_ai_ci"),
            &options("utf8mb4", "utf8mb4_bin", "utf8mb4_bin"),
        );
        assert_eq!(d.key().change, Change::Modified);
        assert_eq!(d.statements(), vec!["DEFAULT COLLATE = utf8mb4_bin"]);
        assert_eq!(
            d.diff(),
            vec![
                "  DEFAULT CHARACTER SET = utf8mb4",
                "+ DEFAULT COLLATE = utf8mb4_bin",
            ]
        );
    }

    #[test]
    fn test_spelling_out_the_default_needs_no_statement() {
        let d = DatabaseOptionAlteration::new(
            "db",
            &options("", "", "utf8mb4_0900_ai_ci"),
            &options("utf8mb4", "", "utf8mb4_0900_ai_ci"),
        );
        assert_eq!(d.key().change, Change::Retained);
        assert!(d.statements().is_empty());
        assert_eq!(d.diff(), vec!["+ DEFAULT CHARACTER SET = utf8mb4"]);
    }
}
