//! Table option classification. All options of a table form a single alteration.

use crate::alteration::{align, Alteration, AlterationMeta, Change, Kind, NodeKey};
use crate::parser::{option_value, OptionMap, TableOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptionAlteration {
    pub meta: AlterationMeta,
    pub from: TableOptions,
    pub to: TableOptions,
}

impl TableOptionAlteration {
    pub fn new(scope: &str, from: &TableOptions, to: &TableOptions) -> Self {
        let mut from = from.clone();
        let mut to = to.clone();

        // AUTO_INCREMENT only matters when the desired schema sets it, and is never lowered.
        if to.auto_increment.is_empty() {
            from.auto_increment.clear();
        }
        if let (Ok(t), Ok(f)) = (
            to.auto_increment.parse::<u64>(),
            from.auto_increment.parse::<u64>(),
        ) {
            if t < f {
                to.auto_increment.clear();
                from.auto_increment.clear();
            }
        }

        let change = if changed_options(&from, &to).is_empty() {
            Change::Retained
        } else {
            Change::Modified
        };
        TableOptionAlteration {
            meta: AlterationMeta::new(
                NodeKey::new(scope, Kind::TableOption, change, "table options"),
                0,
            ),
            from,
            to,
        }
    }

    pub fn is_equivalent(&self) -> bool {
        self.statements().is_empty()
    }
}

/// Options of `to` whose effective value differs from `from`. Options only `from`
/// spells out are left alone.
fn changed_options(from: &TableOptions, to: &TableOptions) -> OptionMap {
    let from = from.map_with_default();
    to.map_with_default()
        .into_iter()
        .filter(|(k, v)| option_value(&from, k) != Some(v.as_str()))
        .collect()
}

impl Alteration for TableOptionAlteration {
    fn statements(&self) -> Vec<String> {
        changed_options(&self.from, &self.to)
            .into_iter()
            .map(|(k, v)| format!("{} = {}", k, v))
            .collect()
    }

    fn diff(&self) -> Vec<String> {
        let from = self.from.map_with_default();
        let spelled = self.to.map();
        let mut lines = Vec::new();
        for (k, v) in self.to.map_with_default() {
            match option_value(&from, k) {
                None => lines.push(format!("+ {} = {}", k, v)),
                Some(old) if old != v => lines.push(format!("~ {} = {}\t-> {} = {}", k, old, k, v)),
                Some(_) if option_value(&spelled, k).is_some() => {
                    lines.push(format!("  {} = {}", k, v))
                }
                Some(_) => {}
            }
        }
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

    fn options(pairs: &[(&str, &str)]) -> TableOptions {
        let mut o = TableOptions {
            actual_charset: "utf8mb4".to_string(),
            actual_collate: "utf8mb4_0900_ai_ci".to_string(),
            ..Default::default()
        };
        for (k, v) in pairs {
            o.set(k, v.to_string());
        }
        o
    }

    #[test]
    fn test_auto_increment_ignored_when_not_desired() {
        let t = TableOptionAlteration::new(
            "db.t",
            &options(&[("AUTO_INCREMENT", "42")]),
            &options(&[]),
        );
        assert!(t.is_equivalent());
        assert!(t.diff().is_empty());
    }

    #[test]
    fn test_options_only_observed_are_retained() {
        let t = TableOptionAlteration::new(
            "db.t",
            &options(&[("ROW_FORMAT", "DYNAMIC"), ("DEFAULT CHARACTER SET", "utf8mb4")]),
            &options(&[]),
        );
        assert_eq!(t.key().change, Change::Retained);
        assert!(t.statements().is_empty());
    }

    #[test]
    fn test_auto_increment_never_lowered() {
        let t = TableOptionAlteration::new(
            "db.t",
            &options(&[("AUTO_INCREMENT", "42")]),
            &options(&[("AUTO_INCREMENT", "10")]),
        );
        assert!(t.is_equivalent());

        let raised = TableOptionAlteration::new(
            "db.t",
            &options(&[("AUTO_INCREMENT", "42")]),
            &options(&[("AUTO_INCREMENT", "100")]),
        );
        assert_eq!(raised.statements(), vec!["AUTO_INCREMENT = 100"]);
        assert_eq!(raised.key().change, Change::Modified);
    }

    #[test]
    fn test_changed_and_spelled_options_in_diff() {
        let t = TableOptionAlteration::new(
            "db.t",
            &options(&[("ENGINE", "MyISAM"), ("COMMENT", "'x'")]),
            &options(&[("ENGINE", "MyISAM"), ("COMMENT", "'y'")]),
        );
        assert_eq!(t.statements(), vec!["COMMENT = 'y'"]);
        let diff = t.diff();
        assert!(diff.contains(&"  ENGINE = MyISAM".to_string()));
        assert!(diff
            .iter()
            .any(|l| l.starts_with("~ COMMENT = 'x'") && l.ends_with("-> COMMENT = 'y'")));
        assert!(!diff.iter().any(|l| l.contains("CHARACTER SET")));
    }
}
