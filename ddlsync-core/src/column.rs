//! Column classification.
//!
//! Columns are walked side by side so that positional changes are visible: a column that
//! disappears at one position and reappears at another becomes a single `Moved` alteration.

use std::collections::HashSet;

use crate::alteration::{
    aligned_diff, aligned_statements, group_and_sort, interleaved_order, Alteration,
    AlterationMeta, Change, ColumnOrder, Kind, NodeKey,
};
use crate::parser::{quote, ColumnDefinition};

const CHANGE_ORDER: [Change; 6] = [
    Change::Dropped,
    Change::Renamed,
    Change::Modified,
    Change::Moved,
    Change::Added,
    Change::Retained,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnChange {
    Added {
        this: ColumnDefinition,
        /// Preceding column in the desired schema; `None` means first.
        after: Option<String>,
    },
    Dropped {
        this: ColumnDefinition,
    },
    Modified {
        from: ColumnDefinition,
        to: ColumnDefinition,
    },
    Renamed {
        from: ColumnDefinition,
        to: ColumnDefinition,
    },
    Moved {
        from: ColumnDefinition,
        to: ColumnDefinition,
        after: Option<String>,
    },
    Retained {
        from: ColumnDefinition,
        to: ColumnDefinition,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAlteration {
    pub meta: AlterationMeta,
    pub change: ColumnChange,
}

fn position(after: &Option<String>) -> String {
    match after {
        Some(name) => format!("AFTER {}", quote(name)),
        None => "FIRST".to_string(),
    }
}

impl ColumnAlteration {
    fn new(scope: &str, change: ColumnChange, seq_num: usize) -> Self {
        let (kind, id) = match &change {
            ColumnChange::Added { this, .. } => (Change::Added, &this.name),
            ColumnChange::Dropped { this } => (Change::Dropped, &this.name),
            ColumnChange::Modified { to, .. } => (Change::Modified, &to.name),
            ColumnChange::Renamed { to, .. } => (Change::Renamed, &to.name),
            ColumnChange::Moved { to, .. } => (Change::Moved, &to.name),
            ColumnChange::Retained { to, .. } => (Change::Retained, &to.name),
        };
        let key = NodeKey::new(scope, Kind::Column, kind, id.clone());
        ColumnAlteration {
            meta: AlterationMeta::new(key, seq_num),
            change,
        }
    }

    /// Column name in the observed schema, if the column exists there.
    pub fn from_name(&self) -> Option<&str> {
        match &self.change {
            ColumnChange::Added { .. } => None,
            ColumnChange::Dropped { this } => Some(&this.name),
            ColumnChange::Modified { from, .. }
            | ColumnChange::Renamed { from, .. }
            | ColumnChange::Moved { from, .. }
            | ColumnChange::Retained { from, .. } => Some(&from.name),
        }
    }

    /// Column name in the desired schema, if the column exists there.
    pub fn to_name(&self) -> Option<&str> {
        match &self.change {
            ColumnChange::Dropped { .. } => None,
            ColumnChange::Added { this, .. } => Some(&this.name),
            ColumnChange::Modified { to, .. }
            | ColumnChange::Renamed { to, .. }
            | ColumnChange::Moved { to, .. }
            | ColumnChange::Retained { to, .. } => Some(&to.name),
        }
    }
}

impl Alteration for ColumnAlteration {
    fn statements(&self) -> Vec<String> {
        let s = match &self.change {
            ColumnChange::Added { this, after } => {
                format!("ADD COLUMN\t{}", this.string_with_pos(&position(after)))
            }
            ColumnChange::Dropped { this } => format!("DROP COLUMN\t{}", quote(&this.name)),
            ColumnChange::Modified { to, .. } => format!("MODIFY COLUMN\t{}", to),
            ColumnChange::Renamed { from, to } => {
                format!("CHANGE COLUMN\t{} {}", quote(&from.name), to)
            }
            ColumnChange::Moved { to, after, .. } => {
                format!("MODIFY COLUMN\t{}", to.string_with_pos(&position(after)))
            }
            ColumnChange::Retained { .. } => return Vec::new(),
        };
        vec![s]
    }

    fn diff(&self) -> Vec<String> {
        let s = match &self.change {
            ColumnChange::Added { this, .. } => format!("+ {}", this),
            ColumnChange::Dropped { this } => format!("- {}", this),
            ColumnChange::Modified { from, to } | ColumnChange::Renamed { from, to } => {
                format!("~ {}\t-> {}", from, to)
            }
            ColumnChange::Moved { to, .. } => format!("@ {}", to),
            ColumnChange::Retained { to, .. } => format!("  {}", to),
        };
        vec![s]
    }

    fn meta(&self) -> &AlterationMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut AlterationMeta {
        &mut self.meta
    }
}

/// All column alterations of one table.
#[derive(Debug, Clone)]
pub struct ColumnAlterations {
    pub items: Vec<ColumnAlteration>,
    pub column_order: ColumnOrder,
}

impl ColumnAlterations {
    pub fn new(scope: &str, from: &[&ColumnDefinition], to: &[&ColumnDefinition]) -> Self {
        let from_names: HashSet<&str> = from.iter().map(|c| c.name.as_str()).collect();
        let to_names: HashSet<&str> = to.iter().map(|c| c.name.as_str()).collect();
        let after_of = |p2: usize| p2.checked_sub(1).map(|i| to[i].name.clone());

        let mut items = Vec::new();
        let mut added_or_moved = Vec::new();
        let mut dropped_or_moved = Vec::new();

        let (mut p1, mut p2, mut seq) = (0, 0, 0);
        while p1 < from.len() || p2 < to.len() {
            if p1 == from.len() {
                added_or_moved.push((to[p2].clone(), after_of(p2), seq));
                p2 += 1;
                seq += 1;
                continue;
            }
            if p2 == to.len() {
                dropped_or_moved.push((from[p1].clone(), seq));
                p1 += 1;
                seq += 1;
                continue;
            }

            let (c1, c2) = (from[p1], to[p2]);
            let from_has_c2 = from_names.contains(c2.name.as_str());
            let to_has_c1 = to_names.contains(c1.name.as_str());

            if c1.equals(c2) {
                let change = ColumnChange::Retained {
                    from: c1.clone(),
                    to: c2.clone(),
                };
                items.push(ColumnAlteration::new(scope, change, seq));
                p1 += 1;
                p2 += 1;
            } else if !from_has_c2 && !to_has_c1 && c1.equals_except_name(c2) {
                let change = ColumnChange::Renamed {
                    from: c1.clone(),
                    to: c2.clone(),
                };
                items.push(ColumnAlteration::new(scope, change, seq));
                p1 += 1;
                p2 += 1;
            } else if !from_has_c2 {
                added_or_moved.push((c2.clone(), after_of(p2), seq));
                p2 += 1;
            } else if !to_has_c1 || c1.name != c2.name {
                dropped_or_moved.push((c1.clone(), seq));
                p1 += 1;
            } else {
                let change = ColumnChange::Modified {
                    from: c1.clone(),
                    to: c2.clone(),
                };
                items.push(ColumnAlteration::new(scope, change, seq));
                p1 += 1;
                p2 += 1;
            }
            seq += 1;
        }

        // An added and a dropped column of the same name is a move.
        let mut moved: HashSet<String> = HashSet::new();
        for (a, after, a_seq) in &added_or_moved {
            if let Some((d, _)) = dropped_or_moved.iter().find(|(d, _)| d.name == a.name) {
                let change = ColumnChange::Moved {
                    from: d.clone(),
                    to: a.clone(),
                    after: after.clone(),
                };
                items.push(ColumnAlteration::new(scope, change, *a_seq));
                moved.insert(a.name.clone());
            }
        }
        for (this, after, seq) in added_or_moved {
            if !moved.contains(&this.name) {
                items.push(ColumnAlteration::new(scope, ColumnChange::Added { this, after }, seq));
            }
        }
        for (this, seq) in dropped_or_moved {
            if !moved.contains(&this.name) {
                items.push(ColumnAlteration::new(scope, ColumnChange::Dropped { this }, seq));
            }
        }

        let from_order: Vec<&str> = from.iter().map(|c| c.name.as_str()).collect();
        let to_order: Vec<&str> = to.iter().map(|c| c.name.as_str()).collect();
        ColumnAlterations {
            items,
            column_order: interleaved_order(&from_order, &to_order),
        }
    }

    pub fn with_change(&self, change: Change) -> impl Iterator<Item = &ColumnAlteration> {
        self.items.iter().filter(move |a| a.key().change == change)
    }

    /// Alterations grouped by change and ordered by dependencies.
    pub fn alterations(&self) -> Vec<ColumnAlteration> {
        group_and_sort(&self.items, &CHANGE_ORDER)
    }

    pub fn statements(&self) -> Vec<String> {
        aligned_statements(&self.alterations())
    }

    pub fn diff(&self) -> Vec<String> {
        aligned_diff(&self.alterations())
    }

    pub fn is_equivalent(&self) -> bool {
        self.items.iter().all(|a| a.key().change == Change::Retained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ColumnOptions, DataType};

    fn int(name: &str, not_null: bool) -> ColumnDefinition {
        ColumnDefinition {
            name: name.to_string(),
            data_type: DataType::Integer {
                name: "INT".to_string(),
                field_len: String::new(),
                unsigned: false,
                zerofill: false,
            },
            options: ColumnOptions {
                nullability: if not_null { "NOT NULL".to_string() } else { String::new() },
                ..Default::default()
            },
        }
    }

    fn classify(from: &[ColumnDefinition], to: &[ColumnDefinition]) -> ColumnAlterations {
        let from: Vec<&ColumnDefinition> = from.iter().collect();
        let to: Vec<&ColumnDefinition> = to.iter().collect();
        ColumnAlterations::new("db.t", &from, &to)
    }

    fn changes(c: &ColumnAlterations) -> Vec<(Change, String)> {
        c.alterations()
            .iter()
            .map(|a| (a.key().change, a.id().to_string()))
            .collect()
    }

    #[test]
    fn test_identical_columns_are_retained() {
        let cols = vec![int("a", true), int("b", false)];
        let c = classify(&cols, &cols);
        assert!(c.is_equivalent());
        assert!(c.statements().is_empty());
        assert_eq!(c.diff(), vec!["  `a` INT NOT NULL", "  `b` INT"]);
    }

    #[test]
    fn test_rename() {
        let c = classify(&[int("old_name", true)], &[int("new_name", true)]);
        assert_eq!(changes(&c), vec![(Change::Renamed, "new_name".to_string())]);
        assert_eq!(
            c.statements(),
            vec!["CHANGE COLUMN `old_name` `new_name` INT NOT NULL"]
        );
        assert_eq!(c.diff(), vec!["~ `old_name` INT NOT NULL -> `new_name` INT NOT NULL"]);
    }

    #[test]
    fn test_rename_is_not_detected_on_name_collision() {
        let c = classify(&[int("a", true), int("b", true)], &[int("b", true)]);
        assert_eq!(
            changes(&c),
            vec![
                (Change::Dropped, "a".to_string()),
                (Change::Retained, "b".to_string())
            ]
        );
    }

    #[test]
    fn test_add_and_drop() {
        let c = classify(&[int("a", false), int("b", false)], &[int("a", false), int("c", true)]);
        assert_eq!(
            c.statements(),
            vec!["ADD COLUMN  `c` INT NOT NULL AFTER `a`", "DROP COLUMN `b`"]
        );
        assert!(!c.is_equivalent());
    }

    #[test]
    fn test_added_first_column() {
        let c = classify(&[int("a", false)], &[int("z", true), int("a", false)]);
        assert_eq!(c.statements(), vec!["ADD COLUMN `z` INT NOT NULL FIRST"]);
    }

    #[test]
    fn test_modify() {
        let c = classify(&[int("a", false)], &[int("a", true)]);
        assert_eq!(changes(&c), vec![(Change::Modified, "a".to_string())]);
        assert_eq!(c.statements(), vec!["MODIFY COLUMN `a` INT NOT NULL"]);
    }

    #[test]
    fn test_move() {
        let c = classify(
            &[int("a", false), int("b", false), int("c", false)],
            &[int("b", false), int("c", false), int("a", false)],
        );
        let moved: Vec<ColumnAlteration> = c.with_change(Change::Moved).cloned().collect();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].id(), "a");
        assert_eq!(moved[0].statements(), vec!["MODIFY COLUMN\t`a`\tINT\tAFTER `c`"]);
        assert!(c.with_change(Change::Added).next().is_none());
        assert!(c.with_change(Change::Dropped).next().is_none());
        assert!(c.diff().contains(&"@ `a` INT".to_string()));
    }

    #[test]
    fn test_column_order_covers_both_sides() {
        let c = classify(&[int("a", false), int("b", false)], &[int("a", false), int("c", false)]);
        assert!(c.column_order.contains_key("b"));
        assert!(c.column_order.contains_key("c"));
        assert!(c.column_order["a"] < c.column_order["c"]);
    }
}
