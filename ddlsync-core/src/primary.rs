//! Primary key classification.

use crate::alteration::{
    aligned_diff, aligned_statements, group_and_sort, key_id, key_order, match_by_identity,
    Alteration, AlterationMeta, Change, ColumnOrder, Kind, NodeKey,
};
use crate::parser::{key_parts_contain, PrimaryKeyDefinition};

const CHANGE_ORDER: [Change; 4] = [
    Change::Dropped,
    Change::Modified,
    Change::Added,
    Change::Retained,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryKeyChange {
    Added(PrimaryKeyDefinition),
    Dropped(PrimaryKeyDefinition),
    /// There is no way to alter a primary key in place; it is dropped and added again.
    Modified {
        from: PrimaryKeyDefinition,
        to: PrimaryKeyDefinition,
    },
    Retained(PrimaryKeyDefinition),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyAlteration {
    pub meta: AlterationMeta,
    pub change: PrimaryKeyChange,
}

impl PrimaryKeyAlteration {
    fn new(scope: &str, change: PrimaryKeyChange, seq_num: usize) -> Self {
        let (kind, def) = match &change {
            PrimaryKeyChange::Added(d) => (Change::Added, d),
            PrimaryKeyChange::Dropped(d) => (Change::Dropped, d),
            PrimaryKeyChange::Modified { to, .. } => (Change::Modified, to),
            PrimaryKeyChange::Retained(d) => (Change::Retained, d),
        };
        let key = NodeKey::new(scope, Kind::PrimaryKey, kind, key_id(&def.key_parts));
        PrimaryKeyAlteration {
            meta: AlterationMeta::new(key, seq_num),
            change,
        }
    }

    fn contains_column(&self, column: &str) -> bool {
        match &self.change {
            PrimaryKeyChange::Added(d)
            | PrimaryKeyChange::Dropped(d)
            | PrimaryKeyChange::Retained(d) => key_parts_contain(&d.key_parts, column),
            PrimaryKeyChange::Modified { from, to } => {
                key_parts_contain(&from.key_parts, column)
                    || key_parts_contain(&to.key_parts, column)
            }
        }
    }
}

impl Alteration for PrimaryKeyAlteration {
    fn statements(&self) -> Vec<String> {
        match &self.change {
            PrimaryKeyChange::Added(d) => vec![format!("ADD {}", d)],
            PrimaryKeyChange::Dropped(_) => vec!["DROP PRIMARY KEY".to_string()],
            PrimaryKeyChange::Modified { to, .. } => {
                vec!["DROP PRIMARY KEY".to_string(), format!("ADD {}", to)]
            }
            PrimaryKeyChange::Retained(_) => Vec::new(),
        }
    }

    fn diff(&self) -> Vec<String> {
        let s = match &self.change {
            PrimaryKeyChange::Added(d) => format!("+ {}", d),
            PrimaryKeyChange::Dropped(d) => format!("- {}", d),
            PrimaryKeyChange::Modified { from, to } => format!("~ {}\t-> {}", from, to),
            PrimaryKeyChange::Retained(d) => format!("  {}", d),
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

/// Equality where an unnamed desired key matches any name.
fn primary_keys_equal(from: &PrimaryKeyDefinition, to: &PrimaryKeyDefinition) -> bool {
    from.key_parts == to.key_parts
        && from.options == to.options
        && (to.constraint_name.is_empty() || from.constraint_name == to.constraint_name)
}

#[derive(Debug, Clone, Default)]
pub struct PrimaryKeyAlterations {
    pub items: Vec<PrimaryKeyAlteration>,
}

impl PrimaryKeyAlterations {
    pub fn new(
        scope: &str,
        from: &[&PrimaryKeyDefinition],
        to: &[&PrimaryKeyDefinition],
        column_order: &ColumnOrder,
    ) -> Self {
        let all = from
            .iter()
            .chain(to.iter())
            .map(|d| (d.string_key_part_list(), d.key_parts.as_slice()))
            .collect();
        let order = key_order(all, column_order);
        let matched = match_by_identity(from, to, PrimaryKeyDefinition::string_key_part_list);

        let mut items = Vec::new();
        for (id, d) in matched.only_from {
            items.push(PrimaryKeyAlteration::new(
                scope,
                PrimaryKeyChange::Dropped(d.clone()),
                order[&id],
            ));
        }
        for (id, d) in matched.only_to {
            items.push(PrimaryKeyAlteration::new(
                scope,
                PrimaryKeyChange::Added(d.clone()),
                order[&id],
            ));
        }
        for (id, f, t) in matched.both {
            let change = if primary_keys_equal(f, t) {
                PrimaryKeyChange::Retained(t.clone())
            } else {
                PrimaryKeyChange::Modified {
                    from: f.clone(),
                    to: t.clone(),
                }
            };
            items.push(PrimaryKeyAlteration::new(scope, change, order[&id]));
        }
        PrimaryKeyAlterations { items }
    }

    pub fn with_change(&self, change: Change) -> impl Iterator<Item = &PrimaryKeyAlteration> {
        self.items.iter().filter(move |a| a.key().change == change)
    }

    /// A modified key column is changed after the primary key holding it is dropped, and
    /// before a primary key holding it is added.
    pub fn handle_column_modify(&mut self, modify: &mut dyn Alteration, column: &str) {
        for a in self.items.iter_mut().filter(|a| a.contains_column(column)) {
            let change = a.key().change;
            match change {
                Change::Dropped => modify.add_depends_on(a.key()),
                Change::Added => a.add_depends_on(modify.key()),
                _ => {}
            }
        }
    }

    pub fn alterations(&self) -> Vec<PrimaryKeyAlteration> {
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
    use crate::parser::KeyPart;

    fn pk(columns: &[&str]) -> PrimaryKeyDefinition {
        PrimaryKeyDefinition {
            key_parts: columns.iter().map(|c| KeyPart::column(c)).collect(),
            ..Default::default()
        }
    }

    fn classify(
        from: &[PrimaryKeyDefinition],
        to: &[PrimaryKeyDefinition],
    ) -> PrimaryKeyAlterations {
        let from: Vec<&PrimaryKeyDefinition> = from.iter().collect();
        let to: Vec<&PrimaryKeyDefinition> = to.iter().collect();
        PrimaryKeyAlterations::new("db.t", &from, &to, &ColumnOrder::new())
    }

    #[test]
    fn test_added_primary_key() {
        let p = classify(&[], &[pk(&["id"])]);
        assert_eq!(p.statements(), vec!["ADD PRIMARY KEY (`id`)"]);
        assert_eq!(p.diff(), vec!["+ PRIMARY KEY (`id`)"]);
        assert!(!p.is_equivalent());
    }

    #[test]
    fn test_changed_columns_drop_then_add() {
        let p = classify(&[pk(&["id"])], &[pk(&["id", "tenant"])]);
        assert_eq!(
            p.statements(),
            vec!["DROP PRIMARY KEY", "ADD PRIMARY KEY (`id`, `tenant`)"]
        );
    }

    #[test]
    fn test_unnamed_desired_key_matches_named_key() {
        let mut named = pk(&["id"]);
        named.constraint_name = "pk".to_string();
        let p = classify(&[named], &[pk(&["id"])]);
        assert!(p.is_equivalent());
        assert!(p.statements().is_empty());
    }

    #[test]
    fn test_modified_options() {
        let mut with_comment = pk(&["id"]);
        with_comment.options.comment = "'main'".to_string();
        let p = classify(&[pk(&["id"])], &[with_comment]);
        assert_eq!(
            p.statements(),
            vec!["DROP PRIMARY KEY", "ADD PRIMARY KEY (`id`) COMMENT 'main'"]
        );
        assert_eq!(
            p.diff(),
            vec!["~ PRIMARY KEY (`id`) -> PRIMARY KEY (`id`) COMMENT 'main'"]
        );
    }

    #[test]
    fn test_handle_column_modify() {
        let mut p = classify(&[pk(&["a"])], &[pk(&["b"])]);
        let mut modify = PrimaryKeyAlteration::new(
            "db.t",
            PrimaryKeyChange::Retained(pk(&["x"])),
            0,
        );
        p.handle_column_modify(&mut modify, "a");
        let dropped = p.with_change(Change::Dropped).next().unwrap().key().clone();
        assert_eq!(modify.depends_on(), &[dropped]);

        p.handle_column_modify(&mut modify, "b");
        let added = p.with_change(Change::Added).next().unwrap();
        assert_eq!(added.depends_on(), &[modify.key().clone()]);
    }
}
