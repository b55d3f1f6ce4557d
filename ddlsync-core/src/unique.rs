//! Unique key classification.

use crate::alteration::{
    aligned_diff, aligned_statements, group_and_sort, key_id, key_order, match_by_identity,
    name_or_placeholder, Alteration, AlterationMeta, Change, ColumnOrder, Kind, NodeKey,
};
use crate::parser::{key_parts_contain, UniqueKeyDefinition};

const CHANGE_ORDER: [Change; 5] = [
    Change::Dropped,
    Change::Renamed,
    Change::Modified,
    Change::Added,
    Change::Retained,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueKeyChange {
    Added(UniqueKeyDefinition),
    Dropped(UniqueKeyDefinition),
    Modified {
        from: UniqueKeyDefinition,
        to: UniqueKeyDefinition,
    },
    Renamed {
        from: UniqueKeyDefinition,
        to: UniqueKeyDefinition,
    },
    Retained(UniqueKeyDefinition),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKeyAlteration {
    pub meta: AlterationMeta,
    pub change: UniqueKeyChange,
}

fn index_name(def: &UniqueKeyDefinition) -> String {
    name_or_placeholder(&def.index_name, "index", &def.string_key_part_list())
}

impl UniqueKeyAlteration {
    fn new(scope: &str, change: UniqueKeyChange, seq_num: usize) -> Self {
        let (kind, def) = match &change {
            UniqueKeyChange::Added(d) => (Change::Added, d),
            UniqueKeyChange::Dropped(d) => (Change::Dropped, d),
            UniqueKeyChange::Modified { to, .. } => (Change::Modified, to),
            UniqueKeyChange::Renamed { from, .. } => (Change::Renamed, from),
            UniqueKeyChange::Retained(d) => (Change::Retained, d),
        };
        let key = NodeKey::new(scope, Kind::UniqueKey, kind, key_id(&def.key_parts));
        UniqueKeyAlteration {
            meta: AlterationMeta::new(key, seq_num),
            change,
        }
    }

    /// Index name this alteration frees up in the observed schema.
    fn released_name(&self) -> Option<&str> {
        match &self.change {
            UniqueKeyChange::Dropped(d) | UniqueKeyChange::Renamed { from: d, .. } => {
                Some(&d.index_name)
            }
            _ => None,
        }
    }
}

impl Alteration for UniqueKeyAlteration {
    fn statements(&self) -> Vec<String> {
        let s = match &self.change {
            UniqueKeyChange::Added(d) => format!("ADD {}", d),
            UniqueKeyChange::Dropped(d) => format!("DROP INDEX `{}`", index_name(d)),
            UniqueKeyChange::Modified { from, to } => {
                let options = to.options.diff(&from.options).to_string();
                let options = if options.is_empty() {
                    options
                } else {
                    format!(" {}", options)
                };
                format!("ALTER INDEX `{}`{}", index_name(from), options)
            }
            UniqueKeyChange::Renamed { from, to } => {
                format!("RENAME INDEX `{}` TO `{}`", from.index_name, to.index_name)
            }
            UniqueKeyChange::Retained(_) => return Vec::new(),
        };
        vec![s]
    }

    fn diff(&self) -> Vec<String> {
        let s = match &self.change {
            UniqueKeyChange::Added(d) => format!("+ {}", d),
            UniqueKeyChange::Dropped(d) => format!("- {}", d),
            UniqueKeyChange::Modified { from, to } | UniqueKeyChange::Renamed { from, to } => {
                format!("~ {}\t-> {}", from, to)
            }
            UniqueKeyChange::Retained(d) => format!("  {}", d),
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

/// Equality where empty desired names match any name.
fn unique_keys_equal(from: &UniqueKeyDefinition, to: &UniqueKeyDefinition) -> bool {
    from.key_parts == to.key_parts
        && from.options == to.options
        && (to.index_name.is_empty() || from.index_name == to.index_name)
        && (to.constraint_name.is_empty() || from.constraint_name == to.constraint_name)
}

#[derive(Debug, Clone, Default)]
pub struct UniqueKeyAlterations {
    pub items: Vec<UniqueKeyAlteration>,
}

impl UniqueKeyAlterations {
    pub fn new(
        scope: &str,
        from: &[&UniqueKeyDefinition],
        to: &[&UniqueKeyDefinition],
        column_order: &ColumnOrder,
    ) -> Self {
        let all = from
            .iter()
            .chain(to.iter())
            .map(|d| (d.string_key_part_list(), d.key_parts.as_slice()))
            .collect();
        let order = key_order(all, column_order);
        let matched = match_by_identity(from, to, UniqueKeyDefinition::string_key_part_list);

        let mut items = Vec::new();
        for (id, d) in matched.only_from {
            items.push(UniqueKeyAlteration::new(
                scope,
                UniqueKeyChange::Dropped(d.clone()),
                order[&id],
            ));
        }
        for (id, d) in matched.only_to {
            items.push(UniqueKeyAlteration::new(
                scope,
                UniqueKeyChange::Added(d.clone()),
                order[&id],
            ));
        }
        for (id, f, t) in matched.both {
            let seq = order[&id];
            if unique_keys_equal(f, t) {
                items.push(UniqueKeyAlteration::new(
                    scope,
                    UniqueKeyChange::Retained(t.clone()),
                    seq,
                ));
            } else if !t.constraint_name.is_empty() && f.constraint_name != t.constraint_name {
                items.push(UniqueKeyAlteration::new(
                    scope,
                    UniqueKeyChange::Dropped(f.clone()),
                    seq,
                ));
                items.push(UniqueKeyAlteration::new(scope, UniqueKeyChange::Added(t.clone()), seq));
            } else if !t.index_name.is_empty() && f.index_name != t.index_name {
                let change = UniqueKeyChange::Renamed {
                    from: f.clone(),
                    to: t.clone(),
                };
                items.push(UniqueKeyAlteration::new(scope, change, seq));
            } else {
                let change = UniqueKeyChange::Modified {
                    from: f.clone(),
                    to: t.clone(),
                };
                items.push(UniqueKeyAlteration::new(scope, change, seq));
            }
        }

        // An added key reusing a name waits until the name is free.
        let released: Vec<(String, NodeKey)> = items
            .iter()
            .filter_map(|a| a.released_name().map(|n| (n.to_string(), a.key().clone())))
            .filter(|(n, _)| !n.is_empty())
            .collect();
        for a in items.iter_mut() {
            let UniqueKeyChange::Added(d) = &a.change else {
                continue;
            };
            let waits_for: Vec<NodeKey> = released
                .iter()
                .filter(|(n, _)| *n == d.index_name)
                .map(|(_, k)| k.clone())
                .collect();
            for k in &waits_for {
                a.add_depends_on(k);
            }
        }

        UniqueKeyAlterations { items }
    }

    pub fn with_change(&self, change: Change) -> impl Iterator<Item = &UniqueKeyAlteration> {
        self.items.iter().filter(move |a| a.key().change == change)
    }

    /// A column is dropped after the unique keys holding it.
    pub fn handle_column_drop(&self, drop: &mut dyn Alteration, column: &str) {
        for a in self.items.iter() {
            if let UniqueKeyChange::Dropped(d) = &a.change {
                if key_parts_contain(&d.key_parts, column) {
                    drop.add_depends_on(a.key());
                }
            }
        }
    }

    pub fn alterations(&self) -> Vec<UniqueKeyAlteration> {
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

    fn uk(name: &str, columns: &[&str]) -> UniqueKeyDefinition {
        UniqueKeyDefinition {
            index_name: name.to_string(),
            key_parts: columns.iter().map(|c| KeyPart::column(c)).collect(),
            ..Default::default()
        }
    }

    fn classify(from: &[UniqueKeyDefinition], to: &[UniqueKeyDefinition]) -> UniqueKeyAlterations {
        let from: Vec<&UniqueKeyDefinition> = from.iter().collect();
        let to: Vec<&UniqueKeyDefinition> = to.iter().collect();
        UniqueKeyAlterations::new("db.t", &from, &to, &ColumnOrder::new())
    }

    #[test]
    fn test_rename() {
        let u = classify(&[uk("a_uk", &["a"])], &[uk("uk_a", &["a"])]);
        assert_eq!(u.statements(), vec!["RENAME INDEX `a_uk` TO `uk_a`"]);
        assert_eq!(
            u.diff(),
            vec!["~ UNIQUE KEY `a_uk` (`a`) -> UNIQUE KEY `uk_a` (`a`)"]
        );
    }

    #[test]
    fn test_unnamed_desired_key_is_retained() {
        let u = classify(&[uk("a_uk", &["a"])], &[uk("", &["a"])]);
        assert!(u.is_equivalent());
        assert_eq!(u.diff(), vec!["  UNIQUE KEY (`a`)"]);
    }

    #[test]
    fn test_drop_unnamed_key_uses_placeholder() {
        let u = classify(&[uk("", &["a"])], &[]);
        assert_eq!(
            u.statements(),
            vec!["DROP INDEX `<unknown index name of 'UNIQUE KEY (`a`)'>`"]
        );
    }

    #[test]
    fn test_modified_options() {
        let mut invisible = uk("a_uk", &["a"]);
        invisible.options.visibility = "INVISIBLE".to_string();
        let u = classify(&[uk("a_uk", &["a"])], &[invisible]);
        assert_eq!(u.statements(), vec!["ALTER INDEX `a_uk` INVISIBLE"]);
    }

    #[test]
    fn test_added_key_waits_for_dropped_key_of_same_name() {
        let u = classify(&[uk("uk", &["a"])], &[uk("uk", &["b"])]);
        let dropped = u.with_change(Change::Dropped).next().unwrap();
        let added = u.with_change(Change::Added).next().unwrap();
        assert_eq!(added.depends_on(), &[dropped.key().clone()]);
        assert_eq!(
            u.statements(),
            vec!["DROP INDEX `uk`", "ADD UNIQUE KEY `uk` (`b`)"]
        );
    }

    #[test]
    fn test_handle_column_drop() {
        let u = classify(&[uk("uk", &["a", "b"])], &[]);
        let mut drop =
            UniqueKeyAlteration::new("db.t", UniqueKeyChange::Retained(uk("x", &["x"])), 0);
        u.handle_column_drop(&mut drop, "b");
        assert_eq!(drop.depends_on().len(), 1);
        u.handle_column_drop(&mut drop, "z");
        assert_eq!(drop.depends_on().len(), 1);
    }
}
