//! Foreign key classification.
//!
//! Foreign keys cannot be altered in place, so a changed key is a drop plus an add.
//! Most of the work happens in the hooks: changes to other tables and columns decide
//! when a foreign key has to be dropped, recreated or left alone.

use crate::alteration::{
    aligned_diff, aligned_statements, group_and_sort, key_id, key_order, match_by_identity,
    name_or_placeholder, Alteration, AlterationMeta, Change, ColumnOrder, Kind, NodeKey,
};
use crate::parser::{key_parts_contain, rename_key_part_column, ForeignKeyDefinition};

const CHANGE_ORDER: [Change; 3] = [Change::Dropped, Change::Added, Change::Retained];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignKeyChange {
    Added(ForeignKeyDefinition),
    Dropped(ForeignKeyDefinition),
    Retained(ForeignKeyDefinition),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyAlteration {
    pub meta: AlterationMeta,
    pub change: ForeignKeyChange,
}

impl ForeignKeyAlteration {
    fn new(scope: &str, change: ForeignKeyChange, seq_num: usize) -> Self {
        let (kind, def) = match &change {
            ForeignKeyChange::Added(d) => (Change::Added, d),
            ForeignKeyChange::Dropped(d) => (Change::Dropped, d),
            ForeignKeyChange::Retained(d) => (Change::Retained, d),
        };
        let key = NodeKey::new(scope, Kind::ForeignKey, kind, key_id(&def.key_parts));
        ForeignKeyAlteration {
            meta: AlterationMeta::new(key, seq_num),
            change,
        }
    }

    /// The same definition with another change, keeping order and dependencies.
    fn converted(&self, change: ForeignKeyChange) -> Self {
        let kind = match &change {
            ForeignKeyChange::Added(_) => Change::Added,
            ForeignKeyChange::Dropped(_) => Change::Dropped,
            ForeignKeyChange::Retained(_) => Change::Retained,
        };
        let mut meta = self.meta.clone();
        meta.key = meta.key.with_change(kind);
        ForeignKeyAlteration { meta, change }
    }

    pub fn definition(&self) -> &ForeignKeyDefinition {
        match &self.change {
            ForeignKeyChange::Added(d)
            | ForeignKeyChange::Dropped(d)
            | ForeignKeyChange::Retained(d) => d,
        }
    }

    fn definition_mut(&mut self) -> &mut ForeignKeyDefinition {
        match &mut self.change {
            ForeignKeyChange::Added(d)
            | ForeignKeyChange::Dropped(d)
            | ForeignKeyChange::Retained(d) => d,
        }
    }

    fn references(&self, table: &str) -> bool {
        self.definition().reference.table_name == table
    }

    fn references_column(&self, table: &str, column: &str) -> bool {
        self.references(table) && key_parts_contain(&self.definition().reference.key_parts, column)
    }
}

impl Alteration for ForeignKeyAlteration {
    fn statements(&self) -> Vec<String> {
        match &self.change {
            ForeignKeyChange::Added(d) => vec![format!("ADD {}", d)],
            ForeignKeyChange::Dropped(d) => {
                let identity = d.string_key_part_list();
                vec![
                    format!(
                        "DROP FOREIGN KEY `{}`",
                        name_or_placeholder(&d.constraint_name, "constraint", &identity)
                    ),
                    format!(
                        "DROP INDEX `{}`",
                        name_or_placeholder(&d.index_name, "index", &identity)
                    ),
                ]
            }
            ForeignKeyChange::Retained(_) => Vec::new(),
        }
    }

    fn diff(&self) -> Vec<String> {
        let s = match &self.change {
            ForeignKeyChange::Added(d) => format!("+ {}", d),
            ForeignKeyChange::Dropped(d) => format!("- {}", d),
            ForeignKeyChange::Retained(d) => format!("  {}", d),
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
fn foreign_keys_equal(from: &ForeignKeyDefinition, to: &ForeignKeyDefinition) -> bool {
    from.key_parts == to.key_parts
        && from.reference == to.reference
        && (to.index_name.is_empty() || from.index_name == to.index_name)
        && (to.constraint_name.is_empty() || from.constraint_name == to.constraint_name)
}

#[derive(Debug, Clone, Default)]
pub struct ForeignKeyAlterations {
    pub items: Vec<ForeignKeyAlteration>,
}

impl ForeignKeyAlterations {
    pub fn new(
        scope: &str,
        from: &[&ForeignKeyDefinition],
        to: &[&ForeignKeyDefinition],
        column_order: &ColumnOrder,
    ) -> Self {
        let all = from
            .iter()
            .chain(to.iter())
            .map(|d| (d.string_key_part_list(), d.key_parts.as_slice()))
            .collect();
        let order = key_order(all, column_order);
        let matched = match_by_identity(from, to, ForeignKeyDefinition::string_key_part_list);

        let mut items = Vec::new();
        for (id, d) in matched.only_from {
            items.push(ForeignKeyAlteration::new(
                scope,
                ForeignKeyChange::Dropped(d.clone()),
                order[&id],
            ));
        }
        for (id, d) in matched.only_to {
            items.push(ForeignKeyAlteration::new(
                scope,
                ForeignKeyChange::Added(d.clone()),
                order[&id],
            ));
        }
        for (id, f, t) in matched.both {
            let seq = order[&id];
            if foreign_keys_equal(f, t) {
                items.push(ForeignKeyAlteration::new(
                    scope,
                    ForeignKeyChange::Retained(f.clone()),
                    seq,
                ));
            } else {
                items.push(ForeignKeyAlteration::new(
                    scope,
                    ForeignKeyChange::Dropped(f.clone()),
                    seq,
                ));
                items.push(ForeignKeyAlteration::new(
                    scope,
                    ForeignKeyChange::Added(t.clone()),
                    seq,
                ));
            }
        }
        ForeignKeyAlterations { items }
    }

    pub fn with_change(&self, change: Change) -> impl Iterator<Item = &ForeignKeyAlteration> {
        self.items.iter().filter(move |a| a.key().change == change)
    }

    /// Tables referenced by the desired foreign keys.
    pub fn referenced_tables(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|a| a.key().change != Change::Dropped)
            .map(|a| a.definition().reference.table_name.as_str())
            .collect()
    }

    fn indexes_of(&self, change: Change) -> Vec<usize> {
        (0..self.items.len())
            .filter(|&i| self.items[i].key().change == change)
            .collect()
    }

    /// Turn each dropped/added pair accepted by `pair` into a single retained key when
    /// the two definitions turn out equal; `pair` may rewrite the dropped definition first.
    /// Pairs that stay different are returned.
    fn merge_pairs(
        &mut self,
        mut pair: impl FnMut(&mut ForeignKeyDefinition, &ForeignKeyDefinition) -> bool,
    ) -> Vec<(usize, usize)> {
        let dropped = self.indexes_of(Change::Dropped);
        let added = self.indexes_of(Change::Added);
        let mut removed = Vec::new();
        let mut unmerged = Vec::new();
        let mut retained = Vec::new();

        for &d in &dropped {
            for &a in &added {
                if removed.contains(&a) || removed.contains(&d) {
                    continue;
                }
                let to = self.items[a].definition().clone();
                if !pair(self.items[d].definition_mut(), &to) {
                    continue;
                }
                if foreign_keys_equal(self.items[d].definition(), &to) {
                    retained.push(self.items[a].converted(ForeignKeyChange::Retained(to)));
                    removed.push(d);
                    removed.push(a);
                } else {
                    unmerged.push((d, a));
                }
            }
        }

        let mut i = 0;
        self.items.retain(|_| {
            let keep = !removed.contains(&i);
            i += 1;
            keep
        });
        self.items.extend(retained);
        unmerged
            .into_iter()
            .filter_map(|(d, a)| {
                let shift = |x: usize| x - removed.iter().filter(|&&r| r < x).count();
                (!removed.contains(&d) && !removed.contains(&a)).then(|| (shift(d), shift(a)))
            })
            .collect()
    }

    /// A table is dropped after the foreign keys referencing it.
    pub fn handle_table_drop(&self, drop: &mut dyn Alteration, table: &str) {
        for a in self.with_change(Change::Dropped) {
            if a.references(table) {
                drop.add_depends_on(a.key());
            }
        }
    }

    /// A renamed referenced table makes its foreign keys look dropped and re-added.
    /// Pairs that are equal after the rename are retained, the others run after it.
    pub fn handle_table_rename(&mut self, rename: &NodeKey, from: &str, to: &str) {
        for a in self.items.iter_mut() {
            if a.key().change == Change::Dropped && a.references(from) {
                a.definition_mut().reference.table_name = to.to_string();
            }
        }
        for a in self.items.iter_mut() {
            if a.key().change == Change::Added && a.references(to) {
                a.add_depends_on(rename);
            }
        }
        let unmerged = self.merge_pairs(|d, a| d.reference.table_name == a.reference.table_name);
        for (d, a) in unmerged {
            self.items[d].add_depends_on(rename);
            self.items[a].add_depends_on(rename);
        }
    }

    /// A key column is changed after its foreign key is dropped, and before a foreign key
    /// holding it is added.
    pub fn handle_column_modify(&mut self, modify: &mut dyn Alteration, column: &str) {
        for a in self.items.iter_mut() {
            if !key_parts_contain(&a.definition().key_parts, column) {
                continue;
            }
            let change = a.key().change;
            match change {
                Change::Dropped => modify.add_depends_on(a.key()),
                Change::Added => a.add_depends_on(modify.key()),
                _ => {}
            }
        }
    }

    /// A column is dropped after the foreign keys holding it.
    pub fn handle_column_drop(&self, drop: &mut dyn Alteration, column: &str) {
        for a in self.with_change(Change::Dropped) {
            if key_parts_contain(&a.definition().key_parts, column) {
                drop.add_depends_on(a.key());
            }
        }
    }

    /// A referenced column is dropped after the foreign keys referencing it.
    pub fn handle_ref_column_drop(&self, drop: &mut dyn Alteration, table: &str, column: &str) {
        for a in self.with_change(Change::Dropped) {
            if a.references_column(table, column) {
                drop.add_depends_on(a.key());
            }
        }
    }

    /// A renamed referenced column makes its foreign keys look dropped and re-added.
    pub fn handle_ref_column_rename(&mut self, table: &str, from: &str, to: &str) {
        self.merge_pairs(|d, a| {
            if d.reference.table_name == table
                && key_parts_contain(&d.reference.key_parts, from)
                && key_parts_contain(&a.reference.key_parts, to)
            {
                rename_key_part_column(&mut d.reference.key_parts, from, to);
                true
            } else {
                false
            }
        });
    }

    /// MySQL refuses to change a referenced column while a foreign key points at it:
    /// the key is dropped before the change and added again after it.
    pub fn handle_ref_column_modify(
        &mut self,
        modify: &mut dyn Alteration,
        table: &str,
        column: &str,
    ) {
        let mut recreated = Vec::new();
        self.items.retain(|a| {
            if a.key().change == Change::Retained && a.references_column(table, column) {
                recreated.push(a.clone());
                false
            } else {
                true
            }
        });
        for r in recreated {
            let def = r.definition().clone();
            self.items.push(r.converted(ForeignKeyChange::Dropped(def.clone())));
            self.items.push(r.converted(ForeignKeyChange::Added(def)));
        }
        for a in self.items.iter_mut().filter(|a| a.references_column(table, column)) {
            let change = a.key().change;
            match change {
                Change::Dropped => modify.add_depends_on(a.key()),
                Change::Added => a.add_depends_on(modify.key()),
                _ => {}
            }
        }
    }

    pub fn alterations(&self) -> Vec<ForeignKeyAlteration> {
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
    use crate::parser::{KeyPart, ReferenceDefinition};

    fn fk(name: &str, columns: &[&str], table: &str, ref_columns: &[&str]) -> ForeignKeyDefinition {
        ForeignKeyDefinition {
            constraint_name: name.to_string(),
            index_name: name.to_string(),
            key_parts: columns.iter().map(|c| KeyPart::column(c)).collect(),
            reference: ReferenceDefinition {
                table_name: table.to_string(),
                key_parts: ref_columns.iter().map(|c| KeyPart::column(c)).collect(),
                ..Default::default()
            },
        }
    }

    fn classify(
        from: &[ForeignKeyDefinition],
        to: &[ForeignKeyDefinition],
    ) -> ForeignKeyAlterations {
        let from: Vec<&ForeignKeyDefinition> = from.iter().collect();
        let to: Vec<&ForeignKeyDefinition> = to.iter().collect();
        ForeignKeyAlterations::new("db.child", &from, &to, &ColumnOrder::new())
    }

    fn probe(id: &str) -> ForeignKeyAlteration {
        ForeignKeyAlteration::new(
            "db.other",
            ForeignKeyChange::Retained(fk(id, &[id], "x", &["x"])),
            0,
        )
    }

    #[test]
    fn test_changed_reference_is_dropped_and_added() {
        let f = classify(
            &[fk("fk", &["p"], "parent", &["id"])],
            &[fk("fk", &["p"], "parent", &["code"])],
        );
        assert_eq!(
            f.statements(),
            vec![
                "DROP FOREIGN KEY `fk`",
                "DROP INDEX `fk`",
                "ADD CONSTRAINT `fk` FOREIGN KEY `fk` (`p`) REFERENCES `parent` (`code`)",
            ]
        );
        assert!(!f.is_equivalent());
    }

    #[test]
    fn test_unnamed_desired_key_is_retained() {
        let f = classify(
            &[fk("fk", &["p"], "parent", &["id"])],
            &[fk("", &["p"], "parent", &["id"])],
        );
        assert!(f.is_equivalent());
        assert!(f.statements().is_empty());
    }

    #[test]
    fn test_drop_unnamed_key_uses_placeholders() {
        let f = classify(&[fk("", &["p"], "parent", &["id"])], &[]);
        assert_eq!(
            f.statements(),
            vec![
                "DROP FOREIGN KEY `<unknown constraint name of 'FOREIGN KEY (`p`)'>`",
                "DROP INDEX `<unknown index name of 'FOREIGN KEY (`p`)'>`",
            ]
        );
    }

    #[test]
    fn test_handle_table_rename_retains_equal_keys() {
        let mut f = classify(
            &[fk("fk", &["p"], "old", &["id"])],
            &[fk("fk", &["p"], "new", &["id"])],
        );
        let rename = NodeKey::new("db", Kind::Table, Change::Renamed, "new");
        f.handle_table_rename(&rename, "old", "new");
        assert!(f.is_equivalent());
        assert_eq!(f.items.len(), 1);
        assert_eq!(f.items[0].depends_on(), &[rename]);
    }

    #[test]
    fn test_handle_table_rename_orders_changed_keys_after_rename() {
        let mut f = classify(
            &[fk("fk", &["p"], "old", &["id"])],
            &[fk("fk", &["p"], "new", &["code"])],
        );
        let rename = NodeKey::new("db", Kind::Table, Change::Renamed, "new");
        f.handle_table_rename(&rename, "old", "new");
        assert_eq!(f.items.len(), 2);
        assert!(f.items.iter().all(|a| a.depends_on() == [rename.clone()]));
    }

    #[test]
    fn test_handle_table_drop() {
        let f = classify(&[fk("fk", &["p"], "parent", &["id"])], &[]);
        let mut drop = probe("t");
        f.handle_table_drop(&mut drop, "parent");
        assert_eq!(drop.depends_on().len(), 1);
        f.handle_table_drop(&mut drop, "other");
        assert_eq!(drop.depends_on().len(), 1);
    }

    #[test]
    fn test_handle_column_modify_and_drop() {
        let mut f = classify(
            &[fk("a", &["a"], "parent", &["id"])],
            &[fk("b", &["b"], "parent", &["id"])],
        );
        let mut modify = probe("m");
        f.handle_column_modify(&mut modify, "a");
        assert_eq!(modify.depends_on().len(), 1);
        f.handle_column_modify(&mut modify, "b");
        let added = f.with_change(Change::Added).next().unwrap();
        assert_eq!(added.depends_on(), &[modify.key().clone()]);

        let mut drop = probe("d");
        f.handle_column_drop(&mut drop, "a");
        assert_eq!(drop.depends_on().len(), 1);
    }

    #[test]
    fn test_handle_ref_column_rename() {
        let mut f = classify(
            &[fk("fk", &["p"], "parent", &["id"])],
            &[fk("fk", &["p"], "parent", &["parent_id"])],
        );
        f.handle_ref_column_rename("parent", "id", "parent_id");
        assert!(f.is_equivalent());
        assert_eq!(
            f.diff(),
            vec!["  CONSTRAINT `fk` FOREIGN KEY `fk` (`p`) REFERENCES `parent` (`parent_id`)"]
        );
    }

    #[test]
    fn test_handle_ref_column_modify_recreates_key() {
        let mut f = classify(
            &[fk("fk", &["p"], "parent", &["id"])],
            &[fk("fk", &["p"], "parent", &["id"])],
        );
        let mut modify = probe("m");
        f.handle_ref_column_modify(&mut modify, "parent", "id");
        let dropped = f.with_change(Change::Dropped).next().unwrap();
        let added = f.with_change(Change::Added).next().unwrap();
        assert_eq!(modify.depends_on(), &[dropped.key().clone()]);
        assert_eq!(added.depends_on(), &[modify.key().clone()]);

        let mut drop = probe("d");
        f.handle_ref_column_drop(&mut drop, "parent", "id");
        assert_eq!(drop.depends_on(), &[dropped.key().clone()]);
    }
}
