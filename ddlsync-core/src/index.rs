//! Classification of plain and fulltext indexes.
//!
//! Both behave alike: they are matched by key-part list, renamed in place and
//! altered in place when only their options differ. [`IndexLike`] abstracts over the
//! two definition types.

use std::fmt;

use crate::alteration::{
    aligned_diff, aligned_statements, group_and_sort, key_id, key_order, match_by_identity,
    name_or_placeholder, Alteration, AlterationMeta, Change, ColumnOrder, Kind, NodeKey,
};
use crate::parser::{
    key_parts_contain, FullTextIndexDefinition, IndexDefinition, IndexOptions, KeyPart,
};

const CHANGE_ORDER: [Change; 5] = [
    Change::Dropped,
    Change::Renamed,
    Change::Modified,
    Change::Added,
    Change::Retained,
];

/// A secondary index definition.
pub trait IndexLike: Clone + fmt::Debug + fmt::Display + PartialEq + Eq {
    const KIND: Kind;

    fn index_name(&self) -> &str;
    fn key_parts(&self) -> &[KeyPart];
    fn options(&self) -> &IndexOptions;
    fn string_key_part_list(&self) -> String;
}

impl IndexLike for IndexDefinition {
    const KIND: Kind = Kind::Index;

    fn index_name(&self) -> &str {
        &self.index_name
    }

    fn key_parts(&self) -> &[KeyPart] {
        &self.key_parts
    }

    fn options(&self) -> &IndexOptions {
        &self.options
    }

    fn string_key_part_list(&self) -> String {
        IndexDefinition::string_key_part_list(self)
    }
}

impl IndexLike for FullTextIndexDefinition {
    const KIND: Kind = Kind::FullTextIndex;

    fn index_name(&self) -> &str {
        &self.index_name
    }

    fn key_parts(&self) -> &[KeyPart] {
        &self.key_parts
    }

    fn options(&self) -> &IndexOptions {
        &self.options
    }

    fn string_key_part_list(&self) -> String {
        FullTextIndexDefinition::string_key_part_list(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexChange<D> {
    Added(D),
    Dropped(D),
    Modified { from: D, to: D },
    Renamed { from: D, to: D },
    Retained(D),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexAlteration<D> {
    pub meta: AlterationMeta,
    pub change: IndexChange<D>,
}

fn index_name<D: IndexLike>(def: &D) -> String {
    name_or_placeholder(def.index_name(), "index", &def.string_key_part_list())
}

impl<D: IndexLike> IndexAlteration<D> {
    fn new(scope: &str, change: IndexChange<D>, seq_num: usize) -> Self {
        let (kind, def) = match &change {
            IndexChange::Added(d) => (Change::Added, d),
            IndexChange::Dropped(d) => (Change::Dropped, d),
            IndexChange::Modified { to, .. } => (Change::Modified, to),
            IndexChange::Renamed { from, .. } => (Change::Renamed, from),
            IndexChange::Retained(d) => (Change::Retained, d),
        };
        let key = NodeKey::new(scope, D::KIND, kind, key_id(def.key_parts()));
        IndexAlteration {
            meta: AlterationMeta::new(key, seq_num),
            change,
        }
    }
}

impl<D: IndexLike> Alteration for IndexAlteration<D> {
    fn statements(&self) -> Vec<String> {
        let s = match &self.change {
            IndexChange::Added(d) => format!("ADD {}", d),
            IndexChange::Dropped(d) => format!("DROP INDEX `{}`", index_name(d)),
            IndexChange::Modified { from, to } => {
                let options = to.options().diff(from.options()).to_string();
                if options.is_empty() {
                    format!("ALTER INDEX `{}`", index_name(from))
                } else {
                    format!("ALTER INDEX `{}` {}", index_name(from), options)
                }
            }
            IndexChange::Renamed { from, to } => format!(
                "RENAME INDEX `{}` TO `{}`",
                from.index_name(),
                to.index_name()
            ),
            IndexChange::Retained(_) => return Vec::new(),
        };
        vec![s]
    }

    fn diff(&self) -> Vec<String> {
        let s = match &self.change {
            IndexChange::Added(d) => format!("+ {}", d),
            IndexChange::Dropped(d) => format!("- {}", d),
            IndexChange::Modified { from, to } | IndexChange::Renamed { from, to } => {
                format!("~ {}\t-> {}", from, to)
            }
            IndexChange::Retained(d) => format!("  {}", d),
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

#[derive(Debug, Clone)]
pub struct IndexAlterations<D> {
    pub items: Vec<IndexAlteration<D>>,
}

pub type FullTextIndexAlterations = IndexAlterations<FullTextIndexDefinition>;

impl<D> Default for IndexAlterations<D> {
    fn default() -> Self {
        IndexAlterations { items: Vec::new() }
    }
}

impl<D: IndexLike> IndexAlterations<D> {
    pub fn new(scope: &str, from: &[&D], to: &[&D], column_order: &ColumnOrder) -> Self {
        let all = from
            .iter()
            .chain(to.iter())
            .map(|d| (d.string_key_part_list(), d.key_parts()))
            .collect();
        let order = key_order(all, column_order);
        let matched = match_by_identity(from, to, |d: &D| d.string_key_part_list());

        let mut items = Vec::new();
        for (id, d) in matched.only_from {
            items.push(IndexAlteration::new(scope, IndexChange::Dropped(d.clone()), order[&id]));
        }
        for (id, d) in matched.only_to {
            items.push(IndexAlteration::new(scope, IndexChange::Added(d.clone()), order[&id]));
        }
        for (id, f, t) in matched.both {
            let change = if f.key_parts() == t.key_parts() && f.options() == t.options() {
                if !t.index_name().is_empty() && f.index_name() != t.index_name() {
                    IndexChange::Renamed {
                        from: f.clone(),
                        to: t.clone(),
                    }
                } else {
                    IndexChange::Retained(t.clone())
                }
            } else {
                IndexChange::Modified {
                    from: f.clone(),
                    to: t.clone(),
                }
            };
            items.push(IndexAlteration::new(scope, change, order[&id]));
        }
        IndexAlterations { items }
    }

    pub fn with_change(&self, change: Change) -> impl Iterator<Item = &IndexAlteration<D>> {
        self.items.iter().filter(move |a| a.key().change == change)
    }

    /// A column is dropped after the indexes holding it.
    pub fn handle_column_drop(&self, drop: &mut dyn Alteration, column: &str) {
        for a in self.items.iter() {
            if let IndexChange::Dropped(d) = &a.change {
                if key_parts_contain(d.key_parts(), column) {
                    drop.add_depends_on(a.key());
                }
            }
        }
    }

    pub fn alterations(&self) -> Vec<IndexAlteration<D>> {
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

    fn index(name: &str, columns: &[&str]) -> IndexDefinition {
        IndexDefinition {
            index_name: name.to_string(),
            key_parts: columns.iter().map(|c| KeyPart::column(c)).collect(),
            ..Default::default()
        }
    }

    fn classify<D: IndexLike>(from: &[D], to: &[D]) -> IndexAlterations<D> {
        let from: Vec<&D> = from.iter().collect();
        let to: Vec<&D> = to.iter().collect();
        IndexAlterations::new("db.t", &from, &to, &ColumnOrder::new())
    }

    #[test]
    fn test_rename_and_retain() {
        let i = classify(
            &[index("a_idx", &["a"]), index("b_idx", &["b"])],
            &[index("idx_a", &["a"]), index("", &["b"])],
        );
        assert_eq!(i.statements(), vec!["RENAME INDEX `a_idx` TO `idx_a`"]);
        assert_eq!(i.with_change(Change::Retained).count(), 1);
    }

    #[test]
    fn test_add_and_drop_ordered_by_key_length() {
        let i = classify(&[index("ab", &["a", "b"])], &[index("c", &["c"])]);
        assert_eq!(
            i.statements(),
            vec!["ADD INDEX `c` (`c`)", "DROP INDEX `ab`"]
        );
        assert_eq!(
            i.diff(),
            vec!["+ INDEX `c` (`c`)", "- INDEX `ab` (`a`, `b`)"]
        );
    }

    #[test]
    fn test_modified_visibility() {
        let mut invisible = index("a", &["a"]);
        invisible.options.visibility = "INVISIBLE".to_string();
        let i = classify(&[index("a", &["a"])], &[invisible]);
        assert_eq!(i.statements(), vec!["ALTER INDEX `a` INVISIBLE"]);
    }

    #[test]
    fn test_fulltext_kind_and_placeholder() {
        let ft = FullTextIndexDefinition {
            key_parts: vec![KeyPart::column("body")],
            ..Default::default()
        };
        let i: FullTextIndexAlterations = classify(&[ft], &[]);
        let dropped = i.with_change(Change::Dropped).next().unwrap();
        assert_eq!(dropped.key().kind, Kind::FullTextIndex);
        assert_eq!(
            i.statements(),
            vec!["DROP INDEX `<unknown index name of 'FULLTEXT INDEX (`body`)'>`"]
        );
    }

    #[test]
    fn test_handle_column_drop() {
        let i = classify(&[index("ab", &["a", "b"])], &[]);
        let mut drop = IndexAlteration::new("db.t", IndexChange::Retained(index("x", &["x"])), 0);
        i.handle_column_drop(&mut drop, "a");
        assert_eq!(drop.depends_on().len(), 1);
    }
}
