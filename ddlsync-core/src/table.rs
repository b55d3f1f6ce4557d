//! Table composition: classifies the tables of one database and wires the
//! dependencies between element alterations of different tables.
//!
//! Tables are matched by name. An added and a dropped table whose elements are all
//! equal is a rename. Tables present on both sides are retained when every element
//! classifier reports equivalence, and modified otherwise.
//!
//! Statements are emitted per element alteration (one `ALTER TABLE` per fragment), ordered
//! by a single dependency graph spanning the whole database.

use std::collections::HashSet;

use crate::alteration::{
    align, indent_diff, interleaved_order, match_by_identity, prefix_lines, Alteration,
    AlterationMeta, Change, Kind, NodeKey,
};
use crate::check::CheckAlterations;
use crate::column::{ColumnAlterations, ColumnChange};
use crate::dependency::sort_alterations;
use crate::foreign::ForeignKeyAlterations;
use crate::index::{FullTextIndexAlterations, IndexAlterations};
use crate::parser::{
    quote, rename_key_part_column, CreateDefinition, CreateTableStatement, IndexDefinition,
};
use crate::primary::PrimaryKeyAlterations;
use crate::table_option::TableOptionAlteration;
use crate::unique::UniqueKeyAlterations;

const CHANGE_ORDER: [Change; 5] = [
    Change::Added,
    Change::Modified,
    Change::Dropped,
    Change::Renamed,
    Change::Retained,
];

/// Results of the eight element classifiers for one pair of tables.
#[derive(Debug, Clone)]
pub struct TableElements {
    pub columns: ColumnAlterations,
    pub primary_keys: PrimaryKeyAlterations,
    pub unique_keys: UniqueKeyAlterations,
    pub indexes: IndexAlterations<IndexDefinition>,
    pub fulltext_indexes: FullTextIndexAlterations,
    pub foreign_keys: ForeignKeyAlterations,
    pub checks: CheckAlterations,
    pub options: TableOptionAlteration,
}

impl TableElements {
    pub fn new(scope: &str, from: &CreateTableStatement, to: &CreateTableStatement) -> Self {
        let mut from = from.clone();

        // Adding a primary key makes its columns NOT NULL.
        let existing: HashSet<String> = from
            .primary_keys()
            .iter()
            .map(|p| p.string_key_part_list())
            .collect();
        let key_columns: HashSet<String> = to
            .primary_keys()
            .iter()
            .filter(|p| !existing.contains(&p.string_key_part_list()))
            .flat_map(|p| p.key_parts.iter().map(|k| k.column.clone()))
            .collect();
        for def in from.definitions.iter_mut() {
            if let CreateDefinition::Column(c) = def {
                if key_columns.contains(&c.name) {
                    c.options.nullability = "NOT NULL".to_string();
                }
            }
        }

        let columns = ColumnAlterations::new(scope, &from.columns(), &to.columns());

        // Keys of the observed table follow renamed columns before they are compared.
        let renames: Vec<(String, String)> = columns
            .items
            .iter()
            .filter_map(|a| match &a.change {
                ColumnChange::Renamed { from, to } => Some((from.name.clone(), to.name.clone())),
                _ => None,
            })
            .collect();
        for (old, new) in &renames {
            for def in from.definitions.iter_mut() {
                let parts = match def {
                    CreateDefinition::PrimaryKey(d) => &mut d.key_parts,
                    CreateDefinition::UniqueKey(d) => &mut d.key_parts,
                    CreateDefinition::Index(d) => &mut d.key_parts,
                    CreateDefinition::FullTextIndex(d) => &mut d.key_parts,
                    CreateDefinition::ForeignKey(d) => &mut d.key_parts,
                    CreateDefinition::Column(_) | CreateDefinition::Check(_) => continue,
                };
                rename_key_part_column(parts, old, new);
            }
        }

        let order = &columns.column_order;
        TableElements {
            primary_keys: PrimaryKeyAlterations::new(
                scope,
                &from.primary_keys(),
                &to.primary_keys(),
                order,
            ),
            unique_keys: UniqueKeyAlterations::new(
                scope,
                &from.unique_keys(),
                &to.unique_keys(),
                order,
            ),
            indexes: IndexAlterations::new(scope, &from.indexes(), &to.indexes(), order),
            fulltext_indexes: IndexAlterations::new(
                scope,
                &from.fulltext_indexes(),
                &to.fulltext_indexes(),
                order,
            ),
            foreign_keys: ForeignKeyAlterations::new(
                scope,
                &from.foreign_keys(),
                &to.foreign_keys(),
                order,
            ),
            checks: CheckAlterations::new(scope, &from.checks(), &to.checks()),
            options: TableOptionAlteration::new(scope, &from.options, &to.options),
            columns,
        }
    }

    pub fn is_equivalent(&self) -> bool {
        self.columns.is_equivalent()
            && self.primary_keys.is_equivalent()
            && self.unique_keys.is_equivalent()
            && self.indexes.is_equivalent()
            && self.fulltext_indexes.is_equivalent()
            && self.foreign_keys.is_equivalent()
            && self.checks.is_equivalent()
            && self.options.is_equivalent()
    }

    /// Every element alteration with the given statement prefix, ordered by dependencies.
    pub fn alterations(&self, prefix: &str) -> Vec<Box<dyn Alteration>> {
        let mut ret: Vec<Box<dyn Alteration>> = Vec::new();
        ret.extend(boxed(self.columns.alterations()));
        ret.extend(boxed(self.primary_keys.alterations()));
        ret.extend(boxed(self.unique_keys.alterations()));
        ret.extend(boxed(self.indexes.alterations()));
        ret.extend(boxed(self.fulltext_indexes.alterations()));
        ret.extend(boxed(self.foreign_keys.alterations()));
        ret.extend(boxed(self.checks.alterations()));
        ret.push(Box::new(self.options.clone()));
        for (i, a) in ret.iter_mut().enumerate() {
            a.set_prefix(prefix);
            a.set_seq_num(i);
        }
        sort_alterations(ret)
    }

    /// Diff lines of the definitions, in the order `CREATE TABLE` renders them.
    fn definition_diff(&self) -> Vec<String> {
        let mut lines = self.columns.diff();
        lines.extend(self.primary_keys.diff());
        lines.extend(self.unique_keys.diff());
        lines.extend(self.foreign_keys.diff());
        lines.extend(self.checks.diff());
        lines.extend(self.indexes.diff());
        lines.extend(self.fulltext_indexes.diff());
        lines
    }
}

fn boxed<T: Alteration + 'static>(items: Vec<T>) -> impl Iterator<Item = Box<dyn Alteration>> {
    items.into_iter().map(|a| Box::new(a) as Box<dyn Alteration>)
}

#[derive(Debug, Clone)]
pub enum TableChange {
    Added(CreateTableStatement),
    Dropped(CreateTableStatement),
    Modified {
        from: CreateTableStatement,
        to: CreateTableStatement,
        elements: Box<TableElements>,
    },
    Renamed {
        from: CreateTableStatement,
        to: CreateTableStatement,
        foreign_keys: ForeignKeyAlterations,
    },
    Retained {
        this: CreateTableStatement,
        foreign_keys: ForeignKeyAlterations,
    },
}

#[derive(Debug, Clone)]
pub struct TableAlteration {
    pub meta: AlterationMeta,
    pub change: TableChange,
}

impl TableAlteration {
    fn new(db: &str, change: TableChange, seq_num: usize) -> Self {
        let (kind, name) = match &change {
            TableChange::Added(t) => (Change::Added, &t.table_name),
            TableChange::Dropped(t) => (Change::Dropped, &t.table_name),
            TableChange::Modified { to, .. } => (Change::Modified, &to.table_name),
            TableChange::Renamed { to, .. } => (Change::Renamed, &to.table_name),
            TableChange::Retained { this, .. } => (Change::Retained, &this.table_name),
        };
        TableAlteration {
            meta: AlterationMeta::new(NodeKey::new(db, Kind::Table, kind, name.clone()), seq_num),
            change,
        }
    }

    /// Table name in the desired schema, if the table exists there.
    pub fn to_name(&self) -> Option<&str> {
        match &self.change {
            TableChange::Dropped(_) => None,
            TableChange::Added(t) | TableChange::Retained { this: t, .. } => Some(&t.table_name),
            TableChange::Modified { to, .. } | TableChange::Renamed { to, .. } => {
                Some(&to.table_name)
            }
        }
    }

    /// Table name in the observed schema, if the table exists there.
    pub fn from_name(&self) -> Option<&str> {
        match &self.change {
            TableChange::Added(_) => None,
            TableChange::Dropped(t) | TableChange::Retained { this: t, .. } => Some(&t.table_name),
            TableChange::Modified { from, .. } | TableChange::Renamed { from, .. } => {
                Some(&from.table_name)
            }
        }
    }

    fn foreign_keys_mut(&mut self) -> Option<&mut ForeignKeyAlterations> {
        match &mut self.change {
            TableChange::Modified { elements, .. } => Some(&mut elements.foreign_keys),
            TableChange::Renamed { foreign_keys, .. }
            | TableChange::Retained { foreign_keys, .. } => Some(foreign_keys),
            TableChange::Added(_) | TableChange::Dropped(_) => None,
        }
    }

    fn elements_mut(&mut self) -> Option<&mut TableElements> {
        match &mut self.change {
            TableChange::Modified { elements, .. } => Some(elements),
            _ => None,
        }
    }

    fn elements(&self) -> Option<&TableElements> {
        match &self.change {
            TableChange::Modified { elements, .. } => Some(elements),
            _ => None,
        }
    }

    /// The statements this table contributes to the plan: the table itself, or the
    /// alterations of its elements for tables that are altered in place.
    pub fn element_alterations(&self) -> Vec<Box<dyn Alteration>> {
        match &self.change {
            TableChange::Added(_) | TableChange::Dropped(_) => vec![Box::new(self.clone())],
            TableChange::Modified { to, elements, .. } => {
                elements.alterations(&alter_table_prefix(&to.db_name, &to.table_name))
            }
            TableChange::Renamed { to, foreign_keys, .. } => {
                let prefix = alter_table_prefix(&to.db_name, &to.table_name);
                let mut ret: Vec<Box<dyn Alteration>> = vec![Box::new(self.clone())];
                for mut fk in foreign_keys.alterations() {
                    fk.set_prefix(&prefix);
                    ret.push(Box::new(fk));
                }
                ret
            }
            TableChange::Retained { this, foreign_keys } => {
                let prefix = alter_table_prefix(&this.db_name, &this.table_name);
                let mut ret: Vec<Box<dyn Alteration>> = vec![Box::new(self.clone())];
                for mut fk in foreign_keys.alterations() {
                    fk.set_prefix(&prefix);
                    ret.push(Box::new(fk));
                }
                ret
            }
        }
    }
}

/// A column change that foreign keys of other tables may have to follow.
enum ReferencedColumn {
    Dropped(String),
    Renamed(String, String),
    Modified(String),
}

fn element_scope(db: &str, table: &str) -> String {
    format!("{}.{}", db, table)
}

fn alter_table_prefix(db: &str, table: &str) -> String {
    format!("ALTER TABLE {}.{} ", quote(db), quote(table))
}

impl Alteration for TableAlteration {
    fn statements(&self) -> Vec<String> {
        match &self.change {
            TableChange::Added(t) => vec![t.to_string()],
            TableChange::Dropped(t) => vec![format!(
                "DROP TABLE {}.{}",
                quote(&t.db_name),
                quote(&t.table_name)
            )],
            TableChange::Renamed { from, to, .. } => vec![format!(
                "ALTER TABLE {db}.{} RENAME TO {db}.{}",
                quote(&from.table_name),
                quote(&to.table_name),
                db = quote(&from.db_name)
            )],
            TableChange::Modified { .. } => self
                .element_alterations()
                .iter()
                .flat_map(|a| {
                    let prefix = a.prefix().to_string();
                    a.statements().into_iter().map(move |s| format!("{}{}", prefix, s))
                })
                .collect(),
            TableChange::Retained { .. } => Vec::new(),
        }
    }

    fn diff(&self) -> Vec<String> {
        let s = match &self.change {
            TableChange::Added(t) => prefix_lines(&t.to_string(), "+ "),
            TableChange::Dropped(t) => prefix_lines(&t.to_string(), "- "),
            TableChange::Retained { this, .. } => prefix_lines(&this.to_string(), "  "),
            TableChange::Renamed { from, to, .. } => {
                let text = prefix_lines(&from.to_string(), "  ");
                let body = text.split_once('\n').map(|(_, b)| b).unwrap_or("");
                format!("~ {} -> {}\n{}", from.head(), to.head(), body)
            }
            TableChange::Modified { to, elements, .. } => {
                let definitions = indent_diff(&elements.definition_diff(), 4).join(",\n");
                let options = align(&indent_diff(&elements.options.diff(), 4));
                let options = if options.is_empty() {
                    String::new()
                } else {
                    format!("\n{}", options.join("\n"))
                };
                format!("  {}\n  (\n{}\n  ){};", to.head(), definitions, options)
            }
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

/// All table alterations of one database.
#[derive(Debug, Clone)]
pub struct TableAlterations {
    pub items: Vec<TableAlteration>,
}

impl TableAlterations {
    pub fn new(db: &str, from: &[&CreateTableStatement], to: &[&CreateTableStatement]) -> Self {
        let from_names: Vec<&str> = from.iter().map(|t| t.table_name.as_str()).collect();
        let to_names: Vec<&str> = to.iter().map(|t| t.table_name.as_str()).collect();
        let order = interleaved_order(&from_names, &to_names);
        let matched = match_by_identity(from, to, |t: &CreateTableStatement| t.table_name.clone());

        let mut items = Vec::new();
        let mut renamed_from: HashSet<&str> = HashSet::new();
        let mut renamed_to: HashSet<&str> = HashSet::new();
        for (to_name, t) in &matched.only_to {
            for (from_name, f) in &matched.only_from {
                if renamed_from.contains(from_name.as_str())
                    || renamed_to.contains(to_name.as_str())
                {
                    continue;
                }
                let elements = TableElements::new(&element_scope(db, to_name), f, t);
                if elements.is_equivalent() {
                    log::debug!("Table renamed; from={}, to={}", from_name, to_name);
                    let change = TableChange::Renamed {
                        from: (*f).clone(),
                        to: (*t).clone(),
                        foreign_keys: elements.foreign_keys,
                    };
                    items.push(TableAlteration::new(db, change, order[to_name]));
                    renamed_from.insert(from_name.as_str());
                    renamed_to.insert(to_name.as_str());
                }
            }
        }
        for (name, t) in &matched.only_to {
            if !renamed_to.contains(name.as_str()) {
                items.push(TableAlteration::new(db, TableChange::Added((*t).clone()), order[name]));
            }
        }
        for (name, f) in &matched.only_from {
            if !renamed_from.contains(name.as_str()) {
                items.push(TableAlteration::new(
                    db,
                    TableChange::Dropped((*f).clone()),
                    order[name],
                ));
            }
        }
        for (name, f, t) in &matched.both {
            let elements = TableElements::new(&element_scope(db, name), f, t);
            let change = if elements.is_equivalent() {
                TableChange::Retained {
                    this: (*f).clone(),
                    foreign_keys: elements.foreign_keys,
                }
            } else {
                TableChange::Modified {
                    from: (*f).clone(),
                    to: (*t).clone(),
                    elements: Box::new(elements),
                }
            };
            items.push(TableAlteration::new(db, change, order[name]));
        }

        let mut tables = TableAlterations { items };
        tables.wire_element_hooks();
        tables.wire_table_dependencies();
        tables
    }

    fn modified_indexes(&self) -> Vec<usize> {
        (0..self.items.len())
            .filter(|&i| self.items[i].key().change == Change::Modified)
            .collect()
    }

    /// Dependencies between elements, within and across modified tables.
    fn wire_element_hooks(&mut self) {
        let modified = self.modified_indexes();
        let renamed: Vec<(NodeKey, String, String)> = self
            .items
            .iter()
            .filter_map(|t| match &t.change {
                TableChange::Renamed { from, to, .. } => {
                    Some((t.key().clone(), from.table_name.clone(), to.table_name.clone()))
                }
                _ => None,
            })
            .collect();

        for &i in &modified {
            let Some(elements) = self.items[i].elements_mut() else {
                continue;
            };
            for (key, from, to) in &renamed {
                elements.foreign_keys.handle_table_rename(key, from, to);
            }

            let TableElements {
                columns,
                primary_keys,
                unique_keys,
                indexes,
                fulltext_indexes,
                foreign_keys,
                ..
            } = elements;
            for c in columns.items.iter_mut() {
                let change = c.key().change;
                let Some(name) = c.from_name().map(str::to_string) else {
                    continue;
                };
                match change {
                    Change::Dropped => {
                        foreign_keys.handle_column_drop(c, &name);
                        unique_keys.handle_column_drop(c, &name);
                        indexes.handle_column_drop(c, &name);
                        fulltext_indexes.handle_column_drop(c, &name);
                    }
                    Change::Modified => {
                        primary_keys.handle_column_modify(c, &name);
                        foreign_keys.handle_column_modify(c, &name);
                    }
                    _ => {}
                }
            }
        }

        // Columns of one table referenced by foreign keys of another.
        for &i in &modified {
            let (table, columns) = match &self.items[i].change {
                TableChange::Modified { to, elements, .. } => {
                    (to.table_name.clone(), elements.columns.items.clone())
                }
                _ => continue,
            };
            for (j, mut column) in columns.into_iter().enumerate() {
                let referenced = match &column.change {
                    ColumnChange::Dropped { this } => ReferencedColumn::Dropped(this.name.clone()),
                    ColumnChange::Renamed { from, to } => {
                        ReferencedColumn::Renamed(from.name.clone(), to.name.clone())
                    }
                    ColumnChange::Modified { to, .. } => {
                        ReferencedColumn::Modified(to.name.clone())
                    }
                    _ => continue,
                };
                match referenced {
                    ReferencedColumn::Dropped(name) => {
                        for &k in &modified {
                            if let Some(e) = self.items[k].elements() {
                                e.foreign_keys.handle_ref_column_drop(&mut column, &table, &name);
                            }
                        }
                    }
                    ReferencedColumn::Renamed(old, new) => {
                        for &k in &modified {
                            if let Some(e) = self.items[k].elements_mut() {
                                e.foreign_keys.handle_ref_column_rename(&table, &old, &new);
                            }
                        }
                    }
                    ReferencedColumn::Modified(name) => {
                        for t in self.items.iter_mut() {
                            if let Some(fks) = t.foreign_keys_mut() {
                                fks.handle_ref_column_modify(&mut column, &table, &name);
                            }
                        }
                    }
                }
                if let Some(e) = self.items[i].elements_mut() {
                    e.columns.items[j] = column;
                }
            }
        }

        // A dropped table waits for the foreign keys referencing it to be dropped.
        for d in 0..self.items.len() {
            let TableChange::Dropped(t) = &self.items[d].change else {
                continue;
            };
            let name = t.table_name.clone();
            let mut drop = self.items[d].clone();
            for &i in &modified {
                if let Some(e) = self.items[i].elements() {
                    e.foreign_keys.handle_table_drop(&mut drop, &name);
                }
            }
            self.items[d] = drop;
        }
    }

    /// Tables are created after the tables they reference, and dropped before them.
    fn wire_table_dependencies(&mut self) {
        let desired: Vec<(String, NodeKey)> = self
            .items
            .iter()
            .filter_map(|t| t.to_name().map(|n| (n.to_string(), t.key().clone())))
            .collect();

        let mut parent_drops: Vec<(usize, NodeKey)> = Vec::new();
        for t in &self.items {
            let TableChange::Dropped(def) = &t.change else {
                continue;
            };
            for r in def.referenced_tables() {
                let parent = self
                    .items
                    .iter()
                    .position(|p| p.key().change == Change::Dropped && p.from_name() == Some(r));
                if let Some(p) = parent {
                    parent_drops.push((p, t.key().clone()));
                }
            }
        }
        for (p, child) in parent_drops {
            self.items[p].add_depends_on(&child);
        }

        for t in self.items.iter_mut() {
            let referenced: Vec<String> = match &t.change {
                TableChange::Dropped(_) => continue,
                TableChange::Added(def)
                | TableChange::Modified { to: def, .. }
                | TableChange::Renamed { to: def, .. }
                | TableChange::Retained { this: def, .. } => {
                    def.referenced_tables().into_iter().map(str::to_string).collect()
                }
            };
            for (name, key) in desired.iter().filter(|(n, _)| referenced.contains(n)) {
                t.add_depends_on(key);
                if key.change != Change::Added {
                    continue;
                }
                // Element alterations of an altered table are scheduled on their own,
                // so its added foreign keys wait for the created table directly.
                if let Some(e) = t.elements_mut() {
                    for fk in e.foreign_keys.items.iter_mut() {
                        if fk.key().change == Change::Added
                            && fk.definition().reference.table_name == *name
                        {
                            fk.add_depends_on(key);
                        }
                    }
                }
            }
        }
    }

    pub fn with_change(&self, change: Change) -> impl Iterator<Item = &TableAlteration> {
        self.items.iter().filter(move |a| a.key().change == change)
    }

    /// Table alterations grouped by change and ordered by dependencies.
    pub fn alterations(&self) -> Vec<TableAlteration> {
        let grouped: Vec<TableAlteration> = CHANGE_ORDER
            .iter()
            .flat_map(|c| self.items.iter().filter(move |a| a.key().change == *c).cloned())
            .collect();
        sort_alterations(grouped)
    }

    /// Element alterations of every table, ordered across the whole database.
    pub fn element_alterations(&self) -> Vec<Box<dyn Alteration>> {
        let mut ret: Vec<Box<dyn Alteration>> = Vec::new();
        for change in CHANGE_ORDER {
            for t in self.with_change(change) {
                for mut a in t.element_alterations() {
                    a.set_seq_num(t.seq_num());
                    ret.push(a);
                }
            }
        }
        sort_alterations(ret)
    }

    pub fn statements(&self) -> Vec<String> {
        let mut ret = Vec::new();
        for a in self.element_alterations() {
            let lines: Vec<String> = a
                .statements()
                .into_iter()
                .map(|s| format!("{}{}", a.prefix(), s))
                .collect();
            for s in align(&lines) {
                if s.ends_with(';') {
                    ret.push(s);
                } else {
                    ret.push(format!("{};", s));
                }
            }
        }
        ret
    }

    pub fn diff(&self) -> Vec<String> {
        self.alterations().iter().flat_map(|a| a.diff()).collect()
    }

    pub fn is_equivalent(&self) -> bool {
        self.items.iter().all(|a| a.key().change == Change::Retained)
    }
}
