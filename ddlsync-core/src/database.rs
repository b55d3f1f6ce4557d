//! Database composition: the top of the comparison.
//!
//! Databases are matched by name. Each one carries the table alterations of its
//! tables, so an added database creates every table it declares and a dropped one
//! lists every table it loses in the diff.

use crate::alteration::{
    align, indent_diff, interleaved_order, match_by_identity, prefix_lines, Alteration,
    AlterationMeta, Change, Kind, NodeKey,
};
use crate::database_option::DatabaseOptionAlteration;
use crate::dependency::sort_alterations;
use crate::parser::{quote, CreateDatabaseStatement, CreateTableStatement};
use crate::schema::Schema;
use crate::table::TableAlterations;

const CHANGE_ORDER: [Change; 4] = [
    Change::Added,
    Change::Modified,
    Change::Dropped,
    Change::Retained,
];

#[derive(Debug, Clone)]
pub enum DatabaseChange {
    Added(CreateDatabaseStatement),
    Dropped(CreateDatabaseStatement),
    Modified {
        from: CreateDatabaseStatement,
        to: CreateDatabaseStatement,
        options: DatabaseOptionAlteration,
    },
    Retained(CreateDatabaseStatement),
}

#[derive(Debug, Clone)]
pub struct DatabaseAlteration {
    pub meta: AlterationMeta,
    pub change: DatabaseChange,
    pub tables: TableAlterations,
}

impl DatabaseAlteration {
    fn new(change: DatabaseChange, tables: TableAlterations, seq_num: usize) -> Self {
        let (kind, name) = match &change {
            DatabaseChange::Added(d) => (Change::Added, &d.db_name),
            DatabaseChange::Dropped(d) => (Change::Dropped, &d.db_name),
            DatabaseChange::Modified { to, .. } => (Change::Modified, &to.db_name),
            DatabaseChange::Retained(d) => (Change::Retained, &d.db_name),
        };
        DatabaseAlteration {
            meta: AlterationMeta::new(
                NodeKey::new("", Kind::Database, kind, name.clone()),
                seq_num,
            ),
            change,
            tables,
        }
    }

    pub fn name(&self) -> &str {
        &self.key().id
    }
}

impl Alteration for DatabaseAlteration {
    fn statements(&self) -> Vec<String> {
        match &self.change {
            DatabaseChange::Added(d) => {
                let mut ret = vec![d.to_string()];
                ret.extend(self.tables.statements());
                ret
            }
            // The tables go with the database.
            DatabaseChange::Dropped(d) => vec![format!("DROP DATABASE {};", quote(&d.db_name))],
            DatabaseChange::Modified { from, options, .. } => {
                let mut ret: Vec<String> = options
                    .statements()
                    .into_iter()
                    .map(|s| format!("ALTER DATABASE {} {};", quote(&from.db_name), s))
                    .collect();
                ret.extend(self.tables.statements());
                ret
            }
            DatabaseChange::Retained(_) => self.tables.statements(),
        }
    }

    fn diff(&self) -> Vec<String> {
        let head = match &self.change {
            DatabaseChange::Added(d) => prefix_lines(&d.to_string(), "+ "),
            DatabaseChange::Dropped(d) => prefix_lines(&d.to_string(), "- "),
            DatabaseChange::Retained(d) => prefix_lines(&d.to_string(), "  "),
            DatabaseChange::Modified { to, options, .. } => {
                let lines = align(&indent_diff(&options.diff(), 4));
                let options = if lines.is_empty() {
                    String::new()
                } else {
                    format!("\n{}", lines.join("\n"))
                };
                format!("  CREATE DATABASE {}{};", quote(&to.db_name), options)
            }
        };
        let mut ret = vec![head];
        ret.extend(self.tables.diff());
        ret
    }

    fn meta(&self) -> &AlterationMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut AlterationMeta {
        &mut self.meta
    }
}

/// Every database alteration between two sets of schemas.
#[derive(Debug, Clone, Default)]
pub struct DatabaseAlterations {
    pub items: Vec<DatabaseAlteration>,
}

impl DatabaseAlterations {
    pub fn new(from: &[Schema], to: &[Schema]) -> Self {
        let from_names: Vec<&str> = from.iter().map(Schema::name).collect();
        let to_names: Vec<&str> = to.iter().map(Schema::name).collect();
        let order = interleaved_order(&from_names, &to_names);
        let from_refs: Vec<&Schema> = from.iter().collect();
        let to_refs: Vec<&Schema> = to.iter().collect();
        let matched = match_by_identity(&from_refs, &to_refs, |s: &Schema| s.name().to_string());

        let mut items = Vec::new();
        for (name, t) in &matched.only_to {
            log::debug!("Database added; name={}", name);
            let tables = TableAlterations::new(name, &[], &table_refs(&t.tables));
            let change = DatabaseChange::Added(t.database.clone());
            items.push(DatabaseAlteration::new(change, tables, order[name]));
        }
        for (name, f) in &matched.only_from {
            log::debug!("Database dropped; name={}", name);
            let tables = TableAlterations::new(name, &table_refs(&f.tables), &[]);
            let change = DatabaseChange::Dropped(f.database.clone());
            items.push(DatabaseAlteration::new(change, tables, order[name]));
        }
        for (name, f, t) in &matched.both {
            let tables =
                TableAlterations::new(name, &table_refs(&f.tables), &table_refs(&t.tables));
            let options =
                DatabaseOptionAlteration::new(name, &f.database.options, &t.database.options);
            let change = if options.key().change == Change::Retained {
                DatabaseChange::Retained(t.database.clone())
            } else {
                DatabaseChange::Modified {
                    from: f.database.clone(),
                    to: t.database.clone(),
                    options,
                }
            };
            items.push(DatabaseAlteration::new(change, tables, order[name]));
        }
        DatabaseAlterations { items }
    }

    pub fn with_change(&self, change: Change) -> impl Iterator<Item = &DatabaseAlteration> {
        self.items.iter().filter(move |a| a.key().change == change)
    }

    /// Database alterations grouped by change and ordered by dependencies.
    pub fn alterations(&self) -> Vec<DatabaseAlteration> {
        let grouped: Vec<DatabaseAlteration> = CHANGE_ORDER
            .iter()
            .flat_map(|c| self.with_change(*c).cloned())
            .collect();
        sort_alterations(grouped)
    }

    pub fn statements(&self) -> Vec<String> {
        self.alterations().iter().flat_map(|a| a.statements()).collect()
    }

    pub fn diff(&self) -> Vec<String> {
        self.alterations().iter().flat_map(|a| a.diff()).collect()
    }

    pub fn is_equivalent(&self) -> bool {
        self.items
            .iter()
            .all(|a| a.key().change == Change::Retained && a.tables.is_equivalent())
    }
}

fn table_refs(tables: &[CreateTableStatement]) -> Vec<&CreateTableStatement> {
    tables.iter().collect()
}
