//! The shared shape of every classified schema change.
//!
//! Each classifier produces values implementing [`Alteration`]. Ordering state
//! (sequence number, dependencies, statement prefix) lives in one
//! [`AlterationMeta`] embedded in every concrete alteration, and dependencies
//! point at other alterations through their [`NodeKey`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::dependency::sort_alterations;
use crate::parser::KeyPart;

/// Position of every column (by name) in the interleaved walk of two column lists.
pub type ColumnOrder = HashMap<String, usize>;

/// What kind of schema element an alteration changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Database,
    DatabaseOption,
    Table,
    Column,
    PrimaryKey,
    UniqueKey,
    Index,
    FullTextIndex,
    ForeignKey,
    Check,
    TableOption,
}

/// How an element changed between the two schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Change {
    Added,
    Dropped,
    Modified,
    Renamed,
    Retained,
    Moved,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Change::Added => "added",
            Change::Dropped => "dropped",
            Change::Modified => "modified",
            Change::Renamed => "renamed",
            Change::Retained => "retained",
            Change::Moved => "moved",
        };
        f.write_str(s)
    }
}

/// Identity of one alteration within a comparison run.
///
/// `scope` is the database name for database and table alterations and
/// `db.table` for element alterations, so keys of different tables never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub scope: String,
    pub kind: Kind,
    pub change: Change,
    pub id: String,
}

impl NodeKey {
    pub fn new(scope: &str, kind: Kind, change: Change, id: impl Into<String>) -> Self {
        NodeKey {
            scope: scope.to_string(),
            kind,
            change,
            id: id.into(),
        }
    }

    /// The same element seen with another change.
    pub fn with_change(&self, change: Change) -> Self {
        NodeKey {
            change,
            ..self.clone()
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{:?}/{}/{}",
            self.scope,
            self.kind,
            self.change,
            self.id.replace('\0', ",")
        )
    }
}

/// Ordering state shared by all alterations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterationMeta {
    pub key: NodeKey,
    pub seq_num: usize,
    pub depends_on: Vec<NodeKey>,
    pub prefix: String,
}

impl AlterationMeta {
    pub fn new(key: NodeKey, seq_num: usize) -> Self {
        AlterationMeta {
            key,
            seq_num,
            depends_on: Vec::new(),
            prefix: String::new(),
        }
    }
}

/// A single classified change to one schema element.
pub trait Alteration {
    /// Statements executing the change, without the prefix.
    fn statements(&self) -> Vec<String>;

    /// Diff lines (`+ `, `- `, `~ `, `@ ` or two spaces, followed by the definition).
    fn diff(&self) -> Vec<String>;

    fn meta(&self) -> &AlterationMeta;

    fn meta_mut(&mut self) -> &mut AlterationMeta;

    /// Identity among alterations of the same kind.
    fn id(&self) -> &str {
        &self.meta().key.id
    }

    fn key(&self) -> &NodeKey {
        &self.meta().key
    }

    fn seq_num(&self) -> usize {
        self.meta().seq_num
    }

    fn set_seq_num(&mut self, n: usize) {
        self.meta_mut().seq_num = n;
    }

    fn depends_on(&self) -> &[NodeKey] {
        &self.meta().depends_on
    }

    fn add_depends_on(&mut self, key: &NodeKey) {
        let meta = self.meta_mut();
        if meta.key != *key && !meta.depends_on.contains(key) {
            meta.depends_on.push(key.clone());
        }
    }

    fn prefix(&self) -> &str {
        &self.meta().prefix
    }

    fn set_prefix(&mut self, prefix: &str) {
        self.meta_mut().prefix = prefix.to_string();
    }
}

impl<T: Alteration + ?Sized> Alteration for Box<T> {
    fn statements(&self) -> Vec<String> {
        (**self).statements()
    }

    fn diff(&self) -> Vec<String> {
        (**self).diff()
    }

    fn meta(&self) -> &AlterationMeta {
        (**self).meta()
    }

    fn meta_mut(&mut self) -> &mut AlterationMeta {
        (**self).meta_mut()
    }
}

/// Identity of a key-part list: column names (or expressions) joined by NUL.
pub fn key_id(parts: &[KeyPart]) -> String {
    parts
        .iter()
        .map(|p| {
            if p.column.is_empty() {
                p.expression.as_str()
            } else {
                p.column.as_str()
            }
        })
        .collect::<Vec<_>>()
        .join("\0")
}

/// `name`, or a placeholder naming the element when the observed schema left it unnamed.
pub fn name_or_placeholder(name: &str, what: &str, identity: &str) -> String {
    if name.is_empty() {
        format!("<unknown {} name of '{}'>", what, identity)
    } else {
        name.to_string()
    }
}

/// Sequence numbers from walking two ordered name lists side by side. A name present in
/// `to` takes the earlier slot of its step, so that added elements sort close to their
/// neighbours in the desired schema.
pub fn interleaved_order<'a>(from: &[&'a str], to: &[&'a str]) -> HashMap<String, usize> {
    let mut ret: HashMap<String, usize> = HashMap::new();
    let (mut p1, mut p2, mut seq) = (0, 0, 0);
    while p1 < from.len() || p2 < to.len() {
        if p1 >= from.len() {
            ret.insert(to[p2].to_string(), seq);
            p2 += 1;
            seq += 1;
            continue;
        }
        if p2 >= to.len() {
            ret.entry(from[p1].to_string()).or_insert(seq);
            p1 += 1;
            seq += 1;
            continue;
        }
        ret.insert(to[p2].to_string(), seq);
        ret.entry(from[p1].to_string()).or_insert(seq + 1);
        p1 += 1;
        p2 += 1;
        seq += 2;
    }
    ret
}

/// Sequence numbers of keys: shorter key-part lists first, then by the column order of
/// the first differing key part.
pub fn key_order(
    mut keys: Vec<(String, &[KeyPart])>,
    column_order: &ColumnOrder,
) -> HashMap<String, usize> {
    let position = |p: &KeyPart| column_order.get(&p.column).copied().unwrap_or(0);
    keys.sort_by(|(_, a), (_, b)| {
        a.len().cmp(&b.len()).then_with(|| {
            a.iter()
                .zip(b.iter())
                .find(|(x, y)| x != y)
                .map(|(x, y)| position(x).cmp(&position(y)))
                .unwrap_or(Ordering::Equal)
        })
    });
    keys.into_iter()
        .enumerate()
        .map(|(i, (identity, _))| (identity, i))
        .collect()
}

/// Elements of two lists paired up by an identity string.
pub struct Matched<'a, T> {
    /// Only in `from`, in `from` order.
    pub only_from: Vec<(String, &'a T)>,
    /// Only in `to`, in `to` order.
    pub only_to: Vec<(String, &'a T)>,
    /// In both, in `from` order.
    pub both: Vec<(String, &'a T, &'a T)>,
}

/// Pair elements by identity. When an identity repeats, the last element wins.
pub fn match_by_identity<'a, T>(
    from: &[&'a T],
    to: &[&'a T],
    identity: impl Fn(&T) -> String,
) -> Matched<'a, T> {
    fn index<'a, T>(
        items: &[&'a T],
        identity: &impl Fn(&T) -> String,
    ) -> (Vec<String>, HashMap<String, &'a T>) {
        let mut order = Vec::new();
        let mut map = HashMap::new();
        for &item in items {
            let id = identity(item);
            if map.insert(id.clone(), item).is_none() {
                order.push(id);
            }
        }
        (order, map)
    }

    let (from_order, from_map) = index(from, &identity);
    let (to_order, to_map) = index(to, &identity);

    let mut matched = Matched {
        only_from: Vec::new(),
        only_to: Vec::new(),
        both: Vec::new(),
    };
    for id in from_order {
        let f = from_map[&id];
        match to_map.get(&id) {
            Some(&t) => matched.both.push((id, f, t)),
            None => matched.only_from.push((id, f)),
        }
    }
    for id in to_order {
        if !from_map.contains_key(&id) {
            let t = to_map[&id];
            matched.only_to.push((id, t));
        }
    }
    matched
}

/// Group alterations by change kind in the given order, then order them by their
/// dependencies.
pub fn group_and_sort<T: Alteration + Clone>(items: &[T], order: &[Change]) -> Vec<T> {
    let grouped: Vec<T> = order
        .iter()
        .flat_map(|c| items.iter().filter(move |a| a.key().change == *c).cloned())
        .collect();
    sort_alterations(grouped)
}

/// Statements of a list of alterations with tab columns aligned.
pub fn aligned_statements<T: Alteration>(alterations: &[T]) -> Vec<String> {
    let lines: Vec<String> = alterations.iter().flat_map(|a| a.statements()).collect();
    align(&lines)
}

/// Diff lines of a list of alterations with tab columns aligned.
pub fn aligned_diff<T: Alteration>(alterations: &[T]) -> Vec<String> {
    let lines: Vec<String> = alterations.iter().flat_map(|a| a.diff()).collect();
    align(&lines)
}

/// Pad tab-separated columns so that every row lines up. The last column of a
/// row is never padded and trailing whitespace is dropped.
pub fn align(lines: &[String]) -> Vec<String> {
    let matrix: Vec<Vec<&str>> = lines
        .iter()
        .map(|l| l.trim_end_matches(['\t', '\n', ' ']).split('\t').collect())
        .collect();
    let n_cols = matrix.iter().map(Vec::len).max().unwrap_or(0);

    let mut widths = vec![0usize; n_cols];
    for row in &matrix {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    matrix
        .iter()
        .map(|row| {
            let last = row.len().saturating_sub(1);
            row.iter()
                .enumerate()
                .map(|(i, cell)| {
                    if i < last {
                        format!("{:<width$}", cell, width = widths[i])
                    } else {
                        cell.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Prefix every line of a (possibly multi-line) text.
pub fn prefix_lines(text: &str, prefix: &str) -> String {
    text.split('\n')
        .map(|l| format!("{}{}", prefix, l))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Move the body of diff lines right by `depth` columns, keeping the marker in front.
pub fn indent_diff(lines: &[String], depth: usize) -> Vec<String> {
    lines
        .iter()
        .map(|l| {
            let mut chars = l.chars();
            let marker = chars.next().unwrap_or(' ');
            let body = l.get(2..).unwrap_or("");
            format!("{}{}{}", marker, " ".repeat(depth + 1), body)
        })
        .collect()
}
