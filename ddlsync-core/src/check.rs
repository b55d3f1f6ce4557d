//! Check constraint classification. Constraints are matched by their expression text.

use crate::alteration::{
    aligned_diff, aligned_statements, group_and_sort, interleaved_order, match_by_identity,
    Alteration, AlterationMeta, Change, Kind, NodeKey,
};
use crate::parser::CheckConstraintDefinition;

const CHANGE_ORDER: [Change; 4] = [
    Change::Dropped,
    Change::Modified,
    Change::Added,
    Change::Retained,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckChange {
    Added(CheckConstraintDefinition),
    Dropped(CheckConstraintDefinition),
    Modified {
        from: CheckConstraintDefinition,
        to: CheckConstraintDefinition,
    },
    Retained(CheckConstraintDefinition),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckAlteration {
    pub meta: AlterationMeta,
    pub change: CheckChange,
}

fn constraint_name(def: &CheckConstraintDefinition) -> String {
    if def.constraint_name.is_empty() {
        format!("<unknown constraint name of ({})>", def.check)
    } else {
        def.constraint_name.clone()
    }
}

impl CheckAlteration {
    fn new(scope: &str, change: CheckChange, seq_num: usize) -> Self {
        let (kind, def) = match &change {
            CheckChange::Added(d) => (Change::Added, d),
            CheckChange::Dropped(d) => (Change::Dropped, d),
            CheckChange::Modified { to, .. } => (Change::Modified, to),
            CheckChange::Retained(d) => (Change::Retained, d),
        };
        let key = NodeKey::new(scope, Kind::Check, kind, def.check.clone());
        CheckAlteration {
            meta: AlterationMeta::new(key, seq_num),
            change,
        }
    }
}

impl Alteration for CheckAlteration {
    fn statements(&self) -> Vec<String> {
        let s = match &self.change {
            CheckChange::Added(d) => format!("ADD {}", d),
            CheckChange::Dropped(d) => format!("DROP CHECK `{}`", constraint_name(d)),
            CheckChange::Modified { from, to } => {
                let enforcement = if to.enforcement.is_empty() {
                    "ENFORCED"
                } else {
                    to.enforcement.as_str()
                };
                format!("ALTER CHECK `{}` {}", constraint_name(from), enforcement)
            }
            CheckChange::Retained(_) => return Vec::new(),
        };
        vec![s]
    }

    fn diff(&self) -> Vec<String> {
        let s = match &self.change {
            CheckChange::Added(d) => format!("+ {}", d),
            CheckChange::Dropped(d) => format!("- {}", d),
            CheckChange::Modified { from, to } => format!("~ {}\t-> {}", from, to),
            CheckChange::Retained(d) => format!("  {}", d),
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

fn checks_equal(from: &CheckConstraintDefinition, to: &CheckConstraintDefinition) -> bool {
    from.check == to.check
        && from.enforcement == to.enforcement
        && (to.constraint_name.is_empty() || from.constraint_name == to.constraint_name)
}

#[derive(Debug, Clone, Default)]
pub struct CheckAlterations {
    pub items: Vec<CheckAlteration>,
}

impl CheckAlterations {
    pub fn new(
        scope: &str,
        from: &[&CheckConstraintDefinition],
        to: &[&CheckConstraintDefinition],
    ) -> Self {
        let from_checks: Vec<&str> = from.iter().map(|c| c.check.as_str()).collect();
        let to_checks: Vec<&str> = to.iter().map(|c| c.check.as_str()).collect();
        let order = interleaved_order(&from_checks, &to_checks);
        let matched = match_by_identity(from, to, |c: &CheckConstraintDefinition| c.check.clone());

        let mut items = Vec::new();
        for (id, d) in matched.only_from {
            items.push(CheckAlteration::new(scope, CheckChange::Dropped(d.clone()), order[&id]));
        }
        for (id, d) in matched.only_to {
            items.push(CheckAlteration::new(scope, CheckChange::Added(d.clone()), order[&id]));
        }
        for (id, f, t) in matched.both {
            let seq = order[&id];
            if checks_equal(f, t) {
                items.push(CheckAlteration::new(scope, CheckChange::Retained(f.clone()), seq));
            } else if !t.constraint_name.is_empty() && f.constraint_name != t.constraint_name {
                items.push(CheckAlteration::new(scope, CheckChange::Dropped(f.clone()), seq));
                items.push(CheckAlteration::new(scope, CheckChange::Added(t.clone()), seq));
            } else {
                let change = CheckChange::Modified {
                    from: f.clone(),
                    to: t.clone(),
                };
                items.push(CheckAlteration::new(scope, change, seq));
            }
        }
        CheckAlterations { items }
    }

    pub fn with_change(&self, change: Change) -> impl Iterator<Item = &CheckAlteration> {
        self.items.iter().filter(move |a| a.key().change == change)
    }

    pub fn alterations(&self) -> Vec<CheckAlteration> {
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

    fn check(name: &str, expr: &str, enforcement: &str) -> CheckConstraintDefinition {
        CheckConstraintDefinition {
            constraint_name: name.to_string(),
            check: expr.to_string(),
            enforcement: enforcement.to_string(),
        }
    }

    fn classify(
        from: &[CheckConstraintDefinition],
        to: &[CheckConstraintDefinition],
    ) -> CheckAlterations {
        let from: Vec<&CheckConstraintDefinition> = from.iter().collect();
        let to: Vec<&CheckConstraintDefinition> = to.iter().collect();
        CheckAlterations::new("db.t", &from, &to)
    }

    #[test]
    fn test_retained_when_desired_name_is_empty() {
        let c = classify(&[check("c1", "`a` > 0", "")], &[check("", "`a` > 0", "")]);
        assert!(c.is_equivalent());
        assert_eq!(c.diff(), vec!["  CONSTRAINT `c1` CHECK (`a` > 0)"]);
    }

    #[test]
    fn test_enforcement_change() {
        let c = classify(
            &[check("c1", "`a` > 0", "")],
            &[check("c1", "`a` > 0", "NOT ENFORCED")],
        );
        assert_eq!(c.statements(), vec!["ALTER CHECK `c1` NOT ENFORCED"]);

        let back = classify(
            &[check("c1", "`a` > 0", "NOT ENFORCED")],
            &[check("c1", "`a` > 0", "")],
        );
        assert_eq!(back.statements(), vec!["ALTER CHECK `c1` ENFORCED"]);
    }

    #[test]
    fn test_renamed_constraint_is_dropped_and_added() {
        let c = classify(&[check("c1", "`a` > 0", "")], &[check("c2", "`a` > 0", "")]);
        assert_eq!(
            c.statements(),
            vec!["DROP CHECK `c1`", "ADD CONSTRAINT `c2` CHECK (`a` > 0)"]
        );
    }

    #[test]
    fn test_drop_unnamed_uses_placeholder() {
        let c = classify(&[check("", "`a` > 0", "")], &[]);
        assert_eq!(
            c.statements(),
            vec!["DROP CHECK `<unknown constraint name of (`a` > 0)>`"]
        );
    }
}
