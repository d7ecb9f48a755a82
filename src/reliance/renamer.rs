//! Suffix-based variable renaming
//!
//! Renaming appends `.<suffix>` to the name of every universal and
//! existential variable of a rule. Because a numeric suffix contains no dot,
//! two rules renamed with different suffixes never share a variable, and
//! `restore` with the same suffix gives back the original rule.

use crate::term::{Rule, Term};

/// Rename a single term; constants and nulls are returned unchanged
pub fn rename_term(term: &Term, suffix: u32) -> Term {
    if term.is_variable() {
        term.with_name(format!("{}.{}", term.name(), suffix))
    } else {
        term.clone()
    }
}

/// Undo [`rename_term`]; terms without the suffix are returned unchanged
pub fn restore_term(term: &Term, suffix: u32) -> Term {
    if !term.is_variable() {
        return term.clone();
    }
    let tail = format!(".{}", suffix);
    match term.name().strip_suffix(tail.as_str()) {
        Some(base) if !base.is_empty() => term.with_name(base),
        _ => term.clone(),
    }
}

/// A structurally equal copy of `rule` whose variables carry `suffix`
pub fn rename_rule(rule: &Rule, suffix: u32) -> Rule {
    rule.map_terms(|t| rename_term(t, suffix))
}

/// The inverse of [`rename_rule`]
pub fn restore_rule(rule: &Rule, suffix: u32) -> Rule {
    rule.map_terms(|t| restore_term(t, suffix))
}

/// Renamer bound to one suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableRenamer {
    suffix: u32,
}

impl VariableRenamer {
    pub const fn new(suffix: u32) -> Self {
        VariableRenamer { suffix }
    }

    pub fn suffix(&self) -> u32 {
        self.suffix
    }

    pub fn rename(&self, rule: &Rule) -> Rule {
        rename_rule(rule, self.suffix)
    }

    pub fn restore(&self, rule: &Rule) -> Rule {
        restore_rule(rule, self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Literal;

    fn sample() -> Rule {
        Rule::new(
            vec![Literal::atom(
                "r",
                vec![Term::universal("x").unwrap(), Term::existential("y").unwrap()],
            )
            .unwrap()],
            vec![Literal::atom(
                "p",
                vec![Term::universal("x").unwrap(), Term::constant("c").unwrap()],
            )
            .unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn test_rename_rule() {
        let renamed = rename_rule(&sample(), 3);
        assert_eq!(renamed.to_string(), "r(?x.3, !y.3) :- p(?x.3, c) .");
        assert_eq!(renamed.frontier().len(), 1);
    }

    #[test]
    fn test_restore_is_inverse() {
        let rule = sample();
        assert_eq!(restore_rule(&rename_rule(&rule, 12), 12), rule);
    }

    #[test]
    fn test_different_suffixes_are_disjoint() {
        let rule = sample();
        let a = rename_rule(&rule, 1).universal_variables();
        let b = rename_rule(&rule, 2).universal_variables();
        assert!(a.is_disjoint(&b));
    }

    #[test]
    fn test_renamer_round_trip() {
        let renamer = VariableRenamer::new(7);
        let renamed = renamer.rename(&sample());
        assert!(renamed.universal_variables().iter().all(|v| v.name().ends_with(".7")));
        assert_eq!(renamer.restore(&renamed), sample());
    }

    #[test]
    fn test_restore_ignores_other_suffix() {
        let x = Term::universal("x.1").unwrap();
        assert_eq!(restore_term(&x, 2), x);
        assert_eq!(restore_term(&x, 1), Term::universal("x").unwrap());
    }
}
