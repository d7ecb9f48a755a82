//! Grounding of a program with negation over its positive over-approximation
//!
//! Every rule is instantiated with each match of its positive body in the
//! materialization of the program without negated literals. A negated
//! literal that is not in that materialization can never become true and is
//! dropped from the ground rule. Existential variables take the skolem terms
//! the over-approximation used, so ground heads name the same atoms.

use std::fmt;
use std::io::{self, Write};

use tracing::debug;

use crate::error::{ChaseError, ChaseResult, ErrorCode};
use crate::kb::Program;
use crate::reasoning::SkolemTable;
use crate::store::FactStore;
use crate::term::{Bindings, Literal, Rule};

use super::answer_set::LiteralTable;

/// A normal ground rule `head :- positive, not negative`, over atoms
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroundRule {
    pub head: usize,
    pub positive: Vec<usize>,
    pub negative: Vec<usize>,
}

/// Ground normal program plus the table naming its atoms
#[derive(Debug, Clone, Default)]
pub struct GroundProgram {
    table: LiteralTable,
    rules: Vec<GroundRule>,
}

impl GroundProgram {
    /// Ground `program` over `over`, the materialization of its positive part
    ///
    /// `skolem` must be the table used to compute `over`, with rules
    /// numbered as in `program`.
    pub fn ground(
        program: &Program,
        over: &FactStore,
        skolem: &mut SkolemTable,
    ) -> ChaseResult<GroundProgram> {
        let mut ground = GroundProgram::default();
        for fact in &program.facts {
            let head = ground.table.insert(fact.clone());
            ground.rules.push(GroundRule {
                head,
                positive: Vec::new(),
                negative: Vec::new(),
            });
        }

        for (index, rule) in program.rules.iter().enumerate() {
            let before = ground.rules.len();
            let positive: Vec<&Literal> = rule.positive_body().collect();
            for bindings in over.match_all(&positive, &Bindings::default()) {
                let full = skolem.instantiate(index, rule, &bindings);
                ground.add_instance(rule, &positive, &full, over)?;
            }
            debug!(rule = %rule, instances = ground.rules.len() - before, "grounded rule");
        }
        Ok(ground)
    }

    fn add_instance(
        &mut self,
        rule: &Rule,
        positive: &[&Literal],
        bindings: &Bindings,
        over: &FactStore,
    ) -> ChaseResult<()> {
        let body: Vec<usize> = positive
            .iter()
            .map(|l| self.table.insert(l.substitute(bindings)))
            .collect();

        let mut negative = Vec::new();
        for literal in rule.negative_body() {
            let atom = literal.to_positive().substitute(bindings);
            if !atom.is_ground() {
                return Err(ChaseError::reasoning(format!(
                    "negated literal {} is not bound by the positive body of {}",
                    literal, rule
                ))
                .with_code(ErrorCode::UnsafeNegation)
                .with_context("rule", rule.to_string()));
            }
            if over.contains_literal(&atom) {
                negative.push(self.table.insert(atom));
            }
        }

        for head in rule.head() {
            let head = head.substitute(bindings);
            crate::chase_ensure!(
                over.contains_literal(&head),
                ErrorCode::InternalError,
                "ground head {} is missing from the over-approximation",
                head
            );
            let head = self.table.insert(head);
            self.rules.push(GroundRule {
                head,
                positive: body.clone(),
                negative: negative.clone(),
            });
        }
        Ok(())
    }

    pub fn table(&self) -> &LiteralTable {
        &self.table
    }

    pub fn into_table(self) -> LiteralTable {
        self.table
    }

    pub fn rules(&self) -> &[GroundRule] {
        &self.rules
    }

    pub fn atom_count(&self) -> usize {
        self.table.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Write the program in the aspif format, showing every atom as its number
    pub fn write_aspif<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "asp 1 0 0")?;
        for rule in &self.rules {
            write!(
                out,
                "1 0 1 {} 0 {}",
                rule.head,
                rule.positive.len() + rule.negative.len()
            )?;
            for atom in &rule.positive {
                write!(out, " {}", atom)?;
            }
            for atom in &rule.negative {
                write!(out, " -{}", atom)?;
            }
            writeln!(out)?;
        }
        for (atom, _) in self.table.iter() {
            let name = atom.to_string();
            writeln!(out, "4 {} {} 1 {}", name.len(), name, atom)?;
        }
        writeln!(out, "0")
    }

    pub fn to_aspif(&self) -> String {
        let mut buf = Vec::new();
        // Writing to a Vec cannot fail
        let _ = self.write_aspif(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl fmt::Display for GroundProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |atom: &usize| {
            self.table
                .get(*atom)
                .map_or_else(|| format!("#{}", atom), |l| l.to_string())
        };
        for rule in &self.rules {
            write!(f, "{}", name(&rule.head))?;
            let body: Vec<String> = rule
                .positive
                .iter()
                .map(name)
                .chain(rule.negative.iter().map(|a| format!("not {}", name(a))))
                .collect();
            if !body.is_empty() {
                write!(f, " :- {}", body.join(", "))?;
            }
            writeln!(f, " .")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asp::positive_program;
    use crate::reasoning::{ChaseEngine, SkolemChase};
    use crate::term::{Predicate, Term};

    fn c(name: &str) -> Term {
        Term::constant(name).unwrap()
    }

    fn v(name: &str) -> Term {
        Term::universal(name).unwrap()
    }

    fn atom(name: &str, args: Vec<Term>) -> Literal {
        Literal::atom(name, args).unwrap()
    }

    fn neg(name: &str, args: Vec<Term>) -> Literal {
        Literal::negative(Predicate::new(name, args.len()).unwrap(), args).unwrap()
    }

    fn ground(program: &Program) -> GroundProgram {
        let mut chase = SkolemChase::new();
        let over = ChaseEngine::default()
            .run_with(&positive_program(program).unwrap(), &mut chase)
            .unwrap();
        let mut table = chase.into_table();
        GroundProgram::ground(program, &over.store, &mut table).unwrap()
    }

    #[test]
    fn test_choice_program() {
        // a :- ~b     b :- ~a     over the domain d
        let program = Program {
            facts: vec![atom("d", vec![c("x")])],
            rules: vec![
                Rule::new(vec![atom("a", vec![v("x")])], vec![atom("d", vec![v("x")]), neg("b", vec![v("x")])]).unwrap(),
                Rule::new(vec![atom("b", vec![v("x")])], vec![atom("d", vec![v("x")]), neg("a", vec![v("x")])]).unwrap(),
            ],
        };
        let ground = ground(&program);
        assert_eq!(ground.rule_count(), 3);
        assert_eq!(ground.atom_count(), 3);
        assert_eq!(
            ground.to_aspif(),
            "asp 1 0 0\n\
             1 0 1 1 0 0\n\
             1 0 1 3 0 2 1 -2\n\
             1 0 1 2 0 2 1 -3\n\
             4 1 1 1 1\n\
             4 1 2 1 2\n\
             4 1 3 1 3\n\
             0\n"
        );
        assert!(ground.to_string().contains("a(x) :- d(x), not b(x) ."));
    }

    #[test]
    fn test_impossible_negation_is_dropped() {
        let program = Program {
            facts: vec![atom("p", vec![c("a")])],
            rules: vec![Rule::new(
                vec![atom("q", vec![v("x")])],
                vec![atom("p", vec![v("x")]), neg("r", vec![v("x")])],
            )
            .unwrap()],
        };
        let ground = ground(&program);
        assert!(ground.rules().iter().all(|r| r.negative.is_empty()));
        assert_eq!(ground.rule_count(), 2);
    }

    #[test]
    fn test_existential_heads_reuse_skolem_terms() {
        let program = Program {
            facts: vec![atom("p", vec![c("a")])],
            rules: vec![Rule::new(
                vec![atom("q", vec![v("x"), Term::existential("y").unwrap()])],
                vec![atom("p", vec![v("x")])],
            )
            .unwrap()],
        };
        let ground = ground(&program);
        let q = ground.table().get(2).unwrap();
        assert_eq!(q.to_string(), "q(a, _:sk0)");
    }
}
