//! Reliance graph over a rule set and its stratification

use crate::error::{ChaseError, ChaseResult, ErrorCode};
use crate::term::Rule;

/// Positive and negative reliances between the rules of a rule set
///
/// Rules are identified by their index in the slice the graph was built from.
#[derive(Debug, Clone)]
pub struct RelianceGraph {
    rules: Vec<Rule>,
    positive: Vec<Vec<usize>>,
    negative: Vec<Vec<usize>>,
}

impl RelianceGraph {
    pub(crate) fn new(rules: Vec<Rule>) -> Self {
        let n = rules.len();
        RelianceGraph {
            rules,
            positive: vec![Vec::new(); n],
            negative: vec![Vec::new(); n],
        }
    }

    pub(crate) fn add_positive(&mut self, from: usize, to: usize) {
        self.positive[from].push(to);
    }

    pub(crate) fn add_negative(&mut self, from: usize, to: usize) {
        self.negative[from].push(to);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules that may rely on rule `index`
    pub fn dependents_of(&self, index: usize) -> &[usize] {
        &self.positive[index]
    }

    /// Rules with a negated body literal that rule `index` may make true
    pub fn restrained_by(&self, index: usize) -> &[usize] {
        &self.negative[index]
    }

    /// Check whether rule `to` may rely on rule `from`
    pub fn relies(&self, from: usize, to: usize) -> bool {
        self.positive[from].contains(&to)
    }

    /// All positive edges `(from, to)`
    pub fn positive_edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.positive
            .iter()
            .enumerate()
            .flat_map(|(from, tos)| tos.iter().map(move |&to| (from, to)))
    }

    /// All negative edges `(from, to)`
    pub fn negative_edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.negative
            .iter()
            .enumerate()
            .flat_map(|(from, tos)| tos.iter().map(move |&to| (from, to)))
    }

    /// Strongly connected components over both edge kinds, sinks first
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut tarjan = Tarjan::new(self);
        for v in 0..self.len() {
            if tarjan.index[v].is_none() {
                tarjan.visit(v);
            }
        }
        tarjan.components
    }

    /// Partition the rules into strata, lowest first
    ///
    /// A rule that relies on another is in the same or a higher stratum; a
    /// rule restrained by another is in a strictly higher one. Fails with
    /// `UnstratifiableNegation` if a negative edge lies on a cycle.
    pub fn strata(&self) -> ChaseResult<Vec<Vec<usize>>> {
        let components = self.components();
        let mut component_of = vec![0; self.len()];
        for (c, members) in components.iter().enumerate() {
            for &v in members {
                component_of[v] = c;
            }
        }

        let mut level = vec![0usize; components.len()];
        for c in (0..components.len()).rev() {
            for &v in &components[c] {
                let edges = self.positive[v]
                    .iter()
                    .map(|&w| (w, 0))
                    .chain(self.negative[v].iter().map(|&w| (w, 1)));
                for (w, step) in edges {
                    let target = component_of[w];
                    if target == c {
                        if step == 1 {
                            return Err(ChaseError::reasoning(format!(
                                "rule set is not stratifiable: {} depends negatively on itself through {}",
                                self.rules[w], self.rules[v]
                            ))
                            .with_code(ErrorCode::UnstratifiableNegation)
                            .with_context("rule", self.rules[w].to_string()));
                        }
                        continue;
                    }
                    level[target] = level[target].max(level[c] + step);
                }
            }
        }

        let height = level.iter().copied().max().map_or(0, |m| m + 1);
        let mut strata = vec![Vec::new(); height];
        for v in 0..self.len() {
            strata[level[component_of[v]]].push(v);
        }
        strata.retain(|s| !s.is_empty());
        Ok(strata)
    }

    pub fn is_stratifiable(&self) -> bool {
        self.strata().is_ok()
    }
}

struct Tarjan<'a> {
    graph: &'a RelianceGraph,
    counter: usize,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    components: Vec<Vec<usize>>,
}

impl<'a> Tarjan<'a> {
    fn new(graph: &'a RelianceGraph) -> Self {
        let n = graph.len();
        Tarjan {
            graph,
            counter: 0,
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            components: Vec::new(),
        }
    }

    fn visit(&mut self, v: usize) {
        self.index[v] = Some(self.counter);
        self.lowlink[v] = self.counter;
        self.counter += 1;
        self.stack.push(v);
        self.on_stack[v] = true;

        let graph = self.graph;
        for &w in graph.positive[v].iter().chain(graph.negative[v].iter()) {
            match self.index[w] {
                None => {
                    self.visit(w);
                    self.lowlink[v] = self.lowlink[v].min(self.lowlink[w]);
                }
                Some(iw) if self.on_stack[w] => {
                    self.lowlink[v] = self.lowlink[v].min(iw);
                }
                Some(_) => {}
            }
        }

        if Some(self.lowlink[v]) == self.index[v] {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack[w] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            component.sort_unstable();
            self.components.push(component);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Literal, Term};

    fn dummy(n: usize) -> Vec<Rule> {
        (0..n)
            .map(|i| {
                let x = Term::universal("x").unwrap();
                Rule::new(
                    vec![Literal::atom(&format!("h{}", i), vec![x.clone()]).unwrap()],
                    vec![Literal::atom("b", vec![x]).unwrap()],
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_components() {
        let mut g = RelianceGraph::new(dummy(3));
        g.add_positive(0, 1);
        g.add_positive(1, 0);
        g.add_positive(1, 2);
        let comps = g.components();
        assert_eq!(comps.len(), 2);
        assert!(comps.contains(&vec![0, 1]));
        assert!(comps.contains(&vec![2]));
    }

    #[test]
    fn test_strata_with_negation() {
        // 0 -> 1 positive, 1 -| 2 negative
        let mut g = RelianceGraph::new(dummy(3));
        g.add_positive(0, 1);
        g.add_negative(1, 2);
        assert_eq!(g.strata().unwrap(), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_negative_cycle_is_unstratifiable() {
        let mut g = RelianceGraph::new(dummy(2));
        g.add_positive(0, 1);
        g.add_negative(1, 0);
        let err = g.strata().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnstratifiableNegation);
        assert!(!g.is_stratifiable());
    }

    #[test]
    fn test_negative_self_loop() {
        let mut g = RelianceGraph::new(dummy(1));
        g.add_negative(0, 0);
        assert!(!g.is_stratifiable());
    }

    #[test]
    fn test_empty_graph() {
        let g = RelianceGraph::new(Vec::new());
        assert!(g.strata().unwrap().is_empty());
    }
}
