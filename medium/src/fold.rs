// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Dead clause elimination and chain folding.
//!
//! A predicate is foldable when it has exactly one producer clause and
//! exactly one consumer clause, neither of which belongs to a query or test
//! rule. Foldable predicates form a [`petgraph`] flow graph, with an edge from
//! each predicate to the foldable conclusion of its consumer; predicates that
//! flow into a cycle are not folded. The rest are grouped with [`ena`]: a
//! predicate is joined with its successor in the graph and with the other
//! foldable premises of its consumer. Every group flows into a single end
//! clause, which is merged with all its producers into one clause.

use ena::unify::{InPlace, UnificationTable, UnifyKey};
use horn::{
    syntax::{Clause, CompoundInvocation, Expr, Predicate, Proposition, Rule, VarKind},
    term::subst::{substitute, Substitution},
};
use itertools::Itertools;
use lower::oracle::RuleTypeOracle;
use petgraph::{algo::tarjan_scc, graph::NodeIndex, Directed, Graph};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    convert::Infallible,
};
use thiserror::Error;

use crate::index::{clause, ClauseId, OccurrenceIndex};

/// A contract violation of chain folding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FoldError {
    /// Every producer in the group consumes another predicate of the group
    #[error("no clause starts the chain through {0}")]
    NoChainStart(String),
    /// The group does not flow into exactly one clause outside of it
    #[error("no clause ends the chain through {0}")]
    NoChainEnd(String),
}

// wrapper to implement ena::unify traits on
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
struct PredicateKey(u32);

impl UnifyKey for PredicateKey {
    type Value = ();
    fn index(&self) -> u32 {
        self.0
    }
    fn from_index(u: u32) -> PredicateKey {
        PredicateKey(u)
    }
    fn tag() -> &'static str {
        "PredicateKey"
    }
}

/// Predicates that query or test rules conclude.
fn protected(rules: &[Rule], oracle: &dyn RuleTypeOracle) -> BTreeSet<Predicate> {
    rules
        .iter()
        .filter(|r| oracle.is_query_or_test(r))
        .flat_map(|r| r.clauses.iter().map(|c| c.conclusion.predicate.clone()))
        .collect()
}

/// Repeatedly delete clauses whose conclusion is neither consumed nor
/// protected, then rules left without clauses. Query and test rules are kept.
pub fn eliminate_dead_clauses(mut rules: Vec<Rule>, oracle: &dyn RuleTypeOracle) -> Vec<Rule> {
    let keep = protected(&rules, oracle);
    let mut deleted = 0;
    loop {
        let index = OccurrenceIndex::build(&rules);
        let before: usize = rules.iter().map(|r| r.clauses.len()).sum();
        rules = rules
            .into_iter()
            .filter_map(|rule| {
                if oracle.is_query_or_test(&rule) {
                    return Some(rule);
                }
                let clauses: Vec<Clause> = rule
                    .clauses
                    .iter()
                    .filter(|c| {
                        let p = &c.conclusion.predicate;
                        let live = index.is_consumed(p) || keep.contains(p);
                        if !live {
                            log::debug!("deleting dead clause of {}: {c}", rule.name);
                        }
                        live
                    })
                    .cloned()
                    .collect();
                (!clauses.is_empty()).then(|| Rule { clauses, ..rule })
            })
            .collect();
        let after: usize = rules.iter().map(|r| r.clauses.len()).sum();
        if after == before {
            break;
        }
        deleted += before - after;
    }
    log::info!("dead clause elimination deleted {deleted} clauses");
    rules
}

fn substitute_clause(clause: &Clause, s: &Substitution) -> Clause {
    match clause.try_map_exprs(|e| Ok::<_, Infallible>(substitute(e, s))) {
        Ok(clause) => clause,
        Err(never) => match never {},
    }
}

/// The producer and consumer of every predicate with exactly one of each,
/// unless it is protected or either clause belongs to a query or test rule.
fn single_producer_consumer(
    rules: &[Rule],
    oracle: &dyn RuleTypeOracle,
) -> (HashMap<Predicate, ClauseId>, HashMap<Predicate, ClauseId>) {
    let index = OccurrenceIndex::build(rules);
    let keep = protected(rules, oracle);
    let folds = |id: ClauseId| !oracle.is_query_or_test(&rules[id.rule]);
    let mut producers = HashMap::new();
    let mut consumers = HashMap::new();
    for (p, occurrences) in index.iter() {
        if let ([consumer], [producer]) = (
            occurrences.as_premise.as_slice(),
            occurrences.as_conclusion.as_slice(),
        ) {
            if !keep.contains(p) && folds(*consumer) && folds(*producer) {
                producers.insert(p.clone(), *producer);
                consumers.insert(p.clone(), *consumer);
            }
        }
    }
    (producers, consumers)
}

/// Foldable predicates, with an edge from each one to the conclusion of its
/// consumer when that is foldable too. Nodes are added in sorted order.
fn flow_graph(
    rules: &[Rule],
    consumers: &HashMap<Predicate, ClauseId>,
) -> (Graph<Predicate, (), Directed>, HashMap<Predicate, NodeIndex>) {
    let mut g = Graph::new();
    let nodes: HashMap<Predicate, NodeIndex> = consumers
        .keys()
        .sorted()
        .map(|p| (p.clone(), g.add_node(p.clone())))
        .collect();
    for (p, consumer) in consumers.iter().sorted() {
        let next = &clause(rules, *consumer).conclusion.predicate;
        if let Some(n) = nodes.get(next) {
            g.add_edge(nodes[p], *n, ());
        }
    }
    (g, nodes)
}

/// Predicates whose chain of consumers runs into a cycle. Such chains never
/// reach an end clause.
fn on_cycles(flow: &Graph<Predicate, (), Directed>) -> Vec<Predicate> {
    let mut cyclic: HashSet<NodeIndex> = HashSet::new();
    // components come after every component they have an edge into
    for component in tarjan_scc(flow) {
        let loops = component.len() > 1 || flow.contains_edge(component[0], component[0]);
        let reaches = component
            .iter()
            .any(|n| flow.neighbors(*n).any(|m| cyclic.contains(&m)));
        if loops || reaches {
            cyclic.extend(component);
        }
    }
    cyclic.into_iter().sorted().map(|n| flow[n].clone()).collect()
}

struct Chains<'a> {
    rules: &'a [Rule],
    /// The single producer of each foldable predicate
    producers: HashMap<Predicate, ClauseId>,
    /// The single consumer of each foldable predicate
    consumers: HashMap<Predicate, ClauseId>,
    flow: Graph<Predicate, (), Directed>,
    nodes: HashMap<Predicate, NodeIndex>,
    counter: usize,
}

impl<'a> Chains<'a> {
    fn analyze(rules: &'a [Rule], oracle: &dyn RuleTypeOracle) -> Self {
        let (mut producers, mut consumers) = single_producer_consumer(rules, oracle);
        let (flow, _) = flow_graph(rules, &consumers);
        for p in on_cycles(&flow) {
            log::debug!("not folding {} on a cycle", p.name);
            producers.remove(&p);
            consumers.remove(&p);
        }
        let (flow, nodes) = flow_graph(rules, &consumers);
        Chains {
            rules,
            producers,
            consumers,
            flow,
            nodes,
            counter: 0,
        }
    }

    /// Maximal groups of foldable predicates, sorted for determinism.
    fn groups(&self) -> Vec<Vec<Predicate>> {
        let key = |n: NodeIndex| PredicateKey(n.index() as u32);
        let mut table: UnificationTable<InPlace<PredicateKey>> = UnificationTable::new();
        for _ in self.flow.node_indices() {
            table.new_key(());
        }
        for edge in self.flow.raw_edges() {
            table.union(key(edge.source()), key(edge.target()));
        }
        for n in self.flow.node_indices() {
            let consumer = clause(self.rules, self.consumers[&self.flow[n]]);
            for q in consumer.premise_atoms() {
                if let Some(m) = self.nodes.get(&q.predicate) {
                    table.union(key(n), key(*m));
                }
            }
        }
        let mut groups: BTreeMap<PredicateKey, Vec<Predicate>> = BTreeMap::new();
        for n in self.flow.node_indices() {
            groups
                .entry(table.find(key(n)))
                .or_default()
                .push(self.flow[n].clone());
        }
        groups.into_values().collect()
    }

    /// The clause every predicate of the group flows into.
    fn end(&self, group: &[Predicate]) -> Result<ClauseId, FoldError> {
        let ends: BTreeSet<ClauseId> = group
            .iter()
            .map(|p| self.consumers[p])
            .filter(|id| !group.contains(&clause(self.rules, *id).conclusion.predicate))
            .collect();
        match ends.into_iter().exactly_one() {
            Ok(id) => Ok(id),
            Err(_) => Err(FoldError::NoChainEnd(group[0].name.clone())),
        }
    }

    fn check_start(&self, group: &[Predicate]) -> Result<(), FoldError> {
        let starts = group.iter().map(|p| self.producers[p]).filter(|id| {
            clause(self.rules, *id)
                .premise_atoms()
                .all(|a| !group.contains(&a.predicate))
        });
        if starts.count() == 0 {
            return Err(FoldError::NoChainStart(group[0].name.clone()));
        }
        Ok(())
    }

    /// `id` with every premise over a foldable predicate replaced by the
    /// premises of its (recursively composed) producer.
    fn compose(&mut self, id: ClauseId) -> Clause {
        let current = clause(self.rules, id).clone();
        let mut premises = vec![];
        let mut free_vars = current.free_vars.clone();
        for premise in current.premises {
            let atom = match premise {
                Proposition::Predicate(atom) if self.producers.contains_key(&atom.predicate) => {
                    atom
                }
                other => {
                    premises.push(other);
                    continue;
                }
            };
            let producer_id = self.producers[&atom.predicate];
            let producer = self.compose(producer_id);
            let k = self.counter;
            self.counter += 1;

            // rename apart
            let fresh: BTreeMap<String, String> = producer
                .free_vars
                .keys()
                .map(|name| (name.clone(), format!("{name}!{k}")))
                .collect();
            let rename: Substitution = producer
                .free_vars
                .iter()
                .map(|(name, ty)| ((VarKind::Free, name.clone()), Expr::free(&fresh[name], ty)))
                .collect();
            let producer = substitute_clause(&producer, &rename);

            // the producer's conclusion must match the consumed atom
            let mut s = Substitution::new();
            let mut pending = vec![];
            for (formal, actual) in producer.conclusion.exprs().zip(atom.exprs()) {
                match formal {
                    Expr::Var(VarKind::Free, b)
                        if !s.contains_key(&(VarKind::Free, b.name.clone())) =>
                    {
                        s.insert((VarKind::Free, b.name.clone()), actual.clone());
                    }
                    _ => pending.push((formal.clone(), actual.clone())),
                }
            }
            let instance = substitute_clause(&producer, &s);
            premises.extend(instance.premises);
            for (formal, actual) in pending {
                premises.push(Proposition::Expr(Expr::eq(actual, substitute(&formal, &s))));
            }
            for (name, ty) in producer.free_vars {
                if !s.contains_key(&(VarKind::Free, name.clone())) {
                    free_vars.insert(name, ty);
                }
            }
        }
        Clause {
            premises,
            conclusion: current.conclusion,
            free_vars,
        }
    }
}

/// Merge every group of foldable predicates into a single clause, emitted
/// as a new rule `merge{N}`. Clauses outside of groups are kept in place.
pub fn fold_linear_chains(
    rules: Vec<Rule>,
    oracle: &dyn RuleTypeOracle,
) -> Result<Vec<Rule>, FoldError> {
    let mut chains = Chains::analyze(&rules, oracle);
    let mut folded: BTreeSet<ClauseId> = BTreeSet::new();
    let mut merged = vec![];
    for group in chains.groups() {
        chains.check_start(&group)?;
        let end = chains.end(&group)?;
        log::debug!(
            "folding {} into one clause",
            group.iter().map(|p| &p.name).join(", ")
        );
        folded.insert(end);
        folded.extend(group.iter().map(|p| chains.producers[p]));
        merged.push(chains.compose(end));
    }
    log::info!(
        "chain folding merged {} clauses into {}",
        folded.len(),
        merged.len()
    );
    let mut out: Vec<Rule> = rules
        .iter()
        .enumerate()
        .filter_map(|(r, rule)| {
            let clauses: Vec<Clause> = rule
                .clauses
                .iter()
                .enumerate()
                .filter(|(c, _)| !folded.contains(&ClauseId { rule: r, clause: *c }))
                .map(|(_, clause)| clause.clone())
                .collect();
            (!clauses.is_empty() || oracle.is_query_or_test(rule)).then(|| Rule {
                clauses,
                ..rule.clone()
            })
        })
        .collect();
    out.extend(
        merged
            .into_iter()
            .enumerate()
            .map(|(n, clause)| Rule::new(&format!("merge{n}"), CompoundInvocation::unit(), vec![clause])),
    );
    Ok(out)
}

/// Dead clause elimination followed by chain folding.
pub fn medium_step(rules: Vec<Rule>, oracle: &dyn RuleTypeOracle) -> Result<Vec<Rule>, FoldError> {
    let rules = eliminate_dead_clauses(rules, oracle);
    fold_linear_chains(rules, oracle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use horn::syntax::{Atom, Type};
    use lower::oracle::ProgramOracle;

    fn atom(p: &str, args: Vec<Expr>) -> Atom {
        let types: Vec<Type> = args.iter().map(|e| e.ty()).collect();
        Atom::new(&Predicate::new(p, &[], &types), vec![], args)
    }

    fn v(name: &str) -> Expr {
        Expr::free(name, &Type::Int)
    }

    fn rule(name: &str, premises: Vec<Proposition>, conclusion: Atom) -> Rule {
        let mut clause = Clause::new(premises, conclusion, BTreeMap::new());
        clause.free_vars = clause
            .undeclared_free_vars()
            .into_iter()
            .map(|b| (b.name, b.ty))
            .collect();
        Rule::new(name, CompoundInvocation::unit(), vec![clause])
    }

    fn query(names: &[&str]) -> ProgramOracle {
        ProgramOracle {
            queries: names.iter().map(|n| n.to_string()).collect(),
            tests: BTreeMap::new(),
        }
    }

    fn names(rules: &[Rule]) -> Vec<&str> {
        rules.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_dead_chain_is_removed() {
        let rules = vec![
            rule("r1", vec![], atom("A", vec![Expr::int(0)])),
            rule(
                "r2",
                vec![Proposition::Predicate(atom("A", vec![v("x")]))],
                atom("B", vec![v("x")]),
            ),
            rule("r3", vec![], atom("Q", vec![Expr::int(1)])),
            rule(
                "q",
                vec![Proposition::Predicate(atom("Q", vec![v("x")]))],
                atom("Goal", vec![v("x")]),
            ),
        ];
        let out = medium_step(rules, &query(&["q"])).unwrap();
        assert_eq!(names(&out), vec!["r3", "q"]);
    }

    #[test]
    fn test_query_rules_survive() {
        let rules = vec![rule("q", vec![], atom("Goal", vec![Expr::int(0)]))];
        let out = eliminate_dead_clauses(rules.clone(), &query(&["q"]));
        assert_eq!(out, rules);
        let out = eliminate_dead_clauses(rules, &query(&[]));
        assert!(out.is_empty());
    }

    #[test]
    fn test_linear_chain() {
        let rules = vec![
            rule(
                "r1",
                vec![Proposition::Expr(Expr::cmp(
                    horn::syntax::CmpOp::Gt,
                    v("v0"),
                    Expr::int(0),
                ))],
                atom("A", vec![v("v0")]),
            ),
            rule(
                "r2",
                vec![Proposition::Predicate(atom("A", vec![v("v0")]))],
                atom("B", vec![Expr::add(v("v0"), Expr::int(1))]),
            ),
            rule(
                "r3",
                vec![
                    Proposition::Predicate(atom("B", vec![v("v0")])),
                    Proposition::Expr(Expr::lt(v("v0"), Expr::int(10))),
                ],
                atom("Q", vec![v("v0")]),
            ),
            rule(
                "q",
                vec![Proposition::Predicate(atom("Q", vec![v("v0")]))],
                atom("Goal", vec![v("v0")]),
            ),
        ];
        let out = medium_step(rules, &query(&["q"])).unwrap();
        assert_eq!(names(&out), vec!["q", "merge0"]);
        insta::assert_display_snapshot!(out[1].clauses[0], @"forall v0:int, v0!1:int. v0!1 > 0, v0 == v0!1 + 1, v0 < 10 => Q(v0)");
    }

    #[test]
    fn test_premises_of_one_consumer_fold_together() {
        let rules = vec![
            rule("r1", vec![], atom("A", vec![Expr::int(1)])),
            rule("r2", vec![], atom("B", vec![Expr::int(2)])),
            rule(
                "r3",
                vec![
                    Proposition::Predicate(atom("A", vec![v("x")])),
                    Proposition::Predicate(atom("B", vec![v("y")])),
                ],
                atom("Q", vec![Expr::add(v("x"), v("y"))]),
            ),
            rule(
                "q",
                vec![Proposition::Predicate(atom("Q", vec![v("z")]))],
                atom("Goal", vec![v("z")]),
            ),
        ];
        let out = medium_step(rules, &query(&["q"])).unwrap();
        assert_eq!(names(&out), vec!["q", "merge0"]);
        insta::assert_display_snapshot!(out[1].clauses[0], @"forall x:int, y:int. x == 1, y == 2 => Q(x + y)");
    }

    #[test]
    fn test_cycles_are_not_folded() {
        let rules = vec![
            rule(
                "r1",
                vec![Proposition::Predicate(atom("A", vec![v("x")]))],
                atom("B", vec![v("x")]),
            ),
            rule(
                "r2",
                vec![Proposition::Predicate(atom("B", vec![v("x")]))],
                atom("A", vec![v("x")]),
            ),
        ];
        let out = medium_step(rules.clone(), &query(&[])).unwrap();
        assert_eq!(out, rules);
    }

    #[test]
    fn test_chains_into_a_cycle_are_not_folded() {
        // P feeds the cycle A -> B -> A
        let rules = vec![
            rule("s", vec![], atom("P", vec![Expr::int(0)])),
            rule(
                "c1",
                vec![
                    Proposition::Predicate(atom("P", vec![v("x")])),
                    Proposition::Predicate(atom("B", vec![v("y")])),
                ],
                atom("A", vec![Expr::add(v("x"), v("y"))]),
            ),
            rule(
                "c2",
                vec![Proposition::Predicate(atom("A", vec![v("x")]))],
                atom("B", vec![v("x")]),
            ),
        ];
        let (_, consumers) = single_producer_consumer(&rules, &query(&[]));
        let (flow, _) = flow_graph(&rules, &consumers);
        assert_eq!(flow.node_count(), 3);
        assert_eq!(flow.edge_count(), 3);
        assert_eq!(
            on_cycles(&flow).into_iter().map(|p| p.name).sorted().collect_vec(),
            vec!["A", "B", "P"]
        );
        let out = medium_step(rules.clone(), &query(&[])).unwrap();
        assert_eq!(out, rules);
    }
}
