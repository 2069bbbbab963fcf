// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! An ordered sequence of rule rewrites.
//!
//! Every rule goes through all steps on its own, so rules can be processed
//! in parallel. Steps only hold read-only shared context.

use horn::syntax::Rule;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    conf::TranslationConf,
    error::TranslationError,
    layout::TypeLayouter,
    oracle::RuleTypeOracle,
    selector::SelectorRegistry,
    steps::{
        filter::InapplicableClauseFilter, fold::fold, inline_operations::inline_operations,
        inline_types::TypeInliner, instantiate::ParameterInstantiator, rename::rename,
        simplify::simplify,
    },
};

type MapFn = Box<dyn Fn(Rule) -> Result<Rule, TranslationError> + Send + Sync>;
type FlatMapFn = Box<dyn Fn(Rule) -> Result<Vec<Rule>, TranslationError> + Send + Sync>;

/// One named rewrite.
pub enum Step {
    /// Rewrites a rule into a rule
    #[allow(missing_docs)]
    Map { name: &'static str, f: MapFn },
    /// Rewrites a rule into any number of rules
    #[allow(missing_docs)]
    FlatMap { name: &'static str, f: FlatMapFn },
}

impl Step {
    #[allow(missing_docs)]
    pub fn name(&self) -> &'static str {
        match self {
            Step::Map { name, .. } | Step::FlatMap { name, .. } => name,
        }
    }

    fn apply(&self, rule: Rule) -> Result<Vec<Rule>, TranslationError> {
        match self {
            Step::Map { f, .. } => Ok(vec![f(rule)?]),
            Step::FlatMap { f, .. } => f(rule),
        }
    }
}

/// A rule as it looked after one step.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TraceEntry {
    /// The step that produced the rule
    pub step: &'static str,
    /// The name of the rule
    pub rule: String,
    /// The rendered rule
    pub rendered: String,
}

/// The output of a pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Translated {
    /// Output rules, grouped by input rule in input order
    pub rules: Vec<Rule>,
    /// Per-step renderings, if tracing was enabled
    pub trace: Vec<TraceEntry>,
}

/// Steps applied to each rule in order.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Step>,
    trace: bool,
    parallel: bool,
}

impl Pipeline {
    /// An empty pipeline, which leaves rules unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule-to-rule step.
    pub fn map(
        mut self,
        name: &'static str,
        f: impl Fn(Rule) -> Result<Rule, TranslationError> + Send + Sync + 'static,
    ) -> Self {
        self.steps.push(Step::Map {
            name,
            f: Box::new(f),
        });
        self
    }

    /// Append a rule-to-rules step.
    pub fn flat_map(
        mut self,
        name: &'static str,
        f: impl Fn(Rule) -> Result<Vec<Rule>, TranslationError> + Send + Sync + 'static,
    ) -> Self {
        self.steps.push(Step::FlatMap {
            name,
            f: Box::new(f),
        });
        self
    }

    /// Record the rendering of every rule after every step.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Process rules in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Names of the steps, in order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(Step::name).collect()
    }

    /// The seven standard steps: operation inlining, type inlining, parameter
    /// instantiation, predicate simplification, free variable renaming,
    /// constant folding and inapplicable clause filtering.
    pub fn standard(
        conf: &TranslationConf,
        registry: Arc<SelectorRegistry>,
        oracle: Arc<dyn RuleTypeOracle>,
    ) -> Self {
        let inliner = TypeInliner::new(TypeLayouter::new(conf.discriminant));
        let instantiator = ParameterInstantiator::new(registry);
        let filter = InapplicableClauseFilter::new(oracle);
        Pipeline::new()
            .map("inline operations", inline_operations)
            .map("inline types", move |rule| inliner.inline_rule(rule))
            .flat_map("instantiate parameters", move |rule| {
                instantiator.instantiate_rule(rule)
            })
            .map("simplify predicates", |rule| Ok(simplify(rule)))
            .map("rename free variables", rename)
            .map("fold constants", |rule| Ok(fold(rule)))
            .flat_map("filter inapplicable clauses", move |rule| Ok(filter.filter(rule)))
            .with_trace(conf.trace)
            .with_parallel(conf.parallel)
    }

    fn run_rule(&self, rule: Rule) -> Result<Translated, TranslationError> {
        let name = rule.name.clone();
        let mut out = Translated {
            rules: vec![rule],
            trace: vec![],
        };
        for step in &self.steps {
            let mut next = vec![];
            for rule in out.rules {
                next.extend(step.apply(rule).map_err(|err| err.in_rule(&name))?);
            }
            if self.trace {
                for rule in &next {
                    let rendered = rule.to_string();
                    log::trace!("after {}:\n{rendered}", step.name());
                    out.trace.push(TraceEntry {
                        step: step.name(),
                        rule: rule.name.clone(),
                        rendered,
                    });
                }
            }
            out.rules = next;
        }
        Ok(out)
    }

    /// Run every rule through every step. The first error aborts the run.
    pub fn run(&self, rules: Vec<Rule>) -> Result<Translated, TranslationError> {
        log::info!("translating {} rules", rules.len());
        let results: Vec<Translated> = if self.parallel {
            rules
                .into_par_iter()
                .map(|rule| self.run_rule(rule))
                .collect::<Result<_, _>>()?
        } else {
            rules
                .into_iter()
                .map(|rule| self.run_rule(rule))
                .collect::<Result<_, _>>()?
        };
        let mut out = Translated::default();
        for result in results {
            out.rules.extend(result.rules);
            out.trace.extend(result.trace);
        }
        log::info!("translation produced {} rules", out.rules.len());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ProgramOracle;
    use horn::syntax::{
        Atom, Binder, Clause, CompoundInvocation, Expr, Invocation, Predicate, Proposition,
        SelectorFunction, Type,
    };
    use std::collections::BTreeMap;

    fn parameterized_rule() -> Rule {
        let interval = SelectorFunction::new("interval", &[Type::Int, Type::Int], &[Type::Int]);
        let p = Predicate::new("P", &[Type::Int], &[Type::Int]);
        let n = Expr::param("n", &Type::Int);
        let x = Expr::free("x", &Type::Int);
        // rule r for (n) in interval(0, 3): x > n - 1 /\ n != 1 => P{n}(x + n)
        Rule::new(
            "r",
            CompoundInvocation::single(Invocation::new(
                &interval,
                vec![Binder::new("n", &Type::Int)],
                vec![Expr::int(0), Expr::int(3)],
            )),
            vec![Clause::new(
                vec![
                    Proposition::Expr(Expr::cmp(
                        horn::syntax::CmpOp::Gt,
                        x.clone(),
                        Expr::sub(n.clone(), Expr::int(1)),
                    )),
                    Proposition::Expr(Expr::neq(n.clone(), Expr::int(1))),
                ],
                Atom::new(&p, vec![n.clone()], vec![Expr::add(x, n)]),
                BTreeMap::from([("x".to_string(), Type::Int)]),
            )],
        )
    }

    fn standard(conf: &TranslationConf) -> Pipeline {
        Pipeline::standard(
            conf,
            Arc::new(SelectorRegistry::with_builtins()),
            Arc::new(ProgramOracle::default()),
        )
    }

    #[test]
    fn test_standard_steps() {
        let pipeline = standard(&TranslationConf::default());
        assert_eq!(
            pipeline.step_names(),
            vec![
                "inline operations",
                "inline types",
                "instantiate parameters",
                "simplify predicates",
                "rename free variables",
                "fold constants",
                "filter inapplicable clauses",
            ]
        );
    }

    #[test]
    fn test_standard_pipeline() {
        let pipeline = standard(&TranslationConf::default());
        let out = pipeline.run(vec![parameterized_rule()]).unwrap();
        let rendered: Vec<_> = out.rules.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "rule r:\n  forall v0:int. v0 > -1 => P[0](v0)",
                "rule r:\n  forall v0:int. v0 > 1 => P[2](v0 + 2)",
            ]
        );
        assert!(out.trace.is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let rules: Vec<_> = (0..8)
            .map(|i| Rule {
                name: format!("r{i}"),
                ..parameterized_rule()
            })
            .collect();
        let sequential = standard(&TranslationConf::default()).run(rules.clone()).unwrap();
        let conf = TranslationConf {
            parallel: true,
            ..Default::default()
        };
        let parallel = standard(&conf).run(rules).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_trace() {
        let conf = TranslationConf {
            trace: true,
            ..Default::default()
        };
        let out = standard(&conf).run(vec![parameterized_rule()]).unwrap();
        // instantiation makes three rules of one; filtering drops one of them
        assert_eq!(out.trace.len(), 2 + 4 * 3 + 2);
        assert_eq!(out.trace[0].step, "inline operations");
        assert_eq!(out.trace[0].rule, "r");
        assert_eq!(out.trace.last().unwrap().rendered, out.rules[1].to_string());
    }

    #[test]
    fn test_errors_name_the_rule() {
        let pipeline = Pipeline::new().map("fail", |_| {
            Err(TranslationError::MissingProvider("f".to_string()))
        });
        let rule = Rule::new("broken", CompoundInvocation::unit(), vec![]);
        assert_eq!(
            pipeline.run(vec![rule]),
            Err(TranslationError::InRule {
                rule: "broken".to_string(),
                source: Box::new(TranslationError::MissingProvider("f".to_string())),
            })
        );
    }
}
