// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Execution traces produced by model checkers.
//!
//! A [`Trace`] is a finite sequence of steps, each assigning constants to a
//! subset of the model's variables. A trace may mark one step as the
//! loopback: the successor of the last step, turning the suffix into a lasso
//! that describes an infinite execution.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;
use vmt::syntax::Term;
use vmt::term::eval::{self, EvalError};
use vmtlib::printer::term_to_sexp;

/// An error constructing or walking a [`Trace`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TraceError {
    /// A second step was marked as the loopback.
    #[error("the trace already has a loopback step")]
    DuplicateLoopbackStep,
    /// The trace has no loopback step.
    #[error("the trace has no loopback step")]
    MissingLoopbackStep,
    /// A step index out of the trace's range.
    #[error("the trace has no step {0}")]
    StepNotFound(usize),
    /// Evaluation over the step's assignment failed.
    #[error("{0}")]
    Eval(#[from] EvalError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    assignments: BTreeMap<String, Term>,
    is_loopback: bool,
}

/// A (possibly lasso-shaped) execution of a transition system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    trace_type: String,
    description: String,
    state_vars: Vec<String>,
    steps: Vec<Step>,
    loopback: Option<usize>,
}

impl Trace {
    /// Create an empty trace of the given kind over the given state
    /// variables.
    pub fn new(trace_type: &str, state_vars: Vec<String>) -> Self {
        Self {
            trace_type: trace_type.to_string(),
            description: String::new(),
            state_vars,
            steps: vec![],
            loopback: None,
        }
    }

    /// The kind of trace, e.g. "counterexample".
    pub fn trace_type(&self) -> &str {
        &self.trace_type
    }

    /// Replace the trace's kind.
    pub fn set_trace_type(&mut self, trace_type: &str) {
        self.trace_type = trace_type.to_string();
    }

    /// A human-readable description of where the trace came from.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Replace the trace's description.
    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    /// The state variables the trace ranges over.
    pub fn state_vars(&self) -> &[String] {
        &self.state_vars
    }

    /// Append a step. Returns its index.
    pub fn create_step(
        &mut self,
        assignments: BTreeMap<String, Term>,
        is_loopback: bool,
    ) -> Result<usize, TraceError> {
        if is_loopback && self.loopback.is_some() {
            return Err(TraceError::DuplicateLoopbackStep);
        }
        let idx = self.steps.len();
        if is_loopback {
            self.loopback = Some(idx);
        }
        self.steps.push(Step {
            assignments,
            is_loopback,
        });
        Ok(idx)
    }

    /// The number of steps in the trace.
    pub fn steps_count(&self) -> usize {
        self.steps.len()
    }

    /// Views of all steps, in order.
    pub fn get_steps(&self) -> Vec<StepView<'_>> {
        (0..self.steps.len())
            .map(|idx| StepView { trace: self, idx })
            .collect()
    }

    /// The step at the given index.
    pub fn get_step(&self, idx: usize) -> Result<StepView<'_>, TraceError> {
        if idx < self.steps.len() {
            Ok(StepView { trace: self, idx })
        } else {
            Err(TraceError::StepNotFound(idx))
        }
    }

    /// Whether some step is marked as the loopback.
    pub fn has_loopback_step(&self) -> bool {
        self.loopback.is_some()
    }

    /// The index of the loopback step.
    pub fn get_loopback_step_idx(&self) -> Result<usize, TraceError> {
        self.loopback.ok_or(TraceError::MissingLoopbackStep)
    }

    /// The loopback step.
    pub fn get_loopback_step(&self) -> Result<StepView<'_>, TraceError> {
        self.get_step(self.get_loopback_step_idx()?)
    }

    /// Serialize the trace as a sequence of step formulas, one
    /// `define-fun` per step.
    pub fn serialize(&self) -> String {
        let empty = HashMap::new();
        self.get_steps()
            .iter()
            .map(|step| {
                let name = if step.is_loopback() {
                    format!("loopback-step-{}", step.idx())
                } else {
                    format!("step-{}", step.idx())
                };
                let body = term_to_sexp(&step.get_formula(), &empty);
                format!("(define-fun {name} () Bool {body})")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A borrowed view of one step of a [`Trace`].
#[derive(Debug, Clone, Copy)]
pub struct StepView<'a> {
    trace: &'a Trace,
    idx: usize,
}

impl<'a> StepView<'a> {
    /// The step's index within its trace.
    pub fn idx(&self) -> usize {
        self.idx
    }

    /// Whether this step is the trace's loopback.
    pub fn is_loopback(&self) -> bool {
        self.trace.steps[self.idx].is_loopback
    }

    /// The step's variable assignment.
    pub fn assignments(&self) -> &'a BTreeMap<String, Term> {
        &self.trace.steps[self.idx].assignments
    }

    /// The value assigned to a variable, if any.
    pub fn get_assignment(&self, name: &str) -> Option<&'a Term> {
        self.assignments().get(name)
    }

    /// Whether the step has a successor, either the next step or the
    /// loopback when this is the last step.
    pub fn has_next_step(&self) -> bool {
        self.idx + 1 < self.trace.steps.len() || self.trace.has_loopback_step()
    }

    /// The step's successor. The successor of the last step is the
    /// loopback step.
    pub fn get_next_step(&self) -> Result<StepView<'a>, TraceError> {
        if self.idx + 1 < self.trace.steps.len() {
            Ok(StepView {
                trace: self.trace,
                idx: self.idx + 1,
            })
        } else if self.trace.has_loopback_step() {
            self.trace.get_loopback_step()
        } else {
            Err(TraceError::StepNotFound(self.idx + 1))
        }
    }

    /// The step's predecessor.
    pub fn get_prev_step(&self) -> Result<StepView<'a>, TraceError> {
        if self.idx > 0 {
            Ok(StepView {
                trace: self.trace,
                idx: self.idx - 1,
            })
        } else {
            Err(TraceError::StepNotFound(0))
        }
    }

    /// Variables assigned different values in this step and `other`.
    /// A variable assigned in only one of the two also counts.
    pub fn get_different_variables(&self, other: &StepView<'_>) -> BTreeSet<String> {
        let a = self.assignments();
        let b = other.assignments();
        a.keys()
            .chain(b.keys())
            .filter(|name| a.get(*name) != b.get(*name))
            .cloned()
            .collect()
    }

    /// Variables whose value changes between this step and its successor.
    pub fn get_changing_variables(&self) -> Result<BTreeSet<String>, TraceError> {
        Ok(self.get_different_variables(&self.get_next_step()?))
    }

    /// Variables whose value changed since the predecessor step.
    pub fn get_changed_variables(&self) -> Result<BTreeSet<String>, TraceError> {
        Ok(self.get_different_variables(&self.get_prev_step()?))
    }

    /// Evaluate a term over the step's assignment. Primed variables are
    /// looked up in the successor step.
    pub fn evaluate(&self, t: &Term) -> Result<Term, TraceError> {
        let next = self.get_next_step().ok();
        let lookup = |name: &str, primes: usize| -> Option<Term> {
            match primes {
                0 => self.get_assignment(name).cloned(),
                1 => next.as_ref().and_then(|s| s.get_assignment(name).cloned()),
                _ => None,
            }
        };
        Ok(eval::evaluate(t, &lookup)?)
    }

    /// The step's assignment as a single conjunction. Boolean variables
    /// appear bare or negated, others as equalities.
    pub fn get_formula(&self) -> Term {
        let conjuncts = self
            .assignments()
            .iter()
            .map(|(name, value)| match value {
                Term::Literal(true) => Term::id(name),
                Term::Literal(false) => Term::not(Term::id(name)),
                _ => Term::equals(Term::id(name), value.clone()),
            })
            .collect::<Vec<_>>();
        Term::and(conjuncts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmt::syntax::Term;

    fn counter_trace() -> Trace {
        let mut trace = Trace::new("counterexample", vec!["x".to_string(), "y".to_string()]);
        trace
            .create_step(
                BTreeMap::from([
                    ("x".to_string(), Term::int(0)),
                    ("y".to_string(), Term::true_()),
                ]),
                false,
            )
            .unwrap();
        trace
            .create_step(
                BTreeMap::from([
                    ("x".to_string(), Term::int(1)),
                    ("y".to_string(), Term::false_()),
                ]),
                true,
            )
            .unwrap();
        trace
            .create_step(
                BTreeMap::from([
                    ("x".to_string(), Term::int(2)),
                    ("y".to_string(), Term::false_()),
                ]),
                false,
            )
            .unwrap();
        trace
    }

    #[test]
    fn test_type_and_description() {
        let mut trace = counter_trace();
        assert_eq!(trace.trace_type(), "counterexample");
        assert_eq!(trace.description(), "");
        trace.set_trace_type("Counterexample");
        trace.set_description("BMC counterexample");
        assert_eq!(trace.trace_type(), "Counterexample");
        assert_eq!(trace.description(), "BMC counterexample");
    }

    #[test]
    fn test_loopback_bookkeeping() {
        let trace = counter_trace();
        assert_eq!(trace.steps_count(), 3);
        assert!(trace.has_loopback_step());
        assert_eq!(trace.get_loopback_step_idx(), Ok(1));
        assert!(trace.get_loopback_step().unwrap().is_loopback());

        let mut empty = Trace::new("empty", vec![]);
        assert!(!empty.has_loopback_step());
        assert_eq!(
            empty.get_loopback_step_idx(),
            Err(TraceError::MissingLoopbackStep)
        );
        empty.create_step(BTreeMap::new(), true).unwrap();
        assert_eq!(
            empty.create_step(BTreeMap::new(), true),
            Err(TraceError::DuplicateLoopbackStep)
        );
    }

    #[test]
    fn test_step_navigation() {
        let trace = counter_trace();
        let first = trace.get_step(0).unwrap();
        assert!(first.has_next_step());
        assert_eq!(first.get_next_step().unwrap().idx(), 1);
        let last = trace.get_step(2).unwrap();
        // the last step wraps around to the loopback
        assert!(last.has_next_step());
        assert_eq!(last.get_next_step().unwrap().idx(), 1);
        assert_eq!(last.get_prev_step().unwrap().idx(), 1);
        assert_eq!(first.get_prev_step().unwrap_err(), TraceError::StepNotFound(0));
        assert_eq!(trace.get_step(3).unwrap_err(), TraceError::StepNotFound(3));

        let mut lassoless = Trace::new("t", vec!["x".to_string()]);
        lassoless.create_step(BTreeMap::new(), false).unwrap();
        let only = lassoless.get_step(0).unwrap();
        assert!(!only.has_next_step());
        assert_eq!(only.get_next_step().unwrap_err(), TraceError::StepNotFound(1));
    }

    #[test]
    fn test_changed_variables() {
        let trace = counter_trace();
        let first = trace.get_step(0).unwrap();
        let second = trace.get_step(1).unwrap();
        let changing: BTreeSet<String> =
            ["x".to_string(), "y".to_string()].into_iter().collect();
        assert_eq!(first.get_changing_variables().unwrap(), changing);
        assert_eq!(second.get_changed_variables().unwrap(), changing);
        // step 2 wraps to the loopback; only x differs there
        let third = trace.get_step(2).unwrap();
        assert_eq!(
            third.get_changing_variables().unwrap(),
            ["x".to_string()].into_iter().collect()
        );
        assert_eq!(
            first.get_changed_variables().unwrap_err(),
            TraceError::StepNotFound(0)
        );
    }

    #[test]
    fn test_evaluate() {
        let trace = counter_trace();
        let first = trace.get_step(0).unwrap();
        // x' refers to the successor step
        let t = Term::equals(
            Term::num_op(
                vmt::syntax::NumOp::Add,
                Term::id("x"),
                Term::prime(Term::id("x")),
            ),
            Term::int(1),
        );
        assert_eq!(first.evaluate(&t), Ok(Term::true_()));
        assert_eq!(first.evaluate(&Term::id("y")), Ok(Term::true_()));
        assert!(matches!(
            first.evaluate(&Term::prime(Term::id("z"))),
            Err(TraceError::Eval(EvalError::UnknownSymbol { .. }))
        ));
    }

    #[test]
    fn test_serialize() {
        let mut trace = Trace::new("test", vec!["x".to_string(), "y".to_string()]);
        trace
            .create_step(
                BTreeMap::from([
                    ("x".to_string(), Term::int(0)),
                    ("y".to_string(), Term::true_()),
                ]),
                false,
            )
            .unwrap();
        trace
            .create_step(
                BTreeMap::from([
                    ("x".to_string(), Term::int(1)),
                    ("y".to_string(), Term::false_()),
                ]),
                true,
            )
            .unwrap();
        insta::assert_snapshot!(trace.serialize(), @r###"
        (define-fun step-0 () Bool (and (= x 0) y))
        (define-fun loopback-step-1 () Bool (and (= x 1) (not y)))
        "###);
    }
}
