// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Driver for the EUForia model checker.
//!
//! EUForia reads a VMT model from a file and prints `true(unreach-call)` or
//! `false(unreach-call)` as the last line of its output. With `-w` it also
//! prints a witness: an SMT script of `define-fun` commands whose names
//! encode the variable and the step index as `{var}-{step}`. It only checks
//! invariant properties, over quantifier-free bit-vector models.

use std::collections::BTreeMap;
use std::process::Command;

use lazy_regex::regex_captures;
use vmt::model::Model;
use vmt::properties::PropertyType;
use vmt::syntax::Term;
use vmtlib::printer::model_to_string_with_property;
use vmtlib::sexp::{self, Sexp};

use crate::checks::{
    ensure_success, save_query, CheckResult, Logic, ModelChecker, Outcome, SolverError,
    SolverOptions, Theory,
};
use crate::path::solver_path;
use crate::traces::Trace;

/// The environment variable naming the EUForia executable.
pub const EUFORIA_PATH_VAR: &str = "VMT_EUFORIA_PATH";

/// A driver for EUForia.
#[derive(Debug, Clone, Default)]
pub struct Euforia {
    options: SolverOptions,
}

impl Euforia {
    /// Create a driver with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options passed through to the executable.
    pub fn options_mut(&mut self) -> &mut SolverOptions {
        &mut self.options
    }

    fn unknown_answer(output: &str) -> SolverError {
        SolverError::UnknownAnswer {
            solver: "euforia".to_string(),
            output: output.to_string(),
        }
    }
}

impl ModelChecker for Euforia {
    fn name(&self) -> &'static str {
        "euforia"
    }

    fn supported_logic(&self) -> Logic {
        Logic::quantifier_free([Theory::Uninterpreted, Theory::BitVec])
    }

    fn supports_property(&self, typ: PropertyType) -> bool {
        typ == PropertyType::Invar
    }

    fn check_property(&self, model: &Model, idx: usize) -> Result<CheckResult, SolverError> {
        let typ = model.get_property(idx)?.typ;
        if !self.supports_property(typ) {
            return Err(SolverError::UnsupportedProperty {
                solver: "euforia".to_string(),
                typ,
            });
        }
        if !Logic::of_model(model).within(&self.supported_logic()) {
            return Err(SolverError::UnsupportedLogic("euforia".to_string()));
        }
        let path = solver_path("euforia", EUFORIA_PATH_VAR)?;
        let contents = model_to_string_with_property(model, idx)?;
        let query = save_query("euforia", &contents)?;

        let start = std::time::Instant::now();
        let output = Command::new(&path)
            .args(self.options.to_args())
            .arg("-w")
            .arg(&query)
            .output()?;
        log::debug!(
            "euforia finished after {}ms (query {})",
            start.elapsed().as_millis(),
            query.display()
        );

        ensure_success("euforia", output.status)?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            return Err(SolverError::SolverErrors {
                solver: "euforia".to_string(),
                stderr: stderr.to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let state_vars = model
            .state_vars()
            .map(|v| v.name.clone())
            .collect::<Vec<_>>();
        parse_output(&stdout, &state_vars)
    }
}

/// Interpret EUForia's stdout. The verdict terminates the last line; when it
/// is `false(unreach-call)` everything before it is the witness script.
fn parse_output(output: &str, state_vars: &[String]) -> Result<CheckResult, SolverError> {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let last = lines.last().ok_or_else(|| Euforia::unknown_answer(output))?;
    let (_, prefix, verdict) =
        regex_captures!(r"^(.*)(true|false)\(unreach-call\)\s*$", last)
            .ok_or_else(|| Euforia::unknown_answer(output))?;
    if verdict == "true" {
        return Ok(CheckResult {
            outcome: Outcome::Safe,
            trace: None,
        });
    }

    let mut witness = lines[..lines.len() - 1].join("\n");
    witness.push('\n');
    witness.push_str(prefix);
    let trace = read_witness(&witness, state_vars)?;
    Ok(CheckResult {
        outcome: Outcome::Unsafe,
        trace: Some(trace),
    })
}

/// Parse the witness script: each step's values arrive as
/// `(define-fun {var}-{step} () {sort} {value})` commands, in no particular
/// order.
fn read_witness(witness: &str, state_vars: &[String]) -> Result<Trace, SolverError> {
    let mut steps: BTreeMap<usize, BTreeMap<String, Term>> = BTreeMap::new();
    for command in sexp::parse_many(witness)? {
        let (head, args) = match command.app() {
            Some(parts) => parts,
            None => continue,
        };
        if head != "define-fun" || args.len() != 4 {
            continue;
        }
        let name = args[0]
            .atom_s()
            .ok_or_else(|| Euforia::unknown_answer(witness))?;
        let (_, var, step) = match regex_captures!(r"^(.+)-(\d+)$", name) {
            Some(parts) => parts,
            None => continue,
        };
        let step: usize = step
            .parse()
            .map_err(|_| Euforia::unknown_answer(witness))?;
        let value = args[3]
            .constant()
            .ok_or_else(|| Euforia::unknown_answer(witness))?;
        steps.entry(step).or_default().insert(var.to_string(), value);
    }
    let mut trace = Trace::new("counterexample", state_vars.to_vec());
    for (_, assignments) in steps {
        trace.create_step(assignments, false)?;
    }
    Ok(trace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_vars() -> Vec<String> {
        vec!["x".to_string(), "b".to_string()]
    }

    #[test]
    fn test_parse_safe() {
        let result = parse_output("true(unreach-call)\n", &state_vars()).unwrap();
        assert_eq!(result.outcome, Outcome::Safe);
        assert!(!result.has_trace());
    }

    #[test]
    fn test_parse_counterexample() {
        let output = "\
            (define-fun |x-0| () (_ BitVec 4) #b0000)\n\
            (define-fun |b-0| () Bool true)\n\
            (define-fun |x-1| () (_ BitVec 4) #b0001)\n\
            (define-fun |b-1| () Bool false)\n\
            false(unreach-call)\n";
        let result = parse_output(output, &state_vars()).unwrap();
        assert_eq!(result.outcome, Outcome::Unsafe);
        let trace = result.trace.unwrap();
        assert_eq!(trace.steps_count(), 2);
        let first = trace.get_step(0).unwrap();
        assert_eq!(first.get_assignment("x"), Some(&Term::bitvec(0, 4)));
        assert_eq!(first.get_assignment("b"), Some(&Term::true_()));
        let second = trace.get_step(1).unwrap();
        assert_eq!(second.get_assignment("x"), Some(&Term::bitvec(1, 4)));
        assert_eq!(second.get_assignment("b"), Some(&Term::false_()));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_output("internal error\n", &state_vars()),
            Err(SolverError::UnknownAnswer { .. })
        ));
    }
}
