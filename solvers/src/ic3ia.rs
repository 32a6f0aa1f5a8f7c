// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Driver for the ic3ia model checker.
//!
//! ic3ia reads a VMT model on stdin, prints a witness (an inductive
//! invariant or a counterexample trace) and then the verdict, `safe` or
//! `unsafe`, as the last line of its output. The model is reserialized with
//! only the property under check, at index 0.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};

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

/// The environment variable naming the ic3ia executable.
pub const IC3IA_PATH_VAR: &str = "VMT_IC3IA_PATH";

/// A driver for ic3ia.
#[derive(Debug, Clone, Default)]
pub struct Ic3ia {
    options: SolverOptions,
}

impl Ic3ia {
    /// Create a driver with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the verbosity level passed to ic3ia (`-v`).
    pub fn set_verbosity(&mut self, level: usize) {
        self.options.set("v", level);
    }

    /// Enable stack-based proof obligation management (`-s`).
    pub fn set_stack_obligations(&mut self) {
        self.options.set_flag("s");
    }

    /// Set the random seed (`-r`).
    pub fn set_seed(&mut self, seed: usize) {
        self.options.set("r", seed);
    }

    /// Options passed through to the executable.
    pub fn options_mut(&mut self) -> &mut SolverOptions {
        &mut self.options
    }

    fn unknown_answer(output: &str) -> SolverError {
        SolverError::UnknownAnswer {
            solver: "ic3ia".to_string(),
            output: output.to_string(),
        }
    }
}

impl ModelChecker for Ic3ia {
    fn name(&self) -> &'static str {
        "ic3ia"
    }

    fn supported_logic(&self) -> Logic {
        Logic::quantifier_free([Theory::Uninterpreted, Theory::Int, Theory::Real])
    }

    fn supports_property(&self, _typ: PropertyType) -> bool {
        true
    }

    fn check_property(&self, model: &Model, idx: usize) -> Result<CheckResult, SolverError> {
        if !Logic::of_model(model).within(&self.supported_logic()) {
            return Err(SolverError::UnsupportedLogic("ic3ia".to_string()));
        }
        let path = solver_path("ic3ia", IC3IA_PATH_VAR)?;
        let contents = model_to_string_with_property(model, idx)?;
        let query = save_query("ic3ia", &contents)?;

        let mut args = self.options.to_args();
        args.push("-n".to_string());
        args.push("0".to_string());
        args.push("-w".to_string());

        let start = std::time::Instant::now();
        let mut child = Command::new(&path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(contents.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        log::debug!(
            "ic3ia finished after {}ms (query {})",
            start.elapsed().as_millis(),
            query.display()
        );

        ensure_success("ic3ia", output.status)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let state_vars = model
            .state_vars()
            .map(|v| v.name.clone())
            .collect::<Vec<_>>();
        parse_output(&stdout, &state_vars)
    }
}

/// Interpret ic3ia's full stdout: the first line names the witness type, the
/// last line carries the verdict.
fn parse_output(output: &str, state_vars: &[String]) -> Result<CheckResult, SolverError> {
    let lines: Vec<&str> = output.lines().collect();
    let first = lines
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .ok_or_else(|| Ic3ia::unknown_answer(output))?;
    let last = lines
        .iter()
        .map(|l| l.trim())
        .rfind(|l| !l.is_empty())
        .ok_or_else(|| Ic3ia::unknown_answer(output))?;

    let outcome = match last {
        "safe" => Outcome::Safe,
        "unsafe" => Outcome::Unsafe,
        _ => return Err(Ic3ia::unknown_answer(output)),
    };
    let trace = match first {
        "counterexample" => Some(read_counterexample(&lines, state_vars)?),
        "invariant" | "ERROR computing witness" | "safe" | "unsafe" => None,
        _ => return Err(Ic3ia::unknown_answer(output)),
    };
    Ok(CheckResult { outcome, trace })
}

/// Read the step conjunctions that follow `;; step N` markers. The trace
/// format does not distinguish a loopback step.
fn read_counterexample(lines: &[&str], state_vars: &[String]) -> Result<Trace, SolverError> {
    let mut trace = Trace::new("counterexample", state_vars.to_vec());
    let mut i = 0;
    while i < lines.len() {
        if regex_captures!(r"^;; step (\d+)$", lines[i].trim()).is_none() {
            i += 1;
            continue;
        }
        i += 1;
        let mut chunk = String::new();
        while i < lines.len()
            && !lines[i].trim().is_empty()
            && !lines[i].starts_with(";;")
            && !matches!(lines[i].trim(), "safe" | "unsafe")
        {
            chunk.push_str(lines[i]);
            chunk.push('\n');
            i += 1;
        }
        let step = sexp::parse(chunk.trim())?;
        trace.create_step(read_assignments(&step)?, false)?;
    }
    Ok(trace)
}

/// Decompose one step's conjunction into a variable assignment. Boolean
/// variables appear bare or under `not`, everything else as `(= var value)`.
fn read_assignments(step: &Sexp) -> Result<BTreeMap<String, Term>, SolverError> {
    let conjuncts: Vec<&Sexp> = match step.app() {
        Some(("and", args)) => args.iter().collect(),
        _ => vec![step],
    };
    let mut assignments = BTreeMap::new();
    for c in conjuncts {
        if let Some(name) = c.atom_s() {
            assignments.insert(name.to_string(), Term::true_());
        } else if let Some(("not", [var])) = c.app() {
            let name = var
                .atom_s()
                .ok_or_else(|| Ic3ia::unknown_answer(&c.to_string()))?;
            assignments.insert(name.to_string(), Term::false_());
        } else if let Some(("=", [var, value])) = c.app() {
            let name = var
                .atom_s()
                .ok_or_else(|| Ic3ia::unknown_answer(&c.to_string()))?;
            let value = value
                .constant()
                .ok_or_else(|| Ic3ia::unknown_answer(&c.to_string()))?;
            assignments.insert(name.to_string(), value);
        } else {
            return Err(Ic3ia::unknown_answer(&c.to_string()));
        }
    }
    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_vars() -> Vec<String> {
        vec!["x".to_string(), "b".to_string()]
    }

    #[test]
    fn test_parse_safe() {
        let output = "invariant\n(and (<= 0 x) b)\n\nsafe\n";
        let result = parse_output(output, &state_vars()).unwrap();
        assert_eq!(result.outcome, Outcome::Safe);
        assert!(!result.has_trace());
    }

    #[test]
    fn test_parse_counterexample() {
        let output = "counterexample\n\
            ;; step 0\n\
            (and (= x 0) b)\n\
            \n\
            ;; step 1\n\
            (and (= x 1)\n\
            \x20    (not b))\n\
            \n\
            unsafe\n";
        let result = parse_output(output, &state_vars()).unwrap();
        assert_eq!(result.outcome, Outcome::Unsafe);
        let trace = result.trace.unwrap();
        assert_eq!(trace.steps_count(), 2);
        assert!(!trace.has_loopback_step());
        let first = trace.get_step(0).unwrap();
        assert_eq!(first.get_assignment("x"), Some(&Term::int(0)));
        assert_eq!(first.get_assignment("b"), Some(&Term::true_()));
        let second = trace.get_step(1).unwrap();
        assert_eq!(second.get_assignment("x"), Some(&Term::int(1)));
        assert_eq!(second.get_assignment("b"), Some(&Term::false_()));
    }

    #[test]
    fn test_parse_failed_witness() {
        let output = "ERROR computing witness\nunsafe\n";
        let result = parse_output(output, &state_vars()).unwrap();
        assert_eq!(result.outcome, Outcome::Unsafe);
        assert!(!result.has_trace());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_output("segmentation fault\n", &state_vars()),
            Err(SolverError::UnknownAnswer { .. })
        ));
    }
}
