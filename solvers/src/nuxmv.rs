// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Driver for the nuXmv model checker.
//!
//! nuXmv runs in interactive mode (`-int`): the driver writes the model to a
//! file, feeds a small command script on stdin (`read_vmt_model`, `go_msat`,
//! the checking command, `quit`) and parses the interleaved prompt/output
//! text that comes back. Invariant properties can be checked with several
//! algorithms; LTL properties use `msat_check_ltlspec_inc_coi`. Liveness
//! properties are not supported.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};

use lazy_regex::{regex_captures, regex_is_match};
use vmt::model::Model;
use vmt::properties::PropertyType;
use vmt::syntax::Term;
use vmtlib::printer::model_to_string_with_property;

use crate::checks::{
    ensure_success, save_query, CheckResult, Logic, ModelChecker, Outcome, SolverError, Theory,
};
use crate::path::solver_path;
use crate::traces::Trace;

/// The environment variable naming the nuXmv executable.
pub const NUXMV_PATH_VAR: &str = "VMT_NUXMV_PATH";

/// The algorithm used by `msat_check_invar_bmc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BmcAlgorithm {
    /// Plain k-induction.
    Classic,
    /// Een-Sorensson incremental k-induction.
    #[default]
    EenSorensson,
    /// Only search for counterexamples.
    Falsification,
    /// Dual-rail encoding.
    Dual,
    /// Zigzag encoding.
    Zigzag,
    /// Sequence interpolation.
    InterpSeq,
    /// Standard interpolation.
    Interpolants,
}

impl BmcAlgorithm {
    fn as_str(&self) -> &'static str {
        match self {
            BmcAlgorithm::Classic => "classic",
            BmcAlgorithm::EenSorensson => "een-sorensson",
            BmcAlgorithm::Falsification => "falsification",
            BmcAlgorithm::Dual => "dual",
            BmcAlgorithm::Zigzag => "zigzag",
            BmcAlgorithm::InterpSeq => "interp_seq",
            BmcAlgorithm::Interpolants => "interpolants",
        }
    }

    fn is_interpolation(&self) -> bool {
        matches!(self, BmcAlgorithm::InterpSeq | BmcAlgorithm::Interpolants)
    }
}

/// The nuXmv command used for invariant checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckAlgorithm {
    /// `msat_check_invar_bmc` with a [`BmcAlgorithm`].
    Bmc,
    /// `msat_check_invar_bmc_cegar_implabs`.
    BmcCegarImplabs,
    /// `msat_check_invar_bmc_implabs`.
    BmcImplabs,
    /// `msat_check_invar_inc_coi`.
    #[default]
    IncCoi,
}

/// A driver for nuXmv.
#[derive(Debug, Clone, Default)]
pub struct Nuxmv {
    algorithm: CheckAlgorithm,
    bmc_algorithm: BmcAlgorithm,
    bmc_length: Option<usize>,
}

impl Nuxmv {
    /// Create a driver with the default (`inc_coi`) invariant algorithm.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the invariant-checking command.
    pub fn set_algorithm(&mut self, algorithm: CheckAlgorithm) {
        self.algorithm = algorithm;
    }

    /// Select the BMC algorithm used when the command is
    /// [`CheckAlgorithm::Bmc`].
    pub fn set_bmc_algorithm(&mut self, algorithm: BmcAlgorithm) {
        self.bmc_algorithm = algorithm;
    }

    /// Bound the BMC unrolling depth (`-k`).
    pub fn set_bmc_length(&mut self, length: usize) {
        self.bmc_length = Some(length);
    }

    fn invar_command(&self) -> String {
        match self.algorithm {
            CheckAlgorithm::Bmc => {
                let mut cmd = String::from("msat_check_invar_bmc");
                if let Some(k) = self.bmc_length {
                    cmd.push_str(&format!(" -k {k}"));
                }
                cmd.push_str(&format!(" -a {}", self.bmc_algorithm.as_str()));
                cmd
            }
            CheckAlgorithm::BmcCegarImplabs => {
                "msat_check_invar_bmc_cegar_implabs".to_string()
            }
            CheckAlgorithm::BmcImplabs => "msat_check_invar_bmc_implabs -n 0".to_string(),
            CheckAlgorithm::IncCoi => "msat_check_invar_inc_coi".to_string(),
        }
    }

    fn unknown_answer(output: &str) -> SolverError {
        SolverError::UnknownAnswer {
            solver: "nuxmv".to_string(),
            output: output.to_string(),
        }
    }
}

impl ModelChecker for Nuxmv {
    fn name(&self) -> &'static str {
        "nuxmv"
    }

    fn supported_logic(&self) -> Logic {
        Logic::quantifier_free([
            Theory::Uninterpreted,
            Theory::Int,
            Theory::Real,
            Theory::BitVec,
        ])
    }

    fn supports_property(&self, typ: PropertyType) -> bool {
        matches!(typ, PropertyType::Invar | PropertyType::Ltl)
    }

    fn check_property(&self, model: &Model, idx: usize) -> Result<CheckResult, SolverError> {
        let typ = model.get_property(idx)?.typ;
        let command = match typ {
            PropertyType::Invar => self.invar_command(),
            PropertyType::Ltl => "msat_check_ltlspec_inc_coi".to_string(),
            PropertyType::Live => {
                return Err(SolverError::UnsupportedProperty {
                    solver: "nuxmv".to_string(),
                    typ,
                })
            }
        };
        let logic = Logic::of_model(model);
        if !logic.within(&self.supported_logic()) {
            return Err(SolverError::UnsupportedLogic("nuxmv".to_string()));
        }
        // the interpolation algorithms cannot mix integer and real arithmetic
        if self.algorithm == CheckAlgorithm::Bmc
            && self.bmc_algorithm.is_interpolation()
            && logic.theories.contains(&Theory::Int)
            && logic.theories.contains(&Theory::Real)
        {
            return Err(SolverError::UnsupportedLogic("nuxmv".to_string()));
        }

        let path = solver_path("nuxmv", NUXMV_PATH_VAR)?;
        let contents = model_to_string_with_property(model, idx)?;
        let query = save_query("nuxmv", &contents)?;
        let script = format!("read_vmt_model\ngo_msat\n{command}\nquit\n");

        let start = std::time::Instant::now();
        let mut child = Command::new(&path)
            .arg("-int")
            .arg(&query)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        log::debug!(
            "nuxmv finished after {}ms (query {})",
            start.elapsed().as_millis(),
            query.display()
        );

        ensure_success("nuxmv", output.status)?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let leftover: Vec<&str> = stderr
            .lines()
            .filter(|l| !l.trim().is_empty() && !is_no_counterexample(l))
            .collect();
        if !leftover.is_empty() {
            return Err(SolverError::SolverErrors {
                solver: "nuxmv".to_string(),
                stderr: leftover.join("\n"),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let state_vars = model
            .state_vars()
            .map(|v| v.name.clone())
            .collect::<Vec<_>>();
        let lines = clean_info_and_prompts(&stdout)?;
        parse_output(&lines, &state_vars)
    }
}

/// Lines nuXmv prints when the bound is exhausted without a verdict. They
/// carry no information and can appear on stdout or stderr.
fn is_no_counterexample(line: &str) -> bool {
    let line = line.trim();
    regex_is_match!(
        r"^-- no counterexample or proof found for invariant .+ up to \d+$",
        line
    ) || regex_is_match!(r"^-- no proof or counter-?example found with bound \d+$", line)
        || regex_is_match!(r"^-- no counterexample found with bound \d+$", line)
}

/// Strip the startup banner and the interactive prompts from nuXmv's stdout.
fn clean_info_and_prompts(output: &str) -> Result<Vec<String>, SolverError> {
    let mut lines = output
        .lines()
        .skip_while(|l| l.trim().is_empty() || l.starts_with("***"));
    let mut cleaned = vec![];
    if let Some(first) = lines.next() {
        // the echoed commands leave a run of prompts on the first line
        let (_, rest) = regex_captures!(r"^(?:nuXmv > )+(.*)$", first)
            .ok_or_else(|| Nuxmv::unknown_answer(output))?;
        cleaned.push(rest.to_string());
        cleaned.extend(lines.map(|l| l.to_string()));
    }
    while cleaned
        .last()
        .is_some_and(|l| l.trim().is_empty() || regex_is_match!(r"^(?:nuXmv > )+\s*$", l))
    {
        cleaned.pop();
    }
    Ok(cleaned)
}

/// Interpret the cleaned output: a verdict line, optionally followed by an
/// execution sequence.
fn parse_output(lines: &[String], state_vars: &[String]) -> Result<CheckResult, SolverError> {
    let mut outcome = Outcome::Unknown;
    let mut trace = None;
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        if let Some((_, verdict)) = regex_captures!(
            r"^-- (?:invariant|(?:LTL )?specification) .+ is (true|false)",
            line
        ) {
            outcome = if verdict == "true" {
                Outcome::Safe
            } else {
                Outcome::Unsafe
            };
        } else if regex_is_match!(r"^-- cannot prove the invariant .+ the induction fails$", line)
            || regex_is_match!(r"^-- cannot prove the invariant .+ the induction failed$", line)
        {
            // k-induction gave up; the trace that follows is the failed
            // induction step, not a counterexample
            outcome = Outcome::Unknown;
        } else if line == "-- as demonstrated by the following execution sequence" {
            trace = Some(read_trace(&lines[i + 1..], state_vars)?);
            break;
        }
        i += 1;
    }
    Ok(CheckResult { outcome, trace })
}

/// Read an execution sequence. Each `-> State: N.M <-` or `-> Input: N.M <-`
/// header opens a block of `var = value` lines; values not reassigned carry
/// over from the previous block. A `-- Loop starts here` marker flags the
/// following block as the loopback.
fn read_trace(lines: &[String], state_vars: &[String]) -> Result<Trace, SolverError> {
    let mut curr: BTreeMap<String, Term> = BTreeMap::new();
    let mut in_block = false;
    let mut block_loopback = false;
    let mut next_loopback = false;
    let mut trace = Trace::new("", state_vars.to_vec());

    for line in lines {
        let line = line.trim();
        if let Some((_, d)) = regex_captures!(r"^Trace Description: (.+)$", line) {
            trace.set_description(d);
            continue;
        }
        if let Some((_, t)) = regex_captures!(r"^Trace Type: (.+)$", line) {
            trace.set_trace_type(t);
            continue;
        }
        if line == "-- Loop starts here" {
            next_loopback = true;
            continue;
        }
        if regex_is_match!(r"^-> (?:State|Input): \d+\.\d+ <-$", line) {
            if in_block {
                trace.create_step(curr.clone(), block_loopback)?;
            }
            in_block = true;
            block_loopback = std::mem::take(&mut next_loopback);
            continue;
        }
        if regex_is_match!(r"^-- Trace (?:was successfully|could not be) completed\.$", line) {
            break;
        }
        if let Some((_, var, value)) = regex_captures!(r"^(\S+) = (.+)$", line) {
            curr.insert(var.to_string(), parse_value(value));
            continue;
        }
        if line.is_empty() {
            continue;
        }
        break;
    }
    if in_block {
        trace.create_step(curr, block_loopback)?;
    }
    Ok(trace)
}

/// Parse a value from a trace assignment line. Unrecognized values are kept
/// as symbolic constants.
fn parse_value(value: &str) -> Term {
    match value {
        "TRUE" => return Term::true_(),
        "FALSE" => return Term::false_(),
        _ => (),
    }
    if let Ok(i) = value.parse::<i64>() {
        return Term::int(i);
    }
    if let Some((_, sign, int_part, frac_part)) =
        regex_captures!(r"^(-?)(\d+)\.(\d+)$", value)
    {
        if let Some(t) = decimal(sign == "-", int_part, frac_part) {
            return t;
        }
    }
    if let Some((_, num, den)) = regex_captures!(r"^[fF]'(-?\d+)/(\d+)$", value) {
        if let (Ok(num), Ok(den)) = (num.parse::<i64>(), den.parse::<i64>()) {
            if den != 0 {
                return Term::real(num, den);
            }
        }
    }
    Term::id(value)
}

fn decimal(negative: bool, int_part: &str, frac_part: &str) -> Option<Term> {
    let den = 10u64.checked_pow(frac_part.len() as u32)?;
    let int: i64 = int_part.parse().ok()?;
    let frac: i64 = frac_part.parse().ok()?;
    let num = int.checked_mul(den as i64)?.checked_add(frac)?;
    Some(Term::real(if negative { -num } else { num }, den as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_vars() -> Vec<String> {
        vec!["x".to_string(), "b".to_string()]
    }

    fn clean(output: &str) -> Vec<String> {
        clean_info_and_prompts(output).unwrap()
    }

    #[test]
    fn test_clean_info_and_prompts() {
        let output = "*** This is nuXmv 2.0.0\n\
            *** For more information see <https://nuxmv.fbk.eu>\n\
            \n\
            nuXmv > nuXmv > nuXmv > -- invariant (0 <= x) is true\n\
            nuXmv > nuXmv > \n";
        assert_eq!(clean(output), vec!["-- invariant (0 <= x) is true"]);
        assert!(matches!(
            clean_info_and_prompts("some unexpected banner\n"),
            Err(SolverError::UnknownAnswer { .. })
        ));
    }

    #[test]
    fn test_parse_safe() {
        let lines = clean("nuXmv > -- invariant (0 <= x) is true\n");
        let result = parse_output(&lines, &state_vars()).unwrap();
        assert_eq!(result.outcome, Outcome::Safe);
        assert!(!result.has_trace());
    }

    #[test]
    fn test_parse_no_answer() {
        let lines = clean(
            "nuXmv > -- no counterexample found with bound 10\nnuXmv > \n",
        );
        let result = parse_output(&lines, &state_vars()).unwrap();
        assert_eq!(result.outcome, Outcome::Unknown);
    }

    #[test]
    fn test_parse_counterexample() {
        let output = "\
            nuXmv > -- invariant (x < 2) is false, a counterexample of size 3 exists\n\
            -- as demonstrated by the following execution sequence\n\
            Trace Description: MSAT BMC counterexample\n\
            Trace Type: Counterexample\n\
            \x20 -> State: 1.1 <-\n\
            \x20   x = 0\n\
            \x20   b = TRUE\n\
            \x20 -> State: 1.2 <-\n\
            \x20   x = 1\n\
            \x20 -> State: 1.3 <-\n\
            \x20   x = 2\n\
            \x20   b = FALSE\n\
            nuXmv > \n";
        let lines = clean(output);
        let result = parse_output(&lines, &state_vars()).unwrap();
        assert_eq!(result.outcome, Outcome::Unsafe);
        let trace = result.trace.unwrap();
        assert_eq!(trace.trace_type(), "Counterexample");
        assert_eq!(trace.description(), "MSAT BMC counterexample");
        assert_eq!(trace.steps_count(), 3);
        // b is not reassigned in the second block and carries over
        let second = trace.get_step(1).unwrap();
        assert_eq!(second.get_assignment("x"), Some(&Term::int(1)));
        assert_eq!(second.get_assignment("b"), Some(&Term::true_()));
        let third = trace.get_step(2).unwrap();
        assert_eq!(third.get_assignment("b"), Some(&Term::false_()));
    }

    #[test]
    fn test_parse_lasso() {
        let output = "\
            nuXmv > -- LTL specification G (0 <= x) is false\n\
            -- as demonstrated by the following execution sequence\n\
            Trace Description: MSAT LTL counterexample\n\
            Trace Type: Counterexample\n\
            \x20 -> State: 1.1 <-\n\
            \x20   x = 0\n\
            \x20 -- Loop starts here\n\
            \x20 -> State: 1.2 <-\n\
            \x20   x = -1\n\
            nuXmv > \n";
        let lines = clean(output);
        let result = parse_output(&lines, &state_vars()).unwrap();
        assert_eq!(result.outcome, Outcome::Unsafe);
        let trace = result.trace.unwrap();
        assert_eq!(trace.trace_type(), "Counterexample");
        assert_eq!(trace.steps_count(), 2);
        assert_eq!(trace.get_loopback_step_idx(), Ok(1));
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_value("TRUE"), Term::true_());
        assert_eq!(parse_value("-3"), Term::int(-3));
        assert_eq!(parse_value("0.25"), Term::real(1, 4));
        assert_eq!(parse_value("-1.5"), Term::real(-3, 2));
        assert_eq!(parse_value("f'1/3"), Term::real(1, 3));
        assert_eq!(parse_value("red"), Term::id("red"));
    }

    #[test]
    fn test_invar_commands() {
        let mut solver = Nuxmv::new();
        assert_eq!(solver.invar_command(), "msat_check_invar_inc_coi");
        solver.set_algorithm(CheckAlgorithm::Bmc);
        solver.set_bmc_algorithm(BmcAlgorithm::Zigzag);
        solver.set_bmc_length(10);
        assert_eq!(solver.invar_command(), "msat_check_invar_bmc -k 10 -a zigzag");
        solver.set_algorithm(CheckAlgorithm::BmcImplabs);
        assert_eq!(solver.invar_command(), "msat_check_invar_bmc_implabs -n 0");
    }
}
