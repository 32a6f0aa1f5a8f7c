// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The interface shared by all model-checker backends.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Mutex;

use lazy_static::lazy_static;
use peg::error::ParseError;
use peg::str::LineCol;
use thiserror::Error;
use vmt::ltl;
use vmt::model::{Model, ModelError};
use vmt::properties::PropertyType;
use vmt::syntax::{Sort, Term};

use crate::path::PathError;
use crate::traces::{Trace, TraceError};

/// An error running a model checker or interpreting its output.
#[derive(Error, Debug)]
pub enum SolverError {
    /// The checker's executable could not be located.
    #[error("{0}")]
    Path(#[from] PathError),
    /// Writing the query or talking to the child process failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The checker exited abnormally.
    #[error("{solver} exited with {status}")]
    Failed {
        /// Name of the checker.
        solver: String,
        /// The exit status of the process.
        status: ExitStatus,
    },
    /// The checker reported errors on stderr.
    #[error("{solver} reported errors:\n{stderr}")]
    SolverErrors {
        /// Name of the checker.
        solver: String,
        /// What the checker printed to stderr.
        stderr: String,
    },
    /// The checker's output did not match any known answer.
    #[error("unrecognized answer from {solver}: {output:?}")]
    UnknownAnswer {
        /// Name of the checker.
        solver: String,
        /// The offending output.
        output: String,
    },
    /// A witness emitted by the checker did not parse.
    #[error("could not parse witness: {0}")]
    Witness(#[from] ParseError<LineCol>),
    /// The checker cannot verify properties of this type.
    #[error("{solver} does not support {typ:?} properties")]
    UnsupportedProperty {
        /// Name of the checker.
        solver: String,
        /// The property type the checker was asked about.
        typ: PropertyType,
    },
    /// The model lies outside the checker's supported logic.
    #[error("the model's logic is not supported by {0}")]
    UnsupportedLogic(String),
    /// The model itself was malformed (e.g. the property index is unknown).
    #[error("{0}")]
    Model(#[from] ModelError),
    /// Assembling the counterexample trace failed.
    #[error("{0}")]
    Trace(#[from] TraceError),
}

/// A background theory used by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Theory {
    /// Uninterpreted sorts.
    Uninterpreted,
    /// Integer arithmetic.
    Int,
    /// Real arithmetic.
    Real,
    /// Fixed-width bit-vectors.
    BitVec,
}

/// The fragment of VMT a model lives in, used to decide whether a backend
/// can check it at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logic {
    /// Whether the model is free of quantifiers.
    pub quantifier_free: bool,
    /// The theories the model draws on.
    pub theories: BTreeSet<Theory>,
}

impl Logic {
    /// A quantifier-free logic over the given theories.
    pub fn quantifier_free(theories: impl IntoIterator<Item = Theory>) -> Self {
        Self {
            quantifier_free: true,
            theories: theories.into_iter().collect(),
        }
    }

    /// The smallest logic containing the given model.
    pub fn of_model(model: &Model) -> Self {
        let mut theories = BTreeSet::new();
        for v in model.vars() {
            match &v.sort {
                Sort::Bool => (),
                Sort::Int => {
                    theories.insert(Theory::Int);
                }
                Sort::Real => {
                    theories.insert(Theory::Real);
                }
                Sort::BitVec(_) => {
                    theories.insert(Theory::BitVec);
                }
                Sort::Uninterpreted(_) => {
                    theories.insert(Theory::Uninterpreted);
                }
            }
        }
        let terms = model
            .init_constraints()
            .iter()
            .chain(model.trans_constraints())
            .chain(model.properties().map(|(_, p)| &p.term));
        let quantifier_free = !terms.into_iter().any(Term::has_quantifier);
        Self {
            quantifier_free,
            theories,
        }
    }

    /// Whether every model in `self` also lies in `other`.
    pub fn within(&self, other: &Self) -> bool {
        (self.quantifier_free || !other.quantifier_free)
            && self.theories.is_subset(&other.theories)
    }
}

/// The verdict of a model checker on one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The property holds in all reachable states.
    Safe,
    /// The property is violated; a counterexample may be attached.
    Unsafe,
    /// The checker gave up without an answer.
    Unknown,
}

/// A verdict together with the counterexample trace, if the checker
/// produced one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// The checker's verdict.
    pub outcome: Outcome,
    /// The counterexample (or induction step sequence) the checker printed.
    pub trace: Option<Trace>,
}

impl CheckResult {
    /// The verdict as a three-valued boolean.
    pub fn is_safe(&self) -> Option<bool> {
        match self.outcome {
            Outcome::Safe => Some(true),
            Outcome::Unsafe => Some(false),
            Outcome::Unknown => None,
        }
    }

    /// Whether the checker attached a trace to the verdict.
    pub fn has_trace(&self) -> bool {
        self.trace.is_some()
    }
}

/// Command-line options passed through to a checker's executable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverOptions {
    options: BTreeMap<String, String>,
    flags: BTreeSet<String>,
}

impl SolverOptions {
    /// Set an option that takes a value, replacing any previous value.
    pub fn set(&mut self, option: &str, value: impl ToString) {
        self.options.insert(option.to_string(), value.to_string());
    }

    /// Set a valueless flag.
    pub fn set_flag(&mut self, flag: &str) {
        self.flags.insert(flag.to_string());
    }

    /// Render the options as an argument list: `-opt value` for options,
    /// `-flag` for flags.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![];
        for (option, value) in &self.options {
            args.push(format!("-{option}"));
            args.push(value.clone());
        }
        for flag in &self.flags {
            args.push(format!("-{flag}"));
        }
        args
    }
}

/// A driver for an external model checker.
pub trait ModelChecker {
    /// The backend's name, as used in error messages.
    fn name(&self) -> &'static str;

    /// The logic of models the backend accepts.
    fn supported_logic(&self) -> Logic;

    /// Whether the backend can check properties of the given type.
    fn supports_property(&self, typ: PropertyType) -> bool;

    /// Check the property with the given index.
    fn check_property(&self, model: &Model, idx: usize) -> Result<CheckResult, SolverError>;

    /// Check a property of any kind. Natively supported types go straight
    /// to [`Self::check_property`]; an LTL property on a backend without
    /// native LTL support is rewritten into a tableau monitor with a single
    /// live property first.
    fn check_ltl_property(&self, model: &Model, idx: usize) -> Result<CheckResult, SolverError> {
        let prop = model.get_property(idx)?;
        if self.supports_property(prop.typ) {
            return self.check_property(model, idx);
        }
        if prop.typ == PropertyType::Ltl && self.supports_property(PropertyType::Live) {
            let encoded = ltl::encode(model, &prop.term)?;
            return self.check_property(&encoded, 0);
        }
        Err(SolverError::UnsupportedProperty {
            solver: self.name().to_string(),
            typ: prop.typ,
        })
    }

    /// Check every property of the model that the backend can handle,
    /// directly or through the LTL encoding.
    fn check_properties(
        &self,
        model: &Model,
    ) -> Result<BTreeMap<usize, CheckResult>, SolverError> {
        let mut results = BTreeMap::new();
        for (idx, p) in model.properties() {
            if self.supports_property(p.typ) {
                results.insert(idx, self.check_property(model, idx)?);
            } else if p.typ == PropertyType::Ltl && self.supports_property(PropertyType::Live) {
                results.insert(idx, self.check_ltl_property(model, idx)?);
            }
        }
        Ok(results)
    }

    /// Check every property of one kind that the backend can handle,
    /// directly or through the LTL encoding.
    fn check_properties_of_type(
        &self,
        model: &Model,
        typ: PropertyType,
    ) -> Result<BTreeMap<usize, CheckResult>, SolverError> {
        let mut results = BTreeMap::new();
        for (idx, _) in model.properties_of_type(typ) {
            if self.supports_property(typ) {
                results.insert(idx, self.check_property(model, idx)?);
            } else if typ == PropertyType::Ltl && self.supports_property(PropertyType::Live) {
                results.insert(idx, self.check_ltl_property(model, idx)?);
            }
        }
        Ok(results)
    }
}

lazy_static! {
    static ref QUERY_COUNT: Mutex<usize> = Mutex::new(0);
}

static QUERY_DIR: &str = ".vmt-queries";

fn new_query_id() -> usize {
    let mut count = QUERY_COUNT.lock().unwrap();
    let id = *count;
    *count += 1;
    id
}

/// Reject a checker process that exited abnormally.
pub(crate) fn ensure_success(solver: &str, status: ExitStatus) -> Result<(), SolverError> {
    if status.success() {
        Ok(())
    } else {
        Err(SolverError::Failed {
            solver: solver.to_string(),
            status,
        })
    }
}

/// Write a query to a fresh file under the query directory and return its
/// path. Files are kept around for debugging.
pub(crate) fn save_query(solver: &str, contents: &str) -> Result<PathBuf, SolverError> {
    create_dir_all(QUERY_DIR)?;
    let id = new_query_id();
    let fname = PathBuf::from(QUERY_DIR).join(format!("query-{solver}-{id}.vmt"));
    let mut file = File::create(&fname)?;
    write!(&mut file, "{contents}")?;
    log::debug!("wrote {} query to {}", solver, fname.display());
    Ok(fname)
}
