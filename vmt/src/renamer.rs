// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Rebuild a model with systematically renamed variables.

use thiserror::Error;

use crate::model::{Model, ModelError, VarKind};
use crate::syntax::Term;
use crate::term::subst::{substitute, Substitution};

/// An error from a renaming operation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RenamerError {
    /// A variable name that does not carry the prefix being replaced
    #[error("symbol {name} does not start with {prefix}")]
    MissingPrefix {
        /// The offending variable name
        name: String,
        /// The prefix that was expected
        prefix: String,
    },
    /// A variable name that does not carry the suffix being replaced
    #[error("symbol {name} does not end with {suffix}")]
    MissingSuffix {
        /// The offending variable name
        name: String,
        /// The suffix that was expected
        suffix: String,
    },
    /// Renaming produced an invalid model, e.g. two variables mapped to the
    /// same name
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Rebuild `model` with every variable renamed through `callback`. All
/// constraints and properties are carried over, with property indices
/// preserved.
pub fn rename<F>(model: &Model, callback: F) -> Result<Model, RenamerError>
where
    F: Fn(&str) -> String,
{
    let mut out = Model::new();
    for s in model.sorts() {
        out.add_sort(s)?;
    }
    let mut sub = Substitution::new();
    for v in model.vars() {
        let new_name = callback(&v.name);
        sub.insert(v.name.clone(), Term::id(&new_name));
        match v.kind {
            VarKind::State => out.create_state_var(&new_name, v.sort.clone())?,
            VarKind::Input => out.create_input_var(&new_name, v.sort.clone())?,
        };
    }
    for t in model.init_constraints() {
        out.add_init(substitute(t, &sub))?;
    }
    for t in model.trans_constraints() {
        out.add_trans(substitute(t, &sub))?;
    }
    for (idx, p) in model.properties() {
        out.add_property(p.typ, substitute(&p.term, &sub), Some(idx))?;
    }
    Ok(out)
}

/// Prepend `prefix` to every variable name.
pub fn add_prefix(model: &Model, prefix: &str) -> Result<Model, RenamerError> {
    replace_prefix(model, "", prefix)
}

/// Append `suffix` to every variable name.
pub fn add_suffix(model: &Model, suffix: &str) -> Result<Model, RenamerError> {
    replace_suffix(model, "", suffix)
}

/// Replace the prefix `old` of every variable name with `new`. Every variable
/// must carry the old prefix.
pub fn replace_prefix(model: &Model, old: &str, new: &str) -> Result<Model, RenamerError> {
    for v in model.vars() {
        if !v.name.starts_with(old) {
            return Err(RenamerError::MissingPrefix {
                name: v.name.clone(),
                prefix: old.to_string(),
            });
        }
    }
    rename(model, |name| format!("{new}{}", &name[old.len()..]))
}

/// Replace the suffix `old` of every variable name with `new`. Every variable
/// must carry the old suffix.
pub fn replace_suffix(model: &Model, old: &str, new: &str) -> Result<Model, RenamerError> {
    for v in model.vars() {
        if !v.name.ends_with(old) {
            return Err(RenamerError::MissingSuffix {
                name: v.name.clone(),
                suffix: old.to_string(),
            });
        }
    }
    rename(model, |name| {
        format!("{}{new}", &name[..name.len() - old.len()])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{NumOp, NumRel, Sort};

    fn counter() -> Model {
        let mut m = Model::new();
        let x = m.create_state_var("x", Sort::Int).unwrap();
        m.add_init(Term::equals(&x, Term::int(0))).unwrap();
        m.add_trans(Term::equals(
            Term::prime(&x),
            Term::num_op(NumOp::Add, &x, Term::int(1)),
        ))
        .unwrap();
        m.add_invar_property(Term::num_rel(NumRel::Leq, Term::int(0), &x), None)
            .unwrap();
        m
    }

    #[test]
    fn test_add_prefix() {
        let m = counter();
        let renamed = add_prefix(&m, "p.").unwrap();
        assert!(renamed.is_state_var("p.x"));
        assert!(!renamed.is_state_var("x"));
        assert_eq!(
            renamed.init_constraints(),
            &[Term::equals(Term::id("p.x"), Term::int(0))]
        );
        assert_eq!(
            renamed.get_property(0).unwrap().term,
            Term::num_rel(NumRel::Leq, Term::int(0), Term::id("p.x"))
        );
    }

    #[test]
    fn test_replace_prefix_strict() {
        let m = counter();
        let renamed = add_prefix(&m, "a.").unwrap();
        let back = replace_prefix(&renamed, "a.", "b.").unwrap();
        assert!(back.is_state_var("b.x"));
        assert_eq!(
            replace_prefix(&m, "a.", "b."),
            Err(RenamerError::MissingPrefix {
                name: "x".to_string(),
                prefix: "a.".to_string(),
            })
        );
    }

    #[test]
    fn test_replace_suffix_strict() {
        let m = counter();
        let renamed = add_suffix(&m, "_0").unwrap();
        assert!(renamed.is_state_var("x_0"));
        assert_eq!(
            replace_suffix(&m, "_0", "_1"),
            Err(RenamerError::MissingSuffix {
                name: "x".to_string(),
                suffix: "_0".to_string(),
            })
        );
    }
}
