// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Synchronous composition of two models over shared variables.

use thiserror::Error;

use crate::model::{Model, ModelError, VarKind};

/// An error from composing two models
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ComposeError {
    /// A variable shared by the two models with two different sorts
    #[error("variable {0} has different sorts in the composed models")]
    MismatchedSorts(String),
    /// The composed constraints or properties do not form a valid model,
    /// e.g. the two models reuse a property index
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Compose two models that run in lockstep, sharing the variables with the
/// same name. A variable that is a state variable in either model is a state
/// variable of the composition. Init and trans constraints are conjoined, and
/// properties keep their indices (which must not clash).
pub fn compose(a: &Model, b: &Model) -> Result<Model, ComposeError> {
    let mut out = Model::new();
    for s in a.sorts() {
        out.add_sort(s)?;
    }
    for s in b.sorts() {
        if !a.sorts().contains(s) {
            out.add_sort(s)?;
        }
    }
    for v in a.vars().iter().chain(b.vars()) {
        match out.get_var(&v.name).cloned() {
            None => {
                // state-variable status wins over input in either model
                let kind = if a.is_state_var(&v.name) || b.is_state_var(&v.name) {
                    VarKind::State
                } else {
                    VarKind::Input
                };
                match kind {
                    VarKind::State => out.create_state_var(&v.name, v.sort.clone())?,
                    VarKind::Input => out.create_input_var(&v.name, v.sort.clone())?,
                };
            }
            Some(existing) => {
                if existing.sort != v.sort {
                    return Err(ComposeError::MismatchedSorts(v.name.clone()));
                }
            }
        }
    }
    for t in a.init_constraints().iter().chain(b.init_constraints()) {
        out.add_init(t.clone())?;
    }
    for t in a.trans_constraints().iter().chain(b.trans_constraints()) {
        out.add_trans(t.clone())?;
    }
    for (idx, p) in a.properties().chain(b.properties()) {
        out.add_property(p.typ, p.term.clone(), Some(idx))?;
    }
    Ok(out)
}
