// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Infer the sort of a term against a variable context.

use crate::syntax::{BinOp, Sort, Term, UOp};
use thiserror::Error;

/// An error encountered during sort inference
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SortError {
    /// An identifier that is not bound and not in the context
    #[error("unknown symbol {0}")]
    UnknownSymbol(String),
    /// An operator was applied to a term of the wrong sort
    #[error("expected {expected} but found {found}")]
    ExpectedButFoundSorts {
        /// The sort dictated by the operator
        expected: Sort,
        /// The sort the argument actually has
        found: Sort,
    },
    /// Two arguments that must agree on a sort do not
    #[error("could not unify {0} and {1}")]
    UnificationFail(Sort, Sort),
    /// A numeric operator was applied to a non-numeric argument
    #[error("expected a numeric sort but found {0}")]
    ExpectedNumeric(Sort),
}

/// Infer the sort of a term. `context` resolves the sorts of free variables;
/// quantified binders shadow it.
pub fn sort_of<C>(term: &Term, context: &C) -> Result<Sort, SortError>
where
    C: Fn(&str) -> Option<Sort>,
{
    sort_of_rec(term, context, &im::hashmap! {})
}

fn expect(term: &Term, expected: Sort, context: &impl Fn(&str) -> Option<Sort>, bound: &im::HashMap<String, Sort>) -> Result<(), SortError> {
    let found = sort_of_rec(term, context, bound)?;
    if found == expected {
        Ok(())
    } else {
        Err(SortError::ExpectedButFoundSorts { expected, found })
    }
}

fn unify(s1: Sort, s2: Sort) -> Result<Sort, SortError> {
    if s1 == s2 {
        Ok(s1)
    } else {
        Err(SortError::UnificationFail(s1, s2))
    }
}

fn sort_of_rec<C>(
    term: &Term,
    context: &C,
    bound: &im::HashMap<String, Sort>,
) -> Result<Sort, SortError>
where
    C: Fn(&str) -> Option<Sort>,
{
    match term {
        Term::Literal(_) => Ok(Sort::Bool),
        Term::Int(_) => Ok(Sort::Int),
        Term::Real(_, _) => Ok(Sort::Real),
        Term::BitVec(_, width) => Ok(Sort::BitVec(*width)),
        Term::Id(s) => bound
            .get(s)
            .cloned()
            .or_else(|| context(s))
            .ok_or_else(|| SortError::UnknownSymbol(s.clone())),
        Term::UnaryOp(UOp::Prime, t) => sort_of_rec(t, context, bound),
        Term::UnaryOp(_, t) => {
            // Not and the LTL modalities are all boolean
            expect(t, Sort::Bool, context, bound)?;
            Ok(Sort::Bool)
        }
        Term::BinOp(BinOp::Equals | BinOp::NotEquals, lhs, rhs) => {
            let s1 = sort_of_rec(lhs, context, bound)?;
            let s2 = sort_of_rec(rhs, context, bound)?;
            unify(s1, s2)?;
            Ok(Sort::Bool)
        }
        Term::BinOp(_, lhs, rhs) => {
            expect(lhs, Sort::Bool, context, bound)?;
            expect(rhs, Sort::Bool, context, bound)?;
            Ok(Sort::Bool)
        }
        Term::NAryOp(_, ts) => {
            for t in ts {
                expect(t, Sort::Bool, context, bound)?;
            }
            Ok(Sort::Bool)
        }
        Term::NumOp(_, lhs, rhs) => {
            let s1 = sort_of_rec(lhs, context, bound)?;
            let s2 = sort_of_rec(rhs, context, bound)?;
            if !s1.is_numeric() {
                return Err(SortError::ExpectedNumeric(s1));
            }
            unify(s1, s2)
        }
        Term::NumRel(_, lhs, rhs) => {
            let s1 = sort_of_rec(lhs, context, bound)?;
            let s2 = sort_of_rec(rhs, context, bound)?;
            if !s1.is_numeric() {
                return Err(SortError::ExpectedNumeric(s1));
            }
            unify(s1, s2)?;
            Ok(Sort::Bool)
        }
        Term::Ite { cond, then, else_ } => {
            expect(cond, Sort::Bool, context, bound)?;
            let s1 = sort_of_rec(then, context, bound)?;
            let s2 = sort_of_rec(else_, context, bound)?;
            unify(s1, s2)
        }
        Term::Quantified { binders, body, .. } => {
            let mut bound = bound.clone();
            for b in binders {
                bound.insert(b.name.clone(), b.sort.clone());
            }
            expect(body, Sort::Bool, context, &bound)?;
            Ok(Sort::Bool)
        }
    }
}
