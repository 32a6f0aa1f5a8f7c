// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Perform substitutions of Id terms by other terms.

use std::collections::HashMap;

use crate::syntax::Term;

/// A map from identifiers to Terms.
pub type Substitution = HashMap<String, Term>;

/// Perform a substitution.
pub fn substitute(term: &Term, substitution: &Substitution) -> Term {
    substitute_rec(term, substitution, &im::HashSet::new())
}

/// Perform a substitution, accounting for the given bound variables
fn substitute_rec(
    term: &Term,
    substitution: &Substitution,
    bound_vars: &im::HashSet<String>,
) -> Term {
    match term {
        Term::Literal(_) | Term::Int(_) | Term::Real(_, _) | Term::BitVec(_, _) => term.clone(),
        Term::Id(s) => {
            if !bound_vars.contains(s) && substitution.contains_key(s) {
                substitution[s].clone()
            } else {
                Term::id(s)
            }
        }

        Term::UnaryOp(op, arg) => Term::UnaryOp(
            *op,
            Box::new(substitute_rec(arg, substitution, bound_vars)),
        ),

        Term::BinOp(op, arg1, arg2) => Term::BinOp(
            *op,
            Box::new(substitute_rec(arg1, substitution, bound_vars)),
            Box::new(substitute_rec(arg2, substitution, bound_vars)),
        ),

        Term::NAryOp(op, args) => Term::NAryOp(
            *op,
            args.iter()
                .map(|a| substitute_rec(a, substitution, bound_vars))
                .collect(),
        ),

        Term::NumOp(op, arg1, arg2) => Term::NumOp(
            *op,
            Box::new(substitute_rec(arg1, substitution, bound_vars)),
            Box::new(substitute_rec(arg2, substitution, bound_vars)),
        ),

        Term::NumRel(rel, arg1, arg2) => Term::NumRel(
            *rel,
            Box::new(substitute_rec(arg1, substitution, bound_vars)),
            Box::new(substitute_rec(arg2, substitution, bound_vars)),
        ),

        Term::Ite { cond, then, else_ } => Term::Ite {
            cond: Box::new(substitute_rec(cond, substitution, bound_vars)),
            then: Box::new(substitute_rec(then, substitution, bound_vars)),
            else_: Box::new(substitute_rec(else_, substitution, bound_vars)),
        },

        Term::Quantified {
            quantifier,
            binders,
            body,
        } => {
            let mut new_bound_vars = bound_vars.clone();
            new_bound_vars.extend(binders.iter().map(|b| b.name.clone()));
            Term::Quantified {
                quantifier: *quantifier,
                binders: binders.clone(),
                body: Box::new(substitute_rec(body, substitution, &new_bound_vars)),
            }
        }
    }
}

/// Rename every identifier in the term, binders included, through `f`.
/// The caller must keep the renaming injective to avoid capture.
pub fn rename_symbols<F>(term: &Term, f: &F) -> Term
where
    F: Fn(&str) -> String,
{
    match term {
        Term::Literal(_) | Term::Int(_) | Term::Real(_, _) | Term::BitVec(_, _) => term.clone(),
        Term::Id(s) => Term::Id(f(s)),
        Term::UnaryOp(op, arg) => Term::UnaryOp(*op, Box::new(rename_symbols(arg, f))),
        Term::BinOp(op, arg1, arg2) => Term::BinOp(
            *op,
            Box::new(rename_symbols(arg1, f)),
            Box::new(rename_symbols(arg2, f)),
        ),
        Term::NAryOp(op, args) => {
            Term::NAryOp(*op, args.iter().map(|a| rename_symbols(a, f)).collect())
        }
        Term::NumOp(op, arg1, arg2) => Term::NumOp(
            *op,
            Box::new(rename_symbols(arg1, f)),
            Box::new(rename_symbols(arg2, f)),
        ),
        Term::NumRel(rel, arg1, arg2) => Term::NumRel(
            *rel,
            Box::new(rename_symbols(arg1, f)),
            Box::new(rename_symbols(arg2, f)),
        ),
        Term::Ite { cond, then, else_ } => Term::Ite {
            cond: Box::new(rename_symbols(cond, f)),
            then: Box::new(rename_symbols(then, f)),
            else_: Box::new(rename_symbols(else_, f)),
        },
        Term::Quantified {
            quantifier,
            binders,
            body,
        } => Term::Quantified {
            quantifier: *quantifier,
            binders: binders
                .iter()
                .map(|b| crate::syntax::Binder {
                    name: f(&b.name),
                    sort: b.sort.clone(),
                })
                .collect(),
            body: Box::new(rename_symbols(body, f)),
        },
    }
}

#[cfg(test)]
#[allow(clippy::redundant_clone)]
mod tests {
    use super::*;
    use crate::syntax::Term;

    #[test]
    fn test_subst_qf() {
        let x = Term::id("x");
        let y = Term::id("y");
        let z = Term::id("z");

        let t1 = Term::implies(Term::or([&x, &z]), Term::not(&y));
        let t1_subx = Term::implies(Term::or([&y, &z]), Term::not(&y));
        let t1_suby = Term::implies(Term::or([&x, &z]), Term::not(&x));

        let mut subx = Substitution::new();
        subx.insert("x".to_string(), y.clone());
        let mut suby = Substitution::new();
        suby.insert("y".to_string(), x.clone());

        assert_eq!(substitute(&t1, &subx), t1_subx);
        assert_eq!(substitute(&t1, &suby), t1_suby);
    }

    #[test]
    fn test_subst_bound() {
        use crate::syntax::{Binder, Sort};
        let t = Term::exists(
            [Binder::new("x", Sort::Int)],
            Term::equals(Term::id("x"), Term::id("y")),
        );
        let mut sub = Substitution::new();
        sub.insert("x".to_string(), Term::id("z"));
        // the bound x is not substituted
        assert_eq!(substitute(&t, &sub), t);
    }

    #[test]
    fn test_rename_symbols() {
        use crate::syntax::{Binder, Sort};
        let t = Term::forall(
            [Binder::new("z", Sort::Int)],
            Term::equals(Term::id("z"), Term::prime(Term::id("x"))),
        );
        let renamed = rename_symbols(&t, &|name| format!("m.{name}"));
        assert_eq!(
            renamed,
            Term::forall(
                [Binder::new("m.z", Sort::Int)],
                Term::equals(Term::id("m.z"), Term::prime(Term::id("m.x"))),
            )
        );
    }

    #[test]
    fn test_subst_under_prime() {
        let t = Term::prime(Term::id("x"));
        let mut sub = Substitution::new();
        sub.insert("x".to_string(), Term::id("renamed.x"));
        assert_eq!(substitute(&t, &sub), Term::prime(Term::id("renamed.x")));
    }
}
