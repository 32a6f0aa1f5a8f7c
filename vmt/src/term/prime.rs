// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Normalize primes (next) down to variables.

use crate::syntax::{Term, UOp};

/// Wrap t in `next` primes.
fn with_primes(mut t: Term, next: usize) -> Term {
    for _ in 0..next {
        t = Term::UnaryOp(UOp::Prime, Box::new(t));
    }
    t
}

/// Push occurrences of prime inward in `t`, adding `next` primes at the bottom.
/// Keeps track of a set of bound variables `bound` that should not be primed.
fn with_next(t: &Term, bound: im::HashSet<String>, next: usize) -> Term {
    let go = |t| with_next(t, bound.clone(), next);
    let go_box = |t| Box::new(go(t));
    match t {
        // increase next
        Term::UnaryOp(UOp::Prime, t) => with_next(t, bound.clone(), next + 1),
        // apply accumulated next
        Term::Id(s) => with_primes(
            Term::Id(s.clone()),
            if bound.contains(s) { 0 } else { next },
        ),
        // constants are rigid, primes evaporate
        Term::Literal(_) | Term::Int(_) | Term::Real(_, _) | Term::BitVec(_, _) => t.clone(),

        // boring recursive cases
        Term::UnaryOp(op, t) => Term::UnaryOp(*op, go_box(t)),
        Term::BinOp(op, lhs, rhs) => Term::BinOp(*op, go_box(lhs), go_box(rhs)),
        Term::NAryOp(op, xs) => Term::NAryOp(*op, xs.iter().map(go).collect()),
        Term::NumOp(op, lhs, rhs) => Term::NumOp(*op, go_box(lhs), go_box(rhs)),
        Term::NumRel(rel, lhs, rhs) => Term::NumRel(*rel, go_box(lhs), go_box(rhs)),
        Term::Ite { cond, then, else_ } => Term::Ite {
            cond: go_box(cond),
            then: go_box(then),
            else_: go_box(else_),
        },
        Term::Quantified {
            quantifier,
            binders,
            body,
        } => Term::Quantified {
            quantifier: *quantifier,
            binders: binders.clone(),
            body: {
                let mut bound = bound.clone();
                bound.extend(binders.iter().map(|binder| binder.name.clone()));
                Box::new(with_next(body, bound, next))
            },
        },
    }
}

/// Namespace for prime manipulation functions.
pub struct Next {}

impl Next {
    /// Normalize any occurrences of (p)' to push the prime as deep as possible,
    /// down to variables.
    pub fn normalize(t: &Term) -> Term {
        let bound = im::hashset! {};
        with_next(t, bound, 0)
    }

    /// Add a prime to t and push it as far as possible.
    pub fn prime(t: &Term) -> Term {
        Self::normalize(&Term::UnaryOp(UOp::Prime, Box::new(t.clone())))
    }

    /// The deepest nesting of primes over any variable of the term. A trans
    /// constraint is well formed when this is at most 1.
    pub fn prime_depth(t: &Term) -> usize {
        fn go(t: &Term, primes: usize) -> usize {
            match t {
                Term::UnaryOp(UOp::Prime, t) => go(t, primes + 1),
                Term::Id(_) => primes,
                Term::Literal(_) | Term::Int(_) | Term::Real(_, _) | Term::BitVec(_, _) => 0,
                Term::UnaryOp(_, t) => go(t, primes),
                Term::BinOp(_, lhs, rhs)
                | Term::NumOp(_, lhs, rhs)
                | Term::NumRel(_, lhs, rhs) => go(lhs, primes).max(go(rhs, primes)),
                Term::NAryOp(_, ts) => ts.iter().map(|t| go(t, primes)).max().unwrap_or(0),
                Term::Ite { cond, then, else_ } => go(cond, primes)
                    .max(go(then, primes))
                    .max(go(else_, primes)),
                Term::Quantified { body, .. } => go(body, primes),
            }
        }
        go(t, 0)
    }

    /// Return true if the term mentions a primed variable.
    pub fn has_prime(t: &Term) -> bool {
        Self::prime_depth(t) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::Next;
    use crate::syntax::{NumOp, Term};

    #[test]
    fn test_normalize() {
        let x = Term::id("x");
        let y = Term::id("y");
        // (x + y)' normalizes to x' + y'
        assert_eq!(
            Next::prime(&Term::num_op(NumOp::Add, &x, &y)),
            Term::num_op(NumOp::Add, Term::prime(&x), Term::prime(&y))
        );
        // constants absorb the prime
        assert_eq!(
            Next::prime(&Term::equals(&x, Term::int(0))),
            Term::equals(Term::prime(&x), Term::int(0))
        );
    }

    #[test]
    fn test_prime_depth() {
        let x = Term::id("x");
        assert_eq!(Next::prime_depth(&x), 0);
        assert_eq!(Next::prime_depth(&Term::prime(&x)), 1);
        assert_eq!(Next::prime_depth(&Term::prime(Term::prime(&x))), 2);
        assert_eq!(
            Next::prime_depth(&Term::and([Term::prime(&x), Term::id("y")])),
            1
        );
        assert!(!Next::has_prime(&Term::int(3)));
    }
}
