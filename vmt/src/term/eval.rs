// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Evaluate ground terms against an assignment of constants to variables.

use crate::syntax::{BinOp, NOp, NumOp, NumRel, Term, UOp};
use thiserror::Error;

/// An error encountered while evaluating a term
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EvalError {
    /// A variable (at some prime depth) that the assignment does not cover
    #[error("no assignment for {name} at prime depth {primes}")]
    UnknownSymbol {
        /// Name of the unassigned variable
        name: String,
        /// Number of primes the variable occurred under
        primes: usize,
    },
    /// The assignment mapped a variable to a non-constant term
    #[error("assignment for {0} is not a constant")]
    NotConstant(String),
    /// A temporal operator, which has no value at a single step pair
    #[error("cannot evaluate a temporal operator")]
    Temporal,
    /// A quantifier over an unbounded sort
    #[error("cannot evaluate a quantified term")]
    Quantified,
    /// Division by a zero constant
    #[error("division by zero")]
    DivisionByZero,
    /// A numeric result outside the representable range
    #[error("arithmetic overflow in evaluation")]
    Overflow,
    /// Arguments of incompatible sorts, e.g. comparing a boolean to an integer
    #[error("mismatched arguments in evaluation")]
    Mismatched,
}

/// An evaluated constant. Rationals are kept exact and demoted to Int when
/// the denominator is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Value {
    Bool(bool),
    Int(i64),
    Rat(i64, u64),
    Bits(u64, u32),
}

fn gcd(a: u128, b: u128) -> u128 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

impl Value {
    /// Reduce a fraction built from i128 intermediates. Only a reduced
    /// result that does not fit i64/u64 counts as overflow.
    fn rat(num: i128, den: i128) -> Result<Value, EvalError> {
        if den == 0 {
            return Err(EvalError::DivisionByZero);
        }
        let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
        let g = gcd(num.unsigned_abs(), den as u128).max(1);
        let num = i64::try_from(num / g as i128).map_err(|_| EvalError::Overflow)?;
        let den = u64::try_from(den as u128 / g).map_err(|_| EvalError::Overflow)?;
        if den == 1 {
            Ok(Value::Int(num))
        } else {
            Ok(Value::Rat(num, den))
        }
    }

    fn of_term(t: &Term) -> Option<Value> {
        match t {
            Term::Literal(b) => Some(Value::Bool(*b)),
            Term::Int(i) => Some(Value::Int(*i)),
            Term::Real(num, den) => Some(Value::Rat(*num, *den)),
            Term::BitVec(value, width) => Some(Value::Bits(*value, *width)),
            _ => None,
        }
    }

    fn to_term(self) -> Term {
        match self {
            Value::Bool(b) => Term::Literal(b),
            Value::Int(i) => Term::Int(i),
            Value::Rat(num, den) => Term::Real(num, den),
            Value::Bits(value, width) => Term::BitVec(value, width),
        }
    }

    fn as_bool(self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(b),
            _ => Err(EvalError::Mismatched),
        }
    }

    fn as_rat(self) -> Result<(i64, u64), EvalError> {
        match self {
            Value::Int(i) => Ok((i, 1)),
            Value::Rat(num, den) => Ok((num, den)),
            _ => Err(EvalError::Mismatched),
        }
    }
}

fn num_op(op: NumOp, v1: Value, v2: Value) -> Result<Value, EvalError> {
    let (n1, d1) = v1.as_rat()?;
    let (n2, d2) = v2.as_rat()?;
    let (n1, d1) = (n1 as i128, d1 as i128);
    let (n2, d2) = (n2 as i128, d2 as i128);
    let mul = |a: i128, b: i128| a.checked_mul(b).ok_or(EvalError::Overflow);
    match op {
        NumOp::Add => Value::rat(
            mul(n1, d2)?
                .checked_add(mul(n2, d1)?)
                .ok_or(EvalError::Overflow)?,
            mul(d1, d2)?,
        ),
        NumOp::Sub => Value::rat(
            mul(n1, d2)?
                .checked_sub(mul(n2, d1)?)
                .ok_or(EvalError::Overflow)?,
            mul(d1, d2)?,
        ),
        NumOp::Mul => Value::rat(mul(n1, n2)?, mul(d1, d2)?),
        NumOp::Div => {
            if n2 == 0 {
                Err(EvalError::DivisionByZero)
            } else {
                Value::rat(mul(n1, d2)?, mul(n2, d1)?)
            }
        }
    }
}

fn num_rel(rel: NumRel, v1: Value, v2: Value) -> Result<Value, EvalError> {
    let (n1, d1) = v1.as_rat()?;
    let (n2, d2) = v2.as_rat()?;
    // compare by cross multiplication, denominators are positive; the
    // products of i64 and u64 operands are exact in i128
    let lhs = n1 as i128 * d2 as i128;
    let rhs = n2 as i128 * d1 as i128;
    let b = match rel {
        NumRel::Lt => lhs < rhs,
        NumRel::Leq => lhs <= rhs,
        NumRel::Geq => lhs >= rhs,
        NumRel::Gt => lhs > rhs,
    };
    Ok(Value::Bool(b))
}

/// Evaluate a ground term. `lookup` resolves a variable name and a prime
/// depth (0 for the current step, 1 for the next step) to a constant term.
pub fn evaluate<L>(t: &Term, lookup: &L) -> Result<Term, EvalError>
where
    L: Fn(&str, usize) -> Option<Term>,
{
    evaluate_rec(t, lookup, 0).map(Value::to_term)
}

fn evaluate_rec<L>(t: &Term, lookup: &L, primes: usize) -> Result<Value, EvalError>
where
    L: Fn(&str, usize) -> Option<Term>,
{
    match t {
        Term::Literal(_) | Term::Int(_) | Term::Real(_, _) | Term::BitVec(_, _) => {
            Ok(Value::of_term(t).unwrap())
        }
        Term::Id(name) => {
            let assigned = lookup(name, primes).ok_or_else(|| EvalError::UnknownSymbol {
                name: name.clone(),
                primes,
            })?;
            Value::of_term(&assigned).ok_or_else(|| EvalError::NotConstant(name.clone()))
        }
        Term::UnaryOp(UOp::Prime, t) => evaluate_rec(t, lookup, primes + 1),
        Term::UnaryOp(UOp::Not, t) => {
            let b = evaluate_rec(t, lookup, primes)?.as_bool()?;
            Ok(Value::Bool(!b))
        }
        Term::UnaryOp(_, _) => Err(EvalError::Temporal),
        Term::BinOp(op, lhs, rhs) => {
            if op.is_ltl() {
                return Err(EvalError::Temporal);
            }
            let v1 = evaluate_rec(lhs, lookup, primes)?;
            let v2 = evaluate_rec(rhs, lookup, primes)?;
            let b = match op {
                BinOp::Equals => v1 == v2,
                BinOp::NotEquals => v1 != v2,
                BinOp::Implies => !v1.as_bool()? || v2.as_bool()?,
                BinOp::Iff => v1.as_bool()? == v2.as_bool()?,
                BinOp::Until | BinOp::Release | BinOp::Since => unreachable!(),
            };
            Ok(Value::Bool(b))
        }
        Term::NAryOp(op, ts) => {
            let mut acc = match op {
                NOp::And => true,
                NOp::Or => false,
            };
            for t in ts {
                let b = evaluate_rec(t, lookup, primes)?.as_bool()?;
                acc = match op {
                    NOp::And => acc && b,
                    NOp::Or => acc || b,
                };
            }
            Ok(Value::Bool(acc))
        }
        Term::NumOp(op, lhs, rhs) => {
            let v1 = evaluate_rec(lhs, lookup, primes)?;
            let v2 = evaluate_rec(rhs, lookup, primes)?;
            num_op(*op, v1, v2)
        }
        Term::NumRel(rel, lhs, rhs) => {
            let v1 = evaluate_rec(lhs, lookup, primes)?;
            let v2 = evaluate_rec(rhs, lookup, primes)?;
            num_rel(*rel, v1, v2)
        }
        Term::Ite { cond, then, else_ } => {
            if evaluate_rec(cond, lookup, primes)?.as_bool()? {
                evaluate_rec(then, lookup, primes)
            } else {
                evaluate_rec(else_, lookup, primes)
            }
        }
        Term::Quantified { .. } => Err(EvalError::Quantified),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::NumOp::*;
    use crate::syntax::NumRel::*;

    fn lookup(name: &str, primes: usize) -> Option<Term> {
        match (name, primes) {
            ("x", 0) => Some(Term::int(1)),
            ("x", 1) => Some(Term::int(2)),
            ("y", 0) => Some(Term::real(1, 2)),
            ("b", 0) => Some(Term::true_()),
            _ => None,
        }
    }

    #[test]
    fn test_evaluate_arith() {
        let x = Term::id("x");
        let t = Term::num_op(Add, &x, Term::prime(&x));
        assert_eq!(evaluate(&t, &lookup), Ok(Term::int(3)));

        let t = Term::num_op(Add, Term::id("y"), Term::real(1, 2));
        assert_eq!(evaluate(&t, &lookup), Ok(Term::int(1)));

        let t = Term::num_rel(Lt, Term::id("y"), &x);
        assert_eq!(evaluate(&t, &lookup), Ok(Term::true_()));
    }

    #[test]
    fn test_evaluate_large_rationals() {
        // intermediates exceed i64 but the reduced results are in range
        let big = 1i64 << 33;
        let t = Term::num_op(Add, Term::real(1, big), Term::real(1, big));
        assert_eq!(evaluate(&t, &lookup), Ok(Term::real(1, 1 << 32)));
        let t = Term::num_rel(Lt, Term::int(i64::MAX), Term::real(1, 2));
        assert_eq!(evaluate(&t, &lookup), Ok(Term::false_()));
        // a reduced result out of range is an error, not a wraparound
        let t = Term::num_op(Mul, Term::int(i64::MAX), Term::int(2));
        assert_eq!(evaluate(&t, &lookup), Err(EvalError::Overflow));
    }

    #[test]
    fn test_evaluate_bool() {
        let t = Term::and([
            Term::id("b"),
            Term::equals(Term::id("x"), Term::int(1)),
        ]);
        assert_eq!(evaluate(&t, &lookup), Ok(Term::true_()));
        assert_eq!(
            evaluate(&Term::not(Term::id("b")), &lookup),
            Ok(Term::false_())
        );
    }

    #[test]
    fn test_evaluate_errors() {
        assert_eq!(
            evaluate(&Term::prime(Term::id("z")), &lookup),
            Err(EvalError::UnknownSymbol {
                name: "z".to_string(),
                primes: 1
            })
        );
        assert_eq!(
            evaluate(&Term::always(Term::id("b")), &lookup),
            Err(EvalError::Temporal)
        );
        assert_eq!(
            evaluate(
                &Term::num_op(Div, Term::id("x"), Term::int(0)),
                &lookup
            ),
            Err(EvalError::DivisionByZero)
        );
    }
}
