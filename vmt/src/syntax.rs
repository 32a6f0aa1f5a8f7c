// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The AST for terms and sorts of a symbolic transition system.

use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// A Sort represents a collection of values: the built-in booleans, integers,
/// reals, fixed-width bit vectors, or an uninterpreted sort identified by name.
#[derive(PartialEq, Eq, Clone, Debug, Hash, Serialize, PartialOrd, Ord)]
pub enum Sort {
    /// Boolean sort
    Bool,
    /// Mathematical integers
    Int,
    /// Mathematical reals
    Real,
    /// Bit vectors of the given width
    BitVec(u32),
    /// Uninterpreted sort identified by its name
    Uninterpreted(String),
}

impl Sort {
    /// Smart constructor for uninterpreted sort that takes &str
    pub fn uninterpreted(name: &str) -> Self {
        Self::Uninterpreted(name.to_string())
    }

    /// Return true if the sort is one of the numeric sorts.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Sort::Int | Sort::Real)
    }
}

impl From<&str> for Sort {
    /// This is mostly for the Binder smart constructor, making it possible to
    /// pass either Sort, &Sort, or &str
    fn from(value: &str) -> Self {
        Self::uninterpreted(value)
    }
}

impl From<&Sort> for Sort {
    /// This is mostly for the Binder smart constructor, making it possible to
    /// pass either Sort, &Sort, or &str
    fn from(value: &Self) -> Self {
        value.clone()
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "bool"),
            Sort::Int => write!(f, "int"),
            Sort::Real => write!(f, "real"),
            Sort::BitVec(width) => write!(f, "bv{width}"),
            Sort::Uninterpreted(i) => write!(f, "{i}"),
        }
    }
}

/// A binder is a variable name and a sort (used e.g. for a quantifier)
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord)]
pub struct Binder {
    /// Bound name
    pub name: String,
    /// Sort for this binder
    pub sort: Sort,
}

impl Binder {
    /// Smart constructor for a Binder that takes arguments by reference.
    pub fn new<T>(name: &str, sort: T) -> Self
    where
        T: Into<Sort>,
    {
        Binder {
            name: name.to_string(),
            sort: sort.into(),
        }
    }
}

/// Unary operators
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub enum UOp {
    /// Boolean negation
    Not,
    /// Gives the value of the argument one step in the future. This is the
    /// transition-relation operator, not an LTL modality: it may only appear
    /// in trans constraints, where primed state variables refer to the
    /// post-state.
    Prime,
    /// Always temporal modality (ltl.G)
    Always,
    /// Eventually temporal modality (ltl.F)
    Eventually,
    /// Next temporal modality (ltl.X)
    Next,
    /// Historically past modality (ltl.H)
    Historically,
    /// Once past modality (ltl.O)
    Once,
    /// Yesterday past modality (ltl.Y)
    Previous,
}

impl UOp {
    /// Return true if the operator is an LTL modality (as opposed to Not or
    /// Prime).
    pub fn is_ltl(&self) -> bool {
        !matches!(self, UOp::Not | UOp::Prime)
    }
}

/// Binary operators
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub enum BinOp {
    Equals,
    NotEquals,
    Implies,
    Iff,
    /// Until temporal modality (ltl.U)
    Until,
    /// Release temporal modality (ltl.R)
    Release,
    /// Since past modality (ltl.S)
    Since,
}

impl BinOp {
    /// Return true if the operator is an LTL modality.
    pub fn is_ltl(&self) -> bool {
        matches!(self, BinOp::Until | BinOp::Release | BinOp::Since)
    }
}

/// N-ary logical operators
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub enum NOp {
    And,
    Or,
}

/// Binary numeric operators
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub enum NumOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Binary numeric relations
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub enum NumRel {
    Lt,
    Leq,
    Geq,
    Gt,
}

/// A kind of quantifier (forall or exists)
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub enum Quantifier {
    Forall,
    Exists,
}

/// A term of a transition system: a first-order term over the system's
/// variables, possibly using the prime operator (for trans constraints) or
/// the LTL modalities (for LTL properties).
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord)]
pub enum Term {
    /// A constant true or false
    Literal(bool),
    /// An integer constant
    Int(i64),
    /// An exact rational constant, stored as numerator and (positive)
    /// denominator in lowest terms
    Real(i64, u64),
    /// A bit-vector constant with an explicit width
    BitVec(u64, u32),
    /// A reference to a declared variable or bound variable
    Id(String),
    /// An applied unary operation
    UnaryOp(UOp, Box<Term>),
    /// An applied binary operation
    BinOp(BinOp, Box<Term>, Box<Term>),
    /// An applied n-ary operation
    NAryOp(NOp, Vec<Term>),
    /// An applied numeric operation
    NumOp(NumOp, Box<Term>, Box<Term>),
    /// An applied numeric relation
    NumRel(NumRel, Box<Term>, Box<Term>),
    /// If-then-else
    Ite {
        /// A boolean conditional
        cond: Box<Term>,
        /// Value of the Ite when `cond` is true
        then: Box<Term>,
        /// Value of the Ite when `cond` is false
        else_: Box<Term>,
    },
    /// A quantifier with a sequence of binders and a body where the binders
    /// might be used freely.
    #[allow(missing_docs)]
    Quantified {
        quantifier: Quantifier,
        /// The sequence of bindings bound by this quantifier. Might be empty.
        binders: Vec<Binder>,
        body: Box<Term>,
    },
}

impl From<&Term> for Term {
    /// This is mostly for smart constructors, making it possible to
    /// pass either Term or &Term with an automatic clone if needed
    fn from(value: &Self) -> Self {
        value.clone()
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Smart constructors for Term. These generally take arguments by reference and
/// clone them. Should this become a performance concern we can revisit this
/// choice.
impl Term {
    /// Smart constructor for Literal. Mainly here for uniformity.
    pub fn literal(value: bool) -> Self {
        Self::Literal(value)
    }

    /// Smart constructor for Literal(true)
    pub fn true_() -> Self {
        Self::Literal(true)
    }

    /// Smart constructor for Literal(false)
    pub fn false_() -> Self {
        Self::Literal(false)
    }

    /// Smart constructor for Int
    pub fn int(i: i64) -> Self {
        Self::Int(i)
    }

    /// Smart constructor for Real. Normalizes the fraction to lowest terms
    /// with a positive denominator.
    pub fn real(num: i64, den: i64) -> Self {
        assert!(den != 0, "rational constant with zero denominator");
        let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
        let g = gcd(num.unsigned_abs(), den as u64).max(1);
        Self::Real(num / g as i64, den as u64 / g)
    }

    /// Smart constructor for a bit-vector constant
    pub fn bitvec(value: u64, width: u32) -> Self {
        Self::BitVec(value, width)
    }

    /// Smart constructor for Id
    pub fn id(name: &str) -> Self {
        Self::Id(name.to_string())
    }

    //////////////////
    // Unary operations
    //////////////////

    /// Smart constructor for not. Note this does not push negation inwards, but
    /// it does cancel double negation and flips Equals and NotEquals
    pub fn not<T>(t: T) -> Self
    where
        T: Into<Term>,
    {
        let t = t.into();
        match t {
            Self::UnaryOp(UOp::Not, body) => *body,
            Self::BinOp(BinOp::Equals, lhs, rhs) => Self::BinOp(BinOp::NotEquals, lhs, rhs),
            Self::BinOp(BinOp::NotEquals, lhs, rhs) => Self::BinOp(BinOp::Equals, lhs, rhs),
            _ => Self::UnaryOp(UOp::Not, Box::new(t)),
        }
    }

    /// Smart constructor for prime. Note this does not push primes down to
    /// variables (see [`crate::term::prime::Next`]).
    pub fn prime<T>(t: T) -> Self
    where
        T: Into<Term>,
    {
        Self::UnaryOp(UOp::Prime, Box::new(t.into()))
    }

    /// Smart constructor for always (ltl.G)
    pub fn always<T>(t: T) -> Self
    where
        T: Into<Term>,
    {
        Self::UnaryOp(UOp::Always, Box::new(t.into()))
    }

    /// Smart constructor for eventually (ltl.F)
    pub fn eventually<T>(t: T) -> Self
    where
        T: Into<Term>,
    {
        Self::UnaryOp(UOp::Eventually, Box::new(t.into()))
    }

    /// Smart constructor for the next modality (ltl.X)
    pub fn next<T>(t: T) -> Self
    where
        T: Into<Term>,
    {
        Self::UnaryOp(UOp::Next, Box::new(t.into()))
    }

    /// Smart constructor for historically (ltl.H)
    pub fn historically<T>(t: T) -> Self
    where
        T: Into<Term>,
    {
        Self::UnaryOp(UOp::Historically, Box::new(t.into()))
    }

    /// Smart constructor for once (ltl.O)
    pub fn once<T>(t: T) -> Self
    where
        T: Into<Term>,
    {
        Self::UnaryOp(UOp::Once, Box::new(t.into()))
    }

    /// Smart constructor for yesterday (ltl.Y)
    pub fn previous<T>(t: T) -> Self
    where
        T: Into<Term>,
    {
        Self::UnaryOp(UOp::Previous, Box::new(t.into()))
    }

    //////////////////
    // Binary operations
    //////////////////

    /// Smart constructor for `lhs = rhs`
    pub fn equals<T1, T2>(lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::BinOp(BinOp::Equals, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Smart constructor for `lhs != rhs`
    pub fn not_equals<T1, T2>(lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::BinOp(BinOp::NotEquals, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Smart constructor for `lhs -> rhs`
    pub fn implies<T1, T2>(lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::BinOp(BinOp::Implies, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Smart constructor for `lhs <-> rhs`
    pub fn iff<T1, T2>(lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::BinOp(BinOp::Iff, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Smart constructor for `lhs until rhs` (ltl.U)
    pub fn until<T1, T2>(lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::BinOp(BinOp::Until, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Smart constructor for `lhs release rhs` (ltl.R)
    pub fn release<T1, T2>(lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::BinOp(BinOp::Release, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Smart constructor for `lhs since rhs` (ltl.S)
    pub fn since<T1, T2>(lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::BinOp(BinOp::Since, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Smart constructor for a numeric operation
    pub fn num_op<T1, T2>(op: NumOp, lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::NumOp(op, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Smart constructor for a numeric relation
    pub fn num_rel<T1, T2>(rel: NumRel, lhs: T1, rhs: T2) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
    {
        Self::NumRel(rel, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    //////////////////
    // N-ary operations: And, Or
    //////////////////

    /// Helper function for [`Self::and`] and [`Self::or`]
    fn flatten_terms_of_op(ts: Vec<Term>, op: NOp) -> Vec<Term> {
        ts.into_iter()
            .flat_map(|t| match t {
                Self::NAryOp(op2, ts2) if op == op2 => ts2,
                _ => vec![t],
            })
            .collect()
    }

    /// Smart constructor for And. Zero and one conjuncts are handled specially, and
    /// conjuncts that are And are flattened (but not recursively).
    pub fn and<I>(ts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Term>,
    {
        let mut ts = ts.into_iter().map(|x| x.into()).collect_vec();
        if ts.is_empty() {
            Self::true_()
        } else if ts.len() == 1 {
            return ts.pop().unwrap();
        } else {
            Self::NAryOp(NOp::And, Self::flatten_terms_of_op(ts, NOp::And))
        }
    }

    /// Smart constructor for Or. Zero and one disjuncts are handled specially,
    /// and disjuncts that are Or are flattened (but not recursively).
    pub fn or<I>(ts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Term>,
    {
        let mut ts = ts.into_iter().map(|x| x.into()).collect_vec();
        if ts.is_empty() {
            Self::false_()
        } else if ts.len() == 1 {
            return ts.pop().unwrap();
        } else {
            Self::NAryOp(NOp::Or, Self::flatten_terms_of_op(ts, NOp::Or))
        }
    }

    //////////////////
    // Remaining operations: Ite, Forall, Exists
    //////////////////

    /// Smart constructor for Ite
    pub fn ite<T1, T2, T3>(cond: T1, then: T2, else_: T3) -> Self
    where
        T1: Into<Term>,
        T2: Into<Term>,
        T3: Into<Term>,
    {
        Self::Ite {
            cond: Box::new(cond.into()),
            then: Box::new(then.into()),
            else_: Box::new(else_.into()),
        }
    }

    /// Helper function for forall, exists. Special handling for zero binders
    /// and one level flattening.
    fn quantify(quantifier: Quantifier, binders: Vec<Binder>, body: Self) -> Self {
        debug_assert!(binders
            .iter()
            .enumerate()
            .all(|(i, b1)| binders[(i + 1)..].iter().all(|b2| b1.name != b2.name)));
        if binders.is_empty() {
            body
        } else {
            match body {
                Term::Quantified {
                    quantifier: quantifier2,
                    binders: binders2,
                    body: body2,
                } if quantifier == quantifier2 => {
                    // Handle shadowing
                    let mut combined_binders = binders
                        .into_iter()
                        .filter(|b| binders2.iter().all(|b2| b.name != b2.name))
                        .collect_vec();
                    combined_binders.extend(binders2);
                    Self::Quantified {
                        quantifier,
                        binders: combined_binders,
                        body: body2,
                    }
                }
                _ => Self::Quantified {
                    quantifier,
                    binders,
                    body: Box::new(body),
                },
            }
        }
    }

    /// Smart constructor for `forall binders. body`. Zero binders is handled
    /// specially, and nested forall is kept flat (but not recursively).
    pub fn forall<I, T>(binders: I, body: T) -> Self
    where
        I: IntoIterator,
        I::IntoIter: Iterator<Item = Binder>,
        T: Into<Term>,
    {
        let binders = binders.into_iter().collect_vec();
        let body = body.into();
        Self::quantify(Quantifier::Forall, binders, body)
    }

    /// Smart constructor for `exists binders. body`. Zero binders is handled
    /// specially, and nested exists is kept flat (but not recursively).
    pub fn exists<I, T>(binders: I, body: T) -> Self
    where
        I: IntoIterator,
        I::IntoIter: Iterator<Item = Binder>,
        T: Into<Term>,
    {
        let binders = binders.into_iter().collect_vec();
        let body = body.into();
        Self::quantify(Quantifier::Exists, binders, body)
    }
}

/// Utilities for getting information about a given [`Term`]
impl Term {
    /// Return true if the term is a constant (a literal of some sort).
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Term::Literal(_) | Term::Int(_) | Term::Real(_, _) | Term::BitVec(_, _)
        )
    }

    /// Return the set of free identifiers of the term.
    pub fn ids(&self) -> BTreeSet<String> {
        fn go(t: &Term, bound: &im::HashSet<String>, ids: &mut BTreeSet<String>) {
            match t {
                Term::Literal(_) | Term::Int(_) | Term::Real(_, _) | Term::BitVec(_, _) => (),
                Term::Id(s) => {
                    if !bound.contains(s) {
                        ids.insert(s.clone());
                    }
                }
                Term::UnaryOp(_, t) => go(t, bound, ids),
                Term::BinOp(_, lhs, rhs) | Term::NumOp(_, lhs, rhs) | Term::NumRel(_, lhs, rhs) => {
                    go(lhs, bound, ids);
                    go(rhs, bound, ids);
                }
                Term::NAryOp(_, ts) => ts.iter().for_each(|t| go(t, bound, ids)),
                Term::Ite { cond, then, else_ } => {
                    go(cond, bound, ids);
                    go(then, bound, ids);
                    go(else_, bound, ids);
                }
                Term::Quantified { binders, body, .. } => {
                    let mut bound = bound.clone();
                    bound.extend(binders.iter().map(|b| b.name.clone()));
                    go(body, &bound, ids);
                }
            }
        }
        let mut ids = BTreeSet::new();
        go(self, &im::hashset! {}, &mut ids);
        ids
    }

    /// Return true if the term contains an LTL modality.
    pub fn has_ltl(&self) -> bool {
        match self {
            Term::Literal(_)
            | Term::Int(_)
            | Term::Real(_, _)
            | Term::BitVec(_, _)
            | Term::Id(_) => false,
            Term::UnaryOp(op, t) => op.is_ltl() || t.has_ltl(),
            Term::BinOp(op, lhs, rhs) => op.is_ltl() || lhs.has_ltl() || rhs.has_ltl(),
            Term::NumOp(_, lhs, rhs) | Term::NumRel(_, lhs, rhs) => {
                lhs.has_ltl() || rhs.has_ltl()
            }
            Term::NAryOp(_, ts) => ts.iter().any(Term::has_ltl),
            Term::Ite { cond, then, else_ } => {
                cond.has_ltl() || then.has_ltl() || else_.has_ltl()
            }
            Term::Quantified { body, .. } => body.has_ltl(),
        }
    }

    /// Return true if the term contains a quantifier.
    pub fn has_quantifier(&self) -> bool {
        match self {
            Term::Literal(_)
            | Term::Int(_)
            | Term::Real(_, _)
            | Term::BitVec(_, _)
            | Term::Id(_) => false,
            Term::UnaryOp(_, t) => t.has_quantifier(),
            Term::BinOp(_, lhs, rhs) | Term::NumOp(_, lhs, rhs) | Term::NumRel(_, lhs, rhs) => {
                lhs.has_quantifier() || rhs.has_quantifier()
            }
            Term::NAryOp(_, ts) => ts.iter().any(|t| t.has_quantifier()),
            Term::Ite { cond, then, else_ } => {
                cond.has_quantifier() || then.has_quantifier() || else_.has_quantifier()
            }
            Term::Quantified { .. } => true,
        }
    }

    /// Return the number of atomic terms in the term.
    pub fn size(&self) -> usize {
        match self {
            Term::Literal(_)
            | Term::Int(_)
            | Term::Real(_, _)
            | Term::BitVec(_, _)
            | Term::Id(_) => 1,
            Term::UnaryOp(_, t) => t.size(),
            Term::BinOp(_, t1, t2) | Term::NumOp(_, t1, t2) | Term::NumRel(_, t1, t2) => {
                t1.size() + t2.size()
            }
            Term::NAryOp(_, ts) => ts.iter().map(Term::size).sum(),
            Term::Ite { cond, then, else_ } => cond.size() + then.size() + else_.size(),
            Term::Quantified { body, .. } => body.size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_or_flattening() {
        let a = Term::id("a");
        let b = Term::id("b");
        let c = Term::id("c");
        assert_eq!(Term::and([] as [Term; 0]), Term::true_());
        assert_eq!(Term::and([a.clone()]), a);
        assert_eq!(
            Term::and([Term::and([a.clone(), b.clone()]), c.clone()]),
            Term::NAryOp(NOp::And, vec![a.clone(), b.clone(), c.clone()])
        );
        assert_eq!(Term::or([] as [Term; 0]), Term::false_());
        assert_eq!(
            Term::or([a.clone(), Term::or([b.clone(), c.clone()])]),
            Term::NAryOp(NOp::Or, vec![a, b, c])
        );
    }

    #[test]
    fn test_not_simplification() {
        let x = Term::id("x");
        let y = Term::id("y");
        assert_eq!(Term::not(Term::not(&x)), x);
        assert_eq!(
            Term::not(Term::equals(&x, &y)),
            Term::not_equals(&x, &y)
        );
    }

    #[test]
    fn test_real_normalization() {
        assert_eq!(Term::real(2, 4), Term::Real(1, 2));
        assert_eq!(Term::real(1, -2), Term::Real(-1, 2));
        assert_eq!(Term::real(-6, -4), Term::Real(3, 2));
        assert_eq!(Term::real(0, 7), Term::Real(0, 1));
    }

    #[test]
    fn test_free_ids() {
        let t = Term::and([
            Term::id("a"),
            Term::exists(
                [Binder::new("x", Sort::Int)],
                Term::equals(Term::id("x"), Term::id("b")),
            ),
        ]);
        let ids = t.ids();
        assert!(ids.contains("a"));
        assert!(ids.contains("b"));
        assert!(!ids.contains("x"));
    }
}
