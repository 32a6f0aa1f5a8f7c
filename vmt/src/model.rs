// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! A symbolic transition system: variables, init and trans constraints, and
//! properties to verify.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::properties::{Property, PropertyType};
use crate::sorts::{sort_of, SortError};
use crate::syntax::{Sort, Term, UOp};
use crate::term::prime::Next;

/// Whether a variable is part of the state or an unconstrained input.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub enum VarKind {
    /// A state variable, with a current and a next version
    State,
    /// An input variable, chosen fresh at every step
    Input,
}

/// A declared variable of a model.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord)]
pub struct VarDecl {
    /// Variable name
    pub name: String,
    /// Variable sort
    pub sort: Sort,
    /// State or input
    pub kind: VarKind,
}

/// An error from constructing or extending a [`Model`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    /// A name declared twice
    #[error("{0} is already declared")]
    DuplicateDeclaration(String),
    /// A formula mentions a symbol the model does not declare
    #[error("undeclared symbol {0}")]
    UndeclaredSymbol(String),
    /// An input variable in an init constraint
    #[error("input variable {0} cannot be constrained by init")]
    InputInInit(String),
    /// A prime where none is allowed, a doubly-primed variable, or a primed
    /// input variable
    #[error("unexpected prime in formula")]
    UnexpectedPrime,
    /// An LTL operator outside an LTL property
    #[error("unexpected LTL operator in formula")]
    UnexpectedLtl,
    /// A constraint or property that is not boolean
    #[error("formula has sort {0}, expected bool")]
    NotBool(Sort),
    /// An explicitly chosen property index that is already taken
    #[error("property index {0} is already in use")]
    DuplicatePropertyIndex(usize),
    /// A property index that does not exist
    #[error("no property with index {0}")]
    PropertyNotFound(usize),
    /// A sort error inside a formula
    #[error("sort error: {0}")]
    Sort(#[from] SortError),
}

/// A symbolic transition system.
///
/// The state is a set of typed variables. Init constraints restrict
/// the initial states, trans constraints relate each state to its successor
/// (with primed variables referring to the successor), and properties pose
/// verification questions about the resulting traces.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Model {
    sorts: Vec<String>,
    vars: Vec<VarDecl>,
    init: Vec<Term>,
    trans: Vec<Term>,
    properties: BTreeMap<usize, Property>,
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an uninterpreted sort.
    pub fn add_sort(&mut self, name: &str) -> Result<Sort, ModelError> {
        if self.sorts.iter().any(|s| s == name) {
            return Err(ModelError::DuplicateDeclaration(name.to_string()));
        }
        self.sorts.push(name.to_string());
        Ok(Sort::uninterpreted(name))
    }

    fn declare(&mut self, name: &str, sort: Sort, kind: VarKind) -> Result<Term, ModelError> {
        if self.vars.iter().any(|v| v.name == name) {
            return Err(ModelError::DuplicateDeclaration(name.to_string()));
        }
        self.vars.push(VarDecl {
            name: name.to_string(),
            sort,
            kind,
        });
        Ok(Term::id(name))
    }

    /// Declare a state variable and return a term referring to it.
    pub fn create_state_var(&mut self, name: &str, sort: Sort) -> Result<Term, ModelError> {
        self.declare(name, sort, VarKind::State)
    }

    /// Declare an input variable and return a term referring to it.
    pub fn create_input_var(&mut self, name: &str, sort: Sort) -> Result<Term, ModelError> {
        self.declare(name, sort, VarKind::Input)
    }

    /// Declare a state variable that never changes, adding the trans
    /// constraint `name' = name`.
    pub fn create_frozen_var(&mut self, name: &str, sort: Sort) -> Result<Term, ModelError> {
        let v = self.create_state_var(name, sort)?;
        self.trans.push(Term::equals(Term::prime(&v), &v));
        Ok(v)
    }

    /// The term referring to `t` in the successor state.
    pub fn next(&self, t: &Term) -> Term {
        Term::prime(t)
    }

    /// Look up the declaration of a variable.
    pub fn get_var(&self, name: &str) -> Option<&VarDecl> {
        self.vars.iter().find(|v| v.name == name)
    }

    /// Return true if `name` is a declared state variable.
    pub fn is_state_var(&self, name: &str) -> bool {
        self.get_var(name).is_some_and(|v| v.kind == VarKind::State)
    }

    /// Return true if `name` is a declared input variable.
    pub fn is_input_var(&self, name: &str) -> bool {
        self.get_var(name).is_some_and(|v| v.kind == VarKind::Input)
    }

    /// All declared variables, in declaration order.
    pub fn vars(&self) -> &[VarDecl] {
        &self.vars
    }

    /// The declared state variables, in declaration order.
    pub fn state_vars(&self) -> impl Iterator<Item = &VarDecl> {
        self.vars.iter().filter(|v| v.kind == VarKind::State)
    }

    /// The declared input variables, in declaration order.
    pub fn input_vars(&self) -> impl Iterator<Item = &VarDecl> {
        self.vars.iter().filter(|v| v.kind == VarKind::Input)
    }

    /// The declared uninterpreted sorts.
    pub fn sorts(&self) -> &[String] {
        &self.sorts
    }

    /// The init constraints added so far.
    pub fn init_constraints(&self) -> &[Term] {
        &self.init
    }

    /// The trans constraints added so far.
    pub fn trans_constraints(&self) -> &[Term] {
        &self.trans
    }

    /// The conjunction of all init constraints (`true` when there are none).
    pub fn init_constraint(&self) -> Term {
        Term::and(self.init.iter().cloned())
    }

    /// The conjunction of all trans constraints (`true` when there are none).
    pub fn trans_constraint(&self) -> Term {
        Term::and(self.trans.iter().cloned())
    }

    fn check_declared(&self, t: &Term) -> Result<(), ModelError> {
        for id in t.ids() {
            if self.get_var(&id).is_none() {
                return Err(ModelError::UndeclaredSymbol(id));
            }
        }
        Ok(())
    }

    /// Primed subterms may only be single primes directly over state
    /// variables (possibly via compound terms, checked after normalization).
    fn check_primes(&self, t: &Term) -> Result<(), ModelError> {
        fn go(m: &Model, t: &Term, primes: usize) -> Result<(), ModelError> {
            match t {
                Term::UnaryOp(UOp::Prime, t) => {
                    if primes >= 1 {
                        return Err(ModelError::UnexpectedPrime);
                    }
                    go(m, t, primes + 1)
                }
                Term::Id(s) => {
                    if primes > 0 && !m.is_state_var(s) && m.get_var(s).is_some() {
                        return Err(ModelError::UnexpectedPrime);
                    }
                    Ok(())
                }
                Term::Literal(_) | Term::Int(_) | Term::Real(_, _) | Term::BitVec(_, _) => Ok(()),
                Term::UnaryOp(_, t) => go(m, t, primes),
                Term::BinOp(_, lhs, rhs)
                | Term::NumOp(_, lhs, rhs)
                | Term::NumRel(_, lhs, rhs) => {
                    go(m, lhs, primes)?;
                    go(m, rhs, primes)
                }
                Term::NAryOp(_, ts) => ts.iter().try_for_each(|t| go(m, t, primes)),
                Term::Ite { cond, then, else_ } => {
                    go(m, cond, primes)?;
                    go(m, then, primes)?;
                    go(m, else_, primes)
                }
                Term::Quantified { body, .. } => go(m, body, primes),
            }
        }
        go(self, t, 0)
    }

    fn check_bool(&self, t: &Term) -> Result<(), ModelError> {
        let context = |name: &str| self.get_var(name).map(|v| v.sort.clone());
        let sort = sort_of(t, &context)?;
        if sort != Sort::Bool {
            return Err(ModelError::NotBool(sort));
        }
        Ok(())
    }

    /// Add an init constraint. The formula must be boolean over current-state
    /// variables only: no inputs, no primes, no LTL.
    pub fn add_init(&mut self, t: Term) -> Result<(), ModelError> {
        self.check_declared(&t)?;
        for id in t.ids() {
            if self.is_input_var(&id) {
                return Err(ModelError::InputInInit(id));
            }
        }
        if Next::has_prime(&t) {
            return Err(ModelError::UnexpectedPrime);
        }
        if t.has_ltl() {
            return Err(ModelError::UnexpectedLtl);
        }
        self.check_bool(&t)?;
        self.init.push(t);
        Ok(())
    }

    /// Add a trans constraint. The formula must be boolean, LTL-free, and may
    /// prime state variables at most once.
    pub fn add_trans(&mut self, t: Term) -> Result<(), ModelError> {
        self.check_declared(&t)?;
        if t.has_ltl() {
            return Err(ModelError::UnexpectedLtl);
        }
        self.check_primes(&t)?;
        self.check_bool(&t)?;
        self.trans.push(t);
        Ok(())
    }

    /// Constrain a formula to hold in every state: adds it as an init
    /// constraint and adds `t & t'` as a trans constraint.
    pub fn add_invar(&mut self, t: Term) -> Result<(), ModelError> {
        self.add_init(t.clone())?;
        let primed = Next::prime(&t);
        self.add_trans(Term::and([t, primed]))
    }

    /// Add a property of the given kind. When `idx` is None the smallest free
    /// index is used; an explicit index that is taken is an error. Returns the
    /// index the property got.
    pub fn add_property(
        &mut self,
        typ: PropertyType,
        t: Term,
        idx: Option<usize>,
    ) -> Result<usize, ModelError> {
        self.check_declared(&t)?;
        if typ != PropertyType::Ltl && t.has_ltl() {
            return Err(ModelError::UnexpectedLtl);
        }
        self.check_primes(&t)?;
        self.check_bool(&t)?;
        let idx = match idx {
            Some(idx) => {
                if self.properties.contains_key(&idx) {
                    return Err(ModelError::DuplicatePropertyIndex(idx));
                }
                idx
            }
            None => (0..)
                .find(|i| !self.properties.contains_key(i))
                .unwrap(),
        };
        self.properties.insert(idx, Property::new(typ, t));
        Ok(idx)
    }

    /// Add an invariant property; see [`Self::add_property`].
    pub fn add_invar_property(&mut self, t: Term, idx: Option<usize>) -> Result<usize, ModelError> {
        self.add_property(PropertyType::Invar, t, idx)
    }

    /// Add a liveness property; see [`Self::add_property`].
    pub fn add_live_property(&mut self, t: Term, idx: Option<usize>) -> Result<usize, ModelError> {
        self.add_property(PropertyType::Live, t, idx)
    }

    /// Add an LTL property; see [`Self::add_property`].
    pub fn add_ltl_property(&mut self, t: Term, idx: Option<usize>) -> Result<usize, ModelError> {
        self.add_property(PropertyType::Ltl, t, idx)
    }

    /// Look up a property by index.
    pub fn get_property(&self, idx: usize) -> Result<&Property, ModelError> {
        self.properties
            .get(&idx)
            .ok_or(ModelError::PropertyNotFound(idx))
    }

    /// All properties, ordered by index.
    pub fn properties(&self) -> impl Iterator<Item = (usize, &Property)> {
        self.properties.iter().map(|(idx, p)| (*idx, p))
    }

    /// The properties of one kind, ordered by index.
    pub fn properties_of_type(
        &self,
        typ: PropertyType,
    ) -> impl Iterator<Item = (usize, &Property)> {
        self.properties().filter(move |(_, p)| p.typ == typ)
    }

    /// Return true if any property is an LTL property.
    pub fn has_ltl_properties(&self) -> bool {
        self.properties.values().any(Property::is_ltl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::NumOp::*;
    use crate::syntax::NumRel::*;

    fn counter_model() -> (Model, Term) {
        let mut m = Model::new();
        let x = m.create_state_var("x", Sort::Int).unwrap();
        m.add_init(Term::equals(&x, Term::int(0))).unwrap();
        m.add_trans(Term::equals(
            m.next(&x),
            Term::num_op(Add, &x, Term::int(1)),
        ))
        .unwrap();
        (m, x)
    }

    #[test]
    fn test_create_vars() {
        let mut m = Model::new();
        let x = m.create_state_var("x", Sort::Int).unwrap();
        assert_eq!(x, Term::id("x"));
        m.create_input_var("a", Sort::Bool).unwrap();
        assert!(m.is_state_var("x"));
        assert!(m.is_input_var("a"));
        assert!(!m.is_state_var("a"));
        assert_eq!(
            m.create_state_var("x", Sort::Bool),
            Err(ModelError::DuplicateDeclaration("x".to_string()))
        );
        assert_eq!(
            m.create_input_var("x", Sort::Bool),
            Err(ModelError::DuplicateDeclaration("x".to_string()))
        );
    }

    #[test]
    fn test_frozen_var() {
        let mut m = Model::new();
        let c = m.create_frozen_var("c", Sort::Int).unwrap();
        assert_eq!(
            m.trans_constraints(),
            &[Term::equals(Term::prime(&c), &c)]
        );
    }

    #[test]
    fn test_add_init_checks() {
        let mut m = Model::new();
        let x = m.create_state_var("x", Sort::Int).unwrap();
        let a = m.create_input_var("a", Sort::Bool).unwrap();
        assert_eq!(
            m.add_init(Term::equals(Term::id("z"), Term::int(0))),
            Err(ModelError::UndeclaredSymbol("z".to_string()))
        );
        assert_eq!(
            m.add_init(a.clone()),
            Err(ModelError::InputInInit("a".to_string()))
        );
        assert_eq!(
            m.add_init(Term::equals(Term::prime(&x), Term::int(0))),
            Err(ModelError::UnexpectedPrime)
        );
        assert_eq!(
            m.add_init(Term::always(Term::equals(&x, Term::int(0)))),
            Err(ModelError::UnexpectedLtl)
        );
        assert_eq!(m.add_init(x.clone()), Err(ModelError::NotBool(Sort::Int)));
        assert_eq!(m.init_constraints().len(), 0);
    }

    #[test]
    fn test_add_trans_checks() {
        let mut m = Model::new();
        let x = m.create_state_var("x", Sort::Int).unwrap();
        let a = m.create_input_var("a", Sort::Bool).unwrap();
        // inputs are allowed unprimed in trans
        m.add_trans(Term::implies(&a, Term::equals(m.next(&x), &x)))
            .unwrap();
        assert_eq!(
            m.add_trans(Term::prime(&a)),
            Err(ModelError::UnexpectedPrime)
        );
        assert_eq!(
            m.add_trans(Term::equals(Term::prime(Term::prime(&x)), &x)),
            Err(ModelError::UnexpectedPrime)
        );
        assert_eq!(
            m.add_trans(Term::eventually(Term::equals(&x, Term::int(0)))),
            Err(ModelError::UnexpectedLtl)
        );
    }

    #[test]
    fn test_add_invar() {
        let mut m = Model::new();
        let x = m.create_state_var("x", Sort::Int).unwrap();
        let f = Term::num_rel(Leq, Term::int(0), &x);
        m.add_invar(f.clone()).unwrap();
        assert_eq!(m.init_constraints(), &[f.clone()]);
        assert_eq!(
            m.trans_constraints(),
            &[Term::and([
                f.clone(),
                Term::num_rel(Leq, Term::int(0), Term::prime(&x))
            ])]
        );
    }

    #[test]
    fn test_properties() {
        let (mut m, x) = counter_model();
        let safe = Term::num_rel(Leq, Term::int(0), &x);
        let idx0 = m.add_invar_property(safe.clone(), None).unwrap();
        assert_eq!(idx0, 0);
        let idx5 = m
            .add_live_property(Term::eventually(Term::equals(&x, Term::int(5))), Some(5));
        // liveness properties must be LTL-free
        assert_eq!(idx5, Err(ModelError::UnexpectedLtl));
        let idx5 = m
            .add_live_property(Term::equals(&x, Term::int(5)), Some(5))
            .unwrap();
        assert_eq!(idx5, 5);
        // the next free index is chosen automatically
        let idx1 = m
            .add_ltl_property(Term::always(safe.clone()), None)
            .unwrap();
        assert_eq!(idx1, 1);
        assert_eq!(
            m.add_invar_property(safe.clone(), Some(5)),
            Err(ModelError::DuplicatePropertyIndex(5))
        );
        assert_eq!(m.get_property(0).unwrap().term, safe);
        assert_eq!(
            m.get_property(7),
            Err(ModelError::PropertyNotFound(7))
        );
        assert!(m.has_ltl_properties());
    }

    #[test]
    fn test_hr_dump() {
        let (mut m, x) = counter_model();
        m.create_input_var("a", Sort::Bool).unwrap();
        m.add_invar_property(Term::num_rel(Leq, Term::int(0), &x), None)
            .unwrap();
        insta::assert_display_snapshot!(m, @r###"
        --- State variables ---
        int x

        --- Input variables ---
        bool a

        --- Init constraints ---
        x = 0

        --- Trans constraints ---
        x' = x + 1

        --- Properties ---
        0) invar: 0 <= x
        "###);
    }
}
