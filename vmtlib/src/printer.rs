// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Serialize a model to the VMT-LIB format.
//!
//! The output is a plain SMT-LIB script that declares every variable of the
//! model, pairs current and next state variables with `:next` definitions,
//! and marks constraints and properties with the VMT-LIB annotations. The
//! script ends with `(assert true)` so that it is well formed for an SMT
//! solver that knows nothing about the annotations.

use std::collections::HashMap;

use crate::annotations::Annotation;
use crate::sexp::{app, atom_i, atom_s, sexp_l, Sexp};
use vmt::model::{Model, ModelError};
use vmt::properties::{Property, PropertyType};
use vmt::syntax::{BinOp, NOp, NumOp, NumRel, Quantifier, Sort, Term, UOp};
use vmt::term::prime::Next;

/// Convert a sort to its SMT-LIB rendering.
pub fn sort_to_sexp(sort: &Sort) -> Sexp {
    match sort {
        Sort::Bool => atom_s("Bool"),
        Sort::Int => atom_s("Int"),
        Sort::Real => atom_s("Real"),
        Sort::BitVec(width) => app("_", [atom_s("BitVec"), atom_i(*width as i64)]),
        Sort::Uninterpreted(name) => atom_s(name),
    }
}

/// Convert a term to SMT-LIB. Primed state variables are printed with the
/// next-state names given in `next_names`; the term may prime state variables
/// at most once, as enforced by [`Model`].
pub fn term_to_sexp(t: &Term, next_names: &HashMap<String, String>) -> Sexp {
    let t = Next::normalize(t);
    go(&t, next_names)
}

fn go(t: &Term, next_names: &HashMap<String, String>) -> Sexp {
    let unary = |head: &str, arg: &Term| app(head, [go(arg, next_names)]);
    let binary = |head: &str, lhs: &Term, rhs: &Term| {
        app(head, [go(lhs, next_names), go(rhs, next_names)])
    };
    match t {
        Term::Literal(true) => atom_s("true"),
        Term::Literal(false) => atom_s("false"),
        Term::Int(i) => int_to_sexp(*i),
        Term::Real(num, den) => {
            let magnitude = if *den == 1 {
                atom_s(format!("{}.0", num.unsigned_abs()))
            } else {
                app("/", [atom_i(num.unsigned_abs() as i64), atom_i(*den as i64)])
            };
            if *num < 0 {
                app("-", [magnitude])
            } else {
                magnitude
            }
        }
        Term::BitVec(value, width) => app(
            "_",
            [atom_s(format!("bv{value}")), atom_i(*width as i64)],
        ),
        Term::Id(name) => atom_s(name),
        Term::UnaryOp(UOp::Prime, arg) => match arg.as_ref() {
            Term::Id(name) => match next_names.get(name) {
                Some(next) => atom_s(next),
                None => panic!("primed variable {name} is not a state variable"),
            },
            _ => panic!("prime left on a non-variable after normalization"),
        },
        Term::UnaryOp(UOp::Not, arg) => unary("not", arg),
        Term::UnaryOp(UOp::Always, arg) => unary("ltl.G", arg),
        Term::UnaryOp(UOp::Eventually, arg) => unary("ltl.F", arg),
        Term::UnaryOp(UOp::Next, arg) => unary("ltl.X", arg),
        Term::UnaryOp(UOp::Historically, arg) => unary("ltl.H", arg),
        Term::UnaryOp(UOp::Once, arg) => unary("ltl.O", arg),
        Term::UnaryOp(UOp::Previous, arg) => unary("ltl.Y", arg),
        Term::BinOp(BinOp::Equals, lhs, rhs) => binary("=", lhs, rhs),
        Term::BinOp(BinOp::NotEquals, lhs, rhs) => app("not", [binary("=", lhs, rhs)]),
        Term::BinOp(BinOp::Implies, lhs, rhs) => binary("=>", lhs, rhs),
        // boolean equality serves as iff
        Term::BinOp(BinOp::Iff, lhs, rhs) => binary("=", lhs, rhs),
        Term::BinOp(BinOp::Until, lhs, rhs) => binary("ltl.U", lhs, rhs),
        // release has no VMT-LIB rendering of its own
        Term::BinOp(BinOp::Release, lhs, rhs) => go(
            &Term::not(Term::until(Term::not(lhs.as_ref()), Term::not(rhs.as_ref()))),
            next_names,
        ),
        Term::BinOp(BinOp::Since, lhs, rhs) => binary("ltl.S", lhs, rhs),
        Term::NAryOp(op, ts) => {
            let head = match op {
                NOp::And => "and",
                NOp::Or => "or",
            };
            app(head, ts.iter().map(|t| go(t, next_names)))
        }
        Term::NumOp(op, lhs, rhs) => {
            let head = match op {
                NumOp::Add => "+",
                NumOp::Sub => "-",
                NumOp::Mul => "*",
                NumOp::Div => "/",
            };
            binary(head, lhs, rhs)
        }
        Term::NumRel(rel, lhs, rhs) => {
            let head = match rel {
                NumRel::Lt => "<",
                NumRel::Leq => "<=",
                NumRel::Geq => ">=",
                NumRel::Gt => ">",
            };
            binary(head, lhs, rhs)
        }
        Term::Ite { cond, then, else_ } => app(
            "ite",
            [
                go(cond, next_names),
                go(then, next_names),
                go(else_, next_names),
            ],
        ),
        Term::Quantified {
            quantifier,
            binders,
            body,
        } => {
            let head = match quantifier {
                Quantifier::Forall => "forall",
                Quantifier::Exists => "exists",
            };
            let binders = sexp_l(binders.iter().map(|b| {
                sexp_l([atom_s(&b.name), sort_to_sexp(&b.sort)])
            }));
            app(head, [binders, go(body, next_names)])
        }
    }
}

fn int_to_sexp(i: i64) -> Sexp {
    if i < 0 {
        app("-", [atom_i(-i)])
    } else {
        atom_i(i)
    }
}

/// Choose fresh next-state names for every state variable. The names follow
/// the `{name}.__next{counter}` template, skipping any name the model already
/// declares.
pub fn next_names(model: &Model) -> HashMap<String, String> {
    let mut names = HashMap::new();
    let mut counter = 0;
    for v in model.state_vars() {
        let next = loop {
            let candidate = format!("{}.__next{counter}", v.name);
            counter += 1;
            if model.get_var(&candidate).is_none() {
                break candidate;
            }
        };
        names.insert(v.name.clone(), next);
    }
    names
}

fn declare_fun(name: &str, sort: &Sort) -> Sexp {
    app(
        "declare-fun",
        [atom_s(name), sexp_l([]), sort_to_sexp(sort)],
    )
}

fn define_fun(name: &str, sort: Sexp, body: Sexp) -> Sexp {
    app("define-fun", [atom_s(name), sexp_l([]), sort, body])
}

fn annotated(body: Sexp, annotation: &Annotation) -> Sexp {
    let value = match annotation {
        Annotation::Next(name) => atom_s(name),
        Annotation::Init | Annotation::Trans => atom_s("true"),
        Annotation::InvarProperty(idx)
        | Annotation::LiveProperty(idx)
        | Annotation::LtlProperty(idx) => atom_i(*idx as i64),
    };
    app("!", [body, atom_s(annotation.key()), value])
}

fn script_inner(model: &Model, properties: &[(usize, &Property)]) -> Vec<Sexp> {
    let next = next_names(model);
    let mut out = vec![];
    for s in model.sorts() {
        out.push(app("declare-sort", [atom_s(s), atom_i(0)]));
    }
    for v in model.input_vars() {
        out.push(declare_fun(&v.name, &v.sort));
    }
    for v in model.state_vars() {
        out.push(declare_fun(&v.name, &v.sort));
        out.push(declare_fun(&next[&v.name], &v.sort));
    }
    for (j, v) in model.state_vars().enumerate() {
        out.push(define_fun(
            &format!("next{j}"),
            sort_to_sexp(&v.sort),
            annotated(atom_s(&v.name), &Annotation::Next(next[&v.name].clone())),
        ));
    }
    for (j, t) in model.init_constraints().iter().enumerate() {
        out.push(define_fun(
            &format!("init{j}"),
            atom_s("Bool"),
            annotated(term_to_sexp(t, &next), &Annotation::Init),
        ));
    }
    for (j, t) in model.trans_constraints().iter().enumerate() {
        out.push(define_fun(
            &format!("trans{j}"),
            atom_s("Bool"),
            annotated(term_to_sexp(t, &next), &Annotation::Trans),
        ));
    }
    let mut kind_counters: HashMap<PropertyType, usize> = HashMap::new();
    for (idx, p) in properties {
        let seq = kind_counters.entry(p.typ).or_insert(0);
        let annotation = Annotation::property(p.typ, *idx);
        // drop the leading colon of the keyword for the definition name
        let name = format!("{}{seq}", &annotation.key()[1..]);
        *seq += 1;
        out.push(define_fun(
            &name,
            atom_s("Bool"),
            annotated(term_to_sexp(&p.term, &next), &annotation),
        ));
    }
    out.push(app("assert", [atom_s("true")]));
    out
}

/// Serialize a model with all of its properties.
pub fn script(model: &Model) -> Vec<Sexp> {
    let properties: Vec<_> = model.properties().collect();
    script_inner(model, &properties)
}

/// Serialize a model with a single property, re-indexed to 0. This is the
/// form most model checkers expect when asked about one property.
pub fn script_with_property(model: &Model, idx: usize) -> Result<Vec<Sexp>, ModelError> {
    let p = model.get_property(idx)?;
    Ok(script_inner(model, &[(0, p)]))
}

/// Serialize a model to a VMT-LIB string, one command per line.
pub fn model_to_string(model: &Model) -> String {
    let mut out = String::new();
    for s in script(model) {
        out.push_str(&s.to_string());
        out.push('\n');
    }
    out
}

/// Serialize a model with only the property `idx`, re-indexed to 0.
pub fn model_to_string_with_property(model: &Model, idx: usize) -> Result<String, ModelError> {
    let mut out = String::new();
    for s in script_with_property(model, idx)? {
        out.push_str(&s.to_string());
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmt::syntax::NumOp::*;
    use vmt::syntax::NumRel::*;

    #[test]
    fn test_serialize_counter() {
        let mut m = Model::new();
        let x = m.create_state_var("x", Sort::Int).unwrap();
        m.create_input_var("a", Sort::Bool).unwrap();
        m.add_init(Term::equals(&x, Term::int(0))).unwrap();
        m.add_trans(Term::equals(
            Term::prime(&x),
            Term::num_op(Add, &x, Term::int(1)),
        ))
        .unwrap();
        m.add_invar_property(Term::num_rel(Leq, Term::int(0), &x), None)
            .unwrap();
        m.add_ltl_property(
            Term::until(
                Term::num_rel(Leq, &x, Term::prime(&x)),
                Term::num_rel(Leq, Term::int(0), &x),
            ),
            Some(1),
        )
        .unwrap();
        insta::assert_snapshot!(model_to_string(&m), @r###"
        (declare-fun a () Bool)
        (declare-fun x () Int)
        (declare-fun x.__next0 () Int)
        (define-fun next0 () Int (! x :next x.__next0))
        (define-fun init0 () Bool (! (= x 0) :init true))
        (define-fun trans0 () Bool (! (= x.__next0 (+ x 1)) :trans true))
        (define-fun invar-property0 () Bool (! (<= 0 x) :invar-property 0))
        (define-fun ltl-property0 () Bool (! (ltl.U (<= x x.__next0) (<= 0 x)) :ltl-property 1))
        (assert true)
        "###);
    }

    #[test]
    fn test_serialize_single_property() {
        let mut m = Model::new();
        let x = m.create_state_var("x", Sort::Int).unwrap();
        m.add_init(Term::equals(&x, Term::int(0))).unwrap();
        m.add_invar_property(Term::num_rel(Geq, &x, Term::int(0)), Some(3))
            .unwrap();
        let s = model_to_string_with_property(&m, 3).unwrap();
        assert!(s.contains(":invar-property 0"));
        assert!(!s.contains(":invar-property 3"));
        assert_eq!(
            model_to_string_with_property(&m, 0),
            Err(ModelError::PropertyNotFound(0))
        );
    }

    #[test]
    fn test_serialize_sorts_and_constants() {
        let mut m = Model::new();
        let v = m.create_state_var("v", Sort::BitVec(16)).unwrap();
        let r = m.create_state_var("r", Sort::Real).unwrap();
        m.add_init(Term::equals(&v, Term::bitvec(30, 16))).unwrap();
        m.add_init(Term::equals(&r, Term::real(1, 100))).unwrap();
        let s = model_to_string(&m);
        assert!(s.contains("(declare-fun v () (_ BitVec 16))"));
        assert!(s.contains("(= v (_ bv30 16))"));
        assert!(s.contains("(= r (/ 1 100))"));
    }

    #[test]
    fn test_next_name_collision() {
        let mut m = Model::new();
        m.create_state_var("x", Sort::Int).unwrap();
        m.create_state_var("x.__next0", Sort::Int).unwrap();
        let names = next_names(&m);
        assert_eq!(names["x"], "x.__next1".to_string());
        assert_ne!(names["x.__next0"], names["x"]);
    }

    #[test]
    fn test_release_rewrite() {
        let next = HashMap::new();
        let t = Term::release(Term::id("a"), Term::id("b"));
        assert_eq!(
            term_to_sexp(&t, &next).to_string(),
            "(not (ltl.U (not a) (not b)))"
        );
    }
}
