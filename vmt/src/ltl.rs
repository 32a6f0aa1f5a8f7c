// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Encode an LTL property into a liveness property over a tableau monitor.
//!
//! The encoding follows the classic tableau construction: the negated
//! property is normalized to the X/U (and past Y/S) core, a boolean state
//! variable is introduced for each elementary subformula, and a justice
//! monitor turns the until obligations into a single liveness condition.
//! The resulting model violates the liveness property at index 0 exactly
//! when the source model has a trace violating the LTL property.

use crate::model::{Model, ModelError, VarKind};
use crate::syntax::{BinOp, Sort, Term, UOp};
use crate::term::prime::Next;

/// Rewrite all LTL modalities into the X/U/Y/S core:
/// `F f = true U f`, `G f = !(true U !f)`, `f R g = !(!f U !g)`,
/// `O f = true S f`, `H f = !(true S !f)`.
pub fn rewrite(t: &Term) -> Term {
    match t {
        Term::Literal(_) | Term::Int(_) | Term::Real(_, _) | Term::BitVec(_, _) | Term::Id(_) => {
            t.clone()
        }
        Term::UnaryOp(op, arg) => {
            let arg = rewrite(arg);
            match op {
                UOp::Eventually => Term::until(Term::true_(), arg),
                UOp::Always => Term::not(Term::until(Term::true_(), Term::not(arg))),
                UOp::Once => Term::since(Term::true_(), arg),
                UOp::Historically => Term::not(Term::since(Term::true_(), Term::not(arg))),
                UOp::Not => Term::not(arg),
                _ => Term::UnaryOp(*op, Box::new(arg)),
            }
        }
        Term::BinOp(BinOp::Release, lhs, rhs) => Term::not(Term::until(
            Term::not(rewrite(lhs)),
            Term::not(rewrite(rhs)),
        )),
        Term::BinOp(op, lhs, rhs) => {
            Term::BinOp(*op, Box::new(rewrite(lhs)), Box::new(rewrite(rhs)))
        }
        Term::NAryOp(op, ts) => Term::NAryOp(*op, ts.iter().map(rewrite).collect()),
        Term::NumOp(op, lhs, rhs) => {
            Term::NumOp(*op, Box::new(rewrite(lhs)), Box::new(rewrite(rhs)))
        }
        Term::NumRel(rel, lhs, rhs) => {
            Term::NumRel(*rel, Box::new(rewrite(lhs)), Box::new(rewrite(rhs)))
        }
        Term::Ite { cond, then, else_ } => Term::Ite {
            cond: Box::new(rewrite(cond)),
            then: Box::new(rewrite(then)),
            else_: Box::new(rewrite(else_)),
        },
        Term::Quantified {
            quantifier,
            binders,
            body,
        } => Term::Quantified {
            quantifier: *quantifier,
            binders: binders.clone(),
            body: Box::new(rewrite(body)),
        },
    }
}

/// Collects the elementary subformulae of a rewritten formula and computes
/// their sat values. An elementary subformula is an `X f` or `Y f` node
/// (until and since contribute `X (f U g)` and `Y (f S g)`); each one is
/// represented in the monitor by a fresh boolean state variable.
struct Encoder<'a> {
    model: &'a Model,
    /// Elementary subformula to monitor variable, in discovery order.
    el_map: Vec<(Term, Term)>,
    counter: usize,
}

impl<'a> Encoder<'a> {
    fn new(model: &'a Model) -> Self {
        Self {
            model,
            el_map: vec![],
            counter: 0,
        }
    }

    /// A variable name not declared in the source model.
    fn fresh(&mut self, prefix: &str) -> Term {
        loop {
            let name = format!("{prefix}{}", self.counter);
            self.counter += 1;
            if self.model.get_var(&name).is_none() {
                return Term::id(&name);
            }
        }
    }

    fn el_var(&mut self, key: Term, prefix: &str) -> Term {
        if let Some((_, var)) = self.el_map.iter().find(|(k, _)| *k == key) {
            return var.clone();
        }
        let var = self.fresh(prefix);
        self.el_map.push((key, var.clone()));
        var
    }

    /// The sat value of a rewritten formula, registering the elementary
    /// subformulae on the way:
    /// `sat(X f) = el(X f)`, `sat(f U g) = sat(g) | (sat(f) & el(X(f U g)))`,
    /// and symmetrically for the past operators.
    fn sat(&mut self, t: &Term) -> Term {
        match t {
            Term::UnaryOp(UOp::Next, arg) => {
                self.sat(arg);
                self.el_var(t.clone(), "el_x_")
            }
            Term::UnaryOp(UOp::Previous, arg) => {
                self.sat(arg);
                self.el_var(t.clone(), "el_y_")
            }
            Term::BinOp(BinOp::Until, lhs, rhs) => {
                let sat_lhs = self.sat(lhs);
                let sat_rhs = self.sat(rhs);
                let var = self.el_var(Term::next(t.clone()), "el_u_");
                Term::or([sat_rhs, Term::and([sat_lhs, var])])
            }
            Term::BinOp(BinOp::Since, lhs, rhs) => {
                let sat_lhs = self.sat(lhs);
                let sat_rhs = self.sat(rhs);
                let var = self.el_var(Term::previous(t.clone()), "el_s_");
                Term::or([sat_rhs, Term::and([sat_lhs, var])])
            }
            Term::Literal(_)
            | Term::Int(_)
            | Term::Real(_, _)
            | Term::BitVec(_, _)
            | Term::Id(_) => t.clone(),
            Term::UnaryOp(UOp::Not, arg) => Term::not(self.sat(arg)),
            Term::UnaryOp(op, arg) => Term::UnaryOp(*op, Box::new(self.sat(arg))),
            Term::BinOp(op, lhs, rhs) => {
                Term::BinOp(*op, Box::new(self.sat(lhs)), Box::new(self.sat(rhs)))
            }
            Term::NAryOp(op, ts) => {
                Term::NAryOp(*op, ts.iter().map(|t| self.sat(t)).collect())
            }
            Term::NumOp(op, lhs, rhs) => {
                Term::NumOp(*op, Box::new(self.sat(lhs)), Box::new(self.sat(rhs)))
            }
            Term::NumRel(rel, lhs, rhs) => {
                Term::NumRel(*rel, Box::new(self.sat(lhs)), Box::new(self.sat(rhs)))
            }
            Term::Ite { cond, then, else_ } => Term::Ite {
                cond: Box::new(self.sat(cond)),
                then: Box::new(self.sat(then)),
                else_: Box::new(self.sat(else_)),
            },
            Term::Quantified {
                quantifier,
                binders,
                body,
            } => Term::Quantified {
                quantifier: *quantifier,
                binders: binders.clone(),
                body: Box::new(self.sat(body)),
            },
        }
    }
}

/// Fold a list of justice conditions into a single acceptance condition.
/// Each justice gets a latch variable that records whether it has held since
/// the last time all of them held together; the returned accept term is the
/// conjunction of the latches.
fn make_single_justice(
    justice: &[Term],
    enc: &mut Encoder,
) -> (Term, Vec<Term>, Vec<Term>, Vec<Term>) {
    let mut vars = vec![];
    let mut init = vec![];
    let mut trans = vec![];
    for _ in justice {
        let var = enc.fresh("J_");
        init.push(Term::iff(var.clone(), Term::false_()));
        vars.push(var);
    }
    let accept = Term::and(vars.iter().cloned());
    for (var, just) in vars.iter().zip(justice) {
        trans.push(Term::iff(
            Term::prime(var.clone()),
            Term::ite(
                accept.clone(),
                just.clone(),
                Term::or([just.clone(), var.clone()]),
            ),
        ));
    }
    (accept, vars, init, trans)
}

/// Encode the LTL property `formula` into `model`, returning a new model
/// that carries the tableau monitor for the negated property and a single
/// live property at index 0. The source model's properties are not copied.
pub fn encode(model: &Model, formula: &Term) -> Result<Model, ModelError> {
    let mut enc = Encoder::new(model);
    let rewritten = rewrite(&Term::not(formula.clone()));
    let init_sat = enc.sat(&rewritten);

    let mut out = Model::new();
    for s in model.sorts() {
        out.add_sort(s)?;
    }
    for v in model.vars() {
        match v.kind {
            VarKind::State => out.create_state_var(&v.name, v.sort.clone())?,
            VarKind::Input => out.create_input_var(&v.name, v.sort.clone())?,
        };
    }
    for t in model.init_constraints() {
        out.add_init(t.clone())?;
    }
    for t in model.trans_constraints() {
        out.add_trans(t.clone())?;
    }

    // declare every monitor variable before any constraint mentions one
    let el_map = enc.el_map.clone();
    for (_, var) in &el_map {
        if let Term::Id(name) = var {
            out.create_state_var(name, Sort::Bool)?;
        }
    }
    let mut justice = vec![];
    for (key, var) in &el_map {
        match key {
            // future case: the monitor variable predicts the sat value
            Term::UnaryOp(UOp::Next, inner) => {
                let sat = enc.sat(inner);
                out.add_trans(Term::iff(var.clone(), Next::prime(&sat)))?;
                if let Term::BinOp(BinOp::Until, _, rhs) = inner.as_ref() {
                    let sat_rhs = enc.sat(rhs);
                    justice.push(Term::or([Term::not(sat), sat_rhs]));
                }
            }
            // past case: the monitor variable records the sat value
            Term::UnaryOp(UOp::Previous, inner) => {
                let sat = enc.sat(inner);
                out.add_trans(Term::iff(Term::prime(var.clone()), sat))?;
            }
            _ => unreachable!("elementary subformulae are X or Y nodes"),
        }
    }
    out.add_init(init_sat)?;

    let (accept, vars, init, trans) = make_single_justice(&justice, &mut enc);
    for var in &vars {
        if let Term::Id(name) = var {
            out.create_state_var(name, Sort::Bool)?;
        }
    }
    for t in init {
        out.add_init(t)?;
    }
    for t in trans {
        out.add_trans(t)?;
    }
    out.add_live_property(Term::not(accept), None)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::PropertyType;

    #[test]
    fn test_rewrite() {
        let x = Term::id("x");
        let y = Term::id("y");
        let f = Term::and([&x, &y]);
        assert_eq!(rewrite(&Term::next(&f)), Term::next(&f));
        assert_eq!(rewrite(&Term::until(&x, &f)), Term::until(&x, &f));
        assert_eq!(
            rewrite(&Term::release(&x, &f)),
            Term::not(Term::until(Term::not(&x), Term::not(&f)))
        );
        assert_eq!(
            rewrite(&Term::eventually(&f)),
            Term::until(Term::true_(), &f)
        );
        assert_eq!(
            rewrite(&Term::always(&f)),
            Term::not(Term::until(Term::true_(), Term::not(&f)))
        );
        assert_eq!(rewrite(&Term::once(&x)), Term::since(Term::true_(), &x));
        assert_eq!(
            rewrite(&Term::historically(&x)),
            Term::not(Term::since(Term::true_(), Term::not(&x)))
        );
    }

    #[test]
    fn test_elementary_subformulae() {
        let x = Term::id("x");
        let y = Term::id("y");
        let z = Term::id("z");
        let el1 = Term::next(Term::and([&x, &y]));
        let el0 = Term::until(&x, &z);
        let f = Term::and([&el1, &el0]);

        let model = Model::new();
        let mut enc = Encoder::new(&model);
        enc.sat(&f);
        let keys: Vec<&Term> = enc.el_map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![&el1, &Term::next(&el0)]);

        let until_var = enc.el_map[1].1.clone();
        assert_eq!(
            enc.sat(&el0),
            Term::or([&z, &Term::and([&x, &until_var])])
        );
        assert_eq!(enc.sat(&Term::and([&x, &y])), Term::and([&x, &y]));
    }

    #[test]
    fn test_encode() {
        let mut model = Model::new();
        let x = model.create_state_var("x", Sort::Bool).unwrap();
        let y = model.create_state_var("y", Sort::Bool).unwrap();
        let z = model.create_state_var("z", Sort::Bool).unwrap();
        let f = Term::and([Term::next(Term::and([&x, &y])), Term::until(&x, &z)]);

        let encoded = encode(&model, &f).unwrap();
        assert!(encoded.is_state_var("el_x_0"));
        assert!(encoded.is_state_var("el_u_1"));
        assert!(encoded.is_state_var("J_2"));

        let el_x = Term::id("el_x_0");
        let el_u = Term::id("el_u_1");
        let j = Term::id("J_2");
        let sat_until = Term::or([&z, &Term::and([&x, &el_u])]);
        let justice = Term::or([Term::not(&sat_until), z.clone()]);
        assert_eq!(
            encoded.trans_constraints(),
            &[
                Term::iff(&el_x, Term::and([Term::prime(&x), Term::prime(&y)])),
                Term::iff(
                    &el_u,
                    Term::or([
                        Term::prime(&z),
                        Term::and([Term::prime(&x), Term::prime(&el_u)])
                    ])
                ),
                Term::iff(
                    Term::prime(&j),
                    Term::ite(&j, &justice, Term::or([&justice, &j]))
                ),
            ]
        );
        assert_eq!(
            encoded.init_constraints(),
            &[
                Term::not(Term::and([&el_x, &sat_until])),
                Term::iff(&j, Term::false_()),
            ]
        );
        let prop = encoded.get_property(0).unwrap();
        assert_eq!(prop.typ, PropertyType::Live);
        assert_eq!(prop.term, Term::not(&j));
    }

    #[test]
    fn test_encode_no_justice() {
        // a pure X property produces no until obligation, the acceptance
        // condition degenerates to true
        let mut model = Model::new();
        let x = model.create_state_var("x", Sort::Bool).unwrap();
        let encoded = encode(&model, &Term::next(&x)).unwrap();
        let prop = encoded.get_property(0).unwrap();
        assert_eq!(prop.typ, PropertyType::Live);
        assert_eq!(prop.term, Term::not(Term::true_()));
        assert_eq!(
            encoded.trans_constraints(),
            &[Term::iff(Term::id("el_x_0"), Term::prime(&x))]
        );
    }

    #[test]
    fn test_encode_past() {
        // H p rewrites to !(true S !p), the monitor latches the since value
        let mut model = Model::new();
        let p = model.create_state_var("p", Sort::Bool).unwrap();
        let encoded = encode(&model, &Term::historically(&p)).unwrap();
        assert!(encoded.is_state_var("el_s_0"));
        let el_s = Term::id("el_s_0");
        let sat_since = Term::or([
            Term::not(&p),
            Term::and([Term::true_(), el_s.clone()]),
        ]);
        assert_eq!(
            encoded.trans_constraints(),
            &[Term::iff(Term::prime(&el_s), sat_since.clone())]
        );
        assert_eq!(encoded.init_constraints(), &[sat_since]);
    }
}
