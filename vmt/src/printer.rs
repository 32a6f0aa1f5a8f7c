// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! A human-readable pretty printer for terms and models.

use std::fmt;

use crate::model::{Model, VarKind};
use crate::properties::PropertyType;
use crate::syntax::*;

fn precedence(t: &Term) -> usize {
    use crate::syntax::{BinOp::*, NOp::*, NumOp::*, Quantifier::*, Term::*, UOp::*};

    match t {
        Quantified {
            quantifier: Forall | Exists,
            ..
        } => 0,
        BinOp(Implies | Iff, _, _) => 10,
        UnaryOp(Always | Eventually | Historically | Once, _) => 20,
        Ite { .. } => 30,
        NAryOp(Or, _) => 40,
        NAryOp(And, _) => 50,
        BinOp(Until | Release | Since, _, _) => 52,
        UnaryOp(Next | Previous, _) => 54,
        BinOp(Equals | NotEquals, _, _) | NumRel(_, _, _) => 60,
        NumOp(Add | Sub, _, _) => 62,
        NumOp(Mul | Div, _, _) => 64,
        UnaryOp(Not, _) => 70,
        UnaryOp(Prime, _) => 80,
        Literal(_) | Int(_) | Real(_, _) | BitVec(_, _) | Id(_) => 1000,
    }
}

fn parens(add_parens: bool, s: String) -> String {
    if add_parens {
        format!("({s})")
    } else {
        s
    }
}

fn right_associative(op: &BinOp) -> bool {
    matches!(
        op,
        BinOp::Implies | BinOp::Since | BinOp::Until | BinOp::Release
    )
}

fn left_associative(_op: &BinOp) -> bool {
    false
}

fn binder(b: &Binder) -> String {
    format!("{}:{}", b.name, b.sort)
}

/// Print a term with no unnecessary parentheses.
pub fn term(t: &Term) -> String {
    // handling of precedence is based on
    // https://stackoverflow.com/questions/6277747/pretty-print-expression-with-as-few-parentheses-as-possible
    match t {
        Term::Literal(false) => "false".to_string(),
        Term::Literal(true) => "true".to_string(),
        Term::Int(i) => i.to_string(),
        Term::Real(num, den) => {
            if *den == 1 {
                format!("{num}.0")
            } else {
                format!("{num}/{den}")
            }
        }
        Term::BitVec(value, width) => format!("{value}_{width}"),
        Term::Id(i) => i.to_string(),
        Term::UnaryOp(op, arg) => {
            let arg = parens(precedence(t) > precedence(arg), term(arg));
            match op {
                UOp::Not => format!("!{arg}"),
                UOp::Prime => format!("{arg}'"),
                UOp::Always => format!("always {arg}"),
                UOp::Eventually => format!("eventually {arg}"),
                UOp::Next => format!("X {arg}"),
                UOp::Historically => format!("H {arg}"),
                UOp::Once => format!("O {arg}"),
                UOp::Previous => format!("X^-1 {arg}"),
            }
        }
        Term::BinOp(op, arg1, arg2) => {
            let use_left_paren = precedence(t) > precedence(arg1)
                || (precedence(t) == precedence(arg1) && right_associative(op));
            let use_right_paren = precedence(t) > precedence(arg2)
                || (precedence(t) == precedence(arg2) && left_associative(op));
            let left = parens(use_left_paren, term(arg1));
            let right = parens(use_right_paren, term(arg2));
            let op = match op {
                BinOp::Equals => "=",
                BinOp::NotEquals => "!=",
                BinOp::Implies => "->",
                BinOp::Iff => "<->",
                BinOp::Until => "until",
                BinOp::Release => "release",
                BinOp::Since => "since",
            };
            format!("{left} {op} {right}")
        }
        Term::NAryOp(op, args) => {
            let args = args
                .iter()
                .map(|arg| parens(precedence(t) > precedence(arg), term(arg)))
                .collect::<Vec<_>>();
            let op = match op {
                NOp::And => "&",
                NOp::Or => "|",
            };
            args.join(&format!(" {op} "))
        }
        Term::NumOp(op, arg1, arg2) => {
            // numeric operators are left associative
            let left = parens(precedence(t) > precedence(arg1), term(arg1));
            let right = parens(precedence(t) >= precedence(arg2), term(arg2));
            let op = match op {
                NumOp::Add => "+",
                NumOp::Sub => "-",
                NumOp::Mul => "*",
                NumOp::Div => "/",
            };
            format!("{left} {op} {right}")
        }
        Term::NumRel(rel, arg1, arg2) => {
            let left = parens(precedence(t) >= precedence(arg1), term(arg1));
            let right = parens(precedence(t) >= precedence(arg2), term(arg2));
            let rel = match rel {
                NumRel::Lt => "<",
                NumRel::Leq => "<=",
                NumRel::Geq => ">=",
                NumRel::Gt => ">",
            };
            format!("{left} {rel} {right}")
        }
        Term::Ite { cond, then, else_ } => {
            let cond = term(cond);
            let then = parens(precedence(t) >= precedence(then), term(then));
            let else_ = parens(precedence(t) > precedence(else_), term(else_));
            format!("if {cond} then {then} else {else_}")
        }
        Term::Quantified {
            quantifier,
            binders,
            body,
        } => {
            let quantifier = match quantifier {
                Quantifier::Forall => "forall",
                Quantifier::Exists => "exists",
            };
            let binders = binders.iter().map(binder).collect::<Vec<_>>().join(", ");
            format!("{quantifier} {binders}. {}", term(body))
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", term(self))
    }
}

fn property_type(typ: &PropertyType) -> &'static str {
    match typ {
        PropertyType::Invar => "invar",
        PropertyType::Live => "live",
        PropertyType::Ltl => "ltl",
    }
}

fn model(m: &Model) -> String {
    let mut out = String::new();
    out.push_str("--- State variables ---\n");
    for v in m.vars() {
        if v.kind == VarKind::State {
            out.push_str(&format!("{} {}\n", v.sort, v.name));
        }
    }
    out.push_str("\n--- Input variables ---\n");
    for v in m.vars() {
        if v.kind == VarKind::Input {
            out.push_str(&format!("{} {}\n", v.sort, v.name));
        }
    }
    out.push_str("\n--- Init constraints ---\n");
    for t in m.init_constraints() {
        out.push_str(&format!("{}\n", term(t)));
    }
    out.push_str("\n--- Trans constraints ---\n");
    for t in m.trans_constraints() {
        out.push_str(&format!("{}\n", term(t)));
    }
    out.push_str("\n--- Properties ---\n");
    for (idx, prop) in m.properties() {
        out.push_str(&format!(
            "{idx}) {}: {}\n",
            property_type(&prop.typ),
            term(&prop.term)
        ));
    }
    out
}

/// Print a model in a human-readable overview format, listing variables,
/// constraints, and properties in separate sections.
pub fn fmt(m: &Model) -> String {
    model(m)
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", model(self))
    }
}
