// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Parse a VMT-LIB script back into a [`Model`].
//!
//! The reader accepts SMT-LIB scripts whose annotated definitions follow the
//! VMT-LIB conventions. Plain (non-annotated) definitions are treated as
//! macros and inlined into every formula that mentions them, and `let`
//! bindings are inlined the same way, so the resulting model only ever
//! mentions declared variables.

use std::collections::HashMap;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use peg::str::LineCol;
use thiserror::Error;

use crate::annotations::{Annotation, AnnotationError};
use crate::sexp::{self, Sexp};
use vmt::model::{Model, ModelError};
use vmt::properties::PropertyType;
use vmt::syntax::{Binder, NumOp, NumRel, Quantifier, Sort, Term};

/// An error from reading a VMT-LIB script
#[derive(Error, Debug)]
pub enum ReaderError {
    /// The script is not a sequence of well-formed s-expressions
    #[error("parse error: {0}")]
    Parse(#[from] peg::error::ParseError<LineCol>),
    /// A command the reader does not recognize
    #[error("unknown command {0}")]
    UnknownCommand(String),
    /// A recognized command with the wrong shape
    #[error("malformed command: {0}")]
    MalformedCommand(String),
    /// A declaration or definition with parameters
    #[error("{0} takes arguments, only nullary symbols are supported")]
    FunctionsUnsupported(String),
    /// A sort that is neither built in nor declared
    #[error("unknown sort {0}")]
    UnknownSort(String),
    /// An operator the reader does not recognize
    #[error("unknown operator {0}")]
    UnknownOperator(String),
    /// A malformed or unrecognized annotation
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    /// A `:next` annotation on something other than a declared variable
    #[error("{0} in a :next pairing is not a declared variable")]
    UnknownNextSymbol(String),
    /// A variable claimed by more than one `:next` pairing
    #[error("{0} appears in more than one :next pairing")]
    DuplicateNext(String),
    /// A `:next` pairing of variables with two different sorts
    #[error("state variable {curr} and next variable {next} have different sorts")]
    MismatchedNextSorts {
        /// The current-state variable
        curr: String,
        /// The next-state variable
        next: String,
    },
    /// The collected definitions do not form a valid model
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Create a diagnostic for a parse error, for reporting to the user.
pub fn parse_error_diagnostic<FileId>(
    file_id: FileId,
    e: &peg::error::ParseError<LineCol>,
) -> Diagnostic<FileId> {
    Diagnostic::error()
        .with_message("could not parse file")
        .with_labels(vec![Label::primary(
            file_id,
            e.location.offset..e.location.offset + 1,
        )
        .with_message(format!("expected {}", e.expected))])
}

#[derive(Default)]
struct Reader {
    sorts: Vec<String>,
    decls: Vec<(String, Sort)>,
    // (curr, next) in the order the :next pairings appear
    pairs: Vec<(String, String)>,
    next_to_curr: HashMap<String, String>,
    macros: HashMap<String, Term>,
    init: Vec<Term>,
    trans: Vec<Term>,
    properties: Vec<(PropertyType, usize, Term)>,
}

/// Read a model from the contents of a VMT-LIB file.
///
/// Annotations are processed in phases, so the `:next` pairings may appear
/// anywhere in the script relative to the constraints that mention the next
/// variables.
pub fn read_model(contents: &str) -> Result<Model, ReaderError> {
    let mut reader = Reader::default();
    let commands: Vec<Sexp> = sexp::parse_many(contents)?
        .into_iter()
        .filter(|s| !matches!(s, Sexp::Comment(_)))
        .collect();
    for s in &commands {
        reader.declaration(s)?;
    }
    for s in &commands {
        reader.pairing(s)?;
    }
    for s in &commands {
        reader.definition(s)?;
    }
    reader.into_model()
}

impl Reader {
    /// First pass: declarations. Every other known command is validated for
    /// shape and left to the later passes.
    fn declaration(&mut self, s: &Sexp) -> Result<(), ReaderError> {
        let malformed = || ReaderError::MalformedCommand(s.to_string());
        let (head, args) = s.app().ok_or_else(malformed)?;
        match head {
            // assert true is the conventional end of a VMT file
            "set-logic" | "set-option" | "set-info" | "assert" | "check-sat" | "exit" => Ok(()),
            "declare-sort" => {
                let name = args.first().and_then(Sexp::atom_s).ok_or_else(malformed)?;
                if args.len() > 1 && args[1].atom_i() != Some(0) {
                    return Err(ReaderError::FunctionsUnsupported(name.to_string()));
                }
                self.sorts.push(name.to_string());
                Ok(())
            }
            "declare-fun" => match args {
                [name, params, sort] => {
                    let name = name.atom_s().ok_or_else(malformed)?;
                    if !params.list().is_some_and(|ps| ps.is_empty()) {
                        return Err(ReaderError::FunctionsUnsupported(name.to_string()));
                    }
                    let sort = self.sort(sort)?;
                    self.decls.push((name.to_string(), sort));
                    Ok(())
                }
                _ => Err(malformed()),
            },
            "declare-const" => match args {
                [name, sort] => {
                    let name = name.atom_s().ok_or_else(malformed)?;
                    let sort = self.sort(sort)?;
                    self.decls.push((name.to_string(), sort));
                    Ok(())
                }
                _ => Err(malformed()),
            },
            "define-fun" => match args {
                [name, params, _sort, _body] => {
                    let name = name.atom_s().ok_or_else(malformed)?;
                    if !params.list().is_some_and(|ps| ps.is_empty()) {
                        return Err(ReaderError::FunctionsUnsupported(name.to_string()));
                    }
                    Ok(())
                }
                _ => Err(malformed()),
            },
            _ => Err(ReaderError::UnknownCommand(head.to_string())),
        }
    }

    /// Second pass: collect the `:next` pairings of a script whose shape the
    /// first pass accepted.
    fn pairing(&mut self, s: &Sexp) -> Result<(), ReaderError> {
        self.annotated(s, &mut |reader, term, annotation| {
            if let Annotation::Next(next) = annotation {
                let malformed = || ReaderError::MalformedCommand(term.to_string());
                let curr = term.atom_s().ok_or_else(malformed)?;
                reader.pair(curr, &next)?;
            }
            Ok(())
        })
    }

    /// Final pass: read the constraint and property bodies, with every
    /// pairing known, and collect macros.
    fn definition(&mut self, s: &Sexp) -> Result<(), ReaderError> {
        let (head, args) = match s.app() {
            Some(pair) => pair,
            None => return Ok(()),
        };
        if head != "define-fun" {
            return Ok(());
        }
        if let [name, _params, _sort, body] = args {
            if body.app().is_some_and(|(head, _)| head == "!") {
                return self.annotated(s, &mut |reader, term, annotation| {
                    match annotation {
                        // handled by the pairing pass
                        Annotation::Next(_) => {}
                        Annotation::Init => {
                            let t = reader.term(term)?;
                            reader.init.push(t);
                        }
                        Annotation::Trans => {
                            let t = reader.term(term)?;
                            reader.trans.push(t);
                        }
                        Annotation::InvarProperty(idx) => {
                            let t = reader.term(term)?;
                            reader.properties.push((PropertyType::Invar, idx, t));
                        }
                        Annotation::LiveProperty(idx) => {
                            let t = reader.term(term)?;
                            reader.properties.push((PropertyType::Live, idx, t));
                        }
                        Annotation::LtlProperty(idx) => {
                            let t = reader.term(term)?;
                            reader.properties.push((PropertyType::Ltl, idx, t));
                        }
                    }
                    Ok(())
                });
            }
            // a definition without annotations is a macro, inlined into
            // every formula that mentions it
            let name = name.atom_s().expect("validated by the first pass");
            let t = self.term(body)?;
            self.macros.insert(name.to_string(), t);
        }
        Ok(())
    }

    /// Run `handle` on every annotation of an annotated define-fun body,
    /// doing nothing on other commands.
    fn annotated(
        &mut self,
        s: &Sexp,
        handle: &mut dyn FnMut(&mut Self, &Sexp, Annotation) -> Result<(), ReaderError>,
    ) -> Result<(), ReaderError> {
        let body = match s.app() {
            Some(("define-fun", [_, _, _, body])) => body,
            _ => return Ok(()),
        };
        let args = match body.app() {
            Some(("!", args)) => args,
            _ => return Ok(()),
        };
        let malformed = || ReaderError::MalformedCommand(body.to_string());
        let (term, annotations) = match args {
            [term, rest @ ..] if rest.len() >= 2 && rest.len() % 2 == 0 => (term, rest),
            _ => return Err(malformed()),
        };
        for pair in annotations.chunks(2) {
            let key = pair[0].atom_s().ok_or_else(malformed)?;
            let annotation = Annotation::parse(key, &pair[1])?;
            handle(self, term, annotation)?;
        }
        Ok(())
    }

    fn pair(&mut self, curr: &str, next: &str) -> Result<(), ReaderError> {
        let sort_of = |name: &str| {
            self.decls
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, sort)| sort.clone())
        };
        let curr_sort =
            sort_of(curr).ok_or_else(|| ReaderError::UnknownNextSymbol(curr.to_string()))?;
        let next_sort =
            sort_of(next).ok_or_else(|| ReaderError::UnknownNextSymbol(next.to_string()))?;
        if curr_sort != next_sort {
            return Err(ReaderError::MismatchedNextSorts {
                curr: curr.to_string(),
                next: next.to_string(),
            });
        }
        let claimed = self
            .pairs
            .iter()
            .flat_map(|(c, n)| [c, n])
            .any(|name| name == curr || name == next);
        if claimed {
            let name = if self.pairs.iter().any(|(c, n)| c == curr || n == curr) {
                curr
            } else {
                next
            };
            return Err(ReaderError::DuplicateNext(name.to_string()));
        }
        self.pairs.push((curr.to_string(), next.to_string()));
        self.next_to_curr.insert(next.to_string(), curr.to_string());
        Ok(())
    }

    fn sort(&self, s: &Sexp) -> Result<Sort, ReaderError> {
        let sort = s
            .sort()
            .ok_or_else(|| ReaderError::UnknownSort(s.to_string()))?;
        if let Sort::Uninterpreted(name) = &sort {
            if !self.sorts.contains(name) {
                return Err(ReaderError::UnknownSort(name.clone()));
            }
        }
        Ok(sort)
    }

    fn term(&self, s: &Sexp) -> Result<Term, ReaderError> {
        self.term_rec(s, &im::HashMap::new(), &im::HashSet::new())
    }

    fn term_rec(
        &self,
        s: &Sexp,
        lets: &im::HashMap<String, Term>,
        bound: &im::HashSet<String>,
    ) -> Result<Term, ReaderError> {
        if let Some(t) = s.constant() {
            return Ok(t);
        }
        if let Some(name) = s.atom_s() {
            if bound.contains(name) {
                return Ok(Term::id(name));
            }
            if let Some(t) = lets.get(name) {
                return Ok(t.clone());
            }
            if let Some(curr) = self.next_to_curr.get(name) {
                return Ok(Term::prime(Term::id(curr)));
            }
            if let Some(t) = self.macros.get(name) {
                return Ok(t.clone());
            }
            return Ok(Term::id(name));
        }

        let malformed = || ReaderError::MalformedCommand(s.to_string());
        let (head, args) = s.app().ok_or_else(malformed)?;
        let sub = |s: &Sexp| self.term_rec(s, lets, bound);
        let one = |args: &[Sexp]| match args {
            [x] => sub(x),
            _ => Err(malformed()),
        };
        let two = |args: &[Sexp]| match args {
            [x, y] => Ok((sub(x)?, sub(y)?)),
            _ => Err(malformed()),
        };
        // +, - and * are left associative and may take extra arguments
        let fold = |op: NumOp, args: &[Sexp]| {
            if args.len() < 2 {
                return Err(malformed());
            }
            let mut acc = sub(&args[0])?;
            for arg in &args[1..] {
                acc = Term::num_op(op, acc, sub(arg)?);
            }
            Ok(acc)
        };
        match head {
            "let" => match args {
                [bindings, body] => {
                    let mut lets = lets.clone();
                    for b in bindings.list().ok_or_else(malformed)? {
                        match b.list() {
                            Some([name, value]) => {
                                let name = name.atom_s().ok_or_else(malformed)?;
                                let value = self.term_rec(value, &lets, bound)?;
                                lets.insert(name.to_string(), value);
                            }
                            _ => return Err(malformed()),
                        }
                    }
                    self.term_rec(body, &lets, bound)
                }
                _ => Err(malformed()),
            },
            "forall" | "exists" => match args {
                [binders, body] => {
                    let quantifier = if head == "forall" {
                        Quantifier::Forall
                    } else {
                        Quantifier::Exists
                    };
                    let mut parsed = vec![];
                    for b in binders.list().ok_or_else(malformed)? {
                        match b.list() {
                            Some([name, sort]) => {
                                let name = name.atom_s().ok_or_else(malformed)?;
                                parsed.push(Binder::new(name, self.sort(sort)?));
                            }
                            _ => return Err(malformed()),
                        }
                    }
                    let mut bound = bound.clone();
                    bound.extend(parsed.iter().map(|b| b.name.clone()));
                    let body = self.term_rec(body, lets, &bound)?;
                    Ok(Term::Quantified {
                        quantifier,
                        binders: parsed,
                        body: Box::new(body),
                    })
                }
                _ => Err(malformed()),
            },
            "not" => Ok(Term::not(one(args)?)),
            "and" => Ok(Term::and(
                args.iter().map(sub).collect::<Result<Vec<_>, _>>()?,
            )),
            "or" => Ok(Term::or(
                args.iter().map(sub).collect::<Result<Vec<_>, _>>()?,
            )),
            "=>" => two(args).map(|(x, y)| Term::implies(x, y)),
            "=" => two(args).map(|(x, y)| Term::equals(x, y)),
            "distinct" => two(args).map(|(x, y)| Term::not_equals(x, y)),
            "ite" => match args {
                [c, t, e] => Ok(Term::ite(sub(c)?, sub(t)?, sub(e)?)),
                _ => Err(malformed()),
            },
            "+" => fold(NumOp::Add, args),
            "*" => fold(NumOp::Mul, args),
            "-" => match args {
                [x] => Ok(Term::num_op(NumOp::Sub, Term::int(0), sub(x)?)),
                _ => fold(NumOp::Sub, args),
            },
            "/" => two(args).map(|(x, y)| Term::num_op(NumOp::Div, x, y)),
            "<" => two(args).map(|(x, y)| Term::num_rel(NumRel::Lt, x, y)),
            "<=" => two(args).map(|(x, y)| Term::num_rel(NumRel::Leq, x, y)),
            ">=" => two(args).map(|(x, y)| Term::num_rel(NumRel::Geq, x, y)),
            ">" => two(args).map(|(x, y)| Term::num_rel(NumRel::Gt, x, y)),
            "ltl.G" => Ok(Term::always(one(args)?)),
            "ltl.F" => Ok(Term::eventually(one(args)?)),
            "ltl.X" => Ok(Term::next(one(args)?)),
            "ltl.H" => Ok(Term::historically(one(args)?)),
            "ltl.O" => Ok(Term::once(one(args)?)),
            "ltl.Y" => Ok(Term::previous(one(args)?)),
            "ltl.U" => two(args).map(|(x, y)| Term::until(x, y)),
            "ltl.S" => two(args).map(|(x, y)| Term::since(x, y)),
            "ltl.R" => two(args).map(|(x, y)| Term::release(x, y)),
            _ => Err(ReaderError::UnknownOperator(head.to_string())),
        }
    }

    fn into_model(self) -> Result<Model, ReaderError> {
        let mut model = Model::new();
        for s in &self.sorts {
            model.add_sort(s)?;
        }
        // the :next pairings define the state variables and their order
        for (curr, _) in &self.pairs {
            let sort = self
                .decls
                .iter()
                .find(|(n, _)| n == curr)
                .map(|(_, sort)| sort.clone())
                .unwrap();
            model.create_state_var(curr, sort)?;
        }
        // every declaration not claimed by a pairing is an input
        for (name, sort) in &self.decls {
            let claimed = self.pairs.iter().any(|(c, n)| c == name || n == name);
            if !claimed {
                model.create_input_var(name, sort.clone())?;
            }
        }
        for t in self.init {
            model.add_init(t)?;
        }
        for t in self.trans {
            model.add_trans(t)?;
        }
        for (typ, idx, t) in self.properties {
            model.add_property(typ, t, Some(idx))?;
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::model_to_string;
    use vmt::syntax::NumOp::*;
    use vmt::syntax::NumRel::*;

    const COUNTER: &str = "
        (declare-fun a () Bool)
        (declare-fun x () Int)
        (declare-fun x.__next0 () Int)
        (define-fun next0 () Int (! x :next x.__next0))
        (define-fun init0 () Bool (! (= x 0) :init true))
        (define-fun trans0 () Bool (! (= x.__next0 (+ x 1)) :trans true))
        (define-fun invar-property0 () Bool (! (<= 0 x) :invar-property 0))
        (assert true)
        ";

    #[test]
    fn test_read_counter() {
        let m = read_model(COUNTER).unwrap();
        assert!(m.is_state_var("x"));
        assert!(m.is_input_var("a"));
        let x = Term::id("x");
        assert_eq!(m.init_constraints(), &[Term::equals(&x, Term::int(0))]);
        assert_eq!(
            m.trans_constraints(),
            &[Term::equals(
                Term::prime(&x),
                Term::num_op(Add, &x, Term::int(1))
            )]
        );
        assert_eq!(
            m.get_property(0).unwrap().term,
            Term::num_rel(Leq, Term::int(0), &x)
        );
    }

    #[test]
    fn test_roundtrip() {
        let m = read_model(COUNTER).unwrap();
        let s = model_to_string(&m);
        let m2 = read_model(&s).unwrap();
        assert_eq!(m, m2);
    }

    #[test]
    fn test_pairing_after_use() {
        // the :next pairing may follow the constraints that mention the
        // next variable
        let m = read_model(
            "
            (declare-fun a () Bool)
            (declare-fun x () Int)
            (declare-fun x.__next0 () Int)
            (define-fun init0 () Bool (! (= x 0) :init true))
            (define-fun trans0 () Bool (! (= x.__next0 (+ x 1)) :trans true))
            (define-fun invar-property0 () Bool (! (<= 0 x) :invar-property 0))
            (define-fun next0 () Int (! x :next x.__next0))
            (assert true)
            ",
        )
        .unwrap();
        assert_eq!(m, read_model(COUNTER).unwrap());
    }

    #[test]
    fn test_macros_inlined() {
        let m = read_model(
            "
            (declare-fun x () Int)
            (declare-fun xn () Int)
            (define-fun next0 () Int (! x :next xn))
            (define-fun twice () Int (+ x x))
            (define-fun init0 () Bool (! (= twice 0) :init true))
            ",
        )
        .unwrap();
        let x = Term::id("x");
        assert_eq!(
            m.init_constraints(),
            &[Term::equals(Term::num_op(Add, &x, &x), Term::int(0))]
        );
    }

    #[test]
    fn test_let_inlined() {
        let m = read_model(
            "
            (declare-fun x () Int)
            (declare-fun xn () Int)
            (define-fun next0 () Int (! x :next xn))
            (define-fun trans0 () Bool (! (let ((y (+ x 1))) (= xn y)) :trans true))
            ",
        )
        .unwrap();
        let x = Term::id("x");
        assert_eq!(
            m.trans_constraints(),
            &[Term::equals(
                Term::prime(&x),
                Term::num_op(Add, &x, Term::int(1))
            )]
        );
    }

    #[test]
    fn test_reals() {
        let m = read_model(
            "
            (declare-fun r () Real)
            (declare-fun rn () Real)
            (define-fun next0 () Real (! r :next rn))
            (define-fun init0 () Bool (! (= r 0.01) :init true))
            (define-fun init1 () Bool (! (< r 25.0) :init true))
            ",
        )
        .unwrap();
        let r = Term::id("r");
        assert_eq!(
            m.init_constraints(),
            &[
                Term::equals(&r, Term::Real(1, 100)),
                Term::num_rel(Lt, &r, Term::Real(25, 1)),
            ]
        );
    }

    #[test]
    fn test_past_ltl() {
        let m = read_model(
            "
            (declare-fun a () Bool)
            (declare-fun an () Bool)
            (define-fun next0 () Bool (! a :next an))
            (define-fun p0 () Bool (! (ltl.G (=> a (ltl.O a))) :ltl-property 0))
            ",
        )
        .unwrap();
        let a = Term::id("a");
        assert_eq!(
            m.get_property(0).unwrap().term,
            Term::always(Term::implies(&a, Term::once(&a)))
        );
    }

    #[test]
    fn test_bad_annotation_value() {
        let err = read_model(
            "
            (declare-fun x () Int)
            (define-fun init0 () Bool (! (= x 0) :init false))
            ",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReaderError::Annotation(AnnotationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_bad_property_index() {
        let err = read_model(
            "
            (declare-fun x () Int)
            (define-fun p () Bool (! (< x 1) :invar-property abc))
            ",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReaderError::Annotation(AnnotationError::InvalidPropertyIndex(_))
        ));
    }

    #[test]
    fn test_duplicate_property_index() {
        let err = read_model(
            "
            (declare-fun x () Int)
            (define-fun p0 () Bool (! (< x 1) :invar-property 0))
            (define-fun p1 () Bool (! (< x 2) :invar-property 0))
            ",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReaderError::Model(ModelError::DuplicatePropertyIndex(0))
        ));
    }

    #[test]
    fn test_functions_rejected() {
        let err = read_model("(declare-fun f (Int) Int)").unwrap_err();
        assert!(matches!(err, ReaderError::FunctionsUnsupported(name) if name == "f"));
    }

    #[test]
    fn test_mismatched_next_sorts() {
        let err = read_model(
            "
            (declare-fun x () Int)
            (declare-fun xn () Bool)
            (define-fun next0 () Int (! x :next xn))
            ",
        )
        .unwrap_err();
        assert!(matches!(err, ReaderError::MismatchedNextSorts { .. }));
    }

    #[test]
    fn test_uninterpreted_sorts() {
        let m = read_model(
            "
            (declare-sort node 0)
            (declare-fun n () node)
            (declare-fun nn () node)
            (define-fun next0 () node (! n :next nn))
            ",
        )
        .unwrap();
        assert_eq!(m.sorts(), &["node".to_string()]);
        assert_eq!(m.get_var("n").unwrap().sort, Sort::uninterpreted("node"));

        let err = read_model("(declare-fun n () mystery)").unwrap_err();
        assert!(matches!(err, ReaderError::UnknownSort(s) if s == "mystery"));
    }
}
