// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! A custom s-expression data type and parsing.
//!
//! This implementation supports comments as part of the grammar, since they
//! appear in the output of the solvers whose witnesses we parse.

use peg::str::LineCol;
use serde::Serialize;
use std::fmt;
use vmt::syntax::{Sort, Term};

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, PartialOrd, Ord)]
pub enum Atom {
    I(i64),
    S(String),
}

impl Atom {
    /// Return the string value of self, if it is a string.
    pub fn s(&self) -> Option<&str> {
        if let Self::S(s) = self {
            Some(s)
        } else {
            None
        }
    }
}

/// An s-expression which also tracks comments.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, PartialOrd, Ord)]
pub enum Sexp {
    Atom(Atom),
    Comment(String),
    List(Vec<Sexp>),
}

/// Construct an sexp atom from a string.
pub fn atom_s<S: AsRef<str>>(s: S) -> Sexp {
    Sexp::Atom(Atom::S(s.as_ref().to_string()))
}

/// Construct an sexp atom from an integer.
pub fn atom_i(i: i64) -> Sexp {
    Sexp::Atom(Atom::I(i))
}

/// Construct an sexp list from an iteratable.
pub fn sexp_l<I>(i: I) -> Sexp
where
    I: IntoIterator,
    I::IntoIter: Iterator<Item = Sexp>,
{
    Sexp::List(i.into_iter().collect())
}

/// Construct an sexp list with a string atom as its "head" element, followed by
/// an iterable of remaining arguments.
pub fn app<I>(head: &str, args: I) -> Sexp
where
    I: IntoIterator,
    I::IntoIter: Iterator<Item = Sexp>,
{
    let mut ss = vec![atom_s(head)];
    #[allow(clippy::useless_conversion)]
    ss.extend(args.into_iter());
    Sexp::List(ss)
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::I(i) => write!(f, "{i}"),
            Atom::S(s) => {
                if s.contains([' ', '\"', '\'']) {
                    write!(f, "|{s}|")
                } else if s.contains('|') {
                    write!(f, "\"{s}\"")
                } else {
                    write!(f, "{s}")
                }
            }
        }
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexp::Atom(s) => write!(f, "{s}"),
            Sexp::Comment(s) => write!(f, ";{s}"),
            Sexp::List(ss) => {
                write!(f, "(")?;
                for (i, s) in ss.iter().enumerate() {
                    let last = i == ss.len() - 1;
                    let this_comment = matches!(s, Sexp::Comment(_));
                    let next_comment = !last && matches!(ss[i + 1], Sexp::Comment(_));
                    let space = if last || this_comment || next_comment {
                        ""
                    } else {
                        " "
                    };
                    if this_comment {
                        write!(f, "\n{s}\n{space}")?;
                    } else {
                        write!(f, "{s}{space}")?;
                    }
                }
                write!(f, ")")?;
                Ok(())
            }
        }
    }
}

impl Sexp {
    /// Return the inner elements if self is a Sexp::List
    pub fn list(&self) -> Option<&[Sexp]> {
        if let Sexp::List(ss) = self {
            Some(ss)
        } else {
            None
        }
    }

    /// Return the inner string if self is a string atom.
    pub fn atom_s(&self) -> Option<&str> {
        if let Sexp::Atom(Atom::S(s)) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Return the inner integer if self is an integer atom.
    pub fn atom_i(&self) -> Option<i64> {
        if let Sexp::Atom(Atom::I(i)) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Return the head and tail if self is of the form `(head rest..)`.
    pub fn app(&self) -> Option<(&str, &[Sexp])> {
        self.list().and_then(|ss| {
            if !ss.is_empty() {
                if let Some(head) = ss[0].atom_s() {
                    return Some((head, &ss[1..]));
                }
            }
            None
        })
    }

    /// Convert the s-expression into a sort, if possible.
    pub fn sort(&self) -> Option<Sort> {
        if let Some(("_", args)) = self.app() {
            if args.len() == 2 && args[0].atom_s() == Some("BitVec") {
                if let Some(width) = args[1].atom_i() {
                    return u32::try_from(width).ok().map(Sort::BitVec);
                }
            }
            return None;
        }
        self.atom_s().map(|s| match s {
            "Bool" => Sort::Bool,
            "Int" => Sort::Int,
            "Real" => Sort::Real,
            _ => Sort::uninterpreted(s),
        })
    }

    /// Convert the s-expression into a constant term, if possible. This
    /// covers the literal forms that appear in solver witnesses: booleans,
    /// integers, decimals, fractions, negations, and bit vectors.
    pub fn constant(&self) -> Option<Term> {
        if let Some(i) = self.atom_i() {
            return Some(Term::Int(i));
        }
        if let Some(s) = self.atom_s() {
            return match s {
                "true" => Some(Term::Literal(true)),
                "false" => Some(Term::Literal(false)),
                _ => {
                    if let Some(bits) = s.strip_prefix("#b") {
                        let value = u64::from_str_radix(bits, 2).ok()?;
                        return Some(Term::BitVec(value, bits.len() as u32));
                    }
                    if let Some(hex) = s.strip_prefix("#x") {
                        let value = u64::from_str_radix(hex, 16).ok()?;
                        return Some(Term::BitVec(value, 4 * hex.len() as u32));
                    }
                    if let Some((int_part, frac_part)) = s.split_once('.') {
                        return decimal(int_part, frac_part);
                    }
                    s.parse::<i64>().ok().map(Term::Int)
                }
            };
        }
        match self.app() {
            Some(("-", [arg])) => match arg.constant() {
                Some(Term::Int(i)) => Some(Term::Int(-i)),
                Some(Term::Real(num, den)) => Some(Term::Real(-num, den)),
                _ => None,
            },
            Some(("/", [num, den])) => {
                let num = match num.constant() {
                    Some(Term::Int(i)) => i,
                    _ => return None,
                };
                let den = match den.constant() {
                    Some(Term::Int(i)) if i != 0 => i,
                    _ => return None,
                };
                Some(Term::real(num, den))
            }
            Some(("_", [value, width])) => {
                let value = value.atom_s()?.strip_prefix("bv")?.parse::<u64>().ok()?;
                let width = u32::try_from(width.atom_i()?).ok()?;
                Some(Term::BitVec(value, width))
            }
            _ => None,
        }
    }
}

/// Parse a decimal of the form `int_part.frac_part` into an exact rational.
fn decimal(int_part: &str, frac_part: &str) -> Option<Term> {
    let negative = int_part.starts_with('-');
    let int_part: i64 = int_part.parse().ok()?;
    let frac: i64 = frac_part.parse().ok()?;
    let den = 10i64.checked_pow(frac_part.len() as u32)?;
    let num = int_part.abs() * den + frac;
    let num = if negative { -num } else { num };
    Some(Term::real(num, den))
}

peg::parser! {
grammar parser() for str {
  rule ident_start() = ['a'..='z' | 'A'..='Z' | '_' | '\'' | '<' | '>' | ':' | '=' | '$' | '@' | '+' | '-' | '*' | '/']
  rule ident_char() = ident_start() / ['0'..='9' | '!' | '#' | '%' | '.']
  rule ident() = quiet! { ident_start() ident_char()* } / expected!("atom")

  rule whitespace() = [' ' | '\t' | '\n' | '\r']
  rule _ = whitespace()*

  rule quoted_atom() -> Atom
  = "\"" s:$([^'"']*) "\"" { Atom::S(s.to_string()) }

  rule pipe_quoted_atom() -> Atom
  = "|" s:$([^'|']*) "|" { Atom::S(s.to_string()) }

  rule unquoted_atom() -> Atom
  = s:$(ident()) { Atom::S(s.to_string()) }

  // indexed values like #b0101 and #x1f
  rule hash_atom() -> Atom
  = s:$("#" ['a'..='z' | 'A'..='Z' | '0'..='9']+) { Atom::S(s.to_string()) }

  // the head of an annotated term, (! t :key value)
  rule bang_atom() -> Atom
  = "!" { Atom::S("!".to_string()) }

  // decimals stay strings so that exact fractions are preserved
  rule decimal_atom() -> Atom
  = s:$(['0'..='9']+ "." ['0'..='9']+) { Atom::S(s.to_string()) }

  rule int_atom() -> Atom
  = i:$(['0'..='9']+) { Atom::I(i.parse().unwrap()) }

  rule atom() -> Sexp
  = s:(quoted_atom() /
       pipe_quoted_atom() /
       unquoted_atom() /
       hash_atom() /
       bang_atom() /
       decimal_atom() /
       int_atom()) { Sexp::Atom(s) }

  rule comment() -> Sexp
  = ";" s:$(([^'\n']*)) ['\n'] { Sexp::Comment(s.to_string()) }

  rule list() -> Sexp
  = "(" _ ss:(sexp() ** _) _ ")" { Sexp::List(ss) }

  rule sexp() -> Sexp
  = atom() / comment() / list()

  /// Parse an sexp but be tolerant to whitespace around it.
  pub(super) rule sexp_whitespace() -> Sexp
  = _ s:sexp() _ { s }

  /// Parse a sequence of sexps.
  pub(super) rule sexps() -> Vec<Sexp>
  = _ ss:(sexp() ** _) _ { ss }
}
}

/// Parse an sexp.
///
/// Allows whitespace before or after.
pub fn parse(s: &str) -> Result<Sexp, peg::error::ParseError<LineCol>> {
    parser::sexp_whitespace(s)
}

/// Parse a sequence of sexps, separated by whitespace.
pub fn parse_many(s: &str) -> Result<Vec<Sexp>, peg::error::ParseError<LineCol>> {
    parser::sexps(s)
}
