// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The annotation vocabulary of VMT-LIB.
//!
//! A VMT file attaches meaning to otherwise plain SMT-LIB definitions with
//! annotated terms of the form `(! t :keyword value)`.

use crate::sexp::Sexp;
use thiserror::Error;
use vmt::properties::PropertyType;

/// The `:next` keyword, pairing a current-state with a next-state variable
pub const NEXT: &str = ":next";
/// The `:init` keyword, marking an init constraint
pub const INIT: &str = ":init";
/// The `:trans` keyword, marking a trans constraint
pub const TRANS: &str = ":trans";
/// The `:invar-property` keyword, marking an invariant property
pub const INVAR_PROPERTY: &str = ":invar-property";
/// The `:live-property` keyword, marking a liveness property
pub const LIVE_PROPERTY: &str = ":live-property";
/// The `:ltl-property` keyword, marking an LTL property
pub const LTL_PROPERTY: &str = ":ltl-property";

/// An error from interpreting an annotation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnnotationError {
    /// A keyword outside the VMT-LIB vocabulary
    #[error("unknown annotation {0}")]
    UnknownAnnotation(String),
    /// A value that does not fit the keyword, e.g. `:init false`
    #[error("invalid value {value} for annotation {key}")]
    InvalidValue {
        /// The annotation keyword
        key: String,
        /// The offending value
        value: String,
    },
    /// A property annotation whose value is not a non-negative integer
    #[error("property index {0} is not a non-negative integer")]
    InvalidPropertyIndex(String),
}

/// A single parsed VMT-LIB annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// `:next name`: the annotated variable has `name` as its next version
    Next(String),
    /// `:init true`: the annotated term is an init constraint
    Init,
    /// `:trans true`: the annotated term is a trans constraint
    Trans,
    /// `:invar-property idx`
    InvarProperty(usize),
    /// `:live-property idx`
    LiveProperty(usize),
    /// `:ltl-property idx`
    LtlProperty(usize),
}

impl Annotation {
    /// Interpret a keyword and its value.
    pub fn parse(key: &str, value: &Sexp) -> Result<Self, AnnotationError> {
        let invalid = || AnnotationError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            NEXT => {
                let name = value.atom_s().ok_or_else(invalid)?;
                Ok(Self::Next(name.to_string()))
            }
            INIT | TRANS => {
                if value.atom_s() != Some("true") {
                    return Err(invalid());
                }
                if key == INIT {
                    Ok(Self::Init)
                } else {
                    Ok(Self::Trans)
                }
            }
            INVAR_PROPERTY | LIVE_PROPERTY | LTL_PROPERTY => {
                let idx = value
                    .atom_i()
                    .and_then(|i| usize::try_from(i).ok())
                    .ok_or_else(|| AnnotationError::InvalidPropertyIndex(value.to_string()))?;
                Ok(match key {
                    INVAR_PROPERTY => Self::InvarProperty(idx),
                    LIVE_PROPERTY => Self::LiveProperty(idx),
                    _ => Self::LtlProperty(idx),
                })
            }
            _ => Err(AnnotationError::UnknownAnnotation(key.to_string())),
        }
    }

    /// The annotation marking a property of the given kind and index.
    pub fn property(typ: PropertyType, idx: usize) -> Self {
        match typ {
            PropertyType::Invar => Self::InvarProperty(idx),
            PropertyType::Live => Self::LiveProperty(idx),
            PropertyType::Ltl => Self::LtlProperty(idx),
        }
    }

    /// The keyword this annotation is written with.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Next(_) => NEXT,
            Self::Init => INIT,
            Self::Trans => TRANS,
            Self::InvarProperty(_) => INVAR_PROPERTY,
            Self::LiveProperty(_) => LIVE_PROPERTY,
            Self::LtlProperty(_) => LTL_PROPERTY,
        }
    }
}
