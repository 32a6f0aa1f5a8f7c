// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Properties that a model checker can verify on a model.

use crate::syntax::Term;
use serde::Serialize;

/// The kind of verification question a property poses.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, Serialize, PartialOrd, Ord)]
pub enum PropertyType {
    /// A state invariant, to hold in every reachable state
    Invar,
    /// A liveness property, a single term to hold infinitely often
    Live,
    /// A full LTL property
    Ltl,
}

/// A property to be verified, combining a kind with the term to check.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord)]
pub struct Property {
    /// The kind of property
    pub typ: PropertyType,
    /// The term to verify
    pub term: Term,
}

impl Property {
    /// Construct a property of the given kind.
    pub fn new(typ: PropertyType, term: Term) -> Self {
        Self { typ, term }
    }

    /// Return true for an invariant property.
    pub fn is_invar(&self) -> bool {
        self.typ == PropertyType::Invar
    }

    /// Return true for a liveness property.
    pub fn is_live(&self) -> bool {
        self.typ == PropertyType::Live
    }

    /// Return true for an LTL property.
    pub fn is_ltl(&self) -> bool {
        self.typ == PropertyType::Ltl
    }
}
