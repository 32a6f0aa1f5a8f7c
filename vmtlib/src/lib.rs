// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Reading and writing models in the VMT-LIB interchange format.
//!
//! VMT-LIB extends SMT-LIB with annotated definitions that mark the
//! components of a transition system: the pairing of current and next state
//! variables, init and trans constraints, and properties.

#![allow(clippy::needless_return)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::type_complexity)]
// documentation-related lints (only checked when running rustdoc)
#![warn(missing_docs)]
#![allow(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod annotations;
pub mod printer;
pub mod reader;
pub mod sexp;
