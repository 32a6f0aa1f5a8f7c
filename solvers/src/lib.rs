// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Drivers for external VMT model checkers.
//!
//! Each backend serializes a [`vmt::model::Model`] to the checker's input
//! format, runs the executable named by an environment variable, and parses
//! the verdict (and the counterexample trace, when one is produced) back
//! into a [`checks::CheckResult`].

// configure clippy
#![allow(clippy::needless_return)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::type_complexity)]
// documentation-related lints (only checked when running rustdoc)
#![warn(missing_docs)]
#![allow(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod checks;
pub mod euforia;
pub mod ic3ia;
pub mod nuxmv;
pub mod path;
pub mod traces;

pub use checks::{CheckResult, ModelChecker, Outcome};
