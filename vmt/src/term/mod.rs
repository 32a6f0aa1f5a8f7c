// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Utilities for manipulating [`crate::syntax::Term`]: evaluation,
//! prime normalization, and substitution.

pub mod eval;
pub mod prime;
pub mod subst;
