// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Locating model-checker executables through environment variables.
//!
//! Checkers are never searched for on `$PATH`; each backend is enabled by
//! pointing its environment variable at the executable:
//!
//! * ic3ia: `VMT_IC3IA_PATH`
//! * EUForia: `VMT_EUFORIA_PATH`
//! * nuXmv: `VMT_NUXMV_PATH`

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// An error locating a model-checker executable.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PathError {
    /// The environment variable for the checker is not set.
    #[error("{solver} is not configured (set {var} to the executable's path)")]
    NotConfigured {
        /// Name of the checker.
        solver: String,
        /// The environment variable that selects the executable.
        var: String,
    },
    /// The environment variable points at something that is not a file.
    #[error("no executable at {0}")]
    NotFound(PathBuf),
}

/// Resolve the executable for `solver` from the environment variable `var`.
pub fn solver_path(solver: &str, var: &str) -> Result<PathBuf, PathError> {
    match env::var_os(var) {
        None => Err(PathError::NotConfigured {
            solver: solver.to_string(),
            var: var.to_string(),
        }),
        Some(val) => {
            let path = PathBuf::from(val);
            if path.is_file() {
                Ok(path)
            } else {
                Err(PathError::NotFound(path))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_solver() {
        assert_eq!(
            solver_path("frobnicator", "VMT_FROBNICATOR_PATH"),
            Err(PathError::NotConfigured {
                solver: "frobnicator".to_string(),
                var: "VMT_FROBNICATOR_PATH".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_executable() {
        env::set_var("VMT_TEST_MISSING_PATH", "/does/not/exist");
        assert_eq!(
            solver_path("missing", "VMT_TEST_MISSING_PATH"),
            Err(PathError::NotFound(PathBuf::from("/does/not/exist")))
        );
        env::remove_var("VMT_TEST_MISSING_PATH");
    }
}
