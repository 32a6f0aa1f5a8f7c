// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The vmt-checker binary's command-line interface.

use std::path::Path;
use std::{fs, process};

use clap::Args;
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::{
    files::SimpleFile,
    term::{
        self as terminal,
        termcolor::{ColorChoice, StandardStream},
    },
};
use path_slash::PathExt;
use solvers::checks::{ModelChecker, Outcome};
use solvers::euforia::Euforia;
use solvers::ic3ia::Ic3ia;
use solvers::nuxmv::{BmcAlgorithm, CheckAlgorithm, Nuxmv};
use vmt::model::Model;
use vmt::printer;
use vmtlib::reader::{parse_error_diagnostic, read_model, ReaderError};

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum Backend {
    Ic3ia,
    Euforia,
    Nuxmv,
}

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum ColorOutput {
    Never,
    Auto,
    Always,
}

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum InvarAlgorithm {
    Bmc,
    BmcCegarImplabs,
    BmcImplabs,
    IncCoi,
}

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum BmcAlg {
    Classic,
    EenSorensson,
    Falsification,
    Dual,
    Zigzag,
    InterpSeq,
    Interpolants,
}

#[derive(Args, Clone, Debug, PartialEq, Eq)]
struct CheckArgs {
    /// File name for a .vmt file
    file: String,

    #[arg(value_enum, long, default_value_t = Backend::Ic3ia)]
    /// Model checker to run
    backend: Backend,

    #[arg(long)]
    /// Check only the property with this index
    property: Option<usize>,

    #[arg(long)]
    /// Print the counterexample trace when one is found
    trace: bool,

    #[arg(value_enum, long, default_value_t = InvarAlgorithm::IncCoi)]
    /// Invariant-checking algorithm (nuXmv only)
    algorithm: InvarAlgorithm,

    #[arg(value_enum, long, default_value_t = BmcAlg::EenSorensson)]
    /// BMC algorithm when `--algorithm bmc` is selected (nuXmv only)
    bmc_algorithm: BmcAlg,

    #[arg(long)]
    /// Bound on the BMC unrolling depth (nuXmv only)
    bmc_length: Option<usize>,
}

impl CheckArgs {
    fn to_checker(&self) -> Box<dyn ModelChecker> {
        match self.backend {
            Backend::Ic3ia => Box::new(Ic3ia::new()),
            Backend::Euforia => Box::new(Euforia::new()),
            Backend::Nuxmv => {
                let mut solver = Nuxmv::new();
                solver.set_algorithm(match self.algorithm {
                    InvarAlgorithm::Bmc => CheckAlgorithm::Bmc,
                    InvarAlgorithm::BmcCegarImplabs => CheckAlgorithm::BmcCegarImplabs,
                    InvarAlgorithm::BmcImplabs => CheckAlgorithm::BmcImplabs,
                    InvarAlgorithm::IncCoi => CheckAlgorithm::IncCoi,
                });
                solver.set_bmc_algorithm(match self.bmc_algorithm {
                    BmcAlg::Classic => BmcAlgorithm::Classic,
                    BmcAlg::EenSorensson => BmcAlgorithm::EenSorensson,
                    BmcAlg::Falsification => BmcAlgorithm::Falsification,
                    BmcAlg::Dual => BmcAlgorithm::Dual,
                    BmcAlg::Zigzag => BmcAlgorithm::Zigzag,
                    BmcAlg::InterpSeq => BmcAlgorithm::InterpSeq,
                    BmcAlg::Interpolants => BmcAlgorithm::Interpolants,
                });
                if let Some(k) = self.bmc_length {
                    solver.set_bmc_length(k);
                }
                Box::new(solver)
            }
        }
    }
}

#[derive(clap::Subcommand, Clone, Debug, PartialEq, Eq)]
enum Command {
    /// Parse a VMT-LIB file and print the model in human-readable form.
    Print {
        /// File name for a .vmt file
        file: String,
    },
    /// Parse a VMT-LIB file and re-serialize it to stdout (for debugging).
    Dump {
        /// File name for a .vmt file
        file: String,
    },
    /// Run a model checker on the file's properties.
    Check(CheckArgs),
}

impl Command {
    fn file(&self) -> &str {
        match self {
            Command::Print { file } => file,
            Command::Dump { file } => file,
            Command::Check(CheckArgs { file, .. }) => file,
        }
    }
}

#[derive(clap::Parser, Debug)]
#[command(about, long_about=None)]
/// Entrypoint for the vmt-checker binary, including all commands.
pub struct App {
    #[arg(value_enum, long, default_value_t = ColorOutput::Auto)]
    /// Control color output. Auto disables colors with TERM=dumb or
    /// NO_COLOR=true.
    color: ColorOutput,

    #[command(subcommand)]
    /// Command to run
    command: Command,
}

impl App {
    /// Run the application.
    pub fn exec(self) {
        let file = fs::read_to_string(self.command.file()).expect("could not read input file");
        // We make sure paths look like Unix paths on all platforms, otherwise test snapshots don't match.
        let standardized_filename = Path::new(self.command.file()).to_slash_lossy();
        let files = SimpleFile::new(standardized_filename, &file);

        let writer = StandardStream::stderr(match &self.color {
            ColorOutput::Never => ColorChoice::Never,
            ColorOutput::Always => ColorChoice::Always,
            ColorOutput::Auto => ColorChoice::Auto,
        });
        let config = codespan_reporting::term::Config {
            start_context_lines: 3,
            end_context_lines: 3,
            ..Default::default()
        };

        let model: Model = match read_model(&file) {
            Ok(m) => m,
            Err(ReaderError::Parse(err)) => {
                let diagnostic = parse_error_diagnostic((), &err);
                terminal::emit(&mut writer.lock(), &config, &files, &diagnostic).unwrap();
                process::exit(1);
            }
            Err(err) => {
                let diagnostic = Diagnostic::<()>::error().with_message(format!("{err}"));
                terminal::emit(&mut writer.lock(), &config, &files, &diagnostic).unwrap();
                process::exit(1);
            }
        };

        match self.command {
            Command::Print { .. } => {
                println!("{}", printer::fmt(&model));
            }
            Command::Dump { .. } => {
                print!("{}", vmtlib::printer::model_to_string(&model));
            }
            Command::Check(ref args) => {
                let checker = args.to_checker();
                let results = match args.property {
                    // check_ltl_property falls back to the tableau encoding
                    // for backends without native LTL support
                    Some(idx) => checker
                        .check_ltl_property(&model, idx)
                        .map(|r| std::collections::BTreeMap::from([(idx, r)])),
                    None => checker.check_properties(&model),
                };
                let results = match results {
                    Ok(results) => results,
                    Err(err) => {
                        eprintln!("{err}");
                        process::exit(1);
                    }
                };
                for (idx, result) in &results {
                    let verdict = match result.outcome {
                        Outcome::Safe => "safe",
                        Outcome::Unsafe => "unsafe",
                        Outcome::Unknown => "unknown",
                    };
                    println!("property {idx}: {verdict}");
                    if args.trace {
                        if let Some(trace) = &result.trace {
                            println!("{}", trace.serialize());
                        }
                    }
                }
                if results.is_empty() {
                    eprintln!(
                        "{} cannot check any property of this model",
                        checker.name()
                    );
                    process::exit(1);
                }
            }
        }
    }
}
