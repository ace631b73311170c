//! Command-line orchestration for hepscore-runner
//!
//! The tool is a single flat command mirroring the suite's operator
//! surface: flags select what happens (install, run, or both) and where.
//! This module owns everything that touches raw operator input (flag
//! merging, GPU-count sanitizing, logging setup) so that the library
//! layers only ever see validated values.
//!
//! ## Execution Flow
//!
//! 1. Merge the settings file with command-line overrides
//! 2. Run the validation gate to obtain a `RunPlan`
//! 3. Resolve the suite version (once; `latest` goes through the pointer
//!    endpoint, best-effort)
//! 4. Assemble and write the suite configuration document
//! 5. Install the resolved release unless `--run-only`
//! 6. Execute the suite unless `--install-only`, triage the log, and
//!    pack the results

mod common;
mod run;

pub use common::{LogLevel, RunnerArgs};
pub use run::execute;
