//! Operator settings and the generated suite configuration document.
//!
//! Two layers live here. [`Settings`] is what the operator gives us
//! (settings file merged with command-line flags); [`validate`] turns it
//! into a [`RunPlan`] after the pre-run checks. [`SuiteConfig`] is what we
//! hand to the suite: the YAML document assembled from the plan and the
//! metrics fragment.

mod document;
mod settings;
mod validate;

pub use document::{SuiteConfig, assemble};
pub use settings::{PLACEHOLDER_CERT, PLACEHOLDER_KEY, Settings};
pub use validate::{Credentials, Executor, GpuProbe, NvidiaSmiProbe, RunPlan, validate};
