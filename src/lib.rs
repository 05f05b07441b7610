//! persona-forge: synthetic consumer personas with multi-stage validation
//!
//! Personas are sampled from a bundled characteristic catalog, pushed toward
//! a diversity target, screened for stereotypes, demographic skew and
//! sycophancy, and finally scored for study readiness. The [`orchestrator`]
//! ties these stages into a generate-validate retry loop.

pub mod bias;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod diversity;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod orchestrator;
pub mod persona;
pub mod validation;
pub mod version;

pub use error::{Error, ErrorCode, Result};
