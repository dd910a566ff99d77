//! Document assembly.
//!
//! Composes the per-question sections into a single .docx report.

mod generator;

pub use generator::{build_document, save_document};
