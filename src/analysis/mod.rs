//! Frequency aggregation.
//!
//! Turns question columns of the loaded survey table into per-question
//! frequency distributions.

mod aggregator;

pub use aggregator::aggregate_question;
