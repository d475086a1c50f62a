//! # Consolidation
//!
//! Merges questionnaire fragments into one worksheet and binds evidence images to its rows
//! using nothing but file name conventions:
//!
//! 1. [`naming`] reads order tokens from fragment names and association keys from image names
//! 2. [`merger`] orders fragments and appends their bodies below one shared header
//! 3. [`locator`] resolves an association key to a row from the marker column
//! 4. [`evidence`] places the images and numbers the annexures
//! 5. [`borders`] frames the evidence block and finishes the sizing
//!
//! [`pipeline`] runs the stages in that order for a [`config::ConsolidationConfig`].
pub mod borders;
pub mod config;
pub mod evidence;
pub mod locator;
pub mod merger;
pub mod naming;
pub mod pipeline;
pub mod report;

use thiserror::Error;

/// Conditions that abort a consolidation run.
#[derive(Error, Debug)]
pub enum ConsolidationError {
    #[error("No fragment supplied")]
    NoFragments,

    #[error("None of the {0} supplied fragments could be read")]
    NoReadableFragments(usize),

    #[error("An evidence archive is required but none was supplied")]
    MissingEvidence,
}
