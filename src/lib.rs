//! # Evidence Sheet
//!
//! A consolidation engine for audit questionnaires delivered as spreadsheet fragments.
//! It merges the fragments into one worksheet and binds evidence screenshots to the rows
//! they prove, relying only on file name conventions.
//!
//! ## Features
//!
//! - **Fragment ordering**: `Level 2.xlsx` and `Part-3 Questionnaire.xlsx` sort by the number
//!   after their keyword, unnumbered fragments last
//! - **Structural merge**: values, styles, merged ranges, column widths, row heights and images
//!   survive the merge; repeated header rows are dropped
//! - **Evidence mapping**: `3_D-1.png` lands on item D of section 3, `18.7 x.jpg` on item 7 of
//!   worksheet 18, without any stored mapping table
//! - **Annexures**: every row that received evidence is labelled `Annexure n` in order
//! - **Evidence block framing**: the image columns are framed as one unit
//! - **Deterministic output**: identical inputs produce byte-identical xlsx files
//!
//! ## Usage
//!
//! ```no_run
//! use evidence_sheet::ConsolidationConfig;
//! use evidence_sheet::ConsolidationPipeline;
//! use evidence_sheet::InputSource;
//!
//! # fn main() -> Result<(), evidence_sheet::EvidenceSheetError> {
//! let pipeline = ConsolidationPipeline::new(ConsolidationConfig::level_of_compliance())?;
//! let fragments = InputSource::glob("uploads/Level *.xlsx")?;
//! let evidence = InputSource::from(std::path::Path::new("uploads/evidence.zip"));
//! let consolidation = pipeline.run(&fragments, Some(&evidence))?;
//! consolidation.save("LOC.xlsx")?;
//! # Ok(())
//! # }
//! ```
pub mod consolidation;
pub mod error;
pub mod helpers;
pub mod spreadsheet;

#[cfg(test)]
mod testing;

pub use crate::consolidation::config::ConsolidationConfig;
pub use crate::consolidation::pipeline::Consolidation;
pub use crate::consolidation::pipeline::ConsolidationPipeline;
pub use crate::consolidation::report::RunReport;
pub use crate::error::EvidenceSheetError;
pub use crate::helpers::reader::InputSource;
pub use crate::spreadsheet::Document;
