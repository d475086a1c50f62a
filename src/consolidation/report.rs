use crate::consolidation::naming::AssociationKey;

/// An input or an item dropped during a run, with the reason it was dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Skipped {
    pub name: String,
    pub reason: String,
}

impl Skipped {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Skipped {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// A row that received evidence and the label written next to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annexure {
    /// Sequential annexure number, starting at 1
    pub number: u32,
    /// 0-based row of the consolidated sheet
    pub row: u32,
    /// Association keys that resolved to this row, in key order
    pub keys: Vec<AssociationKey>,
    /// File names of the images placed, in slot order
    pub images: Vec<String>,
}

/// Everything a run decided besides the produced document.
///
/// Every skip-and-warn condition is logged and also recorded here, so callers can show
/// what was dropped without scraping logs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
    /// Fragment names in merge order
    pub fragment_order: Vec<String>,
    /// Fragments that could not be read
    pub skipped_fragments: Vec<Skipped>,
    /// Merged ranges dropped because they overlapped an existing one
    pub skipped_merges: Vec<Skipped>,
    /// Evidence files without a key or with an undecodable payload
    pub rejected_evidence: Vec<Skipped>,
    /// Keys that matched no row
    pub unresolved_keys: Vec<AssociationKey>,
    /// Images beyond the per-row slot limit
    pub overflow: Vec<Skipped>,
    pub annexures: Vec<Annexure>,
}

impl RunReport {
    /// Number of images placed across all annexures
    pub fn placed_images(&self) -> usize {
        self.annexures.iter().map(|annexure| annexure.images.len()).sum()
    }

    /// Returns true if nothing was skipped, rejected or truncated.
    pub fn is_clean(&self) -> bool {
        self.skipped_fragments.is_empty()
            && self.skipped_merges.is_empty()
            && self.rejected_evidence.is_empty()
            && self.unresolved_keys.is_empty()
            && self.overflow.is_empty()
    }
}
