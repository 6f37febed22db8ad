//! Output ordering, visibility filters and content signatures

use crate::Result;
use buckos_config::OutputSection;
use serde::Serialize;
use std::cmp::Ordering;

/// Which items iteration and export show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Only items whose context evaluated to a non-negative priority
    #[default]
    Active,
    /// Every stored item
    All,
}

impl Visibility {
    pub fn shows(self, priority: i32) -> bool {
        match self {
            Visibility::Active => priority >= 0,
            Visibility::All => true,
        }
    }

    pub fn from_all_priorities(all: bool) -> Self {
        if all {
            Visibility::All
        } else {
            Visibility::Active
        }
    }
}

/// How keys are ordered in sorted output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaseMode {
    Sensitive,
    #[default]
    Insensitive,
}

impl CaseMode {
    pub fn from_case_insensitive(insensitive: bool) -> Self {
        if insensitive {
            CaseMode::Insensitive
        } else {
            CaseMode::Sensitive
        }
    }

    /// Compare two keys. Insensitive comparison falls back to a case
    /// sensitive one so the order is total.
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            CaseMode::Sensitive => a.cmp(b),
            CaseMode::Insensitive => {
                let folded = a
                    .chars()
                    .flat_map(char::to_lowercase)
                    .cmp(b.chars().flat_map(char::to_lowercase));
                folded.then_with(|| a.cmp(b))
            }
        }
    }
}

/// Ordering options of sorted output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OutputOrder {
    pub case: CaseMode,
    pub visibility: Visibility,
}

impl OutputOrder {
    pub fn new(case: CaseMode, visibility: Visibility) -> Self {
        Self { case, visibility }
    }
}

impl From<&OutputSection> for OutputOrder {
    fn from(section: &OutputSection) -> Self {
        Self {
            case: CaseMode::from_case_insensitive(section.case_insensitive),
            visibility: Visibility::from_all_priorities(section.all_priorities),
        }
    }
}

/// blake3 digest over the JSON form of `contents`, hex encoded
pub fn signature<T: Serialize + ?Sized>(contents: &T) -> Result<String> {
    let bytes = serde_json::to_vec(contents)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
