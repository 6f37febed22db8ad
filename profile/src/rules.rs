//! Merge rules and merge outcomes

use crate::{Error, Result};
use bitflags::bitflags;
use buckos_config::ConfigError;
use std::fmt;

bitflags! {
    /// Rules deciding how a candidate item is merged into a chain that
    /// already holds an item with the same key.
    ///
    /// Several rules may be combined. They are always consulted in this
    /// order, and the first applicable one decides:
    ///
    /// 1. identity: the very same item handle is already present (always)
    /// 2. prefix directives on packages (always)
    /// 3. no existing item with the key: add (always)
    /// 4. [`MergeRules::SQUASH_IDENTICAL`]
    /// 5. [`MergeRules::KEEP_ALL`]
    /// 6. [`MergeRules::REPLACE`]
    /// 7. [`MergeRules::USE_PRIORITY`]
    /// 8. otherwise the merge is a conflict
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MergeRules: u32 {
        /// An item identical to an existing one (ignoring derivation)
        /// replaces it, refreshing the derivation
        const SQUASH_IDENTICAL = 1 << 0;
        /// Every variant is kept next to the existing ones
        const KEEP_ALL = 1 << 1;
        /// The candidate always replaces existing items
        const REPLACE = 1 << 2;
        /// The higher evaluated priority wins; equal priorities conflict
        const USE_PRIORITY = 1 << 3;
    }
}

impl MergeRules {
    /// Configuration name of a single rule
    pub fn name(self) -> Option<&'static str> {
        [
            (MergeRules::SQUASH_IDENTICAL, "squash-identical"),
            (MergeRules::KEEP_ALL, "keep-all"),
            (MergeRules::REPLACE, "replace"),
            (MergeRules::USE_PRIORITY, "use-priority"),
        ]
        .into_iter()
        .find(|(rule, _)| *rule == self)
        .map(|(_, name)| name)
    }

    /// Parse a single rule name
    pub fn parse_name(name: &str) -> Option<Self> {
        match name.trim() {
            "squash-identical" => Some(MergeRules::SQUASH_IDENTICAL),
            "keep-all" => Some(MergeRules::KEEP_ALL),
            "replace" => Some(MergeRules::REPLACE),
            "use-priority" => Some(MergeRules::USE_PRIORITY),
            _ => None,
        }
    }

    /// Combine a list of rule names
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(MergeRules::empty(), |rules, name| {
            let name = name.as_ref();
            Self::parse_name(name)
                .map(|rule| rules | rule)
                .ok_or_else(|| Error::Config(ConfigError::UnknownRule(name.to_string())))
        })
    }

    /// Names of all rules set, in precedence order
    pub fn names(self) -> Vec<&'static str> {
        self.iter().filter_map(MergeRules::name).collect()
    }
}

impl fmt::Display for MergeRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        write!(f, "{}", self.names().join("|"))
    }
}

/// Outcome of a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    /// The candidate was appended
    Added,
    /// Existing items were removed and nothing was added
    Removed,
    /// Existing items were replaced by the candidate
    Replaced,
    /// An aggregate merge changed at least one item
    Modified,
    /// Nothing changed
    Unchanged,
}

impl Change {
    pub fn is_change(self) -> bool {
        self != Change::Unchanged
    }

    /// Fold per-item outcomes of an aggregate merge
    pub fn aggregate(self, other: Change) -> Change {
        if self.is_change() || other.is_change() {
            Change::Modified
        } else {
            Change::Unchanged
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Change::Added => "added",
            Change::Removed => "removed",
            Change::Replaced => "replaced",
            Change::Modified => "modified",
            Change::Unchanged => "unchanged",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_from_names() {
        let rules = MergeRules::from_names(["squash-identical", "keep-all"]).unwrap();
        assert_eq!(rules, MergeRules::SQUASH_IDENTICAL | MergeRules::KEEP_ALL);
        assert_eq!(MergeRules::from_names(Vec::<String>::new()).unwrap(), MergeRules::empty());
    }

    #[test]
    fn test_unknown_name() {
        assert_matches!(
            MergeRules::from_names(["replace", "newest"]),
            Err(Error::Config(ConfigError::UnknownRule(name))) if name == "newest"
        );
    }

    #[test]
    fn test_names_in_precedence_order() {
        let rules = MergeRules::USE_PRIORITY | MergeRules::SQUASH_IDENTICAL;
        assert_eq!(rules.names(), vec!["squash-identical", "use-priority"]);
        assert_eq!(rules.to_string(), "squash-identical|use-priority");
        assert_eq!(MergeRules::empty().to_string(), "none");
    }

    #[test]
    fn test_aggregate() {
        assert_eq!(Change::Unchanged.aggregate(Change::Unchanged), Change::Unchanged);
        assert_eq!(Change::Unchanged.aggregate(Change::Added), Change::Modified);
        assert_eq!(Change::Removed.aggregate(Change::Unchanged), Change::Modified);
    }
}
