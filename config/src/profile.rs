//! Profile configuration
//!
//! Describes how a profile is assembled: which merge rules each container
//! uses, which fields form the primary keys, which contexts are enabled
//! and how output is ordered.
//!
//! ```toml
//! [merge]
//! resources = ["squash-identical", "use-priority"]
//! packages = ["squash-identical", "keep-all"]
//!
//! [keys]
//! package_scope = "name-arch"
//! resource_scope = "name-arch-context"
//! bucket_by_arch = false
//!
//! [contexts]
//! base = 1
//! laptop = 5
//!
//! [output]
//! case_insensitive = true
//! all_priorities = false
//! ```

use crate::{ConfigError, Result};
use buckos_model::{ContextSet, KeyScope};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Merge rule names understood by the profile engine
pub const KNOWN_RULES: [&str; 4] = ["squash-identical", "keep-all", "replace", "use-priority"];

/// Complete profile configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Merge rules per container kind
    pub merge: MergeSection,
    /// Primary key definitions
    pub keys: KeySection,
    /// Enabled contexts and their priorities
    pub contexts: IndexMap<String, i32>,
    /// Output ordering
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSection {
    pub resources: Vec<String>,
    pub packages: Vec<String>,
}

impl Default for MergeSection {
    fn default() -> Self {
        Self {
            resources: vec!["squash-identical".to_string(), "use-priority".to_string()],
            packages: vec!["squash-identical".to_string(), "use-priority".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySection {
    pub package_scope: KeyScope,
    pub resource_scope: KeyScope,
    /// Hash packages by `name.arch` instead of name
    pub bucket_by_arch: bool,
}

impl Default for KeySection {
    fn default() -> Self {
        Self {
            package_scope: KeyScope::NameArch,
            resource_scope: KeyScope::NameArchContext,
            bucket_by_arch: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Sort keys case-insensitively in ordered output
    pub case_insensitive: bool,
    /// Include inactive items in output
    pub all_priorities: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            all_priorities: false,
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            merge: MergeSection::default(),
            keys: KeySection::default(),
            contexts: IndexMap::new(),
            output: OutputSection::default(),
        }
    }
}

impl ProfileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a complete configuration from TOML text
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load a single configuration file
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Build the enabled context set
    pub fn context_set(&self) -> Result<ContextSet> {
        let mut set = ContextSet::new();
        for (name, priority) in &self.contexts {
            set.enable(name.clone(), *priority)?;
        }
        Ok(set)
    }

    /// Enable a context
    pub fn enable_context(&mut self, name: impl Into<String>, priority: i32) {
        self.contexts.insert(name.into(), priority);
    }

    /// Apply a partial configuration on top of this one
    pub fn apply(&mut self, fragment: ProfileFragment) {
        if let Some(merge) = fragment.merge {
            if let Some(resources) = merge.resources {
                self.merge.resources = resources;
            }
            if let Some(packages) = merge.packages {
                self.merge.packages = packages;
            }
        }

        if let Some(keys) = fragment.keys {
            if let Some(scope) = keys.package_scope {
                self.keys.package_scope = scope;
            }
            if let Some(scope) = keys.resource_scope {
                self.keys.resource_scope = scope;
            }
            if let Some(bucket_by_arch) = keys.bucket_by_arch {
                self.keys.bucket_by_arch = bucket_by_arch;
            }
        }

        for (name, priority) in fragment.contexts {
            self.contexts.insert(name, priority);
        }

        if let Some(output) = fragment.output {
            if let Some(case_insensitive) = output.case_insensitive {
                self.output.case_insensitive = case_insensitive;
            }
            if let Some(all_priorities) = output.all_priorities {
                self.output.all_priorities = all_priorities;
            }
        }
    }

    /// Check the configuration for errors
    pub fn validate(&self) -> Result<()> {
        for rule in self.merge.resources.iter().chain(&self.merge.packages) {
            if !KNOWN_RULES.contains(&rule.as_str()) {
                return Err(ConfigError::UnknownRule(rule.clone()));
            }
        }

        if self.keys.bucket_by_arch && self.keys.package_scope == KeyScope::Name {
            return Err(ConfigError::Invalid(
                "bucket_by_arch requires a package_scope that includes the arch".to_string(),
            ));
        }

        // Rejects bad names and non-positive priorities
        self.context_set()?;

        let mut seen: IndexMap<i32, &str> = IndexMap::new();
        for (name, priority) in &self.contexts {
            if let Some(other) = seen.insert(*priority, name) {
                tracing::warn!(
                    "Contexts '{}' and '{}' share priority {}; definitions in both will conflict",
                    other,
                    name,
                    priority
                );
            }
        }

        Ok(())
    }
}

/// Partial configuration as found in `profile.d` fragments
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileFragment {
    pub merge: Option<MergeFragment>,
    pub keys: Option<KeyFragment>,
    pub contexts: IndexMap<String, i32>,
    pub output: Option<OutputFragment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeFragment {
    pub resources: Option<Vec<String>>,
    pub packages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyFragment {
    pub package_scope: Option<KeyScope>,
    pub resource_scope: Option<KeyScope>,
    pub bucket_by_arch: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputFragment {
    pub case_insensitive: Option<bool>,
    pub all_priorities: Option<bool>,
}

impl ProfileFragment {
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParse {
            path: origin.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ProfileConfig::default();
        assert_eq!(config.merge.packages, vec!["squash-identical", "use-priority"]);
        assert_eq!(config.keys.package_scope, KeyScope::NameArch);
        assert_eq!(config.keys.resource_scope, KeyScope::NameArchContext);
        assert!(config.output.case_insensitive);
        assert!(config.contexts.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_parse() {
        let config = ProfileConfig::parse(
            r#"
[merge]
packages = ["squash-identical", "keep-all"]

[keys]
package_scope = "name"
bucket_by_arch = true

[contexts]
base = 1
laptop = 5
"#,
            Path::new("profile.toml"),
        )
        .unwrap();

        assert_eq!(config.merge.packages, vec!["squash-identical", "keep-all"]);
        assert_eq!(config.merge.resources, MergeSection::default().resources);
        assert_eq!(config.keys.package_scope, KeyScope::Name);
        assert!(config.keys.bucket_by_arch);

        let contexts = config.context_set().unwrap();
        assert_eq!(contexts.priority_of("laptop"), Some(5));
        let names: Vec<_> = contexts.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["base", "laptop"]);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = ProfileConfig::parse("[merge", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_unknown_rule() {
        let mut config = ProfileConfig::default();
        config.merge.resources.push("first-wins".to_string());
        assert_matches!(config.validate(), Err(ConfigError::UnknownRule(r)) if r == "first-wins");
    }

    #[test]
    fn test_invalid_context_priority() {
        let mut config = ProfileConfig::default();
        config.enable_context("laptop", 0);
        assert_matches!(config.validate(), Err(ConfigError::Context(_)));
    }

    #[test]
    fn test_bucket_by_arch_needs_arch_scope() {
        let mut config = ProfileConfig::default();
        config.keys.bucket_by_arch = true;
        assert!(config.validate().is_ok());

        config.keys.package_scope = KeyScope::Name;
        assert_matches!(config.validate(), Err(ConfigError::Invalid(_)));
    }

    #[test]
    fn test_apply_fragment() {
        let mut config = ProfileConfig::default();
        config.enable_context("base", 1);

        let fragment = ProfileFragment::parse(
            r#"
[merge]
resources = ["replace"]

[contexts]
laptop = 2

[output]
all_priorities = true
"#,
            Path::new("10-laptop.toml"),
        )
        .unwrap();
        config.apply(fragment);

        assert_eq!(config.merge.resources, vec!["replace"]);
        assert_eq!(config.merge.packages, MergeSection::default().packages);
        assert_eq!(config.contexts.len(), 2);
        assert!(config.output.all_priorities);
        assert!(config.output.case_insensitive);
    }

    #[test]
    fn test_fragment_rejects_unknown_keys() {
        assert!(ProfileFragment::parse("[merge]\nfoo = []\n", Path::new("x.toml")).is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = ProfileConfig::default();
        config.enable_context("base", 1);
        let text = config.to_toml().unwrap();
        let parsed = ProfileConfig::parse(&text, Path::new("rt.toml")).unwrap();
        assert_eq!(parsed, config);
    }
}
