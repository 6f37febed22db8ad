//! Configuration loading utilities
//!
//! A profile configuration lives in a root directory:
//!
//! ```text
//! /etc/buckos/
//! ├── profile.toml          # Base configuration
//! └── profile.d/            # Fragments, applied in file name order
//!     ├── 10-site.toml
//!     └── 50-laptop.toml
//! ```

use crate::profile::ProfileFragment;
use crate::{ConfigError, ProfileConfig, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration loader for profile configuration
pub struct ConfigLoader {
    /// Root path for configuration
    root: PathBuf,
    /// Whether to use default values for missing configs
    use_defaults: bool,
    /// Whether to validate configuration after loading
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            use_defaults: true,
            validate: true,
        }
    }

    /// Create a loader for the default system configuration
    pub fn system() -> Self {
        Self::new(get_config_root())
    }

    /// Set whether to use defaults for missing configs
    pub fn use_defaults(mut self, use_defaults: bool) -> Self {
        self.use_defaults = use_defaults;
        self
    }

    /// Set whether to validate configuration
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Load the complete configuration
    pub fn load(&self) -> Result<ProfileConfig> {
        if !self.root.exists() {
            if self.use_defaults {
                debug!(
                    "Config root {} missing, using defaults",
                    self.root.display()
                );
                return Ok(ProfileConfig::default());
            } else {
                return Err(ConfigError::NotFound(self.root.clone()));
            }
        }

        let config = load_dir(&self.root)?;

        if self.validate {
            config.validate()?;
        }

        info!(
            "Loaded profile configuration from {} ({} contexts)",
            self.root.display(),
            config.contexts.len()
        );
        Ok(config)
    }

    /// Load configuration with overlay from another path
    pub fn load_with_overlay(&self, overlay: &Path) -> Result<ProfileConfig> {
        let mut config = self.load()?;

        if overlay.exists() {
            for fragment in fragments(overlay)? {
                config.apply(fragment);
            }
            if self.validate {
                config.validate()?;
            }
        }

        Ok(config)
    }

    /// Get the configuration root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if a configuration file exists
    pub fn has_config(&self, name: &str) -> bool {
        self.root.join(name).exists()
    }

    /// Get path to a configuration file
    pub fn config_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// List fragment files in load order
    pub fn list_fragments(&self) -> Result<Vec<PathBuf>> {
        fragment_paths(&self.root)
    }
}

fn load_dir(root: &Path) -> Result<ProfileConfig> {
    let mut config = ProfileConfig::default();
    for fragment in fragments(root)? {
        config.apply(fragment);
    }
    Ok(config)
}

/// Parse `profile.toml` and every `profile.d/*.toml` below `root`
fn fragments(root: &Path) -> Result<Vec<ProfileFragment>> {
    let mut result = Vec::new();

    let base = root.join(paths::PROFILE_FILE);
    if base.is_file() {
        let content = std::fs::read_to_string(&base)?;
        result.push(ProfileFragment::parse(&content, &base)?);
        debug!("Loaded {}", base.display());
    }

    for path in fragment_paths(root)? {
        let content = std::fs::read_to_string(&path)?;
        result.push(ProfileFragment::parse(&content, &path)?);
        debug!("Loaded fragment {}", path.display());
    }

    Ok(result)
}

fn fragment_paths(root: &Path) -> Result<Vec<PathBuf>> {
    let dir = root.join(paths::FRAGMENT_DIR);
    if !dir.is_dir() {
        return Ok(vec![]);
    }

    let pattern = dir.join("*.toml");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| ConfigError::InvalidGlob(pattern.display().to_string()))?;

    let mut files = Vec::new();
    for entry in glob::glob(pattern).map_err(|e| ConfigError::InvalidGlob(e.to_string()))? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable fragment: {}", e),
        }
    }

    files.sort();
    Ok(files)
}

/// Default configuration paths
pub mod paths {
    use std::path::PathBuf;

    /// Base configuration file name
    pub const PROFILE_FILE: &str = "profile.toml";

    /// Fragment directory name
    pub const FRAGMENT_DIR: &str = "profile.d";

    /// System configuration root
    pub fn system_config() -> PathBuf {
        PathBuf::from("/etc/buckos")
    }

    /// System profile.toml
    pub fn profile_toml() -> PathBuf {
        system_config().join(PROFILE_FILE)
    }

    /// System fragment directory
    pub fn profile_d() -> PathBuf {
        system_config().join(FRAGMENT_DIR)
    }
}

/// Environment variable names used by the configuration system
pub mod env_vars {
    /// Configuration root override
    pub const CONFIG_ROOT: &str = "BUCKOS_CONFIG_ROOT";
}

/// Get configuration root from environment or default
pub fn get_config_root() -> PathBuf {
    std::env::var(env_vars::CONFIG_ROOT)
        .map(PathBuf::from)
        .unwrap_or_else(|_| paths::system_config())
}

/// Load the default system configuration
pub fn load_system_config() -> Result<ProfileConfig> {
    ConfigLoader::system().load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use buckos_model::KeyScope;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_config_loader_defaults() {
        let loader = ConfigLoader::new("/nonexistent/path");
        let config = loader.load().unwrap();
        assert_eq!(config, ProfileConfig::default());
    }

    #[test]
    fn test_config_loader_no_defaults() {
        let loader = ConfigLoader::new("/nonexistent/path").use_defaults(false);
        assert_matches!(loader.load(), Err(ConfigError::NotFound(_)));
    }

    #[test]
    fn test_fragments_applied_in_order() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "profile.toml",
            "[merge]\npackages = [\"keep-all\"]\n\n[contexts]\nbase = 1\n",
        );
        write(
            temp.path(),
            "profile.d/50-laptop.toml",
            "[contexts]\nlaptop = 5\n\n[keys]\npackage_scope = \"name\"\n",
        );
        write(
            temp.path(),
            "profile.d/10-site.toml",
            "[keys]\npackage_scope = \"name-arch-context\"\n",
        );
        write(temp.path(), "profile.d/README", "not toml");

        let loader = ConfigLoader::new(temp.path());
        let fragments = loader.list_fragments().unwrap();
        assert_eq!(fragments.len(), 2);
        assert!(fragments[0].ends_with("10-site.toml"));

        let config = loader.load().unwrap();
        assert_eq!(config.merge.packages, vec!["keep-all"]);
        assert_eq!(config.keys.package_scope, KeyScope::Name);
        assert_eq!(config.contexts.get("laptop"), Some(&5));
    }

    #[test]
    fn test_validation_on_load() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "profile.toml", "[merge]\nresources = [\"bogus\"]\n");

        assert_matches!(
            ConfigLoader::new(temp.path()).load(),
            Err(ConfigError::UnknownRule(_))
        );
        assert!(ConfigLoader::new(temp.path())
            .validate(false)
            .load()
            .is_ok());
    }

    #[test]
    fn test_overlay() {
        let base = TempDir::new().unwrap();
        let overlay = TempDir::new().unwrap();
        write(base.path(), "profile.toml", "[contexts]\nbase = 1\n");
        write(overlay.path(), "profile.toml", "[contexts]\nuser = 9\n");

        let config = ConfigLoader::new(base.path())
            .load_with_overlay(overlay.path())
            .unwrap();
        assert_eq!(config.contexts.len(), 2);
        assert_eq!(config.contexts.get("user"), Some(&9));
    }

    #[test]
    fn test_paths() {
        assert_eq!(paths::system_config(), PathBuf::from("/etc/buckos"));
        assert_eq!(
            paths::profile_toml(),
            PathBuf::from("/etc/buckos/profile.toml")
        );
        assert_eq!(paths::profile_d(), PathBuf::from("/etc/buckos/profile.d"));
    }
}
