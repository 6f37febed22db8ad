//! A complete host profile: components plus packages

use crate::component::ComponentSet;
use crate::order;
use crate::packages::PackageSet;
use crate::{Change, Result};
use buckos_config::{ConfigLoader, ProfileConfig};
use buckos_model::ContextSet;
use std::sync::Arc;
use tracing::debug;

/// Resources and packages of one host, evaluated against one set of
/// enabled contexts
#[derive(Debug, Clone, Default)]
pub struct Profile {
    components: ComponentSet,
    packages: PackageSet,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty profile configured from `config`
    pub fn from_config(config: &ProfileConfig) -> Result<Self> {
        Ok(Self {
            components: ComponentSet::from_config(config)?,
            packages: PackageSet::from_config(config)?,
        })
    }

    /// Empty profile configured from the files under a loader's root
    pub fn load(loader: &ConfigLoader) -> Result<Self> {
        Self::from_config(&loader.load()?)
    }

    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentSet {
        &mut self.components
    }

    pub fn packages(&self) -> &PackageSet {
        &self.packages
    }

    pub fn packages_mut(&mut self) -> &mut PackageSet {
        &mut self.packages
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.packages.is_empty()
    }

    /// Merge another profile layer on top of this one
    pub fn merge(&mut self, layer: &Profile) -> Result<Change> {
        let components = self.components.merge_set(&layer.components)?;
        let packages = self.packages.merge_set(&layer.packages)?;
        Ok(components.aggregate(packages))
    }

    /// Switch to a new context set, re-evaluating everything stored
    pub fn reevaluate(&mut self, contexts: ContextSet) -> Result<usize> {
        let contexts = Arc::new(contexts);
        let changed = self.components.reevaluate(Arc::clone(&contexts))?
            + self.packages.reevaluate(contexts)?;
        debug!(changed, "re-evaluated profile contexts");
        Ok(changed)
    }

    pub fn prune_inactive(&mut self) -> usize {
        self.components.prune_inactive() + self.packages.prune_inactive()
    }

    /// Digest over the component and package signatures
    pub fn signature(&self) -> Result<String> {
        order::signature(&[self.components.signature()?, self.packages.signature()?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buckos_model::{Package, Resource};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_config_applies_contexts() {
        let mut config = ProfileConfig::default();
        config.enable_context("laptop", 2);
        let mut profile = Profile::from_config(&config).unwrap();

        profile
            .components_mut()
            .merge_resource(
                "power",
                Resource::builder("governor")
                    .value("powersave")
                    .context("laptop")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        profile
            .components_mut()
            .merge_resource(
                "power",
                Resource::builder("governor")
                    .value("performance")
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let active = profile.components().resource("power", "governor").unwrap();
        assert_eq!(active.value(), "powersave");

        assert_eq!(profile.reevaluate(ContextSet::new()).unwrap(), 1);
        let active = profile.components().resource("power", "governor").unwrap();
        assert_eq!(active.value(), "performance");
    }

    #[test]
    fn test_merge_layers() {
        let mut base = Profile::new();
        base.packages_mut()
            .merge(Package::new("bash", "5.2").unwrap())
            .unwrap();

        let mut layer = Profile::new();
        layer
            .packages_mut()
            .merge(Package::new("zsh", "5.9").unwrap())
            .unwrap();

        assert_eq!(base.merge(&layer).unwrap(), Change::Modified);
        assert_eq!(base.packages().len(), 2);
        assert_eq!(base.merge(&layer).unwrap(), Change::Unchanged);
    }

    #[test]
    fn test_signature_tracks_contents() {
        let mut a = Profile::new();
        let b = Profile::new();
        assert_eq!(a.signature().unwrap(), b.signature().unwrap());

        a.components_mut()
            .merge_resource("ntp", Resource::new("server", "pool").unwrap())
            .unwrap();
        assert_ne!(a.signature().unwrap(), b.signature().unwrap());
    }
}
