//! Package sets and package lists

use crate::chain::Chain;
use crate::items::ItemTable;
use crate::order::{self, OutputOrder, Visibility};
use crate::{Change, MergeRules, Result};
use buckos_config::ProfileConfig;
use buckos_model::{ContextSet, Item, KeyScope, Package};
use std::sync::Arc;
use tracing::info;

/// Packages hashed by name, or by `name.arch` when bucketing by
/// architecture
#[derive(Debug, Clone)]
pub struct PackageSet {
    packages: ItemTable<Package>,
}

impl Default for PackageSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageSet {
    pub fn new() -> Self {
        Self::with_rules(MergeRules::SQUASH_IDENTICAL | MergeRules::USE_PRIORITY)
    }

    pub fn with_rules(rules: MergeRules) -> Self {
        Self::with_options(rules, KeyScope::NameArch, false)
    }

    /// Package set with explicit collision scope and bucketing
    pub fn with_options(rules: MergeRules, scope: KeyScope, bucket_by_arch: bool) -> Self {
        let bucket = if bucket_by_arch {
            KeyScope::NameArch
        } else {
            KeyScope::Name
        };
        Self {
            packages: ItemTable::new(rules, bucket, scope),
        }
    }

    /// Build an empty set from profile configuration
    pub fn from_config(config: &ProfileConfig) -> Result<Self> {
        let rules = MergeRules::from_names(&config.merge.packages)?;
        let mut set = Self::with_options(
            rules,
            config.keys.package_scope,
            config.keys.bucket_by_arch,
        );
        set.set_contexts(Some(Arc::new(config.context_set()?)));
        set.set_order(OutputOrder::from(&config.output));
        info!(
            %rules,
            scope = %config.keys.package_scope,
            bucket_by_arch = config.keys.bucket_by_arch,
            "configured package set"
        );
        Ok(set)
    }

    pub fn table(&self) -> &ItemTable<Package> {
        &self.packages
    }

    pub fn bucket_by_arch(&self) -> bool {
        self.packages.bucket_scope() == KeyScope::NameArch
    }

    pub fn rules(&self) -> MergeRules {
        self.packages.rules()
    }

    pub fn set_rules(&mut self, rules: MergeRules) {
        self.packages.set_rules(rules);
    }

    pub fn set_contexts(&mut self, contexts: Option<Arc<ContextSet>>) {
        self.packages.set_contexts(contexts);
    }

    pub fn set_order(&mut self, order: OutputOrder) {
        self.packages.set_order(order);
    }

    /// Number of distinct bucket keys
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.packages.item_count()
    }

    pub fn merge(&mut self, package: impl Into<Arc<Package>>) -> Result<Change> {
        self.packages.merge(package)
    }

    /// Replay a package list in order
    pub fn merge_list(&mut self, list: &PackageList) -> Result<Change> {
        self.packages.merge_chain(&list.chain)
    }

    /// Replay every package of `other`
    pub fn merge_set(&mut self, other: &PackageSet) -> Result<Change> {
        self.packages.merge_table(&other.packages)
    }

    /// Chain stored under a bucket key
    pub fn find(&self, key: &str) -> Option<&Chain<Package>> {
        self.packages.find(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.packages.contains_key(key)
    }

    /// Active package for a name and architecture
    pub fn find_package(&self, name: &str, arch: Option<&str>) -> Option<&Arc<Package>> {
        let key = match (self.bucket_by_arch(), arch) {
            (true, Some(arch)) => format!("{}.{}", name, arch),
            _ => name.to_string(),
        };
        self.packages.find(&key)?.active_for(name, arch)
    }

    pub fn remove(&mut self, key: &str) -> Option<Chain<Package>> {
        self.packages.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Package>> + '_ {
        self.packages.iter()
    }

    pub fn iter_all(&self) -> impl Iterator<Item = &Arc<Package>> + '_ {
        self.packages.iter_all()
    }

    pub fn sorted(&self) -> Vec<Arc<Package>> {
        self.packages.sorted()
    }

    pub fn sorted_by(&self, order: OutputOrder) -> Vec<Arc<Package>> {
        self.packages.sorted_by(order)
    }

    pub fn resolve(&self) -> Vec<Arc<Package>> {
        self.packages.resolve()
    }

    pub fn signature(&self) -> Result<String> {
        self.packages.signature()
    }

    pub fn prune_inactive(&mut self) -> usize {
        self.packages.prune_inactive()
    }

    pub fn reevaluate(&mut self, contexts: Arc<ContextSet>) -> Result<usize> {
        self.packages.reevaluate(contexts)
    }
}

/// Ordered list of packages without hashing, e.g. the packages of one
/// profile layer before they are merged into a set
#[derive(Debug, Clone)]
pub struct PackageList {
    chain: Chain<Package>,
    contexts: Option<Arc<ContextSet>>,
}

impl Default for PackageList {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageList {
    pub fn new() -> Self {
        Self::with_rules(MergeRules::SQUASH_IDENTICAL | MergeRules::KEEP_ALL)
    }

    pub fn with_rules(rules: MergeRules) -> Self {
        Self {
            chain: Chain::new("packages", rules, KeyScope::NameArch),
            contexts: None,
        }
    }

    pub fn rules(&self) -> MergeRules {
        self.chain.rules()
    }

    pub fn set_rules(&mut self, rules: MergeRules) {
        self.chain.set_rules(rules);
    }

    pub fn set_contexts(&mut self, contexts: Option<Arc<ContextSet>>) {
        self.contexts = contexts;
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn merge(&mut self, package: impl Into<Arc<Package>>) -> Result<Change> {
        match self.contexts.as_deref() {
            Some(contexts) => self.chain.merge_with(package, contexts),
            None => self.chain.merge(package),
        }
    }

    /// Replay another list in order
    pub fn merge_list(&mut self, other: &PackageList) -> Result<Change> {
        self.chain.merge_chain(&other.chain, self.contexts.as_deref())
    }

    /// Packages in list order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Package>> + '_ {
        self.chain.visible(Visibility::Active)
    }

    pub fn iter_all(&self) -> impl Iterator<Item = &Arc<Package>> + '_ {
        self.chain.iter()
    }

    /// Every package with the given name, in list order
    pub fn find<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Arc<Package>> + 'a {
        self.chain.iter().filter(move |package| package.name() == name)
    }

    pub fn sorted(&self) -> Vec<Arc<Package>> {
        self.chain.sorted(Visibility::Active)
    }

    /// Sort the list in place by the package comparator
    pub fn sort(&mut self) {
        self.chain.sort();
    }

    pub fn signature(&self) -> Result<String> {
        let sorted = self.sorted();
        let packages: Vec<&Package> = sorted.iter().map(|p| &**p).collect();
        order::signature(&packages)
    }
}

impl FromIterator<Package> for PackageList {
    /// Collect packages without rule checks; later duplicates are kept
    fn from_iter<I: IntoIterator<Item = Package>>(iter: I) -> Self {
        let mut list = PackageList::with_rules(MergeRules::KEEP_ALL);
        for package in iter {
            list.chain.push(Arc::new(package));
        }
        list
    }
}
