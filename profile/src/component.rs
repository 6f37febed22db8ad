//! Components and component sets
//!
//! A component groups the resources of one configuration area, e.g.
//! `network` or `ntp`. Resources are addressed as `component.resource`
//! in flat key/value exports.

use crate::chain::Chain;
use crate::items::ItemTable;
use crate::order::{self, CaseMode, OutputOrder, Visibility};
use crate::table::{KeyedTable, Slot};
use crate::{Change, MergeRules, Result};
use buckos_config::ProfileConfig;
use buckos_model::{ContextSet, Derivation, KeyScope, ModelError, Resource};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Named table of resources
#[derive(Debug, Clone)]
pub struct Component {
    name: String,
    resources: ItemTable<Resource>,
}

impl Component {
    pub fn new(name: impl Into<String>, rules: MergeRules) -> Result<Self> {
        Self::with_scope(name, rules, KeyScope::NameArchContext)
    }

    pub fn with_scope(name: impl Into<String>, rules: MergeRules, scope: KeyScope) -> Result<Self> {
        let name = name.into();
        validate_component_name(&name)?;
        Ok(Self {
            name,
            resources: ItemTable::new(rules, KeyScope::Name, scope),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resources(&self) -> &ItemTable<Resource> {
        &self.resources
    }

    pub fn rules(&self) -> MergeRules {
        self.resources.rules()
    }

    pub fn set_rules(&mut self, rules: MergeRules) {
        self.resources.set_rules(rules);
    }

    pub fn set_contexts(&mut self, contexts: Option<Arc<ContextSet>>) {
        self.resources.set_contexts(contexts);
    }

    /// Number of distinct resource names
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn merge(&mut self, resource: impl Into<Arc<Resource>>) -> Result<Change> {
        self.resources.merge(resource)
    }

    /// Replay every resource of `other`
    pub fn merge_component(&mut self, other: &Component) -> Result<Change> {
        self.resources.merge_table(&other.resources)
    }

    pub fn find(&self, name: &str) -> Option<&Chain<Resource>> {
        self.resources.find(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// Active definition of a resource
    pub fn resource(&self, name: &str) -> Option<&Arc<Resource>> {
        self.resources.active(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Resource>> + '_ {
        self.resources.iter()
    }

    pub fn sorted(&self, order: OutputOrder) -> Vec<Arc<Resource>> {
        self.resources.sorted_by(order)
    }
}

impl Slot for Component {
    fn key(&self) -> &str {
        &self.name
    }

    fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    fn item_count(&self) -> usize {
        self.resources.item_count()
    }

    fn absorb(&mut self, other: Self) -> Result<Change> {
        self.merge_component(&other)
    }
}

fn validate_component_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ModelError::validation("component", "name must not be empty").into());
    }
    if name.contains('.') || name.chars().any(char::is_whitespace) {
        return Err(ModelError::validation(
            "component",
            format!("'{}' must not contain dots or whitespace", name),
        )
        .into());
    }
    Ok(())
}

/// Hash table of components keyed by name
#[derive(Debug, Clone)]
pub struct ComponentSet {
    table: KeyedTable<Component>,
    rules: MergeRules,
    scope: KeyScope,
    contexts: Option<Arc<ContextSet>>,
    order: OutputOrder,
}

impl Default for ComponentSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::with_rules(MergeRules::SQUASH_IDENTICAL | MergeRules::USE_PRIORITY)
    }

    /// Component set whose components merge resources with `rules`
    pub fn with_rules(rules: MergeRules) -> Self {
        Self {
            table: KeyedTable::new(),
            rules,
            scope: KeyScope::NameArchContext,
            contexts: None,
            order: OutputOrder::default(),
        }
    }

    /// Build an empty set from profile configuration
    pub fn from_config(config: &ProfileConfig) -> Result<Self> {
        let mut set = Self::with_rules(MergeRules::from_names(&config.merge.resources)?);
        set.scope = config.keys.resource_scope;
        set.contexts = Some(Arc::new(config.context_set()?));
        set.order = OutputOrder::from(&config.output);
        info!(
            rules = %set.rules,
            scope = %set.scope,
            contexts = config.contexts.len(),
            "configured component set"
        );
        Ok(set)
    }

    pub fn rules(&self) -> MergeRules {
        self.rules
    }

    /// Change the rules of the set and of every component in it
    pub fn set_rules(&mut self, rules: MergeRules) {
        self.rules = rules;
        for component in self.table.slots_mut() {
            component.set_rules(rules);
        }
    }

    pub fn contexts(&self) -> Option<&ContextSet> {
        self.contexts.as_deref()
    }

    pub fn set_contexts(&mut self, contexts: Option<Arc<ContextSet>>) {
        for component in self.table.slots_mut() {
            component.set_contexts(contexts.clone());
        }
        self.contexts = contexts;
    }

    pub fn order(&self) -> OutputOrder {
        self.order
    }

    pub fn set_order(&mut self, order: OutputOrder) {
        self.order = order;
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of resources over all components
    pub fn item_count(&self) -> usize {
        self.table.item_count()
    }

    pub fn buckets(&self) -> usize {
        self.table.buckets()
    }

    /// Merge a resource into the named component, creating the component
    /// with the set's rules when needed
    pub fn merge_resource(
        &mut self,
        component: &str,
        resource: impl Into<Arc<Resource>>,
    ) -> Result<Change> {
        validate_component_name(component)?;
        let resource = resource.into();
        self.upsert(component, |c| c.merge(resource))
    }

    /// Replay every resource of a component into the component with the
    /// same name
    pub fn merge_component(&mut self, component: &Component) -> Result<Change> {
        self.upsert(component.name(), |c| c.merge_component(component))
    }

    /// Replay every component of `other`
    pub fn merge_set(&mut self, other: &ComponentSet) -> Result<Change> {
        let mut change = Change::Unchanged;
        for component in other.iter() {
            change = change.aggregate(self.merge_component(component)?);
        }
        Ok(change)
    }

    fn upsert(
        &mut self,
        name: &str,
        update: impl FnOnce(&mut Component) -> Result<Change>,
    ) -> Result<Change> {
        let (rules, scope) = (self.rules, self.scope);
        let contexts = self.contexts.clone();

        self.table.upsert(
            name,
            || {
                debug!(component = name, %rules, "creating component");
                let mut component = Component {
                    name: name.to_string(),
                    resources: ItemTable::new(rules, KeyScope::Name, scope),
                };
                component.set_contexts(contexts);
                component
            },
            update,
        )
    }

    pub fn find(&self, name: &str) -> Option<&Component> {
        self.table.find(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Active definition of `component.resource`
    pub fn resource(&self, component: &str, resource: &str) -> Option<&Arc<Resource>> {
        self.find(component)?.resource(resource)
    }

    pub fn remove(&mut self, name: &str) -> Option<Component> {
        self.table.remove(name)
    }

    /// Components in bucket order
    pub fn iter(&self) -> impl Iterator<Item = &Component> + '_ {
        self.table.slots()
    }

    /// `(component, resource)` pairs in bucket order
    pub fn resources(
        &self,
        visibility: Visibility,
    ) -> impl Iterator<Item = (&str, &Arc<Resource>)> + '_ {
        self.iter().flat_map(move |component| {
            component
                .resources
                .items(visibility)
                .map(move |resource| (component.name(), resource))
        })
    }

    /// Components ordered by name, each with its sorted resources
    pub fn sorted(&self) -> Vec<(&Component, Vec<Arc<Resource>>)> {
        self.sorted_by(self.order)
    }

    pub fn sorted_by(&self, order: OutputOrder) -> Vec<(&Component, Vec<Arc<Resource>>)> {
        let mut components: Vec<&Component> = self.iter().collect();
        components.sort_by(|a, b| order.case.compare(a.name(), b.name()));
        components
            .into_iter()
            .map(|component| (component, component.sorted(order)))
            .filter(|(_, resources)| !resources.is_empty())
            .collect()
    }

    /// Flat `component.resource` to active value mapping
    pub fn to_env(&self) -> BTreeMap<String, String> {
        self.iter()
            .flat_map(|component| {
                component.resources.chains().filter_map(move |chain| {
                    chain.active().map(|resource| {
                        (
                            format!("{}.{}", component.name(), chain.key()),
                            resource.value().to_string(),
                        )
                    })
                })
            })
            .collect()
    }

    /// Merge `component.resource=value` pairs, all attributed to
    /// `derivation`
    pub fn from_env<I, K, V>(&mut self, vars: I, derivation: &Derivation) -> Result<Change>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut change = Change::Unchanged;
        for (key, value) in vars {
            let key = key.as_ref();
            let (component, name) = key.split_once('.').ok_or_else(|| {
                ModelError::validation(
                    "environment",
                    format!("'{}' is not of the form component.resource", key),
                )
            })?;
            let resource = Resource::builder(name)
                .value(value)
                .derivation(derivation.clone())
                .build()?;
            change = change.aggregate(self.merge_resource(component, resource)?);
        }
        Ok(change)
    }

    /// Digest of the sorted active contents of every component
    pub fn signature(&self) -> Result<String> {
        let sorted = self.sorted_by(OutputOrder::new(CaseMode::Sensitive, Visibility::Active));
        let contents: Vec<(&str, Vec<&Resource>)> = sorted
            .iter()
            .map(|(component, resources)| {
                (component.name(), resources.iter().map(|r| &**r).collect())
            })
            .collect();
        order::signature(&contents)
    }

    /// Drop inactive resources and emptied components
    pub fn prune_inactive(&mut self) -> usize {
        let pruned: usize = self
            .table
            .slots_mut()
            .map(|component| component.resources.prune_inactive())
            .sum();
        self.table.retain(|component| !component.is_empty());
        pruned
    }

    /// Adopt a new context set and re-evaluate every resource
    pub fn reevaluate(&mut self, contexts: Arc<ContextSet>) -> Result<usize> {
        let mut changed = 0;
        for component in self.table.slots_mut() {
            changed += component.resources.reevaluate(Arc::clone(&contexts))?;
        }
        self.contexts = Some(contexts);
        Ok(changed)
    }
}
