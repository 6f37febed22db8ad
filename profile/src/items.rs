//! Keyed tables of item chains

use crate::chain::Chain;
use crate::merge;
use crate::order::{self, CaseMode, OutputOrder, Visibility};
use crate::table::KeyedTable;
use crate::{Change, MergeRules, Result};
use buckos_model::{ContextSet, Item, KeyScope};
use std::sync::Arc;
use tracing::debug;

/// Hash table mapping bucket keys to chains of items.
///
/// Two key scopes are involved: `bucket` derives the hash key an item is
/// stored under, `scope` decides which items of one chain collide.
#[derive(Debug, Clone)]
pub struct ItemTable<T: Item> {
    table: KeyedTable<Chain<T>>,
    rules: MergeRules,
    bucket: KeyScope,
    scope: KeyScope,
    contexts: Option<Arc<ContextSet>>,
    order: OutputOrder,
}

impl<T: Item> ItemTable<T> {
    pub fn new(rules: MergeRules, bucket: KeyScope, scope: KeyScope) -> Self {
        Self {
            table: KeyedTable::new(),
            rules,
            bucket,
            scope,
            contexts: None,
            order: OutputOrder::default(),
        }
    }

    pub fn rules(&self) -> MergeRules {
        self.rules
    }

    /// Change the rules of the table and of every chain in it
    pub fn set_rules(&mut self, rules: MergeRules) {
        self.rules = rules;
        for chain in self.table.slots_mut() {
            chain.set_rules(rules);
        }
    }

    pub fn bucket_scope(&self) -> KeyScope {
        self.bucket
    }

    pub fn scope(&self) -> KeyScope {
        self.scope
    }

    pub fn contexts(&self) -> Option<&ContextSet> {
        self.contexts.as_deref()
    }

    /// Evaluate merged items against `contexts`. Items already stored
    /// keep their priority until [`ItemTable::reevaluate`] is called.
    pub fn set_contexts(&mut self, contexts: Option<Arc<ContextSet>>) {
        self.contexts = contexts;
    }

    pub fn order(&self) -> OutputOrder {
        self.order
    }

    pub fn set_order(&mut self, order: OutputOrder) {
        self.order = order;
    }

    /// Number of distinct bucket keys
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of stored items, active or not
    pub fn item_count(&self) -> usize {
        self.table.item_count()
    }

    pub fn buckets(&self) -> usize {
        self.table.buckets()
    }

    pub fn load_factor(&self) -> f64 {
        self.table.load_factor()
    }

    /// Bucket key of an item
    pub fn key_of(&self, item: &T) -> String {
        self.bucket.key(item).into_owned()
    }

    /// Merge one item
    pub fn merge(&mut self, item: impl Into<Arc<T>>) -> Result<Change> {
        let item = item.into();
        let key = self.key_of(&item);
        let (rules, scope) = (self.rules, self.scope);
        let contexts = self.contexts.as_deref();

        self.table.upsert(
            &key,
            || Chain::new(key.clone(), rules, scope),
            |chain| merge::merge(chain, item, contexts),
        )
    }

    /// Replay the items of a chain, in order
    pub fn merge_chain(&mut self, chain: &Chain<T>) -> Result<Change> {
        chain.iter().try_fold(Change::Unchanged, |change, item| {
            Ok(change.aggregate(self.merge(Arc::clone(item))?))
        })
    }

    /// Replay every item of `other` in its iteration order
    pub fn merge_table(&mut self, other: &ItemTable<T>) -> Result<Change> {
        let mut change = Change::Unchanged;
        for chain in other.chains() {
            change = change.aggregate(self.merge_chain(chain)?);
        }
        Ok(change)
    }

    pub fn find(&self, key: &str) -> Option<&Chain<T>> {
        self.table.find(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    /// The active item for a bucket key
    pub fn active(&self, key: &str) -> Option<&Arc<T>> {
        self.find(key).and_then(Chain::active)
    }

    /// Remove a whole chain
    pub fn remove(&mut self, key: &str) -> Option<Chain<T>> {
        self.table.remove(key)
    }

    /// Chains in bucket order
    pub fn chains(&self) -> impl Iterator<Item = &Chain<T>> + '_ {
        self.table.slots()
    }

    /// Items in bucket order, then chain order
    pub fn items(&self, visibility: Visibility) -> impl Iterator<Item = &Arc<T>> + '_ {
        self.chains().flat_map(move |chain| chain.visible(visibility))
    }

    /// Active items
    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> + '_ {
        self.items(Visibility::Active)
    }

    /// Every item including inactive ones
    pub fn iter_all(&self) -> impl Iterator<Item = &Arc<T>> + '_ {
        self.items(Visibility::All)
    }

    /// Chains ordered by key
    pub fn sorted_chains(&self, case: CaseMode) -> Vec<&Chain<T>> {
        let mut chains: Vec<&Chain<T>> = self.chains().collect();
        chains.sort_by(|a, b| case.compare(a.key(), b.key()));
        chains
    }

    /// Items ordered by key, then by the item comparator, using the
    /// table's output order
    pub fn sorted(&self) -> Vec<Arc<T>> {
        self.sorted_by(self.order)
    }

    pub fn sorted_by(&self, order: OutputOrder) -> Vec<Arc<T>> {
        self.sorted_chains(order.case)
            .into_iter()
            .flat_map(|chain| chain.sorted(order.visibility))
            .collect()
    }

    /// One winning item per name and architecture, sorted
    pub fn resolve(&self) -> Vec<Arc<T>> {
        self.sorted_chains(self.order.case)
            .into_iter()
            .flat_map(|chain| {
                let mut winners: Vec<Arc<T>> =
                    chain.resolved().into_iter().map(Arc::clone).collect();
                winners.sort_by(|a, b| a.compare(b));
                winners
            })
            .collect()
    }

    /// Digest of the sorted active contents. Independent of insertion
    /// order, bucket count and output order.
    pub fn signature(&self) -> Result<String> {
        let items = self.sorted_by(OutputOrder::new(CaseMode::Sensitive, Visibility::Active));
        let items: Vec<&T> = items.iter().map(|item| &**item).collect();
        order::signature(&items)
    }

    /// Drop inactive items and the chains they leave empty
    pub fn prune_inactive(&mut self) -> usize {
        let pruned: usize = self.table.slots_mut().map(Chain::prune_inactive).sum();
        self.table.retain(|chain| !chain.is_empty());
        if pruned > 0 {
            debug!(pruned, "pruned inactive {}s", T::KIND);
        }
        pruned
    }

    /// Adopt a new context set and re-evaluate every stored item.
    /// Returns how many items changed priority.
    pub fn reevaluate(&mut self, contexts: Arc<ContextSet>) -> Result<usize> {
        let mut changed = 0;
        for chain in self.table.slots_mut() {
            changed += chain.reevaluate(&contexts)?;
        }
        self.contexts = Some(contexts);
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buckos_model::Resource;
    use pretty_assertions::assert_eq;

    fn resources() -> ItemTable<Resource> {
        ItemTable::new(
            MergeRules::SQUASH_IDENTICAL | MergeRules::USE_PRIORITY,
            KeyScope::Name,
            KeyScope::NameArchContext,
        )
    }

    fn resource(name: &str, value: &str, context: &str) -> Resource {
        Resource::builder(name)
            .value(value)
            .context(context)
            .build()
            .unwrap()
    }

    #[test]
    fn test_merge_groups_by_name() {
        let mut table = resources();
        table.merge(resource("ntp", "pool", "")).unwrap();
        table.merge(resource("ntp", "office", "laptop")).unwrap();
        table.merge(resource("dns", "1.1.1.1", "")).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.item_count(), 3);
        assert_eq!(table.find("ntp").unwrap().len(), 2);
    }

    #[test]
    fn test_contexts_decide_active() {
        let mut table = resources();
        table.set_contexts(Some(Arc::new(ContextSet::from_layers(["laptop"]).unwrap())));
        table.merge(resource("ntp", "pool", "")).unwrap();
        table.merge(resource("ntp", "office", "laptop")).unwrap();
        table.merge(resource("ntp", "dc", "server")).unwrap();

        assert_eq!(table.active("ntp").unwrap().value(), "office");
        assert_eq!(table.iter().count(), 2);
        assert_eq!(table.iter_all().count(), 3);

        let resolved: Vec<_> = table.resolve().iter().map(|r| r.value().to_string()).collect();
        assert_eq!(resolved, vec!["office"]);
    }

    #[test]
    fn test_reevaluate_then_prune() {
        let mut table = resources();
        table.set_contexts(Some(Arc::new(ContextSet::from_layers(["laptop"]).unwrap())));
        table.merge(resource("ntp", "office", "laptop")).unwrap();
        table.merge(resource("dns", "1.1.1.1", "")).unwrap();

        assert_eq!(table.reevaluate(Arc::new(ContextSet::new())).unwrap(), 1);
        assert!(table.active("ntp").is_none());

        assert_eq!(table.prune_inactive(), 1);
        assert_eq!(table.len(), 1);
        assert!(!table.contains_key("ntp"));
    }

    #[test]
    fn test_set_rules_reaches_chains() {
        let mut table = resources();
        table.merge(resource("ntp", "pool", "")).unwrap();
        table.set_rules(MergeRules::KEEP_ALL);
        assert_eq!(table.find("ntp").unwrap().rules(), MergeRules::KEEP_ALL);

        table.merge(resource("ntp", "other", "")).unwrap();
        assert_eq!(table.item_count(), 2);
    }

    #[test]
    fn test_merge_table() {
        let mut source = resources();
        source.merge(resource("a", "1", "")).unwrap();
        source.merge(resource("b", "2", "")).unwrap();

        let mut target = resources();
        assert_eq!(target.merge_table(&source).unwrap(), Change::Modified);
        assert_eq!(target.merge_table(&source).unwrap(), Change::Unchanged);
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn test_signature_ignores_insertion_order() {
        let mut a = resources();
        let mut b = resources();
        for name in ["x", "y", "z"] {
            a.merge(resource(name, name, "")).unwrap();
        }
        for name in ["z", "x", "y"] {
            b.merge(resource(name, name, "")).unwrap();
        }
        assert_eq!(a.signature().unwrap(), b.signature().unwrap());

        b.merge(resource("w", "w", "")).unwrap();
        assert_ne!(a.signature().unwrap(), b.signature().unwrap());
    }
}
