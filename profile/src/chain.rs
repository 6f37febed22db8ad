//! Value chains
//!
//! A chain holds every variant of one key in insertion order: the
//! package `foo` for several architectures, or the resource `hostname`
//! defined in several contexts. Which variants collide with each other is
//! decided by the chain's [`KeyScope`].

use crate::merge;
use crate::order::Visibility;
use crate::table::Slot;
use crate::{Change, MergeRules, Result};
use buckos_model::{ContextSet, Item, KeyScope};
use std::sync::Arc;

/// Ordered sequence of items sharing a bucket key
#[derive(Debug, Clone)]
pub struct Chain<T: Item> {
    key: String,
    items: Vec<Arc<T>>,
    rules: MergeRules,
    scope: KeyScope,
}

impl<T: Item> Chain<T> {
    /// Create an empty chain
    pub fn new(key: impl Into<String>, rules: MergeRules, scope: KeyScope) -> Self {
        Self {
            key: key.into(),
            items: Vec::new(),
            rules,
            scope,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn rules(&self) -> MergeRules {
        self.rules
    }

    /// Change the rules used by subsequent merges
    pub fn set_rules(&mut self, rules: MergeRules) {
        self.rules = rules;
    }

    pub fn scope(&self) -> KeyScope {
        self.scope
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in insertion order, including inactive ones
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<T>> {
        self.items.iter()
    }

    /// Items filtered by visibility
    pub fn visible(&self, visibility: Visibility) -> impl Iterator<Item = &Arc<T>> + '_ {
        self.items
            .iter()
            .filter(move |item| visibility.shows(item.priority()))
    }

    pub fn first(&self) -> Option<&Arc<T>> {
        self.items.first()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<T>> {
        self.items.get(index)
    }

    /// Whether this exact handle is stored in the chain
    pub fn contains(&self, item: &Arc<T>) -> bool {
        self.items.iter().any(|i| Arc::ptr_eq(i, item))
    }

    /// Whether the chain holds a copy of `item` made from the same handle:
    /// equal fields and priority over a shared derivation
    pub(crate) fn contains_copy(&self, item: &T) -> bool {
        self.items.iter().any(|existing| {
            existing.priority() == item.priority()
                && existing.derivation().shares(item.derivation())
                && existing.same_fields(item)
        })
    }

    /// Items colliding with `item` under the chain's key scope
    pub fn matching<'a>(&'a self, item: &'a T) -> impl Iterator<Item = &'a Arc<T>> + 'a {
        self.items
            .iter()
            .filter(move |existing| self.collides(existing, item))
    }

    /// The active item with the highest priority; the earliest one wins
    /// among equals
    pub fn active(&self) -> Option<&Arc<T>> {
        best(self.items.iter())
    }

    /// Like [`Chain::active`], restricted to one name and architecture
    pub fn active_for(&self, name: &str, arch: Option<&str>) -> Option<&Arc<T>> {
        best(
            self.items
                .iter()
                .filter(|item| item.name() == name && item.arch() == arch),
        )
    }

    /// The winning item per name and architecture, in first-seen order
    pub fn resolved(&self) -> Vec<&Arc<T>> {
        let mut winners: Vec<&Arc<T>> = Vec::new();
        for item in self.items.iter().filter(|item| item.is_active()) {
            match winners
                .iter_mut()
                .find(|w| w.name() == item.name() && w.arch() == item.arch())
            {
                Some(winner) if winner.priority() < item.priority() => *winner = item,
                Some(_) => {}
                None => winners.push(item),
            }
        }
        winners
    }

    /// Merge a candidate item
    pub fn merge(&mut self, item: impl Into<Arc<T>>) -> Result<Change> {
        merge::merge(self, item.into(), None)
    }

    /// Merge a candidate item, evaluating its context first
    pub fn merge_with(&mut self, item: impl Into<Arc<T>>, contexts: &ContextSet) -> Result<Change> {
        merge::merge(self, item.into(), Some(contexts))
    }

    /// Replay every item of `other`, in order
    pub fn merge_chain(&mut self, other: &Chain<T>, contexts: Option<&ContextSet>) -> Result<Change> {
        let mut change = Change::Unchanged;
        for item in other.iter() {
            change = change.aggregate(merge::merge(self, Arc::clone(item), contexts)?);
        }
        Ok(change)
    }

    /// Sort by the full item comparator
    pub fn sort(&mut self) {
        self.items.sort_by(|a, b| a.compare(b));
    }

    /// Items sorted by the full comparator, leaving the chain untouched
    pub fn sorted(&self, visibility: Visibility) -> Vec<Arc<T>> {
        let mut items: Vec<Arc<T>> = self.visible(visibility).cloned().collect();
        items.sort_by(|a, b| a.compare(b));
        items
    }

    /// Drop inactive items, returning how many were removed
    pub fn prune_inactive(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.is_active());
        before - self.items.len()
    }

    /// Re-evaluate every item's priority, swapping in new handles where
    /// the priority changed. Returns how many items changed.
    pub fn reevaluate(&mut self, contexts: &ContextSet) -> Result<usize> {
        let mut changed = 0;
        for slot in self.items.iter_mut() {
            let priority = contexts.evaluate_item(&**slot)?;
            if priority != slot.priority() {
                *slot = Arc::new(slot.with_priority(priority));
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn collides(&self, existing: &Arc<T>, item: &T) -> bool {
        self.scope.matches(&**existing, item)
    }

    pub(crate) fn push(&mut self, item: Arc<T>) {
        self.items.push(item);
    }

    pub(crate) fn replace_at(&mut self, index: usize, item: Arc<T>) {
        self.items[index] = item;
    }

    /// Remove the items at the given ascending indices
    pub(crate) fn remove_indices(&mut self, indices: &[usize]) {
        for &index in indices.iter().rev() {
            self.items.remove(index);
        }
    }

    pub(crate) fn item_at(&self, index: usize) -> &Arc<T> {
        &self.items[index]
    }

    /// Indices of the items colliding with `item`
    pub(crate) fn match_indices(&self, item: &T) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, existing)| self.collides(existing, item))
            .map(|(index, _)| index)
            .collect()
    }
}

fn best<'a, T: Item + 'a>(items: impl Iterator<Item = &'a Arc<T>>) -> Option<&'a Arc<T>> {
    items
        .filter(|item| item.is_active())
        .fold(None, |best: Option<&Arc<T>>, item| match best {
            Some(b) if b.priority() >= item.priority() => Some(b),
            _ => Some(item),
        })
}

impl<T: Item> Slot for Chain<T> {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn absorb(&mut self, other: Self) -> Result<Change> {
        self.merge_chain(&other, None)
    }
}

impl<'a, T: Item> IntoIterator for &'a Chain<T> {
    type Item = &'a Arc<T>;
    type IntoIter = std::slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
