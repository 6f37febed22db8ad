//! The merge engine
//!
//! Decides what happens when a candidate item meets a chain that may
//! already hold items with the same key. The decision procedure is
//! strictly ordered; see [`MergeRules`] for the precedence table.

use crate::chain::Chain;
use crate::{Change, Error, MergeRules, Result};
use buckos_model::{ContextSet, Directive, Item};
use std::sync::Arc;
use tracing::{debug, trace};

/// Merge `candidate` into `chain`.
///
/// When `contexts` is given, the candidate's context expression is
/// evaluated first and a copy carrying the resulting priority is stored
/// in place of the original handle.
pub fn merge<T: Item>(
    chain: &mut Chain<T>,
    candidate: Arc<T>,
    contexts: Option<&ContextSet>,
) -> Result<Change> {
    if chain.contains(&candidate) {
        trace!(key = chain.key(), "{} {} already present", T::KIND, candidate);
        return Ok(Change::Unchanged);
    }

    let evaluated = evaluate(Arc::clone(&candidate), contexts)?;
    if !Arc::ptr_eq(&evaluated, &candidate) && chain.contains_copy(&evaluated) {
        trace!(key = chain.key(), "{} {} already present as evaluated copy", T::KIND, candidate);
        return Ok(Change::Unchanged);
    }
    let candidate = evaluated;
    let matches = chain.match_indices(&candidate);

    if let Some(change) = apply_directive(chain, &candidate, &matches)? {
        trace!(key = chain.key(), %change, "{} {} resolved by directive", T::KIND, candidate);
        return Ok(change);
    }

    let change = apply_rules(chain, candidate, &matches)?;
    trace!(key = chain.key(), %change, rules = %chain.rules(), "merged {}", T::KIND);
    Ok(change)
}

fn evaluate<T: Item>(candidate: Arc<T>, contexts: Option<&ContextSet>) -> Result<Arc<T>> {
    let Some(contexts) = contexts else {
        return Ok(candidate);
    };

    let priority = contexts.evaluate_item(&*candidate)?;
    if priority == candidate.priority() {
        Ok(candidate)
    } else {
        Ok(Arc::new(candidate.with_priority(priority)))
    }
}

/// Prefix directive handling. Returns `None` when the directives leave
/// the decision to the merge rules.
fn apply_directive<T: Item>(
    chain: &mut Chain<T>,
    candidate: &Arc<T>,
    matches: &[usize],
) -> Result<Option<Change>> {
    let directive = candidate.directive()?;

    if let Some(&pinned) = matches
        .iter()
        .find(|&&index| matches!(chain.item_at(index).directive(), Ok(Some(Directive::Pin))))
    {
        let existing = chain.item_at(pinned);
        debug!(key = chain.key(), "rejecting {}: {} is pinned", candidate, existing);
        return Err(Error::Pinned {
            key: chain.key().to_string(),
            existing: describe(&**existing),
            candidate: describe(&**candidate),
        });
    }

    let Some(directive) = directive else {
        // An entry placed by a directive outranks plain definitions
        let placed_by_directive = matches
            .first()
            .map(|&index| matches!(chain.item_at(index).directive(), Ok(Some(_))))
            .unwrap_or(false);
        return Ok(placed_by_directive.then_some(Change::Unchanged));
    };

    let change = match directive {
        Directive::Remove => {
            if matches.is_empty() {
                Change::Unchanged
            } else {
                chain.remove_indices(matches);
                Change::Removed
            }
        }
        Directive::Add | Directive::Pin => replace_all(chain, candidate, matches),
        Directive::Fallback => {
            if matches.is_empty() {
                chain.push(Arc::clone(candidate));
                Change::Added
            } else {
                Change::Unchanged
            }
        }
        Directive::Upgrade => replace_all(chain, candidate, matches),
    };
    Ok(Some(change))
}

fn apply_rules<T: Item>(chain: &mut Chain<T>, candidate: Arc<T>, matches: &[usize]) -> Result<Change> {
    let Some(&first) = matches.first() else {
        chain.push(candidate);
        return Ok(Change::Added);
    };

    let rules = chain.rules();

    if rules.contains(MergeRules::SQUASH_IDENTICAL) {
        if let Some(&index) = matches
            .iter()
            .find(|&&index| chain.item_at(index).same_fields(&candidate))
        {
            chain.replace_at(index, candidate);
            return Ok(Change::Replaced);
        }
    }

    if rules.contains(MergeRules::KEEP_ALL) {
        chain.push(candidate);
        return Ok(Change::Added);
    }

    if rules.contains(MergeRules::REPLACE) {
        return Ok(replace_all(chain, &candidate, matches));
    }

    if rules.contains(MergeRules::USE_PRIORITY) {
        let existing = chain.item_at(first);
        match candidate.priority().cmp(&existing.priority()) {
            std::cmp::Ordering::Greater => {
                chain.replace_at(first, candidate);
                return Ok(Change::Replaced);
            }
            std::cmp::Ordering::Less => return Ok(Change::Unchanged),
            std::cmp::Ordering::Equal => {}
        }
    }

    Err(conflict(chain, first, &candidate))
}

/// Remove every match and append the candidate
fn replace_all<T: Item>(chain: &mut Chain<T>, candidate: &Arc<T>, matches: &[usize]) -> Change {
    let change = if matches.is_empty() {
        Change::Added
    } else {
        chain.remove_indices(matches);
        Change::Replaced
    };
    chain.push(Arc::clone(candidate));
    change
}

fn conflict<T: Item>(chain: &Chain<T>, index: usize, candidate: &T) -> Error {
    let existing = chain.item_at(index);
    debug!(
        key = chain.key(),
        rules = %chain.rules(),
        "conflicting {} definitions: {} vs {}",
        T::KIND,
        existing,
        candidate
    );
    Error::Conflict {
        kind: T::KIND,
        key: chain.key().to_string(),
        existing: describe(&**existing),
        candidate: describe(candidate),
    }
}

fn describe<T: Item>(item: &T) -> String {
    format!("{} (from {}, priority {})", item, item.derivation(), item.priority())
}
