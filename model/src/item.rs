//! The common item contract shared by resources and packages

use crate::{Derivation, Directive, ModelError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

/// A value record stored in profile containers.
///
/// Items are immutable once published: containers hold them behind
/// `Arc` and every change produces a new item through `with_priority`
/// or `with_derivation`.
pub trait Item: fmt::Debug + fmt::Display + Clone + Serialize {
    /// Label used in diagnostics ("resource", "package")
    const KIND: &'static str;

    fn name(&self) -> &str;

    /// Secondary key; resources have none
    fn arch(&self) -> Option<&str> {
        None
    }

    /// Context expression text, empty when the item always applies
    fn context(&self) -> &str;

    fn derivation(&self) -> &Derivation;

    /// Evaluated priority; negative means inactive
    fn priority(&self) -> i32;

    fn is_active(&self) -> bool {
        self.priority() >= 0
    }

    /// Copy of this item with a different priority
    fn with_priority(&self, priority: i32) -> Self;

    /// Copy of this item with a different derivation
    fn with_derivation(&self, derivation: Derivation) -> Self;

    /// Prefix directive carried by the item
    fn directive(&self) -> Result<Option<Directive>> {
        Ok(None)
    }

    /// Field-for-field equality ignoring derivation and priority
    fn same_fields(&self, other: &Self) -> bool;

    /// Full ordering: name, arch, version, then remaining fields
    fn compare(&self, other: &Self) -> Ordering;
}

/// Which fields make two items collide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyScope {
    Name,
    #[default]
    NameArch,
    NameArchContext,
}

impl KeyScope {
    /// Key string of an item under this scope
    pub fn key<'a, T: Item>(self, item: &'a T) -> Cow<'a, str> {
        match (self, item.arch()) {
            (KeyScope::Name, _) | (KeyScope::NameArch, None) => Cow::Borrowed(item.name()),
            (KeyScope::NameArch, Some(arch)) => Cow::Owned(format!("{}.{}", item.name(), arch)),
            (KeyScope::NameArchContext, arch) => Cow::Owned(format!(
                "{}.{}@{}",
                item.name(),
                arch.unwrap_or(""),
                item.context()
            )),
        }
    }

    /// Whether two items share a key under this scope
    pub fn matches<T: Item>(self, a: &T, b: &T) -> bool {
        if a.name() != b.name() {
            return false;
        }
        match self {
            KeyScope::Name => true,
            KeyScope::NameArch => a.arch() == b.arch(),
            KeyScope::NameArchContext => a.arch() == b.arch() && a.context() == b.context(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(KeyScope::Name),
            "name-arch" => Some(KeyScope::NameArch),
            "name-arch-context" => Some(KeyScope::NameArchContext),
            _ => None,
        }
    }
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyScope::Name => write!(f, "name"),
            KeyScope::NameArch => write!(f, "name-arch"),
            KeyScope::NameArchContext => write!(f, "name-arch-context"),
        }
    }
}

/// Validate an identifier used as a key component
pub(crate) fn validate_identifier(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ModelError::validation(field, "must not be empty"));
    }
    if let Some(c) = value
        .chars()
        .find(|c| c.is_whitespace() || *c == '=' || *c == '\0')
    {
        return Err(ModelError::validation(
            field,
            format!("'{}' contains forbidden character {:?}", value, c),
        ));
    }
    Ok(())
}
