//! Buckos Profile Merge Engine
//!
//! Holds the resources and packages of a host profile and reduces
//! competing definitions to one active value per key.
//!
//! # Architecture
//!
//! - **Chain**: every definition of one key, in insertion order
//! - **Merge**: the rule-driven decision whether a new definition is
//!   added, rejected, or replaces existing ones ([`MergeRules`])
//! - **Table**: open-addressing hash table of chains or components
//! - **Component / ComponentSet**: resources grouped by configuration area
//! - **PackageSet / PackageList**: hashed and ordered package collections
//! - **Profile**: components plus packages configured from a
//!   [`ProfileConfig`](buckos_config::ProfileConfig)
//!
//! Definitions carry a context expression. When a container holds a
//! [`ContextSet`](buckos_model::ContextSet), merged items are evaluated
//! against it and only items with a non-negative priority are active.
//!
//! # Quick Start
//!
//! ```rust
//! use buckos_model::{Package, Resource};
//! use buckos_profile::{Change, ComponentSet, PackageSet};
//!
//! let mut components = ComponentSet::new();
//! let change = components
//!     .merge_resource("ntp", Resource::new("server", "pool.ntp.org").unwrap())
//!     .unwrap();
//! assert_eq!(change, Change::Added);
//!
//! let mut packages = PackageSet::new();
//! packages.merge(Package::new("vim", "9.1").unwrap()).unwrap();
//! assert_eq!(packages.len(), 1);
//! ```

pub mod chain;
pub mod component;
pub mod error;
pub mod items;
pub mod merge;
pub mod order;
pub mod packages;
pub mod profile;
pub mod rules;
pub mod table;

pub use chain::Chain;
pub use component::{Component, ComponentSet};
pub use error::{Error, Result};
pub use items::ItemTable;
pub use order::{CaseMode, OutputOrder, Visibility};
pub use packages::{PackageList, PackageSet};
pub use profile::Profile;
pub use rules::{Change, MergeRules};
pub use table::{KeyedTable, Slot};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Change, ComponentSet, Error, MergeRules, PackageList, PackageSet, Profile, Result,
        Visibility,
    };
    pub use buckos_model::{ContextSet, Derivation, Item, Package, Resource};
}
