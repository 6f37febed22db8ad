//! Buckos profile item model
//!
//! Items are the leaf values of a host profile:
//!
//! - [`Resource`]: a typed configuration value of a component
//! - [`Package`]: a software package, optionally carrying a prefix
//!   [`Directive`]
//!
//! Both implement [`Item`], the contract the merge engine in
//! `buckos-profile` works against. Items carry a context expression
//! ([`context`]) that is evaluated against the enabled [`ContextSet`] to
//! obtain their priority, and a [`Derivation`] recording where they were
//! defined.

pub mod context;
pub mod derivation;
pub mod directive;
pub mod error;
pub mod item;
pub mod package;
pub mod resource;
pub mod version;

pub use context::{ContextExpr, ContextSet, ALWAYS, INACTIVE};
pub use derivation::Derivation;
pub use directive::Directive;
pub use error::{ModelError, Result};
pub use item::{Item, KeyScope};
pub use package::{Package, PackageBuilder};
pub use resource::{Resource, ResourceBuilder};
pub use version::compare_versions;
