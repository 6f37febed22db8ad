//! Buckos Profile Configuration
//!
//! This crate describes how a host profile is assembled by the
//! `buckos-profile` merge engine.
//!
//! # Overview
//!
//! - [`profile`]: the [`ProfileConfig`] structure (merge rules, key scopes,
//!   enabled contexts, output ordering)
//! - [`loader`]: layered loading from `profile.toml` and `profile.d/`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use buckos_config::ConfigLoader;
//!
//! let config = ConfigLoader::system().load().unwrap();
//! let contexts = config.context_set().unwrap();
//! println!("{} contexts enabled", contexts.len());
//! ```

pub mod error;
pub mod loader;
pub mod profile;

pub use error::{ConfigError, Result};
pub use loader::{load_system_config, paths, ConfigLoader};
pub use profile::{
    KeySection, MergeSection, OutputSection, ProfileConfig, ProfileFragment, KNOWN_RULES,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{ConfigError, ConfigLoader, ProfileConfig, Result};
}
