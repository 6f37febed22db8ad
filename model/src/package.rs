//! Software packages
//!
//! Packages are identified by name and (optionally) architecture. The
//! version, release and flags are payload; the optional prefix
//! character carries a [`Directive`] that overrides normal merge
//! precedence.

use crate::context::ContextExpr;
use crate::item::validate_identifier;
use crate::version::{compare_releases, compare_versions};
use crate::{Derivation, Directive, Item, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arch: Option<String>,
    #[serde(default)]
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    release: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prefix: Option<char>,
    #[serde(default)]
    context: String,
    #[serde(default)]
    derivation: Derivation,
    #[serde(default)]
    priority: i32,
}

impl Package {
    /// Create a package without architecture
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Result<Self> {
        Self::builder(name).version(version).build()
    }

    pub fn builder(name: impl Into<String>) -> PackageBuilder {
        PackageBuilder::new(name)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn release(&self) -> Option<&str> {
        self.release.as_deref()
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// Raw prefix character
    pub fn prefix(&self) -> Option<char> {
        self.prefix
    }

    /// Full `version-release` string
    pub fn evr(&self) -> String {
        match &self.release {
            Some(release) => format!("{}-{}", self.version, release),
            None => self.version.clone(),
        }
    }
}

impl Item for Package {
    const KIND: &'static str = "package";

    fn name(&self) -> &str {
        &self.name
    }

    fn arch(&self) -> Option<&str> {
        self.arch.as_deref()
    }

    fn context(&self) -> &str {
        &self.context
    }

    fn derivation(&self) -> &Derivation {
        &self.derivation
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn with_priority(&self, priority: i32) -> Self {
        Self {
            priority,
            ..self.clone()
        }
    }

    fn with_derivation(&self, derivation: Derivation) -> Self {
        Self {
            derivation,
            ..self.clone()
        }
    }

    fn directive(&self) -> Result<Option<Directive>> {
        self.prefix.map(Directive::from_char).transpose()
    }

    fn same_fields(&self, other: &Self) -> bool {
        self.name == other.name
            && self.arch == other.arch
            && self.version == other.version
            && self.release == other.release
            && self.flags == other.flags
            && self.prefix == other.prefix
            && self.context == other.context
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.arch.cmp(&other.arch))
            .then_with(|| compare_versions(&self.version, &other.version))
            .then_with(|| compare_releases(self.release(), other.release()))
            .then_with(|| self.version.cmp(&other.version))
            .then_with(|| self.release.cmp(&other.release))
            .then_with(|| self.flags.cmp(&other.flags))
            .then_with(|| self.prefix.cmp(&other.prefix))
            .then_with(|| self.context.cmp(&other.context))
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = self.prefix {
            write!(f, "{}", prefix)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(arch) = &self.arch {
            write!(f, ".{}", arch)?;
        }
        if !self.version.is_empty() {
            write!(f, "-{}", self.evr())?;
        }
        if !self.context.is_empty() {
            write!(f, " [{}]", self.context)?;
        }
        Ok(())
    }
}

/// Builder for [`Package`]; validation happens in [`PackageBuilder::build`]
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    package: Package,
}

impl PackageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            package: Package {
                name: name.into(),
                arch: None,
                version: String::new(),
                release: None,
                flags: Vec::new(),
                prefix: None,
                context: String::new(),
                derivation: Derivation::new(),
                priority: 0,
            },
        }
    }

    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.package.arch = Some(arch.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.package.version = version.into();
        self
    }

    pub fn release(mut self, release: impl Into<String>) -> Self {
        self.package.release = Some(release.into());
        self
    }

    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.package.flags.push(flag.into());
        self
    }

    pub fn prefix(mut self, prefix: char) -> Self {
        self.package.prefix = Some(prefix);
        self
    }

    pub fn directive(self, directive: Directive) -> Self {
        self.prefix(directive.as_char())
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.package.context = context.into().trim().to_string();
        self
    }

    pub fn derivation(mut self, derivation: impl Into<Derivation>) -> Self {
        self.package.derivation = derivation.into();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.package.priority = priority;
        self
    }

    pub fn build(self) -> Result<Package> {
        let package = self.package;
        validate_identifier("package name", &package.name)?;
        if let Some(arch) = &package.arch {
            validate_identifier("package arch", arch)?;
        }
        if !package.version.is_empty() {
            validate_identifier("package version", &package.version)?;
        }
        if let Some(release) = &package.release {
            validate_identifier("package release", release)?;
        }
        for flag in &package.flags {
            validate_identifier("package flag", flag)?;
        }
        package.directive()?;
        ContextExpr::parse(&package.context)?;
        Ok(package)
    }
}
