//! Configuration resources
//!
//! A resource is a typed key/value pair belonging to a component, e.g. the
//! `hostname` resource of the `network` component.

use crate::context::ContextExpr;
use crate::item::validate_identifier;
use crate::{Derivation, Item, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Type tag used when none is given
pub const DEFAULT_TYPE: &str = "string";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    name: String,
    value: String,
    #[serde(rename = "type", default = "default_type")]
    value_type: String,
    #[serde(default)]
    context: String,
    #[serde(default)]
    derivation: Derivation,
    #[serde(default)]
    priority: i32,
}

fn default_type() -> String {
    DEFAULT_TYPE.to_string()
}

impl Resource {
    /// Create a context-free string resource
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        Self::builder(name).value(value).build()
    }

    pub fn builder(name: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder::new(name)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn value_type(&self) -> &str {
        &self.value_type
    }
}

impl Item for Resource {
    const KIND: &'static str = "resource";

    fn name(&self) -> &str {
        &self.name
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

    fn same_fields(&self, other: &Self) -> bool {
        self.name == other.name
            && self.value == other.value
            && self.value_type == other.value_type
            && self.context == other.context
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.context.cmp(&other.context))
            .then_with(|| self.value.cmp(&other.value))
            .then_with(|| self.value_type.cmp(&other.value_type))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if !self.context.is_empty() {
            write!(f, " [{}]", self.context)?;
        }
        Ok(())
    }
}

/// Builder for [`Resource`]; validation happens in [`ResourceBuilder::build`]
#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    resource: Resource,
}

impl ResourceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            resource: Resource {
                name: name.into(),
                value: String::new(),
                value_type: default_type(),
                context: String::new(),
                derivation: Derivation::new(),
                priority: 0,
            },
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.resource.value = value.into();
        self
    }

    pub fn value_type(mut self, value_type: impl Into<String>) -> Self {
        self.resource.value_type = value_type.into();
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.resource.context = context.into().trim().to_string();
        self
    }

    pub fn derivation(mut self, derivation: impl Into<Derivation>) -> Self {
        self.resource.derivation = derivation.into();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.resource.priority = priority;
        self
    }

    pub fn build(self) -> Result<Resource> {
        let resource = self.resource;
        validate_identifier("resource name", &resource.name)?;
        validate_identifier("resource type", &resource.value_type)?;
        if resource.value.contains('\0') {
            return Err(crate::ModelError::validation(
                "resource value",
                format!("value of '{}' contains NUL", resource.name),
            ));
        }
        ContextExpr::parse(&resource.context)?;
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelError;
    use assert_matches::assert_matches;

    #[test]
    fn test_new_resource() {
        let r = Resource::new("hostname", "build01").unwrap();
        assert_eq!(r.name(), "hostname");
        assert_eq!(r.value(), "build01");
        assert_eq!(r.value_type(), DEFAULT_TYPE);
        assert_eq!(r.priority(), 0);
        assert!(r.is_active());
        assert_eq!(r.to_string(), "hostname=build01");
    }

    #[test]
    fn test_validation() {
        assert_matches!(Resource::new("", "x"), Err(ModelError::Validation { .. }));
        assert_matches!(
            Resource::new("host name", "x"),
            Err(ModelError::Validation { .. })
        );
        assert_matches!(
            Resource::builder("a").context("laptop &&").build(),
            Err(ModelError::Context { .. })
        );
    }

    #[test]
    fn test_same_fields_ignores_derivation() {
        let a = Resource::builder("ntp")
            .value("pool.ntp.org")
            .derivation("a.xml:1")
            .build()
            .unwrap();
        let b = a.with_derivation(Derivation::from_source("b.xml:7"));
        assert!(a.same_fields(&b));
        assert_ne!(a, b);

        let c = Resource::new("ntp", "time.example.com").unwrap();
        assert!(!a.same_fields(&c));
    }

    #[test]
    fn test_with_priority_copies() {
        let a = Resource::builder("x").context("laptop").build().unwrap();
        let b = a.with_priority(-1);
        assert_eq!(a.priority(), 0);
        assert!(!b.is_active());
        assert_eq!(b.to_string(), "x= [laptop]");
    }

    #[test]
    fn test_deserialize_defaults() {
        let r: Resource = serde_json::from_str(r#"{"name":"a","value":"b"}"#).unwrap();
        assert_eq!(r.value_type(), "string");
        assert_eq!(r.context(), "");
        assert!(r.derivation().is_empty());
    }
}
