//! Tests for the merge engine through the public containers

use assert_matches::assert_matches;
use buckos_model::{ContextSet, Derivation, Directive, Item, KeyScope, Package, Resource};
use buckos_config::ProfileConfig;
use buckos_profile::{Chain, Change, ComponentSet, Error, MergeRules, PackageList, PackageSet};
use std::sync::Arc;

/// Create a foo.x86_64 package
fn foo(version: &str) -> Package {
    Package::builder("foo")
        .arch("x86_64")
        .version(version)
        .build()
        .unwrap()
}

fn foo_with(version: &str, directive: Directive) -> Package {
    Package::builder("foo")
        .arch("x86_64")
        .version(version)
        .directive(directive)
        .build()
        .unwrap()
}

fn setting(value: &str, source: &str) -> Resource {
    Resource::builder("hostname")
        .value(value)
        .derivation(Derivation::from_source(source))
        .build()
        .unwrap()
}

mod identity {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_same_handle_twice() {
        let mut set = PackageSet::with_rules(MergeRules::empty());
        let package = Arc::new(foo("1.0"));

        assert_eq!(set.merge(Arc::clone(&package)).unwrap(), Change::Added);
        assert_eq!(set.merge(Arc::clone(&package)).unwrap(), Change::Unchanged);
        assert_eq!(set.item_count(), 1);
    }

    #[test]
    fn test_same_handle_twice_in_configured_sets() {
        let mut config = ProfileConfig::default();
        config.enable_context("laptop", 3);
        config.merge.packages = vec!["squash-identical".into(), "keep-all".into()];

        let mut components = ComponentSet::from_config(&config).unwrap();
        let governor = Arc::new(
            Resource::builder("governor")
                .value("powersave")
                .context("laptop")
                .build()
                .unwrap(),
        );
        assert_eq!(
            components.merge_resource("power", Arc::clone(&governor)).unwrap(),
            Change::Added
        );
        assert_eq!(
            components.merge_resource("power", Arc::clone(&governor)).unwrap(),
            Change::Unchanged
        );
        assert_eq!(components.item_count(), 1);
        assert_eq!(components.resource("power", "governor").unwrap().priority(), 3);

        let mut packages = PackageSet::from_config(&config).unwrap();
        let tlp = Arc::new(
            Package::builder("tlp")
                .version("1.6")
                .context("laptop")
                .build()
                .unwrap(),
        );
        assert_eq!(packages.merge(Arc::clone(&tlp)).unwrap(), Change::Added);
        assert_eq!(packages.merge(Arc::clone(&tlp)).unwrap(), Change::Unchanged);
        assert_eq!(packages.item_count(), 1);
    }

    #[test]
    fn test_equal_copy_is_not_identical() {
        let mut set = PackageSet::with_rules(MergeRules::empty());
        set.merge(foo("1.0")).unwrap();
        assert_matches!(set.merge(foo("1.0")), Err(Error::Conflict { .. }));
    }
}

mod rules {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_squash_refreshes_derivation() {
        let mut chain = Chain::new("hostname", MergeRules::SQUASH_IDENTICAL, KeyScope::Name);
        chain.merge(setting("box", "base.xml:1")).unwrap();

        assert_eq!(
            chain.merge(setting("box", "site.xml:9")).unwrap(),
            Change::Replaced
        );
        assert_eq!(chain.len(), 1);

        let stored = chain.first().unwrap();
        assert_eq!(stored.value(), "box");
        assert_eq!(stored.derivation().to_string(), "site.xml:9");
    }

    #[test]
    fn test_equal_priority_conflicts() {
        let mut chain = Chain::new("hostname", MergeRules::USE_PRIORITY, KeyScope::Name);
        chain.merge(setting("a", "one.xml")).unwrap();

        let err = chain.merge(setting("b", "two.xml")).unwrap_err();
        assert!(err.is_conflict());
        let message = err.to_string();
        assert!(message.contains("one.xml"), "{}", message);
        assert!(message.contains("two.xml"), "{}", message);
        assert_eq!(chain.first().unwrap().value(), "a");
    }

    #[test]
    fn test_precedence_is_fixed() {
        // Whatever the combination, the earlier rule in the precedence
        // order decides
        let cases = [
            (MergeRules::all(), Change::Added),
            (MergeRules::REPLACE | MergeRules::USE_PRIORITY, Change::Replaced),
            (MergeRules::KEEP_ALL | MergeRules::REPLACE, Change::Added),
            (MergeRules::SQUASH_IDENTICAL | MergeRules::REPLACE, Change::Replaced),
        ];

        for (rules, expected) in cases {
            for _ in 0..3 {
                let mut chain = Chain::new("hostname", rules, KeyScope::Name);
                chain.merge(setting("a", "one.xml")).unwrap();
                assert_eq!(
                    chain.merge(setting("b", "two.xml")).unwrap(),
                    expected,
                    "{}",
                    rules
                );
            }
        }
    }

    #[test]
    fn test_use_priority_with_contexts() {
        let contexts = Arc::new(ContextSet::from_layers(["base", "site"]).unwrap());
        let mut set = PackageSet::with_rules(MergeRules::USE_PRIORITY);
        set.set_contexts(Some(contexts));

        let base = Package::builder("foo")
            .arch("x86_64")
            .version("1.0")
            .context("base")
            .build()
            .unwrap();
        let site = Package::builder("foo")
            .arch("x86_64")
            .version("2.0")
            .context("site")
            .build()
            .unwrap();

        set.merge(base.clone()).unwrap();
        assert_eq!(set.merge(site).unwrap(), Change::Replaced);
        assert_eq!(set.merge(base).unwrap(), Change::Unchanged);
        assert_eq!(
            set.find_package("foo", Some("x86_64")).unwrap().version(),
            "2.0"
        );
    }
}

mod directives {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_then_plain_round_trip() {
        let mut set =
            PackageSet::with_rules(MergeRules::SQUASH_IDENTICAL | MergeRules::KEEP_ALL);

        let changes = vec![
            set.merge(foo("1.0")).unwrap(),
            set.merge(foo_with("2.0", Directive::Add)).unwrap(),
            set.merge(foo("1.0")).unwrap(),
        ];

        assert_eq!(
            changes,
            vec![Change::Added, Change::Replaced, Change::Unchanged]
        );
        assert_eq!(set.item_count(), 1);
        assert_eq!(set.iter().next().unwrap().version(), "2.0");
    }

    #[test]
    fn test_remove() {
        let mut set = PackageSet::new();
        set.merge(foo("1.0")).unwrap();
        assert_eq!(
            set.merge(foo_with("", Directive::Remove)).unwrap(),
            Change::Removed
        );
        assert!(set.is_empty());
        assert_eq!(
            set.merge(foo_with("", Directive::Remove)).unwrap(),
            Change::Unchanged
        );
    }

    #[test]
    fn test_fallback_only_fills_gaps() {
        let mut set = PackageSet::new();
        assert_eq!(
            set.merge(foo_with("1.0", Directive::Fallback)).unwrap(),
            Change::Added
        );
        assert_eq!(
            set.merge(foo_with("2.0", Directive::Fallback)).unwrap(),
            Change::Unchanged
        );
    }

    #[test]
    fn test_upgrade() {
        let mut set = PackageSet::new();
        set.merge(foo("1.0")).unwrap();
        assert_eq!(
            set.merge(foo_with("2.0", Directive::Upgrade)).unwrap(),
            Change::Replaced
        );
        assert_eq!(set.item_count(), 1);
    }

    #[test]
    fn test_pin_blocks_later_versions() {
        let mut set = PackageSet::new();
        set.merge(foo_with("1.0", Directive::Pin)).unwrap();

        for candidate in [foo("2.0"), foo_with("3.0", Directive::Add)] {
            let err = set.merge(candidate).unwrap_err();
            assert!(err.is_pinned(), "{}", err);
        }
        assert_eq!(set.iter().next().unwrap().version(), "1.0");
    }

    #[test]
    fn test_invalid_prefix() {
        // Deserialized packages skip builder validation
        let package: Package = serde_json::from_str(r#"{"name": "foo", "prefix": "!"}"#).unwrap();
        let mut list = PackageList::new();
        assert_matches!(list.merge(package), Err(Error::Model(_)));
        assert!(list.is_empty());
    }
}

mod aggregates {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_abort_on_first_error() {
        let mut source = PackageList::with_rules(MergeRules::KEEP_ALL);
        source.merge(foo("1.0")).unwrap();
        source.merge(foo("2.0")).unwrap();
        source
            .merge(Package::builder("bar").version("1").build().unwrap())
            .unwrap();

        let mut target = PackageSet::with_rules(MergeRules::empty());
        assert_matches!(target.merge_list(&source), Err(Error::Conflict { .. }));

        // Items merged before the failure stay merged
        assert_eq!(target.item_count(), 1);
        assert!(!target.contains_key("bar"));
    }

    #[test]
    fn test_modified_only_when_something_changed() {
        let mut list = PackageList::new();
        list.merge(foo("1.0")).unwrap();

        let mut set = PackageSet::new();
        assert_eq!(set.merge_list(&list).unwrap(), Change::Modified);
        assert_eq!(set.merge_list(&list).unwrap(), Change::Unchanged);

        let copy = set.clone();
        assert_eq!(set.merge_set(&copy).unwrap(), Change::Unchanged);
    }
}
