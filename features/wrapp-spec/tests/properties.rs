//! Property-based tests for resolution and caching.

mod common;

use common::Counter;
use proptest::prelude::*;
use wrapp_spec::{
    build_container, instantiate_config, Address, Config, ConfigDefinition, ConfigInstance,
    GlobalInputs, Spec,
};

const LINKS: usize = 7;

/// `base` followed by forwards `f1 -> base`, `f2 -> f1`, ...
struct ChainConfig;
impl Config for ChainConfig {
    fn define(def: &mut ConfigDefinition) {
        def.object("base", 0_usize);
        for link in 1..=LINKS {
            def.spec(link_name(link), Spec::forward(link_name(link - 1)));
        }
    }
}

fn link_name(link: usize) -> String {
    match link {
        0 => "base".to_string(),
        link => format!("f{link}"),
    }
}

fn chain_with_base(base: Spec) -> ConfigInstance {
    let config = instantiate_config::<ChainConfig>(GlobalInputs::new()).unwrap();
    config.set("base", base).unwrap();
    config
}

proptest! {
    // Every forward of a chain is the singleton at its end
    #[test]
    fn forward_chains_preserve_singleton_identity(link in 1..=LINKS, resolutions in 1..5usize) {
        let counter = Counter::default();
        let container = build_container(&chain_with_base(counter.singleton())).unwrap();

        let base = container.value("base").unwrap();
        for _ in 0..resolutions {
            let forwarded = container.value(&link_name(link)).unwrap();
            prop_assert!(forwarded.ptr_eq(&base));
        }
        prop_assert_eq!(counter.calls(), 1);
    }

    // A forward to a prototype never caches
    #[test]
    fn forward_chains_to_prototypes_are_fresh(link in 1..=LINKS, resolutions in 2..6usize) {
        let counter = Counter::default();
        let container = build_container(&chain_with_base(counter.prototype())).unwrap();

        let values = (0..resolutions)
            .map(|_| *container.require::<usize>(&link_name(link)).unwrap())
            .collect::<Vec<_>>();
        prop_assert_eq!(values, (0..resolutions).collect::<Vec<_>>());
        prop_assert_eq!(counter.calls(), resolutions);
    }

    // Closing the chain at any length is a cycle, reported once with its full chain
    #[test]
    fn cycles_of_any_length_are_rejected(link in 0..=LINKS) {
        let config = chain_with_base(Spec::forward(link_name(link)));

        let error = build_container(&config).unwrap_err();
        prop_assert!(error.is_cycle());

        let wrapp_spec::DiError::DependencyGraph(errors) = error else {
            return Err(TestCaseError::fail("expected a dependency graph error"));
        };
        let cycles = errors.cycles().collect::<Vec<_>>();
        prop_assert_eq!(cycles.len(), 1);

        let base = Address::parse("base").unwrap();
        prop_assert_eq!(cycles[0].len(), link + 2);
        prop_assert_eq!(cycles[0].first(), Some(&base));
        prop_assert_eq!(cycles[0].last(), Some(&base));
    }

    // Every consumer of a perturbed field sees the new value
    #[test]
    fn perturbations_reach_every_link(value in any::<i64>()) {
        let config = chain_with_base(Spec::object(value));
        let container = build_container(&config).unwrap();

        for link in 0..=LINKS {
            prop_assert_eq!(*container.require::<i64>(&link_name(link)).unwrap(), value);
        }
    }
}
