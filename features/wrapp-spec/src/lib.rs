//! Spec driven dependency injection
//!
//! Configs declare how values are produced as a tree of inert [Spec]s. A
//! config is instantiated with [instantiate_config], may be perturbed while
//! still open, and is then frozen by [build_container]. The container
//! resolves values lazily: singletons once per address, prototypes on every
//! access, forwards by redirecting to their target.
//!
//! ```ignore
//! struct CarConfig;
//! impl Config for CarConfig {
//!     fn define(def: &mut ConfigDefinition) {
//!         def.global_input("db_address", Input::of::<String>().with_default("a"))
//!             .spec("engine", Spec::singleton(Engine::new).arg(Ref::to("db_address")))
//!             .spec("car", Spec::singleton(Car::new).arg(Ref::to("engine")));
//!     }
//! }
//!
//! let config = instantiate_config::<CarConfig>(GlobalInputs::new().set("db_address", "b"))?;
//! let container = build_container(&config)?;
//! let car = container.require::<Car>("car")?;
//! ```
//!
//! Resolution is single threaded: containers are neither `Send` nor `Sync`.
//! Resolved values are `Arc`s of `Send + Sync` objects and can be moved freely.

mod address;
mod builder;
mod container;
mod dependency_graph;
mod errors;
mod factories;
mod initiator;
mod instance;
mod proxy;
mod spec;
mod tree;
mod types;

pub use address::Address;
pub use builder::{ChildDeclaration, ChildField, Config, ConfigDefinition, ConfigTemplate, Field, FieldName};
pub use container::{Container, Resolved};
pub use dependency_graph::{DependencyGraph, DependencyGraphError, DependencyGraphErrors};
pub use errors::{AddressError, ArgumentError, ConfigError, DiError, InputKind, TypeMismatch};
pub use factories::{Arguments, DynFactory, FnFactory, InstanceFactory};
pub use initiator::{instantiate_config, GlobalInputs};
pub use instance::ConfigInstance;
pub use proxy::ConfigProxy;
pub use spec::{Arg, Call, CallSpec, Input, Lifetime, Ref, Spec, SpecKind};
pub use types::{Dict, DynError, Injectable, Instance, List, Tuple, TypeInfo};

/// Freezes the tree of `config` and builds a container resolving it
///
/// Freezing is idempotent, building several containers from one tree is
/// fine; each container has its own singleton cache. The tree is only frozen
/// once its dependency graph checks out, so a cycle or a dangling reference
/// can still be fixed by perturbing the same instance.
pub fn build_container(config: &ConfigInstance) -> Result<Container, DiError> {
    Container::new(config)
}
