use std::{
    any::{type_name, TypeId},
    cell::RefCell,
    collections::HashMap,
    fmt::Debug,
    rc::Rc,
    sync::Arc,
};

use crate::{
    address::Address,
    builder::Config,
    dependency_graph::DependencyGraph,
    errors::{AddressError, ConfigError, DiError, TypeMismatch},
    factories::{Arguments, DynFactory},
    instance::{ConfigInstance, SharedTree},
    proxy::ConfigProxy,
    spec::{Arg, CallSpec, Ref, Spec},
    tree::{NodeId, Target},
    types::{Dict, Injectable, Instance, TypeInfo},
};

/// Materializes the values of a frozen config tree on demand
///
/// A container is a view of one config of the tree. Child containers
/// share the tree, the dependency graph and the singleton cache of the
/// container they were obtained from, so there is one cache per root.
#[derive(Clone)]
pub struct Container {
    inner: Rc<ContainerInner>,
    node: NodeId,
}
struct ContainerInner {
    shared: Rc<SharedTree>,
    graph: DependencyGraph,
    /// Singleton instances, by canonical address
    cache: RefCell<HashMap<Address, Instance>>,
}

/// What a path resolves to
#[derive(Clone, Debug)]
pub enum Resolved {
    Value(Instance),
    Config(Container),
}
impl Resolved {
    pub fn as_value(&self) -> Option<&Instance> {
        match self {
            Resolved::Value(instance) => Some(instance),
            Resolved::Config(_) => None,
        }
    }

    pub fn as_config(&self) -> Option<&Container> {
        match self {
            Resolved::Config(container) => Some(container),
            Resolved::Value(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Instance> {
        match self {
            Resolved::Value(instance) => Some(instance),
            Resolved::Config(_) => None,
        }
    }

    pub fn into_config(self) -> Option<Container> {
        match self {
            Resolved::Config(container) => Some(container),
            Resolved::Value(_) => None,
        }
    }

    /// The value downcast to `T`, `None` for configs and other types
    pub fn downcast<T: Injectable>(&self) -> Option<Arc<T>> {
        self.as_value().and_then(|instance| instance.downcast().ok())
    }
}

impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tree = self.inner.shared.read();
        let node = tree.node(self.node);

        f.debug_struct("Container")
            .field("config", &node.info.type_name)
            .field("address", &node.address)
            .field("cached", &self.inner.cache.borrow().len())
            .finish()
    }
}

impl Container {
    /// Validates the dependency graph of `config`'s tree, then freezes it
    ///
    /// A tree failing the check is left perturbable.
    pub(crate) fn new(config: &ConfigInstance) -> Result<Self, DiError> {
        let shared = config.shared().clone();
        let graph = DependencyGraph::new(&shared.read());
        if let Err(errors) = graph.check() {
            tracing::error!("{errors}");
            return Err(errors.into());
        }

        config.freeze();

        tracing::debug!(
            "Built container for {} with {} specs",
            config.info().type_name,
            graph.len()
        );

        Ok(Container {
            inner: Rc::new(ContainerInner {
                shared,
                graph,
                cache: RefCell::new(HashMap::new()),
            }),
            node: config.node(),
        })
    }

    fn at(&self, node: NodeId) -> Container {
        Container {
            inner: self.inner.clone(),
            node,
        }
    }

    /// Resolves a dotted path to a value or a nested config
    pub fn get(&self, path: &str) -> Result<Resolved, DiError> {
        let path = Address::parse(path)?;
        let target = self.inner.shared.read().locate(self.node, &path)?;

        match target {
            Target::Config(node) => Ok(Resolved::Config(self.at(node))),
            Target::Spec { node, key } => self.resolve_field(node, &key).map(Resolved::Value),
        }
    }

    /// Resolves a dotted path to a value
    pub fn value(&self, path: &str) -> Result<Instance, DiError> {
        self.resolve_value(path).map(|(_, instance)| instance)
    }

    /// Resolves a dotted path to a value of type `T`
    pub fn require<T: Injectable>(&self, path: &str) -> Result<Arc<T>, DiError> {
        let (address, instance) = self.resolve_value(path)?;

        instance.downcast().map_err(|actual| {
            TypeMismatch {
                address,
                expected: type_name::<T>(),
                actual,
            }
            .into()
        })
    }

    /// Container of a nested config
    pub fn child(&self, path: &str) -> Result<Container, DiError> {
        let path = Address::parse(path)?;
        let tree = self.inner.shared.read();
        let target = tree.locate(self.node, &path)?;

        match target {
            Target::Config(node) => Ok(self.at(node)),
            Target::Spec { node, key } => {
                Err(AddressError::NotAConfig(tree.field_address(node, &key)).into())
            }
        }
    }

    /// Typed view of this container, if its config is `C`
    pub fn config<C: Config>(&self) -> Result<ConfigProxy<C>, DiError> {
        let info = self.info();
        if info.type_id != TypeId::of::<C>() {
            return Err(TypeMismatch {
                address: self.address(),
                expected: type_name::<C>(),
                actual: info.type_name,
            }
            .into());
        }

        Ok(ConfigProxy::new(self.clone()))
    }

    /// Type of the config this container resolves
    pub fn info(&self) -> TypeInfo {
        self.inner.shared.read().node(self.node).info
    }

    /// Canonical address of the config this container resolves
    pub fn address(&self) -> Address {
        self.inner.shared.read().node(self.node).address.clone()
    }

    /// Field names, in declaration order
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .shared
            .read()
            .node(self.node)
            .fields
            .keys()
            .cloned()
            .collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        match Address::parse(path) {
            Ok(path) => self.inner.shared.read().locate(self.node, &path).is_ok(),
            Err(_) => false,
        }
    }

    /// True if the singleton at `path` has been built and not cleared since
    pub fn is_cached(&self, path: &str) -> bool {
        let Ok(path) = Address::parse(path) else {
            return false;
        };
        let tree = self.inner.shared.read();
        match tree.locate(self.node, &path) {
            Ok(Target::Spec { node, key }) => self
                .inner
                .cache
                .borrow()
                .contains_key(&tree.field_address(node, &key)),
            _ => false,
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.inner.graph
    }

    /// Drops all cached singletons of the whole tree
    pub fn clear(&self) {
        let mut cache = self.inner.cache.borrow_mut();
        tracing::debug!("Clearing {} cached instances", cache.len());
        cache.clear();
    }

    /// True if both containers view the same config through the same cache
    pub fn same_container(&self, other: &Container) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner) && self.node == other.node
    }
}

// Resolution
impl Container {
    fn resolve_value(&self, path: &str) -> Result<(Address, Instance), DiError> {
        let path = Address::parse(path)?;
        let target = self.inner.shared.read().locate(self.node, &path)?;

        match target {
            Target::Spec { node, key } => {
                let address = self.inner.shared.read().field_address(node, &key);
                let instance = self.resolve_field(node, &key)?;
                Ok((address, instance))
            }
            Target::Config(node) => {
                let address = self.inner.shared.read().node(node).address.clone();
                Err(AddressError::NotAValue(address).into())
            }
        }
    }

    /// Resolves spec field `key` of config `node`
    fn resolve_field(&self, node: NodeId, key: &str) -> Result<Instance, DiError> {
        // The tree is frozen, the clone only keeps the borrow short
        let (address, spec) = {
            let tree = self.inner.shared.read();
            (tree.field_address(node, key), tree.spec(node, key).cloned())
        };

        let spec = spec.ok_or_else(|| AddressError::NotAValue(address.clone()))?;
        self.resolve_spec(node, &address, &spec)
    }

    /// Resolves `spec`, declared in config `owner` and addressed as `address`
    fn resolve_spec(&self, owner: NodeId, address: &Address, spec: &Spec) -> Result<Instance, DiError> {
        match spec {
            Spec::Object(instance) => Ok(instance.clone()),
            Spec::Forward(target) => self.resolve_ref(owner, target),
            Spec::Prototype(call) => self.call(owner, address, call),
            Spec::Singleton(call) => self.singleton(owner, address, call),
            Spec::GlobalInput(_) | Spec::LocalInput(_) => {
                Err(ConfigError::UnboundInput(address.clone()).into())
            }
        }
    }

    fn resolve_ref(&self, owner: NodeId, reference: &Ref) -> Result<Instance, DiError> {
        let path = reference.address()?;
        let target = self.inner.shared.read().locate(owner, &path)?;

        match target {
            Target::Spec { node, key } => self.resolve_field(node, &key),
            Target::Config(node) => {
                let address = self.inner.shared.read().node(node).address.clone();
                Err(AddressError::NotAValue(address).into())
            }
        }
    }

    fn resolve_arg(&self, owner: NodeId, address: &Address, arg: &Arg) -> Result<Instance, DiError> {
        match arg {
            Arg::Ref(reference) => self.resolve_ref(owner, reference),
            Arg::Spec(spec) => self.resolve_spec(owner, address, spec),
        }
    }

    fn singleton(&self, owner: NodeId, address: &Address, call: &CallSpec) -> Result<Instance, DiError> {
        let cached = self.inner.cache.borrow().get(address).cloned();
        if let Some(instance) = cached {
            tracing::trace!(%address, "Singleton cache hit");
            return Ok(instance);
        }
        tracing::trace!(%address, "Singleton cache miss");

        // Failures are not cached, the next resolution calls the factory again
        let instance = self.call(owner, address, call)?;
        self.inner
            .cache
            .borrow_mut()
            .insert(address.clone(), instance.clone());

        Ok(instance)
    }

    /// Resolves all arguments and invokes the factory
    fn call(&self, owner: NodeId, address: &Address, call: &CallSpec) -> Result<Instance, DiError> {
        let mut positional = Vec::with_capacity(call.args.len());
        for (index, arg) in call.args.iter().enumerate() {
            let arg_address = address.join(format!("<arg{index}>"));
            positional.push(self.resolve_arg(owner, &arg_address, arg)?);
        }

        let mut keyword = Dict::new();
        if let Some(lazy_kwargs) = &call.lazy_kwargs {
            let lazy_address = address.join("<lazy>");
            let source = self.resolve_arg(owner, &lazy_address, lazy_kwargs)?;
            let source = source.downcast::<Dict>().map_err(|actual| TypeMismatch {
                address: lazy_address,
                expected: type_name::<Dict>(),
                actual,
            })?;

            keyword.extend(source.iter().map(|(name, value)| (name.clone(), value.clone())));
        }
        // Explicit keywords replace same-named lazy entries
        for (name, arg) in &call.kwargs {
            let kwarg_address = address.join(format!("<kw:{name}>"));
            keyword.insert(name.clone(), self.resolve_arg(owner, &kwarg_address, arg)?);
        }

        tracing::trace!(%address, "Calling factory for {}", call.supplies().type_name);
        call.factory
            .construct(&Arguments::new(positional, keyword))
            .map_err(|error| {
                tracing::warn!(%address, "Factory failed: {error}");
                DiError::FactoryFailed {
                    address: address.clone(),
                    error: Arc::new(error),
                }
            })
    }
}
