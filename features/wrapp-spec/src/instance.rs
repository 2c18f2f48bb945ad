use std::{
    cell::{Cell, Ref, RefCell},
    fmt::{self, Debug},
    rc::Rc,
};

use crate::{
    address::Address,
    errors::{AddressError, ConfigError, DiError},
    spec::Spec,
    tree::{ConfigTree, NodeId, Slot, Target},
    types::{Instance, TypeInfo},
};

/// Config tree shared by every [ConfigInstance] handle and every container built from it
pub(crate) struct SharedTree {
    frozen: Cell<bool>,
    tree: RefCell<ConfigTree>,
}
impl SharedTree {
    fn new(tree: ConfigTree) -> Rc<Self> {
        Rc::new(SharedTree {
            frozen: Cell::new(false),
            tree: RefCell::new(tree),
        })
    }

    pub(crate) fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    /// One way: there is no unfreeze
    pub(crate) fn freeze(&self) {
        if !self.frozen.replace(true) {
            tracing::debug!("Froze config tree");
        }
    }

    pub(crate) fn read(&self) -> Ref<'_, ConfigTree> {
        self.tree.borrow()
    }
}

/// Instantiated config, perturbable until a container is built from it
///
/// This is a handle: clones and handles obtained through [ConfigInstance::child]
/// all point into the same tree. Since child configs are shared by type,
/// perturbing a child through one path is visible through every other path.
#[derive(Clone)]
pub struct ConfigInstance {
    shared: Rc<SharedTree>,
    node: NodeId,
}

impl ConfigInstance {
    pub(crate) fn new(tree: ConfigTree, root: NodeId) -> Self {
        ConfigInstance {
            shared: SharedTree::new(tree),
            node: root,
        }
    }

    pub(crate) fn shared(&self) -> &Rc<SharedTree> {
        &self.shared
    }

    pub(crate) fn node(&self) -> NodeId {
        self.node
    }

    /// Type of the config
    pub fn info(&self) -> TypeInfo {
        self.shared.read().node(self.node).info
    }

    /// Canonical address of this config within its root
    pub fn address(&self) -> Address {
        self.shared.read().node(self.node).address.clone()
    }

    /// Field names, in declaration order
    pub fn keys(&self) -> Vec<String> {
        self.shared.read().node(self.node).fields.keys().cloned().collect()
    }

    /// True if `path` names a field
    pub fn contains(&self, path: &str) -> bool {
        match Address::parse(path) {
            Ok(path) => self.shared.read().locate(self.node, &path).is_ok(),
            Err(_) => false,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.shared.is_frozen()
    }

    /// Prevents any further perturbation of the whole tree
    ///
    /// [crate::build_container] does this for you.
    pub fn freeze(&self) {
        self.shared.freeze();
    }

    /// Handle to a nested config
    pub fn child(&self, path: &str) -> Result<ConfigInstance, DiError> {
        let path = Address::parse(path)?;
        let tree = self.shared.read();
        let target = tree.locate(self.node, &path)?;

        match target {
            Target::Config(node) => Ok(ConfigInstance {
                shared: self.shared.clone(),
                node,
            }),
            Target::Spec { node, key } => {
                Err(AddressError::NotAConfig(tree.field_address(node, &key)).into())
            }
        }
    }

    /// The spec currently bound to `path`
    pub fn spec(&self, path: &str) -> Result<Spec, DiError> {
        let path = Address::parse(path)?;
        let tree = self.shared.read();
        let target = tree.locate(self.node, &path)?;

        match target {
            Target::Spec { node, key } => tree
                .spec(node, &key)
                .cloned()
                .ok_or_else(|| AddressError::NotAValue(tree.field_address(node, &key)).into()),
            Target::Config(node) => Err(AddressError::NotAValue(tree.node(node).address.clone()).into()),
        }
    }

    /// Perturbs a field: replaces its spec wholesale
    ///
    /// References inside `spec` are relative to the config owning the field.
    /// Either fully succeeds or leaves the tree untouched.
    pub fn set(&self, path: &str, spec: impl Into<Spec>) -> Result<(), DiError> {
        let spec = spec.into();
        let path = Address::parse(path)?;

        if self.shared.is_frozen() {
            let address = self.shared.read().node(self.node).address.concat(&path);
            return Err(ConfigError::Frozen(address).into());
        }

        let mut tree = self.shared.tree.borrow_mut();
        let (owner_path, key) = path
            .split_last()
            .ok_or_else(|| AddressError::Invalid(path.to_string()))?;

        let owner = match tree.locate(self.node, &owner_path)? {
            Target::Config(owner) => owner,
            Target::Spec { node, key: field } => {
                return Err(AddressError::NotAConfig(tree.field_address(node, &field)).into())
            }
        };

        let address = tree.field_address(owner, key);
        match tree.nodes[owner].fields.get(key) {
            Some(Slot::Spec(_)) => {}
            Some(Slot::Child(_)) => return Err(ConfigError::SetChildConfig(address).into()),
            None => return Err(ConfigError::NewKey(address).into()),
        }

        if spec.is_input() || spec.has_nested_input() {
            return Err(ConfigError::MisplacedInput(address).into());
        }

        tracing::debug!(%address, kind = %spec.kind(), "Perturbed config field");
        tree.nodes[owner].fields.insert(key.to_string(), Slot::Spec(spec));

        Ok(())
    }

    /// Perturbs a field with a plain value
    pub fn set_value(&self, path: &str, value: impl Into<Instance>) -> Result<(), DiError> {
        self.set(path, Spec::Object(value.into()))
    }

    /// Deep copy of the whole tree, never frozen
    ///
    /// The returned handle points at the same config within the copy.
    pub fn fork(&self) -> ConfigInstance {
        let tree = self.shared.read().clone();
        ConfigInstance {
            shared: SharedTree::new(tree),
            node: self.node,
        }
    }

    /// True if both handles point at the same config of the same tree
    pub fn same_config(&self, other: &ConfigInstance) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared) && self.node == other.node
    }
}

impl Debug for ConfigInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.shared.read();
        let node = tree.node(self.node);

        let mut map = f.debug_struct(node.info.type_name);
        for (key, slot) in &node.fields {
            match slot {
                Slot::Spec(spec) => map.field(key, spec),
                Slot::Child(child) => map.field(key, &tree.node(*child).info.type_name),
            };
        }
        map.finish()
    }
}
