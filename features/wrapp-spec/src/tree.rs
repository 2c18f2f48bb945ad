use indexmap::IndexMap;

use crate::{
    address::Address,
    errors::AddressError,
    spec::Spec,
    types::{Instance, TypeInfo},
};

/// Index of a config instance within its [ConfigTree]
pub(crate) type NodeId = usize;

/// Arena of all config instances below one root
///
/// Child configs are shared by type, so one node may be reachable through
/// several paths. Each node remembers the first, canonical one.
#[derive(Clone, Default)]
pub(crate) struct ConfigTree {
    pub(crate) nodes: Vec<ConfigNode>,
    /// Global input name -> canonical address of the field declaring it
    pub(crate) global_inputs: IndexMap<String, GlobalInputSite>,
}

#[derive(Clone)]
pub(crate) struct ConfigNode {
    pub(crate) info: TypeInfo,
    /// Canonical address
    pub(crate) address: Address,
    pub(crate) fields: IndexMap<String, Slot>,
    /// Values of all declared local inputs, defaults included
    pub(crate) local_inputs: IndexMap<String, Instance>,
}

#[derive(Clone)]
pub(crate) enum Slot {
    Spec(Spec),
    Child(NodeId),
}

#[derive(Clone)]
pub(crate) struct GlobalInputSite {
    pub(crate) owner: TypeInfo,
    pub(crate) address: Address,
}

/// What a path points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    /// Spec field `key` of config `node`
    Spec { node: NodeId, key: String },
    Config(NodeId),
}

impl ConfigTree {
    pub(crate) fn node(&self, id: NodeId) -> &ConfigNode {
        &self.nodes[id]
    }

    /// Canonical address of field `key` of config `node`
    pub(crate) fn field_address(&self, node: NodeId, key: &str) -> Address {
        self.nodes[node].address.join(key)
    }

    /// Walks `path` starting at config `from`
    ///
    /// Errors name the path as seen from the root, i.e. `from`'s canonical
    /// address followed by `path`.
    pub(crate) fn locate(&self, from: NodeId, path: &Address) -> Result<Target, AddressError> {
        let mut node = from;
        let segments = path.segments();

        for (index, segment) in segments.iter().enumerate() {
            let current = &self.nodes[node];
            let last = index + 1 == segments.len();

            match current.fields.get(segment) {
                Some(Slot::Child(child)) => node = *child,
                Some(Slot::Spec(_)) if last => {
                    return Ok(Target::Spec {
                        node,
                        key: segment.clone(),
                    })
                }
                Some(Slot::Spec(_)) => {
                    return Err(AddressError::NotAConfig(
                        current.address.join(segment.as_str()),
                    ))
                }
                None => {
                    return Err(AddressError::Missing {
                        address: self.nodes[from].address.concat(path),
                        config: current.info.type_name,
                        field: segment.clone(),
                    })
                }
            }
        }

        Ok(Target::Config(node))
    }

    /// Spec of field `key` of config `node`
    pub(crate) fn spec(&self, node: NodeId, key: &str) -> Option<&Spec> {
        match self.nodes[node].fields.get(key) {
            Some(Slot::Spec(spec)) => Some(spec),
            _ => None,
        }
    }
}
