use std::{any::TypeId, collections::HashMap};

use indexmap::IndexMap;

use crate::{
    address::Address,
    builder::{ChildDeclaration, Config, ConfigTemplate, Declaration},
    errors::{ConfigError, DiError, InputKind},
    instance::ConfigInstance,
    spec::{Input, Spec},
    tree::{ConfigNode, ConfigTree, GlobalInputSite, NodeId, Slot},
    types::{Instance, TypeInfo},
};

/// Values for the global inputs of a config tree, by input name
///
/// ```ignore
/// let inputs = GlobalInputs::new().set("db_address", "db-west");
/// ```
#[derive(Clone, Debug, Default)]
pub struct GlobalInputs {
    values: IndexMap<String, Instance>,
}
impl GlobalInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Instance>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the value previously set under `name`
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Instance>) -> Option<Instance> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
impl<K: Into<String>, V: Into<Instance>> FromIterator<(K, V)> for GlobalInputs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut inputs = GlobalInputs::new();
        for (name, value) in iter {
            inputs.insert(name, value);
        }
        inputs
    }
}

/// Instantiates root config `C`, binding all inputs
///
/// Every nested config type is instantiated once per root and shared by all
/// the fields nesting it.
pub fn instantiate_config<C: Config>(global_inputs: GlobalInputs) -> Result<ConfigInstance, DiError> {
    let template = ConfigTemplate::of::<C>()?;
    ConfigInitiator::new(&global_inputs).initiate(template)
}

/// Walks the config templates depth first, building the [ConfigTree]
pub(crate) struct ConfigInitiator<'a> {
    global_inputs: &'a GlobalInputs,
    tree: ConfigTree,
    /// First instance of each config type
    by_type: HashMap<TypeId, NodeId>,
    /// Config types currently being instantiated, outermost first
    instantiating: Vec<TypeInfo>,
}
impl<'a> ConfigInitiator<'a> {
    pub(crate) fn new(global_inputs: &'a GlobalInputs) -> Self {
        ConfigInitiator {
            global_inputs,
            tree: ConfigTree::default(),
            by_type: HashMap::new(),
            instantiating: Vec::new(),
        }
    }

    pub(crate) fn initiate(mut self, template: ConfigTemplate) -> Result<ConfigInstance, DiError> {
        tracing::debug!(
            "Instantiating {} with {} global inputs",
            template.info.type_name,
            self.global_inputs.len()
        );

        let root = self.instantiate(template, Address::root(), IndexMap::new())?;

        let mut unknown = self
            .global_inputs
            .names()
            .filter(|name| !self.tree.global_inputs.contains_key(*name))
            .map(str::to_string)
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            unknown.sort();
            return Err(ConfigError::UnknownGlobalInputs(unknown).into());
        }

        tracing::debug!(
            "Instantiated {} configs with {} global inputs",
            self.tree.nodes.len(),
            self.tree.global_inputs.len()
        );

        Ok(ConfigInstance::new(self.tree, root))
    }

    fn instantiate(
        &mut self,
        template: ConfigTemplate,
        address: Address,
        local_inputs: IndexMap<String, Instance>,
    ) -> Result<NodeId, DiError> {
        let info = template.info;
        let local_inputs = bind_local_inputs(&template, &local_inputs, &address)?;

        // Registered before the fields, so siblings further down share this node
        let id = self.tree.nodes.len();
        self.tree.nodes.push(ConfigNode {
            info,
            address: address.clone(),
            fields: IndexMap::new(),
            local_inputs: local_inputs.clone(),
        });
        self.by_type.insert(info.type_id, id);
        self.instantiating.push(info);

        let mut fields = IndexMap::with_capacity(template.fields.len());
        for (key, declaration) in template.fields {
            let field_address = address.join(key.as_str());

            let slot = match declaration {
                Declaration::Spec(Spec::GlobalInput(input)) => {
                    self.register_global_input(&key, info, &field_address)?;
                    let supplied = self.global_inputs.get(&key);
                    let value = bind_input(InputKind::Global, &input, supplied, &field_address)?;
                    Slot::Spec(Spec::Object(value))
                }
                Declaration::Spec(Spec::LocalInput(_)) => {
                    let value = local_inputs.get(&key).cloned().ok_or_else(|| {
                        ConfigError::InputMissing {
                            kind: InputKind::Local,
                            address: field_address.clone(),
                        }
                    })?;
                    Slot::Spec(Spec::Object(value))
                }
                Declaration::Spec(spec) => {
                    if spec.has_nested_input() {
                        return Err(ConfigError::MisplacedInput(field_address).into());
                    }
                    Slot::Spec(spec)
                }
                Declaration::Child(child) => Slot::Child(self.nest(child, field_address)?),
            };

            fields.insert(key, slot);
        }

        self.instantiating.pop();
        self.tree.nodes[id].fields = fields;

        tracing::trace!("Instantiated {} at '{address}'", info.type_name);
        Ok(id)
    }

    /// Instantiates a child config, or reuses the instance of its type
    fn nest(&mut self, child: ChildDeclaration, address: Address) -> Result<NodeId, DiError> {
        if self
            .instantiating
            .iter()
            .any(|info| info.type_id == child.info.type_id)
        {
            return Err(ConfigError::RecursiveConfig {
                config: child.info.type_name,
                address,
            }
            .into());
        }

        let template = (child.compile)()?;

        if let Some(&existing) = self.by_type.get(&child.info.type_id) {
            // Compared as the child receives them, defaults included
            let bound = bind_local_inputs(&template, &child.local_inputs, &address)?;
            let node = &self.tree.nodes[existing];
            if !same_bindings(&node.local_inputs, &bound) {
                tracing::error!(
                    "{} is nested with different local inputs at '{}' and '{address}'",
                    child.info.type_name,
                    node.address
                );
                return Err(ConfigError::LocalInputConflict {
                    config: child.info.type_name,
                    first: node.address.clone(),
                    second: address,
                }
                .into());
            }

            tracing::trace!(
                "Reusing {} from '{}' at '{address}'",
                child.info.type_name,
                node.address
            );
            return Ok(existing);
        }

        self.instantiate(template, address, child.local_inputs)
    }

    fn register_global_input(
        &mut self,
        name: &str,
        owner: TypeInfo,
        address: &Address,
    ) -> Result<(), ConfigError> {
        match self.tree.global_inputs.get(name) {
            Some(site) if site.owner != owner => Err(ConfigError::GlobalInputCollision {
                name: name.to_string(),
                first: site.address.clone(),
                second: address.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                self.tree.global_inputs.insert(
                    name.to_string(),
                    GlobalInputSite {
                        owner,
                        address: address.clone(),
                    },
                );
                Ok(())
            }
        }
    }
}

/// Values of every local input `template` declares, as nested at `address`
fn bind_local_inputs(
    template: &ConfigTemplate,
    supplied: &IndexMap<String, Instance>,
    address: &Address,
) -> Result<IndexMap<String, Instance>, DiError> {
    for input in supplied.keys() {
        if !template.local_input_names().any(|declared| declared == input) {
            return Err(ConfigError::UnknownLocalInput {
                config: template.info.type_name,
                input: input.clone(),
                address: address.join(input.as_str()),
            }
            .into());
        }
    }

    let mut bound = IndexMap::new();
    for (name, declaration) in &template.fields {
        if let Declaration::Spec(Spec::LocalInput(input)) = declaration {
            let input_address = address.join(name.as_str());
            let value = bind_input(InputKind::Local, input, supplied.get(name), &input_address)?;
            bound.insert(name.clone(), value);
        }
    }

    Ok(bound)
}

/// Supplied value, else the declared default
fn bind_input(
    kind: InputKind,
    input: &Input,
    supplied: Option<&Instance>,
    address: &Address,
) -> Result<Instance, DiError> {
    let Some(value) = supplied.or(input.default_value()) else {
        return Err(ConfigError::InputMissing {
            kind,
            address: address.clone(),
        }
        .into());
    };

    input.check(value, address)?;
    Ok(value.clone())
}

fn same_bindings(a: &IndexMap<String, Instance>, b: &IndexMap<String, Instance>) -> bool {
    a.len() == b.len()
        && a.iter().all(|(name, value)| {
            b.get(name)
                .map(|other| value.same_value(other))
                .unwrap_or(false)
        })
}
