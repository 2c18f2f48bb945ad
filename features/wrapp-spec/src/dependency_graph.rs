use std::{
    collections::{BTreeMap, HashSet},
    fmt,
};

use thiserror::Error;

use crate::{
    address::Address,
    errors::AddressError,
    spec::{Ref, SpecKind},
    tree::{ConfigTree, NodeId, Slot, Target},
};

/// Graph of every spec field below one root, keyed by canonical address
/// Used to check for circular and dangling references and enables visualization of the config
pub struct DependencyGraph {
    map: BTreeMap<Address, DependencyGraphEntry>,
}
impl DependencyGraph {
    pub(crate) fn new(tree: &ConfigTree) -> Self {
        let mut graph = Self {
            map: Default::default(),
        };

        // Shared configs are a single node, so every field is visited once
        for (id, node) in tree.nodes.iter().enumerate() {
            for (key, slot) in &node.fields {
                let Slot::Spec(spec) = slot else {
                    continue;
                };

                let address = node.address.join(key.as_str());
                let mut dependencies = Vec::new();
                let mut missing = Vec::new();
                for reference in spec.references() {
                    match resolve_reference(tree, id, reference) {
                        Ok(dependency) => {
                            if !dependencies.contains(&dependency) {
                                dependencies.push(dependency)
                            }
                        }
                        Err(reason) => missing.push((reference.path().to_string(), reason)),
                    }
                }

                graph.map.insert(
                    address.clone(),
                    DependencyGraphEntry {
                        address,
                        kind: spec.kind(),
                        dependencies,
                        missing,
                    },
                );
            }
        }

        graph
    }

    /// Validate the graph
    ///
    /// Returns a list of all issues
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        let mut checked = HashSet::new();
        let mut errors = Vec::new();
        for entry in self.map.values() {
            let mut dependency_chain = Vec::new();
            check_recurse(
                self,
                &mut checked,
                &mut errors,
                &mut dependency_chain,
                entry,
            );
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        return Ok(());

        fn check_recurse<'a>(
            graph: &'a DependencyGraph,
            checked: &mut HashSet<&'a Address>,
            errors: &mut Vec<DependencyGraphError>,
            dependency_chain: &mut Vec<&'a Address>,
            entry: &'a DependencyGraphEntry,
        ) {
            // Circular Dependency Check
            if let Some(start) = dependency_chain
                .iter()
                .position(|address| *address == &entry.address)
            {
                let mut chain = dependency_chain[start..]
                    .iter()
                    .map(|address| (*address).clone())
                    .collect::<Vec<_>>();
                chain.push(entry.address.clone()); // Add current so chain is complete

                errors.push(DependencyGraphError::CircularDependency {
                    from: chain[chain.len() - 2].clone(),
                    to: entry.address.clone(),
                    chain,
                });
            }

            // Skip other checks if already checked
            if !checked.insert(&entry.address) {
                return;
            };

            for (dependency, reason) in &entry.missing {
                errors.push(DependencyGraphError::MissingDependency {
                    dependency: dependency.clone(),
                    required_by: entry.address.clone(),
                    reason: reason.clone(),
                });
            }

            dependency_chain.push(&entry.address);

            for dependency in &entry.dependencies {
                let Some(next_entry) = graph.map.get(dependency) else {
                    continue;
                };

                check_recurse(graph, checked, errors, dependency_chain, next_entry);
            }

            dependency_chain.pop();
        }
    }

    /// All spec addresses, sorted
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.map.keys()
    }

    /// Canonical addresses `address` refers to directly
    pub fn dependencies(&self, address: &Address) -> Option<&[Address]> {
        self.map
            .get(address)
            .map(|entry| entry.dependencies.as_slice())
    }

    pub fn kind(&self, address: &Address) -> Option<SpecKind> {
        self.map.get(address).map(|entry| entry.kind)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Canonical address of the spec field `reference` points at, seen from config `from`
fn resolve_reference(
    tree: &ConfigTree,
    from: NodeId,
    reference: &Ref,
) -> Result<Address, AddressError> {
    let path = reference.address()?;
    match tree.locate(from, &path)? {
        Target::Spec { node, key } => Ok(tree.field_address(node, &key)),
        Target::Config(node) => Err(AddressError::NotAValue(tree.node(node).address.clone())),
    }
}

impl fmt::Display for DependencyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.map.values() {
            write!(f, "{} ({})", entry.address, entry.kind)?;
            if !entry.dependencies.is_empty() {
                let dependencies = entry
                    .dependencies
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>();
                write!(f, " -> {}", dependencies.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

struct DependencyGraphEntry {
    address: Address,
    kind: SpecKind,
    dependencies: Vec<Address>,
    /// References which do not point at a spec field
    missing: Vec<(String, AddressError)>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DependencyGraphError {
    #[error("'{required_by}' needs '{dependency}' but it is missing: {reason}")]
    MissingDependency {
        dependency: String,
        required_by: Address,
        reason: AddressError,
    },
    #[error("A Circular Dependency exists between '{from}' and '{to}' through {chain:?}")]
    CircularDependency {
        from: Address,
        to: Address,
        chain: Vec<Address>,
    },
}
impl std::fmt::Display for DependencyGraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The dependency graph had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

#[derive(Error, Debug, Clone)]
pub struct DependencyGraphErrors {
    pub errors: Vec<DependencyGraphError>,
}
impl DependencyGraphErrors {
    pub fn has_cycle(&self) -> bool {
        self.errors
            .iter()
            .any(|error| matches!(error, DependencyGraphError::CircularDependency { .. }))
    }

    /// Address chains of all cycles found
    pub fn cycles(&self) -> impl Iterator<Item = &[Address]> {
        self.errors.iter().filter_map(|error| match error {
            DependencyGraphError::CircularDependency { chain, .. } => Some(chain.as_slice()),
            _ => None,
        })
    }
}
