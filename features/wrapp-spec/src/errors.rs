use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::{address::Address, dependency_graph::DependencyGraphErrors, types::DynError};

/// Any error raised while declaring, perturbing or resolving configs
///
/// None of these are transient, nothing is ever retried.
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// The config declaration or a perturbation is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// There are issues with the dependency graph, e.g. a cycle
    #[error(transparent)]
    DependencyGraph(#[from] DependencyGraphErrors),
    /// A path does not name a field
    #[error(transparent)]
    Address(#[from] AddressError),
    /// A value is not of the expected type
    #[error(transparent)]
    Type(#[from] TypeMismatch),
    /// A Factory failed to build
    #[error("Factory for '{address}' failed - error: {error}")]
    FactoryFailed {
        address: Address,
        error: Arc<DynError>,
    },
}

impl DiError {
    /// True if the dependency graph contains at least one cycle
    pub fn is_cycle(&self) -> bool {
        match self {
            DiError::DependencyGraph(errors) => errors.has_cycle(),
            _ => false,
        }
    }
}

/// Declaration time problems
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Perturbation after a container was built
    #[error("Cannot perturb frozen config: '{0}'")]
    Frozen(Address),
    /// Neither a value nor a default was given for an input
    #[error("{kind} input not set: '{address}'")]
    InputMissing { kind: InputKind, address: Address },
    /// Global inputs supplied that no config declares
    #[error("Provided extra global inputs not specified in configs: {0:?}")]
    UnknownGlobalInputs(Vec<String>),
    /// Two different config types declare a global input of the same name
    #[error("Found global input collision: '{name}' is declared at '{first}' and '{second}'")]
    GlobalInputCollision {
        name: String,
        first: Address,
        second: Address,
    },
    /// A parent binds a local input the child does not declare
    #[error("'{config}' has no local input '{input}' (bound at '{address}')")]
    UnknownLocalInput {
        config: &'static str,
        input: String,
        address: Address,
    },
    /// The same child config type is nested with different local inputs
    #[error("'{config}' is nested at '{first}' and '{second}' with conflicting local inputs")]
    LocalInputConflict {
        config: &'static str,
        first: Address,
        second: Address,
    },
    /// A config type nests itself
    #[error("'{config}' nests itself at '{address}'")]
    RecursiveConfig {
        config: &'static str,
        address: Address,
    },
    /// Fields can only be replaced, not added
    #[error("Cannot add new keys to a loaded config: '{0}'")]
    NewKey(Address),
    /// Child configs are shared by type and cannot be replaced
    #[error("Cannot set child config: '{0}'")]
    SetChildConfig(Address),
    /// Field names are single address segments
    #[error("'{config}' declares field '{field}', which has no address")]
    InvalidField { config: &'static str, field: String },
    #[error("Field '{field}' is declared twice in '{config}'")]
    DuplicateField { config: &'static str, field: String },
    /// Inputs must be top level fields, present when the config is instantiated
    #[error("Inputs can only be declared as config fields: '{0}'")]
    MisplacedInput(Address),
    /// An input spec was found where only bound values should exist
    #[error("Input was never bound: '{0}'")]
    UnboundInput(Address),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Global,
    Local,
}
impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Global => f.write_str("Global"),
            InputKind::Local => f.write_str("Local"),
        }
    }
}

/// Lookup of a path which does not exist or names the wrong kind of field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("'{0}' is not a valid address")]
    Invalid(String),
    #[error("'{config}' has no field '{field}' (looking up '{address}')")]
    Missing {
        address: Address,
        config: &'static str,
        field: String,
    },
    #[error("'{0}' is a value, not a config")]
    NotAConfig(Address),
    #[error("'{0}' is a config, not a value")]
    NotAValue(Address),
}

/// A value does not have the declared or requested type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Type mismatch at '{address}': expected '{expected}', got '{actual}'")]
pub struct TypeMismatch {
    pub address: Address,
    pub expected: &'static str,
    pub actual: &'static str,
}

/// Misuse of [crate::Arguments] inside a factory
///
/// Converts into [DynError], so factories can simply use `?`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("Missing positional argument {index} (got {len})")]
    MissingPositional { index: usize, len: usize },
    #[error("Missing keyword argument '{0}'")]
    MissingKeyword(String),
    #[error("Failed to downcast argument '{argument}', required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        argument: String,
        required_type: &'static str,
        actual_type: &'static str,
    },
}
