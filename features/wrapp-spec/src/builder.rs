use std::marker::PhantomData;

use indexmap::IndexMap;

use crate::{
    address::Address,
    errors::ConfigError,
    spec::{Input, Spec},
    types::{Instance, TypeInfo},
};

//////////////////////////////////////////////////////////////////////
///
/// A config goes through three stages:
/// 1. Declaration: a type implementing [Config] registers its fields on a [ConfigDefinition]
/// 2. Instantiation: [crate::instantiate_config] binds inputs, producing a perturbable [crate::ConfigInstance]
/// 3. Materialization: [crate::build_container] freezes the instance and resolves values on demand

/// Declarative template of a config
///
/// The implementing type is the config's identity: nesting the same type at
/// several places of one root yields one shared instance.
///
/// ```ignore
/// struct EngineConfig;
/// impl Config for EngineConfig {
///     fn define(def: &mut ConfigDefinition) {
///         def.global_input("db_address", Input::of::<String>().with_default("ava-db"))
///             .spec("engine", Spec::singleton(engine_factory).arg(Ref::to("db_address")));
///     }
/// }
/// ```
pub trait Config: 'static {
    fn define(def: &mut ConfigDefinition);
}

/// Collects the fields of a config, in declaration order
pub struct ConfigDefinition {
    info: TypeInfo,
    fields: IndexMap<String, Declaration>,
    /// Declarations rejected as duplicates, kept so builder calls can still chain
    discarded: Vec<Declaration>,
    errors: Vec<ConfigError>,
}

#[derive(Clone)]
pub(crate) enum Declaration {
    Spec(Spec),
    Child(ChildDeclaration),
}

/// A nested config field and the local inputs bound for it
#[derive(Clone)]
pub struct ChildDeclaration {
    pub(crate) info: TypeInfo,
    pub(crate) compile: fn() -> Result<ConfigTemplate, ConfigError>,
    pub(crate) local_inputs: IndexMap<String, Instance>,
}
impl ChildDeclaration {
    /// Binds a local input of the nested config
    pub fn with(&mut self, input: impl Into<String>, value: impl Into<Instance>) -> &mut Self {
        self.local_inputs.insert(input.into(), value.into());
        self
    }
}

impl ConfigDefinition {
    fn new(info: TypeInfo) -> Self {
        ConfigDefinition {
            info,
            fields: IndexMap::new(),
            discarded: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Declares a field holding a spec
    pub fn spec(&mut self, name: impl FieldName, spec: impl Into<Spec>) -> &mut Self {
        self.declare(name.field_name(), Declaration::Spec(spec.into()));
        self
    }

    /// Declares a field holding a precomputed value
    pub fn object(&mut self, name: impl FieldName, value: impl Into<Instance>) -> &mut Self {
        self.spec(name, Spec::Object(value.into()))
    }

    /// Declares an input supplied when the root config is instantiated
    pub fn global_input(&mut self, name: impl FieldName, input: Input) -> &mut Self {
        self.spec(name, Spec::GlobalInput(input))
    }

    /// Declares an input the parent config supplies when nesting this one
    pub fn local_input(&mut self, name: impl FieldName, input: Input) -> &mut Self {
        self.spec(name, Spec::LocalInput(input))
    }

    /// Nests config `C`, local inputs are bound on the returned declaration
    pub fn child<C: Config>(&mut self, name: impl FieldName) -> &mut ChildDeclaration {
        let declaration = Declaration::Child(ChildDeclaration {
            info: TypeInfo::of::<C>(),
            compile: ConfigTemplate::of::<C>,
            local_inputs: IndexMap::new(),
        });

        let slot = self.declare(name.field_name(), declaration);
        match slot {
            Declaration::Child(child) => child,
            // declare hands back the declaration it was given
            Declaration::Spec(_) => unreachable!("declared a child config"),
        }
    }

    fn declare(&mut self, name: &str, declaration: Declaration) -> &mut Declaration {
        let error = if !is_field_name(name) {
            Some(ConfigError::InvalidField {
                config: self.info.type_name,
                field: name.to_string(),
            })
        } else if self.fields.contains_key(name) {
            Some(ConfigError::DuplicateField {
                config: self.info.type_name,
                field: name.to_string(),
            })
        } else {
            None
        };

        if let Some(error) = error {
            self.errors.push(error);
            self.discarded.push(declaration);
            let last = self.discarded.len() - 1;
            return &mut self.discarded[last];
        }

        self.fields.entry(name.to_string()).or_insert(declaration)
    }
}

/// A field name must be a single address segment
fn is_field_name(name: &str) -> bool {
    Address::parse(name).is_ok_and(|address| address.segments().len() == 1)
}

/// Compiled, validated declaration of one config type
#[derive(Clone)]
pub struct ConfigTemplate {
    pub(crate) info: TypeInfo,
    pub(crate) fields: IndexMap<String, Declaration>,
}
impl ConfigTemplate {
    /// Runs `C`'s declaration and validates it
    pub fn of<C: Config>() -> Result<Self, ConfigError> {
        let mut definition = ConfigDefinition::new(TypeInfo::of::<C>());
        C::define(&mut definition);

        if let Some(error) = definition.errors.into_iter().next() {
            return Err(error);
        }

        Ok(ConfigTemplate {
            info: definition.info,
            fields: definition.fields,
        })
    }

    pub fn info(&self) -> TypeInfo {
        self.info
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Names of the local inputs this config expects from its parent
    pub(crate) fn local_input_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(|(name, declaration)| match declaration {
            Declaration::Spec(Spec::LocalInput(_)) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// Anything that names a field
pub trait FieldName {
    fn field_name(&self) -> &str;
}
impl FieldName for &str {
    fn field_name(&self) -> &str {
        self
    }
}
impl FieldName for String {
    fn field_name(&self) -> &str {
        self
    }
}

/// Typed name of a value field, used by [crate::ConfigProxy]
///
/// Declare them as associated consts of the config type and use them both
/// when defining and when reading the config.
pub struct Field<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}
impl<T> Field<T> {
    pub const fn new(name: &'static str) -> Self {
        Field {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Field<T> {}
impl<T> FieldName for Field<T> {
    fn field_name(&self) -> &str {
        self.name
    }
}

/// Typed name of a nested config field
pub struct ChildField<C> {
    name: &'static str,
    _marker: PhantomData<fn() -> C>,
}
impl<C: Config> ChildField<C> {
    pub const fn new(name: &'static str) -> Self {
        ChildField {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
impl<C> Clone for ChildField<C> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<C> Copy for ChildField<C> {}
impl<C> FieldName for ChildField<C> {
    fn field_name(&self) -> &str {
        self.name
    }
}
