//! Specs are inert recipes describing how one value is produced.
//!
//! Nothing in here resolves anything: references are kept as raw paths,
//! relative to the config declaring them, and only looked up once the config
//! tree is frozen and a [crate::Container] resolves them.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;

use crate::{
    address::Address,
    errors::{AddressError, TypeMismatch},
    factories::{Arguments, DynFactory, FnFactory, InstanceFactory},
    types::{DynError, Injectable, Instance, Tuple, TypeInfo},
};

/// Recipe for one value of a config
#[derive(Clone)]
pub enum Spec {
    /// A precomputed value, resolves to itself
    Object(Instance),
    /// Resolves to whatever the referenced spec resolves to
    Forward(Ref),
    /// Calls its factory on every resolution
    Prototype(CallSpec),
    /// Calls its factory once per container, cached by address
    Singleton(CallSpec),
    /// Value supplied when instantiating the root config
    GlobalInput(Input),
    /// Value supplied by the parent config nesting this one
    LocalInput(Input),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecKind {
    Object,
    Forward,
    Prototype,
    Singleton,
    GlobalInput,
    LocalInput,
}
impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpecKind::Object => "object",
            SpecKind::Forward => "forward",
            SpecKind::Prototype => "prototype",
            SpecKind::Singleton => "singleton",
            SpecKind::GlobalInput => "global input",
            SpecKind::LocalInput => "local input",
        };
        f.write_str(name)
    }
}

impl Spec {
    /// Spec passing through a fully built value
    pub fn object(value: impl Into<Instance>) -> Spec {
        Spec::Object(value.into())
    }

    /// Spec forwarding to another field, e.g. `"engine_config.engine"`
    ///
    /// Often used as a switch: perturbing the forward's target swaps an
    /// implementation for every consumer of the forward at once.
    pub fn forward(target: impl Into<String>) -> Spec {
        Spec::Forward(Ref::to(target))
    }

    /// Spec calling `factory` with resolved arguments, without caching
    pub fn prototype<T, F>(factory: F) -> Call
    where
        T: Injectable,
        F: Fn(&Arguments) -> Result<T, DynError> + Send + Sync + 'static,
    {
        Call::new(Lifetime::Prototype, Arc::new(FnFactory::new(factory)))
    }

    /// Spec calling `factory` with resolved arguments, cached per field
    pub fn singleton<T, F>(factory: F) -> Call
    where
        T: Injectable,
        F: Fn(&Arguments) -> Result<T, DynError> + Send + Sync + 'static,
    {
        Call::new(Lifetime::Singleton, Arc::new(FnFactory::new(factory)))
    }

    pub fn prototype_factory(factory: impl InstanceFactory + 'static) -> Call {
        Call::new(Lifetime::Prototype, Arc::new(factory))
    }

    pub fn singleton_factory(factory: impl InstanceFactory + 'static) -> Call {
        Call::new(Lifetime::Singleton, Arc::new(factory))
    }

    pub fn global_input(input: Input) -> Spec {
        Spec::GlobalInput(input)
    }

    pub fn local_input(input: Input) -> Spec {
        Spec::LocalInput(input)
    }

    /// Singleton [crate::List] of the resolved items
    pub fn singleton_list<I, A>(items: I) -> Call
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        Spec::singleton(|args: &Arguments| Ok(args.positional().to_vec())).args(items)
    }

    /// Singleton [Tuple] of the resolved items
    pub fn singleton_tuple<I, A>(items: I) -> Call
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        Spec::singleton(|args: &Arguments| Ok(Tuple::new(args.positional().to_vec()))).args(items)
    }

    /// Singleton [crate::Dict] of the resolved entries
    ///
    /// To union with another dict spec, add it with [Call::lazy_kwargs];
    /// entries given here win over entries of the same name in the other dict.
    pub fn singleton_dict<I, K, A>(entries: I) -> Call
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: Into<Arg>,
    {
        Spec::singleton(|args: &Arguments| Ok(args.keyword().clone())).kwargs(entries)
    }

    /// Projection of another field's object, recomputed on every resolution
    pub fn attr<S, T, F>(source: impl Into<String>, project: F) -> Call
    where
        S: Injectable,
        T: Injectable,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        Spec::prototype(move |args: &Arguments| {
            let source = args.get::<S>(0)?;
            Ok(project(&*source))
        })
        .arg(Ref::to(source))
    }

    pub fn kind(&self) -> SpecKind {
        match self {
            Spec::Object(_) => SpecKind::Object,
            Spec::Forward(_) => SpecKind::Forward,
            Spec::Prototype(_) => SpecKind::Prototype,
            Spec::Singleton(_) => SpecKind::Singleton,
            Spec::GlobalInput(_) => SpecKind::GlobalInput,
            Spec::LocalInput(_) => SpecKind::LocalInput,
        }
    }

    /// The wrapped value of an object spec
    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Spec::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// The target of a forward spec
    pub fn as_forward(&self) -> Option<&Ref> {
        match self {
            Spec::Forward(target) => Some(target),
            _ => None,
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, Spec::GlobalInput(_) | Spec::LocalInput(_))
    }

    /// True if an input spec hides inside this spec's arguments
    pub(crate) fn has_nested_input(&self) -> bool {
        match self {
            Spec::Prototype(call) | Spec::Singleton(call) => {
                call.labelled_args().any(|(_, arg)| match arg {
                    Arg::Spec(spec) => spec.is_input() || spec.has_nested_input(),
                    Arg::Ref(_) => false,
                })
            }
            _ => false,
        }
    }

    /// Every reference this spec depends on, including those of inline specs
    pub(crate) fn references(&self) -> Vec<&Ref> {
        let mut references = Vec::new();
        self.collect_references(&mut references);
        references
    }

    fn collect_references<'a>(&'a self, references: &mut Vec<&'a Ref>) {
        match self {
            Spec::Forward(target) => references.push(target),
            Spec::Prototype(call) | Spec::Singleton(call) => {
                for (_, arg) in call.labelled_args() {
                    match arg {
                        Arg::Ref(target) => references.push(target),
                        Arg::Spec(spec) => spec.collect_references(references),
                    }
                }
            }
            Spec::Object(_) | Spec::GlobalInput(_) | Spec::LocalInput(_) => {}
        }
    }
}

impl fmt::Debug for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spec::Object(instance) => f.debug_tuple("Object").field(instance).finish(),
            Spec::Forward(target) => f.debug_tuple("Forward").field(&target.0).finish(),
            Spec::Prototype(call) => f.debug_tuple("Prototype").field(call).finish(),
            Spec::Singleton(call) => f.debug_tuple("Singleton").field(call).finish(),
            Spec::GlobalInput(input) => f.debug_tuple("GlobalInput").field(input).finish(),
            Spec::LocalInput(input) => f.debug_tuple("LocalInput").field(input).finish(),
        }
    }
}

/// Factory plus the declared arguments it is called with
#[derive(Clone)]
pub struct CallSpec {
    pub(crate) factory: Arc<dyn DynFactory>,
    pub(crate) args: Vec<Arg>,
    pub(crate) kwargs: IndexMap<String, Arg>,
    pub(crate) lazy_kwargs: Option<Arg>,
}
impl CallSpec {
    /// Type the factory supplies
    pub fn supplies(&self) -> TypeInfo {
        self.factory.supplies()
    }

    /// All arguments with the label an inline spec in that position is addressed by
    pub(crate) fn labelled_args(&self) -> impl Iterator<Item = (String, &Arg)> {
        let positional = self
            .args
            .iter()
            .enumerate()
            .map(|(index, arg)| (format!("<arg{index}>"), arg));
        let keyword = self
            .kwargs
            .iter()
            .map(|(name, arg)| (format!("<kw:{name}>"), arg));
        let lazy = self
            .lazy_kwargs
            .iter()
            .map(|arg| ("<lazy>".to_string(), arg));

        positional.chain(keyword).chain(lazy)
    }
}
impl fmt::Debug for CallSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("CallSpec");
        debug.field("supplies", &self.supplies().type_name);
        if !self.args.is_empty() {
            debug.field("args", &self.args);
        }
        if !self.kwargs.is_empty() {
            debug.field("kwargs", &self.kwargs);
        }
        if let Some(lazy_kwargs) = &self.lazy_kwargs {
            debug.field("lazy_kwargs", lazy_kwargs);
        }
        debug.finish()
    }
}

/// Caching policy of a [Call]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    Prototype,
    Singleton,
}

/// Builder for prototype and singleton specs
///
/// ```ignore
/// Spec::singleton(|args: &Arguments| Ok(Car::new(args.get::<Engine>(0)?)))
///     .arg(Ref::to("engine_config.engine"))
///     .kwarg("seats", 4_u8)
/// ```
#[derive(Clone, Debug)]
pub struct Call {
    lifetime: Lifetime,
    spec: CallSpec,
}
impl Call {
    fn new(lifetime: Lifetime, factory: Arc<dyn DynFactory>) -> Self {
        Call {
            lifetime,
            spec: CallSpec {
                factory,
                args: Vec::new(),
                kwargs: IndexMap::new(),
                lazy_kwargs: None,
            },
        }
    }

    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.spec.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.spec.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds a keyword argument, replacing an earlier one of the same name
    pub fn kwarg(mut self, name: impl Into<String>, arg: impl Into<Arg>) -> Self {
        self.spec.kwargs.insert(name.into(), arg.into());
        self
    }

    pub fn kwargs<I, K, A>(mut self, kwargs: I) -> Self
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: Into<Arg>,
    {
        for (name, arg) in kwargs {
            self.spec.kwargs.insert(name.into(), arg.into());
        }
        self
    }

    /// Splats a [crate::Dict] valued spec into the keyword arguments
    ///
    /// Explicit keyword arguments win over entries of the same name.
    pub fn lazy_kwargs(mut self, source: impl Into<Arg>) -> Self {
        self.spec.lazy_kwargs = Some(source.into());
        self
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }
}
impl From<Call> for Spec {
    fn from(call: Call) -> Self {
        match call.lifetime {
            Lifetime::Prototype => Spec::Prototype(call.spec),
            Lifetime::Singleton => Spec::Singleton(call.spec),
        }
    }
}

/// Argument of a [Call]
#[derive(Clone, Debug)]
pub enum Arg {
    /// Another field, by path relative to the declaring config
    Ref(Ref),
    /// Anonymous spec, resolved in the context of the field declaring it
    Spec(Box<Spec>),
}

/// Reference to a field, relative to the config it is declared in
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ref(String);
impl Ref {
    pub fn to(path: impl Into<String>) -> Self {
        Ref(path.into())
    }

    pub fn path(&self) -> &str {
        &self.0
    }

    pub fn address(&self) -> Result<Address, AddressError> {
        Address::parse(&self.0)
    }
}

impl From<Ref> for Arg {
    fn from(target: Ref) -> Self {
        Arg::Ref(target)
    }
}
impl From<Spec> for Arg {
    fn from(spec: Spec) -> Self {
        Arg::Spec(Box::new(spec))
    }
}
impl From<Call> for Arg {
    fn from(call: Call) -> Self {
        Arg::Spec(Box::new(call.into()))
    }
}
impl From<Instance> for Arg {
    fn from(instance: Instance) -> Self {
        Arg::Spec(Box::new(Spec::Object(instance)))
    }
}
impl From<Instance> for Spec {
    fn from(instance: Instance) -> Self {
        Spec::Object(instance)
    }
}
impl From<Ref> for Spec {
    fn from(target: Ref) -> Self {
        Spec::Forward(target)
    }
}

// Plain values are wrapped as object specs
macro_rules! value_specs {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Spec {
                fn from(value: $ty) -> Self {
                    Spec::Object(value.into())
                }
            }
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Spec(Box::new(Spec::Object(value.into())))
                }
            }
        )*
    };
}
value_specs!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64, bool, char, String, &str);

/// Declared input: optionally typed, optionally defaulted
#[derive(Clone, Debug)]
pub struct Input {
    expected: Option<TypeInfo>,
    default: Option<Instance>,
}
impl Input {
    /// Input which must be of type `T`
    pub fn of<T: Injectable>() -> Self {
        Input {
            expected: Some(TypeInfo::of::<T>()),
            default: None,
        }
    }

    /// Input of any type
    pub fn any() -> Self {
        Input {
            expected: None,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Instance>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn expected(&self) -> Option<TypeInfo> {
        self.expected
    }

    pub fn default_value(&self) -> Option<&Instance> {
        self.default.as_ref()
    }

    pub(crate) fn check(&self, value: &Instance, address: &Address) -> Result<(), TypeMismatch> {
        match self.expected {
            Some(expected) if expected.type_id != value.info.type_id => Err(TypeMismatch {
                address: address.clone(),
                expected: expected.type_name,
                actual: value.info.type_name,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(args: &Arguments) -> Result<i64, DynError> {
        Ok(*args.get::<i64>(0)? + *args.get::<i64>(1)?)
    }

    #[test]
    fn call_builds_spec_of_its_lifetime() {
        let prototype: Spec = Spec::prototype(add).arg(1_i64).arg(2_i64).into();
        let singleton: Spec = Spec::singleton(add).into();

        assert_eq!(prototype.kind(), SpecKind::Prototype);
        assert_eq!(singleton.kind(), SpecKind::Singleton);
        assert_eq!(Spec::forward("a.b").kind(), SpecKind::Forward);
        assert_eq!(Spec::object(1_i64).kind(), SpecKind::Object);
    }

    #[test]
    fn references_include_inline_specs() {
        let spec: Spec = Spec::singleton(add)
            .arg(Ref::to("x"))
            .arg(Spec::prototype(add).arg(Ref::to("child.y")))
            .kwarg("z", 3_i64)
            .lazy_kwargs(Ref::to("partial"))
            .into();

        let paths = spec
            .references()
            .into_iter()
            .map(Ref::path)
            .collect::<Vec<_>>();
        assert_eq!(paths, ["x", "child.y", "partial"]);
    }

    #[test]
    fn detects_nested_inputs() {
        let nested: Spec = Spec::singleton(add)
            .arg(Spec::singleton(add).arg(Spec::global_input(Input::of::<i64>())))
            .into();
        let plain: Spec = Spec::singleton(add).arg(Ref::to("x")).into();

        assert!(nested.has_nested_input());
        assert!(!plain.has_nested_input());
    }

    #[test]
    fn input_type_check() {
        let input = Input::of::<String>().with_default("a");
        let address = Address::parse("db_address").unwrap();

        assert!(input.check(&Instance::from("b"), &address).is_ok());
        assert_eq!(
            input.check(&Instance::from(1_i64), &address),
            Err(TypeMismatch {
                address,
                expected: "alloc::string::String",
                actual: "i64",
            })
        );
        assert!(Input::any()
            .check(&Instance::from(1_i64), &Address::root())
            .is_ok());
    }
}
