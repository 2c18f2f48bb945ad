use std::{any::type_name, marker::PhantomData, sync::Arc};

use crate::{
    errors::ArgumentError,
    types::{Dict, DynError, Injectable, Instance, TypeInfo},
};

/// A Factory providing instances of a given type from resolved arguments
///
/// Closures are wrapped with [FnFactory]; implement this directly for
/// factories which carry state of their own.
pub trait InstanceFactory: Send + Sync {
    type Provides: Injectable;

    /// Returns the typeinfo about the factory's provided type
    fn supplies() -> TypeInfo
    where
        Self: Sized,
    {
        TypeInfo::of::<Self::Provides>()
    }

    /// Constructs a new instance of the factory's provided type
    ///
    /// Called once per resolution for prototypes, once per container for singletons.
    fn construct(&self, args: &Arguments) -> Result<Self::Provides, DynError>;
}

/// Wrapper Trait for factories, providing instances of Any
pub trait DynFactory: Send + Sync {
    fn supplies(&self) -> TypeInfo;

    /// Constructs a new instance of the factory's provided type
    fn construct(&self, args: &Arguments) -> Result<Instance, DynError>;
}
// Impl DynFactory for any InstanceFactory
impl<T: Injectable, SpecificFactory: InstanceFactory<Provides = T>> DynFactory for SpecificFactory {
    fn supplies(&self) -> TypeInfo {
        <SpecificFactory as InstanceFactory>::supplies()
    }

    fn construct(&self, args: &Arguments) -> Result<Instance, DynError> {
        // Forward the call to the specific implementation
        InstanceFactory::construct(self, args).map(Instance::new)
    }
}

/// Adapts a closure into an [InstanceFactory]
pub struct FnFactory<F, T> {
    function: F,
    _marker: PhantomData<fn() -> T>,
}
impl<F, T> FnFactory<F, T>
where
    T: Injectable,
    F: Fn(&Arguments) -> Result<T, DynError> + Send + Sync,
{
    pub fn new(function: F) -> Self {
        FnFactory {
            function,
            _marker: PhantomData,
        }
    }
}
impl<F, T> InstanceFactory for FnFactory<F, T>
where
    T: Injectable,
    F: Fn(&Arguments) -> Result<T, DynError> + Send + Sync,
{
    type Provides = T;

    fn construct(&self, args: &Arguments) -> Result<T, DynError> {
        (self.function)(args)
    }
}

/// Resolved arguments handed to a factory
///
/// Keyword arguments are ordered: entries of a lazy kwargs source first, then
/// explicit keyword arguments, which replace same-named lazy entries.
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    positional: Vec<Instance>,
    keyword: Dict,
}
impl Arguments {
    pub(crate) fn new(positional: Vec<Instance>, keyword: Dict) -> Self {
        Arguments {
            positional,
            keyword,
        }
    }

    pub fn positional(&self) -> &[Instance] {
        &self.positional
    }

    pub fn keyword(&self) -> &Dict {
        &self.keyword
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positional argument `index`, downcast to `T`
    pub fn get<T: Injectable>(&self, index: usize) -> Result<Arc<T>, ArgumentError> {
        let instance = self
            .positional
            .get(index)
            .ok_or(ArgumentError::MissingPositional {
                index,
                len: self.positional.len(),
            })?;

        downcast_argument(instance, || index.to_string())
    }

    /// Keyword argument `name`, downcast to `T`
    pub fn kwarg<T: Injectable>(&self, name: &str) -> Result<Arc<T>, ArgumentError> {
        let instance = self
            .keyword
            .get(name)
            .ok_or_else(|| ArgumentError::MissingKeyword(name.to_string()))?;

        downcast_argument(instance, || name.to_string())
    }

    /// Keyword argument `name` if given, downcast to `T`
    pub fn kwarg_opt<T: Injectable>(&self, name: &str) -> Result<Option<Arc<T>>, ArgumentError> {
        match self.keyword.get(name) {
            Some(instance) => downcast_argument(instance, || name.to_string()).map(Some),
            None => Ok(None),
        }
    }

    /// Keyword argument `name`, else positional argument `index`
    ///
    /// Lets a factory accept an argument either way, like a named parameter.
    pub fn param<T: Injectable>(&self, index: usize, name: &str) -> Result<Arc<T>, ArgumentError> {
        match self.keyword.contains_key(name) {
            true => self.kwarg(name),
            false => self.get(index),
        }
    }
}

fn downcast_argument<T: Injectable>(
    instance: &Instance,
    argument: impl FnOnce() -> String,
) -> Result<Arc<T>, ArgumentError> {
    instance
        .downcast::<T>()
        .map_err(|actual_type| ArgumentError::DowncastFailed {
            argument: argument(),
            required_type: type_name::<T>(),
            actual_type,
        })
}
