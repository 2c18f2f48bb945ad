use std::{fmt, marker::PhantomData, sync::Arc};

use crate::{
    builder::{ChildField, Config, Field},
    container::Container,
    errors::DiError,
    types::Injectable,
};

/// Typed view of a [Container] whose config is `C`
///
/// Only adds static types: every lookup goes through the same resolution
/// as [Container::get], so both always agree.
///
/// ```ignore
/// let car = container.config::<CarConfig>()?;
/// let engine = car.child(CarConfig::ENGINE)?.get(EngineConfig::ENGINE)?;
/// ```
pub struct ConfigProxy<C> {
    container: Container,
    _config: PhantomData<fn() -> C>,
}

impl<C: Config> ConfigProxy<C> {
    pub(crate) fn new(container: Container) -> Self {
        ConfigProxy {
            container,
            _config: PhantomData,
        }
    }

    pub fn get<T: Injectable>(&self, field: Field<T>) -> Result<Arc<T>, DiError> {
        self.container.require::<T>(field.name())
    }

    pub fn child<D: Config>(&self, field: ChildField<D>) -> Result<ConfigProxy<D>, DiError> {
        self.container.child(field.name())?.config::<D>()
    }

    /// The untyped container behind this view
    pub fn container(&self) -> &Container {
        &self.container
    }
}

impl<C> Clone for ConfigProxy<C> {
    fn clone(&self) -> Self {
        ConfigProxy {
            container: self.container.clone(),
            _config: PhantomData,
        }
    }
}

impl<C> fmt::Debug for ConfigProxy<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConfigProxy").field(&self.container).finish()
    }
}
