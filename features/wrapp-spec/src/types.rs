use std::{
    any::{Any, TypeId},
    fmt::{self, Debug},
    ops::Deref,
    sync::Arc,
};

use indexmap::IndexMap;

/// Errors returned by factories
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Anything a spec produces must be shareable and have a static lifetime.
///
/// Resolution itself is single threaded, but resolved objects are handed out
/// as `Arc`s and may well be moved to other threads by their owners.
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// A resolved (or precomputed) value
///
/// Cloning an [Instance] clones the handle, never the value. Two clones are
/// the same object, see [Instance::ptr_eq].
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
    ops: Option<ValueOps>,
}

/// Equality and formatting captured while the concrete type was still known
#[derive(Clone, Copy)]
struct ValueOps {
    eq: fn(&dyn Any, &dyn Any) -> bool,
    fmt: fn(&dyn Any, &mut fmt::Formatter<'_>) -> fmt::Result,
}

impl Instance {
    /// Wraps any injectable object
    pub fn new<T: Injectable>(instance: T) -> Self {
        Self::from_arc(Arc::new(instance))
    }

    /// Wraps an object which is already shared
    pub fn from_arc<T: Injectable>(instance: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            instance,
            ops: None,
        }
    }

    /// Wraps a plain value which can be compared and printed
    ///
    /// Values created this way compare by value in [Instance::same_value],
    /// which is what local input bindings are checked with.
    pub fn value<T: Injectable + PartialEq + Debug>(value: T) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            instance: Arc::new(value),
            ops: Some(ValueOps {
                eq: eq_erased::<T>,
                fmt: fmt_erased::<T>,
            }),
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }

    pub fn downcast_ref<T: Injectable>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }

    pub fn is<T: Injectable>(&self) -> bool {
        self.info.type_id == TypeId::of::<T>()
    }

    /// Object identity
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }

    /// Identity, or equality for instances created with [Instance::value]
    pub fn same_value(&self, other: &Instance) -> bool {
        if self.ptr_eq(other) {
            return true;
        }

        match (self.ops, other.ops) {
            (Some(ops), Some(_)) if self.info == other.info => {
                (ops.eq)(self.instance.as_ref(), other.instance.as_ref())
            }
            _ => false,
        }
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ops {
            Some(ops) => (ops.fmt)(self.instance.as_ref(), f),
            None => write!(f, "<{}>", self.info.type_name),
        }
    }
}

fn eq_erased<T: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn fmt_erased<T: Debug + 'static>(value: &dyn Any, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value.downcast_ref::<T>() {
        Some(value) => value.fmt(f),
        None => f.write_str("<?>"),
    }
}

macro_rules! value_conversions {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Instance {
                fn from(value: $ty) -> Self {
                    Instance::value(value)
                }
            }
        )*
    };
}
value_conversions!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64, bool, char, String);

// String slices are stored owned, so inputs declared as `String` accept them
impl From<&str> for Instance {
    fn from(value: &str) -> Self {
        Instance::value(value.to_string())
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}

/// Value produced by [crate::Spec::singleton_list]
pub type List = Vec<Instance>;

/// Value produced by [crate::Spec::singleton_dict], and the type lazy kwargs must resolve to
pub type Dict = IndexMap<String, Instance>;

/// Value produced by [crate::Spec::singleton_tuple]
#[derive(Clone, Debug)]
pub struct Tuple(Box<[Instance]>);
impl Tuple {
    pub fn new(items: Vec<Instance>) -> Self {
        Tuple(items.into_boxed_slice())
    }

    /// Downcasts the element at `index`, `None` if out of range or of another type
    pub fn get<T: Injectable>(&self, index: usize) -> Option<Arc<T>> {
        self.0.get(index).and_then(|item| item.downcast().ok())
    }
}
impl Deref for Tuple {
    type Target = [Instance];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
