use crate::error::TaskError;
use core::any::{Any, type_name};
use derive_more::{Debug, Display};
use indexmap::IndexMap as _IndexMap;
use rustc_hash::FxBuildHasher;
use std::{collections::HashMap as _HashMap, sync::Arc};

/// Identity of a [`TaskNode`](crate::node::TaskNode).
///
/// Derived from the node's allocation, so two handles compare equal iff they
/// refer to the same node. Unique among nodes alive at the same time.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("node#{_0:x}")]
pub struct NodeId(pub(crate) usize);

/// Dynamically typed, cheaply cloneable result of a task.
///
/// Clones share the same allocation: every reader of a cached node observes
/// the identical value (see [`Value::ptr_eq`]).
#[derive(Debug, Clone)]
#[debug("Value<{type_name}>")]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    /// Wraps `value`.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Whether the stored value is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Borrows the stored value as a `T`.
    ///
    /// # Errors
    /// [`TaskError::TypeMismatch`] if the value is not a `T`.
    pub fn get<T: Any>(&self) -> Result<&T, TaskError> {
        self.inner.downcast_ref().ok_or_else(|| self.mismatch::<T>())
    }

    /// Clones the stored value out as a `T`.
    ///
    /// # Errors
    /// [`TaskError::TypeMismatch`] if the value is not a `T`.
    pub fn cloned<T: Any + Clone>(&self) -> Result<T, TaskError> {
        self.get::<T>().cloned()
    }

    /// Shares the stored value as an `Arc<T>` without cloning it.
    ///
    /// # Errors
    /// [`TaskError::TypeMismatch`] if the value is not a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Result<Arc<T>, TaskError> {
        Arc::clone(&self.inner)
            .downcast()
            .map_err(|_| self.mismatch::<T>())
    }

    /// Whether both values share one allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn mismatch<T>(&self) -> TaskError {
        TaskError::TypeMismatch {
            expected: type_name::<T>(),
            found: self.type_name,
        }
    }
}

pub(crate) type HashMap<K, V> = _HashMap<K, V, FxBuildHasher>;
pub(crate) type IndexMap<K, V> = _IndexMap<K, V, FxBuildHasher>;
