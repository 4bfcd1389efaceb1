//! Type-erased values
//!
//! Params, context data, fixtures and resources all carry caller-defined
//! payloads. [`Value`] stores such a payload behind an `Arc` and recovers it
//! through a checked downcast, so a wrong type surfaces as
//! [`Error::TypeMismatch`] instead of undefined behaviour.

use crate::error::{Error, Result, Scope};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared, type-erased payload
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    /// Wrap a value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Wrap an already shared value without re-allocating
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Name of the stored type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check whether the stored value is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Borrow the stored value as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Get a shared handle to the stored value as `T`
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Like [`Value::downcast`], reporting a mismatch against `name`
    pub fn expect_type<T: Any + Send + Sync>(&self, scope: Scope, name: &str) -> Result<Arc<T>> {
        self.downcast::<T>()
            .ok_or_else(|| Error::type_mismatch::<T>(scope, name))
    }

    /// Whether both values point at the same allocation
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_name)
            .finish()
    }
}
