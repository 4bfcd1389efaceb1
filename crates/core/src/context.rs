//! Ambient execution handles and the free-form data bag
//!
//! A [`Handle`] is the cancellation/deadline token that test code hands to
//! clients. The context carries one root handle plus per-subsystem handles
//! (gRPC, HTTP, Kafka) that default to the root. The engine only plumbs
//! handles through; it never checks deadlines or cancels anything.

use crate::error::{Error, Result, Scope};
use crate::traits::{Join, Normalize};
use crate::value::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation flag with an optional deadline
///
/// Clones share the cancellation flag. A child shares its parent's flag and
/// inherits the earlier of the two deadlines.
#[derive(Debug, Clone)]
pub struct Handle {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Handle {
    /// Root handle with no deadline
    pub fn background() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Derive a handle that expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a handle with an absolute deadline
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(deadline),
        }
    }

    /// Signal cancellation to every clone and child
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the handle was cancelled or its deadline passed
    pub fn is_done(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.map_or(false, |d| Instant::now() >= d)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether both handles share the same cancellation flag
    pub fn same_origin(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::background()
    }
}

/// Execution handles and key/value data for one test
///
/// Join: each handle is overridden only when the incoming one is present;
/// the data bag merges shallowly with incoming winning per key.
#[derive(Debug, Clone, Default)]
pub struct Context {
    raw: Option<Handle>,
    grpc: Option<Handle>,
    http: Option<Handle>,
    kafka: Option<Handle>,
    data: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(mut self, handle: Handle) -> Self {
        self.raw = Some(handle);
        self
    }

    pub fn with_grpc(mut self, handle: Handle) -> Self {
        self.grpc = Some(handle);
        self
    }

    pub fn with_http(mut self, handle: Handle) -> Self {
        self.http = Some(handle);
        self
    }

    pub fn with_kafka(mut self, handle: Handle) -> Self {
        self.kafka = Some(handle);
        self
    }

    /// Insert a data entry
    pub fn with_data<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.data.insert(key.into(), Value::new(value));
        self
    }

    /// Root handle; `None` until one is set or the context is normalized
    pub fn raw(&self) -> Option<&Handle> {
        self.raw.as_ref()
    }

    /// gRPC handle, falling back to the root handle
    pub fn grpc(&self) -> Option<&Handle> {
        self.grpc.as_ref().or(self.raw.as_ref())
    }

    pub fn http(&self) -> Option<&Handle> {
        self.http.as_ref().or(self.raw.as_ref())
    }

    pub fn kafka(&self) -> Option<&Handle> {
        self.kafka.as_ref().or(self.raw.as_ref())
    }

    /// Typed lookup; `None` when absent or of another type
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.data.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Typed lookup that distinguishes a missing key from a type mismatch
    pub fn require<T: Any>(&self, key: &str) -> Result<&T> {
        let value = self.data.get(key).ok_or_else(|| Error::MissingValue {
            scope: Scope::Context,
            name: key.to_string(),
        })?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| Error::type_mismatch::<T>(Scope::Context, key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}

impl Join for Context {
    fn join(&self, other: &Self) -> Self {
        let mut data = self.data.clone();
        data.extend(other.data.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            raw: other.raw.clone().or_else(|| self.raw.clone()),
            grpc: other.grpc.clone().or_else(|| self.grpc.clone()),
            http: other.http.clone().or_else(|| self.http.clone()),
            kafka: other.kafka.clone().or_else(|| self.kafka.clone()),
            data,
        }
    }
}

impl Normalize for Context {
    fn normalize(&mut self) {
        let raw = self.raw.get_or_insert_with(Handle::background).clone();
        for slot in [&mut self.grpc, &mut self.http, &mut self.kafka] {
            if slot.is_none() {
                *slot = Some(raw.clone());
            }
        }
    }
}
