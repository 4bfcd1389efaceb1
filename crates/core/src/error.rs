//! Error types for axiom
//!
//! This module defines the error taxonomy used by the engine when resolving
//! named values (fixtures, resources, params, context data) and loading suite
//! settings. We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Merge operations never fail; every error here originates from a provider,
//! a typed lookup, or a settings file.

use std::fmt;
use thiserror::Error;

/// Result type alias for axiom operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by fixture and resource providers
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which kind of named value a lookup was targeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Test-scoped fixture
    Fixture,
    /// Suite-scoped resource
    Resource,
    /// Case parameters
    Params,
    /// Context data bag entry
    Context,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Fixture => write!(f, "fixture"),
            Scope::Resource => write!(f, "resource"),
            Scope::Params => write!(f, "params"),
            Scope::Context => write!(f, "context"),
        }
    }
}

/// Error types for axiom
#[derive(Debug, Error)]
pub enum Error {
    /// No provider registered under the requested name
    #[error("{scope} {name:?} not found")]
    NotFound {
        /// What was being looked up
        scope: Scope,
        /// Requested name
        name: String,
    },

    /// Stored value does not have the type the caller asked for
    #[error("{scope} {name:?} has unexpected type, expected {expected}")]
    TypeMismatch {
        /// What was being looked up
        scope: Scope,
        /// Requested name
        name: String,
        /// Type name the caller requested
        expected: &'static str,
    },

    /// The provider itself returned an error
    #[error("{scope} {name:?} failed: {source}")]
    ProviderFailure {
        /// What was being resolved
        scope: Scope,
        /// Name of the failing provider
        name: String,
        /// Error returned by the provider
        #[source]
        source: BoxError,
    },

    /// A provider re-entered its own resolution on the same thread
    #[error("{scope} {name:?} depends on itself")]
    Cycle {
        /// What was being resolved
        scope: Scope,
        /// Name that closed the cycle
        name: String,
    },

    /// Optional value (params, context entry) was never set
    #[error("{scope} {name:?} is not set")]
    MissingValue {
        /// What was being looked up
        scope: Scope,
        /// Requested key
        name: String,
    },

    /// Suite settings could not be read or parsed
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

impl Error {
    /// Create a not-found error
    pub fn not_found(scope: Scope, name: impl Into<String>) -> Self {
        Error::NotFound {
            scope,
            name: name.into(),
        }
    }

    /// Create a type-mismatch error for requested type `T`
    pub fn type_mismatch<T: ?Sized>(scope: Scope, name: impl Into<String>) -> Self {
        Error::TypeMismatch {
            scope,
            name: name.into(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// Wrap a provider error
    pub fn provider(scope: Scope, name: impl Into<String>, source: BoxError) -> Self {
        Error::ProviderFailure {
            scope,
            name: name.into(),
            source,
        }
    }

    /// Name of the fixture/resource/key this error refers to, if any
    pub fn name(&self) -> Option<&str> {
        match self {
            Error::NotFound { name, .. }
            | Error::TypeMismatch { name, .. }
            | Error::ProviderFailure { name, .. }
            | Error::Cycle { name, .. }
            | Error::MissingValue { name, .. } => Some(name),
            Error::InvalidSettings(_) => None,
        }
    }
}
