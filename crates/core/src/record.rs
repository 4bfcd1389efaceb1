//! Records broadcast to runtime sinks
//!
//! Plain value objects emitted by test code through the execution context:
//! - [`Log`]: a leveled text line
//! - [`Assert`]: the outcome of a single check, for reporters
//! - [`Artefact`]: a named attachment (text, JSON, raw bytes)

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Log level of a [`Log`] record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

/// A log line emitted by a test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub level: LogLevel,
    pub text: String,
}

impl Log {
    pub fn new(level: LogLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn debug(text: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, text)
    }

    pub fn fatal(text: impl Into<String>) -> Self {
        Self::new(LogLevel::Fatal, text)
    }
}

/// Kind of check an [`Assert`] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssertKind {
    Equal,
    True,
    False,
    Error,
    NoError,
    Nil,
    NotNil,
}

/// An assertion record
///
/// Expected and actual values are captured in their `Debug` rendering so
/// the record stays serializable regardless of the compared types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assert {
    pub kind: AssertKind,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub error: Option<String>,
}

impl Assert {
    fn bare(kind: AssertKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            expected: None,
            actual: None,
            error: None,
        }
    }

    pub fn equal<E: Debug, A: Debug>(expected: E, actual: A, message: impl Into<String>) -> Self {
        Self {
            expected: Some(format!("{:?}", expected)),
            actual: Some(format!("{:?}", actual)),
            ..Self::bare(AssertKind::Equal, message)
        }
    }

    pub fn is_true(actual: bool, message: impl Into<String>) -> Self {
        Self {
            expected: Some("true".to_string()),
            actual: Some(actual.to_string()),
            ..Self::bare(AssertKind::True, message)
        }
    }

    pub fn is_false(actual: bool, message: impl Into<String>) -> Self {
        Self {
            expected: Some("false".to_string()),
            actual: Some(actual.to_string()),
            ..Self::bare(AssertKind::False, message)
        }
    }

    /// Expect an error to be present
    pub fn error<E: std::fmt::Display>(error: Option<&E>, message: impl Into<String>) -> Self {
        Self {
            error: error.map(|e| e.to_string()),
            ..Self::bare(AssertKind::Error, message)
        }
    }

    /// Expect no error
    pub fn no_error<E: std::fmt::Display>(error: Option<&E>, message: impl Into<String>) -> Self {
        Self {
            error: error.map(|e| e.to_string()),
            ..Self::bare(AssertKind::NoError, message)
        }
    }

    pub fn none<T: Debug>(actual: Option<T>, message: impl Into<String>) -> Self {
        Self {
            actual: actual.map(|v| format!("{:?}", v)),
            ..Self::bare(AssertKind::Nil, message)
        }
    }

    pub fn some<T: Debug>(actual: Option<T>, message: impl Into<String>) -> Self {
        Self {
            actual: actual.map(|v| format!("{:?}", v)),
            ..Self::bare(AssertKind::NotNil, message)
        }
    }
}

/// Content type of an [`Artefact`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtefactKind {
    Text,
    Json,
    Bytes,
}

/// A named attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artefact {
    pub name: String,
    pub kind: ArtefactKind,
    pub data: Vec<u8>,
}

impl Artefact {
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ArtefactKind::Text,
            data: text.into().into_bytes(),
        }
    }

    pub fn bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            kind: ArtefactKind::Bytes,
            data: data.into(),
        }
    }

    /// Pretty-printed JSON attachment
    pub fn json<T: Serialize + ?Sized>(
        name: impl Into<String>,
        value: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            name: name.into(),
            kind: ArtefactKind::Json,
            data: serde_json::to_vec_pretty(value)?,
        })
    }
}
