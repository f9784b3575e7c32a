//! Error types shared by every modelhooks crate.

use std::error::Error as StdError;
use std::fmt;

use crate::capability::Capability;

/// Result alias used by hooks, the dispatcher and the session.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by hooks, dispatch and the persistence boundary.
#[derive(Debug)]
pub enum Error {
    /// A hook that was present ran and failed.
    Hook(HookFailure),
    /// No record with the given primary key exists.
    NotFound { table: &'static str, id: i64 },
    /// The operation needs a primary key but the record has none.
    MissingId { table: &'static str },
    /// The connection could not carry out the operation.
    Connection(String),
    /// A record could not be marshalled to or from storage.
    Serialization(String),
    /// A capability name that is not part of the closed set.
    UnknownCapability(String),
    /// Free-form error, typically raised from inside a hook body.
    Custom(String),
    /// An application error, kept intact so callers can downcast it.
    Other(Box<dyn StdError + Send + Sync + 'static>),
}

impl Error {
    /// Build a free-form error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Error::Custom(msg.into())
    }

    /// Wrap an application error without flattening it to a string.
    pub fn other<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Error::Other(Box::new(err))
    }

    /// The application error inside [`Error::Other`], if it is an `E`.
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Error::Other(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// The hook failure, if this error came from a hook.
    #[must_use]
    pub fn as_hook_failure(&self) -> Option<&HookFailure> {
        match self {
            Error::Hook(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Hook(failure) => write!(f, "{}", failure),
            Error::NotFound { table, id } => write!(f, "no row in {} with id {}", table, id),
            Error::MissingId { table } => write!(f, "record in {} has no primary key", table),
            Error::Connection(msg) => write!(f, "connection error: {}", msg),
            Error::Serialization(msg) => write!(f, "serialization error: {}", msg),
            Error::UnknownCapability(name) => write!(f, "unknown capability: {}", name),
            Error::Custom(msg) => f.write_str(msg),
            Error::Other(err) => write!(f, "{}", err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Hook(failure) => Some(failure.inner()),
            Error::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// A hook's own error together with where it was raised.
///
/// The wrapped error is kept intact; [`HookFailure::into_inner`] hands it back
/// unchanged.
#[derive(Debug)]
pub struct HookFailure {
    capability: Capability,
    index: Option<usize>,
    source: Box<Error>,
}

impl HookFailure {
    /// Record a failure of `capability`, at `index` when dispatching a sequence.
    pub fn new(capability: Capability, index: Option<usize>, source: Error) -> Self {
        Self {
            capability,
            index,
            source: Box::new(source),
        }
    }

    /// The capability whose hook failed.
    #[must_use]
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Position of the failing element; `None` for a single entity.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// The error the hook returned.
    #[must_use]
    pub fn inner(&self) -> &Error {
        &self.source
    }

    /// Unwrap into the error the hook returned.
    #[must_use]
    pub fn into_inner(self) -> Error {
        *self.source
    }
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(
                f,
                "{} hook failed at element {}: {}",
                self.capability, index, self.source
            ),
            None => write!(f, "{} hook failed: {}", self.capability, self.source),
        }
    }
}

impl From<HookFailure> for Error {
    fn from(failure: HookFailure) -> Self {
        Error::Hook(failure)
    }
}
