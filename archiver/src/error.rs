//! Error types and result definitions for archiver operations.
//!
//! [`ArchiverError`] carries a classification, a static description, optional dynamic detail,
//! an optional originating error and the callsite where it was created. Several errors can be
//! aggregated into one when a step fails in more than one place.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for archiver operations using [`ArchiverError`] as the error type.
pub type ArchiverResult<T> = Result<T, ArchiverError>;

/// Detailed payload stored for single [`ArchiverError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for archiver operations.
#[derive(Debug, Clone)]
pub struct ArchiverError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Single error payload holding rich metadata.
    Single(ErrorPayload),
    /// Multiple aggregated errors.
    Many {
        errors: Vec<ArchiverError>,
        location: &'static Location<'static>,
    },
}

/// Categories of errors that can occur while draining or archiving records.
///
/// Only the kinds for which [`ErrorKind::halts_run`] returns `true` end a drain run. Every
/// other kind is contained at the record or batch where it happened.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Configuration Errors
    ConfigError,
    SourceNotFound,
    SinkNotFound,

    // Source Errors
    SourceUnavailable,
    MissingKey,
    DeletionFailed,

    // Sink Errors
    SinkCallFailed,

    // Data & Transformation Errors
    ConversionError,
    InvalidData,

    // IO & Serialization Errors
    IoError,
    SerializationError,
    DeserializationError,

    // State Errors
    InvalidState,

    // Unknown / Uncategorized
    Unknown,
}

impl ErrorKind {
    /// Returns `true` when an error of this kind must end the current drain run.
    ///
    /// Configuration problems and an unreachable source stop the run. A broken positional
    /// alignment between a batch and its outcomes also stops it, since continuing could
    /// delete records that were never delivered.
    pub fn halts_run(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConfigError
                | ErrorKind::SourceNotFound
                | ErrorKind::SinkNotFound
                | ErrorKind::SourceUnavailable
                | ErrorKind::InvalidState
        )
    }
}

impl ArchiverError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => {
                errors.iter().flat_map(|err| err.kinds()).collect()
            }
        }
    }

    /// Returns the static description of this error.
    ///
    /// Aggregated errors return the description of their first error.
    pub fn description(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.description.as_ref()),
            ErrorRepr::Many { ref errors, .. } => errors.first().and_then(|e| e.description()),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Returns `true` when any contained kind must end the current drain run.
    pub fn halts_run(&self) -> bool {
        self.kinds().iter().any(ErrorKind::halts_run)
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    ///
    /// Has no effect on aggregated errors, which forward their first error as source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }

        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        ArchiverError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

/// Errors compare by their kinds, ignoring detail, source and location.
impl PartialEq for ArchiverError {
    fn eq(&self, other: &ArchiverError) -> bool {
        let aggregated = |err: &ArchiverError| matches!(err.repr, ErrorRepr::Many { .. });

        aggregated(self) == aggregated(other) && self.kinds() == other.kinds()
    }
}

/// Hashes kinds and static descriptions so repeated failures group together.
impl Hash for ArchiverError {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                payload.kind.hash(state);
                payload.description.hash(state);
            }
            ErrorRepr::Many { errors, .. } => errors.hash(state),
        }
    }
}

/// Renders `description (Kind at file:line)` followed by the detail, if any.
///
/// Aggregated errors render one indented line per inner error. Backtraces are available
/// through [`ArchiverError::backtrace`] and are never part of the rendered message.
impl fmt::Display for ArchiverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                write!(
                    f,
                    "{} ({:?} at {}:{})",
                    payload.description,
                    payload.kind,
                    payload.location.file(),
                    payload.location.line()
                )?;

                match payload.detail.as_deref().map(str::trim) {
                    Some(detail) if !detail.is_empty() => write!(f, ": {detail}"),
                    _ => Ok(()),
                }
            }
            ErrorRepr::Many { errors, location } => {
                write!(
                    f,
                    "{} errors at {}:{}",
                    errors.len(),
                    location.file(),
                    location.line()
                )?;

                for error in errors {
                    let rendered = error.to_string().replace('\n', "\n    ");
                    write!(f, "\n  - {rendered}")?;
                }

                Ok(())
            }
        }
    }
}

impl error::Error for ArchiverError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let source = payload.source.as_deref()?;
                Some(source)
            }
            ErrorRepr::Many { errors, .. } => {
                let first = errors.first()?;
                Some(first)
            }
        }
    }
}

/// Creates an [`ArchiverError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for ArchiverError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> ArchiverError {
        ArchiverError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates an [`ArchiverError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for ArchiverError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> ArchiverError {
        ArchiverError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Creates an [`ArchiverError`] from a vector of errors for aggregation.
///
/// A vector holding exactly one error yields that error unchanged.
impl<E> From<Vec<E>> for ArchiverError
where
    E: Into<ArchiverError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> ArchiverError {
        let location = Location::caller();

        let mut errors: Vec<ArchiverError> = errors.into_iter().map(Into::into).collect();
        if errors.len() == 1
            && let Some(error) = errors.pop()
        {
            return error;
        }

        ArchiverError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

/// Converts [`std::io::Error`] to [`ArchiverError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for ArchiverError {
    #[track_caller]
    fn from(err: std::io::Error) -> ArchiverError {
        let detail = err.to_string();
        ArchiverError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`serde_json::Error`] to [`ArchiverError`].
///
/// Syntax, data and EOF failures map to [`ErrorKind::DeserializationError`].
impl From<serde_json::Error> for ArchiverError {
    #[track_caller]
    fn from(err: serde_json::Error) -> ArchiverError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        ArchiverError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`bigdecimal::ParseBigDecimalError`] to [`ArchiverError`] with [`ErrorKind::ConversionError`].
impl From<bigdecimal::ParseBigDecimalError> for ArchiverError {
    #[track_caller]
    fn from(err: bigdecimal::ParseBigDecimalError) -> ArchiverError {
        let detail = err.to_string();
        ArchiverError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("Number parsing failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`base64::DecodeError`] to [`ArchiverError`] with [`ErrorKind::ConversionError`].
impl From<base64::DecodeError> for ArchiverError {
    #[track_caller]
    fn from(err: base64::DecodeError) -> ArchiverError {
        let detail = err.to_string();
        ArchiverError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("Base64 decoding failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}
