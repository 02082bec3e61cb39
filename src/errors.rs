//! Classified validation errors.
//!
//! Every local validation failure is reported as a [`ValidationError`] whose
//! [`ErrorKind`] identifies exactly what went wrong. Callers branch on the
//! kind (`err.kind() == ErrorKind::CircularDependency`), never on message text.
//!
//! Kinds are grouped into classes:
//!
//! - **category**: empty, invalid path segment, not allowed, change not allowed,
//!   invalid date suffix
//! - **field**: empty, too long, invalid characters, invalid format
//! - **reference**: duplicate id, non-existent reference, self-reference, circular dependency
//! - **input**: mutually-exclusive fields, missing required field, invalid value
//! - **file**: size exceeded, not a regular file, invalid JSON

use std::fmt;

/// Broad grouping of an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Category,
    Field,
    Reference,
    Input,
    File,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category => write!(f, "category"),
            Self::Field => write!(f, "field"),
            Self::Reference => write!(f, "reference"),
            Self::Input => write!(f, "input"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Closed set of validation failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CategoryEmpty,
    CategoryInvalidPath,
    CategoryNotAllowed,
    CategoryChangeNotAllowed,
    CategoryInvalidDate,
    FieldEmpty,
    FieldTooLong,
    FieldInvalidChars,
    FieldInvalidFormat,
    DuplicateId,
    NonExistentRef,
    SelfReference,
    CircularDependency,
    MutuallyExclusive,
    MissingRequired,
    InvalidValue,
    FileSizeExceeded,
    NotRegularFile,
    InvalidJson,
}

impl ErrorKind {
    /// The class this kind belongs to.
    pub fn class(self) -> ErrorClass {
        match self {
            Self::CategoryEmpty
            | Self::CategoryInvalidPath
            | Self::CategoryNotAllowed
            | Self::CategoryChangeNotAllowed
            | Self::CategoryInvalidDate => ErrorClass::Category,
            Self::FieldEmpty
            | Self::FieldTooLong
            | Self::FieldInvalidChars
            | Self::FieldInvalidFormat => ErrorClass::Field,
            Self::DuplicateId
            | Self::NonExistentRef
            | Self::SelfReference
            | Self::CircularDependency => ErrorClass::Reference,
            Self::MutuallyExclusive | Self::MissingRequired | Self::InvalidValue => {
                ErrorClass::Input
            }
            Self::FileSizeExceeded | Self::NotRegularFile | Self::InvalidJson => ErrorClass::File,
        }
    }

    /// Short human-readable description.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CategoryEmpty => "category is empty",
            Self::CategoryInvalidPath => "invalid category path",
            Self::CategoryNotAllowed => "category not allowed",
            Self::CategoryChangeNotAllowed => "category change not allowed",
            Self::CategoryInvalidDate => "category must end with a valid yyyy/mm/dd suffix",
            Self::FieldEmpty => "field is empty",
            Self::FieldTooLong => "field is too long",
            Self::FieldInvalidChars => "field contains invalid characters",
            Self::FieldInvalidFormat => "field has invalid format",
            Self::DuplicateId => "duplicate id",
            Self::NonExistentRef => "reference to non-existent task",
            Self::SelfReference => "task depends on itself",
            Self::CircularDependency => "circular dependency detected",
            Self::MutuallyExclusive => "mutually exclusive fields",
            Self::MissingRequired => "missing required field",
            Self::InvalidValue => "invalid value",
            Self::FileSizeExceeded => "file size exceeded",
            Self::NotRegularFile => "not a regular file",
            Self::InvalidJson => "invalid JSON",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A classified validation failure with optional location.
///
/// Built with a small builder chain:
///
/// ```
/// use esa_guard::errors::{ErrorKind, ValidationError};
///
/// let err = ValidationError::new(ErrorKind::FieldEmpty)
///     .field("body.tasks.title")
///     .index(2);
/// assert_eq!(err.kind(), ErrorKind::FieldEmpty);
/// assert_eq!(err.index_value(), Some(2));
/// ```
#[derive(Debug)]
pub struct ValidationError {
    kind: ErrorKind,
    field: Option<String>,
    index: Option<usize>,
    detail: Option<String>,
    cause: Option<Cause>,
}

impl ValidationError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            field: None,
            index: None,
            detail: None,
            cause: None,
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    pub fn field_name(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn index_value(&self) -> Option<usize> {
        self.index
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.class(), self.kind)?;
        if let Some(field) = &self.field {
            write!(f, " (field: {}", field)?;
            if let Some(index) = self.index {
                write!(f, ", index: {}", index)?;
            }
            write!(f, ")")?;
        } else if let Some(index) = self.index {
            write!(f, " (index: {})", index)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|c| c.as_ref() as &(dyn std::error::Error + 'static))
    }
}
