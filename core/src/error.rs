//! Error types for schema construction, token dispatch, and callback
//! registration.
//!
//! Build-time problems abort schema construction entirely, run-time problems
//! abort a single parse call. The `Display` impls are what end up on the
//! `error:` line above the rendered help text.

use thiserror::Error;

use crate::FieldKind;

/// Errors raised while building a parser from a configuration description.
///
/// Construction is atomic: any of these means no parser was produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A field annotation is malformed (bad shortcut, default outside the
    /// choice list, annotation that does not apply to the field's kind).
    #[error("field {field}: {reason}")]
    FieldConfig { field: String, reason: String },
    /// A long name, shortcut or sub-command name is declared twice at the
    /// same schema level.
    #[error("duplicate {scope}: {name}")]
    DuplicateDefinition { scope: &'static str, name: String },
    /// The callback annotation names a handler that is not registered.
    #[error("field {field}: unknown callback {callback}")]
    UnknownCallback { field: String, callback: String },
    /// The field's scalar kind has no coercion rule.
    #[error("field {field}: unsupported field kind {kind:?}")]
    UnsupportedFieldKind { field: String, kind: FieldKind },
    /// A sub-command type nests itself, directly or through other types.
    #[error("sub-command cycle detected at path: {0}")]
    SubcommandCycle(String),
}

impl BuildError {
    pub(crate) fn field(field: &str, reason: impl Into<String>) -> Self {
        Self::FieldConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while dispatching tokens against a built schema.
///
/// Parsing is fail-fast: fields assigned by earlier tokens in the same call
/// keep their new values when a later token fails.
#[derive(Debug, Error)]
pub enum ParseError {
    /// `--name`, `-x` or a bundle character with no matching option.
    #[error("unknown option: {0}")]
    UnknownOption(String),
    /// A bare token with no sub-command match and no unset argument left.
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    /// The token is missing or fails the kind's syntax check.
    #[error("{field}: {reason}")]
    InvalidValue { field: String, reason: String },
    /// The token is not one of the field's declared choices.
    #[error("{value} should choice from [{}]", choices.join(" "))]
    InvalidChoice {
        field: String,
        value: String,
        choices: Vec<String>,
    },
    /// Writing help or callback output to the sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the process-wide callback registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A handler with this name is already registered.
    #[error("duplicated callback: {0}")]
    DuplicateCallback(String),
}

/// Convenience alias for schema construction results.
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Convenience alias for dispatch results.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
