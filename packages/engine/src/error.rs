//! Error types for the invocation engine.

use latebind_core::{CellType, CoerceError, ErrorCode, Fault};

use crate::format::Placeholder;

/// A member path or output identifier that could not be parsed.
///
/// Parse errors are raised before any object is touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The path names no member at all.
    #[error("empty member path")]
    Empty,

    /// A `%` sigil followed by a letter outside the identifier alphabet.
    #[error("invalid format identifier '{identifier}' at offset {position}; valid identifiers are {valid}", valid = Placeholder::IDENTIFIERS)]
    UnknownIdentifier { identifier: char, position: usize },

    /// A `(` without its matching `)`.
    #[error("unterminated argument list opened at offset {position}")]
    UnterminatedArguments { position: usize },

    /// A `"` without its closing quote.
    #[error("unterminated string literal at offset {position}")]
    UnterminatedString { position: usize },

    /// Something other than what the grammar allows at this point.
    #[error("expected {expected} at offset {position}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
        position: usize,
    },

    /// A valid identifier used where it has no meaning.
    #[error("'%{identifier}' cannot be used as {context}")]
    Misplaced {
        identifier: char,
        context: &'static str,
    },

    /// An inline literal that does not spell a value.
    #[error("invalid literal '{text}' at offset {position}")]
    InvalidLiteral { text: String, position: usize },

    /// A put operation whose path does not end in ` = %x`.
    #[error("assigning a value requires a trailing ' = %x' in the path")]
    MissingValue,

    /// A trailing ` = %x` on an operation that does not assign.
    #[error("only put operations may end with ' = %x'")]
    UnexpectedValue,

    /// The output identifier of a get operation is not usable.
    #[error("'{text}' is not a valid output identifier")]
    InvalidOutput { text: String },
}

/// Errors returned by every engine entry point.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed path or output identifier.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A native argument could not be read for its placeholder.
    #[error("argument {index} ('%{identifier}'): {message}")]
    Marshal {
        /// 1-based position in the argument list.
        index: usize,
        identifier: char,
        message: String,
    },

    /// The argument list does not match the placeholders.
    #[error("path expects {expected} argument(s), {supplied} supplied")]
    Arity { expected: usize, supplied: usize },

    /// The current object has no member by this name.
    #[error("unknown member '{member}': {fault}")]
    UnknownMember { member: String, fault: Fault },

    /// A non-terminal step produced something the chain cannot continue from.
    #[error("'{member}' returned {found}, not an object")]
    NotAnObject { member: String, found: CellType },

    /// The object itself failed the get, put or call.
    #[error("'{member}' failed: {fault}")]
    Remote { member: String, fault: Fault },

    /// The result cannot be converted to the requested output type.
    #[error("cannot return '{member}' as {target}: {source}")]
    Coerce {
        member: String,
        target: CellType,
        #[source]
        source: CoerceError,
    },

    /// Object acquisition was requested but no substrate is registered.
    #[error("no object substrate registered")]
    NoSubstrate,

    /// The object substrate refused an operation.
    #[error("substrate error: {0}")]
    Substrate(Fault),
}

impl Error {
    /// The failure code reported for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Parse(_) => ErrorCode::INVALID_ARG,
            Error::Marshal { .. } => ErrorCode::TYPE_MISMATCH,
            Error::Arity { .. } => ErrorCode::BAD_PARAM_COUNT,
            Error::UnknownMember { fault, .. } => fault.code,
            Error::NotAnObject { .. } => ErrorCode::TYPE_MISMATCH,
            Error::Remote { fault, .. } => fault.code,
            Error::Coerce { source, .. } => source.code(),
            Error::NoSubstrate => ErrorCode::NOT_IMPLEMENTED,
            Error::Substrate(fault) => fault.code,
        }
    }

    /// The engine stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Parse(_) => "parse",
            Error::Marshal { .. } | Error::Arity { .. } => "marshal",
            Error::UnknownMember { .. } | Error::NotAnObject { .. } => "resolve",
            Error::Remote { .. } => "invoke",
            Error::Coerce { .. } => "coerce",
            Error::NoSubstrate | Error::Substrate(_) => "substrate",
        }
    }

    /// True when the object raised the failure, as opposed to the engine.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote { .. } | Error::Substrate(_))
    }

    /// The object-supplied diagnostics, if any.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Error::UnknownMember { fault, .. }
            | Error::Remote { fault, .. }
            | Error::Substrate(fault) => Some(fault),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn unknown_identifier_lists_alphabet() {
        let e = ParseError::UnknownIdentifier {
            identifier: 'q',
            position: 3,
        };
        let display = e.to_string();
        assert!(display.contains("'q'"));
        assert!(display.contains("offset 3"));
        assert!(display.contains(Placeholder::IDENTIFIERS));
    }

    #[test]
    fn codes_follow_the_failure_class() {
        assert_eq!(Error::from(ParseError::Empty).code(), ErrorCode::INVALID_ARG);
        assert_eq!(
            Error::Arity {
                expected: 2,
                supplied: 1
            }
            .code(),
            ErrorCode::BAD_PARAM_COUNT
        );
        let remote = Error::Remote {
            member: "Apply".to_string(),
            fault: Fault::exception("WIA", "bad image"),
        };
        assert_eq!(remote.code(), ErrorCode::EXCEPTION);
        assert!(remote.is_remote());
        assert_eq!(remote.stage(), "invoke");
    }

    #[test]
    fn coerce_error_has_source() {
        let e = Error::Coerce {
            member: "Width".to_string(),
            target: CellType::I32,
            source: CoerceError::Unsupported {
                from: CellType::Object,
                to: CellType::I32,
            },
        };
        assert!(StdError::source(&e).is_some());
        assert_eq!(e.code(), ErrorCode::TYPE_MISMATCH);
        assert!(e.to_string().contains("Width"));
    }

    #[test]
    fn local_errors_carry_no_fault() {
        let e = Error::NotAnObject {
            member: "Width".to_string(),
            found: CellType::I32,
        };
        assert!(e.fault().is_none());
        assert!(!e.is_remote());
        assert_eq!(e.stage(), "resolve");
    }
}
