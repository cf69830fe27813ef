//! The failure payload raised by late-bound objects.

use std::fmt;

use crate::ErrorCode;

/// What an object reports when one of its members fails.
///
/// Local bookkeeping failures (unknown member, wrong argument count) only
/// need a code. Failures raised by the object's own logic carry the richer
/// fields: description, source, help reference and the offending argument.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fault {
    pub code: ErrorCode,
    pub description: Option<String>,
    pub source: Option<String>,
    pub help_file: Option<String>,
    pub help_context: u32,
    /// 1-based index of the argument that caused the failure.
    pub arg_error: Option<usize>,
}

impl Fault {
    pub fn new(code: ErrorCode) -> Self {
        Fault {
            code,
            ..Fault::default()
        }
    }

    /// An error raised by the object itself, with its own explanation.
    pub fn exception(source: impl Into<String>, description: impl Into<String>) -> Self {
        Fault {
            code: ErrorCode::EXCEPTION,
            description: Some(description.into()),
            source: Some(source.into()),
            ..Fault::default()
        }
    }

    pub fn unknown_name() -> Self {
        Fault::new(ErrorCode::UNKNOWN_NAME)
    }

    pub fn member_not_found() -> Self {
        Fault::new(ErrorCode::MEMBER_NOT_FOUND)
    }

    pub fn bad_param_count() -> Self {
        Fault::new(ErrorCode::BAD_PARAM_COUNT)
    }

    pub fn not_implemented() -> Self {
        Fault::new(ErrorCode::NOT_IMPLEMENTED)
    }

    /// A type mismatch on the given 1-based argument.
    pub fn type_mismatch(arg: usize) -> Self {
        Fault::new(ErrorCode::TYPE_MISMATCH).at_argument(arg)
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_help(mut self, file: impl Into<String>, context: u32) -> Self {
        self.help_file = Some(file.into());
        self.help_context = context;
        self
    }

    #[must_use]
    pub fn at_argument(mut self, arg: usize) -> Self {
        self.arg_error = Some(arg);
        self
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(description) = &self.description {
            write!(f, ": {}", description)?;
        }
        if let Some(source) = &self.source {
            write!(f, " [{}]", source)?;
        }
        if let Some(arg) = self.arg_error {
            write!(f, " (argument {})", arg)?;
        }
        Ok(())
    }
}

impl std::error::Error for Fault {}

impl From<ErrorCode> for Fault {
    fn from(code: ErrorCode) -> Self {
        Fault::new(code)
    }
}
