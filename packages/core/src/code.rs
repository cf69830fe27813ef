//! Numeric failure codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An HRESULT-style status code.
///
/// Negative values are failures. The named constants follow the automation
/// status codes so that object models bridging a native substrate can pass
/// codes through untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// Success.
    pub const OK: ErrorCode = ErrorCode(0);
    /// Success with a negative answer (e.g. no more elements).
    pub const FALSE: ErrorCode = ErrorCode(1);

    pub const NOT_IMPLEMENTED: ErrorCode = ErrorCode::from_bits(0x8000_4001);
    pub const NO_INTERFACE: ErrorCode = ErrorCode::from_bits(0x8000_4002);
    pub const UNEXPECTED: ErrorCode = ErrorCode::from_bits(0x8000_FFFF);
    pub const INVALID_ARG: ErrorCode = ErrorCode::from_bits(0x8007_0057);

    pub const MEMBER_NOT_FOUND: ErrorCode = ErrorCode::from_bits(0x8002_0003);
    pub const PARAM_NOT_FOUND: ErrorCode = ErrorCode::from_bits(0x8002_0004);
    pub const TYPE_MISMATCH: ErrorCode = ErrorCode::from_bits(0x8002_0005);
    pub const UNKNOWN_NAME: ErrorCode = ErrorCode::from_bits(0x8002_0006);
    pub const BAD_VAR_TYPE: ErrorCode = ErrorCode::from_bits(0x8002_0008);
    pub const EXCEPTION: ErrorCode = ErrorCode::from_bits(0x8002_0009);
    pub const OVERFLOW: ErrorCode = ErrorCode::from_bits(0x8002_000A);
    pub const BAD_INDEX: ErrorCode = ErrorCode::from_bits(0x8002_000B);
    pub const BAD_PARAM_COUNT: ErrorCode = ErrorCode::from_bits(0x8002_000E);

    /// Build a code from its unsigned bit pattern (`0x8002_0003` etc.).
    pub const fn from_bits(bits: u32) -> Self {
        ErrorCode(bits as i32)
    }

    /// The unsigned bit pattern.
    pub const fn bits(self) -> u32 {
        self.0 as u32
    }

    pub fn is_success(self) -> bool {
        self.0 >= 0
    }

    pub fn is_failure(self) -> bool {
        self.0 < 0
    }

    /// Short human-readable name for the well-known codes.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            ErrorCode::OK => "ok",
            ErrorCode::FALSE => "false",
            ErrorCode::NOT_IMPLEMENTED => "not implemented",
            ErrorCode::NO_INTERFACE => "no such interface",
            ErrorCode::UNEXPECTED => "unexpected failure",
            ErrorCode::INVALID_ARG => "invalid argument",
            ErrorCode::MEMBER_NOT_FOUND => "member not found",
            ErrorCode::PARAM_NOT_FOUND => "parameter not found",
            ErrorCode::TYPE_MISMATCH => "type mismatch",
            ErrorCode::UNKNOWN_NAME => "unknown name",
            ErrorCode::BAD_VAR_TYPE => "bad variable type",
            ErrorCode::EXCEPTION => "exception occurred",
            ErrorCode::OVERFLOW => "out of present range",
            ErrorCode::BAD_INDEX => "invalid index",
            ErrorCode::BAD_PARAM_COUNT => "invalid number of parameters",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "0x{:08X} ({})", self.bits(), name),
            None => write!(f, "0x{:08X}", self.bits()),
        }
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        ErrorCode(code)
    }
}
