//! The coercion table between cell tags.
//!
//! Every (source, target) pair is listed explicitly; pairs not listed fail
//! with `CoerceError::Unsupported`.

use bytes::Bytes;

use crate::{date, Cell, CellType, ErrorCode};

/// A cell could not be converted to the requested tag.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoerceError {
    /// No conversion exists between the two tags.
    #[error("cannot convert {from} to {to}")]
    Unsupported { from: CellType, to: CellType },

    /// The value does not fit the target.
    #[error("{value} is out of range for {to}")]
    Overflow { value: String, to: CellType },

    /// Text that does not spell a value of the target type.
    #[error("'{text}' is not a valid {to}")]
    Malformed { text: String, to: CellType },
}

impl CoerceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CoerceError::Unsupported { .. } => ErrorCode::TYPE_MISMATCH,
            CoerceError::Overflow { .. } => ErrorCode::OVERFLOW,
            CoerceError::Malformed { .. } => ErrorCode::TYPE_MISMATCH,
        }
    }
}

fn overflow(value: impl ToString, to: CellType) -> CoerceError {
    CoerceError::Overflow {
        value: value.to_string(),
        to,
    }
}

fn malformed(text: &str, to: CellType) -> CoerceError {
    CoerceError::Malformed {
        text: text.to_string(),
        to,
    }
}

/// Truncate toward zero and range-check.
fn double_to_i32(v: f64) -> Result<i32, CoerceError> {
    let t = v.trunc();
    if t.is_finite() && t >= i32::MIN as f64 && t <= i32::MAX as f64 {
        Ok(t as i32)
    } else {
        Err(overflow(v, CellType::I32))
    }
}

fn double_to_u32(v: f64) -> Result<u32, CoerceError> {
    let t = v.trunc();
    if t.is_finite() && t >= 0.0 && t <= u32::MAX as f64 {
        Ok(t as u32)
    } else {
        Err(overflow(v, CellType::U32))
    }
}

/// A well-formed, finite decimal numeral.
fn parse_number(text: &str, to: CellType) -> Result<f64, CoerceError> {
    let trimmed = text.trim();
    let well_formed = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    match trimmed.parse::<f64>() {
        Ok(v) if well_formed && v.is_finite() => Ok(v),
        _ => Err(malformed(text, to)),
    }
}

fn ole_date(days: f64) -> Result<Cell, CoerceError> {
    date::from_ole(days)
        .map(Cell::Date)
        .ok_or_else(|| overflow(days, CellType::Date))
}

impl Cell {
    /// Convert this cell to the target tag.
    ///
    /// Widening is lossless (int to double), narrowing truncates toward zero
    /// and fails when out of range, strings must spell a well-formed value,
    /// and booleans map to and from zero/nonzero.
    pub fn coerce(self, target: CellType) -> Result<Cell, CoerceError> {
        let from = self.cell_type();
        if from == target || target == CellType::Any {
            return Ok(self);
        }

        match (self, target) {
            (Cell::Empty, CellType::I32) => Ok(Cell::I32(0)),
            (Cell::Empty, CellType::U32) => Ok(Cell::U32(0)),
            (Cell::Empty, CellType::Double) => Ok(Cell::Double(0.0)),
            (Cell::Empty, CellType::Bool) => Ok(Cell::Bool(false)),
            (Cell::Empty, CellType::String) => Ok(Cell::String(String::new())),

            (Cell::I32(v), CellType::U32) => u32::try_from(v)
                .map(Cell::U32)
                .map_err(|_| overflow(v, target)),
            (Cell::I32(v), CellType::Error) => Ok(Cell::Error(ErrorCode(v))),
            (Cell::I32(v), CellType::Bool) => Ok(Cell::Bool(v != 0)),
            (Cell::I32(v), CellType::Double) => Ok(Cell::Double(f64::from(v))),
            (Cell::I32(v), CellType::String) => Ok(Cell::String(v.to_string())),
            (Cell::I32(v), CellType::Date) => ole_date(f64::from(v)),

            (Cell::U32(v), CellType::I32) => i32::try_from(v)
                .map(Cell::I32)
                .map_err(|_| overflow(v, target)),
            (Cell::U32(v), CellType::Error) => Ok(Cell::Error(ErrorCode::from_bits(v))),
            (Cell::U32(v), CellType::Bool) => Ok(Cell::Bool(v != 0)),
            (Cell::U32(v), CellType::Double) => Ok(Cell::Double(f64::from(v))),
            (Cell::U32(v), CellType::String) => Ok(Cell::String(v.to_string())),
            (Cell::U32(v), CellType::Date) => ole_date(f64::from(v)),

            (Cell::Error(code), CellType::I32) => Ok(Cell::I32(code.0)),
            (Cell::Error(code), CellType::U32) => Ok(Cell::U32(code.bits())),
            (Cell::Error(code), CellType::String) => Ok(Cell::String(code.to_string())),

            (Cell::Bool(v), CellType::I32) => Ok(Cell::I32(i32::from(v))),
            (Cell::Bool(v), CellType::U32) => Ok(Cell::U32(u32::from(v))),
            (Cell::Bool(v), CellType::Double) => Ok(Cell::Double(if v { 1.0 } else { 0.0 })),
            (Cell::Bool(v), CellType::String) => Ok(Cell::String(v.to_string())),

            (Cell::Double(v), CellType::I32) => double_to_i32(v).map(Cell::I32),
            (Cell::Double(v), CellType::U32) => double_to_u32(v).map(Cell::U32),
            (Cell::Double(v), CellType::Bool) => Ok(Cell::Bool(v != 0.0)),
            (Cell::Double(v), CellType::String) => Ok(Cell::String(v.to_string())),
            (Cell::Double(v), CellType::Date) => ole_date(v),

            (Cell::String(s), CellType::I32) => match s.trim().parse::<i32>() {
                Ok(v) => Ok(Cell::I32(v)),
                Err(_) => double_to_i32(parse_number(&s, target)?).map(Cell::I32),
            },
            (Cell::String(s), CellType::U32) => match s.trim().parse::<u32>() {
                Ok(v) => Ok(Cell::U32(v)),
                Err(_) => double_to_u32(parse_number(&s, target)?).map(Cell::U32),
            },
            (Cell::String(s), CellType::Double) => parse_number(&s, target).map(Cell::Double),
            (Cell::String(s), CellType::Bool) => {
                let trimmed = s.trim();
                if trimmed.eq_ignore_ascii_case("true") {
                    Ok(Cell::Bool(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(Cell::Bool(false))
                } else {
                    parse_number(&s, target).map(|v| Cell::Bool(v != 0.0))
                }
            }
            (Cell::String(s), CellType::Date) => date::parse(&s)
                .map(Cell::Date)
                .ok_or_else(|| malformed(&s, target)),
            (Cell::String(s), CellType::Blob) => Ok(Cell::Blob(Bytes::from(s.into_bytes()))),

            (Cell::Blob(b), CellType::String) => String::from_utf8(b.to_vec())
                .map(Cell::String)
                .map_err(|_| malformed("<binary>", target)),

            (Cell::Date(d), CellType::Double) => Ok(Cell::Double(date::to_ole(d))),
            (Cell::Date(d), CellType::String) => Ok(Cell::String(date::format(&d))),

            (_, to) => Err(CoerceError::Unsupported { from, to }),
        }
    }
}
