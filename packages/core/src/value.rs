//! The Cell type - one typed value crossing the late-bound boundary.
//!
//! Every argument handed to a member and every result coming back is a
//! `Cell`. Exactly one payload is active at a time and the tag is the enum
//! discriminant, so tag and payload can never disagree.

use std::fmt;
use std::rc::Rc;

use bytes::Bytes;
use chrono::NaiveDateTime;

use crate::{date, CoerceError, ErrorCode, ObjectRef};

/// A typed value held by an argument slot or returned by a member.
///
/// # Design Notes
///
/// - `Empty` is the "no value" result of members that return nothing
/// - `Error` carries a status code as data (e.g. an omitted optional argument)
/// - `Object` is a counted reference; dropping the cell releases it
/// - `Array` keeps its element type next to the items
#[derive(Clone, Default)]
pub enum Cell {
    /// No value.
    #[default]
    Empty,
    /// Signed 32-bit integer.
    I32(i32),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Status code carried as a value.
    Error(ErrorCode),
    /// Boolean.
    Bool(bool),
    /// 64-bit floating point.
    Double(f64),
    /// Raw binary data.
    Blob(Bytes),
    /// Unicode string.
    String(String),
    /// Date and time.
    Date(NaiveDateTime),
    /// Reference to another late-bound object.
    Object(ObjectRef),
    /// Array whose items all share one element type.
    Array(TypedArray),
}

/// The tag of a `Cell`, plus `Any` for "whatever the member returned".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellType {
    Empty,
    I32,
    U32,
    Error,
    Bool,
    Double,
    Blob,
    String,
    Date,
    Object,
    Array,
    /// Generic: accepts any cell without conversion.
    Any,
}

impl CellType {
    pub fn name(self) -> &'static str {
        match self {
            CellType::Empty => "empty",
            CellType::I32 => "int32",
            CellType::U32 => "uint32",
            CellType::Error => "error code",
            CellType::Bool => "boolean",
            CellType::Double => "double",
            CellType::Blob => "binary",
            CellType::String => "string",
            CellType::Date => "date",
            CellType::Object => "object",
            CellType::Array => "array",
            CellType::Any => "any",
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Cell {
    /// The tag of this cell.
    pub fn cell_type(&self) -> CellType {
        match self {
            Cell::Empty => CellType::Empty,
            Cell::I32(_) => CellType::I32,
            Cell::U32(_) => CellType::U32,
            Cell::Error(_) => CellType::Error,
            Cell::Bool(_) => CellType::Bool,
            Cell::Double(_) => CellType::Double,
            Cell::Blob(_) => CellType::Blob,
            Cell::String(_) => CellType::String,
            Cell::Date(_) => CellType::Date,
            Cell::Object(_) => CellType::Object,
            Cell::Array(_) => CellType::Array,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Cell::Object(_))
    }

    /// Borrow the object reference, if this cell holds one.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Cell::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Take the object reference out of the cell.
    pub fn into_object(self) -> Option<ObjectRef> {
        match self {
            Cell::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::String(s) => Some(s),
            _ => None,
        }
    }

    /// The string payload encoded as UTF-16, for wide-string consumers.
    pub fn to_wide(&self) -> Option<Vec<u16>> {
        self.as_str().map(|s| s.encode_utf16().collect())
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => write!(f, "Empty"),
            Cell::I32(v) => write!(f, "I32({})", v),
            Cell::U32(v) => write!(f, "U32({})", v),
            Cell::Error(code) => write!(f, "Error({})", code),
            Cell::Bool(v) => write!(f, "Bool({})", v),
            Cell::Double(v) => write!(f, "Double({})", v),
            Cell::Blob(b) => write!(f, "Blob({} bytes)", b.len()),
            Cell::String(s) => write!(f, "String({:?})", s),
            Cell::Date(d) => write!(f, "Date({})", date::format(d)),
            Cell::Object(obj) => write!(f, "Object({})", obj.type_name()),
            Cell::Array(arr) => f.debug_tuple("Array").field(arr).finish(),
        }
    }
}

/// Renders the cell the way it appears in a resolved member path.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => write!(f, "Empty"),
            Cell::I32(v) => write!(f, "{}", v),
            Cell::U32(v) => write!(f, "{}", v),
            Cell::Error(code) => write!(f, "{}", code),
            Cell::Bool(v) => write!(f, "{}", v),
            Cell::Double(v) => write!(f, "{}", v),
            Cell::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Cell::String(s) => write!(f, "{:?}", s),
            Cell::Date(d) => write!(f, "#{}#", date::format(d)),
            Cell::Object(obj) => write!(f, "<{}>", obj.type_name()),
            Cell::Array(arr) => write!(f, "<{} array of {}>", arr.element(), arr.len()),
        }
    }
}

/// Object cells compare by identity, everything else by value.
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Empty, Cell::Empty) => true,
            (Cell::I32(a), Cell::I32(b)) => a == b,
            (Cell::U32(a), Cell::U32(b)) => a == b,
            (Cell::Error(a), Cell::Error(b)) => a == b,
            (Cell::Bool(a), Cell::Bool(b)) => a == b,
            (Cell::Double(a), Cell::Double(b)) => a == b,
            (Cell::Blob(a), Cell::Blob(b)) => a == b,
            (Cell::String(a), Cell::String(b)) => a == b,
            (Cell::Date(a), Cell::Date(b)) => a == b,
            (Cell::Object(a), Cell::Object(b)) => Rc::ptr_eq(a, b),
            (Cell::Array(a), Cell::Array(b)) => a == b,
            _ => false,
        }
    }
}

/// An array whose items all carry the same tag.
///
/// An element type of `CellType::Any` makes a heterogeneous array.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedArray {
    element: CellType,
    items: Vec<Cell>,
}

impl TypedArray {
    /// Create an empty array of the given element type.
    pub fn of(element: CellType) -> Self {
        TypedArray {
            element,
            items: Vec::new(),
        }
    }

    /// Build an array, coercing every item to the element type.
    ///
    /// # Errors
    ///
    /// Fails on the first item that cannot be converted.
    pub fn new(element: CellType, items: Vec<Cell>) -> Result<Self, CoerceError> {
        let items = items
            .into_iter()
            .map(|item| item.coerce(element))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TypedArray { element, items })
    }

    pub fn element(&self) -> CellType {
        self.element
    }

    pub fn items(&self) -> &[Cell] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Cell> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an item, coercing it to the element type.
    pub fn push(&mut self, item: Cell) -> Result<(), CoerceError> {
        self.items.push(item.coerce(self.element)?);
        Ok(())
    }

    /// Re-type the array, converting each item.
    pub fn convert(self, element: CellType) -> Result<TypedArray, CoerceError> {
        if element == self.element {
            return Ok(self);
        }
        TypedArray::new(element, self.items)
    }
}

// Conversion from common types

impl From<i32> for Cell {
    fn from(v: i32) -> Self {
        Cell::I32(v)
    }
}

impl From<u32> for Cell {
    fn from(v: u32) -> Self {
        Cell::U32(v)
    }
}

impl From<bool> for Cell {
    fn from(v: bool) -> Self {
        Cell::Bool(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Double(v)
    }
}

impl From<ErrorCode> for Cell {
    fn from(v: ErrorCode) -> Self {
        Cell::Error(v)
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::String(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::String(v.to_string())
    }
}

impl From<Bytes> for Cell {
    fn from(v: Bytes) -> Self {
        Cell::Blob(v)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(v: NaiveDateTime) -> Self {
        Cell::Date(v)
    }
}

impl From<ObjectRef> for Cell {
    fn from(v: ObjectRef) -> Self {
        Cell::Object(v)
    }
}

impl From<TypedArray> for Cell {
    fn from(v: TypedArray) -> Self {
        Cell::Array(v)
    }
}

/// Extract a native value from a cell, coercing as needed.
pub trait FromCell: Sized {
    /// The tag the cell is coerced to before extraction.
    const TYPE: CellType;

    fn from_cell(cell: Cell) -> Result<Self, CoerceError>;
}

macro_rules! from_cell {
    ($native:ty, $tag:ident) => {
        impl FromCell for $native {
            const TYPE: CellType = CellType::$tag;

            fn from_cell(cell: Cell) -> Result<Self, CoerceError> {
                match cell.coerce(CellType::$tag)? {
                    Cell::$tag(v) => Ok(v),
                    other => Err(CoerceError::Unsupported {
                        from: other.cell_type(),
                        to: CellType::$tag,
                    }),
                }
            }
        }
    };
}

from_cell!(i32, I32);
from_cell!(u32, U32);
from_cell!(bool, Bool);
from_cell!(f64, Double);
from_cell!(ErrorCode, Error);
from_cell!(String, String);
from_cell!(Bytes, Blob);
from_cell!(NaiveDateTime, Date);
from_cell!(ObjectRef, Object);
from_cell!(TypedArray, Array);

impl FromCell for Cell {
    const TYPE: CellType = CellType::Any;

    fn from_cell(cell: Cell) -> Result<Self, CoerceError> {
        Ok(cell)
    }
}
