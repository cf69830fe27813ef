//! Argument marshalling: native arguments to cells.
//!
//! Arguments are read strictly in placeholder order across the whole path,
//! then handed back to the segment that owns each placeholder.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDateTime;
use latebind_core::{date, Bytes, Cell, ErrorCode, ObjectRef, TypedArray};

use crate::error::Error;
use crate::format::{MemberName, ParsedPath, Placeholder, SegmentKind, Slot};
use crate::MarshalMode;

/// A native argument as supplied by the caller.
///
/// Each variant is the one shape a placeholder identifier reads; see
/// [`Placeholder`] for the pairing.
#[derive(Clone)]
pub enum Arg {
    /// A null object reference, accepted by `%O`.
    Null,
    Int(i32),
    UInt(u32),
    Error(ErrorCode),
    Bool(bool),
    /// A double, or an automation date for `%D`.
    Double(f64),
    /// A narrow string.
    Str(String),
    /// A UTF-16 string.
    Wide(Vec<u16>),
    Bytes(Bytes),
    /// Seconds since the Unix epoch.
    UnixTime(i64),
    DateTime(NaiveDateTime),
    Object(ObjectRef),
    Array(TypedArray),
    /// A ready-made cell, read by `%v`.
    Cell(Cell),
}

impl Arg {
    /// A wide string argument for `%S`.
    pub fn wide(s: &str) -> Self {
        Arg::Wide(s.encode_utf16().collect())
    }

    pub fn unix_time(seconds: i64) -> Self {
        Arg::UnixTime(seconds)
    }

    /// Short description used in marshalling errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Arg::Null => "null",
            Arg::Int(_) => "int32",
            Arg::UInt(_) => "uint32",
            Arg::Error(_) => "error code",
            Arg::Bool(_) => "boolean",
            Arg::Double(_) => "double",
            Arg::Str(_) => "narrow string",
            Arg::Wide(_) => "wide string",
            Arg::Bytes(_) => "binary",
            Arg::UnixTime(_) => "unix time",
            Arg::DateTime(_) => "date",
            Arg::Object(_) => "object",
            Arg::Array(_) => "array",
            Arg::Cell(_) => "cell",
        }
    }

    /// The cell this argument naturally maps to, used by `%v`.
    pub fn into_cell(self) -> Result<Cell, String> {
        let cell = match self {
            Arg::Null => Cell::Empty,
            Arg::Int(v) => Cell::I32(v),
            Arg::UInt(v) => Cell::U32(v),
            Arg::Error(v) => Cell::Error(v),
            Arg::Bool(v) => Cell::Bool(v),
            Arg::Double(v) => Cell::Double(v),
            Arg::Str(v) => Cell::String(v),
            Arg::Wide(v) => Cell::String(decode_wide(&v)?),
            Arg::Bytes(v) => Cell::Blob(v),
            Arg::UnixTime(v) => Cell::Date(unix_date(v)?),
            Arg::DateTime(v) => Cell::Date(v),
            Arg::Object(v) => Cell::Object(v),
            Arg::Array(v) => Cell::Array(v),
            Arg::Cell(v) => v,
        };
        Ok(cell)
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Null => write!(f, "Null"),
            Arg::Int(v) => write!(f, "Int({})", v),
            Arg::UInt(v) => write!(f, "UInt({})", v),
            Arg::Error(v) => write!(f, "Error({})", v),
            Arg::Bool(v) => write!(f, "Bool({})", v),
            Arg::Double(v) => write!(f, "Double({})", v),
            Arg::Str(v) => write!(f, "Str({:?})", v),
            Arg::Wide(v) => write!(f, "Wide({:?})", String::from_utf16_lossy(v)),
            Arg::Bytes(v) => write!(f, "Bytes({} bytes)", v.len()),
            Arg::UnixTime(v) => write!(f, "UnixTime({})", v),
            Arg::DateTime(v) => write!(f, "DateTime({})", date::format(v)),
            Arg::Object(v) => write!(f, "Object({})", v.type_name()),
            Arg::Array(v) => f.debug_tuple("Array").field(v).finish(),
            Arg::Cell(v) => f.debug_tuple("Cell").field(v).finish(),
        }
    }
}

macro_rules! arg_from {
    ($native:ty, $variant:ident) => {
        impl From<$native> for Arg {
            fn from(v: $native) -> Self {
                Arg::$variant(v)
            }
        }
    };
}

arg_from!(i32, Int);
arg_from!(u32, UInt);
arg_from!(ErrorCode, Error);
arg_from!(bool, Bool);
arg_from!(f64, Double);
arg_from!(String, Str);
arg_from!(Vec<u16>, Wide);
arg_from!(Bytes, Bytes);
arg_from!(NaiveDateTime, DateTime);
arg_from!(ObjectRef, Object);
arg_from!(TypedArray, Array);
arg_from!(Cell, Cell);

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Str(v.to_string())
    }
}

impl From<&ObjectRef> for Arg {
    fn from(v: &ObjectRef) -> Self {
        Arg::Object(v.clone())
    }
}

impl From<Option<ObjectRef>> for Arg {
    fn from(v: Option<ObjectRef>) -> Self {
        v.map_or(Arg::Null, Arg::Object)
    }
}

impl From<SystemTime> for Arg {
    fn from(v: SystemTime) -> Self {
        let seconds = match v.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_secs() as i64,
            Err(before) => -(before.duration().as_secs() as i64),
        };
        Arg::UnixTime(seconds)
    }
}

fn decode_wide(units: &[u16]) -> Result<String, String> {
    String::from_utf16(units).map_err(|_| "wide string is not valid UTF-16".to_string())
}

fn unix_date(seconds: i64) -> Result<NaiveDateTime, String> {
    date::from_unix(seconds).ok_or_else(|| format!("unix time {} is out of range", seconds))
}

/// One segment with its arguments bound.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundSegment {
    pub kind: SegmentKind,
    /// `None` addresses the default member.
    pub name: Option<String>,
    pub args: Vec<Cell>,
    pub terminal: bool,
}

impl BoundSegment {
    /// The member name as shown in diagnostics; the default member shows
    /// its argument list.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for BoundSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, ".{}", name)?;
        }
        if self.kind != SegmentKind::Property {
            f.write_str("(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// A member path with every placeholder replaced by its cell.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundPath {
    pub segments: Vec<BoundSegment>,
    pub value: Option<Cell>,
}

impl BoundPath {
    /// The resolved path text through segment `upto` (inclusive).
    pub fn render(&self, upto: usize) -> String {
        self.segments
            .iter()
            .take(upto.saturating_add(1))
            .map(|segment| segment.to_string())
            .collect()
    }
}

impl fmt::Display for BoundPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(self.segments.len()))?;
        if let Some(value) = &self.value {
            write!(f, " = {}", value)?;
        }
        Ok(())
    }
}

fn read(placeholder: Placeholder, arg: &Arg) -> Result<Cell, String> {
    let mismatch = || format!("expected {}, got {}", expected_kind(placeholder), arg.kind());
    let cell = match (placeholder, arg) {
        (Placeholder::Int, Arg::Int(v)) => Cell::I32(*v),
        (Placeholder::UInt, Arg::UInt(v)) => Cell::U32(*v),
        (Placeholder::ErrorCode, Arg::Error(v)) => Cell::Error(*v),
        (Placeholder::Bool, Arg::Bool(v)) => Cell::Bool(*v),
        (Placeholder::Double, Arg::Double(v)) => Cell::Double(*v),
        (Placeholder::Generic, arg) => arg.clone().into_cell()?,
        (Placeholder::Blob, Arg::Bytes(v)) => Cell::Blob(v.clone()),
        (Placeholder::Narrow, Arg::Str(v)) => Cell::String(v.clone()),
        (Placeholder::Wide, Arg::Wide(v)) => Cell::String(decode_wide(v)?),
        (Placeholder::Object, Arg::Object(v)) => Cell::Object(v.clone()),
        (Placeholder::NullableObject, Arg::Object(v)) => Cell::Object(v.clone()),
        (Placeholder::NullableObject, Arg::Null) => Cell::Empty,
        (Placeholder::UnixTime, Arg::UnixTime(v)) => Cell::Date(unix_date(*v)?),
        (Placeholder::DateTime, Arg::DateTime(v)) => Cell::Date(*v),
        (Placeholder::OleDate, Arg::Double(v)) => match date::from_ole(*v) {
            Some(d) => Cell::Date(d),
            None => return Err(format!("automation date {} is out of range", v)),
        },
        (Placeholder::Array, Arg::Array(v)) => Cell::Array(v.clone()),
        (Placeholder::Name, Arg::Object(v)) => match v.member_name() {
            Some(name) => Cell::String(name),
            None => {
                return Err(format!(
                    "{} object does not supply a member name",
                    v.type_name()
                ))
            }
        },
        _ => return Err(mismatch()),
    };
    Ok(cell)
}

fn expected_kind(placeholder: Placeholder) -> &'static str {
    match placeholder {
        Placeholder::Int => "int32",
        Placeholder::UInt => "uint32",
        Placeholder::ErrorCode => "error code",
        Placeholder::Bool => "boolean",
        Placeholder::Double => "double",
        Placeholder::Generic => "any value",
        Placeholder::Blob => "binary",
        Placeholder::Narrow | Placeholder::Text => "narrow string",
        Placeholder::Wide => "wide string",
        Placeholder::Object => "object",
        Placeholder::NullableObject => "object or null",
        Placeholder::UnixTime => "unix time",
        Placeholder::DateTime => "date",
        Placeholder::OleDate => "automation date (double)",
        Placeholder::Array => "array",
        Placeholder::Missing => "nothing",
        Placeholder::Name => "object naming a member",
    }
}

/// Bind the caller's arguments to a parsed path.
///
/// # Errors
///
/// `Error::Arity` when the argument count differs from the number of
/// argument-reading placeholders, `Error::Marshal` when an argument does not
/// have the shape its placeholder reads.
pub fn marshal(path: &ParsedPath, args: &[Arg], mode: MarshalMode) -> Result<BoundPath, Error> {
    let expected = path.expected_arguments();
    if args.len() != expected {
        return Err(Error::Arity {
            expected,
            supplied: args.len(),
        });
    }

    let mut supplied = args.iter().enumerate();
    let mut buffer = Vec::with_capacity(path.placeholders.len());
    for &placeholder in &path.placeholders {
        let placeholder = placeholder.resolve_text(mode);
        if !placeholder.consumes_argument() {
            buffer.push(Cell::Error(ErrorCode::PARAM_NOT_FOUND));
            continue;
        }
        let (position, arg) = supplied.next().ok_or(Error::Arity {
            expected,
            supplied: args.len(),
        })?;
        let cell = read(placeholder, arg).map_err(|message| Error::Marshal {
            index: position + 1,
            identifier: placeholder.identifier(),
            message,
        })?;
        buffer.push(cell);
    }

    let mut take = |slot: &Slot| -> Cell {
        match slot {
            Slot::Placeholder { index, .. } => buffer
                .get_mut(*index)
                .map(std::mem::take)
                .unwrap_or_default(),
            Slot::Literal(cell) => cell.clone(),
        }
    };

    let mut segments = Vec::with_capacity(path.segments.len());
    for segment in &path.segments {
        let name = match &segment.name {
            MemberName::Named(name) => Some(name.clone()),
            MemberName::Indirect { index } => {
                take(&Slot::Placeholder {
                    id: Placeholder::Name,
                    index: *index,
                })
                .as_str()
                .map(str::to_string)
            }
            MemberName::Default => None,
        };
        let args = segment.args.iter().map(&mut take).collect();
        segments.push(BoundSegment {
            kind: segment.kind,
            name,
            args,
            terminal: segment.terminal,
        });
    }
    let value = path.value.as_ref().map(&mut take);

    Ok(BoundPath { segments, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::parse;
    use chrono::NaiveDate;

    fn bind(path: &str, args: &[Arg]) -> Result<BoundPath, Error> {
        marshal(&parse(path).unwrap(), args, MarshalMode::Narrow)
    }

    #[test]
    fn arguments_flow_across_segments() {
        let bound = bind(
            ".Filters(%d).Properties(%S).Value = %d",
            &[Arg::Int(1), Arg::wide("Quality"), Arg::Int(50)],
        )
        .unwrap();
        assert_eq!(bound.segments[0].args, vec![Cell::I32(1)]);
        assert_eq!(bound.segments[1].args, vec![Cell::from("Quality")]);
        assert!(bound.segments[2].args.is_empty());
        assert_eq!(bound.value, Some(Cell::I32(50)));
        assert_eq!(bound.render(1), ".Filters(1).Properties(\"Quality\")");
        assert_eq!(
            bound.to_string(),
            ".Filters(1).Properties(\"Quality\").Value = 50"
        );
    }

    #[test]
    fn arity_is_checked() {
        let err = bind(".Item(%d, %d)", &[Arg::Int(1)]).unwrap_err();
        assert!(matches!(
            err,
            Error::Arity {
                expected: 2,
                supplied: 1
            }
        ));
        let err = bind(".Width", &[Arg::Int(1)]).unwrap_err();
        assert!(matches!(
            err,
            Error::Arity {
                expected: 0,
                supplied: 1
            }
        ));
    }

    #[test]
    fn wrong_shape_names_the_argument() {
        let err = bind(".Item(%d, %s)", &[Arg::Int(1), Arg::Int(2)]).unwrap_err();
        match err {
            Error::Marshal {
                index,
                identifier,
                message,
            } => {
                assert_eq!(index, 2);
                assert_eq!(identifier, 's');
                assert!(message.contains("narrow string"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_consumes_nothing() {
        let bound = bind(".Open(%s, %m, %b)", &["a.jpg".into(), true.into()]).unwrap();
        assert_eq!(
            bound.segments[0].args,
            vec![
                Cell::from("a.jpg"),
                Cell::Error(ErrorCode::PARAM_NOT_FOUND),
                Cell::Bool(true)
            ]
        );
    }

    #[test]
    fn text_follows_mode() {
        let path = parse(".Name = %T").unwrap();
        assert!(marshal(&path, &["x".into()], MarshalMode::Narrow).is_ok());
        assert!(marshal(&path, &["x".into()], MarshalMode::Wide).is_err());
        let bound = marshal(&path, &[Arg::wide("x")], MarshalMode::Wide).unwrap();
        assert_eq!(bound.value, Some(Cell::from("x")));
    }

    #[test]
    fn dates() {
        let bound = bind(
            ".At(%t, %D, %W)",
            &[
                Arg::unix_time(0),
                Arg::Double(2.0),
                NaiveDate::from_ymd_opt(2020, 5, 17)
                    .unwrap()
                    .and_hms_opt(8, 30, 0)
                    .unwrap()
                    .into(),
            ],
        )
        .unwrap();
        let expected = |y, m, d| {
            Cell::Date(
                NaiveDate::from_ymd_opt(y, m, d)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            )
        };
        assert_eq!(bound.segments[0].args[0], expected(1970, 1, 1));
        assert_eq!(bound.segments[0].args[1], expected(1900, 1, 1));
        assert_eq!(bound.segments[0].args[2].to_string(), "#2020-05-17 08:30:00#");
    }

    #[test]
    fn nullable_object() {
        let bound = bind(".Parent = %O", &[Arg::Null]).unwrap();
        assert_eq!(bound.value, Some(Cell::Empty));
        assert!(bind(".Parent = %o", &[Arg::Null]).is_err());
    }

    #[test]
    fn generic_accepts_anything() {
        let bound = bind(".Tag = %v", &[Arg::Cell(Cell::U32(7))]).unwrap();
        assert_eq!(bound.value, Some(Cell::U32(7)));
        let bound = bind(".Tag = %v", &["seven".into()]).unwrap();
        assert_eq!(bound.value, Some(Cell::from("seven")));
    }

    #[test]
    fn literals_bind_without_arguments() {
        let bound = bind(".Item(2)(\"x\")", &[]).unwrap();
        assert_eq!(bound.segments[0].args, vec![Cell::I32(2)]);
        assert_eq!(bound.segments[1].name, None);
        assert_eq!(bound.segments[1].args, vec![Cell::from("x")]);
        assert_eq!(bound.render(1), ".Item(2)(\"x\")");
    }

    #[test]
    fn invalid_wide_string() {
        let err = bind(".Name = %S", &[Arg::Wide(vec![0xD800])]).unwrap_err();
        assert!(matches!(err, Error::Marshal { identifier: 'S', .. }));
    }

    #[test]
    fn system_time_before_epoch() {
        let t = UNIX_EPOCH - std::time::Duration::from_secs(60);
        assert!(matches!(Arg::from(t), Arg::UnixTime(-60)));
    }
}
