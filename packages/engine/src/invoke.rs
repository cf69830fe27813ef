//! Chain resolution and invocation.
//!
//! Walks a bound path from a starting object. Every non-terminal segment is
//! a `get` whose result must be an object; that object becomes the target of
//! the next segment and the previous target is released. The terminal
//! segment performs the requested get, put or call and its result is
//! coerced to the requested output.

use latebind_core::{Cell, CellType, MemberId, ObjectRef};

use crate::error::{Error, ParseError};
use crate::format::Placeholder;
use crate::marshal::{BoundPath, BoundSegment};

/// What the terminal segment does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvokeKind {
    Method,
    PropertyGet,
    PropertyPut,
    PropertyPutRef,
}

impl InvokeKind {
    pub fn is_put(self) -> bool {
        matches!(self, InvokeKind::PropertyPut | InvokeKind::PropertyPutRef)
    }
}

/// What to do with the terminal result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    /// Drop it.
    Discard,
    /// Coerce to a cell type.
    Type(CellType),
    /// Coerce the way an output identifier asks.
    Placeholder(Placeholder),
}

/// A failed chain, with where it failed.
#[derive(Debug)]
pub struct Failure {
    pub error: Error,
    /// The failing member, without arguments.
    pub member: String,
    /// The path through the failing segment.
    pub complete_member: String,
}

impl Failure {
    fn at(path: &BoundPath, index: usize, error: Error) -> Self {
        let member = path
            .segments
            .get(index)
            .map(BoundSegment::label)
            .unwrap_or_default();
        Failure {
            error,
            member,
            complete_member: path.render(index),
        }
    }
}

fn member_id(target: &ObjectRef, segment: &BoundSegment) -> Result<MemberId, Error> {
    match &segment.name {
        Some(name) => target.resolve(name).map_err(|fault| Error::UnknownMember {
            member: name.clone(),
            fault,
        }),
        None => Ok(MemberId::VALUE),
    }
}

fn step(target: &ObjectRef, segment: &BoundSegment) -> Result<ObjectRef, Error> {
    let id = member_id(target, segment)?;
    log::debug!("get {} on {}", segment, target.type_name());
    let result = target.get(id, &segment.args).map_err(|fault| Error::Remote {
        member: segment.label(),
        fault,
    })?;
    match result {
        Cell::Object(next) => Ok(next),
        other => Err(Error::NotAnObject {
            member: segment.label(),
            found: other.cell_type(),
        }),
    }
}

fn terminal(
    target: &ObjectRef,
    segment: &BoundSegment,
    value: Option<Cell>,
    kind: InvokeKind,
) -> Result<Cell, Error> {
    let id = member_id(target, segment)?;
    let remote = |fault| Error::Remote {
        member: segment.label(),
        fault,
    };
    let args = segment.args.as_slice();
    match kind {
        InvokeKind::Method => {
            log::debug!("call {} on {}", segment, target.type_name());
            target.call(id, args).map_err(remote)
        }
        InvokeKind::PropertyGet => {
            log::debug!("get {} on {}", segment, target.type_name());
            target.get(id, args).map_err(remote)
        }
        InvokeKind::PropertyPut | InvokeKind::PropertyPutRef => {
            let value = value.ok_or(Error::Parse(ParseError::MissingValue))?;
            log::debug!("put {} = {} on {}", segment, value, target.type_name());
            if kind == InvokeKind::PropertyPutRef {
                target.put_ref(id, args, value).map_err(remote)?;
            } else {
                target.put(id, args, value).map_err(remote)?;
            }
            Ok(Cell::Empty)
        }
    }
}

fn coerce(result: Cell, output: Output, segment: &BoundSegment) -> Result<Cell, Error> {
    let coerced = match output {
        Output::Discard => return Ok(Cell::Empty),
        Output::Type(target) => result.coerce(target).map_err(|source| (target, source)),
        Output::Placeholder(placeholder) => placeholder.coerce_output(result).map_err(|source| {
            (
                placeholder.output_type().unwrap_or(CellType::Any),
                source,
            )
        }),
    };
    coerced.map_err(|(target, source)| Error::Coerce {
        member: segment.label(),
        target,
        source,
    })
}

/// Run a bound path against `start`.
///
/// The caller keeps its own reference to `start`; every object obtained
/// along the way is released before this returns, on success and on
/// failure alike.
pub fn run(
    start: &ObjectRef,
    mut path: BoundPath,
    kind: InvokeKind,
    output: Output,
) -> Result<Cell, Failure> {
    let last = match path.segments.len().checked_sub(1) {
        Some(last) => last,
        None => return Err(Failure::at(&path, 0, Error::Parse(ParseError::Empty))),
    };
    if kind.is_put() != path.value.is_some() {
        let error = if kind.is_put() {
            ParseError::MissingValue
        } else {
            ParseError::UnexpectedValue
        };
        return Err(Failure::at(&path, last, Error::Parse(error)));
    }

    let mut current = start.clone();
    for index in 0..last {
        current = match step(&current, &path.segments[index]) {
            Ok(next) => next,
            Err(error) => return Err(Failure::at(&path, index, error)),
        };
    }

    let value = path.value.take();
    let segment = &path.segments[last];
    terminal(&current, segment, value, kind)
        .and_then(|result| coerce(result, output, segment))
        .map_err(|error| Failure::at(&path, last, error))
}
