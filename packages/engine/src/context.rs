//! Entry points.
//!
//! A [`Context`] is the caller-owned error context: each entry point returns
//! its `Error` directly and also leaves the corresponding [`Exception`] in
//! the context (and in the thread-local slot) while recording is enabled.

use latebind_core::{Cell, CellType, FromCell, ObjectRef};

use crate::config;
use crate::enumerator::Enumerator;
use crate::error::{Error, ParseError};
use crate::exception::{self, Exception};
use crate::format::{self, Placeholder, SegmentKind};
use crate::invoke::{self, Failure, InvokeKind, Output};
use crate::marshal::{self, Arg, BoundPath, BoundSegment};

/// Caller-owned error context threaded through the entry points.
///
/// # Example
///
/// ```rust
/// use latebind::{args, Context};
/// use latebind_expando::Expando;
///
/// let image = Expando::new("ImageFile").with_property("Width", 640).into_object();
///
/// let mut ctx = Context::new();
/// let width: i32 = ctx.get(&image, ".Width", &[]).unwrap();
/// assert_eq!(width, 640);
///
/// assert!(ctx.put_value(&image, ".Width = %d", &args![480]).is_ok());
/// assert!(ctx.call_method(&image, ".Rotate(%d)", &args![90]).is_err());
/// assert_eq!(ctx.last_exception().unwrap().member, "Rotate");
/// ```
#[derive(Debug, Default)]
pub struct Context {
    last: Option<Exception>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// The exception left by the latest failed call on this context.
    pub fn last_exception(&self) -> Option<&Exception> {
        self.last.as_ref()
    }

    pub fn take_exception(&mut self) -> Option<Exception> {
        self.last.take()
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    fn fail(&mut self, function: &'static str, failure: Failure) -> Error {
        let Failure {
            error,
            member,
            complete_member,
        } = failure;
        let exception =
            Exception::from_error(function, error.stage(), &error, member, complete_member);
        if exception::report(&exception) {
            self.last = Some(exception);
        }
        error
    }

    /// Parse, bind and run a path.
    fn run_path(
        &mut self,
        function: &'static str,
        obj: &ObjectRef,
        path: &str,
        args: &[Arg],
        kind: InvokeKind,
        output: Output,
    ) -> Result<Cell, Error> {
        let local = |error: Error| Failure {
            error,
            member: String::new(),
            complete_member: path.to_string(),
        };

        let bound = format::parse(path)
            .map_err(Error::from)
            .and_then(|parsed| marshal::marshal(&parsed, args, config::marshal_mode()));
        let bound = match bound {
            Ok(bound) => bound,
            Err(error) => return Err(self.fail(function, local(error))),
        };

        invoke::run(obj, bound, kind, output).map_err(|failure| self.fail(function, failure))
    }

    /// Call a method, discarding its result.
    pub fn call_method(&mut self, obj: &ObjectRef, path: &str, args: &[Arg]) -> Result<(), Error> {
        self.run_path("call_method", obj, path, args, InvokeKind::Method, Output::Discard)
            .map(drop)
    }

    /// Assign a value; the path ends in ` = %x`.
    pub fn put_value(&mut self, obj: &ObjectRef, path: &str, args: &[Arg]) -> Result<(), Error> {
        self.run_path(
            "put_value",
            obj,
            path,
            args,
            InvokeKind::PropertyPut,
            Output::Discard,
        )
        .map(drop)
    }

    /// Assign a reference; the path ends in ` = %o`.
    pub fn put_ref(&mut self, obj: &ObjectRef, path: &str, args: &[Arg]) -> Result<(), Error> {
        self.run_path(
            "put_ref",
            obj,
            path,
            args,
            InvokeKind::PropertyPutRef,
            Output::Discard,
        )
        .map(drop)
    }

    /// Read a value, converted as the output identifier asks.
    ///
    /// ```rust
    /// # use latebind::Context;
    /// # use latebind_core::Cell;
    /// # use latebind_expando::Expando;
    /// let item = Expando::new("Item").with_property("Price", "12.5").into_object();
    /// let price = Context::new().get_value("%f", &item, ".Price", &[]).unwrap();
    /// assert_eq!(price, Cell::Double(12.5));
    /// ```
    pub fn get_value(
        &mut self,
        output: &str,
        obj: &ObjectRef,
        path: &str,
        args: &[Arg],
    ) -> Result<Cell, Error> {
        let placeholder = match Placeholder::parse_output(output) {
            Ok(placeholder) => placeholder,
            Err(error) => {
                let failure = Failure {
                    error: error.into(),
                    member: String::new(),
                    complete_member: path.to_string(),
                };
                return Err(self.fail("get_value", failure));
            }
        };
        self.run_path(
            "get_value",
            obj,
            path,
            args,
            InvokeKind::PropertyGet,
            Output::Placeholder(placeholder),
        )
    }

    /// Read a value straight into a native type.
    pub fn get<T: FromCell>(&mut self, obj: &ObjectRef, path: &str, args: &[Arg]) -> Result<T, Error> {
        let cell = self.run_path(
            "get_value",
            obj,
            path,
            args,
            InvokeKind::PropertyGet,
            Output::Type(T::TYPE),
        )?;
        T::from_cell(cell).map_err(|source| Error::Coerce {
            member: path.to_string(),
            target: T::TYPE,
            source,
        })
    }

    /// Run a path with an explicit invocation kind and result type.
    ///
    /// A result type of `CellType::Empty` discards the result.
    pub fn invoke(
        &mut self,
        kind: InvokeKind,
        return_type: CellType,
        obj: &ObjectRef,
        path: &str,
        args: &[Arg],
    ) -> Result<Cell, Error> {
        let output = match return_type {
            CellType::Empty => Output::Discard,
            other => Output::Type(other),
        };
        self.run_path("invoke", obj, path, args, kind, output)
    }

    /// Invoke one member by name with ready-made arguments.
    ///
    /// For put kinds the last argument is the assigned value.
    pub fn invoke_array(
        &mut self,
        kind: InvokeKind,
        obj: &ObjectRef,
        member: &str,
        mut args: Vec<Cell>,
    ) -> Result<Cell, Error> {
        let value = if kind.is_put() { args.pop() } else { None };
        let segment = BoundSegment {
            kind: if args.is_empty() {
                SegmentKind::Property
            } else {
                SegmentKind::Call
            },
            name: Some(member.to_string()),
            args,
            terminal: true,
        };
        let path = BoundPath {
            segments: vec![segment],
            value,
        };
        invoke::run(obj, path, kind, Output::Type(CellType::Any))
            .map_err(|failure| self.fail("invoke_array", failure))
    }

    /// Start enumerating the collection a path resolves to.
    ///
    /// An empty path enumerates `obj` itself.
    pub fn enum_begin(
        &mut self,
        obj: &ObjectRef,
        path: &str,
        args: &[Arg],
    ) -> Result<Enumerator, Error> {
        let trimmed = path.trim();
        let collection = if trimmed.is_empty() || trimmed == "." {
            obj.clone()
        } else {
            let cell = self.run_path(
                "enum_begin",
                obj,
                path,
                args,
                InvokeKind::PropertyGet,
                Output::Type(CellType::Object),
            )?;
            match cell.into_object() {
                Some(collection) => collection,
                None => {
                    let failure = Failure {
                        error: Error::NotAnObject {
                            member: path.to_string(),
                            found: CellType::Empty,
                        },
                        member: String::new(),
                        complete_member: path.to_string(),
                    };
                    return Err(self.fail("enum_begin", failure));
                }
            }
        };

        Enumerator::of(&collection)
            .map(|enumerator| enumerator.with_path(path))
            .map_err(|error| {
                let failure = Failure {
                    error,
                    member: "_NewEnum".to_string(),
                    complete_member: path.to_string(),
                };
                self.fail("enum_begin", failure)
            })
    }

    /// Assign `Name=Value` pairs separated by `;`.
    ///
    /// Each value is put as a string; the object converts it. Stops at the
    /// first failure and returns how many properties were set.
    pub fn parse_properties(&mut self, obj: &ObjectRef, properties: &str) -> Result<usize, Error> {
        let mut count = 0;
        let mut offset = 0;
        for pair in properties.split(';') {
            let position = offset;
            offset += pair.len() + 1;
            if pair.trim().is_empty() {
                continue;
            }

            let Some((name, value)) = pair.split_once('=') else {
                let failure = Failure {
                    error: Error::Parse(ParseError::Unexpected {
                        expected: "'='",
                        found: format!("'{}'", pair.trim()),
                        position,
                    }),
                    member: String::new(),
                    complete_member: properties.to_string(),
                };
                return Err(self.fail("parse_properties", failure));
            };

            let path = format!(".{} = %s", name.trim());
            self.run_path(
                "parse_properties",
                obj,
                &path,
                &[Arg::Str(value.trim().to_string())],
                InvokeKind::PropertyPut,
                Output::Discard,
            )?;
            count += 1;
        }
        Ok(count)
    }

    /// Create an object through the registered substrate.
    pub fn create_object(&mut self, class: &str) -> Result<ObjectRef, Error> {
        let created = config::substrate()
            .and_then(|substrate| substrate.create_object(class).map_err(Error::Substrate));
        created.map_err(|error| {
            let failure = Failure {
                error,
                member: class.to_string(),
                complete_member: class.to_string(),
            };
            self.fail("create_object", failure)
        })
    }

    /// Bind to an object through the registered substrate.
    pub fn get_object(&mut self, file: Option<&str>, class: Option<&str>) -> Result<ObjectRef, Error> {
        let bound = config::substrate()
            .and_then(|substrate| substrate.get_object(file, class).map_err(Error::Substrate));
        bound.map_err(|error| {
            let name = file.or(class).unwrap_or_default().to_string();
            let failure = Failure {
                error,
                member: name.clone(),
                complete_member: name,
            };
            self.fail("get_object", failure)
        })
    }
}
