//! latebind: printf-style member paths over late-bound objects
//!
//! Driving a late-bound object normally means resolving each member name,
//! packing arguments, invoking, and unpacking the result, once per step.
//! This crate collapses a whole chain into one call:
//!
//! ```rust
//! use latebind::{get_value, put_value};
//! use latebind_core::Cell;
//! use latebind_expando::Expando;
//!
//! let filter = Expando::new("Filter")
//!     .with_property("Quality", 75)
//!     .into_object();
//! let process = Expando::new("ImageProcess")
//!     .with_property("Filter", filter)
//!     .into_object();
//!
//! put_value!(&process, ".Filter.Quality = %d", 90).unwrap();
//! let quality = get_value!("%d", &process, ".Filter.Quality").unwrap();
//! assert_eq!(quality, Cell::I32(90));
//! ```
//!
//! # Layers
//!
//! - `format`: parses the member path and its `%x` placeholders
//! - `marshal`: binds native arguments ([`Arg`]) to the placeholders
//! - `invoke`: walks the chain and performs the terminal get/put/call
//! - `exception`: records failures for later inspection
//! - `enumerator`: forward-only iteration over collection objects
//! - `config`: process-wide settings and the object substrate
//!
//! Entry points live on [`Context`]. The free functions and macros of the
//! same names use a throwaway context and leave failures in the
//! thread-local [`last_exception`] slot.

mod config;
mod context;
mod enumerator;
mod error;
mod exception;
pub mod format;
pub mod invoke;
pub mod marshal;

pub use config::{
    initialize, is_initialized, marshal_mode, settings, uninitialize, ExceptionSettings,
    MarshalMode, Settings, Substrate,
};
pub use context::Context;
pub use enumerator::{Cells, Enumerator, Objects};
pub use error::{Error, ParseError};
pub use exception::{
    exception_options, format_exception, last_exception, reset_last_exception,
    set_exception_options, show_exception, toggle_exceptions, Exception, ExceptionCallback,
    ExceptionOptions,
};
pub use format::Placeholder;
pub use invoke::InvokeKind;
pub use marshal::Arg;

use latebind_core::{Cell, CellType, FromCell, ObjectRef};

pub fn call_method(obj: &ObjectRef, path: &str, args: &[Arg]) -> Result<(), Error> {
    Context::new().call_method(obj, path, args)
}

pub fn put_value(obj: &ObjectRef, path: &str, args: &[Arg]) -> Result<(), Error> {
    Context::new().put_value(obj, path, args)
}

pub fn put_ref(obj: &ObjectRef, path: &str, args: &[Arg]) -> Result<(), Error> {
    Context::new().put_ref(obj, path, args)
}

pub fn get_value(output: &str, obj: &ObjectRef, path: &str, args: &[Arg]) -> Result<Cell, Error> {
    Context::new().get_value(output, obj, path, args)
}

pub fn get<T: FromCell>(obj: &ObjectRef, path: &str, args: &[Arg]) -> Result<T, Error> {
    Context::new().get(obj, path, args)
}

pub fn invoke(
    kind: InvokeKind,
    return_type: CellType,
    obj: &ObjectRef,
    path: &str,
    args: &[Arg],
) -> Result<Cell, Error> {
    Context::new().invoke(kind, return_type, obj, path, args)
}

pub fn invoke_array(
    kind: InvokeKind,
    obj: &ObjectRef,
    member: &str,
    args: Vec<Cell>,
) -> Result<Cell, Error> {
    Context::new().invoke_array(kind, obj, member, args)
}

pub fn enum_begin(obj: &ObjectRef, path: &str, args: &[Arg]) -> Result<Enumerator, Error> {
    Context::new().enum_begin(obj, path, args)
}

pub fn parse_properties(obj: &ObjectRef, properties: &str) -> Result<usize, Error> {
    Context::new().parse_properties(obj, properties)
}

pub fn create_object(class: &str) -> Result<ObjectRef, Error> {
    Context::new().create_object(class)
}

pub fn get_object(file: Option<&str>, class: Option<&str>) -> Result<ObjectRef, Error> {
    Context::new().get_object(file, class)
}

/// Build an argument array, converting each item with `Arg::from`.
///
/// ```rust
/// use latebind::{args, Arg};
///
/// let list = args![1, "two", 3.0];
/// assert!(matches!(list[1], Arg::Str(_)));
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        [$($crate::Arg::from($arg)),*]
    };
}

/// `call_method!(obj, path, args...)`
#[macro_export]
macro_rules! call_method {
    ($obj:expr, $path:expr $(, $arg:expr)* $(,)?) => {
        $crate::call_method($obj, $path, &$crate::args![$($arg),*])
    };
}

/// `put_value!(obj, path, args...)`
#[macro_export]
macro_rules! put_value {
    ($obj:expr, $path:expr $(, $arg:expr)* $(,)?) => {
        $crate::put_value($obj, $path, &$crate::args![$($arg),*])
    };
}

/// `put_ref!(obj, path, args...)`
#[macro_export]
macro_rules! put_ref {
    ($obj:expr, $path:expr $(, $arg:expr)* $(,)?) => {
        $crate::put_ref($obj, $path, &$crate::args![$($arg),*])
    };
}

/// `get_value!(output, obj, path, args...)`
#[macro_export]
macro_rules! get_value {
    ($output:expr, $obj:expr, $path:expr $(, $arg:expr)* $(,)?) => {
        $crate::get_value($output, $obj, $path, &$crate::args![$($arg),*])
    };
}

/// `invoke!(kind, return_type, obj, path, args...)`
#[macro_export]
macro_rules! invoke {
    ($kind:expr, $return_type:expr, $obj:expr, $path:expr $(, $arg:expr)* $(,)?) => {
        $crate::invoke($kind, $return_type, $obj, $path, &$crate::args![$($arg),*])
    };
}

/// `enum_begin!(obj, path, args...)`
#[macro_export]
macro_rules! enum_begin {
    ($obj:expr, $path:expr $(, $arg:expr)* $(,)?) => {
        $crate::enum_begin($obj, $path, &$crate::args![$($arg),*])
    };
}

#[cfg(test)]
pub(crate) static TEST_GUARD: std::sync::Mutex<()> = std::sync::Mutex::new(());
