//! latebind core: values and the late-bound object seam
//!
//! This layer holds everything an object model and the invocation engine
//! agree on:
//! - `Cell`: the tagged value passed into and returned from members
//! - `CellType`: the tag set, used as coercion target and output type
//! - `Dispatch`: name-to-member resolution plus get/put/call on one object
//! - `Fault`: the diagnostic payload an object returns when it fails
//! - `ErrorCode`: the numeric failure code every error maps onto
//!
//! Object models implement `Dispatch`; the engine never looks past it.
//!
//! # Example
//!
//! ```rust
//! use latebind_core::{Cell, CellType};
//!
//! let width = Cell::from("640").coerce(CellType::I32).unwrap();
//! assert_eq!(width, Cell::I32(640));
//! ```

pub use bytes::Bytes;

mod code;
mod coerce;
pub mod date;
mod fault;
mod traits;
mod value;

pub use code::ErrorCode;
pub use coerce::CoerceError;
pub use fault::Fault;
pub use traits::{Dispatch, Enumerate, IterEnumerator, MemberId, ObjectRef};
pub use value::{Cell, CellType, FromCell, TypedArray};
