//! Core traits: Dispatch, Enumerate.

use std::rc::Rc;

use crate::{Cell, Fault};

/// Identifies a member within one object.
///
/// Ids are only meaningful to the object that handed them out; the same
/// name may resolve to different ids on different instances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub i32);

impl MemberId {
    /// The default member (`obj(args)` with no name).
    pub const VALUE: MemberId = MemberId(0);
    /// The member producing an enumerator.
    pub const NEW_ENUM: MemberId = MemberId(-4);
}

/// A shared reference to a late-bound object.
///
/// Cloning acquires a reference, dropping releases it.
pub type ObjectRef = Rc<dyn Dispatch>;

/// A late-bound object: members are discovered by name at call time.
///
/// Objects are shared, so every operation takes `&self`; implementations
/// that mutate state use interior mutability.
///
/// # Contract
///
/// - `resolve` is per instance. An unknown name is a `Fault` with
///   `ErrorCode::UNKNOWN_NAME`.
/// - `get` serves property reads and methods used as getters (a call whose
///   result is wanted). It is the operation used for every non-terminal step
///   of a member path.
/// - `call` is a method invocation whose result may be ignored.
/// - `put` assigns a value, `put_ref` assigns a reference. Objects that do
///   not distinguish the two only implement `put`.
pub trait Dispatch {
    /// A short name for diagnostics.
    fn type_name(&self) -> &str {
        "Object"
    }

    /// Look up a member by name.
    fn resolve(&self, name: &str) -> Result<MemberId, Fault>;

    /// Read a property (or run a method for its result).
    fn get(&self, member: MemberId, args: &[Cell]) -> Result<Cell, Fault>;

    /// Assign a property value.
    fn put(&self, member: MemberId, args: &[Cell], value: Cell) -> Result<(), Fault>;

    /// Assign a property by reference.
    fn put_ref(&self, member: MemberId, args: &[Cell], value: Cell) -> Result<(), Fault> {
        self.put(member, args, value)
    }

    /// Invoke a method.
    fn call(&self, member: MemberId, args: &[Cell]) -> Result<Cell, Fault>;

    /// Produce a cursor over this object's elements.
    fn enumerate(&self) -> Result<Box<dyn Enumerate>, Fault> {
        Err(Fault::member_not_found())
    }

    /// A member name this object stands for, used by name indirection.
    fn member_name(&self) -> Option<String> {
        None
    }
}

/// A forward-only cursor over a collection.
pub trait Enumerate {
    /// The next element, or `None` once the sequence is exhausted.
    fn next(&mut self) -> Result<Option<Cell>, Fault>;
}

/// Any iterator of cells is an infallible cursor.
pub struct IterEnumerator<I>(pub I);

impl<I: Iterator<Item = Cell>> Enumerate for IterEnumerator<I> {
    fn next(&mut self) -> Result<Option<Cell>, Fault> {
        Ok(self.0.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use std::cell::RefCell;

    /// A single-property object for testing the default methods.
    struct Counter {
        value: RefCell<i32>,
    }

    impl Dispatch for Counter {
        fn resolve(&self, name: &str) -> Result<MemberId, Fault> {
            match name {
                "Value" => Ok(MemberId(1)),
                _ => Err(Fault::unknown_name()),
            }
        }

        fn get(&self, _member: MemberId, _args: &[Cell]) -> Result<Cell, Fault> {
            Ok(Cell::I32(*self.value.borrow()))
        }

        fn put(&self, _member: MemberId, _args: &[Cell], value: Cell) -> Result<(), Fault> {
            match value {
                Cell::I32(v) => {
                    *self.value.borrow_mut() = v;
                    Ok(())
                }
                _ => Err(Fault::type_mismatch(1)),
            }
        }

        fn call(&self, _member: MemberId, _args: &[Cell]) -> Result<Cell, Fault> {
            Err(Fault::member_not_found())
        }
    }

    #[test]
    fn put_ref_defaults_to_put() {
        let obj: ObjectRef = Rc::new(Counter {
            value: RefCell::new(0),
        });
        let id = obj.resolve("Value").unwrap();
        obj.put_ref(id, &[], Cell::I32(9)).unwrap();
        assert_eq!(obj.get(id, &[]).unwrap(), Cell::I32(9));
        assert_eq!(obj.type_name(), "Object");
        assert_eq!(obj.member_name(), None);
    }

    #[test]
    fn enumerate_defaults_to_member_not_found() {
        let obj = Counter {
            value: RefCell::new(0),
        };
        let err = obj.enumerate().err().unwrap();
        assert_eq!(err.code, ErrorCode::MEMBER_NOT_FOUND);
    }

    #[test]
    fn iterator_cursor() {
        let mut cursor: Box<dyn Enumerate> =
            Box::new(IterEnumerator(vec![Cell::I32(1), Cell::I32(2)].into_iter()));
        assert_eq!(cursor.next().unwrap(), Some(Cell::I32(1)));
        assert_eq!(cursor.next().unwrap(), Some(Cell::I32(2)));
        assert_eq!(cursor.next().unwrap(), None);
    }
}
