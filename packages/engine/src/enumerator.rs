//! Forward-only enumeration over a collection object.

use latebind_core::{Cell, CellType, CoerceError, Enumerate, ObjectRef};

use crate::error::Error;
use crate::exception::{self, Exception};

/// A cursor over the elements of an enumerable object.
///
/// Reaching the end is not an error, and advancing after the end keeps
/// reporting the end. An enumerator outlives the [`Context`] call that
/// created it, so failures while advancing are kept on the enumerator
/// itself (and in the thread-local slot while recording is enabled).
///
/// [`Context`]: crate::Context
pub struct Enumerator {
    cursor: Box<dyn Enumerate>,
    done: bool,
    path: String,
    last: Option<Exception>,
}

impl Enumerator {
    pub fn new(cursor: Box<dyn Enumerate>) -> Self {
        Enumerator {
            cursor,
            done: false,
            path: String::new(),
            last: None,
        }
    }

    /// Ask `collection` for a cursor.
    pub fn of(collection: &ObjectRef) -> Result<Self, Error> {
        collection
            .enumerate()
            .map(Enumerator::new)
            .map_err(|fault| Error::Remote {
                member: "_NewEnum".to_string(),
                fault,
            })
    }

    /// Name the path the collection was reached through; failures report it
    /// as their complete member.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The exception left by the latest failed advance.
    pub fn last_exception(&self) -> Option<&Exception> {
        self.last.as_ref()
    }

    fn fail(&mut self, function: &'static str, error: Error) -> Error {
        let exception = Exception::from_error(
            function,
            "enumerate",
            &error,
            "Next".to_string(),
            self.path.clone(),
        );
        if exception::report(&exception) {
            self.last = Some(exception);
        }
        error
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The next element as it is, `None` at the end.
    pub fn next_cell(&mut self) -> Result<Option<Cell>, Error> {
        if self.done {
            return Ok(None);
        }
        match self.cursor.next() {
            Ok(Some(cell)) => Ok(Some(cell)),
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(fault) => Err(self.fail(
                "next_cell",
                Error::Remote {
                    member: "Next".to_string(),
                    fault,
                },
            )),
        }
    }

    /// The next element as an object, `None` at the end.
    ///
    /// # Errors
    ///
    /// `Error::Coerce` when the element is not an object. The cursor has
    /// still moved past it.
    pub fn next_object(&mut self) -> Result<Option<ObjectRef>, Error> {
        match self.next_cell()? {
            None => Ok(None),
            Some(Cell::Object(obj)) => Ok(Some(obj)),
            Some(other) => Err(self.fail(
                "next_object",
                Error::Coerce {
                    member: "Next".to_string(),
                    target: CellType::Object,
                    source: CoerceError::Unsupported {
                        from: other.cell_type(),
                        to: CellType::Object,
                    },
                },
            )),
        }
    }

    /// Iterate elements as objects.
    ///
    /// The iterator ends after the first error it yields.
    pub fn objects(self) -> Objects {
        Objects {
            inner: self,
            failed: false,
        }
    }

    /// Iterate elements as raw cells.
    pub fn cells(self) -> Cells {
        Cells {
            inner: self,
            failed: false,
        }
    }
}

/// Objects of an [`Enumerator`].
pub struct Objects {
    inner: Enumerator,
    failed: bool,
}

impl Iterator for Objects {
    type Item = Result<ObjectRef, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.inner.next_object().transpose();
        self.failed = matches!(item, Some(Err(_)));
        item
    }
}

/// Cells of an [`Enumerator`].
pub struct Cells {
    inner: Enumerator,
    failed: bool,
}

impl Iterator for Cells {
    type Item = Result<Cell, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.inner.next_cell().transpose();
        self.failed = matches!(item, Some(Err(_)));
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latebind_core::{Dispatch, ErrorCode, Fault, IterEnumerator, MemberId};
    use std::rc::Rc;

    /// Replays a fixed script of cursor results.
    struct Scripted(std::vec::IntoIter<Result<Option<Cell>, Fault>>);

    impl Enumerate for Scripted {
        fn next(&mut self) -> Result<Option<Cell>, Fault> {
            self.0.next().unwrap_or(Ok(None))
        }
    }

    struct Plain;

    impl Dispatch for Plain {
        fn resolve(&self, _name: &str) -> Result<MemberId, Fault> {
            Err(Fault::unknown_name())
        }
        fn get(&self, _member: MemberId, _args: &[Cell]) -> Result<Cell, Fault> {
            Err(Fault::member_not_found())
        }
        fn put(&self, _member: MemberId, _args: &[Cell], _value: Cell) -> Result<(), Fault> {
            Err(Fault::member_not_found())
        }
        fn call(&self, _member: MemberId, _args: &[Cell]) -> Result<Cell, Fault> {
            Err(Fault::member_not_found())
        }
    }

    fn over(cells: Vec<Cell>) -> Enumerator {
        Enumerator::new(Box::new(IterEnumerator(cells.into_iter())))
    }

    #[test]
    fn end_is_idempotent() {
        let mut e = over(vec![Cell::I32(1)]);
        assert_eq!(e.next_cell().unwrap(), Some(Cell::I32(1)));
        assert_eq!(e.next_cell().unwrap(), None);
        assert!(e.is_done());
        assert_eq!(e.next_cell().unwrap(), None);
        assert!(e.next_object().unwrap().is_none());
    }

    #[test]
    fn non_object_element_is_a_type_error() {
        let obj: ObjectRef = Rc::new(Plain);
        let mut e = over(vec![Cell::I32(5), Cell::Object(obj)]);
        let err = e.next_object().err().unwrap();
        assert_eq!(err.code(), ErrorCode::TYPE_MISMATCH);
        assert!(e.next_object().unwrap().is_some());
    }

    #[test]
    fn objects_fuse_after_error() {
        let obj: ObjectRef = Rc::new(Plain);
        let items: Vec<_> = over(vec![Cell::Object(obj), Cell::I32(5), Cell::I32(6)])
            .objects()
            .collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[test]
    fn cursor_faults_surface_as_remote_errors() {
        let cursor = Scripted(
            vec![
                Ok(Some(Cell::I32(1))),
                Err(Fault::exception("Scanner", "paper jam")),
            ]
            .into_iter(),
        );
        let cells: Vec<_> = Enumerator::new(Box::new(cursor)).cells().collect();
        assert_eq!(cells.len(), 2);
        assert!(matches!(&cells[1], Err(e) if e.is_remote()));
    }

    #[test]
    fn advance_failures_are_kept_with_the_path() {
        let _guard = crate::TEST_GUARD.lock();
        let mut e = over(vec![Cell::from("loose")]).with_path(".Items");
        assert!(e.last_exception().is_none());
        e.next_object().err().unwrap();

        let exc = e.last_exception().unwrap();
        assert_eq!(exc.initial_function, "next_object");
        assert_eq!(exc.error_function, "enumerate");
        assert_eq!(exc.complete_member, ".Items");
        assert_eq!(e.path(), ".Items");
    }

    #[test]
    fn plain_object_is_not_enumerable() {
        let obj: ObjectRef = Rc::new(Plain);
        let err = Enumerator::of(&obj).err().unwrap();
        assert_eq!(err.code(), ErrorCode::MEMBER_NOT_FOUND);
    }
}
