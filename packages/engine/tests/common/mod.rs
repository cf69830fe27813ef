#![allow(dead_code)]

use std::cell::Cell as Tally;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, PoisonError};

use latebind_core::{Cell, Dispatch, Fault, MemberId, ObjectRef};
use latebind_expando::Expando;

static GUARD: Mutex<()> = Mutex::new(());

/// Serializes tests that change process-wide options.
pub fn guard() -> MutexGuard<'static, ()> {
    GUARD.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counters shared by every node of one chain.
#[derive(Clone, Default)]
pub struct Tracker {
    pub resolves: Rc<Tally<usize>>,
    pub created: Rc<Tally<usize>>,
    pub dropped: Rc<Tally<usize>>,
}

impl Tracker {
    pub fn live(&self) -> usize {
        self.created.get() - self.dropped.get()
    }

    pub fn root(&self) -> ObjectRef {
        Node::create(0, self.clone())
    }
}

/// `Child` hands out a fresh node one level deeper; `Depth` is the level.
pub struct Node {
    depth: i32,
    tracker: Tracker,
}

impl Node {
    fn create(depth: i32, tracker: Tracker) -> ObjectRef {
        tracker.created.set(tracker.created.get() + 1);
        Rc::new(Node { depth, tracker })
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.tracker.dropped.set(self.tracker.dropped.get() + 1);
    }
}

impl Dispatch for Node {
    fn type_name(&self) -> &str {
        "Node"
    }

    fn resolve(&self, name: &str) -> Result<MemberId, Fault> {
        self.tracker.resolves.set(self.tracker.resolves.get() + 1);
        match name {
            "Child" => Ok(MemberId(1)),
            "Depth" => Ok(MemberId(2)),
            _ => Err(Fault::unknown_name()),
        }
    }

    fn get(&self, member: MemberId, _args: &[Cell]) -> Result<Cell, Fault> {
        match member.0 {
            1 => Ok(Cell::Object(Node::create(self.depth + 1, self.tracker.clone()))),
            2 => Ok(Cell::I32(self.depth)),
            _ => Err(Fault::member_not_found()),
        }
    }

    fn put(&self, _member: MemberId, _args: &[Cell], _value: Cell) -> Result<(), Fault> {
        Err(Fault::member_not_found())
    }

    fn call(&self, member: MemberId, args: &[Cell]) -> Result<Cell, Fault> {
        self.get(member, args)
    }
}

/// An object whose `Echo` method returns its first argument.
pub fn echo() -> ObjectRef {
    Expando::new("Echo")
        .with_method("Echo", |args| Ok(args.first().cloned().unwrap_or_default()))
        .into_object()
}

/// A scanner-style object graph:
/// `Process.Filters(i).Properties(name).Value`.
pub fn image_process() -> (Rc<Expando>, ObjectRef) {
    let quality = Rc::new(Expando::new("Property").named("Quality").with_property("Value", 75));
    let properties = Expando::collection("Properties", vec![Cell::Object(quality.clone())]);
    let convert = Expando::new("Filter")
        .named("Convert")
        .with_property("Properties", properties.into_object());
    let rotate = Expando::new("Filter").named("RotateFlip");
    let filters = Expando::collection(
        "Filters",
        vec![Cell::Object(convert.into_object()), Cell::Object(rotate.into_object())],
    );
    let process = Expando::new("ImageProcess")
        .with_property("Filters", filters.into_object())
        .into_object();
    (quality, process)
}
