//! In-memory late-bound objects.
//!
//! An [`Expando`] is a [`Dispatch`] object assembled at runtime from named
//! properties and closures. Member names match case-insensitively. An
//! expando can also be a collection: it then answers `Count`, `Item`, `Add`
//! and `Remove`, is indexable through its default member, and can be
//! enumerated.
//!
//! # Example
//!
//! ```rust
//! use latebind_core::{Cell, Dispatch, MemberId};
//! use latebind_expando::Expando;
//!
//! let image = Expando::new("ImageFile")
//!     .with_property("Width", 640)
//!     .with_method("Scale", |args| match args {
//!         [Cell::I32(factor)] => Ok(Cell::I32(640 * factor)),
//!         _ => Err(latebind_core::Fault::bad_param_count()),
//!     })
//!     .into_object();
//!
//! let width = image.resolve("width").unwrap();
//! assert_eq!(image.get(width, &[]).unwrap(), Cell::I32(640));
//!
//! let scale = image.resolve("Scale").unwrap();
//! assert_eq!(image.call(scale, &[Cell::I32(2)]).unwrap(), Cell::I32(1280));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use latebind_core::{
    Cell, CellType, Dispatch, Enumerate, ErrorCode, Fault, IterEnumerator, MemberId, ObjectRef,
};

/// A method body.
pub type Method = Rc<dyn Fn(&[Cell]) -> Result<Cell, Fault>>;

enum Member {
    Property(Cell),
    Method(Method),
}

const COUNT: MemberId = MemberId(-100);
const ITEM: MemberId = MemberId(-101);
const ADD: MemberId = MemberId(-102);
const REMOVE: MemberId = MemberId(-103);

const COLLECTION_MEMBERS: [(&str, MemberId); 4] = [
    ("Count", COUNT),
    ("Item", ITEM),
    ("Add", ADD),
    ("Remove", REMOVE),
];

/// A late-bound object built at runtime.
pub struct Expando {
    type_name: String,
    name: Option<String>,
    expandable: bool,
    /// Member ids are positions in this list, plus one.
    members: RefCell<Vec<(String, Member)>>,
    items: Option<RefCell<Vec<Cell>>>,
}

impl Expando {
    pub fn new(type_name: impl Into<String>) -> Self {
        Expando {
            type_name: type_name.into(),
            name: None,
            expandable: false,
            members: RefCell::new(Vec::new()),
            items: None,
        }
    }

    /// A collection holding `items`.
    pub fn collection(type_name: impl Into<String>, items: impl IntoIterator<Item = Cell>) -> Self {
        Expando {
            items: Some(RefCell::new(items.into_iter().collect())),
            ..Expando::new(type_name)
        }
    }

    /// The name this object stands for: the key it is found under in a
    /// collection, and the member name it supplies to `%n`.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Resolving an unknown name creates an empty property instead of
    /// failing.
    #[must_use]
    pub fn expandable(mut self) -> Self {
        self.expandable = true;
        self
    }

    #[must_use]
    pub fn with_property(self, name: impl Into<String>, value: impl Into<Cell>) -> Self {
        self.set_property(&name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_method(
        self,
        name: impl Into<String>,
        body: impl Fn(&[Cell]) -> Result<Cell, Fault> + 'static,
    ) -> Self {
        self.members
            .borrow_mut()
            .push((name.into(), Member::Method(Rc::new(body))));
        self
    }

    pub fn into_object(self) -> ObjectRef {
        Rc::new(self)
    }

    /// Current value of a property.
    pub fn property(&self, name: &str) -> Option<Cell> {
        self.members
            .borrow()
            .iter()
            .find_map(|(member, kind)| match kind {
                Member::Property(value) if member.eq_ignore_ascii_case(name) => {
                    Some(value.clone())
                }
                _ => None,
            })
    }

    /// Set a property, adding it when missing. A method of the same name is
    /// replaced.
    pub fn set_property(&self, name: &str, value: Cell) {
        let mut members = self.members.borrow_mut();
        match members
            .iter_mut()
            .find(|(member, _)| member.eq_ignore_ascii_case(name))
        {
            Some((_, slot)) => *slot = Member::Property(value),
            None => members.push((name.to_string(), Member::Property(value))),
        }
    }

    /// A copy of the collection's items; empty for plain objects.
    pub fn items(&self) -> Vec<Cell> {
        self.items
            .as_ref()
            .map(|items| items.borrow().clone())
            .unwrap_or_default()
    }

    pub fn is_collection(&self) -> bool {
        self.items.is_some()
    }

    fn find(&self, name: &str) -> Option<MemberId> {
        self.members
            .borrow()
            .iter()
            .position(|(member, _)| member.eq_ignore_ascii_case(name))
            .map(|index| MemberId(index as i32 + 1))
    }

    fn with_member<R>(&self, id: MemberId, f: impl FnOnce(&mut Member) -> R) -> Result<R, Fault> {
        let index = usize::try_from(id.0 - 1).map_err(|_| Fault::member_not_found())?;
        let mut members = self.members.borrow_mut();
        let (_, member) = members.get_mut(index).ok_or_else(Fault::member_not_found)?;
        Ok(f(member))
    }

    fn collection_items(&self) -> Result<&RefCell<Vec<Cell>>, Fault> {
        self.items.as_ref().ok_or_else(Fault::member_not_found)
    }

    /// Position of the item a key designates: a 1-based number, or the
    /// name of a named item.
    fn locate(&self, items: &[Cell], args: &[Cell]) -> Result<usize, Fault> {
        let key = match args {
            [key] => key,
            _ => return Err(Fault::bad_param_count()),
        };
        if let Cell::String(name) = key {
            return items
                .iter()
                .position(|item| {
                    item.as_object()
                        .and_then(|obj| obj.member_name())
                        .is_some_and(|n| n.eq_ignore_ascii_case(name))
                })
                .ok_or_else(|| Fault::new(ErrorCode::BAD_INDEX).at_argument(1));
        }
        let index = match key.clone().coerce(CellType::I32) {
            Ok(Cell::I32(index)) => index,
            _ => return Err(Fault::type_mismatch(1)),
        };
        usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .filter(|&i| i < items.len())
            .ok_or_else(|| Fault::new(ErrorCode::BAD_INDEX).at_argument(1))
    }

    fn item(&self, args: &[Cell]) -> Result<Cell, Fault> {
        let items = self.collection_items()?.borrow();
        let index = self.locate(&items, args)?;
        Ok(items[index].clone())
    }

    fn collection_op(&self, id: MemberId, args: &[Cell]) -> Result<Cell, Fault> {
        let items = self.collection_items()?;
        match id {
            COUNT => Ok(Cell::I32(items.borrow().len() as i32)),
            ITEM => self.item(args),
            ADD => match args {
                [item] => {
                    items.borrow_mut().push(item.clone());
                    log::debug!("{}: added item {}", self.type_name, item);
                    Ok(Cell::Empty)
                }
                _ => Err(Fault::bad_param_count()),
            },
            REMOVE => {
                let mut items = items.borrow_mut();
                let index = self.locate(&items, args)?;
                Ok(items.remove(index))
            }
            _ => Err(Fault::member_not_found()),
        }
    }

    /// Shared by `get` and `call`: properties read their value, methods run.
    fn read(&self, id: MemberId, args: &[Cell]) -> Result<Cell, Fault> {
        if id == MemberId::VALUE {
            return match (&self.items, args.is_empty()) {
                (Some(_), false) => self.item(args),
                _ => Err(Fault::member_not_found()),
            };
        }
        if id.0 < 0 {
            return self.collection_op(id, args);
        }

        let member = self.with_member(id, |member| match member {
            Member::Property(value) => Ok(value.clone()),
            Member::Method(body) => Err(body.clone()),
        })?;
        match member {
            Ok(value) if args.is_empty() => Ok(value),
            Ok(Cell::Object(inner)) => inner.get(MemberId::VALUE, args),
            Ok(_) => Err(Fault::bad_param_count()),
            Err(body) => body(args),
        }
    }
}

impl Dispatch for Expando {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn resolve(&self, name: &str) -> Result<MemberId, Fault> {
        if let Some(id) = self.find(name) {
            return Ok(id);
        }
        if self.items.is_some() {
            if let Some((_, id)) = COLLECTION_MEMBERS
                .iter()
                .find(|(member, _)| member.eq_ignore_ascii_case(name))
            {
                return Ok(*id);
            }
        }
        if self.expandable {
            log::debug!("{}: expanding with '{}'", self.type_name, name);
            self.set_property(name, Cell::Empty);
            return self.find(name).ok_or_else(Fault::unknown_name);
        }
        Err(Fault::unknown_name().with_description(format!(
            "{} has no member named '{}'",
            self.type_name, name
        )))
    }

    fn get(&self, member: MemberId, args: &[Cell]) -> Result<Cell, Fault> {
        self.read(member, args)
    }

    fn put(&self, member: MemberId, args: &[Cell], value: Cell) -> Result<(), Fault> {
        if member == MemberId::VALUE {
            let mut items = self.collection_items()?.borrow_mut();
            let index = self.locate(&items, args)?;
            items[index] = value;
            return Ok(());
        }
        if member.0 < 0 {
            return Err(Fault::member_not_found());
        }

        let forward = self.with_member(member, |slot| match slot {
            Member::Property(Cell::Object(inner)) if !args.is_empty() => Ok(Some(inner.clone())),
            Member::Property(current) if args.is_empty() => {
                *current = value.clone();
                Ok(None)
            }
            Member::Property(_) => Err(Fault::bad_param_count()),
            Member::Method(_) => Err(Fault::member_not_found()),
        })??;
        match forward {
            Some(inner) => inner.put(MemberId::VALUE, args, value),
            None => Ok(()),
        }
    }

    fn call(&self, member: MemberId, args: &[Cell]) -> Result<Cell, Fault> {
        self.read(member, args)
    }

    fn enumerate(&self) -> Result<Box<dyn Enumerate>, Fault> {
        let snapshot = self.collection_items()?.borrow().clone();
        Ok(Box::new(IterEnumerator(snapshot.into_iter())))
    }

    fn member_name(&self) -> Option<String> {
        self.name.clone()
    }
}

impl fmt::Debug for Expando {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members = self.members.borrow();
        let names: Vec<&str> = members.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("Expando")
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .field("members", &names)
            .field("items", &self.items.as_ref().map(|items| items.borrow().len()))
            .finish()
    }
}
