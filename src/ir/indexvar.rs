//! [`IndexVar`]: a symbolic loop counter with process-global identity.

use crate::ids::Id;
use std::fmt;
use std::rc::Rc;

/// An index variable. Equality and hashing are by identity (the wrapped
/// [`Id`]) alone -- `name` is display-only (spec.md §3: "IndexVar: opaque
/// identity (unique handle + display name). Equality by handle.").
#[derive(Clone)]
pub struct IndexVar {
    id: Id,
    name: Rc<str>,
}

impl IndexVar {
    pub fn new(name: impl Into<Rc<str>>) -> IndexVar {
        IndexVar {
            id: Id::fresh(),
            name: name.into(),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for IndexVar {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for IndexVar {}

impl std::hash::Hash for IndexVar {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for IndexVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id.raw())
    }
}

impl fmt::Display for IndexVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
