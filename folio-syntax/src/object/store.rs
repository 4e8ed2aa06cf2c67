use crate::object::{Dict, FromObject, Object};
use rustc_hash::FxHashMap;
use std::fmt;

/// A reference to an indirect object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    /// The object number.
    pub num: u32,
    /// The generation number.
    pub generation: u16,
}

impl ObjRef {
    /// Create a new reference.
    pub fn new(num: u32, generation: u16) -> Self {
        Self { num, generation }
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.num, self.generation)
    }
}

/// Access to indirect objects.
///
/// This is the seam to the document's object model (cross-reference table,
/// object streams, decryption), which lives outside this crate.
pub trait Resolve {
    /// Look up the object behind a reference.
    fn resolve(&self, r: ObjRef) -> Option<Object>;
}

/// Reference chains longer than this are treated as broken.
const MAX_REF_CHAIN: usize = 16;

/// Typed lookups that transparently follow references.
pub trait ResolveExt: Resolve {
    /// Follow references until a direct object is reached.
    fn deref_object(&self, obj: &Object) -> Option<Object> {
        let mut cur = obj.clone();

        for _ in 0..MAX_REF_CHAIN {
            match cur {
                Object::Ref(r) => cur = self.resolve(r)?,
                other => return Some(other),
            }
        }

        None
    }

    /// Resolve `obj` and convert it to `T`.
    fn cast<T: FromObject>(&self, obj: &Object) -> Option<T> {
        self.deref_object(obj)?.cast::<T>()
    }

    /// Look up `key`, following a reference if necessary.
    fn get<T: FromObject>(&self, dict: &Dict, key: &[u8]) -> Option<T> {
        self.cast(dict.get_raw(key)?)
    }

    /// Look up `key` and also return the reference it was stored under, if any.
    ///
    /// The reference serves as a stable identity for caching.
    fn get_with_ref(&self, dict: &Dict, key: &[u8]) -> Option<(Option<ObjRef>, Object)> {
        let raw = dict.get_raw(key)?;
        let id = match raw {
            Object::Ref(r) => Some(*r),
            _ => None,
        };

        Some((id, self.deref_object(raw)?))
    }
}

impl<R: Resolve + ?Sized> ResolveExt for R {}

/// An in-memory table of indirect objects.
#[derive(Debug, Default, Clone)]
pub struct ObjectStore {
    objects: FxHashMap<ObjRef, Object>,
}

impl ObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object under the given reference, replacing any previous one.
    pub fn insert(&mut self, r: ObjRef, obj: Object) {
        self.objects.insert(r, obj);
    }

    /// The number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Resolve for ObjectStore {
    fn resolve(&self, r: ObjRef) -> Option<Object> {
        self.objects.get(&r).cloned()
    }
}
