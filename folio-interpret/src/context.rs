use crate::cache::DocumentCache;
use crate::interpret::{InterpreterWarning, WarningSinkFn};
use folio_syntax::object::{Dict, FromObject, Name, ObjRef, Object, Resolve, ResolveExt};
use log::warn;

/// Everything needed to load resources (color spaces, images, shadings,
/// patterns, fonts) from their dictionaries.
#[derive(Clone, Copy)]
pub struct LoadContext<'a> {
    /// Access to indirect objects.
    pub resolver: &'a dyn Resolve,
    /// The document-wide caches.
    pub cache: &'a DocumentCache,
    /// Where to report recoverable problems.
    pub warning_sink: &'a WarningSinkFn,
}

impl<'a> LoadContext<'a> {
    /// Create a new load context.
    pub fn new(
        resolver: &'a dyn Resolve,
        cache: &'a DocumentCache,
        warning_sink: &'a WarningSinkFn,
    ) -> Self {
        Self {
            resolver,
            cache,
            warning_sink,
        }
    }

    pub(crate) fn warn(&self, warning: InterpreterWarning) {
        (self.warning_sink)(warning);
    }

    pub(crate) fn deref(&self, obj: &Object) -> Option<Object> {
        self.resolver.deref_object(obj)
    }

    pub(crate) fn cast<T: FromObject>(&self, obj: &Object) -> Option<T> {
        self.resolver.cast(obj)
    }

    pub(crate) fn get<T: FromObject>(&self, dict: &Dict, key: &[u8]) -> Option<T> {
        self.resolver.get(dict, key)
    }

    /// Look up `name` in the `category` sub-dictionary of `resources`.
    ///
    /// Also returns the reference the resource is stored under, which serves
    /// as its cache key.
    pub(crate) fn resource(
        &self,
        resources: &Dict,
        category: &[u8],
        name: &Name,
    ) -> Option<(Option<ObjRef>, Object)> {
        let found = self
            .get::<Dict>(resources, category)
            .and_then(|dict| self.resolver.get_with_ref(&dict, name.as_bytes()));

        if found.is_none() {
            warn!(
                "missing resource {} in {}",
                name.as_str(),
                String::from_utf8_lossy(category)
            );
            self.warn(InterpreterWarning::MissingResource);
        }

        found
    }
}
