//! Document-wide caches for decoded resources.
//!
//! All caches are keyed by the reference of the indirect object a resource
//! was loaded from, and are safe to share between threads that render
//! different pages of the same document. A value is computed outside of the
//! lock, so two threads racing for the same key may both decode it. The
//! first one to finish wins and the other result is dropped, which is fine
//! since decoding is deterministic.

use crate::color::ColorSpace;
use crate::color::icc::IccProfile;
use crate::font::Font;
use crate::image::DecodedImage;
use crate::picture::Picture;
use crate::shading::Shading;
use folio_syntax::object::ObjRef;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A thread-safe memoization map from object references to values.
///
/// Failed loads are cached as well, so a broken resource is only decoded once.
pub struct ObjectCache<T: ?Sized>(Arc<Mutex<FxHashMap<ObjRef, Option<Arc<T>>>>>);

impl<T: ?Sized> ObjectCache<T> {
    /// Create a new, empty cache.
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(FxHashMap::default())))
    }

    /// Return the cached value for `id`, or compute and insert it.
    pub fn get_or_insert_with(
        &self,
        id: ObjRef,
        f: impl FnOnce() -> Option<Arc<T>>,
    ) -> Option<Arc<T>> {
        if let Some(cached) = self.lock().get(&id) {
            return cached.clone();
        }

        let computed = f();

        self.lock().entry(id).or_insert(computed).clone()
    }

    /// Return the cached value for `id` if it has been loaded before.
    pub fn get(&self, id: ObjRef) -> Option<Option<Arc<T>>> {
        self.lock().get(&id).cloned()
    }

    /// The number of cached entries, failed loads included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<ObjRef, Option<Arc<T>>>> {
        // A panic while holding the lock cannot leave the map in a broken
        // state, since entries are only ever inserted whole.
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: ?Sized> Clone for ObjectCache<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: ?Sized> Default for ObjectCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for ObjectCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectCache({} entries)", self.len())
    }
}

/// The caches shared by all pages of a document.
///
/// Cloning is cheap and yields a handle to the same caches. Dropping the
/// last handle frees everything, which is the only way entries are evicted.
#[derive(Debug, Clone, Default)]
pub struct DocumentCache {
    /// Decoded image XObjects.
    pub images: ObjectCache<DecodedImage>,
    /// Resolved color spaces.
    pub color_spaces: ObjectCache<ColorSpace>,
    /// Parsed ICC profiles, keyed by their stream.
    pub icc_profiles: ObjectCache<IccProfile>,
    /// Recorded tiling pattern cells.
    pub pictures: ObjectCache<Picture>,
    /// Parsed shadings.
    pub shadings: ObjectCache<Shading>,
    /// Loaded fonts.
    pub fonts: ObjectCache<dyn Font>,
}

impl DocumentCache {
    /// Create a new set of empty caches.
    pub fn new() -> Self {
        Self::default()
    }
}
