//! Stream objects.

use crate::filter::FilterChain;
use crate::object::Dict;
use std::fmt;
use std::sync::Arc;

/// A PDF stream: a dictionary plus its still-encoded data. Cloning is cheap.
#[derive(Clone, PartialEq)]
pub struct Stream {
    dict: Dict,
    data: Arc<[u8]>,
}

impl Stream {
    /// Create a stream from its dictionary and raw (encoded) bytes.
    pub fn new(dict: Dict, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            dict,
            data: data.into(),
        }
    }

    /// The stream dictionary.
    pub fn dict(&self) -> &Dict {
        &self.dict
    }

    /// The raw, undecoded data.
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    /// The filters declared by the stream dictionary, in application order.
    pub fn filters(&self) -> FilterChain {
        FilterChain::from_dict(&self.dict)
    }

    /// Decode the stream by running every declared filter.
    ///
    /// Returns `None` if any filter fails or is unsupported.
    pub fn decoded(&self) -> Option<Vec<u8>> {
        self.filters().apply(&self.data)
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("dict", &self.dict)
            .field("len", &self.data.len())
            .finish()
    }
}
