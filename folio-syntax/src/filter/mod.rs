//! Decode filters for stream and inline image data.

mod ascii_85;
mod ascii_hex;
mod dct;
mod lzw_flate;
mod run_length;

use crate::object::{Dict, Object, keys};
use log::warn;
use smallvec::SmallVec;

/// A stream filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `ASCIIHexDecode`
    AsciiHexDecode,
    /// `ASCII85Decode`
    Ascii85Decode,
    /// `LZWDecode`
    LzwDecode,
    /// `FlateDecode`
    FlateDecode,
    /// `RunLengthDecode`
    RunLengthDecode,
    /// `CCITTFaxDecode`
    CcittFaxDecode,
    /// `JBIG2Decode`
    Jbig2Decode,
    /// `DCTDecode`
    DctDecode,
    /// `JPXDecode`
    JpxDecode,
    /// `Crypt`
    Crypt,
}

impl Filter {
    /// Look up a filter by its full or abbreviated (inline image) name.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        Some(match name {
            b"ASCIIHexDecode" | b"AHx" => Self::AsciiHexDecode,
            b"ASCII85Decode" | b"A85" => Self::Ascii85Decode,
            b"LZWDecode" | b"LZW" => Self::LzwDecode,
            b"FlateDecode" | b"Fl" => Self::FlateDecode,
            b"RunLengthDecode" | b"RL" => Self::RunLengthDecode,
            b"CCITTFaxDecode" | b"CCF" => Self::CcittFaxDecode,
            b"JBIG2Decode" => Self::Jbig2Decode,
            b"DCTDecode" | b"DCT" => Self::DctDecode,
            b"JPXDecode" => Self::JpxDecode,
            b"Crypt" => Self::Crypt,
            _ => {
                warn!("unknown filter {}", String::from_utf8_lossy(name));

                return None;
            }
        })
    }

    /// Whether the filter is an image codec rather than a generic byte transform.
    pub fn is_image_codec(&self) -> bool {
        matches!(
            self,
            Self::DctDecode | Self::JpxDecode | Self::Jbig2Decode | Self::CcittFaxDecode
        )
    }

    fn debug_name(&self) -> &'static str {
        match self {
            Self::AsciiHexDecode => "ascii_hex",
            Self::Ascii85Decode => "ascii_85",
            Self::LzwDecode => "lzw",
            Self::FlateDecode => "flate",
            Self::RunLengthDecode => "run-length",
            Self::CcittFaxDecode => "ccitt_fax",
            Self::Jbig2Decode => "jbig2",
            Self::DctDecode => "dct",
            Self::JpxDecode => "jpx",
            Self::Crypt => "crypt",
        }
    }

    /// Run the filter over `data`.
    ///
    /// `DCTDecode` yields interleaved 8-bit samples. Returns `None` if the
    /// data is corrupt or the filter is not supported.
    pub fn apply(&self, data: &[u8], params: &Dict) -> Option<Vec<u8>> {
        let result = match self {
            Self::AsciiHexDecode => ascii_hex::decode(data),
            Self::Ascii85Decode => ascii_85::decode(data),
            Self::RunLengthDecode => run_length::decode(data),
            Self::LzwDecode => lzw_flate::lzw::decode(data, params),
            Self::FlateDecode => lzw_flate::flate::decode(data, params),
            Self::DctDecode => dct::decode(data, params),
            Self::CcittFaxDecode | Self::Jbig2Decode | Self::JpxDecode | Self::Crypt => {
                warn!("the {} filter is not supported", self.debug_name());

                return None;
            }
        };

        if result.is_none() {
            warn!("failed to apply the {} filter", self.debug_name());
        }

        result
    }
}

/// The ordered filters of a stream together with their decode parameters.
#[derive(Debug, Clone, Default)]
pub struct FilterChain(SmallVec<[(Filter, Dict); 2]>);

impl FilterChain {
    /// Read `/Filter` and `/DecodeParms` (or their abbreviations `/F` and `/DP`).
    ///
    /// Unknown filters are skipped with a warning.
    pub fn from_dict(dict: &Dict) -> Self {
        let filters = dict
            .get_raw(keys::FILTER)
            .or_else(|| dict.get_raw(keys::F))
            .map(one_or_many)
            .unwrap_or_default();
        let params = dict
            .get_raw(keys::DECODE_PARMS)
            .or_else(|| dict.get_raw(keys::DP))
            .map(one_or_many)
            .unwrap_or_default();

        let chain = filters
            .iter()
            .enumerate()
            .filter_map(|(idx, filter)| {
                let filter = Filter::from_name(filter.as_name()?.as_bytes())?;
                let params = params
                    .get(idx)
                    .and_then(|p| p.as_dict())
                    .cloned()
                    .unwrap_or_default();

                Some((filter, params))
            })
            .collect();

        Self(chain)
    }

    /// Build a chain from explicit filters.
    pub fn new(filters: impl IntoIterator<Item = (Filter, Dict)>) -> Self {
        Self(filters.into_iter().collect())
    }

    /// Whether no filter is declared.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the filters in application order.
    pub fn iter(&self) -> impl Iterator<Item = (&Filter, &Dict)> {
        self.0.iter().map(|(f, p)| (f, p))
    }

    /// Run all filters in order.
    pub fn apply(&self, data: &[u8]) -> Option<Vec<u8>> {
        let mut cur = data.to_vec();

        for (filter, params) in self.iter() {
            cur = filter.apply(&cur, params)?;
        }

        Some(cur)
    }
}

fn one_or_many(obj: &Object) -> Vec<Object> {
    match obj {
        Object::Array(a) => a.clone(),
        other => vec![other.clone()],
    }
}
