//! PDF functions, as used by shadings and by the tint transforms of
//! `Separation` and `DeviceN` color spaces.

use crate::context::LoadContext;
use folio_common::bit::{BitReader, max_value};
use folio_syntax::object::keys::*;
use folio_syntax::object::{Dict, Object, Stream};
use log::warn;
use smallvec::SmallVec;
use std::sync::Arc;

/// The input and output values of a function.
pub type Values = SmallVec<[f32; 4]>;

type Ranges = SmallVec<[(f32, f32); 4]>;

const MAX_SAMPLES: usize = 1 << 24;
const MAX_STITCHING_DEPTH: usize = 8;

/// A PDF function.
#[derive(Debug, Clone)]
pub struct Function(Arc<FunctionKind>);

#[derive(Debug)]
enum FunctionKind {
    Sampled(Sampled),
    Exponential(Exponential),
    Stitching(Stitching),
}

impl Function {
    /// Load a function from a dictionary or stream.
    pub fn new(obj: &Object, ctx: &LoadContext<'_>) -> Option<Self> {
        Self::new_inner(obj, ctx, 0)
    }

    fn new_inner(obj: &Object, ctx: &LoadContext<'_>, depth: usize) -> Option<Self> {
        if depth > MAX_STITCHING_DEPTH {
            warn!("stitching functions are nested too deeply");

            return None;
        }

        let obj = ctx.deref(obj)?;
        let dict = obj.as_dict()?;

        let kind = match dict.get::<i64>(FUNCTION_TYPE)? {
            0 => FunctionKind::Sampled(Sampled::new(obj.as_stream()?, ctx)?),
            2 => FunctionKind::Exponential(Exponential::new(dict, ctx)?),
            3 => FunctionKind::Stitching(Stitching::new(dict, ctx, depth)?),
            4 => {
                warn!("PostScript calculator functions are not supported");

                return None;
            }
            t => {
                warn!("unknown function type {t}");

                return None;
            }
        };

        Some(Self(Arc::new(kind)))
    }

    /// Evaluate the function.
    pub fn eval(&self, input: &[f32]) -> Option<Values> {
        match self.0.as_ref() {
            FunctionKind::Sampled(f) => f.eval(input),
            FunctionKind::Exponential(f) => f.eval(*input.first()?),
            FunctionKind::Stitching(f) => f.eval(*input.first()?),
        }
    }
}

/// Evaluate a list of functions that each produce part of the output.
///
/// Shadings and tint transforms accept either a single function or an array
/// of one-output functions.
pub(crate) fn eval_all(functions: &[Function], input: &[f32]) -> Option<Values> {
    match functions {
        [single] => single.eval(input),
        many => {
            let mut out = Values::new();

            for f in many {
                out.extend(f.eval(input)?);
            }

            Some(out)
        }
    }
}

/// Load either a single function or an array of functions.
pub(crate) fn load_functions(obj: &Object, ctx: &LoadContext<'_>) -> Option<Vec<Function>> {
    match ctx.deref(obj)? {
        Object::Array(arr) => arr.iter().map(|o| Function::new(o, ctx)).collect(),
        other => Some(vec![Function::new(&other, ctx)?]),
    }
}

pub(crate) fn interpolate(x: f32, x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> f32 {
    if x_max == x_min {
        return y_min;
    }

    y_min + (x - x_min) * (y_max - y_min) / (x_max - x_min)
}

fn read_ranges(dict: &Dict, key: &[u8], ctx: &LoadContext<'_>) -> Option<Ranges> {
    let values = ctx.get::<Vec<f32>>(dict, key)?;

    if values.len() % 2 != 0 {
        return None;
    }

    Some(values.chunks_exact(2).map(|c| (c[0], c[1])).collect())
}

fn clamp(x: f32, range: (f32, f32)) -> f32 {
    x.max(range.0).min(range.1)
}

/// A type 0 function.
#[derive(Debug)]
struct Sampled {
    domain: Ranges,
    range: Ranges,
    size: SmallVec<[usize; 4]>,
    encode: Ranges,
    decode: Ranges,
    bits_per_sample: u8,
    samples: Vec<u32>,
}

impl Sampled {
    fn new(stream: &Stream, ctx: &LoadContext<'_>) -> Option<Self> {
        let dict = stream.dict();
        let domain = read_ranges(dict, DOMAIN, ctx)?;
        let range = read_ranges(dict, RANGE, ctx)?;
        let size = ctx
            .get::<Vec<usize>>(dict, SIZE)?
            .into_iter()
            .collect::<SmallVec<[usize; 4]>>();
        let bits_per_sample = ctx.get::<u8>(dict, BITS_PER_SAMPLE)?;

        if !matches!(bits_per_sample, 1 | 2 | 4 | 8 | 12 | 16 | 24 | 32) {
            warn!("invalid bits per sample {bits_per_sample} in sampled function");

            return None;
        }

        if size.len() != domain.len() || size.iter().any(|s| *s == 0) || range.is_empty() {
            warn!("malformed sampled function");

            return None;
        }

        let encode = read_ranges(dict, ENCODE, ctx)
            .unwrap_or_else(|| size.iter().map(|s| (0.0, (*s - 1) as f32)).collect());
        let decode = read_ranges(dict, DECODE, ctx).unwrap_or_else(|| range.clone());

        let count = size
            .iter()
            .try_fold(range.len(), |acc, s| acc.checked_mul(*s))
            .filter(|c| *c <= MAX_SAMPLES)?;

        let data = stream.decoded()?;
        let mut reader = BitReader::new(&data);
        let mut samples = Vec::with_capacity(count);

        while samples.len() < count {
            match reader.read(bits_per_sample) {
                Some(v) => samples.push(v),
                None => {
                    warn!("sampled function has too few samples");
                    samples.resize(count, 0);
                }
            }
        }

        Some(Self {
            domain,
            range,
            size,
            encode,
            decode,
            bits_per_sample,
            samples,
        })
    }

    fn eval(&self, input: &[f32]) -> Option<Values> {
        let m = self.size.len();

        if input.len() < m {
            return None;
        }

        let n = self.range.len();
        let mut base = SmallVec::<[usize; 4]>::new();
        let mut frac = SmallVec::<[f32; 4]>::new();

        for i in 0..m {
            let x = clamp(input[i], self.domain[i]);
            let e = interpolate(
                x,
                self.domain[i].0,
                self.domain[i].1,
                self.encode[i].0,
                self.encode[i].1,
            );
            let e = e.clamp(0.0, (self.size[i] - 1) as f32);
            let lo = e.floor() as usize;

            base.push(lo);
            frac.push(e - lo as f32);
        }

        let mut out = Values::from_elem(0.0, n);

        // Multi-linear interpolation over the corners of the enclosing cell.
        for corner in 0..(1usize << m) {
            let mut weight = 1.0;
            let mut idx = 0;
            let mut stride = 1;

            for i in 0..m {
                let bit = (corner >> i) & 1;
                let coord = (base[i] + bit).min(self.size[i] - 1);
                weight *= if bit == 1 { frac[i] } else { 1.0 - frac[i] };
                idx += coord * stride;
                stride *= self.size[i];
            }

            if weight == 0.0 {
                continue;
            }

            for (j, slot) in out.iter_mut().enumerate() {
                *slot += weight * *self.samples.get(idx * n + j)? as f32;
            }
        }

        let max = max_value(self.bits_per_sample) as f32;

        for (j, slot) in out.iter_mut().enumerate() {
            let d = interpolate(*slot, 0.0, max, self.decode[j].0, self.decode[j].1);
            *slot = clamp(d, self.range[j]);
        }

        Some(out)
    }
}

/// A type 2 function.
#[derive(Debug)]
struct Exponential {
    domain: (f32, f32),
    range: Option<Ranges>,
    c0: Values,
    c1: Values,
    n: f32,
}

impl Exponential {
    fn new(dict: &Dict, ctx: &LoadContext<'_>) -> Option<Self> {
        let domain = read_ranges(dict, DOMAIN, ctx)?.first().copied()?;
        let c0 = ctx
            .get::<Vec<f32>>(dict, C0)
            .map(Values::from_vec)
            .unwrap_or_else(|| Values::from_slice(&[0.0]));
        let c1 = ctx
            .get::<Vec<f32>>(dict, C1)
            .map(Values::from_vec)
            .unwrap_or_else(|| Values::from_slice(&[1.0]));
        let n = ctx.get::<f32>(dict, N)?;

        if c0.len() != c1.len() {
            warn!("C0 and C1 of exponential function differ in length");

            return None;
        }

        Some(Self {
            domain,
            range: read_ranges(dict, RANGE, ctx),
            c0,
            c1,
            n,
        })
    }

    fn eval(&self, x: f32) -> Option<Values> {
        let x = clamp(x, self.domain);
        let xn = x.powf(self.n);

        let mut out = self
            .c0
            .iter()
            .zip(&self.c1)
            .map(|(c0, c1)| c0 + xn * (c1 - c0))
            .collect::<Values>();

        if let Some(range) = &self.range {
            for (v, r) in out.iter_mut().zip(range) {
                *v = clamp(*v, *r);
            }
        }

        Some(out)
    }
}

/// A type 3 function.
#[derive(Debug)]
struct Stitching {
    domain: (f32, f32),
    functions: Vec<Function>,
    bounds: Vec<f32>,
    encode: Ranges,
}

impl Stitching {
    fn new(dict: &Dict, ctx: &LoadContext<'_>, depth: usize) -> Option<Self> {
        let domain = read_ranges(dict, DOMAIN, ctx)?.first().copied()?;
        let functions = ctx
            .get::<Vec<Object>>(dict, FUNCTIONS)?
            .iter()
            .map(|o| Function::new_inner(o, ctx, depth + 1))
            .collect::<Option<Vec<_>>>()?;
        let bounds = ctx.get::<Vec<f32>>(dict, BOUNDS).unwrap_or_default();
        let encode = read_ranges(dict, ENCODE, ctx)?;

        if functions.is_empty()
            || bounds.len() + 1 != functions.len()
            || encode.len() != functions.len()
        {
            warn!("malformed stitching function");

            return None;
        }

        Some(Self {
            domain,
            functions,
            bounds,
            encode,
        })
    }

    fn eval(&self, x: f32) -> Option<Values> {
        let x = clamp(x, self.domain);
        let idx = self.bounds.iter().take_while(|b| x >= **b).count();

        let lower = if idx == 0 {
            self.domain.0
        } else {
            self.bounds[idx - 1]
        };
        let upper = self.bounds.get(idx).copied().unwrap_or(self.domain.1);
        let (e0, e1) = self.encode[idx];

        self.functions[idx].eval(&[interpolate(x, lower, upper, e0, e1)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DocumentCache;
    use crate::interpret::WarningSinkFn;
    use folio_syntax::object::ObjectStore;

    fn eval(src: &[u8], input: &[f32]) -> Option<Values> {
        let store = ObjectStore::new();
        let cache = DocumentCache::new();
        let sink: WarningSinkFn = Arc::new(|_| {});
        let ctx = LoadContext::new(&store, &cache, &sink);

        Function::new(&Object::from_bytes(src)?, &ctx)?.eval(input)
    }

    #[test]
    fn exponential() {
        let f = b"<< /FunctionType 2 /Domain [0 1] /C0 [0 0 0] /C1 [1 0.5 0] /N 1 >>";

        assert_eq!(eval(f, &[0.5]).unwrap().as_slice(), &[0.5, 0.25, 0.0]);
        assert_eq!(eval(f, &[2.0]).unwrap().as_slice(), &[1.0, 0.5, 0.0]);
    }

    #[test]
    fn exponential_defaults() {
        let f = b"<< /FunctionType 2 /Domain [0 1] /N 2 >>";

        assert_eq!(eval(f, &[0.5]).unwrap().as_slice(), &[0.25]);
    }

    #[test]
    fn stitching() {
        let f = b"<< /FunctionType 3 /Domain [0 1] /Bounds [0.5] /Encode [0 1 0 1]
            /Functions [
                << /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [1] /N 1 >>
                << /FunctionType 2 /Domain [0 1] /C0 [1] /C1 [0] /N 1 >>
            ] >>";

        assert_eq!(eval(f, &[0.25]).unwrap().as_slice(), &[0.5]);
        assert_eq!(eval(f, &[0.75]).unwrap().as_slice(), &[0.5]);
        assert_eq!(eval(f, &[0.5]).unwrap().as_slice(), &[1.0]);
    }

    #[test]
    fn sampled() {
        let f = b"<< /FunctionType 0 /Domain [0 1] /Range [0 1] /Size [2] /BitsPerSample 8 /Length 2 >>
stream
\x00\xff
endstream";

        assert_eq!(eval(f, &[0.0]).unwrap().as_slice(), &[0.0]);
        assert_eq!(eval(f, &[1.0]).unwrap().as_slice(), &[1.0]);
        assert!((eval(f, &[0.5]).unwrap()[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn postscript_is_unsupported() {
        assert!(eval(b"<< /FunctionType 4 /Domain [0 1] /Range [0 1] /Length 0 >>", &[0.0]).is_none());
    }
}
