//! PDF shadings.

mod mesh;

pub use mesh::{Patch, Triangle, Vertex};

use crate::color::{AlphaColor, ColorSpace};
use crate::context::LoadContext;
use crate::function::{Function, interpolate, load_functions};
use crate::image::Bitmap;
use crate::interpret::InterpreterWarning;
use folio_syntax::object::keys::*;
use folio_syntax::object::{Dict, Object};
use kurbo::{Affine, Point, Rect};
use log::warn;
use mesh::{MeshDecoder, MeshLayout};
use std::sync::Arc;

/// How finely shadings are sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadingQuality {
    /// The number of color stops axial and radial shadings are sampled to.
    /// Clamped to `32..=256`.
    pub gradient_stops: usize,
    /// The width and height of the bitmap function-based shadings are
    /// sampled into.
    pub function_resolution: u32,
}

impl Default for ShadingQuality {
    fn default() -> Self {
        Self {
            gradient_stops: 256,
            function_resolution: 64,
        }
    }
}

/// A color stop of a sampled gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    /// The position along the gradient, between 0 and 1.
    pub offset: f32,
    /// The color at this position.
    pub color: AlphaColor,
}

/// A mesh made of triangles.
///
/// Patch meshes keep their patches and are additionally tessellated into
/// triangles.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// The patches, for Coons and tensor-product meshes.
    pub patches: Vec<Patch>,
    /// The triangles covering the mesh.
    pub triangles: Vec<Triangle>,
}

/// The geometry of a shading.
#[derive(Debug, Clone)]
pub enum ShadingKind {
    /// Type 1.
    FunctionBased {
        /// `[x0 x1 y0 y1]`.
        domain: [f32; 4],
        /// Maps the domain to shading space.
        matrix: Affine,
        /// The color functions.
        functions: Vec<Function>,
        /// The shading sampled over its domain, first row at `y1`.
        bitmap: Bitmap,
    },
    /// Type 2.
    Axial {
        /// `[x0 y0 x1 y1]`.
        coords: [f32; 4],
        /// Whether to extend before the start and after the end.
        extend: [bool; 2],
        /// The sampled colors.
        stops: Vec<GradientStop>,
    },
    /// Type 3.
    Radial {
        /// `[x0 y0 r0 x1 y1 r1]`.
        coords: [f32; 6],
        /// Whether to extend before the start and after the end.
        extend: [bool; 2],
        /// The sampled colors.
        stops: Vec<GradientStop>,
    },
    /// Type 4.
    FreeFormMesh(Mesh),
    /// Type 5.
    LatticeMesh(Mesh),
    /// Type 6.
    CoonsMesh(Mesh),
    /// Type 7.
    TensorMesh(Mesh),
}

/// A PDF shading.
#[derive(Debug, Clone)]
pub struct Shading {
    /// The color space the shading was defined in.
    pub color_space: ColorSpace,
    /// The color outside of the shape of the shading, when used as a
    /// pattern.
    pub background: Option<AlphaColor>,
    /// The shading is clipped to this rectangle, in shading space.
    pub bbox: Option<Rect>,
    /// Whether anti-aliasing was requested.
    pub anti_alias: bool,
    /// The geometry.
    pub kind: ShadingKind,
}

impl Shading {
    /// Load a shading, memoized by its reference.
    ///
    /// Shadings of an unknown type yield `None` and an
    /// [`InterpreterWarning::UnsupportedShading`].
    pub fn load(
        obj: &Object,
        ctx: &LoadContext<'_>,
        quality: &ShadingQuality,
    ) -> Option<Arc<Self>> {
        let load = || {
            let shading = Self::new(obj, ctx, quality);

            if shading.is_none() {
                ctx.warn(InterpreterWarning::UnsupportedShading);
            }

            shading.map(Arc::new)
        };

        match obj {
            Object::Ref(r) => ctx.cache.shadings.get_or_insert_with(*r, load),
            _ => load(),
        }
    }

    fn new(obj: &Object, ctx: &LoadContext<'_>, quality: &ShadingQuality) -> Option<Self> {
        let obj = ctx.deref(obj)?;
        let dict = obj.as_dict()?;
        let shading_type = ctx.get::<i64>(dict, SHADING_TYPE)?;

        let color_space = ColorSpace::from_object(dict.get_raw(COLOR_SPACE)?, ctx)?;

        if color_space.is_pattern() {
            warn!("shading with a pattern color space");

            return None;
        }

        let functions = match dict.get_raw(FUNCTION) {
            Some(f) => load_functions(f, ctx)?,
            None => vec![],
        };

        let needs_function = matches!(shading_type, 1..=3);

        if needs_function && functions.is_empty() {
            warn!("shading of type {shading_type} without a function");

            return None;
        }

        let kind = match shading_type {
            1 => function_based(dict, ctx, &color_space, functions, quality)?,
            2 | 3 => {
                let domain = ctx.get::<[f32; 2]>(dict, DOMAIN).unwrap_or([0.0, 1.0]);
                let extend = ctx.get::<[bool; 2]>(dict, EXTEND).unwrap_or([false, false]);
                let stops = sample_stops(&color_space, &functions, domain, quality.gradient_stops);

                if shading_type == 2 {
                    ShadingKind::Axial {
                        coords: ctx.get::<[f32; 4]>(dict, COORDS)?,
                        extend,
                        stops,
                    }
                } else {
                    ShadingKind::Radial {
                        coords: ctx.get::<[f32; 6]>(dict, COORDS)?,
                        extend,
                        stops,
                    }
                }
            }
            4..=7 => {
                let stream = obj.as_stream()?;
                let data = stream.decoded()?;
                let decoder = MeshDecoder {
                    layout: MeshLayout {
                        bits_per_coordinate: ctx.get::<u8>(dict, BITS_PER_COORDINATE)?,
                        bits_per_component: ctx.get::<u8>(dict, BITS_PER_COMPONENT)?,
                        bits_per_flag: ctx.get::<u8>(dict, BITS_PER_FLAG).unwrap_or(8),
                        decode: ctx.get::<Vec<f32>>(dict, DECODE)?,
                    },
                    color_space: &color_space,
                    functions: &functions,
                };

                match shading_type {
                    4 => ShadingKind::FreeFormMesh(Mesh {
                        patches: vec![],
                        triangles: decoder.free_form(&data),
                    }),
                    5 => ShadingKind::LatticeMesh(Mesh {
                        patches: vec![],
                        triangles: decoder
                            .lattice(&data, ctx.get::<usize>(dict, VERTICES_PER_ROW)?),
                    }),
                    6 => ShadingKind::CoonsMesh(Mesh {
                        patches: decoder.patches(&data, false),
                        triangles: decoder.tessellate(&data, false),
                    }),
                    _ => ShadingKind::TensorMesh(Mesh {
                        patches: decoder.patches(&data, true),
                        triangles: decoder.tessellate(&data, true),
                    }),
                }
            }
            other => {
                warn!("unknown shading type {other}");

                return None;
            }
        };

        Some(Self {
            background: background(dict, ctx, &color_space),
            bbox: ctx
                .get::<[f64; 4]>(dict, BBOX)
                .map(|b| Rect::new(b[0], b[1], b[2], b[3]).abs()),
            anti_alias: ctx.get::<bool>(dict, ANTI_ALIAS).unwrap_or(false),
            color_space,
            kind,
        })
    }

    /// The color at `p`, given in shading space.
    ///
    /// Returns `None` where the shading does not paint, which includes
    /// points outside of the bounding box and non-extended areas.
    pub fn color_at(&self, p: Point) -> Option<AlphaColor> {
        if self.bbox.is_some_and(|b| !b.contains(p)) {
            return None;
        }

        match &self.kind {
            ShadingKind::FunctionBased {
                domain,
                matrix,
                functions,
                ..
            } => {
                let q = matrix.inverse() * p;
                let (x, y) = (q.x as f32, q.y as f32);

                if x < domain[0] || x > domain[1] || y < domain[2] || y > domain[3] {
                    return None;
                }

                let out = crate::function::eval_all(functions, &[x, y])?;

                Some(self.color_space.to_rgba(&out, 1.0))
            }
            ShadingKind::Axial {
                coords,
                extend,
                stops,
            } => {
                let [x0, y0, x1, y1] = coords.map(|c| c as f64);
                let d = Point::new(x1, y1) - Point::new(x0, y0);
                let len = d.hypot2();

                let s = if len == 0.0 {
                    0.0
                } else {
                    (p - Point::new(x0, y0)).dot(d) / len
                };

                sample(stops, extended(s as f32, *extend)?)
            }
            ShadingKind::Radial {
                coords,
                extend,
                stops,
            } => sample(stops, radial_parameter(coords, p, *extend)?),
            ShadingKind::FreeFormMesh(mesh)
            | ShadingKind::LatticeMesh(mesh)
            | ShadingKind::CoonsMesh(mesh)
            | ShadingKind::TensorMesh(mesh) => mesh
                .triangles
                .iter()
                .rev()
                .find_map(|t| t.color_at(p)),
        }
    }
}

/// The type of a shading, without loading it.
pub(crate) fn shading_type(obj: &Object, ctx: &LoadContext<'_>) -> Option<i64> {
    ctx.get::<i64>(ctx.deref(obj)?.as_dict()?, SHADING_TYPE)
}

/// The background color of a shading, without loading it.
pub(crate) fn background(
    dict: &Dict,
    ctx: &LoadContext<'_>,
    color_space: &ColorSpace,
) -> Option<AlphaColor> {
    ctx.get::<Vec<f32>>(dict, BACKGROUND)
        .map(|c| color_space.to_rgba(&c, 1.0))
}

fn function_based(
    dict: &Dict,
    ctx: &LoadContext<'_>,
    color_space: &ColorSpace,
    functions: Vec<Function>,
    quality: &ShadingQuality,
) -> Option<ShadingKind> {
    let domain = ctx
        .get::<[f32; 4]>(dict, DOMAIN)
        .unwrap_or([0.0, 1.0, 0.0, 1.0]);
    let matrix = ctx
        .get::<[f64; 6]>(dict, MATRIX)
        .map(Affine::new)
        .unwrap_or_default();

    let res = quality.function_resolution.clamp(1, 1024);
    let mut data = Vec::with_capacity(res as usize * res as usize * 4);

    for row in 0..res {
        let y = interpolate(row as f32 + 0.5, 0.0, res as f32, domain[3], domain[2]);

        for col in 0..res {
            let x = interpolate(col as f32 + 0.5, 0.0, res as f32, domain[0], domain[1]);
            let color = crate::function::eval_all(&functions, &[x, y])
                .map(|out| color_space.to_rgba(&out, 1.0))
                .unwrap_or(AlphaColor::TRANSPARENT);

            data.extend_from_slice(&color.to_premultiplied_rgba8());
        }
    }

    Some(ShadingKind::FunctionBased {
        domain,
        matrix,
        bitmap: Bitmap::new(res, res, data, true)?,
        functions,
    })
}

fn sample_stops(
    color_space: &ColorSpace,
    functions: &[Function],
    domain: [f32; 2],
    count: usize,
) -> Vec<GradientStop> {
    let count = count.clamp(32, 256);

    (0..count)
        .map(|i| {
            let offset = i as f32 / (count - 1) as f32;
            let t = interpolate(offset, 0.0, 1.0, domain[0], domain[1]);
            let color = crate::function::eval_all(functions, &[t])
                .map(|out| color_space.to_rgba(&out, 1.0))
                .unwrap_or(AlphaColor::TRANSPARENT);

            GradientStop { offset, color }
        })
        .collect()
}

/// Apply the extend flags to a gradient parameter.
fn extended(s: f32, extend: [bool; 2]) -> Option<f32> {
    if s < 0.0 {
        extend[0].then_some(0.0)
    } else if s > 1.0 {
        extend[1].then_some(1.0)
    } else {
        Some(s)
    }
}

fn sample(stops: &[GradientStop], s: f32) -> Option<AlphaColor> {
    let last = stops.len().checked_sub(1)?;
    let pos = s.clamp(0.0, 1.0) * last as f32;
    let idx = (pos.floor() as usize).min(last);
    let next = (idx + 1).min(last);
    let frac = pos - idx as f32;

    let a = stops[idx].color.components();
    let b = stops[next].color.components();

    Some(AlphaColor::new([0, 1, 2, 3].map(|i| a[i] + (b[i] - a[i]) * frac)))
}

/// Find the gradient parameter of the largest circle that passes through `p`.
fn radial_parameter(coords: &[f32; 6], p: Point, extend: [bool; 2]) -> Option<f32> {
    let [x0, y0, r0, x1, y1, r1] = coords.map(|c| c as f64);
    let cd = Point::new(x1, y1) - Point::new(x0, y0);
    let pd = p - Point::new(x0, y0);
    let dr = r1 - r0;

    let a = cd.hypot2() - dr * dr;
    let b = pd.dot(cd) + r0 * dr;
    let c = pd.hypot2() - r0 * r0;

    let candidates = if a.abs() < 1e-12 {
        if b.abs() < 1e-12 {
            return None;
        }

        [c / (2.0 * b), f64::NAN]
    } else {
        let disc = b * b - a * c;

        if disc < 0.0 {
            return None;
        }

        let root = disc.sqrt();
        let (s1, s2) = ((b + root) / a, (b - root) / a);

        [s1.max(s2), s1.min(s2)]
    };

    candidates
        .into_iter()
        .filter(|s| s.is_finite() && r0 + s * dr >= 0.0)
        .find_map(|s| extended(s as f32, extend))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DocumentCache;
    use crate::interpret::WarningSinkFn;
    use folio_syntax::object::ObjectStore;

    fn load(src: &[u8]) -> Option<Arc<Shading>> {
        let store = ObjectStore::new();
        let cache = DocumentCache::new();
        let sink: WarningSinkFn = Arc::new(|_| {});
        let ctx = LoadContext::new(&store, &cache, &sink);

        Shading::load(&Object::from_bytes(src)?, &ctx, &ShadingQuality::default())
    }

    fn gray(c: AlphaColor) -> u8 {
        c.to_rgba8()[0]
    }

    const RAMP: &str = "/Function << /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [1] /N 1 >>";

    #[test]
    fn axial() {
        let src = format!(
            "<< /ShadingType 2 /ColorSpace /DeviceGray /Coords [0 0 100 0] {RAMP} >>"
        );
        let shading = load(src.as_bytes()).unwrap();

        let ShadingKind::Axial { stops, .. } = &shading.kind else {
            panic!("expected an axial shading");
        };
        assert_eq!(stops.len(), 256);

        assert_eq!(gray(shading.color_at(Point::new(0.0, 50.0)).unwrap()), 0);
        assert_eq!(gray(shading.color_at(Point::new(50.0, 0.0)).unwrap()), 128);
        assert_eq!(gray(shading.color_at(Point::new(100.0, 0.0)).unwrap()), 255);
        assert!(shading.color_at(Point::new(150.0, 0.0)).is_none());
    }

    #[test]
    fn axial_extend() {
        let src = format!(
            "<< /ShadingType 2 /ColorSpace /DeviceGray /Coords [0 0 100 0] /Extend [true true] {RAMP} >>"
        );
        let shading = load(src.as_bytes()).unwrap();

        assert_eq!(gray(shading.color_at(Point::new(-50.0, 0.0)).unwrap()), 0);
        assert_eq!(gray(shading.color_at(Point::new(150.0, 0.0)).unwrap()), 255);
    }

    #[test]
    fn radial() {
        let src = format!(
            "<< /ShadingType 3 /ColorSpace /DeviceGray /Coords [0 0 0 0 0 100] {RAMP} >>"
        );
        let shading = load(src.as_bytes()).unwrap();

        assert_eq!(gray(shading.color_at(Point::new(0.0, 0.0)).unwrap()), 0);
        assert_eq!(gray(shading.color_at(Point::new(0.0, 50.0)).unwrap()), 128);
        assert!(shading.color_at(Point::new(0.0, 150.0)).is_none());
    }

    #[test]
    fn function_based() {
        let src = b"<< /ShadingType 1 /ColorSpace /DeviceGray /Domain [0 1 0 1]
            /Matrix [100 0 0 100 0 0]
            /Function << /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [1] /N 1 >> >>";
        let shading = load(src).unwrap();

        let ShadingKind::FunctionBased { bitmap, .. } = &shading.kind else {
            panic!("expected a function-based shading");
        };
        assert_eq!(bitmap.width(), 64);

        assert!(shading.color_at(Point::new(150.0, 50.0)).is_none());
        assert_eq!(gray(shading.color_at(Point::new(50.0, 50.0)).unwrap()), 128);
    }

    #[test]
    fn unknown_type() {
        let src = format!("<< /ShadingType 9 /ColorSpace /DeviceGray {RAMP} >>");

        assert!(load(src.as_bytes()).is_none());
    }

    #[test]
    fn background_and_bbox() {
        let src = format!(
            "<< /ShadingType 2 /ColorSpace /DeviceRGB /Coords [0 0 1 0] /Background [1 0 0]
                /BBox [0 0 10 10] /Function << /FunctionType 2 /Domain [0 1] /C0 [0 0 0] /C1 [1 1 1] /N 1 >> >>"
        );
        let shading = load(src.as_bytes()).unwrap();

        assert_eq!(shading.background.unwrap().to_rgba8(), [255, 0, 0, 255]);
        assert!(shading.color_at(Point::new(20.0, 0.0)).is_none());
    }
}
