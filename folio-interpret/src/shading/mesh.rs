//! Decoding of mesh shadings (types 4 to 7).

use crate::color::{AlphaColor, ColorComponents, ColorSpace};
use crate::function::{Function, eval_all};
use folio_common::bit::BitReader;
use kurbo::Point;
use smallvec::SmallVec;

/// A vertex of a mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    /// The position in shading space.
    pub point: Point,
    /// The color at this vertex.
    pub color: AlphaColor,
}

/// A triangle whose color is interpolated between its vertices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    /// The vertices.
    pub vertices: [Vertex; 3],
}

impl Triangle {
    /// The color at `p`, or `None` if `p` is not inside the triangle.
    pub fn color_at(&self, p: Point) -> Option<AlphaColor> {
        let [a, b, c] = self.vertices.map(|v| v.point);
        let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);

        if det.abs() < 1e-12 {
            return None;
        }

        let l0 = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / det;
        let l1 = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / det;
        let l2 = 1.0 - l0 - l1;
        let eps = -1e-9;

        if l0 < eps || l1 < eps || l2 < eps {
            return None;
        }

        let weights = [l0 as f32, l1 as f32, l2 as f32];
        let mut out = [0.0; 4];

        for (v, w) in self.vertices.iter().zip(weights) {
            for (o, c) in out.iter_mut().zip(v.color.components()) {
                *o += c * w;
            }
        }

        Some(AlphaColor::new(out))
    }
}

/// A bicubic patch of a Coons or tensor-product mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct Patch {
    /// The 16 control points, `points[i][j]` being `p_ij` with `i` running
    /// along `u` and `j` along `v`. For Coons patches, the inner four are
    /// derived from the boundary.
    pub points: [[Point; 4]; 4],
    /// The corner colors at `p00`, `p03`, `p33` and `p30`.
    pub colors: [AlphaColor; 4],
}

/// The boundary of a patch in stream order.
const BOUNDARY: [(usize, usize); 12] = [
    (0, 0),
    (0, 1),
    (0, 2),
    (0, 3),
    (1, 3),
    (2, 3),
    (3, 3),
    (3, 2),
    (3, 1),
    (3, 0),
    (2, 0),
    (1, 0),
];

/// The inner points of a tensor-product patch in stream order.
const INNER: [(usize, usize); 4] = [(1, 1), (1, 2), (2, 2), (2, 1)];

/// The number of subdivisions per patch side when tessellating.
const PATCH_GRID: usize = 8;

/// Meshes with more elements than this are truncated.
const MAX_ELEMENTS: usize = 1 << 18;

/// The sample layout of a mesh stream.
pub(crate) struct MeshLayout {
    pub(crate) bits_per_coordinate: u8,
    pub(crate) bits_per_component: u8,
    pub(crate) bits_per_flag: u8,
    /// `[xmin xmax ymin ymax c1min c1max ...]`.
    pub(crate) decode: Vec<f32>,
}

/// Turns raw mesh samples into colored geometry.
pub(crate) struct MeshDecoder<'a> {
    pub(crate) layout: MeshLayout,
    pub(crate) color_space: &'a ColorSpace,
    pub(crate) functions: &'a [Function],
}

#[derive(Clone)]
struct RawVertex {
    point: Point,
    comps: ColorComponents,
}

#[derive(Clone)]
struct RawPatch {
    points: [[Point; 4]; 4],
    comps: [ColorComponents; 4],
}

impl MeshDecoder<'_> {
    fn color(&self, comps: &[f32]) -> AlphaColor {
        if self.functions.is_empty() {
            self.color_space.to_rgba(comps, 1.0)
        } else {
            match eval_all(self.functions, comps) {
                Some(out) => self.color_space.to_rgba(&out, 1.0),
                None => AlphaColor::TRANSPARENT,
            }
        }
    }

    fn vertex(&self, raw: &RawVertex) -> Vertex {
        Vertex {
            point: raw.point,
            color: self.color(&raw.comps),
        }
    }

    fn num_components(&self) -> usize {
        if self.functions.is_empty() {
            self.color_space.num_components()
        } else {
            1
        }
    }

    fn read_flag(&self, r: &mut BitReader<'_>) -> Option<u32> {
        r.read(self.layout.bits_per_flag)
    }

    fn read_point(&self, r: &mut BitReader<'_>) -> Option<Point> {
        let d = &self.layout.decode;
        let bits = self.layout.bits_per_coordinate;
        let x = r.read_scaled(bits, *d.first()?, *d.get(1)?)?;
        let y = r.read_scaled(bits, *d.get(2)?, *d.get(3)?)?;

        Some(Point::new(x as f64, y as f64))
    }

    fn read_color(&self, r: &mut BitReader<'_>) -> Option<ColorComponents> {
        let d = &self.layout.decode;
        let bits = self.layout.bits_per_component;

        (0..self.num_components())
            .map(|i| r.read_scaled(bits, *d.get(4 + 2 * i)?, *d.get(5 + 2 * i)?))
            .collect()
    }

    fn read_vertex(&self, r: &mut BitReader<'_>) -> Option<RawVertex> {
        Some(RawVertex {
            point: self.read_point(r)?,
            comps: self.read_color(r)?,
        })
    }

    /// Decode a free-form triangle mesh (type 4).
    pub(crate) fn free_form(&self, data: &[u8]) -> Vec<Triangle> {
        let mut r = BitReader::new(data);
        let mut triangles = vec![];
        let mut prev: Option<[RawVertex; 3]> = None;

        while triangles.len() < MAX_ELEMENTS {
            let Some(flag) = self.read_flag(&mut r) else {
                break;
            };
            let Some(v) = self.read_vertex(&mut r) else {
                break;
            };
            r.align();

            let next = match (flag, prev.take()) {
                (0, _) => {
                    let mut read_more = || {
                        let _ = self.read_flag(&mut r)?;
                        let v = self.read_vertex(&mut r)?;
                        r.align();
                        Some(v)
                    };

                    let (Some(b), Some(c)) = (read_more(), read_more()) else {
                        break;
                    };

                    [v, b, c]
                }
                (1, Some([_, b, c])) => [b, c, v],
                (2, Some([a, _, c])) => [a, c, v],
                _ => break,
            };

            triangles.push(Triangle {
                vertices: [
                    self.vertex(&next[0]),
                    self.vertex(&next[1]),
                    self.vertex(&next[2]),
                ],
            });
            prev = Some(next);
        }

        triangles
    }

    /// Decode a lattice-form triangle mesh (type 5).
    pub(crate) fn lattice(&self, data: &[u8], vertices_per_row: usize) -> Vec<Triangle> {
        if vertices_per_row < 2 {
            return vec![];
        }

        let mut r = BitReader::new(data);
        let mut rows: Vec<Vec<Vertex>> = vec![];

        'outer: while rows.len() * vertices_per_row < MAX_ELEMENTS {
            let mut row = Vec::with_capacity(vertices_per_row);

            for _ in 0..vertices_per_row {
                let Some(v) = self.read_vertex(&mut r) else {
                    break 'outer;
                };
                r.align();
                row.push(self.vertex(&v));
            }

            rows.push(row);
        }

        let mut triangles = vec![];

        for pair in rows.windows(2) {
            let (top, bottom) = (&pair[0], &pair[1]);

            for j in 0..vertices_per_row - 1 {
                triangles.push(Triangle {
                    vertices: [top[j], bottom[j], top[j + 1]],
                });
                triangles.push(Triangle {
                    vertices: [bottom[j + 1], bottom[j], top[j + 1]],
                });
            }
        }

        triangles
    }

    /// Decode a Coons (type 6) or tensor-product (type 7) patch mesh.
    pub(crate) fn patches(&self, data: &[u8], tensor: bool) -> Vec<Patch> {
        let mut r = BitReader::new(data);
        let mut patches = vec![];
        let mut prev: Option<RawPatch> = None;

        while patches.len() < MAX_ELEMENTS {
            let Some(flag) = self.read_flag(&mut r) else {
                break;
            };
            let Some(raw) = self.read_patch(&mut r, flag, prev.as_ref(), tensor) else {
                break;
            };
            r.align();

            patches.push(Patch {
                points: raw.points,
                colors: [
                    self.color(&raw.comps[0]),
                    self.color(&raw.comps[1]),
                    self.color(&raw.comps[2]),
                    self.color(&raw.comps[3]),
                ],
            });
            prev = Some(raw);
        }

        patches
    }

    fn read_patch(
        &self,
        r: &mut BitReader<'_>,
        flag: u32,
        prev: Option<&RawPatch>,
        tensor: bool,
    ) -> Option<RawPatch> {
        let mut boundary = [Point::ZERO; 12];
        let mut comps: [ColorComponents; 4] = Default::default();

        let shared = match flag {
            0 => 0,
            1..=3 => {
                let prev = prev?;
                let at = |k: usize| {
                    let (i, j) = BOUNDARY[k % 12];
                    prev.points[i][j]
                };
                let (start, c0, c1) = match flag {
                    1 => (3, 1, 2),
                    2 => (6, 2, 3),
                    _ => (9, 3, 0),
                };

                for (k, slot) in boundary.iter_mut().take(4).enumerate() {
                    *slot = at(start + k);
                }

                comps[0] = prev.comps[c0].clone();
                comps[1] = prev.comps[c1].clone();

                4
            }
            _ => return None,
        };

        for slot in boundary.iter_mut().skip(shared) {
            *slot = self.read_point(r)?;
        }

        let mut points = [[Point::ZERO; 4]; 4];

        for (k, (i, j)) in BOUNDARY.iter().enumerate() {
            points[*i][*j] = boundary[k];
        }

        if tensor {
            for (i, j) in INNER {
                points[i][j] = self.read_point(r)?;
            }
        } else {
            coons_inner_points(&mut points);
        }

        let first_color = if shared == 0 { 0 } else { 2 };

        for slot in comps.iter_mut().skip(first_color) {
            *slot = self.read_color(r)?;
        }

        Some(RawPatch { points, comps })
    }

    /// Split patches into triangles, interpolating the corner colors
    /// bilinearly before converting them.
    pub(crate) fn tessellate(&self, data: &[u8], tensor: bool) -> Vec<Triangle> {
        // The raw colors are needed to interpolate before any function is
        // applied, so the stream is read a second time.
        let mut r = BitReader::new(data);
        let mut prev: Option<RawPatch> = None;
        let mut triangles = vec![];

        while triangles.len() < MAX_ELEMENTS {
            let Some(flag) = self.read_flag(&mut r) else {
                break;
            };
            let Some(raw) = self.read_patch(&mut r, flag, prev.as_ref(), tensor) else {
                break;
            };
            r.align();

            self.tessellate_patch(&raw, &mut triangles);
            prev = Some(raw);
        }

        triangles
    }

    fn tessellate_patch(&self, patch: &RawPatch, out: &mut Vec<Triangle>) {
        let n = PATCH_GRID;
        let mut grid: SmallVec<[Vertex; 81]> = SmallVec::new();

        for a in 0..=n {
            let u = a as f64 / n as f64;

            for b in 0..=n {
                let v = b as f64 / n as f64;
                let point = eval_patch(&patch.points, u, v);
                let comps = bilinear(&patch.comps, u as f32, v as f32);

                grid.push(Vertex {
                    point,
                    color: self.color(&comps),
                });
            }
        }

        let at = |a: usize, b: usize| grid[a * (n + 1) + b];

        for a in 0..n {
            for b in 0..n {
                out.push(Triangle {
                    vertices: [at(a, b), at(a + 1, b), at(a, b + 1)],
                });
                out.push(Triangle {
                    vertices: [at(a + 1, b + 1), at(a + 1, b), at(a, b + 1)],
                });
            }
        }
    }
}

/// Derive the inner control points of a Coons patch from its boundary.
fn coons_inner_points(p: &mut [[Point; 4]; 4]) {
    let v = |i: usize, j: usize| p[i][j].to_vec2();

    let p11 = (v(0, 0) * -4.0 + (v(0, 1) + v(1, 0)) * 6.0 - (v(0, 3) + v(3, 0)) * 2.0
        + (v(1, 3) + v(3, 1)) * 3.0
        - v(3, 3))
        / 9.0;
    let p12 = (v(0, 3) * -4.0 + (v(0, 2) + v(1, 3)) * 6.0 - (v(0, 0) + v(3, 3)) * 2.0
        + (v(1, 0) + v(3, 2)) * 3.0
        - v(3, 0))
        / 9.0;
    let p22 = (v(3, 3) * -4.0 + (v(3, 2) + v(2, 3)) * 6.0 - (v(3, 0) + v(0, 3)) * 2.0
        + (v(2, 0) + v(0, 2)) * 3.0
        - v(0, 0))
        / 9.0;
    let p21 = (v(3, 0) * -4.0 + (v(2, 0) + v(3, 1)) * 6.0 - (v(0, 0) + v(3, 3)) * 2.0
        + (v(2, 3) + v(0, 1)) * 3.0
        - v(0, 3))
        / 9.0;

    p[1][1] = p11.to_point();
    p[1][2] = p12.to_point();
    p[2][2] = p22.to_point();
    p[2][1] = p21.to_point();
}

fn bernstein(t: f64) -> [f64; 4] {
    let s = 1.0 - t;

    [s * s * s, 3.0 * t * s * s, 3.0 * t * t * s, t * t * t]
}

fn eval_patch(p: &[[Point; 4]; 4], u: f64, v: f64) -> Point {
    let bu = bernstein(u);
    let bv = bernstein(v);
    let mut out = kurbo::Vec2::ZERO;

    for i in 0..4 {
        for j in 0..4 {
            out += p[i][j].to_vec2() * (bu[i] * bv[j]);
        }
    }

    out.to_point()
}

/// Interpolate the corner colors `c00`, `c03`, `c33`, `c30`.
fn bilinear(c: &[ColorComponents; 4], u: f32, v: f32) -> ColorComponents {
    let weights = [(1.0 - u) * (1.0 - v), (1.0 - u) * v, u * v, u * (1.0 - v)];
    let n = c.iter().map(|c| c.len()).min().unwrap_or(0);

    (0..n)
        .map(|k| c.iter().zip(weights).map(|(c, w)| c[k] * w).sum())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder(color_space: &ColorSpace, bits_per_flag: u8) -> MeshDecoder<'_> {
        MeshDecoder {
            layout: MeshLayout {
                bits_per_coordinate: 8,
                bits_per_component: 8,
                bits_per_flag,
                decode: vec![0.0, 255.0, 0.0, 255.0, 0.0, 1.0],
            },
            color_space,
            functions: &[],
        }
    }

    #[test]
    fn free_form_strip() {
        let gray = ColorSpace::device_gray();
        let d = decoder(&gray, 8);
        let data = [
            0, 0, 0, 0, //
            0, 10, 0, 255, //
            0, 0, 10, 0, //
            1, 10, 10, 255, //
        ];
        let triangles = d.free_form(&data);

        assert_eq!(triangles.len(), 2);
        assert_eq!(triangles[1].vertices[0].point, Point::new(10.0, 0.0));
        assert_eq!(triangles[1].vertices[2].point, Point::new(10.0, 10.0));
    }

    #[test]
    fn barycentric() {
        let gray = ColorSpace::device_gray();
        let d = decoder(&gray, 8);
        let data = [0, 0, 0, 0, 0, 10, 0, 255, 0, 0, 10, 255];
        let t = d.free_form(&data)[0];

        assert!(t.color_at(Point::new(20.0, 20.0)).is_none());
        let c = t.color_at(Point::new(5.0, 5.0)).unwrap().components();
        assert!((c[0] - 1.0).abs() < 1e-4);
        let c = t.color_at(Point::new(1.0, 1.0)).unwrap().components();
        assert!((c[0] - 0.2).abs() < 1e-4);
    }

    #[test]
    fn lattice() {
        let gray = ColorSpace::device_gray();
        let d = decoder(&gray, 8);
        // Two rows of three vertices.
        let data = [0, 0, 0, 5, 0, 0, 10, 0, 0, 0, 5, 0, 5, 5, 0, 10, 5, 0];

        assert_eq!(d.lattice(&data, 3).len(), 4);
        assert!(d.lattice(&data, 1).is_empty());
    }

    fn square_patch(flag: u8) -> Vec<u8> {
        let mut data = vec![flag];
        let boundary: [(u8, u8); 12] = [
            (0, 0),
            (0, 10),
            (0, 20),
            (0, 30),
            (10, 30),
            (20, 30),
            (30, 30),
            (30, 20),
            (30, 10),
            (30, 0),
            (20, 0),
            (10, 0),
        ];

        let skip = if flag == 0 { 0 } else { 4 };
        boundary.iter().skip(skip).for_each(|(x, y)| data.extend([*x, *y]));
        data.extend(if flag == 0 { vec![0, 85, 170, 255] } else { vec![170, 255] });

        data
    }

    #[test]
    fn coons_inner_points_of_a_square() {
        let gray = ColorSpace::device_gray();
        let d = decoder(&gray, 8);
        let patches = d.patches(&square_patch(0), false);

        assert_eq!(patches.len(), 1);
        let p = patches[0].points;
        assert!((p[1][1] - Point::new(10.0, 10.0)).hypot() < 1e-9);
        assert!((p[2][2] - Point::new(20.0, 20.0)).hypot() < 1e-9);
    }

    #[test]
    fn shared_edges() {
        let gray = ColorSpace::device_gray();
        let d = decoder(&gray, 8);
        let mut data = square_patch(0);
        data.extend(square_patch(1));
        let patches = d.patches(&data, false);

        assert_eq!(patches.len(), 2);
        // The second patch starts at the edge p03..p33 of the first one.
        assert_eq!(patches[1].points[0][0], patches[0].points[0][3]);
        assert_eq!(patches[1].colors[0], patches[0].colors[1]);

        let triangles = d.tessellate(&data, false);
        assert_eq!(triangles.len(), 2 * 2 * PATCH_GRID * PATCH_GRID);
    }

    #[test]
    fn orphaned_flag_stops_decoding() {
        let gray = ColorSpace::device_gray();
        let d = decoder(&gray, 8);

        assert!(d.patches(&square_patch(2), false).is_empty());
    }
}
