use nalgebra::{Matrix4, Point3, Vector3};

use crate::misc::{FloatingPoint, Transformable};

use super::{BezierPatch, ParametricSurface};

/// A rectangular Gregory patch.
///
/// Shares the 12 boundary control points of a bicubic Bezier patch, but each
/// of the four interior points is a pair of candidates, one per adjoining
/// boundary direction, blended rationally by the evaluation parameter. The
/// split lets neighboring patches prescribe independent cross-boundary
/// derivative vectors along each of the two edges meeting at a corner, which
/// is what makes the patch usable as a fill-in around an irregular
/// (non-4-sided) vertex. Continuity across such a vertex is approximate C1.
///
/// Corner order for the interior pairs: `(0,0), (0,1), (1,0), (1,1)` in
/// `(u, v)`; in each pair the first candidate belongs to the u-running edge,
/// the second to the v-running edge.
#[derive(Clone, Debug, PartialEq)]
pub struct GregoryPatch<T: FloatingPoint> {
    boundary: [[Point3<T>; 4]; 4],
    interior: [[Point3<T>; 2]; 4],
}

impl<T: FloatingPoint> GregoryPatch<T> {
    pub fn new(boundary: [[Point3<T>; 4]; 4], interior: [[Point3<T>; 2]; 4]) -> Self {
        Self { boundary, interior }
    }

    /// Degenerate a plain Bezier patch into a Gregory patch: both candidates
    /// of every interior pair coincide with the Bezier interior point, so the
    /// result reproduces the input patch exactly.
    pub fn from_bezier(patch: &BezierPatch<T>) -> Self {
        let cp = patch.control_points();
        Self {
            boundary: *cp,
            interior: [
                [cp[1][1], cp[1][1]],
                [cp[1][2], cp[1][2]],
                [cp[2][1], cp[2][1]],
                [cp[2][2], cp[2][2]],
            ],
        }
    }

    pub fn boundary(&self) -> &[[Point3<T>; 4]; 4] {
        &self.boundary
    }

    pub fn interior(&self) -> &[[Point3<T>; 2]; 4] {
        &self.interior
    }

    /// The effective 4x4 Bezier grid at `(u, v)`: boundary points as-is, the
    /// four interior points blended with corner-local weights.
    fn effective_patch(&self, u: T, v: T) -> BezierPatch<T> {
        let mut cp = self.boundary;
        let w = T::one();
        cp[1][1] = blend(&self.interior[0], u, v);
        cp[1][2] = blend(&self.interior[1], u, w - v);
        cp[2][1] = blend(&self.interior[2], w - u, v);
        cp[2][2] = blend(&self.interior[3], w - u, w - v);
        BezierPatch::new(cp)
    }
}

/// Rational corner blend `(wu * a + wv * b) / (wu + wv)`, collapsing to the
/// candidate average at the corner itself where both weights vanish.
fn blend<T: FloatingPoint>(pair: &[Point3<T>; 2], wu: T, wv: T) -> Point3<T> {
    let denom = wu + wv;
    if denom <= T::default_epsilon() {
        Point3::from((pair[0].coords + pair[1].coords) * T::from_f64(0.5).unwrap())
    } else {
        Point3::from((pair[0].coords * wu + pair[1].coords * wv) / denom)
    }
}

impl<T: FloatingPoint> ParametricSurface<T> for GregoryPatch<T> {
    fn point_at(&self, u: T, v: T) -> Point3<T> {
        self.effective_patch(u, v).point_at(u, v)
    }

    /// Tangents treat the blended interior points as frozen at `(u, v)`;
    /// the contribution of the blend weights' own derivative is dropped,
    /// which keeps the derivative contract closed-form at the cost of the
    /// patch being only approximately C1.
    fn u_tangent_at(&self, u: T, v: T) -> Vector3<T> {
        self.effective_patch(u, v).u_tangent_at(u, v)
    }

    fn v_tangent_at(&self, u: T, v: T) -> Vector3<T> {
        self.effective_patch(u, v).v_tangent_at(u, v)
    }

    fn max_u(&self) -> T {
        T::one()
    }

    fn max_v(&self) -> T {
        T::one()
    }

    fn is_u_clamped(&self) -> bool {
        true
    }

    fn is_v_clamped(&self) -> bool {
        true
    }
}

impl<'a, T: FloatingPoint> Transformable<&'a Matrix4<T>> for GregoryPatch<T> {
    fn transform(&mut self, transform: &'a Matrix4<T>) {
        for row in self.boundary.iter_mut() {
            for p in row.iter_mut() {
                *p = transform.transform_point(p);
            }
        }
        for pair in self.interior.iter_mut() {
            for p in pair.iter_mut() {
                *p = transform.transform_point(p);
            }
        }
    }
}
