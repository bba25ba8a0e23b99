use nalgebra::{Matrix4, Point3, Vector3};
use simba::scalar::SupersetOf;

use crate::convert::de_boor_grid_to_bezier;
use crate::misc::{FloatingPoint, Invertible, Transformable};
use crate::trim::TrimmingMask;

use super::{BezierPatch, ParametricSurface};

/// Continuity class of a patch surface's control grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PatchContinuity {
    /// The grid holds Bezier control points directly; adjacent patches share
    /// boundary points only (positional continuity).
    C0,
    /// The grid holds de Boor points of a uniform cubic B-spline; patches are
    /// carved from the converted Bezier grid (curvature continuity).
    C2,
}

/// A tensor-product surface aggregate built from a 2D control grid.
///
/// The grid is partitioned into bicubic Bezier patches: disjoint 4x4 blocks
/// advancing by 3 for C0 grids, the de Boor -> Bezier conversion followed by
/// the same partition for C2 grids. A surface may be closed in the v
/// (column) direction, in which case the partition wraps around the last
/// column back to the first; the seam needs no mirrored control points.
///
/// The parameter domain is `[0, u_spans] x [0, v_spans]`, one unit per patch.
///
/// Patches are derived state: after mutating control points, call
/// [`PatchSurface::rebuild`] before evaluating again. Nothing is recomputed
/// implicitly.
#[derive(Clone, Debug)]
pub struct PatchSurface<T: FloatingPoint> {
    control_points: Vec<Vec<Point3<T>>>,
    continuity: PatchContinuity,
    v_periodic: bool,
    u_spans: usize,
    v_spans: usize,
    patches: Vec<BezierPatch<T>>,
    trims: Vec<TrimmingMask>,
}

impl<T: FloatingPoint> PatchSurface<T> {
    /// Open C0 surface: the grid holds Bezier points, `(rows - 1)` and
    /// `(cols - 1)` must both be multiples of 3 with at least one span each.
    pub fn try_c0(control_points: Vec<Vec<Point3<T>>>) -> anyhow::Result<Self> {
        Self::try_new(control_points, PatchContinuity::C0, false)
    }

    /// C0 surface closed in the v direction: `cols` must be a positive
    /// multiple of 3; the last patch window wraps onto the first column.
    pub fn try_c0_periodic(control_points: Vec<Vec<Point3<T>>>) -> anyhow::Result<Self> {
        Self::try_new(control_points, PatchContinuity::C0, true)
    }

    /// Open C2 surface from a de Boor grid. The grid is padded by end-point
    /// duplication during conversion, so any non-empty grid is accepted and
    /// the surface interpolates the corner de Boor points.
    pub fn try_c2(control_points: Vec<Vec<Point3<T>>>) -> anyhow::Result<Self> {
        Self::try_new(control_points, PatchContinuity::C2, false)
    }

    /// C2 surface closed in the v direction; needs at least 3 columns for a
    /// sensible closed loop.
    pub fn try_c2_periodic(control_points: Vec<Vec<Point3<T>>>) -> anyhow::Result<Self> {
        Self::try_new(control_points, PatchContinuity::C2, true)
    }

    pub fn try_new(
        control_points: Vec<Vec<Point3<T>>>,
        continuity: PatchContinuity,
        v_periodic: bool,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!control_points.is_empty(), "Empty control grid");
        let cols = control_points[0].len();
        anyhow::ensure!(cols > 0, "Empty control grid row");
        anyhow::ensure!(
            control_points.iter().all(|row| row.len() == cols),
            "Control grid rows have inconsistent lengths"
        );

        let rows = control_points.len();
        match continuity {
            PatchContinuity::C0 => {
                anyhow::ensure!(
                    rows >= 4 && (rows - 1) % 3 == 0,
                    "A C0 grid needs 3n + 1 rows, got {}",
                    rows
                );
                if v_periodic {
                    anyhow::ensure!(
                        cols >= 3 && cols % 3 == 0,
                        "A periodic C0 grid needs 3n columns, got {}",
                        cols
                    );
                } else {
                    anyhow::ensure!(
                        cols >= 4 && (cols - 1) % 3 == 0,
                        "A C0 grid needs 3n + 1 columns, got {}",
                        cols
                    );
                }
            }
            PatchContinuity::C2 => {
                if v_periodic {
                    anyhow::ensure!(
                        cols >= 3,
                        "A periodic C2 grid needs at least 3 columns, got {}",
                        cols
                    );
                }
            }
        }

        let mut surface = Self {
            control_points,
            continuity,
            v_periodic,
            u_spans: 0,
            v_spans: 0,
            patches: vec![],
            trims: vec![],
        };
        surface.rebuild();
        Ok(surface)
    }

    /// Recompute the patch list from the current control grid. Must be called
    /// after control-point edits; evaluation never rebuilds implicitly.
    pub fn rebuild(&mut self) {
        let bezier: Vec<Vec<Point3<T>>> = match self.continuity {
            PatchContinuity::C0 => self.control_points.clone(),
            PatchContinuity::C2 => de_boor_grid_to_bezier(&self.control_points, self.v_periodic),
        };

        let rows = bezier.len();
        let cols = bezier[0].len();
        let wrap_columns = self.v_periodic && self.continuity == PatchContinuity::C0;
        self.u_spans = (rows - 1) / 3;
        self.v_spans = if wrap_columns {
            cols / 3
        } else {
            (cols - 1) / 3
        };

        let mut patches = Vec::with_capacity(self.u_spans * self.v_spans);
        for pu in 0..self.u_spans {
            for pv in 0..self.v_spans {
                let mut window = [[Point3::origin(); 4]; 4];
                for i in 0..4 {
                    for j in 0..4 {
                        let col = if wrap_columns {
                            (3 * pv + j) % cols
                        } else {
                            3 * pv + j
                        };
                        window[i][j] = bezier[3 * pu + i][col];
                    }
                }
                patches.push(BezierPatch::new(window));
            }
        }
        self.patches = patches;
    }

    pub fn control_points(&self) -> &Vec<Vec<Point3<T>>> {
        &self.control_points
    }

    /// Overwrite one control point. The caller owns the edit operation and
    /// must invoke [`PatchSurface::rebuild`] once the edit batch is done.
    pub fn set_control_point(&mut self, row: usize, column: usize, point: Point3<T>) {
        self.control_points[row][column] = point;
    }

    pub fn continuity(&self) -> PatchContinuity {
        self.continuity
    }

    pub fn u_spans(&self) -> usize {
        self.u_spans
    }

    pub fn v_spans(&self) -> usize {
        self.v_spans
    }

    pub fn patches(&self) -> &[BezierPatch<T>] {
        &self.patches
    }

    /// Register a trim mask. A point survives trimming only if every active
    /// mask keeps it; the excluded region is the union of the masks'
    /// excluded regions.
    pub fn add_trimming_mask(&mut self, mask: TrimmingMask) {
        self.trims.push(mask);
    }

    pub fn trimming_masks(&self) -> &[TrimmingMask] {
        &self.trims
    }

    pub fn trimming_masks_mut(&mut self) -> &mut [TrimmingMask] {
        &mut self.trims
    }

    pub fn clear_trimming_masks(&mut self) {
        self.trims.clear();
    }

    /// Cast the surface to another scalar type. Trim masks carry over
    /// unchanged (they live in normalized parameter space).
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> PatchSurface<F> {
        let control_points = self
            .control_points
            .iter()
            .map(|row| row.iter().map(|p| p.cast()).collect())
            .collect();
        let mut cast = PatchSurface {
            control_points,
            continuity: self.continuity,
            v_periodic: self.v_periodic,
            u_spans: 0,
            v_spans: 0,
            patches: vec![],
            trims: self.trims.clone(),
        };
        cast.rebuild();
        cast
    }

    /// Resolve a constrained global parameter pair to a patch plus local
    /// parameters. `u == max_u` folds onto the last span so the boundary is
    /// evaluable. The patch linear index is always `pu * v_spans + pv`; every
    /// evaluation entry point shares this one derivation.
    fn locate(&self, u: T, v: T) -> (&BezierPatch<T>, T, T) {
        let u = self.clamp_u(u);
        let v = self.clamp_v(v);
        let (pu, lu) = split_span(u, self.u_spans);
        let (pv, lv) = split_span(v, self.v_spans);
        (&self.patches[pu * self.v_spans + pv], lu, lv)
    }

    /// Whether the active trim masks keep the constrained point `(u, v)`.
    fn trimming_keeps(&self, u: T, v: T) -> bool {
        if self.trims.is_empty() {
            return true;
        }
        let nu = u / self.max_u();
        let nv = v / self.max_v();
        self.trims.iter().all(|mask| mask.contains(nu, nv))
    }
}

/// Split a constrained parameter into a span index and a local parameter,
/// folding the upper domain boundary onto the last span.
fn split_span<T: FloatingPoint>(t: T, spans: usize) -> (usize, T) {
    let mut index = t.floor().to_usize().unwrap_or(0);
    if index >= spans {
        index = spans - 1;
    }
    (index, t - T::from_usize(index).unwrap())
}

impl<T: FloatingPoint> ParametricSurface<T> for PatchSurface<T> {
    fn point_at(&self, u: T, v: T) -> Point3<T> {
        let (patch, lu, lv) = self.locate(u, v);
        patch.point_at(lu, lv)
    }

    fn u_tangent_at(&self, u: T, v: T) -> Vector3<T> {
        let (patch, lu, lv) = self.locate(u, v);
        patch.u_tangent_at(lu, lv)
    }

    fn v_tangent_at(&self, u: T, v: T) -> Vector3<T> {
        let (patch, lu, lv) = self.locate(u, v);
        patch.v_tangent_at(lu, lv)
    }

    fn trimmed_point_at(&self, u: T, v: T) -> Option<Point3<T>> {
        let u = self.clamp_u(u);
        let v = self.clamp_v(v);
        if !self.trimming_keeps(u, v) {
            return None;
        }
        Some(self.point_at(u, v))
    }

    fn max_u(&self) -> T {
        T::from_usize(self.u_spans).unwrap()
    }

    fn max_v(&self) -> T {
        T::from_usize(self.v_spans).unwrap()
    }

    fn is_u_clamped(&self) -> bool {
        true
    }

    fn is_v_clamped(&self) -> bool {
        !self.v_periodic
    }
}

/// Enable to transform a patch surface by a given 4x4 matrix
impl<'a, T: FloatingPoint> Transformable<&'a Matrix4<T>> for PatchSurface<T> {
    fn transform(&mut self, transform: &'a Matrix4<T>) {
        for row in self.control_points.iter_mut() {
            for p in row.iter_mut() {
                *p = transform.transform_point(p);
            }
        }
        self.rebuild();
    }
}

impl<T: FloatingPoint> Invertible for PatchSurface<T> {
    /// Reverse the v direction of the control grid, flipping the surface
    /// normal. Active trim masks are dropped since their parameterization no
    /// longer applies.
    fn invert(&mut self) {
        for row in self.control_points.iter_mut() {
            row.reverse();
        }
        self.trims.clear();
        self.rebuild();
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::*;
    use serde::de::Error;

    /// Persisted form: raw control grid plus topology. Patches and any
    /// converted Bezier grid are always recomputed, never stored.
    #[derive(serde::Serialize, serde::Deserialize)]
    struct RawPatchSurface<T: FloatingPoint> {
        control_points: Vec<Vec<Point3<T>>>,
        continuity: PatchContinuity,
        v_periodic: bool,
    }

    impl<T: FloatingPoint + serde::Serialize> serde::Serialize for PatchSurface<T> {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            RawPatchSurface {
                control_points: self.control_points.clone(),
                continuity: self.continuity,
                v_periodic: self.v_periodic,
            }
            .serialize(serializer)
        }
    }

    impl<'de, T: FloatingPoint + serde::Deserialize<'de>> serde::Deserialize<'de>
        for PatchSurface<T>
    {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let raw = RawPatchSurface::<T>::deserialize(deserializer)?;
            PatchSurface::try_new(raw.control_points, raw.continuity, raw.v_periodic)
                .map_err(D::Error::custom)
        }
    }
}
