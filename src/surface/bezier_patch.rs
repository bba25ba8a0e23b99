use nalgebra::{Matrix4, Point3, Vector3};
use simba::scalar::SupersetOf;

use crate::misc::{
    cubic_bernstein, cubic_bernstein_derivative, FloatingPoint, Transformable,
};

use super::ParametricSurface;

/// A single bicubic tensor-product Bezier patch over `[0, 1] x [0, 1]`.
///
/// Control points are indexed `control_points[i][j]` with `i` along u and `j`
/// along v. The patch is immutable once built; aggregates rebuild their
/// patches wholesale when the owning control grid changes.
///
/// The four corner evaluations equal the four corner control points exactly.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BezierPatch<T: FloatingPoint> {
    control_points: [[Point3<T>; 4]; 4],
}

impl<T: FloatingPoint> BezierPatch<T> {
    pub fn new(control_points: [[Point3<T>; 4]; 4]) -> Self {
        Self { control_points }
    }

    /// Build a patch from a row-major grid slice.
    /// # Failures
    /// - if the grid is not exactly 4x4
    pub fn try_from_grid(grid: &[Vec<Point3<T>>]) -> anyhow::Result<Self> {
        anyhow::ensure!(grid.len() == 4, "Expected 4 rows, got {}", grid.len());
        let mut control_points = [[Point3::origin(); 4]; 4];
        for (i, row) in grid.iter().enumerate() {
            anyhow::ensure!(row.len() == 4, "Expected 4 columns, got {}", row.len());
            for (j, p) in row.iter().enumerate() {
                control_points[i][j] = *p;
            }
        }
        Ok(Self { control_points })
    }

    pub fn control_points(&self) -> &[[Point3<T>; 4]; 4] {
        &self.control_points
    }

    /// Tensor-product sum of the given u/v basis values over the control grid.
    fn weighted_sum(&self, bu: &[T; 4], bv: &[T; 4]) -> Vector3<T> {
        let mut acc = Vector3::zeros();
        for i in 0..4 {
            let mut row = Vector3::zeros();
            for j in 0..4 {
                row += self.control_points[i][j].coords * bv[j];
            }
            acc += row * bu[i];
        }
        acc
    }

    /// Cast the patch to another scalar type.
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> BezierPatch<F> {
        let mut control_points = [[Point3::origin(); 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                control_points[i][j] = self.control_points[i][j].cast();
            }
        }
        BezierPatch { control_points }
    }
}

impl<T: FloatingPoint> ParametricSurface<T> for BezierPatch<T> {
    fn point_at(&self, u: T, v: T) -> Point3<T> {
        Point3::from(self.weighted_sum(&cubic_bernstein(u), &cubic_bernstein(v)))
    }

    fn u_tangent_at(&self, u: T, v: T) -> Vector3<T> {
        self.weighted_sum(&cubic_bernstein_derivative(u), &cubic_bernstein(v))
    }

    fn v_tangent_at(&self, u: T, v: T) -> Vector3<T> {
        self.weighted_sum(&cubic_bernstein(u), &cubic_bernstein_derivative(v))
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

/// Enable to transform a Bezier patch by a given 4x4 matrix
impl<'a, T: FloatingPoint> Transformable<&'a Matrix4<T>> for BezierPatch<T> {
    fn transform(&mut self, transform: &'a Matrix4<T>) {
        for row in self.control_points.iter_mut() {
            for p in row.iter_mut() {
                *p = transform.transform_point(p);
            }
        }
    }
}
