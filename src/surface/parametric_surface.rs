use nalgebra::{Point3, Vector3};

use crate::misc::FloatingPoint;

/// Capability contract shared by every surface variant in this crate
/// (single patches, patch aggregates, the offset decorator).
///
/// The parameter domain is `[0, max_u] x [0, max_v]`; a periodic axis wraps
/// instead of clamping. All consumers (the intersector, the trim generator,
/// external renderers and path generators) dispatch through this trait only.
pub trait ParametricSurface<T: FloatingPoint> {
    /// Evaluate the surface position at `(u, v)`.
    fn point_at(&self, u: T, v: T) -> Point3<T>;

    /// Partial derivative with respect to `u`.
    fn u_tangent_at(&self, u: T, v: T) -> Vector3<T>;

    /// Partial derivative with respect to `v`.
    fn v_tangent_at(&self, u: T, v: T) -> Vector3<T>;

    /// Unit surface normal `du x dv` at `(u, v)`.
    fn normal_at(&self, u: T, v: T) -> Vector3<T> {
        self.u_tangent_at(u, v)
            .cross(&self.v_tangent_at(u, v))
            .normalize()
    }

    /// Evaluate with trimming applied; `None` marks a point excluded by an
    /// active trim region. Callers must handle the `None` sentinel before
    /// using the position. Untrimmed surfaces return `Some` everywhere.
    fn trimmed_point_at(&self, u: T, v: T) -> Option<Point3<T>> {
        Some(self.point_at(u, v))
    }

    fn max_u(&self) -> T;

    fn max_v(&self) -> T;

    /// Whether the u axis is clamped (open), as opposed to periodic.
    fn is_u_clamped(&self) -> bool;

    /// Whether the v axis is clamped (open), as opposed to periodic.
    fn is_v_clamped(&self) -> bool;

    /// Constrain a u parameter to the domain: clamp on a clamped axis, wrap
    /// modulo `max_u` on a periodic one.
    fn clamp_u(&self, u: T) -> T {
        constrain_parameter(u, self.max_u(), self.is_u_clamped())
    }

    /// Constrain a v parameter to the domain.
    fn clamp_v(&self, v: T) -> T {
        constrain_parameter(v, self.max_v(), self.is_v_clamped())
    }

    /// Coarse inverse map: the `(u, v)` whose position is nearest to
    /// `point`, found by brute-force sampling of a regular 128x128 grid.
    /// No local refinement is performed; callers needing sub-grid accuracy
    /// must refine externally.
    fn closest_parameter(&self, point: &Point3<T>) -> (T, T) {
        let divs = 128;
        let du = self.max_u() / T::from_usize(divs).unwrap();
        let dv = self.max_v() / T::from_usize(divs).unwrap();
        let mut best = (T::zero(), T::zero());
        let mut closest = T::max_value().unwrap();
        for i in 0..=divs {
            let u = du * T::from_usize(i).unwrap();
            for j in 0..=divs {
                let v = dv * T::from_usize(j).unwrap();
                let d = (self.point_at(u, v) - point).norm_squared();
                if d < closest {
                    closest = d;
                    best = (u, v);
                }
            }
        }
        best
    }

    /// Regularly spaced grid of surface points, `(divs_u + 1) x (divs_v + 1)`
    /// samples over the whole domain. This is the sampling contract the
    /// wireframe renderer consumes.
    fn regular_sample_points(&self, divs_u: usize, divs_v: usize) -> Vec<Vec<Point3<T>>> {
        let du = self.max_u() / T::from_usize(divs_u).unwrap();
        let dv = self.max_v() / T::from_usize(divs_v).unwrap();
        (0..=divs_u)
            .map(|i| {
                let u = du * T::from_usize(i).unwrap();
                (0..=divs_v)
                    .map(|j| self.point_at(u, dv * T::from_usize(j).unwrap()))
                    .collect()
            })
            .collect()
    }

    /// Trimmed variant of [`ParametricSurface::regular_sample_points`];
    /// excluded samples appear as `None`.
    fn regular_sample_trimmed_points(
        &self,
        divs_u: usize,
        divs_v: usize,
    ) -> Vec<Vec<Option<Point3<T>>>> {
        let du = self.max_u() / T::from_usize(divs_u).unwrap();
        let dv = self.max_v() / T::from_usize(divs_v).unwrap();
        (0..=divs_u)
            .map(|i| {
                let u = du * T::from_usize(i).unwrap();
                (0..=divs_v)
                    .map(|j| self.trimmed_point_at(u, dv * T::from_usize(j).unwrap()))
                    .collect()
            })
            .collect()
    }
}

/// Clamp or wrap a parameter into `[0, max]`.
pub(crate) fn constrain_parameter<T: FloatingPoint>(parameter: T, max: T, clamped: bool) -> T {
    if clamped {
        parameter.clamp(T::zero(), max)
    } else {
        let wrapped = parameter - (parameter / max).floor() * max;
        // guard against -0.0 and values rounding up to max
        if wrapped >= max {
            wrapped - max
        } else {
            wrapped.max(T::zero())
        }
    }
}
