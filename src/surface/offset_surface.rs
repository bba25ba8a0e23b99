use nalgebra::{Point3, Vector3};

use crate::misc::FloatingPoint;

use super::ParametricSurface;

/// Decorator evaluating a base surface at a constant distance along its
/// local normal. Wraps any [`ParametricSurface`]; domain, periodicity and
/// trimming are delegated to the base.
///
/// Tangents are computed by central differences of the offset position: the
/// derivative of the offset normal field has no closed form for a Bezier
/// patch, and the finite-difference error is negligible against the
/// tolerances used by the intersector.
#[derive(Clone, Debug)]
pub struct OffsetSurface<S, T: FloatingPoint> {
    surface: S,
    distance: T,
}

impl<S, T: FloatingPoint> OffsetSurface<S, T> {
    pub fn new(surface: S, distance: T) -> Self {
        Self { surface, distance }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn distance(&self) -> T {
        self.distance
    }
}

impl<S: ParametricSurface<T>, T: FloatingPoint> OffsetSurface<S, T> {
    fn step(&self) -> T {
        T::from_f64(1e-4).unwrap()
    }
}

impl<S: ParametricSurface<T>, T: FloatingPoint> ParametricSurface<T> for OffsetSurface<S, T> {
    fn point_at(&self, u: T, v: T) -> Point3<T> {
        self.surface.point_at(u, v) + self.surface.normal_at(u, v) * self.distance
    }

    fn u_tangent_at(&self, u: T, v: T) -> Vector3<T> {
        let h = self.step();
        // a periodic base wraps out-of-domain parameters itself
        let (u0, u1) = if self.surface.is_u_clamped() {
            (self.surface.clamp_u(u - h), self.surface.clamp_u(u + h))
        } else {
            (u - h, u + h)
        };
        if u1 <= u0 {
            return self.surface.u_tangent_at(u, v);
        }
        (self.point_at(u1, v) - self.point_at(u0, v)) / (u1 - u0)
    }

    fn v_tangent_at(&self, u: T, v: T) -> Vector3<T> {
        let h = self.step();
        let (v0, v1) = if self.surface.is_v_clamped() {
            (self.surface.clamp_v(v - h), self.surface.clamp_v(v + h))
        } else {
            (v - h, v + h)
        };
        if v1 <= v0 {
            return self.surface.v_tangent_at(u, v);
        }
        (self.point_at(u, v1) - self.point_at(u, v0)) / (v1 - v0)
    }

    fn trimmed_point_at(&self, u: T, v: T) -> Option<Point3<T>> {
        self.surface
            .trimmed_point_at(u, v)
            .map(|p| p + self.surface.normal_at(u, v) * self.distance)
    }

    fn max_u(&self) -> T {
        self.surface.max_u()
    }

    fn max_v(&self) -> T {
        self.surface.max_v()
    }

    fn is_u_clamped(&self) -> bool {
        self.surface.is_u_clamped()
    }

    fn is_v_clamped(&self) -> bool {
        self.surface.is_v_clamped()
    }
}
