use approx::assert_relative_eq;
use nalgebra::{Matrix4, Point3, Vector3};
use rand::Rng;

use crate::misc::{Invertible, Transformable};
use crate::trim::TrimmingMask;

use super::*;

/// Row-major grid built from an index function.
fn grid(
    rows: usize,
    cols: usize,
    mut f: impl FnMut(usize, usize) -> Point3<f64>,
) -> Vec<Vec<Point3<f64>>> {
    let mut points = Vec::with_capacity(rows);
    for i in 0..rows {
        let mut row = Vec::with_capacity(cols);
        for j in 0..cols {
            row.push(f(i, j));
        }
        points.push(row);
    }
    points
}

/// 4x4 lattice patch spanning `[0, 3] x [0, 3]` in the xy plane; by linear
/// precision of the Bernstein basis it evaluates to `(3u, 3v, 0)`.
fn lattice_patch() -> BezierPatch<f64> {
    BezierPatch::try_from_grid(&grid(4, 4, |i, j| Point3::new(i as f64, j as f64, 0.))).unwrap()
}

#[test]
fn corner_evaluations_equal_corner_control_points() {
    let patch = BezierPatch::try_from_grid(&grid(4, 4, |i, j| {
        Point3::new(i as f64, j as f64 * 2., (i * j) as f64 - 1.5)
    }))
    .unwrap();
    let cp = patch.control_points();
    assert_relative_eq!(patch.point_at(0., 0.), cp[0][0], epsilon = 1e-14);
    assert_relative_eq!(patch.point_at(0., 1.), cp[0][3], epsilon = 1e-14);
    assert_relative_eq!(patch.point_at(1., 0.), cp[3][0], epsilon = 1e-14);
    assert_relative_eq!(patch.point_at(1., 1.), cp[3][3], epsilon = 1e-14);
}

#[test]
fn lattice_patch_center_is_bernstein_weighted_centroid() {
    let patch = lattice_patch();
    // closed form: sum_i B_i(1/2) * i = 3/2 in both directions
    assert_relative_eq!(
        patch.point_at(0.5, 0.5),
        Point3::new(1.5, 1.5, 0.),
        epsilon = 1e-14
    );
}

#[test]
fn patch_tangents_match_finite_differences() {
    let patch = BezierPatch::try_from_grid(&grid(4, 4, |i, j| {
        Point3::new(i as f64, j as f64, ((i + 2 * j) as f64).sin())
    }))
    .unwrap();
    let h = 1e-6;
    for &(u, v) in &[(0.25, 0.25), (0.5, 0.75), (0.9, 0.1)] {
        let du = (patch.point_at(u + h, v) - patch.point_at(u - h, v)) / (2. * h);
        let dv = (patch.point_at(u, v + h) - patch.point_at(u, v - h)) / (2. * h);
        assert_relative_eq!(patch.u_tangent_at(u, v), du, epsilon = 1e-5);
        assert_relative_eq!(patch.v_tangent_at(u, v), dv, epsilon = 1e-5);
    }
}

#[test]
fn c0_surface_dispatch_is_continuous_across_patch_boundaries() {
    let mut rng = rand::rng();
    let mut points = grid(7, 7, |i, j| Point3::new(i as f64, j as f64, 0.));
    for row in points.iter_mut() {
        for p in row.iter_mut() {
            p.z = rng.random_range(-0.5..0.5);
        }
    }
    let surface = PatchSurface::try_c0(points).unwrap();
    assert_eq!(surface.u_spans(), 2);
    assert_eq!(surface.v_spans(), 2);

    let eps = 1e-9;
    for &t in &[0.2, 0.5, 0.8, 1.3, 1.7] {
        let below = surface.point_at(1. - eps, t);
        let above = surface.point_at(1. + eps, t);
        assert_relative_eq!(below, above, epsilon = 1e-6);
        let left = surface.point_at(t, 1. - eps);
        let right = surface.point_at(t, 1. + eps);
        assert_relative_eq!(left, right, epsilon = 1e-6);
    }
}

#[test]
fn c0_surface_interpolates_grid_corners() {
    let points = grid(7, 7, |i, j| Point3::new(i as f64, j as f64, (i + j) as f64));
    let surface = PatchSurface::try_c0(points.clone()).unwrap();
    assert_relative_eq!(surface.point_at(0., 0.), points[0][0], epsilon = 1e-14);
    // the upper domain boundary folds onto the last patch
    assert_relative_eq!(surface.point_at(2., 2.), points[6][6], epsilon = 1e-12);
}

#[test]
fn c0_surface_rejects_malformed_grids() {
    assert!(PatchSurface::try_c0(grid(5, 7, |i, j| Point3::new(i as f64, j as f64, 0.))).is_err());
    assert!(PatchSurface::<f64>::try_c0(vec![]).is_err());
    let mut ragged = grid(4, 4, |i, j| Point3::new(i as f64, j as f64, 0.));
    ragged[2].pop();
    assert!(PatchSurface::try_c0(ragged).is_err());
}

#[test]
fn c2_surface_is_derivative_continuous_across_boundaries() {
    let mut rng = rand::rng();
    let points = grid(5, 6, |i, j| {
        Point3::new(i as f64, j as f64, rng.random_range(-1.0..1.0))
    });
    let surface = PatchSurface::try_c2(points).unwrap();
    assert_eq!(surface.u_spans(), 6);
    assert_eq!(surface.v_spans(), 7);

    let eps = 1e-7;
    for boundary in 1..surface.u_spans() {
        let k = boundary as f64;
        let below = surface.point_at(k - eps, 2.3);
        let above = surface.point_at(k + eps, 2.3);
        assert_relative_eq!(below, above, epsilon = 1e-5);
        let du0 = surface.u_tangent_at(k - eps, 2.3);
        let du1 = surface.u_tangent_at(k + eps, 2.3);
        assert_relative_eq!(du0, du1, epsilon = 1e-4);
    }
}

#[test]
fn c2_surface_interpolates_corner_de_boor_points() {
    let points = grid(4, 5, |i, j| Point3::new(i as f64, j as f64, (i * j) as f64));
    let surface = PatchSurface::try_c2(points.clone()).unwrap();
    assert_relative_eq!(surface.point_at(0., 0.), points[0][0], epsilon = 1e-12);
    assert_relative_eq!(
        surface.point_at(surface.max_u(), surface.max_v()),
        points[3][4],
        epsilon = 1e-12
    );
}

#[test]
fn periodic_c0_surface_wraps_the_last_column_window() {
    let points = grid(4, 6, |i, j| {
        let angle = j as f64 / 6. * std::f64::consts::TAU;
        Point3::new(angle.cos(), angle.sin(), i as f64)
    });
    let surface = PatchSurface::try_c0_periodic(points).unwrap();
    assert_eq!(surface.v_spans(), 2);
    assert!(!surface.is_v_clamped());

    // approaching the seam from below lands on the same point as v = 0
    let eps = 1e-7;
    for &u in &[0., 0.3, 0.9] {
        let seam = surface.point_at(u, surface.max_v() - eps);
        let start = surface.point_at(u, 0.);
        assert_relative_eq!(seam, start, epsilon = 1e-5);
    }
}

#[test]
fn periodic_parameters_wrap_instead_of_clamping() {
    let points = grid(4, 6, |i, j| Point3::new(i as f64, j as f64, 0.));
    let surface = PatchSurface::try_c0_periodic(points).unwrap();
    assert_relative_eq!(surface.clamp_v(-0.25), surface.max_v() - 0.25, epsilon = 1e-12);
    assert_relative_eq!(surface.clamp_v(surface.max_v() + 0.5), 0.5, epsilon = 1e-12);
    // the u axis stays clamped
    assert_relative_eq!(surface.clamp_u(7.), surface.max_u(), epsilon = 1e-12);
}

#[test]
fn periodic_c2_surface_closes_seamlessly() {
    let points = grid(4, 8, |i, j| {
        let angle = j as f64 / 8. * std::f64::consts::TAU;
        Point3::new(angle.cos(), angle.sin(), i as f64 * 0.5)
    });
    let surface = PatchSurface::try_c2_periodic(points).unwrap();
    assert_eq!(surface.v_spans(), 8);

    let eps = 1e-7;
    let seam = surface.point_at(1.5, surface.max_v() - eps);
    let start = surface.point_at(1.5, 0.);
    assert_relative_eq!(seam, start, epsilon = 1e-5);

    let dv0 = surface.v_tangent_at(1.5, surface.max_v() - eps);
    let dv1 = surface.v_tangent_at(1.5, 0.);
    assert_relative_eq!(dv0, dv1, epsilon = 1e-4);
}

#[test]
fn gregory_patch_with_collapsed_pairs_reproduces_bezier() {
    let patch = BezierPatch::try_from_grid(&grid(4, 4, |i, j| {
        Point3::new(i as f64, j as f64, (i as f64 - j as f64) * 0.5)
    }))
    .unwrap();
    let gregory = GregoryPatch::from_bezier(&patch);
    for &(u, v) in &[(0., 0.), (0.5, 0.5), (0.25, 0.75), (1., 1.)] {
        assert_relative_eq!(gregory.point_at(u, v), patch.point_at(u, v), epsilon = 1e-12);
        assert_relative_eq!(
            gregory.u_tangent_at(u, v),
            patch.u_tangent_at(u, v),
            epsilon = 1e-10
        );
    }
}

#[test]
fn gregory_patch_keeps_its_boundary() {
    let boundary_grid = grid(4, 4, |i, j| Point3::new(i as f64, j as f64, 0.));
    let patch = BezierPatch::try_from_grid(&boundary_grid).unwrap();
    let mut gregory = GregoryPatch::from_bezier(&patch);
    // pull the interior candidate pairs apart; the boundary must not move
    let mut interior = *gregory.interior();
    interior[0][0] += Vector3::new(0., 0., 1.);
    interior[3][1] += Vector3::new(0., 0., -1.);
    gregory = GregoryPatch::new(*gregory.boundary(), interior);

    assert_relative_eq!(gregory.point_at(0., 0.), boundary_grid[0][0], epsilon = 1e-12);
    assert_relative_eq!(gregory.point_at(1., 1.), boundary_grid[3][3], epsilon = 1e-12);
    // a boundary isoline only involves boundary control points
    let edge = gregory.point_at(0., 0.5);
    assert_relative_eq!(edge, patch.point_at(0., 0.5), epsilon = 1e-12);
}

#[test]
fn offset_surface_displaces_along_the_normal() {
    let patch = lattice_patch();
    let offset = OffsetSurface::new(patch.clone(), 0.5);
    for &(u, v) in &[(0.2, 0.2), (0.5, 0.5), (0.8, 0.3)] {
        let base = patch.point_at(u, v);
        let displaced = offset.point_at(u, v);
        // lattice patch normal is +z everywhere
        assert_relative_eq!(displaced, base + Vector3::new(0., 0., 0.5), epsilon = 1e-10);
        assert_relative_eq!(
            offset.u_tangent_at(u, v),
            patch.u_tangent_at(u, v),
            epsilon = 1e-5
        );
    }
}

#[test]
fn trimmed_evaluation_respects_active_masks() {
    let points = grid(4, 4, |i, j| Point3::new(i as f64, j as f64, 0.));
    let mut surface = PatchSurface::try_c0(points).unwrap();
    assert!(surface.trimmed_point_at(0.5, 0.5).is_some());

    let mut nothing = TrimmingMask::all(32);
    nothing.invert();
    surface.add_trimming_mask(nothing);
    assert!(surface.trimmed_point_at(0.5, 0.5).is_none());
    assert!(surface.point_at(0.5, 0.5).coords.norm() > 0.);

    surface.clear_trimming_masks();
    assert!(surface.trimmed_point_at(0.5, 0.5).is_some());
}

#[test]
fn closest_parameter_recovers_the_sample_grid_minimum() {
    let patch = lattice_patch();
    let (u, v) = patch.closest_parameter(&Point3::new(1.5, 1.5, 1.));
    assert!((u - 0.5).abs() < 2. / 128.);
    assert!((v - 0.5).abs() < 2. / 128.);
}

#[test]
fn transform_moves_control_points() {
    let patch = lattice_patch();
    let translation = Matrix4::new_translation(&Vector3::new(1., -2., 3.));
    let moved = patch.transformed(&translation);
    assert_relative_eq!(
        moved.point_at(0.5, 0.5),
        patch.point_at(0.5, 0.5) + Vector3::new(1., -2., 3.),
        epsilon = 1e-12
    );
}

#[test]
fn invert_flips_the_surface_normal() {
    let points = grid(4, 4, |i, j| Point3::new(i as f64, j as f64, 0.));
    let surface = PatchSurface::try_c0(points).unwrap();
    let normal = surface.normal_at(0.5, 0.5);
    let inverted = surface.inverse();
    let flipped = inverted.normal_at(0.5, 0.5);
    assert_relative_eq!(normal.dot(&flipped), -1., epsilon = 1e-10);
}

#[test]
fn cast_between_scalar_types() {
    let patch = lattice_patch();
    let single: BezierPatch<f32> = patch.cast();
    let p = single.point_at(0.5f32, 0.5f32);
    assert!((p.x - 1.5).abs() < 1e-5);
}

#[test]
fn regular_sampling_covers_the_domain() {
    let points = grid(7, 7, |i, j| Point3::new(i as f64, j as f64, 0.));
    let surface = PatchSurface::try_c0(points.clone()).unwrap();
    let samples = surface.regular_sample_points(4, 4);
    assert_eq!(samples.len(), 5);
    assert_eq!(samples[0].len(), 5);
    assert_relative_eq!(samples[0][0], points[0][0], epsilon = 1e-12);
    assert_relative_eq!(samples[4][4], points[6][6], epsilon = 1e-12);
}
