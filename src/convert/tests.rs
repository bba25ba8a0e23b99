use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};

use super::*;

#[test]
fn clamped_conversion_interpolates_endpoints() {
    let de_boor = vec![
        Point3::new(0., 0., 0.),
        Point3::new(1., 2., 0.),
        Point3::new(3., -1., 1.),
        Point3::new(4., 0., 2.),
        Point3::new(6., 1., 0.),
    ];
    let bezier = de_boor_to_bezier(&de_boor);
    assert_relative_eq!(bezier[0], de_boor[0], epsilon = 1e-12);
    assert_relative_eq!(
        bezier[bezier.len() - 1],
        de_boor[de_boor.len() - 1],
        epsilon = 1e-12
    );
}

#[test]
fn clamped_conversion_point_count() {
    // n de Boor points pad to n + 4, giving n + 1 spans and 3(n + 1) + 1 points
    for n in 1..8 {
        let de_boor: Vec<_> = (0..n).map(|i| Point3::new(i as f64, 0., 0.)).collect();
        let bezier = de_boor_to_bezier(&de_boor);
        assert_eq!(bezier.len(), 3 * (n + 1) + 1);
    }
}

#[test]
fn colinear_de_boor_converts_to_colinear_bezier() {
    let dir = Vector3::new(1., 2., -0.5);
    let origin = Point3::new(0.5, -1., 2.);
    let de_boor: Vec<_> = (0..6).map(|i| origin + dir * (i as f64)).collect();
    let bezier = de_boor_to_bezier(&de_boor);
    let unit = dir.normalize();
    for p in bezier.iter() {
        let offset = p - origin;
        let residual = offset - unit * offset.dot(&unit);
        assert!(residual.norm() < 1e-10, "point off the line: {:?}", p);
    }
}

#[test]
fn interior_joins_are_midpoints() {
    let de_boor = vec![
        Point3::new(0., 0., 0.),
        Point3::new(2., 3., 1.),
        Point3::new(5., 1., -1.),
        Point3::new(7., 4., 0.),
        Point3::new(9., 0., 2.),
    ];
    let bezier = de_boor_to_bezier(&de_boor);
    // every join e_i is the midpoint of its neighboring g_{i-1} and f_i
    let mut i = 3;
    while i + 1 < bezier.len() {
        let mid = Point3::from((bezier[i - 1].coords + bezier[i + 1].coords) * 0.5);
        assert_relative_eq!(bezier[i], mid, epsilon = 1e-12);
        i += 3;
    }
}

#[test]
fn periodic_conversion_closes() {
    let de_boor = vec![
        Point3::new(1., 0., 0.),
        Point3::new(0., 1., 0.),
        Point3::new(-1., 0., 0.),
        Point3::new(0., -1., 0.),
    ];
    let bezier = de_boor_to_bezier_periodic(&de_boor);
    assert_eq!(bezier.len(), 3 * de_boor.len() + 1);
    assert_relative_eq!(bezier[0], bezier[bezier.len() - 1], epsilon = 1e-12);
}

#[test]
fn grid_conversion_dimensions() {
    let grid: Vec<Vec<Point3<f64>>> = (0..4)
        .map(|i| {
            (0..5)
                .map(|j| Point3::new(i as f64, j as f64, 0.))
                .collect()
        })
        .collect();
    let bezier = de_boor_grid_to_bezier(&grid, false);
    assert_eq!(bezier.len(), 3 * (4 + 1) + 1);
    assert_eq!(bezier[0].len(), 3 * (5 + 1) + 1);

    let periodic = de_boor_grid_to_bezier(&grid, true);
    assert_eq!(periodic.len(), 3 * (4 + 1) + 1);
    assert_eq!(periodic[0].len(), 3 * 5 + 1);
}

#[test]
fn grid_conversion_preserves_planarity() {
    // a planar de Boor grid must convert to a planar Bezier grid
    let grid: Vec<Vec<Point3<f64>>> = (0..4)
        .map(|i| {
            (0..4)
                .map(|j| Point3::new(i as f64, j as f64, 2. * i as f64 - j as f64))
                .collect()
        })
        .collect();
    let bezier = de_boor_grid_to_bezier(&grid, false);
    for row in bezier.iter() {
        for p in row.iter() {
            assert_relative_eq!(p.z, 2. * p.x - p.y, epsilon = 1e-10);
        }
    }
}
