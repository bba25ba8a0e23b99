#![cfg(feature = "serde")]

use nalgebra::{Point3, Vector2};
use surfo::prelude::*;

fn grid(rows: usize, cols: usize) -> Vec<Vec<Point3<f64>>> {
    (0..rows)
        .map(|i| {
            (0..cols)
                .map(|j| Point3::new(i as f64, j as f64, (i * j) as f64 * 0.25))
                .collect()
        })
        .collect()
}

#[test]
fn patch_surface_roundtrip() {
    let surface = PatchSurface::try_c2(grid(4, 5)).unwrap();
    let json = serde_json::to_string_pretty(&surface).unwrap();
    let restored: PatchSurface<f64> = serde_json::from_str(&json).unwrap();

    assert_eq!(surface.control_points(), restored.control_points());
    assert_eq!(surface.u_spans(), restored.u_spans());
    assert_eq!(surface.v_spans(), restored.v_spans());
    // patches are derived state; the restored surface evaluates identically
    let a = surface.point_at(1.3, 2.7);
    let b = restored.point_at(1.3, 2.7);
    assert!((a - b).norm() < 1e-14);
}

#[test]
fn trimming_mask_roundtrip() {
    let polyline = vec![
        Vector2::new(0.2, 0.2),
        Vector2::new(0.8, 0.2),
        Vector2::new(0.8, 0.8),
        Vector2::new(0.2, 0.8),
        Vector2::new(0.2, 0.2),
    ];
    let mask = TrimmingMask::from_polyline(&polyline, (1., 1.), (false, false), (0.5, 0.5), 32, None);
    let json = serde_json::to_string(&mask).unwrap();
    let restored: TrimmingMask = serde_json::from_str(&json).unwrap();
    assert_eq!(mask, restored);
}
