use nalgebra::Point3;

use super::FloatingPoint;

/// Transpose a row-major control grid (rows become columns).
pub fn transpose_control_grid<T: FloatingPoint>(points: &[Vec<Point3<T>>]) -> Vec<Vec<Point3<T>>> {
    let mut transposed = vec![Vec::with_capacity(points.len()); points[0].len()];
    points.iter().for_each(|row| {
        row.iter().enumerate().for_each(|(j, p)| {
            transposed[j].push(*p);
        })
    });
    transposed
}
