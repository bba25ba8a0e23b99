use nalgebra::Point3;

use crate::misc::{transpose_control_grid, FloatingPoint};

#[cfg(test)]
mod tests;

/// Convert the control polygon of a clamped uniform cubic B-spline (de Boor
/// points) into the control polygon of the equivalent piecewise cubic Bezier
/// curve.
///
/// Each end is padded by duplicating the first/last point twice, which
/// realizes the clamped open uniform knot vector: the converted curve
/// interpolates the first and last de Boor point exactly and is C2 at every
/// interior join. The output holds `3m + 1` points for `m` spans, laid out as
/// `e_0, f_0, g_0, e_1, f_1, g_1, ..., e_m`.
///
/// Inputs with fewer than four points degenerate to short (possibly
/// zero-length) spans instead of failing.
pub fn de_boor_to_bezier<T: FloatingPoint>(de_boor: &[Point3<T>]) -> Vec<Point3<T>> {
    if de_boor.is_empty() {
        return vec![];
    }
    let first = de_boor[0];
    let last = de_boor[de_boor.len() - 1];
    let mut padded = Vec::with_capacity(de_boor.len() + 4);
    padded.push(first);
    padded.push(first);
    padded.extend_from_slice(de_boor);
    padded.push(last);
    padded.push(last);
    spans_to_bezier(&padded)
}

/// Periodic variant of [`de_boor_to_bezier`]: the de Boor polygon is treated
/// as a closed loop, wrapped by appending its first three points. The output
/// holds `3n + 1` points for `n` de Boor points, with the first and last
/// Bezier point coinciding.
pub fn de_boor_to_bezier_periodic<T: FloatingPoint>(de_boor: &[Point3<T>]) -> Vec<Point3<T>> {
    if de_boor.is_empty() {
        return vec![];
    }
    let n = de_boor.len();
    let mut wrapped = Vec::with_capacity(n + 3);
    wrapped.extend_from_slice(de_boor);
    for k in 0..3 {
        wrapped.push(de_boor[k % n]);
    }
    spans_to_bezier(&wrapped)
}

/// Emit the Bezier points of every 4-window span of `points`.
///
/// Span `j` occupies the window `p[j..j+4]` and contributes
/// `e_j = (p_j + 4 p_{j+1} + p_{j+2}) / 6`,
/// `f_j = (2 p_{j+1} + p_{j+2}) / 3`,
/// `g_j = (p_{j+1} + 2 p_{j+2}) / 3`;
/// the tail point of span `j` equals `e_{j+1}` of the next span, so interior
/// joins satisfy `e_i = (g_{i-1} + f_i) / 2` identically.
fn spans_to_bezier<T: FloatingPoint>(points: &[Point3<T>]) -> Vec<Point3<T>> {
    if points.len() < 4 {
        return points.to_vec();
    }
    let m = points.len() - 3;
    let third = T::from_f64(1. / 3.).unwrap();
    let sixth = T::from_f64(1. / 6.).unwrap();
    let four = T::from_f64(4.).unwrap();
    let two = T::from_f64(2.).unwrap();

    let join = |a: &Point3<T>, b: &Point3<T>, c: &Point3<T>| {
        Point3::from((a.coords + b.coords * four + c.coords) * sixth)
    };

    let mut bezier = Vec::with_capacity(3 * m + 1);
    bezier.push(join(&points[0], &points[1], &points[2]));
    for j in 0..m {
        let f = Point3::from((points[j + 1].coords * two + points[j + 2].coords) * third);
        let g = Point3::from((points[j + 1].coords + points[j + 2].coords * two) * third);
        bezier.push(f);
        bezier.push(g);
        bezier.push(join(&points[j + 1], &points[j + 2], &points[j + 3]));
    }
    bezier
}

/// Convert a row-major de Boor control grid into the equivalent Bezier
/// control grid by applying the 1D conversion per row (v direction), then per
/// column (u direction). When `periodic_v` is set, rows are converted with
/// the periodic variant so the resulting grid closes on itself in v.
pub fn de_boor_grid_to_bezier<T: FloatingPoint>(
    grid: &[Vec<Point3<T>>],
    periodic_v: bool,
) -> Vec<Vec<Point3<T>>> {
    let rows: Vec<Vec<Point3<T>>> = grid
        .iter()
        .map(|row| {
            if periodic_v {
                de_boor_to_bezier_periodic(row)
            } else {
                de_boor_to_bezier(row)
            }
        })
        .collect();
    let columns = transpose_control_grid(&rows);
    let converted: Vec<Vec<Point3<T>>> =
        columns.iter().map(|col| de_boor_to_bezier(col)).collect();
    transpose_control_grid(&converted)
}
