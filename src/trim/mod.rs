use nalgebra::Vector2;

use crate::misc::{CancellationToken, FloatingPoint};


/// Boolean trim mask over the normalized parameter square `[0, 1) x [0, 1)`
/// of one surface, at a fixed cell resolution.
///
/// `true` marks a kept cell: one reachable from the seed cell without
/// crossing a rasterized curve edge. Rasterized cells themselves are never
/// kept. The mask is plain data; it holds no reference to the surface it was
/// derived from and can be persisted and re-attached by external callers.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrimmingMask {
    resolution: usize,
    cells: Vec<bool>,
}

impl TrimmingMask {
    /// Derive a mask from an intersection-parameter polyline.
    ///
    /// * `polyline` - ordered parameter samples on the surface, in domain
    ///   units (as produced by the intersector)
    /// * `domain` - the surface's `(max_u, max_v)`
    /// * `periodicity` - whether the u / v axis wraps
    /// * `seed` - seed parameter in domain units; the kept region grows from
    ///   its cell
    /// * `resolution` - cell count per axis
    ///
    /// There is no failure path: a seed landing on a rasterized cell yields
    /// an all-false mask, which is valid output. A supplied cancellation
    /// token stops the fill early, leaving the mask partially grown.
    pub fn from_polyline<T: FloatingPoint>(
        polyline: &[Vector2<T>],
        domain: (T, T),
        periodicity: (bool, bool),
        seed: (T, T),
        resolution: usize,
        cancellation: Option<&CancellationToken>,
    ) -> Self {
        let blocked = rasterize(polyline, domain, periodicity, resolution);
        let seed_cell = (
            cell_coordinate(seed.0, domain.0, periodicity.0, resolution),
            cell_coordinate(seed.1, domain.1, periodicity.1, resolution),
        );
        let cells = flood_fill(&blocked, seed_cell, periodicity, resolution, cancellation);
        Self { resolution, cells }
    }

    /// A mask keeping the whole domain.
    pub fn all(resolution: usize) -> Self {
        Self {
            resolution,
            cells: vec![true; resolution * resolution],
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Whether the cell under the normalized parameter `(u, v)` is kept.
    /// Parameters outside `[0, 1)` are wrapped into range; exactly 1 folds
    /// onto the last cell so the upper domain boundary stays queryable.
    pub fn contains<T: FloatingPoint>(&self, u: T, v: T) -> bool {
        let fold = |t: T| {
            if t == T::one() {
                self.resolution as isize - 1
            } else {
                cell_coordinate(t, T::one(), true, self.resolution)
            }
        };
        self.cells[fold(u) as usize * self.resolution + fold(v) as usize]
    }

    /// Flip the mask in place, keeping the other side of the curve.
    /// Applying this twice is the identity.
    pub fn invert(&mut self) {
        for cell in self.cells.iter_mut() {
            *cell = !*cell;
        }
    }
}

/// Map a parameter in `[0, max]` to a cell coordinate in `[0, resolution)`.
fn cell_coordinate<T: FloatingPoint>(value: T, max: T, periodic: bool, resolution: usize) -> isize {
    let normalized = value / max;
    let scaled = (normalized * T::from_usize(resolution).unwrap())
        .floor()
        .to_isize()
        .unwrap_or(0);
    let res = resolution as isize;
    if periodic {
        scaled.rem_euclid(res)
    } else {
        scaled.clamp(0, res - 1)
    }
}

/// Rasterize the polyline into a blocked-cell grid with Bresenham lines.
///
/// On a periodic axis a consecutive-sample jump longer than 0.7x the grid
/// side is a seam crossing, not a chord: the segment endpoint is shifted by
/// one full period and cells are plotted modulo the resolution, so no
/// spurious diagonal spans the domain.
fn rasterize<T: FloatingPoint>(
    polyline: &[Vector2<T>],
    domain: (T, T),
    periodicity: (bool, bool),
    resolution: usize,
) -> Vec<bool> {
    let mut blocked = vec![false; resolution * resolution];
    let res = resolution as isize;
    let wrap_threshold = res * 7 / 10;

    let cell = |p: &Vector2<T>| {
        (
            cell_coordinate(p.x, domain.0, periodicity.0, resolution),
            cell_coordinate(p.y, domain.1, periodicity.1, resolution),
        )
    };

    let mut plot = |x: isize, y: isize| {
        let cx = if periodicity.0 { x.rem_euclid(res) } else { x };
        let cy = if periodicity.1 { y.rem_euclid(res) } else { y };
        if (0..res).contains(&cx) && (0..res).contains(&cy) {
            blocked[cx as usize * resolution + cy as usize] = true;
        }
    };

    if let Some(first) = polyline.first() {
        let (x, y) = cell(first);
        plot(x, y);
    }

    for pair in polyline.windows(2) {
        let (x0, y0) = cell(&pair[0]);
        let (mut x1, mut y1) = cell(&pair[1]);
        if periodicity.0 && (x1 - x0).abs() > wrap_threshold {
            x1 -= res * (x1 - x0).signum();
        }
        if periodicity.1 && (y1 - y0).abs() > wrap_threshold {
            y1 -= res * (y1 - y0).signum();
        }
        bresenham(x0, y0, x1, y1, &mut plot);
    }

    blocked
}

/// Integer Bresenham line, plotting every cell from `(x0, y0)` to `(x1, y1)`
/// inclusive.
fn bresenham(x0: isize, y0: isize, x1: isize, y1: isize, plot: &mut impl FnMut(isize, isize)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    loop {
        plot(x, y);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// 4-connected stack flood fill from the seed, blocked by rasterized cells.
/// Periodic axes wrap their neighbor lookup; clamped axes stop at the
/// boundary.
fn flood_fill(
    blocked: &[bool],
    seed: (isize, isize),
    periodicity: (bool, bool),
    resolution: usize,
    cancellation: Option<&CancellationToken>,
) -> Vec<bool> {
    let res = resolution as isize;
    let mut kept = vec![false; resolution * resolution];
    let index = |x: isize, y: isize| x as usize * resolution + y as usize;

    if blocked[index(seed.0, seed.1)] {
        return kept;
    }

    let mut stack = vec![seed];
    kept[index(seed.0, seed.1)] = true;
    while let Some((x, y)) = stack.pop() {
        if cancellation.is_some_and(|token| token.is_cancelled()) {
            break;
        }
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let mut nx = x + dx;
            let mut ny = y + dy;
            if periodicity.0 {
                nx = nx.rem_euclid(res);
            } else if !(0..res).contains(&nx) {
                continue;
            }
            if periodicity.1 {
                ny = ny.rem_euclid(res);
            } else if !(0..res).contains(&ny) {
                continue;
            }
            let i = index(nx, ny);
            if !kept[i] && !blocked[i] {
                kept[i] = true;
                stack.push((nx, ny));
            }
        }
    }

    kept
}
