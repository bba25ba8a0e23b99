use argmin::core::{ArgminFloat, Executor, State};
use itertools::iproduct;
use nalgebra::{Matrix3x4, Point3, Vector2, Vector3, Vector4};

use crate::intersects::Intersects;
use crate::misc::FloatingPoint;
use crate::surface::{ParametricSurface, PatchSurface};

use super::{CommonPointDescent, CommonPointProblem, SurfaceIntersectionSolverOptions};

/// The intersection curve of two surfaces: a dense polyline of world points
/// with the matching parameter pair on each surface per sample.
///
/// Every sample satisfies
/// `|a.point_at(u_i, v_i) - b.point_at(s_i, t_i)| < common_point_tolerance`.
#[derive(Clone, Debug)]
pub struct SurfaceSurfaceIntersection<T: FloatingPoint> {
    points: Vec<Point3<T>>,
    a_parameters: Vec<Vector2<T>>,
    b_parameters: Vec<Vector2<T>>,
    closed: bool,
}

impl<T: FloatingPoint> SurfaceSurfaceIntersection<T> {
    pub fn points(&self) -> &[Point3<T>] {
        &self.points
    }

    pub fn a_parameters(&self) -> &[Vector2<T>] {
        &self.a_parameters
    }

    pub fn b_parameters(&self) -> &[Vector2<T>] {
        &self.b_parameters
    }

    /// Whether marching returned to its first point and closed the loop.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Local frame of the intersection at one `(u, v, s, t)` state.
struct MarchFrame<T: FloatingPoint> {
    a_u: Vector3<T>,
    a_v: Vector3<T>,
    b_u: Vector3<T>,
    b_v: Vector3<T>,
    /// Unnormalized intersection tangent `n1 x n2`.
    tangent: Vector3<T>,
}

struct MarchSample<T: FloatingPoint> {
    point: Point3<T>,
    a_uv: Vector2<T>,
    b_uv: Vector2<T>,
}

/// Find the intersection curve of two surfaces by predictor-corrector
/// continuation.
///
/// Runs the four phases in order: common-point search, forward marching with
/// Newton correction, closure / stall detection, and a backward marching pass
/// from the same seed when the forward pass stalled without closing.
///
/// Expected numerical failures (tangent surfaces, non-convergent common
/// point, a seed marching cannot leave) are reported as errors; callers must
/// check the result before trusting the output.
pub fn find_surface_intersection<T, S1, S2>(
    a: &S1,
    b: &S2,
    option: Option<SurfaceIntersectionSolverOptions<T>>,
) -> anyhow::Result<SurfaceSurfaceIntersection<T>>
where
    T: FloatingPoint + ArgminFloat,
    S1: ParametricSurface<T>,
    S2: ParametricSurface<T>,
{
    let options = option.unwrap_or_default();
    let seed = find_common_point(a, b, &options)?;

    #[cfg(feature = "log")]
    log::trace!("common point found at {:?}", seed);

    march(a, b, seed, &options)
}

/// Phase 1: locate a seed `(u, v, s, t)` where the surfaces nearly coincide.
fn find_common_point<T, S1, S2>(
    a: &S1,
    b: &S2,
    options: &SurfaceIntersectionSolverOptions<T>,
) -> anyhow::Result<Vector4<T>>
where
    T: FloatingPoint + ArgminFloat,
    S1: ParametricSurface<T>,
    S2: ParametricSurface<T>,
{
    let start = prescan(a, b, options);
    if let Some(seed) = descend(a, b, start, options.descent_step, options)? {
        return Ok(seed);
    }

    if options.self_intersection {
        // stagnated or collapsed onto the trivial solution; try again from
        // the domain corner farthest from the first start, stepping 10x finer
        #[cfg(feature = "log")]
        log::warn!("common point search stagnated, retrying from an alternate corner");

        let corner = alternate_corner(a, start);
        let retry = Vector4::new(corner.x, corner.y, start.z, start.w);
        let fine = options.descent_step * T::from_f64(0.1).unwrap();
        if let Some(seed) = descend(a, b, retry, fine, options)? {
            return Ok(seed);
        }
    }

    anyhow::bail!("Common point search did not converge");
}

/// Coarse brute-force scan over both parameter domains picking the closest
/// admissible start pair for the descent.
fn prescan<T, S1, S2>(
    a: &S1,
    b: &S2,
    options: &SurfaceIntersectionSolverOptions<T>,
) -> Vector4<T>
where
    T: FloatingPoint,
    S1: ParametricSurface<T>,
    S2: ParametricSurface<T>,
{
    let divs = options.prescan_divisions;
    let du = a.max_u() / T::from_usize(divs).unwrap();
    let dv = a.max_v() / T::from_usize(divs).unwrap();
    let ds = b.max_u() / T::from_usize(divs).unwrap();
    let dt = b.max_v() / T::from_usize(divs).unwrap();

    let a_samples: Vec<(T, T, Point3<T>)> = iproduct!(0..=divs, 0..=divs)
        .map(|(i, j)| {
            let u = du * T::from_usize(i).unwrap();
            let v = dv * T::from_usize(j).unwrap();
            (u, v, a.point_at(u, v))
        })
        .collect();
    let b_samples: Vec<(T, T, Point3<T>)> = iproduct!(0..=divs, 0..=divs)
        .map(|(i, j)| {
            let s = ds * T::from_usize(i).unwrap();
            let t = dt * T::from_usize(j).unwrap();
            (s, t, b.point_at(s, t))
        })
        .collect();

    let mut best = Vector4::new(
        a.max_u() * T::from_f64(0.5).unwrap(),
        a.max_v() * T::from_f64(0.5).unwrap(),
        b.max_u() * T::from_f64(0.5).unwrap(),
        b.max_v() * T::from_f64(0.5).unwrap(),
    );
    let mut closest = T::max_value().unwrap();
    for (u, v, pa) in a_samples.iter() {
        for (s, t, pb) in b_samples.iter() {
            let candidate = Vector4::new(*u, *v, *s, *t);
            if options.self_intersection
                && parameter_separation(&candidate) < options.minimum_parameter_separation
            {
                continue;
            }
            let d = (pa - pb).norm_squared();
            if d < closest {
                closest = d;
                best = candidate;
            }
        }
    }
    best
}

/// Run the projected gradient descent from one start. `Ok(None)` means the
/// descent stagnated or (in self-intersection mode) collapsed onto the
/// trivial solution.
fn descend<T, S1, S2>(
    a: &S1,
    b: &S2,
    start: Vector4<T>,
    step: T,
    options: &SurfaceIntersectionSolverOptions<T>,
) -> anyhow::Result<Option<Vector4<T>>>
where
    T: FloatingPoint + ArgminFloat,
    S1: ParametricSurface<T>,
    S2: ParametricSurface<T>,
{
    let problem = CommonPointProblem::new(a, b);
    let solver = CommonPointDescent::new(
        step,
        options.common_point_tolerance,
        [a.max_u(), a.max_v(), b.max_u(), b.max_v()],
        [
            a.is_u_clamped(),
            a.is_v_clamped(),
            b.is_u_clamped(),
            b.is_v_clamped(),
        ],
    );
    let res = Executor::new(problem, solver)
        .configure(|state| state.param(start).max_iters(options.descent_max_iters))
        .run()
        .map_err(|e| anyhow::anyhow!("Common point search failed: {}", e))?;

    let state = res.state();
    let (Some(param), cost) = (state.get_best_param(), state.get_best_cost()) else {
        return Ok(None);
    };
    let tolerance = options.common_point_tolerance;
    if cost >= tolerance * tolerance {
        return Ok(None);
    }
    if options.self_intersection
        && parameter_separation(param) < options.minimum_parameter_separation
    {
        return Ok(None);
    }
    Ok(Some(*param))
}

/// Euclidean distance between the `(u, v)` and `(s, t)` halves of a stacked
/// parameter vector; only meaningful when both halves address one surface.
fn parameter_separation<T: FloatingPoint>(param: &Vector4<T>) -> T {
    let du = param.x - param.z;
    let dv = param.y - param.w;
    (du * du + dv * dv).sqrt()
}

/// Domain corner of `a` farthest in parameter space from `start`.
fn alternate_corner<T, S>(a: &S, start: Vector4<T>) -> Vector2<T>
where
    T: FloatingPoint,
    S: ParametricSurface<T>,
{
    let half_u = a.max_u() * T::from_f64(0.5).unwrap();
    let half_v = a.max_v() * T::from_f64(0.5).unwrap();
    let u = if start.x > half_u { T::zero() } else { a.max_u() };
    let v = if start.y > half_v { T::zero() } else { a.max_v() };
    Vector2::new(u, v)
}

fn frame<T, S1, S2>(a: &S1, b: &S2, p: &Vector4<T>) -> MarchFrame<T>
where
    T: FloatingPoint,
    S1: ParametricSurface<T>,
    S2: ParametricSurface<T>,
{
    let a_u = a.u_tangent_at(p.x, p.y);
    let a_v = a.v_tangent_at(p.x, p.y);
    let b_u = b.u_tangent_at(p.z, p.w);
    let b_v = b.v_tangent_at(p.z, p.w);
    let normal_a = normalize_or_zero(a_u.cross(&a_v));
    let normal_b = normalize_or_zero(b_u.cross(&b_v));
    let tangent = normal_a.cross(&normal_b);
    MarchFrame {
        a_u,
        a_v,
        b_u,
        b_v,
        tangent,
    }
}

fn normalize_or_zero<T: FloatingPoint>(v: Vector3<T>) -> Vector3<T> {
    let n = v.norm();
    if n <= T::default_epsilon() {
        Vector3::zeros()
    } else {
        v / n
    }
}

fn constrain<T, S1, S2>(a: &S1, b: &S2, p: Vector4<T>) -> Vector4<T>
where
    T: FloatingPoint,
    S1: ParametricSurface<T>,
    S2: ParametricSurface<T>,
{
    Vector4::new(a.clamp_u(p.x), a.clamp_v(p.y), b.clamp_u(p.z), b.clamp_v(p.w))
}

/// Phases 2-4: march from the seed, correcting every predictor step, until a
/// stall, the iteration cap or a closed loop; then march the other way.
fn march<T, S1, S2>(
    a: &S1,
    b: &S2,
    seed: Vector4<T>,
    options: &SurfaceIntersectionSolverOptions<T>,
) -> anyhow::Result<SurfaceSurfaceIntersection<T>>
where
    T: FloatingPoint + ArgminFloat,
    S1: ParametricSurface<T>,
    S2: ParametricSurface<T>,
{
    let seed_frame = frame(a, b, &seed);
    anyhow::ensure!(
        seed_frame.tangent.norm() > options.tangent_tolerance,
        "Surfaces are tangent at the seed point; the intersection direction is undefined"
    );

    let (forward, mut closed) = march_direction(a, b, seed, T::one(), options)?;
    let mut samples = forward;

    if !closed {
        let (mut backward, closed_backward) = march_direction(a, b, seed, -T::one(), options)?;
        closed = closed_backward;
        // backward samples run seed -> end; flip them in front of the
        // forward polyline, dropping the duplicated seed
        backward.reverse();
        backward.pop();
        backward.extend(samples);
        samples = backward;
    }

    anyhow::ensure!(
        samples.len() > 1,
        "Marching could not advance from the seed point"
    );

    Ok(SurfaceSurfaceIntersection {
        points: samples.iter().map(|s| s.point).collect(),
        a_parameters: samples.iter().map(|s| s.a_uv).collect(),
        b_parameters: samples.iter().map(|s| s.b_uv).collect(),
        closed,
    })
}

fn march_direction<T, S1, S2>(
    a: &S1,
    b: &S2,
    seed: Vector4<T>,
    sign: T,
    options: &SurfaceIntersectionSolverOptions<T>,
) -> anyhow::Result<(Vec<MarchSample<T>>, bool)>
where
    T: FloatingPoint + ArgminFloat,
    S1: ParametricSurface<T>,
    S2: ParametricSurface<T>,
{
    let mut current = seed;
    let mut samples = vec![sample_at(a, b, &current, options)];

    for _ in 0..options.max_points {
        if options
            .cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
        {
            anyhow::bail!("Intersection marching cancelled");
        }

        let f = frame(a, b, &current);
        if f.tangent.norm() <= options.tangent_tolerance {
            // tangential mid-march; stop this direction
            break;
        }
        let step = f.tangent.normalize() * (options.step_size * sign);

        // predictor: project the world step onto each tangent basis
        let project = |tangent: &Vector3<T>| {
            let len = tangent.norm_squared();
            if len <= T::default_epsilon() {
                T::zero()
            } else {
                step.dot(tangent) / len
            }
        };
        let predicted = constrain(
            a,
            b,
            Vector4::new(
                current.x + project(&f.a_u),
                current.y + project(&f.a_v),
                current.z + project(&f.b_u),
                current.w + project(&f.b_v),
            ),
        );

        // corrector: pull the predicted state back onto the intersection
        let Some(corrected) = newton(a, b, predicted, options) else {
            break;
        };

        let sample = sample_at(a, b, &corrected, options);
        let last = samples.last().unwrap();
        if (sample.point - last.point).norm() < options.minimum_point_distance {
            // stuck against a boundary or a stationary state
            break;
        }

        current = corrected;
        samples.push(sample);

        if samples.len() > options.closure_minimum_samples {
            let first = &samples[0];
            let newest = samples.last().unwrap();
            if (newest.point - first.point).norm() < options.closure_tolerance {
                return Ok((samples, true));
            }
        }
    }

    Ok((samples, false))
}

/// Bounded Newton-Raphson solving `a(u, v) - b(s, t) = 0` (3 equations, 4
/// unknowns) through the Moore-Penrose pseudo-inverse of the stacked tangent
/// Jacobian. Returns `None` when the state cannot be brought within the
/// common-point tolerance.
fn newton<T, S1, S2>(
    a: &S1,
    b: &S2,
    mut p: Vector4<T>,
    options: &SurfaceIntersectionSolverOptions<T>,
) -> Option<Vector4<T>>
where
    T: FloatingPoint,
    S1: ParametricSurface<T>,
    S2: ParametricSurface<T>,
{
    for _ in 0..options.newton_max_iters {
        let residual = a.point_at(p.x, p.y) - b.point_at(p.z, p.w);
        if residual.norm() < options.newton_tolerance {
            return Some(p);
        }

        let jacobian = Matrix3x4::from_columns(&[
            a.u_tangent_at(p.x, p.y),
            a.v_tangent_at(p.x, p.y),
            -b.u_tangent_at(p.z, p.w),
            -b.v_tangent_at(p.z, p.w),
        ]);
        let pseudo_inverse = jacobian.pseudo_inverse(T::default_epsilon()).ok()?;
        let delta = pseudo_inverse * (-residual) * options.newton_damping;
        p = constrain(a, b, p + delta);
    }

    // slow convergence is acceptable as long as the sample invariant holds
    let residual = a.point_at(p.x, p.y) - b.point_at(p.z, p.w);
    if residual.norm() < options.common_point_tolerance {
        Some(p)
    } else {
        None
    }
}

fn sample_at<T, S1, S2>(
    a: &S1,
    b: &S2,
    p: &Vector4<T>,
    options: &SurfaceIntersectionSolverOptions<T>,
) -> MarchSample<T>
where
    T: FloatingPoint,
    S1: ParametricSurface<T>,
    S2: ParametricSurface<T>,
{
    let pa = a.point_at(p.x, p.y);
    let pb = b.point_at(p.z, p.w);
    let mut point = Point3::from((pa.coords + pb.coords) * T::from_f64(0.5).unwrap());
    if let Some(offset) = options.normal_offset {
        let bisector = a.normal_at(p.x, p.y) + b.normal_at(p.z, p.w);
        let n = bisector.norm();
        if n > T::default_epsilon() {
            point += bisector / n * offset;
        }
    }
    MarchSample {
        point,
        a_uv: Vector2::new(p.x, p.y),
        b_uv: Vector2::new(p.z, p.w),
    }
}

impl<'a, T, S> Intersects<'a, &'a S> for PatchSurface<T>
where
    T: FloatingPoint + ArgminFloat,
    S: ParametricSurface<T>,
{
    type Output = anyhow::Result<SurfaceSurfaceIntersection<T>>;
    type Option = Option<SurfaceIntersectionSolverOptions<T>>;

    /// Find the intersection curve between this surface and another
    /// * `other` - the surface to intersect with
    /// * `option` - hyperparameters for the intersection solver
    fn find_intersection(&'a self, other: &'a S, option: Self::Option) -> Self::Output {
        find_surface_intersection(self, other, option)
    }
}
