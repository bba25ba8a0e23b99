use crate::misc::{CancellationToken, FloatingPoint};

/// Hyperparameters for the surface-surface intersection solver.
///
/// The defaults are tuned for model-scale geometry (coordinates of order 1);
/// every tolerance is exposed so the engine stays usable at other scales.
#[derive(Clone, Debug)]
pub struct SurfaceIntersectionSolverOptions<T: FloatingPoint> {
    /// Two evaluations closer than this are considered the same world point;
    /// every emitted sample satisfies this bound between the two surfaces.
    pub common_point_tolerance: T,
    /// Step multiplier for the gradient descent of the common-point search.
    pub descent_step: T,
    /// Iteration cap for the common-point search.
    pub descent_max_iters: u64,
    /// Per-axis division count of the coarse pre-scan seeding the descent.
    pub prescan_divisions: usize,
    /// World-space arc step of the marching predictor.
    pub step_size: T,
    /// Minimum norm of `n1 x n2`; below this the surfaces are tangent.
    pub tangent_tolerance: T,
    /// Convergence tolerance of the Newton corrector.
    pub newton_tolerance: T,
    /// Iteration cap of the Newton corrector.
    pub newton_max_iters: usize,
    /// Scale applied to each Newton correction.
    pub newton_damping: T,
    /// Maximum number of marching samples per direction.
    pub max_points: usize,
    /// Consecutive samples closer than this mean marching is stuck.
    pub minimum_point_distance: T,
    /// Returning within this world distance of the first sample closes the
    /// loop. Should be on the order of `step_size`.
    pub closure_tolerance: T,
    /// Closure is only tested after this many samples, to avoid false
    /// closure right at the start.
    pub closure_minimum_samples: usize,
    /// Intersect a surface with itself: the trivial coincident solution is
    /// rejected during the common-point search.
    pub self_intersection: bool,
    /// Parameter-space separation below which a `(u, v)` / `(s, t)` pair
    /// counts as the trivial self-intersection solution.
    pub minimum_parameter_separation: T,
    /// Optional constant offset applied to every emitted point along the
    /// bisector of the two surface normals.
    pub normal_offset: Option<T>,
    /// Cooperative cancellation checked inside the marching loop.
    pub cancellation: Option<CancellationToken>,
}

impl<T: FloatingPoint> Default for SurfaceIntersectionSolverOptions<T> {
    fn default() -> Self {
        Self {
            common_point_tolerance: T::from_f64(1e-6).unwrap(),
            descent_step: T::from_f64(5e-2).unwrap(),
            descent_max_iters: 1000,
            prescan_divisions: 8,
            step_size: T::from_f64(1e-1).unwrap(),
            tangent_tolerance: T::from_f64(1e-8).unwrap(),
            newton_tolerance: T::from_f64(1e-7).unwrap(),
            newton_max_iters: 20,
            newton_damping: T::from_f64(0.75).unwrap(),
            max_points: 5000,
            minimum_point_distance: T::from_f64(1e-9).unwrap(),
            closure_tolerance: T::from_f64(1e-1).unwrap(),
            closure_minimum_samples: 10,
            self_intersection: false,
            minimum_parameter_separation: T::from_f64(0.5).unwrap(),
            normal_offset: None,
            cancellation: None,
        }
    }
}

impl<T: FloatingPoint> SurfaceIntersectionSolverOptions<T> {
    pub fn with_common_point_tolerance(mut self, common_point_tolerance: T) -> Self {
        self.common_point_tolerance = common_point_tolerance;
        self
    }

    pub fn with_descent_step(mut self, descent_step: T) -> Self {
        self.descent_step = descent_step;
        self
    }

    pub fn with_descent_max_iters(mut self, descent_max_iters: u64) -> Self {
        self.descent_max_iters = descent_max_iters;
        self
    }

    pub fn with_prescan_divisions(mut self, prescan_divisions: usize) -> Self {
        self.prescan_divisions = prescan_divisions;
        self
    }

    pub fn with_step_size(mut self, step_size: T) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_newton_tolerance(mut self, newton_tolerance: T) -> Self {
        self.newton_tolerance = newton_tolerance;
        self
    }

    pub fn with_newton_max_iters(mut self, newton_max_iters: usize) -> Self {
        self.newton_max_iters = newton_max_iters;
        self
    }

    pub fn with_newton_damping(mut self, newton_damping: T) -> Self {
        self.newton_damping = newton_damping;
        self
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn with_closure_tolerance(mut self, closure_tolerance: T) -> Self {
        self.closure_tolerance = closure_tolerance;
        self
    }

    pub fn with_self_intersection(mut self, self_intersection: bool) -> Self {
        self.self_intersection = self_intersection;
        self
    }

    pub fn with_minimum_parameter_separation(mut self, minimum_parameter_separation: T) -> Self {
        self.minimum_parameter_separation = minimum_parameter_separation;
        self
    }

    pub fn with_normal_offset(mut self, normal_offset: T) -> Self {
        self.normal_offset = Some(normal_offset);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}
