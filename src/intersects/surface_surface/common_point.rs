use argmin::{argmin_error_closure, core::*};
use nalgebra::{Vector3, Vector4};

use crate::misc::FloatingPoint;
use crate::surface::parametric_surface::constrain_parameter;
use crate::surface::ParametricSurface;

/// Squared world-space distance between two surfaces, parameterized by the
/// stacked `(u, v, s, t)` vector. This is the cost the common-point search
/// descends on.
pub struct CommonPointProblem<'a, T: FloatingPoint, S1, S2> {
    a: &'a S1,
    b: &'a S2,
    phantom: std::marker::PhantomData<T>,
}

impl<'a, T, S1, S2> CommonPointProblem<'a, T, S1, S2>
where
    T: FloatingPoint,
    S1: ParametricSurface<T>,
    S2: ParametricSurface<T>,
{
    pub fn new(a: &'a S1, b: &'a S2) -> Self {
        Self {
            a,
            b,
            phantom: Default::default(),
        }
    }
}

fn normalized_or_zero<T: FloatingPoint>(v: Vector3<T>) -> Vector3<T> {
    let n = v.norm();
    if n <= T::default_epsilon() {
        Vector3::zeros()
    } else {
        v / n
    }
}

impl<T, S1, S2> CostFunction for CommonPointProblem<'_, T, S1, S2>
where
    T: FloatingPoint + ArgminFloat,
    S1: ParametricSurface<T>,
    S2: ParametricSurface<T>,
{
    type Param = Vector4<T>;
    type Output = T;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        let d = self.a.point_at(param.x, param.y) - self.b.point_at(param.z, param.w);
        Ok(d.norm_squared())
    }
}

impl<T, S1, S2> Gradient for CommonPointProblem<'_, T, S1, S2>
where
    T: FloatingPoint + ArgminFloat,
    S1: ParametricSurface<T>,
    S2: ParametricSurface<T>,
{
    type Param = Vector4<T>;
    type Gradient = Vector4<T>;

    /// Descent direction rather than the analytic gradient: the positional
    /// delta projected onto each surface's normalized tangent directions.
    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, Error> {
        let d = self.a.point_at(param.x, param.y) - self.b.point_at(param.z, param.w);
        let au = normalized_or_zero(self.a.u_tangent_at(param.x, param.y));
        let av = normalized_or_zero(self.a.v_tangent_at(param.x, param.y));
        let bu = normalized_or_zero(self.b.u_tangent_at(param.z, param.w));
        let bv = normalized_or_zero(self.b.v_tangent_at(param.z, param.w));
        Ok(Vector4::new(
            d.dot(&au),
            d.dot(&av),
            -d.dot(&bu),
            -d.dot(&bv),
        ))
    }
}

/// Projected gradient descent for the common-point search.
///
/// Steps against the projected-delta direction with a fixed multiplier,
/// constrains all four parameters to their domains after every step, and
/// halves the multiplier whenever a step fails to decrease the cost.
/// Termination is either success (distance below tolerance) or stagnation
/// (multiplier underflow / iteration cap); the caller decides whether a
/// stagnated run warrants a retry from another start.
#[derive(Clone, Copy)]
pub struct CommonPointDescent<F> {
    step: F,
    minimum_step: F,
    tolerance: F,
    maxima: [F; 4],
    clamped: [bool; 4],
}

impl<F: FloatingPoint> CommonPointDescent<F> {
    /// * `step` - initial descent multiplier
    /// * `tolerance` - world-space distance below which the pair converged
    /// * `maxima` - domain maxima of `(u, v, s, t)`
    /// * `clamped` - whether each axis clamps (true) or wraps (false)
    pub fn new(step: F, tolerance: F, maxima: [F; 4], clamped: [bool; 4]) -> Self {
        Self {
            step,
            minimum_step: step * F::from_f64(1e-6).unwrap(),
            tolerance,
            maxima,
            clamped,
        }
    }

    fn constrain(&self, param: Vector4<F>) -> Vector4<F> {
        Vector4::new(
            constrain_parameter(param.x, self.maxima[0], self.clamped[0]),
            constrain_parameter(param.y, self.maxima[1], self.clamped[1]),
            constrain_parameter(param.z, self.maxima[2], self.clamped[2]),
            constrain_parameter(param.w, self.maxima[3], self.clamped[3]),
        )
    }
}

impl<O, F> Solver<O, IterState<Vector4<F>, Vector4<F>, (), (), (), F>> for CommonPointDescent<F>
where
    F: FloatingPoint + ArgminFloat,
    O: CostFunction<Param = Vector4<F>, Output = F>
        + Gradient<Param = Vector4<F>, Gradient = Vector4<F>>,
{
    const NAME: &'static str = "Common point descent";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: IterState<Vector4<F>, Vector4<F>, (), (), (), F>,
    ) -> Result<(IterState<Vector4<F>, Vector4<F>, (), (), (), F>, Option<KV>), Error> {
        let x0 = state.get_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            "`CommonPointDescent` requires an initial parameter vector."
        ))?;
        let cost = problem.cost(x0)?;
        Ok((state.cost(cost), None))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: IterState<Vector4<F>, Vector4<F>, (), (), (), F>,
    ) -> Result<(IterState<Vector4<F>, Vector4<F>, (), (), (), F>, Option<KV>), Error> {
        let param = *state.get_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            "`CommonPointDescent` requires an initial parameter vector."
        ))?;

        let direction = problem.gradient(&param)?;
        let candidate = self.constrain(param - direction * self.step);
        let candidate_cost = problem.cost(&candidate)?;

        if candidate_cost < state.get_cost() {
            Ok((state.param(candidate).cost(candidate_cost), None))
        } else {
            // overshot; retry from the same spot with a smaller multiplier
            self.step = self.step * F::from_f64(0.5).unwrap();
            Ok((state.param(param), None))
        }
    }

    fn terminate(
        &mut self,
        state: &IterState<Vector4<F>, Vector4<F>, (), (), (), F>,
    ) -> TerminationStatus {
        if state.get_cost() < self.tolerance * self.tolerance {
            TerminationStatus::Terminated(TerminationReason::TargetCostReached)
        } else if state.iter > state.max_iters {
            TerminationStatus::Terminated(TerminationReason::MaxItersReached)
        } else if self.step < self.minimum_step {
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
        } else {
            TerminationStatus::NotTerminated
        }
    }
}
