use super::FloatingPoint;

/// Cubic Bernstein basis values `[B0, B1, B2, B3]` at `t`.
/// All bicubic patches in this crate are evaluated through these bases,
/// so the degree is fixed and the polynomials are expanded by hand.
pub fn cubic_bernstein<T: FloatingPoint>(t: T) -> [T; 4] {
    let s = T::one() - t;
    let three = T::from_f64(3.).unwrap();
    [s * s * s, three * s * s * t, three * s * t * t, t * t * t]
}

/// Derivatives of the cubic Bernstein basis `[B0', B1', B2', B3']` at `t`.
pub fn cubic_bernstein_derivative<T: FloatingPoint>(t: T) -> [T; 4] {
    let s = T::one() - t;
    let three = T::from_f64(3.).unwrap();
    let six = T::from_f64(6.).unwrap();
    [
        -three * s * s,
        three * s * s - six * s * t,
        six * s * t - three * t * t,
        three * t * t,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_of_unity() {
        for i in 0..=10 {
            let t = i as f64 / 10.;
            let b = cubic_bernstein(t);
            let sum: f64 = b.iter().sum();
            assert!((sum - 1.).abs() < 1e-12);
        }
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let h = 1e-7;
        for i in 1..10 {
            let t = i as f64 / 10.;
            let d = cubic_bernstein_derivative(t);
            let b0 = cubic_bernstein(t - h);
            let b1 = cubic_bernstein(t + h);
            for k in 0..4 {
                let fd = (b1[k] - b0[k]) / (2. * h);
                assert!((d[k] - fd).abs() < 1e-5);
            }
        }
    }
}
