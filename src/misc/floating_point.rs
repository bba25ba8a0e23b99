use nalgebra::RealField;
use num_traits::ToPrimitive;

/// Scalar trait for the geometry kernel (f32, f64)
/// Mainly used to identify the field type in nalgebra expressions
pub trait FloatingPoint: RealField + ToPrimitive + Copy {}

impl FloatingPoint for f32 {}
impl FloatingPoint for f64 {}
