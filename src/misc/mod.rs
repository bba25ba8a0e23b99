pub mod bernstein;
pub mod cancellation;
pub mod floating_point;
pub mod invertible;
pub mod transformable;
pub mod transpose;

pub use bernstein::*;
pub use cancellation::*;
pub use floating_point::*;
pub use invertible::*;
pub use transformable::*;
pub use transpose::*;
