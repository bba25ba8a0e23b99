pub mod common_point;
pub mod intersection_surface_surface;
pub mod surface_intersection_solver_options;

pub use common_point::*;
pub use intersection_surface_surface::*;
pub use surface_intersection_solver_options::*;
