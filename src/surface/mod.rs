pub mod bezier_patch;
pub mod gregory_patch;
pub mod offset_surface;
pub mod parametric_surface;
pub mod patch_surface;

pub use bezier_patch::*;
pub use gregory_patch::*;
pub use offset_surface::*;
pub use parametric_surface::*;
pub use patch_surface::*;

#[cfg(test)]
mod tests;
