pub mod color_passes;
pub mod pass_set;
pub mod pass_type;

pub use color_passes::*;
pub use pass_set::*;
pub use pass_type::*;
