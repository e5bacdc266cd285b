pub mod box_filter;
pub mod create_filter;
pub mod gauss;
pub mod lanczos2;
pub mod mitchell;

pub use box_filter::*;
pub use create_filter::create_filter;
pub use gauss::*;
pub use lanczos2::*;
pub use mitchell::*;
