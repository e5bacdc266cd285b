pub mod progress;
pub mod sink;

pub use progress::*;
pub use sink::*;
