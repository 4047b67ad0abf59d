pub mod frame;
pub mod header;
pub mod stats;

pub use frame::*;
pub use header::*;
pub use stats::*;
