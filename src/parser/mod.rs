pub mod decoder;
pub mod event;
pub mod frame;
pub mod header;
pub mod log;
pub mod stream;

pub use decoder::*;
pub use event::*;
pub use frame::*;
pub use header::*;
pub use log::{index_sub_logs, LOG_START_MARKER};
pub use stream::*;
