mod buf_mgr;
mod error;
mod frame;
mod page_table;

pub use buf_mgr::BufferManager;
pub use error::{BufferError, BufferResult};

/// Index of a frame within the pool
pub type FrameId = usize;

/// Default number of frames in the pool
/// 1024 frames x 8KB = 8MB of cached pages
pub const DEFAULT_POOL_SIZE: usize = 1024;
