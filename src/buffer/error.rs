use thiserror::Error;

use super::FrameId;
use crate::file::{FileError, PageId};

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Buffer pool exceeded: all frames are pinned")]
    BufferExceeded,

    #[error("Page not pinned: file={file}, page_id={page_no}, frame={frame_no}")]
    PageNotPinned {
        file: String,
        page_no: PageId,
        frame_no: FrameId,
    },

    #[error("Page still pinned: file={file}, page_id={page_no}, frame={frame_no}")]
    PagePinned {
        file: String,
        page_no: PageId,
        frame_no: FrameId,
    },

    #[error("Bad buffer state in frame {frame_no}: dirty={dirty}, valid={valid}, refbit={refbit}")]
    BadBuffer {
        frame_no: FrameId,
        dirty: bool,
        valid: bool,
        refbit: bool,
    },

    #[error("Page table entry already present: page_id={page_no}, frame={frame_no}")]
    PageTablePresent { page_no: PageId, frame_no: FrameId },

    #[error("Page table entry not found: page_id={page_no}")]
    PageTableMissing { page_no: PageId },
}

pub type BufferResult<T> = Result<T, BufferError>;
