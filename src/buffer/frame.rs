use std::fmt;

use super::FrameId;
use crate::file::{FileHandle, INVALID_PAGE_ID, PageId};

/// Metadata for one frame of the pool.
///
/// `set` and `clear` are the only transitions; every component goes through
/// them so the valid/pin/dirty flags stay consistent with the page table.
#[derive(Debug)]
pub(crate) struct FrameDesc {
    /// The frame's own index, immutable after construction
    pub(crate) frame_no: FrameId,
    /// Owning file of the resident page, `None` when the frame is empty
    pub(crate) file: Option<FileHandle>,
    pub(crate) page_no: PageId,
    /// Outstanding users of the resident page
    pub(crate) pin_cnt: u32,
    /// Page modified in memory and not yet written back
    pub(crate) dirty: bool,
    /// Frame currently holds a resident page
    pub(crate) valid: bool,
    /// Recently-referenced mark consulted by the clock sweep
    pub(crate) refbit: bool,
}

impl FrameDesc {
    pub(crate) fn new(frame_no: FrameId) -> Self {
        Self {
            frame_no,
            file: None,
            page_no: INVALID_PAGE_ID,
            pin_cnt: 0,
            dirty: false,
            valid: false,
            refbit: false,
        }
    }

    /// Stamp the frame with a newly resident page: one pin, clean, referenced
    pub(crate) fn set(&mut self, file: FileHandle, page_no: PageId) {
        self.file = Some(file);
        self.page_no = page_no;
        self.pin_cnt = 1;
        self.valid = true;
        self.dirty = false;
        self.refbit = true;
    }

    /// Return the frame to the empty state, forgetting its page identity
    pub(crate) fn clear(&mut self) {
        self.file = None;
        self.page_no = INVALID_PAGE_ID;
        self.pin_cnt = 0;
        self.valid = false;
        self.dirty = false;
        self.refbit = false;
    }
}

impl fmt::Display for FrameDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.file {
            Some(file) => write!(f, "file={} page_no={}", file.as_usize(), self.page_no)?,
            None => write!(f, "file=- page_no=-")?,
        }
        write!(
            f,
            " pin_cnt={} dirty={} valid={} refbit={}",
            self.pin_cnt, self.dirty, self.valid, self.refbit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_empty() {
        let desc = FrameDesc::new(3);
        assert_eq!(desc.frame_no, 3);
        assert!(desc.file.is_none());
        assert_eq!(desc.pin_cnt, 0);
        assert!(!desc.valid);
        assert!(!desc.dirty);
        assert!(!desc.refbit);
    }

    #[test]
    fn test_set_pins_and_references() {
        let mut desc = FrameDesc::new(0);
        desc.dirty = true;

        desc.set(FileHandle::new(1), 42);
        assert_eq!(desc.file, Some(FileHandle::new(1)));
        assert_eq!(desc.page_no, 42);
        assert_eq!(desc.pin_cnt, 1);
        assert!(desc.valid);
        assert!(!desc.dirty);
        assert!(desc.refbit);
    }

    #[test]
    fn test_clear_forgets_identity() {
        let mut desc = FrameDesc::new(0);
        desc.set(FileHandle::new(1), 42);
        desc.dirty = true;

        desc.clear();
        assert!(desc.file.is_none());
        assert_eq!(desc.page_no, INVALID_PAGE_ID);
        assert_eq!(desc.pin_cnt, 0);
        assert!(!desc.valid);
        assert!(!desc.dirty);
        assert!(!desc.refbit);
    }
}
