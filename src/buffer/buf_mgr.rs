use std::fmt;

use tracing::{debug, error, trace};

use super::error::{BufferError, BufferResult};
use super::frame::FrameDesc;
use super::page_table::{PageKey, PageTable};
use super::{DEFAULT_POOL_SIZE, FrameId};
use crate::file::{FileHandle, FileStore, Page, PageId};

/// A bounded pool of page frames over a paged file store.
///
/// Pages are served from the pool when resident and loaded from their file
/// otherwise, evicting another page under a clock second-chance policy when
/// every frame is occupied. Callers receive pinned page references and
/// release them with [`unpin_page`](BufferManager::unpin_page); dirty pages
/// are written back before their frame is reused and on drop.
///
/// Single-caller: the manager makes no synchronization guarantees.
pub struct BufferManager<S: FileStore> {
    /// Underlying paged file store
    files: S,
    /// Per-frame metadata, indexed by `FrameId`
    descs: Vec<FrameDesc>,
    /// Frame buffer, parallel to `descs`
    pool: Vec<Page>,
    /// Maps `(file, page_no)` of each resident page to its frame
    table: PageTable,
    /// Clock-sweep cursor
    clock_hand: FrameId,
}

impl<S: FileStore> BufferManager<S> {
    /// Create a pool with [`DEFAULT_POOL_SIZE`] frames
    pub fn new(files: S) -> Self {
        Self::with_capacity(files, DEFAULT_POOL_SIZE)
    }

    /// Create a pool with `num_bufs` frames.
    ///
    /// # Panics
    ///
    /// Panics if `num_bufs` is zero.
    pub fn with_capacity(files: S, num_bufs: usize) -> Self {
        assert!(num_bufs >= 1, "buffer pool needs at least one frame");
        Self {
            files,
            descs: (0..num_bufs).map(FrameDesc::new).collect(),
            pool: (0..num_bufs).map(|_| Page::default()).collect(),
            table: PageTable::with_capacity(num_bufs),
            // The first advance lands on frame 0
            clock_hand: num_bufs - 1,
        }
    }

    /// Get a reference to the file store
    pub fn files(&self) -> &S {
        &self.files
    }

    /// Get a mutable reference to the file store
    pub fn files_mut(&mut self) -> &mut S {
        &mut self.files
    }

    /// Number of frames in the pool
    pub fn num_bufs(&self) -> usize {
        self.descs.len()
    }

    fn advance_clock(&mut self) {
        self.clock_hand = (self.clock_hand + 1) % self.descs.len();
    }

    /// Select a frame for an incoming page with the clock sweep.
    ///
    /// The returned frame is invalid and unindexed; the caller populates its
    /// pool slot and stamps the descriptor. A resident victim is written back
    /// first when dirty, and its page-table entry is removed whether dirty or
    /// clean. Fails with [`BufferError::BufferExceeded`] once every frame has
    /// been seen pinned within this call.
    fn alloc_buf(&mut self) -> BufferResult<FrameId> {
        let mut pinned_seen = 0;
        loop {
            self.advance_clock();
            let hand = self.clock_hand;

            if !self.descs[hand].valid {
                return Ok(hand);
            }
            if self.descs[hand].refbit {
                // Second chance: spare the frame once per sweep
                self.descs[hand].refbit = false;
                continue;
            }
            if self.descs[hand].pin_cnt > 0 {
                pinned_seen += 1;
                if pinned_seen == self.descs.len() {
                    return Err(BufferError::BufferExceeded);
                }
                continue;
            }

            // Valid, unreferenced, unpinned: this is the victim
            let file = self.descs[hand].file.expect("valid frame has an owning file");
            let page_no = self.descs[hand].page_no;

            if self.descs[hand].dirty {
                trace!(frame = hand, page = page_no, "writing back dirty victim");
                self.files.write_page(file, &self.pool[hand])?;
            }
            // Drop the entry on clean evictions too, or the table would keep
            // pointing at a repurposed frame
            self.table.remove(PageKey { file, page_no })?;
            self.descs[hand].clear();
            return Ok(hand);
        }
    }

    /// Fetch a page, pinning its frame.
    ///
    /// Serves the page from the pool when resident, otherwise loads it from
    /// `file` into a frame chosen by the clock sweep. Returns `Ok(None)` when
    /// `file` is not open in the store. The returned page is pinned and its
    /// frame marked referenced; release it with
    /// [`unpin_page`](BufferManager::unpin_page).
    pub fn read_page(
        &mut self,
        file: FileHandle,
        page_no: PageId,
    ) -> BufferResult<Option<&mut Page>> {
        if !self.files.contains(file) {
            return Ok(None);
        }

        let key = PageKey { file, page_no };
        let frame_no = match self.table.lookup(key) {
            Some(frame_no) => {
                self.descs[frame_no].refbit = true;
                self.descs[frame_no].pin_cnt += 1;
                frame_no
            }
            None => {
                let frame_no = self.alloc_buf()?;
                self.pool[frame_no] = self.files.read_page(file, page_no)?;
                self.table.insert(key, frame_no)?;
                self.descs[frame_no].set(file, page_no);
                frame_no
            }
        };

        Ok(Some(&mut self.pool[frame_no]))
    }

    /// Release one pin on a resident page, optionally marking it dirty.
    ///
    /// Unknown files and non-resident pages are ignored. The dirty flag is
    /// monotonic: passing `dirty = false` never clears it. Fails with
    /// [`BufferError::PageNotPinned`] when the frame has no outstanding pins.
    pub fn unpin_page(
        &mut self,
        file: FileHandle,
        page_no: PageId,
        dirty: bool,
    ) -> BufferResult<()> {
        if !self.files.contains(file) {
            return Ok(());
        }
        let Some(frame_no) = self.table.lookup(PageKey { file, page_no }) else {
            return Ok(());
        };

        if self.descs[frame_no].pin_cnt == 0 {
            return Err(BufferError::PageNotPinned {
                file: self.files.filename(file),
                page_no,
                frame_no,
            });
        }

        self.descs[frame_no].pin_cnt -= 1;
        if dirty {
            self.descs[frame_no].dirty = true;
        }
        Ok(())
    }

    /// Allocate a new page in `file` and pin it in a frame.
    ///
    /// Returns the new page number along with the page, or `Ok(None)` when
    /// `file` is not open in the store.
    pub fn alloc_page(&mut self, file: FileHandle) -> BufferResult<Option<(PageId, &mut Page)>> {
        if !self.files.contains(file) {
            return Ok(None);
        }

        let page = self.files.allocate_page(file)?;
        let page_no = page.page_number();

        let frame_no = self.alloc_buf()?;
        self.pool[frame_no] = page;
        self.table.insert(PageKey { file, page_no }, frame_no)?;
        self.descs[frame_no].set(file, page_no);

        Ok(Some((page_no, &mut self.pool[frame_no])))
    }

    /// Drop a page from the pool, if resident, and delete it from its file.
    ///
    /// A pinned page may be disposed; the pin is discarded with the frame.
    pub fn dispose_page(&mut self, file: FileHandle, page_no: PageId) -> BufferResult<()> {
        if !self.files.contains(file) {
            return Ok(());
        }

        let key = PageKey { file, page_no };
        if let Some(frame_no) = self.table.lookup(key) {
            self.descs[frame_no].clear();
            self.table.remove(key)?;
        }
        self.files.delete_page(file, page_no)?;
        Ok(())
    }

    /// Write back and drop every resident page belonging to `file`.
    ///
    /// Frames are visited in ascending index order. Fails with
    /// [`BufferError::PagePinned`] on the first frame still pinned and with
    /// [`BufferError::BadBuffer`] on a frame associated with `file` while
    /// invalid; frames flushed before the failure stay flushed.
    pub fn flush_file(&mut self, file: FileHandle) -> BufferResult<()> {
        if !self.files.contains(file) {
            return Ok(());
        }

        for frame_no in 0..self.descs.len() {
            if self.descs[frame_no].file != Some(file) {
                continue;
            }
            if !self.descs[frame_no].valid {
                return Err(BufferError::BadBuffer {
                    frame_no,
                    dirty: self.descs[frame_no].dirty,
                    valid: self.descs[frame_no].valid,
                    refbit: self.descs[frame_no].refbit,
                });
            }
            if self.descs[frame_no].pin_cnt > 0 {
                return Err(BufferError::PagePinned {
                    file: self.files.filename(file),
                    page_no: self.descs[frame_no].page_no,
                    frame_no,
                });
            }

            let page_no = self.descs[frame_no].page_no;
            if self.descs[frame_no].dirty {
                debug!(frame = frame_no, page = page_no, "flushing dirty page");
                self.files.write_page(file, &self.pool[frame_no])?;
                self.descs[frame_no].dirty = false;
            }
            self.table.remove(PageKey { file, page_no })?;
            self.descs[frame_no].clear();
        }
        Ok(())
    }

    /// Number of pages currently resident in the pool
    pub fn cached_page_count(&self) -> usize {
        self.table.len()
    }

    /// Whether a page is currently resident
    pub fn is_page_cached(&self, file: FileHandle, page_no: PageId) -> bool {
        self.table.lookup(PageKey { file, page_no }).is_some()
    }

    /// Number of frames holding modifications not yet written back
    pub fn dirty_page_count(&self) -> usize {
        self.descs.iter().filter(|desc| desc.dirty).count()
    }

    /// Outstanding pins on a page, or `None` when it is not resident
    pub fn pin_count(&self, file: FileHandle, page_no: PageId) -> Option<u32> {
        self.table
            .lookup(PageKey { file, page_no })
            .map(|frame_no| self.descs[frame_no].pin_cnt)
    }

    /// Dump the state of every frame to stdout
    pub fn print_self(&self) {
        println!("{self}");
    }
}

impl<S: FileStore> fmt::Display for BufferManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut valid_frames = 0;
        for desc in &self.descs {
            writeln!(f, "frame {}: {}", desc.frame_no, desc)?;
            if desc.valid {
                valid_frames += 1;
            }
        }
        write!(f, "total valid frames: {valid_frames}")
    }
}

impl<S: FileStore> Drop for BufferManager<S> {
    /// Write back every dirty page on shutdown. Pinned frames are written
    /// back too; failures can only be logged from here.
    fn drop(&mut self) {
        for frame_no in 0..self.descs.len() {
            if self.descs[frame_no].valid && self.descs[frame_no].dirty {
                let file = self.descs[frame_no]
                    .file
                    .expect("valid frame has an owning file");
                match self.files.write_page(file, &self.pool[frame_no]) {
                    Ok(()) => self.descs[frame_no].dirty = false,
                    Err(e) => error!(
                        frame = frame_no,
                        page = self.descs[frame_no].page_no,
                        "write-back failed during shutdown: {e}"
                    ),
                }
            }
        }
    }
}
