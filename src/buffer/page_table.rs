use std::hash::{DefaultHasher, Hash, Hasher};

use super::FrameId;
use super::error::{BufferError, BufferResult};
use crate::file::{FileHandle, PageId};

/// A key identifying a resident page: the owning file and its page number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PageKey {
    pub(crate) file: FileHandle,
    pub(crate) page_no: PageId,
}

#[derive(Debug)]
struct Entry {
    key: PageKey,
    frame_no: FrameId,
}

/// Maps each resident page to the frame holding it.
///
/// Chained hashing over a bucket count fixed at construction. The pool never
/// holds more than `num_bufs` entries, so chains stay short.
pub(crate) struct PageTable {
    buckets: Vec<Vec<Entry>>,
}

impl PageTable {
    /// Build a table sized for a pool of `num_bufs` frames
    pub(crate) fn with_capacity(num_bufs: usize) -> Self {
        let bucket_count = num_bufs + num_bufs / 5 + 1;
        Self {
            buckets: (0..bucket_count).map(|_| Vec::new()).collect(),
        }
    }

    fn bucket_of(&self, key: &PageKey) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.buckets.len()
    }

    /// Add a mapping; the key must not already be present
    pub(crate) fn insert(&mut self, key: PageKey, frame_no: FrameId) -> BufferResult<()> {
        let bucket = self.bucket_of(&key);
        if self.buckets[bucket].iter().any(|entry| entry.key == key) {
            return Err(BufferError::PageTablePresent {
                page_no: key.page_no,
                frame_no,
            });
        }
        self.buckets[bucket].push(Entry { key, frame_no });
        Ok(())
    }

    /// The frame holding the page, if resident
    pub(crate) fn lookup(&self, key: PageKey) -> Option<FrameId> {
        let bucket = self.bucket_of(&key);
        self.buckets[bucket]
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.frame_no)
    }

    /// Delete a mapping; the key must be present
    pub(crate) fn remove(&mut self, key: PageKey) -> BufferResult<FrameId> {
        let bucket = self.bucket_of(&key);
        match self.buckets[bucket]
            .iter()
            .position(|entry| entry.key == key)
        {
            Some(index) => Ok(self.buckets[bucket].swap_remove(index).frame_no),
            None => Err(BufferError::PageTableMissing {
                page_no: key.page_no,
            }),
        }
    }

    /// Number of resident pages
    pub(crate) fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
}
