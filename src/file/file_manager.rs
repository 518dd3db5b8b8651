use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::error::{FileError, FileResult};
use super::page::Page;
use super::store::FileStore;
use super::{INVALID_PAGE_ID, PAGE_SIZE, PageId};

/// Handle to an open file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(usize);

impl FileHandle {
    /// Wrap a raw id. Stores mint these; callers treat them as opaque.
    pub fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Disk-backed paged file store with file lifecycle management
pub struct FileManager {
    /// Map from file handles to open files
    open_files: HashMap<FileHandle, FileEntry>,
    /// Map from file paths to handles (for checking if already open)
    path_to_handle: HashMap<PathBuf, FileHandle>,
    /// Next available file handle
    next_handle: usize,
    /// Maximum number of open files
    max_open_files: usize,
}

struct FileEntry {
    file: File,
    path: PathBuf,
    /// Page slots released by `delete_page`, reused before extending the file
    free_pages: Vec<PageId>,
}

impl FileManager {
    /// Create a new file manager
    pub fn new() -> Self {
        Self::with_max_files(128)
    }

    /// Create a new file manager with specified max open files
    pub fn with_max_files(max_open_files: usize) -> Self {
        Self {
            open_files: HashMap::new(),
            path_to_handle: HashMap::new(),
            next_handle: 0,
            max_open_files,
        }
    }

    /// Create a new file
    pub fn create_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<()> {
        let path = path.as_ref();

        if path.exists() {
            return Err(FileError::FileAlreadyExists(path.display().to_string()));
        }

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        File::create(path)?;
        Ok(())
    }

    /// Open an existing file
    pub fn open_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<FileHandle> {
        let path_ref = path.as_ref();
        let path = path_ref
            .canonicalize()
            .map_err(|_| FileError::FileNotFound(path_ref.display().to_string()))?;

        // Opening the same path twice yields the same handle
        if let Some(&handle) = self.path_to_handle.get(&path) {
            return Ok(handle);
        }

        if self.open_files.len() >= self.max_open_files {
            return Err(FileError::TooManyOpenFiles);
        }

        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let handle = FileHandle(self.next_handle);
        self.next_handle += 1;

        self.open_files.insert(
            handle,
            FileEntry {
                file,
                path: path.clone(),
                free_pages: Vec::new(),
            },
        );
        self.path_to_handle.insert(path, handle);

        Ok(handle)
    }

    /// Close a file
    pub fn close_file(&mut self, handle: FileHandle) -> FileResult<()> {
        let entry = self
            .open_files
            .remove(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))?;

        self.path_to_handle.remove(&entry.path);
        Ok(())
    }

    /// Remove (delete) a file
    pub fn remove_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<()> {
        let path = path.as_ref();

        // If file is open, close it first
        if let Ok(canonical_path) = path.canonicalize()
            && let Some(&handle) = self.path_to_handle.get(&canonical_path)
        {
            self.close_file(handle)?;
        }

        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Get the number of page slots in a file, allocated or free
    pub fn page_count(&mut self, handle: FileHandle) -> FileResult<usize> {
        let entry = self.entry_mut(handle)?;
        let file_size = entry.file.metadata()?.len();
        Ok(file_size.div_ceil(PAGE_SIZE as u64) as usize)
    }

    /// Sync a file to disk (flush all OS buffers)
    pub fn sync_file(&mut self, handle: FileHandle) -> FileResult<()> {
        let entry = self.entry_mut(handle)?;
        entry.file.sync_data()?;
        Ok(())
    }

    /// Sync all open files to disk
    pub fn sync_all(&mut self) -> FileResult<()> {
        for entry in self.open_files.values_mut() {
            entry.file.sync_data()?;
        }
        Ok(())
    }

    /// Get the number of currently open files
    pub fn open_file_count(&self) -> usize {
        self.open_files.len()
    }

    fn entry_mut(&mut self, handle: FileHandle) -> FileResult<&mut FileEntry> {
        self.open_files
            .get_mut(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))
    }
}

impl FileStore for FileManager {
    fn contains(&self, file: FileHandle) -> bool {
        self.open_files.contains_key(&file)
    }

    fn read_page(&mut self, file: FileHandle, page_no: PageId) -> FileResult<Page> {
        let entry = self.entry_mut(file)?;

        let offset = page_no as u64 * PAGE_SIZE as u64;
        entry.file.seek(SeekFrom::Start(offset))?;

        let mut page = Page::new(page_no);
        let bytes_read = entry.file.read(page.data_mut())?;

        // Reads past end-of-file come back zeroed
        if bytes_read < PAGE_SIZE {
            page.data_mut()[bytes_read..].fill(0);
        }

        Ok(page)
    }

    fn write_page(&mut self, file: FileHandle, page: &Page) -> FileResult<()> {
        let page_no = page.page_number();
        if page_no == INVALID_PAGE_ID {
            return Err(FileError::PageNotAllocated(page_no));
        }

        let entry = self.entry_mut(file)?;

        let offset = page_no as u64 * PAGE_SIZE as u64;
        let required_size = offset + PAGE_SIZE as u64;

        // Extend file if necessary to ensure we can write at this offset
        let current_size = entry.file.metadata()?.len();
        if current_size < required_size {
            entry.file.set_len(required_size)?;
        }

        entry.file.seek(SeekFrom::Start(offset))?;
        entry.file.write_all(page.data())?;
        // No sync here - the OS batches writes until sync_file/sync_all

        Ok(())
    }

    fn allocate_page(&mut self, file: FileHandle) -> FileResult<Page> {
        let entry = self.entry_mut(file)?;

        let page_no = match entry.free_pages.pop() {
            Some(page_no) => page_no,
            None => {
                // No freed slot to reuse; extend the file by one page
                let file_size = entry.file.metadata()?.len();
                let page_no = file_size.div_ceil(PAGE_SIZE as u64) as usize;
                entry.file.set_len((page_no as u64 + 1) * PAGE_SIZE as u64)?;
                page_no
            }
        };

        Ok(Page::new(page_no))
    }

    fn delete_page(&mut self, file: FileHandle, page_no: PageId) -> FileResult<()> {
        let entry = self.entry_mut(file)?;

        let page_count = entry.file.metadata()?.len().div_ceil(PAGE_SIZE as u64) as usize;
        if page_no >= page_count || entry.free_pages.contains(&page_no) {
            return Err(FileError::PageNotAllocated(page_no));
        }

        // Zero the slot so a later read doesn't see stale contents
        let offset = page_no as u64 * PAGE_SIZE as u64;
        entry.file.seek(SeekFrom::Start(offset))?;
        entry.file.write_all(&vec![0u8; PAGE_SIZE])?;

        entry.free_pages.push(page_no);
        Ok(())
    }

    fn filename(&self, file: FileHandle) -> String {
        self.open_files
            .get(&file)
            .map(|entry| entry.path.display().to_string())
            .unwrap_or_default()
    }
}

impl Default for FileManager {
    fn default() -> Self {
        Self::new()
    }
}
