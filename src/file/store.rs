use super::error::FileResult;
use super::file_manager::FileHandle;
use super::page::Page;
use super::PageId;

/// Page-granular persistence consumed by the buffer manager.
///
/// Implementations own the open files; the buffer manager refers to them only
/// through `FileHandle`, which must stay stable for as long as any frame
/// references it.
pub trait FileStore {
    /// Whether `file` refers to an open file. The buffer manager treats every
    /// operation on a handle for which this returns false as a silent no-op.
    fn contains(&self, file: FileHandle) -> bool;

    /// Read the current on-disk contents of a page
    fn read_page(&mut self, file: FileHandle, page_no: PageId) -> FileResult<Page>;

    /// Write a page back, using `page.page_number()` as the slot
    fn write_page(&mut self, file: FileHandle, page: &Page) -> FileResult<()>;

    /// Reserve a new page slot and return it as an initialized page
    fn allocate_page(&mut self, file: FileHandle) -> FileResult<Page>;

    /// Deallocate a page from the file
    fn delete_page(&mut self, file: FileHandle, page_no: PageId) -> FileResult<()>;

    /// Identifier for error reporting
    fn filename(&self, file: FileHandle) -> String;
}
