//! Engine A's paged mmap substrate (§4.2): a file viewed as fixed-size
//! pages, lazily resolved, grown geometrically (well, linearly per-page --
//! the source grows to exactly the page requested) via truncate+remap.
//!
//! Per §9's re-architecture note, the mapping is an *owned* region
//! (`memmap2::MmapMut`) from which callers borrow bounded slices; no raw
//! pointer into the mapping is ever retained across a remap. `":memory:"`
//! is honoured as a request for an anonymous mapping (an Open Question
//! resolved in `DESIGN.md`) rather than a literal file of that name.

use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub type PageNum = usize;

/// Fixed page size, per §3.4.
pub const PAGE_SIZE: usize = 4096;
/// Page-table bound, mirroring `pager.h`'s `TABLE_MAX_PAGES` (original).
pub const MAX_PAGE_NUM: usize = 1000;

const MEMORY_PATH: &str = ":memory:";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error accessing database file: {0}")]
    Io(#[from] std::io::Error),
    #[error("page number {0} exceeds the maximum of {}", MAX_PAGE_NUM)]
    PageOutOfRange(PageNum),
}

enum Backing {
    File(File),
    Anon,
}

/// Owns the file (if any) and the current memory mapping. Grows the
/// mapping by dropping it, resizing the backing store, and remapping --
/// this is the only place a remap happens, so callers cannot observe a
/// stale pointer: every accessor takes `&self`/`&mut self` and returns a
/// slice borrowed from the live mapping.
pub struct Pager {
    backing: Backing,
    mmap: MmapMut,
    num_pages: usize,
}

impl Pager {
    /// Opens (creating if absent) the database file at `path`, or an
    /// anonymous in-memory mapping if `path` is `":memory:"`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Pager, Error> {
        let path = path.as_ref();
        if path == Path::new(MEMORY_PATH) {
            return Pager::open_anon();
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let len = file.metadata()?.len() as usize;
        let num_pages = if len == 0 {
            file.set_len(PAGE_SIZE as u64)?;
            1
        } else {
            (len + PAGE_SIZE - 1) / PAGE_SIZE
        };
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        log::debug!("pager: opened {:?} with {} page(s)", path, num_pages);
        Ok(Pager {
            backing: Backing::File(file),
            mmap,
            num_pages,
        })
    }

    fn open_anon() -> Result<Pager, Error> {
        let mmap = MmapMut::map_anon(PAGE_SIZE)?;
        log::debug!("pager: opened anonymous in-memory mapping");
        Ok(Pager {
            backing: Backing::Anon,
            mmap,
            num_pages: 1,
        })
    }

    pub fn num_pages(&self) -> usize {
        self.num_pages
    }

    /// Growth policy (§4.2): `get_page(n)` for `n >= current_num_pages`
    /// triggers a resize to `(n+1) * PAGE_SIZE` bytes and a full remap; the
    /// newly allocated page is zeroed.
    fn ensure_present(&mut self, page: PageNum) -> Result<(), Error> {
        if page >= MAX_PAGE_NUM {
            return Err(Error::PageOutOfRange(page));
        }
        if page < self.num_pages {
            return Ok(());
        }
        let new_num_pages = page + 1;
        let new_len = new_num_pages * PAGE_SIZE;
        match &mut self.backing {
            Backing::File(file) => {
                file.set_len(new_len as u64)?;
                // SAFETY: this pager is the sole owner of the file
                // descriptor and no slice from the previous mapping
                // outlives this call (§4.2's "sole in-flight access"
                // invariant, enforced by Rust borrowing elsewhere).
                self.mmap = unsafe { MmapMut::map_mut(file)? };
            }
            Backing::Anon => {
                let mut new_mmap = MmapMut::map_anon(new_len)?;
                new_mmap[..self.mmap.len()].copy_from_slice(&self.mmap[..]);
                self.mmap = new_mmap;
            }
        }
        self.num_pages = new_num_pages;
        log::debug!("pager: grew to {} page(s)", new_num_pages);
        Ok(())
    }

    /// Allocates the next page (beyond the current highest), zeroing it,
    /// and returns its page number.
    pub fn allocate_page(&mut self) -> Result<PageNum, Error> {
        let page = self.num_pages;
        self.ensure_present(page)?;
        Ok(page)
    }

    pub fn get_page_ro(&mut self, page: PageNum) -> Result<&[u8], Error> {
        self.ensure_present(page)?;
        let start = page * PAGE_SIZE;
        Ok(&self.mmap[start..start + PAGE_SIZE])
    }

    pub fn get_page_rw(&mut self, page: PageNum) -> Result<&mut [u8], Error> {
        self.ensure_present(page)?;
        let start = page * PAGE_SIZE;
        Ok(&mut self.mmap[start..start + PAGE_SIZE])
    }

    /// Issues an async durability hint over a single page (`MS_ASYNC`
    /// equivalent).
    pub fn flush_page(&self, page: PageNum) -> Result<(), Error> {
        if page >= self.num_pages {
            return Ok(());
        }
        let start = page * PAGE_SIZE;
        self.mmap.flush_async_range(start, PAGE_SIZE)?;
        Ok(())
    }

    /// Issues a synchronous sync over the whole mapping (`MS_SYNC`
    /// equivalent). Close implies sync.
    pub fn sync(&self) -> Result<(), Error> {
        self.mmap.flush()?;
        Ok(())
    }

    pub fn path(&self) -> Option<PathBuf> {
        None // the source keeps no path on the handle once opened; callers track it
    }
}

impl Drop for Pager {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            log::debug!("pager: sync on drop failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_anon_starts_with_one_page() {
        let mut pager = Pager::open(":memory:").unwrap();
        assert_eq!(pager.num_pages(), 1);
        let page = pager.get_page_ro(0).unwrap();
        assert_eq!(page.len(), PAGE_SIZE);
        assert!(page.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_grows_on_demand_and_zeroes_new_page() {
        let mut pager = Pager::open(":memory:").unwrap();
        {
            let page0 = pager.get_page_rw(0).unwrap();
            page0[0] = 0xAB;
        }
        let page3 = pager.get_page_ro(3).unwrap();
        assert_eq!(pager.num_pages(), 4);
        assert!(page3.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_file_backed_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        {
            let mut pager = Pager::open(&path).unwrap();
            let page0 = pager.get_page_rw(0).unwrap();
            page0[..5].copy_from_slice(b"hello");
            pager.sync().unwrap();
        }
        {
            let mut pager = Pager::open(&path).unwrap();
            let page0 = pager.get_page_ro(0).unwrap();
            assert_eq!(&page0[..5], b"hello");
        }
    }

    #[test]
    fn test_page_offset_belongs_to_correct_page() {
        // §4.2 invariant: file offset n*PAGE_SIZE..(n+1)*PAGE_SIZE always
        // belongs to page n.
        let mut pager = Pager::open(":memory:").unwrap();
        pager.get_page_rw(1).unwrap()[0] = 7;
        assert_eq!(pager.get_page_ro(0).unwrap()[0], 0);
        assert_eq!(pager.get_page_ro(1).unwrap()[0], 7);
    }
}
