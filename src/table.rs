//! Engine A's table: column vector, row insertion, and the scan cursor
//! (§3.3, §3.4, §3.5, §4.3).

use streaming_iterator::StreamingIterator;

use crate::codec::{self, ColumnLayout};
use crate::index::OrderedIndex;
use crate::pager::{PageNum, Pager, PAGE_SIZE};
use crate::value::{ColumnType, Value};

/// `{page_id, offset_within_page}` — a page_id of 0 denotes "no such row",
/// used as the out-of-space sentinel from `insert_row` in the source.
/// This implementation allocates a new data page instead of returning the
/// sentinel (§4.3's documented fix for the source's single-page gap), but
/// the type still carries the sentinel meaning for `IndexScan` misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLocator {
    pub page_id: u32,
    pub offset_within_page: u16,
}

impl RowLocator {
    pub const NONE: RowLocator = RowLocator {
        page_id: 0,
        offset_within_page: 0,
    };
}

/// `{page_type, row_count}`, 8 bytes, at the start of every data page
/// (§3.4).
struct PageHeader;

impl PageHeader {
    const SIZE: usize = 8;

    fn row_count(page: &[u8]) -> u32 {
        u32::from_le_bytes(page[4..8].try_into().unwrap())
    }

    fn set_row_count(page: &mut [u8], count: u32) {
        page[4..8].copy_from_slice(&count.to_le_bytes());
    }

    fn init(page: &mut [u8]) {
        page[0..4].copy_from_slice(&0u32.to_le_bytes()); // page_type = 0
        Self::set_row_count(page, 0);
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Pager(#[from] crate::pager::Error),
    #[error(transparent)]
    Codec(#[from] codec::Error),
    #[error("column {0} not found")]
    ColumnNotFound(String),
    #[error("duplicate primary key {0}")]
    DuplicateKey(i64),
}

/// An Engine A table: columns, computed row size, the chain of data pages
/// holding its rows, and the optional primary index bound to its first
/// INTEGER column (§3.3).
pub struct Table {
    pub name: String,
    pub columns: Vec<ColumnLayout>,
    pub row_size: usize,
    pages: Vec<PageNum>,
    pub row_count: u64,
    next_row_id: u64,
    pub index: Option<OrderedIndex>,
}

impl Table {
    pub fn new(name: String, columns: Vec<(String, ColumnType, usize)>) -> Table {
        let (layout, row_size) = codec::layout_columns(&columns);
        let index = if layout.first().map(|c| c.col_type) == Some(ColumnType::Integer) {
            Some(OrderedIndex::new())
        } else {
            None
        };
        Table {
            name,
            columns: layout,
            row_size,
            pages: Vec::new(),
            row_count: 0,
            next_row_id: 0,
            index,
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    fn rows_per_page(&self) -> usize {
        (PAGE_SIZE - PageHeader::SIZE) / self.row_size
    }

    /// Inserts a packed row, allocating a new data page when the current
    /// tail page is full (§4.3). Updates the primary index if present.
    ///
    /// Checks for a duplicate primary key before writing anything: §7
    /// calls out "an append that fails after incrementing the row
    /// counter" as a known bug shape, so a rejected insert must leave the
    /// page bytes, page row-count, and `self.row_count` untouched.
    pub fn insert_row(&mut self, pager: &mut Pager, values: &[Value]) -> Result<RowLocator, Error> {
        let packed = codec::pack(values, &self.columns, self.row_size)?;

        if let Some(index) = &self.index {
            if let Some(key_val) = values.first().and_then(Value::as_integer) {
                if index.find(key_val as u32).is_some() {
                    return Err(Error::DuplicateKey(key_val));
                }
            }
        }

        if self.pages.is_empty() {
            let page_num = pager.allocate_page()?;
            let page = pager.get_page_rw(page_num)?;
            PageHeader::init(page);
            self.pages.push(page_num);
        }

        let rows_per_page = self.rows_per_page();
        let mut page_num = *self.pages.last().unwrap();
        {
            let page = pager.get_page_ro(page_num)?;
            if PageHeader::row_count(page) as usize >= rows_per_page {
                let new_page_num = pager.allocate_page()?;
                let page = pager.get_page_rw(new_page_num)?;
                PageHeader::init(page);
                self.pages.push(new_page_num);
                page_num = new_page_num;
            }
        }

        let page = pager.get_page_rw(page_num)?;
        let row_count = PageHeader::row_count(page);
        let offset = PageHeader::SIZE + row_count as usize * self.row_size;
        page[offset..offset + self.row_size].copy_from_slice(&packed);
        PageHeader::set_row_count(page, row_count + 1);

        self.row_count += 1;
        self.next_row_id += 1;

        let loc = RowLocator {
            page_id: page_num as u32,
            offset_within_page: offset as u16,
        };

        if let Some(index) = &mut self.index {
            if let Some(key_val) = values.first().and_then(Value::as_integer) {
                let inserted = index.insert(key_val as u32, loc);
                debug_assert!(inserted, "duplicate key should already have been rejected above");
            }
        }

        Ok(loc)
    }

    pub fn fetch_row(&self, pager: &mut Pager, loc: RowLocator) -> Result<Vec<Value>, Error> {
        let page = pager.get_page_ro(loc.page_id as PageNum)?;
        let start = loc.offset_within_page as usize;
        Ok(codec::unpack(&page[start..start + self.row_size], &self.columns))
    }

    /// Builds a fresh scan cursor over every row in the table, in
    /// insertion order (§4.3, §8 invariant 5).
    pub fn scanner<'p>(&self, pager: &'p mut Pager) -> Scanner<'p> {
        Scanner {
            pager,
            pages: self.pages.clone(),
            columns: self.columns.clone(),
            row_size: self.row_size,
            page_idx: 0,
            row_in_page: 0,
            item: None,
            at_end: self.pages.is_empty(),
        }
    }
}

/// `{current_page, current_offset, rows_scanned, at_end}` per §4.3/§4.13;
/// follows the page chain once the current page is exhausted, which is
/// the multi-page fix §4.3 calls for.
pub struct Scanner<'p> {
    pager: &'p mut Pager,
    pages: Vec<PageNum>,
    columns: Vec<ColumnLayout>,
    row_size: usize,
    page_idx: usize,
    row_in_page: usize,
    item: Option<Vec<Value>>,
    at_end: bool,
}

impl<'p> StreamingIterator for Scanner<'p> {
    type Item = Vec<Value>;

    fn advance(&mut self) {
        if self.at_end {
            self.item = None;
            return;
        }
        loop {
            if self.page_idx >= self.pages.len() {
                self.at_end = true;
                self.item = None;
                return;
            }
            let page_num = self.pages[self.page_idx];
            let page = match self.pager.get_page_ro(page_num) {
                Ok(p) => p,
                Err(_) => {
                    self.at_end = true;
                    self.item = None;
                    return;
                }
            };
            let row_count = PageHeader::row_count(page);
            if self.row_in_page as u32 >= row_count {
                self.page_idx += 1;
                self.row_in_page = 0;
                continue;
            }
            let offset = PageHeader::SIZE + self.row_in_page * self.row_size;
            let row = codec::unpack(&page[offset..offset + self.row_size], &self.columns);
            self.row_in_page += 1;
            self.item = Some(row);
            return;
        }
    }

    fn get(&self) -> Option<&Self::Item> {
        self.item.as_ref()
    }
}
