//! Engine B's append-only table file (§3.6, §4.4, §6.2): one file per
//! table, a 256-byte header, and a tail of packed rows written directly
//! into a memory-mapped region that grows geometrically.

use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::codec::{self, ColumnLayout};
use crate::parser::ast::Expr;
use crate::predicate;
use crate::value::Value;

use super::header::{ColumnDescriptor, TableHeader, HEADER_SIZE};
use super::schema_parser;

/// Initial mapped size on `table_create`, mirroring `table_v2.c`'s
/// `INITIAL_FILE_SIZE`.
pub const INITIAL_FILE_SIZE: u64 = 1024 * 1024;
/// Doubling factor applied whenever an append needs more room, mirroring
/// `table_v2.c`'s `GROWTH_FACTOR`.
pub const GROWTH_FACTOR: u64 = 2;
/// Row-count threshold for an async durability hint, mirroring
/// `table_v2.c`'s `SYNC_INTERVAL_ROWS`.
pub const SYNC_INTERVAL_ROWS: u64 = 512;
/// Wall-clock threshold (ms) for an async durability hint, mirroring
/// `table_v2.c`'s `SYNC_INTERVAL_MS`.
pub const SYNC_INTERVAL_MS: u64 = 100;

const DATA_DIR: &str = "data";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad magic bytes: not an engine B table file")]
    BadMagic,
    #[error("unsupported file version {0}")]
    UnsupportedVersion(u32),
    #[error("schema declares too many columns: {0}")]
    TooManyColumns(usize),
    #[error("schema parse error: {0}")]
    SchemaParse(#[from] schema_parser::Error),
    #[error("table is closed")]
    Closed,
    #[error("row has {got} values but table has {want} columns")]
    RowSize { got: usize, want: usize },
    #[error(transparent)]
    Predicate(#[from] predicate::Error),
}

/// `{Created, Open, Closed}` per §4.13; only `Created`/`Open` accept
/// append/select/flush/remap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Closed,
}

/// An append-only Engine B table file: the mapped region, the parsed
/// header, and the bookkeeping needed to decide when to issue a
/// durability hint.
pub struct EngineBFile {
    file: File,
    mmap: MmapMut,
    header: TableHeader,
    layout: Vec<ColumnLayout>,
    write_offset: usize,
    rows_since_sync: u64,
    last_sync: Instant,
    state: State,
}

fn ensure_data_directory() -> Result<(), Error> {
    if !Path::new(DATA_DIR).exists() {
        std::fs::create_dir(DATA_DIR)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(DATA_DIR, std::fs::Permissions::from_mode(0o755))?;
        }
    }
    Ok(())
}

pub fn table_path(name: &str) -> PathBuf {
    Path::new(DATA_DIR).join(format!("{}.rdb", name))
}

fn layout_from_descriptors(columns: &[ColumnDescriptor]) -> Vec<ColumnLayout> {
    columns
        .iter()
        .map(|c| ColumnLayout {
            name: c.name.clone(),
            col_type: c.col_type,
            offset: c.offset as usize,
            length: c.length as usize,
        })
        .collect()
}

impl EngineBFile {
    /// Creates (truncating any existing file) a new Engine B table at
    /// `./data/<name>.rdb` from a schema string (§4.8).
    pub fn create(name: &str, schema_sql: &str) -> Result<EngineBFile, Error> {
        ensure_data_directory()?;
        let (columns, row_size) = schema_parser::parse_schema(schema_sql)?;
        let path = table_path(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(INITIAL_FILE_SIZE)?;
        let mut mmap = unsafe { MmapMut::map_mut(&file)? };

        let header = TableHeader::new(columns.clone(), row_size);
        header.write_to(&mut mmap[..HEADER_SIZE]);

        log::debug!("engine_b: created table {} ({} bytes)", name, INITIAL_FILE_SIZE);
        Ok(EngineBFile {
            file,
            mmap,
            layout: layout_from_descriptors(&header.columns),
            header,
            write_offset: HEADER_SIZE,
            rows_since_sync: 0,
            last_sync: Instant::now(),
            state: State::Open,
        })
    }

    /// Opens an existing table file, validating magic and version (§4.4).
    pub fn open(name: &str) -> Result<EngineBFile, Error> {
        let path = table_path(name);
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        let header = TableHeader::read_from(&mmap[..HEADER_SIZE])?;
        let write_offset = HEADER_SIZE + header.num_rows as usize * header.row_size as usize;
        log::debug!("engine_b: opened table {} ({} rows)", name, header.num_rows);
        Ok(EngineBFile {
            file,
            mmap,
            layout: layout_from_descriptors(&header.columns),
            header,
            write_offset,
            rows_since_sync: 0,
            last_sync: Instant::now(),
            state: State::Open,
        })
    }

    pub fn row_size(&self) -> usize {
        self.header.row_size as usize
    }

    pub fn get_row_count(&self) -> u64 {
        self.header.num_rows
    }

    pub fn columns(&self) -> &[ColumnLayout] {
        &self.layout
    }

    fn require_open(&self) -> Result<(), Error> {
        if self.state != State::Open {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Doubles the mapped file until `write_offset + row_size` fits, per
    /// §4.4's growth policy. Remapping invalidates prior borrows, which
    /// the `&mut self` signature on every mutating method already forbids
    /// holding across a call.
    fn ensure_space(&mut self, needed: usize) -> Result<(), Error> {
        if self.write_offset + needed <= self.mmap.len() {
            return Ok(());
        }
        let mut new_len = self.mmap.len() as u64;
        while (self.write_offset + needed) as u64 > new_len {
            new_len *= GROWTH_FACTOR;
        }
        self.file.set_len(new_len)?;
        self.mmap = unsafe { MmapMut::map_mut(&self.file)? };
        log::debug!("engine_b: grew file to {} bytes", new_len);
        Ok(())
    }

    /// Appends one row, packing it via the shared codec (§4.4).
    pub fn append_row(&mut self, values: &[Value]) -> Result<(), Error> {
        self.require_open()?;
        if values.len() != self.layout.len() {
            return Err(Error::RowSize {
                got: values.len(),
                want: self.layout.len(),
            });
        }
        let row_size = self.row_size();
        self.ensure_space(row_size)?;

        let packed = codec::pack(values, &self.layout, row_size)
            .map_err(|_| Error::RowSize { got: values.len(), want: self.layout.len() })?;
        let offset = self.write_offset;
        self.mmap[offset..offset + row_size].copy_from_slice(&packed);
        self.write_offset += row_size;

        self.header.num_rows += 1;
        self.mmap[16..24].copy_from_slice(&self.header.num_rows.to_le_bytes());

        self.rows_since_sync += 1;
        self.maybe_sync();
        Ok(())
    }

    fn maybe_sync(&mut self) {
        let due_by_count = self.rows_since_sync >= SYNC_INTERVAL_ROWS;
        let due_by_time = self.last_sync.elapsed() >= Duration::from_millis(SYNC_INTERVAL_MS);
        if due_by_count || due_by_time {
            let _ = self.mmap.flush_async_range(0, self.write_offset);
            self.rows_since_sync = 0;
            self.last_sync = Instant::now();
            log::trace!("engine_b: async sync issued at {} rows since last", self.rows_since_sync);
        }
    }

    /// Forces a durability hint regardless of the row/time threshold;
    /// `table_flush` in §6.4.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.require_open()?;
        self.mmap.flush_async_range(0, self.write_offset)?;
        self.rows_since_sync = 0;
        self.last_sync = Instant::now();
        Ok(())
    }

    /// Iterates rows `0..num_rows`, unpacking each and invoking `sink` for
    /// every row matching `where_clause`. The source ignores this
    /// argument entirely (§6.4); per the Open Question decision in
    /// `DESIGN.md` this wires it to the same generic predicate evaluator
    /// Engine A's non-vectorised scan path uses (§4.12), since the
    /// evaluator only needs a column layout and a materialised row, both
    /// of which this engine already has.
    pub fn select<F: FnMut(&[Value])>(&self, where_clause: Option<&Expr>, mut sink: F) -> Result<(), Error> {
        self.require_open()?;
        let row_size = self.row_size();
        for i in 0..self.header.num_rows as usize {
            let start = HEADER_SIZE + i * row_size;
            let row = codec::unpack(&self.mmap[start..start + row_size], &self.layout);
            let keep = match where_clause {
                Some(expr) => predicate::eval(expr, &self.layout, &row)?,
                None => true,
            };
            if keep {
                sink(&row);
            }
        }
        Ok(())
    }

    /// Final durability hint, then releases the mapping (§3.9, §4.4).
    pub fn close(mut self) -> Result<(), Error> {
        self.flush()?;
        self.state = State::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Engine B tables live at a fixed `./data/<name>.rdb` path (§6.5), so
    // tests that create tables must not run concurrently with each other
    // inside the same process working directory.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn cleanup(name: &str) {
        let _ = std::fs::remove_file(table_path(name));
    }

    #[test]
    fn test_create_open_append_select_round_trip() {
        let _guard = TEST_LOCK.lock().unwrap();
        let name = "test_round_trip";
        cleanup(name);

        {
            let mut t = EngineBFile::create(name, "(id INTEGER, label TEXT(16))").unwrap();
            t.append_row(&[Value::Integer(1), Value::Text(b"one".to_vec())]).unwrap();
            t.append_row(&[Value::Integer(2), Value::Text(b"two".to_vec())]).unwrap();
            t.close().unwrap();
        }

        let t = EngineBFile::open(name).unwrap();
        assert_eq!(t.get_row_count(), 2);
        let mut rows = Vec::new();
        t.select(None, |row| rows.push(row.to_vec())).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Value::Integer(1));
        assert_eq!(rows[1][0], Value::Integer(2));

        cleanup(name);
    }

    #[test]
    fn test_select_applies_where_clause() {
        use crate::parser::ast::{CmpOp, Constant, Primary};

        let _guard = TEST_LOCK.lock().unwrap();
        let name = "test_select_where";
        cleanup(name);

        let mut t = EngineBFile::create(name, "(id INTEGER, label TEXT(16))").unwrap();
        for i in 0..10i64 {
            t.append_row(&[Value::Integer(i), Value::Text(b"row".to_vec())]).unwrap();
        }

        let filter = Expr::Comparison {
            left: Primary::Column("id".to_string()),
            op: CmpOp::Lt,
            right: Primary::Literal(Constant::Integer(5)),
        };
        let mut rows = Vec::new();
        t.select(Some(&filter), |row| rows.push(row[0].clone())).unwrap();
        assert_eq!(rows, (0..5).map(Value::Integer).collect::<Vec<_>>());

        t.close().unwrap();
        cleanup(name);
    }

    #[test]
    fn test_file_grows_past_initial_size() {
        let _guard = TEST_LOCK.lock().unwrap();
        let name = "test_growth";
        cleanup(name);

        let mut t = EngineBFile::create(name, "(a INTEGER, b INTEGER, c INTEGER, d INTEGER)").unwrap();
        // row_size = 32; INITIAL_FILE_SIZE (1MiB) / 32 ~= 32768 rows before
        // the tail exceeds the initial mapping once the header is counted.
        let rows_to_force_growth = (INITIAL_FILE_SIZE as usize / 32) + 10;
        for i in 0..rows_to_force_growth as i64 {
            t.append_row(&[Value::Integer(i), Value::Integer(0), Value::Integer(0), Value::Integer(0)])
                .unwrap();
        }
        assert_eq!(t.get_row_count(), rows_to_force_growth as u64);
        t.close().unwrap();
        cleanup(name);
    }

    #[test]
    fn test_invariant_file_size_covers_rows() {
        let _guard = TEST_LOCK.lock().unwrap();
        let name = "test_invariant";
        cleanup(name);
        let mut t = EngineBFile::create(name, "(a INTEGER)").unwrap();
        for i in 0..100i64 {
            t.append_row(&[Value::Integer(i)]).unwrap();
        }
        let file_size = t.file.metadata().unwrap().len() as usize;
        assert!(file_size >= HEADER_SIZE + t.get_row_count() as usize * t.row_size());
        t.close().unwrap();
        cleanup(name);
    }
}
