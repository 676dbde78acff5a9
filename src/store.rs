// Generic flat-file record store.
//
// One delimited text file per entity type: a header row naming the declared
// columns, then one row per record, UTF-8 (a leading BOM is tolerated on
// read). The store owns all disk I/O; record types only know how to project
// themselves to and from a flat row.

use crate::error::{LibraryError, ParseError, Result};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Serialization contract between a typed record and the store's flat rows.
///
/// `to_fields` must emit exactly `COLUMNS` as keys; `from_fields` must reject
/// rows with missing or invalid values so the store can drop them.
pub trait Record: Sized {
    /// Declared column names, in file order.
    const COLUMNS: &'static [&'static str];

    fn to_fields(&self) -> Vec<(&'static str, String)>;

    fn from_fields(fields: &HashMap<String, String>) -> std::result::Result<Self, ParseError>;
}

/// File-backed storage for an ordered sequence of records of one type.
///
/// Rows come back from `load_all` in file order, and `replace_all` preserves
/// whatever order the caller hands it. The store imposes no sorting.
pub struct RecordStore<R: Record> {
    path: PathBuf,
    _marker: std::marker::PhantomData<R>,
}

impl<R: Record> RecordStore<R> {
    /// Open a store at `path`, creating a header-only file (and parent
    /// directories) if nothing exists there yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = RecordStore {
            path: path.into(),
            _marker: std::marker::PhantomData,
        };
        store.ensure_initialized()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the backing file with its header row if it does not exist.
    /// Idempotent; never touches an existing file.
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.storage_err(e))?;
        }

        let mut file = fs::File::create(&self.path).map_err(|e| self.storage_err(e))?;
        file.write_all(header_line::<R>().as_bytes())
            .map_err(|e| self.storage_err(e))?;

        debug!("initialized store file {}", self.path.display());
        Ok(())
    }

    /// Read and parse the whole file.
    ///
    /// Rows that fail to parse are logged and skipped, so one corrupt line
    /// never takes the rest of the dataset down with it. I/O failures are
    /// fatal `Storage` errors.
    pub fn load_all(&self) -> Result<Vec<R>> {
        let raw = fs::read_to_string(&self.path).map_err(|e| self.storage_err(e))?;
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(raw.as_bytes());

        let headers: Vec<String> = match reader.headers() {
            Ok(h) => h.iter().map(str::to_string).collect(),
            Err(e) => return Err(self.storage_err(invalid_data(e))),
        };

        let mut records = Vec::new();
        for (idx, row) in reader.records().enumerate() {
            let line = idx + 2; // 1-based, after the header
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!("{}: skipping unreadable row {line}: {e}", self.path.display());
                    continue;
                }
            };

            let fields: HashMap<String, String> = headers
                .iter()
                .cloned()
                .zip(row.iter().map(str::to_string))
                .collect();

            match R::from_fields(&fields) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("{}: skipping row {line}: {e}", self.path.display());
                }
            }
        }

        Ok(records)
    }

    /// Serialize and append exactly one row. Existing content is untouched.
    pub fn append(&self, record: &R) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.storage_err(e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(row_values(record))
            .map_err(|e| self.storage_err(invalid_data(e)))?;
        writer
            .flush()
            .map_err(|e| self.storage_err(e))?;
        Ok(())
    }

    /// Rewrite the entire file (header + rows) from `records`.
    ///
    /// The only mutation primitive: written to a temp file in the same
    /// directory, then renamed over the target, so an interrupted rewrite
    /// never leaves a truncated store behind.
    pub fn replace_all(&self, records: &[R]) -> Result<()> {
        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let tmp = NamedTempFile::new_in(&dir).map_err(|e| self.storage_err(e))?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file());
            writer
                .write_record(R::COLUMNS)
                .map_err(|e| self.storage_err(invalid_data(e)))?;
            for record in records {
                writer
                    .write_record(row_values(record))
                    .map_err(|e| self.storage_err(invalid_data(e)))?;
            }
            writer.flush().map_err(|e| self.storage_err(e))?;
        }

        tmp.persist(&self.path)
            .map_err(|e| self.storage_err(e.error))?;
        Ok(())
    }

    fn storage_err(&self, source: std::io::Error) -> LibraryError {
        LibraryError::storage(self.path.display().to_string(), source)
    }
}

/// Project a record's fields into `COLUMNS` order for the CSV writer.
fn row_values<R: Record>(record: &R) -> Vec<String> {
    let fields = record.to_fields();
    R::COLUMNS
        .iter()
        .map(|col| {
            fields
                .iter()
                .find(|(name, _)| name == col)
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        })
        .collect()
}

fn header_line<R: Record>() -> String {
    format!("{}\n", R::COLUMNS.join(","))
}

fn invalid_data(e: csv::Error) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    struct Pair {
        key: String,
        value: String,
    }

    impl Record for Pair {
        const COLUMNS: &'static [&'static str] = &["Key", "Value"];

        fn to_fields(&self) -> Vec<(&'static str, String)> {
            vec![("Key", self.key.clone()), ("Value", self.value.clone())]
        }

        fn from_fields(fields: &HashMap<String, String>) -> std::result::Result<Self, ParseError> {
            let key = fields
                .get("Key")
                .ok_or(ParseError::MissingColumn("Key"))?
                .clone();
            let value = fields
                .get("Value")
                .ok_or(ParseError::MissingColumn("Value"))?
                .clone();
            if key.is_empty() {
                return Err(ParseError::InvalidValue {
                    column: "Key",
                    value,
                });
            }
            Ok(Pair { key, value })
        }
    }

    fn store_in(dir: &TempDir) -> RecordStore<Pair> {
        RecordStore::open(dir.path().join("pairs.csv")).unwrap()
    }

    #[test]
    fn test_open_creates_header_only_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents, "Key,Value\n");
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_ensure_initialized_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .append(&Pair {
                key: "a".into(),
                value: "1".into(),
            })
            .unwrap();

        store.ensure_initialized().unwrap();
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_append_then_load_preserves_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for (k, v) in [("a", "1"), ("b", "2"), ("c", "3")] {
            store
                .append(&Pair {
                    key: k.into(),
                    value: v.into(),
                })
                .unwrap();
        }

        let loaded = store.load_all().unwrap();
        let keys: Vec<&str> = loaded.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_replace_all_rewrites_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .append(&Pair {
                key: "old".into(),
                value: "x".into(),
            })
            .unwrap();

        let replacement = vec![
            Pair {
                key: "new1".into(),
                value: "1".into(),
            },
            Pair {
                key: "new2".into(),
                value: "2".into(),
            },
        ];
        store.replace_all(&replacement).unwrap();

        assert_eq!(store.load_all().unwrap(), replacement);

        let contents = fs::read_to_string(store.path()).unwrap();
        assert!(contents.starts_with("Key,Value\n"));
        assert!(!contents.contains("old"));
    }

    #[test]
    fn test_load_skips_malformed_rows() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .append(&Pair {
                key: "good1".into(),
                value: "1".into(),
            })
            .unwrap();

        // Empty key fails Pair::from_fields
        fs::write(
            store.path(),
            "Key,Value\ngood1,1\n,broken\ngood2,2\n",
        )
        .unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].key, "good1");
        assert_eq!(loaded[1].key, "good2");
    }

    #[test]
    fn test_load_tolerates_utf8_bom() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        fs::write(store.path(), "\u{feff}Key,Value\na,1\n").unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].key, "a");
    }

    #[test]
    fn test_fields_with_commas_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let pair = Pair {
            key: "k".into(),
            value: "one, two".into(),
        };
        store.append(&pair).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, vec![pair]);
    }
}
