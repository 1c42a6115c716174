use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use shardcache_digest::Digest;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::entry::IndexEntry;
use crate::error::IndexResult;

/// File name of the index inside the store root.
pub const INDEX_FILE_NAME: &str = "index";

/// The store's index file.
///
/// `IndexLog` keeps no open handle and no lock of its own: every call opens
/// the file, and the store serializes calls behind its own lock. A missing
/// file is an empty index.
#[derive(Clone, Debug)]
pub struct IndexLog {
    path: PathBuf,
}

impl IndexLog {
    /// The index belonging to the store rooted at `root`.
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(INDEX_FILE_NAME),
        }
    }

    /// Path to the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. Returns the index size in bytes afterwards.
    pub fn append(&self, entry: &IndexEntry) -> IndexResult<u64> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.to_line().as_bytes())?;
        file.flush()?;
        let size = file.metadata()?.len();
        debug!(digest = %entry.digest, size, "index append");
        Ok(size)
    }

    /// Parse every line of the index, in file order.
    pub fn scan(&self) -> IndexResult<Vec<IndexEntry>> {
        let Some(file) = open_if_exists(&self.path)? else {
            return Ok(Vec::new());
        };
        let mut entries = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            entries.push(IndexEntry::parse_line(i + 1, &line?)?);
        }
        Ok(entries)
    }

    /// All indexed keys, sorted.
    pub fn list_keys(&self) -> IndexResult<Vec<String>> {
        let mut keys: Vec<String> = self.scan()?.into_iter().map(|e| e.key).collect();
        keys.sort();
        Ok(keys)
    }

    /// Rewrite the index without the lines for `digests`. Returns the number
    /// of lines dropped.
    ///
    /// Only the digest field of each line is looked at, so lines whose key
    /// contains spaces are still matched. Kept lines are copied verbatim.
    /// The new file is written next to the index and renamed over it.
    pub fn rewrite_without(&self, digests: &HashSet<Digest>) -> IndexResult<usize> {
        if digests.is_empty() {
            return Ok(0);
        }
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut kept = String::with_capacity(content.len());
        let mut dropped = 0;
        for line in content.split_inclusive('\n') {
            let matches = line
                .split(' ')
                .nth(1)
                .and_then(|field| field.strip_suffix(':'))
                .is_some_and(|digest| digests.contains(digest));
            if matches {
                dropped += 1;
            } else {
                kept.push_str(line);
            }
        }
        if dropped == 0 {
            return Ok(0);
        }

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(kept.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(dropped, remaining = kept.len(), "index rewritten");
        Ok(dropped)
    }

    /// Current size of the index in bytes (0 if it does not exist).
    pub fn size_bytes(&self) -> IndexResult<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the index file. A missing file is not an error.
    pub fn clear(&self) -> IndexResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn open_if_exists(path: &Path) -> io::Result<Option<File>> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn entry(key: &str) -> IndexEntry {
        IndexEntry::new(date(), Digest::of(key), key)
    }

    fn open() -> (tempfile::TempDir, IndexLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = IndexLog::new(dir.path());
        (dir, log)
    }

    // -----------------------------------------------------------------------
    // Append / scan
    // -----------------------------------------------------------------------

    #[test]
    fn missing_file_is_empty() {
        let (_dir, log) = open();
        assert!(log.scan().unwrap().is_empty());
        assert!(log.list_keys().unwrap().is_empty());
        assert_eq!(log.size_bytes().unwrap(), 0);
    }

    #[test]
    fn append_then_scan_preserves_order() {
        let (_dir, log) = open();
        log.append(&entry("b")).unwrap();
        log.append(&entry("a")).unwrap();

        let entries = log.scan().unwrap();
        assert_eq!(entries, vec![entry("b"), entry("a")]);
    }

    #[test]
    fn append_reports_growing_size() {
        let (_dir, log) = open();
        let first = log.append(&entry("a")).unwrap();
        // 8 + 1 + 32 + 2 + 3 + 1
        assert_eq!(first, 47);
        let second = log.append(&entry("b")).unwrap();
        assert_eq!(second, 94);
        assert_eq!(log.size_bytes().unwrap(), 94);
    }

    #[test]
    fn file_content_is_plain_text() {
        let (_dir, log) = open();
        log.append(&entry("a")).unwrap();
        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text, "20261018 0cc175b9c0f1b6a831c399e269772661: \"a\"\n");
    }

    #[test]
    fn list_keys_is_sorted() {
        let (_dir, log) = open();
        for key in ["c", "a", "b"] {
            log.append(&entry(key)).unwrap();
        }
        assert_eq!(log.list_keys().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn key_with_space_breaks_scan() {
        let (_dir, log) = open();
        log.append(&entry("a")).unwrap();
        log.append(&entry("has space")).unwrap();

        let err = log.scan().unwrap_err();
        assert!(matches!(err, IndexError::MalformedLine { line: 2, .. }));
        assert!(log.list_keys().is_err());
    }

    #[test]
    fn key_with_newline_breaks_scan() {
        let (_dir, log) = open();
        log.append(&entry("first\nsecond")).unwrap();
        log.append(&entry("b")).unwrap();

        // The key's first half is left with an unterminated quote.
        let err = log.scan().unwrap_err();
        assert!(matches!(err, IndexError::MalformedLine { line: 1, .. }));
        assert!(log.list_keys().is_err());
    }

    // -----------------------------------------------------------------------
    // Rewrite
    // -----------------------------------------------------------------------

    #[test]
    fn rewrite_drops_matching_lines_only() {
        let (_dir, log) = open();
        for key in ["a", "b", "c"] {
            log.append(&entry(key)).unwrap();
        }

        let drop: HashSet<Digest> = [Digest::of("b")].into_iter().collect();
        assert_eq!(log.rewrite_without(&drop).unwrap(), 1);
        assert_eq!(log.list_keys().unwrap(), vec!["a", "c"]);
        assert_eq!(log.size_bytes().unwrap(), 94);
    }

    #[test]
    fn rewrite_drops_duplicate_lines() {
        let (_dir, log) = open();
        log.append(&entry("a")).unwrap();
        log.append(&entry("a")).unwrap();
        log.append(&entry("b")).unwrap();

        let drop: HashSet<Digest> = [Digest::of("a")].into_iter().collect();
        assert_eq!(log.rewrite_without(&drop).unwrap(), 2);
        assert_eq!(log.list_keys().unwrap(), vec!["b"]);
    }

    #[test]
    fn rewrite_matches_keys_with_spaces() {
        let (_dir, log) = open();
        log.append(&entry("a")).unwrap();
        log.append(&entry("has space")).unwrap();

        let drop: HashSet<Digest> = [Digest::of("has space")].into_iter().collect();
        assert_eq!(log.rewrite_without(&drop).unwrap(), 1);
        assert_eq!(log.list_keys().unwrap(), vec!["a"]);
    }

    #[test]
    fn rewrite_without_matches_leaves_file_alone() {
        let (_dir, log) = open();
        log.append(&entry("a")).unwrap();
        let drop: HashSet<Digest> = [Digest::of("zzz")].into_iter().collect();
        assert_eq!(log.rewrite_without(&drop).unwrap(), 0);
        assert_eq!(log.list_keys().unwrap(), vec!["a"]);
    }

    #[test]
    fn rewrite_of_missing_file_is_a_no_op() {
        let (_dir, log) = open();
        let drop: HashSet<Digest> = [Digest::of("a")].into_iter().collect();
        assert_eq!(log.rewrite_without(&drop).unwrap(), 0);
        assert!(!log.path().exists());
    }

    #[test]
    fn rewrite_leaves_no_temp_files() {
        let (dir, log) = open();
        log.append(&entry("a")).unwrap();
        log.append(&entry("b")).unwrap();
        let drop: HashSet<Digest> = [Digest::of("a")].into_iter().collect();
        log.rewrite_without(&drop).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![INDEX_FILE_NAME]);
    }

    #[test]
    fn clear_removes_file_and_tolerates_absence() {
        let (_dir, log) = open();
        log.append(&entry("a")).unwrap();
        log.clear().unwrap();
        assert!(!log.path().exists());
        log.clear().unwrap();
    }
}
