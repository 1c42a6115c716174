//! Index line format.

use chrono::NaiveDate;
use shardcache_digest::Digest;

use crate::error::{IndexError, IndexResult};

/// `chrono` format of the date field.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// One live key in the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    /// Calendar date the key was first stored.
    pub date: NaiveDate,
    /// Digest of the key (also the content file name).
    pub digest: Digest,
    /// The original key.
    pub key: String,
}

impl IndexEntry {
    /// Create a new entry.
    pub fn new(date: NaiveDate, digest: Digest, key: impl Into<String>) -> Self {
        Self {
            date,
            digest,
            key: key.into(),
        }
    }

    /// Render as an index line, including the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{} {}: \"{}\"\n",
            self.date.format(DATE_FORMAT),
            self.digest,
            self.key
        )
    }

    /// Parse one line (without its newline). `line_no` is 1-based and only
    /// used for error reporting.
    pub fn parse_line(line_no: usize, line: &str) -> IndexResult<Self> {
        let malformed = |reason: String| IndexError::MalformedLine {
            line: line_no,
            reason,
        };

        let fields: Vec<&str> = line.split(' ').collect();
        let [date, digest, key] = fields.as_slice() else {
            return Err(malformed(format!(
                "expected 3 space-separated fields, found {}",
                fields.len()
            )));
        };

        let date = parse_date(date).ok_or_else(|| malformed(format!("bad date {date:?}")))?;
        let digest = digest
            .strip_suffix(':')
            .ok_or_else(|| malformed("digest field must end with ':'".into()))?;
        let digest = Digest::parse(digest).map_err(|e| malformed(e.to_string()))?;
        let key = key
            .strip_prefix('"')
            .and_then(|k| k.strip_suffix('"'))
            .ok_or_else(|| malformed("key must be wrapped in double quotes".into()))?;

        Ok(Self::new(date, digest, key))
    }
}

fn parse_date(field: &str) -> Option<NaiveDate> {
    if field.len() != 8 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = field[0..4].parse().ok()?;
    let month = field[4..6].parse().ok()?;
    let day = field[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
