// Cache store for the per-identity lines-of-code file.
// Parses and renders the text format, and writes it atomically through a temp file.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{Result, StatError};
use crate::history::RepoScan;

use super::paths::cache_file_path;

/// Comment lines written when a rebuild finds no existing block to keep.
pub const DEFAULT_COMMENT_LINE: &str =
    "This line is a comment block. Write whatever you want here.";

/// Prefix of the trailing line left by an emergency flush.
const INTERRUPTED_MARKER: &str = "interrupted";

/// Cached state of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRecord {
    /// SHA-256 of `owner/name`.
    pub hash: String,
    /// Default-branch commit count when the record was last scanned.
    pub commit_count: u64,
    /// Commits authored by the scanning identity.
    pub matching_commits: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
}

impl RepositoryRecord {
    /// A record that has never been scanned.
    pub fn unscanned(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            commit_count: 0,
            matching_commits: 0,
            lines_added: 0,
            lines_deleted: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.commit_count == 0
            && self.matching_commits == 0
            && self.lines_added == 0
            && self.lines_deleted == 0
    }

    pub fn reset(&mut self) {
        *self = Self::unscanned(std::mem::take(&mut self.hash));
    }

    /// Replace the record with a complete scan taken at `commit_count`.
    pub fn update(&mut self, commit_count: u64, scan: &RepoScan) {
        self.commit_count = commit_count;
        self.matching_commits = scan.matching_commits;
        self.lines_added = scan.additions;
        self.lines_deleted = scan.deletions;
    }

    fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(' ').collect();
        let &[hash, commits, matching, added, deleted] = fields.as_slice() else {
            return Err(StatError::CacheCorrupt(format!(
                "expected 5 fields, found {}: {:?}",
                fields.len(),
                line
            )));
        };
        if hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(StatError::CacheCorrupt(format!(
                "invalid repository hash {:?}",
                hash
            )));
        }
        let number = |field: &str| -> Result<u64> {
            field
                .parse()
                .map_err(|_| StatError::CacheCorrupt(format!("invalid count {:?}", field)))
        };
        Ok(Self {
            hash: hash.to_string(),
            commit_count: number(commits)?,
            matching_commits: number(matching)?,
            lines_added: number(added)?,
            lines_deleted: number(deleted)?,
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.hash,
            self.commit_count,
            self.matching_commits,
            self.lines_added,
            self.lines_deleted
        )
    }
}

/// Totals folded over every record of a cache file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanTotals {
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub matching_commits: u64,
    /// No repository needed a history scan this run.
    pub was_fully_cached: bool,
}

impl ScanTotals {
    pub fn net_lines(&self) -> i64 {
        self.lines_added as i64 - self.lines_deleted as i64
    }
}

/// Parsed contents of one identity's cache file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFile {
    /// Opaque annotation lines, passed through untouched.
    pub comments: Vec<String>,
    pub records: Vec<RepositoryRecord>,
    /// Set when the previous run was cut short and flushed.
    pub interrupted_at: Option<DateTime<Utc>>,
}

impl CacheFile {
    pub fn new(comments: Vec<String>, records: Vec<RepositoryRecord>) -> Self {
        Self {
            comments,
            records,
            interrupted_at: None,
        }
    }

    /// Parse a cache file whose comment block is `comment_size` lines long.
    pub fn parse(text: &str, comment_size: usize) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() < comment_size {
            return Err(StatError::CacheCorrupt(format!(
                "expected {} comment lines, file has {} lines",
                comment_size,
                lines.len()
            )));
        }

        let (comments, body) = lines.split_at(comment_size);
        // A record or marker inside the block means the file was written with a
        // smaller comment size.
        if let Some(line) = comments
            .iter()
            .find(|line| RepositoryRecord::parse(line).is_ok() || is_marker(line))
        {
            return Err(StatError::CacheCorrupt(format!(
                "comment block holds a cache line {:?}",
                line
            )));
        }
        let mut records = Vec::with_capacity(body.len());
        let mut interrupted_at = None;

        for (index, line) in body.iter().enumerate() {
            if let Some(rest) = line.strip_prefix(INTERRUPTED_MARKER) {
                if index + 1 != body.len() {
                    return Err(StatError::CacheCorrupt(
                        "recovery marker is not the last line".to_string(),
                    ));
                }
                let timestamp: i64 = rest.trim().parse().map_err(|_| {
                    StatError::CacheCorrupt(format!("invalid recovery marker {:?}", line))
                })?;
                interrupted_at = DateTime::from_timestamp(timestamp, 0);
                continue;
            }
            records.push(RepositoryRecord::parse(line)?);
        }

        Ok(Self {
            comments: comments.iter().map(|c| c.to_string()).collect(),
            records,
            interrupted_at,
        })
    }

    /// Render the file; the recovery marker is only written by `flush`.
    pub fn render(&self) -> String {
        let mut text = String::new();
        for line in self.comments.iter() {
            text.push_str(line);
            text.push('\n');
        }
        for record in &self.records {
            text.push_str(&record.to_line());
            text.push('\n');
        }
        text
    }

    pub fn totals(&self, was_fully_cached: bool) -> ScanTotals {
        self.records.iter().fold(
            ScanTotals {
                was_fully_cached,
                ..ScanTotals::default()
            },
            |mut totals, record| {
                totals.lines_added += record.lines_added;
                totals.lines_deleted += record.lines_deleted;
                totals.matching_commits += record.matching_commits;
                totals
            },
        )
    }
}

fn is_marker(line: &str) -> bool {
    line.strip_prefix(INTERRUPTED_MARKER)
        .is_some_and(|rest| rest.trim().parse::<i64>().is_ok())
}

fn marker_line(at: DateTime<Utc>) -> String {
    format!("{} {}\n", INTERRUPTED_MARKER, at.timestamp())
}

/// Write raw text atomically via a temp file.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(text.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Read raw text, returning `None` if the file does not exist.
pub fn read_text(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Emergency write after an interrupt or a failed scan.
///
/// Writes `snapshot` (the last fully committed state) followed by a recovery marker.
/// Without a snapshot the current file contents are kept as they are, and a missing
/// file becomes a bare marker.
pub fn flush(path: &Path, snapshot: Option<&CacheFile>, at: DateTime<Utc>) -> Result<()> {
    let mut text = match snapshot {
        Some(file) => file.render(),
        None => read_text(path)?
            .map(|existing| {
                let mut lines: Vec<&str> = existing.lines().collect();
                if lines.last().is_some_and(|line| is_marker(line)) {
                    lines.pop();
                }
                lines.iter().fold(String::new(), |mut text, line| {
                    text.push_str(line);
                    text.push('\n');
                    text
                })
            })
            .unwrap_or_default(),
    };
    text.push_str(&marker_line(at));
    write_text(path, &text)?;
    warn!(path = %path.display(), "flushed cache with recovery marker");
    Ok(())
}

/// The lines-of-code cache of one scanning identity.
#[derive(Debug, Clone)]
pub struct RepoCache {
    path: PathBuf,
    comment_size: usize,
}

impl RepoCache {
    pub fn new(path: impl Into<PathBuf>, comment_size: usize) -> Self {
        Self {
            path: path.into(),
            comment_size,
        }
    }

    /// Cache for `identity` stored under `dir`.
    pub fn for_identity(dir: &Path, identity: &str, comment_size: usize) -> Self {
        Self::new(cache_file_path(dir, identity), comment_size)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn comment_size(&self) -> usize {
        self.comment_size
    }

    /// Load the cache file; missing or corrupt files come back as `None`.
    pub fn load(&self) -> Result<Option<CacheFile>> {
        let Some(text) = read_text(&self.path)? else {
            debug!(path = %self.path.display(), "no cache file");
            return Ok(None);
        };

        match CacheFile::parse(&text, self.comment_size) {
            Ok(file) => {
                if let Some(at) = file.interrupted_at {
                    warn!(
                        "previous run was interrupted at {}, resuming from its last checkpoint",
                        at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
                Ok(Some(file))
            }
            Err(StatError::CacheCorrupt(reason)) => {
                warn!(path = %self.path.display(), "discarding invalid cache: {}", reason);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Comment block to carry into a rebuilt file.
    ///
    /// Only a file that still parses with this comment size donates its block;
    /// anything else gets the default lines.
    pub fn comment_block(&self) -> Result<Vec<String>> {
        let existing = read_text(&self.path)?
            .and_then(|text| CacheFile::parse(&text, self.comment_size).ok());
        Ok(match existing {
            Some(file) => file.comments,
            None => vec![DEFAULT_COMMENT_LINE.to_string(); self.comment_size],
        })
    }

    /// Persist `file` atomically.
    pub fn save(&self, file: &CacheFile) -> Result<()> {
        write_text(&self.path, &file.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn hash(c: char) -> String {
        std::iter::repeat_n(c, 64).collect()
    }

    fn sample() -> CacheFile {
        CacheFile::new(
            vec!["first note".to_string(), "second note".to_string()],
            vec![
                RepositoryRecord {
                    hash: hash('a'),
                    commit_count: 5,
                    matching_commits: 5,
                    lines_added: 120,
                    lines_deleted: 30,
                },
                RepositoryRecord::unscanned(hash('b')),
            ],
        )
    }

    #[test]
    fn test_render_layout() {
        let text = sample().render();
        let expected = format!(
            "first note\nsecond note\n{} 5 5 120 30\n{} 0 0 0 0\n",
            hash('a'),
            hash('b')
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_parse_rendered_file() {
        let file = sample();
        let parsed = CacheFile::parse(&file.render(), 2).unwrap();
        assert_eq!(parsed, file);
    }

    #[test]
    fn test_parse_rejects_wrong_comment_size() {
        let text = sample().render();
        // A smaller block makes a comment line land in the record section
        assert!(matches!(
            CacheFile::parse(&text, 1),
            Err(StatError::CacheCorrupt(_))
        ));
        // A larger block runs out of lines
        assert!(matches!(
            CacheFile::parse(&text, 7),
            Err(StatError::CacheCorrupt(_))
        ));
        // or swallows a record into the comment block
        assert!(matches!(
            CacheFile::parse(&text, 3),
            Err(StatError::CacheCorrupt(_))
        ));

        let bare_marker = "interrupted 1700000000\n";
        assert!(CacheFile::parse(bare_marker, 1).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_records() {
        let short = format!("{} 1 2 3\n", hash('a'));
        assert!(CacheFile::parse(&short, 0).is_err());

        let not_a_number = format!("{} 1 x 3 4\n", hash('a'));
        assert!(CacheFile::parse(&not_a_number, 0).is_err());

        assert!(CacheFile::parse("deadbeef 1 1 1 1\n", 0).is_err());
    }

    #[test]
    fn test_parse_recovery_marker() {
        let text = format!("note\n{} 3 1 10 2\ninterrupted 1700000000\n", hash('c'));
        let file = CacheFile::parse(&text, 1).unwrap();
        assert_eq!(file.records.len(), 1);
        assert_eq!(
            file.interrupted_at,
            DateTime::from_timestamp(1_700_000_000, 0)
        );

        let misplaced = format!("interrupted 1700000000\n{} 3 1 10 2\n", hash('c'));
        assert!(CacheFile::parse(&misplaced, 0).is_err());
    }

    #[test]
    fn test_totals() {
        let totals = sample().totals(false);
        assert_eq!(totals.lines_added, 120);
        assert_eq!(totals.lines_deleted, 30);
        assert_eq!(totals.net_lines(), 90);
        assert_eq!(totals.matching_commits, 5);
        assert!(!totals.was_fully_cached);

        let mut heavy_deletes = sample();
        heavy_deletes.records[1].lines_deleted = 500;
        assert_eq!(heavy_deletes.totals(true).net_lines(), -410);
    }

    #[test]
    fn test_record_reset_keeps_hash() {
        let mut record = sample().records[0].clone();
        record.reset();
        assert!(record.is_zero());
        assert_eq!(record.hash, hash('a'));
    }

    #[test]
    fn test_load_missing_and_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let cache = RepoCache::for_identity(temp_dir.path(), "octocat", 2);
        assert!(cache.load().unwrap().is_none());

        write_text(cache.path(), "only one line\n").unwrap();
        assert!(cache.load().unwrap().is_none());

        cache.save(&sample()).unwrap();
        assert_eq!(cache.load().unwrap(), Some(sample()));
    }

    #[test]
    fn test_comment_block_reuse_and_default() {
        let temp_dir = TempDir::new().unwrap();
        let cache = RepoCache::for_identity(temp_dir.path(), "octocat", 2);
        assert_eq!(
            cache.comment_block().unwrap(),
            vec![DEFAULT_COMMENT_LINE.to_string(); 2]
        );

        cache.save(&sample()).unwrap();
        assert_eq!(
            cache.comment_block().unwrap(),
            vec!["first note".to_string(), "second note".to_string()]
        );

        // The same file read with a larger block would hand back a record line
        let grown = RepoCache::for_identity(temp_dir.path(), "octocat", 3);
        assert_eq!(
            grown.comment_block().unwrap(),
            vec![DEFAULT_COMMENT_LINE.to_string(); 3]
        );
    }

    #[test]
    fn test_flush_snapshot_with_marker() {
        let temp_dir = TempDir::new().unwrap();
        let cache = RepoCache::for_identity(temp_dir.path(), "octocat", 2);
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        flush(cache.path(), Some(&sample()), at).unwrap();

        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded.records, sample().records);
        assert_eq!(loaded.interrupted_at, Some(at));
        assert!(!cache.path().with_extension("tmp").exists());
    }

    #[test]
    fn test_flush_without_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let cache = RepoCache::for_identity(temp_dir.path(), "octocat", 2);
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        // Nothing on disk: a bare marker
        flush(cache.path(), None, at).unwrap();
        assert_eq!(
            read_text(cache.path()).unwrap().unwrap(),
            "interrupted 1700000000\n"
        );

        // Existing file: contents kept, marker replaced
        cache.save(&sample()).unwrap();
        flush(cache.path(), None, at).unwrap();
        flush(cache.path(), None, at).unwrap();
        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded.records, sample().records);
        assert_eq!(loaded.interrupted_at, Some(at));
    }
}
