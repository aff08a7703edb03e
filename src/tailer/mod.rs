//! Incremental, rotation-tolerant log reading
//!
//! The tailer only ever reads bytes appended since the last recorded offset.
//! A file shorter than that offset was truncated or replaced, so reading
//! restarts from the beginning and the lost content is never counted.

pub mod matcher;

pub use matcher::LineMatcher;

use std::io::SeekFrom;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Content read from one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailChunk {
    /// Offset to resume from on the next poll
    pub new_offset: u64,
    /// Complete lines read since the previous offset
    pub content: String,
    /// Whether the file shrank and reading restarted from 0
    pub reset: bool,
}

/// Reads appended content from log files
#[derive(Debug, Clone)]
pub struct Tailer {
    max_read_bytes: u64,
}

impl Tailer {
    pub fn new(max_read_bytes: u64) -> Self {
        Self {
            max_read_bytes: max_read_bytes.max(1),
        }
    }

    /// Current length of the file, used to place the first offset at the end
    pub async fn file_len(&self, path: &Path) -> Result<u64, TailError> {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .map_err(|source| TailError::Unreadable {
                path: path.display().to_string(),
                source,
            })
    }

    /// Read complete lines appended after `from_offset`.
    ///
    /// A trailing line without a newline is left for the next poll, unless a
    /// single line fills the whole read budget: then its head is consumed as
    /// one line and the rest of it is skipped on later polls.
    pub async fn read(&self, path: &Path, from_offset: u64) -> Result<TailChunk, TailError> {
        let unreadable = |source| TailError::Unreadable {
            path: path.display().to_string(),
            source,
        };

        let mut file = File::open(path).await.map_err(unreadable)?;
        let len = file.metadata().await.map_err(unreadable)?.len();

        let (start, reset) = if len < from_offset {
            tracing::info!(
                path = %path.display(),
                offset = from_offset,
                len,
                "File shrank, restarting from the beginning"
            );
            (0, true)
        } else {
            (from_offset, false)
        };

        let budget = (len - start).min(self.max_read_bytes);
        if budget == 0 {
            return Ok(TailChunk {
                new_offset: start,
                content: String::new(),
                reset,
            });
        }

        // Also read the byte before `start` to know whether it begins a line
        let lead = u64::from(start > 0);
        file.seek(SeekFrom::Start(start - lead))
            .await
            .map_err(unreadable)?;

        let mut buf = Vec::with_capacity((budget + lead) as usize);
        (&mut file)
            .take(budget + lead)
            .read_to_end(&mut buf)
            .await
            .map_err(unreadable)?;

        let mid_line = lead == 1 && buf.first() != Some(&b'\n');
        let data = &buf[lead as usize..];

        // The remainder of a line whose head was already consumed
        let skipped = if mid_line {
            data.iter()
                .position(|&b| b == b'\n')
                .map_or(data.len(), |idx| idx + 1)
        } else {
            0
        };
        let data = &data[skipped..];

        let (consumed, forced) = match data.iter().rposition(|&b| b == b'\n') {
            Some(idx) => (idx + 1, false),
            None if skipped == 0 && data.len() as u64 >= self.max_read_bytes => (data.len(), true),
            None => (0, false),
        };

        let mut lines = &data[..consumed];
        if forced {
            // Don't let the cut split a multi-byte character
            if let Err(e) = std::str::from_utf8(lines) {
                if e.error_len().is_none() {
                    lines = &lines[..e.valid_up_to()];
                }
            }
            tracing::warn!(
                path = %path.display(),
                max_read_bytes = self.max_read_bytes,
                "Line exceeds read budget, remainder will be skipped"
            );
        }

        Ok(TailChunk {
            new_offset: start + (skipped + consumed) as u64,
            content: String::from_utf8_lossy(lines).into_owned(),
            reset,
        })
    }
}

impl Default for Tailer {
    fn default() -> Self {
        Self::new(8 * 1024 * 1024)
    }
}

/// Tailing errors. All of them are transient: the file is retried next tick.
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    #[error("Can't read '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn append(path: &Path, data: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(data.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn test_reads_only_new_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "first\nsecond\n");

        let tailer = Tailer::default();
        let chunk = tailer.read(&path, 0).await.unwrap();
        assert_eq!(chunk.content, "first\nsecond\n");
        assert_eq!(chunk.new_offset, 13);
        assert!(!chunk.reset);

        append(&path, "third\n");
        let chunk = tailer.read(&path, chunk.new_offset).await.unwrap();
        assert_eq!(chunk.content, "third\n");
        assert_eq!(chunk.new_offset, 19);
    }

    #[tokio::test]
    async fn test_partial_line_is_deferred() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "done\nhalf");

        let tailer = Tailer::default();
        let chunk = tailer.read(&path, 0).await.unwrap();
        assert_eq!(chunk.content, "done\n");
        assert_eq!(chunk.new_offset, 5);

        append(&path, "-written\n");
        let chunk = tailer.read(&path, chunk.new_offset).await.unwrap();
        assert_eq!(chunk.content, "half-written\n");
    }

    #[tokio::test]
    async fn test_truncation_resets_offset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "error one\nerror two\nerror three\n");

        let tailer = Tailer::default();
        let first = tailer.read(&path, 0).await.unwrap();

        // Rotate: replace with a shorter file
        std::fs::write(&path, "fresh\n").unwrap();

        let chunk = tailer.read(&path, first.new_offset).await.unwrap();
        assert!(chunk.reset);
        assert_eq!(chunk.content, "fresh\n");
        assert_eq!(chunk.new_offset, 6);
    }

    #[tokio::test]
    async fn test_read_budget() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "aaaa\nbbbb\ncccc\n");

        let tailer = Tailer::new(12);
        let chunk = tailer.read(&path, 0).await.unwrap();
        assert_eq!(chunk.content, "aaaa\nbbbb\n");

        let chunk = tailer.read(&path, chunk.new_offset).await.unwrap();
        assert_eq!(chunk.content, "cccc\n");
    }

    #[tokio::test]
    async fn test_oversized_line_is_consumed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "0123456789abcdef\n");

        let tailer = Tailer::new(8);
        let chunk = tailer.read(&path, 0).await.unwrap();
        assert_eq!(chunk.content, "01234567");
        assert_eq!(chunk.new_offset, 8);
    }

    #[tokio::test]
    async fn test_oversized_line_counted_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "ERROR ERROR ERROR ERROR\nERROR short\n");

        // The first line is twice the budget, the second fits exactly
        let tailer = Tailer::new(12);
        let matcher = LineMatcher::new("ERROR").unwrap();

        let mut offset = 0;
        let mut total = 0;
        for _ in 0..5 {
            let chunk = tailer.read(&path, offset).await.unwrap();
            total += matcher.count(&chunk.content);
            offset = chunk.new_offset;
        }

        assert_eq!(offset, std::fs::metadata(&path).unwrap().len());
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_forced_cut_keeps_characters_whole() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        // 'é' is two bytes and straddles the 6-byte budget
        append(&path, "abcdeé tail\n");

        let tailer = Tailer::new(6);
        let chunk = tailer.read(&path, 0).await.unwrap();
        assert_eq!(chunk.content, "abcde");
        assert_eq!(chunk.new_offset, 6);
    }

    #[tokio::test]
    async fn test_baseline_inside_line_skips_its_rest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "ERROR already here");

        let tailer = Tailer::default();
        let baseline = tailer.file_len(&path).await.unwrap();

        append(&path, " and finished\nERROR new\n");
        let chunk = tailer.read(&path, baseline).await.unwrap();
        assert_eq!(chunk.content, "ERROR new\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let tailer = Tailer::default();

        let result = tailer.read(&dir.path().join("missing.log"), 0).await;
        assert!(matches!(result, Err(TailError::Unreadable { .. })));
        assert!(tailer.file_len(&dir.path().join("missing.log")).await.is_err());
    }
}
