//! Grammar source loading and position mapping.
//!
//! A [`SourceFile`] owns the decoded text of one grammar file. Everything
//! downstream works with `&str` slices and byte-offset [`Span`]s; the
//! [`LineMap`] converts offsets back to line/column pairs for diagnostics.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::span::Span;

/// Failure to load a grammar file.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid UTF-8. `offset` is the byte offset of the first
    /// malformed code unit.
    #[error("{} is not valid UTF-8 (byte offset {offset})", .path.display())]
    InvalidUtf8 { path: PathBuf, offset: usize },
}

/// One loaded grammar file: path, decoded text, and line-start table.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    line_map: LineMap,
}

impl SourceFile {
    /// Reads and UTF-8-validates the file at `path`.
    pub fn read(path: &Path) -> Result<Self, SourceError> {
        let bytes = std::fs::read(path).map_err(|source| SourceError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_bytes(path, bytes)
    }

    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Self, SourceError> {
        let text = String::from_utf8(bytes).map_err(|err| SourceError::InvalidUtf8 {
            path: path.to_owned(),
            offset: err.utf8_error().valid_up_to(),
        })?;
        Ok(Self::from_text(path, text))
    }

    pub fn from_text(path: &Path, text: String) -> Self {
        let line_map = LineMap::new(&text);
        Self {
            path: path.to_owned(),
            text,
            line_map,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_map(&self) -> &LineMap {
        &self.line_map
    }

    /// Line/column of the start of `span`.
    pub fn line_col(&self, span: Span) -> LineCol {
        self.line_map.line_col(span.start)
    }
}

/// 1-based line, 0-based column (in bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col + 1)
    }
}

/// Precomputed byte offsets of line starts.
#[derive(Debug, Clone, Default)]
pub struct LineMap {
    line_starts: Vec<u32>,
}

impl LineMap {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    pub fn line_col(&self, offset: u32) -> LineCol {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        LineCol {
            line: line_idx as u32 + 1,
            col: offset - self.line_starts[line_idx],
        }
    }

    /// 1-based line number containing `offset`.
    pub fn line(&self, offset: u32) -> u32 {
        self.line_col(offset).line
    }

    /// Byte offset just past the end of the line containing `offset`
    /// (the position of the `\n`, or the end of input).
    pub fn line_end(&self, offset: u32, text_len: usize) -> u32 {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        match self.line_starts.get(line_idx + 1) {
            Some(next_start) => next_start - 1,
            None => text_len as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_mapping() {
        let map = LineMap::new("ab\ncd\n\nef");
        assert_eq!(map.line_col(0), LineCol { line: 1, col: 0 });
        assert_eq!(map.line_col(2), LineCol { line: 1, col: 2 });
        assert_eq!(map.line_col(3), LineCol { line: 2, col: 0 });
        assert_eq!(map.line_col(6), LineCol { line: 3, col: 0 });
        assert_eq!(map.line_col(8), LineCol { line: 4, col: 1 });
    }

    #[test]
    fn line_end_stops_at_newline() {
        let text = "ab\ncd";
        let map = LineMap::new(text);
        assert_eq!(map.line_end(0, text.len()), 2);
        assert_eq!(map.line_end(3, text.len()), 5);
    }

    #[test]
    fn invalid_utf8_reports_offset() {
        let err = SourceFile::from_bytes(Path::new("x.tok"), vec![b'o', b'k', 0xFF, b'!'])
            .expect_err("0xFF is malformed");
        match err {
            SourceError::InvalidUtf8 { offset, .. } => assert_eq!(offset, 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
