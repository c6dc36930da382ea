use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::token::TT;
use memchr::memchr_iter;
use serde::Serialize;
use std::cmp::{max, min, Ordering};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::sync::Arc;

/// A location within the current source file expressed as UTF-8 byte offsets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub struct Loc(pub usize, pub usize);

impl Loc {
  pub fn error(self, typ: SyntaxErrorType, range: LocationRange, actual_token: Option<TT>) -> SyntaxError {
    SyntaxError::new(typ, self, range, actual_token)
  }

  pub fn is_empty(&self) -> bool {
    self.0 >= self.1
  }

  pub fn len(&self) -> usize {
    self.1 - self.0
  }

  pub fn extend(&mut self, other: Loc) {
    self.0 = min(self.0, other.0);
    self.1 = max(self.1, other.1);
  }
}

impl Add for Loc {
  type Output = Loc;

  fn add(self, rhs: Self) -> Self::Output {
    let mut new = self;
    new.extend(rhs);
    new
  }
}

impl AddAssign for Loc {
  fn add_assign(&mut self, rhs: Self) {
    self.extend(rhs);
  }
}

/// A 1-based line and column. Columns count Unicode scalar values, not bytes, so a position lines
/// up with what an editor shows regardless of how many bytes precede it on the line.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub struct Position {
  pub line: u32,
  pub column: u32,
}

impl Position {
  pub const fn new(line: u32, column: u32) -> Position {
    Position { line, column }
  }
}

impl PartialOrd for Position {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Position {
  fn cmp(&self, other: &Self) -> Ordering {
    self.line.cmp(&other.line).then(self.column.cmp(&other.column))
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

/// A half-open `[begin, end)` range of positions, optionally tied to a file name.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub struct LocationRange {
  pub file: Option<Arc<str>>,
  pub begin: Position,
  pub end: Position,
}

impl LocationRange {
  pub fn new(file: Option<Arc<str>>, begin: Position, end: Position) -> LocationRange {
    LocationRange { file, begin, end }
  }

  /// A range whose begin is the zero position is one the parser never set.
  pub fn is_set(&self) -> bool {
    self.begin.line > 0
  }

  pub fn contains(&self, pos: Position) -> bool {
    self.begin <= pos && pos < self.end
  }

  /// Like `contains`, but also accepts the position just past the end (where a caret sits after
  /// typing the last character of a token).
  pub fn touches(&self, pos: Position) -> bool {
    self.begin <= pos && pos <= self.end
  }

  pub fn contains_range(&self, other: &LocationRange) -> bool {
    self.begin <= other.begin && other.end <= self.end
  }

  /// Returns a range spanning both ranges, keeping this range's file.
  pub fn join(&self, other: &LocationRange) -> LocationRange {
    LocationRange {
      file: self.file.clone(),
      begin: min(self.begin, other.begin),
      end: max(self.end, other.end),
    }
  }
}

impl fmt::Display for LocationRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(file) = &self.file {
      write!(f, "{}:", file)?;
    }
    if self.begin.line == self.end.line {
      write!(f, "{}:{}-{}", self.begin.line, self.begin.column, self.end.column)
    } else {
      write!(f, "({})-({})", self.begin, self.end)
    }
  }
}

/// Maps byte offsets of one source text to rune-accurate positions.
#[derive(Clone, Debug)]
pub struct LineIndex {
  line_starts: Vec<usize>,
}

impl LineIndex {
  pub fn new(source: &str) -> LineIndex {
    let mut line_starts = vec![0];
    line_starts.extend(memchr_iter(b'\n', source.as_bytes()).map(|i| i + 1));
    LineIndex { line_starts }
  }

  pub fn line_count(&self) -> usize {
    self.line_starts.len()
  }

  /// Converts a byte offset into a position. Offsets past the end clamp to the end of the source.
  pub fn position(&self, source: &str, offset: usize) -> Position {
    let offset = min(offset, source.len());
    let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
    let column = source[self.line_starts[line]..offset].chars().count() + 1;
    Position::new(line as u32 + 1, column as u32)
  }

  /// Converts a position back into a byte offset. Columns past the end of the line clamp to the
  /// line terminator; lines past the end clamp to the end of the source.
  pub fn offset(&self, source: &str, pos: Position) -> usize {
    let line = pos.line.saturating_sub(1) as usize;
    let Some(&start) = self.line_starts.get(line) else {
      return source.len();
    };
    let end = self
      .line_starts
      .get(line + 1)
      .map(|next| next - 1)
      .unwrap_or(source.len());
    let skip = pos.column.saturating_sub(1) as usize;
    source[start..end]
      .char_indices()
      .nth(skip)
      .map(|(i, _)| start + i)
      .unwrap_or(end)
  }

  pub fn range(&self, source: &str, file: Option<Arc<str>>, loc: Loc) -> LocationRange {
    LocationRange::new(file, self.position(source, loc.0), self.position(source, loc.1))
  }
}
