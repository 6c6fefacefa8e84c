//! Title/artist → dance style table.
//!
//! ## Source format
//!
//! A comma-separated file with a header row naming at least the three columns
//! below (any order, extra columns ignored):
//!
//!   song_title,artist,dance_style
//!
//! Fields may be double-quoted; `""` inside quotes is a literal quote.
//! Missing trailing fields read as empty strings.
//!
//! The table is immutable once built. [`StyleLookup::reload`] builds a complete
//! replacement first and only then swaps it in, so a failed reload leaves the
//! previous table authoritative.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::LookupError;
use crate::track::normalize;

const COL_TITLE: &str = "song_title";
const COL_ARTIST: &str = "artist";
const COL_STYLE: &str = "dance_style";

/// One row of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleEntry {
    pub title: String,
    pub artist: String,
    /// Style exactly as written in the source.
    pub style: String,
    norm_title: String,
    norm_artist: String,
}

impl StyleEntry {
    pub fn new(title: &str, artist: &str, style: &str) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.to_string(),
            style: style.to_string(),
            norm_title: normalize(title),
            norm_artist: normalize(artist),
        }
    }

    fn matches(&self, norm_title: &str, norm_artist: &str) -> bool {
        self.norm_title == norm_title && self.norm_artist == norm_artist
    }
}

/// Ordered rows; the first matching row wins.
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    entries: Vec<StyleEntry>,
}

impl StyleTable {
    pub fn new(entries: Vec<StyleEntry>) -> Self {
        Self { entries }
    }

    pub fn from_csv_str(content: &str) -> Result<Self, LookupError> {
        let mut rows = parse_csv(content)?.into_iter();
        let header = rows.next().ok_or(LookupError::Empty)?;

        let column = |name: &'static str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or(LookupError::MissingColumn(name))
        };
        let title_col = column(COL_TITLE)?;
        let artist_col = column(COL_ARTIST)?;
        let style_col = column(COL_STYLE)?;

        let field = |row: &[String], idx: usize| row.get(idx).cloned().unwrap_or_default();
        let entries = rows
            .map(|row| {
                StyleEntry::new(
                    &field(row.as_slice(), title_col),
                    &field(row.as_slice(), artist_col),
                    &field(row.as_slice(), style_col),
                )
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_csv_str(&content)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Upper-cased style of the first row matching (title, artist).
    ///
    /// Returns `None` for blank input, for no match, and when the first
    /// matching row has a blank style.
    pub fn find_style(&self, title: &str, artist: &str) -> Option<String> {
        let t = normalize(title);
        let a = normalize(artist);
        if t.is_empty() || a.is_empty() {
            return None;
        }
        let entry = self.entries.iter().find(|e| e.matches(&t, &a))?;
        let style = entry.style.trim();
        if style.is_empty() {
            None
        } else {
            Some(style.to_uppercase())
        }
    }

    /// Sorted, de-duplicated, non-blank style labels.
    pub fn styles(&self) -> Vec<String> {
        let mut styles: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.style.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        styles.sort();
        styles.dedup();
        styles
    }
}

/// The live lookup: a shared immutable table plus the file it came from.
#[derive(Debug, Clone)]
pub struct StyleLookup {
    table: Arc<StyleTable>,
    source: Option<PathBuf>,
}

impl StyleLookup {
    pub fn new(table: StyleTable) -> Self {
        Self {
            table: Arc::new(table),
            source: None,
        }
    }

    /// Load from `path`. A failed initial load yields an empty table so the
    /// engine can still run; the error is returned alongside for reporting.
    pub fn open(path: impl Into<PathBuf>) -> (Self, Option<LookupError>) {
        let path = path.into();
        let mut lookup = Self {
            table: Arc::new(StyleTable::default()),
            source: Some(path),
        };
        match lookup.reload() {
            Ok(_) => (lookup, None),
            Err(e) => (lookup, Some(e)),
        }
    }

    /// Consistent view of the current table, unaffected by later reloads.
    pub fn table(&self) -> Arc<StyleTable> {
        Arc::clone(&self.table)
    }

    pub fn find_style(&self, title: &str, artist: &str) -> Option<String> {
        self.table.find_style(title, artist)
    }

    pub fn styles(&self) -> Vec<String> {
        self.table.styles()
    }

    /// Re-read the source file. On failure the current table is kept.
    pub fn reload(&mut self) -> Result<usize, LookupError> {
        let Some(path) = self.source.clone() else {
            return Ok(self.table.len());
        };
        match StyleTable::load(&path) {
            Ok(table) => {
                let rows = table.len();
                self.table = Arc::new(table);
                info!("[lookup] Loaded {} rows from {}", rows, path.display());
                Ok(rows)
            }
            Err(e) => {
                warn!("[lookup] Reload of {} failed: {}", path.display(), e);
                Err(e)
            }
        }
    }
}

// ── CSV reading ───────────────────────────────────────────────────────────────

fn parse_csv(content: &str) -> Result<Vec<Vec<String>>, LookupError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut quote_line = 0usize;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => {
                in_quotes = true;
                quote_line = line;
            }
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                line += 1;
                row.push(std::mem::take(&mut field));
                push_row(&mut rows, std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(LookupError::UnterminatedQuote { line: quote_line });
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        push_row(&mut rows, row);
    }
    Ok(rows)
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    // blank lines carry no data
    if row.iter().all(|f| f.trim().is_empty()) {
        return;
    }
    rows.push(row);
}
