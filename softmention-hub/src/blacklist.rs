//! Blacklist of normalized software names
//!
//! Generic words picked up by the mention extractor ("software", "script",
//! "model", ...) are listed in a single-column CSV file. The set is loaded
//! once at startup and kept in memory; every mutation rewrites the file
//! before the in-memory set is replaced, under the write lock.

use chrono::{DateTime, Utc};
use serde::Serialize;
use softmention_common::{Error, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Header row written at the top of the CSV file
const CSV_HEADER: &str = "term";

/// First-row values recognized as a header and skipped on import
const HEADER_NAMES: [&str; 3] = ["term", "word", "pattern"];

/// Result of a CSV import
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    /// Distinct terms read from the CSV
    pub imported: usize,
    /// Size of the blacklist after the import
    pub total: usize,
    pub overwrite: bool,
}

/// Blacklist statistics
#[derive(Debug, Clone, Serialize)]
pub struct BlacklistStats {
    pub total_terms: usize,
    pub file_path: String,
    pub file_exists: bool,
    pub last_loaded: Option<DateTime<Utc>>,
}

/// Process-wide blacklist backed by a CSV file
pub struct Blacklist {
    path: PathBuf,
    terms: RwLock<BTreeSet<String>>,
    last_loaded: RwLock<Option<DateTime<Utc>>>,
}

impl Blacklist {
    /// Load the blacklist from `path`
    ///
    /// A missing file yields an empty blacklist; it is created on the first
    /// mutation.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let blacklist = Self::empty(path);
        blacklist.reload().await?;
        Ok(blacklist)
    }

    /// Empty blacklist persisting to `path`, without reading it
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            terms: RwLock::new(BTreeSet::new()),
            last_loaded: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn is_blacklisted(&self, normalized_name: &str) -> bool {
        self.terms.read().await.contains(normalized_name)
    }

    pub async fn len(&self) -> usize {
        self.terms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.terms.read().await.is_empty()
    }

    /// Add a term; false if blank or already present
    pub async fn add(&self, term: &str) -> Result<bool> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(false);
        }

        let mut terms = self.terms.write().await;
        if terms.contains(term) {
            return Ok(false);
        }

        let mut updated = terms.clone();
        updated.insert(term.to_string());
        self.persist(&updated).await?;
        *terms = updated;

        info!(term = term, "Added term to blacklist");
        Ok(true)
    }

    /// Remove a term; false if it was not present
    pub async fn remove(&self, term: &str) -> Result<bool> {
        let mut terms = self.terms.write().await;
        if !terms.contains(term) {
            return Ok(false);
        }

        let mut updated = terms.clone();
        updated.remove(term);
        self.persist(&updated).await?;
        *terms = updated;

        info!(term = term, "Removed term from blacklist");
        Ok(true)
    }

    /// Replace the in-memory set with the file contents
    ///
    /// Returns the number of terms loaded.
    pub async fn reload(&self) -> Result<usize> {
        let mut terms = self.terms.write().await;

        let loaded = if tokio::fs::try_exists(&self.path).await? {
            let content = tokio::fs::read_to_string(&self.path).await?;
            parse_terms(&content)
        } else {
            warn!("Blacklist file not found: {}", self.path.display());
            BTreeSet::new()
        };

        let count = loaded.len();
        *terms = loaded;
        *self.last_loaded.write().await = Some(Utc::now());

        info!("Loaded {} terms from blacklist: {}", count, self.path.display());
        Ok(count)
    }

    /// Case-insensitive substring search, sorted, at most `limit` results
    pub async fn search(&self, query: &str, limit: usize) -> Vec<String> {
        if query.is_empty() {
            return Vec::new();
        }

        let query = query.to_lowercase();
        self.terms
            .read()
            .await
            .iter()
            .filter(|term| term.to_lowercase().contains(&query))
            .take(limit)
            .cloned()
            .collect()
    }

    /// CSV text with a `term` header and one sorted term per line
    pub async fn export(&self) -> String {
        let terms = self.terms.read().await;
        render_csv(&terms)
    }

    /// Import terms from CSV text
    ///
    /// With `overwrite` the blacklist becomes exactly the imported terms,
    /// otherwise they are merged into the current set.
    pub async fn import(&self, csv_text: &str, overwrite: bool) -> Result<ImportSummary> {
        let new_terms = parse_terms(csv_text);
        let imported = new_terms.len();

        let mut terms = self.terms.write().await;
        let updated = if overwrite {
            new_terms
        } else {
            terms.union(&new_terms).cloned().collect()
        };

        self.persist(&updated).await?;
        *terms = updated;

        if overwrite {
            info!("Overwrote blacklist with {} terms", imported);
        } else {
            info!("Merged {} terms into blacklist (total: {})", imported, terms.len());
        }

        Ok(ImportSummary {
            imported,
            total: terms.len(),
            overwrite,
        })
    }

    pub async fn stats(&self) -> BlacklistStats {
        BlacklistStats {
            total_terms: self.terms.read().await.len(),
            file_path: self.path.display().to_string(),
            file_exists: tokio::fs::try_exists(&self.path).await.unwrap_or(false),
            last_loaded: *self.last_loaded.read().await,
        }
    }

    /// Write the full set to disk (temp file + rename)
    async fn persist(&self, terms: &BTreeSet<String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        tokio::fs::write(&tmp_path, render_csv(terms)).await.map_err(|e| {
            Error::Internal(format!(
                "Failed to write blacklist {}: {}",
                tmp_path.display(),
                e
            ))
        })?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        info!("Saved {} terms to blacklist: {}", terms.len(), self.path.display());
        Ok(())
    }
}

/// Parse the first column of CSV text into a set of terms
///
/// Quoted fields may span lines. Blank rows are skipped, as is a leading
/// header row.
pub fn parse_terms(csv_text: &str) -> BTreeSet<String> {
    let mut terms = BTreeSet::new();

    for (index, field) in first_fields(csv_text).into_iter().enumerate() {
        let term = field.trim();
        if term.is_empty() {
            continue;
        }

        if index == 0 && HEADER_NAMES.contains(&term.to_lowercase().as_str()) {
            continue;
        }

        terms.insert(term.to_string());
    }

    terms
}

/// Raw first field of every CSV record, unquoted but not trimmed
///
/// A `"` only opens a quoted field at the start of a field (leading
/// whitespace allowed). Inside quotes `""` is a literal quote and line
/// breaks belong to the field.
fn first_fields(csv_text: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut first: Option<String> = None;
    let mut in_quotes = false;
    let mut pending = false;

    let mut chars = csv_text.chars().peekable();
    while let Some(c) = chars.next() {
        pending = true;

        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
            continue;
        }

        match c {
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            ',' => {
                if first.is_none() {
                    first = Some(std::mem::take(&mut current));
                }
                current.clear();
            }
            '\n' => {
                records.push(first.take().unwrap_or_else(|| std::mem::take(&mut current)));
                current.clear();
                pending = false;
            }
            _ => current.push(c),
        }
    }

    if pending {
        records.push(first.unwrap_or(current));
    }

    records
}

fn render_csv(terms: &BTreeSet<String>) -> String {
    let mut out = String::with_capacity(terms.len() * 16 + CSV_HEADER.len() + 1);
    out.push_str(CSV_HEADER);
    out.push('\n');

    for term in terms {
        if term.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&term.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(term);
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_terms_skips_header_and_blanks() {
        let terms = parse_terms("term\nsoftware\n\n  script  \nsoftware\n");
        assert_eq!(terms.into_iter().collect::<Vec<_>>(), vec!["script", "software"]);
    }

    #[test]
    fn test_parse_terms_without_header() {
        let terms = parse_terms("model\ntool\n");
        assert_eq!(terms.len(), 2);
        assert!(terms.contains("model"));
    }

    #[test]
    fn test_parse_terms_quoted_field() {
        let terms = parse_terms("word\n\"a, b\",ignored\n\"say \"\"hi\"\"\"\n");
        assert!(terms.contains("a, b"));
        assert!(terms.contains("say \"hi\""));
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let blacklist = Blacklist::load(dir.path().join("missing.csv")).await.unwrap();

        assert!(blacklist.is_empty().await);
        assert!(!blacklist.stats().await.file_exists);
    }

    #[tokio::test]
    async fn test_add_and_remove_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("blacklist.csv");
        let blacklist = Blacklist::load(&path).await.unwrap();

        assert!(blacklist.add("software").await.unwrap());
        assert!(blacklist.add(" model ").await.unwrap());
        assert!(!blacklist.add("software").await.unwrap());
        assert!(!blacklist.add("   ").await.unwrap());

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "term\nmodel\nsoftware\n");
        assert!(blacklist.is_blacklisted("model").await);

        assert!(blacklist.remove("model").await.unwrap());
        assert!(!blacklist.remove("model").await.unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "term\nsoftware\n");
    }

    #[tokio::test]
    async fn test_reload_picks_up_file_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blacklist.csv");
        std::fs::write(&path, "term\nsoftware\n").unwrap();

        let blacklist = Blacklist::load(&path).await.unwrap();
        assert_eq!(blacklist.len().await, 1);

        std::fs::write(&path, "term\nsoftware\nscript\ndata\n").unwrap();
        assert_eq!(blacklist.reload().await.unwrap(), 3);
        assert!(blacklist.is_blacklisted("script").await);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_sorted_and_limited() {
        let dir = tempdir().unwrap();
        let blacklist = Blacklist::load(dir.path().join("b.csv")).await.unwrap();
        blacklist
            .import("term\nSoftware\nsoftware package\nfirmware\nscript\n", false)
            .await
            .unwrap();

        assert_eq!(
            blacklist.search("WARE", 10).await,
            vec!["Software", "firmware", "software package"]
        );
        assert_eq!(blacklist.search("ware", 2).await.len(), 2);
        assert!(blacklist.search("", 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_import_merge_and_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("b.csv");
        let blacklist = Blacklist::load(&path).await.unwrap();
        blacklist.add("software").await.unwrap();

        let merged = blacklist.import("term\ntool\nsoftware\n", false).await.unwrap();
        assert_eq!(merged, ImportSummary { imported: 2, total: 2, overwrite: false });

        let replaced = blacklist.import("model\n", true).await.unwrap();
        assert_eq!(replaced, ImportSummary { imported: 1, total: 1, overwrite: true });
        assert!(!blacklist.is_blacklisted("software").await);

        let reloaded = Blacklist::load(&path).await.unwrap();
        assert!(reloaded.is_blacklisted("model").await);
        assert_eq!(reloaded.len().await, 1);
    }

    #[tokio::test]
    async fn test_export_round_trips_through_import() {
        let dir = tempdir().unwrap();
        let blacklist = Blacklist::load(dir.path().join("b.csv")).await.unwrap();
        blacklist.add("b").await.unwrap();
        blacklist.add("a, with comma").await.unwrap();

        let csv = blacklist.export().await;
        assert!(csv.starts_with("term\n"));

        let other = Blacklist::load(dir.path().join("c.csv")).await.unwrap();
        let summary = other.import(&csv, true).await.unwrap();
        assert_eq!(summary.total, 2);
        assert!(other.is_blacklisted("a, with comma").await);
    }

    #[test]
    fn test_parse_terms_quoted_field_spans_lines() {
        let terms = parse_terms("term\r\n\"line one\nline two\",x\r\nplain\r\n");
        assert_eq!(
            terms.into_iter().collect::<Vec<_>>(),
            vec!["line one\nline two", "plain"]
        );
    }

    #[tokio::test]
    async fn test_multiline_term_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("b.csv");
        let blacklist = Blacklist::load(&path).await.unwrap();
        assert!(blacklist.add("foo\nbar").await.unwrap());
        assert!(blacklist.add("baz").await.unwrap());

        let reloaded = Blacklist::load(&path).await.unwrap();
        assert_eq!(reloaded.len().await, 2);
        assert!(reloaded.is_blacklisted("foo\nbar").await);
        assert!(!reloaded.is_blacklisted("foo").await);

        let other = Blacklist::load(dir.path().join("c.csv")).await.unwrap();
        other.import(&blacklist.export().await, true).await.unwrap();
        assert!(other.is_blacklisted("foo\nbar").await);
        assert_eq!(other.len().await, 2);
    }

    #[tokio::test]
    async fn test_persist_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("b.csv");
        let blacklist = Blacklist::load(&path).await.unwrap();
        blacklist.import("term\nsoftware\n", true).await.unwrap();

        assert!(blacklist.stats().await.file_exists);
        assert!(!path.with_extension("csv.tmp").exists());
    }
}
