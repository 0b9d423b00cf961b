//! Durable record of completed listings, consulted over a trailing window.
//!
//! On disk this is one JSON document, rewritten atomically on every
//! [`ProgressTracker::record`]. Records are bucketed per
//! `(source, region, day)`; queries union the buckets whose day falls in
//! `[today - window_days, today]`.

use crate::error::{ListingError, Result};
use crate::io::{atomic_write, quarantine};
use crate::paths::normalize_region;
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// On-disk document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressDocument {
    #[serde(default = "now_stamp")]
    pub created_at: String,
    #[serde(default)]
    pub records: BTreeMap<String, DayRecord>,
}

impl Default for ProgressDocument {
    fn default() -> Self {
        Self {
            created_at: now_stamp(),
            records: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayRecord {
    /// Older documents call this `excel_path`.
    #[serde(alias = "excel_path")]
    pub source_id: String,
    pub region: String,
    pub date: String,
    #[serde(default = "now_stamp")]
    pub created_at: String,
    #[serde(default = "now_stamp")]
    pub updated_at: String,
    #[serde(default)]
    pub browser_records: BTreeMap<String, BTreeSet<String>>,
}

impl DayRecord {
    fn day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }
}

fn now_stamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn record_key(source_id: &str, region: &str, day: NaiveDate) -> String {
    format!("{source_id}_{region}_{}", day.format(DATE_FORMAT))
}

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

/// Union of completed `(browser_id, sku)` pairs across the window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressIndex {
    pub by_browser: BTreeMap<String, BTreeSet<String>>,
}

impl ProgressIndex {
    pub fn contains(&self, browser_id: &str, sku: &str) -> bool {
        self.by_browser
            .get(browser_id)
            .map(|skus| skus.contains(sku))
            .unwrap_or(false)
    }

    pub fn total_skus(&self) -> usize {
        self.by_browser.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_browser.values().all(BTreeSet::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub source_id: String,
    pub region: String,
    pub window_days: u32,
    pub total_browsers: usize,
    pub total_skus: usize,
    pub per_browser: BTreeMap<String, usize>,
}

/// Selection for an administrative clear.
#[derive(Debug, Clone, Default)]
pub struct ClearFilter {
    pub source_id: Option<String>,
    pub region: Option<String>,
}

// ---------------------------------------------------------------------------
// ProgressTracker
// ---------------------------------------------------------------------------

type Clock = Box<dyn Fn() -> NaiveDate>;

pub struct ProgressTracker {
    path: PathBuf,
    window_days: u32,
    doc: ProgressDocument,
    today: Clock,
}

impl ProgressTracker {
    /// Load the document at `path`. Missing, unreadable or corrupt documents
    /// yield an empty tracker; a corrupt file is moved aside first.
    pub fn open(path: impl Into<PathBuf>, window_days: u32) -> Self {
        let path = path.into();
        let doc = load_document(&path);
        Self {
            path,
            window_days,
            doc,
            today: Box::new(|| Local::now().date_naive()),
        }
    }

    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + 'static) -> Self {
        self.today = Box::new(today);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub fn document(&self) -> &ProgressDocument {
        &self.doc
    }

    fn in_window(&self, day: NaiveDate) -> bool {
        let today = (self.today)();
        let earliest = today - ChronoDuration::days(i64::from(self.window_days));
        day >= earliest && day <= today
    }

    fn window_records<'a>(
        &'a self,
        source_id: &'a str,
        region: &'a str,
    ) -> impl Iterator<Item = &'a DayRecord> + 'a {
        let region = normalize_region(region);
        self.doc.records.values().filter(move |r| {
            r.source_id == source_id
                && normalize_region(&r.region) == region
                && r.day().map(|d| self.in_window(d)).unwrap_or(false)
        })
    }

    /// Recomputed on each call from the buckets inside the window.
    pub fn completed(&self, source_id: &str, region: &str) -> ProgressIndex {
        let mut index = ProgressIndex::default();
        for record in self.window_records(source_id, region) {
            for (browser_id, skus) in &record.browser_records {
                index
                    .by_browser
                    .entry(browser_id.clone())
                    .or_default()
                    .extend(skus.iter().cloned());
            }
        }
        index.by_browser.retain(|_, skus| !skus.is_empty());
        index
    }

    pub fn is_done(&self, source_id: &str, region: &str, browser_id: &str, sku: &str) -> bool {
        self.window_records(source_id, region).any(|r| {
            r.browser_records
                .get(browser_id)
                .map(|skus| skus.contains(sku))
                .unwrap_or(false)
        })
    }

    /// Append one success and persist immediately. Recording a tuple that is
    /// already in today's bucket is a no-op and does not touch the file.
    ///
    /// Returns whether a new record was written.
    pub fn record(
        &mut self,
        source_id: &str,
        region: &str,
        browser_id: &str,
        sku: &str,
    ) -> Result<bool> {
        let region = normalize_region(region);
        let today = (self.today)();
        let key = record_key(source_id, &region, today);
        let stamp = now_stamp();

        let entry = self.doc.records.entry(key).or_insert_with(|| DayRecord {
            source_id: source_id.to_string(),
            region: region.clone(),
            date: today.format(DATE_FORMAT).to_string(),
            created_at: stamp.clone(),
            updated_at: stamp.clone(),
            browser_records: BTreeMap::new(),
        });
        let inserted = entry
            .browser_records
            .entry(browser_id.to_string())
            .or_default()
            .insert(sku.to_string());
        if !inserted {
            debug!(browser_id, sku, "success already recorded");
            return Ok(false);
        }
        entry.updated_at = stamp;

        self.save()?;
        info!(source_id, region = %region, browser_id, sku, "success recorded");
        Ok(true)
    }

    pub fn summarize(&self, source_id: &str, region: &str) -> ProgressSummary {
        let index = self.completed(source_id, region);
        ProgressSummary {
            source_id: source_id.to_string(),
            region: normalize_region(region),
            window_days: self.window_days,
            total_browsers: index.by_browser.len(),
            total_skus: index.total_skus(),
            per_browser: index
                .by_browser
                .iter()
                .map(|(id, skus)| (id.clone(), skus.len()))
                .collect(),
        }
    }

    /// Summaries for every (source, region) pair with records in the window.
    pub fn summarize_all(&self) -> Vec<ProgressSummary> {
        let pairs: BTreeSet<(String, String)> = self
            .doc
            .records
            .values()
            .filter(|r| r.day().map(|d| self.in_window(d)).unwrap_or(false))
            .map(|r| (r.source_id.clone(), normalize_region(&r.region)))
            .collect();
        pairs
            .iter()
            .map(|(source, region)| self.summarize(source, region))
            .collect()
    }

    /// Administrative clear. Returns the number of day buckets removed.
    pub fn clear(&mut self, filter: &ClearFilter) -> Result<usize> {
        let region = filter.region.as_deref().map(normalize_region);
        let before = self.doc.records.len();
        self.doc.records.retain(|_, r| {
            let source_match = filter
                .source_id
                .as_deref()
                .map(|s| s == r.source_id)
                .unwrap_or(true);
            let region_match = region
                .as_deref()
                .map(|g| g == normalize_region(&r.region))
                .unwrap_or(true);
            !(source_match && region_match)
        });
        let removed = before - self.doc.records.len();
        if removed > 0 {
            self.save()?;
        }
        info!(
            removed,
            source_id = filter.source_id.as_deref().unwrap_or("*"),
            region = region.as_deref().unwrap_or("*"),
            "progress records cleared"
        );
        Ok(removed)
    }

    fn save(&self) -> Result<()> {
        let write = || -> Result<()> {
            let data = serde_json::to_string_pretty(&self.doc)?;
            atomic_write(&self.path, data.as_bytes())
        };
        write().map_err(|e| {
            error!(path = %self.path.display(), error = %e, "failed to persist progress");
            ListingError::ProgressWrite {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            }
        })
    }
}

fn load_document(path: &Path) -> ProgressDocument {
    if !path.exists() {
        return ProgressDocument::default();
    }
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "progress store unreadable, starting empty");
            return ProgressDocument::default();
        }
    };
    match serde_json::from_str::<ProgressDocument>(&data) {
        Ok(doc) => {
            debug!(path = %path.display(), buckets = doc.records.len(), "progress store loaded");
            doc
        }
        Err(e) => {
            match quarantine(path) {
                Ok(moved) => warn!(
                    path = %path.display(),
                    moved_to = %moved.display(),
                    error = %e,
                    "progress store corrupt, moved aside and starting empty"
                ),
                Err(qe) => warn!(
                    path = %path.display(),
                    error = %e,
                    quarantine_error = %qe,
                    "progress store corrupt, starting empty"
                ),
            }
            ProgressDocument::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn tracker_at(dir: &TempDir, today: &'static str, window: u32) -> ProgressTracker {
        ProgressTracker::open(dir.path().join("success_records.json"), window)
            .with_clock(move || day(today))
    }

    #[test]
    fn record_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker_at(&dir, "2026-03-10", 2);
        assert!(t.record("products.xlsx", "SG", "1", "A").unwrap());
        assert!(!t.record("products.xlsx", "sg", "1", "A").unwrap());
        let s = t.summarize("products.xlsx", "SG");
        assert_eq!(s.total_skus, 1);
        assert_eq!(s.total_browsers, 1);
        assert_eq!(s.per_browser["1"], 1);
    }

    #[test]
    fn record_persists_immediately() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker_at(&dir, "2026-03-10", 2);
        t.record("src", "HK", "9", "SKU-9").unwrap();
        let reopened = tracker_at(&dir, "2026-03-10", 2);
        assert!(reopened.is_done("src", "HK", "9", "SKU-9"));
        assert!(!reopened.is_done("src", "SG", "9", "SKU-9"));
        assert!(!reopened.is_done("other", "HK", "9", "SKU-9"));
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let dir = TempDir::new().unwrap();
        let recorded_on = Rc::new(Cell::new(day("2026-03-08")));
        let clock = Rc::clone(&recorded_on);
        let mut t = ProgressTracker::open(dir.path().join("p.json"), 2)
            .with_clock(move || clock.get());
        t.record("src", "SG", "1", "EDGE").unwrap();
        recorded_on.set(day("2026-03-07"));
        t.record("src", "SG", "1", "OLD").unwrap();

        recorded_on.set(day("2026-03-10"));
        assert!(t.is_done("src", "SG", "1", "EDGE"));
        assert!(!t.is_done("src", "SG", "1", "OLD"));
        assert_eq!(t.completed("src", "SG").total_skus(), 1);
    }

    #[test]
    fn window_unions_days() {
        let dir = TempDir::new().unwrap();
        let today = Rc::new(Cell::new(day("2026-03-09")));
        let clock = Rc::clone(&today);
        let mut t = ProgressTracker::open(dir.path().join("p.json"), 2)
            .with_clock(move || clock.get());
        t.record("src", "SG", "1", "A").unwrap();
        today.set(day("2026-03-10"));
        t.record("src", "SG", "1", "B").unwrap();
        t.record("src", "SG", "2", "C").unwrap();
        let idx = t.completed("src", "SG");
        assert!(idx.contains("1", "A") && idx.contains("1", "B") && idx.contains("2", "C"));
        assert_eq!(t.document().records.len(), 2);
    }

    #[test]
    fn future_records_are_ignored() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker_at(&dir, "2026-03-12", 2);
        t.record("src", "SG", "1", "A").unwrap();
        let earlier = tracker_at(&dir, "2026-03-10", 2);
        assert!(!earlier.is_done("src", "SG", "1", "A"));
    }

    #[test]
    fn corrupt_store_is_moved_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("success_records.json");
        std::fs::write(&path, "{ not json").unwrap();
        let mut t = tracker_at(&dir, "2026-03-10", 2);
        assert!(t.document().records.is_empty());
        let moved: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(moved.len(), 1);
        t.record("src", "SG", "1", "A").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn legacy_excel_path_field_is_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("success_records.json");
        std::fs::write(
            &path,
            r#"{
  "created_at": "2026-03-01T10:00:00",
  "records": {
    "data/products.xlsx_SG_2026-03-10": {
      "excel_path": "data/products.xlsx",
      "region": "SG",
      "date": "2026-03-10",
      "created_at": "2026-03-10T09:00:00",
      "updated_at": "2026-03-10T09:05:00",
      "browser_records": { "12": ["SKU-1", "SKU-2"] }
    }
  }
}"#,
        )
        .unwrap();
        let t = tracker_at(&dir, "2026-03-10", 2);
        assert!(t.is_done("data/products.xlsx", "SG", "12", "SKU-2"));
        assert_eq!(t.summarize("data/products.xlsx", "SG").total_skus, 2);
    }

    #[test]
    fn write_failure_is_progress_write_error() {
        let dir = TempDir::new().unwrap();
        // parent "file" is a regular file, so the store cannot be created
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let mut t = ProgressTracker::open(blocker.join("records.json"), 2)
            .with_clock(|| NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        let err = t.record("src", "SG", "1", "A").unwrap_err();
        assert!(matches!(err, ListingError::ProgressWrite { .. }));
    }

    #[test]
    fn clear_by_source_and_region() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker_at(&dir, "2026-03-10", 2);
        t.record("a.xlsx", "SG", "1", "A").unwrap();
        t.record("a.xlsx", "HK", "1", "A").unwrap();
        t.record("b.xlsx", "SG", "1", "A").unwrap();

        let removed = t
            .clear(&ClearFilter {
                source_id: Some("a.xlsx".into()),
                region: Some("hk".into()),
            })
            .unwrap();
        assert_eq!(removed, 1);
        assert!(t.is_done("a.xlsx", "SG", "1", "A"));

        let removed = t
            .clear(&ClearFilter {
                source_id: Some("a.xlsx".into()),
                region: None,
            })
            .unwrap();
        assert_eq!(removed, 1);

        let removed = t.clear(&ClearFilter::default()).unwrap();
        assert_eq!(removed, 1);
        assert!(t.document().records.is_empty());
    }

    #[test]
    fn summarize_all_lists_pairs() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker_at(&dir, "2026-03-10", 2);
        t.record("a.xlsx", "SG", "1", "A").unwrap();
        t.record("a.xlsx", "HK", "2", "B").unwrap();
        let all = t.summarize_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].region, "HK");
    }
}
