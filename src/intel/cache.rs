// SPDX-FileCopyrightText: 2026 Watchtower contributors
// SPDX-License-Identifier: MIT

//! Single-slot disk cache for the latest synthesized brief.
//!
//! One JSON record at a fixed path. Absence, corruption, and staleness are
//! all treated as a miss, never an error. Writes go through a temp file and
//! an atomic rename so a concurrent reader sees either the old record or the
//! new one, never a partial write.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Duration, Utc};

use super::Brief;

/// Handle on the cache file location.
#[derive(Debug, Clone)]
pub struct BriefCache {
    path: PathBuf,
}

impl BriefCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `<cache dir>/watchtower/brief.json`.
    pub fn default_location() -> Option<Self> {
        let base = dirs::cache_dir()?;
        Some(Self::new(base.join("watchtower").join("brief.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached brief. Returns `None` if the file is absent,
    /// undecodable, or older than `max_age_mins`. `max_age_mins == 0`
    /// disables the cache entirely.
    pub fn load(&self, max_age_mins: u64) -> Option<Brief> {
        if max_age_mins == 0 {
            return None;
        }
        let data = fs::read(&self.path).ok()?;
        let brief: Brief = serde_json::from_slice(&data).ok()?;
        let age = Utc::now().signed_duration_since(brief.generated_at);
        if age > Duration::minutes(max_age_mins as i64) {
            return None;
        }
        Some(brief)
    }

    /// Persists the brief, best-effort: a cache write failure must never
    /// disturb the dashboard.
    pub fn save(&self, brief: &Brief) {
        let _ = self.try_save(brief);
    }

    fn try_save(&self, brief: &Brief) -> io::Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| io::Error::other("cache path has no parent"))?;
        fs::create_dir_all(parent)?;

        let data = serde_json::to_vec_pretty(brief).map_err(io::Error::other)?;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let tmp = parent.join(format!(".watchtower.tmp.{}.{nanos}", std::process::id()));
        fs::write(&tmp, &data)?;
        match fs::rename(&tmp, &self.path) {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(&tmp);
                Err(err)
            }
        }
    }

    /// Removes the cache record; a missing file counts as success.
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intel::CountryRisk;

    fn sample_brief() -> Brief {
        Brief {
            summary: "Calm overall; two regional flashpoints to watch.".to_owned(),
            key_threats: vec!["Border escalation".to_owned(), "Port strike".to_owned()],
            country_risks: vec![CountryRisk {
                country: "Ukraine".to_owned(),
                score: 85,
                reason: "active conflict".to_owned(),
            }],
            generated_at: Utc::now(),
            model: "llama-3.1-8b-instant".to_owned(),
        }
    }

    fn cache_in(dir: &tempfile::TempDir) -> BriefCache {
        BriefCache::new(dir.path().join("brief.json"))
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(&dir);
        let brief = sample_brief();
        cache.save(&brief);
        let loaded = cache.load(60).expect("fresh record loads");
        assert_eq!(loaded, brief);
    }

    #[test]
    fn absent_file_is_a_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(cache_in(&dir).load(60).is_none());
    }

    #[test]
    fn corrupt_record_is_a_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(&dir);
        fs::create_dir_all(dir.path()).expect("dir");
        fs::write(cache.path(), b"{ not json").expect("write");
        assert!(cache.load(60).is_none());
    }

    #[test]
    fn stale_record_is_a_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(&dir);
        let mut brief = sample_brief();
        brief.generated_at = Utc::now() - Duration::minutes(90);
        cache.save(&brief);
        assert!(cache.load(60).is_none());
        // The same record is still good under a longer TTL.
        assert!(cache.load(120).is_some());
    }

    #[test]
    fn zero_max_age_disables_the_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(&dir);
        cache.save(&sample_brief());
        assert!(cache.load(0).is_none());
    }

    #[test]
    fn clear_removes_the_record_and_tolerates_absence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(&dir);
        cache.save(&sample_brief());
        cache.clear().expect("clear existing");
        assert!(cache.load(60).is_none());
        cache.clear().expect("clear missing is ok");
    }

    #[test]
    fn unknown_fields_are_ignored_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(&dir);
        let record = serde_json::json!({
            "summary": "s",
            "key_threats": [],
            "country_risks": [],
            "generated_at": Utc::now(),
            "model": "m",
            "some_future_field": 42,
        });
        fs::write(cache.path(), serde_json::to_vec(&record).expect("encode")).expect("write");
        assert_eq!(cache.load(60).expect("loads").summary, "s");
    }

    #[test]
    fn save_overwrites_previous_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(&dir);
        let mut brief = sample_brief();
        cache.save(&brief);
        brief.summary = "Updated picture.".to_owned();
        cache.save(&brief);
        assert_eq!(cache.load(60).expect("loads").summary, "Updated picture.");
    }
}
