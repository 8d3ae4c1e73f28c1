//! The JSON catalog served by the HoopsHub site.
//!
//! The catalog is a single pretty-printed array of [`VideoRecord`] objects,
//! newest first, keyed by the platform video id. It is small enough to be
//! read and rewritten whole on every run.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

/// One catalog entry. Field order matches the on-disk layout the site reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    /// Relative path of the downloaded subtitle, empty when none was found.
    pub sub_url: String,
    /// Upload date as yt-dlp reports it (`YYYYMMDD`), possibly empty.
    pub timestamp: String,
    /// Keys added to the file by hand (tags, notes, ...), written back as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VideoRecord {
    /// Parses the `YYYYMMDD` upload date, if there is a usable one.
    pub fn upload_day(&self) -> Option<NaiveDate> {
        if self.timestamp.len() != 8 {
            return None;
        }
        NaiveDate::parse_from_str(&self.timestamp, "%Y%m%d").ok()
    }
}

/// Result of [`Catalog::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    Updated,
}

/// Ordered list of records, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    records: Vec<VideoRecord>,
}

impl Catalog {
    pub fn new(records: Vec<VideoRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[VideoRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&VideoRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Replaces every record sharing `record.id` in place, or inserts the
    /// record at the front when the id is new. Extra keys of a replaced
    /// record are kept unless the new record sets them too.
    pub fn merge(&mut self, record: VideoRecord) -> MergeOutcome {
        let mut outcome = MergeOutcome::Added;
        for existing in self.records.iter_mut().filter(|r| r.id == record.id) {
            let mut extra = std::mem::take(&mut existing.extra);
            extra.extend(record.extra.clone());
            *existing = VideoRecord {
                extra,
                ..record.clone()
            };
            outcome = MergeOutcome::Updated;
        }
        if outcome == MergeOutcome::Added {
            self.records.insert(0, record);
        }
        outcome
    }
}

/// Reads and writes the catalog file.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the catalog, returning an empty one when the file does not exist
    /// yet. A file that exists but is not a record array is an error; it is
    /// never silently treated as empty, since the next save would wipe it.
    pub fn load(&self) -> Result<Catalog> {
        if !self.path.exists() {
            return Ok(Catalog::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading catalog {}", self.path.display()))?;
        serde_json::from_str(&content).with_context(|| {
            format!(
                "catalog {} is corrupt (expected a JSON array of video records)",
                self.path.display()
            )
        })
    }

    /// Writes the whole catalog through a temporary file in the same
    /// directory, then renames it over the old one.
    pub fn save(&self, catalog: &Catalog) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("creating catalog directory {}", parent.display()))?;

        let json = serde_json::to_string_pretty(catalog).context("serializing catalog")?;

        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("creating temporary file in {}", parent.display()))?;
        tmp.write_all(json.as_bytes())
            .with_context(|| format!("writing temporary file {}", tmp.path().display()))?;
        tmp.as_file()
            .sync_all()
            .with_context(|| format!("flushing temporary file {}", tmp.path().display()))?;
        keep_permissions(&self.path, tmp.path())?;

        tmp.persist(&self.path)
            .with_context(|| format!("replacing catalog {}", self.path.display()))?;
        Ok(())
    }
}

/// Temporary files are created owner-only; carry over the old catalog's mode
/// (or a world-readable one for a fresh file) so the site can still read it.
fn keep_permissions(target: &Path, tmp: &Path) -> Result<()> {
    if let Ok(meta) = fs::metadata(target) {
        fs::set_permissions(tmp, meta.permissions())
            .with_context(|| format!("copying permissions of {}", target.display()))?;
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp, fs::Permissions::from_mode(0o644))
            .with_context(|| format!("setting permissions on {}", tmp.display()))?;
    }
    Ok(())
}
