//! One ingestion run: resolve a URL with the extractor, find the subtitle it
//! produced, and fold the resulting record into the catalog.

use std::fs;
use std::path::{self, Path};

use anyhow::{Context, Result, anyhow};
use walkdir::WalkDir;

use crate::catalog::{CatalogStore, MergeOutcome, VideoRecord};
use crate::config::Settings;
use crate::extractor::{ExtractionRequest, Extractor};

/// Builds catalog records by driving an [`Extractor`].
pub struct Ingestor<E> {
    settings: Settings,
    extractor: E,
}

impl<E: Extractor> Ingestor<E> {
    pub fn new(settings: Settings, extractor: E) -> Self {
        Self {
            settings,
            extractor,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolves `url` into a record. `title_override` wins over the platform
    /// title unless it is blank. A missing subtitle leaves `sub_url` empty.
    pub fn ingest(&self, url: &str, title_override: Option<&str>) -> Result<VideoRecord> {
        let subtitle_dir = &self.settings.subtitle_dir;
        fs::create_dir_all(subtitle_dir).with_context(|| {
            format!("creating subtitle directory {}", subtitle_dir.display())
        })?;
        let url_prefix = subtitle_url_prefix(&self.settings.storage_path, subtitle_dir)?;

        let request = ExtractionRequest {
            url: url.to_owned(),
            output_dir: subtitle_dir.clone(),
            subtitle_langs: self.settings.subtitle_langs.clone(),
            subtitle_format: self.settings.subtitle_format.clone(),
            cookies: self.settings.credentials().map(Path::to_path_buf),
        };

        let info = self
            .extractor
            .extract(&request)
            .with_context(|| format!("extracting {url}"))?
            .into_first_entry()?;

        let title = match title_override.map(str::trim) {
            Some(custom) if !custom.is_empty() => custom.to_owned(),
            _ => info.title,
        };

        let sub_url = find_subtitle(
            subtitle_dir,
            &info.id,
            &self.settings.subtitle_langs,
            &self.settings.subtitle_format,
        )?
        .map(|file_name| subtitle_url(&url_prefix, &file_name))
        .unwrap_or_default();

        Ok(VideoRecord {
            id: info.id,
            title,
            thumbnail: info.thumbnail.unwrap_or_default(),
            sub_url,
            timestamp: info.upload_date.unwrap_or_default(),
            extra: Default::default(),
        })
    }
}

/// Looks for `<id>.*.<ext>` directly inside `dir`. When several tracks were
/// written, the first language in `langs` wins; otherwise the
/// alphabetically first match is used.
pub fn find_subtitle(dir: &Path, id: &str, langs: &[String], ext: &str) -> Result<Option<String>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let prefix = format!("{id}.");
    let suffix = format!(".{ext}");
    let mut matches = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry =
            entry.with_context(|| format!("reading subtitle directory {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.starts_with(&prefix) && name.ends_with(&suffix) {
            matches.push(name.to_owned());
        }
    }

    let preferred = langs
        .iter()
        .map(|lang| format!("{id}.{lang}.{ext}"))
        .find(|wanted| matches.contains(wanted));

    Ok(preferred.or_else(|| matches.into_iter().next()))
}

/// The subtitle directory as seen from the catalog file, `/`-separated.
/// The site resolves `sub_url` next to the catalog, so a subtitle directory
/// outside of it is a configuration error.
fn subtitle_url_prefix(storage_path: &Path, subtitle_dir: &Path) -> Result<String> {
    let catalog_dir = match storage_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let base = path::absolute(catalog_dir)
        .with_context(|| format!("resolving catalog directory {}", catalog_dir.display()))?;
    let subs = path::absolute(subtitle_dir)
        .with_context(|| format!("resolving subtitle directory {}", subtitle_dir.display()))?;

    let relative = subs.strip_prefix(&base).map_err(|_| {
        anyhow!(
            "subtitle directory {} is not inside the catalog directory {}",
            subtitle_dir.display(),
            base.display()
        )
    })?;

    let parts: Vec<String> = relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

fn subtitle_url(prefix: &str, file_name: &str) -> String {
    if prefix.is_empty() {
        file_name.to_owned()
    } else {
        format!("{prefix}/{file_name}")
    }
}

/// What a single run did to the catalog.
#[derive(Debug)]
pub enum RunOutcome {
    Added { record: VideoRecord, total: usize },
    Updated { record: VideoRecord, total: usize },
    /// Extraction failed; the catalog file was not touched.
    Failed(anyhow::Error),
}

/// Load, ingest, merge, save. The catalog is loaded before anything is
/// downloaded so a corrupt file stops the run early; that is the only `Err`
/// besides I/O failures while saving.
pub fn run_ingest<E: Extractor>(
    store: &CatalogStore,
    ingestor: &Ingestor<E>,
    url: &str,
    title_override: Option<&str>,
) -> Result<RunOutcome> {
    let mut catalog = store.load()?;

    let record = match ingestor.ingest(url, title_override) {
        Ok(record) => record,
        Err(err) => return Ok(RunOutcome::Failed(err)),
    };

    let outcome = catalog.merge(record.clone());
    store.save(&catalog)?;

    let total = catalog.len();
    Ok(match outcome {
        MergeOutcome::Added => RunOutcome::Added { record, total },
        MergeOutcome::Updated => RunOutcome::Updated { record, total },
    })
}
