//! Thin wrapper around yt-dlp.
//!
//! Everything about talking to YouTube (format negotiation, cookies, retries,
//! subtitle conversion) stays inside yt-dlp. This module only builds the
//! command line, runs it, and reads back the handful of fields the catalog
//! needs.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

/// Inputs for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub url: String,
    /// Directory the subtitle files are written into, named `<id>.<lang>.<ext>`.
    pub output_dir: PathBuf,
    pub subtitle_langs: Vec<String>,
    pub subtitle_format: String,
    pub cookies: Option<PathBuf>,
}

/// The slice of yt-dlp's `--dump-single-json` payload we rely on.
///
/// `id` and `title` are required; a response without them is treated as a
/// failed extraction. Playlists and search results carry their videos in
/// `entries`.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub entries: Option<Vec<VideoInfo>>,
}

impl VideoInfo {
    /// Multi-result responses (playlists, searches) always resolve to their
    /// first entry. Nested playlists are unwrapped the same way.
    pub fn into_first_entry(self) -> Result<VideoInfo> {
        let mut info = self;
        while let Some(entries) = info.entries.take() {
            let playlist_id = info.id;
            info = entries
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("playlist {playlist_id} returned no entries"))?;
        }
        Ok(info)
    }
}

/// Anything able to resolve a URL into [`VideoInfo`] while dropping subtitle
/// files into `request.output_dir`.
pub trait Extractor {
    fn extract(&self, request: &ExtractionRequest) -> Result<VideoInfo>;
}

/// Runs the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
        }
    }

    /// Subtitles only: the video itself is skipped, manual and automatic
    /// tracks are requested, and the converted files are named after the id.
    pub fn command(&self, request: &ExtractionRequest) -> Command {
        let output_pattern = request.output_dir.join("%(id)s");

        let mut command = Command::new(&self.program);
        command
            .arg("--skip-download")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-langs")
            .arg(request.subtitle_langs.join(","))
            .arg("--convert-subs")
            .arg(&request.subtitle_format)
            .arg("--output")
            .arg(output_pattern)
            // -J alone implies simulate; --no-simulate keeps the subtitle writes.
            .arg("--dump-single-json")
            .arg("--no-simulate")
            .arg("--no-progress");

        if let Some(cookies) = &request.cookies {
            command.arg("--cookies").arg(cookies);
        }

        command.arg(&request.url);
        command
    }
}

impl Extractor for YtDlp {
    fn extract(&self, request: &ExtractionRequest) -> Result<VideoInfo> {
        let output = self
            .command(request)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .with_context(|| format!("launching {}", self.program.display()))?;

        if !output.status.success() {
            bail!(
                "{} failed for {} (status {})",
                self.program.display(),
                request.url,
                output.status
            );
        }

        let raw_json =
            String::from_utf8(output.stdout).context("parsing yt-dlp output as UTF-8")?;
        let info: VideoInfo = serde_json::from_str(raw_json.trim())
            .with_context(|| format!("deserializing yt-dlp metadata for {}", request.url))?;
        Ok(info)
    }
}

/// Runs `<program> --version` to fail loudly when yt-dlp is missing.
pub fn ensure_program_available(program: &Path) -> Result<()> {
    let status = Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(_) => bail!(
            "{} is installed but returned a failure status",
            program.display()
        ),
        Err(err) => bail!(
            "{} is not installed or not in PATH: {}",
            program.display(),
            err
        ),
    }
}
