use anyhow::{Context, Result, bail};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_CONFIG_PATH: &str = "hoopshub-env";
pub const DEFAULT_CATALOG_PATH: &str = "videos.json";
pub const DEFAULT_SUBTITLE_DIR: &str = "subs";
pub const DEFAULT_COOKIE_FILE: &str = "cookies.txt";
pub const DEFAULT_YTDLP_PROGRAM: &str = "yt-dlp";
pub const DEFAULT_SUBTITLE_LANGS: &[&str] = &["en", "zh-Hans"];
pub const SUBTITLE_FORMAT: &str = "vtt";

/// Values found in the optional `KEY=VALUE` config file. Anything left as
/// `None` falls back to the defaults above.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub catalog_path: Option<PathBuf>,
    pub subtitle_dir: Option<PathBuf>,
    pub cookie_file: Option<PathBuf>,
    pub ytdlp_program: Option<PathBuf>,
    pub subtitle_langs: Option<Vec<String>>,
}

/// Every location and knob the ingestion flow needs, resolved once at start-up
/// and handed to the catalog store and the ingestor.
#[derive(Debug, Clone)]
pub struct Settings {
    pub storage_path: PathBuf,
    pub subtitle_dir: PathBuf,
    pub credential_path: PathBuf,
    pub ytdlp_program: PathBuf,
    pub subtitle_langs: Vec<String>,
    pub subtitle_format: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            subtitle_dir: PathBuf::from(DEFAULT_SUBTITLE_DIR),
            credential_path: PathBuf::from(DEFAULT_COOKIE_FILE),
            ytdlp_program: PathBuf::from(DEFAULT_YTDLP_PROGRAM),
            subtitle_langs: DEFAULT_SUBTITLE_LANGS
                .iter()
                .map(|lang| lang.to_string())
                .collect(),
            subtitle_format: SUBTITLE_FORMAT.to_string(),
        }
    }
}

impl Settings {
    /// Returns the cookies file only when it is actually present on disk.
    pub fn credentials(&self) -> Option<&Path> {
        let path = self.credential_path.as_path();
        path.is_file().then_some(path)
    }
}

/// Yields `(KEY, value)` pairs from `KEY=VALUE` lines, skipping blanks and
/// `#` comments. Values may be wrapped in double quotes.
fn env_entries(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim().trim_matches('"')))
}

impl EnvConfig {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let slot = match key {
            "CATALOG_PATH" => &mut self.catalog_path,
            "SUBTITLE_DIR" => &mut self.subtitle_dir,
            "COOKIE_FILE" => &mut self.cookie_file,
            "YT_DLP" => &mut self.ytdlp_program,
            "SUB_LANGS" => {
                let langs = parse_langs(value);
                if langs.is_empty() {
                    bail!("SUB_LANGS lists no languages");
                }
                self.subtitle_langs = Some(langs);
                return Ok(());
            }
            _ => return Ok(()),
        };
        *slot = (!value.is_empty()).then(|| PathBuf::from(value));
        Ok(())
    }
}

/// Reads the optional env file; `None` when it does not exist.
pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for (key, value) in env_entries(&content) {
        cfg.set(key, value)
            .with_context(|| format!("Parsing {key} from {}", path.display()))?;
    }
    Ok(Some(cfg))
}

pub fn load_settings_from(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let cfg = read_env_config(path)?.unwrap_or_default();
    let defaults = Settings::default();
    Ok(Settings {
        storage_path: cfg.catalog_path.unwrap_or(defaults.storage_path),
        subtitle_dir: cfg.subtitle_dir.unwrap_or(defaults.subtitle_dir),
        credential_path: cfg.cookie_file.unwrap_or(defaults.credential_path),
        ytdlp_program: cfg.ytdlp_program.unwrap_or(defaults.ytdlp_program),
        subtitle_langs: cfg.subtitle_langs.unwrap_or(defaults.subtitle_langs),
        subtitle_format: defaults.subtitle_format,
    })
}

fn parse_langs(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    /// Writes `contents` to an env file inside a fresh temp dir.
    fn env_file(contents: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hoopshub-env");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings_from(dir.path().join("absent-env")).unwrap();
        assert_eq!(settings.storage_path, PathBuf::from("videos.json"));
        assert_eq!(settings.subtitle_dir, PathBuf::from("subs"));
        assert_eq!(settings.credential_path, PathBuf::from("cookies.txt"));
        assert_eq!(settings.ytdlp_program, PathBuf::from("yt-dlp"));
        assert_eq!(settings.subtitle_langs, vec!["en", "zh-Hans"]);
        assert_eq!(settings.subtitle_format, "vtt");
    }

    #[test]
    fn read_env_config_extracts_paths_and_langs() {
        let (_dir, cfg) = env_file(
            "# local overrides\nCATALOG_PATH=\"site/videos.json\"\nSUBTITLE_DIR=site/subs\nSUB_LANGS=\"en, ja ,\"\nUNKNOWN=1\n",
        );
        let parsed = read_env_config(&cfg).unwrap().unwrap();
        assert_eq!(parsed.catalog_path, Some(PathBuf::from("site/videos.json")));
        assert_eq!(parsed.subtitle_dir, Some(PathBuf::from("site/subs")));
        assert_eq!(
            parsed.subtitle_langs,
            Some(vec!["en".to_string(), "ja".to_string()])
        );
        assert!(parsed.cookie_file.is_none());
    }

    #[test]
    fn env_entries_skip_comments_and_malformed_lines() {
        let content = "  # comment\n\nNO_EQUALS\n KEY = \"quoted value\" \nEMPTY=\n";
        let entries: Vec<_> = env_entries(content).collect();
        assert_eq!(entries, vec![("KEY", "quoted value"), ("EMPTY", "")]);
    }

    #[test]
    fn empty_sub_langs_is_rejected() {
        let (_dir, cfg) = env_file("SUB_LANGS=\" , \"\n");
        let err = read_env_config(&cfg).unwrap_err();
        assert!(format!("{err:#}").contains("SUB_LANGS lists no languages"));
    }

    #[test]
    fn load_settings_keeps_defaults_for_unset_keys() {
        let (_dir, cfg) = env_file("YT_DLP=/opt/bin/yt-dlp\nCOOKIE_FILE=\"\"\n");
        let settings = load_settings_from(&cfg).unwrap();
        assert_eq!(settings.ytdlp_program, PathBuf::from("/opt/bin/yt-dlp"));
        assert_eq!(settings.credential_path, PathBuf::from(DEFAULT_COOKIE_FILE));
        assert_eq!(settings.storage_path, PathBuf::from(DEFAULT_CATALOG_PATH));
    }

    #[test]
    fn credentials_only_reported_when_file_exists() {
        let dir = tempdir().unwrap();
        let mut settings = Settings {
            credential_path: dir.path().join("cookies.txt"),
            ..Settings::default()
        };
        assert!(settings.credentials().is_none());

        fs::write(&settings.credential_path, "# Netscape HTTP Cookie File\n").unwrap();
        assert_eq!(
            settings.credentials(),
            Some(settings.credential_path.as_path())
        );

        settings.credential_path = dir.path().to_path_buf();
        assert!(settings.credentials().is_none());
    }
}
