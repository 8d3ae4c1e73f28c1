#![forbid(unsafe_code)]

//! Interactive helper that adds one YouTube video to the HoopsHub catalog.
//!
//! Asks for a link and an optional custom title, lets yt-dlp fetch the
//! subtitles, then records the video at the top of `videos.json` (or refreshes
//! it in place when it is already listed).

use anyhow::{Context, Result};
use clap::Parser;
use hoopshub_tools::catalog::{CatalogStore, VideoRecord};
use hoopshub_tools::config::{DEFAULT_CONFIG_PATH, Settings, load_settings_from};
use hoopshub_tools::extractor::{YtDlp, ensure_program_available};
use hoopshub_tools::ingest::{Ingestor, RunOutcome, run_ingest};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Add a YouTube video and its subtitles to the HoopsHub catalog.")]
struct Cli {
    #[arg(value_name = "URL", help = "Video link; prompted for when omitted")]
    url: Option<String>,
    #[arg(
        long = "title",
        value_name = "TITLE",
        help = "Custom title; prompted for when omitted"
    )]
    title: Option<String>,
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH, help = "Path to the config file")]
    config: PathBuf,
    #[arg(
        long = "catalog",
        value_name = "PATH",
        help = "Override the catalog file (default videos.json)"
    )]
    catalog: Option<PathBuf>,
    #[arg(
        long = "subs-dir",
        value_name = "PATH",
        help = "Override the subtitle directory (default subs)"
    )]
    subs_dir: Option<PathBuf>,
    #[arg(
        long = "cookies",
        value_name = "PATH",
        help = "Override the cookies file (default cookies.txt)"
    )]
    cookies: Option<PathBuf>,
    #[arg(
        long = "yt-dlp",
        value_name = "PATH",
        help = "yt-dlp executable to run (default yt-dlp from PATH)"
    )]
    ytdlp: Option<PathBuf>,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let mut settings = load_settings_from(&self.config)
            .with_context(|| format!("loading config {}", self.config.display()))?;
        if let Some(path) = &self.catalog {
            settings.storage_path = path.clone();
        }
        if let Some(path) = &self.subs_dir {
            settings.subtitle_dir = path.clone();
        }
        if let Some(path) = &self.cookies {
            settings.credential_path = path.clone();
        }
        if let Some(path) = &self.ytdlp {
            settings.ytdlp_program = path.clone();
        }
        Ok(settings)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    println!("=== HoopsHub local manager ===");

    let url = match &cli.url {
        Some(url) => url.trim().to_owned(),
        None => prompt("YouTube link: ")?,
    };
    if url.is_empty() {
        return Ok(());
    }

    let title = match &cli.title {
        Some(title) => title.trim().to_owned(),
        None => prompt("Custom title (Enter keeps the original): ")?,
    };

    if let Err(err) = ensure_program_available(&settings.ytdlp_program) {
        eprintln!("Warning: {err:#}");
    }

    let store = CatalogStore::new(&settings.storage_path);
    let ytdlp = YtDlp::new(&settings.ytdlp_program);
    let ingestor = Ingestor::new(settings, ytdlp);

    println!("Resolving {url} ...");
    let outcome = run_ingest(&store, &ingestor, &url, Some(title.as_str()))?;

    let (record, total) = match outcome {
        RunOutcome::Failed(err) => {
            eprintln!("Error: {err:#}");
            eprintln!("The catalog was left unchanged.");
            return Ok(());
        }
        RunOutcome::Updated { record, total } => {
            println!(">>> Warning: this video was already listed; its entry was refreshed.");
            (record, total)
        }
        RunOutcome::Added { record, total } => {
            println!(">>> New video added!");
            (record, total)
        }
    };

    print_summary(&record);
    println!(
        "The catalog now holds {total} videos ({}). Remember to push the change to GitHub.",
        store.path().display()
    );
    Ok(())
}

fn print_summary(record: &VideoRecord) {
    println!("  Id: {}", record.id);
    println!("  Title: {}", record.title);
    if record.sub_url.is_empty() {
        println!("  Subtitle: none found");
    } else {
        println!("  Subtitle: {}", record.sub_url);
    }
    match record.upload_day() {
        Some(day) => println!("  Uploaded: {}", day.format("%Y-%m-%d")),
        None if !record.timestamp.is_empty() => println!("  Uploaded: {}", record.timestamp),
        None => {}
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush().ok();
    read_answer(&mut io::stdin().lock())
}

/// Reads one trimmed line; end of input counts as an empty answer.
fn read_answer(input: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line).context("reading input")?;
    Ok(line.trim().to_owned())
}
