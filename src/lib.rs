#![forbid(unsafe_code)]

//! Shared pieces of the HoopsHub catalog tools.
//!
//! The binary in `src/bin/add_video.rs` is a thin prompt loop; everything it
//! does (settings, the JSON catalog, the yt-dlp wrapper and the ingestion
//! flow) lives here so it can be tested without a terminal.

pub mod catalog;
pub mod config;
pub mod extractor;
pub mod ingest;
