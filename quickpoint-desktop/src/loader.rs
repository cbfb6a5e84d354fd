//! Presentation folder loading.
//!
//! A presentation is a directory holding `config.json` and the slide
//! files it lists. Slide paths are relative to the directory.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use log::{debug, info};
use quickpoint_core::{Deck, DeckError, Manifest};

pub const MANIFEST_FILE: &str = "config.json";

/// Read the manifest and every slide it lists.
pub fn load_folder(dir: &Path) -> Result<Deck, DeckError> {
    let manifest = Manifest::from_json(&fs::read_to_string(dir.join(MANIFEST_FILE))?)?;

    let mut sources = Vec::with_capacity(manifest.slides.len());
    for source in &manifest.slides {
        let html = fs::read_to_string(dir.join(source)).map_err(|e| DeckError::SlideUnavailable {
            source_id: source.clone(),
            reason: e.to_string(),
        })?;
        let label = Path::new(source)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(source)
            .to_string();
        debug!("loader: read {source} ({} bytes)", html.len());
        sources.push((label, html));
    }

    let deck = Deck::from_sources(sources)?.with_manifest(manifest);
    info!(
        "loader: loaded {} slides from {}{}",
        deck.len(),
        dir.display(),
        deck.manifest()
            .and_then(Manifest::title)
            .map(|title| format!(" ({title})"))
            .unwrap_or_default()
    );
    Ok(deck)
}

/// Newest modification time of any file under `dir`.
///
/// Unreadable entries are skipped. `None` when the tree has no files.
pub fn newest_mtime(dir: &Path) -> io::Result<Option<SystemTime>> {
    let mut newest = None;
    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        let Ok(file_type) = entry.file_type() else { continue };
        let candidate = if file_type.is_dir() {
            newest_mtime(&entry.path()).ok().flatten()
        } else {
            entry.metadata().and_then(|m| m.modified()).ok()
        };
        newest = newest.max(candidate);
    }
    Ok(newest)
}
