//! Deck, slides, and the presentation manifest.
//!
//! A [`Deck`] is built once per presentation load from the ordered slide
//! sources handed over by the content collaborator, and is immutable for
//! the rest of the session. Step markers and notes are scanned at build
//! time so navigation never re-parses markup.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::markup::{self, StepElement};
use crate::navigation::DeckShape;

/// Failures while acquiring or assembling a deck.
///
/// Load failures are fatal for the loading viewer only.
#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error("manifest could not be parsed: {0}")]
    ManifestParse(#[from] serde_json::Error),
    #[error("presentation has no slides")]
    EmptyDeck,
    #[error("slide {source_id} is unavailable: {reason}")]
    SlideUnavailable { source_id: String, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Presentation manifest (`config.json`).
///
/// Only `slides` is interpreted. `template`, `theme`, and any other keys
/// are passed through untouched for the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Ordered slide source identifiers, relative to the manifest.
    pub slides: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Free-form metadata (title, date, speaker, ...).
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Manifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self, DeckError> {
        let manifest: Manifest = serde_json::from_str(text)?;
        if manifest.slides.is_empty() {
            return Err(DeckError::EmptyDeck);
        }
        Ok(manifest)
    }

    /// Presentation title from metadata, if present.
    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").and_then(Value::as_str)
    }
}

/// One slide of a deck.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    index: usize,
    label: String,
    html: String,
    step_elements: Vec<StepElement>,
    step_values: Vec<i64>,
    notes: Option<String>,
}

impl Slide {
    /// Build a slide from its markup, scanning step markers and notes.
    pub fn new(index: usize, label: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let step_elements = markup::scan_step_elements(&html);
        let step_values = markup::normalize_step_values(step_elements.iter().map(|e| e.marker));
        let notes = markup::extract_notes(&html);
        Self {
            index,
            label: label.into(),
            html,
            step_elements,
            step_values,
            notes,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Display label (the source filename).
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Sorted, de-duplicated step markers.
    pub fn step_values(&self) -> &[i64] {
        &self.step_values
    }

    pub fn step_count(&self) -> usize {
        self.step_values.len()
    }

    /// Step-tagged elements in document order.
    pub fn step_elements(&self) -> &[StepElement] {
        &self.step_elements
    }

    /// Presenter notes (inner HTML of the `notes` region).
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

/// The ordered, immutable set of slides for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    slides: Vec<Slide>,
    manifest: Option<Manifest>,
}

impl Deck {
    /// Build a deck from `(label, html)` pairs in presentation order.
    pub fn from_sources<L, H>(sources: impl IntoIterator<Item = (L, H)>) -> Result<Self, DeckError>
    where
        L: Into<String>,
        H: Into<String>,
    {
        let slides: Vec<Slide> = sources
            .into_iter()
            .enumerate()
            .map(|(index, (label, html))| Slide::new(index, label, html))
            .collect();
        if slides.is_empty() {
            return Err(DeckError::EmptyDeck);
        }
        log::info!("deck: loaded {} slides", slides.len());
        Ok(Self {
            slides,
            manifest: None,
        })
    }

    /// Attach the manifest the deck was loaded from.
    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Always false for a constructed deck; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn slide(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    /// Step values of a slide; empty for an out-of-range index.
    pub fn step_values(&self, index: usize) -> &[i64] {
        self.slides.get(index).map(Slide::step_values).unwrap_or_default()
    }
}

impl DeckShape for Deck {
    fn slide_count(&self) -> usize {
        self.slides.len()
    }

    fn step_count(&self, slide_index: usize) -> usize {
        self.slides.get(slide_index).map_or(0, Slide::step_count)
    }
}

/// Minimal in-place notice shown instead of slide content after a load failure.
pub fn error_notice_html(error: &DeckError) -> String {
    let message = error.to_string();
    let mut escaped = String::with_capacity(message.len());
    for ch in message.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    format!("<div class=\"slide active\"><h1>Error</h1><p>{escaped}</p></div>")
}
