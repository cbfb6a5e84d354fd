//! Terminal renderings of the main and presenter windows.

use std::io::{self, Write};

use log::warn;
use quickpoint_core::{error_notice_html, DeckError, LocationToken, RevealTarget, Slide, StepElement};
use quickpoint_sync::{PresenterView, ViewHost, ViewerController};

/// Step reveal state of the slide currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideFrame {
    elements: Vec<StepElement>,
    revealed: Vec<bool>,
}

impl SlideFrame {
    /// Every step-tagged element starts hidden.
    pub fn new(slide: &Slide) -> Self {
        let elements = slide.step_elements().to_vec();
        let revealed = vec![false; elements.len()];
        Self { elements, revealed }
    }

    pub fn is_revealed(&self, ordinal: usize) -> bool {
        self.revealed.get(ordinal).copied().unwrap_or(false)
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed.iter().filter(|&&r| r).count()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl RevealTarget for SlideFrame {
    fn step_elements(&self) -> Vec<StepElement> {
        self.elements.clone()
    }

    fn set_revealed(&mut self, ordinal: usize, revealed: bool) {
        if let Some(slot) = self.revealed.get_mut(ordinal) {
            *slot = revealed;
        }
    }
}

/// Collapse markup to a single line of visible text.
pub fn plain_text(html: &str, max_chars: usize) -> String {
    let mut text = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(max_chars.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

/// Main window: the active slide and its address.
pub struct TerminalView<W> {
    out: W,
    location: String,
    frame: Option<SlideFrame>,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            location: String::new(),
            frame: None,
        }
    }

    /// Address as last written by the viewer (`#slide-N...`).
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn frame(&self) -> Option<&SlideFrame> {
        self.frame.as_ref()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Replace slide content with the load-failure notice.
    pub fn show_error(&mut self, error: &DeckError) {
        self.frame = None;
        let notice = plain_text(&error_notice_html(error), usize::MAX);
        if let Err(e) = writeln!(self.out, "{notice}") {
            warn!("view: could not write error notice: {e}");
        }
    }

    fn draw(&mut self, viewer: &ViewerController) -> io::Result<()> {
        let Some(deck) = viewer.deck() else {
            return Ok(());
        };
        let position = viewer.current_position();
        let Some(slide) = deck.slide(position.slide) else {
            return Ok(());
        };

        let mut frame = SlideFrame::new(slide);
        if let Some(projector) = viewer.reveal_projector() {
            projector.project(&mut frame);
        }

        writeln!(
            self.out,
            "[{} / {}] {}  {}",
            position.slide + 1,
            deck.len(),
            slide.label(),
            self.location
        )?;
        writeln!(self.out, "  {}", plain_text(slide.html(), 72))?;
        if !frame.is_empty() {
            let marks: String = (0..frame.len())
                .map(|ordinal| if frame.is_revealed(ordinal) { '#' } else { '.' })
                .collect();
            writeln!(self.out, "  steps {marks}")?;
        }
        self.out.flush()?;
        self.frame = Some(frame);
        Ok(())
    }
}

impl<W: Write> ViewHost<ViewerController> for TerminalView<W> {
    fn render(&mut self, viewer: &ViewerController) {
        if let Err(e) = self.draw(viewer) {
            warn!("view: render failed: {e}");
        }
    }

    fn replace_location(&mut self, token: &LocationToken) {
        self.location = token.to_hash();
    }
}

/// Presenter window: slide info, notes and the next preview.
pub struct PresenterPane<W> {
    out: W,
}

impl PresenterPane<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> PresenterPane<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, view: &PresenterView) -> io::Result<()> {
        let snapshot = view.snapshot();
        let (slide, total) = snapshot.progress;
        writeln!(self.out, "presenter | {} | {:.0}%", snapshot.slide_info, snapshot.progress_fraction() * 100.0)?;
        writeln!(self.out, "  notes: {}", plain_text(&snapshot.notes, 72))?;
        writeln!(
            self.out,
            "  {}: #{}  [prev {}] [next {}] ({slide}/{total})",
            snapshot.next.title,
            snapshot.next.location,
            if snapshot.prev_enabled { "on" } else { "off" },
            if snapshot.next_enabled { "on" } else { "off" },
        )?;
        self.out.flush()
    }
}

impl<W: Write> ViewHost<PresenterView> for PresenterPane<W> {
    fn render(&mut self, view: &PresenterView) {
        if let Err(e) = self.draw(view) {
            warn!("presenter: render failed: {e}");
        }
    }
}
