//! Presenter satellite model.
//!
//! The presenter window holds a copy of the deck (for notes and step
//! counts) but not the authoritative Position: it mirrors whatever the
//! primary announces and turns its own buttons and keys into commands.
//! Its two preview frames are receiver-only viewers driven purely by
//! location tokens.

use quickpoint_core::{codec, transition, Deck, Intent, LocationToken, Position, StepCounts};

use crate::config::ViewerConfig;
use crate::controller::{Effects, ViewerController};
use crate::protocol::SyncMessage;

/// Shown when the current slide has no notes region.
pub const NO_NOTES_PLACEHOLDER: &str = "No notes for this slide.";

/// What the "next" preview frame shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPreview {
    pub title: &'static str,
    pub location: LocationToken,
}

/// Everything the presenter window renders for one Position.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenterSnapshot {
    pub position: Position,
    /// `Slide N / M — filename`.
    pub slide_info: String,
    /// 1-based slide number and slide count.
    pub progress: (usize, usize),
    /// Notes HTML, or [`NO_NOTES_PLACEHOLDER`].
    pub notes: String,
    pub has_notes: bool,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    /// Token for the "current" preview frame.
    pub current: LocationToken,
    pub next: NextPreview,
}

impl PresenterSnapshot {
    /// Progress as a fraction in `(0, 1]`.
    pub fn progress_fraction(&self) -> f64 {
        let (slide, total) = self.progress;
        if total == 0 {
            return 0.0;
        }
        slide as f64 / total as f64
    }
}

/// Presenter window state.
pub struct PresenterView {
    deck: Deck,
    controller: ViewerController,
}

impl PresenterView {
    pub fn new(deck: Deck, config: ViewerConfig) -> Self {
        let controller = ViewerController::satellite(StepCounts::of(&deck), config);
        Self { deck, controller }
    }

    pub fn controller(&self) -> &ViewerController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ViewerController {
        &mut self.controller
    }

    pub fn position(&self) -> Position {
        self.controller.current_position()
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// Previous button or `ArrowLeft`. Sends nothing at the start of
    /// the deck.
    pub fn press_prev(&mut self) -> Effects {
        self.controller.handle_intent(Intent::Retreat)
    }

    /// Next button or advance keys. Sends nothing once every step of the
    /// last slide is revealed.
    pub fn press_next(&mut self) -> Effects {
        self.controller.handle_intent(Intent::Advance)
    }

    /// Whether `intent` would move the primary from the mirrored Position.
    fn can_move(&self, intent: Intent) -> bool {
        let position = self.position();
        transition(position, intent, &self.deck) != position
    }

    pub fn handle_message(&mut self, message: SyncMessage) -> Effects {
        self.controller.handle_message(message)
    }

    /// Swap in a reloaded deck.
    pub fn replace_deck(&mut self, deck: Deck) -> Effects {
        let effects = self.controller.replace_deck(deck.clone());
        self.deck = deck;
        effects
    }

    /// Render model for the current Position.
    pub fn snapshot(&self) -> PresenterSnapshot {
        let position = self.position();
        let total = self.deck.len();
        let slide = self.deck.slide(position.slide);

        let filename = slide
            .map(|s| s.label().to_string())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| format!("slide-{}", position.slide + 1));
        let notes = slide.and_then(|s| s.notes());
        let step_count = slide.map_or(0, |s| s.step_count());

        PresenterSnapshot {
            position,
            slide_info: format!("Slide {} / {} — {}", position.slide + 1, total, filename),
            progress: (position.slide + 1, total),
            notes: notes.unwrap_or(NO_NOTES_PLACEHOLDER).to_string(),
            has_notes: notes.is_some(),
            prev_enabled: self.can_move(Intent::Retreat),
            next_enabled: self.can_move(Intent::Advance),
            current: codec::encode(position),
            next: next_preview(position, step_count, total),
        }
    }
}

fn next_preview(position: Position, step_count: usize, total: usize) -> NextPreview {
    let next_step = position.step.map_or(0, |step| step + 1);
    if next_step < step_count {
        NextPreview {
            title: "Next Animation",
            location: codec::encode(Position::new(position.slide, Some(next_step))),
        }
    } else {
        let next_slide = (position.slide + 1).min(total.saturating_sub(1));
        NextPreview {
            title: "Next Slide",
            location: codec::encode(Position::slide(next_slide)),
        }
    }
}
