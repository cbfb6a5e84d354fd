//! Position and the per-window Position Model.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::deck::Deck;

/// Where we are in the deck.
///
/// `step == None` means the slide is shown with no incremental step
/// revealed yet; `Some(k)` means steps `0..=k` are revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub slide: usize,
    pub step: Option<usize>,
}

impl Position {
    pub const START: Position = Position { slide: 0, step: None };

    pub fn new(slide: usize, step: Option<usize>) -> Self {
        Self { slide, step }
    }

    /// Slide shown with no step revealed.
    pub fn slide(slide: usize) -> Self {
        Self { slide, step: None }
    }

    /// Step index in the signed form used on the wire (`-1` = none).
    pub fn step_signed(&self) -> i64 {
        self.step.map_or(-1, |step| step as i64)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.slide, self.step_signed())
    }
}

/// Single source of truth for one window's Position.
///
/// Holds the deck and the active slide's normalized step values. The step
/// values are refreshed whenever the slide changes, before any caller can
/// ask about steps for the new slide.
#[derive(Debug, Clone)]
pub struct PositionModel {
    deck: Deck,
    position: Position,
    active_steps: Vec<i64>,
}

impl PositionModel {
    pub fn new(deck: Deck) -> Self {
        let active_steps = deck.step_values(0).to_vec();
        Self {
            deck,
            position: Position::START,
            active_steps,
        }
    }

    pub fn current_position(&self) -> Position {
        self.position
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// Normalized step values of the active slide.
    pub fn active_step_values(&self) -> &[i64] {
        &self.active_steps
    }

    /// Store a Position produced by the navigation engine.
    ///
    /// Returns `true` when the stored Position actually changed. The caller
    /// is expected to pass an in-bounds Position (the output of
    /// `transition`); out-of-range values are clamped, never stored.
    pub(crate) fn set(&mut self, next: Position) -> bool {
        let next = crate::navigation::clamp(next, &self.deck);
        if next == self.position {
            return false;
        }
        if next.slide != self.position.slide {
            self.active_steps = self.deck.step_values(next.slide).to_vec();
        }
        self.position = next;
        true
    }

    /// Swap in a freshly loaded deck, keeping the Position as far as the
    /// new deck allows.
    pub fn replace_deck(&mut self, deck: Deck) -> Position {
        self.deck = deck;
        self.position = crate::navigation::clamp(self.position, &self.deck);
        self.active_steps = self.deck.step_values(self.position.slide).to_vec();
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck() -> Deck {
        Deck::from_sources([
            ("1.html", r#"<p data-step="3">a</p>"#),
            ("2.html", r#"<p data-step="2">a</p><p data-step="2">b</p><p data-step="5">c</p><p data-step="1">d</p>"#),
        ])
        .unwrap()
    }

    #[test]
    fn test_display_uses_signed_step() {
        assert_eq!(Position::START.to_string(), "{0, -1}");
        assert_eq!(Position::new(2, Some(1)).to_string(), "{2, 1}");
    }

    #[test]
    fn test_model_recomputes_steps_on_slide_change() {
        let mut model = PositionModel::new(deck());
        assert_eq!(model.active_step_values(), &[3]);

        assert!(model.set(Position::slide(1)));
        assert_eq!(model.active_step_values(), &[1, 2, 5]);

        assert!(model.set(Position::new(1, Some(2))));
        assert_eq!(model.current_position(), Position::new(1, Some(2)));
        assert!(!model.set(Position::new(1, Some(2))));
    }

    #[test]
    fn test_model_clamps_out_of_range() {
        let mut model = PositionModel::new(deck());
        model.set(Position::new(40, Some(9)));
        assert_eq!(model.current_position(), Position::slide(1));
    }

    #[test]
    fn test_replace_deck_clamps() {
        let mut model = PositionModel::new(deck());
        model.set(Position::new(1, Some(2)));
        let shorter = Deck::from_sources([("only.html", "<h1>x</h1>")]).unwrap();
        assert_eq!(model.replace_deck(shorter), Position::START);
        assert!(model.active_step_values().is_empty());
    }
}
