//! Navigation Engine: the pure transition function.
//!
//! `transition(current, intent, deck)` never wraps around. Advance and
//! Retreat at deck boundaries return `current` unchanged, and a slide
//! without step markers is stepped over directly.

use log::debug;

use crate::position::{Position, PositionModel};

/// Shape of a deck as far as navigation is concerned.
pub trait DeckShape {
    fn slide_count(&self) -> usize;
    fn step_count(&self, slide_index: usize) -> usize;
}

/// Deck shape given as per-slide step counts. Used by views that do not
/// hold slide content and by tests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepCounts(pub Vec<usize>);

impl StepCounts {
    /// Snapshot the shape of any deck.
    pub fn of<D: DeckShape + ?Sized>(deck: &D) -> Self {
        Self((0..deck.slide_count()).map(|i| deck.step_count(i)).collect())
    }
}

impl DeckShape for StepCounts {
    fn slide_count(&self) -> usize {
        self.0.len()
    }

    fn step_count(&self, slide_index: usize) -> usize {
        self.0.get(slide_index).copied().unwrap_or(0)
    }
}

/// Navigation intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Reveal the next step, or move to the next slide.
    Advance,
    /// Hide the last revealed step, or move to the previous slide.
    Retreat,
    /// Go to a raw (unvalidated) slide/step pair; `step < 0` means none.
    JumpTo { slide: i64, step: i64 },
}

impl Intent {
    /// Jump to an already-typed Position.
    pub fn jump(position: Position) -> Self {
        Intent::JumpTo {
            slide: position.slide as i64,
            step: position.step_signed(),
        }
    }
}

/// Compute the next Position.
pub fn transition<D: DeckShape + ?Sized>(current: Position, intent: Intent, deck: &D) -> Position {
    let slide_count = deck.slide_count();
    if slide_count == 0 {
        return current;
    }

    match intent {
        Intent::Advance => {
            let next_step = current.step.map_or(0, |step| step + 1);
            if next_step < deck.step_count(current.slide) {
                Position::new(current.slide, Some(next_step))
            } else if current.slide + 1 < slide_count {
                Position::slide(current.slide + 1)
            } else {
                current
            }
        }
        Intent::Retreat => match current.step {
            Some(0) => Position::slide(current.slide),
            Some(step) => Position::new(current.slide, Some(step - 1)),
            None if current.slide > 0 => Position::slide(current.slide - 1),
            None => current,
        },
        Intent::JumpTo { slide, step } => {
            let slide = clamp_index(slide, slide_count);
            let steps = deck.step_count(slide);
            let step = usize::try_from(step).ok().filter(|&step| step < steps);
            Position::new(slide, step)
        }
    }
}

/// Force a Position into the deck's bounds using the `JumpTo` rule.
pub fn clamp<D: DeckShape + ?Sized>(position: Position, deck: &D) -> Position {
    transition(position, Intent::jump(position), deck)
}

fn clamp_index(raw: i64, count: usize) -> usize {
    let max = count.saturating_sub(1);
    usize::try_from(raw).map_or(0, |index| index.min(max))
}

impl PositionModel {
    /// Run an intent through the transition function and store the result.
    ///
    /// Returns the new Position when it differs from the previous one, or
    /// `None` for a no-op (boundary, or jump to the current Position).
    pub fn apply(&mut self, intent: Intent) -> Option<Position> {
        let current = self.current_position();
        let next = transition(current, intent, self.deck());
        if self.set(next) {
            debug!("navigation: {intent:?} {current} -> {next}");
            Some(next)
        } else {
            debug!("navigation: {intent:?} at {current} is a no-op");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scenario_deck() -> StepCounts {
        StepCounts(vec![0, 2, 0])
    }

    #[test]
    fn test_advance_sequence_scenario() {
        let deck = scenario_deck();
        let mut position = Position::START;
        let mut seen = vec![position];
        for _ in 0..5 {
            position = transition(position, Intent::Advance, &deck);
            seen.push(position);
        }
        assert_eq!(
            seen,
            vec![
                Position::slide(0),
                Position::slide(1),
                Position::new(1, Some(0)),
                Position::new(1, Some(1)),
                Position::slide(2),
                Position::slide(2),
            ]
        );
    }

    #[test]
    fn test_retreat_walks_back_through_steps() {
        let deck = scenario_deck();
        let mut position = Position::new(1, Some(1));
        position = transition(position, Intent::Retreat, &deck);
        assert_eq!(position, Position::new(1, Some(0)));
        position = transition(position, Intent::Retreat, &deck);
        assert_eq!(position, Position::slide(1));
        position = transition(position, Intent::Retreat, &deck);
        assert_eq!(position, Position::slide(0));
        position = transition(position, Intent::Retreat, &deck);
        assert_eq!(position, Position::START);
    }

    #[test]
    fn test_retreat_into_previous_slide_resets_steps() {
        let deck = StepCounts(vec![3, 0]);
        assert_eq!(transition(Position::slide(1), Intent::Retreat, &deck), Position::slide(0));
    }

    #[test]
    fn test_boundaries_are_noops() {
        let deck = StepCounts(vec![1, 2]);
        let last = Position::new(1, Some(1));
        assert_eq!(transition(last, Intent::Advance, &deck), last);
        assert_eq!(transition(Position::START, Intent::Retreat, &deck), Position::START);
    }

    #[test]
    fn test_jump_clamps() {
        let deck = StepCounts(vec![0, 0, 0, 2]);
        assert_eq!(
            transition(Position::START, Intent::JumpTo { slide: 9, step: 1 }, &deck),
            Position::new(3, Some(1))
        );
        assert_eq!(
            transition(Position::START, Intent::JumpTo { slide: 3, step: 2 }, &deck),
            Position::slide(3)
        );
        assert_eq!(
            transition(Position::slide(2), Intent::JumpTo { slide: -4, step: -7 }, &deck),
            Position::START
        );
    }

    #[test]
    fn test_empty_shape_is_inert() {
        let deck = StepCounts::default();
        assert_eq!(transition(Position::START, Intent::Advance, &deck), Position::START);
    }

    #[test]
    fn test_model_apply_reports_changes_only() {
        let deck = crate::Deck::from_sources([
            ("a.html", "<h1>a</h1>"),
            ("b.html", r#"<p data-step="1">x</p>"#),
        ])
        .unwrap();
        let mut model = PositionModel::new(deck);
        assert_eq!(model.apply(Intent::Retreat), None);
        assert_eq!(model.apply(Intent::Advance), Some(Position::slide(1)));
        assert_eq!(model.apply(Intent::Advance), Some(Position::new(1, Some(0))));
        assert_eq!(model.apply(Intent::Advance), None);
        assert_eq!(model.apply(Intent::jump(Position::new(1, Some(0)))), None);
    }

    fn shape_and_position() -> impl Strategy<Value = (StepCounts, Position)> {
        prop::collection::vec(0usize..5, 1..8).prop_flat_map(|counts| {
            let slides = counts.len();
            (Just(counts), 0..slides).prop_flat_map(|(counts, slide)| {
                let steps = counts[slide];
                let step = prop::option::of(0..steps.max(1))
                    .prop_map(move |step| step.filter(|&s| s < steps));
                (Just(StepCounts(counts)), step.prop_map(move |step| Position::new(slide, step)))
            })
        })
    }

    proptest! {
        #[test]
        fn prop_transitions_stay_in_bounds((deck, start) in shape_and_position(), advance in any::<bool>()) {
            let intent = if advance { Intent::Advance } else { Intent::Retreat };
            let next = transition(start, intent, &deck);
            prop_assert!(next.slide < deck.slide_count());
            if let Some(step) = next.step {
                prop_assert!(step < deck.step_count(next.slide));
            }
        }

        #[test]
        fn prop_advance_then_retreat_returns(
            (deck, start) in shape_and_position()
        ) {
            let forward = transition(start, Intent::Advance, &deck);
            prop_assume!(forward != start);
            let back = transition(forward, Intent::Retreat, &deck);
            // Stepping back into a previous slide lands on its first view.
            if forward.slide == start.slide {
                prop_assert_eq!(back, start);
            } else {
                prop_assert_eq!(back, Position::slide(start.slide));
            }
        }
    }
}
