//! Step Reveal Projector.
//!
//! Decides which step-tagged elements of the active slide are revealed
//! and pushes that decision onto a rendering collaborator. The decision
//! is a pure function of `(step_values, step)`; the projection is a full
//! recompute, so running it twice for the same Position is harmless.

use crate::markup::StepElement;
use crate::position::Position;

/// Rendering collaborator that owns step-tagged elements.
pub trait RevealTarget {
    /// Step-tagged elements currently shown, with their raw marker values.
    fn step_elements(&self) -> Vec<StepElement>;

    /// Mark one element (by ordinal) revealed or hidden.
    fn set_revealed(&mut self, ordinal: usize, revealed: bool);
}

/// Reveal decision for one slide at one step index.
#[derive(Debug, Clone, Copy)]
pub struct RevealProjector<'a> {
    step_values: &'a [i64],
    step: Option<usize>,
}

impl<'a> RevealProjector<'a> {
    pub fn new(step_values: &'a [i64], step: Option<usize>) -> Self {
        Self { step_values, step }
    }

    /// Projector for `position` given the active slide's step values.
    pub fn for_position(step_values: &'a [i64], position: Position) -> Self {
        Self::new(step_values, position.step)
    }

    /// Largest revealed marker value, if any step is revealed.
    pub fn threshold(&self) -> Option<i64> {
        self.step.and_then(|step| self.step_values.get(step).copied())
    }

    /// Whether an element with this raw marker is revealed.
    ///
    /// Step values are sorted, so "position in `step_values` <= step" is
    /// the same as "marker <= step_values[step]". Markers absent from
    /// `step_values` are never revealed.
    pub fn is_revealed(&self, marker: i64) -> bool {
        match (self.threshold(), self.step_values.binary_search(&marker)) {
            (Some(threshold), Ok(_)) => marker <= threshold,
            _ => false,
        }
    }

    /// Apply the decision to every step-tagged element of `target`.
    ///
    /// Returns the number of revealed elements.
    pub fn project<T: RevealTarget + ?Sized>(&self, target: &mut T) -> usize {
        let mut revealed_count = 0;
        for element in target.step_elements() {
            let revealed = self.is_revealed(element.marker);
            if revealed {
                revealed_count += 1;
            }
            target.set_revealed(element.ordinal, revealed);
        }
        revealed_count
    }
}
