//! Location Codec: Position <-> bookmarkable token.
//!
//! Wire form: `slide-<N>` or `slide-<N>-step-<K>`, both 1-based. In a
//! browser address the token sits in the fragment (`#slide-3-step-2`).
//!
//! Decoding is tolerant: it looks for the first integer after a `slide`
//! marker and the first integer after a `step` marker anywhere in the
//! input, in either order, ignoring surrounding text.

use std::fmt;

use crate::navigation::{DeckShape, Intent};
use crate::position::Position;

const SLIDE_MARKER: &str = "slide";
const STEP_MARKER: &str = "step";

/// Encoded Position, without the leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationToken(String);

impl LocationToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fragment form for an address bar (`#slide-N...`).
    pub fn to_hash(&self) -> String {
        format!("#{}", self.0)
    }
}

impl fmt::Display for LocationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocationToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encode a Position. The step segment is present iff a step is revealed.
pub fn encode(position: Position) -> LocationToken {
    let token = match position.step {
        Some(step) => format!("slide-{}-step-{}", position.slide + 1, step + 1),
        None => format!("slide-{}", position.slide + 1),
    };
    LocationToken(token)
}

/// Decode a location string against a deck shape.
///
/// Returns `None` when no slide number can be found; the caller keeps its
/// current Position in that case. The slide number is clamped into
/// `[1, slide_count]`. A step number past the slide's last step clamps to
/// the last step; zero or negative step numbers mean no step revealed.
pub fn decode<D: DeckShape + ?Sized>(location: &str, deck: &D) -> Option<Position> {
    let slide_number = number_after(location, SLIDE_MARKER)?;
    if deck.slide_count() == 0 {
        return None;
    }

    // Reuse the JumpTo clamp for the slide, then clamp the step ourselves.
    let slide = crate::navigation::transition(
        Position::START,
        Intent::JumpTo {
            slide: slide_number.saturating_sub(1),
            step: -1,
        },
        deck,
    )
    .slide;

    let steps = deck.step_count(slide);
    let step = number_after(location, STEP_MARKER)
        .filter(|&number| number >= 1 && steps > 0)
        .map(|number| usize::try_from(number - 1).unwrap_or(usize::MAX).min(steps - 1));

    Some(Position::new(slide, step))
}

/// First integer that directly follows an occurrence of `marker`,
/// allowing separator characters in between.
fn number_after(input: &str, marker: &str) -> Option<i64> {
    let lower = input.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut from = 0;

    while let Some(offset) = lower[from..].find(marker) {
        let separators_start = from + offset + marker.len();
        let mut pos = separators_start;
        while pos < bytes.len() && matches!(bytes[pos], b'-' | b'_' | b'=' | b':' | b'/' | b' ') {
            pos += 1;
        }
        // `slide--2` reads as minus two.
        let negative = bytes[separators_start..pos].ends_with(b"--");

        let digits_start = pos;
        let mut value: i64 = 0;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            value = value.saturating_mul(10).saturating_add(i64::from(bytes[pos] - b'0'));
            pos += 1;
        }
        if pos > digits_start {
            return Some(if negative { -value } else { value });
        }
        from = separators_start;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::StepCounts;
    use proptest::prelude::*;

    #[test]
    fn test_encode_forms() {
        assert_eq!(encode(Position::START).as_str(), "slide-1");
        assert_eq!(encode(Position::new(2, Some(0))).as_str(), "slide-3-step-1");
        assert_eq!(encode(Position::new(0, Some(4))).to_hash(), "#slide-1-step-5");
    }

    #[test]
    fn test_decode_clamps_slide_and_step() {
        let deck = StepCounts(vec![0, 0, 0, 2]);
        assert_eq!(decode("#slide-10-step-3", &deck), Some(Position::new(3, Some(1))));
        assert_eq!(decode("#slide-0", &deck), Some(Position::START));
        assert_eq!(decode("#slide-2-step-4", &deck), Some(Position::slide(1)));
    }

    #[test]
    fn test_decode_is_tolerant() {
        let deck = StepCounts(vec![0, 3, 0]);
        assert_eq!(decode("index.html?receiver=false#slide-2-step-2", &deck), Some(Position::new(1, Some(1))));
        assert_eq!(decode("#step-3-slide-2", &deck), Some(Position::new(1, Some(2))));
        assert_eq!(decode("#Slide-3", &deck), Some(Position::slide(2)));
        assert_eq!(decode("#slide-2-step-0", &deck), Some(Position::slide(1)));
        assert_eq!(decode("#slides/slide-2", &deck), Some(Position::slide(1)));
    }

    #[test]
    fn test_decode_rejects_non_numeric() {
        let deck = StepCounts(vec![0, 0]);
        assert_eq!(decode("", &deck), None);
        assert_eq!(decode("#intro", &deck), None);
        assert_eq!(decode("#slide-abc", &deck), None);
        assert_eq!(decode("#slide-1", &StepCounts::default()), None);
    }

    #[test]
    fn test_decode_negative_slide_clamps_to_first() {
        let deck = StepCounts(vec![0, 0]);
        assert_eq!(decode("#slide--5", &deck), Some(Position::START));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(counts in prop::collection::vec(0usize..6, 1..10), pick in any::<prop::sample::Index>(), step_pick in any::<prop::sample::Index>()) {
            let slide = pick.index(counts.len());
            let steps = counts[slide];
            let step = (steps > 0).then(|| step_pick.index(steps + 1)).and_then(|k| k.checked_sub(1));
            let deck = StepCounts(counts);
            let position = Position::new(slide, step);
            prop_assert_eq!(decode(encode(position).as_str(), &deck), Some(position));
        }
    }
}
