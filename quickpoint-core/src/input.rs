//! Mapping raw input events to navigation intents.

use crate::navigation::Intent;

/// Minimum horizontal travel for a touch swipe to count.
pub const SWIPE_THRESHOLD_PX: f64 = 50.0;

/// Intent for a key, using DOM `KeyboardEvent.key` names.
pub fn intent_for_key(key: &str) -> Option<Intent> {
    match key {
        "ArrowRight" | " " | "Enter" => Some(Intent::Advance),
        "ArrowLeft" => Some(Intent::Retreat),
        _ => None,
    }
}

/// Intent for a horizontal swipe from `start_x` to `end_x`.
///
/// Swiping left (content moves toward the next slide) advances.
pub fn intent_for_swipe(start_x: f64, end_x: f64) -> Option<Intent> {
    if start_x - end_x > SWIPE_THRESHOLD_PX {
        Some(Intent::Advance)
    } else if end_x - start_x > SWIPE_THRESHOLD_PX {
        Some(Intent::Retreat)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(intent_for_key("ArrowRight"), Some(Intent::Advance));
        assert_eq!(intent_for_key(" "), Some(Intent::Advance));
        assert_eq!(intent_for_key("Enter"), Some(Intent::Advance));
        assert_eq!(intent_for_key("ArrowLeft"), Some(Intent::Retreat));
        assert_eq!(intent_for_key("ArrowUp"), None);
    }

    #[test]
    fn test_swipes() {
        assert_eq!(intent_for_swipe(300.0, 200.0), Some(Intent::Advance));
        assert_eq!(intent_for_swipe(200.0, 300.0), Some(Intent::Retreat));
        assert_eq!(intent_for_swipe(200.0, 240.0), None);
        assert_eq!(intent_for_swipe(200.0, 150.0), None);
    }
}
