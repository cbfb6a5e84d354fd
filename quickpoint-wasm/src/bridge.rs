//! Host-independent glue between browser values and the viewer core.
//!
//! Compiled on every target so the conversions are tested natively.

use std::cell::RefCell;

use serde_json::{json, Value};

use quickpoint_core::{Deck, DeckError};
use quickpoint_sync::{PresenterSnapshot, SyncMessage};

/// Build a deck from the parallel arrays the page hands over.
///
/// A missing or empty label falls back to `slide-N`.
pub fn deck_from_parts(labels: &[String], sources: Vec<String>) -> Result<Deck, DeckError> {
    Deck::from_sources(sources.into_iter().enumerate().map(|(index, html)| {
        let label = labels
            .get(index)
            .filter(|label| !label.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("slide-{}", index + 1));
        (label, html)
    }))
}

/// Interpret a posted message already serialized to JSON text.
///
/// Malformed and unknown messages are dropped.
pub fn decode_posted(text: &str) -> Option<SyncMessage> {
    match SyncMessage::decode(text) {
        Ok(message) => message,
        Err(e) => {
            log::warn!("bridge: dropping message: {e}");
            None
        }
    }
}

/// Presenter render model as a plain JSON object for page scripts.
pub fn snapshot_json(snapshot: &PresenterSnapshot) -> Value {
    json!({
        "index": snapshot.position.slide,
        "step": snapshot.position.step_signed(),
        "slideInfo": snapshot.slide_info,
        "progress": snapshot.progress_fraction(),
        "notes": snapshot.notes,
        "hasNotes": snapshot.has_notes,
        "prevEnabled": snapshot.prev_enabled,
        "nextEnabled": snapshot.next_enabled,
        "currentHash": snapshot.current.to_hash(),
        "nextTitle": snapshot.next.title,
        "nextHash": snapshot.next.location.to_hash(),
    })
}

/// Run `update` under a mutable borrow of `cell`, then hand its result
/// to `deliver` once the borrow is released. Page callbacks go through
/// `deliver` so they may call back into the same state.
pub fn update_then_deliver<S, T>(
    cell: &RefCell<S>,
    update: impl FnOnce(&mut S) -> Option<T>,
    deliver: impl FnOnce(T),
) {
    let pending = update(&mut cell.borrow_mut());
    if let Some(value) = pending {
        deliver(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickpoint_sync::{PresenterView, ViewerConfig};

    #[test]
    fn test_deck_from_parts_label_fallback() {
        let deck = deck_from_parts(
            &["a.html".to_string(), String::new()],
            vec!["<h1>a</h1>".into(), "<h1>b</h1>".into(), "<h1>c</h1>".into()],
        )
        .unwrap();
        let labels: Vec<_> = deck.slides().iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["a.html", "slide-2", "slide-3"]);
    }

    #[test]
    fn test_deck_from_parts_empty() {
        assert!(matches!(deck_from_parts(&[], Vec::new()), Err(DeckError::EmptyDeck)));
    }

    #[test]
    fn test_decode_posted() {
        assert_eq!(decode_posted(r#"{"type":"CMD_PREV"}"#), Some(SyncMessage::CommandPrev));
        assert_eq!(decode_posted(r#"{"type":"HELLO"}"#), None);
        assert_eq!(decode_posted("null"), None);
    }

    #[test]
    fn test_snapshot_json() {
        let deck = deck_from_parts(
            &["one.html".to_string(), "two.html".to_string()],
            vec![r#"<p data-step="1">x</p>"#.into(), "<p>y</p>".into()],
        )
        .unwrap();
        let view = PresenterView::new(deck, ViewerConfig::satellite());
        let value = snapshot_json(&view.snapshot());
        assert_eq!(value["slideInfo"], "Slide 1 / 2 — one.html");
        assert_eq!(value["step"], -1);
        assert_eq!(value["progress"], 0.5);
        assert_eq!(value["nextTitle"], "Next Animation");
        assert_eq!(value["nextHash"], "#slide-1-step-1");
        assert_eq!(value["prevEnabled"], false);
    }

    #[test]
    fn test_callback_can_reenter_state() {
        let deck = deck_from_parts(&[], vec!["<p>a</p>".into(), "<p>b</p>".into()]).unwrap();
        let cell = RefCell::new(PresenterView::new(deck, ViewerConfig::satellite()));
        let mut seen = Vec::new();

        update_then_deliver(
            &cell,
            |view| {
                let effects = view.handle_message(SyncMessage::SlideChanged { index: 1, step: -1 });
                effects.position.map(|_| snapshot_json(&view.snapshot()))
            },
            |pushed| {
                // The page reads the snapshot again and presses a button.
                let mut view = cell.borrow_mut();
                seen.push(pushed["slideInfo"].clone());
                seen.push(snapshot_json(&view.snapshot())["slideInfo"].clone());
                assert_eq!(view.press_prev().outgoing, vec![SyncMessage::CommandPrev]);
            },
        );

        assert_eq!(seen, vec![json!("Slide 2 / 2 — slide-2"), json!("Slide 2 / 2 — slide-2")]);
    }

    #[test]
    fn test_nothing_delivered_without_change() {
        let cell = RefCell::new(0u32);
        let mut delivered = false;
        update_then_deliver(&cell, |n| (*n > 0).then_some(*n), |_| delivered = true);
        assert!(!delivered);
        assert_eq!(*cell.borrow(), 0);
    }
}
