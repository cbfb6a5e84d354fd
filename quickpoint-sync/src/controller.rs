//! Per-window navigation and sync controller.
//!
//! One `ViewerController` per window owns that window's Position state
//! and turns every input (intent, location change, sync message) into an
//! [`Effects`] value the host applies: replace the address token, re-run
//! the reveal projection, post messages. The controller itself does no
//! I/O, so every protocol rule is testable without a channel.
//!
//! Protocol rules enforced here:
//! - a local Position change is announced with `SLIDE_CHANGED`;
//! - an incoming `SLIDE_CHANGED` is applied only if it differs from the
//!   current Position, and is never re-announced (no echo storms);
//! - commands are executed by primaries only; a no-op command produces
//!   no announcement;
//! - `REQUEST_STATE` is answered by primaries with their Position;
//! - a viewer with `receiver = false` neither sends nor applies messages.

use log::{debug, info, warn};

use quickpoint_core::{
    codec, Deck, Intent, LocationToken, Position, PositionModel, RevealProjector,
    StepCounts,
};

use crate::config::ViewerConfig;
use crate::protocol::{Role, SyncMessage};

/// What the host must do after the controller handled an input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects {
    /// New Position, if it changed. Host re-renders and re-projects steps.
    pub position: Option<Position>,
    /// Token to write to the address with replace (not push) semantics.
    pub location: Option<LocationToken>,
    /// Messages to post on the channel, in order.
    pub outgoing: Vec<SyncMessage>,
}

impl Effects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.location.is_none() && self.outgoing.is_empty()
    }

    fn send(message: SyncMessage) -> Self {
        Self {
            outgoing: vec![message],
            ..Self::default()
        }
    }
}

/// Where the controller's Position comes from.
#[derive(Debug, Clone)]
enum Seat {
    /// Owns slide content; runs transitions itself.
    Primary(PositionModel),
    /// Mirrors a primary. The shape is only used to clamp incoming
    /// Positions and to decide whether commands can do anything.
    Satellite {
        shape: StepCounts,
        position: Position,
        synced: bool,
    },
}

/// Navigation/sync state machine for one viewer window.
#[derive(Debug, Clone)]
pub struct ViewerController {
    config: ViewerConfig,
    seat: Seat,
}

impl ViewerController {
    /// Primary viewer over a loaded deck.
    pub fn primary(deck: Deck, config: ViewerConfig) -> Self {
        Self {
            config: ViewerConfig {
                role: Role::Primary,
                ..config
            },
            seat: Seat::Primary(PositionModel::new(deck)),
        }
    }

    /// Satellite viewer for a deck with the given step counts.
    pub fn satellite(shape: StepCounts, config: ViewerConfig) -> Self {
        Self {
            config: ViewerConfig {
                role: Role::Satellite,
                ..config
            },
            seat: Seat::Satellite {
                shape,
                position: Position::START,
                synced: false,
            },
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn role(&self) -> Role {
        self.config.role
    }

    /// Whether this viewer takes part in the sync bus.
    pub fn participates(&self) -> bool {
        self.config.receiver
    }

    pub fn current_position(&self) -> Position {
        match &self.seat {
            Seat::Primary(model) => model.current_position(),
            Seat::Satellite { position, .. } => *position,
        }
    }

    /// Whether a satellite has heard from a primary yet. Always true for
    /// primaries.
    pub fn is_synced(&self) -> bool {
        match &self.seat {
            Seat::Primary(_) => true,
            Seat::Satellite { synced, .. } => *synced,
        }
    }

    /// Deck, for primaries.
    pub fn deck(&self) -> Option<&Deck> {
        match &self.seat {
            Seat::Primary(model) => Some(model.deck()),
            Seat::Satellite { .. } => None,
        }
    }

    /// Reveal decision for the current Position (primaries only).
    pub fn reveal_projector(&self) -> Option<RevealProjector<'_>> {
        match &self.seat {
            Seat::Primary(model) => Some(RevealProjector::for_position(
                model.active_step_values(),
                model.current_position(),
            )),
            Seat::Satellite { .. } => None,
        }
    }

    /// Startup effects.
    ///
    /// A primary decodes its initial location (if any), writes the
    /// canonical token, and announces its Position. A satellite asks the
    /// channel for the current state.
    pub fn start(&mut self, initial_location: Option<&str>) -> Effects {
        let participates = self.participates();
        match &mut self.seat {
            Seat::Primary(model) => {
                if let Some(target) = initial_location.and_then(|loc| codec::decode(loc, model.deck())) {
                    model.apply(Intent::jump(target));
                }
                let position = model.current_position();
                info!("viewer: primary starting at {position}");
                Effects {
                    position: Some(position),
                    location: Some(codec::encode(position)),
                    outgoing: if participates {
                        vec![SyncMessage::slide_changed(position)]
                    } else {
                        Vec::new()
                    },
                }
            }
            Seat::Satellite { shape, position, .. } => {
                if let Some(target) = initial_location.and_then(|loc| codec::decode(loc, shape)) {
                    *position = target;
                }
                info!("viewer: satellite starting at {position}, requesting state");
                Effects {
                    position: Some(*position),
                    location: None,
                    outgoing: if participates {
                        vec![SyncMessage::RequestState]
                    } else {
                        Vec::new()
                    },
                }
            }
        }
    }

    /// Handle a local navigation intent (key, click, swipe).
    pub fn handle_intent(&mut self, intent: Intent) -> Effects {
        match &mut self.seat {
            Seat::Primary(model) => match model.apply(intent) {
                Some(position) => self.local_change(position),
                None => Effects::none(),
            },
            Seat::Satellite { shape, position, .. } => {
                if !self.config.receiver {
                    debug!("viewer: satellite with sync disabled ignores {intent:?}");
                    return Effects::none();
                }
                let command = match intent {
                    Intent::Advance => SyncMessage::CommandNext,
                    Intent::Retreat => SyncMessage::CommandPrev,
                    Intent::JumpTo { .. } => {
                        warn!("viewer: satellites cannot jump; ignoring {intent:?}");
                        return Effects::none();
                    }
                };
                // Skip commands that cannot move the primary.
                if quickpoint_core::transition(*position, intent, shape) == *position {
                    debug!("viewer: {intent:?} at {position} would be a no-op; not sent");
                    return Effects::none();
                }
                Effects::send(command)
            }
        }
    }

    /// Handle the address changing out from under the viewer (history
    /// navigation, manual edit, embedding frame driving us).
    ///
    /// Malformed tokens leave the Position unchanged.
    pub fn handle_location(&mut self, location: &str) -> Effects {
        match &mut self.seat {
            Seat::Primary(model) => {
                let Some(target) = codec::decode(location, model.deck()) else {
                    debug!("viewer: ignoring location {location:?}");
                    return Effects::none();
                };
                match model.apply(Intent::jump(target)) {
                    Some(position) => self.local_change(position),
                    None => Effects::none(),
                }
            }
            Seat::Satellite { shape, position, synced } => {
                let Some(target) = codec::decode(location, shape) else {
                    return Effects::none();
                };
                if target == *position {
                    return Effects::none();
                }
                *position = target;
                *synced = true;
                Effects {
                    position: Some(target),
                    ..Effects::default()
                }
            }
        }
    }

    /// Handle a message received from another viewer.
    pub fn handle_message(&mut self, message: SyncMessage) -> Effects {
        if !self.config.receiver {
            return Effects::none();
        }

        match (&mut self.seat, message) {
            (Seat::Primary(model), SyncMessage::SlideChanged { index, step }) => {
                // Applied through JumpTo so out-of-range values are clamped,
                // and not re-announced.
                match model.apply(Intent::JumpTo { slide: index, step }) {
                    Some(position) => {
                        debug!("viewer: adopted remote position {position}");
                        Effects {
                            position: Some(position),
                            location: Some(codec::encode(position)),
                            outgoing: Vec::new(),
                        }
                    }
                    None => Effects::none(),
                }
            }
            (Seat::Primary(model), SyncMessage::CommandNext | SyncMessage::CommandPrev) => {
                let intent = if message == SyncMessage::CommandNext {
                    Intent::Advance
                } else {
                    Intent::Retreat
                };
                match model.apply(intent) {
                    Some(position) => self.local_change(position),
                    None => Effects::none(),
                }
            }
            (Seat::Primary(model), SyncMessage::RequestState) => {
                Effects::send(SyncMessage::slide_changed(model.current_position()))
            }
            (Seat::Satellite { shape, position, synced }, SyncMessage::SlideChanged { index, step }) => {
                let target = quickpoint_core::transition(*position, Intent::JumpTo { slide: index, step }, shape);
                *synced = true;
                if target == *position {
                    return Effects::none();
                }
                *position = target;
                debug!("viewer: satellite mirrored {target}");
                Effects {
                    position: Some(target),
                    ..Effects::default()
                }
            }
            (Seat::Satellite { .. }, other) => {
                debug!("viewer: satellite ignores {}", other.type_name());
                Effects::none()
            }
        }
    }

    /// Replace the deck after a reload, keeping the Position where the new
    /// deck allows. Announces the Position if it moved.
    pub fn replace_deck(&mut self, deck: Deck) -> Effects {
        match &mut self.seat {
            Seat::Primary(model) => {
                let before = model.current_position();
                let after = model.replace_deck(deck);
                let mut effects = Effects {
                    position: Some(after),
                    location: Some(codec::encode(after)),
                    outgoing: Vec::new(),
                };
                if after != before && self.config.receiver {
                    effects.outgoing.push(SyncMessage::slide_changed(after));
                }
                effects
            }
            Seat::Satellite { shape, position, .. } => {
                let counts = StepCounts::of(&deck);
                *position = quickpoint_core::navigation::clamp(*position, &counts);
                *shape = counts;
                Effects {
                    position: Some(*position),
                    ..Effects::default()
                }
            }
        }
    }

    fn local_change(&self, position: Position) -> Effects {
        Effects {
            position: Some(position),
            location: Some(codec::encode(position)),
            outgoing: if self.config.receiver {
                vec![SyncMessage::slide_changed(position)]
            } else {
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three slides; the second has two steps.
    fn deck() -> Deck {
        Deck::from_sources([
            ("intro.html", "<h1>Intro</h1>"),
            ("list.html", r#"<li data-step="1">a</li><li data-step="2">b</li>"#),
            ("end.html", "<h1>Thanks</h1>"),
        ])
        .unwrap()
    }

    fn primary() -> ViewerController {
        ViewerController::primary(deck(), ViewerConfig::primary())
    }

    #[test]
    fn test_primary_start_announces() {
        let mut viewer = primary();
        let effects = viewer.start(None);
        assert_eq!(effects.position, Some(Position::START));
        assert_eq!(effects.location.as_ref().map(LocationToken::as_str), Some("slide-1"));
        assert_eq!(effects.outgoing, vec![SyncMessage::SlideChanged { index: 0, step: -1 }]);
    }

    #[test]
    fn test_primary_start_from_location() {
        let mut viewer = primary();
        let effects = viewer.start(Some("#slide-2-step-2"));
        assert_eq!(viewer.current_position(), Position::new(1, Some(1)));
        assert_eq!(
            effects.location.as_ref().map(LocationToken::as_str),
            Some("slide-2-step-2")
        );
    }

    #[test]
    fn test_intent_broadcasts_after_location() {
        let mut viewer = primary();
        let effects = viewer.handle_intent(Intent::Advance);
        assert_eq!(effects.position, Some(Position::slide(1)));
        assert_eq!(effects.location.as_ref().map(LocationToken::as_str), Some("slide-2"));
        assert_eq!(effects.outgoing, vec![SyncMessage::SlideChanged { index: 1, step: -1 }]);
    }

    #[test]
    fn test_boundary_intent_is_silent() {
        let mut viewer = primary();
        assert!(viewer.handle_intent(Intent::Retreat).is_empty());
    }

    #[test]
    fn test_remote_slide_changed_applied_once_without_echo() {
        let mut viewer = primary();
        let msg = SyncMessage::SlideChanged { index: 1, step: 0 };

        let first = viewer.handle_message(msg);
        assert_eq!(first.position, Some(Position::new(1, Some(0))));
        assert!(first.outgoing.is_empty());

        let second = viewer.handle_message(msg);
        assert!(second.is_empty());
    }

    #[test]
    fn test_remote_out_of_range_is_clamped() {
        let mut viewer = primary();
        let effects = viewer.handle_message(SyncMessage::SlideChanged { index: 99, step: 5 });
        assert_eq!(effects.position, Some(Position::slide(2)));
        let effects = viewer.handle_message(SyncMessage::SlideChanged { index: -3, step: 0 });
        assert_eq!(effects.position, Some(Position::START));
    }

    #[test]
    fn test_command_next_at_end_is_silent() {
        let mut viewer = primary();
        viewer.handle_intent(Intent::JumpTo { slide: 2, step: -1 });
        assert!(viewer.handle_message(SyncMessage::CommandNext).is_empty());
    }

    #[test]
    fn test_commands_drive_primary() {
        let mut viewer = primary();
        let effects = viewer.handle_message(SyncMessage::CommandNext);
        assert_eq!(effects.outgoing, vec![SyncMessage::SlideChanged { index: 1, step: -1 }]);
        let effects = viewer.handle_message(SyncMessage::CommandPrev);
        assert_eq!(effects.outgoing, vec![SyncMessage::SlideChanged { index: 0, step: -1 }]);
    }

    #[test]
    fn test_request_state_answered_without_change() {
        let mut viewer = primary();
        viewer.handle_intent(Intent::Advance);
        let effects = viewer.handle_message(SyncMessage::RequestState);
        assert_eq!(effects.position, None);
        assert_eq!(effects.outgoing, vec![SyncMessage::SlideChanged { index: 1, step: -1 }]);
    }

    #[test]
    fn test_location_change_runs_full_path() {
        let mut viewer = primary();
        let effects = viewer.handle_location("#slide-2-step-1");
        assert_eq!(effects.position, Some(Position::new(1, Some(0))));
        assert_eq!(effects.outgoing.len(), 1);
        assert!(viewer.handle_location("#slide-2-step-1").is_empty());
        assert!(viewer.handle_location("#garbage").is_empty());
        assert_eq!(viewer.current_position(), Position::new(1, Some(0)));
    }

    #[test]
    fn test_receiver_false_neither_sends_nor_applies() {
        let config = ViewerConfig::from_query("?receiver=false");
        let mut viewer = ViewerController::primary(deck(), config);
        assert!(viewer.start(None).outgoing.is_empty());
        assert!(viewer.handle_message(SyncMessage::CommandNext).is_empty());
        assert!(viewer.handle_message(SyncMessage::RequestState).is_empty());

        let effects = viewer.handle_location("index.html?receiver=false#slide-3");
        assert_eq!(effects.position, Some(Position::slide(2)));
        assert!(effects.outgoing.is_empty());
    }

    #[test]
    fn test_satellite_sends_commands_only() {
        let mut satellite = ViewerController::satellite(StepCounts(vec![0, 2, 0]), ViewerConfig::satellite());
        assert_eq!(satellite.start(None).outgoing, vec![SyncMessage::RequestState]);
        assert!(!satellite.is_synced());

        let effects = satellite.handle_intent(Intent::Advance);
        assert_eq!(effects.outgoing, vec![SyncMessage::CommandNext]);
        assert_eq!(effects.position, None);
        assert_eq!(satellite.current_position(), Position::START);
    }

    #[test]
    fn test_satellite_mirrors_slide_changed() {
        let shape = StepCounts(vec![0, 2, 0]);
        let mut satellite = ViewerController::satellite(shape, ViewerConfig::satellite());
        let effects = satellite.handle_message(SyncMessage::SlideChanged { index: 1, step: 1 });
        assert_eq!(effects.position, Some(Position::new(1, Some(1))));
        assert!(effects.outgoing.is_empty());
        assert!(satellite.is_synced());
        assert!(satellite.handle_message(SyncMessage::SlideChanged { index: 1, step: 1 }).is_empty());
        assert!(satellite.handle_message(SyncMessage::CommandNext).is_empty());
        assert!(satellite.handle_message(SyncMessage::RequestState).is_empty());
    }

    #[test]
    fn test_satellite_clamps_out_of_range_remote() {
        let mut satellite = ViewerController::satellite(StepCounts(vec![0, 2, 0]), ViewerConfig::satellite());
        let effects = satellite.handle_message(SyncMessage::SlideChanged { index: 9, step: 5 });
        assert_eq!(effects.position, Some(Position::slide(2)));

        let effects = satellite.handle_message(SyncMessage::SlideChanged { index: 1, step: 7 });
        assert_eq!(effects.position, Some(Position::slide(1)));
        assert_eq!(satellite.current_position(), Position::slide(1));
    }

    #[test]
    fn test_satellite_with_shape_suppresses_boundary_commands() {
        let shape = StepCounts(vec![0, 0]);
        let mut satellite = ViewerController::satellite(shape, ViewerConfig::satellite());
        assert!(satellite.handle_intent(Intent::Retreat).is_empty());
        satellite.handle_message(SyncMessage::SlideChanged { index: 1, step: -1 });
        assert!(satellite.handle_intent(Intent::Advance).is_empty());
        assert_eq!(satellite.handle_intent(Intent::Retreat).outgoing, vec![SyncMessage::CommandPrev]);
    }

    #[test]
    fn test_replace_deck_clamps_and_announces() {
        let mut viewer = primary();
        viewer.handle_intent(Intent::JumpTo { slide: 2, step: -1 });
        let shorter = Deck::from_sources([("only.html", "<h1>x</h1>")]).unwrap();
        let effects = viewer.replace_deck(shorter);
        assert_eq!(effects.position, Some(Position::START));
        assert_eq!(effects.outgoing, vec![SyncMessage::SlideChanged { index: 0, step: -1 }]);
    }

    #[test]
    fn test_reveal_projector_tracks_position() {
        let mut viewer = primary();
        viewer.handle_intent(Intent::JumpTo { slide: 1, step: 0 });
        let projector = viewer.reveal_projector().unwrap();
        assert!(projector.is_revealed(1));
        assert!(!projector.is_revealed(2));
    }
}
