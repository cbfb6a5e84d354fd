//! # quickpoint-core: deck model and navigation state machine
//!
//! Everything in this crate is pure: no I/O, no timers, no channels.
//! Hosts (desktop binary, browser bindings) feed it slide sources and
//! intents and project the resulting [`Position`] onto their own views.
//!
//! ## Pipeline
//!
//! ```text
//! key / click / token / remote msg
//!       │
//!       ▼
//!   Intent ──► navigation::transition() ──► Position
//!                                              │
//!                 ┌────────────────────────────┼──────────────────┐
//!                 ▼                            ▼                  ▼
//!        codec::encode()            RevealProjector::project()   sync bus
//!        (#slide-N-step-K)          (step-tagged elements)       (other windows)
//! ```
//!
//! ## Modules
//!
//! - [`deck`]: Deck, Slide, Manifest and load errors
//! - [`markup`]: step-marker and notes scanning over slide HTML
//! - [`position`]: Position and the per-window Position Model
//! - [`codec`]: location token encode/decode
//! - [`navigation`]: the transition function
//! - [`reveal`]: step reveal projection
//! - [`input`]: key and swipe mapping to intents

pub mod codec;
pub mod deck;
pub mod input;
pub mod markup;
pub mod navigation;
pub mod position;
pub mod reveal;

pub use codec::{decode, encode, LocationToken};
pub use deck::{error_notice_html, Deck, DeckError, Manifest, Slide};
pub use input::{intent_for_key, intent_for_swipe, SWIPE_THRESHOLD_PX};
pub use markup::StepElement;
pub use navigation::{transition, DeckShape, Intent, StepCounts};
pub use position::{Position, PositionModel};
pub use reveal::{RevealProjector, RevealTarget};
