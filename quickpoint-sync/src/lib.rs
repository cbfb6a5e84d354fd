//! # quickpoint-sync: cross-window sync bus for quickpoint viewers
//!
//! Keeps any number of independent viewer windows (main view, presenter
//! view, receiver-only previews) agreed on the deck Position, with no
//! central authority and no network.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   SLIDE_CHANGED    ┌──────────────┐
//! │ ViewerClient │ ─────────────────► │ ViewerClient │
//! │  (primary)   │ ◄───────────────── │ (presenter)  │
//! └──────┬───────┘  CMD_NEXT/PREV,    └──────┬───────┘
//!        │          REQUEST_STATE            │
//!        ▼                                   ▼
//! ┌──────────────┐                    ┌──────────────┐
//! │ViewerControl-│                    │ PresenterView│
//! │ler + Deck    │                    │ (satellite)  │
//! └──────────────┘                    └──────────────┘
//!            \                          /
//!             └──── BroadcastGroup ────┘
//!                  (named channel)
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: JSON wire protocol (`SyncMessage`)
//! - `broadcast`: in-process named channels with best-effort fan-out
//!   (`runtime` feature)
//! - [`config`]: per-viewer configuration and the `receiver` flag
//! - [`controller`]: the per-window sync state machine
//! - [`presenter`]: presenter satellite render model
//! - `client`: async driver joining a controller to a channel
//!   (`runtime` feature)

#[cfg(feature = "runtime")]
pub mod broadcast;
#[cfg(feature = "runtime")]
pub mod client;
pub mod config;
pub mod controller;
pub mod presenter;
pub mod protocol;

// Re-exports for convenience
#[cfg(feature = "runtime")]
pub use broadcast::{BroadcastGroup, BroadcastStats, BusReceiver, ChannelRegistry, Envelope};
#[cfg(feature = "runtime")]
pub use client::{ConnectionState, SyncPeer, ViewHost, ViewerClient, ViewerCommand};
pub use config::{ViewerConfig, DEFAULT_CHANNEL, RECEIVER_PARAM};
pub use controller::{Effects, ViewerController};
pub use presenter::{NextPreview, PresenterSnapshot, PresenterView, NO_NOTES_PLACEHOLDER};
pub use protocol::{InstanceInfo, ProtocolError, Role, SyncMessage};
