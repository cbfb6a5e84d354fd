#![forbid(unsafe_code)]

//! Browser host for quickpoint viewers.
//!
//! Exposes two `wasm-bindgen` classes:
//! - `QuickPointViewer` renders a deck into a container and joins the
//!   page's `BroadcastChannel` as a primary (unless the page URL carries
//!   `receiver=false`). Keys, swipes, `hashchange` and channel messages
//!   drive it; the address is kept in sync with `history.replaceState`.
//! - `QuickPointPresenter` mirrors the main window as a satellite and
//!   hands a render snapshot to page scripts on every change.

pub mod bridge;

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{QuickPointPresenter, QuickPointViewer};
