//! Service worker that relays push messages to system notifications.
//!
//! Compiled to WebAssembly and loaded by a small JavaScript shim
//! (`web/firebase-messaging-sw.js`). While no page of the app is visible,
//! each push from the messaging channel becomes a system notification; a
//! click on it focuses an open app window or opens one at a deep link built
//! from the push data.
//!
//! # Flow
//!
//! ```text
//! Messaging backend           Worker (this crate)              App window
//! ─────────────────────────────────────────────────────────────────────────
//! push ─────────────────────► page visible? ── yes ──► postMessage(payload)
//!                                  │ no
//!                                  ▼
//!                             showNotification(title, body, data)
//!
//! user clicks ──────────────► close, build /?route=..&roomId=..
//!                             focus first window ───────► focused
//!                             or openWindow(url) ───────► new window
//! ```
//!
//! # Modules
//!
//! - [`config`] - Messaging project and relay options
//! - [`payload`] - Push payload model and title/body resolution
//! - [`deep_link`] - Deep-link URL construction
//! - [`relay`] - Push and click handlers
//! - [`lifecycle`] - Worker states and event lifetime extension
//! - [`platform`] - Browser API seams

use wasm_bindgen::prelude::*;

pub mod config;
pub mod deep_link;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod payload;
pub mod platform;
pub mod relay;

#[cfg(target_arch = "wasm32")]
pub mod worker;

pub use config::{MessagingConfig, RelayConfig};
pub use error::{RelayError, RelayResult};
pub use lifecycle::{ExtendableEvent, PendingOperation, WorkerLifecycle, WorkerState};
pub use payload::{DisplayNotification, NotificationData, PushPayload};
pub use platform::{ClickedNotification, Platform};
pub use relay::{ClickOutcome, PushOutcome, PushRelay};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    // Panics show up in the worker's console instead of as "unreachable"
    console_error_panic_hook::set_once();
}

/// Test function to verify WASM loads correctly.
#[wasm_bindgen]
pub fn ping() -> String {
    "messaging-sw-wasm loaded".to_string()
}
