//! # xkeyctl
//!
//! Keyboard capture and emulation for X11.
//!
//! ## Features
//!
//! - Capture presses and releases of a chosen set of keys on a background
//!   thread (XInput2 raw key events)
//! - Suppress those keys so no other client receives them (XInput2 passive
//!   grabs)
//! - Type text and backspaces into the focused window
//! - Send key combinations such as `Control_L(c)` or `Alt_L(Shift_L(Tab))`
//! - Synthetic events are never reported back by the capture engine
//!
//! ## Quick Start
//!
//! ### Capturing Keys
//!
//! ```no_run
//! # #[cfg(all(target_os = "linux", feature = "x11"))]
//! # fn main() {
//! use xkeyctl::{CaptureRegistry, FnKeyHandler, KeyboardCapture};
//!
//! let registry = CaptureRegistry::new();
//! let capture = KeyboardCapture::open(["q", "w", "e", "r"]).expect("no display");
//! capture
//!     .start(
//!         Some(Box::new(FnKeyHandler::new(
//!             |key: &str| {
//!                 println!("down {key}");
//!                 true
//!             },
//!             |key: &str| {
//!                 println!("up {key}");
//!                 true
//!             },
//!         ))),
//!         &registry,
//!     )
//!     .expect("failed to start capture");
//!
//! // Keep q, w, e and r away from other applications.
//! capture.suppress_keyboard(true).unwrap();
//! # registry.cancel_all().unwrap();
//! # }
//! # #[cfg(not(all(target_os = "linux", feature = "x11")))]
//! # fn main() {}
//! ```
//!
//! ### Emulating Keys
//!
//! ```no_run
//! # #[cfg(all(target_os = "linux", feature = "x11"))]
//! # fn main() {
//! use xkeyctl::KeyboardEmulation;
//!
//! let mut emulation = KeyboardEmulation::open().expect("no display");
//! emulation.send_string("Hello, world").unwrap();
//! emulation.send_backspaces(5).unwrap();
//! emulation.send_key_combination("Control_L(a)").unwrap();
//! # }
//! # #[cfg(not(all(target_os = "linux", feature = "x11")))]
//! # fn main() {}
//! ```
//!
//! ## Architecture
//!
//! Both engines talk to the display server through a backend trait
//! ([`CaptureBackend`], [`EmulationBackend`]) and each owns its own
//! connection. The X11 backends are enabled by the default `x11` feature;
//! the [`mock`] backends run anywhere and are what the tests use.

pub mod backend;
pub mod capture;
pub mod channel;
pub mod combo;
pub mod config;
pub mod emulate;
pub mod error;
pub mod event;
pub mod handler;
pub mod keycode;
pub mod keysym;
pub mod modifier;
pub mod registry;

mod platform;

// Re-exports
pub use backend::{CaptureBackend, EmulationBackend};
pub use capture::{CaptureId, KeyboardCapture};
pub use config::CaptureConfig;
pub use emulate::{EventClock, KeyboardEmulation};
pub use error::{Error, Result};
pub use event::{DeviceInfo, KeyEdge, KeyEvent, RawEventKind, RawKeyEvent};
pub use handler::{FnKeyHandler, KeyHandler};
pub use keycode::{key_to_keycode, keycode_to_key};
pub use registry::CaptureRegistry;

pub use platform::mock;
#[cfg(all(target_os = "linux", feature = "x11"))]
pub use platform::{X11Capture, X11Emulation};
