//! Display server implementations.

pub mod mock;

#[cfg(all(target_os = "linux", feature = "x11"))]
pub mod x11;

#[cfg(all(target_os = "linux", feature = "x11"))]
pub use self::x11::{X11Capture, X11Emulation};
