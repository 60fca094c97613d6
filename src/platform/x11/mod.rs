//! X11 backends: XInput2 for capture, XSendEvent and XTest for emulation.

mod capture;
mod connection;
mod emulate;

pub use capture::X11Capture;
pub use emulate::X11Emulation;
