//! Display server interface used by the capture and emulation engines.
//!
//! Each engine owns its own backend, and with it its own connection to the
//! display server. The X11 implementations live in `platform::x11`; an
//! in-memory implementation for tests lives in [`crate::mock`].

use crate::error::Result;
use crate::event::{DeviceInfo, KeyEdge, RawKeyEvent};
use crate::keysym::Keysym;
use std::time::Duration;

/// Capture side of the display server.
pub trait CaptureBackend: Send + 'static {
    /// Enumerate every input device, master and slave.
    fn devices(&mut self) -> Result<Vec<DeviceInfo>>;

    /// Subscribe to raw key press and release events from all master
    /// devices on the root window.
    fn select_key_events(&mut self) -> Result<()>;

    /// Return the events that are pending, waiting at most `timeout` for
    /// the first one to arrive. An empty vector means the wait timed out.
    fn poll_events(&mut self, timeout: Duration) -> Result<Vec<RawKeyEvent>>;

    /// Passively grab `keycode`, with and without the Num Lock modifier, on
    /// all master devices. Does not wait for the server to reply.
    fn grab_keycode(&mut self, keycode: u8) -> Result<()>;

    /// Release a grab made by [`CaptureBackend::grab_keycode`].
    fn ungrab_keycode(&mut self, keycode: u8) -> Result<()>;

    /// Send buffered requests without waiting.
    fn flush(&mut self) -> Result<()>;

    /// Send buffered requests and wait until the server has processed them.
    fn sync(&mut self) -> Result<()>;
}

/// Emulation side of the display server.
pub trait EmulationBackend {
    /// Look up a keysym by name, e.g. `"Alt_L"` or `"a"`.
    fn string_to_keysym(&self, name: &str) -> Option<Keysym>;

    /// All `(keycode, offset)` pairs producing `keysym`, in server order.
    ///
    /// The offset is the keysym's column in the keyboard mapping: 0 and 1
    /// are group 1 unshifted/shifted, 2 and 3 group 2, 4 and 5 the third
    /// level.
    fn keysym_to_keycodes(&mut self, keysym: Keysym) -> Result<Vec<(u8, u8)>>;

    /// The modifier mapping: one row of keycodes per modifier bit.
    fn modifier_mapping(&mut self) -> Result<Vec<Vec<u8>>>;

    /// Deliver a core key event with the given state and timestamp straight
    /// to the window holding input focus.
    fn send_key_event(
        &mut self,
        edge: KeyEdge,
        keycode: u8,
        modifiers: u8,
        time: u32,
    ) -> Result<()>;

    /// Inject a key event through the XTEST device, as if typed.
    fn fake_key_event(&mut self, edge: KeyEdge, keycode: u8) -> Result<()>;

    /// Wait until the server has processed every request sent so far.
    fn sync(&mut self) -> Result<()>;
}
