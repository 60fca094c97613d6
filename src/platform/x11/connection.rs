//! Owned Xlib display connection with protocol error collection.
//!
//! Xlib's default error handler exits the process. A handler installed
//! here records errors per display instead, and [`Connection::sync`] turns
//! them into [`Error::Protocol`] for the caller.

use crate::error::{Error, Result};
use ::x11::xlib;
use std::os::raw::c_int;
use std::ptr::null;
use std::sync::{Mutex, Once};

const FALSE: c_int = 0;

/// Errors reported by the server, keyed by display address.
static ERRORS: Mutex<Vec<(usize, String)>> = Mutex::new(Vec::new());

static INSTALL_HANDLER: Once = Once::new();

unsafe extern "C" fn record_error(
    display: *mut xlib::Display,
    event: *mut xlib::XErrorEvent,
) -> c_int {
    let Some(event) = (unsafe { event.as_ref() }) else {
        return 0;
    };
    let message = format!(
        "X error {} for request {}.{} (resource {:#x})",
        event.error_code, event.request_code, event.minor_code, event.resourceid
    );
    if let Ok(mut errors) = ERRORS.lock() {
        errors.push((display as usize, message));
    }
    0
}

pub(super) struct Connection {
    display: *mut xlib::Display,
    root: xlib::Window,
}

// The display is only ever used by one thread at a time: the capture
// backend sits behind a mutex and the emulation backend is not shared.
unsafe impl Send for Connection {}

impl Connection {
    /// Open the display named by `$DISPLAY`.
    pub(super) fn open() -> Result<Self> {
        INSTALL_HANDLER.call_once(|| unsafe {
            xlib::XSetErrorHandler(Some(record_error));
        });

        let display = unsafe { xlib::XOpenDisplay(null()) };
        if display.is_null() {
            return Err(Error::DisplayUnavailable("XOpenDisplay failed".into()));
        }
        let root = unsafe { xlib::XDefaultRootWindow(display) };
        Ok(Self { display, root })
    }

    pub(super) fn raw(&self) -> *mut xlib::Display {
        self.display
    }

    pub(super) fn root(&self) -> xlib::Window {
        self.root
    }

    /// Query an extension's major opcode.
    pub(super) fn extension_opcode(&self, name: &'static std::ffi::CStr) -> Option<c_int> {
        let mut opcode = 0;
        let mut event = 0;
        let mut error = 0;
        let present = unsafe {
            xlib::XQueryExtension(
                self.display,
                name.as_ptr(),
                &mut opcode,
                &mut event,
                &mut error,
            )
        };
        (present != FALSE).then_some(opcode)
    }

    pub(super) fn flush(&self) -> Result<()> {
        unsafe { xlib::XFlush(self.display) };
        self.take_error()
    }

    /// Wait until the server has processed every request sent so far.
    pub(super) fn sync(&self) -> Result<()> {
        unsafe { xlib::XSync(self.display, FALSE) };
        self.take_error()
    }

    /// Return the oldest unreported protocol error for this display.
    pub(super) fn take_error(&self) -> Result<()> {
        let mut errors = ERRORS
            .lock()
            .map_err(|_| Error::ThreadError("error list mutex poisoned".into()))?;
        let key = self.display as usize;
        let Some(index) = errors.iter().position(|(display, _)| *display == key) else {
            return Ok(());
        };
        let (_, message) = errors.remove(index);
        errors.retain(|(display, _)| *display != key);
        Err(Error::Protocol(message))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        unsafe { xlib::XCloseDisplay(self.display) };
        if let Ok(mut errors) = ERRORS.lock() {
            let key = self.display as usize;
            errors.retain(|(display, _)| *display != key);
        }
    }
}
