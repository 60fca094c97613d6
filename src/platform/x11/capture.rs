//! X11 key capture using XInput2.

use super::connection::Connection;
use crate::backend::CaptureBackend;
use crate::error::{Error, Result};
use crate::event::{DeviceInfo, RawEventKind, RawKeyEvent};
use crate::modifier::IGNORED_LOCK_MASK;
use ::x11::{xinput2, xlib};
use std::ffi::CStr;
use std::os::raw::{c_int, c_uchar};
use std::time::Duration;

const XI_ALL_DEVICES: c_int = 0;
const XI_ALL_MASTER_DEVICES: c_int = 1;
const XI_KEY_PRESS: c_int = 2;
const XI_KEY_RELEASE: c_int = 3;
const XI_KEY_REPEAT: c_int = 1 << 16;
const XI_GRAB_MODE_ASYNC: c_int = 1;
const TRUE: c_int = 1;

/// XI2 event mask covering key press and release.
fn key_event_mask() -> [c_uchar; 4] {
    let mut mask = [0; 4];
    for event in [XI_KEY_PRESS, XI_KEY_RELEASE] {
        mask[(event >> 3) as usize] |= 1 << (event & 7);
    }
    mask
}

/// Capture backend on its own X connection.
pub struct X11Capture {
    conn: Connection,
    xi_opcode: c_int,
}

impl X11Capture {
    /// Connect to the default display and check for XInput 2.0.
    pub fn open() -> Result<Self> {
        let conn = Connection::open()?;
        let xi_opcode = conn
            .extension_opcode(c"XInputExtension")
            .ok_or(Error::ExtensionMissing("XInputExtension"))?;

        let mut major = 2;
        let mut minor = 0;
        let status = unsafe { xinput2::XIQueryVersion(conn.raw(), &mut major, &mut minor) };
        if status != 0 {
            return Err(Error::ExtensionMissing("XInputExtension 2.0"));
        }
        log::debug!("XInput {}.{} available, opcode {}", major, minor, xi_opcode);

        Ok(Self { conn, xi_opcode })
    }

    fn wait_readable(&self, timeout: Duration) -> Result<bool> {
        let mut fd = libc::pollfd {
            fd: unsafe { xlib::XConnectionNumber(self.conn.raw()) },
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.as_millis().min(c_int::MAX as u128) as c_int;
        let ready = unsafe { libc::poll(&mut fd, 1, millis) };
        if ready < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(Error::Protocol(format!("poll on display connection: {}", err)));
        }
        if fd.revents & (libc::POLLERR | libc::POLLHUP) != 0 {
            return Err(Error::Protocol("display connection closed".into()));
        }
        Ok(ready > 0)
    }

    fn drain(&mut self) -> Vec<RawKeyEvent> {
        let display = self.conn.raw();
        let mut events = Vec::new();
        while unsafe { xlib::XPending(display) } > 0 {
            let mut event: xlib::XEvent = unsafe { std::mem::zeroed() };
            unsafe { xlib::XNextEvent(display, &mut event) };
            if let Some(raw) = self.decode(&mut event) {
                events.push(raw);
            }
        }
        events
    }

    fn decode(&self, event: &mut xlib::XEvent) -> Option<RawKeyEvent> {
        if event.get_type() != xlib::GenericEvent {
            return None;
        }
        let display = self.conn.raw();
        let cookie = unsafe { &mut event.generic_event_cookie };
        if cookie.extension != self.xi_opcode {
            return None;
        }
        if unsafe { xlib::XGetEventData(display, cookie) } == 0 {
            return None;
        }

        let kind = match cookie.evtype {
            XI_KEY_PRESS => RawEventKind::KeyPress,
            XI_KEY_RELEASE => RawEventKind::KeyRelease,
            other => RawEventKind::Other(other),
        };
        let raw = match kind {
            RawEventKind::Other(_) => Some(RawKeyEvent {
                kind,
                keycode: 0,
                modifiers: 0,
                source_id: 0,
                repeat: false,
            }),
            _ => {
                let data = unsafe { &*(cookie.data as *const xinput2::XIDeviceEvent) };
                u8::try_from(data.detail).ok().map(|keycode| RawKeyEvent {
                    kind,
                    keycode,
                    modifiers: data.mods.effective as u32,
                    source_id: data.sourceid,
                    repeat: data.flags & XI_KEY_REPEAT != 0,
                })
            }
        };

        unsafe { xlib::XFreeEventData(display, cookie) };
        raw
    }

    fn grab_modifiers() -> [xinput2::XIGrabModifiers; 2] {
        [
            xinput2::XIGrabModifiers {
                modifiers: 0,
                status: 0,
            },
            xinput2::XIGrabModifiers {
                modifiers: c_int::from(IGNORED_LOCK_MASK),
                status: 0,
            },
        ]
    }
}

impl CaptureBackend for X11Capture {
    fn devices(&mut self) -> Result<Vec<DeviceInfo>> {
        let mut count = 0;
        let info = unsafe { xinput2::XIQueryDevice(self.conn.raw(), XI_ALL_DEVICES, &mut count) };
        if info.is_null() {
            self.conn.take_error()?;
            return Ok(Vec::new());
        }

        let devices = unsafe { std::slice::from_raw_parts(info, count.max(0) as usize) }
            .iter()
            .map(|device| {
                let name = if device.name.is_null() {
                    String::new()
                } else {
                    unsafe { CStr::from_ptr(device.name) }
                        .to_string_lossy()
                        .into_owned()
                };
                DeviceInfo::new(device.deviceid, name)
            })
            .collect();

        unsafe { xinput2::XIFreeDeviceInfo(info) };
        Ok(devices)
    }

    fn select_key_events(&mut self) -> Result<()> {
        let mut bits = key_event_mask();
        let mut mask = xinput2::XIEventMask {
            deviceid: XI_ALL_MASTER_DEVICES,
            mask_len: bits.len() as c_int,
            mask: bits.as_mut_ptr(),
        };
        unsafe { xinput2::XISelectEvents(self.conn.raw(), self.conn.root(), &mut mask, 1) };
        self.conn.flush()
    }

    fn poll_events(&mut self, timeout: Duration) -> Result<Vec<RawKeyEvent>> {
        let events = self.drain();
        if !events.is_empty() {
            return self.conn.take_error().map(|_| events);
        }
        if self.wait_readable(timeout)? {
            let events = self.drain();
            self.conn.take_error()?;
            return Ok(events);
        }
        Ok(Vec::new())
    }

    fn grab_keycode(&mut self, keycode: u8) -> Result<()> {
        let mut bits = key_event_mask();
        let mut mask = xinput2::XIEventMask {
            deviceid: XI_ALL_MASTER_DEVICES,
            mask_len: bits.len() as c_int,
            mask: bits.as_mut_ptr(),
        };
        let mut modifiers = Self::grab_modifiers();
        let failed = unsafe {
            xinput2::XIGrabKeycode(
                self.conn.raw(),
                XI_ALL_MASTER_DEVICES,
                c_int::from(keycode),
                self.conn.root(),
                XI_GRAB_MODE_ASYNC,
                XI_GRAB_MODE_ASYNC,
                TRUE,
                &mut mask,
                modifiers.len() as c_int,
                modifiers.as_mut_ptr(),
            )
        };
        if failed != 0 {
            return Err(Error::Protocol(format!(
                "grab of keycode {} failed for {} modifier sets",
                keycode, failed
            )));
        }
        Ok(())
    }

    fn ungrab_keycode(&mut self, keycode: u8) -> Result<()> {
        let mut modifiers = Self::grab_modifiers();
        unsafe {
            xinput2::XIUngrabKeycode(
                self.conn.raw(),
                XI_ALL_MASTER_DEVICES,
                c_int::from(keycode),
                self.conn.root(),
                modifiers.len() as c_int,
                modifiers.as_mut_ptr(),
            )
        };
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.conn.flush()
    }

    fn sync(&mut self) -> Result<()> {
        self.conn.sync()
    }
}
