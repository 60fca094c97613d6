//! X11 keyboard emulation using XSendEvent and XTest.

use super::connection::Connection;
use crate::backend::EmulationBackend;
use crate::error::{Error, Result};
use crate::event::KeyEdge;
use crate::keysym::{Keysym, NO_SYMBOL};
use ::x11::{xlib, xtest};
use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::{c_int, c_uint};

const TRUE: c_int = 1;
const FALSE: c_int = 0;

/// Emulation backend on its own X connection.
///
/// The keyboard mapping is read once when the connection opens, so a
/// layout change while it is open is not picked up.
pub struct X11Emulation {
    conn: Connection,
    keymap: HashMap<Keysym, Vec<(u8, u8)>>,
}

impl X11Emulation {
    /// Connect to the default display and check for the XTEST extension.
    pub fn open() -> Result<Self> {
        let conn = Connection::open()?;

        let (mut event_base, mut error_base, mut major, mut minor) = (0, 0, 0, 0);
        let present = unsafe {
            xtest::XTestQueryExtension(
                conn.raw(),
                &mut event_base,
                &mut error_base,
                &mut major,
                &mut minor,
            )
        };
        if present == FALSE {
            return Err(Error::ExtensionMissing("XTEST"));
        }

        let keymap = load_keymap(&conn)?;
        log::debug!("loaded keyboard mapping with {} keysyms", keymap.len());
        Ok(Self { conn, keymap })
    }
}

/// Index every keysym in the keyboard mapping by `(keycode, column)`,
/// ordered by column, then keycode.
fn load_keymap(conn: &Connection) -> Result<HashMap<Keysym, Vec<(u8, u8)>>> {
    let display = conn.raw();
    let (mut min_keycode, mut max_keycode) = (0, 0);
    unsafe { xlib::XDisplayKeycodes(display, &mut min_keycode, &mut max_keycode) };
    let count = max_keycode - min_keycode + 1;
    if count <= 0 {
        return Ok(HashMap::new());
    }

    let mut per_keycode = 0;
    let syms = unsafe {
        xlib::XGetKeyboardMapping(
            display,
            min_keycode as xlib::KeyCode,
            count,
            &mut per_keycode,
        )
    };
    if syms.is_null() {
        conn.take_error()?;
        return Err(Error::Protocol("XGetKeyboardMapping failed".into()));
    }

    let per_keycode = per_keycode.max(0) as usize;
    let table = unsafe { std::slice::from_raw_parts(syms, count as usize * per_keycode) };
    let mut keymap: HashMap<Keysym, Vec<(u8, u8)>> = HashMap::new();
    for (row, keysyms) in table.chunks(per_keycode.max(1)).enumerate() {
        let Ok(keycode) = u8::try_from(min_keycode as usize + row) else {
            continue;
        };
        for (column, &sym) in keysyms.iter().enumerate() {
            let Ok(sym) = Keysym::try_from(sym) else {
                continue;
            };
            if sym == NO_SYMBOL {
                continue;
            }
            let Ok(column) = u8::try_from(column) else {
                continue;
            };
            keymap.entry(sym).or_default().push((keycode, column));
        }
    }
    unsafe { xlib::XFree(syms.cast()) };

    for candidates in keymap.values_mut() {
        candidates.sort_by_key(|&(keycode, column)| (column, keycode));
    }
    Ok(keymap)
}

impl EmulationBackend for X11Emulation {
    fn string_to_keysym(&self, name: &str) -> Option<Keysym> {
        let name = CString::new(name).ok()?;
        let sym = unsafe { xlib::XStringToKeysym(name.as_ptr()) };
        Keysym::try_from(sym).ok().filter(|&sym| sym != NO_SYMBOL)
    }

    fn keysym_to_keycodes(&mut self, keysym: Keysym) -> Result<Vec<(u8, u8)>> {
        Ok(self.keymap.get(&keysym).cloned().unwrap_or_default())
    }

    fn modifier_mapping(&mut self) -> Result<Vec<Vec<u8>>> {
        let map = unsafe { xlib::XGetModifierMapping(self.conn.raw()) };
        if map.is_null() {
            self.conn.take_error()?;
            return Err(Error::Protocol("XGetModifierMapping failed".into()));
        }

        let (per_modifier, codes) = unsafe { ((*map).max_keypermod, (*map).modifiermap) };
        let per_modifier = per_modifier.max(0) as usize;
        let codes = unsafe { std::slice::from_raw_parts(codes, 8 * per_modifier) };
        let rows: Vec<Vec<u8>> = codes
            .chunks(per_modifier.max(1))
            .map(|row| row.iter().copied().filter(|&code| code != 0).collect())
            .collect();

        unsafe { xlib::XFreeModifiermap(map) };
        Ok(rows)
    }

    fn send_key_event(
        &mut self,
        edge: KeyEdge,
        keycode: u8,
        modifiers: u8,
        time: u32,
    ) -> Result<()> {
        let display = self.conn.raw();
        let mut focus: xlib::Window = 0;
        let mut revert_to: c_int = 0;
        unsafe { xlib::XGetInputFocus(display, &mut focus, &mut revert_to) };
        if focus == 0 {
            log::debug!("no window has input focus, dropping key event");
            return Ok(());
        }

        let key = xlib::XKeyEvent {
            type_: if edge.is_press() {
                xlib::KeyPress
            } else {
                xlib::KeyRelease
            },
            serial: 0,
            send_event: TRUE,
            display,
            window: focus,
            root: self.conn.root(),
            subwindow: 0,
            time: xlib::Time::from(time),
            x: 1,
            y: 1,
            x_root: 1,
            y_root: 1,
            state: c_uint::from(modifiers),
            keycode: c_uint::from(keycode),
            same_screen: TRUE,
        };
        let mut event = xlib::XEvent::from(key);
        let status = unsafe { xlib::XSendEvent(display, focus, FALSE, 0, &mut event) };
        if status == 0 {
            return Err(Error::Protocol("XSendEvent failed".into()));
        }
        self.conn.take_error()
    }

    fn fake_key_event(&mut self, edge: KeyEdge, keycode: u8) -> Result<()> {
        let is_press = if edge.is_press() { TRUE } else { FALSE };
        let status = unsafe {
            xtest::XTestFakeKeyEvent(self.conn.raw(), c_uint::from(keycode), is_press, 0)
        };
        if status == 0 {
            return Err(Error::Protocol("XTestFakeKeyEvent failed".into()));
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.conn.sync()
    }
}
