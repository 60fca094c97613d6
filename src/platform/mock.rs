//! In-memory backends for tests.
//!
//! [`MockCapture`] plays the part of the display server for a
//! [`crate::KeyboardCapture`]: tests push raw events into it and inspect the
//! grab requests it received. Clones share state, so a test can keep one
//! clone after handing another to the capture.
//!
//! [`MockEmulation`] records every event a [`crate::KeyboardEmulation`]
//! sends, against a configurable keyboard mapping.

use crate::backend::{CaptureBackend, EmulationBackend};
use crate::error::{Error, Result};
use crate::event::{DeviceInfo, KeyEdge, RawKeyEvent};
use crate::keycode;
use crate::keysym::{self, Keysym};
use crate::modifier::MODIFIER_COUNT;
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// A request received by [`MockCapture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRequest {
    SelectKeyEvents,
    Grab(u8),
    Ungrab(u8),
    Flush,
    Sync,
}

#[derive(Default)]
struct CaptureState {
    devices: Vec<DeviceInfo>,
    queue: VecDeque<RawKeyEvent>,
    requests: Vec<CaptureRequest>,
    grabbed: BTreeSet<u8>,
    refused: Vec<CaptureRequest>,
    fail: bool,
}

/// Scriptable [`CaptureBackend`].
#[derive(Clone)]
pub struct MockCapture {
    state: Arc<(Mutex<CaptureState>, Condvar)>,
}

impl MockCapture {
    /// Device ID of the default physical keyboard.
    pub const KEYBOARD_ID: i32 = 10;
    /// Device ID of the default XTEST keyboard.
    pub const XTEST_KEYBOARD_ID: i32 = 5;

    /// A server with the usual core, XTEST and one physical keyboard.
    pub fn new() -> Self {
        let devices = vec![
            DeviceInfo::new(2, "Virtual core pointer"),
            DeviceInfo::new(3, "Virtual core keyboard"),
            DeviceInfo::new(4, "Virtual core XTEST pointer"),
            DeviceInfo::new(Self::XTEST_KEYBOARD_ID, "Virtual core XTEST keyboard"),
            DeviceInfo::new(Self::KEYBOARD_ID, "AT Translated Set 2 keyboard"),
        ];
        Self {
            state: Arc::new((
                Mutex::new(CaptureState {
                    devices,
                    ..CaptureState::default()
                }),
                Condvar::new(),
            )),
        }
    }

    /// Replace the device list.
    pub fn with_devices(self, devices: Vec<DeviceInfo>) -> Self {
        self.lock().devices = devices;
        self
    }

    /// Queue events for delivery, in order.
    pub fn push_events(&self, events: impl IntoIterator<Item = RawKeyEvent>) {
        self.lock().queue.extend(events);
        self.state.1.notify_all();
    }

    /// Every request received so far, in order. Polls are not recorded.
    pub fn requests(&self) -> Vec<CaptureRequest> {
        self.lock().requests.clone()
    }

    /// Keycodes currently grabbed.
    pub fn grabbed(&self) -> BTreeSet<u8> {
        self.lock().grabbed.clone()
    }

    /// Make every subsequent request fail with a protocol error.
    pub fn fail_requests(&self, fail: bool) {
        self.lock().fail = fail;
        self.state.1.notify_all();
    }

    /// Make exactly these requests fail with a protocol error. An empty
    /// slice lets every request through again.
    pub fn refuse_requests(&self, requests: &[CaptureRequest]) {
        self.lock().refused = requests.to_vec();
    }

    fn lock(&self) -> MutexGuard<'_, CaptureState> {
        // A panicking test thread must not hide the state from the others.
        self.state.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn request(&self, request: CaptureRequest) -> Result<MutexGuard<'_, CaptureState>> {
        let mut state = self.lock();
        if state.fail || state.refused.contains(&request) {
            return Err(Error::Protocol(format!("{:?} failed", request)));
        }
        state.requests.push(request);
        Ok(state)
    }
}

impl Default for MockCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for MockCapture {
    fn devices(&mut self) -> Result<Vec<DeviceInfo>> {
        let state = self.lock();
        if state.fail {
            return Err(Error::Protocol("device query failed".into()));
        }
        Ok(state.devices.clone())
    }

    fn select_key_events(&mut self) -> Result<()> {
        self.request(CaptureRequest::SelectKeyEvents).map(drop)
    }

    fn poll_events(&mut self, timeout: Duration) -> Result<Vec<RawKeyEvent>> {
        let mut state = self.lock();
        if state.queue.is_empty() && !state.fail {
            state = self
                .state
                .1
                .wait_timeout(state, timeout)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        if state.fail {
            return Err(Error::Protocol("connection lost".into()));
        }
        Ok(state.queue.drain(..).collect())
    }

    fn grab_keycode(&mut self, keycode: u8) -> Result<()> {
        self.request(CaptureRequest::Grab(keycode))?
            .grabbed
            .insert(keycode);
        Ok(())
    }

    fn ungrab_keycode(&mut self, keycode: u8) -> Result<()> {
        self.request(CaptureRequest::Ungrab(keycode))?
            .grabbed
            .remove(&keycode);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.request(CaptureRequest::Flush).map(drop)
    }

    fn sync(&mut self) -> Result<()> {
        self.request(CaptureRequest::Sync).map(drop)
    }
}

/// A key event delivered to the focus window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusEvent {
    pub edge: KeyEdge,
    pub keycode: u8,
    pub modifiers: u8,
    pub time: u32,
}

/// An event sent through [`MockEmulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmulatedEvent {
    /// Sent to the focus window.
    Focus(FocusEvent),
    /// Injected through XTEST.
    Fake(KeyEdge, u8),
    /// A round trip to the server.
    Sync,
}

impl EmulatedEvent {
    pub fn focus(edge: KeyEdge, keycode: u8, modifiers: u8, time: u32) -> Self {
        EmulatedEvent::Focus(FocusEvent {
            edge,
            keycode,
            modifiers,
            time,
        })
    }
}

/// Recording [`EmulationBackend`] over a fixed keyboard mapping.
#[derive(Debug, Default)]
pub struct MockEmulation {
    names: HashMap<String, Keysym>,
    keysyms: HashMap<Keysym, Vec<(u8, u8)>>,
    modifier_mapping: Vec<Vec<u8>>,
    events: Vec<EmulatedEvent>,
    fail: Cell<bool>,
}

impl MockEmulation {
    /// An empty mapping: no keysym resolves.
    pub fn new() -> Self {
        Self {
            modifier_mapping: vec![Vec::new(); MODIFIER_COUNT],
            ..Self::default()
        }
    }

    /// A US layout with the evdev keycodes the X server usually assigns.
    pub fn us_layout() -> Self {
        const UNSHIFTED: &str = "`1234567890-=qwertyuiop[]\\asdfghjkl;'zxcvbnm,./";
        const SHIFTED: &str = "~!@#$%^&*()_+QWERTYUIOP{}|ASDFGHJKL:\"ZXCVBNM<>?";

        let mut mock = Self::new();
        for (lower, upper) in UNSHIFTED.chars().zip(SHIFTED.chars()) {
            let Some(code) = keycode::key_to_keycode(lower.encode_utf8(&mut [0; 4])) else {
                continue;
            };
            mock = mock
                .with_keysym(lower as Keysym, &[(code, 0)])
                .with_keysym(upper as Keysym, &[(code, 1)]);
        }

        let named = [
            ("space", 0x20, 65),
            ("BackSpace", keysym::BACKSPACE, 22),
            ("Tab", keysym::TAB, 23),
            ("Return", keysym::RETURN, 36),
            ("Escape", keysym::ESCAPE, 9),
            ("Shift_L", keysym::SHIFT_L, 50),
            ("Shift_R", keysym::SHIFT_R, 62),
            ("Control_L", keysym::CONTROL_L, 37),
            ("Control_R", keysym::CONTROL_R, 105),
            ("Alt_L", keysym::ALT_L, 64),
            ("Alt_R", keysym::ALT_R, 108),
            ("Super_L", keysym::SUPER_L, 133),
            ("ISO_Level3_Shift", keysym::ISO_LEVEL3_SHIFT, 92),
        ];
        for (name, sym, code) in named {
            mock = mock.with_name(name, sym).with_keysym(sym, &[(code, 0)]);
        }

        mock.with_modifier_row(0, &[50, 62])
            .with_modifier_row(1, &[66])
            .with_modifier_row(2, &[37, 105])
            .with_modifier_row(3, &[64, 108])
            .with_modifier_row(4, &[77])
            .with_modifier_row(6, &[133])
            .with_modifier_row(7, &[92])
    }

    /// Register a keysym name. Single-character names resolve without this.
    pub fn with_name(mut self, name: &str, keysym: Keysym) -> Self {
        self.names.insert(name.to_string(), keysym);
        self
    }

    /// Set the `(keycode, offset)` candidates for `keysym`.
    pub fn with_keysym(mut self, keysym: Keysym, candidates: &[(u8, u8)]) -> Self {
        self.keysyms.insert(keysym, candidates.to_vec());
        self
    }

    /// Remove every candidate for `keysym`.
    pub fn without_keysym(mut self, keysym: Keysym) -> Self {
        self.keysyms.remove(&keysym);
        self
    }

    /// Set the keycodes of modifier row `index`.
    pub fn with_modifier_row(mut self, index: usize, keycodes: &[u8]) -> Self {
        self.modifier_mapping[index] = keycodes.to_vec();
        self
    }

    /// Every event sent so far, in order.
    pub fn events(&self) -> Vec<EmulatedEvent> {
        self.events.clone()
    }

    /// Only the events sent to the focus window.
    pub fn focus_events(&self) -> Vec<FocusEvent> {
        self.events
            .iter()
            .filter_map(|event| match event {
                EmulatedEvent::Focus(focus) => Some(*focus),
                _ => None,
            })
            .collect()
    }

    /// Number of round trips made.
    pub fn sync_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, EmulatedEvent::Sync))
            .count()
    }

    /// Make every subsequent request fail with a protocol error.
    pub fn fail_requests(&self, fail: bool) {
        self.fail.set(fail);
    }

    fn check(&self) -> Result<()> {
        if self.fail.get() {
            Err(Error::Protocol("request failed".into()))
        } else {
            Ok(())
        }
    }
}

impl EmulationBackend for MockEmulation {
    fn string_to_keysym(&self, name: &str) -> Option<Keysym> {
        if let Some(&sym) = self.names.get(name) {
            return Some(sym);
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_graphic() => Some(c as Keysym),
            _ => None,
        }
    }

    fn keysym_to_keycodes(&mut self, keysym: Keysym) -> Result<Vec<(u8, u8)>> {
        self.check()?;
        Ok(self.keysyms.get(&keysym).cloned().unwrap_or_default())
    }

    fn modifier_mapping(&mut self) -> Result<Vec<Vec<u8>>> {
        self.check()?;
        Ok(self.modifier_mapping.clone())
    }

    fn send_key_event(
        &mut self,
        edge: KeyEdge,
        keycode: u8,
        modifiers: u8,
        time: u32,
    ) -> Result<()> {
        self.check()?;
        self.events.push(EmulatedEvent::focus(edge, keycode, modifiers, time));
        Ok(())
    }

    fn fake_key_event(&mut self, edge: KeyEdge, keycode: u8) -> Result<()> {
        self.check()?;
        self.events.push(EmulatedEvent::Fake(edge, keycode));
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.check()?;
        self.events.push(EmulatedEvent::Sync);
        Ok(())
    }
}
